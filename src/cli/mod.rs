pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod explore;
pub mod heal;
pub mod output;
pub mod patterns;
pub mod runtime;
pub mod triage;

pub use app::run;
