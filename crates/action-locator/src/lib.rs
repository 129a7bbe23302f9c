//! Selector self-heal
//!
//! Recovers a broken locator against the live page with a fixed ladder:
//! - memorized alternates from earlier heals
//! - syntactic rewrites of the broken locator (memorized on success)
//! - text search for a similar element

pub mod errors;
pub mod healer;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use healer::*;
pub use strategies::{text_hint, transformations};
pub use types::*;
