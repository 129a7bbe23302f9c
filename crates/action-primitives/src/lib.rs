//! Browser automation surface for SoulScout
//!
//! This crate provides the capability set the explorer and the healer run against:
//! - A [`BrowserSurface`] trait: scoped discovery, introspection, click/fill/key, URL
//! - A locator grammar ([`Selector`]) shared by every implementation
//! - Deadline-bounded execution contexts and a common [`ActionError`]
//! - An in-memory [`FixturePage`] for offline runs and tests

pub mod errors;
mod fixture;
mod selector;
mod surface;
pub mod types;

pub use errors::*;
pub use fixture::*;
pub use selector::*;
pub use surface::*;
pub use types::*;
