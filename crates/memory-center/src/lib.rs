//! Knowledge persistence for SoulScout
//!
//! Holds learned patterns, exploration records, selector records and error
//! patterns behind the [`KnowledgeStore`] interface. The store is always an
//! explicitly constructed, injected dependency.

mod mappings;
mod record;
mod sink;
mod store;

pub use mappings::*;
pub use record::*;
pub use sink::*;
pub use store::*;
