//! Principal lookup backends used by identifiers.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryResolver;
pub use sqlite::SqliteResolver;
pub use traits::*;
