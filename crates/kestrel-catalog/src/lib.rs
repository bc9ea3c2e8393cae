//! Kestrel Catalog - Physical layout facts for rule guards

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemoryCatalog;
pub use traits::{NoLayout, Partitioning, TableLayout, TableLayoutProvider};
