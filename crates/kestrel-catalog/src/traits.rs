//! Catalog traits

use serde::{Deserialize, Serialize};

/// How a table's rows are spread across partitions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Partitioning {
    /// Hash partitioned on the named columns into a fixed bucket count
    Hash { columns: Vec<String>, buckets: usize },
    /// Rows land on partitions in no particular order
    Random,
    /// All rows live in one partition
    Single,
    #[default]
    Unknown,
}

/// Physical layout of a table as seen by the optimizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub partitioning: Partitioning,
    pub partition_count: usize,
}

impl TableLayout {
    pub fn new(partitioning: Partitioning, partition_count: usize) -> Self {
        Self {
            partitioning,
            partition_count,
        }
    }

    /// A table with no partitions has no rows.
    pub fn is_empty(&self) -> bool {
        self.partition_count == 0
    }
}

/// Read-only layout capability.
///
/// Only rule guards and implementation transforms consult it; the search
/// itself never depends on it.
pub trait TableLayoutProvider: Send + Sync {
    /// Get layout for a table, if known
    fn layout(&self, table_name: &str) -> Option<TableLayout>;
}

/// Provider that knows nothing about any table
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl TableLayoutProvider for NoLayout {
    fn layout(&self, _table_name: &str) -> Option<TableLayout> {
        None
    }
}
