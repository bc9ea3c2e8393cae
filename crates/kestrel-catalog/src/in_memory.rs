//! In-memory catalog implementation

use super::{TableLayout, TableLayoutProvider};
use dashmap::DashMap;
use kestrel_common::{KestrelError, Result};

/// In-memory layout catalog
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: DashMap<String, TableLayout>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    pub fn register_table(&self, name: &str, layout: TableLayout) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(KestrelError::AlreadyExists(format!("table '{}'", name)));
        }
        self.tables.insert(name.to_string(), layout);
        Ok(())
    }

    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

impl TableLayoutProvider for InMemoryCatalog {
    fn layout(&self, table_name: &str) -> Option<TableLayout> {
        self.tables.get(table_name).map(|r| r.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Partitioning;

    #[test]
    fn test_register_and_lookup() {
        let catalog = InMemoryCatalog::new();
        let layout = TableLayout::new(
            Partitioning::Hash {
                columns: vec!["o_orderkey".to_string()],
                buckets: 16,
            },
            16,
        );
        catalog.register_table("orders", layout.clone()).unwrap();
        catalog
            .register_table("empty", TableLayout::new(Partitioning::Random, 0))
            .unwrap();

        assert_eq!(catalog.layout("orders"), Some(layout));
        assert!(catalog.layout("empty").unwrap().is_empty());
        assert_eq!(catalog.layout("missing"), None);
        assert_eq!(catalog.tables(), vec!["empty", "orders"]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let catalog = InMemoryCatalog::new();
        catalog
            .register_table("t", TableLayout::new(Partitioning::Single, 1))
            .unwrap();
        let err = catalog
            .register_table("t", TableLayout::new(Partitioning::Single, 1))
            .unwrap_err();
        assert!(matches!(err, KestrelError::AlreadyExists(_)));
        assert_eq!(err.to_string(), "Already exists: table 't'");
    }
}
