//! Kestrel Core Types

use serde::{Deserialize, Serialize};

/// Memo group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub usize);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group_{}", self.0)
    }
}

impl From<usize> for GroupId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Group expression identifier, unique across the whole memo
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupExpressionId(pub usize);

impl std::fmt::Display for GroupExpressionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gexpr_{}", self.0)
    }
}

impl From<usize> for GroupExpressionId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Output slot identifier assigned by the binder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
