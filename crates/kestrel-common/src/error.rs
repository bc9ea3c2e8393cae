//! Kestrel Error types

use crate::types::{GroupExpressionId, GroupId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KestrelError {
    /// A node was rebuilt with a child count its kind does not accept.
    #[error("Arity error: {plan} expects {expected} children, got {actual}")]
    Arity {
        plan: String,
        expected: usize,
        actual: usize,
    },

    /// A derived property was queried on an expression that is not bound yet.
    #[error("Unbound reference: {0}")]
    UnboundReference(String),

    /// A group expression is listed by more than one group.
    #[error(
        "Memo inconsistency: {expression} found in groups [{ids}]: {plan}",
        ids = join_ids(.groups)
    )]
    MemoInconsistency {
        expression: GroupExpressionId,
        groups: Vec<GroupId>,
        plan: String,
    },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl KestrelError {
    pub fn arity(plan: impl Into<String>, expected: usize, actual: usize) -> Self {
        KestrelError::Arity {
            plan: plan.into(),
            expected,
            actual,
        }
    }

    /// Whether the error only invalidates a single transform attempt.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, KestrelError::MemoInconsistency { .. })
    }
}

fn join_ids(groups: &[GroupId]) -> String {
    groups
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, KestrelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message() {
        let err = KestrelError::arity("LessThan", 2, 3);
        assert_eq!(
            err.to_string(),
            "Arity error: LessThan expects 2 children, got 3"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_memo_inconsistency_is_fatal() {
        let err = KestrelError::MemoInconsistency {
            expression: GroupExpressionId(4),
            groups: vec![GroupId(1), GroupId(2)],
            plan: "LogicalLimit(1)".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("gexpr_4"));
        assert_eq!(
            err.to_string(),
            "Memo inconsistency: gexpr_4 found in groups [group_1, group_2]: LogicalLimit(1)"
        );
    }
}
