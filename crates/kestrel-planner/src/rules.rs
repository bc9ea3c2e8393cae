//! Rule System
//!
//! A rule is a pattern, a guard and a transform. Rewrite rules produce
//! logical alternatives; implementation rules produce exactly one physical
//! plan choosing an execution strategy.

use crate::implementation::{
    LogicalAggregateToHashAggregate, LogicalEmptyRelationToPhysical, LogicalFilterToPhysicalFilter,
    LogicalJoinToHashJoin, LogicalJoinToNestedLoopJoin, LogicalLimitToPhysicalLimit,
    LogicalProjectToPhysicalProject, LogicalScanToPhysicalScan, LogicalSetOperationToPhysical,
};
use crate::pattern::Pattern;
use crate::rewrite::{
    EliminateEmptyScan, EliminateUniqueAggregate, InferJoinPredicates, JoinCommute, MergeFilters,
    PushFilterIntoJoin,
};
use kestrel_catalog::TableLayoutProvider;
use kestrel_common::{OptimizerConfig, Result};
use kestrel_plan::{Plan, PlanRef};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Rewrite,
    Implementation,
}

/// Identity of a rule. `id` is its bit in the applied-rule set of every
/// group expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleType {
    pub id: usize,
    pub name: &'static str,
    pub category: RuleCategory,
}

impl RuleType {
    pub const fn rewrite(id: usize, name: &'static str) -> Self {
        Self {
            id,
            name,
            category: RuleCategory::Rewrite,
        }
    }

    pub const fn implementation(id: usize, name: &'static str) -> Self {
        Self {
            id,
            name,
            category: RuleCategory::Implementation,
        }
    }

    pub const MERGE_FILTERS: RuleType = RuleType::rewrite(0, "MergeFilters");
    pub const PUSH_FILTER_INTO_JOIN: RuleType = RuleType::rewrite(1, "PushFilterIntoJoin");
    pub const INFER_JOIN_PREDICATES: RuleType = RuleType::rewrite(2, "InferJoinPredicates");
    pub const ELIMINATE_UNIQUE_AGGREGATE: RuleType =
        RuleType::rewrite(3, "EliminateUniqueAggregate");
    pub const ELIMINATE_EMPTY_SCAN: RuleType = RuleType::rewrite(4, "EliminateEmptyScan");
    pub const JOIN_COMMUTE: RuleType = RuleType::rewrite(5, "JoinCommute");

    pub const LOGICAL_SCAN_TO_PHYSICAL_SCAN: RuleType =
        RuleType::implementation(16, "LogicalScanToPhysicalScan");
    pub const LOGICAL_EMPTY_RELATION_TO_PHYSICAL: RuleType =
        RuleType::implementation(17, "LogicalEmptyRelationToPhysical");
    pub const LOGICAL_FILTER_TO_PHYSICAL_FILTER: RuleType =
        RuleType::implementation(18, "LogicalFilterToPhysicalFilter");
    pub const LOGICAL_PROJECT_TO_PHYSICAL_PROJECT: RuleType =
        RuleType::implementation(19, "LogicalProjectToPhysicalProject");
    pub const LOGICAL_JOIN_TO_HASH_JOIN: RuleType =
        RuleType::implementation(20, "LogicalJoinToHashJoin");
    pub const LOGICAL_JOIN_TO_NESTED_LOOP_JOIN: RuleType =
        RuleType::implementation(21, "LogicalJoinToNestedLoopJoin");
    pub const LOGICAL_AGGREGATE_TO_HASH_AGGREGATE: RuleType =
        RuleType::implementation(22, "LogicalAggregateToHashAggregate");
    pub const LOGICAL_SET_OPERATION_TO_PHYSICAL: RuleType =
        RuleType::implementation(23, "LogicalSetOperationToPhysical");
    pub const LOGICAL_LIMIT_TO_PHYSICAL_LIMIT: RuleType =
        RuleType::implementation(24, "LogicalLimitToPhysicalLimit");
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Read-only capabilities a guard or transform may consult
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub catalog: &'a dyn TableLayoutProvider,
    pub config: &'a OptimizerConfig,
}

impl<'a> RuleContext<'a> {
    pub fn new(catalog: &'a dyn TableLayoutProvider, config: &'a OptimizerConfig) -> Self {
        Self { catalog, config }
    }
}

/// Optimizer rule trait
pub trait Rule: Send + Sync {
    fn rule_type(&self) -> RuleType;

    fn pattern(&self) -> Pattern;

    /// Guard over a matched binding. A `false` is a normal negative outcome.
    fn check(&self, _plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        true
    }

    /// Alternatives for the binding, whose leaves are memo groups.
    fn apply(&self, plan: &PlanRef, ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>>;

    fn name(&self) -> &'static str {
        self.rule_type().name
    }

    fn rule_id(&self) -> usize {
        self.rule_type().id
    }

    fn category(&self) -> RuleCategory {
        self.rule_type().category
    }
}

/// Build the default set of rules, rewrite rules first in application order
pub fn default_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        // Rewrite rules
        Arc::new(MergeFilters),
        Arc::new(PushFilterIntoJoin),
        Arc::new(InferJoinPredicates),
        Arc::new(EliminateUniqueAggregate),
        Arc::new(EliminateEmptyScan),
        Arc::new(JoinCommute),
        // Implementation rules
        Arc::new(LogicalScanToPhysicalScan),
        Arc::new(LogicalEmptyRelationToPhysical),
        Arc::new(LogicalFilterToPhysicalFilter),
        Arc::new(LogicalProjectToPhysicalProject),
        Arc::new(LogicalJoinToHashJoin),
        Arc::new(LogicalJoinToNestedLoopJoin),
        Arc::new(LogicalAggregateToHashAggregate),
        Arc::new(LogicalSetOperationToPhysical),
        Arc::new(LogicalLimitToPhysicalLimit),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::MAX_RULES;
    use std::collections::HashSet;

    #[test]
    fn test_default_rule_ids_are_distinct() {
        let rules = default_rules();
        let ids: HashSet<usize> = rules.iter().map(|r| r.rule_id()).collect();
        assert_eq!(ids.len(), rules.len());
        assert!(rules.iter().all(|r| r.rule_id() < MAX_RULES));
    }

    #[test]
    fn test_rewrite_rules_come_first() {
        let rules = default_rules();
        let first_impl = rules
            .iter()
            .position(|r| r.category() == RuleCategory::Implementation)
            .unwrap();
        assert!(rules[first_impl..]
            .iter()
            .all(|r| r.category() == RuleCategory::Implementation));
        assert_eq!(rules[0].name(), "MergeFilters");
        assert_eq!(RuleType::JOIN_COMMUTE.to_string(), "JoinCommute#5");
    }
}
