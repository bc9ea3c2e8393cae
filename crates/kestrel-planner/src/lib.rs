//! Kestrel Planner - Rules, memo and Cascades search

pub mod cascades;
pub mod implementation;
pub mod memo;
pub mod pattern;
pub mod rewrite;
pub mod rules;

pub use cascades::{Optimizer, SearchOutcome, StopReason};
pub use implementation::{
    distribution_for, LogicalAggregateToHashAggregate, LogicalEmptyRelationToPhysical,
    LogicalFilterToPhysicalFilter, LogicalJoinToHashJoin, LogicalJoinToNestedLoopJoin,
    LogicalLimitToPhysicalLimit, LogicalProjectToPhysicalProject, LogicalScanToPhysicalScan,
    LogicalSetOperationToPhysical,
};
pub use memo::{Group, GroupExpression, Memo, MAX_RULES};
pub use pattern::{Pattern, PatternKind};
pub use rewrite::{
    EliminateEmptyScan, EliminateUniqueAggregate, InferJoinPredicates, JoinCommute, MergeFilters,
    PushFilterIntoJoin,
};
pub use rules::{default_rules, Rule, RuleCategory, RuleContext, RuleType};
