//! Implementation Rules
//!
//! Every rule turns one logical kind into exactly one physical plan over the
//! same child groups. Joins pick hash or nested-loop by their hash conjuncts.

use crate::pattern::Pattern;
use crate::rules::{Rule, RuleContext, RuleType};
use kestrel_catalog::{Partitioning, TableLayout};
use kestrel_common::Result;
use kestrel_plan::{Distribution, PhysicalScan, Plan, PlanNode, PlanRef, PlanType, Scan};

/// Map a catalog partitioning onto scan slots. Hash columns missing from
/// the scan output leave the distribution unknown.
pub fn distribution_for(scan: &Scan, layout: Option<&TableLayout>) -> Distribution {
    let Some(layout) = layout else {
        return Distribution::Any;
    };
    match &layout.partitioning {
        Partitioning::Single => Distribution::Single,
        Partitioning::Random => Distribution::Random,
        Partitioning::Unknown => Distribution::Any,
        Partitioning::Hash { columns, buckets } => {
            let slots: Option<Vec<_>> = columns
                .iter()
                .map(|column| {
                    scan.output
                        .iter()
                        .find(|s| s.name.eq_ignore_ascii_case(column))
                        .map(|s| s.id)
                })
                .collect();
            match slots {
                Some(slots) if !slots.is_empty() => Distribution::Hash {
                    slots,
                    buckets: *buckets,
                },
                _ => Distribution::Any,
            }
        }
    }
}

fn unary(plan_type: PlanType) -> Pattern {
    Pattern::new(plan_type, vec![Pattern::any()])
}

pub struct LogicalScanToPhysicalScan;

impl Rule for LogicalScanToPhysicalScan {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_SCAN_TO_PHYSICAL_SCAN
    }

    fn pattern(&self) -> Pattern {
        Pattern::leaf(PlanType::LogicalScan)
    }

    fn apply(&self, plan: &PlanRef, ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        let PlanNode::LogicalScan(scan) = plan.node() else {
            return Ok(vec![]);
        };
        let layout = ctx.catalog.layout(&scan.table);
        let physical = PhysicalScan {
            scan: scan.clone(),
            distribution: distribution_for(scan, layout.as_ref()),
        };
        Ok(vec![plan.with_node(PlanNode::PhysicalScan(physical))?])
    }
}

pub struct LogicalEmptyRelationToPhysical;

impl Rule for LogicalEmptyRelationToPhysical {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_EMPTY_RELATION_TO_PHYSICAL
    }

    fn pattern(&self) -> Pattern {
        Pattern::leaf(PlanType::LogicalEmptyRelation)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalEmptyRelation(empty) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalEmptyRelation(empty.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

pub struct LogicalFilterToPhysicalFilter;

impl Rule for LogicalFilterToPhysicalFilter {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_FILTER_TO_PHYSICAL_FILTER
    }

    fn pattern(&self) -> Pattern {
        unary(PlanType::LogicalFilter)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalFilter(filter) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalFilter(filter.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

pub struct LogicalProjectToPhysicalProject;

impl Rule for LogicalProjectToPhysicalProject {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_PROJECT_TO_PHYSICAL_PROJECT
    }

    fn pattern(&self) -> Pattern {
        unary(PlanType::LogicalProject)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalProject(project) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalProject(project.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

fn join_pattern() -> Pattern {
    Pattern::new(PlanType::LogicalJoin, vec![Pattern::any(), Pattern::any()])
}

fn has_hash_conjuncts(plan: &Plan) -> Option<bool> {
    match plan.node() {
        PlanNode::LogicalJoin(join) => Some(!join.hash_conjuncts.is_empty()),
        _ => None,
    }
}

/// Join with usable hash equalities -> hash join
pub struct LogicalJoinToHashJoin;

impl Rule for LogicalJoinToHashJoin {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_JOIN_TO_HASH_JOIN
    }

    fn pattern(&self) -> Pattern {
        join_pattern()
    }

    fn check(&self, plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        has_hash_conjuncts(plan) == Some(true)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalJoin(join) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalHashJoin(join.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

/// Join without hash equalities -> nested-loop join, keeping the join type,
/// every conjunct list and the child order
pub struct LogicalJoinToNestedLoopJoin;

impl Rule for LogicalJoinToNestedLoopJoin {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_JOIN_TO_NESTED_LOOP_JOIN
    }

    fn pattern(&self) -> Pattern {
        join_pattern()
    }

    fn check(&self, plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        has_hash_conjuncts(plan) == Some(false)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalJoin(join) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalNestedLoopJoin(join.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

pub struct LogicalAggregateToHashAggregate;

impl Rule for LogicalAggregateToHashAggregate {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_AGGREGATE_TO_HASH_AGGREGATE
    }

    fn pattern(&self) -> Pattern {
        unary(PlanType::LogicalAggregate)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalAggregate(agg) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalHashAggregate(agg.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

pub struct LogicalSetOperationToPhysical;

impl Rule for LogicalSetOperationToPhysical {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_SET_OPERATION_TO_PHYSICAL
    }

    fn pattern(&self) -> Pattern {
        Pattern::leaf(PlanType::LogicalSetOperation)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalSetOperation(set_op) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalSetOperation(set_op.clone()))?])
            }
            _ => Ok(vec![]),
        }
    }
}

pub struct LogicalLimitToPhysicalLimit;

impl Rule for LogicalLimitToPhysicalLimit {
    fn rule_type(&self) -> RuleType {
        RuleType::LOGICAL_LIMIT_TO_PHYSICAL_LIMIT
    }

    fn pattern(&self) -> Pattern {
        unary(PlanType::LogicalLimit)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalLimit(limit) => {
                Ok(vec![plan.with_node(PlanNode::PhysicalLimit(*limit))?])
            }
            _ => Ok(vec![]),
        }
    }
}
