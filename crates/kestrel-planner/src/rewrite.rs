//! Rewrite Rules
//!
//! Each rule maps a logical binding to zero or more logical alternatives
//! with the same output.

use crate::pattern::Pattern;
use crate::rules::{Rule, RuleContext, RuleType};
use kestrel_common::{KestrelError, Result};
use kestrel_plan::{
    ComparisonOp, ComparisonPredicate, ExprRef, Expression, Join, JoinType, Plan, PlanNode,
    PlanRef, PlanType, Slot, SlotSet,
};
use std::sync::Arc;

fn child_of(plan: &PlanRef, index: usize) -> Result<PlanRef> {
    plan.child(index).cloned().ok_or_else(|| {
        KestrelError::Internal(format!("{} has no child {}", plan.plan_type(), index))
    })
}

fn output_ids(plan: &Plan) -> SlotSet {
    plan.output().iter().map(|s| s.id).collect()
}

/// Append `extra` to `base`, skipping structural duplicates.
fn merge_conjuncts(base: &[ExprRef], extra: &[ExprRef]) -> Vec<ExprRef> {
    let mut merged = base.to_vec();
    for conjunct in extra {
        if !merged.contains(conjunct) {
            merged.push(conjunct.clone());
        }
    }
    merged
}

/// Swap the operands of every comparison.
fn commute_all(conjuncts: &[ExprRef]) -> Vec<ExprRef> {
    conjuncts
        .iter()
        .map(|e| match e.as_comparison() {
            Some(c) => Arc::new(Expression::Comparison(c.commute())),
            None => e.clone(),
        })
        .collect()
}

/// Inner, non-mark join below the filter of a `Filter(Join)` binding.
fn inner_join_below(plan: &Plan) -> Option<(&PlanRef, &Join)> {
    let child = plan.child(0)?;
    match child.node() {
        PlanNode::LogicalJoin(join)
            if join.join_type.is_inner_or_cross() && !join.is_mark_join() =>
        {
            Some((child, join))
        }
        _ => None,
    }
}

fn filter_over_join() -> Pattern {
    Pattern::new(
        PlanType::LogicalFilter,
        vec![Pattern::new(
            PlanType::LogicalJoin,
            vec![Pattern::any(), Pattern::any()],
        )],
    )
}

/// Filter(Filter(x)) -> Filter(x)
pub struct MergeFilters;

impl Rule for MergeFilters {
    fn rule_type(&self) -> RuleType {
        RuleType::MERGE_FILTERS
    }

    fn pattern(&self) -> Pattern {
        Pattern::new(
            PlanType::LogicalFilter,
            vec![Pattern::new(PlanType::LogicalFilter, vec![Pattern::any()])],
        )
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        let bottom_plan = child_of(plan, 0)?;
        let (PlanNode::LogicalFilter(top), PlanNode::LogicalFilter(bottom)) =
            (plan.node(), bottom_plan.node())
        else {
            return Ok(vec![]);
        };
        let merged = merge_conjuncts(&bottom.conjuncts, &top.conjuncts);
        Ok(vec![Plan::filter(merged, child_of(&bottom_plan, 0)?)])
    }
}

/// Filter over an inner or cross join -> join carrying the predicates.
///
/// Equalities between one slot of each side become hash conjuncts, with the
/// left side's slot first. Everything else becomes an other conjunct.
pub struct PushFilterIntoJoin;

impl Rule for PushFilterIntoJoin {
    fn rule_type(&self) -> RuleType {
        RuleType::PUSH_FILTER_INTO_JOIN
    }

    fn pattern(&self) -> Pattern {
        filter_over_join()
    }

    fn check(&self, plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        inner_join_below(plan).is_some()
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        let (PlanNode::LogicalFilter(filter), Some((join_plan, join))) =
            (plan.node(), inner_join_below(plan))
        else {
            return Ok(vec![]);
        };
        let left = output_ids(&*child_of(join_plan, 0)?);
        let right = output_ids(&*child_of(join_plan, 1)?);

        let mut hash = Vec::new();
        let mut other = Vec::new();
        for conjunct in &filter.conjuncts {
            let pair = conjunct
                .as_comparison()
                .filter(|c| c.op == ComparisonOp::Eq)
                .and_then(|c| c.slot_pair().map(|(a, b)| (c, a.id, b.id)));
            match pair {
                Some((_, a, b)) if left.contains(&a) && right.contains(&b) => {
                    hash.push(conjunct.clone())
                }
                Some((cmp, a, b)) if left.contains(&b) && right.contains(&a) => {
                    hash.push(Arc::new(Expression::Comparison(cmp.commute())))
                }
                _ => other.push(conjunct.clone()),
            }
        }

        let pushed = Join {
            join_type: JoinType::Inner,
            hash_conjuncts: merge_conjuncts(&join.hash_conjuncts, &hash),
            other_conjuncts: merge_conjuncts(&join.other_conjuncts, &other),
            ..join.clone()
        };
        Ok(vec![join_plan.with_node(PlanNode::LogicalJoin(pushed))?])
    }
}

/// Filter(slot = literal) over an inner join equating that slot with
/// another: add `other = literal` flagged inferred.
pub struct InferJoinPredicates;

impl Rule for InferJoinPredicates {
    fn rule_type(&self) -> RuleType {
        RuleType::INFER_JOIN_PREDICATES
    }

    fn pattern(&self) -> Pattern {
        filter_over_join()
    }

    fn check(&self, plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        matches!(inner_join_below(plan), Some((_, join)) if !join.hash_conjuncts.is_empty())
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        let (PlanNode::LogicalFilter(filter), Some((join_plan, join))) =
            (plan.node(), inner_join_below(plan))
        else {
            return Ok(vec![]);
        };

        let equalities: Vec<(&Slot, &Slot)> = join
            .hash_conjuncts
            .iter()
            .filter_map(|e| e.as_comparison())
            .filter(|c| c.op == ComparisonOp::Eq)
            .filter_map(|c| c.slot_pair())
            .collect();

        let mut inferred = Vec::new();
        for conjunct in filter.conjuncts.iter().filter(|c| !c.is_inferred()) {
            let Some((slot, literal)) = conjunct
                .as_comparison()
                .filter(|c| c.op == ComparisonOp::Eq)
                .and_then(|c| c.slot_literal())
            else {
                continue;
            };
            for (a, b) in &equalities {
                let target = if a.id == slot.id {
                    b
                } else if b.id == slot.id {
                    a
                } else {
                    continue;
                };
                let candidate: ExprRef = Arc::new(Expression::Comparison(
                    ComparisonPredicate::new(
                        ComparisonOp::Eq,
                        target.to_expr(),
                        Expression::literal(literal.clone()),
                    )
                    .with_inferred(true),
                ));
                if !filter.conjuncts.contains(&candidate) && !inferred.contains(&candidate) {
                    inferred.push(candidate);
                }
            }
        }

        if inferred.is_empty() {
            return Ok(vec![]);
        }
        let conjuncts = merge_conjuncts(&filter.conjuncts, &inferred);
        Ok(vec![Plan::filter(conjuncts, join_plan.clone())])
    }
}

/// Aggregate grouping on a key that is already unique in its input, and
/// outputting only grouping slots -> Project.
pub struct EliminateUniqueAggregate;

impl Rule for EliminateUniqueAggregate {
    fn rule_type(&self) -> RuleType {
        RuleType::ELIMINATE_UNIQUE_AGGREGATE
    }

    fn pattern(&self) -> Pattern {
        Pattern::new(PlanType::LogicalAggregate, vec![Pattern::any()])
    }

    fn check(&self, plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        let (PlanNode::LogicalAggregate(agg), Some(child)) = (plan.node(), plan.child(0)) else {
            return false;
        };
        let keys: Option<SlotSet> = agg
            .group_by
            .iter()
            .map(|e| e.as_slot().map(|s| s.id))
            .collect();
        let Some(keys) = keys.filter(|k| !k.is_empty()) else {
            return false;
        };
        let outputs_are_keys = agg.outputs.iter().all(|e| {
            let source = match e.as_ref() {
                Expression::Alias(a) => a.child.as_slot(),
                other => other.as_slot(),
            };
            source.is_some_and(|s| keys.contains(&s.id))
        });
        outputs_are_keys && child.logical_properties().fds.is_unique(&keys)
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        let PlanNode::LogicalAggregate(agg) = plan.node() else {
            return Ok(vec![]);
        };
        Ok(vec![Plan::project(agg.outputs.clone(), child_of(plan, 0)?)?])
    }
}

/// Scan of a table the catalog reports as having no partitions ->
/// EmptyRelation.
pub struct EliminateEmptyScan;

impl Rule for EliminateEmptyScan {
    fn rule_type(&self) -> RuleType {
        RuleType::ELIMINATE_EMPTY_SCAN
    }

    fn pattern(&self) -> Pattern {
        Pattern::leaf(PlanType::LogicalScan)
    }

    fn check(&self, plan: &Plan, ctx: &RuleContext<'_>) -> bool {
        match plan.node() {
            PlanNode::LogicalScan(scan) => ctx
                .catalog
                .layout(&scan.table)
                .is_some_and(|layout| layout.is_empty()),
            _ => false,
        }
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalScan(scan) => Ok(vec![Plan::empty_relation(scan.output.clone())]),
            _ => Ok(vec![]),
        }
    }
}

/// Join(A, B) -> Project(original order, Join(B, A)) for inner joins
pub struct JoinCommute;

impl Rule for JoinCommute {
    fn rule_type(&self) -> RuleType {
        RuleType::JOIN_COMMUTE
    }

    fn pattern(&self) -> Pattern {
        Pattern::new(PlanType::LogicalJoin, vec![Pattern::any(), Pattern::any()])
    }

    fn check(&self, plan: &Plan, _ctx: &RuleContext<'_>) -> bool {
        matches!(
            plan.node(),
            PlanNode::LogicalJoin(join) if join.join_type == JoinType::Inner && !join.is_mark_join()
        )
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        let PlanNode::LogicalJoin(join) = plan.node() else {
            return Ok(vec![]);
        };
        let swapped = Join {
            hash_conjuncts: commute_all(&join.hash_conjuncts),
            other_conjuncts: commute_all(&join.other_conjuncts),
            ..join.clone()
        };
        let swapped = Plan::new(
            PlanNode::LogicalJoin(swapped),
            vec![child_of(plan, 1)?, child_of(plan, 0)?],
        )?;
        let projects = plan.output().iter().map(Slot::to_expr).collect();
        Ok(vec![Plan::project(projects, swapped)?])
    }
}
