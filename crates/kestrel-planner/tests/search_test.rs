//! End-to-end search tests

use arrow_schema::DataType;
use kestrel_catalog::{InMemoryCatalog, NoLayout, Partitioning, TableLayout};
use kestrel_common::{GroupId, OptimizerConfig, Result};
use kestrel_plan::{
    ExprRef, Expression, Join, JoinType, Plan, PlanNode, PlanRef, PlanType, Qualifier,
    SetOperation, SetOperationKind, Slot,
};
use kestrel_planner::{
    default_rules, Optimizer, Pattern, Rule, RuleCategory, RuleContext, RuleType, StopReason,
};
use std::sync::Arc;
use std::time::Duration;

fn slot(id: u32) -> Slot {
    Slot::new(id, format!("c{}", id), DataType::Int64, false)
}

fn scan(table: &str, ids: &[u32]) -> PlanRef {
    Plan::scan(table, ids.iter().map(|i| slot(*i)).collect())
}

fn eq(a: u32, b: u32) -> ExprRef {
    Expression::eq(slot(a).to_expr(), slot(b).to_expr())
}

fn eq_lit(a: u32, v: i64) -> ExprRef {
    Expression::eq(slot(a).to_expr(), Expression::int(v))
}

fn default_optimizer() -> Optimizer {
    Optimizer::new(OptimizerConfig::default(), Arc::new(NoLayout)).unwrap()
}

fn kinds(opt: &Optimizer, group: GroupId) -> Vec<PlanType> {
    opt.memo()
        .group_expressions(group)
        .iter()
        .map(|e| e.plan.plan_type())
        .collect()
}

/// Limit(n) -> Limit(n + 1), never reaching a fixpoint
struct GrowLimit;

impl Rule for GrowLimit {
    fn rule_type(&self) -> RuleType {
        RuleType::rewrite(40, "GrowLimit")
    }

    fn pattern(&self) -> Pattern {
        Pattern::new(PlanType::LogicalLimit, vec![Pattern::any()])
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
        match plan.node() {
            PlanNode::LogicalLimit(limit) => Ok(vec![Plan::limit(
                limit.limit + 1,
                limit.offset,
                plan.children()[0].clone(),
            )]),
            _ => Ok(vec![]),
        }
    }
}

#[test]
fn test_shared_subtrees_share_a_group() {
    let union = SetOperation {
        kind: SetOperationKind::Union,
        qualifier: Qualifier::All,
        outputs: vec![slot(10)],
        children_outputs: vec![vec![slot(1)], vec![slot(1)]],
    };
    let plan = Plan::set_operation(union, vec![scan("t", &[1]), scan("t", &[1])]).unwrap();

    let mut opt = default_optimizer();
    let outcome = opt.run(&plan).unwrap();
    let root = opt.memo().group_expressions(outcome.root)[0];
    assert_eq!(root.children[0], root.children[1]);

    // one scan group, one union group
    assert_eq!(outcome.groups, 2);
}

#[test]
fn test_nested_loop_join_keeps_every_conjunct() {
    let join = Join::new(JoinType::LeftSemi)
        .with_other_conjuncts(vec![Expression::lt(slot(1).to_expr(), slot(2).to_expr())])
        .with_mark(
            Slot::new(9, "mark", DataType::Boolean, false),
            vec![eq(1, 2)],
        );
    let plan = Plan::join(join.clone(), scan("a", &[1]), scan("b", &[2]));

    let mut opt = default_optimizer();
    let outcome = opt.run(&plan).unwrap();
    let group = opt.memo().group(outcome.root).unwrap();
    assert_eq!(group.physical_expressions.len(), 1);

    let logical = opt.memo().expression(group.logical_expressions[0]).unwrap();
    let physical = opt.memo().expression(group.physical_expressions[0]).unwrap();
    match physical.plan.node() {
        PlanNode::PhysicalNestedLoopJoin(payload) => assert_eq!(payload, &join),
        other => panic!("expected a nested-loop join, got {}", other),
    }
    assert_eq!(physical.children, logical.children);
}

#[test]
fn test_hash_join_chosen_for_equalities() {
    let join = Join::new(JoinType::Inner).with_hash_conjuncts(vec![eq(1, 2)]);
    let plan = Plan::join(join, scan("a", &[1]), scan("b", &[2]));

    let mut opt = default_optimizer();
    let outcome = opt.run(&plan).unwrap();
    let kinds = kinds(&opt, outcome.root);
    assert!(kinds.contains(&PlanType::PhysicalHashJoin));
    assert!(!kinds.contains(&PlanType::PhysicalNestedLoopJoin));
    // the commuted alternative restores the original column order
    assert!(kinds.contains(&PlanType::LogicalProject));
    assert!(opt.memo().extract_physical(outcome.root).is_some());
}

#[test]
fn test_rewrites_reach_fixpoint() {
    let plan = Plan::filter(
        vec![eq(1, 2), eq_lit(1, 5)],
        Plan::join(Join::new(JoinType::Cross), scan("a", &[1]), scan("b", &[2])),
    );

    let mut opt = default_optimizer();
    let outcome = opt.run(&plan).unwrap();
    assert!(outcome.converged);
    assert_eq!(outcome.stop_reason, StopReason::Fixpoint);
    assert!(outcome.passes < OptimizerConfig::default().max_rewrite_passes);

    // the filter was pushed into an inner join with a hash equality
    let root = opt.memo().group(outcome.root).unwrap();
    let pushed = root.logical_expressions.iter().any(|id| {
        matches!(
            opt.memo().expression(*id).unwrap().plan.node(),
            PlanNode::LogicalJoin(join)
                if join.join_type == JoinType::Inner && join.hash_conjuncts == vec![eq(1, 2)]
        )
    });
    assert!(pushed);

    // another sweep of every rule adds nothing
    let expressions = opt.memo().expression_count();
    for rule in default_rules() {
        for group in 0..opt.memo().group_count() {
            assert!(!opt.apply_rule(rule.as_ref(), GroupId(group)).unwrap());
        }
    }
    assert_eq!(opt.memo().expression_count(), expressions);
    opt.memo().validate().unwrap();
}

#[test]
fn test_inferred_predicate_added_once() {
    let join = Join::new(JoinType::Inner).with_hash_conjuncts(vec![eq(1, 2)]);
    let plan = Plan::filter(
        vec![eq_lit(1, 5)],
        Plan::join(join, scan("a", &[1]), scan("b", &[2])),
    );

    let mut opt = default_optimizer();
    let outcome = opt.run(&plan).unwrap();
    assert!(outcome.converged);

    let filters: Vec<_> = opt
        .memo()
        .group_expressions(outcome.root)
        .into_iter()
        .filter_map(|e| match e.plan.node() {
            PlanNode::LogicalFilter(filter) => Some(filter.conjuncts.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(filters.len(), 2);
    assert!(filters.iter().any(|c| c.len() == 2 && c[1].is_inferred()));
}

#[test]
fn test_cyclic_rule_stopped_by_pass_budget() {
    let config = OptimizerConfig::default().with_max_rewrite_passes(5);
    let mut opt =
        Optimizer::with_rules(config, Arc::new(NoLayout), vec![Arc::new(GrowLimit)]).unwrap();
    let outcome = opt.run(&Plan::limit(1, 0, scan("t", &[1]))).unwrap();

    assert!(!outcome.converged);
    assert_eq!(outcome.stop_reason, StopReason::PassBudget);
    assert_eq!(outcome.passes, 5);
    assert_eq!(opt.memo().group(outcome.root).unwrap().len(), 6);
}

#[test]
fn test_deadline_skips_search() {
    let config = OptimizerConfig::default().with_timeout(Duration::ZERO);
    let mut opt = Optimizer::new(config, Arc::new(NoLayout)).unwrap();
    let plan = Plan::filter(vec![eq_lit(1, 1)], scan("t", &[1]));
    let outcome = opt.run(&plan).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Deadline);
    assert_eq!(outcome.expressions, 2);
    assert_eq!(opt.memo().extract_logical(outcome.root), Some(plan));
    opt.memo().validate().unwrap();
}

#[test]
fn test_empty_table_becomes_empty_relation() {
    let catalog = InMemoryCatalog::new();
    catalog
        .register_table("empty", TableLayout::new(Partitioning::Unknown, 0))
        .unwrap();
    let mut opt = Optimizer::new(OptimizerConfig::default(), Arc::new(catalog)).unwrap();
    let outcome = opt.run(&scan("empty", &[1])).unwrap();

    let kinds = kinds(&opt, outcome.root);
    assert!(kinds.contains(&PlanType::LogicalEmptyRelation));
    assert!(kinds.contains(&PlanType::PhysicalEmptyRelation));
    assert!(kinds.contains(&PlanType::PhysicalScan));
}

#[test]
fn test_populated_table_keeps_its_scan() {
    let catalog = InMemoryCatalog::new();
    catalog
        .register_table("full", TableLayout::new(Partitioning::Random, 4))
        .unwrap();
    let mut opt = Optimizer::new(OptimizerConfig::default(), Arc::new(catalog)).unwrap();
    let outcome = opt.run(&scan("full", &[1])).unwrap();

    assert_eq!(
        kinds(&opt, outcome.root),
        vec![PlanType::LogicalScan, PlanType::PhysicalScan]
    );
}

#[test]
fn test_disabled_rule_is_skipped() {
    let catalog = InMemoryCatalog::new();
    catalog
        .register_table("empty", TableLayout::new(Partitioning::Unknown, 0))
        .unwrap();
    let config = OptimizerConfig::default().disable_rule("EliminateEmptyScan");
    let mut opt = Optimizer::new(config, Arc::new(catalog)).unwrap();
    let outcome = opt.run(&scan("empty", &[1])).unwrap();

    assert!(!kinds(&opt, outcome.root).contains(&PlanType::LogicalEmptyRelation));
}

#[test]
fn test_unique_aggregate_removed() {
    let child = Plan::scan_with_keys(
        "t",
        vec![slot(1), slot(2)],
        vec![vec![kestrel_common::SlotId(1)]],
    );
    let plan = Plan::aggregate(vec![slot(1).to_expr()], vec![slot(1).to_expr()], child).unwrap();

    let mut opt = default_optimizer();
    let outcome = opt.run(&plan).unwrap();
    let kinds = kinds(&opt, outcome.root);
    assert!(kinds.contains(&PlanType::LogicalProject));
    assert!(kinds.contains(&PlanType::PhysicalProject));
    assert!(kinds.contains(&PlanType::PhysicalHashAggregate));
}

#[test]
fn test_every_default_rule_is_categorized() {
    let rules = default_rules();
    let rewrites = rules
        .iter()
        .filter(|r| r.category() == RuleCategory::Rewrite)
        .count();
    assert_eq!(rewrites, 6);
    assert_eq!(rules.len() - rewrites, 9);
}
