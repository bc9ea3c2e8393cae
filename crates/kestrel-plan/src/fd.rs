//! Functional dependency derivation
//!
//! [`FdDeriver`] computes a node's facts from its children's cached
//! properties. Each call owns a fresh [`FdBuilder`], so deriving twice over
//! the same children gives identical results.

use crate::expr::{ComparisonOp, ExprRef, Expression, Slot};
use crate::plan::{
    Aggregate, EmptyRelation, Filter, GroupPlan, Join, JoinType, Limit, PhysicalScan, Plan,
    Project, Qualifier, Scan, SetOperation, SetOperationKind,
};
use crate::properties::{FdBuilder, FdItem, FunctionalDependencies, SlotSet, UnionFind};
use crate::visitor::PlanVisitor;
use kestrel_common::SlotId;
use std::collections::BTreeMap;

/// Derive the facts of `plan` whose output is `output`.
pub fn derive(plan: &Plan, output: &[Slot]) -> FunctionalDependencies {
    plan.accept(&mut FdDeriver::new(output), &mut ())
}

pub struct FdDeriver<'a> {
    output: &'a [Slot],
}

impl<'a> FdDeriver<'a> {
    pub fn new(output: &'a [Slot]) -> Self {
        Self { output }
    }

    fn output_ids(&self) -> SlotSet {
        self.output.iter().map(|s| s.id).collect()
    }

    fn child_fds(plan: &Plan, index: usize) -> FunctionalDependencies {
        plan.child(index)
            .map(|c| c.logical_properties().fds.clone())
            .unwrap_or_default()
    }

    fn child_ids(plan: &Plan, index: usize) -> SlotSet {
        plan.child(index)
            .map(|c| c.logical_properties().output_ids().into_iter().collect())
            .unwrap_or_default()
    }

    fn scan(&self, scan: &Scan) -> FunctionalDependencies {
        let mut builder = FdBuilder::new();
        let all = self.output_ids();
        for key in &scan.unique_keys {
            let key: SlotSet = key.iter().copied().collect();
            builder.add_unique_set(key.iter().copied());
            builder.add_fd_item(FdItem::new(
                key.clone(),
                all.difference(&key).copied().collect(),
                true,
            ));
        }
        builder.build(self.output)
    }

    /// At most one row: every slot is constant and any slot set is unique.
    fn at_most_one_row(&self, builder: &mut FdBuilder) {
        for slot in self.output {
            builder.add_uniform_slot(slot.id);
        }
        builder.add_unique_set(std::iter::empty());
    }

    fn empty_relation(&self) -> FunctionalDependencies {
        let mut builder = FdBuilder::new();
        self.at_most_one_row(&mut builder);
        builder.build(self.output)
    }

    fn filter(&self, plan: &Plan, filter: &Filter) -> FunctionalDependencies {
        let mut builder = FdBuilder::new();
        builder.add_all_from(&Self::child_fds(plan, 0));
        for conjunct in &filter.conjuncts {
            let Some(cmp) = conjunct.as_comparison() else {
                continue;
            };
            if !cmp.op.is_equality() {
                continue;
            }
            if let Some((slot, _)) = cmp.slot_literal() {
                builder.add_uniform_slot(slot.id);
            } else if let Some((left, right)) = cmp.slot_pair() {
                builder.add_equal_pair(left.id, right.id);
            }
        }
        builder.build(self.output)
    }

    fn project(&self, plan: &Plan, project: &Project) -> FunctionalDependencies {
        let child = Self::child_fds(plan, 0);
        let mut mapping = SlotMapping::default();
        let mut builder = FdBuilder::new();
        for expr in &project.projects {
            match expr.as_ref() {
                Expression::Slot(s) => mapping.add(s.id, s.id),
                Expression::Alias(alias) => match alias.child.as_ref() {
                    Expression::Slot(src) => mapping.add(src.id, alias.slot.id),
                    other => {
                        let inputs = other.input_slots();
                        let constant = other.eval_constant().is_some()
                            || (!inputs.is_empty()
                                && inputs.iter().all(|s| child.is_uniform(s.id)));
                        if constant {
                            builder.add_uniform_slot(alias.slot.id);
                        }
                    }
                },
                _ => {}
            }
        }
        mapping.translate_all(&child, &mut builder);
        builder.build(self.output)
    }

    fn join(&self, plan: &Plan, join: &Join) -> FunctionalDependencies {
        let left = Self::child_fds(plan, 0);
        let right = Self::child_fds(plan, 1);
        let mut builder = FdBuilder::new();

        if join.is_mark_join() {
            builder.add_all_from(&left);
            return builder.build(self.output);
        }

        let (left_keys, right_keys) = hash_keys(
            &join.hash_conjuncts,
            &Self::child_ids(plan, 0),
            &Self::child_ids(plan, 1),
        );
        // each left row meets at most one right row, and symmetrically
        let right_unique_on_keys = right.is_unique(&right_keys);
        let left_unique_on_keys = left.is_unique(&left_keys);

        match join.join_type {
            JoinType::Inner | JoinType::Cross => {
                builder.add_uniform_from(&left);
                builder.add_uniform_from(&right);
                builder.add_equal_from(&left);
                builder.add_equal_from(&right);
                builder.add_fd_items_from(&left);
                builder.add_fd_items_from(&right);
                if join.join_type == JoinType::Inner {
                    for conjunct in &join.hash_conjuncts {
                        if let Some(cmp) = conjunct.as_comparison() {
                            if cmp.op == ComparisonOp::Eq {
                                if let Some((l, r)) = cmp.slot_pair() {
                                    builder.add_equal_pair(l.id, r.id);
                                }
                            }
                        }
                    }
                }
                if right_unique_on_keys {
                    builder.add_unique_from(&left);
                }
                if left_unique_on_keys {
                    builder.add_unique_from(&right);
                }
            }
            JoinType::LeftOuter => {
                builder.add_uniform_from(&left);
                builder.add_equal_from(&left);
                builder.add_fd_items_from(&left);
                if right_unique_on_keys {
                    builder.add_unique_from(&left);
                }
            }
            JoinType::RightOuter => {
                builder.add_uniform_from(&right);
                builder.add_equal_from(&right);
                builder.add_fd_items_from(&right);
                if left_unique_on_keys {
                    builder.add_unique_from(&right);
                }
            }
            JoinType::FullOuter => {}
            JoinType::LeftSemi | JoinType::LeftAnti | JoinType::NullAwareLeftAnti => {
                builder.add_all_from(&left);
            }
            JoinType::RightSemi | JoinType::RightAnti => {
                builder.add_all_from(&right);
            }
        }
        builder.build(self.output)
    }

    fn aggregate(&self, plan: &Plan, aggregate: &Aggregate) -> FunctionalDependencies {
        let child = Self::child_fds(plan, 0);
        let mut builder = FdBuilder::new();

        if aggregate.group_by.is_empty() {
            self.at_most_one_row(&mut builder);
            return builder.build(self.output);
        }

        let group_by: SlotSet = aggregate
            .group_by
            .iter()
            .filter_map(|e| e.as_slot().map(|s| s.id))
            .collect();
        let mut mapping = SlotMapping::default();
        for expr in &aggregate.outputs {
            let source = match expr.as_ref() {
                Expression::Slot(s) => Some((s.id, s.id)),
                Expression::Alias(a) => a.child.as_slot().map(|src| (src.id, a.slot.id)),
                _ => None,
            };
            if let Some((from, to)) = source.filter(|(from, _)| group_by.contains(from)) {
                mapping.add(from, to);
            }
        }

        let all_slots = group_by.len() == aggregate.group_by.len();
        if let Some(key) = mapping.translate_set(&group_by).filter(|_| all_slots) {
            builder.add_unique_set(key.iter().copied());
            builder.add_fd_item(FdItem::new(key, self.output_ids(), true));
        }
        mapping.translate_uniform(&child, &mut builder);
        mapping.translate_equal(&child, &mut builder);
        builder.build(self.output)
    }

    fn set_operation(&self, plan: &Plan, set_op: &SetOperation) -> FunctionalDependencies {
        let mut builder = FdBuilder::new();
        let distinct = set_op.qualifier == Qualifier::Distinct;
        if distinct {
            let all = self.output_ids();
            builder.add_unique_set(all.iter().copied());
            builder.add_fd_item(FdItem::new(all.clone(), all, true));
        }

        match set_op.kind {
            SetOperationKind::Union => {
                for class in union_equal_sets(plan, set_op) {
                    let mut members = class.iter();
                    if let Some(first) = members.next() {
                        for other in members {
                            builder.add_equal_pair(*first, *other);
                        }
                    }
                }
            }
            SetOperationKind::Intersect | SetOperationKind::Except => {
                let first = Self::child_fds(plan, 0);
                let mapping = positional_mapping(set_op, 0);
                mapping.translate_uniform(&first, &mut builder);
                for class in mapping.equal_classes(&first) {
                    let mut members = class.iter();
                    if let Some(head) = members.next() {
                        for other in members {
                            builder.add_equal_pair(*head, *other);
                        }
                    }
                }
            }
        }
        builder.build(self.output)
    }

    fn limit(&self, plan: &Plan, limit: &Limit) -> FunctionalDependencies {
        let mut builder = FdBuilder::new();
        builder.add_all_from(&Self::child_fds(plan, 0));
        if limit.limit <= 1 {
            self.at_most_one_row(&mut builder);
        }
        builder.build(self.output)
    }
}

/// Split hash conjuncts `l = r` into the key slots of each side.
fn hash_keys(conjuncts: &[ExprRef], left: &SlotSet, right: &SlotSet) -> (SlotSet, SlotSet) {
    let mut left_keys = SlotSet::new();
    let mut right_keys = SlotSet::new();
    for conjunct in conjuncts {
        let Some((a, b)) = conjunct
            .as_comparison()
            .filter(|c| c.op.is_equality())
            .and_then(|c| c.slot_pair())
        else {
            continue;
        };
        if left.contains(&a.id) && right.contains(&b.id) {
            left_keys.insert(a.id);
            right_keys.insert(b.id);
        } else if left.contains(&b.id) && right.contains(&a.id) {
            left_keys.insert(b.id);
            right_keys.insert(a.id);
        }
    }
    (left_keys, right_keys)
}

/// Child output position `i` feeds set-operation output position `i`.
fn positional_mapping(set_op: &SetOperation, child: usize) -> SlotMapping {
    let mut mapping = SlotMapping::default();
    if let Some(child_outputs) = set_op.children_outputs.get(child) {
        for (from, to) in child_outputs.iter().zip(&set_op.outputs) {
            mapping.add(from.id, to.id);
        }
    }
    mapping
}

/// Output equal classes every union branch agrees on.
///
/// The first branch seeds the running classes. A later branch narrows a
/// running class only when one of its classes is disjoint from it, which
/// empties the running class; overlapping classes leave it as is. A branch
/// with no classes empties them all. Classes with fewer than two members are
/// dropped at the end.
fn union_equal_sets(plan: &Plan, set_op: &SetOperation) -> Vec<SlotSet> {
    let mut running: Vec<SlotSet> = Vec::new();
    for index in 0..plan.children().len() {
        let child = FdDeriver::child_fds(plan, index);
        let classes = positional_mapping(set_op, index).equal_classes(&child);
        if index == 0 {
            running = classes;
            continue;
        }
        if classes.is_empty() {
            running.iter_mut().for_each(SlotSet::clear);
            continue;
        }
        for current in running.iter_mut() {
            for class in &classes {
                if current.is_disjoint(class) {
                    current.retain(|s| class.contains(s));
                }
            }
        }
    }
    running.into_iter().filter(|c| c.len() > 1).collect()
}

/// Child slot to the parent slots it is exposed as.
#[derive(Debug, Default)]
struct SlotMapping {
    targets: BTreeMap<SlotId, Vec<SlotId>>,
}

impl SlotMapping {
    fn add(&mut self, from: SlotId, to: SlotId) {
        let targets = self.targets.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    fn targets(&self, from: &SlotId) -> &[SlotId] {
        self.targets.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First target of every member, or `None` if one is not exposed.
    fn translate_set(&self, set: &SlotSet) -> Option<SlotSet> {
        set.iter()
            .map(|s| self.targets(s).first().copied())
            .collect()
    }

    fn translate_uniform(&self, fds: &FunctionalDependencies, builder: &mut FdBuilder) {
        for slot in fds.uniform_slots() {
            for target in self.targets(slot) {
                builder.add_uniform_slot(*target);
            }
        }
    }

    fn translate_equal(&self, fds: &FunctionalDependencies, builder: &mut FdBuilder) {
        for class in self.equal_classes(fds) {
            let mut members = class.iter();
            if let Some(first) = members.next() {
                for other in members {
                    builder.add_equal_pair(*first, *other);
                }
            }
        }
    }

    /// Child equal classes in parent slots, including parent slots exposing
    /// the same child slot.
    fn equal_classes(&self, fds: &FunctionalDependencies) -> Vec<SlotSet> {
        let mut uf = UnionFind::new();
        for targets in self.targets.values() {
            for pair in targets.windows(2) {
                uf.add(pair[0], pair[1]);
            }
        }
        for class in fds.all_equal_sets() {
            let exposed: Vec<SlotId> = class
                .iter()
                .flat_map(|s| self.targets(s).iter().copied())
                .collect();
            for pair in exposed.windows(2) {
                uf.add(pair[0], pair[1]);
            }
        }
        uf.classes()
    }

    fn translate_all(&self, fds: &FunctionalDependencies, builder: &mut FdBuilder) {
        self.translate_uniform(fds, builder);
        self.translate_equal(fds, builder);
        for unique in fds.unique_sets() {
            if let Some(set) = self.translate_set(unique) {
                builder.add_unique_set(set);
            }
        }
        for item in fds.fd_items() {
            let Some(determinants) = self.translate_set(&item.determinants) else {
                continue;
            };
            let dependents: SlotSet = item
                .dependents
                .iter()
                .flat_map(|s| self.targets(s).iter().copied())
                .collect();
            builder.add_fd_item(FdItem::new(determinants, dependents, item.is_unique));
        }
    }
}

impl PlanVisitor<()> for FdDeriver<'_> {
    type Output = FunctionalDependencies;

    fn visit(&mut self, _plan: &Plan, _ctx: &mut ()) -> FunctionalDependencies {
        FunctionalDependencies::empty()
    }

    fn visit_logical_scan(&mut self, _plan: &Plan, scan: &Scan, _ctx: &mut ()) -> FunctionalDependencies {
        self.scan(scan)
    }

    fn visit_physical_scan(
        &mut self,
        _plan: &Plan,
        scan: &PhysicalScan,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.scan(&scan.scan)
    }

    fn visit_logical_empty_relation(
        &mut self,
        _plan: &Plan,
        _empty: &EmptyRelation,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.empty_relation()
    }

    fn visit_physical_empty_relation(
        &mut self,
        _plan: &Plan,
        _empty: &EmptyRelation,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.empty_relation()
    }

    fn visit_logical_filter(&mut self, plan: &Plan, filter: &Filter, _ctx: &mut ()) -> FunctionalDependencies {
        self.filter(plan, filter)
    }

    fn visit_physical_filter(&mut self, plan: &Plan, filter: &Filter, _ctx: &mut ()) -> FunctionalDependencies {
        self.filter(plan, filter)
    }

    fn visit_logical_project(
        &mut self,
        plan: &Plan,
        project: &Project,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.project(plan, project)
    }

    fn visit_physical_project(
        &mut self,
        plan: &Plan,
        project: &Project,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.project(plan, project)
    }

    fn visit_logical_join(&mut self, plan: &Plan, join: &Join, _ctx: &mut ()) -> FunctionalDependencies {
        self.join(plan, join)
    }

    fn visit_physical_hash_join(&mut self, plan: &Plan, join: &Join, _ctx: &mut ()) -> FunctionalDependencies {
        self.join(plan, join)
    }

    fn visit_physical_nested_loop_join(
        &mut self,
        plan: &Plan,
        join: &Join,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.join(plan, join)
    }

    fn visit_logical_aggregate(
        &mut self,
        plan: &Plan,
        aggregate: &Aggregate,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.aggregate(plan, aggregate)
    }

    fn visit_physical_hash_aggregate(
        &mut self,
        plan: &Plan,
        aggregate: &Aggregate,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.aggregate(plan, aggregate)
    }

    fn visit_logical_set_operation(
        &mut self,
        plan: &Plan,
        set_op: &SetOperation,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.set_operation(plan, set_op)
    }

    fn visit_physical_set_operation(
        &mut self,
        plan: &Plan,
        set_op: &SetOperation,
        _ctx: &mut (),
    ) -> FunctionalDependencies {
        self.set_operation(plan, set_op)
    }

    fn visit_logical_limit(&mut self, plan: &Plan, limit: &Limit, _ctx: &mut ()) -> FunctionalDependencies {
        self.limit(plan, limit)
    }

    fn visit_physical_limit(&mut self, plan: &Plan, limit: &Limit, _ctx: &mut ()) -> FunctionalDependencies {
        self.limit(plan, limit)
    }

    fn visit_group(&mut self, _plan: &Plan, group: &GroupPlan, _ctx: &mut ()) -> FunctionalDependencies {
        group.properties.fds.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanRef;
    use arrow_schema::DataType;

    fn slot(id: u32) -> Slot {
        Slot::new(id, format!("c{}", id), DataType::Int64, false)
    }

    fn slots(ids: &[u32]) -> Vec<Slot> {
        ids.iter().map(|i| slot(*i)).collect()
    }

    fn set(ids: &[u32]) -> SlotSet {
        ids.iter().map(|i| SlotId(*i)).collect()
    }

    fn scan(table: &str, ids: &[u32]) -> PlanRef {
        Plan::scan(table, slots(ids))
    }

    fn eq(a: u32, b: u32) -> ExprRef {
        Expression::eq(slot(a).to_expr(), slot(b).to_expr())
    }

    fn eq_lit(a: u32, v: i64) -> ExprRef {
        Expression::eq(slot(a).to_expr(), Expression::int(v))
    }

    /// Rows unique on `key`, with `uniform` pinned to a constant.
    fn keyed(table: &str, ids: &[u32], key: u32, uniform: u32) -> PlanRef {
        Plan::filter(
            vec![eq_lit(uniform, 0)],
            Plan::scan_with_keys(table, slots(ids), vec![vec![SlotId(key)]]),
        )
    }

    fn union(qualifier: Qualifier, outputs: &[u32], children: Vec<PlanRef>) -> PlanRef {
        set_operation(SetOperationKind::Union, qualifier, outputs, children)
    }

    fn set_operation(
        kind: SetOperationKind,
        qualifier: Qualifier,
        outputs: &[u32],
        children: Vec<PlanRef>,
    ) -> PlanRef {
        let children_outputs = children.iter().map(|c| c.output()).collect();
        Plan::set_operation(
            SetOperation {
                kind,
                qualifier,
                outputs: slots(outputs),
                children_outputs,
            },
            children,
        )
        .unwrap()
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let plan = Plan::filter(
            vec![
                eq(1, 2),
                Expression::eq(slot(3).to_expr(), Expression::int(7)),
            ],
            Plan::scan_with_keys("t", slots(&[1, 2, 3]), vec![vec![SlotId(1)]]),
        );
        let output = plan.output();
        let first = derive(&plan, &output);
        let second = derive(&plan, &output);
        assert_eq!(first, second);
        assert_eq!(first, plan.logical_properties().fds);
        assert_eq!(first.unique_sets(), second.unique_sets());
        assert_eq!(first.equal_pairs(), second.equal_pairs());
        assert_eq!(first.fd_items(), second.fd_items());
    }

    #[test]
    fn test_scan_unique_keys() {
        let plan = Plan::scan_with_keys("t", slots(&[1, 2]), vec![vec![SlotId(1)]]);
        let fds = &plan.logical_properties().fds;
        assert!(fds.is_unique(&set(&[1])));
        assert!(!fds.is_unique(&set(&[2])));
        let item = fds.fd_items().iter().next().unwrap();
        assert_eq!(item.determinants, set(&[1]));
        assert_eq!(item.dependents, set(&[2]));
        assert!(item.is_unique);
    }

    #[test]
    fn test_filter_uniform_and_equal() {
        let plan = Plan::filter(
            vec![
                eq(1, 2),
                Expression::eq(Expression::int(3), slot(2).to_expr()),
            ],
            scan("t", &[1, 2, 3]),
        );
        let fds = &plan.logical_properties().fds;
        assert!(fds.is_equal(SlotId(1), SlotId(2)));
        assert!(fds.is_uniform(SlotId(2)));
        // uniformity is shared by the equal class
        assert!(fds.is_uniform(SlotId(1)));
        assert!(!fds.is_uniform(SlotId(3)));
    }

    #[test]
    fn test_distinct_union_is_unique() {
        let distinct = union(
            Qualifier::Distinct,
            &[10, 11],
            vec![scan("a", &[1, 2]), scan("b", &[3, 4])],
        );
        let fds = &distinct.logical_properties().fds;
        assert!(fds.is_unique(&set(&[10, 11])));
        assert!(!fds.is_unique(&set(&[10])));
        assert!(fds
            .fd_items()
            .iter()
            .any(|i| i.is_unique && i.determinants == set(&[10, 11])));

        let all = union(
            Qualifier::All,
            &[10, 11],
            vec![scan("a", &[1, 2]), scan("b", &[3, 4])],
        );
        let fds = &all.logical_properties().fds;
        assert!(fds.unique_sets().is_empty());
        assert!(fds.fd_items().is_empty());
    }

    #[test]
    fn test_union_all_drops_uniform_slots() {
        let a = Plan::filter(
            vec![Expression::eq(slot(1).to_expr(), Expression::int(1))],
            scan("a", &[1]),
        );
        let b = Plan::filter(
            vec![Expression::eq(slot(2).to_expr(), Expression::int(2))],
            scan("b", &[2]),
        );
        let plan = union(Qualifier::All, &[10], vec![a, b]);
        assert!(plan.logical_properties().fds.uniform_slots().is_empty());
    }

    #[test]
    fn test_union_equality_requires_every_child() {
        let a = Plan::filter(vec![eq(1, 2)], scan("a", &[1, 2, 3]));
        let b = Plan::filter(vec![eq(4, 5), eq(5, 6)], scan("b", &[4, 5, 6]));
        let c = scan("c", &[7, 8, 9]);

        let two = union(Qualifier::All, &[10, 11, 12], vec![a.clone(), b.clone()]);
        assert!(two.logical_properties().fds.is_equal(SlotId(10), SlotId(11)));

        let three = union(Qualifier::All, &[10, 11, 12], vec![a, b, c]);
        let fds = &three.logical_properties().fds;
        assert!(!fds.is_equal(SlotId(10), SlotId(11)));
        assert!(fds.all_equal_sets().is_empty());
    }

    #[test]
    fn test_union_disjoint_class_empties_running_class() {
        let a = Plan::filter(vec![eq(1, 2)], scan("a", &[1, 2, 3, 4]));
        let b = Plan::filter(vec![eq(7, 8)], scan("b", &[5, 6, 7, 8]));
        let plan = union(Qualifier::All, &[10, 11, 12, 13], vec![a, b]);
        assert!(plan.logical_properties().fds.all_equal_sets().is_empty());
    }

    #[test]
    fn test_union_overlapping_class_is_kept() {
        let a = Plan::filter(vec![eq(1, 2)], scan("a", &[1, 2, 3]));
        let b = Plan::filter(vec![eq(5, 6)], scan("b", &[4, 5, 6]));
        let c = Plan::filter(vec![eq(7, 8), eq(8, 9)], scan("c", &[7, 8, 9]));
        let plan = union(Qualifier::All, &[10, 11, 12], vec![a, c.clone()]);
        assert_eq!(
            plan.logical_properties().fds.all_equal_sets(),
            vec![set(&[10, 11])]
        );
        let plan = union(Qualifier::All, &[10, 11, 12], vec![c, b]);
        // {10, 11, 12} overlaps b's {11, 12} and is retained unchanged
        assert_eq!(
            plan.logical_properties().fds.all_equal_sets(),
            vec![set(&[10, 11, 12])]
        );
    }

    #[test]
    fn test_inner_join_facts() {
        let left = Plan::scan_with_keys("a", slots(&[1, 2]), vec![vec![SlotId(1)]]);
        let right = Plan::scan_with_keys("b", slots(&[3, 4]), vec![vec![SlotId(3)]]);
        let join = Plan::join(
            Join::new(JoinType::Inner).with_hash_conjuncts(vec![eq(2, 3)]),
            left.clone(),
            right.clone(),
        );
        let fds = &join.logical_properties().fds;
        assert!(fds.is_equal(SlotId(2), SlotId(3)));
        // right is unique on its key, so left rows are not duplicated
        assert!(fds.is_unique(&set(&[1])));
        assert!(!fds.is_unique(&set(&[3])));

        let outer = Plan::join(
            Join::new(JoinType::LeftOuter).with_hash_conjuncts(vec![eq(2, 3)]),
            left,
            right,
        );
        let fds = &outer.logical_properties().fds;
        assert!(fds.is_unique(&set(&[1])));
        assert!(!fds.is_equal(SlotId(2), SlotId(3)));
    }

    #[test]
    fn test_right_outer_keeps_preserved_side() {
        let join = Plan::join(
            Join::new(JoinType::RightOuter).with_hash_conjuncts(vec![eq(1, 3)]),
            keyed("a", &[1, 2], 1, 2),
            keyed("b", &[3, 4], 3, 4),
        );
        let fds = &join.logical_properties().fds;
        assert!(fds.is_uniform(SlotId(4)));
        assert!(!fds.is_uniform(SlotId(2)));
        // left is unique on the join key, so right rows are not duplicated
        assert!(fds.is_unique(&set(&[3])));
        assert!(!fds.is_unique(&set(&[1])));
        assert!(!fds.is_equal(SlotId(1), SlotId(3)));
    }

    #[test]
    fn test_full_outer_keeps_nothing() {
        let join = Plan::join(
            Join::new(JoinType::FullOuter).with_hash_conjuncts(vec![eq(1, 3)]),
            keyed("a", &[1, 2], 1, 2),
            keyed("b", &[3, 4], 3, 4),
        );
        assert!(join.logical_properties().fds.is_empty());
    }

    #[test]
    fn test_semi_and_anti_keep_the_kept_side() {
        let semi = Plan::join(
            Join::new(JoinType::LeftSemi).with_hash_conjuncts(vec![eq(1, 3)]),
            keyed("a", &[1, 2], 1, 2),
            keyed("b", &[3, 4], 3, 4),
        );
        let fds = &semi.logical_properties().fds;
        assert_eq!(semi.output().len(), 2);
        assert!(fds.is_unique(&set(&[1])));
        assert!(fds.is_uniform(SlotId(2)));

        let anti = Plan::join(
            Join::new(JoinType::RightAnti).with_other_conjuncts(vec![eq(2, 4)]),
            keyed("a", &[1, 2], 1, 2),
            keyed("b", &[3, 4], 3, 4),
        );
        let fds = &anti.logical_properties().fds;
        assert!(fds.is_unique(&set(&[3])));
        assert!(fds.is_uniform(SlotId(4)));
        assert!(!fds.is_uniform(SlotId(2)));
    }

    #[test]
    fn test_mark_join_keeps_left_side() {
        let mark = Slot::new(9, "mark", DataType::Boolean, false);
        let join = Plan::join(
            Join::new(JoinType::LeftSemi).with_mark(mark, vec![eq(1, 3)]),
            keyed("a", &[1, 2], 1, 2),
            keyed("b", &[3, 4], 3, 4),
        );
        let fds = &join.logical_properties().fds;
        assert_eq!(
            join.logical_properties().output_ids(),
            vec![SlotId(1), SlotId(2), SlotId(9)]
        );
        assert!(fds.is_unique(&set(&[1])));
        assert!(fds.is_uniform(SlotId(2)));
        assert!(!fds.is_uniform(SlotId(9)));
        assert!(!fds.is_equal(SlotId(1), SlotId(3)));
    }

    #[test]
    fn test_non_equality_hash_conjunct_is_not_a_key() {
        let join = Plan::join(
            Join::new(JoinType::Inner).with_hash_conjuncts(vec![Expression::lt(
                slot(1).to_expr(),
                slot(3).to_expr(),
            )]),
            Plan::scan_with_keys("a", slots(&[1, 2]), vec![vec![SlotId(1)]]),
            Plan::scan_with_keys("b", slots(&[3, 4]), vec![vec![SlotId(3)]]),
        );
        let fds = &join.logical_properties().fds;
        assert!(fds.unique_sets().is_empty());
        assert!(!fds.is_equal(SlotId(1), SlotId(3)));
    }

    #[test]
    fn test_intersect_and_except_follow_first_child() {
        let first = || Plan::filter(vec![eq(1, 2), eq_lit(3, 0)], scan("a", &[1, 2, 3]));
        let second = || scan("b", &[4, 5, 6]);

        let distinct = set_operation(
            SetOperationKind::Intersect,
            Qualifier::Distinct,
            &[10, 11, 12],
            vec![first(), second()],
        );
        let fds = &distinct.logical_properties().fds;
        assert!(fds.is_equal(SlotId(10), SlotId(11)));
        assert!(fds.is_uniform(SlotId(12)));
        assert!(fds.is_unique(&set(&[10, 11, 12])));

        let all = set_operation(
            SetOperationKind::Intersect,
            Qualifier::All,
            &[10, 11, 12],
            vec![first(), second()],
        );
        let fds = &all.logical_properties().fds;
        assert!(fds.unique_sets().is_empty());
        assert!(fds.fd_items().is_empty());
        assert!(fds.is_equal(SlotId(10), SlotId(11)));
        assert!(fds.is_uniform(SlotId(12)));

        // only the first child's facts count
        let except = set_operation(
            SetOperationKind::Except,
            Qualifier::Distinct,
            &[10, 11, 12],
            vec![second(), first()],
        );
        let fds = &except.logical_properties().fds;
        assert!(fds.all_equal_sets().is_empty());
        assert!(fds.uniform_slots().is_empty());
        assert!(fds.is_unique(&set(&[10, 11, 12])));
    }

    #[test]
    fn test_aggregate_group_by_unique() {
        let agg = Plan::aggregate(
            vec![slot(1).to_expr()],
            vec![
                slot(1).to_expr(),
                Expression::alias(
                    Expression::function(
                        "sum",
                        vec![slot(2).to_expr()],
                        DataType::Int64,
                        crate::expr::FunctionNullability::Always,
                    ),
                    slot(5),
                ),
            ],
            scan("t", &[1, 2]),
        )
        .unwrap();
        let fds = &agg.logical_properties().fds;
        assert!(fds.is_unique(&set(&[1])));
        let item = fds.fd_items().iter().next().unwrap();
        assert_eq!(item.dependents, set(&[1, 5]));

        let scalar = Plan::aggregate(vec![], vec![Expression::alias(Expression::int(1), slot(6))], scan("t", &[1]))
            .unwrap();
        let fds = &scalar.logical_properties().fds;
        assert!(fds.is_uniform(SlotId(6)));
        assert!(fds.is_unique(&SlotSet::new()));
    }

    #[test]
    fn test_project_translates_through_alias() {
        let child = Plan::filter(
            vec![Expression::eq(slot(2).to_expr(), Expression::int(0))],
            Plan::scan_with_keys("t", slots(&[1, 2]), vec![vec![SlotId(1)]]),
        );
        let project = Plan::project(
            vec![
                Expression::alias(slot(1).to_expr(), slot(10)),
                Expression::alias(slot(2).to_expr(), slot(11)),
                Expression::alias(slot(2).to_expr(), slot(12)),
            ],
            child,
        )
        .unwrap();
        let fds = &project.logical_properties().fds;
        assert!(fds.is_unique(&set(&[10])));
        assert!(fds.is_uniform(SlotId(11)));
        assert!(fds.is_equal(SlotId(11), SlotId(12)));
    }

    #[test]
    fn test_limit_one_row() {
        let plan = Plan::limit(1, 0, scan("t", &[1, 2]));
        let fds = &plan.logical_properties().fds;
        assert!(fds.is_uniform(SlotId(1)));
        assert!(fds.is_unique(&set(&[2])));
    }
}
