//! Visitor traits
//!
//! [`Expression::accept`] and [`Plan::accept`] route each variant to its own
//! method. Every per-kind method defaults to `visit`, so a visitor overrides
//! only the kinds it treats specially.

use crate::expr::{Alias, ComparisonPredicate, ExprRef, Expression, FunctionCall, Literal, Slot};
use crate::plan::{
    Aggregate, EmptyRelation, Filter, GroupPlan, Join, Limit, PhysicalScan, Plan, Project, Scan,
    SetOperation,
};

pub trait ExpressionVisitor<C> {
    type Output;

    /// Fallback for every kind not overridden.
    fn visit(&mut self, expr: &Expression, ctx: &mut C) -> Self::Output;

    fn visit_literal(&mut self, expr: &Expression, _literal: &Literal, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_slot(&mut self, expr: &Expression, _slot: &Slot, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_unbound_slot(&mut self, expr: &Expression, _name: &str, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_comparison(
        &mut self,
        expr: &Expression,
        _predicate: &ComparisonPredicate,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_and(&mut self, expr: &Expression, _conjuncts: &[ExprRef], ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_or(&mut self, expr: &Expression, _disjuncts: &[ExprRef], ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_not(&mut self, expr: &Expression, _child: &ExprRef, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_is_null(&mut self, expr: &Expression, _child: &ExprRef, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_function(&mut self, expr: &Expression, _call: &FunctionCall, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }

    fn visit_alias(&mut self, expr: &Expression, _alias: &Alias, ctx: &mut C) -> Self::Output {
        self.visit(expr, ctx)
    }
}

pub trait PlanVisitor<C> {
    type Output;

    fn visit(&mut self, plan: &Plan, ctx: &mut C) -> Self::Output;

    fn visit_logical_scan(&mut self, plan: &Plan, _scan: &Scan, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_empty_relation(
        &mut self,
        plan: &Plan,
        _empty: &EmptyRelation,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_filter(&mut self, plan: &Plan, _filter: &Filter, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_project(&mut self, plan: &Plan, _project: &Project, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_join(&mut self, plan: &Plan, _join: &Join, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_aggregate(
        &mut self,
        plan: &Plan,
        _aggregate: &Aggregate,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_set_operation(
        &mut self,
        plan: &Plan,
        _set_op: &SetOperation,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_logical_limit(&mut self, plan: &Plan, _limit: &Limit, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_scan(&mut self, plan: &Plan, _scan: &PhysicalScan, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_empty_relation(
        &mut self,
        plan: &Plan,
        _empty: &EmptyRelation,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_filter(&mut self, plan: &Plan, _filter: &Filter, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_project(&mut self, plan: &Plan, _project: &Project, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_hash_join(&mut self, plan: &Plan, _join: &Join, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_nested_loop_join(
        &mut self,
        plan: &Plan,
        _join: &Join,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_hash_aggregate(
        &mut self,
        plan: &Plan,
        _aggregate: &Aggregate,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_set_operation(
        &mut self,
        plan: &Plan,
        _set_op: &SetOperation,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_physical_limit(&mut self, plan: &Plan, _limit: &Limit, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    /// Stand-in for a memo group.
    fn visit_group(&mut self, plan: &Plan, _group: &GroupPlan, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }
}
