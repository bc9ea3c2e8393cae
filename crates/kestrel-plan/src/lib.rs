//! Kestrel Plan - expression and plan algebra

pub mod expr;
pub mod fd;
pub mod plan;
pub mod properties;
pub mod visitor;

pub use expr::{
    and_all, split_conjuncts, Alias, ComparisonOp, ComparisonPredicate, ExprRef, Expression,
    FunctionCall, FunctionNullability, Literal, Slot,
};
pub use fd::FdDeriver;
pub use plan::{
    Aggregate, Distribution, EmptyRelation, Filter, GroupPlan, Join, JoinType, Limit,
    PhysicalScan, Plan, PlanNode, PlanRef, PlanType, Project, Qualifier, Scan, SetOperation,
    SetOperationKind,
};
pub use properties::{FdBuilder, FdItem, FunctionalDependencies, LogicalProperties, SlotSet};
pub use visitor::{ExpressionVisitor, PlanVisitor};
