//! Rule patterns
//!
//! A pattern is a bounded-depth shape matched top-down. Child patterns that
//! name an operator kind are bound against the expressions of the child
//! group; `Any` and `Group` children stay as group leaves.

use kestrel_plan::{Plan, PlanType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Matches any node without looking below it
    Any,
    /// Matches only a memo group leaf
    Group,
    Plan(PlanType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub kind: PatternKind,
    /// Empty means the children are not constrained
    pub children: Vec<Pattern>,
}

impl Pattern {
    pub fn new(plan_type: PlanType, children: Vec<Pattern>) -> Self {
        Self {
            kind: PatternKind::Plan(plan_type),
            children,
        }
    }

    /// Operator kind with unconstrained children.
    pub fn leaf(plan_type: PlanType) -> Self {
        Self::new(plan_type, vec![])
    }

    pub fn any() -> Self {
        Self {
            kind: PatternKind::Any,
            children: vec![],
        }
    }

    pub fn group() -> Self {
        Self {
            kind: PatternKind::Group,
            children: vec![],
        }
    }

    /// Whether the root of `plan` has the kind this pattern names.
    pub fn matches_node(&self, plan: &Plan) -> bool {
        match self.kind {
            PatternKind::Any => true,
            PatternKind::Group => plan.plan_type() == PlanType::Group,
            PatternKind::Plan(plan_type) => plan.plan_type() == plan_type,
        }
    }

    /// Full structural match against a concrete tree.
    pub fn matches(&self, plan: &Plan) -> bool {
        if !self.matches_node(plan) {
            return false;
        }
        if self.children.is_empty() {
            return true;
        }
        self.children.len() == plan.children().len()
            && self
                .children
                .iter()
                .zip(plan.children())
                .all(|(pattern, child)| pattern.matches(child))
    }

    /// No child pattern binds a child group's expressions, so a match
    /// depends only on the root expression.
    pub fn is_shallow(&self) -> bool {
        self.children
            .iter()
            .all(|c| matches!(c.kind, PatternKind::Any | PatternKind::Group))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PatternKind::Any => write!(f, "*")?,
            PatternKind::Group => write!(f, "Group")?,
            PatternKind::Plan(plan_type) => write!(f, "{}", plan_type)?,
        }
        if !self.children.is_empty() {
            let children: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
            write!(f, "({})", children.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::DataType;
    use kestrel_plan::{Expression, Slot};

    fn scan() -> kestrel_plan::PlanRef {
        Plan::scan("t", vec![Slot::new(1, "a", DataType::Int64, false)])
    }

    #[test]
    fn test_match_shapes() {
        let inner = Plan::filter(vec![Expression::boolean(true)], scan());
        let outer = Plan::filter(vec![Expression::boolean(false)], inner.clone());

        let merge = Pattern::new(
            PlanType::LogicalFilter,
            vec![Pattern::new(PlanType::LogicalFilter, vec![Pattern::any()])],
        );
        assert!(merge.matches(&outer));
        assert!(!merge.matches(&inner));
        assert!(!merge.is_shallow());
        assert_eq!(merge.to_string(), "LogicalFilter(LogicalFilter(*))");

        let filter = Pattern::new(PlanType::LogicalFilter, vec![Pattern::any()]);
        assert!(filter.is_shallow());
        assert!(filter.matches(&inner));
        assert!(!Pattern::group().matches(&inner));
    }

    #[test]
    fn test_child_count_must_agree() {
        let join = Pattern::new(PlanType::LogicalFilter, vec![Pattern::any(), Pattern::any()]);
        assert!(!join.matches(&Plan::filter(vec![], scan())));
        assert!(Pattern::leaf(PlanType::LogicalScan).matches(&scan()));
    }
}
