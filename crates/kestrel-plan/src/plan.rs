//! Kestrel Plan
//!
//! Relational operators as immutable trees. A [`Plan`] is the shared record
//! (children, owning group expression, cached logical properties) wrapped
//! around a kind-specific [`PlanNode`] payload.

use crate::expr::{ExprRef, Expression, Slot};
use crate::fd;
use crate::properties::LogicalProperties;
use crate::visitor::PlanVisitor;
use kestrel_common::{GroupExpressionId, GroupId, KestrelError, Result, SlotId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

pub type PlanRef = Arc<Plan>;

/// Operator kind tag, used by patterns and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlanType {
    LogicalScan,
    LogicalEmptyRelation,
    LogicalFilter,
    LogicalProject,
    LogicalJoin,
    LogicalAggregate,
    LogicalSetOperation,
    LogicalLimit,
    PhysicalScan,
    PhysicalEmptyRelation,
    PhysicalFilter,
    PhysicalProject,
    PhysicalHashJoin,
    PhysicalNestedLoopJoin,
    PhysicalHashAggregate,
    PhysicalSetOperation,
    PhysicalLimit,
    Group,
}

impl PlanType {
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            PlanType::LogicalScan
                | PlanType::LogicalEmptyRelation
                | PlanType::LogicalFilter
                | PlanType::LogicalProject
                | PlanType::LogicalJoin
                | PlanType::LogicalAggregate
                | PlanType::LogicalSetOperation
                | PlanType::LogicalLimit
        )
    }

    pub fn is_physical(&self) -> bool {
        !self.is_logical() && *self != PlanType::Group
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Cross,
    LeftOuter,
    RightOuter,
    FullOuter,
    LeftSemi,
    RightSemi,
    LeftAnti,
    RightAnti,
    NullAwareLeftAnti,
}

impl JoinType {
    pub fn is_inner_or_cross(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Cross)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Placement of rows across instances for physical operators
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Distribution {
    #[default]
    Any,
    Single,
    Random,
    Hash { slots: Vec<SlotId>, buckets: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scan {
    pub table: String,
    pub output: Vec<Slot>,
    /// Unique keys known to the binder
    pub unique_keys: Vec<Vec<SlotId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalScan {
    pub scan: Scan,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmptyRelation {
    pub output: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    pub conjuncts: Vec<ExprRef>,
}

/// Each projection is a slot or an alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Project {
    pub projects: Vec<ExprRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub join_type: JoinType,
    /// Equalities usable as hash keys
    pub hash_conjuncts: Vec<ExprRef>,
    pub other_conjuncts: Vec<ExprRef>,
    pub mark_conjuncts: Vec<ExprRef>,
    /// Output column of a mark join
    pub mark_slot: Option<Slot>,
}

impl Join {
    pub fn new(join_type: JoinType) -> Self {
        Self {
            join_type,
            hash_conjuncts: vec![],
            other_conjuncts: vec![],
            mark_conjuncts: vec![],
            mark_slot: None,
        }
    }

    pub fn with_hash_conjuncts(mut self, conjuncts: Vec<ExprRef>) -> Self {
        self.hash_conjuncts = conjuncts;
        self
    }

    pub fn with_other_conjuncts(mut self, conjuncts: Vec<ExprRef>) -> Self {
        self.other_conjuncts = conjuncts;
        self
    }

    pub fn with_mark(mut self, slot: Slot, conjuncts: Vec<ExprRef>) -> Self {
        self.mark_slot = Some(slot);
        self.mark_conjuncts = conjuncts;
        self
    }

    pub fn is_mark_join(&self) -> bool {
        self.mark_slot.is_some()
    }

    pub fn output(&self, left: &[Slot], right: &[Slot]) -> Vec<Slot> {
        let nullable = |slots: &[Slot]| -> Vec<Slot> {
            slots.iter().map(|s| s.with_nullable(true)).collect()
        };
        let mut output = if self.is_mark_join() {
            left.to_vec()
        } else {
            match self.join_type {
                JoinType::Inner | JoinType::Cross => [left, right].concat(),
                JoinType::LeftOuter => [left.to_vec(), nullable(right)].concat(),
                JoinType::RightOuter => [nullable(left), right.to_vec()].concat(),
                JoinType::FullOuter => [nullable(left), nullable(right)].concat(),
                JoinType::LeftSemi | JoinType::LeftAnti | JoinType::NullAwareLeftAnti => {
                    left.to_vec()
                }
                JoinType::RightSemi | JoinType::RightAnti => right.to_vec(),
            }
        };
        if let Some(mark) = &self.mark_slot {
            output.push(mark.clone());
        }
        output
    }
}

/// Each output is a slot or an alias, typically over an aggregate function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregate {
    pub group_by: Vec<ExprRef>,
    pub outputs: Vec<ExprRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperationKind {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    All,
    Distinct,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetOperation {
    pub kind: SetOperationKind,
    pub qualifier: Qualifier,
    pub outputs: Vec<Slot>,
    /// For child `i`, the child slot feeding each output position
    pub children_outputs: Vec<Vec<Slot>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit {
    pub limit: u64,
    pub offset: u64,
}

/// Leaf standing in for a memo group
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub group_id: GroupId,
    pub properties: Arc<LogicalProperties>,
}

impl PartialEq for GroupPlan {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
    }
}

impl Eq for GroupPlan {}

impl Hash for GroupPlan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanNode {
    LogicalScan(Scan),
    LogicalEmptyRelation(EmptyRelation),
    LogicalFilter(Filter),
    LogicalProject(Project),
    LogicalJoin(Join),
    LogicalAggregate(Aggregate),
    LogicalSetOperation(SetOperation),
    LogicalLimit(Limit),
    PhysicalScan(PhysicalScan),
    PhysicalEmptyRelation(EmptyRelation),
    PhysicalFilter(Filter),
    PhysicalProject(Project),
    PhysicalHashJoin(Join),
    PhysicalNestedLoopJoin(Join),
    PhysicalHashAggregate(Aggregate),
    PhysicalSetOperation(SetOperation),
    PhysicalLimit(Limit),
    Group(GroupPlan),
}

impl PlanNode {
    pub fn plan_type(&self) -> PlanType {
        match self {
            PlanNode::LogicalScan(_) => PlanType::LogicalScan,
            PlanNode::LogicalEmptyRelation(_) => PlanType::LogicalEmptyRelation,
            PlanNode::LogicalFilter(_) => PlanType::LogicalFilter,
            PlanNode::LogicalProject(_) => PlanType::LogicalProject,
            PlanNode::LogicalJoin(_) => PlanType::LogicalJoin,
            PlanNode::LogicalAggregate(_) => PlanType::LogicalAggregate,
            PlanNode::LogicalSetOperation(_) => PlanType::LogicalSetOperation,
            PlanNode::LogicalLimit(_) => PlanType::LogicalLimit,
            PlanNode::PhysicalScan(_) => PlanType::PhysicalScan,
            PlanNode::PhysicalEmptyRelation(_) => PlanType::PhysicalEmptyRelation,
            PlanNode::PhysicalFilter(_) => PlanType::PhysicalFilter,
            PlanNode::PhysicalProject(_) => PlanType::PhysicalProject,
            PlanNode::PhysicalHashJoin(_) => PlanType::PhysicalHashJoin,
            PlanNode::PhysicalNestedLoopJoin(_) => PlanType::PhysicalNestedLoopJoin,
            PlanNode::PhysicalHashAggregate(_) => PlanType::PhysicalHashAggregate,
            PlanNode::PhysicalSetOperation(_) => PlanType::PhysicalSetOperation,
            PlanNode::PhysicalLimit(_) => PlanType::PhysicalLimit,
            PlanNode::Group(_) => PlanType::Group,
        }
    }

    /// Number of children the payload requires.
    pub fn arity(&self) -> usize {
        match self {
            PlanNode::LogicalScan(_)
            | PlanNode::PhysicalScan(_)
            | PlanNode::LogicalEmptyRelation(_)
            | PlanNode::PhysicalEmptyRelation(_)
            | PlanNode::Group(_) => 0,
            PlanNode::LogicalFilter(_)
            | PlanNode::PhysicalFilter(_)
            | PlanNode::LogicalProject(_)
            | PlanNode::PhysicalProject(_)
            | PlanNode::LogicalAggregate(_)
            | PlanNode::PhysicalHashAggregate(_)
            | PlanNode::LogicalLimit(_)
            | PlanNode::PhysicalLimit(_) => 1,
            PlanNode::LogicalJoin(_)
            | PlanNode::PhysicalHashJoin(_)
            | PlanNode::PhysicalNestedLoopJoin(_) => 2,
            PlanNode::LogicalSetOperation(s) | PlanNode::PhysicalSetOperation(s) => {
                s.children_outputs.len()
            }
        }
    }

    /// Payload checks independent of the children.
    fn validate(&self) -> Result<()> {
        let named = |exprs: &[ExprRef], what: &str| -> Result<()> {
            match exprs
                .iter()
                .find(|e| !matches!(e.as_ref(), Expression::Slot(_) | Expression::Alias(_)))
            {
                Some(bad) => Err(KestrelError::InvalidPlan(format!(
                    "{} must be slots or aliases, got {}",
                    what, bad
                ))),
                None => Ok(()),
            }
        };
        match self {
            PlanNode::LogicalProject(p) | PlanNode::PhysicalProject(p) => {
                named(&p.projects, "projections")
            }
            PlanNode::LogicalAggregate(a) | PlanNode::PhysicalHashAggregate(a) => {
                named(&a.outputs, "aggregate outputs")
            }
            PlanNode::LogicalSetOperation(s) | PlanNode::PhysicalSetOperation(s) => {
                if s.children_outputs.len() < 2 {
                    return Err(KestrelError::InvalidPlan(format!(
                        "{:?} needs at least two children",
                        s.kind
                    )));
                }
                if let Some(bad) = s
                    .children_outputs
                    .iter()
                    .position(|c| c.len() != s.outputs.len())
                {
                    return Err(KestrelError::InvalidPlan(format!(
                        "{:?} child {} maps {} slots onto {} outputs",
                        s.kind,
                        bad,
                        s.children_outputs[bad].len(),
                        s.outputs.len()
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Output slots of named expressions (slots or aliases).
fn named_output(exprs: &[ExprRef]) -> Vec<Slot> {
    exprs
        .iter()
        .filter_map(|e| match e.as_ref() {
            Expression::Slot(s) => Some(s.clone()),
            Expression::Alias(a) => Some(a.slot.clone()),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Plan {
    node: PlanNode,
    children: Vec<PlanRef>,
    group_expression: Option<GroupExpressionId>,
    properties: OnceLock<Arc<LogicalProperties>>,
}

impl PartialEq for Plan {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.children == other.children
    }
}

impl Eq for Plan {}

impl Hash for Plan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
        self.children.hash(state);
    }
}

impl Plan {
    /// Build a node, validating the payload and the child count.
    pub fn new(node: PlanNode, children: Vec<PlanRef>) -> Result<PlanRef> {
        node.validate()?;
        let expected = node.arity();
        if children.len() != expected {
            return Err(KestrelError::arity(
                node.plan_type().to_string(),
                expected,
                children.len(),
            ));
        }
        Ok(Arc::new(Plan {
            node,
            children,
            group_expression: None,
            properties: OnceLock::new(),
        }))
    }

    fn leaf(node: PlanNode) -> PlanRef {
        Arc::new(Plan {
            node,
            children: vec![],
            group_expression: None,
            properties: OnceLock::new(),
        })
    }

    fn unary(node: PlanNode, child: PlanRef) -> PlanRef {
        Arc::new(Plan {
            node,
            children: vec![child],
            group_expression: None,
            properties: OnceLock::new(),
        })
    }

    pub fn scan(table: impl Into<String>, output: Vec<Slot>) -> PlanRef {
        Self::scan_with_keys(table, output, vec![])
    }

    pub fn scan_with_keys(
        table: impl Into<String>,
        output: Vec<Slot>,
        unique_keys: Vec<Vec<SlotId>>,
    ) -> PlanRef {
        Self::leaf(PlanNode::LogicalScan(Scan {
            table: table.into(),
            output,
            unique_keys,
        }))
    }

    pub fn empty_relation(output: Vec<Slot>) -> PlanRef {
        Self::leaf(PlanNode::LogicalEmptyRelation(EmptyRelation { output }))
    }

    pub fn filter(conjuncts: Vec<ExprRef>, child: PlanRef) -> PlanRef {
        Self::unary(PlanNode::LogicalFilter(Filter { conjuncts }), child)
    }

    pub fn project(projects: Vec<ExprRef>, child: PlanRef) -> Result<PlanRef> {
        Self::new(PlanNode::LogicalProject(Project { projects }), vec![child])
    }

    pub fn join(join: Join, left: PlanRef, right: PlanRef) -> PlanRef {
        Arc::new(Plan {
            node: PlanNode::LogicalJoin(join),
            children: vec![left, right],
            group_expression: None,
            properties: OnceLock::new(),
        })
    }

    pub fn aggregate(
        group_by: Vec<ExprRef>,
        outputs: Vec<ExprRef>,
        child: PlanRef,
    ) -> Result<PlanRef> {
        Self::new(
            PlanNode::LogicalAggregate(Aggregate { group_by, outputs }),
            vec![child],
        )
    }

    pub fn set_operation(set_op: SetOperation, children: Vec<PlanRef>) -> Result<PlanRef> {
        Self::new(PlanNode::LogicalSetOperation(set_op), children)
    }

    pub fn limit(limit: u64, offset: u64, child: PlanRef) -> PlanRef {
        Self::unary(PlanNode::LogicalLimit(Limit { limit, offset }), child)
    }

    pub fn group(group_id: GroupId, properties: Arc<LogicalProperties>) -> PlanRef {
        Self::leaf(PlanNode::Group(GroupPlan {
            group_id,
            properties,
        }))
    }

    pub fn node(&self) -> &PlanNode {
        &self.node
    }

    pub fn plan_type(&self) -> PlanType {
        self.node.plan_type()
    }

    pub fn children(&self) -> &[PlanRef] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&PlanRef> {
        self.children.get(index)
    }

    pub fn group_expression(&self) -> Option<GroupExpressionId> {
        self.group_expression
    }

    /// The memo group this leaf stands for.
    pub fn group_id(&self) -> Option<GroupId> {
        match &self.node {
            PlanNode::Group(g) => Some(g.group_id),
            _ => None,
        }
    }

    /// Same node tagged with its owning group expression.
    pub fn with_group_expression(&self, id: GroupExpressionId) -> PlanRef {
        Arc::new(Plan {
            group_expression: Some(id),
            ..self.clone()
        })
    }

    /// Same node over new children. The group expression and cached
    /// properties are not carried over.
    pub fn with_children(&self, children: Vec<PlanRef>) -> Result<PlanRef> {
        Self::new(self.node.clone(), children)
    }

    /// Same children under a new payload of any kind.
    pub fn with_node(&self, node: PlanNode) -> Result<PlanRef> {
        Self::new(node, self.children.clone())
    }

    pub fn accept<V, C>(&self, visitor: &mut V, ctx: &mut C) -> V::Output
    where
        V: PlanVisitor<C> + ?Sized,
    {
        match &self.node {
            PlanNode::LogicalScan(s) => visitor.visit_logical_scan(self, s, ctx),
            PlanNode::LogicalEmptyRelation(e) => visitor.visit_logical_empty_relation(self, e, ctx),
            PlanNode::LogicalFilter(f) => visitor.visit_logical_filter(self, f, ctx),
            PlanNode::LogicalProject(p) => visitor.visit_logical_project(self, p, ctx),
            PlanNode::LogicalJoin(j) => visitor.visit_logical_join(self, j, ctx),
            PlanNode::LogicalAggregate(a) => visitor.visit_logical_aggregate(self, a, ctx),
            PlanNode::LogicalSetOperation(s) => visitor.visit_logical_set_operation(self, s, ctx),
            PlanNode::LogicalLimit(l) => visitor.visit_logical_limit(self, l, ctx),
            PlanNode::PhysicalScan(s) => visitor.visit_physical_scan(self, s, ctx),
            PlanNode::PhysicalEmptyRelation(e) => {
                visitor.visit_physical_empty_relation(self, e, ctx)
            }
            PlanNode::PhysicalFilter(f) => visitor.visit_physical_filter(self, f, ctx),
            PlanNode::PhysicalProject(p) => visitor.visit_physical_project(self, p, ctx),
            PlanNode::PhysicalHashJoin(j) => visitor.visit_physical_hash_join(self, j, ctx),
            PlanNode::PhysicalNestedLoopJoin(j) => {
                visitor.visit_physical_nested_loop_join(self, j, ctx)
            }
            PlanNode::PhysicalHashAggregate(a) => visitor.visit_physical_hash_aggregate(self, a, ctx),
            PlanNode::PhysicalSetOperation(s) => visitor.visit_physical_set_operation(self, s, ctx),
            PlanNode::PhysicalLimit(l) => visitor.visit_physical_limit(self, l, ctx),
            PlanNode::Group(g) => visitor.visit_group(self, g, ctx),
        }
    }

    /// Schema and functional dependencies, derived once per node.
    pub fn logical_properties(&self) -> Arc<LogicalProperties> {
        self.properties
            .get_or_init(|| {
                if let PlanNode::Group(g) = &self.node {
                    return g.properties.clone();
                }
                let output = self.compute_output();
                let fds = fd::derive(self, &output);
                Arc::new(LogicalProperties { output, fds })
            })
            .clone()
    }

    pub fn output(&self) -> Vec<Slot> {
        self.logical_properties().output.clone()
    }

    fn child_output(&self, index: usize) -> Vec<Slot> {
        self.children
            .get(index)
            .map(|c| c.output())
            .unwrap_or_default()
    }

    fn compute_output(&self) -> Vec<Slot> {
        match &self.node {
            PlanNode::LogicalScan(s) | PlanNode::PhysicalScan(PhysicalScan { scan: s, .. }) => {
                s.output.clone()
            }
            PlanNode::LogicalEmptyRelation(e) | PlanNode::PhysicalEmptyRelation(e) => {
                e.output.clone()
            }
            PlanNode::LogicalFilter(_)
            | PlanNode::PhysicalFilter(_)
            | PlanNode::LogicalLimit(_)
            | PlanNode::PhysicalLimit(_) => self.child_output(0),
            PlanNode::LogicalProject(p) | PlanNode::PhysicalProject(p) => named_output(&p.projects),
            PlanNode::LogicalJoin(j)
            | PlanNode::PhysicalHashJoin(j)
            | PlanNode::PhysicalNestedLoopJoin(j) => {
                j.output(&self.child_output(0), &self.child_output(1))
            }
            PlanNode::LogicalAggregate(a) | PlanNode::PhysicalHashAggregate(a) => {
                named_output(&a.outputs)
            }
            PlanNode::LogicalSetOperation(s) | PlanNode::PhysicalSetOperation(s) => {
                s.outputs.clone()
            }
            PlanNode::Group(g) => g.properties.output.clone(),
        }
    }

    /// Indented tree rendering, one node per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.node.to_string());
        out.push('\n');
        for child in &self.children {
            child.explain_into(out, depth + 1);
        }
    }
}

fn fmt_exprs(exprs: &[ExprRef]) -> String {
    exprs
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_slots(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.plan_type();
        match self {
            PlanNode::LogicalScan(s) => write!(f, "{}({})", kind, s.table),
            PlanNode::PhysicalScan(s) => {
                write!(f, "{}({}, {:?})", kind, s.scan.table, s.distribution)
            }
            PlanNode::LogicalEmptyRelation(e) | PlanNode::PhysicalEmptyRelation(e) => {
                write!(f, "{}([{}])", kind, fmt_slots(&e.output))
            }
            PlanNode::LogicalFilter(p) | PlanNode::PhysicalFilter(p) => {
                write!(f, "{}({})", kind, fmt_exprs(&p.conjuncts))
            }
            PlanNode::LogicalProject(p) | PlanNode::PhysicalProject(p) => {
                write!(f, "{}({})", kind, fmt_exprs(&p.projects))
            }
            PlanNode::LogicalJoin(j)
            | PlanNode::PhysicalHashJoin(j)
            | PlanNode::PhysicalNestedLoopJoin(j) => {
                write!(
                    f,
                    "{}({}, hash=[{}], other=[{}]",
                    kind,
                    j.join_type,
                    fmt_exprs(&j.hash_conjuncts),
                    fmt_exprs(&j.other_conjuncts)
                )?;
                if let Some(mark) = &j.mark_slot {
                    write!(f, ", mark={} [{}]", mark, fmt_exprs(&j.mark_conjuncts))?;
                }
                write!(f, ")")
            }
            PlanNode::LogicalAggregate(a) | PlanNode::PhysicalHashAggregate(a) => write!(
                f,
                "{}(group_by=[{}], outputs=[{}])",
                kind,
                fmt_exprs(&a.group_by),
                fmt_exprs(&a.outputs)
            ),
            PlanNode::LogicalSetOperation(s) | PlanNode::PhysicalSetOperation(s) => write!(
                f,
                "{}({:?} {:?}, [{}])",
                kind,
                s.kind,
                s.qualifier,
                fmt_slots(&s.outputs)
            ),
            PlanNode::LogicalLimit(l) | PlanNode::PhysicalLimit(l) => {
                write!(f, "{}({}, offset={})", kind, l.limit, l.offset)
            }
            PlanNode::Group(g) => write!(f, "{}({})", kind, g.group_id),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}
