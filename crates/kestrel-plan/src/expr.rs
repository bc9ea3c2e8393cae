//! Kestrel Expression
//!
//! Scalar expressions are immutable trees shared through [`ExprRef`]. Every
//! rewrite builds new nodes with [`Expression::with_children`]; equality and
//! hashing are structural so independently built trees of the same shape
//! compare equal.

use crate::visitor::ExpressionVisitor;
use arrow_schema::DataType;
use kestrel_common::{KestrelError, Result, SlotId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type ExprRef = Arc<Expression>;

/// A bound output column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Slot {
    pub fn new(id: u32, name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            id: SlotId(id),
            name: name.into(),
            data_type,
            nullable,
        }
    }

    pub fn with_nullable(&self, nullable: bool) -> Self {
        Self {
            nullable,
            ..self.clone()
        }
    }

    pub fn to_expr(&self) -> ExprRef {
        Arc::new(Expression::Slot(self.clone()))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Int(i64),
    Utf8(String),
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::Null,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Int(_) => DataType::Int64,
            Literal::Utf8(_) => DataType::Utf8,
        }
    }

    /// SQL ordering: `None` when either side is NULL or the types differ.
    pub fn compare(&self, other: &Literal) -> Option<Ordering> {
        match (self, other) {
            (Literal::Boolean(a), Literal::Boolean(b)) => Some(a.cmp(b)),
            (Literal::Int(a), Literal::Int(b)) => Some(a.cmp(b)),
            (Literal::Utf8(a), Literal::Utf8(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Utf8(s) => write!(f, "'{}'", s),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    NullSafeEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NullSafeEq => "<=>",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
        }
    }

    /// Operator that gives the same answer with operands exchanged.
    pub fn commute(&self) -> ComparisonOp {
        match self {
            ComparisonOp::Eq => ComparisonOp::Eq,
            ComparisonOp::NullSafeEq => ComparisonOp::NullSafeEq,
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::LtEq => ComparisonOp::GtEq,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::GtEq => ComparisonOp::LtEq,
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::NullSafeEq)
    }

    /// Three-valued evaluation; `None` is SQL unknown.
    pub fn evaluate(&self, left: &Literal, right: &Literal) -> Option<bool> {
        let ordering = left.compare(right);
        match self {
            ComparisonOp::NullSafeEq => Some(left == right),
            ComparisonOp::Eq => ordering.map(Ordering::is_eq),
            ComparisonOp::Lt => ordering.map(Ordering::is_lt),
            ComparisonOp::LtEq => ordering.map(Ordering::is_le),
            ComparisonOp::Gt => ordering.map(Ordering::is_gt),
            ComparisonOp::GtEq => ordering.map(Ordering::is_ge),
        }
    }
}

/// Binary comparison `left op right`.
///
/// `inferred` marks predicates synthesized by rules. It does not take part in
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct ComparisonPredicate {
    pub op: ComparisonOp,
    pub left: ExprRef,
    pub right: ExprRef,
    pub inferred: bool,
}

impl ComparisonPredicate {
    pub fn new(op: ComparisonOp, left: ExprRef, right: ExprRef) -> Self {
        Self {
            op,
            left,
            right,
            inferred: false,
        }
    }

    pub fn with_inferred(&self, inferred: bool) -> Self {
        Self {
            inferred,
            ..self.clone()
        }
    }

    /// Swap operands and invert the direction: `a < b` becomes `b > a`.
    pub fn commute(&self) -> Self {
        Self {
            op: self.op.commute(),
            left: self.right.clone(),
            right: self.left.clone(),
            inferred: self.inferred,
        }
    }

    pub fn nullable(&self) -> Result<bool> {
        let left = self.left.nullable()?;
        let right = self.right.nullable()?;
        if self.op == ComparisonOp::NullSafeEq {
            return Ok(false);
        }
        Ok(left || right)
    }

    /// The pair of slots when both operands are plain slot references.
    pub fn slot_pair(&self) -> Option<(&Slot, &Slot)> {
        match (self.left.as_ref(), self.right.as_ref()) {
            (Expression::Slot(l), Expression::Slot(r)) => Some((l, r)),
            _ => None,
        }
    }

    /// `slot = literal` in either operand order.
    pub fn slot_literal(&self) -> Option<(&Slot, &Literal)> {
        match (self.left.as_ref(), self.right.as_ref()) {
            (Expression::Slot(s), Expression::Literal(l))
            | (Expression::Literal(l), Expression::Slot(s)) => Some((s, l)),
            _ => None,
        }
    }
}

impl PartialEq for ComparisonPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.left == other.left && self.right == other.right
    }
}

impl Eq for ComparisonPredicate {}

impl Hash for ComparisonPredicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.left.hash(state);
        self.right.hash(state);
    }
}

/// How a function's nullability follows from its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionNullability {
    /// Nullable when any argument is nullable
    Propagate,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<ExprRef>,
    pub return_type: DataType,
    pub nullability: FunctionNullability,
}

/// `child AS slot`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alias {
    pub child: ExprRef,
    pub slot: Slot,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Literal(Literal),

    /// Bound column reference
    Slot(Slot),

    /// Column name not resolved by the binder yet
    UnboundSlot(String),

    Comparison(ComparisonPredicate),

    And(Vec<ExprRef>),

    Or(Vec<ExprRef>),

    Not(ExprRef),

    IsNull(ExprRef),

    Function(FunctionCall),

    Alias(Alias),
}

impl Expression {
    pub fn literal(literal: Literal) -> ExprRef {
        Arc::new(Expression::Literal(literal))
    }

    pub fn int(value: i64) -> ExprRef {
        Self::literal(Literal::Int(value))
    }

    pub fn boolean(value: bool) -> ExprRef {
        Self::literal(Literal::Boolean(value))
    }

    pub fn unbound(name: impl Into<String>) -> ExprRef {
        Arc::new(Expression::UnboundSlot(name.into()))
    }

    pub fn comparison(op: ComparisonOp, left: ExprRef, right: ExprRef) -> ExprRef {
        Arc::new(Expression::Comparison(ComparisonPredicate::new(op, left, right)))
    }

    pub fn eq(left: ExprRef, right: ExprRef) -> ExprRef {
        Self::comparison(ComparisonOp::Eq, left, right)
    }

    pub fn lt(left: ExprRef, right: ExprRef) -> ExprRef {
        Self::comparison(ComparisonOp::Lt, left, right)
    }

    pub fn gt(left: ExprRef, right: ExprRef) -> ExprRef {
        Self::comparison(ComparisonOp::Gt, left, right)
    }

    pub fn not(child: ExprRef) -> ExprRef {
        Arc::new(Expression::Not(child))
    }

    pub fn is_null(child: ExprRef) -> ExprRef {
        Arc::new(Expression::IsNull(child))
    }

    pub fn alias(child: ExprRef, slot: Slot) -> ExprRef {
        Arc::new(Expression::Alias(Alias { child, slot }))
    }

    pub fn function(
        name: impl Into<String>,
        args: Vec<ExprRef>,
        return_type: DataType,
        nullability: FunctionNullability,
    ) -> ExprRef {
        Arc::new(Expression::Function(FunctionCall {
            name: name.into(),
            args,
            return_type,
            nullability,
        }))
    }

    /// Short kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "Literal",
            Expression::Slot(_) => "Slot",
            Expression::UnboundSlot(_) => "UnboundSlot",
            Expression::Comparison(_) => "Comparison",
            Expression::And(_) => "And",
            Expression::Or(_) => "Or",
            Expression::Not(_) => "Not",
            Expression::IsNull(_) => "IsNull",
            Expression::Function(_) => "Function",
            Expression::Alias(_) => "Alias",
        }
    }

    pub fn children(&self) -> Vec<ExprRef> {
        match self {
            Expression::Literal(_) | Expression::Slot(_) | Expression::UnboundSlot(_) => vec![],
            Expression::Comparison(c) => vec![c.left.clone(), c.right.clone()],
            Expression::And(children) | Expression::Or(children) => children.clone(),
            Expression::Not(child) | Expression::IsNull(child) => vec![child.clone()],
            Expression::Function(f) => f.args.clone(),
            Expression::Alias(a) => vec![a.child.clone()],
        }
    }

    /// Rebuild this node over new children, keeping every other attribute.
    pub fn with_children(&self, children: Vec<ExprRef>) -> Result<ExprRef> {
        let check = |expected: usize| {
            if children.len() == expected {
                Ok(())
            } else {
                Err(KestrelError::arity(self.kind_name(), expected, children.len()))
            }
        };
        let rebuilt = match self {
            Expression::Literal(_) | Expression::Slot(_) | Expression::UnboundSlot(_) => {
                check(0)?;
                self.clone()
            }
            Expression::Comparison(c) => {
                let [left, right]: [ExprRef; 2] = children.try_into().map_err(|v: Vec<ExprRef>| {
                    KestrelError::arity(self.kind_name(), 2, v.len())
                })?;
                Expression::Comparison(ComparisonPredicate {
                    op: c.op,
                    left,
                    right,
                    inferred: c.inferred,
                })
            }
            Expression::And(_) | Expression::Or(_) => {
                if children.len() < 2 {
                    return Err(KestrelError::arity(self.kind_name(), 2, children.len()));
                }
                if matches!(self, Expression::And(_)) {
                    Expression::And(children)
                } else {
                    Expression::Or(children)
                }
            }
            Expression::Not(_) => {
                check(1)?;
                Expression::Not(children[0].clone())
            }
            Expression::IsNull(_) => {
                check(1)?;
                Expression::IsNull(children[0].clone())
            }
            Expression::Alias(a) => {
                check(1)?;
                Expression::Alias(Alias {
                    child: children[0].clone(),
                    slot: a.slot.clone(),
                })
            }
            Expression::Function(f) => {
                check(f.args.len())?;
                Expression::Function(FunctionCall {
                    args: children,
                    ..f.clone()
                })
            }
        };
        Ok(Arc::new(rebuilt))
    }

    /// Route to the visitor method for this variant.
    pub fn accept<V, C>(&self, visitor: &mut V, ctx: &mut C) -> V::Output
    where
        V: ExpressionVisitor<C> + ?Sized,
    {
        match self {
            Expression::Literal(l) => visitor.visit_literal(self, l, ctx),
            Expression::Slot(s) => visitor.visit_slot(self, s, ctx),
            Expression::UnboundSlot(name) => visitor.visit_unbound_slot(self, name, ctx),
            Expression::Comparison(c) => visitor.visit_comparison(self, c, ctx),
            Expression::And(children) => visitor.visit_and(self, children, ctx),
            Expression::Or(children) => visitor.visit_or(self, children, ctx),
            Expression::Not(child) => visitor.visit_not(self, child, ctx),
            Expression::IsNull(child) => visitor.visit_is_null(self, child, ctx),
            Expression::Function(f) => visitor.visit_function(self, f, ctx),
            Expression::Alias(a) => visitor.visit_alias(self, a, ctx),
        }
    }

    /// Whether the expression can evaluate to NULL.
    pub fn nullable(&self) -> Result<bool> {
        self.accept(&mut NullableDeriver, &mut ())
    }

    pub fn data_type(&self) -> Result<DataType> {
        match self {
            Expression::Literal(l) => Ok(l.data_type()),
            Expression::Slot(s) => Ok(s.data_type.clone()),
            Expression::UnboundSlot(name) => Err(KestrelError::UnboundReference(name.clone())),
            Expression::Comparison(c) => {
                c.left.data_type()?;
                c.right.data_type()?;
                Ok(DataType::Boolean)
            }
            Expression::And(children) | Expression::Or(children) => {
                for child in children {
                    child.data_type()?;
                }
                Ok(DataType::Boolean)
            }
            Expression::Not(child) | Expression::IsNull(child) => {
                child.data_type()?;
                Ok(DataType::Boolean)
            }
            Expression::Function(f) => {
                for arg in &f.args {
                    arg.data_type()?;
                }
                Ok(f.return_type.clone())
            }
            Expression::Alias(a) => a.child.data_type(),
        }
    }

    /// Distinct slots referenced by this expression, in order of appearance.
    pub fn input_slots(&self) -> Vec<Slot> {
        let mut slots = Vec::new();
        self.accept(&mut SlotCollector, &mut slots);
        slots
    }

    pub fn as_slot(&self) -> Option<&Slot> {
        match self {
            Expression::Slot(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_comparison(&self) -> Option<&ComparisonPredicate> {
        match self {
            Expression::Comparison(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, Expression::Comparison(c) if c.inferred)
    }

    /// Fold an expression built only from literals.
    ///
    /// Returns `None` when the expression references a slot or a function.
    pub fn eval_constant(&self) -> Option<Literal> {
        match self {
            Expression::Literal(l) => Some(l.clone()),
            Expression::Comparison(c) => {
                let left = c.left.eval_constant()?;
                let right = c.right.eval_constant()?;
                Some(match c.op.evaluate(&left, &right) {
                    Some(b) => Literal::Boolean(b),
                    None => Literal::Null,
                })
            }
            Expression::Not(child) => match child.eval_constant()? {
                Literal::Boolean(b) => Some(Literal::Boolean(!b)),
                Literal::Null => Some(Literal::Null),
                _ => None,
            },
            Expression::IsNull(child) => Some(Literal::Boolean(child.eval_constant()?.is_null())),
            Expression::And(children) | Expression::Or(children) => {
                let is_and = matches!(self, Expression::And(_));
                let mut saw_null = false;
                for child in children {
                    match child.eval_constant()? {
                        Literal::Boolean(b) if b != is_and => return Some(Literal::Boolean(b)),
                        Literal::Boolean(_) => {}
                        Literal::Null => saw_null = true,
                        _ => return None,
                    }
                }
                Some(if saw_null {
                    Literal::Null
                } else {
                    Literal::Boolean(is_and)
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, items: &[ExprRef], sep: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", sep)?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, ")")
        };
        match self {
            Expression::Literal(l) => write!(f, "{}", l),
            Expression::Slot(s) => write!(f, "{}", s),
            Expression::UnboundSlot(name) => write!(f, "'{}", name),
            Expression::Comparison(c) => {
                write!(f, "({} {} {})", c.left, c.op.symbol(), c.right)
            }
            Expression::And(children) => join(f, children, " AND "),
            Expression::Or(children) => join(f, children, " OR "),
            Expression::Not(child) => write!(f, "NOT {}", child),
            Expression::IsNull(child) => write!(f, "{} IS NULL", child),
            Expression::Function(call) => {
                write!(f, "{}", call.name)?;
                join(f, &call.args, ", ")
            }
            Expression::Alias(a) => write!(f, "{} AS {}", a.child, a.slot),
        }
    }
}

/// Flatten nested ANDs into a conjunct list.
pub fn split_conjuncts(expr: &ExprRef) -> Vec<ExprRef> {
    match expr.as_ref() {
        Expression::And(children) => children.iter().flat_map(split_conjuncts).collect(),
        _ => vec![expr.clone()],
    }
}

/// Combine conjuncts; an empty list is `true`.
pub fn and_all(mut conjuncts: Vec<ExprRef>) -> ExprRef {
    match conjuncts.len() {
        0 => Expression::boolean(true),
        1 => conjuncts.remove(0),
        _ => Arc::new(Expression::And(conjuncts)),
    }
}

struct NullableDeriver;

impl ExpressionVisitor<()> for NullableDeriver {
    type Output = Result<bool>;

    fn visit(&mut self, expr: &Expression, ctx: &mut ()) -> Result<bool> {
        for child in expr.children() {
            if child.accept(self, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn visit_literal(&mut self, _expr: &Expression, literal: &Literal, _ctx: &mut ()) -> Result<bool> {
        Ok(literal.is_null())
    }

    fn visit_slot(&mut self, _expr: &Expression, slot: &Slot, _ctx: &mut ()) -> Result<bool> {
        Ok(slot.nullable)
    }

    fn visit_unbound_slot(&mut self, _expr: &Expression, name: &str, _ctx: &mut ()) -> Result<bool> {
        Err(KestrelError::UnboundReference(name.to_string()))
    }

    fn visit_comparison(
        &mut self,
        _expr: &Expression,
        predicate: &ComparisonPredicate,
        _ctx: &mut (),
    ) -> Result<bool> {
        predicate.nullable()
    }

    fn visit_is_null(&mut self, _expr: &Expression, child: &ExprRef, ctx: &mut ()) -> Result<bool> {
        child.accept(self, ctx)?;
        Ok(false)
    }

    fn visit_function(&mut self, expr: &Expression, call: &FunctionCall, ctx: &mut ()) -> Result<bool> {
        let propagated = self.visit(expr, ctx)?;
        Ok(match call.nullability {
            FunctionNullability::Propagate => propagated,
            FunctionNullability::Always => true,
            FunctionNullability::Never => false,
        })
    }
}

struct SlotCollector;

impl ExpressionVisitor<Vec<Slot>> for SlotCollector {
    type Output = ();

    fn visit(&mut self, expr: &Expression, ctx: &mut Vec<Slot>) {
        for child in expr.children() {
            child.accept(self, ctx);
        }
    }

    fn visit_slot(&mut self, _expr: &Expression, slot: &Slot, ctx: &mut Vec<Slot>) {
        if !ctx.iter().any(|s| s.id == slot.id) {
            ctx.push(slot.clone());
        }
    }
}
