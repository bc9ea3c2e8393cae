//! Memo
//!
//! Groups of equivalent expressions with a global structural index. A group
//! expression stores its plan node with every child replaced by the leaf of
//! the child group, so two expressions are the same exactly when their memo
//! plans compare equal.

use crate::pattern::{Pattern, PatternKind};
use kestrel_common::{GroupExpressionId, GroupId, KestrelError, Result};
use kestrel_plan::{LogicalProperties, Plan, PlanRef};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Highest rule id the applied-rule bitset can record, exclusive
pub const MAX_RULES: usize = 64;

/// One concrete shape inside a group
#[derive(Debug, Clone)]
pub struct GroupExpression {
    pub id: GroupExpressionId,
    pub group_id: GroupId,
    /// Node over group leaves, tagged with `id`
    pub plan: PlanRef,
    pub children: Vec<GroupId>,
    /// Bitset of rule ids that already fired on this expression
    applied_rules: u64,
}

impl GroupExpression {
    pub fn is_logical(&self) -> bool {
        self.plan.plan_type().is_logical()
    }

    pub fn is_physical(&self) -> bool {
        self.plan.plan_type().is_physical()
    }

    pub fn has_applied_rule(&self, rule_id: usize) -> bool {
        rule_id < MAX_RULES && (self.applied_rules & (1u64 << rule_id)) != 0
    }

    pub fn mark_rule_applied(&mut self, rule_id: usize) {
        if rule_id < MAX_RULES {
            self.applied_rules |= 1u64 << rule_id;
        }
    }
}

/// Equivalence class of expressions
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub logical_expressions: Vec<GroupExpressionId>,
    pub physical_expressions: Vec<GroupExpressionId>,
    properties: Arc<LogicalProperties>,
}

impl Group {
    fn new(id: GroupId, properties: Arc<LogicalProperties>) -> Self {
        Self {
            id,
            logical_expressions: Vec::new(),
            physical_expressions: Vec::new(),
            properties,
        }
    }

    pub fn properties(&self) -> &Arc<LogicalProperties> {
        &self.properties
    }

    /// Leaf standing in for this group inside other expressions.
    pub fn group_plan(&self) -> PlanRef {
        Plan::group(self.id, self.properties.clone())
    }

    pub fn expressions(&self) -> impl Iterator<Item = GroupExpressionId> + '_ {
        self.logical_expressions
            .iter()
            .chain(&self.physical_expressions)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.logical_expressions.len() + self.physical_expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memo: stores all groups and expressions with deduplication
#[derive(Debug, Clone, Default)]
pub struct Memo {
    groups: Vec<Group>,
    expressions: Vec<GroupExpression>,
    index: HashMap<PlanRef, GroupExpressionId>,
    root: Option<GroupId>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<GroupId> {
        self.root
    }

    pub fn set_root(&mut self, group: GroupId) {
        self.root = Some(group);
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn expression(&self, id: GroupExpressionId) -> Option<&GroupExpression> {
        self.expressions.get(id.0)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.len()
    }

    /// Every expression of `group`, logical ones first.
    pub fn group_expressions(&self, group: GroupId) -> Vec<&GroupExpression> {
        self.group(group)
            .map(|g| g.expressions().filter_map(|id| self.expression(id)).collect())
            .unwrap_or_default()
    }

    pub fn mark_rule_applied(&mut self, id: GroupExpressionId, rule_id: usize) {
        if let Some(expr) = self.expressions.get_mut(id.0) {
            expr.mark_rule_applied(rule_id);
        }
    }

    fn group_plan(&self, id: GroupId) -> Result<PlanRef> {
        self.group(id)
            .map(Group::group_plan)
            .ok_or_else(|| KestrelError::Internal(format!("{} is not in the memo", id)))
    }

    /// Memoize the children of `plan` and rebuild it over their group leaves.
    fn memoize_children(&mut self, plan: &PlanRef) -> Result<(Vec<GroupId>, PlanRef)> {
        let mut children = Vec::with_capacity(plan.children().len());
        for child in plan.children() {
            children.push(self.insert_plan(child)?);
        }
        let leaves = children
            .iter()
            .map(|id| self.group_plan(*id))
            .collect::<Result<Vec<_>>>()?;
        Ok((children, plan.with_children(leaves)?))
    }

    fn add_expression(
        &mut self,
        group: GroupId,
        memo_plan: PlanRef,
        children: Vec<GroupId>,
    ) -> Result<GroupExpressionId> {
        let id = GroupExpressionId(self.expressions.len());
        let physical = memo_plan.plan_type().is_physical();
        let target = self
            .groups
            .get_mut(group.0)
            .ok_or_else(|| KestrelError::Internal(format!("{} is not in the memo", group)))?;
        if physical {
            target.physical_expressions.push(id);
        } else {
            target.logical_expressions.push(id);
        }
        let tagged = memo_plan.with_group_expression(id);
        self.index.insert(memo_plan, id);
        self.expressions.push(GroupExpression {
            id,
            group_id: group,
            plan: tagged,
            children,
            applied_rules: 0,
        });
        Ok(id)
    }

    /// Insert a whole tree bottom-up. A new group is created only when no
    /// structurally equal expression exists anywhere in the memo.
    pub fn insert_plan(&mut self, plan: &PlanRef) -> Result<GroupId> {
        if let Some(group) = plan.group_id() {
            self.group_plan(group)?;
            return Ok(group);
        }
        let (children, memo_plan) = self.memoize_children(plan)?;
        if let Some(existing) = self.index.get(&memo_plan) {
            return Ok(self.expressions[existing.0].group_id);
        }
        let group = GroupId(self.groups.len());
        self.groups.push(Group::new(group, memo_plan.logical_properties()));
        self.add_expression(group, memo_plan, children)?;
        Ok(group)
    }

    /// Add `plan` as a new alternative of `group`.
    ///
    /// Returns `None` when the shape is already known: in `group` it is a
    /// plain duplicate; in another group it is logged and skipped.
    pub fn copy_in(&mut self, group: GroupId, plan: &PlanRef) -> Result<Option<GroupExpressionId>> {
        self.group_plan(group)?;
        if let Some(other) = plan.group_id() {
            if other != group {
                tracing::debug!("{} proved equivalent to {}, not merged", other, group);
            }
            return Ok(None);
        }
        let (children, memo_plan) = self.memoize_children(plan)?;
        if let Some(existing) = self.index.get(&memo_plan) {
            let owner = self.expressions[existing.0].group_id;
            if owner != group {
                tracing::debug!(
                    "{} already lives in {}, skipped for {}: {}",
                    existing,
                    owner,
                    group,
                    memo_plan
                );
            }
            return Ok(None);
        }
        self.add_expression(group, memo_plan, children).map(Some)
    }

    /// Every expression must be listed by exactly its own group.
    pub fn validate(&self) -> Result<()> {
        let mut owners: BTreeMap<GroupExpressionId, Vec<GroupId>> = BTreeMap::new();
        for group in &self.groups {
            for id in group.expressions() {
                owners.entry(id).or_default().push(group.id);
            }
        }
        for expr in &self.expressions {
            let groups = owners.remove(&expr.id).unwrap_or_default();
            if groups.as_slice() != [expr.group_id] {
                return Err(KestrelError::MemoInconsistency {
                    expression: expr.id,
                    groups,
                    plan: expr.plan.to_string(),
                });
            }
        }
        if let Some((id, groups)) = owners.into_iter().next() {
            return Err(KestrelError::MemoInconsistency {
                expression: id,
                groups,
                plan: "<unknown expression>".to_string(),
            });
        }
        Ok(())
    }

    /// Concrete plans binding `pattern` at expression `id`.
    ///
    /// Children bound by a kind pattern are expanded with every matching
    /// logical expression of the child group; the rest stay group leaves.
    pub fn bindings(&self, id: GroupExpressionId, pattern: &Pattern) -> Vec<PlanRef> {
        let Some(expr) = self.expression(id) else {
            return vec![];
        };
        if !pattern.matches_node(&expr.plan) {
            return vec![];
        }
        if pattern.children.is_empty() {
            return vec![expr.plan.clone()];
        }
        if pattern.children.len() != expr.children.len() {
            return vec![];
        }

        let mut partial: Vec<Vec<PlanRef>> = vec![vec![]];
        for (child_pattern, child_group) in pattern.children.iter().zip(&expr.children) {
            let options: Vec<PlanRef> = match child_pattern.kind {
                PatternKind::Any | PatternKind::Group => {
                    self.group(*child_group).map(Group::group_plan).into_iter().collect()
                }
                PatternKind::Plan(_) => self
                    .group(*child_group)
                    .map(|g| {
                        g.logical_expressions
                            .iter()
                            .flat_map(|child| self.bindings(*child, child_pattern))
                            .collect()
                    })
                    .unwrap_or_default(),
            };
            if options.is_empty() {
                return vec![];
            }
            partial = partial
                .into_iter()
                .flat_map(|prefix| {
                    options.iter().map(move |option| {
                        let mut next = prefix.clone();
                        next.push(option.clone());
                        next
                    })
                })
                .collect();
        }

        partial
            .into_iter()
            .filter_map(|children| expr.plan.with_children(children).ok())
            .map(|plan| plan.with_group_expression(id))
            .collect()
    }

    /// First complete logical tree reachable from `group`.
    pub fn extract_logical(&self, group: GroupId) -> Option<PlanRef> {
        self.extract(group, false, &mut Vec::new())
    }

    /// First complete physical tree reachable from `group`.
    pub fn extract_physical(&self, group: GroupId) -> Option<PlanRef> {
        self.extract(group, true, &mut Vec::new())
    }

    fn extract(&self, group: GroupId, physical: bool, visiting: &mut Vec<GroupId>) -> Option<PlanRef> {
        if visiting.contains(&group) {
            return None;
        }
        let candidates = {
            let g = self.group(group)?;
            if physical {
                g.physical_expressions.clone()
            } else {
                g.logical_expressions.clone()
            }
        };
        visiting.push(group);
        let mut found = None;
        'candidates: for id in candidates {
            let Some(expr) = self.expression(id) else {
                continue;
            };
            let mut children = Vec::with_capacity(expr.children.len());
            for child in &expr.children {
                match self.extract(*child, physical, visiting) {
                    Some(plan) => children.push(plan),
                    None => continue 'candidates,
                }
            }
            if let Ok(plan) = expr.plan.with_children(children) {
                found = Some(plan);
                break;
            }
        }
        visiting.pop();
        found
    }
}
