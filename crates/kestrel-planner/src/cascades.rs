//! Cascades Search Driver
//!
//! Inserts a bound logical plan into the memo, runs rewrite rules over every
//! group until a full pass changes nothing (or the pass budget or deadline
//! runs out), then runs every implementation rule once per logical
//! expression. Cost-based selection of a winner happens downstream.

use crate::memo::{Memo, MAX_RULES};
use crate::rules::{default_rules, Rule, RuleCategory, RuleContext};
use kestrel_catalog::TableLayoutProvider;
use kestrel_common::{GroupId, KestrelError, OptimizerConfig, Result};
use kestrel_plan::PlanRef;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why the rewrite phase stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A full pass added no expression
    Fixpoint,
    /// `max_rewrite_passes` passes ran without reaching a fixpoint
    PassBudget,
    Deadline,
    RewriteDisabled,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub root: GroupId,
    pub passes: usize,
    pub converged: bool,
    pub stop_reason: StopReason,
    pub groups: usize,
    pub expressions: usize,
    pub elapsed: Duration,
}

/// Cascades Optimizer
pub struct Optimizer {
    memo: Memo,
    rules: Vec<Arc<dyn Rule>>,
    config: OptimizerConfig,
    catalog: Arc<dyn TableLayoutProvider>,
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("memo", &self.memo)
            .field("rules", &self.rules.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Optimizer {
    pub fn new(config: OptimizerConfig, catalog: Arc<dyn TableLayoutProvider>) -> Result<Self> {
        Self::with_rules(config, catalog, default_rules())
    }

    pub fn with_rules(
        config: OptimizerConfig,
        catalog: Arc<dyn TableLayoutProvider>,
        rules: Vec<Arc<dyn Rule>>,
    ) -> Result<Self> {
        config.validate()?;
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.rule_id() >= MAX_RULES {
                return Err(KestrelError::Config(format!(
                    "rule {} has id {}, ids must be below {}",
                    rule.name(),
                    rule.rule_id(),
                    MAX_RULES
                )));
            }
            if !seen.insert(rule.rule_id()) {
                return Err(KestrelError::Config(format!(
                    "rule {} reuses id {}",
                    rule.name(),
                    rule.rule_id()
                )));
            }
        }
        let unknown = config
            .disabled_rules
            .iter()
            .find(|name| !rules.iter().any(|r| r.name() == name.as_str()));
        if let Some(name) = unknown {
            return Err(KestrelError::Config(format!(
                "disabled rule {} is not registered",
                name
            )));
        }
        Ok(Self {
            memo: Memo::new(),
            rules,
            config,
            catalog,
        })
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn memo_mut(&mut self) -> &mut Memo {
        &mut self.memo
    }

    pub fn into_memo(self) -> Memo {
        self.memo
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run `rule` against every logical expression of `group` it has not
    /// fired on yet. Returns whether a new expression was added.
    ///
    /// Transform failures are logged and skipped; only memo invariant
    /// violations propagate.
    pub fn apply_rule(&mut self, rule: &dyn Rule, group: GroupId) -> Result<bool> {
        let Some(candidates) = self.memo.group(group).map(|g| g.logical_expressions.clone()) else {
            return Err(KestrelError::Internal(format!("{} is not in the memo", group)));
        };
        let pattern = rule.pattern();
        let ctx = RuleContext::new(self.catalog.as_ref(), &self.config);
        let mut changed = false;

        for id in candidates {
            let fired = self
                .memo
                .expression(id)
                .map_or(true, |e| e.has_applied_rule(rule.rule_id()));
            if fired {
                continue;
            }
            let bindings = self.memo.bindings(id, &pattern);
            // deeper patterns may bind child expressions added later
            if pattern.is_shallow() {
                self.memo.mark_rule_applied(id, rule.rule_id());
            }

            for binding in bindings {
                if !rule.check(&binding, &ctx) {
                    continue;
                }
                let alternatives = match rule.apply(&binding, &ctx) {
                    Ok(alternatives) => alternatives,
                    Err(e) if e.is_recoverable() => {
                        tracing::warn!("Rule {} failed on {} in {}: {}", rule.name(), id, group, e);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                for alternative in alternatives {
                    match self.memo.copy_in(group, &alternative) {
                        Ok(Some(new_id)) => {
                            tracing::debug!("Rule {} added {} to {}", rule.name(), new_id, group);
                            changed = true;
                        }
                        Ok(None) => {}
                        Err(e) if e.is_recoverable() => {
                            tracing::warn!(
                                "Rule {} produced an unusable plan in {}: {}",
                                rule.name(),
                                group,
                                e
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(changed)
    }

    fn enabled_rules(&self, category: RuleCategory) -> Vec<Arc<dyn Rule>> {
        self.rules
            .iter()
            .filter(|r| r.category() == category && self.config.is_rule_enabled(r.name()))
            .cloned()
            .collect()
    }

    /// One pass of `rules` over every group, including groups created
    /// during the pass.
    fn run_pass(&mut self, rules: &[Arc<dyn Rule>]) -> Result<bool> {
        let mut changed = false;
        let mut group = 0;
        while group < self.memo.group_count() {
            for rule in rules {
                changed |= self.apply_rule(rule.as_ref(), GroupId(group))?;
            }
            group += 1;
        }
        if self.config.validate_memo {
            self.memo.validate()?;
        }
        Ok(changed)
    }

    /// Main optimization entry point
    pub fn run(&mut self, plan: &PlanRef) -> Result<SearchOutcome> {
        let start = Instant::now();
        let deadline = self.config.timeout().map(|t| start + t);
        let expired = |now: Instant| deadline.is_some_and(|d| now >= d);

        let root = self.memo.insert_plan(plan)?;
        self.memo.set_root(root);
        tracing::info!(
            "Optimizing {}: {} groups, {} expressions",
            root,
            self.memo.group_count(),
            self.memo.expression_count()
        );

        let mut passes = 0;
        let mut stop_reason = StopReason::RewriteDisabled;
        if self.config.enable_rewrite {
            let rewrites = self.enabled_rules(RuleCategory::Rewrite);
            loop {
                if expired(Instant::now()) {
                    tracing::warn!("Rewrite deadline reached after {} passes", passes);
                    stop_reason = StopReason::Deadline;
                    break;
                }
                if passes >= self.config.max_rewrite_passes {
                    tracing::warn!(
                        "Rewrite budget of {} passes exhausted before fixpoint",
                        self.config.max_rewrite_passes
                    );
                    stop_reason = StopReason::PassBudget;
                    break;
                }
                passes += 1;
                let changed = self.run_pass(&rewrites)?;
                tracing::debug!(
                    "Rewrite pass {}: changed={}, {} groups, {} expressions",
                    passes,
                    changed,
                    self.memo.group_count(),
                    self.memo.expression_count()
                );
                if !changed {
                    stop_reason = StopReason::Fixpoint;
                    break;
                }
            }
        }

        if self.config.enable_implementation && stop_reason != StopReason::Deadline {
            let implementations = self.enabled_rules(RuleCategory::Implementation);
            self.run_pass(&implementations)?;
        }

        let outcome = SearchOutcome {
            root,
            passes,
            converged: stop_reason == StopReason::Fixpoint,
            stop_reason,
            groups: self.memo.group_count(),
            expressions: self.memo.expression_count(),
            elapsed: start.elapsed(),
        };
        tracing::info!(
            "Search finished: {:?} after {} passes, {} groups, {} expressions",
            outcome.stop_reason,
            outcome.passes,
            outcome.groups,
            outcome.expressions
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::rules::RuleType;
    use arrow_schema::DataType;
    use kestrel_catalog::NoLayout;
    use kestrel_plan::{Plan, PlanNode, PlanType, Slot};

    fn make_scan(name: &str, id: u32) -> PlanRef {
        Plan::scan(name, vec![Slot::new(id, format!("c{}", id), DataType::Int64, false)])
    }

    struct FailingRule;

    impl Rule for FailingRule {
        fn rule_type(&self) -> RuleType {
            RuleType::rewrite(40, "Failing")
        }

        fn pattern(&self) -> Pattern {
            Pattern::leaf(PlanType::LogicalLimit)
        }

        fn apply(&self, plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
            plan.with_children(vec![]).map(|p| vec![p])
        }
    }

    struct CorruptingRule;

    impl Rule for CorruptingRule {
        fn rule_type(&self) -> RuleType {
            RuleType::rewrite(41, "Corrupting")
        }

        fn pattern(&self) -> Pattern {
            Pattern::leaf(PlanType::LogicalLimit)
        }

        fn apply(&self, _plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
            Err(KestrelError::MemoInconsistency {
                expression: kestrel_common::GroupExpressionId(0),
                groups: vec![GroupId(0), GroupId(1)],
                plan: "LogicalLimit".to_string(),
            })
        }
    }

    fn optimizer(rules: Vec<Arc<dyn Rule>>) -> Optimizer {
        Optimizer::with_rules(OptimizerConfig::default(), Arc::new(NoLayout), rules).unwrap()
    }

    #[test]
    fn test_failed_transform_is_absorbed() {
        let mut opt = optimizer(vec![Arc::new(FailingRule)]);
        let outcome = opt.run(&Plan::limit(1, 0, make_scan("t", 1))).unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.passes, 1);
        assert_eq!(opt.memo().group(outcome.root).unwrap().len(), 1);
    }

    #[test]
    fn test_memo_inconsistency_aborts() {
        let mut opt = optimizer(vec![Arc::new(CorruptingRule)]);
        let err = opt.run(&Plan::limit(1, 0, make_scan("t", 1))).unwrap_err();
        assert!(matches!(err, KestrelError::MemoInconsistency { .. }));
    }

    #[test]
    fn test_rule_ids_validated() {
        struct Dup;
        impl Rule for Dup {
            fn rule_type(&self) -> RuleType {
                RuleType::MERGE_FILTERS
            }
            fn pattern(&self) -> Pattern {
                Pattern::any()
            }
            fn apply(&self, _plan: &PlanRef, _ctx: &RuleContext<'_>) -> Result<Vec<PlanRef>> {
                Ok(vec![])
            }
        }
        let mut rules = default_rules();
        rules.push(Arc::new(Dup));
        let result = Optimizer::with_rules(OptimizerConfig::default(), Arc::new(NoLayout), rules);
        assert!(matches!(result, Err(KestrelError::Config(_))));
    }

    #[test]
    fn test_unknown_disabled_rule_rejected() {
        let config = OptimizerConfig::default().disable_rule("JOIN_COMMUTE");
        let err = Optimizer::new(config, Arc::new(NoLayout)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: disabled rule JOIN_COMMUTE is not registered"
        );

        let config = OptimizerConfig::default().disable_rule(RuleType::JOIN_COMMUTE.name);
        assert!(Optimizer::new(config, Arc::new(NoLayout)).is_ok());
    }

    #[test]
    fn test_implementation_only() {
        let config = OptimizerConfig {
            enable_rewrite: false,
            ..OptimizerConfig::default()
        };
        let mut opt = Optimizer::new(config, Arc::new(NoLayout)).unwrap();
        let outcome = opt.run(&Plan::limit(3, 0, make_scan("t", 1))).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::RewriteDisabled);
        assert_eq!(outcome.passes, 0);
        let physical = opt.memo().extract_physical(outcome.root).unwrap();
        assert!(matches!(physical.node(), PlanNode::PhysicalLimit(_)));
        assert_eq!(physical.children()[0].plan_type(), PlanType::PhysicalScan);
    }

    #[test]
    fn test_zero_timeout_stops_before_first_pass() {
        let config = OptimizerConfig::default().with_timeout(Duration::ZERO);
        let mut opt = Optimizer::new(config, Arc::new(NoLayout)).unwrap();
        let outcome = opt.run(&make_scan("t", 1)).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Deadline);
        assert_eq!(outcome.passes, 0);
        assert!(opt.memo().extract_physical(outcome.root).is_none());
        assert!(opt.memo().extract_logical(outcome.root).is_some());
    }
}
