//! Optimizer Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Upper bound on full rewrite passes over the memo
    pub max_rewrite_passes: usize,

    /// Cooperative deadline checked between passes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Run rewrite rules
    pub enable_rewrite: bool,

    /// Run implementation rules
    pub enable_implementation: bool,

    /// Rule names the driver skips
    pub disabled_rules: Vec<String>,

    /// Check memo invariants after every pass
    pub validate_memo: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_rewrite_passes: 64,
            timeout_ms: None,
            enable_rewrite: true,
            enable_implementation: true,
            disabled_rules: Vec::new(),
            validate_memo: true,
        }
    }
}

impl OptimizerConfig {
    pub fn with_max_rewrite_passes(mut self, passes: usize) -> Self {
        self.max_rewrite_passes = passes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn disable_rule(mut self, name: impl Into<String>) -> Self {
        self.disabled_rules.push(name.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn is_rule_enabled(&self, name: &str) -> bool {
        !self.disabled_rules.iter().any(|r| r == name)
    }

    pub fn validate(&self) -> Result<(), crate::KestrelError> {
        if self.max_rewrite_passes == 0 && self.enable_rewrite {
            return Err(crate::KestrelError::Config(
                "max_rewrite_passes must be positive when rewrites are enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::KestrelError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::KestrelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), crate::KestrelError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("optimizer.toml");
        let config = OptimizerConfig::default()
            .with_max_rewrite_passes(8)
            .with_timeout(Duration::from_millis(250))
            .disable_rule("JoinCommute");
        config.save_to_file(&path).unwrap();

        let loaded = OptimizerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.is_rule_enabled("JoinCommute"));
        assert!(loaded.is_rule_enabled("MergeFilters"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: OptimizerConfig = toml::from_str("max_rewrite_passes = 3").unwrap();
        assert_eq!(config.max_rewrite_passes, 3);
        assert!(config.enable_implementation);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_rewrite_passes = 0").unwrap();
        assert!(matches!(
            OptimizerConfig::load_from_file(&path),
            Err(crate::KestrelError::Config(_))
        ));
    }
}
