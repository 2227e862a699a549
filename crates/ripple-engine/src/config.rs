//! Engine configuration

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Affected-rule count above which any change is classified high risk
    pub large_impact_threshold: usize,
    /// Bound on concurrent per-rule operations during propagation
    ///
    /// A small constant independent of rule count, sized to avoid
    /// overwhelming the rule store.
    pub max_concurrent_rule_ops: usize,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With large-impact threshold
    #[inline]
    #[must_use]
    pub fn with_large_impact_threshold(mut self, threshold: usize) -> Self {
        self.large_impact_threshold = threshold;
        self
    }

    /// With rule-op concurrency bound
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_rule_ops(mut self, bound: usize) -> Self {
        self.max_concurrent_rule_ops = bound.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            large_impact_threshold: 10,
            max_concurrent_rule_ops: 8,
        }
    }
}
