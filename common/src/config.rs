use crate::error::{Result, SolverError};
use crate::probability::DEFAULT_EPSILON;
use std::time::Duration;

/// Which move selector drives the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    /// Local clue rules and naive per-clue probabilities.
    Logic,
    /// Simplification, decomposition and exact enumeration.
    #[default]
    Exact,
    /// `Exact`, with a SAT backbone for components too big or slow to
    /// enumerate.
    Hybrid,
}

/// Knobs for the decision core.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolverConfig {
    pub strategy: Strategy,
    /// Components with more variables than this skip exact enumeration.
    pub max_component_size: usize,
    /// Cap on collected assignments per component.
    pub max_assignments: usize,
    /// Wall-clock bound per component, in milliseconds.
    pub timeout_ms: u64,
    pub epsilon: f64,
    /// Bound each component by the number of mines left on the board.
    pub use_mine_budget: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            strategy: Strategy::default(),
            max_component_size: 20,
            max_assignments: 10_000,
            timeout_ms: 5_000,
            epsilon: DEFAULT_EPSILON,
            use_mine_budget: true,
        }
    }
}

impl SolverConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_component_size(mut self, size: usize) -> Self {
        self.max_component_size = size;
        self
    }

    pub fn with_max_assignments(mut self, count: usize) -> Self {
        self.max_assignments = count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_mine_budget(mut self, enabled: bool) -> Self {
        self.use_mine_budget = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_component_size == 0 {
            return Err(SolverError::InvalidConfig("max_component_size must be positive"));
        }
        if self.max_assignments == 0 {
            return Err(SolverError::InvalidConfig("max_assignments must be positive"));
        }
        if !(0.0..0.5).contains(&self.epsilon) {
            return Err(SolverError::InvalidConfig("epsilon must lie in [0, 0.5)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, Strategy::Exact);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_builder_and_validation() {
        let config = SolverConfig::default()
            .with_strategy(Strategy::Hybrid)
            .with_timeout(Duration::from_millis(250))
            .with_max_component_size(0);
        assert_eq!(config.timeout_ms, 250);
        assert!(matches!(config.validate(), Err(SolverError::InvalidConfig(_))));

        let config = SolverConfig::default().with_epsilon(0.5);
        assert!(config.validate().is_err());
        let config = SolverConfig::default().with_max_assignments(0);
        assert!(config.validate().is_err());
    }
}
