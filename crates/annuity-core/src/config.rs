use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Engine configuration, threaded explicitly through every public call.
///
/// There is deliberately no global settings object: a pricing call sees
/// exactly the configuration it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Monte Carlo path count for expected-credit and GLWB simulation.
    pub n_mc_paths: usize,
    /// Use antithetic pairing in the terminal samplers.
    pub antithetic: bool,
    /// Master seed; per-path streams are derived from it by path index.
    pub seed: u64,
    /// Option budget as a fraction of premium (FIA fair-term solving).
    pub option_budget_pct: f64,
    /// Maximum simulation age for lifetime riders.
    pub max_age: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            n_mc_paths: 100_000,
            antithetic: true,
            seed: 42,
            option_budget_pct: 0.03,
            max_age: 100,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.n_mc_paths == 0 {
            return Err(PricingError::precondition("path count must be > 0", 0.0));
        }
        if self.option_budget_pct < 0.0 {
            return Err(PricingError::precondition(
                "option budget must be >= 0",
                self.option_budget_pct,
            ));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_paths(mut self, n_mc_paths: usize) -> Self {
        self.n_mc_paths = n_mc_paths;
        self
    }
}
