//! Fair GLWB fee via bisection.
//!
//! The objective (guarantee cost at a candidate fee) is itself a Monte Carlo
//! estimate, so every probe rebuilds its simulator from the same master seed:
//! the objective is then a deterministic function of the fee and bisection
//! converges. Probes run at half the path count; the returned fee is
//! re-evaluated at the full count for reporting.

use serde::{Deserialize, Serialize};
use tracing::debug;

use annuity_core::{GlwbResult, GwbConfig, PricingError};
use behavioral_models::{Mortality, WithdrawalModel};

use crate::path_sim::GlwbPathSimulator;

/// Fair-fee search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairFeeParams {
    /// Target guarantee cost as a fraction of premium.
    pub target_cost: f64,
    pub fee_bounds: (f64, f64),
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for FairFeeParams {
    fn default() -> Self {
        FairFeeParams {
            target_cost: 0.0,
            fee_bounds: (1e-3, 3e-2),
            tolerance: 1e-3,
            max_iterations: 20,
        }
    }
}

/// Solved fee with the full-path-count pricing at that fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairFeeResult {
    pub fee: f64,
    pub iterations: u32,
    pub result: GlwbResult,
}

impl GlwbPathSimulator {
    /// Solve for the rider fee at which the guarantee cost hits the target.
    ///
    /// The cost is increasing in the fee (a richer fee drains the account
    /// faster and triggers ruin earlier), which fixes the bisection
    /// direction.
    #[allow(clippy::too_many_arguments)]
    pub fn fair_fee(
        &self,
        params: &FairFeeParams,
        premium: f64,
        age: u32,
        r: f64,
        sigma: f64,
        max_age: u32,
        mortality: &Mortality,
        withdrawal_model: &WithdrawalModel,
    ) -> Result<FairFeeResult, PricingError> {
        let (mut low, mut high) = params.fee_bounds;
        if !(low > 0.0 && low < high) {
            return Err(PricingError::precondition(
                "fee bounds must satisfy 0 < low < high",
                low,
            ));
        }

        let probe_paths = (self.n_paths() / 2).max(1);
        let cost_at_fee = |fee: f64| -> Result<f64, PricingError> {
            let config = GwbConfig {
                fee_rate: fee,
                ..*self.gwb_config()
            };
            // Same master seed on every probe: deterministic objective.
            let sim = GlwbPathSimulator::new(config, probe_paths, self.seed())?;
            let result = sim.price(premium, age, r, sigma, max_age, mortality, withdrawal_model)?;
            Ok(result.guarantee_cost)
        };

        let mut last_cost = f64::NAN;
        for iteration in 0..params.max_iterations {
            let mid = 0.5 * (low + high);
            let cost = cost_at_fee(mid)?;
            last_cost = cost;
            debug!(fee = mid, cost, iteration, "fair fee probe");

            if (cost - params.target_cost).abs() < params.tolerance {
                let config = GwbConfig {
                    fee_rate: mid,
                    ..*self.gwb_config()
                };
                let full = GlwbPathSimulator::new(config, self.n_paths(), self.seed())?;
                let result =
                    full.price(premium, age, r, sigma, max_age, mortality, withdrawal_model)?;
                return Ok(FairFeeResult {
                    fee: mid,
                    iterations: iteration + 1,
                    result,
                });
            }
            if cost > params.target_cost {
                high = mid;
            } else {
                low = mid;
            }
        }

        Err(PricingError::Numeric {
            what: "fair fee bisection did not converge".to_string(),
            value: last_cost,
            iterations: params.max_iterations,
        })
    }
}
