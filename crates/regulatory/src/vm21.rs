//! VM-21/AG43 stochastic reserve: Conditional Tail Expectation over an
//! economic scenario bundle.
//!
//! Each scenario drives a deterministic liability projection: the scenario's
//! equity path moves the account value, the scenario's rate path discounts,
//! and mortality and dynamic lapse decrement the in-force fraction. The
//! reserve is the mean of the worst (1 - alpha) scenario liabilities.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use annuity_core::{GwbConfig, PricingError, ReserveResult};
use behavioral_models::{DynamicLapseModel, Mortality, WithdrawalModel};
use glwb_engine::GwbTracker;

use crate::scenarios::Ag43Scenarios;

/// Policy under reserve valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyData {
    pub premium: f64,
    pub age: u32,
    pub max_age: u32,
    /// Contract years until the surrender period ends.
    pub surrender_years: u32,
    pub gwb_config: GwbConfig,
}

impl PolicyData {
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.premium <= 0.0 {
            return Err(PricingError::precondition(
                "premium must be > 0",
                self.premium,
            ));
        }
        if self.age >= self.max_age {
            return Err(PricingError::precondition(
                "issue age must be below the maximum projection age",
                self.age as f64,
            ));
        }
        self.gwb_config.validate()
    }
}

/// CTE reserve calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vm21Calculator {
    cte_level: f64,
}

impl Vm21Calculator {
    pub fn new(cte_level: f64) -> Result<Self, PricingError> {
        if !(0.0..1.0).contains(&cte_level) {
            return Err(PricingError::precondition(
                "CTE level must be in [0, 1)",
                cte_level,
            ));
        }
        Ok(Vm21Calculator { cte_level })
    }

    /// The standard VM-21 calibration, CTE70.
    pub fn cte70() -> Self {
        Vm21Calculator { cte_level: 0.70 }
    }

    /// Reserve for a policy over a scenario bundle.
    pub fn reserve(
        &self,
        policy: &PolicyData,
        scenarios: &Ag43Scenarios,
        mortality: &Mortality,
        lapse_model: &DynamicLapseModel,
        withdrawal_model: &WithdrawalModel,
    ) -> Result<ReserveResult, PricingError> {
        policy.validate()?;
        if scenarios.scenarios.is_empty() {
            return Err(PricingError::Data(
                "scenario bundle is empty".to_string(),
            ));
        }

        // Scenario projections are independent; collect preserves scenario
        // order so the reduction below is deterministic.
        let liabilities: Result<Vec<(f64, u32)>, PricingError> = scenarios
            .scenarios
            .par_iter()
            .map(|scenario| {
                let pv = self.project_scenario(
                    policy,
                    &scenario.rates,
                    &scenario.equity_returns,
                    mortality,
                    lapse_model,
                    withdrawal_model,
                )?;
                Ok((pv, scenario.scenario_id))
            })
            .collect();
        let mut liabilities = liabilities?;

        // Worst means largest liability: sort descending.
        liabilities
            .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let pvs: Vec<f64> = liabilities.iter().map(|(pv, _)| *pv).collect();

        let tail_count = tail_size(pvs.len(), self.cte_level);
        let cte70 = pvs[..tail_count].iter().sum::<f64>() / tail_count as f64;
        let mean = pvs.iter().sum::<f64>() / pvs.len() as f64;
        let variance = if pvs.len() > 1 {
            pvs.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (pvs.len() as f64 - 1.0)
        } else {
            0.0
        };
        let tail_scenario_ids = liabilities[..tail_count]
            .iter()
            .map(|(_, id)| *id)
            .collect();

        let result = ReserveResult {
            cte70,
            mean,
            std_dev: variance.sqrt(),
            tail_scenario_ids,
            n_scenarios: pvs.len(),
        };
        debug!(
            cte70 = result.cte70,
            mean = result.mean,
            n_scenarios = result.n_scenarios,
            "vm-21 reserve computed"
        );
        Ok(result)
    }

    /// Net insurer liability under one scenario: PV of guaranteed payments
    /// the account cannot fund, less PV of rider fees collected, both
    /// weighted by the surviving in-force fraction.
    pub fn project_scenario(
        &self,
        policy: &PolicyData,
        rates: &[f64],
        equity_returns: &[f64],
        mortality: &Mortality,
        lapse_model: &DynamicLapseModel,
        withdrawal_model: &WithdrawalModel,
    ) -> Result<f64, PricingError> {
        if rates.len() != equity_returns.len() {
            return Err(PricingError::Data(format!(
                "rate path length ({}) must match equity path length ({})",
                rates.len(),
                equity_returns.len()
            )));
        }

        let tracker = GwbTracker::new(policy.gwb_config, policy.premium)?;
        let mut state = tracker.initial_state();
        let horizon = rates.len().min((policy.max_age - policy.age) as usize);

        let mut in_force = 1.0;
        let mut discount = 1.0;
        let mut pv_claims = 0.0;
        let mut pv_fees = 0.0;

        for t in 0..horizon {
            let current_age = policy.age + t as u32;
            let qx = mortality.qx(current_age);
            let lapse = lapse_model
                .lapse_rate(state.av, state.gwb, t as u32 >= policy.surrender_years)?
                .lapse_rate;

            let withdrawal = withdrawal_model
                .expected_withdrawal(
                    state.gwb,
                    policy.gwb_config.withdrawal_rate,
                    current_age,
                    t as u32,
                )?
                .withdrawal_amount;

            let step = tracker.step(state, equity_returns[t], 1.0, withdrawal)?;
            state = step.new_state;

            discount *= (-rates[t]).exp();
            pv_fees += step.fees_charged * discount * in_force;
            if state.av <= 0.0 {
                pv_claims += withdrawal * discount * in_force;
            }

            in_force *= (1.0 - qx).max(0.0) * (1.0 - lapse).max(0.0);
        }

        Ok(pv_claims - pv_fees)
    }
}

/// Number of scenarios in the worst (1 - alpha) tail, at least one.
fn tail_size(n: usize, alpha: f64) -> usize {
    (((1.0 - alpha) * n as f64).floor() as usize).clamp(1, n)
}

/// CTE(alpha) over raw scenario liabilities: mean of the worst (1 - alpha)
/// fraction, where worst means largest.
pub fn cte(liabilities: &[f64], alpha: f64) -> Result<f64, PricingError> {
    if liabilities.is_empty() {
        return Err(PricingError::Data(
            "CTE requires at least one scenario liability".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&alpha) {
        return Err(PricingError::precondition(
            "CTE level must be in [0, 1)",
            alpha,
        ));
    }
    let mut sorted = liabilities.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let k = tail_size(sorted.len(), alpha);
    Ok(sorted[..k].iter().sum::<f64>() / k as f64)
}

/// CTE at a grid of levels, for reserve sensitivity reporting.
pub fn cte_levels(
    liabilities: &[f64],
    levels: &[f64],
) -> Result<Vec<(f64, f64)>, PricingError> {
    levels
        .iter()
        .map(|&alpha| cte(liabilities, alpha).map(|value| (alpha, value)))
        .collect()
}
