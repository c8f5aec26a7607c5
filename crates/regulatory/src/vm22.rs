//! VM-22 principle-based reserve for fixed annuities.
//!
//! The deterministic reserve runs the prescribed scenario family (base,
//! rates up, rates down) and takes the worst discounted maturity benefit.
//! The stochastic exclusion ratio test measures how sensitive the reserve is
//! to the rate stress; a small ratio exempts the product from full
//! stochastic modeling.

use serde::{Deserialize, Serialize};
use tracing::debug;

use annuity_core::PricingError;

use crate::scenarios::{deterministic_scenarios, EconomicScenario};

/// Ratio threshold below which the stochastic exclusion test passes.
const EXCLUSION_RATIO_THRESHOLD: f64 = 0.045;

/// A MYGA-style fixed annuity under reserve valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedAnnuityPolicy {
    pub premium: f64,
    pub fixed_rate: f64,
    pub guarantee_years: u32,
}

impl FixedAnnuityPolicy {
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.premium <= 0.0 {
            return Err(PricingError::precondition(
                "premium must be > 0",
                self.premium,
            ));
        }
        if self.fixed_rate < 0.0 {
            return Err(PricingError::precondition(
                "fixed rate must be >= 0",
                self.fixed_rate,
            ));
        }
        if self.guarantee_years < 1 {
            return Err(PricingError::precondition(
                "guarantee duration must be >= 1 year",
                self.guarantee_years as f64,
            ));
        }
        Ok(())
    }

    /// Guaranteed maturity benefit: premium compounded at the contract rate.
    pub fn maturity_benefit(&self) -> f64 {
        self.premium * (1.0 + self.fixed_rate).powi(self.guarantee_years as i32)
    }
}

/// Deterministic reserve output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vm22Result {
    /// Worst scenario reserve.
    pub reserve: f64,
    /// Reserve under each prescribed scenario, in scenario-id order.
    pub scenario_reserves: Vec<f64>,
}

/// Stochastic exclusion ratio test output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticExclusionResult {
    pub ratio: f64,
    pub passes: bool,
}

/// VM-22 calculator over the prescribed deterministic scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vm22Calculator;

impl Vm22Calculator {
    /// Deterministic reserve: the largest PV of the maturity benefit across
    /// the prescribed scenario family, discounted along each rate path.
    pub fn deterministic_reserve(
        &self,
        policy: &FixedAnnuityPolicy,
        base_rate: f64,
    ) -> Result<Vm22Result, PricingError> {
        policy.validate()?;
        if base_rate < 0.0 {
            return Err(PricingError::precondition(
                "base rate must be >= 0",
                base_rate,
            ));
        }

        let family = deterministic_scenarios(policy.guarantee_years as usize, base_rate, 0.07);
        let scenario_reserves: Vec<f64> = family
            .iter()
            .map(|scenario| self.scenario_reserve(policy, scenario))
            .collect();
        let reserve = scenario_reserves
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        debug!(reserve, "vm-22 deterministic reserve computed");
        Ok(Vm22Result {
            reserve,
            scenario_reserves,
        })
    }

    /// Exclusion ratio: reserve spread across the rate stresses relative to
    /// the worst reserve. Products whose reserve barely moves under the
    /// stress family are exempt from stochastic modeling.
    pub fn stochastic_exclusion_test(
        &self,
        policy: &FixedAnnuityPolicy,
        base_rate: f64,
    ) -> Result<StochasticExclusionResult, PricingError> {
        let result = self.deterministic_reserve(policy, base_rate)?;
        let max = result
            .scenario_reserves
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        let min = result
            .scenario_reserves
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        if max <= 0.0 {
            return Err(PricingError::Numeric {
                what: "exclusion ratio undefined for non-positive reserve".to_string(),
                value: max,
                iterations: 0,
            });
        }
        let ratio = (max - min) / max;
        Ok(StochasticExclusionResult {
            ratio,
            passes: ratio < EXCLUSION_RATIO_THRESHOLD,
        })
    }

    fn scenario_reserve(&self, policy: &FixedAnnuityPolicy, scenario: &EconomicScenario) -> f64 {
        let discount: f64 = scenario
            .rates
            .iter()
            .take(policy.guarantee_years as usize)
            .map(|r| (-r).exp())
            .product();
        policy.maturity_benefit() * discount
    }
}
