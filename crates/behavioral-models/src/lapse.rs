//! Moneyness-responsive dynamic lapse.
//!
//! Policyholders holding an in-the-money guarantee (account value small
//! relative to the guaranteed base) lapse less; out-of-the-money guarantees
//! encourage lapsing. Moneyness is AV/GWB everywhere in this workspace and
//! lapse is non-decreasing in it.

use serde::{Deserialize, Serialize};

use annuity_core::PricingError;

/// Lapse rate assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapseAssumptions {
    /// Base annual lapse rate outside the surrender period.
    pub base_annual_lapse: f64,
    /// Floor on the dynamic lapse rate.
    pub min_lapse: f64,
    /// Cap on the dynamic lapse rate.
    pub max_lapse: f64,
    /// Responsiveness of lapse to moneyness; must be >= 0 for lapse to be
    /// non-decreasing in AV/GWB.
    pub sensitivity: f64,
}

impl Default for LapseAssumptions {
    fn default() -> Self {
        LapseAssumptions {
            base_annual_lapse: 0.05,
            min_lapse: 0.01,
            max_lapse: 0.25,
            sensitivity: 1.0,
        }
    }
}

/// One lapse evaluation with its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapseResult {
    pub lapse_rate: f64,
    pub moneyness: f64,
    pub adjustment_factor: f64,
}

/// Dynamic lapse model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicLapseModel {
    pub assumptions: LapseAssumptions,
}

impl DynamicLapseModel {
    pub fn new(assumptions: LapseAssumptions) -> Result<Self, PricingError> {
        if assumptions.sensitivity < 0.0 {
            return Err(PricingError::precondition(
                "lapse sensitivity must be >= 0",
                assumptions.sensitivity,
            ));
        }
        if assumptions.min_lapse > assumptions.max_lapse {
            return Err(PricingError::precondition(
                "lapse floor must not exceed lapse cap",
                assumptions.min_lapse,
            ));
        }
        Ok(DynamicLapseModel { assumptions })
    }

    /// Moneyness is account value over guaranteed base; 1 when there is no
    /// guarantee to compare against.
    pub fn moneyness(av: f64, gwb: f64) -> f64 {
        if gwb > 0.0 {
            av / gwb
        } else {
            1.0
        }
    }

    /// Lapse rate for the current state. The base rate is cut to 20% while
    /// the surrender period is still running.
    pub fn lapse_rate(
        &self,
        av: f64,
        gwb: f64,
        surrender_period_complete: bool,
    ) -> Result<LapseResult, PricingError> {
        if av < 0.0 {
            return Err(PricingError::precondition(
                "account value must be >= 0",
                av,
            ));
        }
        if gwb < 0.0 {
            return Err(PricingError::precondition(
                "guaranteed base must be >= 0",
                gwb,
            ));
        }

        let a = &self.assumptions;
        let moneyness = Self::moneyness(av, gwb);
        let adjustment_factor = moneyness.powf(a.sensitivity);

        let base_rate = if surrender_period_complete {
            a.base_annual_lapse
        } else {
            a.base_annual_lapse * 0.2
        };

        let lapse_rate = (base_rate * adjustment_factor).clamp(a.min_lapse, a.max_lapse);

        Ok(LapseResult {
            lapse_rate,
            moneyness,
            adjustment_factor,
        })
    }

    /// Cumulative survival over a path of annual lapse rates:
    /// survival_{t+1} = survival_t (1 - lapse_t dt). The first element is 1.
    pub fn survival_curve(&self, lapse_rates: &[f64], dt: f64) -> Vec<f64> {
        let mut survival = Vec::with_capacity(lapse_rates.len() + 1);
        survival.push(1.0);
        let mut current = 1.0;
        for rate in lapse_rates {
            current *= (1.0 - rate * dt).max(0.0);
            survival.push(current);
        }
        survival
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DynamicLapseModel {
        DynamicLapseModel::new(LapseAssumptions::default()).unwrap()
    }

    #[test]
    fn itm_guarantee_deters_lapse() {
        let m = model();
        // AV well below GWB: guarantee is valuable, lapse below base.
        let itm = m.lapse_rate(60_000.0, 100_000.0, true).unwrap();
        assert!(itm.lapse_rate < 0.05);
        // AV well above GWB: guarantee worthless, lapse above base.
        let otm = m.lapse_rate(150_000.0, 100_000.0, true).unwrap();
        assert!(otm.lapse_rate > 0.05);
    }

    #[test]
    fn lapse_is_monotone_in_moneyness() {
        let m = model();
        let mut previous = 0.0;
        for step in 1..=40 {
            let av = 5_000.0 * step as f64;
            let result = m.lapse_rate(av, 100_000.0, true).unwrap();
            assert!(
                result.lapse_rate >= previous,
                "lapse decreased at av={av}"
            );
            previous = result.lapse_rate;
        }
    }

    #[test]
    fn surrender_period_cuts_the_base_rate() {
        let m = model();
        let during = m.lapse_rate(100_000.0, 100_000.0, false).unwrap();
        let after = m.lapse_rate(100_000.0, 100_000.0, true).unwrap();
        assert!(during.lapse_rate < after.lapse_rate);
        assert!((during.lapse_rate - 0.01).abs() < 1e-12); // 0.05 * 0.2, at the floor
        assert!((after.lapse_rate - 0.05).abs() < 1e-12);
    }

    #[test]
    fn rates_respect_floor_and_cap() {
        let m = model();
        let floored = m.lapse_rate(1_000.0, 100_000.0, true).unwrap();
        assert!((floored.lapse_rate - 0.01).abs() < 1e-12);
        let capped = m.lapse_rate(10_000_000.0, 100_000.0, true).unwrap();
        assert!((capped.lapse_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_gwb_uses_base_rate() {
        let m = model();
        let result = m.lapse_rate(50_000.0, 0.0, true).unwrap();
        assert!((result.moneyness - 1.0).abs() < 1e-12);
        assert!((result.lapse_rate - 0.05).abs() < 1e-12);
    }

    #[test]
    fn survival_curve_is_decreasing_product() {
        let m = model();
        let survival = m.survival_curve(&[0.05, 0.10, 0.25], 1.0);
        assert_eq!(survival.len(), 4);
        assert!((survival[0] - 1.0).abs() < 1e-15);
        assert!((survival[1] - 0.95).abs() < 1e-12);
        assert!((survival[2] - 0.95 * 0.90).abs() < 1e-12);
        assert!((survival[3] - 0.95 * 0.90 * 0.75).abs() < 1e-12);
    }

    #[test]
    fn negative_inputs_rejected() {
        let m = model();
        assert!(m.lapse_rate(-1.0, 100.0, true).is_err());
        assert!(m.lapse_rate(100.0, -1.0, true).is_err());
        assert!(DynamicLapseModel::new(LapseAssumptions {
            sensitivity: -0.5,
            ..Default::default()
        })
        .is_err());
    }
}
