//! GLWB withdrawal utilization.
//!
//! Policyholders rarely take the full guaranteed amount. Utilization starts
//! near 70%, rises with age, and ramps up over the first three withdrawal
//! years.

use serde::{Deserialize, Serialize};

use annuity_core::PricingError;

/// Withdrawal behavior assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalAssumptions {
    pub base_utilization: f64,
    /// Additional utilization per year of age over 65.
    pub age_sensitivity: f64,
    pub min_utilization: f64,
    pub max_utilization: f64,
}

impl Default for WithdrawalAssumptions {
    fn default() -> Self {
        WithdrawalAssumptions {
            base_utilization: 0.70,
            age_sensitivity: 0.01,
            min_utilization: 0.30,
            max_utilization: 1.00,
        }
    }
}

/// One withdrawal evaluation with its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalResult {
    pub withdrawal_amount: f64,
    pub utilization_rate: f64,
    pub max_allowed: f64,
}

/// Withdrawal utilization model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalModel {
    pub assumptions: WithdrawalAssumptions,
}

impl WithdrawalModel {
    pub fn new(assumptions: WithdrawalAssumptions) -> Result<Self, PricingError> {
        if assumptions.min_utilization > assumptions.max_utilization {
            return Err(PricingError::precondition(
                "utilization floor must not exceed cap",
                assumptions.min_utilization,
            ));
        }
        if assumptions.max_utilization > 1.0 {
            return Err(PricingError::precondition(
                "utilization cap must be <= 1",
                assumptions.max_utilization,
            ));
        }
        Ok(WithdrawalModel { assumptions })
    }

    /// Expected withdrawal: GWB x contract rate x utilization.
    pub fn expected_withdrawal(
        &self,
        gwb: f64,
        withdrawal_rate: f64,
        age: u32,
        years_since_first_withdrawal: u32,
    ) -> Result<WithdrawalResult, PricingError> {
        if gwb < 0.0 {
            return Err(PricingError::precondition(
                "guaranteed base must be >= 0",
                gwb,
            ));
        }
        if !(0.0..=1.0).contains(&withdrawal_rate) {
            return Err(PricingError::precondition(
                "withdrawal rate must be in [0, 1]",
                withdrawal_rate,
            ));
        }

        let max_allowed = gwb * withdrawal_rate;
        let utilization = self.utilization(age, years_since_first_withdrawal);

        Ok(WithdrawalResult {
            withdrawal_amount: max_allowed * utilization,
            utilization_rate: utilization,
            max_allowed,
        })
    }

    /// Utilization rate from age and withdrawal tenure: base plus an age
    /// adjustment above 65, ramped 70/80/90% in the first three withdrawal
    /// years, then clipped.
    pub fn utilization(&self, age: u32, years_since_first_withdrawal: u32) -> f64 {
        let a = &self.assumptions;
        let mut utilization = a.base_utilization + a.age_sensitivity * (age.saturating_sub(65)) as f64;
        if years_since_first_withdrawal < 3 {
            utilization *= 0.7 + 0.1 * years_since_first_withdrawal as f64;
        }
        utilization.clamp(a.min_utilization, a.max_utilization)
    }

    /// Typical contract withdrawal rate by age at first withdrawal.
    pub fn withdrawal_rate_for_age(age: u32) -> f64 {
        match age {
            0..=54 => 0.035,
            55..=59 => 0.040,
            60..=64 => 0.045,
            65..=69 => 0.050,
            70..=74 => 0.055,
            _ => 0.060,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> WithdrawalModel {
        WithdrawalModel::new(WithdrawalAssumptions::default()).unwrap()
    }

    #[test]
    fn utilization_rises_with_age() {
        let m = model();
        let at_65 = m.utilization(65, 5);
        let at_75 = m.utilization(75, 5);
        let at_90 = m.utilization(90, 5);
        assert!((at_65 - 0.70).abs() < 1e-12);
        assert!((at_75 - 0.80).abs() < 1e-12);
        assert!(at_75 > at_65);
        assert!((at_90 - 0.95).abs() < 1e-12);
    }

    #[test]
    fn early_years_ramp_up() {
        let m = model();
        assert!((m.utilization(65, 0) - 0.70 * 0.7).abs() < 1e-12);
        assert!((m.utilization(65, 1) - 0.70 * 0.8).abs() < 1e-12);
        assert!((m.utilization(65, 2) - 0.70 * 0.9).abs() < 1e-12);
        assert!((m.utilization(65, 3) - 0.70).abs() < 1e-12);
    }

    #[test]
    fn utilization_is_clipped() {
        let m = model();
        // Very old annuitant: base 0.70 + 0.50 clipped to the 1.0 cap.
        assert!((m.utilization(115, 10) - 1.0).abs() < 1e-12);
        // Aggressive ramp floor.
        let tight = WithdrawalModel::new(WithdrawalAssumptions {
            base_utilization: 0.30,
            ..Default::default()
        })
        .unwrap();
        assert!((tight.utilization(40, 0) - 0.30).abs() < 1e-12);
    }

    #[test]
    fn expected_withdrawal_scales_the_guaranteed_amount() {
        let m = model();
        let result = m.expected_withdrawal(100_000.0, 0.05, 70, 5).unwrap();
        assert!((result.max_allowed - 5_000.0).abs() < 1e-9);
        assert!((result.utilization_rate - 0.75).abs() < 1e-12);
        assert!((result.withdrawal_amount - 3_750.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let m = model();
        assert!(m.expected_withdrawal(-1.0, 0.05, 70, 0).is_err());
        assert!(m.expected_withdrawal(100.0, 1.5, 70, 0).is_err());
    }

    #[test]
    fn age_banded_rates_are_non_decreasing() {
        let mut previous = 0.0;
        for age in [40, 55, 60, 65, 70, 75, 90] {
            let rate = WithdrawalModel::withdrawal_rate_for_age(age);
            assert!(rate >= previous);
            previous = rate;
        }
        assert!((WithdrawalModel::withdrawal_rate_for_age(67) - 0.05).abs() < 1e-12);
    }
}
