//! MYGA pricing: a fixed-rate guarantee discounted off the market curve.

use chrono::Utc;
use tracing::debug;

use annuity_core::{PricingError, PvResult, YieldCurve};

/// Multi-Year Guaranteed Annuity pricer.
#[derive(Debug, Clone, PartialEq)]
pub struct MygaPricer {
    discount_curve: YieldCurve,
}

impl MygaPricer {
    pub fn new(discount_curve: YieldCurve) -> Self {
        MygaPricer { discount_curve }
    }

    /// Flat-rate convenience constructor.
    pub fn with_flat_rate(rate: f64) -> Self {
        MygaPricer {
            discount_curve: YieldCurve::flat(rate),
        }
    }

    /// PV of the guaranteed maturity value: premium compounded at the
    /// contract rate, discounted at the market zero rate for the term.
    pub fn price(
        &self,
        fixed_rate: f64,
        guarantee_years: u32,
        premium: f64,
    ) -> Result<PvResult, PricingError> {
        if fixed_rate < 0.0 {
            return Err(PricingError::precondition(
                "MYGA fixed rate must be >= 0",
                fixed_rate,
            ));
        }
        if guarantee_years < 1 {
            return Err(PricingError::precondition(
                "MYGA guarantee duration must be >= 1 year",
                guarantee_years as f64,
            ));
        }
        if premium <= 0.0 {
            return Err(PricingError::precondition("premium must be > 0", premium));
        }

        let years = guarantee_years as f64;
        let maturity_value = premium * (1.0 + fixed_rate).powi(guarantee_years as i32);
        let present_value = maturity_value * self.discount_curve.discount_factor(years);

        debug!(fixed_rate, guarantee_years, present_value, "myga priced");
        Ok(PvResult {
            present_value,
            duration: years,
            as_of_date: Utc::now().date_naive(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pv_is_discounted_accumulation() {
        let pricer = MygaPricer::with_flat_rate(0.04);
        let result = pricer.price(0.045, 5, 100_000.0).unwrap();
        let expected = 100_000.0 * 1.045_f64.powi(5) * (-0.04_f64 * 5.0).exp();
        assert!((result.present_value - expected).abs() < 1e-6);
        assert!((result.duration - 5.0).abs() < 1e-12);
    }

    #[test]
    fn contract_rate_above_market_rate_is_worth_more_than_premium() {
        let pricer = MygaPricer::with_flat_rate(0.03);
        let result = pricer.price(0.05, 7, 100_000.0).unwrap();
        assert!(result.present_value > 100_000.0);
    }

    #[test]
    fn curve_discounting_uses_the_term_zero_rate() {
        let curve = YieldCurve::new(vec![(1.0, 0.03), (5.0, 0.05)]).unwrap();
        let pricer = MygaPricer::new(curve);
        let result = pricer.price(0.04, 5, 100.0).unwrap();
        let expected = 100.0 * 1.04_f64.powi(5) * (-0.05_f64 * 5.0).exp();
        assert!((result.present_value - expected).abs() < 1e-9);
    }

    #[test]
    fn bad_inputs_rejected() {
        let pricer = MygaPricer::with_flat_rate(0.04);
        assert!(pricer.price(-0.01, 5, 100.0).is_err());
        assert!(pricer.price(0.04, 0, 100.0).is_err());
        assert!(pricer.price(0.04, 5, 0.0).is_err());
    }
}
