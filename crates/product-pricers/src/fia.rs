//! FIA pricing: principal protection plus an embedded index-linked option.
//!
//! The embedded option is priced closed-form per crediting method, the
//! expected credit by Monte Carlo, and the fair cap / fair participation by
//! spending the option budget exactly.

use chrono::Utc;
use tracing::debug;

use annuity_core::{
    CreditingMethod, FiaResult, IndexingMethod, MarketParams, PricingConfig, PricingError,
    Product, ProductTerms,
};
use option_pricing::{black_scholes, monte_carlo::McEngine, payoff::FiaPayoff, solver, GbmParams};

/// Fixed Indexed Annuity pricer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiaPricer {
    market: MarketParams,
    config: PricingConfig,
}

impl FiaPricer {
    pub fn new(market: MarketParams, config: PricingConfig) -> Result<Self, PricingError> {
        market.validate()?;
        config.validate()?;
        Ok(FiaPricer { market, config })
    }

    /// Price a FIA product over `term_years` on a `premium` notional.
    pub fn price(
        &self,
        product: &Product,
        term_years: f64,
        premium: f64,
    ) -> Result<FiaResult, PricingError> {
        let indexing_method = match &product.terms {
            ProductTerms::Fia {
                indexing_method, ..
            } => *indexing_method,
            _ => {
                return Err(PricingError::Data(format!(
                    "product '{}' is not a FIA",
                    product.product_name
                )))
            }
        };
        if term_years <= 0.0 {
            return Err(PricingError::precondition(
                "term must be > 0 years",
                term_years,
            ));
        }
        if premium <= 0.0 {
            return Err(PricingError::precondition("premium must be > 0", premium));
        }

        let method = product.crediting_method()?;
        self.validate_method(&method)?;

        let option_budget = premium * self.config.option_budget_pct;
        let embedded_option_value = self.embedded_option_value(&method, term_years, premium)?;
        let expected_credit = self.expected_credit(&method, indexing_method, term_years)?;
        let fair_cap = solver::solve_fair_cap(&self.market, term_years, self.config.option_budget_pct)?;
        let fair_participation =
            solver::solve_fair_participation(&self.market, term_years, self.config.option_budget_pct)?;

        // Maturity payoff is principal plus credit, discounted at the
        // risk-free rate.
        let discount = (-self.market.risk_free_rate * term_years).exp();
        let present_value = discount * premium * (1.0 + expected_credit);

        debug!(
            product = %product.product_name,
            expected_credit,
            embedded_option_value,
            "fia priced"
        );
        Ok(FiaResult {
            present_value,
            duration: term_years,
            as_of_date: Utc::now().date_naive(),
            embedded_option_value,
            option_budget,
            fair_cap: Some(fair_cap),
            fair_participation: Some(fair_participation),
            expected_credit,
        })
    }

    fn validate_method(&self, method: &CreditingMethod) -> Result<(), PricingError> {
        let check = |name: &str, rate: f64| {
            if rate < 0.0 {
                Err(PricingError::precondition(
                    format!("{name} must be >= 0"),
                    rate,
                ))
            } else {
                Ok(())
            }
        };
        match method {
            CreditingMethod::Cap { cap_rate } => check("cap rate", *cap_rate),
            CreditingMethod::Participation { rate, .. } => check("participation rate", *rate),
            CreditingMethod::Spread { rate, .. } => check("spread rate", *rate),
            CreditingMethod::Trigger { rate } => check("trigger rate", *rate),
        }
    }

    /// Closed-form value of the embedded option, scaled to the premium.
    fn embedded_option_value(
        &self,
        method: &CreditingMethod,
        term_years: f64,
        premium: f64,
    ) -> Result<f64, PricingError> {
        let m = &self.market;
        match method {
            CreditingMethod::Cap { cap_rate } => {
                if *cap_rate <= 0.0 {
                    return Ok(0.0);
                }
                let capped = black_scholes::capped_call_value(
                    m.spot,
                    m.spot,
                    m.spot * (1.0 + cap_rate),
                    m.risk_free_rate,
                    m.dividend_yield,
                    m.volatility,
                    term_years,
                )?;
                Ok(capped / m.spot * premium)
            }
            CreditingMethod::Participation { rate, .. } => {
                let atm = black_scholes::call_price(
                    m.spot,
                    m.spot,
                    m.risk_free_rate,
                    m.dividend_yield,
                    m.volatility,
                    term_years,
                )?;
                Ok(rate * atm / m.spot * premium)
            }
            CreditingMethod::Spread { rate, .. } => {
                let shifted = black_scholes::call_price(
                    m.spot,
                    m.spot * (1.0 + rate),
                    m.risk_free_rate,
                    m.dividend_yield,
                    m.volatility,
                    term_years,
                )?;
                Ok(shifted / m.spot * premium)
            }
            CreditingMethod::Trigger { rate } => black_scholes::digital_call_price(
                m.spot,
                m.spot,
                m.risk_free_rate,
                m.dividend_yield,
                m.volatility,
                term_years,
                rate * premium,
            ),
        }
    }

    /// Expected credited return by Monte Carlo, in decimal.
    fn expected_credit(
        &self,
        method: &CreditingMethod,
        indexing_method: IndexingMethod,
        term_years: f64,
    ) -> Result<f64, PricingError> {
        // A zero cap means no upside; skip the simulation.
        if matches!(method, CreditingMethod::Cap { cap_rate } if *cap_rate == 0.0) {
            return Ok(0.0);
        }

        let payoff = FiaPayoff::from_method(*method);
        let params = GbmParams::from_market(&self.market, term_years)?;
        let engine = McEngine::new(self.config.n_mc_paths, self.config.antithetic, self.config.seed)?;

        let result = match indexing_method {
            IndexingMethod::AnnualPointToPoint => {
                engine.price_terminal(&params, |index_return| payoff.apply(index_return))?
            }
            // Monthly averaging credits the method payoff of the averaged
            // observation.
            IndexingMethod::MonthlyAverage => engine.price_monthly(&params, |months| {
                let mean = months.iter().sum::<f64>() / months.len() as f64;
                payoff.apply(mean)
            })?,
        };
        Ok(result.mean_payoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> MarketParams {
        MarketParams {
            spot: 100.0,
            risk_free_rate: 0.05,
            dividend_yield: 0.02,
            volatility: 0.20,
        }
    }

    fn config() -> PricingConfig {
        PricingConfig {
            n_mc_paths: 50_000,
            ..Default::default()
        }
    }

    fn cap_product(cap: f64) -> Product {
        Product {
            company_name: "Test Life".to_string(),
            product_name: "S&P 500 Cap".to_string(),
            status: "current".to_string(),
            terms: ProductTerms::Fia {
                cap_rate: Some(cap),
                participation_rate: None,
                spread_rate: None,
                trigger_rate: None,
                index: "S&P 500".to_string(),
                indexing_method: IndexingMethod::AnnualPointToPoint,
                term_years: 1,
            },
        }
    }

    #[test]
    fn capped_product_credit_and_embedded_option() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let result = pricer.price(&cap_product(0.08), 1.0, 100.0).unwrap();

        // The 8% cap credits between the floor and the cap on average.
        assert!(
            result.expected_credit > 0.02 && result.expected_credit < 0.06,
            "expected credit = {}",
            result.expected_credit
        );
        // Embedded option equals the closed-form call spread.
        let m = market();
        let spread = black_scholes::capped_call_value(
            100.0, 100.0, 108.0, m.risk_free_rate, m.dividend_yield, m.volatility, 1.0,
        )
        .unwrap();
        assert!((result.embedded_option_value - spread).abs() < 1e-9);
        assert!(result.present_value > 0.0);
    }

    #[test]
    fn mc_credit_reconciles_with_replication() {
        // PV of the capped credit must match the call spread within Monte
        // Carlo error.
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let result = pricer.price(&cap_product(0.08), 1.0, 100.0).unwrap();
        let m = market();
        let spread_pct = black_scholes::capped_call_value(
            100.0, 100.0, 108.0, m.risk_free_rate, m.dividend_yield, m.volatility, 1.0,
        )
        .unwrap()
            / 100.0;
        let pv_credit = (-m.risk_free_rate).exp() * result.expected_credit;
        assert!(
            (pv_credit - spread_pct).abs() < 0.002,
            "pv credit {pv_credit} vs replication {spread_pct}"
        );
    }

    #[test]
    fn higher_cap_earns_higher_credit() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let low = pricer.price(&cap_product(0.05), 1.0, 100.0).unwrap();
        let high = pricer.price(&cap_product(0.15), 1.0, 100.0).unwrap();
        assert!(high.expected_credit > low.expected_credit);
    }

    #[test]
    fn zero_cap_credits_nothing() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let result = pricer.price(&cap_product(0.0), 1.0, 100.0).unwrap();
        assert_eq!(result.expected_credit, 0.0);
        assert_eq!(result.embedded_option_value, 0.0);
    }

    #[test]
    fn participation_product_scales_the_atm_call() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let product = Product {
            company_name: "Test Life".to_string(),
            product_name: "S&P 500 Participation".to_string(),
            status: "current".to_string(),
            terms: ProductTerms::Fia {
                cap_rate: None,
                participation_rate: Some(0.8),
                spread_rate: None,
                trigger_rate: None,
                index: "S&P 500".to_string(),
                indexing_method: IndexingMethod::AnnualPointToPoint,
                term_years: 1,
            },
        };
        let result = pricer.price(&product, 1.0, 100.0).unwrap();
        let m = market();
        let atm = black_scholes::call_price(
            100.0, 100.0, m.risk_free_rate, m.dividend_yield, m.volatility, 1.0,
        )
        .unwrap();
        assert!((result.embedded_option_value - 0.8 * atm).abs() < 1e-9);
        assert!(result.expected_credit > 0.0);
    }

    #[test]
    fn trigger_product_uses_the_digital_value() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let product = Product {
            company_name: "Test Life".to_string(),
            product_name: "S&P 500 Trigger".to_string(),
            status: "current".to_string(),
            terms: ProductTerms::Fia {
                cap_rate: None,
                participation_rate: None,
                spread_rate: None,
                trigger_rate: Some(0.06),
                index: "S&P 500".to_string(),
                indexing_method: IndexingMethod::AnnualPointToPoint,
                term_years: 1,
            },
        };
        let result = pricer.price(&product, 1.0, 100.0).unwrap();
        let m = market();
        let digital = black_scholes::digital_call_price(
            100.0, 100.0, m.risk_free_rate, m.dividend_yield, m.volatility, 1.0, 6.0,
        )
        .unwrap();
        assert!((result.embedded_option_value - digital).abs() < 1e-9);
        // The credit is 6% with the risk-neutral ITM probability, 0 otherwise.
        assert!(result.expected_credit > 0.0 && result.expected_credit < 0.06);
    }

    #[test]
    fn monthly_average_credits_less_than_point_to_point() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let p2p = pricer.price(&cap_product(0.08), 1.0, 100.0).unwrap();

        let mut monthly_product = cap_product(0.08);
        if let ProductTerms::Fia {
            indexing_method, ..
        } = &mut monthly_product.terms
        {
            *indexing_method = IndexingMethod::MonthlyAverage;
        }
        let monthly = pricer.price(&monthly_product, 1.0, 100.0).unwrap();
        assert!(monthly.expected_credit < p2p.expected_credit);
        assert!(monthly.expected_credit >= 0.0);
    }

    #[test]
    fn fair_terms_reprice_to_the_budget() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let result = pricer.price(&cap_product(0.08), 1.0, 100.0).unwrap();
        let fair_cap = result.fair_cap.unwrap();
        let m = market();
        let value = black_scholes::capped_call_value(
            100.0,
            100.0,
            100.0 * (1.0 + fair_cap),
            m.risk_free_rate,
            m.dividend_yield,
            m.volatility,
            1.0,
        )
        .unwrap()
            / 100.0;
        assert!((value - 0.03).abs() < 1e-6);
        assert!(result.fair_participation.unwrap() > 0.0);
    }

    #[test]
    fn missing_crediting_method_fails_fast() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let product = Product {
            company_name: "Test Life".to_string(),
            product_name: "No Method".to_string(),
            status: "current".to_string(),
            terms: ProductTerms::Fia {
                cap_rate: None,
                participation_rate: None,
                spread_rate: None,
                trigger_rate: None,
                index: "S&P 500".to_string(),
                indexing_method: IndexingMethod::AnnualPointToPoint,
                term_years: 1,
            },
        };
        let err = pricer.price(&product, 1.0, 100.0).unwrap_err();
        assert!(matches!(err, PricingError::Data(_)));
    }

    #[test]
    fn non_fia_product_rejected() {
        let pricer = FiaPricer::new(market(), config()).unwrap();
        let product = Product {
            company_name: "Test Life".to_string(),
            product_name: "MYGA".to_string(),
            status: "current".to_string(),
            terms: ProductTerms::Myga {
                fixed_rate: 0.04,
                guarantee_years: 5,
            },
        };
        assert!(pricer.price(&product, 1.0, 100.0).is_err());
    }
}
