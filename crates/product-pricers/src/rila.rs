//! RILA pricing: capped index upside with buffered or floored downside.
//!
//! The protection leg replicates as puts (buffer = ATM/OTM put spread,
//! floor = long OTM put), the upside as a call spread, and the expected
//! return is simulated against the product payoff.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use annuity_core::{
    MarketParams, PricingConfig, PricingError, Product, ProductTerms, Protection, RilaResult,
};
use option_pricing::{
    black_scholes::{self, OptionType},
    monte_carlo::McEngine,
    payoff::RilaPayoff,
    GbmParams,
};

/// Hedge Greeks of the embedded protection position.
///
/// Buffer = long ATM put, short OTM put; floor = long OTM put. Signs are
/// from the policyholder's side of the replication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RilaGreeks {
    pub protection: Protection,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
    /// Delta of the long ATM put leg (zero for floors).
    pub atm_put_delta: f64,
    /// Delta of the OTM put leg, signed by position.
    pub otm_put_delta: f64,
    pub dollar_delta: f64,
}

/// Registered Index-Linked Annuity pricer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RilaPricer {
    market: MarketParams,
    config: PricingConfig,
}

impl RilaPricer {
    pub fn new(market: MarketParams, config: PricingConfig) -> Result<Self, PricingError> {
        market.validate()?;
        config.validate()?;
        Ok(RilaPricer { market, config })
    }

    /// Price a RILA product. `term_years` falls back to the product's term.
    pub fn price(
        &self,
        product: &Product,
        term_years: Option<f64>,
        premium: f64,
    ) -> Result<RilaResult, PricingError> {
        let (protection, cap_rate, product_term) = match &product.terms {
            ProductTerms::Rila {
                protection,
                cap_rate,
                term_years,
                ..
            } => (*protection, *cap_rate, *term_years),
            _ => {
                return Err(PricingError::Data(format!(
                    "product '{}' is not a RILA",
                    product.product_name
                )))
            }
        };
        let term_years = term_years.unwrap_or(product_term as f64);
        if term_years <= 0.0 {
            return Err(PricingError::precondition(
                "term must be > 0 years",
                term_years,
            ));
        }
        if premium <= 0.0 {
            return Err(PricingError::precondition("premium must be > 0", premium));
        }
        product.validate()?;
        if let Some(cap) = cap_rate {
            if cap < 0.0 {
                return Err(PricingError::precondition("cap rate must be >= 0", cap));
            }
        }

        let payoff = RilaPayoff::new(protection, cap_rate);
        let protection_value = self.protection_value(&protection, term_years, premium)?;
        let upside_value = self.upside_value(cap_rate, term_years, premium)?;
        let expected_return = self.expected_return(&payoff, term_years)?;
        let max_loss = protection.max_loss();
        let breakeven_return = payoff.breakeven_return();

        // Negative PVs are possible here and are surfaced to the validation
        // gates rather than clipped.
        let discount = (-self.market.risk_free_rate * term_years).exp();
        let present_value = discount * premium * (1.0 + expected_return);

        debug!(
            product = %product.product_name,
            protection = protection.label(),
            expected_return,
            "rila priced"
        );
        Ok(RilaResult {
            present_value,
            duration: term_years,
            as_of_date: Utc::now().date_naive(),
            protection_value,
            protection,
            upside_value,
            expected_return,
            max_loss,
            breakeven_return,
        })
    }

    /// Hedge Greeks of the protection replication.
    pub fn greeks(
        &self,
        product: &Product,
        term_years: Option<f64>,
        notional: f64,
    ) -> Result<RilaGreeks, PricingError> {
        let (protection, product_term) = match &product.terms {
            ProductTerms::Rila {
                protection,
                term_years,
                ..
            } => (*protection, *term_years),
            _ => {
                return Err(PricingError::Data(format!(
                    "product '{}' is not a RILA",
                    product.product_name
                )))
            }
        };
        let term_years = term_years.unwrap_or(product_term as f64);
        if term_years <= 0.0 {
            return Err(PricingError::precondition(
                "term must be > 0 years",
                term_years,
            ));
        }

        let m = &self.market;
        let otm_strike = m.spot * (1.0 - protection.rate());

        let (greeks, atm_put_delta, otm_put_delta) = match protection {
            Protection::Buffer(_) => {
                let atm = black_scholes::greeks(
                    m.spot,
                    m.spot,
                    m.risk_free_rate,
                    m.dividend_yield,
                    m.volatility,
                    term_years,
                    OptionType::Put,
                )?;
                let otm = black_scholes::greeks(
                    m.spot,
                    otm_strike,
                    m.risk_free_rate,
                    m.dividend_yield,
                    m.volatility,
                    term_years,
                    OptionType::Put,
                )?;
                // Long ATM, short OTM.
                (atm - otm, atm.delta, -otm.delta)
            }
            Protection::Floor(_) => {
                let otm = black_scholes::greeks(
                    m.spot,
                    otm_strike,
                    m.risk_free_rate,
                    m.dividend_yield,
                    m.volatility,
                    term_years,
                    OptionType::Put,
                )?;
                (otm, 0.0, otm.delta)
            }
        };

        Ok(RilaGreeks {
            protection,
            delta: greeks.delta,
            gamma: greeks.gamma,
            vega: greeks.vega,
            theta: greeks.theta,
            rho: greeks.rho,
            atm_put_delta,
            otm_put_delta,
            dollar_delta: greeks.delta * m.spot * notional,
        })
    }

    fn protection_value(
        &self,
        protection: &Protection,
        term_years: f64,
        premium: f64,
    ) -> Result<f64, PricingError> {
        let m = &self.market;
        let value = match protection {
            Protection::Buffer(rate) => black_scholes::buffer_put_spread_value(
                m.spot,
                *rate,
                m.risk_free_rate,
                m.dividend_yield,
                m.volatility,
                term_years,
            )?,
            Protection::Floor(rate) => black_scholes::floor_put_value(
                m.spot,
                *rate,
                m.risk_free_rate,
                m.dividend_yield,
                m.volatility,
                term_years,
            )?,
        };
        Ok(value / m.spot * premium)
    }

    fn upside_value(
        &self,
        cap_rate: Option<f64>,
        term_years: f64,
        premium: f64,
    ) -> Result<f64, PricingError> {
        let m = &self.market;
        let value = match cap_rate {
            Some(cap) if cap > 0.0 => black_scholes::capped_call_value(
                m.spot,
                m.spot,
                m.spot * (1.0 + cap),
                m.risk_free_rate,
                m.dividend_yield,
                m.volatility,
                term_years,
            )?,
            _ => black_scholes::call_price(
                m.spot,
                m.spot,
                m.risk_free_rate,
                m.dividend_yield,
                m.volatility,
                term_years,
            )?,
        };
        Ok(value / m.spot * premium)
    }

    fn expected_return(&self, payoff: &RilaPayoff, term_years: f64) -> Result<f64, PricingError> {
        let params = GbmParams::from_market(&self.market, term_years)?;
        let engine = McEngine::new(self.config.n_mc_paths, self.config.antithetic, self.config.seed)?;
        let result = engine.price_terminal(&params, |index_return| payoff.apply(index_return))?;
        Ok(result.mean_payoff)
    }
}
