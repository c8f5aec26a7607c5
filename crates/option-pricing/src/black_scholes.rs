//! Closed-form Black-Scholes kernel.
//!
//! Prices vanilla calls and puts with a continuous dividend yield, the
//! standard Greeks, and the replication building blocks used by the product
//! pricers: capped call (call spread), buffer (put spread), floor (long put),
//! and digital call via N(d2).

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use annuity_core::PricingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

/// Standard Greeks. Vega is per 1% of volatility, theta per calendar day,
/// rho per 1% of rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
}

impl std::ops::Sub for Greeks {
    type Output = Greeks;

    fn sub(self, rhs: Greeks) -> Greeks {
        Greeks {
            delta: self.delta - rhs.delta,
            gamma: self.gamma - rhs.gamma,
            vega: self.vega - rhs.vega,
            theta: self.theta - rhs.theta,
            rho: self.rho - rhs.rho,
        }
    }
}

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}

fn validate_inputs(spot: f64, strike: f64, volatility: f64, t: f64) -> Result<(), PricingError> {
    if spot <= 0.0 {
        return Err(PricingError::precondition("spot must be > 0", spot));
    }
    if strike <= 0.0 {
        return Err(PricingError::precondition("strike must be > 0", strike));
    }
    if volatility < 0.0 {
        return Err(PricingError::precondition(
            "volatility must be >= 0",
            volatility,
        ));
    }
    if t < 0.0 {
        return Err(PricingError::precondition("time to expiry must be >= 0", t));
    }
    Ok(())
}

/// d1 and d2 of the Black-Scholes formula.
///
/// Requires sigma > 0 and t > 0; the degenerate cases collapse to intrinsic
/// in the price functions before this is reached.
pub fn d1_d2(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
) -> Result<(f64, f64), PricingError> {
    validate_inputs(spot, strike, volatility, t)?;
    if volatility == 0.0 || t == 0.0 {
        return Err(PricingError::precondition(
            "d1/d2 undefined for zero volatility or zero expiry",
            volatility.min(t),
        ));
    }
    let sigma_sqrt_t = volatility * t.sqrt();
    let d1 = ((spot / strike).ln() + (rate - dividend + 0.5 * volatility * volatility) * t)
        / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;
    Ok((d1, d2))
}

/// European call under Black-Scholes with continuous dividend yield.
pub fn call_price(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
) -> Result<f64, PricingError> {
    validate_inputs(spot, strike, volatility, t)?;
    if volatility == 0.0 || t == 0.0 {
        // Deterministic terminal price: discounted forward intrinsic.
        return Ok((spot * (-dividend * t).exp() - strike * (-rate * t).exp()).max(0.0));
    }
    let (d1, d2) = d1_d2(spot, strike, rate, dividend, volatility, t)?;
    let n = std_normal();
    let price =
        spot * (-dividend * t).exp() * n.cdf(d1) - strike * (-rate * t).exp() * n.cdf(d2);
    if !price.is_finite() {
        return Err(PricingError::Numeric {
            what: "black-scholes call".to_string(),
            value: price,
            iterations: 0,
        });
    }
    Ok(price)
}

/// European put under Black-Scholes with continuous dividend yield.
pub fn put_price(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
) -> Result<f64, PricingError> {
    validate_inputs(spot, strike, volatility, t)?;
    if volatility == 0.0 || t == 0.0 {
        return Ok((strike * (-rate * t).exp() - spot * (-dividend * t).exp()).max(0.0));
    }
    let (d1, d2) = d1_d2(spot, strike, rate, dividend, volatility, t)?;
    let n = std_normal();
    let price =
        strike * (-rate * t).exp() * n.cdf(-d2) - spot * (-dividend * t).exp() * n.cdf(-d1);
    if !price.is_finite() {
        return Err(PricingError::Numeric {
            what: "black-scholes put".to_string(),
            value: price,
            iterations: 0,
        });
    }
    Ok(price)
}

/// Cash-or-nothing digital call: e^{-rT} N(d2) x payout.
pub fn digital_call_price(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
    payout: f64,
) -> Result<f64, PricingError> {
    validate_inputs(spot, strike, volatility, t)?;
    if volatility == 0.0 || t == 0.0 {
        let forward = spot * ((rate - dividend) * t).exp();
        let itm = if forward > strike { 1.0 } else { 0.0 };
        return Ok((-rate * t).exp() * itm * payout);
    }
    let (_, d2) = d1_d2(spot, strike, rate, dividend, volatility, t)?;
    Ok((-rate * t).exp() * std_normal().cdf(d2) * payout)
}

/// Capped call: long call at `strike_low` minus short call at `strike_high`.
pub fn capped_call_value(
    spot: f64,
    strike_low: f64,
    strike_high: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
) -> Result<f64, PricingError> {
    let long = call_price(spot, strike_low, rate, dividend, volatility, t)?;
    let short = call_price(spot, strike_high, rate, dividend, volatility, t)?;
    Ok(long - short)
}

/// Buffer replication: long ATM put minus short OTM put at S(1 - buffer).
pub fn buffer_put_spread_value(
    spot: f64,
    buffer_rate: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
) -> Result<f64, PricingError> {
    let atm = put_price(spot, spot, rate, dividend, volatility, t)?;
    let otm = put_price(spot, spot * (1.0 - buffer_rate), rate, dividend, volatility, t)?;
    Ok(atm - otm)
}

/// Floor replication: long OTM put at S(1 - floor).
pub fn floor_put_value(
    spot: f64,
    floor_rate: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
) -> Result<f64, PricingError> {
    put_price(spot, spot * (1.0 - floor_rate), rate, dividend, volatility, t)
}

/// Full Greeks for a vanilla option.
pub fn greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    t: f64,
    option_type: OptionType,
) -> Result<Greeks, PricingError> {
    validate_inputs(spot, strike, volatility, t)?;
    if volatility == 0.0 || t == 0.0 {
        return Err(PricingError::precondition(
            "greeks undefined at zero volatility or zero expiry",
            volatility.min(t),
        ));
    }
    let (d1, d2) = d1_d2(spot, strike, rate, dividend, volatility, t)?;
    let n = std_normal();
    let pdf_d1 = n.pdf(d1);
    let disc_q = (-dividend * t).exp();
    let disc_r = (-rate * t).exp();
    let sqrt_t = t.sqrt();

    let gamma = disc_q * pdf_d1 / (spot * volatility * sqrt_t);
    let vega = spot * disc_q * pdf_d1 * sqrt_t / 100.0;

    let (delta, theta_annual, rho) = match option_type {
        OptionType::Call => {
            let delta = disc_q * n.cdf(d1);
            let theta = -spot * disc_q * pdf_d1 * volatility / (2.0 * sqrt_t)
                + dividend * spot * disc_q * n.cdf(d1)
                - rate * strike * disc_r * n.cdf(d2);
            let rho = strike * t * disc_r * n.cdf(d2) / 100.0;
            (delta, theta, rho)
        }
        OptionType::Put => {
            let delta = disc_q * (n.cdf(d1) - 1.0);
            let theta = -spot * disc_q * pdf_d1 * volatility / (2.0 * sqrt_t)
                - dividend * spot * disc_q * n.cdf(-d1)
                + rate * strike * disc_r * n.cdf(-d2);
            let rho = -strike * t * disc_r * n.cdf(-d2) / 100.0;
            (delta, theta, rho)
        }
    };

    Ok(Greeks {
        delta,
        gamma,
        vega,
        theta: theta_annual / 365.0,
        rho,
    })
}
