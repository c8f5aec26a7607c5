//! Fair-term solvers for FIA crediting: the cap or participation rate at
//! which the embedded option exactly spends the option budget.

use tracing::debug;

use annuity_core::{MarketParams, PricingError};

use crate::black_scholes;

const MAX_ITERATIONS: u32 = 50;
const VALUE_TOLERANCE: f64 = 1e-6;

/// Solve for the cap rate whose capped-call value (as a fraction of spot)
/// equals `budget_pct`. A budget at or above the ATM call affords an
/// effectively unlimited cap, reported as 1.0.
pub fn solve_fair_cap(
    market: &MarketParams,
    term_years: f64,
    budget_pct: f64,
) -> Result<f64, PricingError> {
    market.validate()?;
    if budget_pct < 0.0 {
        return Err(PricingError::precondition(
            "option budget must be >= 0",
            budget_pct,
        ));
    }
    let m = market;
    let atm_call = black_scholes::call_price(
        m.spot,
        m.spot,
        m.risk_free_rate,
        m.dividend_yield,
        m.volatility,
        term_years,
    )?;
    let atm_call_pct = atm_call / m.spot;
    if budget_pct >= atm_call_pct {
        return Ok(1.0);
    }

    let mut low = 0.01;
    let mut high = 1.0;
    let mut mid = 0.5 * (low + high);
    for iteration in 0..MAX_ITERATIONS {
        mid = 0.5 * (low + high);
        let cap_strike = m.spot * (1.0 + mid);
        let capped_pct = black_scholes::capped_call_value(
            m.spot,
            m.spot,
            cap_strike,
            m.risk_free_rate,
            m.dividend_yield,
            m.volatility,
            term_years,
        )? / m.spot;

        if (capped_pct - budget_pct).abs() < VALUE_TOLERANCE {
            debug!(fair_cap = mid, iterations = iteration + 1, "fair cap solved");
            return Ok(mid);
        }
        if capped_pct > budget_pct {
            high = mid;
        } else {
            low = mid;
        }
    }

    Err(PricingError::Numeric {
        what: "fair cap bisection did not converge".to_string(),
        value: mid,
        iterations: MAX_ITERATIONS,
    })
}

/// Fair participation rate: budget divided by the ATM call value, both as
/// fractions of spot.
pub fn solve_fair_participation(
    market: &MarketParams,
    term_years: f64,
    budget_pct: f64,
) -> Result<f64, PricingError> {
    market.validate()?;
    if budget_pct < 0.0 {
        return Err(PricingError::precondition(
            "option budget must be >= 0",
            budget_pct,
        ));
    }
    let m = market;
    let atm_call = black_scholes::call_price(
        m.spot,
        m.spot,
        m.risk_free_rate,
        m.dividend_yield,
        m.volatility,
        term_years,
    )?;
    let atm_call_pct = atm_call / m.spot;
    if atm_call_pct < 1e-10 {
        return Ok(0.0);
    }
    Ok(budget_pct / atm_call_pct)
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

    #[test]
    fn fair_cap_reprices_to_the_budget() {
        let m = market();
        let budget_pct = 0.03;
        let cap = solve_fair_cap(&m, 1.0, budget_pct).unwrap();
        assert!(cap > 0.01 && cap < 1.0);

        let value = black_scholes::capped_call_value(
            m.spot,
            m.spot,
            m.spot * (1.0 + cap),
            m.risk_free_rate,
            m.dividend_yield,
            m.volatility,
            1.0,
        )
        .unwrap()
            / m.spot;
        assert!((value - budget_pct).abs() < 1e-6);
    }

    #[test]
    fn generous_budget_means_unlimited_cap() {
        let m = market();
        let cap = solve_fair_cap(&m, 1.0, 0.50).unwrap();
        assert_eq!(cap, 1.0);
    }

    #[test]
    fn fair_participation_reprices_to_the_budget() {
        let m = market();
        let budget_pct = 0.03;
        let participation = solve_fair_participation(&m, 1.0, budget_pct).unwrap();
        let atm_pct = black_scholes::call_price(
            m.spot,
            m.spot,
            m.risk_free_rate,
            m.dividend_yield,
            m.volatility,
            1.0,
        )
        .unwrap()
            / m.spot;
        assert!((participation * atm_pct - budget_pct).abs() < 1e-12);
        assert!(participation > 0.0 && participation < 1.0);
    }

    #[test]
    fn larger_budget_buys_a_larger_cap() {
        let m = market();
        let small = solve_fair_cap(&m, 1.0, 0.02).unwrap();
        let large = solve_fair_cap(&m, 1.0, 0.05).unwrap();
        assert!(large > small);
    }

    #[test]
    fn negative_budget_rejected() {
        assert!(solve_fair_cap(&market(), 1.0, -0.01).is_err());
        assert!(solve_fair_participation(&market(), 1.0, -0.01).is_err());
    }
}
