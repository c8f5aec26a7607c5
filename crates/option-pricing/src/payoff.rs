//! Credited-return payoff algebra for FIA and RILA contracts.
//!
//! All payoffs are pure, total functions from the underlying index return to
//! the credited return. FIA payoffs are floored at zero everywhere; RILA
//! payoffs can go negative up to the protection's maximum loss.

use serde::{Deserialize, Serialize};

use annuity_core::{CreditingMethod, Protection};

/// FIA payoff: non-negative credited return for every index return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payoff", rename_all = "snake_case")]
pub enum FiaPayoff {
    Cap { cap_rate: f64 },
    Participation { rate: f64, cap_rate: Option<f64> },
    Spread { rate: f64, cap_rate: Option<f64> },
    Trigger { rate: f64 },
}

impl FiaPayoff {
    pub fn from_method(method: CreditingMethod) -> Self {
        match method {
            CreditingMethod::Cap { cap_rate } => FiaPayoff::Cap { cap_rate },
            CreditingMethod::Participation { rate, cap_rate } => {
                FiaPayoff::Participation { rate, cap_rate }
            }
            CreditingMethod::Spread { rate, cap_rate } => FiaPayoff::Spread { rate, cap_rate },
            CreditingMethod::Trigger { rate } => FiaPayoff::Trigger { rate },
        }
    }

    /// Credited return for a point-to-point index return.
    pub fn apply(&self, index_return: f64) -> f64 {
        match *self {
            FiaPayoff::Cap { cap_rate } => index_return.max(0.0).min(cap_rate),
            FiaPayoff::Participation { rate, cap_rate } => {
                apply_cap((rate * index_return).max(0.0), cap_rate)
            }
            FiaPayoff::Spread { rate, cap_rate } => {
                apply_cap((index_return - rate).max(0.0), cap_rate)
            }
            // Strict inequality: a flat index credits nothing.
            FiaPayoff::Trigger { rate } => {
                if index_return > 0.0 {
                    rate
                } else {
                    0.0
                }
            }
        }
    }
}

fn apply_cap(credit: f64, cap_rate: Option<f64>) -> f64 {
    match cap_rate {
        Some(cap) => credit.min(cap),
        None => credit,
    }
}

/// Monthly-average crediting: floor the mean of the monthly observations at
/// zero, then cap.
pub fn monthly_average_credit(monthly_returns: &[f64], cap_rate: Option<f64>) -> f64 {
    if monthly_returns.is_empty() {
        return 0.0;
    }
    let mean = monthly_returns.iter().sum::<f64>() / monthly_returns.len() as f64;
    apply_cap(mean.max(0.0), cap_rate)
}

/// RILA payoff: capped upside with buffered or floored downside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RilaPayoff {
    pub protection: Protection,
    pub cap_rate: Option<f64>,
}

impl RilaPayoff {
    pub fn new(protection: Protection, cap_rate: Option<f64>) -> Self {
        RilaPayoff {
            protection,
            cap_rate,
        }
    }

    /// Credited return for a point-to-point index return.
    ///
    /// Buffer: the insurer absorbs the first b of losses, the client takes
    /// the excess. Floor: the client takes losses down to -f and no further.
    pub fn apply(&self, index_return: f64) -> f64 {
        if index_return >= 0.0 {
            return apply_cap(index_return, self.cap_rate);
        }
        match self.protection {
            Protection::Buffer(buffer) => {
                if index_return >= -buffer {
                    0.0
                } else {
                    index_return + buffer
                }
            }
            Protection::Floor(floor) => index_return.max(-floor),
        }
    }

    /// Index return at which the credited return crosses zero from below,
    /// found by bisection on [-0.99, 1.0]. A buffer breaks even at -b (losses
    /// inside the buffer credit exactly zero); a floor breaks even only at 0.
    /// None when the payoff never changes sign in range.
    pub fn breakeven_return(&self) -> Option<f64> {
        let mut lo = -0.99;
        let mut hi = 1.0;
        if self.apply(lo) >= 0.0 || self.apply(hi) < 0.0 {
            return None;
        }
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if self.apply(mid) < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-10 {
                break;
            }
        }
        Some(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capped_payoff_points() {
        let payoff = FiaPayoff::Cap { cap_rate: 0.08 };
        assert_eq!(payoff.apply(-0.20), 0.0);
        assert_eq!(payoff.apply(0.0), 0.0);
        assert!((payoff.apply(0.05) - 0.05).abs() < 1e-15);
        assert!((payoff.apply(0.08) - 0.08).abs() < 1e-15);
        assert!((payoff.apply(0.30) - 0.08).abs() < 1e-15);
    }

    #[test]
    fn participation_and_spread_points() {
        let par = FiaPayoff::Participation {
            rate: 0.8,
            cap_rate: Some(0.10),
        };
        assert!((par.apply(0.10) - 0.08).abs() < 1e-15);
        assert!((par.apply(0.20) - 0.10).abs() < 1e-15);
        assert_eq!(par.apply(-0.10), 0.0);

        let spread = FiaPayoff::Spread {
            rate: 0.02,
            cap_rate: None,
        };
        assert!((spread.apply(0.10) - 0.08).abs() < 1e-15);
        assert_eq!(spread.apply(0.01), 0.0);
        assert_eq!(spread.apply(-0.10), 0.0);
    }

    #[test]
    fn trigger_is_strict_at_zero() {
        let payoff = FiaPayoff::Trigger { rate: 0.06 };
        assert_eq!(payoff.apply(0.0), 0.0);
        assert!((payoff.apply(1e-12) - 0.06).abs() < 1e-15);
        assert_eq!(payoff.apply(-0.30), 0.0);
    }

    #[test]
    fn fia_payoffs_are_never_negative() {
        let payoffs = [
            FiaPayoff::Cap { cap_rate: 0.08 },
            FiaPayoff::Participation {
                rate: 0.8,
                cap_rate: None,
            },
            FiaPayoff::Spread {
                rate: 0.02,
                cap_rate: Some(0.10),
            },
            FiaPayoff::Trigger { rate: 0.06 },
        ];
        let mut x = -1.0;
        while x <= 1.0 {
            for payoff in &payoffs {
                assert!(payoff.apply(x) >= 0.0, "negative credit at x={x}");
            }
            x += 0.01;
        }
    }

    #[test]
    fn monthly_average_floors_then_caps() {
        let months = [0.02; 12];
        assert!((monthly_average_credit(&months, Some(0.08)) - 0.02).abs() < 1e-15);
        let months = [0.10; 12];
        assert!((monthly_average_credit(&months, Some(0.08)) - 0.08).abs() < 1e-15);
        let months = [-0.05; 12];
        assert_eq!(monthly_average_credit(&months, Some(0.08)), 0.0);
    }

    #[test]
    fn buffer_reference_points() {
        // 10% buffer, 15% cap: the standard illustration case.
        let payoff = RilaPayoff::new(Protection::Buffer(0.10), Some(0.15));
        assert!((payoff.apply(-0.15) - (-0.05)).abs() < 1e-15);
        assert_eq!(payoff.apply(-0.10), 0.0);
        assert!((payoff.apply(0.20) - 0.15).abs() < 1e-15);
        assert_eq!(payoff.apply(0.0), 0.0);
    }

    #[test]
    fn floor_reference_points() {
        let payoff = RilaPayoff::new(Protection::Floor(0.10), Some(0.15));
        assert!((payoff.apply(-0.05) - (-0.05)).abs() < 1e-15);
        assert!((payoff.apply(-0.30) - (-0.10)).abs() < 1e-15);
        assert!((payoff.apply(0.20) - 0.15).abs() < 1e-15);
    }

    #[test]
    fn buffer_and_floor_differ_below_zero() {
        // Same protection level and cap, different semantics everywhere on
        // the loss side except the boundary.
        let buffer = RilaPayoff::new(Protection::Buffer(0.10), Some(0.15));
        let floor = RilaPayoff::new(Protection::Floor(0.10), Some(0.15));
        let mut x: f64 = -0.60;
        while x < 0.0 {
            let close_to_boundary = (x - (-0.10)).abs() < 1e-9;
            if !close_to_boundary {
                assert!(
                    (buffer.apply(x) - floor.apply(x)).abs() > 1e-12,
                    "buffer and floor agree at x={x}"
                );
            }
            x += 0.007;
        }
        // Deep losses: buffer credits x + b, floor credits -f.
        assert!((buffer.apply(-0.50) - (-0.40)).abs() < 1e-15);
        assert!((floor.apply(-0.50) - (-0.10)).abs() < 1e-15);
    }

    #[test]
    fn breakeven_sits_at_protection_boundary() {
        let buffer = RilaPayoff::new(Protection::Buffer(0.10), Some(0.15));
        let be = buffer.breakeven_return().unwrap();
        assert!((be - (-0.10)).abs() < 1e-6, "buffer breakeven = {be}");

        // A floor credits every loss down to -f, so it only breaks even at 0.
        let floor = RilaPayoff::new(Protection::Floor(0.20), Some(0.15));
        let be = floor.breakeven_return().unwrap();
        assert!(be.abs() < 1e-6, "floor breakeven = {be}");
    }
}
