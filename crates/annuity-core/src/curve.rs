use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Zero-coupon yield curve given as (tenor years, zero rate) points,
/// interpolated linearly in yield with flat extrapolation at both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldCurve {
    points: Vec<(f64, f64)>,
}

impl YieldCurve {
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self, PricingError> {
        if points.is_empty() {
            return Err(PricingError::Data(
                "yield curve requires at least one (tenor, rate) point".to_string(),
            ));
        }
        for &(tenor, _) in &points {
            if tenor <= 0.0 {
                return Err(PricingError::precondition(
                    "curve tenor must be > 0",
                    tenor,
                ));
            }
        }
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        for pair in points.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(PricingError::Data(format!(
                    "duplicate curve tenor {}",
                    pair[0].0
                )));
            }
        }
        Ok(YieldCurve { points })
    }

    /// Flat curve at a single rate.
    pub fn flat(rate: f64) -> Self {
        YieldCurve {
            points: vec![(1.0, rate)],
        }
    }

    /// Zero rate at tenor `t`, linear in yield between pillars.
    pub fn zero_rate(&self, t: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.points.windows(2) {
            let (t0, r0) = pair[0];
            let (t1, r1) = pair[1];
            if t >= t0 && t <= t1 {
                let w = (t - t0) / (t1 - t0);
                return r0 + w * (r1 - r0);
            }
        }
        last.1
    }

    /// Continuously compounded discount factor to tenor `t`.
    pub fn discount_factor(&self, t: f64) -> f64 {
        (-self.zero_rate(t) * t).exp()
    }
}
