//! Mortality assumptions: an explicit table or a Gompertz-style fallback.

use serde::{Deserialize, Serialize};

use annuity_core::PricingError;

/// Explicit mortality table mapping age to the annual death probability qx.
/// Ages beyond the last entry use the last qx.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityTable {
    /// (age, qx) points sorted by age.
    points: Vec<(u32, f64)>,
}

impl MortalityTable {
    pub fn new(mut points: Vec<(u32, f64)>) -> Result<Self, PricingError> {
        if points.is_empty() {
            return Err(PricingError::Data(
                "mortality table requires at least one (age, qx) point".to_string(),
            ));
        }
        for &(age, qx) in &points {
            if !(0.0..=1.0).contains(&qx) {
                return Err(PricingError::precondition(
                    format!("qx at age {age} must be in [0, 1]"),
                    qx,
                ));
            }
        }
        points.sort_by_key(|&(age, _)| age);
        Ok(MortalityTable { points })
    }

    pub fn qx(&self, age: u32) -> f64 {
        let mut last = self.points[0].1;
        for &(table_age, qx) in &self.points {
            if table_age > age {
                return last;
            }
            last = qx;
        }
        last
    }
}

/// Mortality basis used by a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum Mortality {
    Table(MortalityTable),
    /// qx(age) = min(1, 1e-4 e^{0.08 age}), an approximate US life table.
    Gompertz,
}

impl Mortality {
    pub fn qx(&self, age: u32) -> f64 {
        match self {
            Mortality::Table(table) => table.qx(age),
            Mortality::Gompertz => (1e-4 * (0.08 * age as f64).exp()).min(1.0),
        }
    }

    /// Probability of surviving `years` starting at `age`.
    pub fn survival_probability(&self, age: u32, years: u32) -> f64 {
        (0..years).fold(1.0, |acc, offset| acc * (1.0 - self.qx(age + offset)))
    }
}
