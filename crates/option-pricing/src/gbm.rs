//! Risk-neutral geometric Brownian motion sampling.
//!
//! Every path owns an RNG stream derived from the master seed and the path
//! index, so serial and parallel execution produce identical draws and a
//! fixed seed reproduces results bit-for-bit.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use annuity_core::{MarketParams, PricingError};

/// Observation count for the monthly-average sampler (dt = T / 12).
pub const MONTHLY_OBSERVATIONS: usize = 12;

/// GBM process parameters for one sampling run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    pub spot: f64,
    pub rate: f64,
    pub dividend: f64,
    pub volatility: f64,
    pub time_to_expiry: f64,
}

impl GbmParams {
    pub fn from_market(market: &MarketParams, time_to_expiry: f64) -> Result<Self, PricingError> {
        let params = GbmParams {
            spot: market.spot,
            rate: market.risk_free_rate,
            dividend: market.dividend_yield,
            volatility: market.volatility,
            time_to_expiry,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.spot <= 0.0 {
            return Err(PricingError::precondition("spot must be > 0", self.spot));
        }
        if self.volatility < 0.0 {
            return Err(PricingError::precondition(
                "volatility must be >= 0",
                self.volatility,
            ));
        }
        if self.time_to_expiry <= 0.0 {
            return Err(PricingError::precondition(
                "time to expiry must be > 0",
                self.time_to_expiry,
            ));
        }
        Ok(())
    }

    /// Terminal price for a single standard normal draw:
    /// S_T = S exp((r - q - sigma^2/2) T + sigma sqrt(T) Z).
    pub fn terminal_price(&self, z: f64) -> f64 {
        let t = self.time_to_expiry;
        let drift = (self.rate - self.dividend - 0.5 * self.volatility * self.volatility) * t;
        self.spot * (drift + self.volatility * t.sqrt() * z).exp()
    }

    /// Terminal index return S_T / S - 1 for a single draw.
    pub fn terminal_return(&self, z: f64) -> f64 {
        self.terminal_price(z) / self.spot - 1.0
    }

    /// Month-end cumulative index returns over the term, dt = T / 12, using
    /// the same drift and diffusion on each step. Returns 12 observations.
    pub fn monthly_returns(&self, rng: &mut ChaCha8Rng) -> Vec<f64> {
        let dt = self.time_to_expiry / MONTHLY_OBSERVATIONS as f64;
        let drift = (self.rate - self.dividend - 0.5 * self.volatility * self.volatility) * dt;
        let diffusion = self.volatility * dt.sqrt();
        let mut level = self.spot;
        let mut observations = Vec::with_capacity(MONTHLY_OBSERVATIONS);
        for _ in 0..MONTHLY_OBSERVATIONS {
            let z: f64 = StandardNormal.sample(rng);
            level *= (drift + diffusion * z).exp();
            observations.push(level / self.spot - 1.0);
        }
        observations
    }

    /// Antithetic mirror of a monthly path: the same path with negated draws.
    pub fn monthly_returns_antithetic(&self, rng: &mut ChaCha8Rng) -> (Vec<f64>, Vec<f64>) {
        let dt = self.time_to_expiry / MONTHLY_OBSERVATIONS as f64;
        let drift = (self.rate - self.dividend - 0.5 * self.volatility * self.volatility) * dt;
        let diffusion = self.volatility * dt.sqrt();
        let mut level = self.spot;
        let mut mirror = self.spot;
        let mut observations = Vec::with_capacity(MONTHLY_OBSERVATIONS);
        let mut mirrored = Vec::with_capacity(MONTHLY_OBSERVATIONS);
        for _ in 0..MONTHLY_OBSERVATIONS {
            let z: f64 = StandardNormal.sample(rng);
            level *= (drift + diffusion * z).exp();
            mirror *= (drift - diffusion * z).exp();
            observations.push(level / self.spot - 1.0);
            mirrored.push(mirror / self.spot - 1.0);
        }
        (observations, mirrored)
    }
}

/// RNG stream for one path, derived from the master seed and path index.
/// Counter-style keying keeps parallel execution identical to serial.
pub fn path_rng(seed: u64, path_index: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.wrapping_add(path_index))
}

/// One standard normal deviate from the path stream.
pub fn normal_draw(rng: &mut ChaCha8Rng) -> f64 {
    StandardNormal.sample(rng)
}
