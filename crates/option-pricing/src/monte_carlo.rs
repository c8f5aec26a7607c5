//! Vectorized Monte Carlo engine over the GBM samplers.
//!
//! Paths are partitioned into fixed-size tiles; each tile accumulates
//! sequentially and tiles are combined in tile-id order, so the reduction is
//! identical whether the tiles ran serially or across worker threads.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use annuity_core::PricingError;

use crate::gbm::{self, GbmParams};

/// Paths per reduction tile. Small enough to spread across workers, large
/// enough that per-tile overhead is negligible.
const TILE_SIZE: usize = 4096;

/// Monte Carlo engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McEngine {
    pub n_paths: usize,
    pub antithetic: bool,
    pub seed: u64,
}

/// Aggregates from one pricing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McResult {
    /// Undiscounted sample mean of the path payoffs.
    pub mean_payoff: f64,
    /// Discounted price: e^{-rT} x mean payoff.
    pub price: f64,
    /// Sample standard deviation of the path payoffs.
    pub std_dev: f64,
    /// Standard error of the discounted price: e^{-rT} sd / sqrt(N).
    pub standard_error: f64,
    pub n_paths: usize,
    /// Per-path payoffs (pair averages under antithetic sampling), kept only
    /// on request since they are O(N).
    pub payoffs: Option<Vec<f64>>,
}

struct TilePartial {
    sum: f64,
    sum_sq: f64,
    payoffs: Option<Vec<f64>>,
}

impl McEngine {
    pub fn new(n_paths: usize, antithetic: bool, seed: u64) -> Result<Self, PricingError> {
        if n_paths == 0 {
            return Err(PricingError::precondition("path count must be > 0", 0.0));
        }
        Ok(McEngine {
            n_paths,
            antithetic,
            seed,
        })
    }

    /// Price a payoff of the terminal index return.
    ///
    /// `payoff` maps an index return to a payoff in index units; the result
    /// carries both the raw mean and the discounted price.
    pub fn price_terminal<F>(&self, params: &GbmParams, payoff: F) -> Result<McResult, PricingError>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        self.run(params, false, |rng, p| {
            let z = gbm::normal_draw(rng);
            if self.antithetic {
                0.5 * (payoff(p.terminal_return(z)) + payoff(p.terminal_return(-z)))
            } else {
                payoff(p.terminal_return(z))
            }
        })
    }

    /// Same as [`price_terminal`](Self::price_terminal) but retains the
    /// per-path payoff vector.
    pub fn price_terminal_with_paths<F>(
        &self,
        params: &GbmParams,
        payoff: F,
    ) -> Result<McResult, PricingError>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        self.run(params, true, |rng, p| {
            let z = gbm::normal_draw(rng);
            if self.antithetic {
                0.5 * (payoff(p.terminal_return(z)) + payoff(p.terminal_return(-z)))
            } else {
                payoff(p.terminal_return(z))
            }
        })
    }

    /// Price a payoff of the monthly observation vector (dt = T / 12).
    pub fn price_monthly<F>(&self, params: &GbmParams, payoff: F) -> Result<McResult, PricingError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        self.run(params, false, |rng, p| {
            if self.antithetic {
                let (obs, mirrored) = p.monthly_returns_antithetic(rng);
                0.5 * (payoff(&obs) + payoff(&mirrored))
            } else {
                let obs = p.monthly_returns(rng);
                payoff(&obs)
            }
        })
    }

    fn run<F>(&self, params: &GbmParams, keep_payoffs: bool, path_value: F) -> Result<McResult, PricingError>
    where
        F: Fn(&mut rand_chacha::ChaCha8Rng, &GbmParams) -> f64 + Sync,
    {
        params.validate()?;
        let n = self.n_paths;
        let n_tiles = n.div_ceil(TILE_SIZE);

        let partials: Vec<TilePartial> = (0..n_tiles)
            .into_par_iter()
            .map(|tile| {
                let start = tile * TILE_SIZE;
                let end = ((tile + 1) * TILE_SIZE).min(n);
                let mut sum = 0.0;
                let mut sum_sq = 0.0;
                let mut payoffs = keep_payoffs.then(|| Vec::with_capacity(end - start));
                for path in start..end {
                    // The stream is keyed by path index: no seed increments
                    // happen within the call, and parallel execution matches
                    // serial exactly.
                    let mut rng = gbm::path_rng(self.seed, path as u64);
                    let value = path_value(&mut rng, params);
                    sum += value;
                    sum_sq += value * value;
                    if let Some(buf) = payoffs.as_mut() {
                        buf.push(value);
                    }
                }
                TilePartial {
                    sum,
                    sum_sq,
                    payoffs,
                }
            })
            .collect();

        // Single-threaded reduction in tile-id order keeps the floating-point
        // result independent of worker scheduling.
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut payoffs = keep_payoffs.then(|| Vec::with_capacity(n));
        for partial in partials {
            sum += partial.sum;
            sum_sq += partial.sum_sq;
            if let (Some(all), Some(tile)) = (payoffs.as_mut(), partial.payoffs) {
                all.extend(tile);
            }
        }

        let n_f = n as f64;
        let mean = sum / n_f;
        let variance = if n > 1 {
            ((sum_sq - n_f * mean * mean) / (n_f - 1.0)).max(0.0)
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let discount = (-params.rate * params.time_to_expiry).exp();
        let result = McResult {
            mean_payoff: mean,
            price: discount * mean,
            std_dev,
            standard_error: discount * std_dev / n_f.sqrt(),
            n_paths: n,
            payoffs,
        };
        if !result.price.is_finite() {
            return Err(PricingError::Numeric {
                what: "monte carlo price".to_string(),
                value: result.price,
                iterations: 0,
            });
        }
        debug!(
            n_paths = n,
            price = result.price,
            standard_error = result.standard_error,
            "monte carlo run complete"
        );
        Ok(result)
    }
}
