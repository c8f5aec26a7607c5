//! Economic scenario generation for VM-21/AG43 and VM-22.
//!
//! Correlated two-factor model: Vasicek short rate crossed with GBM equity
//! returns, coupled through a Cholesky factor of the 2x2 correlation matrix.
//! Rates are floored at zero in this nominal model.

use nalgebra::Matrix2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use annuity_core::PricingError;
use option_pricing::gbm;

/// Vasicek short-rate parameters: dr = kappa (theta - r) dt + sigma dW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VasicekParams {
    pub kappa: f64,
    pub theta: f64,
    pub sigma: f64,
}

impl Default for VasicekParams {
    fn default() -> Self {
        VasicekParams {
            kappa: 0.20,
            theta: 0.04,
            sigma: 0.01,
        }
    }
}

/// Equity GBM parameters: dS/S = mu dt + sigma dW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityParams {
    pub mu: f64,
    pub sigma: f64,
}

impl Default for EquityParams {
    fn default() -> Self {
        EquityParams {
            mu: 0.07,
            sigma: 0.18,
        }
    }
}

/// One economic scenario: parallel annual rate and equity-return paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicScenario {
    pub rates: Vec<f64>,
    pub equity_returns: Vec<f64>,
    pub scenario_id: u32,
}

impl EconomicScenario {
    pub fn new(
        rates: Vec<f64>,
        equity_returns: Vec<f64>,
        scenario_id: u32,
    ) -> Result<Self, PricingError> {
        if rates.len() != equity_returns.len() {
            return Err(PricingError::Data(format!(
                "rate path length ({}) must match equity path length ({})",
                rates.len(),
                equity_returns.len()
            )));
        }
        Ok(EconomicScenario {
            rates,
            equity_returns,
            scenario_id,
        })
    }

    pub fn projection_years(&self) -> usize {
        self.rates.len()
    }
}

/// AG43 scenario bundle. Row order defines scenario ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ag43Scenarios {
    pub scenarios: Vec<EconomicScenario>,
    pub n_scenarios: usize,
    pub projection_years: usize,
}

/// Serialized form of a bundle: one matrix per factor, one row per scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMatrices {
    pub rates: Vec<Vec<f64>>,
    pub equity_returns: Vec<Vec<f64>>,
}

/// Summary statistics over a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStatistics {
    pub rate_mean: f64,
    pub rate_std: f64,
    pub rate_min: f64,
    pub rate_max: f64,
    pub terminal_rate_mean: f64,
    pub terminal_rate_5pct: f64,
    pub terminal_rate_95pct: f64,
    pub equity_return_mean: f64,
    pub equity_return_std: f64,
    pub cumulative_return_mean: f64,
    pub cumulative_return_5pct: f64,
    pub cumulative_return_95pct: f64,
    pub n_scenarios: usize,
    pub projection_years: usize,
}

impl Ag43Scenarios {
    pub fn rate_matrix(&self) -> Vec<Vec<f64>> {
        self.scenarios.iter().map(|s| s.rates.clone()).collect()
    }

    pub fn equity_matrix(&self) -> Vec<Vec<f64>> {
        self.scenarios
            .iter()
            .map(|s| s.equity_returns.clone())
            .collect()
    }

    pub fn to_matrices(&self) -> ScenarioMatrices {
        ScenarioMatrices {
            rates: self.rate_matrix(),
            equity_returns: self.equity_matrix(),
        }
    }

    /// Summary statistics for diagnostics and scenario-file sanity checks.
    pub fn statistics(&self) -> ScenarioStatistics {
        let mut all_rates = Vec::new();
        let mut all_equity = Vec::new();
        let mut terminal_rates = Vec::new();
        let mut cumulative = Vec::new();
        for scenario in &self.scenarios {
            all_rates.extend_from_slice(&scenario.rates);
            all_equity.extend_from_slice(&scenario.equity_returns);
            if let Some(last) = scenario.rates.last() {
                terminal_rates.push(*last);
            }
            let growth: f64 = scenario.equity_returns.iter().map(|r| 1.0 + r).product();
            cumulative.push(growth - 1.0);
        }
        terminal_rates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        cumulative.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        ScenarioStatistics {
            rate_mean: mean(&all_rates),
            rate_std: std_dev(&all_rates),
            rate_min: all_rates.iter().cloned().fold(f64::INFINITY, f64::min),
            rate_max: all_rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            terminal_rate_mean: mean(&terminal_rates),
            terminal_rate_5pct: percentile_sorted(&terminal_rates, 5.0),
            terminal_rate_95pct: percentile_sorted(&terminal_rates, 95.0),
            equity_return_mean: mean(&all_equity),
            equity_return_std: std_dev(&all_equity),
            cumulative_return_mean: mean(&cumulative),
            cumulative_return_5pct: percentile_sorted(&cumulative, 5.0),
            cumulative_return_95pct: percentile_sorted(&cumulative, 95.0),
            n_scenarios: self.n_scenarios,
            projection_years: self.projection_years,
        }
    }
}

/// Correlated Vasicek x GBM scenario generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioGenerator {
    n_scenarios: usize,
    projection_years: usize,
    seed: u64,
}

impl ScenarioGenerator {
    pub fn new(n_scenarios: usize, projection_years: usize, seed: u64) -> Result<Self, PricingError> {
        if n_scenarios == 0 {
            return Err(PricingError::precondition(
                "scenario count must be > 0",
                0.0,
            ));
        }
        if projection_years == 0 {
            return Err(PricingError::precondition(
                "projection years must be > 0",
                0.0,
            ));
        }
        Ok(ScenarioGenerator {
            n_scenarios,
            projection_years,
            seed,
        })
    }

    /// Generate the stochastic bundle. Correlation couples the annual rate
    /// and equity shocks: the rate shock is z1, the equity shock is
    /// rho z1 + sqrt(1 - rho^2) z2.
    pub fn generate(
        &self,
        initial_rate: f64,
        rate_params: &VasicekParams,
        equity_params: &EquityParams,
        correlation: f64,
    ) -> Result<Ag43Scenarios, PricingError> {
        if initial_rate < 0.0 {
            return Err(PricingError::precondition(
                "initial rate must be >= 0",
                initial_rate,
            ));
        }
        if !(-1.0..=1.0).contains(&correlation) {
            return Err(PricingError::precondition(
                "correlation must be in [-1, 1]",
                correlation,
            ));
        }
        if equity_params.sigma < 0.0 {
            return Err(PricingError::precondition(
                "equity volatility must be >= 0",
                equity_params.sigma,
            ));
        }

        // Cholesky factor of [[1, rho], [rho, 1]]; perfectly correlated
        // shocks degenerate to a single factor.
        let (mix_rate, mix_residual) = if correlation.abs() < 1.0 {
            let corr = Matrix2::new(1.0, correlation, correlation, 1.0);
            let chol = corr.cholesky().ok_or_else(|| PricingError::Numeric {
                what: "correlation matrix is not positive definite".to_string(),
                value: correlation,
                iterations: 0,
            })?;
            let l = chol.l();
            (l[(1, 0)], l[(1, 1)])
        } else {
            (correlation, 0.0)
        };

        let scenarios: Vec<EconomicScenario> = (0..self.n_scenarios)
            .into_par_iter()
            .map(|id| {
                let mut rng = gbm::path_rng(self.seed, id as u64);
                let mut rates = Vec::with_capacity(self.projection_years);
                let mut equity_returns = Vec::with_capacity(self.projection_years);
                let mut rate = initial_rate;
                for _ in 0..self.projection_years {
                    let z1 = gbm::normal_draw(&mut rng);
                    let z2 = gbm::normal_draw(&mut rng);
                    let equity_shock = mix_rate * z1 + mix_residual * z2;

                    // Annual Euler step with a floor at zero.
                    rate = (rate
                        + rate_params.kappa * (rate_params.theta - rate)
                        + rate_params.sigma * z1)
                        .max(0.0);
                    rates.push(rate);

                    let log_return = (equity_params.mu
                        - 0.5 * equity_params.sigma * equity_params.sigma)
                        + equity_params.sigma * equity_shock;
                    equity_returns.push(log_return.exp() - 1.0);
                }
                EconomicScenario {
                    rates,
                    equity_returns,
                    scenario_id: id as u32,
                }
            })
            .collect();

        debug!(
            n_scenarios = self.n_scenarios,
            projection_years = self.projection_years,
            "scenario bundle generated"
        );
        Ok(Ag43Scenarios {
            scenarios,
            n_scenarios: self.n_scenarios,
            projection_years: self.projection_years,
        })
    }
}

/// Prescribed deterministic family for VM-22: base, rates up 2% with equity
/// down 2%, rates down 2% (floored) with equity up 2%.
pub fn deterministic_scenarios(
    n_years: usize,
    base_rate: f64,
    base_equity: f64,
) -> Vec<EconomicScenario> {
    vec![
        EconomicScenario {
            rates: vec![base_rate; n_years],
            equity_returns: vec![base_equity; n_years],
            scenario_id: 0,
        },
        EconomicScenario {
            rates: vec![base_rate + 0.02; n_years],
            equity_returns: vec![base_equity - 0.02; n_years],
            scenario_id: 1,
        },
        EconomicScenario {
            rates: vec![(base_rate - 0.02).max(0.0); n_years],
            equity_returns: vec![base_equity + 0.02; n_years],
            scenario_id: 2,
        },
    ]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() as f64 - 1.0);
    var.sqrt()
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
