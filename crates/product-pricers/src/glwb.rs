//! GLWB rider pricing: wraps the path simulator and the fair-fee solver.

use tracing::debug;

use annuity_core::{GlwbResult, GwbConfig, MarketParams, PricingConfig, PricingError};
use behavioral_models::{Mortality, WithdrawalModel};
use glwb_engine::{FairFeeParams, FairFeeResult, GlwbPathSimulator};

/// GLWB guarantee pricer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlwbPricer {
    config: PricingConfig,
}

impl GlwbPricer {
    pub fn new(config: PricingConfig) -> Result<Self, PricingError> {
        config.validate()?;
        Ok(GlwbPricer { config })
    }

    /// Price the rider guarantee for an annuitant of the given age.
    pub fn price(
        &self,
        rider: &GwbConfig,
        premium: f64,
        age: u32,
        market: &MarketParams,
        mortality: &Mortality,
        withdrawal_model: &WithdrawalModel,
    ) -> Result<GlwbResult, PricingError> {
        market.validate()?;
        let simulator = GlwbPathSimulator::new(*rider, self.config.n_mc_paths, self.config.seed)?;
        let result = simulator.price(
            premium,
            age,
            market.risk_free_rate,
            market.volatility,
            self.config.max_age,
            mortality,
            withdrawal_model,
        )?;
        debug!(
            guarantee_cost = result.guarantee_cost,
            prob_ruin = result.prob_ruin,
            "glwb rider priced"
        );
        Ok(result)
    }

    /// Solve the fee at which the guarantee cost hits the target.
    #[allow(clippy::too_many_arguments)]
    pub fn fair_fee(
        &self,
        rider: &GwbConfig,
        premium: f64,
        age: u32,
        market: &MarketParams,
        params: &FairFeeParams,
        mortality: &Mortality,
        withdrawal_model: &WithdrawalModel,
    ) -> Result<FairFeeResult, PricingError> {
        market.validate()?;
        let simulator = GlwbPathSimulator::new(*rider, self.config.n_mc_paths, self.config.seed)?;
        simulator.fair_fee(
            params,
            premium,
            age,
            market.risk_free_rate,
            market.volatility,
            self.config.max_age,
            mortality,
            withdrawal_model,
        )
    }
}
