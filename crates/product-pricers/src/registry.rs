//! Product-to-pricer dispatch.
//!
//! A thin case split: every product kind maps to its pricer with a shared
//! market environment. Payoffs and pricers stay plain functions and structs;
//! there is no inheritance hierarchy to extend.

use tracing::info;

use annuity_core::{
    MarketParams, PricingConfig, PricingError, PricingResult, Product, ProductTerms, YieldCurve,
};
use behavioral_models::{Mortality, WithdrawalAssumptions, WithdrawalModel};

use crate::fia::FiaPricer;
use crate::glwb::GlwbPricer;
use crate::myga::MygaPricer;
use crate::rila::RilaPricer;

/// Shared pricing environment for a product batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRegistry {
    market: MarketParams,
    config: PricingConfig,
    discount_curve: YieldCurve,
    mortality: Mortality,
    withdrawal_model: WithdrawalModel,
}

impl ProductRegistry {
    /// Registry with a flat discount curve at the market rate, Gompertz
    /// mortality, and default withdrawal behavior.
    pub fn new(market: MarketParams, config: PricingConfig) -> Result<Self, PricingError> {
        market.validate()?;
        config.validate()?;
        Ok(ProductRegistry {
            market,
            config,
            discount_curve: YieldCurve::flat(market.risk_free_rate),
            mortality: Mortality::Gompertz,
            withdrawal_model: WithdrawalModel::new(WithdrawalAssumptions::default())?,
        })
    }

    pub fn with_discount_curve(mut self, curve: YieldCurve) -> Self {
        self.discount_curve = curve;
        self
    }

    pub fn with_mortality(mut self, mortality: Mortality) -> Self {
        self.mortality = mortality;
        self
    }

    pub fn with_withdrawal_model(mut self, model: WithdrawalModel) -> Self {
        self.withdrawal_model = model;
        self
    }

    pub fn market(&self) -> &MarketParams {
        &self.market
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Dispatch a product to its pricer. `term_years` applies to FIA and
    /// RILA terms; MYGA and GLWB take their horizons from the product.
    pub fn price(
        &self,
        product: &Product,
        premium: f64,
        term_years: Option<f64>,
    ) -> Result<PricingResult, PricingError> {
        product.validate()?;
        info!(product = %product.product_name, "pricing product");

        match &product.terms {
            ProductTerms::Myga {
                fixed_rate,
                guarantee_years,
            } => {
                let pricer = MygaPricer::new(self.discount_curve.clone());
                Ok(PricingResult::Myga(pricer.price(
                    *fixed_rate,
                    *guarantee_years,
                    premium,
                )?))
            }
            ProductTerms::Fia { term_years: t, .. } => {
                let pricer = FiaPricer::new(self.market, self.config)?;
                let term = term_years.unwrap_or(*t as f64);
                Ok(PricingResult::Fia(pricer.price(product, term, premium)?))
            }
            ProductTerms::Rila { .. } => {
                let pricer = RilaPricer::new(self.market, self.config)?;
                Ok(PricingResult::Rila(pricer.price(
                    product,
                    term_years,
                    premium,
                )?))
            }
            ProductTerms::Glwb { rider, age } => {
                let pricer = GlwbPricer::new(self.config)?;
                Ok(PricingResult::Glwb(pricer.price(
                    rider,
                    premium,
                    *age,
                    &self.market,
                    &self.mortality,
                    &self.withdrawal_model,
                )?))
            }
        }
    }
}

/// One-shot convenience entry point: `price(product, market, premium, ...)`.
pub fn price_product(
    product: &Product,
    market: MarketParams,
    premium: f64,
    term_years: Option<f64>,
    config: PricingConfig,
) -> Result<PricingResult, PricingError> {
    ProductRegistry::new(market, config)?.price(product, premium, term_years)
}
