use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Market parameters shared by value across all pricers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Current index level.
    pub spot: f64,
    /// Risk-free rate (annualized, decimal).
    pub risk_free_rate: f64,
    /// Index dividend yield (annualized, decimal).
    pub dividend_yield: f64,
    /// Index volatility (annualized, decimal).
    pub volatility: f64,
}

impl MarketParams {
    pub fn new(
        spot: f64,
        risk_free_rate: f64,
        dividend_yield: f64,
        volatility: f64,
    ) -> Result<Self, PricingError> {
        let params = MarketParams {
            spot,
            risk_free_rate,
            dividend_yield,
            volatility,
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
        Ok(())
    }
}

/// How the index return is observed over the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingMethod {
    /// Single point-to-point observation at term end.
    AnnualPointToPoint,
    /// Average of 12 monthly observations over the term.
    MonthlyAverage,
}

/// RILA downside protection. Buffer absorbs the first X% of losses; floor
/// caps the total loss at X%. The two are never interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rate", rename_all = "snake_case")]
pub enum Protection {
    Buffer(f64),
    Floor(f64),
}

impl Protection {
    /// Derive the protection tag from the vendor's textual modifier:
    /// "up to" means buffer, "after" means floor.
    pub fn from_modifier(modifier: &str, rate: f64) -> Result<Self, PricingError> {
        if !(rate > 0.0 && rate < 1.0) {
            return Err(PricingError::precondition(
                "protection rate must be in (0, 1)",
                rate,
            ));
        }
        let lower = modifier.to_lowercase();
        if lower.contains("up to") {
            Ok(Protection::Buffer(rate))
        } else if lower.contains("after") {
            Ok(Protection::Floor(rate))
        } else {
            Err(PricingError::Data(format!(
                "unrecognized protection modifier '{modifier}': expected 'up to' (buffer) or 'after' (floor)"
            )))
        }
    }

    pub fn rate(&self) -> f64 {
        match self {
            Protection::Buffer(rate) | Protection::Floor(rate) => *rate,
        }
    }

    /// Maximum loss to the policyholder: 1 - b for a buffer, f for a floor.
    pub fn max_loss(&self) -> f64 {
        match self {
            Protection::Buffer(rate) => 1.0 - rate,
            Protection::Floor(rate) => *rate,
        }
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, Protection::Buffer(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Protection::Buffer(_) => "buffer",
            Protection::Floor(_) => "floor",
        }
    }
}

/// FIA crediting method, derived from whichever rate fields are present.
/// Priority order: cap > participation > spread > trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CreditingMethod {
    Cap { cap_rate: f64 },
    Participation { rate: f64, cap_rate: Option<f64> },
    Spread { rate: f64, cap_rate: Option<f64> },
    Trigger { rate: f64 },
}

/// GWB rollup rule applied during the deferral window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupType {
    Simple,
    Compound,
    None,
}

/// Basis on which the rider fee accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    AccountValue,
    GuaranteedBase,
}

/// GLWB rider mechanics. Immutable for the life of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GwbConfig {
    pub rollup_type: RollupType,
    pub rollup_rate: f64,
    pub rollup_cap_years: u32,
    pub ratchet_enabled: bool,
    pub ratchet_frequency: u32,
    pub withdrawal_rate: f64,
    pub fee_rate: f64,
    pub fee_basis: FeeBasis,
}

impl Default for GwbConfig {
    fn default() -> Self {
        GwbConfig {
            rollup_type: RollupType::Compound,
            rollup_rate: 0.05,
            rollup_cap_years: 10,
            ratchet_enabled: true,
            ratchet_frequency: 3,
            withdrawal_rate: 0.05,
            fee_rate: 0.01,
            fee_basis: FeeBasis::AccountValue,
        }
    }
}

impl GwbConfig {
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.rollup_rate < 0.0 {
            return Err(PricingError::precondition(
                "rollup rate must be >= 0",
                self.rollup_rate,
            ));
        }
        if !(0.0..=1.0).contains(&self.withdrawal_rate) {
            return Err(PricingError::precondition(
                "withdrawal rate must be in [0, 1]",
                self.withdrawal_rate,
            ));
        }
        if self.fee_rate < 0.0 {
            return Err(PricingError::precondition(
                "fee rate must be >= 0",
                self.fee_rate,
            ));
        }
        if self.ratchet_enabled && self.ratchet_frequency == 0 {
            return Err(PricingError::precondition(
                "ratchet frequency must be >= 1 when ratchets are enabled",
                0.0,
            ));
        }
        Ok(())
    }
}

/// Product-kind payload. Required fields fail fast at construction; no
/// defaults are ever substituted for a missing crediting method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product_type", rename_all = "snake_case")]
pub enum ProductTerms {
    Myga {
        fixed_rate: f64,
        guarantee_years: u32,
    },
    Fia {
        cap_rate: Option<f64>,
        participation_rate: Option<f64>,
        spread_rate: Option<f64>,
        trigger_rate: Option<f64>,
        index: String,
        indexing_method: IndexingMethod,
        term_years: u32,
    },
    Rila {
        protection: Protection,
        cap_rate: Option<f64>,
        term_years: u32,
        index: String,
    },
    Glwb {
        rider: GwbConfig,
        age: u32,
    },
}

/// A retail annuity product: shared header plus the kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub company_name: String,
    pub product_name: String,
    pub status: String,
    #[serde(flatten)]
    pub terms: ProductTerms,
}

impl Product {
    pub fn validate(&self) -> Result<(), PricingError> {
        match &self.terms {
            ProductTerms::Myga {
                fixed_rate,
                guarantee_years,
            } => {
                if *fixed_rate < 0.0 {
                    return Err(PricingError::precondition(
                        "MYGA fixed rate must be >= 0",
                        *fixed_rate,
                    ));
                }
                if *guarantee_years < 1 {
                    return Err(PricingError::precondition(
                        "MYGA guarantee duration must be >= 1 year",
                        *guarantee_years as f64,
                    ));
                }
            }
            ProductTerms::Fia { term_years, .. } => {
                if *term_years < 1 {
                    return Err(PricingError::precondition(
                        "FIA term must be >= 1 year",
                        *term_years as f64,
                    ));
                }
                self.crediting_method()?;
            }
            ProductTerms::Rila {
                protection,
                term_years,
                ..
            } => {
                if *term_years < 1 {
                    return Err(PricingError::precondition(
                        "RILA term must be >= 1 year",
                        *term_years as f64,
                    ));
                }
                let rate = protection.rate();
                if !(rate > 0.0 && rate < 1.0) {
                    return Err(PricingError::precondition(
                        "protection rate must be in (0, 1)",
                        rate,
                    ));
                }
            }
            ProductTerms::Glwb { rider, age } => {
                rider.validate()?;
                if *age >= 120 {
                    return Err(PricingError::precondition(
                        "issue age must be < 120",
                        *age as f64,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Derive the FIA crediting method from whichever rate fields are set,
    /// with priority cap > participation > spread > trigger. A FIA with no
    /// crediting field is a hard error, never a default.
    pub fn crediting_method(&self) -> Result<CreditingMethod, PricingError> {
        match &self.terms {
            ProductTerms::Fia {
                cap_rate,
                participation_rate,
                spread_rate,
                trigger_rate,
                ..
            } => {
                if let Some(cap) = cap_rate {
                    Ok(CreditingMethod::Cap { cap_rate: *cap })
                } else if let Some(rate) = participation_rate {
                    Ok(CreditingMethod::Participation {
                        rate: *rate,
                        cap_rate: *cap_rate,
                    })
                } else if let Some(rate) = spread_rate {
                    Ok(CreditingMethod::Spread {
                        rate: *rate,
                        cap_rate: *cap_rate,
                    })
                } else if let Some(rate) = trigger_rate {
                    Ok(CreditingMethod::Trigger { rate: *rate })
                } else {
                    Err(PricingError::Data(format!(
                        "FIA product '{}' has no crediting method; expected one of \
                         cap_rate, participation_rate, spread_rate, or trigger_rate",
                        self.product_name
                    )))
                }
            }
            _ => Err(PricingError::Data(format!(
                "product '{}' is not a FIA",
                self.product_name
            ))),
        }
    }
}

/// Present value plus metadata, the base pricing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvResult {
    pub present_value: f64,
    pub duration: f64,
    pub as_of_date: NaiveDate,
}

/// FIA pricing output: embedded option decomposition and fair terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiaResult {
    pub present_value: f64,
    pub duration: f64,
    pub as_of_date: NaiveDate,
    pub embedded_option_value: f64,
    pub option_budget: f64,
    pub fair_cap: Option<f64>,
    pub fair_participation: Option<f64>,
    pub expected_credit: f64,
}

/// RILA pricing output: protection/upside decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RilaResult {
    pub present_value: f64,
    pub duration: f64,
    pub as_of_date: NaiveDate,
    pub protection_value: f64,
    pub protection: Protection,
    pub upside_value: f64,
    pub expected_return: f64,
    pub max_loss: f64,
    pub breakeven_return: Option<f64>,
}

/// GLWB guarantee pricing output from the path simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlwbResult {
    /// Risk-neutral price of the guarantee (PV of insurer payments).
    pub price: f64,
    /// Guarantee cost as a fraction of premium.
    pub guarantee_cost: f64,
    /// Sample standard deviation of discounted path payoffs.
    pub std_payoff: f64,
    pub standard_error: f64,
    /// Fraction of paths in which the account value was exhausted.
    pub prob_ruin: f64,
    /// Mean ruin year over the ruined subset; -1.0 when no path ruined.
    pub mean_ruin_year: f64,
    pub n_paths: usize,
}

/// CTE reserve output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveResult {
    pub cte70: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Scenario ids in the CTE70 tail, for traceability.
    pub tail_scenario_ids: Vec<u32>,
    pub n_scenarios: usize,
}

/// Output of any pricer, tagged by product kind. Created by the pricer,
/// handed out immutable once it has passed the validation gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingResult {
    Myga(PvResult),
    Fia(FiaResult),
    Rila(RilaResult),
    Glwb(GlwbResult),
    Reserve(ReserveResult),
}

impl PricingResult {
    /// Present value where the variant carries one (guarantee price for GLWB).
    pub fn present_value(&self) -> Option<f64> {
        match self {
            PricingResult::Myga(r) => Some(r.present_value),
            PricingResult::Fia(r) => Some(r.present_value),
            PricingResult::Rila(r) => Some(r.present_value),
            PricingResult::Glwb(r) => Some(r.price),
            PricingResult::Reserve(_) => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            PricingResult::Myga(r) => Some(r.duration),
            PricingResult::Fia(r) => Some(r.duration),
            PricingResult::Rila(r) => Some(r.duration),
            _ => None,
        }
    }
}
