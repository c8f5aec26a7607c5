pub mod scenarios;
pub mod vm21;
pub mod vm22;

pub use scenarios::{
    deterministic_scenarios, Ag43Scenarios, EconomicScenario, EquityParams, ScenarioGenerator,
    ScenarioMatrices, ScenarioStatistics, VasicekParams,
};
pub use vm21::{cte, cte_levels, PolicyData, Vm21Calculator};
pub use vm22::{FixedAnnuityPolicy, StochasticExclusionResult, Vm22Calculator, Vm22Result};
