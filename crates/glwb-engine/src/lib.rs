pub mod fair_fee;
pub mod path_sim;
pub mod tracker;


pub use fair_fee::{FairFeeParams, FairFeeResult};
pub use path_sim::{GlwbPathSimulator, GlwbSensitivity, PathOutcome};
pub use tracker::{GwbState, GwbTracker, StepResult};
