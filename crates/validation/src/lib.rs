pub mod gates;

pub use gates::{
    ensure_valid, validate, GateResult, GateStatus, ValidationContext, ValidationReport,
};
