pub mod config;
pub mod curve;
pub mod error;
pub mod types;

pub use config::*;
pub use curve::*;
pub use error::*;
pub use types::*;
