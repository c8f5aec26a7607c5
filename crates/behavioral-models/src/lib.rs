pub mod lapse;
pub mod mortality;
pub mod withdrawal;

pub use lapse::*;
pub use mortality::*;
pub use withdrawal::*;
