pub mod fia;
pub mod glwb;
pub mod myga;
pub mod registry;
pub mod rila;


pub use fia::FiaPricer;
pub use glwb::GlwbPricer;
pub use myga::MygaPricer;
pub use registry::{price_product, ProductRegistry};
pub use rila::{RilaGreeks, RilaPricer};
