pub mod black_scholes;
pub mod gbm;
pub mod monte_carlo;
pub mod payoff;
pub mod solver;

pub use black_scholes::{Greeks, OptionType};
pub use gbm::GbmParams;
pub use monte_carlo::{McEngine, McResult};
pub use payoff::{FiaPayoff, RilaPayoff};
