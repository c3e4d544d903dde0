/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Error type shared by the crate
pub mod error;

/// Exploration policies
pub mod exploration;

/// Environments to train in
pub mod gym;

/// Experience tuples
pub mod memory;

/// Training and evaluation loops
pub mod train;

/// Terminal front-ends
#[cfg(feature = "viz")]
pub mod viz;

mod util;
