/// Exploration policy result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Explore,
    Exploit,
}

mod biased;
mod epsilon_greedy;

pub use biased::BiasedRandom;
pub use epsilon_greedy::EpsilonGreedy;
