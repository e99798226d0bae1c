//! Simulated Trading Environment
//!
//! A gym-like environment that replays a historical multi-asset feature
//! table and scores an agent's allocations against a passive baseline.

mod sample;
mod spaces;
mod trading;

pub use sample::{generate_sample_data, generate_sample_data_with, DEFAULT_VOLATILITY};
pub use spaces::BoxSpace;
pub use trading::{EnvStatus, StepInfo, StepResult, TradingEnvironment};
