//! Reinforcement Learning Environment
//!
//! Step/reset protocol for portfolio allocation agents.
//!
//! # Features
//!
//! - **Observations**: raw features, static z-score, or running max-scale
//! - **Actions**: per-position weight mappings or dense weight vectors
//! - **Rewards**: simple profit differential or shaped edge vs. baseline
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use folio_gym::rl::{generate_sample_data, EnvConfig, TradingEnvironment};
//!
//! let data = Arc::new(generate_sample_data(&["AAA", "BBB"], 100, 7)?);
//! let mut env = TradingEnvironment::new(data, EnvConfig::normalized())?;
//! let _obs = env.reset()?;
//! let result = env.step(vec![0.5, 0.3, 0.2])?;
//! println!("reward {}", result.reward);
//! # Ok::<(), folio_gym::GymError>(())
//! ```

pub mod config;
pub mod core;
pub mod environment;

// Config exports
pub use config::{EnvConfig, NormalizationMethod, RewardKind};

// Core exports
pub use core::{
    format_action, positions, price_per_share, Action, NormParams, Observation,
    ObservationNormalizer, RewardFunction, RewardSignal, RewardStrategy, RunningMax,
    StateEncoder, StaticNorms,
};

// Environment exports
pub use environment::{
    generate_sample_data, BoxSpace, EnvStatus, StepInfo, StepResult, TradingEnvironment,
};
