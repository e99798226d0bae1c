//! Core RL abstractions
//!
//! Fundamental types for state representation, actions, and rewards.

pub mod action;
pub mod reward;
pub mod state;

pub use action::{format_action, positions, Action};
pub use reward::{
    ProfitDifferentialReward, RewardFunction, RewardSignal, RewardStrategy, RewardTransition,
    ShapedReward,
};
pub use state::{
    price_per_share, MaxScaleEncoder, NormParams, Observation, ObservationNormalizer,
    PortfolioSnapshot, RawEncoder, RunningMax, StateEncoder, StaticEncoder, StaticNorms,
    EXPANDED_COLUMNS,
};
