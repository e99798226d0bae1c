pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod rl;
pub mod runner;
pub mod validation;

pub use config::AppConfig;
pub use domain::{AssetSeries, Bar, FeatureRow, MarketData};
pub use error::{GymError, Result};
pub use ledger::{Allocation, Ledger, Portfolio, CASH_POSITION};
pub use rl::{
    Action, EnvConfig, EnvStatus, NormalizationMethod, Observation, RewardKind, StepResult,
    TradingEnvironment,
};
pub use runner::{EpisodeSummary, PolicyKind};
