//! Environment Configuration
//!
//! Construction-time settings for the trading environment.

use serde::{Deserialize, Serialize};

use crate::error::{GymError, Result};
use crate::rl::core::state::StaticNorms;

/// Default starting capital for both ledgers
pub const DEFAULT_BALANCE_INIT: f64 = 1_000_000.0;

/// Fee used by the raw-observation variant when none is configured
pub const DEFAULT_FEE_RAW: f64 = 0.02;

/// Fee used by the normalized variants when none is configured
pub const DEFAULT_FEE_NORMALIZED: f64 = 0.001;

/// Normalization methods for observation features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    /// Raw features, no portfolio state
    #[default]
    None,
    /// Z-score style `(raw - shift) / scale` with frozen parameters
    Static,
    /// Division by a running per-feature maximum
    MaxScale,
}

impl NormalizationMethod {
    /// Whether observations carry the portfolio columns and meta row
    pub fn is_expanded(&self) -> bool {
        !matches!(self, NormalizationMethod::None)
    }
}

/// Reward function selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Profit differential against the baseline, scaled by initial capital
    #[default]
    Simple,
    /// Relative profit and net-worth edges plus an idle-asset penalty
    Shaped,
}

/// Trading environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Initial capital of both ledgers
    pub balance_init: f64,
    /// Proportional fee per fill; `None` picks the variant default
    pub fee: Option<f64>,
    /// Observation normalization
    pub normalization: NormalizationMethod,
    /// Reward function
    pub reward: RewardKind,
    /// Static normalization parameters (only used with `Static`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub norms: Option<StaticNorms>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::simple()
    }
}

impl EnvConfig {
    /// Raw observations with the simple reward
    pub fn simple() -> Self {
        Self {
            balance_init: DEFAULT_BALANCE_INIT,
            fee: None,
            normalization: NormalizationMethod::None,
            reward: RewardKind::Simple,
            norms: None,
        }
    }

    /// Statically normalized observations with the shaped reward
    pub fn normalized() -> Self {
        Self {
            normalization: NormalizationMethod::Static,
            reward: RewardKind::Shaped,
            ..Self::simple()
        }
    }

    /// Running max-scaled observations with the shaped reward
    pub fn max_scaled() -> Self {
        Self {
            normalization: NormalizationMethod::MaxScale,
            reward: RewardKind::Shaped,
            ..Self::simple()
        }
    }

    pub fn with_balance_init(mut self, balance_init: f64) -> Self {
        self.balance_init = balance_init;
        self
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn with_norms(mut self, norms: StaticNorms) -> Self {
        self.norms = Some(norms);
        self
    }

    /// Configured fee, or the default of the selected normalization variant
    pub fn effective_fee(&self) -> f64 {
        self.fee.unwrap_or(match self.normalization {
            NormalizationMethod::None => DEFAULT_FEE_RAW,
            NormalizationMethod::Static | NormalizationMethod::MaxScale => DEFAULT_FEE_NORMALIZED,
        })
    }

    /// Check scalar settings; norms are checked against the asset set later
    pub fn validate(&self) -> Result<()> {
        if !self.balance_init.is_finite() || self.balance_init <= 0.0 {
            return Err(GymError::Validation(format!(
                "balance_init must be positive: {}",
                self.balance_init
            )));
        }

        let fee = self.effective_fee();
        if !fee.is_finite() || !(0.0..1.0).contains(&fee) {
            return Err(GymError::Validation(format!(
                "fee must be in [0, 1): {}",
                fee
            )));
        }

        Ok(())
    }
}
