//! Action Space
//!
//! An agent requests a target allocation either as a mapping from position
//! name to weight or as a dense vector ordered as `(*assets, "_out")`.

use serde::{Deserialize, Serialize};

use crate::error::{GymError, Result};
use crate::ledger::{Allocation, CASH_POSITION};

/// Allocation request accepted by `TradingEnvironment::step`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Weight per named position; missing positions get weight 0
    Allocation(Allocation),
    /// Dense weights in position order, cash last
    Weights(Vec<f64>),
}

impl From<Allocation> for Action {
    fn from(allocation: Allocation) -> Self {
        Action::Allocation(allocation)
    }
}

impl From<Vec<f64>> for Action {
    fn from(weights: Vec<f64>) -> Self {
        Action::Weights(weights)
    }
}

impl From<&[f64]> for Action {
    fn from(weights: &[f64]) -> Self {
        Action::Weights(weights.to_vec())
    }
}

impl Action {
    /// Resolve into an allocation over `positions`.
    ///
    /// Rejects dense vectors of the wrong length, unknown position names and
    /// non-finite weights.
    pub fn into_allocation(self, positions: &[String]) -> Result<Allocation> {
        let allocation = match self {
            Action::Weights(weights) => format_action(positions, &weights)?,
            Action::Allocation(allocation) => {
                if let Some(unknown) = allocation.keys().find(|k| !positions.contains(k)) {
                    return Err(GymError::InvalidAction(format!(
                        "unknown position '{}'",
                        unknown
                    )));
                }
                allocation
            }
        };

        if let Some((position, weight)) = allocation.iter().find(|(_, w)| !w.is_finite()) {
            return Err(GymError::InvalidAction(format!(
                "weight for '{}' is not finite: {}",
                position, weight
            )));
        }

        Ok(allocation)
    }
}

/// Position ordering for a set of asset symbols: the assets, then cash
pub fn positions<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    symbols
        .iter()
        .map(|s| s.as_ref().to_string())
        .chain(std::iter::once(CASH_POSITION.to_string()))
        .collect()
}

/// Zip dense weights against the position ordering
pub fn format_action(positions: &[String], weights: &[f64]) -> Result<Allocation> {
    if positions.len() != weights.len() {
        return Err(GymError::InvalidAction(format!(
            "expected {} weights, got {}",
            positions.len(),
            weights.len()
        )));
    }

    Ok(positions
        .iter()
        .cloned()
        .zip(weights.iter().copied())
        .collect())
}
