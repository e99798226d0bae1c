//! Reward Functions
//!
//! Rewards compare the agent's ledger against the passive baseline after
//! both have traded at the same prices.

use serde::{Deserialize, Serialize};

use crate::rl::config::RewardKind;

/// Reward signal components
///
/// Keeping the components apart shows which term drives the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSignal {
    /// Agent profit minus baseline profit, scaled
    pub profit_edge: f64,
    /// Agent net worth minus baseline net worth, scaled
    pub net_worth_edge: f64,
    /// Penalty for assets left (almost) unheld; zero or negative
    pub idle_penalty: f64,
    /// Sum of the components
    pub total: f64,
}

impl RewardSignal {
    /// Create a zero reward signal
    pub fn zero() -> Self {
        Self::default()
    }

    fn from_parts(profit_edge: f64, net_worth_edge: f64, idle_penalty: f64) -> Self {
        Self {
            profit_edge,
            net_worth_edge,
            idle_penalty,
            total: profit_edge + net_worth_edge + idle_penalty,
        }
    }
}

/// Information needed to compute rewards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardTransition {
    pub balance_init: f64,
    /// Last entry of the agent profit history
    pub agent_profit: f64,
    /// Last entry of the baseline profit history
    pub baseline_profit: f64,
    pub agent_net_worth: f64,
    pub baseline_net_worth: f64,
    /// Agent quantity per asset, in position order
    pub agent_quantities: Vec<f64>,
}

impl RewardTransition {
    pub fn n_assets(&self) -> usize {
        self.agent_quantities.len()
    }
}

/// Trait for computing rewards
pub trait RewardFunction {
    /// Compute reward from a state transition
    fn compute(&self, transition: &RewardTransition) -> RewardSignal;
}

/// `(agent_profit - baseline_profit) / balance_init`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitDifferentialReward;

impl RewardFunction for ProfitDifferentialReward {
    fn compute(&self, t: &RewardTransition) -> RewardSignal {
        let edge = (t.agent_profit - t.baseline_profit) / t.balance_init;
        RewardSignal::from_parts(edge, 0.0, 0.0)
    }
}

/// Relative edges against the baseline plus an idle-asset penalty.
///
/// Denominators are the absolute baseline values; a baseline of exactly zero
/// falls back to `balance_init`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapedReward;

impl ShapedReward {
    /// Penalty applied per asset holding less than one unit
    pub fn idle_penalty(n_assets: usize) -> f64 {
        1.0 / ((n_assets + 1) as f64).sqrt() + 1.0
    }

    fn relative(diff: f64, base: f64, fallback: f64) -> f64 {
        let denom = base.abs();
        if denom == 0.0 {
            diff / fallback
        } else {
            diff / denom
        }
    }
}

impl RewardFunction for ShapedReward {
    fn compute(&self, t: &RewardTransition) -> RewardSignal {
        let profit_edge = Self::relative(
            t.agent_profit - t.baseline_profit,
            t.baseline_profit,
            t.balance_init,
        );
        let net_worth_edge = Self::relative(
            t.agent_net_worth - t.baseline_net_worth,
            t.baseline_net_worth,
            t.balance_init,
        );

        let per_asset = Self::idle_penalty(t.n_assets());
        let idle = t.agent_quantities.iter().filter(|q| **q < 1.0).count() as f64;

        RewardSignal::from_parts(profit_edge, net_worth_edge, -per_asset * idle)
    }
}

/// Reward function chosen at construction
#[derive(Debug, Clone, Copy)]
pub enum RewardStrategy {
    Simple(ProfitDifferentialReward),
    Shaped(ShapedReward),
}

impl From<RewardKind> for RewardStrategy {
    fn from(kind: RewardKind) -> Self {
        match kind {
            RewardKind::Simple => RewardStrategy::Simple(ProfitDifferentialReward),
            RewardKind::Shaped => RewardStrategy::Shaped(ShapedReward),
        }
    }
}

impl RewardStrategy {
    pub fn kind(&self) -> RewardKind {
        match self {
            RewardStrategy::Simple(_) => RewardKind::Simple,
            RewardStrategy::Shaped(_) => RewardKind::Shaped,
        }
    }
}

impl RewardFunction for RewardStrategy {
    fn compute(&self, transition: &RewardTransition) -> RewardSignal {
        match self {
            RewardStrategy::Simple(f) => f.compute(transition),
            RewardStrategy::Shaped(f) => f.compute(transition),
        }
    }
}
