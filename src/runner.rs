//! Episode runner for fixed reference policies.
//!
//! Drives a `TradingEnvironment` from reset to termination and condenses the
//! trajectory into a summary row.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;
use tracing::info;

use crate::error::{GymError, Result};
use crate::ledger::Ledger;
use crate::rl::core::action::Action;
use crate::rl::environment::TradingEnvironment;

/// Reference policy used to pick actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Equal weight on every asset, no cash
    #[default]
    Equal,
    /// Everything in cash
    Cash,
    /// Uniform sample from the action space each step
    Random,
}

impl FromStr for PolicyKind {
    type Err = GymError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "equal" => Ok(PolicyKind::Equal),
            "cash" => Ok(PolicyKind::Cash),
            "random" => Ok(PolicyKind::Random),
            other => Err(GymError::Validation(format!(
                "Unknown policy '{}' (expected equal, cash or random)",
                other
            ))),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Equal => "equal",
            PolicyKind::Cash => "cash",
            PolicyKind::Random => "random",
        };
        write!(f, "{}", name)
    }
}

impl PolicyKind {
    /// Dense action for an environment with `n_assets` assets
    pub fn action<L: Ledger, R: Rng + ?Sized>(
        &self,
        env: &TradingEnvironment<L>,
        rng: &mut R,
    ) -> Action {
        let n = env.n_assets();
        match self {
            PolicyKind::Equal => {
                let mut weights = vec![1.0; n];
                weights.push(0.0);
                Action::Weights(weights)
            }
            PolicyKind::Cash => {
                let mut weights = vec![0.0; n];
                weights.push(1.0);
                Action::Weights(weights)
            }
            PolicyKind::Random => Action::Weights(env.action_space().sample(rng)),
        }
    }
}

/// Outcome of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub policy: PolicyKind,
    pub steps: usize,
    #[tabled(display = "fmt_f64")]
    pub total_reward: f64,
    #[tabled(display = "fmt_f64")]
    pub final_net_worth: f64,
    #[tabled(display = "fmt_f64")]
    pub final_baseline_net_worth: f64,
    #[tabled(display = "fmt_f64")]
    pub final_balance: f64,
}

fn fmt_f64(value: &f64) -> String {
    format!("{:.4}", value)
}

/// Run one full episode with `policy`
pub fn run_episode<L: Ledger, R: Rng + ?Sized>(
    env: &mut TradingEnvironment<L>,
    episode: usize,
    policy: PolicyKind,
    rng: &mut R,
) -> Result<EpisodeSummary> {
    env.reset()?;

    let mut steps = 0;
    let mut total_reward = 0.0;
    loop {
        let action = policy.action(env, rng);
        let result = env.step(action)?;
        steps += 1;
        total_reward += result.reward;
        if result.done {
            break;
        }
    }

    let last = |h: &[f64]| h.last().copied().unwrap_or(0.0);
    let summary = EpisodeSummary {
        episode,
        policy,
        steps,
        total_reward,
        final_net_worth: last(env.net_worth_history()),
        final_baseline_net_worth: last(env.baseline_net_worth_history()),
        final_balance: env.balance(),
    };

    info!(
        episode,
        steps,
        total_reward,
        net_worth = summary.final_net_worth,
        baseline_net_worth = summary.final_baseline_net_worth,
        "Episode finished"
    );

    Ok(summary)
}

/// Run `episodes` consecutive episodes on one environment
pub fn run_episodes<L: Ledger, R: Rng + ?Sized>(
    env: &mut TradingEnvironment<L>,
    episodes: usize,
    policy: PolicyKind,
    rng: &mut R,
) -> Result<Vec<EpisodeSummary>> {
    (0..episodes)
        .map(|episode| run_episode(env, episode, policy, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::config::EnvConfig;
    use crate::rl::environment::generate_sample_data;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn env(config: EnvConfig) -> TradingEnvironment {
        let data = Arc::new(generate_sample_data(&["AAA", "BBB", "CCC"], 30, 5).unwrap());
        TradingEnvironment::new(data, config).unwrap()
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("equal".parse::<PolicyKind>().unwrap(), PolicyKind::Equal);
        assert_eq!("Random".parse::<PolicyKind>().unwrap(), PolicyKind::Random);
        assert!("momentum".parse::<PolicyKind>().is_err());
        assert_eq!(PolicyKind::Cash.to_string(), "cash");
    }

    #[test]
    fn test_summary_table_formats_floats() {
        let summary = EpisodeSummary {
            episode: 0,
            policy: PolicyKind::Equal,
            steps: 12,
            total_reward: 1.234_567,
            final_net_worth: 1_000_000.0,
            final_baseline_net_worth: 999_999.5,
            final_balance: 1_000_000.0,
        };
        let table = tabled::Table::new([summary]).to_string();
        assert!(table.contains("total_reward"));
        assert!(table.contains("1.2346"));
        assert!(table.contains("999999.5000"));
    }

    #[test]
    fn test_cash_policy_keeps_capital() {
        let mut env = env(EnvConfig::simple());
        let mut rng = StdRng::seed_from_u64(0);
        let summary = run_episode(&mut env, 0, PolicyKind::Cash, &mut rng).unwrap();

        assert_eq!(summary.steps, 28);
        assert_eq!(summary.final_net_worth, 1_000_000.0);
        assert_eq!(summary.final_balance, 1_000_000.0);
    }

    #[test]
    fn test_equal_policy_without_fee_tracks_baseline() {
        let mut env = env(EnvConfig::simple().with_fee(0.0));
        let mut rng = StdRng::seed_from_u64(0);
        let summary = run_episode(&mut env, 0, PolicyKind::Equal, &mut rng).unwrap();

        let gap = (summary.final_net_worth - summary.final_baseline_net_worth).abs();
        assert!(gap < 1e-6 * summary.final_baseline_net_worth);
        assert!(summary.total_reward.abs() < 1e-9);
    }

    #[test]
    fn test_random_policy_runs_all_variants() {
        for config in [EnvConfig::simple(), EnvConfig::normalized(), EnvConfig::max_scaled()] {
            let mut env = env(config);
            let mut rng = StdRng::seed_from_u64(9);
            let summaries = run_episodes(&mut env, 2, PolicyKind::Random, &mut rng).unwrap();
            assert_eq!(summaries.len(), 2);
            assert!(summaries.iter().all(|s| s.total_reward.is_finite()));
        }
    }
}
