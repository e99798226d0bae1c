//! Trading Environment for RL Training
//!
//! Provides a gym-like interface with step/reset over a shared multi-asset
//! feature table. Each step trades the agent's allocation and the passive
//! full-long baseline at the same close prices, then observes the next row.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::spaces::BoxSpace;
use crate::domain::{MarketData, Prices};
use crate::error::{GymError, Result};
use crate::ledger::{Allocation, Ledger, Portfolio};
use crate::rl::config::{EnvConfig, NormalizationMethod};
use crate::rl::core::action::{self, Action};
use crate::rl::core::reward::{RewardFunction, RewardSignal, RewardStrategy, RewardTransition};
use crate::rl::core::state::{
    Observation, ObservationNormalizer, PortfolioSnapshot, RunningMax, StateEncoder,
};

/// Episode lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnvStatus {
    /// Constructed, never reset
    Uninitialized,
    /// Accepting steps
    Ready,
    /// Terminated; only `reset` is valid
    Done,
}

/// Additional step information (reserved, currently empty)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepInfo {}

/// Result of taking a step in the environment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Observation at the new cursor
    pub observation: Observation,
    /// Reward signal total
    pub reward: f64,
    /// Whether episode is done
    pub done: bool,
    /// Additional info
    pub info: StepInfo,
}

fn round9(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

/// Trading environment for RL training
pub struct TradingEnvironment<L: Ledger = Portfolio> {
    data: Arc<MarketData>,
    config: EnvConfig,
    symbols: Vec<String>,
    positions: Vec<String>,
    agent: L,
    baseline: L,
    baseline_allocation: Allocation,
    normalizer: ObservationNormalizer,
    reward_fn: RewardStrategy,
    running: RunningMax,
    current_step: usize,
    status: EnvStatus,
    net_worth: Vec<f64>,
    net_worth_baseline: Vec<f64>,
    last_signal: RewardSignal,
}

impl TradingEnvironment<Portfolio> {
    /// Create a new trading environment backed by `Portfolio` ledgers
    pub fn new(data: Arc<MarketData>, config: EnvConfig) -> Result<Self> {
        let symbols: Vec<String> = data.symbols().map(str::to_string).collect();
        let fee = config.effective_fee();
        let agent = Portfolio::new(symbols.clone(), config.balance_init, fee);
        let baseline = Portfolio::new(symbols, config.balance_init, fee);
        Self::with_ledgers(data, config, agent, baseline)
    }
}

impl<L: Ledger> TradingEnvironment<L> {
    /// Create an environment around caller-supplied ledgers
    pub fn with_ledgers(
        data: Arc<MarketData>,
        config: EnvConfig,
        agent: L,
        baseline: L,
    ) -> Result<Self> {
        config.validate()?;

        let symbols: Vec<String> = data.symbols().map(str::to_string).collect();
        let positions = action::positions(&symbols);
        let baseline_allocation = symbols.iter().map(|s| (s.clone(), 1.0)).collect();
        let normalizer =
            ObservationNormalizer::new(config.normalization, config.norms.clone(), &data)?;
        let reward_fn = RewardStrategy::from(config.reward);

        info!(
            assets = symbols.len(),
            rows = data.n_rows(),
            normalization = ?config.normalization,
            reward = ?config.reward,
            fee = config.effective_fee(),
            balance_init = config.balance_init,
            "Trading environment created"
        );

        Ok(Self {
            data,
            symbols,
            positions,
            agent,
            baseline,
            baseline_allocation,
            normalizer,
            reward_fn,
            running: RunningMax::default(),
            current_step: 1,
            status: EnvStatus::Uninitialized,
            net_worth: vec![config.balance_init],
            net_worth_baseline: vec![config.balance_init],
            last_signal: RewardSignal::zero(),
            config,
        })
    }

    /// Reset the environment for a new episode and observe row 1
    pub fn reset(&mut self) -> Result<Observation> {
        self.agent.reset();
        self.baseline.reset();

        self.current_step = 1;
        self.net_worth = vec![self.config.balance_init];
        self.net_worth_baseline = vec![self.config.balance_init];
        self.last_signal = RewardSignal::zero();
        self.running = match self.normalizer.method() {
            NormalizationMethod::MaxScale => RunningMax::seed(&self.data),
            _ => RunningMax::default(),
        };

        let observation = self.observe()?;
        self.status = EnvStatus::Ready;

        info!(
            rows = self.data.n_rows(),
            balance_init = self.config.balance_init,
            "Episode reset"
        );

        Ok(observation)
    }

    /// Take one step in the environment.
    ///
    /// Fails without mutating anything when the episode is not running or
    /// the action is malformed. A ledger or encoding failure after that ends
    /// the episode, and only `reset` is accepted afterwards.
    pub fn step(&mut self, action: impl Into<Action>) -> Result<StepResult> {
        match self.status {
            EnvStatus::Uninitialized => return Err(GymError::NotReset),
            EnvStatus::Done => {
                return Err(GymError::EpisodeDone {
                    step: self.current_step,
                })
            }
            EnvStatus::Ready => {}
        }

        let allocation = action.into().into_allocation(&self.positions)?;

        let outcome = self.advance(&allocation);
        if let Err(err) = &outcome {
            // ledgers may already have traded; the episode cannot continue
            self.status = EnvStatus::Done;
            warn!(
                step = self.current_step,
                error = %err,
                "Step failed after trading started, episode needs reset"
            );
        }
        outcome
    }

    fn advance(&mut self, allocation: &Allocation) -> Result<StepResult> {
        let prices = self.data.prices_at(self.current_step);

        self.agent.make_trade(allocation, &prices)?;
        self.baseline.make_trade(&self.baseline_allocation, &prices)?;

        self.net_worth.push(self.agent.net_worth());
        self.net_worth_baseline.push(self.baseline.net_worth());
        self.current_step += 1;

        let observation = self.observe()?;
        let signal = self.reward_fn.compute(&self.transition());
        self.last_signal = signal;

        let balance = self.agent.balance();
        let insolvent = round9(balance) < 0.0;
        let exhausted = self.current_step >= self.data.n_rows() - 1;
        let done = insolvent || exhausted;

        if insolvent {
            warn!(
                step = self.current_step,
                balance,
                net_worth = self.agent.net_worth(),
                "Agent ledger insolvent, ending episode"
            );
        }
        if done {
            self.status = EnvStatus::Done;
        }

        debug!(
            step = self.current_step,
            reward = signal.total,
            net_worth = self.agent.net_worth(),
            baseline_net_worth = self.baseline.net_worth(),
            done,
            "Step"
        );

        Ok(StepResult {
            observation,
            reward: signal.total,
            done,
            info: StepInfo::default(),
        })
    }

    fn observe(&mut self) -> Result<Observation> {
        let net_worth = self
            .net_worth
            .last()
            .copied()
            .unwrap_or(self.config.balance_init);
        let snapshot = PortfolioSnapshot::capture(
            &self.agent,
            &self.symbols,
            net_worth,
            self.config.balance_init,
        );
        self.normalizer
            .encode(&self.data, self.current_step, &snapshot, &mut self.running)
    }

    fn transition(&self) -> RewardTransition {
        RewardTransition {
            balance_init: self.config.balance_init,
            agent_profit: self.agent.last_profit(),
            baseline_profit: self.baseline.last_profit(),
            agent_net_worth: self.agent.net_worth(),
            baseline_net_worth: self.baseline.net_worth(),
            agent_quantities: self.symbols.iter().map(|s| self.agent.quantity(s)).collect(),
        }
    }

    /// Weights in `[-1, 1]` per asset and `[0, 1]` for cash
    pub fn action_space(&self) -> BoxSpace {
        let n = self.symbols.len();
        let mut low = vec![-1.0; n];
        low.push(0.0);
        BoxSpace::new(low, vec![1.0; n + 1], vec![n + 1])
    }

    pub fn observation_space(&self) -> BoxSpace {
        let (rows, cols) = self.normalizer.shape(self.symbols.len());
        BoxSpace::unbounded(vec![rows, cols])
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == EnvStatus::Done
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn data(&self) -> &Arc<MarketData> {
        &self.data
    }

    /// Asset symbols in position order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Position ordering for dense actions: the assets, then `_out`
    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    pub fn agent(&self) -> &L {
        &self.agent
    }

    pub fn baseline(&self) -> &L {
        &self.baseline
    }

    /// Agent realized balance
    pub fn balance(&self) -> f64 {
        self.agent.balance()
    }

    /// Agent net-worth trajectory, seeded with `balance_init`
    pub fn net_worth_history(&self) -> &[f64] {
        &self.net_worth
    }

    /// Baseline net-worth trajectory, seeded with `balance_init`
    pub fn baseline_net_worth_history(&self) -> &[f64] {
        &self.net_worth_baseline
    }

    /// Close prices at the cursor
    pub fn prices(&self) -> Prices {
        self.data.prices_at(self.current_step)
    }

    /// Components of the most recent reward
    pub fn last_reward(&self) -> RewardSignal {
        self.last_signal
    }

    pub fn running_max(&self) -> &RunningMax {
        &self.running
    }
}
