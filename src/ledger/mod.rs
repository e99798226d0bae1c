//! Accounting engine
//!
//! A ledger turns allocation instructions into fills against current prices
//! and reports the resulting balance, holdings and exposure. The environment
//! drives two instances of one ledger type: the agent and the passive
//! baseline.

mod portfolio;

use std::collections::HashMap;

use crate::error::Result;

pub use crate::domain::Prices;
pub use portfolio::{Holding, Portfolio, QTY_EPSILON};

/// Reserved position name for uninvested cash
pub const CASH_POSITION: &str = "_out";

/// Requested weight per position, keyed by asset symbol or `CASH_POSITION`
pub type Allocation = HashMap<String, f64>;

/// Contract the step protocol needs from an accounting engine.
///
/// Negative balances are tolerated; solvency is judged by the caller.
#[cfg_attr(test, mockall::automock)]
pub trait Ledger {
    /// Return to the initial capital with no holdings
    fn reset(&mut self);

    /// Rebalance toward `allocation` at `prices`
    fn make_trade(&mut self, allocation: &Allocation, prices: &Prices) -> Result<()>;

    /// Realized balance: initial capital plus realized P&L minus fees
    fn balance(&self) -> f64;

    /// Mark-to-market value of cash plus holdings at the last traded prices
    fn net_worth(&self) -> f64;

    /// Most recent entry of the profit history
    fn last_profit(&self) -> f64;

    /// Signed quantity held of `asset` (0 when not held)
    fn quantity(&self, asset: &str) -> f64;

    /// Fraction of net worth in `asset`; `CASH_POSITION` gives the cash fraction
    fn exposure(&self, asset: &str) -> f64;

    /// Sum of held quantities across all assets
    fn total_quantity(&self) -> f64;
}
