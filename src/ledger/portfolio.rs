use std::collections::HashMap;
use tracing::debug;

use super::{Allocation, Ledger, Prices, CASH_POSITION};
use crate::error::{GymError, Result};

/// Fills smaller than this are skipped and residual positions snap to flat
pub const QTY_EPSILON: f64 = 1e-9;

/// Signed position in one asset with its weighted average cost
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Holding {
    /// Signed quantity (negative for shorts)
    pub quantity: f64,
    /// Weighted average entry price of the open quantity
    pub avg_cost: f64,
}

impl Holding {
    /// Apply a signed fill and return the P&L realized by it.
    ///
    /// Fills in the direction of the position extend it and move the average
    /// cost. Opposing fills close against the average cost first; any excess
    /// opens a new position at the fill price.
    fn apply(&mut self, delta: f64, price: f64) -> f64 {
        let held = self.quantity;

        if held == 0.0 || held.signum() == delta.signum() {
            let size = held.abs() + delta.abs();
            self.avg_cost = (held.abs() * self.avg_cost + delta.abs() * price) / size;
            self.quantity = held + delta;
            return 0.0;
        }

        let closed = delta.abs().min(held.abs());
        let realized = closed * (price - self.avg_cost) * held.signum();
        let remaining = held + delta;

        if remaining.abs() < QTY_EPSILON {
            *self = Holding::default();
        } else if remaining.signum() != held.signum() {
            // flipped through flat
            self.quantity = remaining;
            self.avg_cost = price;
        } else {
            self.quantity = remaining;
        }

        realized
    }

    /// Unrealized P&L against the average cost at `price`
    pub fn unrealized(&self, price: f64) -> f64 {
        self.quantity * (price - self.avg_cost)
    }
}

/// Normalized allocation: per-asset fractions plus the cash reserve fraction
struct TargetWeights {
    assets: HashMap<String, f64>,
    cash: f64,
}

/// Proportional-fee rebalancing ledger.
///
/// Each trade moves holdings toward `fraction * net_worth / price` per asset.
/// Reductions execute before additions, and additions are scaled down
/// uniformly so cash never drops below the requested cash reserve.
#[derive(Debug, Clone)]
pub struct Portfolio {
    symbols: Vec<String>,
    balance_init: f64,
    fee: f64,
    cash: f64,
    balance: f64,
    holdings: HashMap<String, Holding>,
    last_prices: Prices,
    net_worth: f64,
    net_worth_history: Vec<f64>,
    profits: Vec<f64>,
    fees_paid: f64,
    exposures: HashMap<String, f64>,
}

impl Portfolio {
    /// Create a flat portfolio over `symbols`
    pub fn new(symbols: Vec<String>, balance_init: f64, fee: f64) -> Self {
        let mut portfolio = Self {
            symbols,
            balance_init,
            fee,
            cash: balance_init,
            balance: balance_init,
            holdings: HashMap::new(),
            last_prices: HashMap::new(),
            net_worth: balance_init,
            net_worth_history: Vec::new(),
            profits: Vec::new(),
            fees_paid: 0.0,
            exposures: HashMap::new(),
        };
        portfolio.reset();
        portfolio
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn balance_init(&self) -> f64 {
        self.balance_init
    }

    pub fn fee(&self) -> f64 {
        self.fee
    }

    /// Uninvested cash (can differ from `balance` while positions are open)
    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    /// Profit per trade, seeded with 0 at reset
    pub fn profits(&self) -> &[f64] {
        &self.profits
    }

    /// Net worth per trade, seeded with the initial capital at reset
    pub fn net_worth_history(&self) -> &[f64] {
        &self.net_worth_history
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    /// Signed quantity per asset, zeros included
    pub fn positions_full(&self) -> HashMap<String, f64> {
        self.symbols
            .iter()
            .map(|s| (s.clone(), self.quantity(s)))
            .collect()
    }

    /// Exposure fraction per asset plus `CASH_POSITION`
    pub fn positions_norm(&self) -> &HashMap<String, f64> {
        &self.exposures
    }

    /// Sum of unrealized P&L over open positions at the last traded prices
    pub fn unrealized_pnl(&self) -> f64 {
        self.holdings
            .iter()
            .map(|(s, h)| h.unrealized(self.last_prices.get(s).copied().unwrap_or(h.avg_cost)))
            .sum()
    }

    fn target_weights(&self, allocation: &Allocation) -> Result<TargetWeights> {
        for (position, weight) in allocation {
            if position != CASH_POSITION && !self.symbols.contains(position) {
                return Err(GymError::Ledger(format!("Unknown position: {}", position)));
            }
            if !weight.is_finite() {
                return Err(GymError::Ledger(format!(
                    "Weight for {} is not finite: {}",
                    position, weight
                )));
            }
        }

        // Summed in position order so equal requests give bit-identical fills
        let total: f64 = self
            .symbols
            .iter()
            .map(|s| allocation.get(s).map(|w| w.abs()).unwrap_or(0.0))
            .sum::<f64>()
            + allocation.get(CASH_POSITION).map(|w| w.abs()).unwrap_or(0.0);
        if total == 0.0 {
            return Ok(TargetWeights {
                assets: self.symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
                cash: 1.0,
            });
        }

        let assets = self
            .symbols
            .iter()
            .map(|s| (s.clone(), allocation.get(s).copied().unwrap_or(0.0) / total))
            .collect();
        let cash = allocation.get(CASH_POSITION).map(|w| w.abs()).unwrap_or(0.0) / total;

        Ok(TargetWeights { assets, cash })
    }

    fn mark(&mut self, prices: &Prices) -> Result<()> {
        let mut marked = HashMap::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let price = prices
                .get(symbol)
                .copied()
                .ok_or_else(|| GymError::Ledger(format!("Missing price for {}", symbol)))?;
            if !price.is_finite() || price <= 0.0 {
                return Err(GymError::Ledger(format!(
                    "Price for {} must be positive: {}",
                    symbol, price
                )));
            }
            marked.insert(symbol.clone(), price);
        }
        self.last_prices = marked;
        self.revalue();
        Ok(())
    }

    fn revalue(&mut self) {
        let invested: f64 = self
            .symbols
            .iter()
            .map(|s| self.quantity(s) * self.last_prices.get(s).copied().unwrap_or(0.0))
            .sum();
        self.net_worth = self.cash + invested;

        let nw = self.net_worth;
        let fraction = |value: f64| if nw == 0.0 { 0.0 } else { value / nw };

        self.exposures = self
            .symbols
            .iter()
            .map(|s| {
                let price = self.last_prices.get(s).copied().unwrap_or(0.0);
                (s.clone(), fraction(self.quantity(s) * price))
            })
            .collect();
        self.exposures
            .insert(CASH_POSITION.to_string(), fraction(self.cash));
    }

    fn fill(&mut self, symbol: &str, delta: f64, price: f64) {
        let cost = self.fee * delta.abs() * price;
        let realized = self
            .holdings
            .entry(symbol.to_string())
            .or_default()
            .apply(delta, price);

        self.cash -= delta * price + cost;
        self.balance += realized - cost;
        self.fees_paid += cost;
    }
}

impl Ledger for Portfolio {
    fn reset(&mut self) {
        self.cash = self.balance_init;
        self.balance = self.balance_init;
        self.holdings.clear();
        self.last_prices.clear();
        self.net_worth = self.balance_init;
        self.net_worth_history = vec![self.balance_init];
        self.profits = vec![0.0];
        self.fees_paid = 0.0;
        self.exposures = self.symbols.iter().map(|s| (s.clone(), 0.0)).collect();
        self.exposures.insert(CASH_POSITION.to_string(), 1.0);
    }

    fn make_trade(&mut self, allocation: &Allocation, prices: &Prices) -> Result<()> {
        let weights = self.target_weights(allocation)?;
        self.mark(prices)?;

        // An insolvent book can only unwind
        let base = self.net_worth.max(0.0);
        let reserve = weights.cash * base;

        let plan: Vec<(String, f64, f64)> = self
            .symbols
            .iter()
            .map(|s| {
                let price = self.last_prices[s];
                let target = weights.assets[s] * base / price;
                (s.clone(), target - self.quantity(s), price)
            })
            .filter(|(_, delta, _)| delta.abs() >= QTY_EPSILON)
            .collect();

        let (sells, buys): (Vec<_>, Vec<_>) = plan.into_iter().partition(|(_, d, _)| *d < 0.0);

        for (symbol, delta, price) in &sells {
            self.fill(symbol, *delta, *price);
        }

        let cost: f64 = buys
            .iter()
            .map(|(_, d, p)| d * p * (1.0 + self.fee))
            .sum();
        let available = (self.cash - reserve).max(0.0);
        let scale = if cost > available { available / cost } else { 1.0 };

        for (symbol, delta, price) in &buys {
            let scaled = delta * scale;
            if scaled >= QTY_EPSILON {
                self.fill(symbol, scaled, *price);
            }
        }

        self.revalue();
        self.net_worth_history.push(self.net_worth);
        self.profits.push(self.net_worth - self.balance_init);

        debug!(
            sells = sells.len(),
            buys = buys.len(),
            buy_scale = scale,
            balance = self.balance,
            net_worth = self.net_worth,
            "Rebalanced portfolio"
        );

        Ok(())
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn net_worth(&self) -> f64 {
        self.net_worth
    }

    fn last_profit(&self) -> f64 {
        self.profits.last().copied().unwrap_or(0.0)
    }

    fn quantity(&self, asset: &str) -> f64 {
        self.holdings.get(asset).map(|h| h.quantity).unwrap_or(0.0)
    }

    fn exposure(&self, asset: &str) -> f64 {
        self.exposures.get(asset).copied().unwrap_or(0.0)
    }

    fn total_quantity(&self) -> f64 {
        self.symbols.iter().map(|s| self.quantity(s)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    fn alloc(pairs: &[(&str, f64)]) -> Allocation {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn prices(a: f64, b: f64) -> Prices {
        alloc(&[("A", a), ("B", b)])
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    fn assert_accounting(p: &Portfolio) {
        let marked: f64 = p
            .symbols()
            .iter()
            .map(|s| p.holding(s).map(|h| h.unrealized(p.last_prices[s])).unwrap_or(0.0))
            .sum();
        assert!(
            close(p.net_worth(), p.balance() + marked),
            "nw {} != balance {} + unrealized {}",
            p.net_worth(),
            p.balance(),
            marked
        );
    }

    #[test]
    fn test_reset_state() {
        let p = Portfolio::new(symbols(), 1_000.0, 0.01);
        assert_eq!(p.balance(), 1_000.0);
        assert_eq!(p.net_worth(), 1_000.0);
        assert_eq!(p.profits(), &[0.0]);
        assert_eq!(p.exposure(CASH_POSITION), 1.0);
        assert_eq!(p.exposure("A"), 0.0);
        assert_eq!(p.total_quantity(), 0.0);
    }

    #[test]
    fn test_full_investment_without_fee_keeps_realized_balance() {
        let mut p = Portfolio::new(symbols(), 1e6, 0.0);
        p.make_trade(&alloc(&[("A", 0.5), ("B", 0.5), (CASH_POSITION, 0.0)]), &prices(100.0, 100.0))
            .unwrap();

        assert_eq!(p.balance(), 1e6);
        assert!(close(p.net_worth(), 1e6));
        assert!(close(p.quantity("A"), 5_000.0));
        assert!(close(p.quantity("B"), 5_000.0));
        assert!(close(p.exposure("A"), 0.5));
        assert!(p.cash().abs() < 1e-6);
        assert_eq!(p.last_profit(), p.net_worth() - 1e6);
    }

    #[test]
    fn test_fee_charged_on_notional_and_buys_scaled_to_cash() {
        let mut p = Portfolio::new(symbols(), 1_000.0, 0.01);
        p.make_trade(&alloc(&[("A", 1.0)]), &prices(10.0, 10.0)).unwrap();

        // 1000 / (10 * 1.01)
        assert!(close(p.quantity("A"), 1_000.0 / 10.1));
        assert!(p.cash() >= -1e-9);
        assert!(close(p.fees_paid(), 1_000.0 - 1_000.0 / 1.01));
        assert!(close(p.balance(), 1_000.0 - p.fees_paid()));
        assert_accounting(&p);
    }

    #[test]
    fn test_cash_reserve_respected() {
        let mut p = Portfolio::new(symbols(), 1_000.0, 0.0);
        p.make_trade(&alloc(&[("A", 1.0), (CASH_POSITION, 1.0)]), &prices(10.0, 10.0))
            .unwrap();

        assert!(close(p.quantity("A"), 50.0));
        assert!(close(p.cash(), 500.0));
        assert!(close(p.exposure(CASH_POSITION), 0.5));
    }

    #[test]
    fn test_sell_realizes_pnl_against_avg_cost() {
        let mut p = Portfolio::new(symbols(), 1_000.0, 0.0);
        p.make_trade(&alloc(&[("A", 1.0)]), &prices(10.0, 10.0)).unwrap();
        assert_eq!(p.balance(), 1_000.0);

        // Price doubles: unrealized only
        p.make_trade(&alloc(&[("A", 1.0)]), &prices(20.0, 10.0)).unwrap();
        assert_eq!(p.balance(), 1_000.0);
        assert!(close(p.net_worth(), 2_000.0));

        // Liquidate: gain becomes realized
        p.make_trade(&alloc(&[]), &prices(20.0, 10.0)).unwrap();
        assert_eq!(p.quantity("A"), 0.0);
        assert!(close(p.balance(), 2_000.0));
        assert!(close(p.net_worth(), 2_000.0));
        assert_eq!(p.exposure(CASH_POSITION), 1.0);
    }

    #[test]
    fn test_short_position_profits_when_price_falls() {
        let mut p = Portfolio::new(symbols(), 1_000.0, 0.0);
        p.make_trade(&alloc(&[("A", -1.0)]), &prices(10.0, 10.0)).unwrap();
        assert!(close(p.quantity("A"), -100.0));
        assert!(close(p.net_worth(), 1_000.0));

        p.make_trade(&alloc(&[("A", -1.0)]), &prices(5.0, 10.0)).unwrap();
        assert!(p.net_worth() > 1_000.0);
        assert_accounting(&p);
    }

    #[test]
    fn test_accounting_identity_over_random_walk() {
        let mut p = Portfolio::new(symbols(), 10_000.0, 0.003);
        let path = [
            (10.0, 20.0, [("A", 0.7), ("B", 0.3)]),
            (11.0, 18.0, [("A", 0.2), ("B", -0.5)]),
            (9.0, 19.0, [("A", -0.4), ("B", 0.1)]),
            (12.0, 25.0, [("A", 0.5), ("B", 0.5)]),
        ];

        for (a, b, weights) in path {
            p.make_trade(&alloc(&weights), &prices(a, b)).unwrap();
            assert_accounting(&p);
        }
        assert_eq!(p.profits().len(), path.len() + 1);
        assert_eq!(p.net_worth_history().len(), path.len() + 1);
    }

    #[test]
    fn test_rejects_unknown_position_and_missing_price() {
        let mut p = Portfolio::new(symbols(), 1_000.0, 0.0);
        assert!(p.make_trade(&alloc(&[("C", 1.0)]), &prices(1.0, 1.0)).is_err());
        assert!(p.make_trade(&alloc(&[("A", 1.0)]), &alloc(&[("A", 1.0)])).is_err());
        assert!(p
            .make_trade(&alloc(&[("A", f64::NAN)]), &prices(1.0, 1.0))
            .is_err());
        // nothing was recorded
        assert_eq!(p.profits().len(), 1);
    }

    #[test]
    fn test_reset_clears_positions() {
        let mut p = Portfolio::new(symbols(), 1_000.0, 0.01);
        p.make_trade(&alloc(&[("A", 1.0)]), &prices(10.0, 10.0)).unwrap();
        p.reset();
        assert_eq!(p.quantity("A"), 0.0);
        assert_eq!(p.balance(), 1_000.0);
        assert_eq!(p.fees_paid(), 0.0);
        assert_eq!(p.profits(), &[0.0]);
    }
}
