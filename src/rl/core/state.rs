//! State Representation
//!
//! Builds the numeric observation handed to the agent at each step.
//!
//! # Layouts
//!
//! - Raw: one row per asset holding the 7 market features.
//! - Static / MaxScale: one row per asset holding the 7 normalized features,
//!   the asset's exposure and its price-per-share signal, then a meta row
//!   `[profit, invested, net_worth, liquid, pps_global, 0, 0, 0, 0]`.
//!
//! No encoder reads rows past the cursor. The only forward read is the
//! max-scale seed scan, which runs once per reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::domain::{AssetSeries, MarketData, FEATURE_COUNT};
use crate::error::{GymError, Result};
use crate::ledger::{Ledger, CASH_POSITION};
use crate::rl::config::NormalizationMethod;
use crate::validation;

/// Columns per asset row in the expanded layouts
pub const EXPANDED_COLUMNS: usize = FEATURE_COUNT + 2;

/// Dense row-major observation matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Observation {
    /// Zero-filled matrix of the given shape
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    fn row_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// True when every entry is finite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Static normalization parameters for one asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormParams {
    pub shift: [f64; FEATURE_COUNT],
    pub scale: [f64; FEATURE_COUNT],
}

impl NormParams {
    /// Defaults derived from a whole series: shift by row 0, scale by the
    /// sample std of each feature. Constant features get a scale of 1.
    pub fn from_series(series: &AssetSeries) -> Self {
        let shift = series.row(0).map(|r| r.features()).unwrap_or([0.0; FEATURE_COUNT]);
        let mut scale = series.feature_std();
        for s in scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Self { shift, scale }
    }

    pub fn validate(&self, symbol: &str) -> Result<()> {
        if self.shift.iter().any(|v| !v.is_finite()) {
            return Err(GymError::InvalidNorms(format!(
                "{}: shift contains non-finite values",
                symbol
            )));
        }
        if self.scale.iter().any(|v| !v.is_finite() || *v == 0.0) {
            return Err(GymError::InvalidNorms(format!(
                "{}: scale must be finite and non-zero",
                symbol
            )));
        }
        Ok(())
    }

    pub fn apply(&self, raw: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for k in 0..FEATURE_COUNT {
            out[k] = (raw[k] - self.shift[k]) / self.scale[k];
        }
        out
    }
}

/// Static parameters keyed by asset symbol
pub type StaticNorms = HashMap<String, NormParams>;

/// Per-asset running feature maxima for max-scale normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningMax {
    scales: HashMap<String, [f64; FEATURE_COUNT]>,
}

impl RunningMax {
    /// Seed from row 0 of every asset.
    ///
    /// Zero components are filled from the first later row where they are
    /// non-zero. The scan stops as soon as no zero remains; components that
    /// stay zero through the whole table are seeded with 1.
    pub fn seed(data: &MarketData) -> Self {
        let scales = data
            .assets()
            .iter()
            .map(|asset| (asset.symbol.clone(), Self::seed_series(asset)))
            .collect();
        Self { scales }
    }

    fn seed_series(series: &AssetSeries) -> [f64; FEATURE_COUNT] {
        let mut rows = series.rows.iter().map(|r| r.features());
        let mut scale = rows.next().unwrap_or([0.0; FEATURE_COUNT]);

        while scale.contains(&0.0) {
            let Some(next) = rows.next() else { break };
            for (s, v) in scale.iter_mut().zip(next) {
                if *s == 0.0 {
                    *s = v;
                }
            }
        }

        for s in scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        scale
    }

    pub fn get(&self, symbol: &str) -> Option<&[f64; FEATURE_COUNT]> {
        self.scales.get(symbol)
    }

    /// Raise each component to the elementwise max with `raw`.
    ///
    /// A component never becomes zero: a non-positive max that would land on
    /// exactly 0 keeps its previous value.
    pub fn update(&mut self, symbol: &str, raw: &[f64; FEATURE_COUNT]) {
        if let Some(scale) = self.scales.get_mut(symbol) {
            for (s, v) in scale.iter_mut().zip(raw) {
                let next = s.max(*v);
                if next != 0.0 {
                    *s = next;
                }
            }
        }
    }
}

/// Price-per-share signal.
///
/// `ln((net_worth - balance) * portion / shares)` when at least one share is
/// held; 0 otherwise or when the argument is 0. Negative arguments map to the
/// signed log `-ln(-x)`.
pub fn price_per_share(net_worth: f64, balance: f64, shares: f64, portion: f64) -> f64 {
    if shares < 1.0 {
        return 0.0;
    }
    let x = (net_worth - balance) * portion / shares;
    if x == 0.0 {
        0.0
    } else if x > 0.0 {
        x.ln()
    } else {
        -(-x).ln()
    }
}

/// Per-asset agent holdings captured for encoding
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssetHolding {
    pub quantity: f64,
    pub exposure: f64,
}

/// Agent portfolio state needed by the expanded layouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSnapshot {
    pub balance_init: f64,
    pub balance: f64,
    /// Last entry of the agent net-worth trajectory
    pub net_worth: f64,
    pub total_quantity: f64,
    pub cash_exposure: f64,
    pub holdings: HashMap<String, AssetHolding>,
}

impl PortfolioSnapshot {
    /// Capture the agent ledger; `net_worth` is the trajectory tail
    pub fn capture<L: Ledger>(
        ledger: &L,
        symbols: &[String],
        net_worth: f64,
        balance_init: f64,
    ) -> Self {
        let holdings = symbols
            .iter()
            .map(|s| {
                (
                    s.clone(),
                    AssetHolding {
                        quantity: ledger.quantity(s),
                        exposure: ledger.exposure(s),
                    },
                )
            })
            .collect();

        Self {
            balance_init,
            balance: ledger.balance(),
            net_worth,
            total_quantity: ledger.total_quantity(),
            cash_exposure: ledger.exposure(CASH_POSITION),
            holdings,
        }
    }

    fn holding(&self, symbol: &str) -> AssetHolding {
        self.holdings.get(symbol).copied().unwrap_or_default()
    }

    /// `[profit, invested, net_worth, liquid, pps_global, 0, 0, 0, 0]`
    pub fn meta_row(&self) -> [f64; EXPANDED_COLUMNS] {
        let init = self.balance_init;
        let mut meta = [0.0; EXPANDED_COLUMNS];
        meta[0] = (self.net_worth - init) / init;
        meta[1] = (self.net_worth - self.balance) / init;
        meta[2] = self.net_worth / init;
        meta[3] = self.balance / init;
        meta[4] = price_per_share(self.net_worth, self.balance, self.total_quantity, 1.0);
        meta
    }

    /// Exposure and price-per-share columns appended to an asset row
    fn asset_columns(&self, symbol: &str) -> [f64; 2] {
        let h = self.holding(symbol);
        [
            h.exposure,
            price_per_share(self.net_worth, self.balance, h.quantity, h.exposure),
        ]
    }
}

/// Trait for encoding market and portfolio state into observations
pub trait StateEncoder {
    /// Build the observation for row `step`.
    ///
    /// `running` is the running max-scale state; encoders that do not use it
    /// leave it untouched.
    fn encode(
        &self,
        data: &MarketData,
        step: usize,
        portfolio: &PortfolioSnapshot,
        running: &mut RunningMax,
    ) -> Result<Observation>;

    /// Observation shape for `n_assets` assets
    fn shape(&self, n_assets: usize) -> (usize, usize);
}

fn features_at(series: &AssetSeries, step: usize) -> Result<[f64; FEATURE_COUNT]> {
    series.row(step).map(|r| r.features()).ok_or_else(|| {
        GymError::Validation(format!(
            "step {} is past the end of {} ({} rows)",
            step,
            series.symbol,
            series.len()
        ))
    })
}

fn expanded_row(
    obs: &mut Observation,
    index: usize,
    features: &[f64; FEATURE_COUNT],
    extra: [f64; 2],
) {
    let row = obs.row_mut(index);
    row[..FEATURE_COUNT].copy_from_slice(features);
    row[FEATURE_COUNT..].copy_from_slice(&extra);
}

/// Raw features only
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl StateEncoder for RawEncoder {
    fn encode(
        &self,
        data: &MarketData,
        step: usize,
        _portfolio: &PortfolioSnapshot,
        _running: &mut RunningMax,
    ) -> Result<Observation> {
        let (rows, cols) = self.shape(data.n_assets());
        let mut obs = Observation::zeros(rows, cols);
        for (i, asset) in data.assets().iter().enumerate() {
            obs.row_mut(i).copy_from_slice(&features_at(asset, step)?);
        }
        Ok(obs)
    }

    fn shape(&self, n_assets: usize) -> (usize, usize) {
        (n_assets, FEATURE_COUNT)
    }
}

/// Frozen `(raw - shift) / scale` plus portfolio state
#[derive(Debug, Clone)]
pub struct StaticEncoder {
    norms: StaticNorms,
}

impl StaticEncoder {
    /// Use supplied parameters, which must cover exactly the asset set.
    /// Keys match symbols ignoring ASCII case.
    pub fn with_norms(data: &MarketData, norms: StaticNorms) -> Result<Self> {
        let symbols: Vec<String> = data.symbols().map(str::to_string).collect();
        let norms = validation::align_keys("norms", norms, &symbols)?;
        validation::validate_coverage("norms", &norms, &symbols)?;
        for (symbol, params) in &norms {
            params.validate(symbol)?;
        }
        Ok(Self { norms })
    }

    /// Derive default parameters from the full table
    pub fn from_data(data: &MarketData) -> Self {
        let norms = data
            .assets()
            .iter()
            .map(|a| (a.symbol.clone(), NormParams::from_series(a)))
            .collect();
        Self { norms }
    }

    pub fn norms(&self) -> &StaticNorms {
        &self.norms
    }
}

impl StateEncoder for StaticEncoder {
    fn encode(
        &self,
        data: &MarketData,
        step: usize,
        portfolio: &PortfolioSnapshot,
        _running: &mut RunningMax,
    ) -> Result<Observation> {
        let (rows, cols) = self.shape(data.n_assets());
        let mut obs = Observation::zeros(rows, cols);

        for (i, asset) in data.assets().iter().enumerate() {
            let raw = features_at(asset, step)?;
            let params = self.norms.get(&asset.symbol).ok_or_else(|| {
                GymError::InvalidNorms(format!("no parameters for {}", asset.symbol))
            })?;
            expanded_row(
                &mut obs,
                i,
                &params.apply(&raw),
                portfolio.asset_columns(&asset.symbol),
            );
        }

        obs.row_mut(rows - 1).copy_from_slice(&portfolio.meta_row());
        Ok(obs)
    }

    fn shape(&self, n_assets: usize) -> (usize, usize) {
        (n_assets + 1, EXPANDED_COLUMNS)
    }
}

/// `raw / running_max` plus portfolio state
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxScaleEncoder;

impl StateEncoder for MaxScaleEncoder {
    fn encode(
        &self,
        data: &MarketData,
        step: usize,
        portfolio: &PortfolioSnapshot,
        running: &mut RunningMax,
    ) -> Result<Observation> {
        let (rows, cols) = self.shape(data.n_assets());
        let mut obs = Observation::zeros(rows, cols);

        for (i, asset) in data.assets().iter().enumerate() {
            let raw = features_at(asset, step)?;
            let scale = running.get(&asset.symbol).copied().ok_or_else(|| {
                GymError::Validation(format!("running max not seeded for {}", asset.symbol))
            })?;

            let mut scaled = [0.0; FEATURE_COUNT];
            for k in 0..FEATURE_COUNT {
                scaled[k] = raw[k] / scale[k];
            }
            expanded_row(&mut obs, i, &scaled, portfolio.asset_columns(&asset.symbol));

            running.update(&asset.symbol, &raw);
        }

        obs.row_mut(rows - 1).copy_from_slice(&portfolio.meta_row());
        Ok(obs)
    }

    fn shape(&self, n_assets: usize) -> (usize, usize) {
        (n_assets + 1, EXPANDED_COLUMNS)
    }
}

/// Normalization strategy chosen at construction
#[derive(Debug, Clone)]
pub enum ObservationNormalizer {
    Raw(RawEncoder),
    Static(StaticEncoder),
    MaxScale(MaxScaleEncoder),
}

impl ObservationNormalizer {
    /// Build the strategy for `method`.
    ///
    /// Supplied norms are only meaningful for `Static`; elsewhere they are
    /// ignored with a warning.
    pub fn new(
        method: NormalizationMethod,
        norms: Option<StaticNorms>,
        data: &MarketData,
    ) -> Result<Self> {
        if norms.is_some() && method != NormalizationMethod::Static {
            warn!(?method, "Static norms supplied but unused by this normalization");
        }

        Ok(match method {
            NormalizationMethod::None => ObservationNormalizer::Raw(RawEncoder),
            NormalizationMethod::Static => match norms {
                Some(norms) => ObservationNormalizer::Static(StaticEncoder::with_norms(data, norms)?),
                None => ObservationNormalizer::Static(StaticEncoder::from_data(data)),
            },
            NormalizationMethod::MaxScale => ObservationNormalizer::MaxScale(MaxScaleEncoder),
        })
    }

    pub fn method(&self) -> NormalizationMethod {
        match self {
            ObservationNormalizer::Raw(_) => NormalizationMethod::None,
            ObservationNormalizer::Static(_) => NormalizationMethod::Static,
            ObservationNormalizer::MaxScale(_) => NormalizationMethod::MaxScale,
        }
    }
}

impl StateEncoder for ObservationNormalizer {
    fn encode(
        &self,
        data: &MarketData,
        step: usize,
        portfolio: &PortfolioSnapshot,
        running: &mut RunningMax,
    ) -> Result<Observation> {
        match self {
            ObservationNormalizer::Raw(e) => e.encode(data, step, portfolio, running),
            ObservationNormalizer::Static(e) => e.encode(data, step, portfolio, running),
            ObservationNormalizer::MaxScale(e) => e.encode(data, step, portfolio, running),
        }
    }

    fn shape(&self, n_assets: usize) -> (usize, usize) {
        match self {
            ObservationNormalizer::Raw(e) => e.shape(n_assets),
            ObservationNormalizer::Static(e) => e.shape(n_assets),
            ObservationNormalizer::MaxScale(e) => e.shape(n_assets),
        }
    }
}
