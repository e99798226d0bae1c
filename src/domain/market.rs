use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::indicators;
use crate::error::Result;
use crate::validation;

/// Number of numeric features carried by every row
pub const FEATURE_COUNT: usize = 7;

/// Feature names in observation order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "close",
    "volume",
    "ma_30",
    "ma_5",
    "volatility",
    "diff",
    "diff_ma_5",
];

/// Per-asset prices keyed by symbol
pub type Prices = HashMap<String, f64>;

/// One row of the feature table for a single asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub time: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
    pub ma_30: f64,
    pub ma_5: f64,
    #[serde(alias = "volatil")]
    pub volatility: f64,
    pub diff: f64,
    pub diff_ma_5: f64,
}

impl FeatureRow {
    /// Numeric features in `FEATURE_NAMES` order (time excluded)
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.close,
            self.volume,
            self.ma_30,
            self.ma_5,
            self.volatility,
            self.diff,
            self.diff_ma_5,
        ]
    }
}

/// Raw bar used to derive a feature row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
}

/// Feature rows for one tradable asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
}

impl AssetSeries {
    pub fn new(symbol: impl Into<String>, rows: Vec<FeatureRow>) -> Self {
        Self {
            symbol: symbol.into(),
            rows,
        }
    }

    /// Build a series from raw bars, deriving the technical indicators.
    ///
    /// Windows are trailing and shrink at the start of the series, so row 0
    /// only depends on bar 0.
    pub fn from_bars(symbol: impl Into<String>, bars: &[Bar]) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let diffs = indicators::diffs(&closes);

        let rows = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| FeatureRow {
                time: bar.time,
                close: bar.close,
                volume: bar.volume,
                ma_30: indicators::trailing_mean(&closes, i, 30),
                ma_5: indicators::trailing_mean(&closes, i, 5),
                volatility: indicators::trailing_std(&closes, i, 30),
                diff: diffs[i],
                diff_ma_5: indicators::trailing_mean(&diffs, i, 5),
            })
            .collect();

        Self::new(symbol, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, step: usize) -> Option<&FeatureRow> {
        self.rows.get(step)
    }

    /// Sample standard deviation (ddof = 1) of each feature over the whole series
    pub fn feature_std(&self) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (k, slot) in out.iter_mut().enumerate() {
            let column: Vec<f64> = self.rows.iter().map(|r| r.features()[k]).collect();
            *slot = indicators::sample_std(&column);
        }
        out
    }
}

#[derive(Deserialize)]
struct MarketDataFile {
    assets: Vec<AssetSeries>,
}

/// Aligned feature tables for every asset in the universe.
///
/// Construction validates the tables, so a `MarketData` value is always
/// well-formed: at least one asset, equal lengths, at least three rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketData {
    assets: Vec<AssetSeries>,
}

impl MarketData {
    /// Validate and wrap per-asset tables. Asset order is preserved and
    /// defines the position ordering of the environment.
    pub fn new(assets: Vec<AssetSeries>) -> Result<Self> {
        validation::validate_market_data(&assets)?;
        Ok(Self { assets })
    }

    /// Parse a JSON document of the form `{"assets": [{"symbol", "rows"}]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let file: MarketDataFile = serde_json::from_str(json)?;
        Self::new(file.assets)
    }

    /// Load a JSON feature table from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn assets(&self) -> &[AssetSeries] {
        &self.assets
    }

    pub fn asset(&self, symbol: &str) -> Option<&AssetSeries> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.symbol.as_str())
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Shared row count of every asset table
    pub fn n_rows(&self) -> usize {
        self.assets.first().map(AssetSeries::len).unwrap_or(0)
    }

    /// Close prices of every asset at `step`
    pub fn prices_at(&self, step: usize) -> Prices {
        self.assets
            .iter()
            .filter_map(|a| a.row(step).map(|r| (a.symbol.clone(), r.close)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar {
                time: Utc.timestamp_opt(1_600_000_000 + i as i64 * 86_400, 0).unwrap(),
                close: *c,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn test_from_bars_indicators() {
        let series = AssetSeries::from_bars("AAA", &bars(&[10.0, 12.0, 11.0]));
        assert_eq!(series.len(), 3);

        let first = series.row(0).unwrap();
        assert_eq!(first.diff, 0.0);
        assert_eq!(first.ma_5, 10.0);
        assert_eq!(first.volatility, 0.0);

        let last = series.row(2).unwrap();
        assert_eq!(last.diff, -1.0);
        assert!((last.ma_5 - 11.0).abs() < 1e-12);
        assert!((last.diff_ma_5 - (0.0 + 2.0 - 1.0) / 3.0).abs() < 1e-12);
        assert!((last.volatility - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_std_is_sample_std() {
        let series = AssetSeries::from_bars("AAA", &bars(&[1.0, 2.0, 3.0, 4.0]));
        let std = series.feature_std();
        // sample std of 1..=4
        assert!((std[0] - 1.290_994_448_735_805_6).abs() < 1e-12);
        // constant volume column
        assert_eq!(std[1], 0.0);
    }

    #[test]
    fn test_market_data_json_roundtrip_keeps_order() {
        let data = MarketData::new(vec![
            AssetSeries::from_bars("ZZZ", &bars(&[1.0, 2.0, 3.0])),
            AssetSeries::from_bars("AAA", &bars(&[3.0, 4.0, 5.0])),
        ])
        .unwrap();

        let parsed = MarketData::from_json(&data.to_json_pretty().unwrap()).unwrap();
        let symbols: Vec<&str> = parsed.symbols().collect();
        assert_eq!(symbols, vec!["ZZZ", "AAA"]);
        assert_eq!(parsed.prices_at(1).get("AAA"), Some(&4.0));
    }

    #[test]
    fn test_json_missing_column_rejected() {
        let json = r#"{"assets":[{"symbol":"A","rows":[{"time":"2020-01-01T00:00:00Z","close":1.0}]}]}"#;
        assert!(MarketData::from_json(json).is_err());
    }

    #[test]
    fn test_volatil_alias_accepted() {
        let row = r#"{"time":"2020-01-01T00:00:00Z","close":1.0,"volume":2.0,"ma_30":1.0,
            "ma_5":1.0,"volatil":0.5,"diff":0.0,"diff_ma_5":0.0}"#;
        let parsed: FeatureRow = serde_json::from_str(row).unwrap();
        assert_eq!(parsed.volatility, 0.5);
    }
}
