//! Synthetic feature tables for smoke runs and tests.

use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{AssetSeries, Bar, MarketData};
use crate::error::{GymError, Result};

/// Per-bar half-range of the random return
pub const DEFAULT_VOLATILITY: f64 = 0.02;

/// First bar timestamp (2020-01-01T00:00:00Z)
const START_TS: i64 = 1_577_836_800;

/// Generate a seeded daily random walk for each symbol.
///
/// The same `(symbols, rows, seed)` always yields the same table.
pub fn generate_sample_data<S: AsRef<str>>(symbols: &[S], rows: usize, seed: u64) -> Result<MarketData> {
    generate_sample_data_with(symbols, rows, seed, DEFAULT_VOLATILITY)
}

/// Like `generate_sample_data` with an explicit volatility
pub fn generate_sample_data_with<S: AsRef<str>>(
    symbols: &[S],
    rows: usize,
    seed: u64,
    volatility: f64,
) -> Result<MarketData> {
    if !(volatility > 0.0 && volatility < 1.0) {
        return Err(GymError::Validation(format!(
            "volatility must be in (0, 1): {}",
            volatility
        )));
    }

    let start = Utc
        .timestamp_opt(START_TS, 0)
        .single()
        .ok_or_else(|| GymError::Validation("invalid start timestamp".to_string()))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assets = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let mut price = rng.gen_range(20.0..200.0);
        let mut bars = Vec::with_capacity(rows);

        for i in 0..rows {
            bars.push(Bar {
                time: start + Duration::days(i as i64),
                close: price,
                volume: rng.gen_range(100_000.0..1_000_000.0_f64).round(),
            });

            // Random walk with slight upward drift
            let change = rng.gen_range(-volatility..volatility) + 0.0005;
            price = (price * (1.0 + change)).max(0.01);
        }

        assets.push(AssetSeries::from_bars(symbol.as_ref(), &bars));
    }

    MarketData::new(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data_generation() {
        let data = generate_sample_data(&["AAA", "BBB"], 50, 7).unwrap();
        assert_eq!(data.n_assets(), 2);
        assert_eq!(data.n_rows(), 50);

        for asset in data.assets() {
            assert!(asset.rows.iter().all(|r| r.close > 0.0));
            assert_eq!(asset.rows[0].diff, 0.0);
        }
    }

    #[test]
    fn test_sample_data_is_deterministic() {
        let a = generate_sample_data(&["AAA"], 20, 42).unwrap();
        let b = generate_sample_data(&["AAA"], 20, 42).unwrap();
        let c = generate_sample_data(&["AAA"], 20, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sample_data_rejects_bad_input() {
        assert!(generate_sample_data(&["AAA"], 1, 0).is_err());
        assert!(generate_sample_data::<&str>(&[], 10, 0).is_err());
        assert!(generate_sample_data_with(&["AAA"], 10, 0, 0.0).is_err());
    }
}
