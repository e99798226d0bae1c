//! Structural validation for market data handed to the environment
//!
//! Feature tables arrive from files or from callers building them by hand.
//! Everything here runs once, before an environment is constructed, so the
//! step protocol never has to re-check alignment or price sanity:
//! - misaligned tables would silently pair rows from different instants
//! - a non-positive close would make target quantities undefined
//! - non-finite features would poison every normalized observation

use std::collections::{HashMap, HashSet};

use crate::domain::{AssetSeries, FeatureRow, FEATURE_NAMES};
use crate::error::{GymError, Result};
use crate::ledger::CASH_POSITION;

/// Minimum rows per asset: the seed row, the first observed row and one row to step into
pub const MIN_ROWS: usize = 3;

/// Validate an asset symbol
///
/// # Arguments
/// * `symbol` - Symbol to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err` if empty or clashing with the reserved cash position
pub fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(GymError::Validation(
            "Asset symbol cannot be empty".to_string(),
        ));
    }

    if symbol == CASH_POSITION {
        return Err(GymError::Validation(format!(
            "Asset symbol '{}' is reserved for the cash position",
            CASH_POSITION
        )));
    }

    Ok(())
}

/// Validate a single feature row
///
/// # Arguments
/// * `symbol` - Owning asset, for error messages
/// * `step` - Row index, for error messages
/// * `row` - Row to validate
pub fn validate_row(symbol: &str, step: usize, row: &FeatureRow) -> Result<()> {
    for (name, value) in FEATURE_NAMES.iter().zip(row.features()) {
        if !value.is_finite() {
            return Err(GymError::Validation(format!(
                "{}[{}].{} is not finite: {}",
                symbol, step, name, value
            )));
        }
    }

    if row.close <= 0.0 {
        return Err(GymError::Validation(format!(
            "{}[{}].close must be positive: {}",
            symbol, step, row.close
        )));
    }

    Ok(())
}

/// Validate the full per-asset table set
///
/// # Arguments
/// * `assets` - Feature tables in position order
///
/// # Returns
/// * `Ok(())` if every table is well-formed and all share one row index
/// * `Err(GymError::Validation)` describing the first problem found
pub fn validate_market_data(assets: &[AssetSeries]) -> Result<()> {
    if assets.is_empty() {
        return Err(GymError::Validation(
            "Market data must contain at least one asset".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for asset in assets {
        validate_symbol(&asset.symbol)?;
        if !seen.insert(asset.symbol.as_str()) {
            return Err(GymError::Validation(format!(
                "Duplicate asset symbol: {}",
                asset.symbol
            )));
        }
    }

    let expected = assets[0].len();
    if expected < MIN_ROWS {
        return Err(GymError::Validation(format!(
            "Feature tables need at least {} rows, {} has {}",
            MIN_ROWS, assets[0].symbol, expected
        )));
    }

    for asset in assets {
        if asset.len() != expected {
            return Err(GymError::Validation(format!(
                "Misaligned feature tables: {} has {} rows, {} has {}",
                assets[0].symbol,
                expected,
                asset.symbol,
                asset.len()
            )));
        }

        for (step, row) in asset.rows.iter().enumerate() {
            validate_row(&asset.symbol, step, row)?;
        }
    }

    Ok(())
}

/// Validate that a per-asset map covers exactly the given symbols
///
/// # Arguments
/// * `what` - Name of the map, for error messages
/// * `map` - Map keyed by symbol
/// * `symbols` - Expected symbol set
pub fn validate_coverage<V>(what: &str, map: &HashMap<String, V>, symbols: &[String]) -> Result<()> {
    let expected: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    let actual: HashSet<&str> = map.keys().map(String::as_str).collect();

    if expected != actual {
        let mut missing: Vec<&str> = expected.difference(&actual).copied().collect();
        let mut unknown: Vec<&str> = actual.difference(&expected).copied().collect();
        missing.sort_unstable();
        unknown.sort_unstable();
        return Err(GymError::InvalidNorms(format!(
            "{} must cover exactly the asset set (missing: {:?}, unknown: {:?})",
            what, missing, unknown
        )));
    }

    Ok(())
}

/// Rekey `map` onto `symbols`, matching keys case-insensitively.
///
/// Configuration layers lowercase table keys, so `[env.norms.AAA]` arrives
/// as `aaa`. Exact matches win; a key that matches several symbols only by
/// case, or two keys landing on the same symbol, is rejected.
pub fn align_keys<V>(
    what: &str,
    map: HashMap<String, V>,
    symbols: &[String],
) -> Result<HashMap<String, V>> {
    let mut aligned = HashMap::with_capacity(map.len());
    for (key, value) in map {
        let symbol = if symbols.contains(&key) {
            key
        } else {
            let mut candidates = symbols.iter().filter(|s| s.eq_ignore_ascii_case(&key));
            match (candidates.next(), candidates.next()) {
                (Some(symbol), None) => symbol.clone(),
                (Some(_), Some(_)) => {
                    return Err(GymError::InvalidNorms(format!(
                        "{} key {} matches several assets by case",
                        what, key
                    )))
                }
                (None, _) => key,
            }
        };
        if aligned.contains_key(&symbol) {
            return Err(GymError::InvalidNorms(format!(
                "{} given twice for {}",
                what, symbol
            )));
        }
        aligned.insert(symbol, value);
    }
    Ok(aligned)
}
