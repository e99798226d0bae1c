//! Trailing-window statistics used to derive feature rows from raw bars.

/// Close-to-close change; 0 for the first element
pub fn diffs(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            out.push(0.0);
        } else {
            out.push(v - values[i - 1]);
        }
    }
    out
}

fn window(values: &[f64], end: usize, len: usize) -> &[f64] {
    let start = (end + 1).saturating_sub(len);
    &values[start..=end]
}

/// Mean of the `len` values ending at `end`, fewer at the start of the series
pub fn trailing_mean(values: &[f64], end: usize, len: usize) -> f64 {
    let w = window(values, end, len);
    w.iter().sum::<f64>() / w.len() as f64
}

/// Sample std of the `len` values ending at `end`; 0 while fewer than two values exist
pub fn trailing_std(values: &[f64], end: usize, len: usize) -> f64 {
    sample_std(window(values, end, len))
}

/// Sample standard deviation (ddof = 1)
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_mean_shrinks_at_start() {
        let v = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(trailing_mean(&v, 0, 3), 2.0);
        assert_eq!(trailing_mean(&v, 1, 3), 3.0);
        assert_eq!(trailing_mean(&v, 3, 3), 6.0);
    }

    #[test]
    fn test_sample_std_short_input() {
        assert_eq!(sample_std(&[]), 0.0);
        assert_eq!(sample_std(&[5.0]), 0.0);
        assert!((sample_std(&[1.0, 3.0]) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_diffs() {
        assert_eq!(diffs(&[1.0, 4.0, 2.0]), vec![0.0, 3.0, -2.0]);
    }
}
