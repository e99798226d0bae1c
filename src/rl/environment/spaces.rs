//! Box-shaped action and observation spaces.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned box of `f64` values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    /// Lower bound per element (flattened, row-major)
    pub low: Vec<f64>,
    /// Upper bound per element (flattened, row-major)
    pub high: Vec<f64>,
    pub shape: Vec<usize>,
}

impl BoxSpace {
    /// Bounded box with explicit per-element limits
    pub fn new(low: Vec<f64>, high: Vec<f64>, shape: Vec<usize>) -> Self {
        Self { low, high, shape }
    }

    /// Box of the given shape with no bounds
    pub fn unbounded(shape: Vec<usize>) -> Self {
        let n = shape.iter().product();
        Self {
            low: vec![f64::NEG_INFINITY; n],
            high: vec![f64::INFINITY; n],
            shape,
        }
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.low.len()
    }

    /// True when `values` has the right size and lies within the bounds
    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.size()
            && values
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    /// Uniform sample; unbounded dimensions are sampled from [-1, 1]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(lo, hi)| {
                let lo = if lo.is_finite() { *lo } else { -1.0 };
                let hi = if hi.is_finite() { *hi } else { 1.0 };
                if lo < hi {
                    rng.gen_range(lo..=hi)
                } else {
                    lo
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_contains() {
        let space = BoxSpace::new(vec![-1.0, 0.0], vec![1.0, 1.0], vec![2]);
        assert!(space.contains(&[-1.0, 0.5]));
        assert!(!space.contains(&[0.0, -0.1]));
        assert!(!space.contains(&[0.0]));
    }

    #[test]
    fn test_sample_within_bounds() {
        let space = BoxSpace::new(vec![-1.0, -1.0, 0.0], vec![1.0; 3], vec![3]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(space.contains(&space.sample(&mut rng)));
        }
    }

    #[test]
    fn test_unbounded() {
        let space = BoxSpace::unbounded(vec![3, 9]);
        assert_eq!(space.size(), 27);
        assert!(space.contains(&vec![1e300; 27]));
    }
}
