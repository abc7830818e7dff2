//! Injectable jitter for the daily forecaster.
//!
//! Daily predictions are scaled by a random factor in
//! `[JITTER_MIN, JITTER_MAX]`. Production callers seed from the wall clock
//! so runs vary; tests pin a seed (or disable jitter) to assert exact
//! values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lower bound of the jitter factor.
pub const JITTER_MIN: f64 = 0.8;

/// Upper bound of the jitter factor.
pub const JITTER_MAX: f64 = 1.2;

/// A source of multiplicative noise for daily predictions.
pub trait JitterSource {
    /// Returns the next factor.
    fn factor(&mut self) -> f64;
}

/// Uniform jitter in `[JITTER_MIN, JITTER_MAX]` from a seedable generator.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    /// Creates a reproducible jitter source.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a jitter source seeded from the current wall-clock time.
    #[must_use]
    pub fn from_clock() -> Self {
        let now = chrono::Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros());
        #[allow(clippy::cast_sign_loss)]
        Self::from_seed(nanos as u64)
    }
}

impl JitterSource for SeededJitter {
    fn factor(&mut self) -> f64 {
        self.rng.gen_range(JITTER_MIN..=JITTER_MAX)
    }
}

/// A fixed factor on every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantJitter(pub f64);

impl ConstantJitter {
    /// No jitter at all.
    pub const NONE: Self = Self(1.0);
}

impl JitterSource for ConstantJitter {
    fn factor(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_jitter_is_reproducible() {
        let mut a = SeededJitter::from_seed(42);
        let mut b = SeededJitter::from_seed(42);
        for _ in 0..50 {
            assert_eq!(a.factor().to_bits(), b.factor().to_bits());
        }
    }

    #[test]
    fn seeded_jitter_stays_in_range() {
        let mut jitter = SeededJitter::from_seed(7);
        for _ in 0..1_000 {
            let f = jitter.factor();
            assert!((JITTER_MIN..=JITTER_MAX).contains(&f), "{f} out of range");
        }
    }

    #[test]
    fn constant_jitter_is_constant() {
        let mut jitter = ConstantJitter::NONE;
        assert!((jitter.factor() - 1.0).abs() < f64::EPSILON);
    }
}
