//! Random variates used for traffic inter-arrival times.
//!
//! A variate is a closed set of distributions. Stochastic variants draw from
//! the simulation's seeded RNG so runs are reproducible. `Sequence` cycles
//! through a fixed list; its cursor lives inside the variate, so every owner
//! of the same `Arc<RandomVariate>` advances the same cursor.

use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RandomVariate {
    /// Uniform over `[min, max)`.
    Uniform { min: f64, max: f64 },
    /// Exponential with the given mean.
    Exponential { mean: f64 },
    /// Deterministic: cycles through `values` in order.
    Sequence {
        values: Vec<f64>,
        #[serde(skip)]
        cursor: AtomicUsize,
    },
    /// Always returns `value`.
    Delta { value: f64 },
}

impl RandomVariate {
    pub fn uniform(min: f64, max: f64) -> Self {
        RandomVariate::Uniform { min, max }
    }

    pub fn exponential(mean: f64) -> Self {
        RandomVariate::Exponential { mean }
    }

    pub fn sequence(values: Vec<f64>) -> Self {
        RandomVariate::Sequence { values, cursor: AtomicUsize::new(0) }
    }

    pub fn delta(value: f64) -> Self {
        RandomVariate::Delta { value }
    }

    /// Draw the next value.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            RandomVariate::Uniform { min, max } => {
                if max <= min {
                    *min
                } else {
                    rng.gen_range(*min..*max)
                }
            }
            RandomVariate::Exponential { mean } => match Exp::new(1.0 / mean) {
                Ok(exp) => exp.sample(rng),
                Err(_) => *mean,
            },
            RandomVariate::Sequence { values, cursor } => {
                if values.is_empty() {
                    return 0.0;
                }
                let index = cursor.fetch_add(1, Ordering::Relaxed) % values.len();
                values[index]
            }
            RandomVariate::Delta { value } => *value,
        }
    }

    /// Rewind a `Sequence` to its first value. No-op for other variants.
    pub fn rewind(&self) {
        if let RandomVariate::Sequence { cursor, .. } = self {
            cursor.store(0, Ordering::Relaxed);
        }
    }

    /// Check that the parameters describe a usable distribution.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RandomVariate::Uniform { min, max } if !min.is_finite() || !max.is_finite() || min < &0.0 || max < min => {
                Err(format!("uniform variate needs 0 <= min <= max, got [{}, {})", min, max))
            }
            RandomVariate::Exponential { mean } if !(mean.is_finite() && *mean > 0.0) => {
                Err(format!("exponential variate needs a positive mean, got {}", mean))
            }
            RandomVariate::Sequence { values, .. } if values.is_empty() => Err("sequence variate has no values".to_string()),
            RandomVariate::Sequence { values, .. } if values.iter().any(|v| !v.is_finite() || *v < 0.0) => {
                Err("sequence variate values must be non-negative".to_string())
            }
            RandomVariate::Delta { value } if !value.is_finite() || *value < 0.0 => {
                Err(format!("delta variate needs a non-negative value, got {}", value))
            }
            _ => Ok(()),
        }
    }
}
