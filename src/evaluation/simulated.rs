//! Simulated metrics for library models
//!
//! Library entries have no artefact to run, so their metrics are drawn from a
//! fixed distribution of plausible values:
//!
//! | metric     | distribution                                   |
//! |------------|------------------------------------------------|
//! | accuracy   | U(0.80, 0.98)                                  |
//! | precision  | accuracy + U(-0.03, 0.03), clamped to [0, 1]   |
//! | recall     | accuracy + U(-0.03, 0.03), clamped to [0, 1]   |
//! | f1         | harmonic mean of precision and recall          |
//! | latency    | U(5, 120) ms                                   |
//! | throughput | 1000 / latency * U(8, 32) samples/s (batched)  |
//! | memory     | U(128, 4096) MB                                |
//! | model size | U(5, 1500) MB                                  |
//! | folds      | 5 folds, accuracy and f1 within ±0.02          |

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::evaluation::{FoldResult, Metrics};

pub const FOLDS: usize = 5;

pub struct SimulatedEvaluator {
    rng: Mutex<StdRng>,
}

impl SimulatedEvaluator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic draws, for tests and reproducible demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn sample(&self) -> (Metrics, Vec<FoldResult>) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let accuracy: f64 = rng.gen_range(0.80..0.98);
        let precision = (accuracy + rng.gen_range(-0.03..0.03)).clamp(0.0, 1.0);
        let recall = (accuracy + rng.gen_range(-0.03..0.03)).clamp(0.0, 1.0);
        let f1 = harmonic_mean(precision, recall);
        let latency_ms: f64 = rng.gen_range(5.0..120.0);
        let throughput = 1000.0 / latency_ms * rng.gen_range(8.0..32.0);

        let metrics = Metrics {
            accuracy,
            precision,
            recall,
            f1,
            latency_ms,
            throughput,
            memory_mb: rng.gen_range(128.0..4096.0),
            model_size_mb: rng.gen_range(5.0..1500.0),
        };

        let folds = (1..=FOLDS)
            .map(|fold| FoldResult {
                fold,
                accuracy: (accuracy + rng.gen_range(-0.02..0.02)).clamp(0.0, 1.0),
                f1: (f1 + rng.gen_range(-0.02..0.02)).clamp(0.0, 1.0),
            })
            .collect();

        (metrics, folds)
    }
}

impl Default for SimulatedEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        0.0
    } else {
        2.0 * a * b / (a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_stay_in_documented_ranges() {
        let sim = SimulatedEvaluator::seeded(7);
        for _ in 0..500 {
            let (m, folds) = sim.sample();
            assert!((0.80..0.98).contains(&m.accuracy));
            assert!((m.precision - m.accuracy).abs() <= 0.03 + 1e-9);
            assert!((m.recall - m.accuracy).abs() <= 0.03 + 1e-9);
            assert!(m.f1 >= m.precision.min(m.recall) - 1e-9);
            assert!(m.f1 <= m.precision.max(m.recall) + 1e-9);
            assert!((5.0..120.0).contains(&m.latency_ms));
            assert!(m.throughput > 0.0);
            assert!((128.0..4096.0).contains(&m.memory_mb));
            assert!((5.0..1500.0).contains(&m.model_size_mb));

            assert_eq!(folds.len(), FOLDS);
            for fold in &folds {
                assert!((fold.accuracy - m.accuracy).abs() <= 0.02 + 1e-9);
            }
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let a = SimulatedEvaluator::seeded(42).sample();
        let b = SimulatedEvaluator::seeded(42).sample();
        assert_eq!(a, b);
    }

    #[test]
    fn test_harmonic_mean() {
        assert_eq!(harmonic_mean(0.0, 0.0), 0.0);
        assert!((harmonic_mean(0.5, 1.0) - 2.0 / 3.0).abs() < 1e-12);
    }
}
