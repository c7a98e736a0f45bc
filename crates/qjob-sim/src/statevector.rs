//! Quantum state-vector sampler (`QVECTOR`).
//!
//! Produces a random real, non-negative, L2-normalised amplitude vector over
//! the computational basis. The entropy and fidelity figures are synthetic
//! and not derived from the vector.

use std::collections::BTreeMap;

use rand::Rng;
use qjob_types::{Parameters, ResultRecord, Value};

use crate::error::{SimError, SimResult};
use crate::MAX_DIMENSIONS;

pub const DEFAULT_DIMENSIONS: i64 = 8;

/// Sample a normalised state vector of `dimensions` entries (default 8).
pub fn run<R: Rng + ?Sized>(
    params: &Parameters,
    _shots: u32,
    rng: &mut R,
) -> SimResult<ResultRecord> {
    let dimensions = params.int_or("dimensions", DEFAULT_DIMENSIONS);
    if !(0..=MAX_DIMENSIONS).contains(&dimensions) {
        return Err(SimError::InvalidParameter {
            name: "dimensions",
            reason: format!("must be between 0 and {MAX_DIMENSIONS}, got {dimensions}"),
        });
    }
    let dimensions = dimensions as u64;
    let width = label_width(dimensions);

    let mut amplitudes: Vec<(String, f64)> = (0..dimensions)
        .map(|i| (format!("{i:0width$b}"), rng.r#gen::<f64>()))
        .collect();

    let norm = amplitudes.iter().map(|(_, a)| a * a).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, a) in &mut amplitudes {
            *a /= norm;
        }
    }

    let state_vector: BTreeMap<String, Value> = amplitudes
        .into_iter()
        .map(|(label, a)| (label, Value::Float(a)))
        .collect();

    let mut result = ResultRecord::new();
    result.insert("algorithm", "Quantum State Vector");
    result.insert("dimensions", dimensions);
    result.insert("state_vector", state_vector);
    result.insert("entanglement_entropy", rng.r#gen::<f64>());
    result.insert("state_fidelity", 0.95 + rng.r#gen::<f64>() * 0.05);
    Ok(result)
}

/// `ceil(log2(dimensions))`, the width of a basis-state label.
pub fn label_width(dimensions: u64) -> usize {
    if dimensions <= 1 {
        0
    } else {
        (64 - (dimensions - 1).leading_zeros()) as usize
    }
}
