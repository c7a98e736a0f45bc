//! Bit-string helpers shared by the sampling simulators.

use rand::Rng;
use qjob_types::{Counts, Parameters};

use crate::error::{SimError, SimResult};
use crate::MAX_QUBITS;

/// Uniformly random bit-string of `width` characters.
pub(crate) fn random_bitstring<R: Rng + ?Sized>(width: u32, rng: &mut R) -> String {
    (0..width)
        .map(|_| if rng.r#gen::<bool>() { '1' } else { '0' })
        .collect()
}

/// Number of `'1'` symbols in an outcome label.
pub(crate) fn hamming_weight(outcome: &str) -> u64 {
    outcome.bytes().filter(|&b| b == b'1').count() as u64
}

/// Weighted mean Hamming weight over a frequency table; 0.0 when empty.
pub(crate) fn average_hamming_weight(counts: &Counts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    let ones: u64 = counts
        .iter()
        .map(|(outcome, n)| hamming_weight(outcome) * n)
        .sum();
    ones as f64 / total as f64
}

/// Read the `qubits` parameter (default `default`), rejecting widths the
/// simulators cannot represent.
pub(crate) fn qubits_param(params: &Parameters, default: i64) -> SimResult<u32> {
    let qubits = params.int_or("qubits", default);
    if !(0..=MAX_QUBITS).contains(&qubits) {
        return Err(SimError::InvalidParameter {
            name: "qubits",
            reason: format!("must be between 0 and {MAX_QUBITS}, got {qubits}"),
        });
    }
    Ok(qubits as u32)
}
