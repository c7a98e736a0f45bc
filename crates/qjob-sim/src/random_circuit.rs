//! Random circuit sampling, also the fallback for unrecognised names.
//!
//! A deep random circuit scrambles the register, so every shot is a
//! uniformly random bit-string.

use rand::Rng;
use qjob_types::{Counts, Parameters, ResultRecord};

use crate::bits::{average_hamming_weight, qubits_param, random_bitstring};
use crate::error::SimResult;

pub const DEFAULT_QUBITS: i64 = 5;
pub const DEFAULT_DEPTH: i64 = 10;

/// Sample `shots` outcomes of a `qubits`-wide (default 5), `depth`-deep
/// (default 10) random circuit.
pub fn run<R: Rng + ?Sized>(
    params: &Parameters,
    shots: u32,
    rng: &mut R,
) -> SimResult<ResultRecord> {
    let qubits = qubits_param(params, DEFAULT_QUBITS)?;
    let depth = params.int_or("depth", DEFAULT_DEPTH);

    let mut counts = Counts::new();
    for _ in 0..shots {
        counts.record(random_bitstring(qubits, rng));
    }
    let actual_hamming_weight = average_hamming_weight(&counts);

    let mut result = ResultRecord::new();
    result.insert("algorithm", "Random Circuit");
    result.insert("qubits", qubits);
    result.insert("depth", depth);
    result.insert("counts", counts);
    result.insert("expected_hamming_weight", f64::from(qubits) / 2.0);
    result.insert("actual_hamming_weight", actual_hamming_weight);
    result.insert("entanglement", rng.r#gen::<f64>());
    Ok(result)
}
