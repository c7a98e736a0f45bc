//! Grover search.
//!
//! Amplitude amplification is modelled by its end result: after the optimal
//! number of oracle calls the marked state is measured with probability
//! 0.8, and every other shot lands on a uniformly random basis state.

use rand::Rng;
use qjob_types::{Counts, Parameters, ResultRecord};

use crate::bits::{qubits_param, random_bitstring};
use crate::error::SimResult;

/// Probability that one shot measures the marked state.
pub const SUCCESS_PROBABILITY: f64 = 0.8;

pub const DEFAULT_QUBITS: i64 = 5;
pub const DEFAULT_MARKED_STATE: &str = "10101";

/// Run Grover search.
///
/// Parameters: `qubits` (default 5), `markedState` or `marked_state`
/// (default `"10101"`).
pub fn run<R: Rng + ?Sized>(
    params: &Parameters,
    shots: u32,
    rng: &mut R,
) -> SimResult<ResultRecord> {
    let qubits = qubits_param(params, DEFAULT_QUBITS)?;
    let marked_state = marked_state(params);

    let mut counts = Counts::new();
    for _ in 0..shots {
        if rng.r#gen::<f64>() < SUCCESS_PROBABILITY {
            counts.record(marked_state.as_str());
        } else {
            counts.record(random_bitstring(qubits, rng));
        }
    }

    let mut result = ResultRecord::new();
    result.insert("algorithm", "Grover");
    result.insert("qubits", qubits);
    result.insert("marked_state", marked_state);
    result.insert("counts", counts);
    result.insert("success_probability", SUCCESS_PROBABILITY);
    result.insert("oracle_calls", oracle_calls(qubits));
    result.insert("quantum_speedup", "quadratic");
    Ok(result)
}

/// `floor(sqrt(2^qubits))`, the optimal iteration count up to a constant.
pub fn oracle_calls(qubits: u32) -> u64 {
    2f64.powi(qubits as i32).sqrt().floor() as u64
}

fn marked_state(params: &Parameters) -> String {
    params
        .get("markedState")
        .or_else(|| params.get("marked_state"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_MARKED_STATE)
        .to_string()
}
