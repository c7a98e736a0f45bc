//! Quantum teleportation protocol.
//!
//! Three qubits, one Bell pair, two classical bits. A successful shot is
//! reported as `"111"` (probability 0.75), a failed one as `"000"`.

use rand::Rng;
use qjob_types::{Counts, Parameters, ResultRecord};

use crate::error::SimResult;

pub const SUCCESS_PROBABILITY: f64 = 0.75;
pub const SUCCESS_OUTCOME: &str = "111";
pub const FAILURE_OUTCOME: &str = "000";

/// Run `shots` teleportation trials. Takes no parameters.
pub fn run<R: Rng + ?Sized>(
    _params: &Parameters,
    shots: u32,
    rng: &mut R,
) -> SimResult<ResultRecord> {
    let mut counts = Counts::new();
    let mut successes = 0u64;
    for _ in 0..shots {
        if rng.r#gen::<f64>() < SUCCESS_PROBABILITY {
            counts.record(SUCCESS_OUTCOME);
            successes += 1;
        } else {
            counts.record(FAILURE_OUTCOME);
        }
    }

    let success_rate = if shots == 0 {
        0.0
    } else {
        successes as f64 / f64::from(shots)
    };

    let mut result = ResultRecord::new();
    result.insert("algorithm", "Quantum Teleportation");
    result.insert("qubits_used", 3);
    result.insert("counts", counts);
    result.insert("success_rate", success_rate);
    result.insert("classical_bits_sent", 2);
    result.insert("entanglement_used", true);
    Ok(result)
}
