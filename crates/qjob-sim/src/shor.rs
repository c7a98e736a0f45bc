//! Shor factorisation.
//!
//! The period-finding circuit is replaced by classical trial division; the
//! result reports the first non-trivial factor pair found scanning upward
//! from 2, plus the register size a real run would need.

use rand::Rng;
use qjob_types::{Parameters, ResultRecord, Value};

use crate::error::{SimError, SimResult};

pub const DEFAULT_NUMBER: i64 = 15;

/// Largest input accepted (matches a 32-bit signed register).
pub const MAX_NUMBER: i64 = i32::MAX as i64;

/// Run Shor factorisation of the `number` parameter (default 15).
///
/// Inputs below 2, negatives included, have no factors and need no qubits.
/// `shots` and `rng` are accepted for a uniform simulator signature; the
/// result is deterministic.
pub fn run<R: Rng + ?Sized>(
    params: &Parameters,
    _shots: u32,
    _rng: &mut R,
) -> SimResult<ResultRecord> {
    let number = params.int_or("number", DEFAULT_NUMBER);
    if number > MAX_NUMBER {
        return Err(SimError::InvalidParameter {
            name: "number",
            reason: format!("must be at most {MAX_NUMBER}, got {number}"),
        });
    }

    let factors: Vec<Value> = match first_factor_pair(number) {
        Some((p, q)) => vec![p.into(), q.into()],
        None => Vec::new(),
    };

    let mut result = ResultRecord::new();
    result.insert("algorithm", "Shor");
    result.insert("input_number", number);
    result.insert("factors", Value::List(factors));
    result.insert("qubits_required", qubits_required(number));
    result.insert("quantum_speedup", "exponential");
    result.insert("classical_complexity", "O(exp(n^(1/3)))");
    result.insert("quantum_complexity", "O(n^2 log n)");
    Ok(result)
}

/// Smallest divisor `d` with `2 <= d <= sqrt(n)`, paired with `n / d`.
pub fn first_factor_pair(n: i64) -> Option<(i64, i64)> {
    let mut d = 2i64;
    while d * d <= n {
        if n % d == 0 {
            return Some((d, n / d));
        }
        d += 1;
    }
    None
}

/// `2 * ceil(log2(n))`; zero for `n <= 1`.
pub fn qubits_required(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let ceil_log2 = 64 - (n - 1).leading_zeros();
    2 * i64::from(ceil_log2)
}
