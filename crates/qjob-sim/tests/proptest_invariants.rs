//! Property-based tests for simulator invariants.

use proptest::prelude::*;
use qjob_sim::{RandomSource, create_default_registry};
use qjob_types::{Parameters, Value};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_circuit_counts_sum_to_shots(
        qubits in 0_i64..=12,
        shots in 0_u32..2_000,
        seed in any::<u64>(),
    ) {
        let registry = create_default_registry();
        let mut rng = RandomSource::seeded(seed);
        let params = Parameters::new().with("qubits", qubits);
        let result = registry.dispatch("RANDOM", &params, shots, &mut rng).unwrap();
        let counts = result.counts("counts").unwrap();

        prop_assert_eq!(counts.total(), u64::from(shots));
        for (label, _) in counts.iter() {
            prop_assert_eq!(label.len() as i64, qubits);
        }

        let observed = result.get("actual_hamming_weight").and_then(Value::as_f64).unwrap();
        prop_assert!(observed >= 0.0 && observed <= qubits as f64);
    }

    #[test]
    fn statevector_is_normalised(
        dimensions in 1_i64..=512,
        seed in any::<u64>(),
    ) {
        let registry = create_default_registry();
        let mut rng = RandomSource::seeded(seed);
        let params = Parameters::new().with("dimensions", dimensions);
        let result = registry.dispatch("QVECTOR", &params, 1, &mut rng).unwrap();
        let vector = result.get("state_vector").and_then(Value::as_map).unwrap();

        prop_assert_eq!(vector.len() as i64, dimensions);
        let norm_sq: f64 = vector.values().map(|v| v.as_f64().unwrap().powi(2)).sum();
        prop_assert!((norm_sq - 1.0).abs() < 1e-9, "norm² = {}", norm_sq);
        prop_assert!(vector.values().all(|v| v.as_f64().unwrap() >= 0.0));
    }

    #[test]
    fn teleport_counts_sum_to_shots(shots in 0_u32..5_000, seed in any::<u64>()) {
        let registry = create_default_registry();
        let mut rng = RandomSource::seeded(seed);
        let result = registry.dispatch("TELEPORT", &Parameters::new(), shots, &mut rng).unwrap();
        let counts = result.counts("counts").unwrap();
        prop_assert_eq!(counts.total(), u64::from(shots));
        prop_assert_eq!(counts.get("111") + counts.get("000"), u64::from(shots));
    }
}
