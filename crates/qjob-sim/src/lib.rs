//! `qjob-sim`: probabilistic stand-ins for textbook quantum algorithms.
//!
//! Each simulator is a pure function of its parameters, a shot count and an
//! injected [`RandomSource`]. Nothing here models amplitudes exactly: the
//! simulators reproduce the *shape* of a real run (frequency tables, factor
//! lists, normalised state vectors) with statistically plausible contents.
//!
//! | Name       | Simulator                  |
//! |------------|----------------------------|
//! | `GROVER`   | [`grover`]                 |
//! | `SHOR`     | [`shor`]                   |
//! | `QVECTOR`  | [`statevector`]            |
//! | `TELEPORT` | [`teleport`]               |
//! | anything else | [`random_circuit`]      |
//!
//! # Quick start
//!
//! ```rust
//! use qjob_sim::{RandomSource, create_default_registry};
//! use qjob_types::Parameters;
//!
//! let registry = create_default_registry();
//! let mut rng = RandomSource::seeded(7);
//! let params = Parameters::new().with("number", 21);
//! let result = registry.dispatch("shor", &params, 1, &mut rng).unwrap();
//! assert_eq!(result.get("factors").unwrap().as_list().unwrap().len(), 2);
//! ```

pub mod error;
pub mod grover;
pub mod random_circuit;
pub mod registry;
pub mod rng;
pub mod shor;
pub mod statevector;
pub mod teleport;

mod bits;

pub use error::{SimError, SimResult};
pub use registry::{FALLBACK_ALGORITHM, SimulatorFn, SimulatorRegistry, create_default_registry};
pub use rng::RandomSource;

/// Largest register width any simulator accepts.
pub const MAX_QUBITS: i64 = 50;

/// Largest state-vector dimension accepted by [`statevector`].
pub const MAX_DIMENSIONS: i64 = 1 << 16;

/// Largest shot count accepted by [`SimulatorRegistry::dispatch`].
pub const MAX_SHOTS: u32 = 10_000_000;
