//! Registry mapping algorithm names to simulator functions.

use rustc_hash::FxHashMap;
use tracing::debug;
use qjob_types::{Parameters, ResultRecord};

use crate::error::{SimError, SimResult};
use crate::rng::RandomSource;
use crate::{MAX_SHOTS, grover, random_circuit, shor, statevector, teleport};

/// Name that unrecognised algorithms resolve to.
pub const FALLBACK_ALGORITHM: &str = "RANDOM";

/// A simulator: pure function of parameters, shot count and random source.
pub type SimulatorFn = fn(&Parameters, u32, &mut RandomSource) -> SimResult<ResultRecord>;

/// Registry of available simulators, keyed by upper-case algorithm name.
#[derive(Clone)]
pub struct SimulatorRegistry {
    simulators: FxHashMap<String, SimulatorFn>,
}

impl SimulatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            simulators: FxHashMap::default(),
        }
    }

    /// Register a simulator under `name` (stored upper-case).
    pub fn register(&mut self, name: &str, simulator: SimulatorFn) {
        self.simulators.insert(name.to_ascii_uppercase(), simulator);
    }

    /// Canonical name a request for `name` is served by.
    ///
    /// Matching is case-insensitive; anything unregistered, including the
    /// empty string, resolves to [`FALLBACK_ALGORITHM`].
    pub fn resolve(&self, name: &str) -> String {
        let key = name.trim().to_ascii_uppercase();
        if self.simulators.contains_key(&key) {
            key
        } else {
            FALLBACK_ALGORITHM.to_string()
        }
    }

    /// Check if a simulator is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.simulators.contains_key(&name.trim().to_ascii_uppercase())
    }

    /// List all registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.simulators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run the simulator for `name`.
    ///
    /// Unknown names silently use the fallback simulator.
    pub fn dispatch(
        &self,
        name: &str,
        params: &Parameters,
        shots: u32,
        rng: &mut RandomSource,
    ) -> SimResult<ResultRecord> {
        if shots > MAX_SHOTS {
            return Err(SimError::InvalidParameter {
                name: "shots",
                reason: format!("must be at most {MAX_SHOTS}, got {shots}"),
            });
        }

        let resolved = self.resolve(name);
        if !resolved.eq_ignore_ascii_case(name.trim()) {
            debug!(requested = name, resolved = %resolved, "Unrecognised algorithm, using fallback");
        }

        let simulator = self
            .simulators
            .get(&resolved)
            .ok_or_else(|| SimError::NoSimulator(name.to_string()))?;
        simulator(params, shots, rng)
    }
}

impl Default for SimulatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the registry with the five built-in simulators.
pub fn create_default_registry() -> SimulatorRegistry {
    let mut registry = SimulatorRegistry::new();
    registry.register("GROVER", grover::run::<RandomSource>);
    registry.register("SHOR", shor::run::<RandomSource>);
    registry.register("QVECTOR", statevector::run::<RandomSource>);
    registry.register("TELEPORT", teleport::run::<RandomSource>);
    registry.register(FALLBACK_ALGORITHM, random_circuit::run::<RandomSource>);
    registry
}
