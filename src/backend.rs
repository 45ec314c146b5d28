use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::SimError;

/// Role-local qubit id, allocated by that role's connection.
pub type Qubit = usize;

/// Operation vocabulary programs enqueue between flushes. Gate numerics are
/// the backend's business; the runtime only guarantees batch ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QuantumOp {
    QInit { qubit: Qubit },
    H { qubit: Qubit },
    X { qubit: Qubit },
    Z { qubit: Qubit },
    Cnot { control: Qubit, target: Qubit },
    // one half of an entangled pair shared with `remote`, stored in `qubit`
    Epr { qubit: Qubit, remote: String },
    Measure { qubit: Qubit },
}

/// Contract the runtime requires from a simulation backend. Roles submit
/// batches concurrently; the backend serializes physical-state mutation
/// internally.
pub trait Backend: Send + Sync {
    fn start(&self) -> Result<(), SimError>;

    fn stop(&self) -> Result<(), SimError>;

    /// After this call the backend state must be observationally identical
    /// to its state immediately after `start()`.
    fn reset_round_state(&self) -> Result<(), SimError>;

    /// The flush primitive: commits `batch` atomically for `role` and
    /// returns one outcome per measure op, in enqueue order.
    fn submit_batch(&self, role: &str, batch: Vec<QuantumOp>) -> Result<Vec<u8>, SimError>;
}

// how the local backend answers measure ops
enum MeasureMode {
    Seeded(u64),
    Fixed(u8),
}

struct LocalState {
    started: bool,
    // committed ops per role for the current round, in commit order
    op_log: HashMap<String, Vec<QuantumOp>>,
    rngs: HashMap<String, ChaCha8Rng>,
}

/// In-process reference backend. Records every committed batch per role and
/// answers measurements deterministically: per-role seeded rng streams, so
/// outcomes do not depend on how concurrent flushes interleave. Useful both
/// as the default simulation target and as an instrumented stand-in in
/// tests (the op log shows exactly which gates a role committed).
pub struct LocalBackend {
    mode: MeasureMode,
    inner: Mutex<LocalState>,
}

impl LocalBackend {
    pub fn new(seed: u64) -> Self {
        LocalBackend {
            mode: MeasureMode::Seeded(seed),
            inner: Mutex::new(LocalState {
                started: false,
                op_log: HashMap::new(),
                rngs: HashMap::new(),
            }),
        }
    }

    /// Every measure returns `outcome`. For tests that need a known branch.
    pub fn fixed(outcome: u8) -> Self {
        LocalBackend {
            mode: MeasureMode::Fixed(outcome % 2),
            inner: Mutex::new(LocalState {
                started: false,
                op_log: HashMap::new(),
                rngs: HashMap::new(),
            }),
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().started
    }

    /// Ops committed by `role` since start or the last round reset.
    pub fn committed_ops(&self, role: &str) -> Vec<QuantumOp> {
        self.inner
            .lock()
            .op_log
            .get(role)
            .cloned()
            .unwrap_or_default()
    }

    fn role_rng(&self, role: &str) -> ChaCha8Rng {
        // independent stream per role, stable across rounds
        let base = match self.mode {
            MeasureMode::Seeded(seed) => seed,
            MeasureMode::Fixed(_) => 0,
        };
        let mut hasher = DefaultHasher::new();
        role.hash(&mut hasher);
        ChaCha8Rng::seed_from_u64(base ^ hasher.finish())
    }
}

impl Backend for LocalBackend {
    fn start(&self) -> Result<(), SimError> {
        let mut state = self.inner.lock();
        if state.started {
            return Err(SimError::Backend("backend already started".to_string()));
        }
        state.started = true;
        state.op_log.clear();
        state.rngs.clear();
        log::info!("local backend started");
        Ok(())
    }

    fn stop(&self) -> Result<(), SimError> {
        let mut state = self.inner.lock();
        if !state.started {
            return Err(SimError::Backend("backend not started".to_string()));
        }
        state.started = false;
        log::info!("local backend stopped");
        Ok(())
    }

    fn reset_round_state(&self) -> Result<(), SimError> {
        let mut state = self.inner.lock();
        if !state.started {
            return Err(SimError::Backend(
                "cannot reset round state: backend not started".to_string(),
            ));
        }
        // drop per-role logs and rng streams so the next round observes the
        // same backend a fresh start would
        state.op_log.clear();
        state.rngs.clear();
        log::debug!("backend round state reset");
        Ok(())
    }

    fn submit_batch(&self, role: &str, batch: Vec<QuantumOp>) -> Result<Vec<u8>, SimError> {
        let mut state = self.inner.lock();
        if !state.started {
            return Err(SimError::Backend(format!(
                "batch from `{}` rejected: backend not started",
                role
            )));
        }

        let seeded = self.role_rng(role);
        let rng = state.rngs.entry(role.to_string()).or_insert(seeded);

        let mut outcomes = Vec::new();
        for op in &batch {
            if let QuantumOp::Measure { .. } = op {
                let outcome = match self.mode {
                    MeasureMode::Fixed(v) => v,
                    MeasureMode::Seeded(_) => rng.gen_range(0..2u8),
                };
                outcomes.push(outcome);
            }
        }

        log::trace!(
            "role {} committed batch of {} ops, {} outcomes",
            role,
            batch.len(),
            outcomes.len()
        );
        state.op_log.entry(role.to_string()).or_default().extend(batch);

        Ok(outcomes)
    }
}
