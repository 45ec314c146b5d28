use std::sync::Arc;

use crate::backend::{Backend, QuantumOp, Qubit};
use crate::error::SimError;

/// Per-role exclusive handle to the backend execution context. Quantum ops
/// enqueue into a pending batch; `flush()` is the synchronization barrier
/// that commits the whole batch and returns its measurement outcomes.
///
/// A connection is opened at most once per program execution and closed
/// exactly once: the runner closes it on normal return, and `Drop` closes
/// it on any unwinding exit path.
pub struct Connection {
    role: String,
    backend: Arc<dyn Backend>,
    pending: Vec<QuantumOp>,
    next_qubit: Qubit,
    closed: bool,
}

impl Connection {
    pub fn open(role: &str, backend: Arc<dyn Backend>) -> Self {
        log::debug!("role {}: connection opened", role);
        Connection {
            role: role.to_string(),
            backend,
            pending: Vec::new(),
            next_qubit: 0,
            closed: false,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    fn enqueue(&mut self, op: QuantumOp) -> Result<(), SimError> {
        if self.closed {
            return Err(SimError::Lifecycle(format!(
                "role {}: operation on closed connection",
                self.role
            )));
        }
        self.pending.push(op);
        Ok(())
    }

    /// Allocates a fresh local qubit initialized to |0>.
    pub fn new_qubit(&mut self) -> Result<Qubit, SimError> {
        let qubit = self.next_qubit;
        self.next_qubit += 1;
        self.enqueue(QuantumOp::QInit { qubit })?;
        Ok(qubit)
    }

    /// Allocates a qubit holding one half of an entangled pair shared with
    /// `remote`. Entanglement generation itself is the backend's concern.
    pub fn epr_qubit(&mut self, remote: &str) -> Result<Qubit, SimError> {
        let qubit = self.next_qubit;
        self.next_qubit += 1;
        self.enqueue(QuantumOp::Epr {
            qubit,
            remote: remote.to_string(),
        })?;
        Ok(qubit)
    }

    pub fn h(&mut self, qubit: Qubit) -> Result<(), SimError> {
        self.enqueue(QuantumOp::H { qubit })
    }

    pub fn x(&mut self, qubit: Qubit) -> Result<(), SimError> {
        self.enqueue(QuantumOp::X { qubit })
    }

    pub fn z(&mut self, qubit: Qubit) -> Result<(), SimError> {
        self.enqueue(QuantumOp::Z { qubit })
    }

    pub fn cnot(&mut self, control: Qubit, target: Qubit) -> Result<(), SimError> {
        self.enqueue(QuantumOp::Cnot { control, target })
    }

    /// Enqueues a measurement. The outcome becomes available from the next
    /// `flush()`, positioned by enqueue order among that batch's measures.
    pub fn measure(&mut self, qubit: Qubit) -> Result<(), SimError> {
        self.enqueue(QuantumOp::Measure { qubit })
    }

    /// Commits every op enqueued since the previous flush (or open) as one
    /// atomic batch and returns the batch's measurement outcomes in enqueue
    /// order. No op is ever observed outside its batch.
    pub fn flush(&mut self) -> Result<Vec<u8>, SimError> {
        if self.closed {
            return Err(SimError::Lifecycle(format!(
                "role {}: flush on closed connection",
                self.role
            )));
        }
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let batch = std::mem::take(&mut self.pending);
        log::trace!("role {}: flushing {} ops", self.role, batch.len());
        self.backend.submit_batch(&self.role, batch)
    }

    /// Flushes any still-pending ops, then releases the handle. Closing a
    /// connection twice is a lifecycle error.
    pub fn close(&mut self) -> Result<(), SimError> {
        if self.closed {
            return Err(SimError::Lifecycle(format!(
                "role {}: connection closed twice",
                self.role
            )));
        }
        let leftover = self.flush();
        self.closed = true;
        log::debug!("role {}: connection closed", self.role);
        leftover.map(|_| ())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.closed {
            // unwinding or early-error exit path; release best effort
            if let Err(e) = self.close() {
                log::warn!("role {}: close on drop failed: {}", self.role, e);
            }
        }
    }
}
