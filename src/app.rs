use crate::config::{LogPolicy, NetworkConfig, RoleAllocation, RoleInputs};
use crate::program::RoleProgram;

/// One role's slot in an application instance: the instantiated program
/// plus the input keys it was resolved with.
pub struct ProgramEntry {
    pub role: String,
    pub program: Box<dyn RoleProgram>,
    pub input_keys: Vec<String>,
}

/// Immutable per-round descriptor of the full multi-party application:
/// programs in declared role order, inputs, role placement, topology and
/// logging policy. Built fresh by the round coordinator, read during the
/// round, discarded once results are collected.
pub struct ApplicationInstance {
    pub entries: Vec<ProgramEntry>,
    pub inputs: RoleInputs,
    pub allocation: RoleAllocation,
    pub network: NetworkConfig,
    pub log: LogPolicy,
}

impl ApplicationInstance {
    /// Declared role ordering; RoundResult assembly follows this order.
    pub fn roles(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.role.clone()).collect()
    }
}
