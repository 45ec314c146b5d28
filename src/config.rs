use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::channel::ClassicalValue;
use crate::error::SimError;

fn default_fidelity() -> f64 {
    1.0
}

/// A physical node in the simulated network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
}

/// An entanglement-capable link between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: String,
    pub b: String,
    #[serde(default = "default_fidelity")]
    pub fidelity: f64,
}

/// Network topology, supplied already parsed; the runtime never reads raw
/// configuration files itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl NetworkConfig {
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }
}

/// One role entry of the application: which registered program the role
/// runs. Declaration order here is the canonical role ordering for result
/// assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub role: String,
    pub program: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub programs: Vec<ProgramConfig>,
}

impl AppConfig {
    pub fn roles(&self) -> Vec<String> {
        self.programs.iter().map(|p| p.role.clone()).collect()
    }
}

/// role -> physical node placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleAllocation {
    pub nodes: BTreeMap<String, String>,
}

pub type InputMap = BTreeMap<String, ClassicalValue>;

/// Per-role program inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleInputs {
    pub inputs: BTreeMap<String, InputMap>,
}

impl RoleInputs {
    pub fn for_role(&self, role: &str) -> InputMap {
        self.inputs.get(role).cloned().unwrap_or_default()
    }
}

/// Result logging / persistence policy carried on each round's instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogPolicy {
    pub enabled: bool,
    pub output_dir: Option<PathBuf>,
}

/// The full, validated simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub network: NetworkConfig,
    pub app: AppConfig,
    pub allocation: RoleAllocation,
    #[serde(default)]
    pub inputs: RoleInputs,
    #[serde(default)]
    pub log: LogPolicy,
}

impl SimConfig {
    /// Validated once at driver construction; consumed immutably after.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.network.nodes.is_empty() {
            return Err(SimError::Config("network has no nodes".to_string()));
        }
        if self.app.programs.is_empty() {
            return Err(SimError::Config("application declares no roles".to_string()));
        }

        let mut seen = HashSet::new();
        for program in &self.app.programs {
            if !seen.insert(program.role.as_str()) {
                return Err(SimError::Config(format!(
                    "duplicate role `{}` in application",
                    program.role
                )));
            }
        }

        for link in &self.network.links {
            if !self.network.has_node(&link.a) || !self.network.has_node(&link.b) {
                return Err(SimError::Config(format!(
                    "link {}<->{} references an unknown node",
                    link.a, link.b
                )));
            }
        }

        for program in &self.app.programs {
            match self.allocation.nodes.get(&program.role) {
                None => {
                    return Err(SimError::Config(format!(
                        "role `{}` has no node allocation",
                        program.role
                    )));
                }
                Some(node) if !self.network.has_node(node) => {
                    return Err(SimError::Config(format!(
                        "role `{}` allocated to unknown node `{}`",
                        program.role, node
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Convenience for the CLI boundary; library callers construct the
    /// structs directly.
    pub fn from_json_str(raw: &str) -> Result<Self, SimError> {
        let cfg: SimConfig = serde_json::from_str(raw)
            .map_err(|e| SimError::Config(format!("invalid configuration json: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
