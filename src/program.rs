use std::collections::{BTreeMap, HashMap};

use crate::channel::{ChannelEndpoint, ClassicalValue};
use crate::config::InputMap;
use crate::connection::Connection;
use crate::error::SimError;

/// Result mapping produced by one role's program.
pub type RoleOutput = BTreeMap<String, ClassicalValue>;

/// Everything a role's program body gets to touch: its exclusive backend
/// connection, one classical socket per remote role, and its resolved
/// inputs. The only suspension points available through this context are
/// `ChannelEndpoint::recv` and `Connection::flush`.
pub struct RoleContext {
    pub connection: Connection,
    sockets: HashMap<String, ChannelEndpoint>,
    inputs: InputMap,
}

impl RoleContext {
    pub fn new(
        connection: Connection,
        sockets: HashMap<String, ChannelEndpoint>,
        inputs: InputMap,
    ) -> Self {
        RoleContext {
            connection,
            sockets,
            inputs,
        }
    }

    pub fn role(&self) -> &str {
        self.connection.role()
    }

    /// The classical socket to `remote`. Unknown remotes are a program
    /// error, not a wiring failure: every declared role pair is wired.
    pub fn socket(&self, remote: &str) -> Result<&ChannelEndpoint, SimError> {
        self.sockets.get(remote).ok_or_else(|| {
            SimError::Program(format!(
                "role {} has no channel to `{}`",
                self.connection.role(),
                remote
            ))
        })
    }

    pub fn input(&self, key: &str) -> Option<&ClassicalValue> {
        self.inputs.get(key)
    }

    pub fn input_keys(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }
}

/// One party's program logic, driven to completion by a ProgramRunner.
pub trait RoleProgram: Send {
    fn run(&mut self, ctx: &mut RoleContext) -> Result<RoleOutput, SimError>;
}

type ProgramCtor = Box<dyn Fn(&InputMap) -> Result<Box<dyn RoleProgram>, SimError> + Send + Sync>;

/// Startup-time registry mapping program names to constructor closures.
/// Replaces load-by-file-path: how the mapping is populated is the
/// caller's plugin concern, the runtime only resolves names.
#[derive(Default)]
pub struct ProgramRegistry {
    ctors: HashMap<String, ProgramCtor>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        ProgramRegistry {
            ctors: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&InputMap) -> Result<Box<dyn RoleProgram>, SimError> + Send + Sync + 'static,
    {
        self.ctors.insert(name.to_string(), Box::new(ctor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    /// Builds a fresh program instance from its registered constructor.
    /// Fresh per round: program state never survives a round boundary.
    pub fn instantiate(
        &self,
        name: &str,
        inputs: &InputMap,
    ) -> Result<Box<dyn RoleProgram>, SimError> {
        let ctor = self.ctors.get(name).ok_or_else(|| {
            SimError::Config(format!("no program registered under `{}`", name))
        })?;
        ctor(inputs)
    }
}
