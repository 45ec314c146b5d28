use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::app::{ApplicationInstance, ProgramEntry};
use crate::backend::Backend;
use crate::channel::{channel_pair, ChannelEndpoint};
use crate::config::SimConfig;
use crate::error::{RoleFailure, RoundError, SimError};
use crate::program::{ProgramRegistry, RoleOutput};
use crate::runner::ProgramRunner;

/// role -> result mapping for one round, kept in the instance's declared
/// role order regardless of which runner finished first.
#[derive(Debug, Clone, Default)]
pub struct RoundResult {
    entries: Vec<(String, RoleOutput)>,
}

impl RoundResult {
    pub fn insert(&mut self, role: &str, output: RoleOutput) {
        self.entries.push((role.to_string(), output));
    }

    pub fn get(&self, role: &str) -> Option<&RoleOutput> {
        self.entries
            .iter()
            .find(|(r, _)| r == role)
            .map(|(_, out)| out)
    }

    pub fn roles(&self) -> Vec<&str> {
        self.entries.iter().map(|(r, _)| r.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleOutput)> {
        self.entries.iter().map(|(r, out)| (r.as_str(), out))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RoundResult {
    // serialized as a json object in role order
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (role, output) in &self.entries {
            map.serialize_entry(role, output)?;
        }
        map.end()
    }
}

/// Builds one ApplicationInstance and executes all of its roles
/// concurrently for a single round.
pub struct RoundCoordinator<'a> {
    registry: &'a ProgramRegistry,
    backend: Arc<dyn Backend>,
}

impl<'a> RoundCoordinator<'a> {
    pub fn new(registry: &'a ProgramRegistry, backend: Arc<dyn Backend>) -> Self {
        RoundCoordinator { registry, backend }
    }

    /// Build stage. Purely sequential and deterministic: programs are
    /// instantiated fresh (never reused across rounds) in declared role
    /// order, so instance construction is identical run over run for the
    /// same configuration.
    pub fn build_instance(&self, config: &SimConfig) -> Result<ApplicationInstance, SimError> {
        let mut entries = Vec::with_capacity(config.app.programs.len());

        for program_cfg in &config.app.programs {
            let inputs = config.inputs.for_role(&program_cfg.role);
            let program = self.registry.instantiate(&program_cfg.program, &inputs)?;
            entries.push(ProgramEntry {
                role: program_cfg.role.clone(),
                program,
                input_keys: inputs.keys().cloned().collect(),
            });
        }

        Ok(ApplicationInstance {
            entries,
            inputs: config.inputs.clone(),
            allocation: config.allocation.clone(),
            network: config.network.clone(),
            log: config.log.clone(),
        })
    }

    /// Launch-and-join stage. One thread per role; every runner is joined
    /// even when some fail, so nothing leaks. On any failure the round
    /// yields a RoundError naming every failed role, together with the
    /// partial result of the roles that completed.
    pub fn execute(
        &self,
        instance: ApplicationInstance,
        round: usize,
    ) -> Result<RoundResult, RoundError> {
        let roles = instance.roles();
        let mut sockets = wire_channels(&roles);

        log::info!("round {}: launching {} roles", round, roles.len());

        let mut runners = Vec::with_capacity(instance.entries.len());
        for entry in instance.entries {
            let inputs = instance.inputs.for_role(&entry.role);
            let endpoints = sockets.remove(&entry.role).unwrap_or_default();
            runners.push(ProgramRunner::launch(
                &entry.role,
                entry.program,
                Arc::clone(&self.backend),
                endpoints,
                inputs,
            ));
        }

        // join in declared role order; result ordering must not depend on
        // completion order
        let mut result = RoundResult::default();
        let mut failures: Vec<RoleFailure> = Vec::new();
        for runner in runners {
            let role = runner.role().to_string();
            match runner.join() {
                Ok(output) => result.insert(&role, output),
                Err(failure) => {
                    log::error!("round {}: {}", round, failure);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            log::info!("round {}: all {} roles completed", round, result.len());
            Ok(result)
        } else {
            Err(RoundError {
                round,
                failures,
                partial: result,
            })
        }
    }
}

/// Wires one classical channel pair for every unordered pair of declared
/// roles, in declared order. Deterministic given the role list.
fn wire_channels(roles: &[String]) -> HashMap<String, HashMap<String, ChannelEndpoint>> {
    let mut sockets: HashMap<String, HashMap<String, ChannelEndpoint>> = roles
        .iter()
        .map(|r| (r.clone(), HashMap::new()))
        .collect();

    for (i, a) in roles.iter().enumerate() {
        for b in roles.iter().skip(i + 1) {
            let (at_a, at_b) = channel_pair(a, b);
            if let Some(map) = sockets.get_mut(a) {
                map.insert(b.clone(), at_a);
            }
            if let Some(map) = sockets.get_mut(b) {
                map.insert(a.clone(), at_b);
            }
        }
    }

    sockets
}
