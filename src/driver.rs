use serde::Serialize;
use std::sync::Arc;

use crate::backend::Backend;
use crate::config::SimConfig;
use crate::error::{RoundError, SimError};
use crate::program::ProgramRegistry;
use crate::round::{RoundCoordinator, RoundResult};
use crate::sink::ResultSink;

/// Ordered, append-only history of round results. Never mutated after a
/// round's entry is written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunLog {
    rounds: Vec<RoundResult>,
}

impl RunLog {
    pub fn push(&mut self, result: RoundResult) {
        self.rounds.push(result);
    }

    pub fn rounds(&self) -> &[RoundResult] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

/// What a run returns: the full log plus every round-level error that
/// occurred along the way. Callers always receive both, never one instead
/// of the other.
#[derive(Debug)]
pub struct RunReport {
    pub log: RunLog,
    pub round_errors: Vec<RoundError>,
}

/// What the driver does with a failed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the error, reset round state and keep going (default).
    Continue,
    /// Record the error and stop the round loop; the backend is still
    /// stopped cleanly.
    Abort,
}

enum DriverState {
    Created,
    Finished,
}

/// Top-level lifecycle owner: validates configuration up front, starts the
/// backend, drives rounds through the coordinator, persists the run log at
/// every round boundary, resets shared round state between rounds, and
/// stops the backend exactly once.
pub struct SimulationDriver {
    config: SimConfig,
    registry: ProgramRegistry,
    backend: Arc<dyn Backend>,
    sink: Option<Box<dyn ResultSink>>,
    policy: FailurePolicy,
    state: DriverState,
}

impl SimulationDriver {
    /// Fails with a configuration error before any backend state exists.
    pub fn new(
        config: SimConfig,
        registry: ProgramRegistry,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, SimError> {
        config.validate()?;

        // every declared program must resolve in the registry up front,
        // not in the middle of round one
        for program in &config.app.programs {
            if !registry.contains(&program.program) {
                return Err(SimError::Config(format!(
                    "role `{}` wants unregistered program `{}`",
                    program.role, program.program
                )));
            }
        }

        // logging policy may preconfigure a sink; with_sink overrides it
        let sink: Option<Box<dyn ResultSink>> = if config.log.enabled {
            match &config.log.output_dir {
                Some(dir) => Some(Box::new(crate::sink::JsonFileSink::new(
                    dir.join("results.json"),
                ))),
                None => {
                    log::warn!("result logging enabled without an output dir, skipping");
                    None
                }
            }
        } else {
            None
        };

        Ok(SimulationDriver {
            config,
            registry,
            backend,
            sink,
            policy: FailurePolicy::Continue,
            state: DriverState::Created,
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs `num_rounds` rounds. `run(0)` is valid: the backend is started
    /// and stopped and an empty log is returned. Calling `run` twice on
    /// the same driver is a usage error, not an idempotent no-op.
    pub fn run(&mut self, num_rounds: usize) -> Result<RunReport, SimError> {
        if !matches!(self.state, DriverState::Created) {
            return Err(SimError::Lifecycle(
                "driver already ran; build a new driver for another run".to_string(),
            ));
        }
        self.state = DriverState::Finished;

        self.backend.start()?;
        log::info!("simulation started: {} round(s)", num_rounds);

        let coordinator = RoundCoordinator::new(&self.registry, Arc::clone(&self.backend));

        let mut run_log = RunLog::default();
        let mut round_errors = Vec::new();

        for round in 0..num_rounds {
            let instance = match coordinator.build_instance(&self.config) {
                Ok(instance) => instance,
                Err(e) => {
                    self.backend.stop()?;
                    return Err(e);
                }
            };

            let mut abort = false;
            match coordinator.execute(instance, round) {
                Ok(result) => run_log.push(result),
                Err(round_error) => {
                    // failed roles are absent from the round's entry; the
                    // completed ones are still recorded
                    run_log.push(round_error.partial.clone());
                    round_errors.push(round_error);
                    abort = self.policy == FailurePolicy::Abort;
                }
            }

            if let Some(sink) = self.sink.as_mut() {
                // reported, not fatal; the in-memory log stays authoritative
                if let Err(e) = sink.persist(&run_log) {
                    log::warn!("round {}: persist failed: {}", round, e);
                }
            }

            // next round must start from a clean slate equivalent to a
            // fresh backend start
            self.backend.reset_round_state()?;

            if abort {
                log::warn!("aborting after failed round {} per policy", round);
                break;
            }
        }

        self.backend.stop()?;
        log::info!(
            "simulation finished: {} round(s) logged, {} round error(s)",
            run_log.len(),
            round_errors.len()
        );

        Ok(RunReport { log: run_log, round_errors })
    }
}
