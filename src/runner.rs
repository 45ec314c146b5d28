use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::backend::Backend;
use crate::channel::ChannelEndpoint;
use crate::config::InputMap;
use crate::connection::Connection;
use crate::error::{RoleFailure, SimError};
use crate::program::{RoleContext, RoleOutput, RoleProgram};

/// Executes one role's program to completion on its own thread. Owns the
/// role's channel endpoints and its backend connection for the duration of
/// the round.
pub struct ProgramRunner {
    role: String,
    handle: JoinHandle<Result<RoleOutput, SimError>>,
}

impl ProgramRunner {
    /// Spawns the role thread. The connection is opened before the program
    /// body runs and is closed on every exit path: explicitly on normal
    /// return and on program error, via Drop if the body panics.
    pub fn launch(
        role: &str,
        mut program: Box<dyn RoleProgram>,
        backend: Arc<dyn Backend>,
        sockets: HashMap<String, ChannelEndpoint>,
        inputs: InputMap,
    ) -> Self {
        let role_name = role.to_string();
        let thread_role = role_name.clone();

        let handle = thread::spawn(move || {
            log::debug!("role {}: program started", thread_role);

            let connection = Connection::open(&thread_role, backend);
            let mut ctx = RoleContext::new(connection, sockets, inputs);

            let result = program.run(&mut ctx);

            // close regardless of how the body ended; keep the body's error
            // if both fail
            let close_result = ctx.connection.close();
            match (result, close_result) {
                (Ok(output), Ok(())) => {
                    log::debug!("role {}: program finished", thread_role);
                    Ok(output)
                }
                (Ok(_), Err(e)) => Err(e),
                (Err(e), close) => {
                    if let Err(close_err) = close {
                        log::warn!(
                            "role {}: close after failure also failed: {}",
                            thread_role,
                            close_err
                        );
                    }
                    Err(e)
                }
            }
        });

        ProgramRunner {
            role: role_name,
            handle,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Blocks until the role thread exits. A panicking program body is
    /// reported as a role failure like any other error, not propagated.
    pub fn join(self) -> Result<RoleOutput, RoleFailure> {
        match self.handle.join() {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RoleFailure::new(self.role, e)),
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "program panicked".to_string());
                Err(RoleFailure::new(
                    self.role,
                    SimError::Program(format!("panic: {}", msg)),
                ))
            }
        }
    }
}
