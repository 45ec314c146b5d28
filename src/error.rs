use thiserror::Error;

use crate::round::RoundResult;

/// Top level error taxonomy for the runtime.
#[derive(Debug, Error)]
pub enum SimError {
    // missing or invalid network / allocation / input configuration.
    // surfaced before the backend is started, no partial state is created.
    #[error("configuration error: {0}")]
    Config(String),

    // backend level failures are fatal and abort the whole run
    #[error("backend error: {0}")]
    Backend(String),

    // misuse of a handle or driver lifecycle (double run, closed connection)
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    // an error raised inside a role's program body
    #[error("program error: {0}")]
    Program(String),

    // a classical channel whose peer endpoint is gone
    #[error("channel error: {0}")]
    Channel(String),

    #[error("persistence error: {0}")]
    Persist(String),

    #[error(transparent)]
    Round(#[from] RoundError),
}

/// A single role's program body failed during a round.
#[derive(Debug, Error)]
#[error("role `{role}` failed: {cause}")]
pub struct RoleFailure {
    pub role: String,
    pub cause: Box<SimError>,
}

impl RoleFailure {
    pub fn new(role: impl Into<String>, cause: SimError) -> Self {
        RoleFailure {
            role: role.into(),
            cause: Box::new(cause),
        }
    }
}

/// Aggregate of one or more role failures in a single round. Carries the
/// partial result of the roles that did complete, so callers still get
/// everything that finished normally.
#[derive(Debug)]
pub struct RoundError {
    pub round: usize,
    pub failures: Vec<RoleFailure>,
    pub partial: RoundResult,
}

impl std::error::Error for RoundError {}

impl RoundError {
    pub fn failed_roles(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.role.clone()).collect()
    }
}

impl std::fmt::Display for RoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "round {}: {} role(s) failed: [{}]",
            self.round,
            self.failures.len(),
            self.failed_roles().join(", ")
        )
    }
}
