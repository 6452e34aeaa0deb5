// rust/lifeline-worker/src/error.rs
// Worker error taxonomy: transient errors abort a tick, fatal errors stop the loop

use thiserror::Error;

/// Input reader failure. Always transient.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("input store read failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("input payload could not be decoded: {0}")]
    Decode(String),
}

/// Routing oracle failure at the request level. Always transient.
/// Element-level failures never surface here; the affected pair is dropped.
#[derive(Debug, Error)]
pub enum RoutesError {
    #[error("route matrix request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("route matrix request rejected with HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("route matrix payload could not be decoded: {0}")]
    Decode(String),
}

/// MILP backend failure. Fatal: the pipeline cannot run without a working
/// solver, and CBC failing on a well-formed 0/1 program is not recoverable
/// by retrying the same inputs.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("assignment solve failed: {0}")]
    Resolution(#[from] good_lp::ResolutionError),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Routes(#[from] RoutesError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("publish failed: {0}")]
    Publish(#[source] sqlx::Error),

    #[error("input fingerprint could not be computed: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl WorkerError {
    /// Transient errors are logged and retried on the next scheduled tick,
    /// with the change-detector fingerprint left untouched.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WorkerError::Ingest(_) | WorkerError::Routes(_) | WorkerError::Publish(_)
        )
    }
}
