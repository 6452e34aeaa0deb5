// rust/lifeline-worker/src/lib.rs
// Optimization worker: ingest -> fingerprint -> route matrices -> solve -> publish

pub mod error;
pub mod ingest;
pub mod optimize;
pub mod routes;
pub mod solver;
pub mod worker;

pub use error::{IngestError, RoutesError, SolveError, WorkerError};
pub use ingest::{ApiIngestor, DataIngestor, StoreIngestor};
pub use routes::{build_minutes_tables, RoutesClient};
pub use worker::{AssignmentSink, PollWorker, TickOutcome};
