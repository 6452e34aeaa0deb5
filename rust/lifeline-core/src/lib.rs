// rust/lifeline-core/src/lib.rs
// Shared domain model, configuration, and observability for the Lifeline workspace

pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod logging;

pub use config::{
    ApiConfig, ApiIngestionConfig, ConfigError, DbConnectionConfig, IngestionConfig,
    LoggingConfig, RoutingConfig, RoutingPreference, Secret, TravelMode, WorkerConfig,
};
pub use domain::{
    Ambulance, AmbulanceIdx, DomainError, Hospital, HospitalIdx, MinutesTables,
    OptimizationResult, Patient, PatientAssignment, PatientIdx, RouteMatrixEntry,
};
pub use fingerprint::fingerprint_inputs;
pub use logging::{setup_logging, LogLevel};
