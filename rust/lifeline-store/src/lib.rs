// rust/lifeline-store/src/lib.rs
// Postgres access for the Lifeline workspace
// Input reads are bounded and ordered; assignment publishes are transactional

pub mod pool;
pub mod reader;
pub mod rows;
pub mod writer;

pub use pool::{check_connection, connect};
pub use reader::{Page, StoreReader, INPUT_READ_LIMIT};
pub use rows::{AmbulanceRow, AssignmentRow, HospitalRow, PatientRow, RowError};
pub use writer::AssignmentWriter;
