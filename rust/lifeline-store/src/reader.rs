// rust/lifeline-store/src/reader.rs
// Bounded, ordered reads of the input collections and stored assignments

use sqlx::PgPool;
use tracing::warn;

use lifeline_core::{Ambulance, Hospital, Patient, PatientAssignment};

use crate::rows::{AmbulanceRow, AssignmentRow, HospitalRow, PatientRow, RowError};

/// Upper bound on rows fetched per input resource in one tick.
pub const INPUT_READ_LIMIT: i64 = 1000;

/// One page of a collection plus the unpaged total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Read-only access to the shared store.
///
/// Ordering is by id, so a snapshot is stable within a tick regardless of
/// row update order in the store.
#[derive(Clone)]
pub struct StoreReader {
    pool: PgPool,
}

impl StoreReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn hospitals(&self) -> Result<Vec<Hospital>, sqlx::Error> {
        Ok(self.hospitals_page(INPUT_READ_LIMIT, 0).await?.items)
    }

    pub async fn patients(&self) -> Result<Vec<Patient>, sqlx::Error> {
        Ok(self.patients_page(INPUT_READ_LIMIT, 0).await?.items)
    }

    pub async fn ambulances(&self) -> Result<Vec<Ambulance>, sqlx::Error> {
        Ok(self.ambulances_page(INPUT_READ_LIMIT, 0).await?.items)
    }

    pub async fn hospitals_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Page<Hospital>, sqlx::Error> {
        let rows: Vec<HospitalRow> = sqlx::query_as(
            "SELECT id, name, bed_capacity, used_beds, lat, lon \
             FROM hospitals ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = self.count("hospitals").await?;
        Ok(Page {
            items: keep_valid(rows, HospitalRow::into_domain),
            total,
        })
    }

    pub async fn patients_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Page<Patient>, sqlx::Error> {
        let rows: Vec<PatientRow> = sqlx::query_as(
            "SELECT id, lat, lon, treatment_deadline_minutes, registered_at \
             FROM patients ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = self.count("patients").await?;
        Ok(Page {
            items: keep_valid(rows, PatientRow::into_domain),
            total,
        })
    }

    pub async fn ambulances_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Page<Ambulance>, sqlx::Error> {
        let rows: Vec<AmbulanceRow> = sqlx::query_as(
            "SELECT id, lat, lon, assigned_patient_id \
             FROM ambulances ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = self.count("ambulances").await?;
        Ok(Page {
            items: keep_valid(rows, AmbulanceRow::into_domain),
            total,
        })
    }

    pub async fn assignments_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Page<PatientAssignment>, sqlx::Error> {
        let rows: Vec<AssignmentRow> = sqlx::query_as(
            "SELECT id, patient_id, hospital_id, ambulance_id, estimated_travel_minutes, \
             deadline_slack_minutes, treatment_deadline_minutes, patient_registered_at, \
             requires_urgent_transport, optimized_at \
             FROM patient_assignments ORDER BY patient_id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = self.count("patient_assignments").await?;
        Ok(Page {
            items: keep_valid(rows, AssignmentRow::into_domain),
            total,
        })
    }

    async fn count(&self, table: &str) -> Result<i64, sqlx::Error> {
        // Table names come from the fixed set above, never from callers.
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

fn keep_valid<R, T>(rows: Vec<R>, convert: fn(R) -> Result<T, RowError>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match convert(row) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(%err, "skipping stored record that violates invariants");
                None
            }
        })
        .collect()
}
