// rust/lifeline-store/src/writer.rs
// Transactional replacement of assignment rows, keyed by patient id

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use lifeline_core::OptimizationResult;

/// Publishes optimization results into `patient_assignments`.
pub struct AssignmentWriter {
    pool: PgPool,
}

impl AssignmentWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace all assignment rows for the patients present in `result`.
    ///
    /// Runs as a single transaction: delete the affected patient ids, insert
    /// the new rows, commit. A reader never observes a mix of old and new
    /// rows for the same patient. An empty result is a no-op; it must not
    /// wipe rows published by an earlier tick.
    pub async fn replace_assignments(
        &self,
        result: &OptimizationResult,
    ) -> Result<(), sqlx::Error> {
        if result.assignments.is_empty() {
            debug!("no assignments to publish, leaving stored rows untouched");
            return Ok(());
        }

        let patient_ids: Vec<Uuid> = result
            .assignments
            .iter()
            .map(|assignment| assignment.patient_id)
            .collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM patient_assignments WHERE patient_id = ANY($1)")
            .bind(&patient_ids)
            .execute(&mut *tx)
            .await?;

        let mut insert: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO patient_assignments (id, patient_id, hospital_id, ambulance_id, \
             estimated_travel_minutes, deadline_slack_minutes, treatment_deadline_minutes, \
             patient_registered_at, requires_urgent_transport, optimized_at) ",
        );
        insert.push_values(&result.assignments, |mut row, assignment| {
            row.push_bind(Uuid::new_v4())
                .push_bind(assignment.patient_id)
                .push_bind(assignment.hospital_id)
                .push_bind(assignment.ambulance_id)
                .push_bind(assignment.estimated_travel_minutes.map(|m| m as i32))
                .push_bind(assignment.deadline_slack_minutes)
                .push_bind(assignment.treatment_deadline_minutes as i32)
                .push_bind(assignment.patient_registered_at)
                .push_bind(assignment.requires_urgent_transport)
                .push_bind(assignment.optimized_at);
        });
        insert.build().execute(&mut *tx).await?;

        tx.commit().await?;
        debug!(
            rows = result.assignments.len(),
            "published assignment rows"
        );
        Ok(())
    }
}
