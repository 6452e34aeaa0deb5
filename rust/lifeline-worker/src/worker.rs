// rust/lifeline-worker/src/worker.rs
// Poll loop: fetch -> fingerprint -> decide -> solve -> publish -> advance -> sleep
// One tick in flight at a time; transient errors skip the tick, fatal errors stop the loop

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use lifeline_core::{fingerprint_inputs, OptimizationResult};

use crate::error::WorkerError;
use crate::ingest::DataIngestor;
use crate::optimize;
use crate::routes::{build_minutes_tables, RoutesClient};

/// Destination for a tick's optimization result.
#[async_trait]
pub trait AssignmentSink: Send + Sync {
    async fn publish(&self, result: &OptimizationResult) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl AssignmentSink for lifeline_store::AssignmentWriter {
    async fn publish(&self, result: &OptimizationResult) -> Result<(), sqlx::Error> {
        self.replace_assignments(result).await
    }
}

/// What a completed tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Inputs fingerprint-identical to the previous run; nothing solved.
    Unchanged,
    /// Inputs changed but at least one collection is empty. The fingerprint
    /// still advances so a persistently empty state logs once, not per tick.
    SkippedEmpty,
    /// A result was solved and published; the fingerprint advanced.
    Published {
        assignments: usize,
        max_lives_saved: u32,
        unassigned: usize,
    },
}

pub struct PollWorker {
    ingestor: Box<dyn DataIngestor>,
    routes: RoutesClient,
    sink: Box<dyn AssignmentSink>,
    speed_factor: f64,
    poll_interval: Duration,
    last_fingerprint: Option<String>,
    ticks: u64,
}

impl PollWorker {
    pub fn new(
        ingestor: Box<dyn DataIngestor>,
        routes: RoutesClient,
        sink: Box<dyn AssignmentSink>,
        speed_factor: f64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ingestor,
            routes,
            sink,
            speed_factor,
            poll_interval,
            last_fingerprint: None,
            ticks: 0,
        }
    }

    /// Drive the pipeline until `shutdown` resolves.
    ///
    /// Shutdown wins races against the tick and the sleep; a cancelled tick
    /// drops its in-flight futures, which rolls back any open publish
    /// transaction and leaves the fingerprint unadvanced.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), WorkerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown signal received, stopping worker");
                    return Ok(());
                }
                tick = self.tick() => match tick {
                    Ok(_) => {}
                    Err(err) if err.is_transient() => {
                        warn!(tick = self.ticks, %err, "tick aborted, retrying next interval");
                    }
                    Err(err) => {
                        error!(tick = self.ticks, %err, "fatal worker error");
                        return Err(err);
                    }
                }
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown signal received, stopping worker");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Execute one tick against a fresh input snapshot.
    pub async fn tick(&mut self) -> Result<TickOutcome, WorkerError> {
        self.ticks += 1;
        let tick = self.ticks;

        let hospitals = self.ingestor.hospitals().await?;
        let patients = self.ingestor.patients().await?;
        let ambulances = self.ingestor.ambulances().await?;

        let fingerprint = fingerprint_inputs(&hospitals, &patients, &ambulances)?;
        let hash = fingerprint[..8].to_string();

        if self.last_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            debug!(tick, hash, "inputs unchanged, skipping optimization");
            return Ok(TickOutcome::Unchanged);
        }

        if hospitals.is_empty() || patients.is_empty() || ambulances.is_empty() {
            info!(
                tick,
                hash,
                hospitals = hospitals.len(),
                patients = patients.len(),
                ambulances = ambulances.len(),
                "inputs changed but incomplete, skipping optimization"
            );
            self.last_fingerprint = Some(fingerprint);
            return Ok(TickOutcome::SkippedEmpty);
        }

        let tables = build_minutes_tables(&self.routes, &patients, &hospitals, &ambulances).await?;
        let result = optimize::optimize_allocation(
            &tables,
            &hospitals,
            &patients,
            &ambulances,
            self.speed_factor,
        )?;

        self.sink
            .publish(&result)
            .await
            .map_err(WorkerError::Publish)?;
        self.last_fingerprint = Some(fingerprint);

        info!(
            tick,
            hash,
            assignments = result.assignments.len(),
            max_lives_saved = result.max_lives_saved,
            unassigned = result.unassigned_patient_ids.len(),
            capacity_shortfall = result.capacity_shortfall,
            "optimization published"
        );
        Ok(TickOutcome::Published {
            assignments: result.assignments.len(),
            max_lives_saved: result.max_lives_saved,
            unassigned: result.unassigned_patient_ids.len(),
        })
    }
}
