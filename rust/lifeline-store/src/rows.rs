// rust/lifeline-store/src/rows.rs
// Row types for the shared store and their conversions into domain entities

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use lifeline_core::{Ambulance, DomainError, Hospital, Patient, PatientAssignment};

/// A stored row that cannot become a valid domain entity.
///
/// Readers treat these as data-quality problems: log and skip the record
/// for the current tick rather than aborting the read.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{entity} {id}: column {column} holds a negative count")]
    NegativeCount {
        entity: &'static str,
        id: Uuid,
        column: &'static str,
    },
}

fn count(
    value: i32,
    entity: &'static str,
    id: Uuid,
    column: &'static str,
) -> Result<u32, RowError> {
    u32::try_from(value).map_err(|_| RowError::NegativeCount { entity, id, column })
}

#[derive(Debug, Clone, FromRow)]
pub struct HospitalRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub bed_capacity: i32,
    pub used_beds: i32,
    pub lat: f64,
    pub lon: f64,
}

impl HospitalRow {
    pub fn into_domain(self) -> Result<Hospital, RowError> {
        let hospital = Hospital {
            id: self.id,
            name: self.name,
            bed_capacity: count(self.bed_capacity, "hospital", self.id, "bed_capacity")?,
            used_beds: count(self.used_beds, "hospital", self.id, "used_beds")?,
            lat: self.lat,
            lon: self.lon,
        };
        hospital.validate()?;
        Ok(hospital)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PatientRow {
    pub id: Uuid,
    pub lat: f64,
    pub lon: f64,
    pub treatment_deadline_minutes: i32,
    pub registered_at: DateTime<Utc>,
}

impl PatientRow {
    pub fn into_domain(self) -> Result<Patient, RowError> {
        let patient = Patient {
            id: self.id,
            lat: self.lat,
            lon: self.lon,
            treatment_deadline_minutes: count(
                self.treatment_deadline_minutes,
                "patient",
                self.id,
                "treatment_deadline_minutes",
            )?,
            registered_at: self.registered_at,
        };
        patient.validate()?;
        Ok(patient)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AmbulanceRow {
    pub id: Uuid,
    pub lat: f64,
    pub lon: f64,
    pub assigned_patient_id: Option<Uuid>,
}

impl AmbulanceRow {
    pub fn into_domain(self) -> Result<Ambulance, RowError> {
        let ambulance = Ambulance {
            id: self.id,
            lat: self.lat,
            lon: self.lon,
            assigned_patient_id: self.assigned_patient_id,
        };
        ambulance.validate()?;
        Ok(ambulance)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub ambulance_id: Option<Uuid>,
    pub estimated_travel_minutes: Option<i32>,
    pub deadline_slack_minutes: Option<i64>,
    pub treatment_deadline_minutes: i32,
    pub patient_registered_at: DateTime<Utc>,
    pub requires_urgent_transport: bool,
    pub optimized_at: DateTime<Utc>,
}

impl AssignmentRow {
    pub fn into_domain(self) -> Result<PatientAssignment, RowError> {
        Ok(PatientAssignment {
            patient_id: self.patient_id,
            hospital_id: self.hospital_id,
            ambulance_id: self.ambulance_id,
            estimated_travel_minutes: self
                .estimated_travel_minutes
                .map(|minutes| {
                    count(minutes, "assignment", self.id, "estimated_travel_minutes")
                })
                .transpose()?,
            deadline_slack_minutes: self.deadline_slack_minutes,
            treatment_deadline_minutes: count(
                self.treatment_deadline_minutes,
                "assignment",
                self.id,
                "treatment_deadline_minutes",
            )?,
            patient_registered_at: self.patient_registered_at,
            requires_urgent_transport: self.requires_urgent_transport,
            optimized_at: self.optimized_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_bed_count_is_a_row_error() {
        let row = HospitalRow {
            id: Uuid::new_v4(),
            name: None,
            bed_capacity: -1,
            used_beds: 0,
            lat: 0.0,
            lon: 0.0,
        };
        assert!(matches!(
            row.into_domain().unwrap_err(),
            RowError::NegativeCount { column: "bed_capacity", .. }
        ));
    }

    #[test]
    fn over_capacity_row_surfaces_the_domain_error() {
        let row = HospitalRow {
            id: Uuid::new_v4(),
            name: None,
            bed_capacity: 2,
            used_beds: 5,
            lat: 0.0,
            lon: 0.0,
        };
        assert!(matches!(
            row.into_domain().unwrap_err(),
            RowError::Domain(DomainError::BedsOverCapacity { .. })
        ));
    }

    #[test]
    fn valid_patient_row_converts() {
        let row = PatientRow {
            id: Uuid::new_v4(),
            lat: 38.7,
            lon: -9.1,
            treatment_deadline_minutes: 45,
            registered_at: Utc::now(),
        };
        let patient = row.into_domain().expect("valid row");
        assert_eq!(patient.treatment_deadline_minutes, 45);
    }
}
