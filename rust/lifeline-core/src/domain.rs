// rust/lifeline-core/src/domain.rs
// Domain model for the assignment engine
// Input entities are immutable per-tick snapshots owned by the upstream store

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Record-level invariant violation on an ingested entity.
///
/// These are data-quality errors: the reader logs them and drops the
/// offending record for the current tick instead of aborting.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("hospital {id}: used_beds ({used_beds}) exceeds bed_capacity ({bed_capacity})")]
    BedsOverCapacity {
        id: Uuid,
        used_beds: u32,
        bed_capacity: u32,
    },

    #[error("patient {id}: treatment_deadline_minutes must be positive")]
    NonPositiveDeadline { id: Uuid },

    #[error("{entity} {id}: coordinates ({lat}, {lon}) out of range")]
    CoordinatesOutOfRange {
        entity: &'static str,
        id: Uuid,
        lat: f64,
        lon: f64,
    },
}

fn coordinates_valid(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Hospital with remaining bed capacity and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub bed_capacity: u32,
    #[serde(default)]
    pub used_beds: u32,
    pub lat: f64,
    pub lon: f64,
}

impl Hospital {
    /// Beds still available for new assignments.
    pub fn free_beds(&self) -> u32 {
        self.bed_capacity.saturating_sub(self.used_beds)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.used_beds > self.bed_capacity {
            return Err(DomainError::BedsOverCapacity {
                id: self.id,
                used_beds: self.used_beds,
                bed_capacity: self.bed_capacity,
            });
        }
        if !coordinates_valid(self.lat, self.lon) {
            return Err(DomainError::CoordinatesOutOfRange {
                entity: "hospital",
                id: self.id,
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }
}

/// Patient with location and a medical time-to-hospital budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub lat: f64,
    pub lon: f64,
    pub treatment_deadline_minutes: u32,
    pub registered_at: DateTime<Utc>,
}

impl Patient {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.treatment_deadline_minutes == 0 {
            return Err(DomainError::NonPositiveDeadline { id: self.id });
        }
        if !coordinates_valid(self.lat, self.lon) {
            return Err(DomainError::CoordinatesOutOfRange {
                entity: "patient",
                id: self.id,
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }
}

/// Ambulance with location. `assigned_patient_id` is informational for
/// downstream dashboards; the optimizer never consults it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambulance {
    pub id: Uuid,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub assigned_patient_id: Option<Uuid>,
}

impl Ambulance {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !coordinates_valid(self.lat, self.lon) {
            return Err(DomainError::CoordinatesOutOfRange {
                entity: "ambulance",
                id: self.id,
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }
}

/// Zero-based offset into the current tick's patient list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatientIdx(pub usize);

/// Zero-based offset into the current tick's hospital list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HospitalIdx(pub usize);

/// Zero-based offset into the current tick's ambulance list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmbulanceIdx(pub usize);

/// Single route matrix element with duration in whole minutes (>= 1).
///
/// Indices are in the coordinate space of the sequences handed to the
/// matrix builder, not of any oracle-side request chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatrixEntry {
    pub origin_index: usize,
    pub destination_index: usize,
    pub duration_minutes: u32,
}

/// Travel-time tables for one optimization tick.
///
/// A missing key means the oracle reported no usable route for the pair;
/// the pair is infeasible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinutesTables {
    pub ambulance_to_patient: BTreeMap<(AmbulanceIdx, PatientIdx), u32>,
    pub patient_to_hospital: BTreeMap<(PatientIdx, HospitalIdx), u32>,
}

/// Optimization output for a single patient.
///
/// Either a concrete three-way match (`requires_urgent_transport == false`,
/// all ids populated, slack > 0) or an urgent-fallback placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAssignment {
    pub patient_id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub ambulance_id: Option<Uuid>,
    pub estimated_travel_minutes: Option<u32>,
    pub deadline_slack_minutes: Option<i64>,
    pub treatment_deadline_minutes: u32,
    pub patient_registered_at: DateTime<Utc>,
    pub requires_urgent_transport: bool,
    pub optimized_at: DateTime<Utc>,
}

/// Full result of one optimization tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub assignments: Vec<PatientAssignment>,
    pub unassigned_patient_ids: Vec<Uuid>,
    pub max_lives_saved: u32,
    pub capacity_shortfall: u32,
    pub ambulance_shortfall: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn hospital(bed_capacity: u32, used_beds: u32) -> Hospital {
        Hospital {
            id: Uuid::new_v4(),
            name: Some("General".to_string()),
            bed_capacity,
            used_beds,
            lat: 38.72,
            lon: -9.14,
        }
    }

    #[test]
    fn hospital_within_capacity_is_valid() {
        assert!(hospital(10, 10).validate().is_ok());
        assert_eq!(hospital(10, 4).free_beds(), 6);
    }

    #[test]
    fn hospital_over_capacity_is_rejected() {
        let err = hospital(2, 3).validate().unwrap_err();
        assert!(matches!(err, DomainError::BedsOverCapacity { .. }));
    }

    #[test]
    fn full_hospital_has_no_free_beds() {
        assert_eq!(hospital(3, 3).free_beds(), 0);
    }

    #[test_case(91.0, 0.0; "latitude above range")]
    #[test_case(-90.5, 0.0; "latitude below range")]
    #[test_case(0.0, 180.5; "longitude above range")]
    #[test_case(0.0, -181.0; "longitude below range")]
    fn out_of_range_coordinates_are_rejected(lat: f64, lon: f64) {
        let mut h = hospital(1, 0);
        h.lat = lat;
        h.lon = lon;
        assert!(matches!(
            h.validate().unwrap_err(),
            DomainError::CoordinatesOutOfRange { .. }
        ));
    }

    #[test]
    fn boundary_coordinates_are_valid() {
        let mut h = hospital(1, 0);
        h.lat = -90.0;
        h.lon = 180.0;
        assert!(h.validate().is_ok());
    }

    #[test]
    fn zero_deadline_patient_is_rejected() {
        let patient = Patient {
            id: Uuid::new_v4(),
            lat: 0.0,
            lon: 0.0,
            treatment_deadline_minutes: 0,
            registered_at: Utc::now(),
        };
        assert!(matches!(
            patient.validate().unwrap_err(),
            DomainError::NonPositiveDeadline { .. }
        ));
    }

    #[test]
    fn ambulance_assigned_patient_is_optional() {
        let json = r#"{"id":"1f8f6a2e-52dc-4f9e-a1a1-94be30d867b2","lat":1.0,"lon":2.0}"#;
        let ambulance: Ambulance = serde_json::from_str(json).expect("deserialize");
        assert_eq!(ambulance.assigned_patient_id, None);
        assert!(ambulance.validate().is_ok());
    }
}
