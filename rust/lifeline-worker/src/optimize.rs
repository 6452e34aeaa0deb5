// rust/lifeline-worker/src/optimize.rs
// Feasibility filtering and result assembly around the MILP solve

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use uuid::Uuid;

use lifeline_core::{
    Ambulance, AmbulanceIdx, Hospital, HospitalIdx, MinutesTables, OptimizationResult, Patient,
    PatientAssignment, PatientIdx,
};

use crate::error::SolveError;
use crate::solver::{self, FeasibleTriple, TripleKey};

/// Enumerate the feasible (patient, ambulance, hospital) triples.
///
/// A triple survives when the hospital has a free bed, the oracle produced
/// durations for both legs, and the speed-adjusted travel time leaves
/// strictly positive slack against the patient's deadline. The weight is
/// `1 / slack`: the tighter the deadline, the more the solver wants it.
pub fn enumerate_feasible(
    tables: &MinutesTables,
    hospitals: &[Hospital],
    patients: &[Patient],
    ambulances: &[Ambulance],
    speed_factor: f64,
) -> BTreeMap<TripleKey, FeasibleTriple> {
    let mut feasible = BTreeMap::new();
    for (p_index, patient) in patients.iter().enumerate() {
        for (h_index, hospital) in hospitals.iter().enumerate() {
            if hospital.free_beds() == 0 {
                continue;
            }
            for a_index in 0..ambulances.len() {
                let Some(to_patient) = tables
                    .ambulance_to_patient
                    .get(&(AmbulanceIdx(a_index), PatientIdx(p_index)))
                else {
                    continue;
                };
                let Some(to_hospital) = tables
                    .patient_to_hospital
                    .get(&(PatientIdx(p_index), HospitalIdx(h_index)))
                else {
                    continue;
                };

                let raw_minutes = to_patient + to_hospital;
                let travel_minutes = (f64::from(raw_minutes) / speed_factor).round() as i64;
                let slack = i64::from(patient.treatment_deadline_minutes) - travel_minutes;
                if slack <= 0 {
                    // Zero slack is infeasible, and keeps 1/slack defined.
                    continue;
                }
                feasible.insert(
                    (PatientIdx(p_index), AmbulanceIdx(a_index), HospitalIdx(h_index)),
                    FeasibleTriple {
                        travel_minutes: travel_minutes as u32,
                        weight: 1.0 / slack as f64,
                    },
                );
            }
        }
    }
    feasible
}

/// Run one full optimization pass over a tick's snapshot.
///
/// Every input patient gets exactly one output assignment: a proper
/// three-way match for the solver's chosen triples, an urgent-transport
/// fallback for everyone else.
pub fn optimize_allocation(
    tables: &MinutesTables,
    hospitals: &[Hospital],
    patients: &[Patient],
    ambulances: &[Ambulance],
    speed_factor: f64,
) -> Result<OptimizationResult, SolveError> {
    let optimized_at = Utc::now();

    let free_beds: Vec<u32> = hospitals.iter().map(Hospital::free_beds).collect();
    let total_capacity: i64 = free_beds.iter().map(|&beds| i64::from(beds)).sum();
    let capacity_shortfall = (patients.len() as i64 - total_capacity).max(0) as u32;
    let ambulance_shortfall = patients.len().saturating_sub(ambulances.len()) as u32;

    let feasible = enumerate_feasible(tables, hospitals, patients, ambulances, speed_factor);
    let chosen = solver::solve(&feasible, patients.len(), ambulances.len(), &free_beds)?;

    let mut assignments = Vec::with_capacity(patients.len());
    let mut assigned: BTreeSet<Uuid> = BTreeSet::new();
    for key in &chosen {
        let (PatientIdx(p), AmbulanceIdx(a), HospitalIdx(h)) = *key;
        let triple = feasible[key];
        let patient = &patients[p];
        assignments.push(PatientAssignment {
            patient_id: patient.id,
            hospital_id: Some(hospitals[h].id),
            ambulance_id: Some(ambulances[a].id),
            estimated_travel_minutes: Some(triple.travel_minutes),
            deadline_slack_minutes: Some(
                i64::from(patient.treatment_deadline_minutes) - i64::from(triple.travel_minutes),
            ),
            treatment_deadline_minutes: patient.treatment_deadline_minutes,
            patient_registered_at: patient.registered_at,
            requires_urgent_transport: false,
            optimized_at,
        });
        assigned.insert(patient.id);
    }

    let max_lives_saved = assigned.len() as u32;
    let mut unassigned_patient_ids = Vec::new();
    for patient in patients {
        if assigned.contains(&patient.id) {
            continue;
        }
        unassigned_patient_ids.push(patient.id);
        assignments.push(PatientAssignment {
            patient_id: patient.id,
            hospital_id: None,
            ambulance_id: None,
            estimated_travel_minutes: None,
            // Nominal slack: no transport is scheduled for this patient.
            deadline_slack_minutes: Some(i64::from(patient.treatment_deadline_minutes)),
            treatment_deadline_minutes: patient.treatment_deadline_minutes,
            patient_registered_at: patient.registered_at,
            requires_urgent_transport: true,
            optimized_at,
        });
    }

    Ok(OptimizationResult {
        assignments,
        unassigned_patient_ids,
        max_lives_saved,
        capacity_shortfall,
        ambulance_shortfall,
    })
}
