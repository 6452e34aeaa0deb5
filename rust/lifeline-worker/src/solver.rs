// rust/lifeline-worker/src/solver.rs
// 0/1 assignment program over the feasible triple set, solved with CBC

use std::collections::{BTreeMap, BTreeSet};

use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};

use lifeline_core::{AmbulanceIdx, HospitalIdx, PatientIdx};

use crate::error::SolveError;

pub type TripleKey = (PatientIdx, AmbulanceIdx, HospitalIdx);

/// A (patient, ambulance, hospital) combination that survived the
/// feasibility filter, tagged with its travel time and urgency weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeasibleTriple {
    pub travel_minutes: u32,
    pub weight: f64,
}

/// Maximize total urgency weight subject to at-most-once constraints.
///
/// Constraints:
/// * each patient is assigned at most once,
/// * each ambulance makes at most one trip,
/// * each hospital receives at most its free-bed count.
///
/// Entities without any feasible triple get no constraint row and cannot
/// cause solver errors. The empty feasible set skips the backend entirely.
///
/// Variables are created in `BTreeMap` key order and CBC runs its default
/// single-threaded search, so identical inputs select identical triples.
pub fn solve(
    feasible: &BTreeMap<TripleKey, FeasibleTriple>,
    patient_count: usize,
    ambulance_count: usize,
    free_beds: &[u32],
) -> Result<BTreeSet<TripleKey>, SolveError> {
    if feasible.is_empty() {
        return Ok(BTreeSet::new());
    }

    let mut vars = ProblemVariables::new();
    let assign: BTreeMap<TripleKey, Variable> = feasible
        .keys()
        .map(|key| (*key, vars.add(variable().binary())))
        .collect();

    let objective: Expression = feasible
        .iter()
        .map(|(key, triple)| triple.weight * assign[key])
        .sum();

    let mut model = vars.maximise(objective).using(coin_cbc);
    model.set_parameter("logLevel", "0");

    for patient in 0..patient_count {
        if let Some(total) = sum_matching(&assign, |key| key.0 == PatientIdx(patient)) {
            model = model.with(constraint!(total <= 1));
        }
    }
    for ambulance in 0..ambulance_count {
        if let Some(total) = sum_matching(&assign, |key| key.1 == AmbulanceIdx(ambulance)) {
            model = model.with(constraint!(total <= 1));
        }
    }
    for (hospital, beds) in free_beds.iter().enumerate() {
        if let Some(total) = sum_matching(&assign, |key| key.2 == HospitalIdx(hospital)) {
            let available = f64::from(*beds);
            model = model.with(constraint!(total <= available));
        }
    }

    let solution = model.solve()?;
    Ok(assign
        .into_iter()
        .filter(|(_, var)| solution.value(*var) > 0.5)
        .map(|(key, _)| key)
        .collect())
}

fn sum_matching<F>(assign: &BTreeMap<TripleKey, Variable>, matches: F) -> Option<Expression>
where
    F: Fn(&TripleKey) -> bool,
{
    let involved: Vec<Variable> = assign
        .iter()
        .filter(|(key, _)| matches(key))
        .map(|(_, var)| *var)
        .collect();
    if involved.is_empty() {
        None
    } else {
        Some(involved.into_iter().map(Expression::from).sum())
    }
}
