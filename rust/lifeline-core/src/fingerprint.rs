// rust/lifeline-core/src/fingerprint.rs
// Canonical fingerprint of the (hospitals, patients, ambulances) input triple
// Reproducible bit-for-bit across processes: sort by id, canonical JSON, SHA-256

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{Ambulance, Hospital, Patient};

/// Compute the canonical fingerprint of one input snapshot.
///
/// Each collection is sorted by stable id, serialized to canonical JSON
/// (object keys in sorted order), and hashed together with SHA-256. The
/// result is independent of insertion order and float formatting locale.
///
/// # Returns
/// Lowercase hex digest, 64 characters.
pub fn fingerprint_inputs(
    hospitals: &[Hospital],
    patients: &[Patient],
    ambulances: &[Ambulance],
) -> Result<String, serde_json::Error> {
    let payload = serde_json::json!({
        "ambulances": canonical_values(ambulances, |a| a.id)?,
        "hospitals": canonical_values(hospitals, |h| h.id)?,
        "patients": canonical_values(patients, |p| p.id)?,
    });

    // serde_json's default map is BTreeMap-backed, so serialization emits
    // keys in sorted order without extra work.
    let encoded = serde_json::to_vec(&payload)?;
    Ok(hex::encode(Sha256::digest(&encoded)))
}

fn canonical_values<T, F>(items: &[T], id: F) -> Result<Vec<Value>, serde_json::Error>
where
    T: Serialize,
    F: Fn(&T) -> Uuid,
{
    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by_key(|item| id(item));
    ordered.into_iter().map(serde_json::to_value).collect()
}
