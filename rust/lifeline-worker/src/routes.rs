// rust/lifeline-worker/src/routes.rs
// Route matrix builder against the Google Routes computeRouteMatrix endpoint
// Chunks under the per-request element cap and re-indexes into the caller's space

use std::time::Duration;

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use lifeline_core::{
    Ambulance, AmbulanceIdx, Hospital, HospitalIdx, MinutesTables, Patient, PatientIdx,
    RouteMatrixEntry, RoutingConfig, RoutingPreference, Secret, TravelMode,
};

use crate::error::RoutesError;

/// Element cap per request. The oracle allows at most 100 elements when a
/// traffic-aware routing preference is in effect.
const MAX_MATRIX_ELEMENTS: usize = 100;

const DEFAULT_BASE_URL: &str = "https://routes.googleapis.com";

const FIELD_MASK: &str = "originIndex,destinationIndex,duration,distanceMeters,status";

#[derive(Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLng,
}

#[derive(Serialize)]
struct Waypoint {
    location: Location,
}

#[derive(Serialize)]
struct MatrixEndpoint {
    waypoint: Waypoint,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRouteMatrixRequest {
    origins: Vec<MatrixEndpoint>,
    destinations: Vec<MatrixEndpoint>,
    travel_mode: TravelMode,
    routing_preference: RoutingPreference,
    departure_time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RpcStatus {
    code: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RouteMatrixElement {
    origin_index: usize,
    destination_index: usize,
    status: RpcStatus,
    duration: Option<String>,
}

fn endpoint(coord: &(f64, f64)) -> MatrixEndpoint {
    MatrixEndpoint {
        waypoint: Waypoint {
            location: Location {
                lat_lng: LatLng {
                    latitude: coord.0,
                    longitude: coord.1,
                },
            },
        },
    }
}

/// `"82s"` -> whole minutes, rounded up, never below 1.
fn parse_duration_minutes(raw: &str) -> Option<u32> {
    let seconds: f64 = raw.strip_suffix('s')?.parse().ok()?;
    Some((seconds / 60.0).ceil().max(1.0) as u32)
}

fn chunked(coords: &[(f64, f64)], size: usize) -> impl Iterator<Item = (usize, &[(f64, f64)])> {
    coords
        .chunks(size)
        .enumerate()
        .map(move |(index, chunk)| (index * size, chunk))
}

/// Client for the routing oracle.
pub struct RoutesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret,
    config: RoutingConfig,
}

impl RoutesClient {
    /// # Arguments
    /// * `api_key` - Oracle credential, sent per request.
    /// * `config` - Travel mode and routing preference.
    /// * `timeout` - Per-request deadline, derived from the poll interval so
    ///   a slow oracle cannot starve the loop.
    pub fn new(
        api_key: Secret,
        config: RoutingConfig,
        timeout: Duration,
    ) -> Result<Self, RoutesError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            config,
        })
    }

    /// Point the client at a different oracle endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Compute travel durations for the cross product of `origins` and
    /// `destinations`.
    ///
    /// Requests are chunked so no single call exceeds the element cap;
    /// returned indices are offset back into the input coordinate space.
    /// Pairs the oracle flags with a non-zero element status are absent
    /// from the output.
    pub async fn compute_route_matrix(
        &self,
        origins: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<RouteMatrixEntry>, RoutesError> {
        let mut entries = Vec::new();
        if origins.is_empty() || destinations.is_empty() {
            return Ok(entries);
        }

        let max_origins = origins.len().min(MAX_MATRIX_ELEMENTS).max(1);
        let max_destinations = (MAX_MATRIX_ELEMENTS / max_origins).max(1);

        for (origin_base, origin_chunk) in chunked(origins, max_origins) {
            for (destination_base, destination_chunk) in chunked(destinations, max_destinations) {
                let elements = self.request_chunk(origin_chunk, destination_chunk).await?;
                for element in elements {
                    if element.status.code != 0 {
                        // Element-level failure: the pair is infeasible.
                        continue;
                    }
                    let Some(minutes) = element
                        .duration
                        .as_deref()
                        .and_then(parse_duration_minutes)
                    else {
                        continue;
                    };
                    entries.push(RouteMatrixEntry {
                        origin_index: origin_base + element.origin_index,
                        destination_index: destination_base + element.destination_index,
                        duration_minutes: minutes,
                    });
                }
            }
        }
        Ok(entries)
    }

    async fn request_chunk(
        &self,
        origins: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<RouteMatrixElement>, RoutesError> {
        let request = ComputeRouteMatrixRequest {
            origins: origins.iter().map(endpoint).collect(),
            destinations: destinations.iter().map(endpoint).collect(),
            travel_mode: self.config.travel_mode,
            routing_preference: self.config.routing_preference,
            // The oracle rejects departure times in the past.
            departure_time: (Utc::now() + ChronoDuration::seconds(30))
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        let response = self
            .http
            .post(format!("{}/distanceMatrix/v2:computeRouteMatrix", self.base_url))
            .header("X-Goog-Api-Key", self.api_key.expose())
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RoutesError::Api { status, body });
        }

        response
            .json::<Vec<RouteMatrixElement>>()
            .await
            .map_err(|err| RoutesError::Decode(err.to_string()))
    }
}

/// Build the two per-tick duration tables: ambulance -> patient and
/// patient -> hospital.
pub async fn build_minutes_tables(
    client: &RoutesClient,
    patients: &[Patient],
    hospitals: &[Hospital],
    ambulances: &[Ambulance],
) -> Result<MinutesTables, RoutesError> {
    let patient_coords: Vec<(f64, f64)> = patients.iter().map(|p| (p.lat, p.lon)).collect();
    let hospital_coords: Vec<(f64, f64)> = hospitals.iter().map(|h| (h.lat, h.lon)).collect();
    let ambulance_coords: Vec<(f64, f64)> = ambulances.iter().map(|a| (a.lat, a.lon)).collect();

    let patient_to_hospital = client
        .compute_route_matrix(&patient_coords, &hospital_coords)
        .await?;
    let ambulance_to_patient = client
        .compute_route_matrix(&ambulance_coords, &patient_coords)
        .await?;

    Ok(MinutesTables {
        ambulance_to_patient: ambulance_to_patient
            .into_iter()
            .map(|entry| {
                (
                    (
                        AmbulanceIdx(entry.origin_index),
                        PatientIdx(entry.destination_index),
                    ),
                    entry.duration_minutes,
                )
            })
            .collect(),
        patient_to_hospital: patient_to_hospital
            .into_iter()
            .map(|entry| {
                (
                    (
                        PatientIdx(entry.origin_index),
                        HospitalIdx(entry.destination_index),
                    ),
                    entry.duration_minutes,
                )
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use test_case::test_case;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    #[test_case("82s", 2; "rounds up to whole minutes")]
    #[test_case("60s", 1; "exact minute")]
    #[test_case("61s", 2; "one second over")]
    #[test_case("20s", 1; "short hops clamp to one minute")]
    #[test_case("0s", 1; "zero clamps to one minute")]
    #[test_case("3600s", 60; "one hour")]
    fn duration_conversion(raw: &str, expected: u32) {
        assert_eq!(parse_duration_minutes(raw), Some(expected));
    }

    #[test]
    fn malformed_durations_are_dropped() {
        assert_eq!(parse_duration_minutes("82"), None);
        assert_eq!(parse_duration_minutes("fast"), None);
    }

    async fn client(server: &MockServer) -> RoutesClient {
        RoutesClient::new(
            Secret::new("maps-key"),
            RoutingConfig::default(),
            Duration::from_secs(5),
        )
        .expect("build client")
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn single_request_matrix_drops_failed_elements() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/distanceMatrix/v2:computeRouteMatrix"))
            .and(header("X-Goog-Api-Key", "maps-key"))
            .and(header("X-Goog-FieldMask", FIELD_MASK))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"originIndex": 0, "destinationIndex": 0, "status": {}, "duration": "720s", "distanceMeters": 9000},
                {"originIndex": 0, "destinationIndex": 1, "status": {"code": 5, "message": "NOT_FOUND"}, "duration": "1200s"},
                {"originIndex": 1, "destinationIndex": 0, "status": {}, "duration": "900s", "distanceMeters": 11000}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client(&server)
            .await
            .compute_route_matrix(&[(0.0, 0.0), (1.0, 1.0)], &[(2.0, 2.0), (3.0, 3.0)])
            .await
            .expect("matrix");

        assert_eq!(
            entries,
            vec![
                RouteMatrixEntry {
                    origin_index: 0,
                    destination_index: 0,
                    duration_minutes: 12
                },
                RouteMatrixEntry {
                    origin_index: 1,
                    destination_index: 0,
                    duration_minutes: 15
                },
            ]
        );

        // Departure time must be in the future when the request was built.
        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let departure = chrono::DateTime::parse_from_rfc3339(
            body["departureTime"].as_str().unwrap(),
        )
        .unwrap();
        assert!(departure > Utc::now());
        assert_eq!(body["travelMode"], "DRIVE");
        assert_eq!(body["routingPreference"], "TRAFFIC_AWARE_OPTIMAL");
    }

    /// Answers each chunk by decoding the global origin/destination index
    /// from the coordinates, so merged results can be checked against the
    /// full cross product.
    struct MatrixResponder;

    impl Respond for MatrixResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let origins = body["origins"].as_array().unwrap();
            let destinations = body["destinations"].as_array().unwrap();
            assert!(
                origins.len() * destinations.len() <= MAX_MATRIX_ELEMENTS,
                "request exceeds the oracle element cap"
            );

            let mut elements = Vec::new();
            for (origin_index, origin) in origins.iter().enumerate() {
                let lat = origin["waypoint"]["location"]["latLng"]["latitude"]
                    .as_f64()
                    .unwrap();
                let global_origin = (lat / 0.01).round() as usize;
                for (destination_index, destination) in destinations.iter().enumerate() {
                    let lon = destination["waypoint"]["location"]["latLng"]["longitude"]
                        .as_f64()
                        .unwrap();
                    let global_destination = (lon / 0.01).round() as usize;
                    let seconds = (global_origin * 100 + global_destination + 1) * 60;
                    elements.push(json!({
                        "originIndex": origin_index,
                        "destinationIndex": destination_index,
                        "status": {},
                        "duration": format!("{seconds}s"),
                        "distanceMeters": 1000
                    }));
                }
            }
            ResponseTemplate::new(200).set_body_json(Value::Array(elements))
        }
    }

    #[tokio::test]
    async fn chunked_requests_preserve_global_indices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/distanceMatrix/v2:computeRouteMatrix"))
            .respond_with(MatrixResponder)
            .mount(&server)
            .await;

        // 15 origins x 10 destinations = 150 elements; with max_origins = 15
        // the destination chunk size is 100 / 15 = 6, so two requests.
        let origins: Vec<(f64, f64)> = (0..15).map(|i| (i as f64 * 0.01, 0.0)).collect();
        let destinations: Vec<(f64, f64)> = (0..10).map(|j| (0.0, j as f64 * 0.01)).collect();

        let entries = client(&server)
            .await
            .compute_route_matrix(&origins, &destinations)
            .await
            .expect("matrix");

        assert_eq!(entries.len(), 150, "every pair appears exactly once");
        for entry in &entries {
            assert_eq!(
                entry.duration_minutes as usize,
                entry.origin_index * 100 + entry.destination_index + 1,
                "indices must be offset back into the caller's coordinate space"
            );
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2, "cap of 100 elements forces two chunks");
    }

    #[tokio::test]
    async fn request_level_errors_abort() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/distanceMatrix/v2:computeRouteMatrix"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .compute_route_matrix(&[(0.0, 0.0)], &[(1.0, 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, RoutesError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn empty_inputs_short_circuit_without_requests() {
        let server = MockServer::start().await;
        let entries = client(&server)
            .await
            .compute_route_matrix(&[], &[(1.0, 1.0)])
            .await
            .expect("matrix");
        assert!(entries.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
