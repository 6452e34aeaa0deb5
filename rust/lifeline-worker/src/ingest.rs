// rust/lifeline-worker/src/ingest.rs
// Input ingestion: store-backed and HTTP-backed readers behind one seam

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use tracing::warn;

use lifeline_core::{Ambulance, ApiIngestionConfig, DomainError, Hospital, Patient};
use lifeline_store::StoreReader;

use crate::error::IngestError;

/// Records requested per resource in one read.
const PAGE_LIMIT: usize = 1000;

/// Source of the three input collections.
///
/// Each call returns a finite sequence whose order is stable within a tick.
/// Transient failures propagate and abort the current tick only.
#[async_trait]
pub trait DataIngestor: Send + Sync {
    async fn hospitals(&self) -> Result<Vec<Hospital>, IngestError>;
    async fn patients(&self) -> Result<Vec<Patient>, IngestError>;
    async fn ambulances(&self) -> Result<Vec<Ambulance>, IngestError>;
}

/// Direct reads against the shared store (`ingestion.type: db`).
pub struct StoreIngestor {
    reader: StoreReader,
}

impl StoreIngestor {
    pub fn new(reader: StoreReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl DataIngestor for StoreIngestor {
    async fn hospitals(&self) -> Result<Vec<Hospital>, IngestError> {
        Ok(self.reader.hospitals().await?)
    }

    async fn patients(&self) -> Result<Vec<Patient>, IngestError> {
        Ok(self.reader.patients().await?)
    }

    async fn ambulances(&self) -> Result<Vec<Ambulance>, IngestError> {
        Ok(self.reader.ambulances().await?)
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ItemsEnvelope<T> {
    Wrapped { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ItemsEnvelope<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ItemsEnvelope::Wrapped { items } => items,
            ItemsEnvelope::Bare(items) => items,
        }
    }
}

/// Reads from a remote read-only input API (`ingestion.type: api`).
///
/// Requests carry a bearer credential and ask for up to 1000 records per
/// resource; responses may wrap the collection in an `items` envelope or
/// return a bare array.
pub struct ApiIngestor {
    client: reqwest::Client,
    base_url: String,
}

impl ApiIngestor {
    pub fn new(config: &ApiIngestionConfig, timeout: Duration) -> Result<Self, IngestError> {
        let mut headers = header::HeaderMap::new();
        let mut auth =
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose()))
                .map_err(|_| {
                    IngestError::Decode("api key is not a valid header value".to_string())
                })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, IngestError> {
        let url = format!("{}/{resource}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("limit", PAGE_LIMIT)])
            .send()
            .await?
            .error_for_status()?;
        let envelope: ItemsEnvelope<T> = response.json().await?;
        Ok(envelope.into_items())
    }
}

#[async_trait]
impl DataIngestor for ApiIngestor {
    async fn hospitals(&self) -> Result<Vec<Hospital>, IngestError> {
        Ok(keep_valid(
            self.fetch("hospitals").await?,
            Hospital::validate,
        ))
    }

    async fn patients(&self) -> Result<Vec<Patient>, IngestError> {
        Ok(keep_valid(self.fetch("patients").await?, Patient::validate))
    }

    async fn ambulances(&self) -> Result<Vec<Ambulance>, IngestError> {
        Ok(keep_valid(
            self.fetch("ambulances").await?,
            Ambulance::validate,
        ))
    }
}

fn keep_valid<T>(items: Vec<T>, validate: fn(&T) -> Result<(), DomainError>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match validate(&item) {
            Ok(()) => Some(item),
            Err(err) => {
                warn!(%err, "skipping ingested record that violates invariants");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeline_core::Secret;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ingestor(server: &MockServer) -> ApiIngestor {
        let config = ApiIngestionConfig {
            host: server.uri(),
            api_key: Secret::new("test-key"),
        };
        ApiIngestor::new(&config, Duration::from_secs(5)).expect("build ingestor")
    }

    #[tokio::test]
    async fn sends_bearer_credential_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hospitals"))
            .and(header("Authorization", "Bearer test-key"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "total": 0,
                "limit": 1000,
                "offset": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hospitals = ingestor(&server).hospitals().await.expect("fetch");
        assert!(hospitals.is_empty());
    }

    #[tokio::test]
    async fn unwraps_items_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "5f8f6a2e-52dc-4f9e-a1a1-94be30d867b2",
                    "lat": 38.7,
                    "lon": -9.1,
                    "treatment_deadline_minutes": 45,
                    "registered_at": "2024-05-01T12:00:00Z"
                }],
                "total": 1,
                "limit": 1000,
                "offset": 0
            })))
            .mount(&server)
            .await;

        let patients = ingestor(&server).patients().await.expect("fetch");
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].treatment_deadline_minutes, 45);
    }

    #[tokio::test]
    async fn accepts_bare_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ambulances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "6f8f6a2e-52dc-4f9e-a1a1-94be30d867b2",
                "lat": 38.7,
                "lon": -9.1
            }])))
            .mount(&server)
            .await;

        let ambulances = ingestor(&server).ambulances().await.expect("fetch");
        assert_eq!(ambulances.len(), 1);
        assert_eq!(ambulances[0].assigned_patient_id, None);
    }

    #[tokio::test]
    async fn server_errors_propagate_as_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hospitals"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = ingestor(&server).hospitals().await.unwrap_err();
        assert!(matches!(err, IngestError::Http(_)));
    }

    #[tokio::test]
    async fn invariant_violations_are_skipped_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hospitals"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": "7f8f6a2e-52dc-4f9e-a1a1-94be30d867b2",
                        "name": "Good",
                        "bed_capacity": 5,
                        "used_beds": 1,
                        "lat": 38.7,
                        "lon": -9.1
                    },
                    {
                        "id": "8f8f6a2e-52dc-4f9e-a1a1-94be30d867b2",
                        "name": "Overfull",
                        "bed_capacity": 2,
                        "used_beds": 9,
                        "lat": 38.7,
                        "lon": -9.1
                    }
                ]
            })))
            .mount(&server)
            .await;

        let hospitals = ingestor(&server).hospitals().await.expect("fetch");
        assert_eq!(hospitals.len(), 1, "invalid record is dropped");
        assert_eq!(hospitals[0].name.as_deref(), Some("Good"));
    }
}
