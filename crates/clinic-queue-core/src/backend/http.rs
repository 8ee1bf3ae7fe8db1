//! HTTP implementation of [`Backend`] over reqwest.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::{ConfigError, TerminalConfig};
use crate::models::{Doctor, NewDoctor, NewPatient, Patient, PatientUpdate, StatusAck};

use super::{Backend, BackendError, BackendResult};

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Error body shapes the backend uses.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// REST client for the clinic backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Build a client from terminal settings.
    pub fn new(config: &TerminalConfig) -> Result<Self, ConfigError> {
        let base = config.api_base()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidUrl(config.api_url.clone(), e.to_string()))?;

        tracing::info!(base = %base, "Created backend client");

        Ok(Self {
            client,
            base,
            token: config.api_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> BackendResult<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| BackendError::Transport(format!("Bad endpoint {}: {}", path, e)))?;

        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn check(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    text
                }
            });

        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> BackendResult<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> BackendResult<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

fn patient_path(patient_id: &str, action: Option<&str>) -> String {
    match action {
        Some(action) => format!("patients/{}/{}", patient_id, action),
        None => format!("patients/{}", patient_id),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_patient(&self, patient: &NewPatient) -> BackendResult<Patient> {
        let req = self.request(Method::POST, "patients")?.json(patient);
        self.send_json(req).await
    }

    async fn bulk_create_patients(&self, patients: &[NewPatient]) -> BackendResult<()> {
        let req = self.request(Method::POST, "patients/bulk")?.json(patients);
        self.send_empty(req).await
    }

    async fn mark_arrived(&self, patient_id: &str) -> BackendResult<StatusAck> {
        let req = self
            .request(Method::PUT, &patient_path(patient_id, Some("arrive")))?
            .json(&serde_json::json!({}));
        self.send_json(req).await
    }

    async fn call_patient(&self, patient_id: &str) -> BackendResult<StatusAck> {
        let req = self
            .request(Method::PUT, &patient_path(patient_id, Some("call")))?
            .json(&serde_json::json!({}));
        self.send_json(req).await
    }

    async fn update_patient(&self, patient_id: &str, update: &PatientUpdate) -> BackendResult<()> {
        let req = self
            .request(Method::PUT, &patient_path(patient_id, None))?
            .json(update);
        self.send_empty(req).await
    }

    async fn remove_patient(&self, patient_id: &str) -> BackendResult<()> {
        let req = self.request(Method::DELETE, &patient_path(patient_id, None))?;
        self.send_empty(req).await
    }

    async fn archive_patient(&self, patient_id: &str) -> BackendResult<()> {
        let req = self
            .request(Method::PUT, &patient_path(patient_id, Some("archive")))?
            .json(&serde_json::json!({}));
        self.send_empty(req).await
    }

    async fn remove_all_patients(&self) -> BackendResult<()> {
        let req = self.request(Method::DELETE, "patients")?;
        self.send_empty(req).await
    }

    async fn create_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor> {
        let req = self.request(Method::POST, "doctors")?.json(doctor);
        self.send_json(req).await
    }

    async fn remove_doctor(&self, doctor_id: &str) -> BackendResult<()> {
        let req = self.request(Method::DELETE, &format!("doctors/{}", doctor_id))?;
        self.send_empty(req).await
    }

    async fn update_doctor_last_patient(&self, doctor_id: &str, patient_name: &str) -> BackendResult<()> {
        let req = self
            .request(Method::PUT, &format!("doctors/{}/call", doctor_id))?
            .json(&serde_json::json!({ "last_patient": patient_name }));
        self.send_empty(req).await
    }

    async fn fetch_active_doctors(&self) -> BackendResult<Vec<Doctor>> {
        let req = self.request(Method::GET, "doctors/active-doctors")?;
        self.send_json(req).await
    }

    async fn fetch_all_doctors(&self) -> BackendResult<Vec<Doctor>> {
        let req = self.request(Method::GET, "doctors")?;
        self.send_json(req).await
    }

    async fn fetch_doctor_names(&self) -> BackendResult<Vec<String>> {
        let req = self.request(Method::GET, "doctors/doctor-list")?;
        self.send_json(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(patient_path("p1", Some("call")), "patients/p1/call");
        assert_eq!(patient_path("p1", None), "patients/p1");
    }

    #[test]
    fn test_join_under_base_path() {
        let backend = HttpBackend::new(&TerminalConfig::new("http://clinic.local:5000/api")).unwrap();
        let req = backend
            .request(Method::PUT, &patient_path("p1", Some("arrive")))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.url().as_str(), "http://clinic.local:5000/api/patients/p1/arrive");
        assert_eq!(req.method(), Method::PUT);
    }

    #[test]
    fn test_bearer_token_attached() {
        let mut config = TerminalConfig::new("http://clinic.local:5000");
        config.api_token = Some("abc".into());
        let backend = HttpBackend::new(&config).unwrap();
        let req = backend.request(Method::GET, "doctors").unwrap().build().unwrap();
        assert_eq!(
            req.headers().get("authorization").unwrap().to_str().unwrap(),
            "Bearer abc"
        );
    }

    #[test]
    fn test_error_body_aliases() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"Nessun medico"}"#).unwrap();
        assert_eq!(body.error, "Nessun medico");
        let body: ErrorBody = serde_json::from_str(r#"{"message":"non attivo"}"#).unwrap();
        assert_eq!(body.error, "non attivo");
    }
}
