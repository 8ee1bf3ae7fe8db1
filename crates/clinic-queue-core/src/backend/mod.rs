//! Backend mutation API.
//!
//! Every mutation is a single request/response call. The terminal cache is
//! never touched here: the backend broadcasts the resulting change on the
//! push channel and the stores pick it up from there.

mod http;

pub use http::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Doctor, NewDoctor, NewPatient, Patient, PatientUpdate, StatusAck};

/// Backend call errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The server answered with an error status; `message` is its own text
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Server-provided message, if the server answered at all.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Remote endpoints consumed by the stores and the call sequencer.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_patient(&self, patient: &NewPatient) -> BackendResult<Patient>;

    async fn bulk_create_patients(&self, patients: &[NewPatient]) -> BackendResult<()>;

    async fn mark_arrived(&self, patient_id: &str) -> BackendResult<StatusAck>;

    async fn call_patient(&self, patient_id: &str) -> BackendResult<StatusAck>;

    async fn update_patient(&self, patient_id: &str, update: &PatientUpdate) -> BackendResult<()>;

    async fn remove_patient(&self, patient_id: &str) -> BackendResult<()>;

    /// Close the patient's cycle; the backend stamps `last_visit_date`.
    async fn archive_patient(&self, patient_id: &str) -> BackendResult<()>;

    async fn remove_all_patients(&self) -> BackendResult<()>;

    async fn create_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor>;

    async fn remove_doctor(&self, doctor_id: &str) -> BackendResult<()>;

    async fn update_doctor_last_patient(&self, doctor_id: &str, patient_name: &str) -> BackendResult<()>;

    /// Doctors on duty today.
    async fn fetch_active_doctors(&self) -> BackendResult<Vec<Doctor>>;

    /// Complete roster, including doctors not on duty.
    async fn fetch_all_doctors(&self) -> BackendResult<Vec<Doctor>>;

    /// Master list of doctor names used to validate imports.
    async fn fetch_doctor_names(&self) -> BackendResult<Vec<String>>;
}
