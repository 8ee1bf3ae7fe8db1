//! Clinic Queue Core Library
//!
//! Realtime patient-queue synchronization for clinic terminals (front desk,
//! doctor stations, waiting-room displays, scheduling boards).
//!
//! # Architecture
//!
//! ```text
//!                 Backend (authoritative)
//!            push events │        ▲ REST mutations
//!                        ▼        │
//!              Realtime Channel   │
//!                 Adapter         │
//!                        │        │
//!          ┌─────────────┴──────┐ │
//!          ▼                    ▼ │
//!    Patient Store        Doctor Store ◄── refresh on "doctorsChanged"
//!          │  snapshot streams  │ │
//!          └─────────┬──────────┘ │
//!                    ▼            │
//!              Queue Projector    │
//!                    │            │
//!                    ▼            │
//!         QueueBoard per terminal │
//!                    │            │
//!                    ▼            │
//!              Call Sequencer ────┘
//! ```
//!
//! # Core Principle
//!
//! **The cache only changes on push.** Mutations are sent to the backend and
//! the local stores are updated when the resulting broadcast arrives, so every
//! terminal (including the one that acted) converges on the same state.
//!
//! # Modules
//!
//! - [`models`]: Patient, Doctor, RoomId and request bodies
//! - [`realtime`]: websocket channel adapter with reconnect and room joins
//! - [`backend`]: REST mutation client
//! - [`store`]: replayable patient and doctor caches
//! - [`projector`]: pure queue views derived from the two caches
//! - [`sequencer`]: race-free "call next patient"
//! - [`roster`]: doctor name matching for import validation
//! - [`terminal`]: wires everything together for one terminal session

pub mod backend;
pub mod clock;
pub mod config;
pub mod models;
pub mod projector;
pub mod realtime;
pub mod roster;
pub mod sequencer;
pub mod store;
pub mod terminal;

// Re-export commonly used types
pub use backend::{Backend, BackendError, HttpBackend};
pub use clock::{local_clock, Clock};
pub use config::{ConfigError, ReconnectPolicy, TerminalConfig, TerminalRole};
pub use models::{
    Doctor, NewDoctor, NewPatient, Patient, PatientDelta, PatientStatus, PatientUpdate, RoomId,
    StatusAck,
};
pub use projector::{CallAnnouncement, QueueBoard};
pub use realtime::{ChannelAdapter, ChannelError, ChannelEvent, ConnectionState, WsTransport};
pub use sequencer::{CallOutcome, CallSequencer};
pub use store::{DoctorStore, PatientEvent, PatientStore, Snapshot};
pub use terminal::{BookedFilter, Terminal};

use thiserror::Error;

// =========================================================================
// Error Types
// =========================================================================

/// Failures detected locally, before any request is sent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Patient name is empty")]
    EmptyName,

    #[error("Doctor name is empty")]
    EmptyDoctorName,

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error("Import batch is empty")]
    EmptyBatch,

    #[error("No patients waiting in room {0}")]
    EmptyQueue(RoomId),

    #[error("No doctor assigned to patient {0}")]
    NoDoctorAssigned(String),

    #[error("No active doctor for room {0}")]
    NoDoctorForRoom(RoomId),

    #[error("Patient {0} is already being called")]
    AlreadyCalling(String),

    #[error("Doctor \"{name}\" not found{}", suggestion_hint(.suggestion))]
    UnknownDoctor {
        name: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean \"{}\"?)", name),
        None => String::new(),
    }
}

/// Top-level error taxonomy surfaced to terminal code.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Channel trouble; the adapter reconnects on its own
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ChannelError),

    /// The backend refused or failed a request; never retried automatically
    #[error("Mutation rejected: {0}")]
    MutationRejected(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_doctor_message() {
        let err = ValidationError::UnknownDoctor {
            name: "Delfin".into(),
            suggestion: Some("dott.ssa Delfino Claudia".into()),
        };
        assert_eq!(
            err.to_string(),
            "Doctor \"Delfin\" not found (did you mean \"dott.ssa Delfino Claudia\"?)"
        );

        let err = ValidationError::UnknownDoctor {
            name: "Nessuno".into(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Doctor \"Nessuno\" not found");
    }

    #[test]
    fn test_error_conversion() {
        let err: QueueError = ValidationError::EmptyQueue(RoomId::Number(3)).into();
        assert!(matches!(err, QueueError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: No patients waiting in room 3"
        );
    }
}
