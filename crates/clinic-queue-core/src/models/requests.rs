//! Request and acknowledgement bodies for backend mutations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{PatientStatus, RoomId};

/// A patient to be created, either at the desk or from an import batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    pub full_name: String,
    /// Doctor name as written in the import sheet (backend resolves it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_doctor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_doctor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_study: Option<RoomId>,
    pub appointment_time: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl NewPatient {
    /// Walk-in or booked patient for a given doctor.
    pub fn for_doctor(
        full_name: impl Into<String>,
        doctor_id: impl Into<String>,
        appointment_time: NaiveDateTime,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            assigned_doctor: None,
            assigned_doctor_id: Some(doctor_id.into()),
            assigned_study: None,
            appointment_time,
            status: None,
            phone: None,
        }
    }
}

/// Field changes requested from an edit form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_doctor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl PatientUpdate {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.assigned_doctor_id.is_none()
            && self.appointment_time.is_none()
            && self.status.is_none()
            && self.phone.is_none()
    }
}

/// A doctor to be added to today's roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDoctor {
    pub name: String,
    pub study: RoomId,
}

/// Backend acknowledgement of a status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusAck {
    pub id: String,
    pub status: PatientStatus,
}
