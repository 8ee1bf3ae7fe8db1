//! Patient models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::RoomId;

/// Serde adapter: an explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lifecycle status of a patient.
///
/// The normal path is booked → waiting → in visit → completed → archived.
/// A patient may also enter `Waiting` directly (walk-in).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum PatientStatus {
    /// Appointment booked, not yet arrived
    #[default]
    #[serde(rename = "prenotato")]
    Booked,
    /// Arrived, in the waiting room
    #[serde(rename = "in_attesa")]
    Waiting,
    /// Called into a study
    #[serde(rename = "in_visita")]
    InVisit,
    /// Visit finished today
    #[serde(rename = "completato")]
    Completed,
    /// Cycle closed, eligible for follow-up after a delay
    #[serde(rename = "in_archivio")]
    Archived,
}

impl PatientStatus {
    /// Position along the lifecycle.
    pub fn rank(self) -> u8 {
        match self {
            PatientStatus::Booked => 0,
            PatientStatus::Waiting => 1,
            PatientStatus::InVisit => 2,
            PatientStatus::Completed => 3,
            PatientStatus::Archived => 4,
        }
    }

    /// Whether moving from `self` to `next` follows the lifecycle.
    pub fn allows_transition(self, next: PatientStatus) -> bool {
        next.rank() >= self.rank()
    }

    /// Wire spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Booked => "prenotato",
            PatientStatus::Waiting => "in_attesa",
            PatientStatus::InVisit => "in_visita",
            PatientStatus::Completed => "completato",
            PatientStatus::Archived => "in_archivio",
        }
    }
}

/// A patient record as held in the terminal cache.
///
/// Every field except `id` is defaulted so that a delta for an unknown id
/// can be promoted to a record. Explicit nulls read as defaults too.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Patient {
    /// Backend id, stable across the whole lifecycle
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Display name
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
    /// Queue ticket number, assigned once by the backend
    #[serde(deserialize_with = "null_as_default")]
    pub assigned_number: u32,
    /// Assigned doctor (authoritative room resolution)
    pub assigned_doctor_id: Option<String>,
    /// Doctor display name as recorded by the backend
    pub assigned_doctor_name: Option<String>,
    /// Legacy room assignment, read only
    pub assigned_study: Option<RoomId>,
    /// Appointment in clinic wall-clock time
    #[serde(deserialize_with = "super::local_time::deserialize")]
    pub appointment_time: Option<NaiveDateTime>,
    /// Lifecycle status
    #[serde(deserialize_with = "null_as_default")]
    pub status: PatientStatus,
    /// Contact number
    pub phone: Option<String>,
    /// Set on archival
    #[serde(deserialize_with = "super::local_time::deserialize")]
    pub last_visit_date: Option<NaiveDateTime>,
}

impl Patient {
    /// Create a patient with the fields every view needs.
    pub fn new(id: impl Into<String>, full_name: impl Into<String>, status: PatientStatus) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            status,
            ..Default::default()
        }
    }

    /// Calendar date of the appointment.
    pub fn appointment_date(&self) -> Option<NaiveDate> {
        self.appointment_time.map(|t| t.date())
    }

    /// Whether the appointment falls on `day`.
    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.appointment_date() == Some(day)
    }
}

/// A partial patient update pushed by the backend.
///
/// The same shape announces both field changes and brand-new patients.
/// Absent fields (and explicit nulls) leave the cached value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientDelta {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_doctor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_study: Option<RoomId>,
    #[serde(
        default,
        deserialize_with = "super::local_time::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub appointment_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::local_time::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_visit_date: Option<NaiveDateTime>,
}

impl PatientDelta {
    /// Delta carrying only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Shallow-merge the present fields into an existing record.
    ///
    /// The ticket number is immutable once set; a differing number is ignored.
    pub fn merge_into(self, patient: &mut Patient) {
        if let Some(v) = self.full_name {
            patient.full_name = v;
        }
        if let Some(v) = self.assigned_number {
            if patient.assigned_number == 0 {
                patient.assigned_number = v;
            } else if patient.assigned_number != v {
                tracing::warn!(
                    patient_id = %patient.id,
                    kept = patient.assigned_number,
                    ignored = v,
                    "Ignoring change to immutable ticket number"
                );
            }
        }
        if let Some(v) = self.assigned_doctor_id {
            patient.assigned_doctor_id = Some(v);
        }
        if let Some(v) = self.assigned_doctor_name {
            patient.assigned_doctor_name = Some(v);
        }
        if let Some(v) = self.assigned_study {
            patient.assigned_study = Some(v);
        }
        if let Some(v) = self.appointment_time {
            patient.appointment_time = Some(v);
        }
        if let Some(v) = self.status {
            if !patient.status.allows_transition(v) {
                tracing::warn!(
                    patient_id = %patient.id,
                    from = patient.status.as_str(),
                    to = v.as_str(),
                    "Status moved backwards"
                );
            }
            patient.status = v;
        }
        if let Some(v) = self.phone {
            patient.phone = Some(v);
        }
        if let Some(v) = self.last_visit_date {
            patient.last_visit_date = Some(v);
        }
    }

    /// Promote the delta to a full record (unknown id).
    pub fn into_patient(self) -> Patient {
        let mut patient = Patient {
            id: self.id.clone(),
            ..Default::default()
        };
        self.merge_into(&mut patient);
        patient
    }
}
