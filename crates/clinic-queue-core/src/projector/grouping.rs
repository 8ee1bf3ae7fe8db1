//! Status views: waiting, in visit, booked, completed, follow-up.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{Doctor, Patient, PatientStatus, RoomId};

/// Patients sharing a resolved room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomGroup {
    pub room: RoomId,
    pub patients: Vec<Patient>,
}

/// Patients sharing an appointment date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub patients: Vec<Patient>,
}

/// Patients seen by one doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorGroup {
    pub doctor_name: String,
    pub patients: Vec<Patient>,
}

/// Calendar months after which an archived patient is due a follow-up.
pub const FOLLOW_UP_MONTHS: u32 = 3;

/// Room a patient belongs to.
///
/// The assigned doctor's study wins when that doctor is on the roster;
/// otherwise the legacy `assigned_study` field is used.
pub fn resolve_room(patient: &Patient, doctors: &[Doctor]) -> Option<RoomId> {
    patient
        .assigned_doctor_id
        .as_deref()
        .and_then(|id| doctors.iter().find(|d| d.id == id))
        .map(|d| d.study.clone())
        .or_else(|| patient.assigned_study.clone())
}

/// Appointment time ascending (missing times last), then ticket number, then id.
pub fn by_appointment(a: &Patient, b: &Patient) -> Ordering {
    let time = match (a.appointment_time, b.appointment_time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    time.then_with(|| a.assigned_number.cmp(&b.assigned_number))
        .then_with(|| a.id.cmp(&b.id))
}

fn group_by_room<'a>(
    patients: impl Iterator<Item = &'a Patient>,
    doctors: &[Doctor],
) -> Vec<RoomGroup> {
    let mut rooms: BTreeMap<RoomId, Vec<Patient>> = BTreeMap::new();
    for patient in patients {
        if let Some(room) = resolve_room(patient, doctors) {
            rooms.entry(room).or_default().push(patient.clone());
        }
    }
    rooms
        .into_iter()
        .map(|(room, mut patients)| {
            patients.sort_by(by_appointment);
            RoomGroup { room, patients }
        })
        .collect()
}

/// Waiting patients with an appointment today, per room.
pub fn waiting_by_room(patients: &[Patient], doctors: &[Doctor], today: NaiveDate) -> Vec<RoomGroup> {
    group_by_room(
        patients
            .iter()
            .filter(|p| p.status == PatientStatus::Waiting && p.is_on(today)),
        doctors,
    )
}

/// Patients currently in visit, per room.
pub fn in_visit_by_room(patients: &[Patient], doctors: &[Doctor]) -> Vec<RoomGroup> {
    group_by_room(
        patients.iter().filter(|p| p.status == PatientStatus::InVisit),
        doctors,
    )
}

/// Booked patients, optionally restricted to one day.
pub fn booked(patients: &[Patient], day: Option<NaiveDate>) -> Vec<Patient> {
    let mut list: Vec<Patient> = patients
        .iter()
        .filter(|p| p.status == PatientStatus::Booked)
        .filter(|p| day.map_or(true, |d| p.is_on(d)))
        .cloned()
        .collect();
    list.sort_by(by_appointment);
    list
}

/// Booked patients bucketed by appointment date. Undated bookings are left out.
pub fn booked_by_date(patients: &[Patient]) -> Vec<DateGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<Patient>> = BTreeMap::new();
    for patient in patients.iter().filter(|p| p.status == PatientStatus::Booked) {
        if let Some(date) = patient.appointment_date() {
            days.entry(date).or_default().push(patient.clone());
        }
    }
    days.into_iter()
        .map(|(date, mut patients)| {
            patients.sort_by(by_appointment);
            DateGroup { date, patients }
        })
        .collect()
}

/// Completed visits grouped under the doctor's display name.
pub fn completed_by_doctor(patients: &[Patient], doctors: &[Doctor]) -> Vec<DoctorGroup> {
    let mut groups: BTreeMap<String, Vec<Patient>> = BTreeMap::new();
    for patient in patients.iter().filter(|p| p.status == PatientStatus::Completed) {
        let name = patient
            .assigned_doctor_id
            .as_deref()
            .and_then(|id| doctors.iter().find(|d| d.id == id))
            .map(|d| d.name.clone())
            .or_else(|| patient.assigned_doctor_name.clone())
            .unwrap_or_default();
        if name.trim().is_empty() {
            continue;
        }
        groups.entry(name).or_default().push(patient.clone());
    }
    groups
        .into_iter()
        .map(|(doctor_name, mut patients)| {
            patients.sort_by(by_appointment);
            DoctorGroup {
                doctor_name,
                patients,
            }
        })
        .collect()
}

/// Latest last-visit instant that still qualifies for a follow-up.
///
/// Calendar-month subtraction: 31 May minus three months is 28/29 February.
pub fn follow_up_threshold(now: NaiveDateTime) -> NaiveDateTime {
    now.checked_sub_months(Months::new(FOLLOW_UP_MONTHS))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Archived patients due a follow-up, oldest visit first.
pub fn follow_up_eligible(patients: &[Patient], now: NaiveDateTime) -> Vec<Patient> {
    let threshold = follow_up_threshold(now);
    let mut list: Vec<Patient> = patients
        .iter()
        .filter(|p| p.status == PatientStatus::Archived)
        .filter(|p| p.last_visit_date.is_some_and(|d| d <= threshold))
        .cloned()
        .collect();
    list.sort_by(|a, b| {
        a.last_visit_date
            .cmp(&b.last_visit_date)
            .then_with(|| a.assigned_number.cmp(&b.assigned_number))
    });
    list
}
