//! Per-room views for doctor stations and the waiting-room display.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Doctor, Patient, RoomId};

use super::grouping::{resolve_room, RoomGroup};

/// Active doctors working in one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRoster {
    pub room: RoomId,
    pub doctors: Vec<Doctor>,
}

/// Who is inside and who is next, for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomQueue {
    pub room: RoomId,
    pub current: Option<Patient>,
    pub next: Option<Patient>,
}

/// Printed queue ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: u32,
    pub full_name: String,
    pub room: Option<RoomId>,
    pub doctor_name: Option<String>,
    pub appointment_time: Option<NaiveDateTime>,
}

/// "Doctor X is now seeing Y in room Z".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAnnouncement {
    pub doctor_id: String,
    pub doctor_name: String,
    pub room: RoomId,
    pub patient_name: String,
}

/// Active roster grouped by study, doctors ordered by name.
pub fn doctors_by_room(doctors: &[Doctor]) -> Vec<RoomRoster> {
    let mut rooms: BTreeMap<RoomId, Vec<Doctor>> = BTreeMap::new();
    for doctor in doctors {
        rooms
            .entry(doctor.study.clone())
            .or_default()
            .push(doctor.clone());
    }
    rooms
        .into_iter()
        .map(|(room, mut doctors)| {
            doctors.sort_by(|a, b| a.name.cmp(&b.name));
            RoomRoster { room, doctors }
        })
        .collect()
}

/// Current and next patient for every staffed or occupied room.
///
/// `current` is the first in-visit patient after sorting; `next` is the head
/// of the room's waiting list.
pub fn room_queues(doctors: &[Doctor], in_visit: &[RoomGroup], waiting: &[RoomGroup]) -> Vec<RoomQueue> {
    let rooms: BTreeSet<RoomId> = doctors
        .iter()
        .map(|d| d.study.clone())
        .chain(in_visit.iter().map(|g| g.room.clone()))
        .chain(waiting.iter().map(|g| g.room.clone()))
        .collect();

    let head = |groups: &[RoomGroup], room: &RoomId| {
        groups
            .iter()
            .find(|g| &g.room == room)
            .and_then(|g| g.patients.first().cloned())
    };

    rooms
        .into_iter()
        .map(|room| RoomQueue {
            current: head(in_visit, &room),
            next: head(waiting, &room),
            room,
        })
        .collect()
}

/// Ticket for a patient, with the room resolved like every other view.
pub fn ticket_for(patient: &Patient, doctors: &[Doctor]) -> Ticket {
    let doctor_name = patient
        .assigned_doctor_id
        .as_deref()
        .and_then(|id| doctors.iter().find(|d| d.id == id))
        .map(|d| d.name.clone())
        .or_else(|| patient.assigned_doctor_name.clone());

    Ticket {
        number: patient.assigned_number,
        full_name: patient.full_name.clone(),
        room: resolve_room(patient, doctors),
        doctor_name,
        appointment_time: patient.appointment_time,
    }
}

/// Doctors whose "last patient" label changed between two rosters.
///
/// The first roster a display sees announces nothing, so joining mid-day
/// does not replay old calls.
pub fn detect_new_calls(previous: &[Doctor], next: &[Doctor]) -> Vec<CallAnnouncement> {
    if previous.is_empty() {
        return Vec::new();
    }

    next.iter()
        .filter_map(|doctor| {
            let name = doctor.last_patient.as_deref()?.trim();
            if name.is_empty() {
                return None;
            }
            let before = previous.iter().find(|d| d.id == doctor.id)?;
            if before.last_patient.as_deref().map(str::trim) == Some(name) {
                return None;
            }
            Some(CallAnnouncement {
                doctor_id: doctor.id.clone(),
                doctor_name: doctor.name.clone(),
                room: doctor.study.clone(),
                patient_name: name.to_string(),
            })
        })
        .collect()
}
