//! Queue projections.
//!
//! Pure functions of one (patients, doctors, now) triple. Nothing here holds
//! state; the terminal recomputes a [`QueueBoard`] whenever either store
//! publishes a new snapshot.

mod agenda;
mod grouping;
mod rooms;

pub use agenda::*;
pub use grouping::*;
pub use rooms::*;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{Doctor, Patient, RoomId};

/// Every derived view a terminal renders, computed from one snapshot pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueBoard {
    /// Clock reading the board was computed for
    pub generated_at: NaiveDateTime,
    pub waiting: Vec<RoomGroup>,
    pub in_visit: Vec<RoomGroup>,
    /// Booked list, restricted to `booked_filter` when set
    pub booked_filter: Option<NaiveDate>,
    pub booked: Vec<Patient>,
    /// Calendar view; empty while a date filter is active
    pub booked_by_date: Vec<DateGroup>,
    pub completed: Vec<DoctorGroup>,
    pub follow_up: Vec<Patient>,
    pub follow_up_count: usize,
    pub doctors_by_room: Vec<RoomRoster>,
    pub room_queues: Vec<RoomQueue>,
}

impl QueueBoard {
    /// Compute every view.
    pub fn project(
        patients: &[Patient],
        doctors: &[Doctor],
        now: NaiveDateTime,
        booked_filter: Option<NaiveDate>,
    ) -> Self {
        let today = now.date();
        let waiting = waiting_by_room(patients, doctors, today);
        let in_visit = in_visit_by_room(patients, doctors);
        let room_queues = room_queues(doctors, &in_visit, &waiting);
        let follow_up = follow_up_eligible(patients, now);

        Self {
            generated_at: now,
            booked: booked(patients, booked_filter),
            booked_by_date: if booked_filter.is_none() {
                booked_by_date(patients)
            } else {
                Vec::new()
            },
            booked_filter,
            completed: completed_by_doctor(patients, doctors),
            follow_up_count: follow_up.len(),
            follow_up,
            doctors_by_room: doctors_by_room(doctors),
            waiting,
            in_visit,
            room_queues,
        }
    }

    /// Board for an empty clinic.
    pub fn empty(now: NaiveDateTime) -> Self {
        Self::project(&[], &[], now, Some(now.date()))
    }

    /// Today's waiting list for one room, in call order.
    pub fn waiting_in(&self, room: &RoomId) -> &[Patient] {
        self.waiting
            .iter()
            .find(|g| &g.room == room)
            .map(|g| g.patients.as_slice())
            .unwrap_or(&[])
    }

    pub fn room_queue(&self, room: &RoomId) -> Option<&RoomQueue> {
        self.room_queues.iter().find(|q| &q.room == room)
    }

    /// Number of patients waiting today across all rooms.
    pub fn waiting_count(&self) -> usize {
        self.waiting.iter().map(|g| g.patients.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientStatus;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 11)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_filter_hides_calendar_view() {
        let mut p = Patient::new("a", "A", PatientStatus::Booked);
        p.appointment_time = Some(now());

        let filtered = QueueBoard::project(&[p.clone()], &[], now(), Some(now().date()));
        assert_eq!(filtered.booked.len(), 1);
        assert!(filtered.booked_by_date.is_empty());

        let unfiltered = QueueBoard::project(&[p], &[], now(), None);
        assert_eq!(unfiltered.booked_by_date.len(), 1);
    }

    #[test]
    fn test_room_queue_current_and_next() {
        let doctors = vec![Doctor::new("d1", "Dr. Bianchi", RoomId::Number(1))];
        let mut inside = Patient::new("in", "Inside", PatientStatus::InVisit);
        inside.assigned_doctor_id = Some("d1".into());
        let mut next = Patient::new("w", "Next", PatientStatus::Waiting);
        next.assigned_doctor_id = Some("d1".into());
        next.appointment_time = Some(now());

        let board = QueueBoard::project(&[inside, next], &doctors, now(), None);
        let queue = board.room_queue(&RoomId::Number(1)).unwrap();
        assert_eq!(queue.current.as_ref().unwrap().id, "in");
        assert_eq!(queue.next.as_ref().unwrap().id, "w");
        assert_eq!(board.waiting_count(), 1);
        assert!(board.waiting_in(&RoomId::Number(9)).is_empty());
    }
}
