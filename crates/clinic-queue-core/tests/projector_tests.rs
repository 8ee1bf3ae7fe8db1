//! Queue projection integration tests.

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use clinic_queue_core::models::{Doctor, Patient, PatientStatus, RoomId};
use clinic_queue_core::projector::{follow_up_eligible, waiting_by_room};
use clinic_queue_core::QueueBoard;

use common::{at, today, waiting};

fn archived(id: &str, last_visit: NaiveDateTime) -> Patient {
    let mut p = Patient::new(id, id, PatientStatus::Archived);
    p.last_visit_date = Some(last_visit);
    p
}

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn roster() -> Vec<Doctor> {
    vec![
        Doctor::new("d1", "Dr. Bianchi", RoomId::Number(1)),
        Doctor::new("d2", "Dr. Neri", RoomId::Number(2)),
        Doctor::new("d3", "Dr. Verdi", "Palestra"),
        Doctor::new("d4", "Dr. Azzurri", "Annex"),
    ]
}

fn clinic() -> Vec<Patient> {
    let mut booked = Patient::new("bk", "Booked", PatientStatus::Booked);
    booked.appointment_time = Some(at(15, 0));
    let mut inside = Patient::new("in", "Inside", PatientStatus::InVisit);
    inside.assigned_doctor_id = Some("d2".into());
    let mut done = Patient::new("done", "Done", PatientStatus::Completed);
    done.assigned_doctor_id = Some("d1".into());

    vec![
        waiting("b", "B", "d1", at(9, 15)),
        waiting("a", "A", "d1", at(9, 0)),
        waiting("g", "G", "d3", at(10, 0)),
        waiting("x", "X", "d4", at(8, 0)),
        waiting("n", "N", "d2", at(11, 0)),
        booked,
        inside,
        done,
        archived("old", midnight(2024, 1, 5)),
    ]
}

#[test]
fn test_same_room_ordered_by_time() {
    let doctors = vec![Doctor::new("d1", "Dr. Bianchi", RoomId::Number(1))];
    let patients = vec![
        waiting("b", "B", "d1", at(9, 15)),
        waiting("a", "A", "d1", at(9, 0)),
    ];

    let groups = waiting_by_room(&patients, &doctors, today());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].room, RoomId::Number(1));
    let ids: Vec<&str> = groups[0].patients.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_room_order_numeric_then_named() {
    let board = QueueBoard::project(&clinic(), &roster(), at(12, 0), None);
    let rooms: Vec<RoomId> = board.waiting.iter().map(|g| g.room.clone()).collect();
    assert_eq!(
        rooms,
        vec![
            RoomId::Number(1),
            RoomId::Number(2),
            RoomId::Name("Annex".into()),
            RoomId::Name("Palestra".into()),
        ]
    );

    let staffed: Vec<RoomId> = board.doctors_by_room.iter().map(|r| r.room.clone()).collect();
    assert_eq!(staffed, rooms);
}

#[test]
fn test_projection_is_deterministic() {
    let patients = clinic();
    let doctors = roster();
    let first = QueueBoard::project(&patients, &doctors, at(12, 0), None);
    let second = QueueBoard::project(&patients, &doctors, at(12, 0), None);
    assert_eq!(first, second);

    let mut shuffled = patients.clone();
    shuffled.reverse();
    let third = QueueBoard::project(&shuffled, &doctors, at(12, 0), None);
    assert_eq!(first.waiting, third.waiting);
    assert_eq!(first.completed, third.completed);
}

#[test]
fn test_board_views() {
    let board = QueueBoard::project(&clinic(), &roster(), at(12, 0), None);

    let queue = board.room_queue(&RoomId::Number(2)).unwrap();
    assert_eq!(queue.current.as_ref().unwrap().id, "in");
    assert_eq!(queue.next.as_ref().unwrap().id, "n");

    assert_eq!(board.booked.len(), 1);
    assert_eq!(board.booked_by_date.len(), 1);
    assert_eq!(board.completed[0].doctor_name, "Dr. Bianchi");
    assert_eq!(board.follow_up_count, 1);
    assert_eq!(board.waiting_count(), 5);
}

#[test]
fn test_follow_up_boundary() {
    let now = NaiveDate::from_ymd_opt(2025, 6, 11)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let patients = vec![
        archived("exact", midnight(2025, 3, 11)),
        archived("day-after", midnight(2025, 3, 12)),
        archived("older", midnight(2025, 1, 2)),
    ];

    let due = follow_up_eligible(&patients, now);
    let ids: Vec<&str> = due.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["older", "exact"]);
}

#[test]
fn test_follow_up_ignores_other_statuses_and_missing_dates() {
    let now = at(9, 0);
    let mut completed = archived("c", midnight(2024, 1, 1));
    completed.status = PatientStatus::Completed;
    let mut undated = archived("u", midnight(2024, 1, 1));
    undated.last_visit_date = None;

    assert!(follow_up_eligible(&[completed, undated], now).is_empty());
}

fn room_label() -> impl Strategy<Value = String> {
    prop_oneof![
        (-5i64..200).prop_map(|n| n.to_string()),
        "[A-Za-z][A-Za-z0-9]{0,6}",
    ]
}

proptest! {
    #[test]
    fn prop_room_order_numbers_first_and_total(labels in prop::collection::vec(room_label(), 0..24)) {
        let mut rooms: Vec<RoomId> = labels.iter().map(|l| RoomId::parse(l)).collect();
        rooms.sort();

        let first_name = rooms.iter().position(|r| !r.is_numbered()).unwrap_or(rooms.len());
        prop_assert!(rooms[first_name..].iter().all(|r| !r.is_numbered()));

        for pair in rooms.windows(2) {
            match (&pair[0], &pair[1]) {
                (RoomId::Number(a), RoomId::Number(b)) => prop_assert!(a <= b),
                (RoomId::Name(a), RoomId::Name(b)) => prop_assert!(a <= b),
                (RoomId::Number(_), RoomId::Name(_)) => {}
                (RoomId::Name(_), RoomId::Number(_)) => prop_assert!(false, "name before number"),
            }
        }

        for a in &rooms {
            for b in &rooms {
                prop_assert_eq!(a.cmp(b), b.cmp(a).reverse());
                prop_assert_eq!(a.cmp(b) == std::cmp::Ordering::Equal, a == b);
            }
        }
    }

    #[test]
    fn prop_waiting_groups_follow_room_order(labels in prop::collection::vec(room_label(), 1..12)) {
        let patients: Vec<Patient> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let mut p = Patient::new(format!("p{}", i), "P", PatientStatus::Waiting);
                p.appointment_time = Some(at(9, 0));
                p.assigned_study = Some(RoomId::parse(label));
                p
            })
            .collect();

        let groups = waiting_by_room(&patients, &[], today());
        let rooms: Vec<&RoomId> = groups.iter().map(|g| &g.room).collect();
        prop_assert!(rooms.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(groups.iter().map(|g| g.patients.len()).sum::<usize>(), patients.len());
    }
}
