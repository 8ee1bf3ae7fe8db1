//! Plain-text rendering of boards for the terminal's role.

use std::fmt::Write;

use clinic_queue_core::models::Patient;
use clinic_queue_core::{CallAnnouncement, ConnectionState, QueueBoard, TerminalRole};

fn patient_line(patient: &Patient) -> String {
    let time = patient
        .appointment_time
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    format!("#{:<4} {} {}", patient.assigned_number, time, patient.full_name)
}

/// Board view for one role.
pub fn board_summary(board: &QueueBoard, role: &TerminalRole) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", board.generated_at.format("%Y-%m-%d %H:%M"));

    match role {
        TerminalRole::FrontDesk => {
            for group in &board.waiting {
                let _ = writeln!(out, "Room {} ({} waiting)", group.room, group.patients.len());
                for patient in &group.patients {
                    let _ = writeln!(out, "  {}", patient_line(patient));
                }
            }
            let in_visit: usize = board.in_visit.iter().map(|g| g.patients.len()).sum();
            let _ = writeln!(
                out,
                "In visit: {}  Booked: {}  Follow-ups due: {}",
                in_visit,
                board.booked.len(),
                board.follow_up_count
            );
        }
        TerminalRole::Study { study } => {
            let queue = board.room_queue(study);
            let current = queue.and_then(|q| q.current.as_ref());
            let _ = writeln!(
                out,
                "Room {} now: {}",
                study,
                current.map(patient_line).unwrap_or_else(|| "-".to_string())
            );
            for patient in board.waiting_in(study) {
                let _ = writeln!(out, "  next {}", patient_line(patient));
            }
        }
        TerminalRole::Display => {
            for queue in &board.room_queues {
                if let Some(current) = &queue.current {
                    let _ = writeln!(out, "Room {}: #{}", queue.room, current.assigned_number);
                }
            }
        }
    }

    out.trim_end().to_string()
}

pub fn announcement_line(call: &CallAnnouncement) -> String {
    format!(
        ">> {} please go to room {} ({})",
        call.patient_name, call.room, call.doctor_name
    )
}

pub fn connection_line(state: ConnectionState) -> String {
    match state {
        ConnectionState::Connecting => "[connecting]".to_string(),
        ConnectionState::Connected => "[online]".to_string(),
        ConnectionState::Reconnecting { attempt } => format!("[offline, retry {}]", attempt),
        ConnectionState::Closed => "[closed]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clinic_queue_core::models::{Doctor, PatientStatus, RoomId};

    fn board() -> QueueBoard {
        let now = NaiveDate::from_ymd_opt(2025, 6, 11)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let doctors = vec![Doctor::new("d1", "Dr. Bianchi", RoomId::Number(1))];

        let mut inside = Patient::new("in", "Inside", PatientStatus::InVisit);
        inside.assigned_doctor_id = Some("d1".into());
        inside.assigned_number = 3;
        let mut next = Patient::new("w", "Anna Neri", PatientStatus::Waiting);
        next.assigned_doctor_id = Some("d1".into());
        next.assigned_number = 4;
        next.appointment_time = Some(now);

        QueueBoard::project(&[inside, next], &doctors, now, None)
    }

    #[test]
    fn test_front_desk_lists_waiting() {
        let text = board_summary(&board(), &TerminalRole::FrontDesk);
        assert!(text.contains("Room 1 (1 waiting)"));
        assert!(text.contains("#4    10:00 Anna Neri"));
        assert!(text.contains("In visit: 1"));
    }

    #[test]
    fn test_study_shows_current() {
        let role = TerminalRole::Study {
            study: RoomId::Number(1),
        };
        let text = board_summary(&board(), &role);
        assert!(text.contains("Room 1 now: #3"));
        assert!(text.contains("next #4"));
    }

    #[test]
    fn test_display_and_announcement() {
        let text = board_summary(&board(), &TerminalRole::Display);
        assert!(text.ends_with("Room 1: #3"));

        let call = CallAnnouncement {
            doctor_id: "d1".into(),
            doctor_name: "Dr. Bianchi".into(),
            room: RoomId::Number(1),
            patient_name: "Anna Neri".into(),
        };
        assert_eq!(
            announcement_line(&call),
            ">> Anna Neri please go to room 1 (Dr. Bianchi)"
        );
        assert_eq!(
            connection_line(ConnectionState::Reconnecting { attempt: 2 }),
            "[offline, retry 2]"
        );
    }
}
