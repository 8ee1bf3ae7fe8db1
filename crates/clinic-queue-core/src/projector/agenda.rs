//! Weekly scheduling board.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Doctor, Patient};

use super::grouping::by_appointment;

/// One appointment with its doctor, when the doctor is on the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaEntry {
    pub patient: Patient,
    pub doctor: Option<Doctor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaDay {
    pub date: NaiveDate,
    pub entries: Vec<AgendaEntry>,
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_monday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

/// Seven days starting Monday, every patient of the week in its day.
pub fn week_agenda(patients: &[Patient], doctors: &[Doctor], today: NaiveDate) -> Vec<AgendaDay> {
    let monday = week_start(today);

    monday
        .iter_days()
        .take(7)
        .map(|date| {
            let mut day_patients: Vec<&Patient> =
                patients.iter().filter(|p| p.is_on(date)).collect();
            day_patients.sort_by(|a, b| by_appointment(a, b));

            let entries = day_patients
                .into_iter()
                .map(|patient| AgendaEntry {
                    doctor: patient
                        .assigned_doctor_id
                        .as_deref()
                        .and_then(|id| doctors.iter().find(|d| d.id == id))
                        .cloned(),
                    patient: patient.clone(),
                })
                .collect();

            AgendaDay { date, entries }
        })
        .collect()
}
