//! "Call next patient" sequencing.
//!
//! A call is three ordered steps: freeze the target, ask the backend to move
//! it into visit, then label the doctor with the patient's name. The local
//! caches are never touched; the push that follows step 2 moves the patient
//! out of the waiting list on every terminal.
//!
//! Calls on one room are serialized. Between a successful step 2 and the
//! arrival of its push, the target still looks "waiting" in the cache, so
//! acknowledged ids are parked in an in-flight set and skipped when picking
//! the next head.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::models::{Doctor, Patient, PatientStatus, RoomId};
use crate::projector::{resolve_room, waiting_by_room};
use crate::store::{DoctorStore, PatientStore};
use crate::{QueueError, QueueResult, ValidationError};

/// Result of a call that got past step 2.
#[derive(Debug)]
pub enum CallOutcome {
    /// Patient called and doctor label updated
    Called { patient: Patient, doctor: Doctor },
    /// Patient called; the doctor's "last patient" label was not updated
    CalledWithoutLabel {
        patient: Patient,
        doctor: Doctor,
        error: QueueError,
    },
}

impl CallOutcome {
    /// The frozen target.
    pub fn patient(&self) -> &Patient {
        match self {
            CallOutcome::Called { patient, .. } | CallOutcome::CalledWithoutLabel { patient, .. } => patient,
        }
    }

    pub fn doctor(&self) -> &Doctor {
        match self {
            CallOutcome::Called { doctor, .. } | CallOutcome::CalledWithoutLabel { doctor, .. } => doctor,
        }
    }

    /// False when only the advisory label failed.
    pub fn is_complete(&self) -> bool {
        matches!(self, CallOutcome::Called { .. })
    }
}

pub struct CallSequencer {
    patients: Arc<PatientStore>,
    doctors: Arc<DoctorStore>,
    clock: Clock,
    rooms: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    in_flight: Mutex<HashSet<String>>,
}

impl CallSequencer {
    pub fn new(patients: Arc<PatientStore>, doctors: Arc<DoctorStore>, clock: Clock) -> Self {
        Self {
            patients,
            doctors,
            clock,
            rooms: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Call the head of `room`'s waiting list.
    pub async fn call_next(&self, room: &RoomId) -> QueueResult<CallOutcome> {
        let lock = self.room_lock(room).await;
        let _guard = lock.lock().await;

        let target = {
            let patients = self.patients.patients();
            let doctors = self.doctors.doctors();
            let today = (self.clock)().date();

            let mut in_flight = self.in_flight.lock().await;
            prune_in_flight(&mut in_flight, &patients);

            waiting_by_room(&patients, &doctors, today)
                .into_iter()
                .find(|g| &g.room == room)
                .and_then(|g| g.patients.into_iter().find(|p| !in_flight.contains(&p.id)))
                .ok_or_else(|| ValidationError::EmptyQueue(room.clone()))?
        };

        self.run(target).await
    }

    /// Call a specific patient (front desk).
    ///
    /// Fails if that patient's previous call has not been seen in a push yet.
    pub async fn call(&self, patient: &Patient) -> QueueResult<CallOutcome> {
        let target = patient.clone();
        let room = resolve_room(&target, &self.doctors.doctors());

        match room {
            Some(room) => {
                let lock = self.room_lock(&room).await;
                let _guard = lock.lock().await;
                self.run(target).await
            }
            None => self.run(target).await,
        }
    }

    /// Patient ids acknowledged but not yet seen leaving the waiting list.
    pub async fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.in_flight.lock().await.iter().cloned().collect();
        ids.sort();
        ids
    }

    async fn room_lock(&self, room: &RoomId) -> Arc<Mutex<()>> {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(room.clone()).or_default().clone()
    }

    /// Steps 2 and 3 for a frozen target.
    async fn run(&self, target: Patient) -> QueueResult<CallOutcome> {
        let doctor = self.doctor_for(&target)?;

        {
            let mut in_flight = self.in_flight.lock().await;
            prune_in_flight(&mut in_flight, &self.patients.patients());
            if !in_flight.insert(target.id.clone()) {
                return Err(ValidationError::AlreadyCalling(target.full_name).into());
            }
        }
        if let Err(e) = self.patients.call(&target.id).await {
            self.in_flight.lock().await.remove(&target.id);
            return Err(e);
        }
        tracing::info!(
            patient_id = %target.id,
            number = target.assigned_number,
            doctor_id = %doctor.id,
            study = %doctor.study,
            "Patient called"
        );

        match self
            .doctors
            .update_last_patient(&doctor.id, &target.full_name)
            .await
        {
            Ok(()) => Ok(CallOutcome::Called {
                patient: target,
                doctor,
            }),
            Err(error) => {
                tracing::warn!(
                    patient_id = %target.id,
                    doctor_id = %doctor.id,
                    error = %error,
                    "Patient called but doctor label not updated"
                );
                Ok(CallOutcome::CalledWithoutLabel {
                    patient: target,
                    doctor,
                    error,
                })
            }
        }
    }

    /// Doctor by assigned id, else the doctor working in the legacy study.
    fn doctor_for(&self, target: &Patient) -> Result<Doctor, ValidationError> {
        if let Some(doctor) = target
            .assigned_doctor_id
            .as_deref()
            .and_then(|id| self.doctors.find(id))
        {
            return Ok(doctor);
        }
        match &target.assigned_study {
            Some(room) => self
                .doctors
                .doctor_for_room(room)
                .ok_or_else(|| ValidationError::NoDoctorForRoom(room.clone())),
            None => Err(ValidationError::NoDoctorAssigned(target.full_name.clone())),
        }
    }
}

/// Keep only ids the store still lists as waiting.
fn prune_in_flight(in_flight: &mut HashSet<String>, patients: &[Patient]) {
    in_flight.retain(|id| {
        patients
            .iter()
            .any(|p| &p.id == id && p.status == PatientStatus::Waiting)
    });
}
