//! Doctor store.
//!
//! Unlike patients, doctors are never pushed as data. The channel only says
//! "the roster changed" and the store re-fetches the active list. A refresh
//! failure keeps the previous list.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::backend::Backend;
use crate::models::{Doctor, NewDoctor, RoomId};
use crate::{QueueResult, ValidationError};

use super::{Snapshot, SnapshotCell};

pub struct DoctorStore {
    cell: SnapshotCell<Doctor>,
    backend: Arc<dyn Backend>,
    /// Serializes refreshes so an older response never overwrites a newer one
    refresh_lock: Mutex<()>,
    /// Set once the first refresh succeeds
    loaded: watch::Sender<bool>,
}

impl DoctorStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            cell: SnapshotCell::new(),
            backend,
            refresh_lock: Mutex::new(()),
            loaded: watch::Sender::new(false),
        }
    }

    /// Latest active roster.
    pub fn doctors(&self) -> Snapshot<Doctor> {
        self.cell.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Doctor>> {
        self.cell.subscribe()
    }

    /// Whether a roster has been fetched at least once.
    ///
    /// An empty `doctors()` before this is "not known yet", not "no doctors".
    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    pub fn loaded(&self) -> watch::Receiver<bool> {
        self.loaded.subscribe()
    }

    pub fn find(&self, doctor_id: &str) -> Option<Doctor> {
        self.doctors().iter().find(|d| d.id == doctor_id).cloned()
    }

    /// First active doctor working in `room`.
    pub fn doctor_for_room(&self, room: &RoomId) -> Option<Doctor> {
        self.doctors().iter().find(|d| &d.study == room).cloned()
    }

    /// Re-fetch the active roster and publish it.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// returned for the caller to log.
    pub async fn refresh(&self) -> QueueResult<usize> {
        let _guard = self.refresh_lock.lock().await;
        match self.backend.fetch_active_doctors().await {
            Ok(list) => {
                let count = list.len();
                tracing::debug!(count, "Doctor roster refreshed");
                self.cell.replace(list);
                self.loaded.send_if_modified(|loaded| !std::mem::replace(loaded, true));
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Doctor refresh failed, keeping previous roster");
                Err(e.into())
            }
        }
    }

    /// Complete roster including doctors not on duty. Not cached.
    pub async fn all_doctors(&self) -> QueueResult<Vec<Doctor>> {
        Ok(self.backend.fetch_all_doctors().await?)
    }

    /// Master name list for import validation. Not cached.
    pub async fn doctor_names(&self) -> QueueResult<Vec<String>> {
        Ok(self.backend.fetch_doctor_names().await?)
    }

    pub async fn add(&self, doctor: NewDoctor) -> QueueResult<Doctor> {
        if doctor.name.trim().is_empty() {
            return Err(ValidationError::EmptyDoctorName.into());
        }
        let created = self.backend.create_doctor(&doctor).await.map_err(|e| {
            tracing::warn!(name = %doctor.name, error = %e, "Create doctor rejected");
            e
        })?;
        tracing::info!(doctor_id = %created.id, study = %created.study, "Doctor added");
        Ok(created)
    }

    pub async fn remove(&self, doctor_id: &str) -> QueueResult<()> {
        self.backend.remove_doctor(doctor_id).await.map_err(|e| {
            tracing::warn!(doctor_id, error = %e, "Remove doctor rejected");
            e.into()
        })
    }

    /// Record the name shown on the doctor's "last called" label.
    pub async fn update_last_patient(&self, doctor_id: &str, patient_name: &str) -> QueueResult<()> {
        self.backend
            .update_doctor_last_patient(doctor_id, patient_name)
            .await
            .map_err(|e| {
                tracing::warn!(doctor_id, error = %e, "Last patient update rejected");
                e.into()
            })
    }
}
