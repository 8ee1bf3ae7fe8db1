//! Patient store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::Backend;
use crate::models::{NewPatient, Patient, PatientDelta, PatientUpdate, StatusAck};
use crate::{QueueResult, ValidationError};

use super::{Snapshot, SnapshotCell};

/// Inbound signals reconciled into the patient collection.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientEvent {
    /// Replace everything
    Snapshot(Vec<Patient>),
    /// Merge into an existing record, or create it
    Changed(PatientDelta),
    /// Delete if present
    Removed(String),
}

/// Cache of every patient known to this terminal.
///
/// Only [`PatientStore::apply`] changes the cache. Mutation methods talk to
/// the backend and return its acknowledgement; the visible effect arrives
/// later as a push event.
pub struct PatientStore {
    cell: SnapshotCell<Patient>,
    backend: Arc<dyn Backend>,
    /// Set by the first snapshot
    synced: watch::Sender<bool>,
}

impl PatientStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            cell: SnapshotCell::new(),
            backend,
            synced: watch::Sender::new(false),
        }
    }

    /// Latest collection.
    pub fn patients(&self) -> Snapshot<Patient> {
        self.cell.current()
    }

    /// Replayable stream of collections.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Patient>> {
        self.cell.subscribe()
    }

    /// Whether a full snapshot has been applied since start.
    pub fn is_synced(&self) -> bool {
        *self.synced.borrow()
    }

    pub fn synced(&self) -> watch::Receiver<bool> {
        self.synced.subscribe()
    }

    /// Look up one patient by id.
    pub fn get(&self, patient_id: &str) -> Option<Patient> {
        self.patients().iter().find(|p| p.id == patient_id).cloned()
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Apply one push signal. Never fails: malformed input is logged and dropped.
    pub fn apply(&self, event: PatientEvent) {
        match event {
            PatientEvent::Snapshot(list) => {
                let list = dedupe(list);
                tracing::debug!(count = list.len(), "Patient snapshot");
                self.cell.replace(list);
                self.synced.send_if_modified(|synced| !std::mem::replace(synced, true));
            }
            PatientEvent::Changed(delta) => {
                if delta.id.is_empty() {
                    tracing::warn!("Dropping patient delta without id");
                    return;
                }
                self.cell.update(|list| {
                    match list.iter_mut().find(|p| p.id == delta.id) {
                        Some(existing) => delta.merge_into(existing),
                        None => {
                            tracing::debug!(patient_id = %delta.id, "New patient from delta");
                            list.push(delta.into_patient());
                        }
                    }
                    true
                });
            }
            PatientEvent::Removed(id) => {
                let removed = self.cell.update(|list| {
                    let before = list.len();
                    list.retain(|p| p.id != id);
                    list.len() != before
                });
                if !removed {
                    tracing::debug!(patient_id = %id, "Removal of unknown patient ignored");
                }
            }
        }
    }

    // =========================================================================
    // Mutations (remote only)
    // =========================================================================

    /// Create one patient.
    pub async fn add(&self, patient: NewPatient) -> QueueResult<Patient> {
        if patient.full_name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let created = self.backend.create_patient(&patient).await.map_err(|e| {
            tracing::warn!(error = %e, "Create patient rejected");
            e
        })?;
        tracing::info!(patient_id = %created.id, number = created.assigned_number, "Patient created");
        Ok(created)
    }

    /// Create many patients in one request. Returns the batch size.
    pub async fn bulk_add(&self, patients: Vec<NewPatient>) -> QueueResult<usize> {
        if patients.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }
        if patients.iter().any(|p| p.full_name.trim().is_empty()) {
            return Err(ValidationError::EmptyName.into());
        }
        self.backend.bulk_create_patients(&patients).await.map_err(|e| {
            tracing::warn!(count = patients.len(), error = %e, "Bulk create rejected");
            e
        })?;
        Ok(patients.len())
    }

    /// Booked patient has arrived; moves to waiting.
    pub async fn mark_arrived(&self, patient_id: &str) -> QueueResult<StatusAck> {
        self.backend.mark_arrived(patient_id).await.map_err(|e| {
            tracing::warn!(patient_id, error = %e, "Mark arrived rejected");
            e.into()
        })
    }

    /// Move a patient into visit.
    pub async fn call(&self, patient_id: &str) -> QueueResult<StatusAck> {
        self.backend.call_patient(patient_id).await.map_err(|e| {
            tracing::warn!(patient_id, error = %e, "Call rejected");
            e.into()
        })
    }

    /// Edit patient fields.
    pub async fn update(&self, patient_id: &str, update: PatientUpdate) -> QueueResult<()> {
        if update.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }
        if matches!(&update.full_name, Some(name) if name.trim().is_empty()) {
            return Err(ValidationError::EmptyName.into());
        }
        self.backend
            .update_patient(patient_id, &update)
            .await
            .map_err(|e| {
                tracing::warn!(patient_id, error = %e, "Update rejected");
                e.into()
            })
    }

    pub async fn remove(&self, patient_id: &str) -> QueueResult<()> {
        self.backend.remove_patient(patient_id).await.map_err(|e| {
            tracing::warn!(patient_id, error = %e, "Remove rejected");
            e.into()
        })
    }

    /// Close the patient's cycle; they become follow-up candidates later.
    pub async fn archive(&self, patient_id: &str) -> QueueResult<()> {
        self.backend.archive_patient(patient_id).await.map_err(|e| {
            tracing::warn!(patient_id, error = %e, "Archive rejected");
            e.into()
        })
    }

    /// A follow-up was done; the record leaves the clinic list.
    pub async fn complete_follow_up(&self, patient_id: &str) -> QueueResult<()> {
        self.remove(patient_id).await
    }

    pub async fn remove_all(&self) -> QueueResult<()> {
        self.backend.remove_all_patients().await.map_err(|e| {
            tracing::warn!(error = %e, "Remove all rejected");
            e.into()
        })
    }
}

/// Drop records without id and collapse repeated ids (last value wins,
/// first position kept).
fn dedupe(list: Vec<Patient>) -> Vec<Patient> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(list.len());
    let mut out: Vec<Patient> = Vec::with_capacity(list.len());

    for patient in list {
        if patient.id.is_empty() {
            tracing::warn!(name = %patient.full_name, "Dropping snapshot entry without id");
            continue;
        }
        match index.get(&patient.id) {
            Some(&pos) => {
                tracing::warn!(patient_id = %patient.id, "Duplicate id in snapshot");
                out[pos] = patient;
            }
            None => {
                index.insert(patient.id.clone(), out.len());
                out.push(patient);
            }
        }
    }
    out
}
