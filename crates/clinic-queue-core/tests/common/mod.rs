//! In-memory backend and channel for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::mpsc;

use clinic_queue_core::backend::{Backend, BackendError, BackendResult};
use clinic_queue_core::models::{
    Doctor, NewDoctor, NewPatient, Patient, PatientStatus, PatientUpdate, RoomId, StatusAck,
};
use clinic_queue_core::realtime::{ChannelError, ChannelResult, Link, Transport};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
}

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    today().and_hms_opt(h, m, 0).unwrap()
}

pub fn waiting(id: &str, name: &str, doctor_id: &str, time: NaiveDateTime) -> Patient {
    let mut p = Patient::new(id, name, PatientStatus::Waiting);
    p.assigned_doctor_id = Some(doctor_id.to_string());
    p.appointment_time = Some(time);
    p
}

type CallHook = Box<dyn Fn(&str) + Send + Sync>;

/// Records every request; individual endpoints can be told to fail.
#[derive(Default)]
pub struct FakeBackend {
    pub requests: Mutex<Vec<String>>,
    pub doctors: Mutex<Vec<Doctor>>,
    pub doctor_names: Mutex<Vec<String>>,
    pub created: Mutex<Vec<NewPatient>>,
    pub fail_call: AtomicBool,
    pub fail_label: AtomicBool,
    pub fail_fetch: AtomicBool,
    /// Runs inside `call_patient`, before the acknowledgement
    pub on_call: Mutex<Option<CallHook>>,
}

impl FakeBackend {
    pub fn with_doctors(doctors: Vec<Doctor>) -> Arc<Self> {
        let backend = Self::default();
        *backend.doctors.lock().unwrap() = doctors;
        Arc::new(backend)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_on_call(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_call.lock().unwrap() = Some(Box::new(hook));
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }

    fn rejected(message: &str) -> BackendError {
        BackendError::Rejected {
            status: 500,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn create_patient(&self, patient: &NewPatient) -> BackendResult<Patient> {
        self.record(format!("create:{}", patient.full_name));
        self.created.lock().unwrap().push(patient.clone());
        let mut created = Patient::new("new", patient.full_name.clone(), PatientStatus::Waiting);
        created.assigned_number = 1;
        Ok(created)
    }

    async fn bulk_create_patients(&self, patients: &[NewPatient]) -> BackendResult<()> {
        self.record(format!("bulk:{}", patients.len()));
        self.created.lock().unwrap().extend_from_slice(patients);
        Ok(())
    }

    async fn mark_arrived(&self, patient_id: &str) -> BackendResult<StatusAck> {
        self.record(format!("arrive:{}", patient_id));
        Ok(StatusAck {
            id: patient_id.to_string(),
            status: PatientStatus::Waiting,
        })
    }

    async fn call_patient(&self, patient_id: &str) -> BackendResult<StatusAck> {
        self.record(format!("call:{}", patient_id));
        if self.fail_call.load(Ordering::SeqCst) {
            return Err(Self::rejected("Patient already in visit"));
        }
        if let Some(hook) = self.on_call.lock().unwrap().as_ref() {
            hook(patient_id);
        }
        Ok(StatusAck {
            id: patient_id.to_string(),
            status: PatientStatus::InVisit,
        })
    }

    async fn update_patient(&self, patient_id: &str, _update: &PatientUpdate) -> BackendResult<()> {
        self.record(format!("update:{}", patient_id));
        Ok(())
    }

    async fn remove_patient(&self, patient_id: &str) -> BackendResult<()> {
        self.record(format!("remove:{}", patient_id));
        Ok(())
    }

    async fn archive_patient(&self, patient_id: &str) -> BackendResult<()> {
        self.record(format!("archive:{}", patient_id));
        Ok(())
    }

    async fn remove_all_patients(&self) -> BackendResult<()> {
        self.record("remove_all".to_string());
        Ok(())
    }

    async fn create_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor> {
        self.record(format!("create_doctor:{}", doctor.name));
        Ok(Doctor::new("new-doctor", doctor.name.clone(), doctor.study.clone()))
    }

    async fn remove_doctor(&self, doctor_id: &str) -> BackendResult<()> {
        self.record(format!("remove_doctor:{}", doctor_id));
        Ok(())
    }

    async fn update_doctor_last_patient(&self, doctor_id: &str, patient_name: &str) -> BackendResult<()> {
        self.record(format!("label:{}:{}", doctor_id, patient_name));
        if self.fail_label.load(Ordering::SeqCst) {
            return Err(Self::rejected("Doctor not found"));
        }
        Ok(())
    }

    async fn fetch_active_doctors(&self) -> BackendResult<Vec<Doctor>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".into()));
        }
        Ok(self.doctors.lock().unwrap().clone())
    }

    async fn fetch_all_doctors(&self) -> BackendResult<Vec<Doctor>> {
        let mut all = self.doctors.lock().unwrap().clone();
        let mut off_duty = Doctor::new("off", "Dr. Riposo", RoomId::Number(9));
        off_duty.active = false;
        all.push(off_duty);
        Ok(all)
    }

    async fn fetch_doctor_names(&self) -> BackendResult<Vec<String>> {
        Ok(self.doctor_names.lock().unwrap().clone())
    }
}

/// Transport whose single connection is fed by the test through a channel.
pub struct PipeTransport {
    inbound: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl PipeTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound: Mutex::new(Some(rx)),
            sent: Arc::new(Mutex::new(Vec::new())),
        });
        (transport, tx)
    }
}

struct PipeLink {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Link for PipeLink {
    async fn send(&mut self, frame: String) -> ChannelResult<()> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<ChannelResult<String>> {
        self.inbound.recv().await.map(Ok)
    }
}

#[async_trait]
impl Transport for PipeTransport {
    async fn connect(&self) -> ChannelResult<Box<dyn Link>> {
        let inbound = self.inbound.lock().unwrap().take();
        match inbound {
            Some(inbound) => Ok(Box::new(PipeLink {
                inbound,
                sent: self.sent.clone(),
            })),
            None => Err(ChannelError::Socket("already used".into())),
        }
    }
}
