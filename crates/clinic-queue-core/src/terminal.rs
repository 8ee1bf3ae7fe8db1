//! One terminal session: stores, channel and projection wired together.
//!
//! ```text
//! adapter ──mpsc──► reconciliation ──► PatientStore ──┐
//!                        │                            ├─► projection ──► board (watch)
//!                        └─notify─► refresher ──► DoctorStore ──┘             └──► announcements (broadcast)
//! ```
//!
//! Reconciliation is the only writer of the patient cache and processes
//! events strictly in arrival order. Doctor refreshes run on their own task
//! so a slow roster fetch never delays patient events; refresh requests that
//! pile up while a fetch is running collapse into one.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::Backend;
use crate::clock::{local_clock, Clock};
use crate::config::TerminalConfig;
use crate::models::{Doctor, NewPatient, Patient, PatientStatus};
use crate::projector::{detect_new_calls, CallAnnouncement, QueueBoard};
use crate::realtime::{ChannelAdapter, ChannelError, ChannelEvent, ConnectionState, Transport};
use crate::roster::{match_doctor_name, normalize_doctor_name, title_case};
use crate::sequencer::CallSequencer;
use crate::store::{DoctorStore, PatientEvent, PatientStore, Snapshot};
use crate::{QueueResult, ValidationError};

/// Capacity of the adapter → reconciliation queue.
const EVENT_QUEUE: usize = 256;
/// Announcements a slow display may fall behind by before losing some.
const ANNOUNCEMENT_BUFFER: usize = 32;
/// Recompute the board at least this often so "today" rolls over.
const CLOCK_TICK: Duration = Duration::from_secs(60);

/// Which booked appointments the board lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookedFilter {
    /// Whatever day the clock says it is, rolling over at midnight
    #[default]
    Today,
    /// One fixed calendar day
    Day(NaiveDate),
    /// Every day, with the calendar view
    All,
}

impl BookedFilter {
    /// The day to filter on at `today`, or `None` for every day.
    pub fn resolve(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            BookedFilter::Today => Some(today),
            BookedFilter::Day(day) => Some(day),
            BookedFilter::All => None,
        }
    }
}

/// Handle to a running terminal session.
pub struct Terminal {
    session_id: Uuid,
    patients: Arc<PatientStore>,
    doctors: Arc<DoctorStore>,
    sequencer: Arc<CallSequencer>,
    board: watch::Receiver<Arc<QueueBoard>>,
    booked_filter: watch::Sender<BookedFilter>,
    announcements: broadcast::Sender<CallAnnouncement>,
    connection: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Terminal {
    /// Start a session on the current tokio runtime.
    pub fn start(config: TerminalConfig, backend: Arc<dyn Backend>, transport: Arc<dyn Transport>) -> Self {
        Self::start_with_clock(config, backend, transport, local_clock())
    }

    pub fn start_with_clock(
        config: TerminalConfig,
        backend: Arc<dyn Backend>,
        transport: Arc<dyn Transport>,
        clock: Clock,
    ) -> Self {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("terminal", session = %session_id, role = ?config.role);
        tracing::info!(parent: &span, api_url = %config.api_url, "Starting terminal session");

        let patients = Arc::new(PatientStore::new(backend.clone()));
        let doctors = Arc::new(DoctorStore::new(backend));
        let sequencer = Arc::new(CallSequencer::new(
            patients.clone(),
            doctors.clone(),
            clock.clone(),
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let (booked_filter, filter_rx) = watch::channel(BookedFilter::Today);
        let (board_tx, board) = watch::channel(Arc::new(QueueBoard::empty(clock())));
        let (announcements, _) = broadcast::channel(ANNOUNCEMENT_BUFFER);
        let refresh = Arc::new(Notify::new());

        let adapter = ChannelAdapter::new(transport, config.role.clone(), config.reconnect.clone());
        let connection = adapter.state();

        // Roster is fetched once up front; later fetches follow push signals.
        refresh.notify_one();

        let tasks = vec![
            tokio::spawn(
                adapter
                    .run(events_tx, shutdown_rx.clone())
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                reconcile(events_rx, patients.clone(), refresh.clone()).instrument(span.clone()),
            ),
            tokio::spawn(
                refresh_doctors(doctors.clone(), refresh, shutdown_rx.clone())
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                project(
                    Projection {
                        patients: patients.subscribe(),
                        doctors: doctors.subscribe(),
                        filter: filter_rx,
                        board: board_tx,
                        announcements: announcements.clone(),
                        clock,
                    },
                    shutdown_rx,
                )
                .instrument(span),
            ),
        ];

        Self {
            session_id,
            patients,
            doctors,
            sequencer,
            board,
            booked_filter,
            announcements,
            connection,
            shutdown,
            tasks,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn patients(&self) -> &Arc<PatientStore> {
        &self.patients
    }

    pub fn doctors(&self) -> &Arc<DoctorStore> {
        &self.doctors
    }

    pub fn sequencer(&self) -> &Arc<CallSequencer> {
        &self.sequencer
    }

    /// Replayable board stream.
    pub fn board(&self) -> watch::Receiver<Arc<QueueBoard>> {
        self.board.clone()
    }

    pub fn current_board(&self) -> Arc<QueueBoard> {
        self.board.borrow().clone()
    }

    /// New call announcements from the roster (waiting-room display).
    pub fn announcements(&self) -> broadcast::Receiver<CallAnnouncement> {
        self.announcements.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    /// Wait until the channel is up, a patient snapshot has arrived and the
    /// roster has been fetched once.
    ///
    /// Rooms resolve through the roster, so a queue read before then can look
    /// empty while patients are in fact waiting.
    pub async fn wait_until_synced(&self) -> QueueResult<()> {
        let mut state = self.connection.clone();
        let mut patients = self.patients.synced();
        let mut roster = self.doctors.loaded();

        state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .map_err(|_| ChannelError::Closed)?;
        patients
            .wait_for(|synced| *synced)
            .await
            .map_err(|_| ChannelError::Closed)?;
        roster
            .wait_for(|loaded| *loaded)
            .await
            .map_err(|_| ChannelError::Closed)?;
        Ok(())
    }

    /// Choose which booked appointments the board lists.
    pub fn set_booked_filter(&self, filter: BookedFilter) {
        self.booked_filter.send_replace(filter);
    }

    /// Validate doctor names against the master list and create the batch.
    ///
    /// The whole batch is rejected if any row names an unknown doctor.
    pub async fn import_patients(&self, batch: Vec<NewPatient>) -> QueueResult<usize> {
        if batch.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let names = self.doctors.doctor_names().await?;
        let active = self.doctors.doctors();

        let mut prepared = Vec::with_capacity(batch.len());
        for mut patient in batch {
            let raw = patient.assigned_doctor.take().unwrap_or_default();
            let canonical = match_doctor_name(&raw, &names)?.to_string();

            if patient.assigned_doctor_id.is_none() {
                patient.assigned_doctor_id = active_doctor_id(&active, &canonical);
            }
            patient.assigned_doctor = Some(canonical);
            patient.full_name = title_case(&patient.full_name);
            patient.status.get_or_insert(PatientStatus::Booked);
            prepared.push(patient);
        }

        let count = self.patients.bulk_add(prepared).await?;
        tracing::info!(session = %self.session_id, count, "Patients imported");
        Ok(count)
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Terminal task ended abnormally");
            }
        }
        tracing::info!(session = %self.session_id, "Terminal session stopped");
    }
}

fn active_doctor_id(active: &[Doctor], name: &str) -> Option<String> {
    let wanted = normalize_doctor_name(name);
    active
        .iter()
        .find(|d| normalize_doctor_name(&d.name) == wanted)
        .map(|d| d.id.clone())
}

/// Apply channel events in arrival order. Ends when the adapter stops.
async fn reconcile(mut events: mpsc::Receiver<ChannelEvent>, patients: Arc<PatientStore>, refresh: Arc<Notify>) {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Connected | ChannelEvent::DoctorsChanged => refresh.notify_one(),
            ChannelEvent::PatientsSnapshot(list) => patients.apply(PatientEvent::Snapshot(list)),
            ChannelEvent::PatientChanged(delta) => patients.apply(PatientEvent::Changed(delta)),
            ChannelEvent::PatientRemoved { id } => patients.apply(PatientEvent::Removed(id)),
        }
    }
}

async fn refresh_doctors(doctors: Arc<DoctorStore>, refresh: Arc<Notify>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = refresh.notified() => {
                if let Err(error) = doctors.refresh().await {
                    tracing::debug!(error = %error, "Roster stays stale until the next signal");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

struct Projection {
    patients: watch::Receiver<Snapshot<Patient>>,
    doctors: watch::Receiver<Snapshot<Doctor>>,
    filter: watch::Receiver<BookedFilter>,
    board: watch::Sender<Arc<QueueBoard>>,
    announcements: broadcast::Sender<CallAnnouncement>,
    clock: Clock,
}

/// Recompute the board on every snapshot, filter change or clock tick.
async fn project(mut p: Projection, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(CLOCK_TICK);
    let mut previous_doctors: Snapshot<Doctor> = Arc::new(Vec::new());

    loop {
        let patients = p.patients.borrow_and_update().clone();
        let doctors = p.doctors.borrow_and_update().clone();
        let now = (p.clock)();
        let filter = p.filter.borrow_and_update().resolve(now.date());

        if !Arc::ptr_eq(&previous_doctors, &doctors) {
            for call in detect_new_calls(&previous_doctors, &doctors) {
                tracing::info!(doctor_id = %call.doctor_id, room = %call.room, "New call");
                // No subscriber is fine
                let _ = p.announcements.send(call);
            }
            previous_doctors = doctors.clone();
        }

        let board = QueueBoard::project(&patients, &doctors, now, filter);
        p.board.send_replace(Arc::new(board));

        tokio::select! {
            changed = p.patients.changed() => if changed.is_err() { break },
            changed = p.doctors.changed() => if changed.is_err() { break },
            changed = p.filter.changed() => if changed.is_err() { break },
            _ = tick.tick() => {}
            _ = shutdown.changed() => break,
        }
    }
}
