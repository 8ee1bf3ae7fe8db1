//! Realtime push channel.
//!
//! One persistent connection per terminal session. On every (re)connect the
//! adapter re-announces the terminal's room, because the server forgets room
//! membership when a socket drops. Decoded events are forwarded, in arrival
//! order, to a single mpsc queue consumed by the store reconciliation task.

pub mod wire;
mod ws;

pub use ws::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::config::{ReconnectPolicy, TerminalRole};
use crate::models::{Patient, PatientDelta};

use wire::Frame;

/// Channel errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Connection closed")]
    Closed,

    #[error("Server refused connection: {0}")]
    Rejected(String),

    #[error("Malformed frame: {0}")]
    Malformed(String),
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Events delivered to the stores.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Joined (or re-joined) after a connect
    Connected,
    /// Full replacement of the patient collection
    PatientsSnapshot(Vec<Patient>),
    /// Partial update or creation of one patient
    PatientChanged(PatientDelta),
    /// One patient deleted
    PatientRemoved { id: String },
    /// Doctor roster changed; re-fetch it
    DoctorsChanged,
}

/// Passive connectivity indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Closed,
}

/// Opens connections to the push server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> ChannelResult<Box<dyn Link>>;
}

/// One open connection carrying text frames.
#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, frame: String) -> ChannelResult<()>;

    /// Next text frame; `None` once the peer closed.
    async fn recv(&mut self) -> Option<ChannelResult<String>>;
}

enum SessionEnd {
    Shutdown,
    ReceiverGone,
    Lost { joined: bool, error: ChannelError },
}

/// Maintains the push connection and feeds decoded events downstream.
pub struct ChannelAdapter {
    transport: Arc<dyn Transport>,
    role: TerminalRole,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
}

impl ChannelAdapter {
    /// Create an adapter for a terminal role.
    pub fn new(transport: Arc<dyn Transport>, role: TerminalRole, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            transport,
            role,
            policy,
            state,
        }
    }

    /// Connection state stream (latest value replayed to new subscribers).
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Run until shutdown is signalled or the event receiver is dropped.
    pub async fn run(self, events: mpsc::Sender<ChannelEvent>, mut shutdown: watch::Receiver<bool>) {
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.state.send_replace(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            });

            let connected = tokio::select! {
                result = self.transport.connect() => result,
                _ = shutdown.changed() => break,
            };

            match connected {
                Ok(mut link) => match self.session(link.as_mut(), &events, &mut shutdown).await {
                    SessionEnd::Shutdown | SessionEnd::ReceiverGone => break,
                    SessionEnd::Lost { joined, error } => {
                        tracing::warn!(error = %error, "Push channel lost");
                        if joined {
                            attempt = 0;
                        }
                    }
                },
                Err(error) => {
                    tracing::warn!(attempt, error = %error, "Push channel connect failed");
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = self.policy.delay(attempt);
            self.state
                .send_replace(ConnectionState::Reconnecting { attempt });
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.state.send_replace(ConnectionState::Closed);
        tracing::info!("Push channel closed");
    }

    async fn session(
        &self,
        link: &mut dyn Link,
        events: &mpsc::Sender<ChannelEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let mut joined = false;

        loop {
            let next = tokio::select! {
                next = link.recv() => next,
                _ = shutdown.changed() => return SessionEnd::Shutdown,
            };

            let text = match next {
                Some(Ok(text)) => text,
                Some(Err(error)) => return SessionEnd::Lost { joined, error },
                None => {
                    return SessionEnd::Lost {
                        joined,
                        error: ChannelError::Closed,
                    }
                }
            };

            let frame = match wire::decode_frame(&text) {
                Ok(frame) => frame,
                Err(ChannelError::Rejected(reason)) => {
                    return SessionEnd::Lost {
                        joined,
                        error: ChannelError::Rejected(reason),
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Dropping undecodable frame");
                    continue;
                }
            };

            let reply = match frame {
                Frame::Open => Some(wire::CONNECT_PACKET.to_string()),
                Frame::Ping => Some(wire::PONG_PACKET.to_string()),
                Frame::Connected => {
                    if let Some(join) = wire::join_frame(&self.role) {
                        if let Err(error) = link.send(join).await {
                            return SessionEnd::Lost { joined, error };
                        }
                    }
                    joined = true;
                    self.state.send_replace(ConnectionState::Connected);
                    tracing::info!(role = ?self.role, "Joined push channel");
                    if events.send(ChannelEvent::Connected).await.is_err() {
                        return SessionEnd::ReceiverGone;
                    }
                    None
                }
                Frame::Close | Frame::Disconnected => {
                    return SessionEnd::Lost {
                        joined,
                        error: ChannelError::Closed,
                    }
                }
                Frame::Event { name, payload } => {
                    match wire::decode_event(&name, payload) {
                        Ok(Some(event)) => {
                            if events.send(event).await.is_err() {
                                return SessionEnd::ReceiverGone;
                            }
                        }
                        Ok(None) => tracing::debug!(event = %name, "Ignoring unknown event"),
                        Err(error) => {
                            tracing::warn!(event = %name, error = %error, "Dropping malformed event")
                        }
                    }
                    None
                }
                Frame::Pong | Frame::Ignored => None,
            };

            if let Some(reply) = reply {
                if let Err(error) = link.send(reply).await {
                    return SessionEnd::Lost { joined, error };
                }
            }
        }
    }
}
