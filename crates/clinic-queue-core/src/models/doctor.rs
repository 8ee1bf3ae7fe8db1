//! Doctor models.

use serde::{Deserialize, Serialize};

use super::RoomId;

fn default_active() -> bool {
    true
}

/// A doctor on the clinic roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Backend id
    pub id: String,
    /// Display name, e.g. "dott.ssa Delfino Claudia"
    pub name: String,
    /// Room the doctor works in today
    pub study: RoomId,
    /// Name of the most recently called patient (display only)
    #[serde(default)]
    pub last_patient: Option<String>,
    /// False only for entries of the complete roster that are not on duty
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Doctor {
    /// Create an active doctor with no call history.
    pub fn new(id: impl Into<String>, name: impl Into<String>, study: impl Into<RoomId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            study: study.into(),
            last_patient: None,
            active: true,
        }
    }
}
