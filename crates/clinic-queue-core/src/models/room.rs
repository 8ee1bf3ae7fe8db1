//! Room (study) identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A consultation room: either a numbered study or a named area such as a gym.
///
/// Ordering puts numbered rooms first (ascending), then named rooms by
/// case-sensitive text. Text that holds an integer is normalised to
/// `Number` on construction, so `"2"` and `2` are the same room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomId {
    Number(i64),
    Name(String),
}

impl RoomId {
    /// Parse a room label, normalising integer text to a numbered room.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => RoomId::Number(n),
            Err(_) => RoomId::Name(trimmed.to_string()),
        }
    }

    /// Whether this is a numbered study.
    pub fn is_numbered(&self) -> bool {
        matches!(self, RoomId::Number(_))
    }
}

impl From<i64> for RoomId {
    fn from(n: i64) -> Self {
        RoomId::Number(n)
    }
}

impl From<&str> for RoomId {
    fn from(label: &str) -> Self {
        RoomId::parse(label)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Number(n) => write!(f, "{}", n),
            RoomId::Name(name) => f.write_str(name),
        }
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RoomId::Number(n) => serializer.serialize_i64(*n),
            RoomId::Name(name) => serializer.serialize_str(name),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoom {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawRoom::deserialize(deserializer)? {
            RawRoom::Int(n) => RoomId::Number(n),
            RawRoom::Float(f) if f.fract() == 0.0 => RoomId::Number(f as i64),
            RawRoom::Float(f) => RoomId::Name(f.to_string()),
            RawRoom::Text(text) => RoomId::parse(&text),
        })
    }
}
