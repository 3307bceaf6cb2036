// Roster Provider
//
// The wheel only ever sees an ordered, read-only copy of the roster taken at
// spin start. Two providers exist: `LocalRoster` (in memory, persisted as the
// browser-local JSON blob) and the table-backed session roster in lib.rs.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use spacetimedb::{SpacetimeType, Timestamp};

pub const MIN_NAME_CHARS: usize = 2;
pub const MAX_NAME_CHARS: usize = 64;

/// A registered student. Never mutated after registration.
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: u64,
    pub name: String,
    pub registered_at: Timestamp,
}

/// Source of the ordered participant list the wheel is built from
pub trait RosterProvider {
    /// Snapshot in registration order. The caller owns the copy, so later
    /// registrations never leak into a spin already in flight.
    fn roster(&self) -> Vec<Participant>;
}

impl RosterProvider for [Participant] {
    fn roster(&self) -> Vec<Participant> {
        self.to_vec()
    }
}

impl RosterProvider for Vec<Participant> {
    fn roster(&self) -> Vec<Participant> {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationError {
    NameTooShort,
    NameTooLong,
    DuplicateName(String),
    UnknownParticipant(u64),
    IdsExhausted,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::NameTooShort => write!(
                f,
                "Please enter a valid name (at least {} characters).",
                MIN_NAME_CHARS
            ),
            RegistrationError::NameTooLong => {
                write!(f, "Name is too long (at most {} characters).", MAX_NAME_CHARS)
            }
            RegistrationError::DuplicateName(name) => {
                write!(f, "The name \"{}\" is already registered.", name)
            }
            RegistrationError::UnknownParticipant(id) => {
                write!(f, "No participant with id {}.", id)
            }
            RegistrationError::IdsExhausted => {
                write!(f, "No participant ids left in this roster.")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Trim and length-check a submitted name
pub fn normalize_name(raw: &str) -> Result<String, RegistrationError> {
    let name = raw.trim();
    let chars = name.chars().count();
    if chars < MIN_NAME_CHARS {
        return Err(RegistrationError::NameTooShort);
    }
    if chars > MAX_NAME_CHARS {
        return Err(RegistrationError::NameTooLong);
    }
    Ok(name.to_string())
}

/// Case-insensitive name comparison used for the uniqueness rule
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Convert to the `toISOString` shape: 2024-05-01T09:00:00.000Z
pub fn format_iso_timestamp(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_micros(ts.to_micros_since_unix_epoch())
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_iso_timestamp(raw: &str) -> Result<Timestamp, String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("Invalid timestamp '{}': {}", raw, e))?;
    Ok(Timestamp::from_micros_since_unix_epoch(parsed.timestamp_micros()))
}

/// In-memory roster with key-value (JSON) persistence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalRoster {
    participants: Vec<Participant>,
}

impl LocalRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.participants.iter().any(|p| same_name(&p.name, name))
    }

    /// Register a new participant. Ids are millisecond timestamps bumped to stay
    /// strictly increasing when two students register in the same millisecond.
    pub fn register(&mut self, raw_name: &str, now: Timestamp) -> Result<&Participant, RegistrationError> {
        let name = normalize_name(raw_name)?;
        if self.contains_name(&name) {
            return Err(RegistrationError::DuplicateName(name));
        }

        let now_ms = (now.to_micros_since_unix_epoch().max(0) / 1000) as u64;
        let id = match self.participants.last() {
            Some(last) => last.id
                .checked_add(1)
                .ok_or(RegistrationError::IdsExhausted)?
                .max(now_ms),
            None => now_ms,
        };

        self.participants.push(Participant { id, name, registered_at: now });
        Ok(&self.participants[self.participants.len() - 1])
    }

    pub fn remove(&mut self, id: u64) -> Result<Participant, RegistrationError> {
        let position = self.participants
            .iter()
            .position(|p| p.id == id)
            .ok_or(RegistrationError::UnknownParticipant(id))?;
        Ok(self.participants.remove(position))
    }

    /// Remove everyone, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.participants.len();
        self.participants.clear();
        removed
    }

    /// Serialize as `[{"id", "name", "registeredAt"}]`
    pub fn to_json(&self) -> String {
        let entries: Vec<Value> = self.participants
            .iter()
            .map(|p| json!({
                "id": p.id,
                "name": p.name,
                "registeredAt": format_iso_timestamp(p.registered_at),
            }))
            .collect();
        Value::Array(entries).to_string()
    }

    /// Load a roster saved by `to_json` (or by the browser-only picker).
    /// Names are re-validated; duplicates are rejected rather than merged.
    pub fn from_json(data: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(data)
            .map_err(|e| format!("Invalid JSON: {}", e))?;
        let entries = value.as_array()
            .ok_or("Expected JSON array of participants")?;

        let mut roster = LocalRoster::new();
        let mut seen_ids = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            let id = parse_id(entry.get("id"))
                .ok_or(format!("Participant {}: missing id", i))?;
            if !seen_ids.insert(id) {
                return Err(format!("Participant {}: duplicate id {}", i, id));
            }
            let raw_name = entry.get("name")
                .and_then(|v| v.as_str())
                .ok_or(format!("Participant {}: missing name", i))?;
            let name = normalize_name(raw_name)
                .map_err(|e| format!("Participant {}: {}", i, e))?;
            if roster.contains_name(&name) {
                return Err(format!("Participant {}: {}", i, RegistrationError::DuplicateName(name)));
            }
            // Older saves may lack registeredAt; the id is the registration time in ms
            let registered_at = match entry.get("registeredAt") {
                Some(raw) => parse_registered_at(raw).map_err(|e| format!("Participant {}: {}", i, e))?,
                None => Timestamp::from_micros_since_unix_epoch((id as i64).saturating_mul(1000)),
            };

            roster.participants.push(Participant { id, name, registered_at });
        }

        // Saved order is registration order, but keep ids ascending to match
        roster.participants.sort_by_key(|p| p.id);
        Ok(roster)
    }
}

impl RosterProvider for LocalRoster {
    fn roster(&self) -> Vec<Participant> {
        self.participants.clone()
    }
}

/// ISO strings from the browser, or the SDK export shape
/// `{"__timestamp_micros_since_unix_epoch__": "123456"}` from a session table dump
fn parse_registered_at(value: &Value) -> Result<Timestamp, String> {
    if let Some(raw) = value.as_str() {
        return parse_iso_timestamp(raw);
    }
    let micros_str = value.get("__timestamp_micros_since_unix_epoch__")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid registeredAt")?;
    let micros: i64 = micros_str.parse()
        .map_err(|e| format!("Invalid timestamp micros: {}", e))?;
    Ok(Timestamp::from_micros_since_unix_epoch(micros))
}

/// Ids are numbers locally and string keys when they came from a realtime store
fn parse_id(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
