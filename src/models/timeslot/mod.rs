// Timeslot module
// Bounded, optionally recurring time interval with its wire (ISO-8601) encoding

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix marking ids generated on the client before the store assigned one.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Input-boundary failures. These are contract violations, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("timeslot must end after it starts ({from} >= {to})")]
    EmptyInterval { from: String, to: String },
    #[error("invalid recurrence rule '{rule}': {reason}")]
    InvalidRecurrence { rule: String, reason: String },
    #[error("malformed meeting payload: {0}")]
    MalformedInstant(String),
    #[error("invalid meeting id '{0}'")]
    InvalidId(String),
}

/// Identifier of a meeting, either client-generated or assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MeetingId {
    Temporary(Uuid),
    Persisted(String),
}

impl MeetingId {
    /// Generate a fresh temporary id
    pub fn temporary() -> Self {
        Self::Temporary(Uuid::new_v4())
    }

    pub fn persisted(id: impl Into<String>) -> Self {
        Self::Persisted(id.into())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, MeetingId::Temporary(_))
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingId::Temporary(uuid) => write!(f, "{}{}", TEMP_ID_PREFIX, uuid),
            MeetingId::Persisted(id) => f.write_str(id),
        }
    }
}

impl FromStr for MeetingId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::InvalidId(value.to_string()));
        }

        match value.strip_prefix(TEMP_ID_PREFIX) {
            Some(raw) => Uuid::parse_str(raw)
                .map(MeetingId::Temporary)
                .map_err(|_| ValidationError::InvalidId(value.to_string())),
            None => Ok(MeetingId::Persisted(value.to_string())),
        }
    }
}

impl TryFrom<String> for MeetingId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MeetingId> for String {
    fn from(id: MeetingId) -> Self {
        id.to_string()
    }
}

/// A bounded time interval. `from < to` always holds for validated values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeslot {
    pub id: MeetingId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exdates: Vec<DateTime<Utc>>,
    /// RRULE body (RFC 5545), treated as opaque beyond syntax checking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<DateTime<Utc>>,
}

impl Timeslot {
    /// Create a validated, non-recurring timeslot
    pub fn new(
        id: MeetingId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let slot = Self {
            id,
            from,
            to,
            exdates: Vec::new(),
            recur: None,
            last: None,
        };
        slot.validate()?;
        Ok(slot)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from >= self.to {
            return Err(ValidationError::EmptyInterval {
                from: self.from.to_rfc3339(),
                to: self.to.to_rfc3339(),
            });
        }

        if let Some(rule) = &self.recur {
            rule.parse::<rrule::RRule<rrule::Unvalidated>>()
                .map_err(|e| ValidationError::InvalidRecurrence {
                    rule: rule.clone(),
                    reason: e.to_string(),
                })?;
        }

        Ok(())
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Timeslot) -> bool {
        self.to > other.from && self.from < other.to
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    pub fn is_recurring(&self) -> bool {
        self.recur.is_some()
    }

    /// Calendar date of the start instant in the given zone
    pub fn start_date(&self, tz: Tz) -> NaiveDate {
        self.from.with_timezone(&tz).date_naive()
    }
}
