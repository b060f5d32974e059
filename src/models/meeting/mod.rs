// Meeting module
// A scheduled meeting: one timeslot plus descriptive fields

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::timeslot::{MeetingId, Timeslot, ValidationError};

/// Meeting as shown on the grid and exchanged with the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub time: Timeslot,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Reference to the match (pairing) this meeting was booked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_ref: Option<String>,
}

impl Meeting {
    /// Create an unsaved meeting with a temporary id
    ///
    /// # Examples
    /// ```
    /// use meeting_grid::models::meeting::Meeting;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let meeting = Meeting::new(start, start + Duration::hours(1)).unwrap();
    /// assert!(meeting.id.is_temporary());
    /// ```
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ValidationError> {
        let id = MeetingId::temporary();
        Ok(Self {
            time: Timeslot::new(id.clone(), from, to)?,
            id,
            subjects: Vec::new(),
            notes: String::new(),
            participants: Vec::new(),
            match_ref: None,
        })
    }

    pub fn builder() -> MeetingBuilder {
        MeetingBuilder::new()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.time.validate()
    }

    /// Replace the id on the meeting and its timeslot
    pub fn reassign_id(&mut self, id: MeetingId) {
        self.time.id = id.clone();
        self.id = id;
    }

    pub fn with_id(mut self, id: MeetingId) -> Self {
        self.reassign_id(id);
        self
    }

    pub fn overlaps(&self, other: &Meeting) -> bool {
        self.time.overlaps(&other.time)
    }

    pub fn starts_on(&self, date: NaiveDate, tz: Tz) -> bool {
        self.time.start_date(tz) == date
    }

    /// Decode a wire payload, rejecting anything that fails validation
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let meeting: Meeting = serde_json::from_str(json)
            .map_err(|e| ValidationError::MalformedInstant(e.to_string()))?;
        meeting.validate()?;
        Ok(meeting)
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Builder for meetings with optional fields
#[derive(Default)]
pub struct MeetingBuilder {
    id: Option<MeetingId>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    subjects: Vec<String>,
    notes: String,
    participants: Vec<String>,
    match_ref: Option<String>,
    recur: Option<String>,
    exdates: Vec<DateTime<Utc>>,
}

impl MeetingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: MeetingId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn start(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn end(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.push(subject.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn participant(mut self, participant: impl Into<String>) -> Self {
        self.participants.push(participant.into());
        self
    }

    pub fn match_ref(mut self, match_ref: impl Into<String>) -> Self {
        self.match_ref = Some(match_ref.into());
        self
    }

    /// Set the recurrence rule (RRULE format)
    pub fn recur(mut self, rule: impl Into<String>) -> Self {
        self.recur = Some(rule.into());
        self
    }

    pub fn exdate(mut self, date: DateTime<Utc>) -> Self {
        self.exdates.push(date);
        self
    }

    pub fn build(self) -> Result<Meeting, ValidationError> {
        let from = self
            .from
            .ok_or_else(|| ValidationError::MalformedInstant("start time is required".into()))?;
        let to = self
            .to
            .ok_or_else(|| ValidationError::MalformedInstant("end time is required".into()))?;
        let id = self.id.unwrap_or_else(MeetingId::temporary);

        let meeting = Meeting {
            id: id.clone(),
            time: Timeslot {
                id,
                from,
                to,
                exdates: self.exdates,
                recur: self.recur,
                last: None,
            },
            subjects: self.subjects,
            notes: self.notes,
            participants: self.participants,
            match_ref: self.match_ref,
        };

        meeting.validate()?;
        Ok(meeting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_meeting_is_temporary() {
        let meeting = Meeting::new(nine(), nine() + Duration::hours(1)).unwrap();
        assert!(meeting.id.is_temporary());
        assert_eq!(meeting.id, meeting.time.id);
    }

    #[test]
    fn test_new_meeting_invalid_times() {
        let result = Meeting::new(nine(), nine() - Duration::hours(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_with_optional_fields() {
        let meeting = Meeting::builder()
            .id(MeetingId::persisted("12"))
            .start(nine())
            .end(nine() + Duration::minutes(45))
            .subject("Maths")
            .subject("Physics")
            .notes("bring the worksheet")
            .participant("ana")
            .match_ref("match-3")
            .build()
            .unwrap();

        assert_eq!(meeting.id, MeetingId::persisted("12"));
        assert_eq!(meeting.time.id, MeetingId::persisted("12"));
        assert_eq!(meeting.subjects, vec!["Maths", "Physics"]);
        assert_eq!(meeting.match_ref.as_deref(), Some("match-3"));
    }

    #[test]
    fn test_builder_missing_start() {
        let result = Meeting::builder().end(nine()).build();
        assert!(matches!(result, Err(ValidationError::MalformedInstant(_))));
    }

    #[test]
    fn test_reassign_id_updates_timeslot() {
        let mut meeting = Meeting::new(nine(), nine() + Duration::hours(1)).unwrap();
        meeting.reassign_id(MeetingId::persisted("99"));
        assert_eq!(meeting.id, MeetingId::persisted("99"));
        assert_eq!(meeting.time.id, MeetingId::persisted("99"));
    }

    #[test]
    fn test_json_round_trip_keeps_fields() {
        let meeting = Meeting::builder()
            .id(MeetingId::persisted("5"))
            .start(nine())
            .end(nine() + Duration::hours(1))
            .subject("Chemistry")
            .recur("FREQ=WEEKLY;BYDAY=MO")
            .build()
            .unwrap();

        let decoded = Meeting::from_json(&meeting.to_json()).unwrap();
        assert_eq!(decoded, meeting);
    }

    #[test]
    fn test_from_json_rejects_inverted_interval() {
        let json = r#"{"id":"1","time":{"id":"1","from":"2025-01-06T10:00:00Z","to":"2025-01-06T09:00:00Z"}}"#;
        assert!(matches!(
            Meeting::from_json(json),
            Err(ValidationError::EmptyInterval { .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_malformed_instant() {
        let json = r#"{"id":"1","time":{"id":"1","from":"yesterday","to":"2025-01-06T09:00:00Z"}}"#;
        assert!(matches!(
            Meeting::from_json(json),
            Err(ValidationError::MalformedInstant(_))
        ));
    }
}
