use super::shared::{
    deserialize_exdates, deserialize_list, from_db_instant, serialize_exdates, serialize_list,
    to_db_instant,
};
use super::MeetingService;
use crate::models::meeting::Meeting;
use crate::models::timeslot::{MeetingId, Timeslot};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{self, params, Row};

const SELECT_COLUMNS: &str = "SELECT id, start_datetime, end_datetime, recurrence_rule,
        recurrence_exceptions, last_occurrence, subjects, notes, participants, match_ref
     FROM meetings";

impl<'a> MeetingService<'a> {
    /// Insert a meeting and return it under its new row id.
    pub fn create(&self, meeting: &Meeting) -> Result<Meeting> {
        meeting.validate().map_err(|e| anyhow!(e))?;

        let now = to_db_instant(Utc::now());
        self.conn
            .execute(
                "INSERT INTO meetings (
                    start_datetime, end_datetime, recurrence_rule, recurrence_exceptions,
                    last_occurrence, subjects, notes, participants, match_ref,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    to_db_instant(meeting.time.from),
                    to_db_instant(meeting.time.to),
                    meeting.time.recur,
                    serialize_exdates(&meeting.time.exdates),
                    meeting.time.last.map(to_db_instant),
                    serialize_list(&meeting.subjects),
                    meeting.notes,
                    serialize_list(&meeting.participants),
                    meeting.match_ref,
                    &now,
                    &now,
                ],
            )
            .context("Failed to insert meeting")?;

        let id = self.conn.last_insert_rowid();
        Ok(meeting.clone().with_id(MeetingId::persisted(id.to_string())))
    }

    /// Retrieve a meeting by row id.
    pub fn get(&self, id: i64) -> Result<Option<Meeting>> {
        let result = self.conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            [id],
            row_to_meeting,
        );

        match result {
            Ok(meeting) => Ok(Some(meeting)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite a meeting. Returns `None` when the row does not exist.
    pub fn update(&self, id: i64, meeting: &Meeting) -> Result<Option<Meeting>> {
        meeting.validate().map_err(|e| anyhow!(e))?;

        let rows_affected = self
            .conn
            .execute(
                "UPDATE meetings SET
                    start_datetime = ?, end_datetime = ?, recurrence_rule = ?,
                    recurrence_exceptions = ?, last_occurrence = ?, subjects = ?, notes = ?,
                    participants = ?, match_ref = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    to_db_instant(meeting.time.from),
                    to_db_instant(meeting.time.to),
                    meeting.time.recur,
                    serialize_exdates(&meeting.time.exdates),
                    meeting.time.last.map(to_db_instant),
                    serialize_list(&meeting.subjects),
                    meeting.notes,
                    serialize_list(&meeting.participants),
                    meeting.match_ref,
                    to_db_instant(Utc::now()),
                    id,
                ],
            )
            .context("Failed to update meeting")?;

        if rows_affected == 0 {
            return Ok(None);
        }

        self.get(id)
    }

    /// Delete a meeting. Returns `false` when the row did not exist.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM meetings WHERE id = ?", [id])
            .context("Failed to delete meeting")?;

        Ok(rows_affected > 0)
    }

    /// Meetings overlapping `[from, to)`, ordered by start.
    pub fn list_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Meeting>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE start_datetime < ?1 AND end_datetime > ?2 ORDER BY start_datetime, end_datetime",
            SELECT_COLUMNS
        ))?;

        let meetings = stmt
            .query_map(params![to_db_instant(to), to_db_instant(from)], row_to_meeting)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list meetings")?;

        Ok(meetings)
    }
}

fn row_to_meeting(row: &Row) -> rusqlite::Result<Meeting> {
    let id = MeetingId::persisted(row.get::<_, i64>(0)?.to_string());
    let last: Option<String> = row.get(5)?;

    Ok(Meeting {
        id: id.clone(),
        time: Timeslot {
            id,
            from: from_db_instant(row.get(1)?)?,
            to: from_db_instant(row.get(2)?)?,
            recur: row.get(3)?,
            exdates: deserialize_exdates(row.get(4)?)?,
            last: last.map(from_db_instant).transpose()?,
        },
        subjects: deserialize_list(row.get(6)?)?,
        notes: row.get(7)?,
        participants: deserialize_list(row.get(8)?)?,
        match_ref: row.get(9)?,
    })
}
