//! Meeting persistence on SQLite.
//! Row-level CRUD used by the store implementation.

use rusqlite::Connection;

pub mod crud;
mod shared;

/// Service for meetings stored in SQLite.
pub struct MeetingService<'a> {
    pub(crate) conn: &'a Connection,
}

impl<'a> MeetingService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::meeting::Meeting;
    use crate::models::timeslot::MeetingId;
    use crate::services::database::Database;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn setup_test_db() -> Database {
        let db = Database::new(":memory:").unwrap();
        db.initialize_schema().unwrap();
        db
    }

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    fn sample_meeting() -> Meeting {
        Meeting::new(nine(), nine() + Duration::hours(1)).unwrap()
    }

    fn row_id(meeting: &Meeting) -> i64 {
        meeting.id.to_string().parse().unwrap()
    }

    #[test]
    fn test_create_assigns_persisted_id() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let created = service.create(&sample_meeting()).unwrap();
        assert!(!created.id.is_temporary());
        assert_eq!(created.time.id, created.id);
    }

    #[test]
    fn test_create_then_get_keeps_fields() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let meeting = Meeting::builder()
            .start(nine())
            .end(nine() + Duration::minutes(90))
            .subject("History")
            .notes("room 4")
            .participant("sam")
            .match_ref("m-1")
            .recur("FREQ=WEEKLY;BYDAY=MO")
            .exdate(nine() + Duration::weeks(1))
            .build()
            .unwrap();

        let created = service.create(&meeting).unwrap();
        let found = service.get(row_id(&created)).unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_get_nonexistent_meeting() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());
        assert!(service.get(999).unwrap().is_none());
    }

    #[test]
    fn test_update_meeting() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let mut meeting = service.create(&sample_meeting()).unwrap();
        meeting.time.from = nine() + Duration::minutes(15);
        meeting.time.to = nine() + Duration::minutes(75);

        let updated = service.update(row_id(&meeting), &meeting).unwrap().unwrap();
        assert_eq!(updated, meeting);
    }

    #[test]
    fn test_update_nonexistent_meeting() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let meeting = sample_meeting().with_id(MeetingId::persisted("999"));
        assert!(service.update(999, &meeting).unwrap().is_none());
    }

    #[test]
    fn test_delete_meeting() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let created = service.create(&sample_meeting()).unwrap();
        assert!(service.delete(row_id(&created)).unwrap());
        assert!(service.get(row_id(&created)).unwrap().is_none());
        assert!(!service.delete(row_id(&created)).unwrap());
    }

    #[test]
    fn test_list_range_uses_overlap() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let before = Meeting::new(nine() - Duration::days(2), nine() - Duration::days(2) + Duration::hours(1)).unwrap();
        let touching = Meeting::new(nine() - Duration::hours(1), nine()).unwrap();
        let inside = Meeting::new(nine() + Duration::hours(2), nine() + Duration::hours(3)).unwrap();
        let straddling = Meeting::new(nine() + Duration::hours(23), nine() + Duration::hours(25)).unwrap();
        for meeting in [&before, &touching, &inside, &straddling] {
            service.create(meeting).unwrap();
        }

        let found = service.list_range(nine(), nine() + Duration::days(1)).unwrap();
        let starts: Vec<_> = found.iter().map(|m| m.time.from).collect();
        assert_eq!(starts, vec![inside.time.from, straddling.time.from]);
    }

    #[test]
    fn test_sub_second_instants_survive_storage() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let start = nine() + Duration::milliseconds(500);
        let meeting = Meeting::new(start, start + Duration::hours(1)).unwrap();
        let created = service.create(&meeting).unwrap();

        let found = service.get(row_id(&created)).unwrap().unwrap();
        assert_eq!(found.time.from, start);
        assert_eq!(found.time.to, start + Duration::hours(1));
    }

    #[test]
    fn test_list_range_orders_fractional_starts() {
        let db = setup_test_db();
        let service = MeetingService::new(db.connection());

        let later = Meeting::new(nine() + Duration::milliseconds(500), nine() + Duration::hours(1)).unwrap();
        let earlier = Meeting::new(nine(), nine() + Duration::hours(1)).unwrap();
        service.create(&later).unwrap();
        service.create(&earlier).unwrap();

        // Range starting half a second in still overlaps both
        let found = service
            .list_range(nine() + Duration::milliseconds(500), nine() + Duration::hours(2))
            .unwrap();
        let starts: Vec<_> = found.iter().map(|m| m.time.from).collect();
        assert_eq!(starts, vec![earlier.time.from, later.time.from]);
    }
}
