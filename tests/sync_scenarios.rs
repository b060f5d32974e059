// End-to-end scenarios: layout, drag editing and optimistic commits
// against a real SQLite store in a temporary directory

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use meeting_grid::models::meeting::Meeting;
use meeting_grid::models::position::Position;
use meeting_grid::models::settings::Settings;
use meeting_grid::models::timeslot::MeetingId;
use meeting_grid::services::geometry::CoordinateMapper;
use meeting_grid::services::layout::day_boxes;
use meeting_grid::services::store::{MeetingStore, SqliteMeetingStore, StoreError};
use meeting_grid::services::sync::{
    CommitOp, CommitOutcome, MutationStatus, OptimisticMutator, SyncEngine,
};
use meeting_grid::ui_egui::drag::{DragController, DragOutcome, GridMetrics, PressTarget};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::runtime::Runtime;

const TRACK_WIDTH: f32 = 200.0;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, hour, minute, 0).unwrap()
}

fn mapper() -> CoordinateMapper {
    CoordinateMapper::new(chrono_tz::UTC, monday())
}

fn meeting(from: DateTime<Utc>, to: DateTime<Utc>) -> Meeting {
    Meeting::new(from, to).unwrap()
}

/// SQLite store that records update payloads and can fail the first few
struct RecordingStore {
    inner: SqliteMeetingStore,
    updates: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl RecordingStore {
    fn new(dir: &TempDir, failures: usize) -> Self {
        let inner = SqliteMeetingStore::open(&dir.path().join("meetings.db")).unwrap();
        Self {
            inner,
            updates: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(failures),
        }
    }

    fn updates(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }
}

impl MeetingStore for RecordingStore {
    fn create(&self, meeting: &Meeting) -> Result<Meeting, StoreError> {
        self.inner.create(meeting)
    }

    fn update(&self, id: &MeetingId, meeting: &Meeting) -> Result<Meeting, StoreError> {
        self.updates.lock().unwrap().push(meeting.to_json());
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Network("simulated outage".to_string()));
        }
        self.inner.update(id, meeting)
    }

    fn delete(&self, id: &MeetingId) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn list_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Meeting>, StoreError> {
        self.inner.list_range(from, to)
    }
}

fn settings(debounce_ms: u64) -> Settings {
    Settings {
        debounce_ms,
        revalidate_secs: 3600,
        ..Settings::default()
    }
}

fn pump_until(engine: &mut SyncEngine, mut done: impl FnMut(&SyncEngine) -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < StdDuration::from_secs(5) {
        engine.pump();
        if done(engine) {
            return true;
        }
        std::thread::sleep(StdDuration::from_millis(5));
    }
    false
}

/// Engine over `store` with meeting A (09:00-10:00) saved and loaded
fn engine_with_a(runtime: &Runtime, store: Arc<RecordingStore>, debounce_ms: u64) -> (SyncEngine, MeetingId) {
    let saved = store.create(&meeting(at(9, 0), at(10, 0))).unwrap();
    let mut engine = SyncEngine::new(store, runtime.handle().clone(), &settings(debounce_ms));
    let (from, to) = mapper().visible_range();
    engine.set_range(from, to);
    assert!(pump_until(&mut engine, |e| e.meetings().len() == 1));
    (engine, saved.id)
}

fn shifted(minutes: i64) -> impl FnOnce(&Meeting) -> Meeting {
    move |prev| {
        let mut next = prev.clone();
        next.time.from = next.time.from + Duration::minutes(minutes);
        next.time.to = next.time.to + Duration::minutes(minutes);
        next
    }
}

#[test]
fn test_overlapping_pair_splits_the_track() {
    let meetings = vec![meeting(at(9, 0), at(10, 0)), meeting(at(9, 30), at(10, 30))];
    let boxes = day_boxes(&meetings, monday(), &mapper(), TRACK_WIDTH);

    assert_eq!(boxes.len(), 2);
    let a = boxes.iter().find(|b| b.id == meetings[0].id).unwrap();
    let b = boxes.iter().find(|b| b.id == meetings[1].id).unwrap();
    assert_eq!((a.left, a.width), (0.0, TRACK_WIDTH / 2.0));
    assert_eq!((b.left, b.width), (TRACK_WIDTH / 2.0, TRACK_WIDTH / 2.0));
}

#[test]
fn test_separate_meeting_gets_full_width() {
    let meetings = vec![
        meeting(at(9, 0), at(10, 0)),
        meeting(at(9, 30), at(10, 30)),
        meeting(at(11, 0), at(11, 30)),
    ];
    let boxes = day_boxes(&meetings, monday(), &mapper(), TRACK_WIDTH);

    let c = boxes.iter().find(|b| b.id == meetings[2].id).unwrap();
    assert_eq!((c.left, c.width), (0.0, TRACK_WIDTH));
    assert_eq!(c.top, 11.0 * 48.0);
    assert_eq!(c.height, 24.0);
}

#[test]
fn test_dragging_one_grid_unit_moves_fifteen_minutes() {
    let runtime = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new(&dir, 0));
    let (mut engine, id) = engine_with_a(&runtime, Arc::clone(&store), 500);
    let mapper = mapper();
    let grid = GridMetrics { mapper: &mapper, track_width: TRACK_WIDTH };
    let mut drag = DragController::new();

    let grab = Position::new(20.0, 9.0 * 48.0 + 10.0);
    drag.press(PressTarget::Body(id.clone()), grab);
    drag.pointer_moved(Position::new(20.0, grab.y + 12.0), &mut engine, grid);
    assert_eq!(drag.release(&mut engine, grid), DragOutcome::Moved(id.clone()));

    let moved = engine.current(&id).unwrap();
    assert_eq!((moved.time.from, moved.time.to), (at(9, 15), at(10, 15)));

    assert!(pump_until(&mut engine, |e| e.status(&id) == MutationStatus::Idle));
    let stored = store.list_range(at(0, 0), at(23, 0)).unwrap();
    assert_eq!(stored[0].time.from, at(9, 15));
}

#[test]
fn test_rapid_moves_send_one_update_with_final_position() {
    let runtime = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new(&dir, 0));
    let (mut engine, id) = engine_with_a(&runtime, Arc::clone(&store), 500);

    for _ in 0..5 {
        engine.apply(&id, shifted(15));
        engine.pump();
        std::thread::sleep(StdDuration::from_millis(50));
    }
    assert_eq!(engine.status(&id), MutationStatus::Dirty);

    assert!(pump_until(&mut engine, |e| e.status(&id) == MutationStatus::Idle));
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    let sent = Meeting::from_json(&updates[0]).unwrap();
    assert_eq!(sent.time.from, at(10, 15));
}

#[test]
fn test_coalescing_with_explicit_clock() {
    let mut mutator = OptimisticMutator::new(StdDuration::from_millis(500));
    let base = meeting(at(9, 0), at(10, 0)).with_id(MeetingId::persisted("7"));
    let id = base.id.clone();
    let start = Instant::now();

    for step in 0..5u64 {
        let now = start + StdDuration::from_millis(step * 60);
        mutator.apply(&id, Some(&base), shifted(15), now);
        assert!(mutator.tick(now).is_empty());
    }

    let due = start + StdDuration::from_millis(4 * 60 + 500);
    let requests = mutator.tick(due);
    assert_eq!(requests.len(), 1);
    match &requests[0].op {
        CommitOp::Update(sent) => assert_eq!(sent.time.from, at(10, 15)),
        other => panic!("expected an update, got {:?}", other),
    }
    assert!(mutator.tick(due + StdDuration::from_secs(1)).is_empty());
}

#[test]
fn test_failed_update_keeps_position_and_retries_same_payload() {
    let runtime = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new(&dir, 1));
    let (mut engine, id) = engine_with_a(&runtime, Arc::clone(&store), 20);

    engine.apply(&id, shifted(30));
    assert!(pump_until(&mut engine, |e| e.status(&id) == MutationStatus::Error));
    assert_eq!(engine.current(&id).unwrap().time.from, at(9, 30));
    assert_eq!(
        engine.last_error(&id),
        Some(&StoreError::Network("simulated outage".to_string()))
    );
    assert_eq!(engine.failed_ids(), vec![id.clone()]);

    assert!(engine.retry(&id));
    assert!(pump_until(&mut engine, |e| e.status(&id) == MutationStatus::Idle));

    let updates = store.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0], updates[1]);
    assert_eq!(engine.current(&id).unwrap().time.from, at(9, 30));
}

#[test]
fn test_retry_payload_is_identical_at_mutator_level() {
    let mut mutator = OptimisticMutator::new(StdDuration::ZERO);
    let base = meeting(at(9, 0), at(10, 0)).with_id(MeetingId::persisted("7"));
    let id = base.id.clone();
    let now = Instant::now();

    mutator.apply(&id, Some(&base), shifted(15), now);
    let first = mutator.tick(now).remove(0);
    mutator.complete(
        first.ticket,
        CommitOutcome::Failed(StoreError::Network("timeout".to_string())),
        now,
    );
    assert_eq!(mutator.status(&id), MutationStatus::Error);

    assert!(mutator.retry(&id, now));
    let second = mutator.tick(now).remove(0);
    assert_eq!(second.op, first.op);
    assert_ne!(second.ticket, first.ticket);
}

#[test]
fn test_drag_create_persists_new_meeting() {
    let runtime = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new(&dir, 0));
    let mut engine = SyncEngine::new(store.clone(), runtime.handle().clone(), &settings(500));
    let mapper = mapper();
    let grid = GridMetrics { mapper: &mapper, track_width: TRACK_WIDTH };
    let mut drag = DragController::new();

    // Click on empty grid at 14:00 on Monday
    drag.press(PressTarget::Empty, Position::new(30.0, 14.0 * 48.0 + 3.0));
    let DragOutcome::Created(temp_id) = drag.release(&mut engine, grid) else {
        panic!("click on empty grid should create a meeting");
    };
    assert!(temp_id.is_temporary());

    assert!(pump_until(&mut engine, |e| e.status(&temp_id) == MutationStatus::Idle
        && !e.canonical_id(&temp_id).is_temporary()));

    let stored = store.list_range(at(0, 0), at(23, 0)).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!((stored[0].time.from, stored[0].time.to), (at(14, 0), at(15, 0)));
    assert_eq!(engine.canonical_id(&temp_id), stored[0].id);
}
