//! Pointer gesture state machine for the time grid.
//!
//! `Idle -> Pressed -> Dragging | Resizing -> Idle`. The first move after a
//! press decides between a click and a drag; there is no distance threshold.
//! Positions are grid-local: x from the left of the first day track, y from
//! local midnight.

use crate::models::meeting::Meeting;
use crate::models::position::Position;
use crate::models::timeslot::MeetingId;
use crate::services::geometry::{CoordinateMapper, DurationPolicy};
use crate::services::sync::SyncEngine;

use super::resize::ResizeHandle;

/// Where the controller reads and proposes meeting values
pub trait MeetingEditor {
    fn current(&self, id: &MeetingId) -> Option<Meeting>;
    fn create(&mut self, meeting: Meeting) -> MeetingId;
    fn apply<F>(&mut self, id: &MeetingId, updater: F) -> Option<Meeting>
    where
        F: FnOnce(&Meeting) -> Meeting;
    fn commit_now(&mut self, id: &MeetingId);
}

impl MeetingEditor for SyncEngine {
    fn current(&self, id: &MeetingId) -> Option<Meeting> {
        SyncEngine::current(self, id).cloned()
    }

    fn create(&mut self, meeting: Meeting) -> MeetingId {
        SyncEngine::create(self, meeting)
    }

    fn apply<F>(&mut self, id: &MeetingId, updater: F) -> Option<Meeting>
    where
        F: FnOnce(&Meeting) -> Meeting,
    {
        SyncEngine::apply(self, id, updater)
    }

    fn commit_now(&mut self, id: &MeetingId) {
        SyncEngine::commit_now(self, id)
    }
}

/// Mapper plus the pixel width of one day track
#[derive(Clone, Copy, Debug)]
pub struct GridMetrics<'a> {
    pub mapper: &'a CoordinateMapper,
    pub track_width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PressTarget {
    Body(MeetingId),
    Handle(MeetingId, ResizeHandle),
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GestureKind {
    Move(MeetingId),
    Resize(MeetingId, ResizeHandle),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Pressed {
        target: PressTarget,
        origin: Position,
    },
    Dragging {
        id: MeetingId,
        origin: Position,
        /// Box top-left when the gesture started
        start: Position,
        height: f32,
    },
    Resizing {
        id: MeetingId,
        handle: ResizeHandle,
        origin: Position,
        /// Part of the cumulative delta already applied
        consumed: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragOutcome {
    None,
    Selected(MeetingId),
    Created(MeetingId),
    Moved(MeetingId),
    Resized(MeetingId),
}

/// Offset accumulator step: `(consumed, cumulative) -> (increment, consumed')`.
///
/// Only whole snap quanta are ever consumed, so the increments always add up
/// to the snapped cumulative delta.
pub fn consume_delta(mapper: &CoordinateMapper, consumed: f32, cumulative: f32) -> (f32, f32) {
    let step = mapper.snap(cumulative - consumed);
    (step, consumed + step)
}

/// Pixel y of the edge a handle drags
fn edge_y(meeting: &Meeting, handle: ResizeHandle, grid: GridMetrics<'_>) -> f32 {
    let top = grid.mapper.position(meeting.time.from, grid.track_width).y;
    match handle {
        ResizeHandle::Top => top,
        ResizeHandle::Bottom => top + grid.mapper.height(&meeting.time),
    }
}

/// Geometry of `meeting` after moving one edge by `step` pixels
pub fn resize_meeting(
    meeting: &Meeting,
    handle: ResizeHandle,
    step: f32,
    grid: GridMetrics<'_>,
) -> Meeting {
    let mapper = grid.mapper;
    let top_left = mapper.position(meeting.time.from, grid.track_width);
    let height = mapper.height(&meeting.time);

    match handle {
        ResizeHandle::Bottom => mapper.meeting_from_geometry(
            height + step,
            top_left,
            meeting,
            grid.track_width,
            mapper.reference_date(),
            DurationPolicy::Edit,
        ),
        ResizeHandle::Top => {
            let bottom = top_left.y + height;
            let top = (top_left.y + step)
                .min(bottom - mapper.min_height(DurationPolicy::Edit))
                .max(0.0);
            mapper.meeting_from_geometry(
                bottom - top,
                Position::new(top_left.x, top),
                meeting,
                grid.track_width,
                mapper.reference_date(),
                DurationPolicy::Edit,
            )
        }
    }
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    /// Meeting currently moved or resized, if any
    pub fn active_id(&self) -> Option<&MeetingId> {
        match &self.state {
            DragState::Dragging { id, .. } | DragState::Resizing { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn press(&mut self, target: PressTarget, origin: Position) {
        if !self.is_idle() {
            log::warn!("Press while {:?}; starting over", self.state);
        }
        self.state = DragState::Pressed { target, origin };
    }

    /// Enter a drag or resize directly, measuring deltas from `origin`.
    ///
    /// Used when the press that started the gesture landed on something else,
    /// such as empty grid that has just become a new meeting.
    pub fn continue_gesture<E: MeetingEditor>(
        &mut self,
        kind: GestureKind,
        origin: Position,
        editor: &E,
        grid: GridMetrics<'_>,
    ) {
        self.state = match kind {
            GestureKind::Move(id) => match editor.current(&id) {
                Some(meeting) => DragState::Dragging {
                    start: grid.mapper.position(meeting.time.from, grid.track_width),
                    height: grid.mapper.height(&meeting.time),
                    id,
                    origin,
                },
                None => {
                    log::warn!("Cannot move {}: not loaded", id);
                    DragState::Idle
                }
            },
            GestureKind::Resize(id, handle) => DragState::Resizing {
                id,
                handle,
                origin,
                consumed: 0.0,
            },
        };
    }

    /// Returns the id of the meeting that changed, if any
    pub fn pointer_moved<E: MeetingEditor>(
        &mut self,
        pos: Position,
        editor: &mut E,
        grid: GridMetrics<'_>,
    ) -> Option<MeetingId> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Pressed { target, origin } => {
                match target {
                    PressTarget::Body(id) => {
                        self.continue_gesture(GestureKind::Move(id), origin, editor, grid)
                    }
                    PressTarget::Handle(id, handle) => {
                        self.continue_gesture(GestureKind::Resize(id, handle), origin, editor, grid)
                    }
                    PressTarget::Empty => {
                        let mapper = grid.mapper;
                        let (from, to) = mapper.slot_at(origin, grid.track_width);
                        let slot = match Meeting::new(from, to) {
                            Ok(slot) => slot,
                            Err(err) => {
                                log::warn!("Cannot create meeting at {:?}: {}", origin, err);
                                return None;
                            }
                        };
                        // A release before the edge moves must still leave a valid meeting.
                        let top_left = mapper.position(from, grid.track_width);
                        let draft = mapper.meeting_from_geometry(
                            0.0,
                            top_left,
                            &slot,
                            grid.track_width,
                            mapper.reference_date(),
                            DurationPolicy::Edit,
                        );
                        let edge = Position::new(origin.x, top_left.y + mapper.height(&draft.time));
                        let id = editor.create(draft);
                        log::debug!("Drag-creating {}", id);
                        // Resize from the new box's bottom edge so it follows the pointer.
                        self.continue_gesture(GestureKind::Resize(id, ResizeHandle::Bottom), edge, editor, grid);
                    }
                }
                if self.is_idle() {
                    None
                } else {
                    self.pointer_moved(pos, editor, grid)
                }
            }
            DragState::Dragging {
                id,
                origin,
                start,
                height,
            } => {
                let target = Position::new(pos.x, start.y + (pos.y - origin.y));
                let mapper = grid.mapper;
                let updated = editor.apply(&id, |prev| {
                    mapper.meeting_from_geometry(
                        height,
                        target,
                        prev,
                        grid.track_width,
                        mapper.reference_date(),
                        DurationPolicy::Edit,
                    )
                });
                self.state = DragState::Dragging {
                    id: id.clone(),
                    origin,
                    start,
                    height,
                };
                updated.map(|_| id)
            }
            DragState::Resizing {
                id,
                handle,
                origin,
                consumed,
            } => {
                let (step, wanted) = consume_delta(grid.mapper, consumed, pos.y - origin.y);
                let mut consumed = consumed;
                let updated = if step != 0.0 {
                    let before = editor.current(&id).map(|m| edge_y(&m, handle, grid));
                    let updated = editor.apply(&id, |prev| resize_meeting(prev, handle, step, grid));
                    // Count only what the edge really moved; a clamp swallows the rest.
                    consumed = match (before, &updated) {
                        (Some(before), Some(after)) => consumed + edge_y(after, handle, grid) - before,
                        _ => wanted,
                    };
                    updated
                } else {
                    None
                };
                self.state = DragState::Resizing {
                    id: id.clone(),
                    handle,
                    origin,
                    consumed,
                };
                updated.map(|_| id)
            }
        }
    }

    pub fn release<E: MeetingEditor>(&mut self, editor: &mut E, grid: GridMetrics<'_>) -> DragOutcome {
        match std::mem::take(&mut self.state) {
            DragState::Idle => DragOutcome::None,
            DragState::Pressed {
                target: PressTarget::Body(id) | PressTarget::Handle(id, _),
                ..
            } => DragOutcome::Selected(id),
            DragState::Pressed {
                target: PressTarget::Empty,
                origin,
            } => {
                let mapper = grid.mapper;
                let (from, to) = mapper.slot_at(origin, grid.track_width);
                let draft = match Meeting::new(from, to) {
                    Ok(draft) => draft,
                    Err(err) => {
                        log::warn!("Cannot create meeting at {:?}: {}", origin, err);
                        return DragOutcome::None;
                    }
                };
                let meeting = mapper.meeting_from_geometry(
                    0.0,
                    mapper.position(from, grid.track_width),
                    &draft,
                    grid.track_width,
                    mapper.reference_date(),
                    DurationPolicy::Create,
                );
                let id = editor.create(meeting);
                editor.commit_now(&id);
                DragOutcome::Created(id)
            }
            DragState::Dragging { id, .. } => {
                editor.commit_now(&id);
                DragOutcome::Moved(id)
            }
            DragState::Resizing { id, .. } => {
                editor.commit_now(&id);
                DragOutcome::Resized(id)
            }
        }
    }
}
