use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use egui::{Align2, CursorIcon, FontId, Painter, Pos2, Rect, Sense, Stroke, Vec2};

use super::palette::{MeetingPalette, TimeGridPalette};
use crate::models::meeting::Meeting;
use crate::models::position::Position;
use crate::models::timeslot::MeetingId;
use crate::services::geometry::CoordinateMapper;
use crate::services::layout::{week_boxes, MeetingBox};
use crate::services::sync::{MutationStatus, SyncEngine};
use crate::ui_egui::drag::{DragController, DragOutcome, DragState, GridMetrics, PressTarget};
use crate::ui_egui::resize::{draw_handles, HandleRects};

pub const TIME_LABEL_WIDTH: f32 = 50.0;
const HEADER_HEIGHT: f32 = 36.0;
const MIN_TRACK_WIDTH: f32 = 60.0;

pub struct WeekView;

impl WeekView {
    pub fn show(
        ui: &mut egui::Ui,
        engine: &mut SyncEngine,
        drag: &mut DragController,
        mapper: &CoordinateMapper,
        selected: Option<&MeetingId>,
    ) -> DragOutcome {
        let grid_palette = TimeGridPalette::from_ui(ui);
        let meeting_palette = MeetingPalette::from_ui(ui);
        let dates = mapper.visible_dates();
        let today = Utc::now().with_timezone(&mapper.tz()).date_naive();
        let day_count = dates.len().max(1) as f32;
        let track_width = ((ui.available_width() - TIME_LABEL_WIDTH) / day_count).max(MIN_TRACK_WIDTH);

        Self::render_header(ui, &dates, today, track_width, &grid_palette);

        let mut outcome = DragOutcome::None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .drag_to_scroll(false)
            .show(ui, |ui| {
                let size = Vec2::new(TIME_LABEL_WIDTH + track_width * day_count, mapper.day_height());
                let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
                let origin = Pos2::new(rect.left() + TIME_LABEL_WIDTH, rect.top());
                let painter = ui.painter_at(rect);
                let grid = GridMetrics { mapper, track_width };

                Self::paint_grid(&painter, rect, origin, mapper, &dates, today, track_width, &grid_palette);

                let boxes = week_boxes(&engine.meetings(), mapper, track_width);
                outcome = Self::handle_pointer(ui, &response, origin, &boxes, engine, drag, grid);

                // Boxes again: the gesture may have just changed them.
                let meetings = engine.meetings();
                let boxes = week_boxes(&meetings, mapper, track_width);
                let by_id: HashMap<&MeetingId, &Meeting> = meetings.iter().map(|m| (&m.id, m)).collect();
                let hover = ui.input(|i| i.pointer.hover_pos());
                let selected = selected.map(|id| engine.canonical_id(id));

                for meeting_box in &boxes {
                    let Some(meeting) = by_id.get(&meeting_box.id) else {
                        continue;
                    };
                    let rect = box_rect(origin, meeting_box);
                    let status = engine.status(&meeting_box.id);
                    let is_selected = selected.as_ref() == Some(&meeting_box.id);
                    Self::paint_meeting(&painter, rect, meeting, mapper, status, is_selected, &meeting_palette);

                    let show_handles = match drag.state() {
                        DragState::Resizing { id, .. } => engine.canonical_id(id) == meeting_box.id,
                        DragState::Idle => hover.is_some_and(|pos| rect.contains(pos)),
                        _ => false,
                    };
                    if show_handles {
                        let handles = HandleRects::for_meeting(rect);
                        let hovered = hover.and_then(|pos| handles.hit_test(pos));
                        draw_handles(&painter, &handles, hovered, meeting_palette.border);
                    }
                }

                Self::draw_current_time_indicator(&painter, origin, mapper, track_width);
                Self::update_cursor(ui, drag, hover, origin, &boxes);
            });

        outcome
    }

    fn render_header(
        ui: &mut egui::Ui,
        dates: &[NaiveDate],
        today: NaiveDate,
        track_width: f32,
        palette: &TimeGridPalette,
    ) {
        let size = Vec2::new(TIME_LABEL_WIDTH + track_width * dates.len() as f32, HEADER_HEIGHT);
        let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);

        for (i, date) in dates.iter().enumerate() {
            let left = rect.left() + TIME_LABEL_WIDTH + i as f32 * track_width;
            let cell = Rect::from_min_size(Pos2::new(left, rect.top()), Vec2::new(track_width, HEADER_HEIGHT));
            if *date == today {
                painter.rect_filled(cell.shrink(2.0), 6.0, palette.today_bg);
            }
            painter.text(
                cell.center(),
                Align2::CENTER_CENTER,
                format!("{} {}", date.weekday(), date.format("%d %b")),
                FontId::proportional(12.0),
                palette.hour_text,
            );
        }

        painter.hline(rect.x_range(), rect.bottom() - 0.5, Stroke::new(1.0, palette.day_divider));
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_grid(
        painter: &Painter,
        rect: Rect,
        origin: Pos2,
        mapper: &CoordinateMapper,
        dates: &[NaiveDate],
        today: NaiveDate,
        track_width: f32,
        palette: &TimeGridPalette,
    ) {
        painter.rect_filled(rect, 0.0, palette.background);

        if let Some(index) = dates.iter().position(|d| *d == today) {
            let left = origin.x + index as f32 * track_width;
            let column = Rect::from_min_size(Pos2::new(left, rect.top()), Vec2::new(track_width, rect.height()));
            painter.rect_filled(column, 0.0, palette.today_bg);
        }

        let hour_height = mapper.hour_height();
        for hour in 0..24 {
            let y = origin.y + hour as f32 * hour_height;
            painter.hline(origin.x..=rect.right(), y, Stroke::new(1.0, palette.hour_line));
            for quarter in 1..4 {
                let qy = y + quarter as f32 * hour_height / 4.0;
                painter.hline(origin.x..=rect.right(), qy, Stroke::new(0.5, palette.quarter_line));
            }
            painter.text(
                Pos2::new(origin.x - 6.0, y + 2.0),
                Align2::RIGHT_TOP,
                format!("{:02}:00", hour),
                FontId::proportional(11.0),
                palette.hour_text,
            );
        }

        for i in 0..=dates.len() {
            let x = origin.x + i as f32 * track_width;
            painter.vline(x, rect.y_range(), Stroke::new(1.0, palette.day_divider));
        }
    }

    fn paint_meeting(
        painter: &Painter,
        rect: Rect,
        meeting: &Meeting,
        mapper: &CoordinateMapper,
        status: MutationStatus,
        is_selected: bool,
        palette: &MeetingPalette,
    ) {
        let stroke_width = match status {
            MutationStatus::Error => 2.0,
            _ if is_selected => 2.0,
            _ => 1.0,
        };
        painter.rect_filled(rect, 4.0, palette.fill_for(status));
        painter.rect_stroke(rect, 4.0, Stroke::new(stroke_width, palette.border_for(status, is_selected)));

        let tz = mapper.tz();
        let mut label = format!(
            "{} - {}",
            meeting.time.from.with_timezone(&tz).format("%H:%M"),
            meeting.time.to.with_timezone(&tz).format("%H:%M"),
        );
        if let Some(subject) = meeting.subjects.first() {
            label.push('\n');
            label.push_str(subject);
        }
        if status == MutationStatus::Error {
            label.push_str("\n⚠ not saved");
        }

        painter.with_clip_rect(rect.shrink(2.0)).text(
            rect.left_top() + Vec2::new(4.0, 2.0),
            Align2::LEFT_TOP,
            label,
            FontId::proportional(11.0),
            palette.text,
        );
    }

    /// Feed raw pointer input to the drag controller
    fn handle_pointer(
        ui: &egui::Ui,
        response: &egui::Response,
        origin: Pos2,
        boxes: &[MeetingBox],
        engine: &mut SyncEngine,
        drag: &mut DragController,
        grid: GridMetrics<'_>,
    ) -> DragOutcome {
        let (pressed, released, moved, pointer) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.delta() != Vec2::ZERO,
                i.pointer.interact_pos(),
            )
        });
        let Some(pointer) = pointer else {
            return DragOutcome::None;
        };
        let local = Position::from(pointer) - Position::from(origin);

        if pressed && response.hovered() && local.x >= 0.0 {
            drag.press(press_target(boxes, local), local);
        } else if moved && !drag.is_idle() {
            if let Some(id) = drag.pointer_moved(local, engine, grid) {
                log::trace!("Gesture updated {}", id);
            }
        }

        if released && !drag.is_idle() {
            return drag.release(engine, grid);
        }
        DragOutcome::None
    }

    fn draw_current_time_indicator(painter: &Painter, origin: Pos2, mapper: &CoordinateMapper, track_width: f32) {
        let now = Utc::now();
        let day_index = mapper.day_index(now);
        if day_index < 0 || day_index >= mapper.visible_days() as i64 {
            return;
        }

        let pos = mapper.position(now, track_width);
        let y = origin.y + pos.y;
        let x_start = origin.x + pos.x;
        let line_color = egui::Color32::from_rgb(255, 100, 100);

        painter.circle_filled(Pos2::new(x_start - 4.0, y), 3.0, line_color);
        painter.line_segment(
            [Pos2::new(x_start, y), Pos2::new(x_start + track_width, y)],
            Stroke::new(2.0, line_color),
        );
    }

    fn update_cursor(ui: &egui::Ui, drag: &DragController, hover: Option<Pos2>, origin: Pos2, boxes: &[MeetingBox]) {
        let icon = match drag.state() {
            DragState::Dragging { .. } => Some(CursorIcon::Grabbing),
            DragState::Resizing { handle, .. } => Some(handle.cursor_icon()),
            DragState::Idle => hover.and_then(|pos| match press_target(boxes, Position::from(pos) - Position::from(origin)) {
                PressTarget::Handle(_, handle) => Some(handle.cursor_icon()),
                PressTarget::Body(_) => Some(CursorIcon::Grab),
                PressTarget::Empty => None,
            }),
            DragState::Pressed { .. } => None,
        };
        if let Some(icon) = icon {
            ui.ctx().set_cursor_icon(icon);
        }
    }
}

fn box_rect(origin: Pos2, meeting_box: &MeetingBox) -> Rect {
    Rect::from_min_size(
        origin + Vec2::new(meeting_box.left, meeting_box.top),
        Vec2::new(meeting_box.width, meeting_box.height),
    )
    .shrink(1.0)
}

/// What a press at a grid-local position lands on; later boxes are on top
pub fn press_target(boxes: &[MeetingBox], local: Position) -> PressTarget {
    let Some(hit) = boxes.iter().rev().find(|b| b.contains(local.x, local.y)) else {
        return PressTarget::Empty;
    };
    let rect = box_rect(Pos2::ZERO, hit);
    match HandleRects::for_meeting(rect).hit_test(Pos2::new(local.x, local.y)) {
        Some(handle) => PressTarget::Handle(hit.id.clone(), handle),
        None => PressTarget::Body(hit.id.clone()),
    }
}
