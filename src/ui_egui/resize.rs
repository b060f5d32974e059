// Meeting Resize Handles
//
// Hit zones and drawing for the top/bottom edges of a meeting box.
// - Top handle: moves the start, end stays fixed
// - Bottom handle: moves the end

use egui::{Pos2, Rect, Vec2};

/// Which edge of the meeting is being resized
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    /// Top edge - adjusts start time
    Top,
    /// Bottom edge - adjusts end time
    Bottom,
}

impl ResizeHandle {
    pub fn cursor_icon(&self) -> egui::CursorIcon {
        egui::CursorIcon::ResizeVertical
    }
}

/// Visual size of the handle circle
pub const HANDLE_VISUAL_SIZE: f32 = 6.0;
/// Tallest hit zone at either edge
const MAX_ZONE_HEIGHT: f32 = 8.0;

/// Handle hit zones for one meeting box
pub struct HandleRects {
    pub top: Rect,
    pub bottom: Rect,
}

impl HandleRects {
    pub fn for_meeting(meeting_rect: Rect) -> Self {
        // Short boxes keep their middle third for moving.
        let zone_height = (meeting_rect.height() / 3.0).min(MAX_ZONE_HEIGHT);

        Self {
            top: Rect::from_min_size(
                meeting_rect.left_top(),
                Vec2::new(meeting_rect.width(), zone_height),
            ),
            bottom: Rect::from_min_size(
                Pos2::new(meeting_rect.left(), meeting_rect.bottom() - zone_height),
                Vec2::new(meeting_rect.width(), zone_height),
            ),
        }
    }

    /// Check if a point hits a handle and return which one
    pub fn hit_test(&self, pos: Pos2) -> Option<ResizeHandle> {
        if self.top.contains(pos) {
            Some(ResizeHandle::Top)
        } else if self.bottom.contains(pos) {
            Some(ResizeHandle::Bottom)
        } else {
            None
        }
    }

    pub fn get(&self, handle: ResizeHandle) -> Rect {
        match handle {
            ResizeHandle::Top => self.top,
            ResizeHandle::Bottom => self.bottom,
        }
    }
}

/// Draw resize handles on a meeting box
pub fn draw_handles(
    painter: &egui::Painter,
    handles: &HandleRects,
    hovered_handle: Option<ResizeHandle>,
    color: egui::Color32,
) {
    for handle in [ResizeHandle::Top, ResizeHandle::Bottom] {
        let rect = handles.get(handle);
        let is_hovered = hovered_handle == Some(handle);

        // Circle sits on the edge, not the middle of the hit zone
        let center = match handle {
            ResizeHandle::Top => Pos2::new(rect.center().x, rect.top() + HANDLE_VISUAL_SIZE / 2.0 + 1.0),
            ResizeHandle::Bottom => Pos2::new(rect.center().x, rect.bottom() - HANDLE_VISUAL_SIZE / 2.0 - 1.0),
        };

        let radius = if is_hovered {
            HANDLE_VISUAL_SIZE / 2.0 + 1.0
        } else {
            HANDLE_VISUAL_SIZE / 2.0
        };

        painter.circle_filled(
            center,
            radius,
            if is_hovered {
                egui::Color32::WHITE
            } else {
                egui::Color32::from_rgba_unmultiplied(
                    color.r().saturating_add(60),
                    color.g().saturating_add(60),
                    color.b().saturating_add(60),
                    color.a(),
                )
            },
        );
        painter.circle_stroke(center, radius, egui::Stroke::new(1.0, color.linear_multiply(0.6)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_rect(height: f32) -> Rect {
        Rect::from_min_size(Pos2::new(100.0, 100.0), Vec2::new(200.0, height))
    }

    #[test]
    fn test_handle_hit_test() {
        let handles = HandleRects::for_meeting(meeting_rect(48.0));

        assert_eq!(handles.hit_test(Pos2::new(200.0, 101.0)), Some(ResizeHandle::Top));
        assert_eq!(handles.hit_test(Pos2::new(200.0, 147.0)), Some(ResizeHandle::Bottom));
        assert_eq!(handles.hit_test(Pos2::new(200.0, 124.0)), None);
    }

    #[test]
    fn test_short_meeting_keeps_a_move_zone() {
        let handles = HandleRects::for_meeting(meeting_rect(12.0));

        assert_eq!(handles.top.height(), 4.0);
        assert_eq!(handles.bottom.height(), 4.0);
        assert_eq!(handles.hit_test(Pos2::new(200.0, 106.0)), None);
    }

    #[test]
    fn test_outside_box_misses() {
        let handles = HandleRects::for_meeting(meeting_rect(48.0));
        assert_eq!(handles.hit_test(Pos2::new(50.0, 101.0)), None);
    }
}
