use egui::Color32;

use crate::services::sync::MutationStatus;

fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |c1: u8, c2: u8| -> u8 { ((c1 as f32 * (1.0 - t)) + (c2 as f32 * t)).round() as u8 };
    Color32::from_rgb(lerp(a.r(), b.r()), lerp(a.g(), b.g()), lerp(a.b(), b.b()))
}

#[derive(Clone, Copy)]
pub(crate) struct TimeGridPalette {
    pub background: Color32,
    pub hour_line: Color32,
    pub quarter_line: Color32,
    pub day_divider: Color32,
    pub hour_text: Color32,
    pub today_bg: Color32,
}

impl TimeGridPalette {
    pub fn from_ui(ui: &egui::Ui) -> Self {
        let visuals = ui.visuals();
        let background = visuals.extreme_bg_color;
        let text = visuals.text_color();

        Self {
            background,
            hour_line: blend(background, text, 0.25),
            quarter_line: blend(background, text, 0.08),
            day_divider: blend(background, text, 0.35),
            hour_text: blend(background, text, 0.6),
            today_bg: with_alpha(visuals.selection.bg_fill, 40),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct MeetingPalette {
    pub fill: Color32,
    pub border: Color32,
    pub text: Color32,
    pub selected_border: Color32,
    pub error_border: Color32,
}

impl MeetingPalette {
    pub fn from_ui(ui: &egui::Ui) -> Self {
        let dark = ui.visuals().dark_mode;
        let fill = if dark {
            Color32::from_rgb(60, 110, 170)
        } else {
            Color32::from_rgb(100, 150, 200)
        };

        Self {
            fill,
            border: blend(fill, Color32::BLACK, 0.3),
            text: Color32::WHITE,
            selected_border: ui.visuals().selection.stroke.color,
            error_border: Color32::from_rgb(220, 60, 60),
        }
    }

    /// Fill for a meeting box given its persistence state
    pub fn fill_for(&self, status: MutationStatus) -> Color32 {
        match status {
            MutationStatus::Committing => with_alpha(self.fill, 150),
            MutationStatus::Dirty => blend(self.fill, Color32::WHITE, 0.15),
            MutationStatus::Idle | MutationStatus::Error => self.fill,
        }
    }

    pub fn border_for(&self, status: MutationStatus, selected: bool) -> Color32 {
        match status {
            MutationStatus::Error => self.error_border,
            _ if selected => self.selected_border,
            _ => self.border,
        }
    }
}
