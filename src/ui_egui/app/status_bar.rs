//! Status bar: selected meeting, its save state, and retry for failed commits.

use super::MeetingsApp;
use crate::services::sync::MutationStatus;
use egui::{Color32, RichText};

/// Status bar section separator
const SEPARATOR_WIDTH: f32 = 8.0;

fn status_label(status: MutationStatus) -> (&'static str, Color32) {
    match status {
        MutationStatus::Idle => ("Saved", Color32::from_rgb(80, 160, 90)),
        MutationStatus::Dirty => ("Unsaved changes", Color32::from_rgb(200, 150, 40)),
        MutationStatus::Committing => ("Saving…", Color32::from_rgb(90, 140, 210)),
        MutationStatus::Error => ("Save failed", Color32::from_rgb(220, 60, 60)),
    }
}

impl MeetingsApp {
    pub(super) fn delete_selected(&mut self) {
        if let Some(id) = self.selected.take() {
            log::info!("Deleting meeting {}", id);
            self.engine.delete(&id);
        }
    }

    pub(super) fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(28.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    self.render_selection_status(ui);

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        self.render_failed_summary(ui);
                    });
                });
            });
    }

    fn render_selection_status(&mut self, ui: &mut egui::Ui) {
        let Some(id) = self.selected.clone() else {
            ui.label(RichText::new("Click empty grid to add a meeting, drag to move or resize").small());
            return;
        };
        let Some(meeting) = self.engine.current(&id).cloned() else {
            self.selected = None;
            return;
        };

        let tz = self.mapper.tz();
        ui.label(
            RichText::new(format!(
                "{} {} - {}",
                meeting.time.from.with_timezone(&tz).format("%a %d %b"),
                meeting.time.from.with_timezone(&tz).format("%H:%M"),
                meeting.time.to.with_timezone(&tz).format("%H:%M"),
            ))
            .small(),
        );
        ui.add_space(SEPARATOR_WIDTH);

        let status = self.engine.status(&id);
        let (text, color) = status_label(status);
        ui.label(RichText::new(text).small().color(color));

        if status == MutationStatus::Error {
            if let Some(error) = self.engine.last_error(&id) {
                ui.label(RichText::new(error.to_string()).small().italics());
            }
            if ui.small_button("Retry").clicked() {
                self.engine.retry(&id);
            }
        }

        ui.add_space(SEPARATOR_WIDTH);
        if ui.small_button("Delete").clicked() {
            self.delete_selected();
        }
    }

    fn render_failed_summary(&mut self, ui: &mut egui::Ui) {
        let failed = self.engine.failed_ids();
        if failed.is_empty() {
            return;
        }

        if ui.small_button("Retry all").clicked() {
            for id in &failed {
                self.engine.retry(id);
            }
        }
        ui.label(
            RichText::new(format!("{} meeting(s) not saved", failed.len()))
                .small()
                .color(Color32::from_rgb(220, 60, 60)),
        );
    }
}
