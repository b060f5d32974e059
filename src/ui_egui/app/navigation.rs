use super::MeetingsApp;
use crate::services::geometry::week_start_for;
use chrono::{Duration, Utc};

impl MeetingsApp {
    pub(super) fn navigate_previous(&mut self) {
        self.show_week_of(self.current_date - Duration::weeks(1));
    }

    pub(super) fn navigate_next(&mut self) {
        self.show_week_of(self.current_date + Duration::weeks(1));
    }

    pub(super) fn jump_to_today(&mut self) {
        self.show_week_of(Utc::now().with_timezone(&self.mapper.tz()).date_naive());
    }

    fn show_week_of(&mut self, date: chrono::NaiveDate) {
        self.current_date = date;
        let start = week_start_for(date, self.settings.week_start());
        if start == self.mapper.reference_date() {
            return;
        }
        self.mapper.set_reference_date(start);
        let (from, to) = self.mapper.visible_range();
        self.engine.set_range(from, to);
    }

    pub(super) fn render_navigation_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("navigation_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("◀").on_hover_text("Previous week").clicked() {
                    self.navigate_previous();
                }
                if ui.button("Today").clicked() {
                    self.jump_to_today();
                }
                if ui.button("▶").on_hover_text("Next week").clicked() {
                    self.navigate_next();
                }

                let start = self.mapper.reference_date();
                let end = start + Duration::days(self.mapper.visible_days() as i64 - 1);
                ui.add_space(12.0);
                ui.heading(format!("{} – {}", start.format("%d %b"), end.format("%d %b %Y")));
            });
        });
    }
}
