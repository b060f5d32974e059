use super::MeetingsApp;

impl MeetingsApp {
    pub(super) fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        // Leave keys alone while a gesture is in progress
        if !self.drag.is_idle() {
            return;
        }

        let (previous, next, today, delete) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.modifiers.ctrl && i.key_pressed(egui::Key::T),
                i.key_pressed(egui::Key::Delete),
            )
        });

        if previous {
            self.navigate_previous();
        }
        if next {
            self.navigate_next();
        }
        if today {
            self.jump_to_today();
        }
        if delete {
            self.delete_selected();
        }
    }
}
