mod lifecycle;
mod navigation;
mod shortcuts;
mod status_bar;
mod toast;

use chrono::NaiveDate;
use tokio::runtime::Runtime;

use self::toast::ToastManager;
use crate::models::settings::Settings;
use crate::models::timeslot::MeetingId;
use crate::services::geometry::CoordinateMapper;
use crate::services::sync::SyncEngine;
use crate::ui_egui::drag::DragController;

pub struct MeetingsApp {
    /// Owns the worker threads the sync engine dispatches to
    _runtime: Runtime,
    engine: SyncEngine,
    drag: DragController,
    mapper: CoordinateMapper,
    settings: Settings,
    /// Day the current week is anchored on (any day inside it)
    current_date: NaiveDate,
    selected: Option<MeetingId>,
    toasts: ToastManager,
}

impl eframe::App for MeetingsApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.handle_update(ctx, frame);
    }

    fn on_exit(&mut self, gl: Option<&eframe::glow::Context>) {
        self.handle_exit(gl);
    }
}
