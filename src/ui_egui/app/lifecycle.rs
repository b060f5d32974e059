use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::runtime::Runtime;

use super::toast::{ToastAction, ToastManager};
use super::MeetingsApp;
use crate::models::settings::Settings;
use crate::models::timeslot::MeetingId;
use crate::services::geometry::CoordinateMapper;
use crate::services::store::MeetingStore;
use crate::services::sync::{SyncEngine, SyncNotice};
use crate::ui_egui::drag::{DragController, DragOutcome};
use crate::ui_egui::views::week_view::WeekView;

impl MeetingsApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Runtime,
        store: Arc<dyn MeetingStore>,
        mapper: CoordinateMapper,
        settings: Settings,
    ) -> Self {
        let mut engine = SyncEngine::new(store, runtime.handle().clone(), &settings);

        // Background completions wake the UI instead of polling
        let ctx = cc.egui_ctx.clone();
        engine.set_waker(Arc::new(move || ctx.request_repaint()));

        let (from, to) = mapper.visible_range();
        engine.set_range(from, to);

        let current_date = Utc::now().with_timezone(&mapper.tz()).date_naive();
        log::info!(
            "Showing {} days from {} in {}",
            mapper.visible_days(),
            mapper.reference_date(),
            mapper.tz()
        );

        Self {
            _runtime: runtime,
            engine,
            drag: DragController::new(),
            mapper,
            settings,
            current_date,
            selected: None,
            toasts: ToastManager::new(),
        }
    }

    pub(super) fn handle_update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.engine.pump();
        self.drain_notices();

        self.handle_keyboard_shortcuts(ctx);
        self.render_navigation_bar(ctx);
        self.render_status_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let outcome = WeekView::show(
                ui,
                &mut self.engine,
                &mut self.drag,
                &self.mapper,
                self.selected.as_ref(),
            );
            match outcome {
                DragOutcome::Selected(id)
                | DragOutcome::Created(id)
                | DragOutcome::Moved(id)
                | DragOutcome::Resized(id) => self.selected = Some(id),
                DragOutcome::None => {}
            }
        });

        // Start any commit that came due while drawing
        self.engine.pump();

        for action in self.toasts.show(ctx, Instant::now()) {
            match action {
                ToastAction::Retry(id) => {
                    self.engine.retry(&id);
                }
            }
        }
        self.release_settled_aliases();

        if !self.drag.is_idle() {
            ctx.request_repaint();
        } else if let Some(wait) = self.engine.next_wakeup(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }

    pub(super) fn handle_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let pending = self.engine.failed_ids();
        if !pending.is_empty() {
            log::warn!("Exiting with {} unsaved meeting(s)", pending.len());
        }
    }

    fn drain_notices(&mut self) {
        let engine = &self.engine;
        self.toasts.canonicalize(|id| engine.canonical_id(id));
        if let Some(id) = self.selected.take() {
            self.selected = Some(engine.canonical_id(&id));
        }

        for notice in self.engine.take_notices() {
            match &notice {
                SyncNotice::Saved(id) => log::debug!("Saved {}", id),
                SyncNotice::Vanished { id, .. } => {
                    if self.selected.as_ref() == Some(id) {
                        self.selected = None;
                    }
                }
                SyncNotice::Failed { .. } | SyncNotice::RefreshFailed(_) => {}
            }
            self.toasts.notify(notice, Instant::now());
        }
    }

    /// Drop temp-id aliases nothing on screen still refers to
    fn release_settled_aliases(&mut self) {
        let in_use: HashSet<MeetingId> = self
            .selected
            .iter()
            .chain(self.drag.active_id())
            .chain(self.toasts.toasts().iter().filter_map(|t| t.meeting.as_ref()))
            .cloned()
            .collect();
        self.engine.prune_aliases(&in_use);
    }
}
