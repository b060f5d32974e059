//! Save feedback toasts, driven by [`SyncNotice`]s.
//!
//! At most one toast per meeting. A failed save stays up with a Retry
//! button until the meeting saves, vanishes or the toast is dismissed;
//! everything else fades out on its own.

use std::time::{Duration, Instant};

use egui::{Color32, Context, RichText};

use crate::models::timeslot::MeetingId;
use crate::services::sync::SyncNotice;

const TRANSIENT_LIFETIME: Duration = Duration::from_secs(3);
const FADE: Duration = Duration::from_millis(500);
const TOAST_WIDTH: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Saved,
    Failed,
    Vanished,
    RefreshFailed,
}

impl ToastKind {
    fn icon(self) -> &'static str {
        match self {
            ToastKind::Saved => "✓",
            ToastKind::Failed => "✗",
            ToastKind::Vanished | ToastKind::RefreshFailed => "⚠",
        }
    }

    fn accent(self, visuals: &egui::Visuals) -> Color32 {
        match self {
            ToastKind::Saved => Color32::from_rgb(80, 160, 90),
            ToastKind::Failed => visuals.error_fg_color,
            ToastKind::Vanished | ToastKind::RefreshFailed => visuals.warn_fg_color,
        }
    }
}

/// Something the user clicked on a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastAction {
    Retry(MeetingId),
}

#[derive(Debug, Clone)]
pub struct SaveToast {
    /// `None` for range-wide notices
    pub meeting: Option<MeetingId>,
    pub kind: ToastKind,
    pub message: String,
    shown_at: Instant,
}

impl SaveToast {
    fn lifetime(&self) -> Option<Duration> {
        match self.kind {
            ToastKind::Failed => None,
            _ => Some(TRANSIENT_LIFETIME),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.lifetime()
            .is_some_and(|lifetime| now.duration_since(self.shown_at) >= lifetime)
    }

    /// 1.0 until the last half second of a transient toast, then linear to 0
    pub fn opacity(&self, now: Instant) -> f32 {
        let Some(lifetime) = self.lifetime() else {
            return 1.0;
        };
        let left = lifetime.saturating_sub(now.duration_since(self.shown_at));
        (left.as_secs_f32() / FADE.as_secs_f32()).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Default)]
pub struct ToastManager {
    toasts: Vec<SaveToast>,
}

impl ToastManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> &[SaveToast] {
        &self.toasts
    }

    pub fn for_meeting(&self, id: &MeetingId) -> Option<&SaveToast> {
        self.toasts.iter().find(|t| t.meeting.as_ref() == Some(id))
    }

    /// Rewrite meeting ids through `resolve`, so toasts raised under a
    /// temporary id still match notices for the saved meeting
    pub fn canonicalize(&mut self, resolve: impl Fn(&MeetingId) -> MeetingId) {
        for toast in &mut self.toasts {
            if let Some(id) = toast.meeting.as_mut() {
                *id = resolve(id);
            }
        }
    }

    pub fn dismiss(&mut self, id: &MeetingId) {
        self.toasts.retain(|t| t.meeting.as_ref() != Some(id));
    }

    pub fn notify(&mut self, notice: SyncNotice, now: Instant) {
        let (meeting, kind, message) = match notice {
            SyncNotice::Saved(id) => {
                // Quiet unless it recovers an earlier failure.
                let recovered = self
                    .for_meeting(&id)
                    .is_some_and(|t| t.kind == ToastKind::Failed);
                if !recovered {
                    return;
                }
                (Some(id), ToastKind::Saved, "Meeting saved".to_string())
            }
            SyncNotice::Failed { id, message } => (
                Some(id),
                ToastKind::Failed,
                format!("Could not save meeting: {}", message),
            ),
            SyncNotice::Vanished { id, .. } => (
                Some(id),
                ToastKind::Vanished,
                "Meeting was deleted elsewhere; your changes were discarded".to_string(),
            ),
            SyncNotice::RefreshFailed(message) => (
                None,
                ToastKind::RefreshFailed,
                format!("Could not refresh meetings: {}", message),
            ),
        };

        match &meeting {
            Some(id) => self.dismiss(id),
            None => self.toasts.retain(|t| t.kind != kind),
        }
        self.toasts.push(SaveToast {
            meeting,
            kind,
            message,
            shown_at: now,
        });
    }

    pub fn expire(&mut self, now: Instant) {
        self.toasts.retain(|t| !t.is_expired(now));
    }

    /// Draw the stack in the bottom-right corner; returns clicked actions
    pub fn show(&mut self, ctx: &Context, now: Instant) -> Vec<ToastAction> {
        self.expire(now);
        if self.toasts.is_empty() {
            return Vec::new();
        }
        if self.toasts.iter().any(|t| t.lifetime().is_some()) {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        let visuals = ctx.style().visuals.clone();
        let mut actions = Vec::new();
        let mut dismissed = Vec::new();

        egui::Area::new(egui::Id::new("save_toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-10.0, -40.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for (index, toast) in self.toasts.iter().enumerate().rev() {
                    let alpha = toast.opacity(now);
                    let accent = toast.kind.accent(&visuals).gamma_multiply(alpha);

                    egui::Frame::popup(&ctx.style())
                        .multiply_with_opacity(alpha)
                        .stroke(egui::Stroke::new(1.0, accent))
                        .show(ui, |ui| {
                            ui.set_width(TOAST_WIDTH);
                            ui.horizontal(|ui| {
                                ui.label(RichText::new(toast.kind.icon()).color(accent).strong());
                                ui.label(&toast.message);
                                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                    if ui.small_button("×").clicked() {
                                        dismissed.push(index);
                                    }
                                    if let (ToastKind::Failed, Some(id)) = (toast.kind, &toast.meeting) {
                                        if ui.small_button("Retry").clicked() {
                                            actions.push(ToastAction::Retry(id.clone()));
                                        }
                                    }
                                });
                            });
                        });
                    ui.add_space(4.0);
                }
            });

        for index in dismissed {
            self.toasts.remove(index);
        }
        for ToastAction::Retry(id) in &actions {
            self.dismiss(id);
        }
        actions
    }
}
