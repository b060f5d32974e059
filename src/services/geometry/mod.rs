//! Time <-> pixel transform for the time grid.
//!
//! Vertical axis: minutes since local midnight scaled by the hour height.
//! Horizontal axis: one track per visible day, counted from the reference date.
//! Every pixel value is snapped to the grid quantum before it becomes time.

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::models::meeting::Meeting;
use crate::models::position::Position;
use crate::models::settings::Settings;
use crate::models::timeslot::Timeslot;

/// Pixels per hour on the default grid
pub const HOUR_HEIGHT: f32 = 48.0;
/// Default snap quantum: 12px is 15 minutes at 48px/hour
pub const SNAP_PX: f32 = 12.0;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Which minimum duration applies to a geometry conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurationPolicy {
    /// Moving or resizing an existing meeting
    Edit,
    /// Creating a meeting with a single click
    Create,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateMapper {
    tz: Tz,
    reference_date: NaiveDate,
    hour_height: f32,
    snap_px: f32,
    visible_days: u32,
    min_edit: Duration,
    min_create: Duration,
}

impl CoordinateMapper {
    /// Mapper with the default 48px hour and 15 minute snap
    pub fn new(tz: Tz, reference_date: NaiveDate) -> Self {
        Self {
            tz,
            reference_date,
            hour_height: HOUR_HEIGHT,
            snap_px: SNAP_PX,
            visible_days: 7,
            min_edit: Duration::minutes(30),
            min_create: Duration::minutes(60),
        }
    }

    pub fn from_settings(settings: &Settings, reference_date: NaiveDate) -> Result<Self, String> {
        settings.validate()?;
        Ok(Self {
            tz: settings.tz()?,
            reference_date,
            hour_height: settings.hour_height,
            snap_px: settings.snap_px,
            visible_days: settings.visible_days,
            min_edit: Duration::minutes(settings.min_edit_minutes),
            min_create: Duration::minutes(settings.min_create_minutes),
        })
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn set_reference_date(&mut self, date: NaiveDate) {
        self.reference_date = date;
    }

    pub fn hour_height(&self) -> f32 {
        self.hour_height
    }

    pub fn visible_days(&self) -> u32 {
        self.visible_days
    }

    /// Total pixel height of one day column
    pub fn day_height(&self) -> f32 {
        24.0 * self.hour_height
    }

    pub fn visible_dates(&self) -> Vec<NaiveDate> {
        (0..self.visible_days)
            .map(|offset| self.reference_date + Duration::days(offset as i64))
            .collect()
    }

    /// UTC bounds of the visible days, midnight to midnight in the mapper's zone
    pub fn visible_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.reference_date + Duration::days(self.visible_days as i64);
        (self.local_instant(self.reference_date, 0), self.local_instant(end, 0))
    }

    /// Round a pixel value to the nearest grid quantum
    pub fn snap(&self, px: f32) -> f32 {
        (px / self.snap_px).round() * self.snap_px
    }

    pub fn min_duration(&self, policy: DurationPolicy) -> Duration {
        match policy {
            DurationPolicy::Edit => self.min_edit,
            DurationPolicy::Create => self.min_create,
        }
    }

    pub fn min_height(&self, policy: DurationPolicy) -> f32 {
        self.minutes_to_px(self.min_duration(policy).num_minutes() as f32)
    }

    pub fn minutes_since_midnight(&self, time: DateTime<Utc>) -> f32 {
        let local = time.with_timezone(&self.tz);
        (local.hour() * 60 + local.minute()) as f32 + local.second() as f32 / 60.0
    }

    /// Days between the reference date and the local date of `time`
    pub fn day_index(&self, time: DateTime<Utc>) -> i64 {
        let date = time.with_timezone(&self.tz).date_naive();
        (date - self.reference_date).num_days()
    }

    pub fn position(&self, time: DateTime<Utc>, track_width: f32) -> Position {
        Position {
            x: self.day_index(time) as f32 * track_width,
            y: self.minutes_to_px(self.minutes_since_midnight(time)),
        }
    }

    pub fn height(&self, slot: &Timeslot) -> f32 {
        self.minutes_to_px(slot.duration().num_seconds() as f32 / 60.0)
    }

    /// Inverse transform: snapped geometry back to a meeting time.
    ///
    /// Only `time.from`/`time.to` change. The start stays inside its day; the
    /// duration never drops below the policy minimum.
    pub fn meeting_from_geometry(
        &self,
        height: f32,
        position: Position,
        meeting: &Meeting,
        track_width: f32,
        reference_date: NaiveDate,
        policy: DurationPolicy,
    ) -> Meeting {
        let last_start = self.day_height() - self.snap_px;
        let top = self.snap(position.y).clamp(0.0, last_start);
        let start_minutes = self.px_to_minutes(top);

        let min_minutes = self.min_duration(policy).num_minutes();
        let mut duration_minutes = self.px_to_minutes(self.snap(height));
        if duration_minutes < min_minutes {
            log::debug!(
                "Clamping {} minute duration to {:?} minimum of {}",
                duration_minutes,
                policy,
                min_minutes
            );
            duration_minutes = min_minutes;
        }

        let day_index = self.column_at(position.x, track_width);
        let date = reference_date + Duration::days(day_index);
        let from = self.local_instant(date, start_minutes);

        let mut next = meeting.clone();
        next.time.from = from;
        next.time.to = from + Duration::minutes(duration_minutes);
        next
    }

    /// The grid slot (one snap quantum) containing a position
    pub fn slot_at(&self, position: Position, track_width: f32) -> (DateTime<Utc>, DateTime<Utc>) {
        let last_start = self.day_height() - self.snap_px;
        let top = ((position.y / self.snap_px).floor() * self.snap_px).clamp(0.0, last_start);
        let date = self.reference_date + Duration::days(self.column_at(position.x, track_width));
        let from = self.local_instant(date, self.px_to_minutes(top));
        (from, from + Duration::minutes(self.px_to_minutes(self.snap_px)))
    }

    /// Visible day column under an x coordinate
    pub fn column_at(&self, x: f32, track_width: f32) -> i64 {
        if track_width <= 0.0 {
            return 0;
        }
        // Nudge so that x = k * width lands in column k despite rounding.
        let index = (x / track_width + 1e-4).floor() as i64;
        index.clamp(0, self.visible_days.saturating_sub(1) as i64)
    }

    fn minutes_to_px(&self, minutes: f32) -> f32 {
        minutes / 60.0 * self.hour_height
    }

    fn px_to_minutes(&self, px: f32) -> i64 {
        (px * 60.0 / self.hour_height).round() as i64
    }

    fn local_instant(&self, date: NaiveDate, minutes: i64) -> DateTime<Utc> {
        let minutes = minutes.clamp(0, MINUTES_PER_DAY);
        let naive: NaiveDateTime = date.and_time(NaiveTime::default()) + Duration::minutes(minutes);
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            // Inside a DST gap: fall back to reading the wall clock as UTC offset-free.
            .unwrap_or_else(|| self.tz.from_utc_datetime(&naive))
            .with_timezone(&Utc)
    }
}

/// First day of the week containing `date`
pub fn week_start_for(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() - first_day.num_days_from_monday()) % 7;
    date - Duration::days(offset as i64)
}
