// Settings module
// Grid geometry, editing policy and sync tuning, persisted as settings.toml

use std::path::PathBuf;
use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pixels per hour on the time grid
    pub hour_height: f32,
    /// Drag/resize quantum in pixels (12px = 15 minutes at 48px/hour)
    pub snap_px: f32,
    /// Quiet period before a local edit is committed
    pub debounce_ms: u64,
    /// Shortest meeting produced by moving or resizing
    pub min_edit_minutes: i64,
    /// Shortest meeting produced by a single click on empty grid
    pub min_create_minutes: i64,
    /// IANA zone used to place instants on the wall-clock grid
    pub timezone: String,
    /// 0 = Monday ... 6 = Sunday
    pub first_day_of_week: u8,
    pub visible_days: u32,
    /// Background refresh period for the visible range
    pub revalidate_secs: u64,
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hour_height: 48.0,
            snap_px: 12.0,
            debounce_ms: 500,
            min_edit_minutes: 30,
            min_create_minutes: 60,
            timezone: "UTC".to_string(),
            first_day_of_week: 0,
            visible_days: 7,
            revalidate_secs: 30,
            database_path: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.hour_height > 0.0) {
            return Err("hour_height must be positive".to_string());
        }
        if !(self.snap_px > 0.0) || self.snap_px > self.hour_height {
            return Err("snap_px must be positive and at most one hour".to_string());
        }
        if self.min_edit_minutes <= 0 || self.min_create_minutes <= 0 {
            return Err("minimum durations must be positive".to_string());
        }
        if self.first_day_of_week > 6 {
            return Err("first_day_of_week must be between 0 (Monday) and 6 (Sunday)".to_string());
        }
        if self.visible_days == 0 || self.visible_days > 7 {
            return Err("visible_days must be between 1 and 7".to_string());
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("Unknown timezone '{}'", self.timezone))
    }

    pub fn week_start(&self) -> Weekday {
        match self.first_day_of_week {
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            6 => Weekday::Sun,
            _ => Weekday::Mon,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn revalidate_interval(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs.max(1))
    }
}
