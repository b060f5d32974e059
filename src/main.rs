// Meeting Grid Application
// Main entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use meeting_grid::models::settings::Settings;
use meeting_grid::services::geometry::{week_start_for, CoordinateMapper};
use meeting_grid::services::settings::{default_database_path, SettingsService};
use meeting_grid::services::store::{MeetingStore, SqliteMeetingStore};
use meeting_grid::ui_egui::MeetingsApp;

fn load_settings() -> Settings {
    let loaded = SettingsService::new().and_then(|service| service.load());
    match loaded {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load settings, using defaults: {:#}", e);
            Settings::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    log::info!("Starting Meeting Grid");

    let settings = load_settings();

    let db_path = match settings.database_path.clone() {
        Some(path) => path,
        None => default_database_path()?,
    };
    let store: Arc<dyn MeetingStore> = Arc::new(SqliteMeetingStore::open(&db_path)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to start background runtime")?;

    let tz = settings.tz().map_err(anyhow::Error::msg)?;
    let today = Utc::now().with_timezone(&tz).date_naive();
    let mapper = CoordinateMapper::from_settings(&settings, week_start_for(today, settings.week_start()))
        .map_err(anyhow::Error::msg)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Meeting Grid"),
        ..Default::default()
    };

    eframe::run_native(
        "Meeting Grid",
        options,
        Box::new(move |cc| Ok(Box::new(MeetingsApp::new(cc, runtime, store, mapper, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))
}
