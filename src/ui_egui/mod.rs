mod app;
pub mod drag;
pub mod resize;
pub mod views;

pub use app::MeetingsApp;
