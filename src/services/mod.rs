// Service module exports

pub mod database;
pub mod geometry;
pub mod layout;
pub mod meeting;
pub mod settings;
pub mod store;
pub mod sync;
