// Module exports for models

pub mod meeting;
pub mod position;
pub mod settings;
pub mod timeslot;
