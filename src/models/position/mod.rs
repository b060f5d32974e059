// Position module
// Pixel coordinates relative to the origin of the first visible day column

use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<egui::Pos2> for Position {
    fn from(pos: egui::Pos2) -> Self {
        Position::new(pos.x, pos.y)
    }
}

impl From<egui::Vec2> for Position {
    fn from(delta: egui::Vec2) -> Self {
        Position::new(delta.x, delta.y)
    }
}
