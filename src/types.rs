//! Small geometry value types shared across components

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Point or offset in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Largest per-axis distance to `other`
    pub fn distance_max(&self, other: Position) -> f64 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
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

/// Width/height pair (viewport or control extent)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Non-zero, finite extent on both axes
    pub fn is_measured(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_arithmetic() {
        let a = Position::new(10.0, 20.0);
        let b = Position::new(3.0, -4.0);
        assert_eq!(a + b, Position::new(13.0, 16.0));
        assert_eq!(a - b, Position::new(7.0, 24.0));
    }

    #[test]
    fn test_size_is_measured() {
        assert!(Size::new(48.0, 48.0).is_measured());
        assert!(!Size::new(0.0, 48.0).is_measured());
        assert!(!Size::new(48.0, f64::NAN).is_measured());
    }

    #[test]
    fn test_distance_max() {
        let a = Position::new(0.0, 0.0);
        assert_eq!(a.distance_max(Position::new(3.0, -5.0)), 5.0);
    }
}
