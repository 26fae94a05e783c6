//! 2D coordinates of sensors, waypoints, the base station and the depot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 2D position in the deployment area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a new position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin position (0, 0).
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the unit direction vector from `self` toward `target`.
    ///
    /// Returns `(0, 0)` if positions are coincident.
    pub fn direction_to(&self, target: &Position) -> (f64, f64) {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < 1e-12 {
            (0.0, 0.0)
        } else {
            (dx / dist, dy / dist)
        }
    }

    /// Moves toward `target` by at most `max_dist`.
    pub fn move_toward(&mut self, target: &Position, max_dist: f64) {
        let (dx, dy) = self.direction_to(target);
        let step = self.distance_to(target).min(max_dist);
        self.x += dx * step;
        self.y += dy * step;
    }

    /// Returns this position with both coordinates truncated toward zero.
    pub fn truncated(&self) -> Self {
        Self {
            x: self.x.trunc(),
            y: self.y.trunc(),
        }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn position_direction_to_coincident() {
        let a = Position::new(2.0, 2.0);
        assert_eq!(a.direction_to(&a), (0.0, 0.0));
    }

    #[test]
    fn position_move_toward_stops_at_target() {
        let mut p = Position::new(0.0, 0.0);
        let target = Position::new(3.0, 0.0);
        p.move_toward(&target, 5.0);
        assert!((p.x - 3.0).abs() < 1e-10);
        assert!(p.y.abs() < 1e-10);
    }

    #[test]
    fn position_move_toward_partial() {
        let mut p = Position::new(0.0, 0.0);
        p.move_toward(&Position::new(0.0, 10.0), 4.0);
        assert!((p.y - 4.0).abs() < 1e-10);
    }

    #[test]
    fn position_truncated() {
        let p = Position::new(12.4, 99.6).truncated();
        assert_eq!(p, Position::new(12.0, 99.0));
    }
}
