//! Position trace recorded while a controller drives a robot.
//!
//! Points are captured at decision time: the position a controller saw when
//! it staged an action, not where the physics step left the robot.

use serde::{Deserialize, Serialize};

use crate::env::Vec3;

/// Euclidean distance between two points.
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (y - x).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// An ordered trace of end-effector positions for one episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionTrace {
    points: Vec<Vec3>,
}

impl PositionTrace {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn push(&mut self, point: Vec3) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Sum of consecutive segment lengths.
    pub fn path_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| distance(w[0], w[1]))
            .sum()
    }

    /// Straight-line distance between the first and last point.
    pub fn displacement(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => distance(*first, *last),
            _ => 0.0,
        }
    }

    /// Ratio of straight-line displacement to travelled path length.
    ///
    /// Fewer than two points, or no motion at all, counts as perfectly
    /// efficient (1.0).
    pub fn path_efficiency(&self) -> f64 {
        if self.points.len() < 2 {
            return 1.0;
        }
        let total = self.path_length();
        if total > 0.0 {
            self.displacement() / total
        } else {
            1.0
        }
    }
}
