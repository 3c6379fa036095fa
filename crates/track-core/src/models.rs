//! Core data models shared by plans, tracks and samples.

use crate::error::{Result, TrackError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A route point: identity plus position in decimal degrees.
///
/// Equality, ordering and hashing follow `id` only; geometry always reads the
/// coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl Waypoint {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self { id, lat, lon }
    }

    /// A waypoint that has an identity but no position yet.
    pub fn unlocated(id: i64) -> Self {
        Self {
            id,
            lat: f64::NAN,
            lon: f64::NAN,
        }
    }

    /// Same identity, new position.
    pub fn with_position(&self, lat: f64, lon: f64) -> Self {
        Self {
            id: self.id,
            lat,
            lon,
        }
    }

    pub fn set_position(&mut self, lat: f64, lon: f64) {
        self.lat = lat;
        self.lon = lon;
    }

    pub fn is_located(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub(crate) fn ensure_located(&self) -> Result<()> {
        if self.is_located() {
            Ok(())
        } else {
            Err(TrackError::degenerate(format!(
                "waypoint {} has no position",
                self.id
            )))
        }
    }
}

impl PartialEq for Waypoint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Waypoint {}

impl PartialOrd for Waypoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waypoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Waypoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Side to which a turn segment curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// +1 for right (clockwise), -1 for left.
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }

    pub fn from_angle(turn_angle_deg: f64) -> Self {
        if turn_angle_deg < 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}

/// Orientation of the vehicle at a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub heading_deg: f64,
    pub pitch_deg: f64,
    /// Positive = right wing down
    pub bank_deg: f64,
}

/// One sampled state along a flight track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSample {
    pub wpt: Waypoint,
    /// Distance from the track origin (meters)
    pub dist_m: f64,
    /// Time since the track origin (seconds)
    pub time_s: f64,
    pub course_deg: f64,
    pub vas_mps: f64,
    pub altitude_m: f64,
    pub vs_mps: f64,
    pub attitude: Attitude,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_identity_ignores_position() {
        let a = Waypoint::new(7, 33.0, -117.0);
        let b = a.with_position(34.0, -118.0);
        assert_eq!(a, b);
        assert!(Waypoint::new(1, 0.0, 0.0) < Waypoint::new(2, 0.0, 0.0));
    }

    #[test]
    fn unlocated_waypoint_is_rejected() {
        let wpt = Waypoint::unlocated(3);
        assert!(!wpt.is_located());
        assert!(matches!(
            wpt.ensure_located(),
            Err(TrackError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn turn_direction_from_signed_angle() {
        assert_eq!(TurnDirection::from_angle(30.0), TurnDirection::Right);
        assert_eq!(TurnDirection::from_angle(-30.0), TurnDirection::Left);
        assert_eq!(TurnDirection::Left.sign(), -1.0);
    }
}
