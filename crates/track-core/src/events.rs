//! Route events attached to waypoints along the lateral path.

use crate::config::TransformConfig;
use crate::error::{Result, TrackError};
use crate::lateral::LateralPath;
use crate::models::Waypoint;
use crate::spatial::distance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Commanded airspeed change (m/s)
    AirspeedChange { vas_mps: f64 },
    /// Commanded altitude change (meters)
    AltitudeChange { alt_m: f64 },
    Marker { label: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub wpt: Waypoint,
    pub kind: EventKind,
    /// Distance from the lateral origin; NaN until completed.
    pub dist_m: f64,
}

impl Event {
    pub fn new(wpt: Waypoint, kind: EventKind) -> Self {
        Self {
            wpt,
            kind,
            dist_m: f64::NAN,
        }
    }
}

/// Events ordered by their position along the route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCollection {
    events: Vec<Event>,
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn event(&self, index: usize) -> Result<&Event> {
        self.events
            .get(index)
            .ok_or_else(|| TrackError::index(index, self.events.len()))
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Align every event onto `lateral`, measure its distance from the origin
    /// and order the collection by it. Events at the same distance keep their
    /// insertion order.
    pub fn complete(&mut self, lateral: &impl LateralPath) -> Result<()> {
        for event in &mut self.events {
            lateral.align_wpt(&mut event.wpt)?;
            event.dist_m = lateral.station(&event.wpt)?;
        }
        self.events.sort_by(|a, b| a.dist_m.total_cmp(&b.dist_m));
        tracing::debug!("Completed {} events", self.events.len());
        Ok(())
    }

    /// True when every event sits on `lateral` within the relocation
    /// threshold and the collection is ordered by distance.
    pub fn validate(&self, lateral: &impl LateralPath, config: &TransformConfig) -> bool {
        let mut last = f64::NEG_INFINITY;
        for (idx, event) in self.events.iter().enumerate() {
            let mut aligned = event.wpt;
            if let Err(err) = lateral.align_wpt(&mut aligned) {
                tracing::warn!("Event {} cannot be placed on the path: {}", idx, err);
                return false;
            }
            let offset = distance(&event.wpt, &aligned);
            if offset > config.relocation_threshold_m {
                tracing::warn!("Event {} lies {:.1}m off the path", idx, offset);
                return false;
            }
            if !(event.dist_m >= last - config.adjacency_tolerance_m) {
                tracing::warn!(
                    "Event {} is out of order ({:.3}m after {:.3}m)",
                    idx,
                    event.dist_m,
                    last
                );
                return false;
            }
            last = event.dist_m;
        }
        true
    }

    /// Events whose distance lies within `[from_m, to_m]`.
    pub fn between(&self, from_m: f64, to_m: f64) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| e.dist_m >= from_m && e.dist_m <= to_m)
    }
}
