//! Straight great-circle legs.

use crate::error::{Result, TrackError};
use crate::models::Waypoint;
use crate::spatial::{
    along_track_distance, coincident, cross_track_distance, destination_point, distance,
    final_bearing, initial_bearing, project_onto_path, MIN_SEGMENT_LENGTH_M,
};
use serde::{Deserialize, Serialize};

/// Great-circle leg from `start` to `end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectSegment {
    start: Waypoint,
    end: Waypoint,
}

impl DirectSegment {
    pub fn new(start: Waypoint, end: Waypoint) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> &Waypoint {
        &self.start
    }

    pub fn end(&self) -> &Waypoint {
        &self.end
    }

    pub fn set_start(&mut self, wpt: Waypoint) {
        self.start = wpt;
    }

    pub fn set_end(&mut self, wpt: Waypoint) {
        self.end = wpt;
    }

    pub fn dist(&self) -> f64 {
        distance(&self.start, &self.end)
    }

    pub fn is_degenerate(&self) -> bool {
        self.dist() < MIN_SEGMENT_LENGTH_M
    }

    /// Signed distance from `p1` to `p2` measured along the leg; positive
    /// when `p2` is downstream of `p1`.
    pub fn dist_between(&self, p1: &Waypoint, p2: &Waypoint) -> Result<f64> {
        if coincident(p1, p2) {
            return Ok(0.0);
        }
        let s1 = along_track_distance(&self.start, &self.end, p1)?;
        let s2 = along_track_distance(&self.start, &self.end, p2)?;
        Ok(s2 - s1)
    }

    /// Bearing from `wpt` toward the end point. At the end point itself the
    /// final course of the leg is returned.
    pub fn course_at(&self, wpt: &Waypoint) -> Result<f64> {
        if coincident(wpt, &self.end) {
            return final_bearing(&self.start, &self.end);
        }
        initial_bearing(wpt, &self.end)
    }

    /// Point `dist_m` meters downstream (or upstream when negative) of `wpt`
    /// along the leg's great circle. Keeps `wpt.id`.
    pub fn itm_wpt(&self, wpt: &Waypoint, dist_m: f64) -> Result<Waypoint> {
        if dist_m == 0.0 {
            return Ok(*wpt);
        }
        let course = initial_bearing(&self.start, &self.end)?;
        let station = along_track_distance(&self.start, &self.end, wpt)? + dist_m;
        let point = destination_point(&self.start, course, station);
        Ok(wpt.with_position(point.lat, point.lon))
    }

    /// Distance from `wpt` to the closest point of the leg (not its
    /// extension beyond the endpoints).
    pub fn deviation(&self, wpt: &Waypoint) -> Result<f64> {
        wpt.ensure_located()?;
        if self.is_degenerate() {
            return Ok(distance(wpt, &self.start));
        }
        let station = along_track_distance(&self.start, &self.end, wpt)?;
        if station < 0.0 {
            Ok(distance(wpt, &self.start))
        } else if station > self.dist() {
            Ok(distance(wpt, &self.end))
        } else {
            Ok(cross_track_distance(&self.start, &self.end, wpt)?.abs())
        }
    }

    /// Deviation as a percentage of the leg length; zero for a leg too short
    /// to have a direction.
    pub fn track_error(&self, wpt: &Waypoint) -> Result<f64> {
        if self.is_degenerate() {
            return Ok(0.0);
        }
        Ok(self.deviation(wpt)? / self.dist() * 100.0)
    }

    /// For a straight leg the plan and the track coincide.
    pub fn plan_error(&self, wpt: &Waypoint) -> Result<f64> {
        self.track_error(wpt)
    }

    /// Move `wpt` onto the leg's great circle.
    pub fn align_to_track(&self, wpt: &mut Waypoint) -> Result<()> {
        if self.is_degenerate() {
            self.start.ensure_located()?;
            wpt.set_position(self.start.lat, self.start.lon);
            return Ok(());
        }
        let foot = project_onto_path(&self.start, &self.end, wpt)?;
        wpt.set_position(foot.lat, foot.lon);
        Ok(())
    }

    pub fn align_to_plan(&self, wpt: &mut Waypoint) -> Result<()> {
        self.align_to_track(wpt)
    }

    pub(crate) fn require_direction(&self) -> Result<f64> {
        if self.is_degenerate() {
            return Err(TrackError::degenerate(format!(
                "leg {} -> {} is too short to have a course",
                self.start.id, self.end.id
            )));
        }
        initial_bearing(&self.start, &self.end)
    }
}
