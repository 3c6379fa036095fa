//! Constant-radius turn arcs.
//!
//! An arc is described by its center, radius and direction; its extent runs
//! from the radial through `start` to the radial through `end`, swept in the
//! direction of the turn. Arc length uses the flat-earth relation
//! `radius * angle`, which is accurate for turn radii far below the earth
//! radius.

use crate::direct::DirectSegment;
use crate::error::{Result, TrackError};
use crate::models::{TurnDirection, Waypoint};
use crate::spatial::{
    coincident, destination_point, distance, initial_bearing, normalize_bearing, EARTH_RADIUS_M,
    MIN_SEGMENT_LENGTH_M,
};
use serde::{Deserialize, Serialize};

/// Circular-arc leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSegment {
    start: Waypoint,
    end: Waypoint,
    center: Waypoint,
    radius_m: f64,
    direction: TurnDirection,
}

impl TurnSegment {
    /// Build the minor arc from `start` to `end` with the given radius.
    ///
    /// The center lies on the turn side of the chord. Fails when the chord is
    /// zero or longer than the diameter.
    pub fn new(
        start: Waypoint,
        end: Waypoint,
        radius_m: f64,
        direction: TurnDirection,
    ) -> Result<Self> {
        check_radius(radius_m)?;
        start.ensure_located()?;
        end.ensure_located()?;
        let chord = distance(&start, &end);
        if chord < MIN_SEGMENT_LENGTH_M {
            return Err(TrackError::degenerate(format!(
                "turn {} -> {} has no chord to place its center",
                start.id, end.id
            )));
        }
        let half_chord = chord / 2.0;
        if half_chord > radius_m + MIN_SEGMENT_LENGTH_M {
            return Err(TrackError::degenerate(format!(
                "turn radius {:.1}m too small for chord {:.1}m",
                radius_m, chord
            )));
        }

        let chord_course = initial_bearing(&start, &end)?;
        let mid = destination_point(&start, chord_course, half_chord);
        // Right spherical triangle center/mid/start: cos r = cos a * cos h.
        let r = radius_m / EARTH_RADIUS_M;
        let a = half_chord / EARTH_RADIUS_M;
        let sin_half_h = (((r / 2.0).sin().powi(2) - (a / 2.0).sin().powi(2)).max(0.0) / a.cos())
            .sqrt();
        let h = 2.0 * sin_half_h.clamp(-1.0, 1.0).asin() * EARTH_RADIUS_M;
        let center_course = initial_bearing(&mid, &end)?;
        let center = destination_point(&mid, center_course + direction.sign() * 90.0, h);

        Ok(Self {
            start,
            end,
            center,
            radius_m,
            direction,
        })
    }

    /// Build an arc that is tangent to `inbound_course_deg` at `entry` and
    /// turns through `turn_angle_deg` (positive = right). The exit waypoint
    /// receives `exit_id`.
    pub fn from_tangent(
        entry: Waypoint,
        inbound_course_deg: f64,
        radius_m: f64,
        turn_angle_deg: f64,
        exit_id: i64,
    ) -> Result<Self> {
        check_radius(radius_m)?;
        entry.ensure_located()?;
        if !turn_angle_deg.is_finite() || turn_angle_deg.abs() >= 360.0 {
            return Err(TrackError::degenerate(format!(
                "turn angle {} out of bounds",
                turn_angle_deg
            )));
        }
        let direction = TurnDirection::from_angle(turn_angle_deg);
        let center =
            destination_point(&entry, inbound_course_deg + direction.sign() * 90.0, radius_m);
        let entry_radial = initial_bearing(&center, &entry)?;
        let mut end = destination_point(&center, entry_radial + turn_angle_deg, radius_m);
        end.id = exit_id;
        if turn_angle_deg == 0.0 {
            end = Waypoint::new(exit_id, entry.lat, entry.lon);
        }

        Ok(Self {
            start: entry,
            end,
            center,
            radius_m,
            direction,
        })
    }

    pub fn start(&self) -> &Waypoint {
        &self.start
    }

    pub fn end(&self) -> &Waypoint {
        &self.end
    }

    /// Replace the entry waypoint; center and radius are kept.
    pub fn set_start(&mut self, wpt: Waypoint) {
        self.start = wpt;
    }

    /// Replace the exit waypoint; center and radius are kept.
    pub fn set_end(&mut self, wpt: Waypoint) {
        self.end = wpt;
    }

    pub fn center(&self) -> &Waypoint {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius_m
    }

    pub fn direction(&self) -> TurnDirection {
        self.direction
    }

    /// Swept angle in degrees, always in [0, 360).
    pub fn sweep_deg(&self) -> Result<f64> {
        if coincident(&self.start, &self.end) {
            return Ok(0.0);
        }
        let start_radial = initial_bearing(&self.center, &self.start)?;
        let end_radial = initial_bearing(&self.center, &self.end)?;
        Ok((self.direction.sign() * (end_radial - start_radial)).rem_euclid(360.0))
    }

    /// Signed turn angle in degrees (positive = right).
    pub fn turn_angle_deg(&self) -> Result<f64> {
        Ok(self.direction.sign() * self.sweep_deg()?)
    }

    /// Arc length. An endpoint without a position yields NaN, the same as
    /// `DirectSegment::dist`; `sweep_deg` reports the cause, and a lateral
    /// track holding such a segment never validates.
    pub fn dist(&self) -> f64 {
        self.sweep_deg()
            .map(|sweep| self.radius_m * sweep.to_radians())
            .unwrap_or(f64::NAN)
    }

    pub fn is_degenerate(&self) -> bool {
        self.dist() < MIN_SEGMENT_LENGTH_M
    }

    /// Angle swept from `start` to the radial through `wpt`, in degrees.
    ///
    /// Points just before the entry come out slightly negative instead of
    /// wrapping to almost a full circle; the split sits halfway across the
    /// part of the circle the arc does not cover.
    pub fn arc_position_deg(&self, wpt: &Waypoint) -> Result<f64> {
        let sweep = self.sweep_deg()?;
        let start_radial = initial_bearing(&self.center, &self.start)?;
        let radial = initial_bearing(&self.center, wpt)?;
        let raw = (self.direction.sign() * (radial - start_radial)).rem_euclid(360.0);
        if raw > sweep + (360.0 - sweep) / 2.0 {
            Ok(raw - 360.0)
        } else {
            Ok(raw)
        }
    }

    /// Signed arc distance from `p1` to `p2`.
    pub fn dist_between(&self, p1: &Waypoint, p2: &Waypoint) -> Result<f64> {
        if coincident(p1, p2) {
            return Ok(0.0);
        }
        let a1 = self.arc_position_deg(p1)?;
        let a2 = self.arc_position_deg(p2)?;
        Ok(self.radius_m * (a2 - a1).to_radians())
    }

    /// Tangent course of the arc at the radial through `wpt`.
    pub fn course_at(&self, wpt: &Waypoint) -> Result<f64> {
        let to_center = initial_bearing(wpt, &self.center)?;
        Ok(normalize_bearing(to_center - self.direction.sign() * 90.0))
    }

    /// Point on the circle `dist_m` meters of arc beyond `wpt`. Keeps
    /// `wpt.id`.
    pub fn itm_wpt(&self, wpt: &Waypoint, dist_m: f64) -> Result<Waypoint> {
        let angle = self.arc_position_deg(wpt)? + (dist_m / self.radius_m).to_degrees();
        self.point_at_angle(wpt, angle)
    }

    /// Closest point of the finite arc to `wpt`. Keeps `wpt.id`.
    pub fn nearest_on_arc(&self, wpt: &Waypoint) -> Result<Waypoint> {
        let sweep = self.sweep_deg()?;
        let angle = self.arc_position_deg(wpt)?.clamp(0.0, sweep);
        self.point_at_angle(wpt, angle)
    }

    /// Distance from `wpt` to the finite arc.
    pub fn deviation(&self, wpt: &Waypoint) -> Result<f64> {
        Ok(distance(wpt, &self.nearest_on_arc(wpt)?))
    }

    /// Deviation from the arc as a percentage of the arc length.
    pub fn track_error(&self, wpt: &Waypoint) -> Result<f64> {
        if self.is_degenerate() {
            return Ok(0.0);
        }
        Ok(self.deviation(wpt)? / self.dist() * 100.0)
    }

    /// Deviation from the un-turned path, the chord between the endpoints.
    pub fn plan_error(&self, wpt: &Waypoint) -> Result<f64> {
        self.chord().track_error(wpt)
    }

    /// Project `wpt` radially onto the turn circle.
    pub fn align_to_track(&self, wpt: &mut Waypoint) -> Result<()> {
        let radial = initial_bearing(&self.center, wpt)?;
        let snapped = destination_point(&self.center, radial, self.radius_m);
        wpt.set_position(snapped.lat, snapped.lon);
        Ok(())
    }

    pub fn align_to_plan(&self, wpt: &mut Waypoint) -> Result<()> {
        self.chord().align_to_track(wpt)
    }

    /// Snap a waypoint lying near the arc onto it, keeping its id.
    ///
    /// A waypoint farther than `threshold_m` from the arc is reported as an
    /// integrity violation and left untouched.
    pub fn relocate(&self, wpt: &mut Waypoint, threshold_m: f64) -> Result<()> {
        let snapped = self.nearest_on_arc(wpt)?;
        let offset = distance(wpt, &snapped);
        if offset > threshold_m {
            return Err(TrackError::integrity(format!(
                "waypoint {} is {:.1}m from turn arc (limit {:.1}m)",
                wpt.id, offset, threshold_m
            )));
        }
        wpt.set_position(snapped.lat, snapped.lon);
        Ok(())
    }

    /// Straight leg between the arc endpoints.
    pub fn chord(&self) -> DirectSegment {
        DirectSegment::new(self.start, self.end)
    }

    fn point_at_angle(&self, wpt: &Waypoint, angle_deg: f64) -> Result<Waypoint> {
        let start_radial = initial_bearing(&self.center, &self.start)?;
        let radial = start_radial + self.direction.sign() * angle_deg;
        let point = destination_point(&self.center, radial, self.radius_m);
        Ok(wpt.with_position(point.lat, point.lon))
    }
}

fn check_radius(radius_m: f64) -> Result<()> {
    if !radius_m.is_finite() || radius_m < MIN_SEGMENT_LENGTH_M {
        return Err(TrackError::degenerate(format!(
            "turn radius {} must be positive",
            radius_m
        )));
    }
    Ok(())
}
