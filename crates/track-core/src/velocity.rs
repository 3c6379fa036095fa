//! Speed profile: velocity segments, plans and tracks.

use crate::config::TransformConfig;
use crate::error::{Result, TrackError};
use crate::lateral::LateralPath;
use crate::models::Waypoint;
use crate::profile::{self, ProfileSegment};
use crate::spatial::{distance, MIN_SEGMENT_LENGTH_M};
use serde::{Deserialize, Serialize};

/// Accelerations below this magnitude are treated as constant speed.
const ZERO_ACC_MPS2: f64 = 1e-12;

/// Uniform acceleration between two airspeeds over a distance.
pub fn acceleration(v_asi: f64, v_asf: f64, dist_m: f64, config: &TransformConfig) -> Result<f64> {
    if dist_m.abs() < config.degenerate_dist_m {
        return Err(TrackError::degenerate(format!(
            "acceleration over {:.6}m is undefined",
            dist_m
        )));
    }
    Ok((v_asf * v_asf - v_asi * v_asi) / (2.0 * dist_m))
}

/// Leg over which airspeed changes uniformly from `v_asi` to `v_asf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocitySegment {
    pub start: Waypoint,
    pub end: Waypoint,
    /// Initial airspeed (m/s)
    pub v_asi: f64,
    /// Final airspeed (m/s)
    pub v_asf: f64,
    /// Signed acceleration (m/s²)
    pub acc: f64,
    /// Length along the lateral path (meters)
    pub dist: f64,
    /// Dwell time of a wait leg (seconds)
    pub offset: f64,
    /// Set by the transform when the leg is a dwell rather than travel
    #[serde(default)]
    pub wait: bool,
}

impl VelocitySegment {
    /// Plan leg. Distance is the straight line between the endpoints; a leg
    /// too short for a direction carries no acceleration until the transform
    /// resolves it.
    pub fn new(start: Waypoint, end: Waypoint, v_asi: f64, v_asf: f64, offset: f64) -> Self {
        let dist = distance(&start, &end);
        let acc = if dist >= MIN_SEGMENT_LENGTH_M {
            (v_asf * v_asf - v_asi * v_asi) / (2.0 * dist)
        } else {
            0.0
        };
        Self {
            start,
            end,
            v_asi,
            v_asf,
            acc,
            dist,
            offset,
            wait: false,
        }
    }

    /// Whether this leg's distance is short enough to be a dwell.
    pub fn is_wait(&self, wait_speed_mps: f64) -> bool {
        self.dist <= self.offset * wait_speed_mps
    }

    /// Airspeed `local_m` meters into the leg.
    pub fn vas_at(&self, local_m: f64) -> f64 {
        if self.acc.abs() < ZERO_ACC_MPS2 {
            return self.v_asi;
        }
        (self.v_asi * self.v_asi + 2.0 * self.acc * local_m)
            .max(0.0)
            .sqrt()
    }

    /// Time to fly from `from_m` to `to_m` (both measured into the leg).
    pub fn time_over(&self, from_m: f64, to_m: f64, config: &TransformConfig) -> Result<f64> {
        if (to_m - from_m).abs() < f64::EPSILON {
            return Ok(0.0);
        }
        if self.acc.abs() < ZERO_ACC_MPS2 {
            if self.v_asi.abs() < config.min_airspeed_mps {
                return Err(TrackError::degenerate(format!(
                    "leg {} -> {} has no airspeed",
                    self.start.id, self.end.id
                )));
            }
            return Ok((to_m - from_m) / self.v_asi);
        }
        Ok((self.vas_at(to_m) - self.vas_at(from_m)) / self.acc)
    }

    /// Time to reach `local_m` meters into a wait leg.
    fn dwell_time_to(&self, local_m: f64) -> f64 {
        if self.dist > 0.0 {
            self.offset * (local_m / self.dist).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Time spent on the whole leg; the dwell time for wait legs.
    pub fn duration(&self, config: &TransformConfig) -> Result<f64> {
        if self.wait {
            return Ok(self.offset);
        }
        self.time_over(0.0, self.dist, config)
    }

    /// Distance into the leg reached after `time_s` seconds, capped at the
    /// leg length. A wait leg covers its length evenly over the dwell.
    pub fn dist_at_time(&self, time_s: f64) -> f64 {
        let d = if self.wait {
            if self.offset > 0.0 {
                self.dist * time_s / self.offset
            } else {
                self.dist
            }
        } else if self.acc.abs() < ZERO_ACC_MPS2 {
            self.v_asi * time_s
        } else {
            let v = (self.v_asi + self.acc * time_s).max(0.0);
            (v * v - self.v_asi * self.v_asi) / (2.0 * self.acc)
        };
        d.clamp(0.0, self.dist.max(0.0))
    }
}

impl ProfileSegment for VelocitySegment {
    fn start(&self) -> &Waypoint {
        &self.start
    }

    fn end(&self) -> &Waypoint {
        &self.end
    }

    fn length(&self) -> f64 {
        self.dist
    }
}

/// Speed intent as handed over by a loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelocityPlan {
    sgmts: Vec<VelocitySegment>,
}

impl VelocityPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sgmt(&mut self, sgmt: VelocitySegment) {
        self.sgmts.push(sgmt);
    }

    pub fn sgmt(&self, index: usize) -> Result<&VelocitySegment> {
        self.sgmts
            .get(index)
            .ok_or_else(|| TrackError::index(index, self.sgmts.len()))
    }

    pub fn sgmt_count(&self) -> usize {
        self.sgmts.len()
    }

    pub fn sgmts(&self) -> &[VelocitySegment] {
        &self.sgmts
    }
}

impl From<&VelocityTrack> for VelocityPlan {
    fn from(track: &VelocityTrack) -> Self {
        Self {
            sgmts: track.sgmts.clone(),
        }
    }
}

/// Speed profile consistent with the lateral track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelocityTrack {
    sgmts: Vec<VelocitySegment>,
    /// Start station of each segment, filled by `validate`
    stations: Vec<f64>,
    valid: bool,
    config: TransformConfig,
}

impl VelocityTrack {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Append a segment; the track must be validated again afterwards.
    pub fn add_sgmt(&mut self, sgmt: VelocitySegment) {
        self.sgmts.push(sgmt);
        self.valid = false;
    }

    pub fn sgmt(&self, index: usize) -> Result<&VelocitySegment> {
        self.sgmts
            .get(index)
            .ok_or_else(|| TrackError::index(index, self.sgmts.len()))
    }

    pub fn sgmt_count(&self) -> usize {
        self.sgmts.len()
    }

    pub fn sgmts(&self) -> &[VelocitySegment] {
        &self.sgmts
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Check adjacency along `lateral` and record segment stations.
    pub fn validate(&mut self, lateral: &impl LateralPath) -> bool {
        match profile::survey(
            "Velocity",
            &self.sgmts,
            lateral,
            self.config.adjacency_tolerance_m,
        ) {
            Some(stations) => {
                self.stations = stations;
                self.valid = true;
            }
            None => {
                self.stations.clear();
                self.valid = false;
            }
        }
        self.valid
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(TrackError::integrity("velocity track is not validated"))
        }
    }

    fn locate(&self, station: f64) -> Result<(usize, f64)> {
        self.ensure_valid()?;
        profile::locate(
            &self.sgmts,
            &self.stations,
            station,
            self.config.adjacency_tolerance_m,
        )
    }

    /// Airspeed at a distance from the lateral origin.
    pub fn vas_at_station(&self, station: f64) -> Result<f64> {
        let (idx, local) = self.locate(station)?;
        Ok(self.sgmts[idx].vas_at(local))
    }

    /// Airspeed where `wpt` sits on the lateral track.
    pub fn vas_at(&self, lateral: &impl LateralPath, wpt: &Waypoint) -> Result<f64> {
        self.vas_at_station(lateral.station(wpt)?)
    }

    /// Time of first arrival at `station`. Dwells located exactly at the
    /// station are not included; inside a wait leg of some length the dwell
    /// is shared out evenly along it.
    pub fn time_at_station(&self, station: f64) -> Result<f64> {
        let (target, local) = self.locate(station)?;
        let mut time = 0.0;
        for (idx, sgmt) in self.sgmts.iter().enumerate() {
            if idx == target {
                time += if sgmt.wait {
                    sgmt.dwell_time_to(local)
                } else {
                    sgmt.time_over(0.0, local, &self.config)?
                };
                break;
            }
            time += sgmt.duration(&self.config)?;
        }
        Ok(time)
    }

    /// Time to fly from `w1` to `w2` along the lateral track.
    pub fn time_between(
        &self,
        lateral: &impl LateralPath,
        w1: &Waypoint,
        w2: &Waypoint,
    ) -> Result<f64> {
        let t1 = self.time_at_station(lateral.station(w1)?)?;
        let t2 = self.time_at_station(lateral.station(w2)?)?;
        Ok(t2 - t1)
    }

    /// Uniform airspeed over a span: distance flown divided by time taken.
    pub fn vasu(&self, lateral: &impl LateralPath, w1: &Waypoint, w2: &Waypoint) -> Result<f64> {
        let dist = lateral.dist_between(w1, w2)?;
        let time = self.time_between(lateral, w1, w2)?;
        if time.abs() < f64::EPSILON {
            return Err(TrackError::degenerate(format!(
                "no flight time between waypoints {} and {}",
                w1.id, w2.id
            )));
        }
        Ok(dist / time)
    }

    /// Total time to fly the track.
    pub fn duration(&self) -> Result<f64> {
        self.ensure_valid()?;
        self.sgmts
            .iter()
            .map(|sgmt| sgmt.duration(&self.config))
            .sum()
    }

    /// Distance from the lateral origin reached after `time_s` seconds.
    pub fn dist_at_time(&self, time_s: f64) -> Result<f64> {
        self.ensure_valid()?;
        if time_s < 0.0 {
            return Err(TrackError::OutOfRange(format!("time {:.3}s", time_s)));
        }
        let mut elapsed = 0.0;
        for (sgmt, start) in self.sgmts.iter().zip(&self.stations) {
            let duration = sgmt.duration(&self.config)?;
            if time_s <= elapsed + duration {
                return Ok(start + sgmt.dist_at_time(time_s - elapsed));
            }
            elapsed += duration;
        }
        if time_s - elapsed <= 1e-6 {
            if let (Some(sgmt), Some(start)) = (self.sgmts.last(), self.stations.last()) {
                return Ok(start + sgmt.dist);
            }
        }
        Err(TrackError::OutOfRange(format!(
            "time {:.3}s beyond track duration {:.3}s",
            time_s, elapsed
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceleration_rejects_zero_distance() {
        let config = TransformConfig::default();
        assert!(matches!(
            acceleration(10.0, 20.0, 0.0, &config),
            Err(TrackError::DegenerateGeometry(_))
        ));
        let acc = acceleration(10.0, 20.0, 150.0, &config).unwrap();
        assert!((acc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn kinematics_are_consistent() {
        let config = TransformConfig::default();
        let start = Waypoint::new(1, 0.0, 0.0);
        let end = Waypoint::new(2, 0.0, 0.01);
        let sgmt = VelocitySegment::new(start, end, 10.0, 20.0, 0.0);
        assert!((sgmt.vas_at(sgmt.dist) - 20.0).abs() < 1e-9);
        let t = sgmt.duration(&config).unwrap();
        // Mean speed of uniform acceleration is the average of both ends.
        assert!((t - sgmt.dist / 15.0).abs() < 1e-9);
        assert!((sgmt.dist_at_time(t) - sgmt.dist).abs() < 1e-6);
        let half = t / 2.0;
        let expected = 10.0 * half + 0.5 * sgmt.acc * half.powi(2);
        assert!((sgmt.dist_at_time(half) - expected).abs() < 1e-6);
    }

    #[test]
    fn wait_detection_uses_dwell_distance() {
        let wpt = Waypoint::new(1, 0.0, 0.0);
        let dwell = VelocitySegment::new(wpt, wpt.with_position(0.0, 0.0), 5.0, 5.0, 30.0);
        assert!(dwell.is_wait(0.01));
        assert_eq!(dwell.acc, 0.0);
        let travel = VelocitySegment::new(wpt, Waypoint::new(2, 0.0, 0.001), 5.0, 5.0, 0.0);
        assert!(!travel.is_wait(0.01));
    }

    #[test]
    fn wait_leg_with_length_creeps_over_the_dwell() {
        let config = TransformConfig::default();
        let wpt = Waypoint::new(1, 0.0, 0.0);
        let mut dwell = VelocitySegment::new(wpt, wpt, 0.01, 0.01, 30.0);
        dwell.dist = 0.2;
        dwell.wait = true;
        assert_eq!(dwell.duration(&config).unwrap(), 30.0);
        assert_eq!(dwell.dist_at_time(0.0), 0.0);
        assert!((dwell.dist_at_time(15.0) - 0.1).abs() < 1e-12);
        assert!((dwell.dist_at_time(30.0) - 0.2).abs() < 1e-12);
        assert!((dwell.dwell_time_to(0.1) - 15.0).abs() < 1e-9);
        assert_eq!(dwell.dwell_time_to(0.0), 0.0);
    }

    #[test]
    fn unvalidated_track_refuses_queries() {
        let track = VelocityTrack::new(TransformConfig::default());
        assert!(matches!(
            track.vas_at_station(0.0),
            Err(TrackError::IntegrityViolation(_))
        ));
        assert!(matches!(track.sgmt(0), Err(TrackError::OutOfRange(_))));
    }
}
