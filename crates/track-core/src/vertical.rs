//! Altitude profile: vertical segments, plans and tracks.

use crate::config::TransformConfig;
use crate::error::{Result, TrackError};
use crate::lateral::LateralPath;
use crate::models::Waypoint;
use crate::profile::{self, ProfileSegment};
use crate::spatial::distance;
use serde::{Deserialize, Serialize};

/// Leg over which altitude changes linearly with distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalSegment {
    pub start: Waypoint,
    pub end: Waypoint,
    /// Initial altitude (meters)
    pub alti: f64,
    /// Final altitude (meters)
    pub altf: f64,
    /// Vertical speed (m/s), positive when climbing
    pub vs: f64,
    /// Climb angle (radians), negative when descending
    pub alpha: f64,
    /// Length along the lateral path (meters)
    pub dist: f64,
}

impl VerticalSegment {
    /// Plan leg. Vertical speed stays zero until the transform knows the
    /// time of flight.
    pub fn new(start: Waypoint, end: Waypoint, alti: f64, altf: f64) -> Self {
        let dist = distance(&start, &end);
        Self {
            start,
            end,
            alti,
            altf,
            vs: 0.0,
            alpha: (altf - alti).atan2(dist),
            dist,
        }
    }

    pub fn alt_delta(&self) -> f64 {
        self.altf - self.alti
    }

    /// Altitude `local_m` meters into the leg.
    pub fn alt_at(&self, local_m: f64) -> f64 {
        if self.dist <= 0.0 {
            return self.altf;
        }
        self.alti + self.alt_delta() * (local_m / self.dist).clamp(0.0, 1.0)
    }
}

impl ProfileSegment for VerticalSegment {
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

/// Altitude intent as handed over by a loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerticalPlan {
    sgmts: Vec<VerticalSegment>,
}

impl VerticalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sgmt(&mut self, sgmt: VerticalSegment) {
        self.sgmts.push(sgmt);
    }

    pub fn sgmt(&self, index: usize) -> Result<&VerticalSegment> {
        self.sgmts
            .get(index)
            .ok_or_else(|| TrackError::index(index, self.sgmts.len()))
    }

    pub fn sgmt_count(&self) -> usize {
        self.sgmts.len()
    }

    pub fn sgmts(&self) -> &[VerticalSegment] {
        &self.sgmts
    }
}

/// Altitude profile consistent with the lateral and velocity tracks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerticalTrack {
    sgmts: Vec<VerticalSegment>,
    stations: Vec<f64>,
    valid: bool,
    config: TransformConfig,
}

impl VerticalTrack {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn add_sgmt(&mut self, sgmt: VerticalSegment) {
        self.sgmts.push(sgmt);
        self.valid = false;
    }

    pub fn sgmt(&self, index: usize) -> Result<&VerticalSegment> {
        self.sgmts
            .get(index)
            .ok_or_else(|| TrackError::index(index, self.sgmts.len()))
    }

    pub fn sgmt_count(&self) -> usize {
        self.sgmts.len()
    }

    pub fn sgmts(&self) -> &[VerticalSegment] {
        &self.sgmts
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn validate(&mut self, lateral: &impl LateralPath) -> bool {
        match profile::survey(
            "Vertical",
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

    fn locate(&self, station: f64) -> Result<(usize, f64)> {
        if !self.valid {
            return Err(TrackError::integrity("vertical track is not validated"));
        }
        profile::locate(
            &self.sgmts,
            &self.stations,
            station,
            self.config.adjacency_tolerance_m,
        )
    }

    pub fn alt_at_station(&self, station: f64) -> Result<f64> {
        let (idx, local) = self.locate(station)?;
        Ok(self.sgmts[idx].alt_at(local))
    }

    pub fn vs_at_station(&self, station: f64) -> Result<f64> {
        let (idx, _) = self.locate(station)?;
        Ok(self.sgmts[idx].vs)
    }

    pub fn alpha_at_station(&self, station: f64) -> Result<f64> {
        let (idx, _) = self.locate(station)?;
        Ok(self.sgmts[idx].alpha)
    }

    /// Altitude where `wpt` sits on the lateral track.
    pub fn alt_at(&self, lateral: &impl LateralPath, wpt: &Waypoint) -> Result<f64> {
        self.alt_at_station(lateral.station(wpt)?)
    }

    pub fn vs_at(&self, lateral: &impl LateralPath, wpt: &Waypoint) -> Result<f64> {
        self.vs_at_station(lateral.station(wpt)?)
    }

    pub fn alpha_at(&self, lateral: &impl LateralPath, wpt: &Waypoint) -> Result<f64> {
        self.alpha_at_station(lateral.station(wpt)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::DirectSegment;
    use crate::lateral::LateralTrack;

    #[test]
    fn plan_leg_angle_matches_gradient() {
        let sgmt = VerticalSegment::new(
            Waypoint::new(1, 0.0, 0.0),
            Waypoint::new(2, 0.0, 0.01),
            100.0,
            200.0,
        );
        assert_eq!(sgmt.vs, 0.0);
        assert!((sgmt.alpha.tan() - 100.0 / sgmt.dist).abs() < 1e-12);
        assert!((sgmt.alt_at(sgmt.dist / 2.0) - 150.0).abs() < 1e-9);
        assert_eq!(sgmt.alt_at(sgmt.dist * 2.0), 200.0);
    }

    #[test]
    fn overlapping_segments_fail_validation() {
        let config = TransformConfig::default();
        let a = Waypoint::new(1, 0.0, 0.0);
        let b = Waypoint::new(2, 0.0, 0.01);
        let c = Waypoint::new(3, 0.0, 0.02);
        let mut lateral = LateralTrack::new();
        lateral.add_sgmt(DirectSegment::new(a, b));
        lateral.add_sgmt(DirectSegment::new(b, c));
        assert!(lateral.validate(&config));

        let mut track = VerticalTrack::new(config.clone());
        track.add_sgmt(VerticalSegment::new(a, b, 0.0, 100.0));
        track.add_sgmt(VerticalSegment::new(Waypoint::new(4, 0.0, 0.009), c, 100.0, 100.0));
        assert!(!track.validate(&lateral));
        assert!(matches!(
            track.alt_at_station(10.0),
            Err(TrackError::IntegrityViolation(_))
        ));

        let mut fixed = VerticalTrack::new(config);
        fixed.add_sgmt(VerticalSegment::new(a, b, 0.0, 100.0));
        fixed.add_sgmt(VerticalSegment::new(b, c, 100.0, 100.0));
        assert!(fixed.validate(&lateral));
        let mid_second = fixed.sgmt(0).unwrap().dist * 1.5;
        assert!((fixed.alt_at_station(mid_second).unwrap() - 100.0).abs() < 1e-9);
        assert!(matches!(
            fixed.alt_at_station(1e7),
            Err(TrackError::OutOfRange(_))
        ));
    }
}
