//! Sampling facade over a complete set of tracks.

use crate::config::TransformConfig;
use crate::error::{Result, TrackError};
use crate::lateral::{LateralPath, LateralPlan, LateralTrack};
use crate::models::{Attitude, TrackSample, Waypoint};
use crate::transform::{build_lateral_track, build_velocity_track, build_vertical_track};
use crate::velocity::{VelocityPlan, VelocityTrack};
use crate::vertical::{VerticalPlan, VerticalTrack};

/// Upper bound on the number of samples `sample_every` will produce.
const MAX_SAMPLES: usize = 1_000_000;

/// Validated lateral, velocity and vertical tracks of one flight.
#[derive(Debug, Clone)]
pub struct FlightTrack {
    lateral: LateralTrack,
    velocity: VelocityTrack,
    vertical: VerticalTrack,
    config: TransformConfig,
}

impl FlightTrack {
    /// Run the lateral, velocity and vertical transforms in that order.
    pub fn from_plans(
        lateral: &LateralPlan,
        velocity: &VelocityPlan,
        vertical: &VerticalPlan,
        config: &TransformConfig,
    ) -> Result<Self> {
        let lateral = build_lateral_track(lateral, config)?;
        let velocity = build_velocity_track(velocity, &lateral, config)?;
        let vertical = build_vertical_track(vertical, &lateral, &velocity, config)?;
        Self::new(lateral, velocity, vertical, config.clone())
    }

    /// Bundle tracks that have already been built. All three must be valid.
    pub fn new(
        lateral: LateralTrack,
        velocity: VelocityTrack,
        vertical: VerticalTrack,
        config: TransformConfig,
    ) -> Result<Self> {
        for (name, valid) in [
            ("lateral", lateral.is_valid()),
            ("velocity", velocity.is_valid()),
            ("vertical", vertical.is_valid()),
        ] {
            if !valid {
                return Err(TrackError::integrity(format!("{} track is not valid", name)));
            }
        }
        Ok(Self {
            lateral,
            velocity,
            vertical,
            config,
        })
    }

    pub fn lateral(&self) -> &LateralTrack {
        &self.lateral
    }

    pub fn velocity(&self) -> &VelocityTrack {
        &self.velocity
    }

    pub fn vertical(&self) -> &VerticalTrack {
        &self.vertical
    }

    /// Total flight time including dwells.
    pub fn duration(&self) -> Result<f64> {
        self.velocity.duration()
    }

    /// State where `wpt` sits on the lateral track. The waypoint is aligned
    /// onto the track first.
    pub fn sample_at_wpt(&self, wpt: &Waypoint) -> Result<TrackSample> {
        let mut aligned = *wpt;
        self.lateral.align_wpt(&mut aligned)?;
        let dist = self.lateral.station(&aligned)?;
        let time = self.velocity.time_at_station(dist)?;
        self.sample(aligned, dist, time)
    }

    /// State `dist_m` meters from the track origin.
    pub fn sample_at_dist(&self, dist_m: f64, id: i64) -> Result<TrackSample> {
        let wpt = self.lateral.wpt_at_station(dist_m, id)?;
        let time = self.velocity.time_at_station(dist_m)?;
        self.sample(wpt, dist_m, time)
    }

    /// State `time_s` seconds after the start of the flight.
    pub fn sample_at_time(&self, time_s: f64, id: i64) -> Result<TrackSample> {
        let dist = self.velocity.dist_at_time(time_s)?;
        let wpt = self.lateral.wpt_at_station(dist, id)?;
        self.sample(wpt, dist, time_s)
    }

    /// Samples every `step_s` seconds from the start, ending with one at the
    /// final time. Sample ids count up from zero.
    pub fn sample_every(&self, step_s: f64) -> Result<Vec<TrackSample>> {
        if !(step_s > 0.0) {
            return Err(TrackError::OutOfRange(format!(
                "sample step {}s must be positive",
                step_s
            )));
        }
        let duration = self.duration()?;
        let count = (duration / step_s).floor();
        if !count.is_finite() || count >= MAX_SAMPLES as f64 {
            return Err(TrackError::OutOfRange(format!(
                "sample step {}s yields too many samples over {:.1}s",
                step_s, duration
            )));
        }
        let steps = count as usize;
        let capacity = steps
            .checked_add(2)
            .ok_or_else(|| TrackError::OutOfRange(format!("{} samples", steps)))?;
        let mut samples = Vec::with_capacity(capacity);
        for i in 0..=steps {
            samples.push(self.sample_at_time(i as f64 * step_s, i as i64)?);
        }
        if duration - steps as f64 * step_s > 1e-9 {
            samples.push(self.sample_at_time(duration, (steps + 1) as i64)?);
        }
        tracing::debug!("Sampled {} states over {:.1}s", samples.len(), duration);
        Ok(samples)
    }

    fn sample(&self, wpt: Waypoint, dist_m: f64, time_s: f64) -> Result<TrackSample> {
        let course = self.lateral.course_at(&wpt)?;
        let vas = self.velocity.vas_at_station(dist_m)?;
        let altitude = self.vertical.alt_at_station(dist_m)?;
        let vs = self.vertical.vs_at_station(dist_m)?;
        let alpha = self.vertical.alpha_at_station(dist_m)?;
        let bank = match self.lateral.sgmt(self.lateral.wpt_sgmt(&wpt)?)?.as_turn() {
            Some(turn) => {
                turn.direction().sign()
                    * (vas * vas / (self.config.gravity_mps2 * turn.radius())).atan()
            }
            None => 0.0,
        };
        Ok(TrackSample {
            wpt,
            dist_m,
            time_s,
            course_deg: course,
            vas_mps: vas,
            altitude_m: altitude,
            vs_mps: vs,
            attitude: Attitude {
                heading_deg: course,
                pitch_deg: alpha.to_degrees(),
                bank_deg: bank.to_degrees(),
            },
        })
    }
}
