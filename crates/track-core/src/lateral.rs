//! Lateral segments and the plan/track containers that sequence them.

use crate::config::TransformConfig;
use crate::direct::DirectSegment;
use crate::error::{Result, TrackError};
use crate::models::Waypoint;
use crate::spatial::distance;
use crate::turn::TurnSegment;
use serde::{Deserialize, Serialize};

/// Slack allowed when a distance walk lands just beyond either end of a path.
const END_TOLERANCE_M: f64 = 1e-3;

/// One leg of a lateral plan or track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LateralSegment {
    Direct(DirectSegment),
    Turn(TurnSegment),
}

impl From<DirectSegment> for LateralSegment {
    fn from(sgmt: DirectSegment) -> Self {
        LateralSegment::Direct(sgmt)
    }
}

impl From<TurnSegment> for LateralSegment {
    fn from(sgmt: TurnSegment) -> Self {
        LateralSegment::Turn(sgmt)
    }
}

impl LateralSegment {
    pub fn start(&self) -> &Waypoint {
        match self {
            LateralSegment::Direct(s) => s.start(),
            LateralSegment::Turn(s) => s.start(),
        }
    }

    pub fn end(&self) -> &Waypoint {
        match self {
            LateralSegment::Direct(s) => s.end(),
            LateralSegment::Turn(s) => s.end(),
        }
    }

    pub fn set_start(&mut self, wpt: Waypoint) {
        match self {
            LateralSegment::Direct(s) => s.set_start(wpt),
            LateralSegment::Turn(s) => s.set_start(wpt),
        }
    }

    pub fn set_end(&mut self, wpt: Waypoint) {
        match self {
            LateralSegment::Direct(s) => s.set_end(wpt),
            LateralSegment::Turn(s) => s.set_end(wpt),
        }
    }

    pub fn dist(&self) -> f64 {
        match self {
            LateralSegment::Direct(s) => s.dist(),
            LateralSegment::Turn(s) => s.dist(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        match self {
            LateralSegment::Direct(s) => s.is_degenerate(),
            LateralSegment::Turn(s) => s.is_degenerate(),
        }
    }

    pub fn dist_between(&self, p1: &Waypoint, p2: &Waypoint) -> Result<f64> {
        match self {
            LateralSegment::Direct(s) => s.dist_between(p1, p2),
            LateralSegment::Turn(s) => s.dist_between(p1, p2),
        }
    }

    pub fn course_at(&self, wpt: &Waypoint) -> Result<f64> {
        match self {
            LateralSegment::Direct(s) => s.course_at(wpt),
            LateralSegment::Turn(s) => s.course_at(wpt),
        }
    }

    pub fn itm_wpt(&self, wpt: &Waypoint, dist_m: f64) -> Result<Waypoint> {
        match self {
            LateralSegment::Direct(s) => s.itm_wpt(wpt, dist_m),
            LateralSegment::Turn(s) => s.itm_wpt(wpt, dist_m),
        }
    }

    pub fn plan_error(&self, wpt: &Waypoint) -> Result<f64> {
        match self {
            LateralSegment::Direct(s) => s.plan_error(wpt),
            LateralSegment::Turn(s) => s.plan_error(wpt),
        }
    }

    pub fn track_error(&self, wpt: &Waypoint) -> Result<f64> {
        match self {
            LateralSegment::Direct(s) => s.track_error(wpt),
            LateralSegment::Turn(s) => s.track_error(wpt),
        }
    }

    pub fn align_to_plan(&self, wpt: &mut Waypoint) -> Result<()> {
        match self {
            LateralSegment::Direct(s) => s.align_to_plan(wpt),
            LateralSegment::Turn(s) => s.align_to_plan(wpt),
        }
    }

    pub fn align_to_track(&self, wpt: &mut Waypoint) -> Result<()> {
        match self {
            LateralSegment::Direct(s) => s.align_to_track(wpt),
            LateralSegment::Turn(s) => s.align_to_track(wpt),
        }
    }

    pub fn as_direct(&self) -> Option<&DirectSegment> {
        match self {
            LateralSegment::Direct(s) => Some(s),
            LateralSegment::Turn(_) => None,
        }
    }

    pub fn as_turn(&self) -> Option<&TurnSegment> {
        match self {
            LateralSegment::Turn(s) => Some(s),
            LateralSegment::Direct(_) => None,
        }
    }
}

/// Queries shared by lateral plans and lateral tracks.
///
/// Implementors choose which error measure decides segment ownership and how
/// a waypoint is aligned: plans use the designed path, tracks the flown one.
pub trait LateralPath {
    fn sgmts(&self) -> &[LateralSegment];

    fn sgmt_error(&self, sgmt: &LateralSegment, wpt: &Waypoint) -> Result<f64>;

    fn align_on(&self, sgmt: &LateralSegment, wpt: &mut Waypoint) -> Result<()>;

    /// Gate for every positional query.
    fn ensure_usable(&self) -> Result<()> {
        Ok(())
    }

    fn sgmt_count(&self) -> usize {
        self.sgmts().len()
    }

    fn sgmt(&self, index: usize) -> Result<&LateralSegment> {
        self.sgmts()
            .get(index)
            .ok_or_else(|| TrackError::index(index, self.sgmt_count()))
    }

    /// Position of `sgmt` in this path by identity, not by value.
    fn sgmt_pos(&self, sgmt: &LateralSegment) -> Option<usize> {
        self.sgmts().iter().position(|s| std::ptr::eq(s, sgmt))
    }

    /// Start of the first segment.
    fn origin(&self) -> Result<Waypoint> {
        Ok(*self.sgmt(0)?.start())
    }

    fn total_dist(&self) -> f64 {
        self.sgmts().iter().map(LateralSegment::dist).sum()
    }

    /// Index of the segment that owns `wpt`: the smallest error wins, the
    /// first segment on ties. Zero-length segments only compete when the
    /// path has nothing else.
    fn wpt_sgmt(&self, wpt: &Waypoint) -> Result<usize> {
        self.ensure_usable()?;
        let sgmts = self.sgmts();
        let all_degenerate = sgmts.iter().all(LateralSegment::is_degenerate);
        let mut best: Option<(usize, f64)> = None;
        for (idx, sgmt) in sgmts.iter().enumerate() {
            if sgmt.is_degenerate() && !all_degenerate {
                continue;
            }
            let error = self.sgmt_error(sgmt, wpt)?;
            if !error.is_finite() {
                continue;
            }
            match best {
                Some((_, best_error)) if best_error <= error => {}
                _ => best = Some((idx, error)),
            }
        }
        best.map(|(idx, _)| idx).ok_or(TrackError::NotFound(wpt.id))
    }

    /// Signed distance along the path from `w1` to `w2`.
    fn dist_between(&self, w1: &Waypoint, w2: &Waypoint) -> Result<f64> {
        let i1 = self.wpt_sgmt(w1)?;
        let i2 = self.wpt_sgmt(w2)?;
        let sgmts = self.sgmts();
        if i1 == i2 {
            return sgmts[i1].dist_between(w1, w2);
        }
        if i1 > i2 {
            return Ok(-self.dist_between(w2, w1)?);
        }
        let mut total = sgmts[i1].dist_between(w1, sgmts[i1].end())?;
        for sgmt in &sgmts[i1 + 1..i2] {
            total += sgmt.dist();
        }
        total += sgmts[i2].dist_between(sgmts[i2].start(), w2)?;
        Ok(total)
    }

    /// Distance of `wpt` from the path origin.
    fn station(&self, wpt: &Waypoint) -> Result<f64> {
        let origin = self.origin()?;
        self.dist_between(&origin, wpt)
    }

    /// Point `dist_m` meters along the path from `wpt` (upstream when
    /// negative), crossing segment boundaries as needed. Keeps `wpt.id`.
    fn itm_wpt(&self, wpt: &Waypoint, dist_m: f64) -> Result<Waypoint> {
        let sgmts = self.sgmts();
        let mut idx = self.wpt_sgmt(wpt)?;
        let mut from = *wpt;
        let mut remaining = dist_m;
        loop {
            let sgmt = &sgmts[idx];
            if remaining >= 0.0 {
                let to_end = sgmt.dist_between(&from, sgmt.end())?;
                if remaining <= to_end {
                    return sgmt.itm_wpt(&from, remaining);
                }
                if idx + 1 == sgmts.len() {
                    if remaining - to_end <= END_TOLERANCE_M {
                        return Ok(wpt.with_position(sgmt.end().lat, sgmt.end().lon));
                    }
                    return Err(TrackError::OutOfRange(format!(
                        "{:.3}m beyond end of path",
                        remaining - to_end
                    )));
                }
                remaining -= to_end;
                idx += 1;
                let next = sgmts[idx].start();
                from = wpt.with_position(next.lat, next.lon);
            } else {
                let to_start = sgmt.dist_between(&from, sgmt.start())?;
                if remaining >= to_start {
                    return sgmt.itm_wpt(&from, remaining);
                }
                if idx == 0 {
                    if to_start - remaining <= END_TOLERANCE_M {
                        return Ok(wpt.with_position(sgmt.start().lat, sgmt.start().lon));
                    }
                    return Err(TrackError::OutOfRange(format!(
                        "{:.3}m before start of path",
                        to_start - remaining
                    )));
                }
                remaining -= to_start;
                idx -= 1;
                let prev = sgmts[idx].end();
                from = wpt.with_position(prev.lat, prev.lon);
            }
        }
    }

    /// Point at `dist_m` from the path origin.
    fn wpt_at_station(&self, dist_m: f64, id: i64) -> Result<Waypoint> {
        let origin = self.origin()?;
        self.itm_wpt(&Waypoint { id, ..origin }, dist_m)
    }

    /// Move `wpt` onto the path of its owning segment.
    fn align_wpt(&self, wpt: &mut Waypoint) -> Result<()> {
        let idx = self.wpt_sgmt(wpt)?;
        self.align_on(&self.sgmts()[idx], wpt)
    }

    /// Course of the path at `wpt`.
    fn course_at(&self, wpt: &Waypoint) -> Result<f64> {
        let idx = self.wpt_sgmt(wpt)?;
        self.sgmts()[idx].course_at(wpt)
    }
}

/// Designed lateral route as handed over by a loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LateralPlan {
    sgmts: Vec<LateralSegment>,
}

impl LateralPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sgmt(&mut self, sgmt: impl Into<LateralSegment>) {
        self.sgmts.push(sgmt.into());
    }
}

impl LateralPath for LateralPlan {
    fn sgmts(&self) -> &[LateralSegment] {
        &self.sgmts
    }

    fn sgmt_error(&self, sgmt: &LateralSegment, wpt: &Waypoint) -> Result<f64> {
        sgmt.plan_error(wpt)
    }

    fn align_on(&self, sgmt: &LateralSegment, wpt: &mut Waypoint) -> Result<()> {
        sgmt.align_to_plan(wpt)
    }
}

/// Flyable lateral route. Usable for queries only after `validate` passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LateralTrack {
    sgmts: Vec<LateralSegment>,
    #[serde(default)]
    valid: bool,
}

impl LateralTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment; the track must be validated again afterwards.
    pub fn add_sgmt(&mut self, sgmt: impl Into<LateralSegment>) {
        self.sgmts.push(sgmt.into());
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Check that consecutive segments join within the adjacency tolerance.
    pub fn validate(&mut self, config: &TransformConfig) -> bool {
        self.valid = !self.sgmts.is_empty()
            && self
                .sgmts
                .iter()
                .all(|s| s.start().is_located() && s.end().is_located());
        for (idx, pair) in self.sgmts.windows(2).enumerate() {
            let gap = distance(pair[0].end(), pair[1].start());
            if !(gap <= config.adjacency_tolerance_m) {
                tracing::warn!(
                    "Lateral track discontinuity between segments {} and {}: {:.3}m",
                    idx,
                    idx + 1,
                    gap
                );
                self.valid = false;
            }
        }
        self.valid
    }
}

impl LateralPath for LateralTrack {
    fn sgmts(&self) -> &[LateralSegment] {
        &self.sgmts
    }

    fn sgmt_error(&self, sgmt: &LateralSegment, wpt: &Waypoint) -> Result<f64> {
        sgmt.track_error(wpt)
    }

    fn align_on(&self, sgmt: &LateralSegment, wpt: &mut Waypoint) -> Result<()> {
        sgmt.align_to_track(wpt)
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(TrackError::integrity("lateral track is not validated"))
        }
    }
}
