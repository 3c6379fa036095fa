//! Station bookkeeping shared by the velocity and vertical tracks.
//!
//! Both profiles hang off the lateral track: every segment endpoint is
//! measured as a station, the distance from the lateral origin.

use crate::error::{Result, TrackError};
use crate::lateral::LateralPath;
use crate::models::Waypoint;

pub(crate) trait ProfileSegment {
    fn start(&self) -> &Waypoint;
    fn end(&self) -> &Waypoint;
    fn length(&self) -> f64;
}

/// Measure the start station of every segment and check adjacency.
///
/// Returns `None` when any pair of neighbours overlaps or leaves a gap wider
/// than `tolerance_m`, or when the lateral path cannot place a segment.
pub(crate) fn survey<S: ProfileSegment>(
    kind: &str,
    sgmts: &[S],
    lateral: &impl LateralPath,
    tolerance_m: f64,
) -> Option<Vec<f64>> {
    if sgmts.is_empty() {
        tracing::warn!("{} track has no segments", kind);
        return None;
    }
    let mut stations = Vec::with_capacity(sgmts.len());
    for (idx, sgmt) in sgmts.iter().enumerate() {
        match lateral.station(sgmt.start()) {
            Ok(station) => stations.push(station),
            Err(err) => {
                tracing::warn!("{} segment {} cannot be placed: {}", kind, idx, err);
                return None;
            }
        }
    }
    let mut valid = true;
    for (idx, pair) in sgmts.windows(2).enumerate() {
        let gap = match lateral.dist_between(pair[0].end(), pair[1].start()) {
            Ok(gap) => gap,
            Err(err) => {
                tracing::warn!("{} segments {}/{} cannot be compared: {}", kind, idx, idx + 1, err);
                return None;
            }
        };
        if gap < -tolerance_m {
            tracing::warn!(
                "{} segments {} and {} overlap by {:.3}m",
                kind,
                idx,
                idx + 1,
                -gap
            );
            valid = false;
        } else if gap > tolerance_m {
            tracing::warn!(
                "{} segments {} and {} leave a {:.3}m gap",
                kind,
                idx,
                idx + 1,
                gap
            );
            valid = false;
        }
    }
    valid.then_some(stations)
}

/// Segment covering `station` and the distance into it. At a shared
/// boundary the earlier segment wins.
pub(crate) fn locate<S: ProfileSegment>(
    sgmts: &[S],
    stations: &[f64],
    station: f64,
    tolerance_m: f64,
) -> Result<(usize, f64)> {
    for (idx, (sgmt, start)) in sgmts.iter().zip(stations).enumerate() {
        let local = station - start;
        if local >= -tolerance_m && local <= sgmt.length() + tolerance_m {
            return Ok((idx, local.clamp(0.0, sgmt.length().max(0.0))));
        }
    }
    Err(TrackError::OutOfRange(format!(
        "station {:.3}m not covered by profile",
        station
    )))
}
