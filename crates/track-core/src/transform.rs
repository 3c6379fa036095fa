//! Plan-to-track transforms.
//!
//! The lateral track is built first from geometry alone. Velocity and
//! vertical tracks are then derived from their plans with every distance
//! re-measured along that lateral track.

use crate::config::TransformConfig;
use crate::direct::DirectSegment;
use crate::error::{Result, TrackError};
use crate::lateral::{LateralPath, LateralPlan, LateralSegment, LateralTrack};
use crate::models::{TurnDirection, Waypoint};
use crate::spatial::{
    destination_point, distance, final_bearing, great_circle_intersection, initial_bearing,
    turn_angle, MIN_SEGMENT_LENGTH_M,
};
use crate::turn::TurnSegment;
use crate::velocity::{acceleration, VelocityPlan, VelocitySegment, VelocityTrack};
use crate::vertical::{VerticalPlan, VerticalTrack};

/// Turns at least this sharp have no usable corner.
const MAX_TURN_DEG: f64 = 179.9;

/// Build the flyable lateral track from a plan.
///
/// Every turn flanked by two direct legs is re-fitted tangent to both legs,
/// and the legs are trimmed to the tangent points. Other segments are copied
/// as planned. The returned track has been validated; callers check
/// `is_valid` before querying it.
pub fn build_lateral_track(plan: &LateralPlan, config: &TransformConfig) -> Result<LateralTrack> {
    let mut sgmts: Vec<LateralSegment> = plan.sgmts().to_vec();
    for idx in 0..sgmts.len() {
        let Some(turn) = sgmts[idx].as_turn() else {
            continue;
        };
        let (Some(inbound), Some(outbound)) = (
            idx.checked_sub(1).and_then(|i| sgmts[i].as_direct()),
            sgmts.get(idx + 1).and_then(LateralSegment::as_direct),
        ) else {
            tracing::debug!("Turn segment {} kept as planned (no direct neighbours)", idx);
            continue;
        };
        let fitted = fit_turn(inbound, turn, outbound)?;
        sgmts[idx - 1].set_end(*fitted.start());
        sgmts[idx + 1].set_start(*fitted.end());
        sgmts[idx] = fitted.into();
    }

    let mut track = LateralTrack::new();
    for sgmt in sgmts {
        track.add_sgmt(sgmt);
    }
    if track.validate(config) {
        tracing::debug!(
            "Lateral track built: {} segments, {:.1}m",
            track.sgmt_count(),
            track.total_dist()
        );
    } else {
        tracing::warn!("Lateral track failed validation");
    }
    Ok(track)
}

/// Arc of `turn`'s radius tangent to both legs around their corner.
fn fit_turn(
    inbound: &DirectSegment,
    turn: &TurnSegment,
    outbound: &DirectSegment,
) -> Result<TurnSegment> {
    inbound.require_direction()?;
    outbound.require_direction()?;
    let corner = great_circle_intersection(
        inbound.start(),
        inbound.end(),
        outbound.start(),
        outbound.end(),
        inbound.end(),
    )?;
    let course_in = final_bearing(inbound.start(), &corner)?;
    let course_out = initial_bearing(&corner, outbound.end())?;
    let delta = turn_angle(course_in, course_out);
    if delta.abs() >= MAX_TURN_DEG {
        return Err(TrackError::degenerate(format!(
            "turn {} -> {} reverses course ({:.1} deg)",
            turn.start().id,
            turn.end().id,
            delta
        )));
    }

    let radius = turn.radius();
    let tangent = radius * (delta.abs().to_radians() / 2.0).tan();
    let inbound_len = distance(inbound.start(), &corner);
    let outbound_len = distance(&corner, outbound.end());
    if tangent > inbound_len + MIN_SEGMENT_LENGTH_M || tangent > outbound_len + MIN_SEGMENT_LENGTH_M
    {
        return Err(TrackError::degenerate(format!(
            "turn {} -> {} needs {:.1}m of tangent but legs are {:.1}m and {:.1}m",
            turn.start().id,
            turn.end().id,
            tangent,
            inbound_len,
            outbound_len
        )));
    }

    let direction = TurnDirection::from_angle(delta);
    if direction != turn.direction() {
        tracing::warn!(
            "Turn {} -> {} planned {:?} but legs turn {:?}",
            turn.start().id,
            turn.end().id,
            turn.direction(),
            direction
        );
    }

    let entry = {
        let p = destination_point(&corner, course_in + 180.0, tangent);
        turn.start().with_position(p.lat, p.lon)
    };
    let exit = destination_point(&corner, course_out, tangent);
    // Courses at the tangent points differ slightly from those at the corner.
    let course_entry = if tangent >= MIN_SEGMENT_LENGTH_M {
        initial_bearing(&entry, &corner)?
    } else {
        course_in
    };
    let course_exit = if distance(&exit, outbound.end()) >= MIN_SEGMENT_LENGTH_M {
        initial_bearing(&exit, outbound.end())?
    } else {
        course_out
    };
    TurnSegment::from_tangent(
        entry,
        course_entry,
        radius,
        turn_angle(course_entry, course_exit),
        turn.end().id,
    )
}

/// Put a profile boundary waypoint onto the lateral track. Waypoints owned by
/// a turn are relocated onto the arc; others are projected onto their leg.
pub(crate) fn snap_to_track(
    lateral: &LateralTrack,
    wpt: &mut Waypoint,
    config: &TransformConfig,
) -> Result<()> {
    let idx = lateral.wpt_sgmt(wpt)?;
    let sgmt = lateral.sgmt(idx)?;
    match sgmt.as_turn() {
        Some(turn) => turn.relocate(wpt, config.relocation_threshold_m),
        None => sgmt.align_to_track(wpt),
    }
}

/// Derive the velocity track from a plan along a validated lateral track.
///
/// Segments are processed in order. A wait leg pins its own speed to the
/// wait speed and hands it to the end of the previous leg and to the start
/// of the next one.
pub fn build_velocity_track(
    plan: &VelocityPlan,
    lateral: &LateralTrack,
    config: &TransformConfig,
) -> Result<VelocityTrack> {
    lateral.ensure_usable()?;
    let count = plan.sgmt_count();
    let mut sgmts: Vec<VelocitySegment> = Vec::with_capacity(count);
    let mut carried_vas: Option<f64> = None;

    for (idx, planned) in plan.sgmts().iter().enumerate() {
        let mut sgmt = planned.clone();
        if let Some(vas) = carried_vas.take() {
            sgmt.v_asi = vas;
        }
        snap_to_track(lateral, &mut sgmt.start, config)?;
        snap_to_track(lateral, &mut sgmt.end, config)?;
        sgmt.dist = lateral.dist_between(&sgmt.start, &sgmt.end)?;

        if planned.offset > 0.0 && planned.is_wait(config.wait_speed_mps) {
            let wait_speed = planned.offset * config.wait_speed_mps / planned.offset;
            sgmt.v_asi = wait_speed;
            sgmt.v_asf = wait_speed;
            sgmt.acc = 0.0;
            sgmt.wait = true;
            if let Some(prev) = sgmts.last_mut() {
                if !prev.wait {
                    prev.v_asf = wait_speed;
                    prev.acc = acceleration(prev.v_asi, prev.v_asf, prev.dist, config)?;
                }
            }
            if idx + 1 < count {
                carried_vas = Some(wait_speed);
            }
            tracing::debug!(
                "Velocity segment {} is a {:.1}s wait at {:.3} m/s",
                idx,
                sgmt.offset,
                wait_speed
            );
        } else {
            sgmt.wait = false;
            sgmt.acc = acceleration(sgmt.v_asi, sgmt.v_asf, sgmt.dist, config)?;
        }
        sgmts.push(sgmt);
    }

    let mut track = VelocityTrack::new(config.clone());
    for sgmt in sgmts {
        track.add_sgmt(sgmt);
    }
    if !track.validate(lateral) {
        tracing::warn!("Velocity track failed validation");
    }
    Ok(track)
}

/// Derive the vertical track from a plan, timing each leg with the uniform
/// airspeed the velocity track flies over it.
pub fn build_vertical_track(
    plan: &VerticalPlan,
    lateral: &LateralTrack,
    velocity: &VelocityTrack,
    config: &TransformConfig,
) -> Result<VerticalTrack> {
    lateral.ensure_usable()?;
    let mut track = VerticalTrack::new(config.clone());

    for (idx, planned) in plan.sgmts().iter().enumerate() {
        let mut sgmt = planned.clone();
        snap_to_track(lateral, &mut sgmt.start, config)?;
        snap_to_track(lateral, &mut sgmt.end, config)?;
        sgmt.dist = lateral.dist_between(&sgmt.start, &sgmt.end)?;
        if sgmt.dist.abs() < config.degenerate_dist_m {
            return Err(TrackError::degenerate(format!(
                "vertical segment {} has no lateral extent",
                idx
            )));
        }
        let vasu = velocity.vasu(lateral, &sgmt.start, &sgmt.end)?;
        if vasu.abs() < config.min_airspeed_mps {
            return Err(TrackError::degenerate(format!(
                "vertical segment {} is flown at zero airspeed",
                idx
            )));
        }
        let time = sgmt.dist / vasu;
        sgmt.vs = sgmt.alt_delta() / time;
        sgmt.alpha = (sgmt.alt_delta() / sgmt.dist).atan();
        track.add_sgmt(sgmt);
    }

    if !track.validate(lateral) {
        tracing::warn!("Vertical track failed validation");
    }
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertical::VerticalSegment;

    const WS: f64 = 0.01;

    fn equator_track() -> (LateralTrack, [Waypoint; 3]) {
        let a = Waypoint::new(1, 0.0, 0.0);
        let b = Waypoint::new(2, 0.0, 0.01);
        let c = Waypoint::new(3, 0.0, 0.02);
        let mut plan = LateralPlan::new();
        plan.add_sgmt(DirectSegment::new(a, b));
        plan.add_sgmt(DirectSegment::new(b, c));
        let track = build_lateral_track(&plan, &TransformConfig::default()).unwrap();
        (track, [a, b, c])
    }

    fn wait_plan([a, b, c]: [Waypoint; 3]) -> VelocityPlan {
        let mut plan = VelocityPlan::new();
        plan.add_sgmt(VelocitySegment::new(a, b, 10.0, 20.0, 0.0));
        plan.add_sgmt(VelocitySegment::new(b, b, 20.0, 20.0, 30.0));
        plan.add_sgmt(VelocitySegment::new(b, c, 20.0, 10.0, 0.0));
        plan
    }

    fn cornered_plan(direction: TurnDirection) -> (LateralPlan, Waypoint) {
        // North 5km, then east 5km, joined by a 1km turn.
        let a = Waypoint::new(1, 33.0, -117.0);
        let corner = destination_point(&a, 0.0, 5000.0);
        let c = Waypoint {
            id: 4,
            ..destination_point(&corner, 90.0, 5000.0)
        };
        let entry = Waypoint {
            id: 2,
            ..destination_point(&a, 0.0, 4000.0)
        };
        let exit = Waypoint {
            id: 3,
            ..destination_point(&corner, 90.0, 1000.0)
        };
        let mut plan = LateralPlan::new();
        plan.add_sgmt(DirectSegment::new(a, entry));
        plan.add_sgmt(TurnSegment::new(entry, exit, 1000.0, direction).unwrap());
        plan.add_sgmt(DirectSegment::new(exit, c));
        (plan, corner)
    }

    #[test]
    fn turn_is_fitted_between_legs() {
        let (plan, corner) = cornered_plan(TurnDirection::Right);
        let track = build_lateral_track(&plan, &TransformConfig::default()).unwrap();
        assert!(track.is_valid());
        let turn = track.sgmt(1).unwrap().as_turn().unwrap();
        assert_eq!(turn.direction(), TurnDirection::Right);
        assert!((turn.sweep_deg().unwrap() - 90.0).abs() < 0.1);
        assert!((distance(turn.start(), &corner) - 1000.0).abs() < 1.0);
        assert!((distance(turn.end(), &corner) - 1000.0).abs() < 1.0);
        assert_eq!(turn.start().id, 2);
        assert_eq!(turn.end().id, 3);
        assert!(distance(track.sgmt(0).unwrap().end(), turn.start()) < 1e-6);
        assert!(distance(track.sgmt(2).unwrap().start(), turn.end()) < 1e-6);
    }

    #[test]
    fn turn_direction_follows_geometry() {
        let (plan, _) = cornered_plan(TurnDirection::Left);
        let track = build_lateral_track(&plan, &TransformConfig::default()).unwrap();
        let turn = track.sgmt(1).unwrap().as_turn().unwrap();
        assert_eq!(turn.direction(), TurnDirection::Right);
    }

    #[test]
    fn oversized_turn_is_rejected() {
        let a = Waypoint::new(1, 33.0, -117.0);
        let corner = destination_point(&a, 0.0, 500.0);
        let c = Waypoint {
            id: 3,
            ..destination_point(&corner, 90.0, 500.0)
        };
        let b = Waypoint { id: 2, ..corner };
        let mut plan = LateralPlan::new();
        plan.add_sgmt(DirectSegment::new(a, b));
        plan.add_sgmt(TurnSegment::from_tangent(b, 0.0, 1000.0, 90.0, 2).unwrap());
        plan.add_sgmt(DirectSegment::new(b, c));
        assert!(matches!(
            build_lateral_track(&plan, &TransformConfig::default()),
            Err(TrackError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn wait_speed_propagates_to_neighbours() {
        let config = TransformConfig::default();
        let (lateral, wpts) = equator_track();
        let track = build_velocity_track(&wait_plan(wpts), &lateral, &config).unwrap();
        assert!(track.is_valid());

        let first = track.sgmt(0).unwrap();
        let wait = track.sgmt(1).unwrap();
        let last = track.sgmt(2).unwrap();
        assert!(wait.wait);
        assert_eq!(wait.v_asi, wait.v_asf);
        assert!((wait.v_asi - WS).abs() < 1e-12);
        assert!((first.v_asf - WS).abs() < 1e-12);
        assert!((last.v_asi - WS).abs() < 1e-12);
        let expected_first = (first.v_asf.powi(2) - first.v_asi.powi(2)) / (2.0 * first.dist);
        let expected_last = (last.v_asf.powi(2) - last.v_asi.powi(2)) / (2.0 * last.dist);
        assert!((first.acc - expected_first).abs() < 1e-12);
        assert!((last.acc - expected_last).abs() < 1e-12);
    }

    #[test]
    fn trailing_wait_has_nothing_to_hand_on() {
        let config = TransformConfig::default();
        let (lateral, [a, _, c]) = equator_track();
        let mut plan = VelocityPlan::new();
        plan.add_sgmt(VelocitySegment::new(a, c, 15.0, 15.0, 0.0));
        plan.add_sgmt(VelocitySegment::new(c, c, 15.0, 15.0, 60.0));
        let track = build_velocity_track(&plan, &lateral, &config).unwrap();
        assert!(track.is_valid());
        assert!((track.sgmt(0).unwrap().v_asf - WS).abs() < 1e-12);
        assert!(track.duration().unwrap() > 60.0);
    }

    #[test]
    fn velocity_transform_is_idempotent() {
        let config = TransformConfig::default();
        let (lateral, wpts) = equator_track();
        let once = build_velocity_track(&wait_plan(wpts), &lateral, &config).unwrap();
        let twice = build_velocity_track(&VelocityPlan::from(&once), &lateral, &config).unwrap();
        assert_eq!(once.sgmt_count(), twice.sgmt_count());
        for (a, b) in once.sgmts().iter().zip(twice.sgmts()) {
            assert!((a.dist - b.dist).abs() < 1e-9);
            assert!((a.acc - b.acc).abs() < 1e-12);
            assert_eq!(a.wait, b.wait);
        }
    }

    #[test]
    fn zero_length_travel_leg_is_degenerate() {
        let config = TransformConfig::default();
        let (lateral, [_, b, _]) = equator_track();
        let mut plan = VelocityPlan::new();
        plan.add_sgmt(VelocitySegment::new(b, b, 10.0, 20.0, 0.0));
        assert!(matches!(
            build_velocity_track(&plan, &lateral, &config),
            Err(TrackError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn boundary_waypoints_are_relocated_onto_turns() {
        let config = TransformConfig::default();
        let (plan, _) = cornered_plan(TurnDirection::Right);
        let lateral = build_lateral_track(&plan, &config).unwrap();
        let turn = lateral.sgmt(1).unwrap().as_turn().unwrap().clone();

        let on_arc = turn.itm_wpt(turn.start(), turn.dist() / 2.0).unwrap();
        let radial = initial_bearing(turn.center(), &on_arc).unwrap();
        let mut near = Waypoint {
            id: 77,
            ..destination_point(turn.center(), radial, turn.radius() + 5.0)
        };
        snap_to_track(&lateral, &mut near, &config).unwrap();
        assert_eq!(near.id, 77);
        assert!(turn.deviation(&near).unwrap() < 1e-3);

        let mut far = destination_point(turn.center(), radial, turn.radius() + 300.0);
        assert!(matches!(
            snap_to_track(&lateral, &mut far, &config),
            Err(TrackError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn vertical_speed_matches_time_of_flight() {
        let config = TransformConfig::default();
        let (lateral, wpts) = equator_track();
        let [a, b, c] = wpts;
        let velocity = build_velocity_track(&wait_plan(wpts), &lateral, &config).unwrap();

        let mut plan = VerticalPlan::new();
        plan.add_sgmt(VerticalSegment::new(a, b, 0.0, 300.0));
        plan.add_sgmt(VerticalSegment::new(b, c, 300.0, 100.0));
        let vertical = build_vertical_track(&plan, &lateral, &velocity, &config).unwrap();
        assert!(vertical.is_valid());

        for sgmt in vertical.sgmts() {
            let time = velocity.time_between(&lateral, &sgmt.start, &sgmt.end).unwrap();
            assert!((sgmt.vs * time - sgmt.alt_delta()).abs() < 1e-6);
            assert!((sgmt.alpha.tan() * sgmt.dist - sgmt.alt_delta()).abs() < 1e-6);
        }
        assert!(vertical.sgmt(1).unwrap().vs < 0.0);
    }

    #[test]
    fn wait_leg_with_length_keeps_position_continuous() {
        let config = TransformConfig::default();
        let (lateral, [a, b, c]) = equator_track();
        let held = Waypoint {
            id: 5,
            ..destination_point(&b, 90.0, 0.2)
        };
        let mut plan = VelocityPlan::new();
        plan.add_sgmt(VelocitySegment::new(a, b, 10.0, 20.0, 0.0));
        plan.add_sgmt(VelocitySegment::new(b, held, 20.0, 20.0, 30.0));
        plan.add_sgmt(VelocitySegment::new(held, c, 20.0, 10.0, 0.0));
        let track = build_velocity_track(&plan, &lateral, &config).unwrap();
        assert!(track.is_valid());
        let wait = track.sgmt(1).unwrap();
        assert!(wait.wait);
        assert!((wait.dist - 0.2).abs() < 1e-6);

        let at_b = lateral.station(&b).unwrap();
        let arrival = track.time_at_station(at_b).unwrap();
        let halfway = track.dist_at_time(arrival + 15.0).unwrap();
        assert!((halfway - (at_b + wait.dist / 2.0)).abs() < 1e-6);
        let back = track.time_at_station(at_b + wait.dist / 2.0).unwrap();
        assert!((back - (arrival + 15.0)).abs() < 1e-6);

        let mut last = at_b;
        for second in 0..=30 {
            let station = track.dist_at_time(arrival + second as f64).unwrap();
            assert!(station >= last - 1e-6);
            assert!(station - last <= wait.dist / 30.0 + 1e-6);
            last = station;
        }
        assert!((last - (at_b + wait.dist)).abs() < 1e-6);
    }

    #[test]
    fn zero_length_vertical_leg_is_degenerate() {
        let config = TransformConfig::default();
        let (lateral, wpts) = equator_track();
        let [_, b, _] = wpts;
        let velocity = build_velocity_track(&wait_plan(wpts), &lateral, &config).unwrap();
        let mut plan = VerticalPlan::new();
        plan.add_sgmt(VerticalSegment::new(b, b, 100.0, 200.0));
        assert!(matches!(
            build_vertical_track(&plan, &lateral, &velocity, &config),
            Err(TrackError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn leg_without_airspeed_cannot_be_timed() {
        let config = TransformConfig::default();
        let (lateral, [a, _, c]) = equator_track();
        let mut speeds = VelocityPlan::new();
        speeds.add_sgmt(VelocitySegment::new(a, c, 0.0, 0.0, 0.0));
        let velocity = build_velocity_track(&speeds, &lateral, &config).unwrap();
        assert!(velocity.is_valid());

        let mut plan = VerticalPlan::new();
        plan.add_sgmt(VerticalSegment::new(a, c, 0.0, 100.0));
        assert!(matches!(
            build_vertical_track(&plan, &lateral, &velocity, &config),
            Err(TrackError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn profiles_answer_by_waypoint() {
        let config = TransformConfig::default();
        let (lateral, [a, b, c]) = equator_track();
        let mut speeds = VelocityPlan::new();
        speeds.add_sgmt(VelocitySegment::new(a, c, 10.0, 20.0, 0.0));
        let velocity = build_velocity_track(&speeds, &lateral, &config).unwrap();
        let mut climb = VerticalPlan::new();
        climb.add_sgmt(VerticalSegment::new(a, c, 0.0, 300.0));
        let vertical = build_vertical_track(&climb, &lateral, &velocity, &config).unwrap();

        // b sits halfway along the single leg.
        let vas = velocity.vas_at(&lateral, &b).unwrap();
        assert!((vas - 250.0_f64.sqrt()).abs() < 1e-6);
        assert!((velocity.vas_at(&lateral, &c).unwrap() - 20.0).abs() < 1e-9);

        let sgmt = vertical.sgmt(0).unwrap();
        assert!((vertical.alt_at(&lateral, &b).unwrap() - 150.0).abs() < 1e-6);
        assert!((vertical.vs_at(&lateral, &b).unwrap() - sgmt.vs).abs() < 1e-12);
        let alpha = vertical.alpha_at(&lateral, &b).unwrap();
        assert!((alpha - (300.0 / lateral.total_dist()).atan()).abs() < 1e-9);
        assert!(sgmt.vs > 0.0);
    }

    #[test]
    fn unvalidated_lateral_track_is_refused() {
        let config = TransformConfig::default();
        let (_, wpts) = equator_track();
        let lateral = LateralTrack::new();
        assert!(matches!(
            build_velocity_track(&wait_plan(wpts), &lateral, &config),
            Err(TrackError::IntegrityViolation(_))
        ));
    }
}
