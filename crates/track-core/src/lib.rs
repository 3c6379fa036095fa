pub mod config;
pub mod direct;
pub mod error;
pub mod events;
pub mod lateral;
pub mod models;
mod profile;
pub mod spatial;
pub mod trajectory;
pub mod transform;
pub mod turn;
pub mod velocity;
pub mod vertical;

pub use config::TransformConfig;
pub use direct::DirectSegment;
pub use error::{Result, TrackError};
pub use events::{Event, EventCollection, EventKind};
pub use lateral::{LateralPath, LateralPlan, LateralSegment, LateralTrack};
pub use models::{Attitude, TrackSample, TurnDirection, Waypoint};
pub use spatial::haversine_distance;
pub use trajectory::FlightTrack;
pub use transform::{build_lateral_track, build_velocity_track, build_vertical_track};
pub use turn::TurnSegment;
pub use velocity::{VelocityPlan, VelocitySegment, VelocityTrack};
pub use vertical::{VerticalPlan, VerticalSegment, VerticalTrack};
