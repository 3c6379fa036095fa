//! Tunables for the plan-to-track transforms.

use serde::{Deserialize, Serialize};

/// Configuration passed explicitly to every transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Nominal creep speed used to detect and fill wait legs (m/s)
    pub wait_speed_mps: f64,
    /// Maximum distance a waypoint may be pulled onto a turn arc (meters)
    pub relocation_threshold_m: f64,
    /// Allowed gap/overlap between adjacent segment endpoints (meters)
    pub adjacency_tolerance_m: f64,
    /// Distances below this are treated as zero length (meters)
    pub degenerate_dist_m: f64,
    /// Airspeeds below this are treated as standing still (m/s)
    pub min_airspeed_mps: f64,
    /// Gravitational acceleration used for bank angles (m/s²)
    pub gravity_mps2: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            wait_speed_mps: 0.01,
            relocation_threshold_m: 50.0,
            adjacency_tolerance_m: 0.01,
            degenerate_dist_m: 1e-3,
            min_airspeed_mps: 1e-6,
            gravity_mps2: 9.80665,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_falls_back_to_defaults() {
        let config: TransformConfig =
            serde_json::from_str(r#"{"wait_speed_mps": 0.05}"#).unwrap();
        assert_eq!(config.wait_speed_mps, 0.05);
        assert_eq!(config.relocation_threshold_m, 50.0);
        assert_eq!(config.gravity_mps2, 9.80665);
    }
}
