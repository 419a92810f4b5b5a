//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no config at
//! all) yields a working engine. Per-trail settings live in
//! [`TrailOptions`](crate::model::TrailOptions); this struct holds the
//! host-wide tuning shared by all trails.

use serde::{Deserialize, Serialize};

use crate::error::TrailResult;

/// Scanner radius used when a trail does not set one, in meters.
pub const DEFAULT_SCANNER_RADIUS_M: f64 = 50.0;

/// Host-wide tuning for projection and scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scanner radius when the trail leaves it unset.
    pub default_scanner_radius_m: f64,
    /// Upper bound for the device-centred viewport radius.
    pub max_viewport_radius_m: f64,
    /// Multiplier applied to half the trail's longest side.
    pub viewport_padding_factor: f64,
    /// Smallest extent of the trail's longer side visible at max zoom.
    pub max_detail_m: f64,
    /// Padding added around imported spots when deriving a trail boundary.
    pub trail_padding_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_scanner_radius_m: DEFAULT_SCANNER_RADIUS_M,
            max_viewport_radius_m: 2_000.0,
            viewport_padding_factor: 1.2,
            max_detail_m: 100.0,
            trail_padding_m: 0.0,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> TrailResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
