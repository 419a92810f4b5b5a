//! Trail import from GPX 1.1 waypoints.
//!
//! Wraps the `gpx` crate. Each `<wpt>` becomes a spot in file order; the
//! trail boundary is the padded bounding box of the spots. Geocaching
//! exports carry their caches as waypoints, so a cache listing imports
//! directly as a trail.

use std::collections::HashSet;
use std::io::Read;

use crate::error::{TrailError, TrailResult};
use crate::geo::{bounding_box, GeoLocation};
use crate::model::{Spot, SpotImages, Trail, TrailOptions, Visibility};
use crate::session::TrailSnapshot;

/// Discovery radius given to imported spots, in meters.
pub const DEFAULT_DISCOVERY_RADIUS_M: f64 = 20.0;

/// A trail parsed from GPX, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailDraft {
    pub trail: Trail,
    pub spots: Vec<Spot>,
}

impl TrailDraft {
    pub fn into_snapshot(self) -> TrailResult<TrailSnapshot> {
        TrailSnapshot::new(self.trail, self.spots)
    }
}

/// Parse GPX waypoints into a trail authored by `created_by`.
///
/// Spot ids come from waypoint names (made unique with the waypoint index
/// when repeated) or `wpt-<index>` for unnamed waypoints. A `<sym>` naming
/// a visibility (`public`, `preview`, `private`) sets it; anything else is
/// public. Fails when the file has no waypoints.
pub fn parse_trail<R: Read>(
    reader: R,
    trail_id: &str,
    created_by: &str,
    options: TrailOptions,
    padding_m: f64,
) -> TrailResult<TrailDraft> {
    let gpx = gpx::read(reader).map_err(|e| TrailError::Gpx(e.to_string()))?;

    let mut seen = HashSet::new();
    let spots: Vec<Spot> = gpx
        .waypoints
        .iter()
        .enumerate()
        .map(|(i, wp)| {
            let base = wp
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map_or_else(|| format!("wpt-{i}"), str::to_string);
            let mut id = base.clone();
            let mut suffix = i;
            while !seen.insert(id.clone()) {
                id = format!("{base}-{suffix}");
                suffix += 1;
            }

            Spot {
                id,
                location: GeoLocation::new(wp.point().y(), wp.point().x()),
                discovery_radius: DEFAULT_DISCOVERY_RADIUS_M,
                visibility: wp
                    .symbol
                    .as_deref()
                    .and_then(Visibility::from_keyword)
                    .unwrap_or_default(),
                created_by: created_by.to_string(),
                images: SpotImages::default(),
            }
        })
        .collect();

    let locations: Vec<GeoLocation> = spots.iter().map(|s| s.location).collect();
    let boundary = bounding_box(&locations, padding_m)
        .ok_or_else(|| TrailError::Gpx("no waypoints".to_string()))?;

    let trail = Trail {
        id: trail_id.to_string(),
        boundary,
        ordered_spot_ids: spots.iter().map(|s| s.id.clone()).collect(),
        options,
    };

    Ok(TrailDraft { trail, spots })
}

/// Parse from a byte slice. Convenience wrapper for JNI.
pub fn parse_trail_bytes(
    data: &[u8],
    trail_id: &str,
    created_by: &str,
    options: TrailOptions,
    padding_m: f64,
) -> TrailResult<TrailDraft> {
    parse_trail(data, trail_id, created_by, options, padding_m)
}
