//! Discovery by walking into a spot's radius.
//!
//! Pure: takes a snapshot of the trail, candidate spots, and the account's
//! discovery history, and returns the discoveries this update earns.
//! Persisting them is the caller's job.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::debug;

use crate::geo::{distance, GeoLocation};
use crate::model::{Discovery, DiscoveryMode, Spot, Trail};

/// A spot within its discovery radius of the device.
#[derive(Debug, Clone, Copy)]
struct InRange<'a> {
    spot: &'a Spot,
    distance_m: f64,
}

/// Determine the new discoveries for a location update.
///
/// `existing` is the account's discovery history; only entries for this
/// trail are considered. In [`DiscoveryMode::Free`] every spot in range is
/// discovered; in [`DiscoveryMode::Sequence`] only the spot at index
/// `count(existing)` of the trail order can be, and only if it is in range.
///
/// Results follow trail order. Nothing in range yields an empty vector.
pub fn process_location_update(
    account_id: &str,
    location: &GeoLocation,
    candidates: &[Spot],
    existing: &[Discovery],
    trail: &Trail,
    now: DateTime<Utc>,
) -> Vec<Discovery> {
    let trail_history: Vec<&Discovery> = existing
        .iter()
        .filter(|d| d.trail_id == trail.id && d.account_id == account_id)
        .collect();
    let discovered: HashSet<&str> = trail_history.iter().map(|d| d.spot_id.as_str()).collect();

    let mut in_range: Vec<InRange> = candidates
        .iter()
        .filter(|spot| !spot.is_authored_by(account_id))
        .filter(|spot| !discovered.contains(spot.id.as_str()))
        .filter_map(|spot| {
            let distance_m = distance(location, &spot.location);
            (distance_m <= spot.discovery_radius).then_some(InRange { spot, distance_m })
        })
        .collect();

    debug!(
        "proximity: account={} trail={} candidates={} in_range={}",
        account_id,
        trail.id,
        candidates.len(),
        in_range.len()
    );

    match trail.options.discovery_mode {
        DiscoveryMode::Free => {
            in_range.sort_by_key(|hit| trail.spot_index(&hit.spot.id).unwrap_or(usize::MAX));
        }
        DiscoveryMode::Sequence => {
            let next_index = trail_history.len();
            let Some(next_id) = trail.ordered_spot_ids.get(next_index) else {
                return Vec::new();
            };
            in_range.retain(|hit| &hit.spot.id == next_id);
        }
    }

    in_range
        .into_iter()
        .map(|hit| {
            debug!(
                "proximity: {} discovered at {:.1} m (radius {:.1} m)",
                hit.spot.id, hit.distance_m, hit.spot.discovery_radius
            );
            Discovery::new(account_id, &hit.spot.id, &trail.id, now)
        })
        .collect()
}
