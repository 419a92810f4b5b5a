//! On-demand radius sweep.
//!
//! A scan senses spots that are near but not yet walkable-into and returns
//! them as clues. It never grants a discovery; only a real location update
//! inside a spot's radius does that.

use chrono::{DateTime, Utc};
use log::info;

use crate::clue::{Clue, ClueDetail};
use crate::geo::{distance, GeoLocation};
use crate::model::{ScanEvent, Spot, Trail, Visibility};

/// Result of a scan: the event to persist and the transient clues.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub event: ScanEvent,
    pub clues: Vec<Clue>,
    /// Ids of every spot within the scan radius, clue or not.
    pub spots_in_range: Vec<String>,
}

/// Sweep `radius_used` meters around `location`.
///
/// The sweep is successful when any spot lies within the radius. Clues are
/// produced only for preview-visibility spots beyond their own discovery
/// radius but inside the sweep. Spots authored by the account are invisible
/// to their author.
pub fn scan(
    account_id: &str,
    trail_id: &str,
    location: &GeoLocation,
    candidates: &[Spot],
    radius_used: f64,
    now: DateTime<Utc>,
) -> ScanOutcome {
    let mut spots_in_range = Vec::new();
    let mut clues = Vec::new();

    for spot in candidates.iter().filter(|s| !s.is_authored_by(account_id)) {
        let d = distance(location, &spot.location);
        if d > radius_used {
            continue;
        }
        spots_in_range.push(spot.id.clone());
        if spot.visibility == Visibility::Preview && d > spot.discovery_radius {
            clues.push(Clue::ScanEvent(ClueDetail::from_spot(spot, trail_id)));
        }
    }

    let event = ScanEvent {
        id: ScanEvent::id_for(account_id, trail_id, location, now),
        account_id: account_id.to_string(),
        trail_id: trail_id.to_string(),
        location: *location,
        radius_used,
        successful: !spots_in_range.is_empty(),
        timestamp: now,
    };

    info!(
        "scan: account={} trail={} radius={:.0} m in_range={} clues={}",
        account_id,
        trail_id,
        radius_used,
        spots_in_range.len(),
        clues.len()
    );

    ScanOutcome {
        event,
        clues,
        spots_in_range,
    }
}

/// Scan using the trail's scanner radius, or `default_radius` when unset.
pub fn scan_trail(
    account_id: &str,
    trail: &Trail,
    location: &GeoLocation,
    candidates: &[Spot],
    default_radius: f64,
    now: DateTime<Utc>,
) -> ScanOutcome {
    let radius = trail.options.scanner_range(default_radius);
    scan(account_id, &trail.id, location, candidates, radius, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::ClueSource;
    use crate::config::DEFAULT_SCANNER_RADIUS_M;
    use crate::geo::{GeoBoundary, EARTH_RADIUS_M};
    use crate::model::{SpotImages, TrailOptions};
    use chrono::TimeZone;

    fn pt(lat: f64, lon: f64) -> GeoLocation {
        GeoLocation::new(lat, lon)
    }

    fn north_of_origin(meters: f64) -> GeoLocation {
        pt((meters / EARTH_RADIUS_M).to_degrees(), 0.0)
    }

    fn spot(id: &str, author: &str) -> Spot {
        spot_with(id, author, Visibility::Preview)
    }

    fn spot_with(id: &str, author: &str, visibility: Visibility) -> Spot {
        Spot {
            id: id.into(),
            location: pt(0.0, 0.0),
            discovery_radius: 20.0,
            visibility,
            created_by: author.into(),
            images: SpotImages::default(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn spot_outside_discovery_radius_becomes_clue() {
        let out = scan("acc", "trail", &north_of_origin(25.0), &[spot("S", "author")], 50.0, now());
        assert!(out.event.successful);
        assert_eq!(out.clues.len(), 1);
        assert_eq!(out.clues[0].source(), ClueSource::ScanEvent);
        assert_eq!(out.clues[0].spot_id(), "S");
    }

    #[test]
    fn only_preview_spots_become_clues() {
        let spots = [
            spot_with("hidden", "author", Visibility::Private),
            spot_with("open", "author", Visibility::Public),
        ];
        let out = scan("acc", "trail", &north_of_origin(25.0), &spots, 50.0, now());
        assert!(out.event.successful);
        assert!(out.clues.is_empty());
        assert_eq!(out.spots_in_range, vec!["hidden".to_string(), "open".to_string()]);
    }

    #[test]
    fn spot_inside_discovery_radius_is_in_range_without_clue() {
        let out = scan("acc", "trail", &north_of_origin(15.0), &[spot("S", "author")], 50.0, now());
        assert!(out.event.successful);
        assert!(out.clues.is_empty());
        assert_eq!(out.spots_in_range, vec!["S".to_string()]);
    }

    #[test]
    fn nothing_in_range_is_unsuccessful() {
        let out = scan("acc", "trail", &north_of_origin(75.0), &[spot("S", "author")], 50.0, now());
        assert!(!out.event.successful);
        assert!(out.clues.is_empty());
        assert_eq!(out.event.radius_used, 50.0);
        assert_eq!(out.event.timestamp, now());
    }

    #[test]
    fn author_cannot_scan_own_spot() {
        let out = scan("acc", "trail", &north_of_origin(25.0), &[spot("S", "acc")], 50.0, now());
        assert!(!out.event.successful);
        assert!(out.clues.is_empty());
    }

    #[test]
    fn scan_trail_uses_default_radius() {
        let trail = Trail {
            id: "trail".into(),
            boundary: GeoBoundary::new(pt(1.0, 1.0), pt(-1.0, -1.0)),
            ordered_spot_ids: vec!["S".into()],
            options: TrailOptions::default(),
        };
        let out = scan_trail(
            "acc",
            &trail,
            &north_of_origin(25.0),
            &[spot("S", "author")],
            DEFAULT_SCANNER_RADIUS_M,
            now(),
        );
        assert_eq!(out.event.radius_used, DEFAULT_SCANNER_RADIUS_M);
        assert_eq!(out.event.trail_id, "trail");
        assert_eq!(out.clues.len(), 1);
    }
}
