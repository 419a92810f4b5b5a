//! Directional "snap" toward the nearest unclaimed spot.
//!
//! The snap tells the player how close they are, never where the spot is.
//! Its only geometry is the line between the player's own last two
//! positions.

use log::debug;
use serde::Serialize;

use crate::geo::{distance, GeoLocation};
use crate::model::Spot;

/// Proximity strength toward the nearest candidate spot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DiscoverySnap {
    /// 1 at the spot, falling linearly to 0 at the max range.
    pub intensity: f64,
    /// Meters to the nearest candidate; 0 when nothing is in range.
    pub distance: f64,
}

impl DiscoverySnap {
    pub const NONE: DiscoverySnap = DiscoverySnap {
        intensity: 0.0,
        distance: 0.0,
    };

    pub fn is_active(&self) -> bool {
        self.intensity > 0.0
    }
}

/// Hint line from the previous to the current device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapLine {
    pub from: GeoLocation,
    pub to: GeoLocation,
    /// Equal to the snap intensity.
    pub opacity: f64,
}

/// Linear falloff: 1 at zero distance, 0 at or beyond `max_range`.
pub fn intensity(distance_m: f64, max_range: f64) -> f64 {
    if max_range <= 0.0 || !distance_m.is_finite() {
        return 0.0;
    }
    (1.0 - distance_m / max_range).clamp(0.0, 1.0)
}

/// Snap toward the nearest candidate not authored by the account.
///
/// `candidates` should already be limited to undiscovered spots. Returns
/// [`DiscoverySnap::NONE`] when there is no candidate or the nearest one is
/// out of range.
pub fn discovery_snap(
    location: &GeoLocation,
    candidates: &[Spot],
    account_id: &str,
    max_range: f64,
) -> DiscoverySnap {
    let nearest = candidates
        .iter()
        .filter(|spot| !spot.is_authored_by(account_id))
        .map(|spot| distance(location, &spot.location))
        .min_by(|a, b| a.total_cmp(b));

    let Some(nearest) = nearest else {
        return DiscoverySnap::NONE;
    };
    if nearest >= max_range {
        return DiscoverySnap::NONE;
    }

    let snap = DiscoverySnap {
        intensity: intensity(nearest, max_range),
        distance: nearest,
    };
    debug!(
        "snap: nearest={:.1} m range={:.1} m intensity={:.2}",
        snap.distance, max_range, snap.intensity
    );
    snap
}

/// Hint line for a snap, or None when there is no previous position or the
/// snap is inactive.
pub fn snap_line(
    previous: Option<&GeoLocation>,
    current: &GeoLocation,
    snap: &DiscoverySnap,
) -> Option<SnapLine> {
    let from = previous?;
    snap.is_active().then_some(SnapLine {
        from: *from,
        to: *current,
        opacity: snap.intensity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_M;
    use crate::model::{SpotImages, Visibility};
    use proptest::prelude::*;

    fn pt(lat: f64, lon: f64) -> GeoLocation {
        GeoLocation::new(lat, lon)
    }

    fn north_of_origin(meters: f64) -> GeoLocation {
        pt((meters / EARTH_RADIUS_M).to_degrees(), 0.0)
    }

    fn spot(id: &str, location: GeoLocation, author: &str) -> Spot {
        Spot {
            id: id.into(),
            location,
            discovery_radius: 10.0,
            visibility: Visibility::Public,
            created_by: author.into(),
            images: SpotImages::default(),
        }
    }

    #[test]
    fn intensity_endpoints() {
        assert_eq!(intensity(0.0, 50.0), 1.0);
        assert_eq!(intensity(50.0, 50.0), 0.0);
        assert_eq!(intensity(80.0, 50.0), 0.0);
        assert!((intensity(25.0, 50.0) - 0.5).abs() < 1e-12);
        assert_eq!(intensity(10.0, 0.0), 0.0);
    }

    #[test]
    fn no_candidates_is_none() {
        assert_eq!(discovery_snap(&pt(0.0, 0.0), &[], "acc", 50.0), DiscoverySnap::NONE);
    }

    #[test]
    fn nearest_candidate_wins() {
        let spots = vec![
            spot("far", north_of_origin(40.0), "author"),
            spot("near", north_of_origin(10.0), "author"),
        ];
        let snap = discovery_snap(&pt(0.0, 0.0), &spots, "acc", 50.0);
        assert!((snap.distance - 10.0).abs() < 0.01);
        assert!((snap.intensity - 0.8).abs() < 1e-3);
    }

    #[test]
    fn out_of_range_is_none() {
        let spots = vec![spot("far", north_of_origin(60.0), "author")];
        assert_eq!(discovery_snap(&pt(0.0, 0.0), &spots, "acc", 50.0), DiscoverySnap::NONE);
    }

    #[test]
    fn own_spots_are_ignored() {
        let spots = vec![
            spot("mine", north_of_origin(1.0), "acc"),
            spot("theirs", north_of_origin(30.0), "author"),
        ];
        let snap = discovery_snap(&pt(0.0, 0.0), &spots, "acc", 50.0);
        assert!((snap.distance - 30.0).abs() < 0.01);
    }

    #[test]
    fn snap_line_needs_previous_and_intensity() {
        let snap = DiscoverySnap { intensity: 0.4, distance: 30.0 };
        let prev = pt(0.0, 0.0);
        let cur = pt(0.0001, 0.0);
        let line = snap_line(Some(&prev), &cur, &snap).unwrap();
        assert_eq!(line.from, prev);
        assert_eq!(line.to, cur);
        assert_eq!(line.opacity, 0.4);

        assert!(snap_line(None, &cur, &snap).is_none());
        assert!(snap_line(Some(&prev), &cur, &DiscoverySnap::NONE).is_none());
    }

    proptest! {
        #[test]
        fn intensity_is_bounded_and_monotonic(
            d1 in 0.0..500.0_f64, d2 in 0.0..500.0_f64, range in 1.0..300.0_f64
        ) {
            let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            let a = intensity(near, range);
            let b = intensity(far, range);
            prop_assert!((0.0..=1.0).contains(&a));
            prop_assert!((0.0..=1.0).contains(&b));
            prop_assert!(a >= b);
        }
    }
}
