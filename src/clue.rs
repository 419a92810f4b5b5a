//! Ephemeral hints about undiscovered spots.
//!
//! A [`Clue`] lives only as a return value. It deliberately implements
//! neither `Serialize` nor `Deserialize` so it cannot be written to the
//! discovery or scan stores by accident; the host bridge converts it to
//! its own view type explicitly.

use std::collections::HashSet;

use serde::Serialize;

use crate::geo::{is_in_bounds, GeoBoundary, GeoLocation};
use crate::model::{Discovery, PreviewMode, Spot, Trail, Visibility};

/// Suffix inserted before the extension of a blurred image to name its
/// micro rendition.
const MICRO_SUFFIX: &str = "_micro";

/// Where a clue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueSource {
    Preview,
    ScanEvent,
}

/// The only facts a clue may reveal about a spot.
#[derive(Debug, Clone, PartialEq)]
pub struct ClueDetail {
    pub spot_id: String,
    pub trail_id: String,
    pub location: GeoLocation,
    pub discovery_radius: f64,
    /// Micro rendition of the blurred image, never the original.
    pub degraded_image: Option<String>,
}

impl ClueDetail {
    pub(crate) fn from_spot(spot: &Spot, trail_id: &str) -> Self {
        Self {
            spot_id: spot.id.clone(),
            trail_id: trail_id.to_string(),
            location: spot.location,
            discovery_radius: spot.discovery_radius,
            degraded_image: spot.images.blurred.as_deref().map(micro_image_reference),
        }
    }
}

/// A transient hint, tagged by the channel that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Clue {
    /// Surfaced on the map by a preview-mode trail.
    Preview(ClueDetail),
    /// Sensed by an on-demand scan.
    ScanEvent(ClueDetail),
}

impl Clue {
    pub fn source(&self) -> ClueSource {
        match self {
            Clue::Preview(_) => ClueSource::Preview,
            Clue::ScanEvent(_) => ClueSource::ScanEvent,
        }
    }

    pub fn detail(&self) -> &ClueDetail {
        match self {
            Clue::Preview(detail) | Clue::ScanEvent(detail) => detail,
        }
    }

    pub fn spot_id(&self) -> &str {
        &self.detail().spot_id
    }

    pub fn location(&self) -> &GeoLocation {
        &self.detail().location
    }
}

/// Derive the micro image reference from a blurred image reference.
///
/// `spots/a/blurred.jpg` becomes `spots/a/blurred_micro.jpg`; a reference
/// without an extension gets the suffix appended.
pub fn micro_image_reference(blurred: &str) -> String {
    let file_start = blurred.rfind('/').map_or(0, |i| i + 1);
    match blurred[file_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = file_start + dot;
            format!("{}{}{}", &blurred[..dot], MICRO_SUFFIX, &blurred[dot..])
        }
        _ => format!("{blurred}{MICRO_SUFFIX}"),
    }
}

/// Preview clues for the account's undiscovered spots on a trail.
///
/// Empty unless the trail runs in [`PreviewMode::Preview`]. Only spots with
/// [`Visibility::Preview`] that the account did not author qualify. When a
/// viewport is given, clues outside it are dropped so the full layout is
/// never exposed off-screen.
pub fn preview_clues(
    account_id: &str,
    trail: &Trail,
    discoveries: &[Discovery],
    spots: &[Spot],
    viewport: Option<&GeoBoundary>,
) -> Vec<Clue> {
    if trail.options.preview_mode != PreviewMode::Preview {
        return Vec::new();
    }

    let discovered: HashSet<&str> = discoveries
        .iter()
        .filter(|d| d.trail_id == trail.id && d.account_id == account_id)
        .map(|d| d.spot_id.as_str())
        .collect();

    trail
        .ordered_spot_ids
        .iter()
        .filter(|id| !discovered.contains(id.as_str()))
        .filter_map(|id| spots.iter().find(|s| &s.id == id))
        .filter(|spot| spot.visibility == Visibility::Preview)
        .filter(|spot| !spot.is_authored_by(account_id))
        .filter(|spot| viewport.map_or(true, |vp| is_in_bounds(&spot.location, vp)))
        .map(|spot| Clue::Preview(ClueDetail::from_spot(spot, &trail.id)))
        .collect()
}
