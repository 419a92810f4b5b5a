//! JSON-in, JSON-out entry points for the mobile host.
//!
//! Each request carries the full snapshot the computation needs (trail,
//! spots, discovery history), so these functions stay stateless. The JNI
//! layer in [`crate::android_jni`] is a thin shim over them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clue::{preview_clues, Clue, ClueSource};
use crate::config::EngineConfig;
use crate::error::TrailResult;
use crate::geo::{GeoBoundary, GeoLocation};
use crate::model::{AccountContext, Discovery, ScanEvent, Spot, Trail};
use crate::projector::{to_screen, CanvasSize, ScreenPoint};
use crate::proximity::process_location_update;
use crate::scan::scan_trail;
use crate::session::TrailSnapshot;
use crate::snap::{discovery_snap, snap_line, DiscoverySnap, SnapLine};
use crate::stats::{
    discovery_stats, leaderboard, trail_stats, DiscoveryStats, LeaderboardEntry, TrailStats,
};

/// Render-side copy of a [`Clue`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClueView {
    pub spot_id: String,
    pub trail_id: String,
    pub location: GeoLocation,
    pub discovery_radius: f64,
    pub source: ClueSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_image: Option<String>,
}

impl From<&Clue> for ClueView {
    fn from(clue: &Clue) -> Self {
        let detail = clue.detail();
        Self {
            spot_id: detail.spot_id.clone(),
            trail_id: detail.trail_id.clone(),
            location: detail.location,
            discovery_radius: detail.discovery_radius,
            source: clue.source(),
            degraded_image: detail.degraded_image.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub account_id: String,
    pub location: GeoLocation,
    #[serde(default)]
    pub previous_location: Option<GeoLocation>,
    pub trail: Trail,
    pub spots: Vec<Spot>,
    /// The account's discovery history.
    #[serde(default)]
    pub discoveries: Vec<Discovery>,
    #[serde(default)]
    pub viewport: Option<GeoBoundary>,
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LocationUpdateResponse {
    pub discoveries: Vec<Discovery>,
    pub snap: DiscoverySnap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_line: Option<SnapLine>,
    pub clues: Vec<ClueView>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub account_id: String,
    pub location: GeoLocation,
    pub trail: Trail,
    pub spots: Vec<Spot>,
    #[serde(default)]
    pub discoveries: Vec<Discovery>,
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub event: ScanEvent,
    pub clues: Vec<ClueView>,
    pub spots_in_range: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    pub account_id: String,
    pub trail: Trail,
    #[serde(default)]
    pub spots: Vec<Spot>,
    /// Every account's discoveries on the trail.
    #[serde(default)]
    pub discoveries: Vec<Discovery>,
    /// Also compute per-discovery stats for this id.
    #[serde(default)]
    pub discovery_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: TrailStats,
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryStats>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub boundary: GeoBoundary,
    pub size: CanvasSize,
    pub locations: Vec<GeoLocation>,
}

/// Spots the account may still discover.
fn open_candidates(account_id: &str, spots: &[Spot], history: &[Discovery]) -> Vec<Spot> {
    spots
        .iter()
        .filter(|s| !s.is_authored_by(account_id))
        .filter(|s| !history.iter().any(|d| d.spot_id == s.id))
        .cloned()
        .collect()
}

pub fn process_location_update_json(request: &str, config: &EngineConfig) -> TrailResult<String> {
    let req: LocationUpdateRequest = serde_json::from_str(request)?;
    let account = AccountContext::new(req.account_id)?;
    let location = req.location.validate()?;
    let snapshot = TrailSnapshot::new(req.trail, req.spots)?;
    let trail = snapshot.trail();

    let history: Vec<Discovery> = req
        .discoveries
        .into_iter()
        .filter(|d| d.account_id == account.account_id && d.trail_id == trail.id)
        .collect();
    let candidates = open_candidates(&account.account_id, snapshot.spots(), &history);

    let discoveries = process_location_update(
        &account.account_id,
        &location,
        &candidates,
        &history,
        trail,
        req.now,
    );

    let mut updated = history;
    updated.extend(discoveries.iter().cloned());
    let remaining = open_candidates(&account.account_id, snapshot.spots(), &updated);

    let snap = discovery_snap(
        &location,
        &remaining,
        &account.account_id,
        trail.options.snap_range(config.default_scanner_radius_m),
    );
    let clues = preview_clues(
        &account.account_id,
        trail,
        &updated,
        snapshot.spots(),
        req.viewport.as_ref(),
    );

    let response = LocationUpdateResponse {
        discoveries,
        snap,
        snap_line: snap_line(req.previous_location.as_ref(), &location, &snap),
        clues: clues.iter().map(ClueView::from).collect(),
    };
    Ok(serde_json::to_string(&response)?)
}

pub fn scan_json(request: &str, config: &EngineConfig) -> TrailResult<String> {
    let req: ScanRequest = serde_json::from_str(request)?;
    let account = AccountContext::new(req.account_id)?;
    let location = req.location.validate()?;
    let snapshot = TrailSnapshot::new(req.trail, req.spots)?;

    let history: Vec<Discovery> = req
        .discoveries
        .into_iter()
        .filter(|d| d.account_id == account.account_id && d.trail_id == snapshot.trail().id)
        .collect();
    let candidates = open_candidates(&account.account_id, snapshot.spots(), &history);

    let outcome = scan_trail(
        &account.account_id,
        snapshot.trail(),
        &location,
        &candidates,
        config.default_scanner_radius_m,
        req.now,
    );

    let response = ScanResponse {
        clues: outcome.clues.iter().map(ClueView::from).collect(),
        event: outcome.event,
        spots_in_range: outcome.spots_in_range,
    };
    Ok(serde_json::to_string(&response)?)
}

pub fn trail_stats_json(request: &str) -> TrailResult<String> {
    let req: StatsRequest = serde_json::from_str(request)?;
    let account = AccountContext::new(req.account_id)?;

    let on_trail: Vec<Discovery> = req
        .discoveries
        .into_iter()
        .filter(|d| d.trail_id == req.trail.id)
        .collect();

    let discovery = match req.discovery_id.as_deref() {
        Some(id) => on_trail
            .iter()
            .find(|d| d.id == id)
            .map(|d| discovery_stats(d, &on_trail, &req.spots))
            .transpose()?,
        None => None,
    };

    let response = StatsResponse {
        stats: trail_stats(&account.account_id, &req.trail, &on_trail),
        leaderboard: leaderboard(&on_trail),
        discovery,
    };
    Ok(serde_json::to_string(&response)?)
}

pub fn project_json(request: &str) -> TrailResult<String> {
    let req: ProjectRequest = serde_json::from_str(request)?;
    let points: Vec<ScreenPoint> = req
        .locations
        .iter()
        .map(|loc| to_screen(loc, &req.boundary, &req.size))
        .collect();
    Ok(serde_json::to_string(&points)?)
}

/// Error payload handed back across the JNI boundary.
pub fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
