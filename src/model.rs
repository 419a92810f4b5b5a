//! Trail, spot, and discovery records.
//!
//! These are the values exchanged with the repository and store
//! collaborators. Discoveries and scan events are append-only: once
//! built they are never mutated, only persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{TrailError, TrailResult};
use crate::geo::{GeoBoundary, GeoLocation};

/// Bytes of the SHA-256 digest kept in derived ids (128 bits).
const ID_BYTES: usize = 16;

/// Separator between hashed id components (ASCII unit separator).
const ID_SEPARATOR: u8 = 0x1f;

/// Who may see a spot before it is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    /// Undiscovered spot surfaces as a degraded clue on the map.
    Preview,
    Private,
}

impl Visibility {
    /// Parse a visibility keyword, case-insensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "preview" => Some(Self::Preview),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Order in which a trail's spots can be discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Any spot, any order, several per update.
    #[default]
    Free,
    /// Only the next spot in trail order.
    Sequence,
}

/// Whether undiscovered spots are hinted on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    Preview,
    #[default]
    None,
}

/// Per-trail game settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailOptions {
    pub discovery_mode: DiscoveryMode,
    pub preview_mode: PreviewMode,
    /// Radius of an on-demand scan, in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner_radius: Option<f64>,
    /// Range of the directional snap hint, in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_radius: Option<f64>,
}

impl TrailOptions {
    /// Scanner radius, or `fallback` when the trail leaves it unset.
    pub fn scanner_range(&self, fallback: f64) -> f64 {
        self.scanner_radius.unwrap_or(fallback)
    }

    /// Snap range: snap radius, then scanner radius, then `fallback`.
    pub fn snap_range(&self, fallback: f64) -> f64 {
        self.snap_radius
            .or(self.scanner_radius)
            .unwrap_or(fallback)
    }
}

/// Image references held by the blob store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotImages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Pre-blurred rendition, the only source for clue imagery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blurred: Option<String>,
}

/// A hidden point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: String,
    pub location: GeoLocation,
    /// Meters.
    pub discovery_radius: f64,
    #[serde(default)]
    pub visibility: Visibility,
    /// Account id of the author.
    pub created_by: String,
    #[serde(default)]
    pub images: SpotImages,
}

impl Spot {
    pub fn is_authored_by(&self, account_id: &str) -> bool {
        self.created_by == account_id
    }
}

/// An ordered set of spots inside a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    pub id: String,
    pub boundary: GeoBoundary,
    pub ordered_spot_ids: Vec<String>,
    #[serde(default)]
    pub options: TrailOptions,
}

impl Trail {
    /// Position of a spot in trail order.
    pub fn spot_index(&self, spot_id: &str) -> Option<usize> {
        self.ordered_spot_ids.iter().position(|id| id == spot_id)
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub account_id: String,
}

impl AccountContext {
    /// Fails with [`TrailError::MissingAccount`] for a blank id.
    pub fn new(account_id: impl Into<String>) -> TrailResult<Self> {
        let account_id = account_id.into();
        if account_id.trim().is_empty() {
            return Err(TrailError::MissingAccount);
        }
        Ok(Self { account_id })
    }
}

/// Permanent record that an account found a spot on a trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub id: String,
    pub account_id: String,
    pub spot_id: String,
    pub trail_id: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_event_id: Option<String>,
}

impl Discovery {
    pub fn new(
        account_id: &str,
        spot_id: &str,
        trail_id: &str,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::id_for(account_id, spot_id, trail_id),
            account_id: account_id.to_string(),
            spot_id: spot_id.to_string(),
            trail_id: trail_id.to_string(),
            discovered_at,
            scan_event_id: None,
        }
    }

    /// Deterministic id for an (account, spot, trail) triple.
    ///
    /// Two computations over the same triple always agree, which is what
    /// makes a repeated create a no-op in the store.
    pub fn id_for(account_id: &str, spot_id: &str, trail_id: &str) -> String {
        hashed_id(&[
            account_id.as_bytes(),
            spot_id.as_bytes(),
            trail_id.as_bytes(),
        ])
    }
}

/// Persisted record of an on-demand proximity sweep.
///
/// Clues found by the sweep are returned next to the event and are not
/// part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: String,
    pub account_id: String,
    pub trail_id: String,
    pub location: GeoLocation,
    pub radius_used: f64,
    pub successful: bool,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    pub fn id_for(
        account_id: &str,
        trail_id: &str,
        location: &GeoLocation,
        timestamp: DateTime<Utc>,
    ) -> String {
        let nanos = timestamp
            .timestamp_nanos_opt()
            .unwrap_or_else(|| timestamp.timestamp_millis().saturating_mul(1_000_000));
        hashed_id(&[
            account_id.as_bytes(),
            trail_id.as_bytes(),
            &nanos.to_be_bytes(),
            &location.lat.to_bits().to_be_bytes(),
            &location.lon.to_bits().to_be_bytes(),
        ])
    }
}

fn hashed_id(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([ID_SEPARATOR]);
        }
        hasher.update(part);
    }
    hex::encode(&hasher.finalize()[..ID_BYTES])
}
