//! Progress, ranking, and per-discovery statistics.
//!
//! Pure aggregation over discovery snapshots for a single trail.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{TrailError, TrailResult};
use crate::geo::distance;
use crate::model::{Discovery, Spot, Trail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// One account's standing on a trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailStats {
    pub total_spots: usize,
    pub discovered_count: usize,
    pub progress_percentage: u32,
    pub completion_status: CompletionStatus,
    /// 1-indexed; 0 when the account has no discoveries.
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_discovery_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_discovery_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub account_id: String,
    pub spots_discovered: usize,
    pub rank: usize,
}

/// Statistics for a single discovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryStats {
    /// 1-indexed order among all discoveries of the same spot.
    pub rank: usize,
    /// Count of the account's trail discoveries up to and including this one.
    pub trail_position: usize,
    /// Seconds since the account's previous discovery on this trail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_since_last_discovery: Option<i64>,
    /// Meters from the previous discovery's spot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_last_discovery: Option<f64>,
}

/// Rounded percentage, 0 for an empty trail and never above 100.
pub fn progress_percentage(discovered: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (discovered as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u32
}

pub fn completion_status(discovered: usize, total: usize) -> CompletionStatus {
    if discovered == 0 || total == 0 {
        CompletionStatus::NotStarted
    } else if discovered >= total {
        CompletionStatus::Completed
    } else {
        CompletionStatus::InProgress
    }
}

/// Accounts ordered by unique spots discovered, most first.
///
/// Ties are broken by account id so the order is stable.
pub fn leaderboard(trail_discoveries: &[Discovery]) -> Vec<LeaderboardEntry> {
    let mut by_account: HashMap<&str, HashSet<&str>> = HashMap::new();
    for d in trail_discoveries {
        by_account
            .entry(d.account_id.as_str())
            .or_default()
            .insert(d.spot_id.as_str());
    }

    let mut counts: Vec<(&str, usize)> = by_account
        .into_iter()
        .map(|(account, spots)| (account, spots.len()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    counts
        .into_iter()
        .enumerate()
        .map(|(i, (account_id, spots_discovered))| LeaderboardEntry {
            account_id: account_id.to_string(),
            spots_discovered,
            rank: i + 1,
        })
        .collect()
}

/// 1-indexed leaderboard position of the account, 0 if absent.
pub fn rank(account_id: &str, trail_discoveries: &[Discovery]) -> usize {
    leaderboard(trail_discoveries)
        .iter()
        .find(|e| e.account_id == account_id)
        .map_or(0, |e| e.rank)
}

/// Aggregate an account's progress on a trail.
///
/// `trail_discoveries` holds every account's discoveries for the trail;
/// entries for other trails are ignored.
pub fn trail_stats(account_id: &str, trail: &Trail, trail_discoveries: &[Discovery]) -> TrailStats {
    let on_trail: Vec<Discovery> = trail_discoveries
        .iter()
        .filter(|d| d.trail_id == trail.id)
        .cloned()
        .collect();

    let mine: Vec<&Discovery> = on_trail.iter().filter(|d| d.account_id == account_id).collect();
    let discovered_count = mine
        .iter()
        .map(|d| d.spot_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_spots = trail.ordered_spot_ids.len();

    TrailStats {
        total_spots,
        discovered_count,
        progress_percentage: progress_percentage(discovered_count, total_spots),
        completion_status: completion_status(discovered_count, total_spots),
        rank: rank(account_id, &on_trail),
        first_discovery_at: mine.iter().map(|d| d.discovered_at).min(),
        last_discovery_at: mine.iter().map(|d| d.discovered_at).max(),
    }
}

/// Chronological order, id as tie-break.
fn chronological<'a>(discoveries: impl Iterator<Item = &'a Discovery>) -> Vec<&'a Discovery> {
    let mut sorted: Vec<&Discovery> = discoveries.collect();
    sorted.sort_by(|a, b| {
        a.discovered_at
            .cmp(&b.discovered_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

/// Statistics for one discovery relative to the rest of the trail.
///
/// Fails with [`TrailError::UnknownSpot`] when a spot needed for the
/// distance is missing from `spots`.
pub fn discovery_stats(
    discovery: &Discovery,
    trail_discoveries: &[Discovery],
    spots: &[Spot],
) -> TrailResult<DiscoveryStats> {
    let same_spot = chronological(
        trail_discoveries
            .iter()
            .filter(|d| d.trail_id == discovery.trail_id && d.spot_id == discovery.spot_id),
    );
    let rank = same_spot
        .iter()
        .position(|d| d.id == discovery.id)
        .map_or(same_spot.len() + 1, |i| i + 1);

    let mine = chronological(trail_discoveries.iter().filter(|d| {
        d.trail_id == discovery.trail_id && d.account_id == discovery.account_id
    }));
    let index = mine.iter().position(|d| d.id == discovery.id);
    let trail_position = index.map_or(mine.len() + 1, |i| i + 1);

    let previous = match index {
        Some(i) if i > 0 => Some(mine[i - 1]),
        Some(_) => None,
        // Not yet in the snapshot: the latest earlier discovery precedes it.
        None => mine
            .iter()
            .rev()
            .find(|d| d.discovered_at <= discovery.discovered_at)
            .copied(),
    };

    let (time_since_last_discovery, distance_from_last_discovery) = match previous {
        Some(prev) => {
            let elapsed = (discovery.discovered_at - prev.discovered_at).num_seconds();
            let here = find_spot(spots, &discovery.spot_id)?;
            let there = find_spot(spots, &prev.spot_id)?;
            (Some(elapsed), Some(distance(&there.location, &here.location)))
        }
        None => (None, None),
    };

    Ok(DiscoveryStats {
        rank,
        trail_position,
        time_since_last_discovery,
        distance_from_last_discovery,
    })
}

fn find_spot<'a>(spots: &'a [Spot], id: &str) -> TrailResult<&'a Spot> {
    spots
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| TrailError::UnknownSpot(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoBoundary, GeoLocation, EARTH_RADIUS_M};
    use crate::model::{SpotImages, TrailOptions, Visibility};
    use chrono::{Duration, TimeZone};

    fn pt(lat: f64, lon: f64) -> GeoLocation {
        GeoLocation::new(lat, lon)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn found(account: &str, spot: &str, minutes: i64) -> Discovery {
        Discovery::new(account, spot, "trail", t0() + Duration::minutes(minutes))
    }

    fn four_spot_trail() -> Trail {
        Trail {
            id: "trail".into(),
            boundary: GeoBoundary::new(pt(1.0, 1.0), pt(-1.0, -1.0)),
            ordered_spot_ids: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            options: TrailOptions::default(),
        }
    }

    fn spots() -> Vec<Spot> {
        ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, id)| Spot {
                id: id.to_string(),
                location: pt((i as f64 * 100.0 / EARTH_RADIUS_M).to_degrees(), 0.0),
                discovery_radius: 20.0,
                visibility: Visibility::Public,
                created_by: "author".into(),
                images: SpotImages::default(),
            })
            .collect()
    }

    #[test]
    fn half_way_is_in_progress() {
        let history = vec![found("acc", "A", 0), found("acc", "B", 5)];
        let stats = trail_stats("acc", &four_spot_trail(), &history);
        assert_eq!(stats.progress_percentage, 50);
        assert_eq!(stats.completion_status, CompletionStatus::InProgress);
        assert_eq!(stats.discovered_count, 2);
        assert_eq!(stats.rank, 1);
        assert_eq!(stats.first_discovery_at, Some(t0()));
        assert_eq!(stats.last_discovery_at, Some(t0() + Duration::minutes(5)));
    }

    #[test]
    fn completion_states() {
        assert_eq!(completion_status(0, 4), CompletionStatus::NotStarted);
        assert_eq!(completion_status(3, 4), CompletionStatus::InProgress);
        assert_eq!(completion_status(4, 4), CompletionStatus::Completed);
        assert_eq!(completion_status(0, 0), CompletionStatus::NotStarted);
    }

    #[test]
    fn progress_rounds_and_handles_empty() {
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(5, 4), 100);
    }

    #[test]
    fn rank_by_unique_spots() {
        let history = vec![
            found("alice", "A", 0),
            found("alice", "B", 1),
            found("alice", "C", 2),
            found("bob", "A", 3),
            found("carol", "A", 4),
            found("carol", "B", 5),
        ];
        assert_eq!(rank("alice", &history), 1);
        assert_eq!(rank("carol", &history), 2);
        assert_eq!(rank("bob", &history), 3);
        assert_eq!(rank("dave", &history), 0);
    }

    #[test]
    fn leaderboard_ties_break_by_account() {
        let history = vec![found("zed", "A", 0), found("amy", "B", 1)];
        let board = leaderboard(&history);
        assert_eq!(board[0].account_id, "amy");
        assert_eq!(board[1].account_id, "zed");
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn discovery_stats_relative_to_previous() {
        let history = vec![
            found("bob", "B", 0),
            found("acc", "A", 1),
            found("acc", "B", 11),
        ];
        let stats = discovery_stats(&history[2], &history, &spots()).unwrap();
        assert_eq!(stats.rank, 2);
        assert_eq!(stats.trail_position, 2);
        assert_eq!(stats.time_since_last_discovery, Some(600));
        let d = stats.distance_from_last_discovery.unwrap();
        assert!((d - 100.0).abs() < 0.01, "got {d}");
    }

    #[test]
    fn first_discovery_has_no_previous() {
        let history = vec![found("acc", "A", 0)];
        let stats = discovery_stats(&history[0], &history, &spots()).unwrap();
        assert_eq!(stats.rank, 1);
        assert_eq!(stats.trail_position, 1);
        assert_eq!(stats.time_since_last_discovery, None);
        assert_eq!(stats.distance_from_last_discovery, None);
    }

    #[test]
    fn missing_spot_is_error() {
        let history = vec![found("acc", "A", 0), found("acc", "X", 1)];
        let err = discovery_stats(&history[1], &history, &spots()).unwrap_err();
        assert!(matches!(err, TrailError::UnknownSpot(id) if id == "X"));
    }
}
