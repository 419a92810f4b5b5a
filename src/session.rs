//! Orchestration state for one account walking one trail.
//!
//! [`TrailSession`] is the explicit state object the host owns. Each
//! location update runs the proximity engine against the store's history,
//! persists new discoveries idempotently, recomputes clues, snap, and the
//! map viewport, then notifies subscribers over channels. Updates take
//! `&mut self`, so a session processes one update at a time.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::clue::{preview_clues, Clue};
use crate::config::EngineConfig;
use crate::error::{TrailError, TrailResult};
use crate::geo::{distance_to_boundary_edge, EdgeDistance, GeoBoundary, GeoLocation};
use crate::map_view::{MapLayer, MapView};
use crate::model::{AccountContext, Discovery, ScanEvent, Spot, Trail};
use crate::projector::adaptive_radius;
use crate::proximity::process_location_update;
use crate::scan::{scan_trail, ScanOutcome};
use crate::snap::{discovery_snap, snap_line, DiscoverySnap, SnapLine};
use crate::stats::{trail_stats, TrailStats};

/// Outcome of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record with the same id exists; treated as success.
    AlreadyExists,
}

/// Persistence collaborator for discoveries.
pub trait DiscoveryStore {
    /// Create a discovery. A duplicate id must be a successful no-op.
    fn create(&mut self, discovery: Discovery) -> TrailResult<CreateOutcome>;

    /// One account's discoveries on a trail.
    fn list(&self, account_id: &str, trail_id: &str) -> TrailResult<Vec<Discovery>>;

    /// Every account's discoveries on a trail.
    fn list_trail(&self, trail_id: &str) -> TrailResult<Vec<Discovery>>;
}

/// Append-only sink for scan history.
pub trait ScanEventSink {
    fn record(&mut self, event: ScanEvent) -> TrailResult<()>;
}

impl ScanEventSink for Vec<ScanEvent> {
    fn record(&mut self, event: ScanEvent) -> TrailResult<()> {
        self.push(event);
        Ok(())
    }
}

/// Source of trails and spots.
pub trait TrailRepository {
    fn trail(&self, trail_id: &str) -> Option<Trail>;
    fn spot(&self, spot_id: &str) -> Option<Spot>;
}

/// Discovery store kept in memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDiscoveryStore {
    records: Vec<Discovery>,
    ids: HashSet<String>,
}

impl InMemoryDiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DiscoveryStore for InMemoryDiscoveryStore {
    fn create(&mut self, discovery: Discovery) -> TrailResult<CreateOutcome> {
        if !self.ids.insert(discovery.id.clone()) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        self.records.push(discovery);
        Ok(CreateOutcome::Created)
    }

    fn list(&self, account_id: &str, trail_id: &str) -> TrailResult<Vec<Discovery>> {
        Ok(self
            .records
            .iter()
            .filter(|d| d.account_id == account_id && d.trail_id == trail_id)
            .cloned()
            .collect())
    }

    fn list_trail(&self, trail_id: &str) -> TrailResult<Vec<Discovery>> {
        Ok(self
            .records
            .iter()
            .filter(|d| d.trail_id == trail_id)
            .cloned()
            .collect())
    }
}

/// Trails and spots kept in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    trails: HashMap<String, Trail>,
    spots: HashMap<String, Spot>,
}

impl InMemoryRepository {
    pub fn new(trails: Vec<Trail>, spots: Vec<Spot>) -> Self {
        Self {
            trails: trails.into_iter().map(|t| (t.id.clone(), t)).collect(),
            spots: spots.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }
}

impl TrailRepository for InMemoryRepository {
    fn trail(&self, trail_id: &str) -> Option<Trail> {
        self.trails.get(trail_id).cloned()
    }

    fn spot(&self, spot_id: &str) -> Option<Spot> {
        self.spots.get(spot_id).cloned()
    }
}

/// A trail with every spot it references resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailSnapshot {
    trail: Trail,
    spots: Vec<Spot>,
}

impl TrailSnapshot {
    /// Build a snapshot, failing if any ordered spot id is missing.
    ///
    /// Spots are kept in trail order; spots not on the trail are dropped.
    pub fn new(trail: Trail, spots: Vec<Spot>) -> TrailResult<Self> {
        let mut by_id: HashMap<String, Spot> =
            spots.into_iter().map(|s| (s.id.clone(), s)).collect();
        let spots = trail
            .ordered_spot_ids
            .iter()
            .map(|id| by_id.remove(id).ok_or_else(|| TrailError::UnknownSpot(id.clone())))
            .collect::<TrailResult<Vec<_>>>()?;
        Ok(Self { trail, spots })
    }

    /// Resolve a trail and its spots from a repository.
    pub fn load(repo: &impl TrailRepository, trail_id: &str) -> TrailResult<Self> {
        let trail = repo
            .trail(trail_id)
            .ok_or_else(|| TrailError::UnknownTrail(trail_id.to_string()))?;
        let spots = trail
            .ordered_spot_ids
            .iter()
            .map(|id| repo.spot(id).ok_or_else(|| TrailError::UnknownSpot(id.clone())))
            .collect::<TrailResult<Vec<_>>>()?;
        Ok(Self { trail, spots })
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }
}

/// Where the device is relative to the trail boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrailPosition {
    Unknown,
    Inside,
    /// Outside, with the nearest boundary point.
    Outside(EdgeDistance),
}

/// Composite view for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryTrail {
    pub trail: Trail,
    /// Discovered spots, in trail order.
    pub discovered_spots: Vec<Spot>,
    pub preview_clues: Vec<Clue>,
    pub discoveries: Vec<Discovery>,
}

/// Assemble the presentation view of a trail for an account.
pub fn discovery_trail(
    account_id: &str,
    trail: &Trail,
    spots: &[Spot],
    discoveries: &[Discovery],
    viewport: Option<&GeoBoundary>,
) -> DiscoveryTrail {
    let mine: Vec<Discovery> = discoveries
        .iter()
        .filter(|d| d.account_id == account_id && d.trail_id == trail.id)
        .cloned()
        .collect();
    let found: HashSet<&str> = mine.iter().map(|d| d.spot_id.as_str()).collect();

    let discovered_spots = trail
        .ordered_spot_ids
        .iter()
        .filter(|id| found.contains(id.as_str()))
        .filter_map(|id| spots.iter().find(|s| &s.id == id).cloned())
        .collect();

    DiscoveryTrail {
        trail: trail.clone(),
        discovered_spots,
        preview_clues: preview_clues(account_id, trail, &mine, spots, viewport),
        discoveries: mine,
    }
}

/// Notifications broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LocationChanged(GeoLocation),
    DiscoveriesCreated(Vec<Discovery>),
    ScanCompleted(ScanEvent),
    MapStateChanged(MapView),
}

/// Everything a location update produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    /// Discoveries newly written to the store.
    pub discoveries: Vec<Discovery>,
    pub snap: DiscoverySnap,
    pub snap_line: Option<SnapLine>,
    pub clues: Vec<Clue>,
    pub position: TrailPosition,
}

/// One account on one trail.
pub struct TrailSession<S: DiscoveryStore> {
    account: AccountContext,
    snapshot: TrailSnapshot,
    config: EngineConfig,
    store: S,
    last_location: Option<GeoLocation>,
    snap: DiscoverySnap,
    clues: Vec<Clue>,
    position: TrailPosition,
    map: MapView,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl<S: DiscoveryStore> TrailSession<S> {
    pub fn new(
        account: AccountContext,
        snapshot: TrailSnapshot,
        config: EngineConfig,
        store: S,
    ) -> Self {
        let radius = adaptive_radius(
            &snapshot.trail().boundary,
            config.max_viewport_radius_m,
            config.viewport_padding_factor,
        );
        let map = MapView::new(snapshot.trail().boundary, radius);
        Self {
            account,
            snapshot,
            config,
            store,
            last_location: None,
            snap: DiscoverySnap::NONE,
            clues: Vec::new(),
            position: TrailPosition::Unknown,
            map,
            subscribers: Vec::new(),
        }
    }

    /// Receive every subsequent [`SessionEvent`].
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn account_id(&self) -> &str {
        &self.account.account_id
    }

    pub fn trail(&self) -> &Trail {
        self.snapshot.trail()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn snap(&self) -> DiscoverySnap {
        self.snap
    }

    pub fn clues(&self) -> &[Clue] {
        &self.clues
    }

    pub fn position(&self) -> TrailPosition {
        self.position
    }

    /// Process a device fix.
    pub fn update_location(
        &mut self,
        location: GeoLocation,
        now: DateTime<Utc>,
    ) -> TrailResult<LocationUpdate> {
        let location = location.validate()?;
        let account_id = self.account.account_id.clone();
        let trail = self.snapshot.trail().clone();

        let mut history = self.store.list(&account_id, &trail.id)?;
        let candidates = self.candidates();
        let found =
            process_location_update(&account_id, &location, &candidates, &history, &trail, now);

        let mut created = Vec::with_capacity(found.len());
        let mut failure = None;
        for discovery in found {
            match self.store.create(discovery.clone()) {
                Ok(CreateOutcome::Created) => {
                    info!(
                        "discovery: account={} spot={} trail={}",
                        account_id, discovery.spot_id, trail.id
                    );
                    created.push(discovery.clone());
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    debug!("discovery {} already stored", discovery.id);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
            history.push(discovery);
        }

        // Records already written are announced even when a later write fails.
        if let Some(err) = failure {
            warn!(
                "discovery store failed after {} new records: {}",
                created.len(),
                err
            );
            if !created.is_empty() {
                self.notify(SessionEvent::DiscoveriesCreated(created));
            }
            return Err(err);
        }

        let discovered: HashSet<&str> = history.iter().map(|d| d.spot_id.as_str()).collect();
        let undiscovered: Vec<Spot> = candidates
            .iter()
            .filter(|s| !discovered.contains(s.id.as_str()))
            .cloned()
            .collect();

        let range = trail.options.snap_range(self.config.default_scanner_radius_m);
        self.snap = discovery_snap(&location, &undiscovered, &account_id, range);
        let line = snap_line(self.last_location.as_ref(), &location, &self.snap);

        self.map.update_device(location);
        self.clues = preview_clues(
            &account_id,
            &trail,
            &history,
            self.snapshot.spots(),
            Some(self.map.viewport()),
        );

        let edge = distance_to_boundary_edge(&location, &trail.boundary);
        self.position = if edge.distance > 0.0 {
            warn!(
                "account {} is {:.0} m outside trail {}",
                account_id, edge.distance, trail.id
            );
            TrailPosition::Outside(edge)
        } else {
            TrailPosition::Inside
        };
        self.last_location = Some(location);

        self.notify(SessionEvent::LocationChanged(location));
        if !created.is_empty() {
            self.notify(SessionEvent::DiscoveriesCreated(created.clone()));
        }
        self.notify(SessionEvent::MapStateChanged(self.map.clone()));

        Ok(LocationUpdate {
            discoveries: created,
            snap: self.snap,
            snap_line: line,
            clues: self.clues.clone(),
            position: self.position,
        })
    }

    /// Run an on-demand scan and record the event. Grants no discoveries.
    pub fn scan(
        &mut self,
        location: GeoLocation,
        now: DateTime<Utc>,
        sink: &mut impl ScanEventSink,
    ) -> TrailResult<ScanOutcome> {
        let location = location.validate()?;
        let history = self.store.list(&self.account.account_id, &self.snapshot.trail().id)?;
        let discovered: HashSet<&str> = history.iter().map(|d| d.spot_id.as_str()).collect();
        let undiscovered: Vec<Spot> = self
            .candidates()
            .into_iter()
            .filter(|s| !discovered.contains(s.id.as_str()))
            .collect();

        let outcome = scan_trail(
            &self.account.account_id,
            self.snapshot.trail(),
            &location,
            &undiscovered,
            self.config.default_scanner_radius_m,
            now,
        );
        sink.record(outcome.event.clone())?;
        self.notify(SessionEvent::ScanCompleted(outcome.event.clone()));
        Ok(outcome)
    }

    /// Switch between canvas and overview.
    pub fn toggle_layer(&mut self) -> MapLayer {
        let layer = self.map.toggle();
        self.notify(SessionEvent::MapStateChanged(self.map.clone()));
        layer
    }

    pub fn stats(&self) -> TrailResult<TrailStats> {
        let all = self.store.list_trail(&self.snapshot.trail().id)?;
        Ok(trail_stats(&self.account.account_id, self.snapshot.trail(), &all))
    }

    pub fn discovery_trail(&self) -> TrailResult<DiscoveryTrail> {
        let trail = self.snapshot.trail();
        let history = self.store.list(&self.account.account_id, &trail.id)?;
        Ok(discovery_trail(
            &self.account.account_id,
            trail,
            self.snapshot.spots(),
            &history,
            Some(self.map.viewport()),
        ))
    }

    /// Trail spots the account may discover.
    fn candidates(&self) -> Vec<Spot> {
        self.snapshot
            .spots()
            .iter()
            .filter(|s| !s.is_authored_by(&self.account.account_id))
            .cloned()
            .collect()
    }

    fn notify(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
