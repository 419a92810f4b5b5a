//! trail-core: proximity discovery engine for location-based trail games.
//!
//! Accounts walk a trail of hidden spots; walking into a spot's radius
//! turns it into a permanent discovery. Everything here is synchronous and
//! works on caller-supplied snapshots: the host persists what comes back.

pub mod android_jni;
pub mod bridge;
pub mod clue;
pub mod config;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod map_view;
pub mod model;
pub mod projector;
pub mod proximity;
pub mod scan;
pub mod session;
pub mod snap;
pub mod stats;

pub use error::{TrailError, TrailResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
