//! Map layer state.
//!
//! Two layers: `Canvas` follows the device, `Overview` shows the whole
//! trail for free pan/zoom. The only transition is an explicit toggle.

use log::info;
use serde::Serialize;

use crate::geo::{GeoBoundary, GeoLocation};
use crate::projector::viewport_around;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapLayer {
    /// Device-centred, follows GPS.
    Canvas,
    /// Whole trail, free pan/zoom.
    Overview,
}

/// Client-side viewport state for one trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    layer: MapLayer,
    follow_device: bool,
    viewport: GeoBoundary,
    device: Option<GeoLocation>,
    trail_boundary: GeoBoundary,
    radius_m: f64,
}

impl MapView {
    /// Start on the canvas layer, following the device.
    ///
    /// Until a device location arrives the viewport is the trail boundary.
    pub fn new(trail_boundary: GeoBoundary, radius_m: f64) -> Self {
        Self {
            layer: MapLayer::Canvas,
            follow_device: true,
            viewport: trail_boundary,
            device: None,
            trail_boundary,
            radius_m,
        }
    }

    pub fn layer(&self) -> MapLayer {
        self.layer
    }

    pub fn follow_device(&self) -> bool {
        self.follow_device
    }

    pub fn viewport(&self) -> &GeoBoundary {
        &self.viewport
    }

    pub fn device(&self) -> Option<&GeoLocation> {
        self.device.as_ref()
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Switch layers and return the new one.
    ///
    /// Entering `Overview` stops following and frames the trail; returning
    /// to `Canvas` re-centres on the live device location.
    pub fn toggle(&mut self) -> MapLayer {
        match self.layer {
            MapLayer::Canvas => {
                self.layer = MapLayer::Overview;
                self.follow_device = false;
                self.viewport = self.trail_boundary;
            }
            MapLayer::Overview => {
                self.layer = MapLayer::Canvas;
                self.follow_device = true;
                self.recenter();
            }
        }
        info!("map: layer -> {:?}", self.layer);
        self.layer
    }

    /// Record a device fix. Returns true when the viewport moved.
    pub fn update_device(&mut self, location: GeoLocation) -> bool {
        self.device = Some(location);
        if self.layer == MapLayer::Canvas && self.follow_device {
            let before = self.viewport;
            self.recenter();
            return before != self.viewport;
        }
        false
    }

    /// Free pan/zoom; only honoured on the overview layer.
    pub fn set_viewport(&mut self, viewport: GeoBoundary) -> bool {
        if self.layer != MapLayer::Overview {
            return false;
        }
        self.viewport = viewport;
        true
    }

    fn recenter(&mut self) {
        if let Some(device) = self.device {
            self.viewport = viewport_around(&device, self.radius_m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> GeoLocation {
        GeoLocation::new(lat, lon)
    }

    fn trail_box() -> GeoBoundary {
        GeoBoundary::new(pt(0.01, 0.01), pt(0.0, 0.0))
    }

    #[test]
    fn starts_on_canvas_following() {
        let view = MapView::new(trail_box(), 300.0);
        assert_eq!(view.layer(), MapLayer::Canvas);
        assert!(view.follow_device());
        assert_eq!(view.viewport(), &trail_box());
    }

    #[test]
    fn canvas_follows_device() {
        let mut view = MapView::new(trail_box(), 300.0);
        assert!(view.update_device(pt(0.005, 0.005)));
        assert_eq!(view.viewport(), &viewport_around(&pt(0.005, 0.005), 300.0));
    }

    #[test]
    fn overview_stops_following() {
        let mut view = MapView::new(trail_box(), 300.0);
        view.update_device(pt(0.005, 0.005));
        assert_eq!(view.toggle(), MapLayer::Overview);
        assert!(!view.follow_device());
        assert_eq!(view.viewport(), &trail_box());

        assert!(!view.update_device(pt(0.006, 0.006)));
        assert_eq!(view.viewport(), &trail_box());
    }

    #[test]
    fn returning_to_canvas_recenters_on_live_device() {
        let mut view = MapView::new(trail_box(), 300.0);
        view.update_device(pt(0.005, 0.005));
        view.toggle();
        view.update_device(pt(0.007, 0.002));
        assert_eq!(view.toggle(), MapLayer::Canvas);
        assert!(view.follow_device());
        assert_eq!(view.viewport(), &viewport_around(&pt(0.007, 0.002), 300.0));
    }

    #[test]
    fn pan_only_in_overview() {
        let mut view = MapView::new(trail_box(), 300.0);
        let elsewhere = GeoBoundary::new(pt(1.0, 1.0), pt(0.9, 0.9));
        assert!(!view.set_viewport(elsewhere));
        view.toggle();
        assert!(view.set_viewport(elsewhere));
        assert_eq!(view.viewport(), &elsewhere);
    }
}
