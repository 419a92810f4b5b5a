//! Geographic to pixel projection.
//!
//! Maps lat/lon linearly onto a fixed-size render surface spanning a
//! boundary. Pixel rows grow downward while latitude grows northward, so
//! the Y axis is inverted. Degenerate inputs (zero-span boundaries, empty
//! surfaces) resolve to documented fallbacks instead of NaN or infinity.

use serde::{Deserialize, Serialize};

use crate::geo::{boundary_around, dimensions, GeoBoundary, GeoLocation};

/// Smallest radius [`adaptive_radius`] returns, in meters.
pub const MIN_ADAPTIVE_RADIUS_M: f64 = 200.0;

/// Spans below this many degrees count as zero.
const MIN_SPAN_DEG: f64 = 1e-12;

/// Pixel size of a render surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// A position on a render surface, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Placement of a nested layer inside an outer surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale bounds for pan/zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl ZoomLimits {
    /// Used when the boundary, surfaces, or detail target are degenerate.
    pub const FALLBACK: ZoomLimits = ZoomLimits { min: 0.5, max: 4.0 };
}

/// Project a location onto a surface covering `boundary`.
///
/// An axis with zero span maps to the middle of the surface.
pub fn to_screen(location: &GeoLocation, boundary: &GeoBoundary, size: &CanvasSize) -> ScreenPoint {
    let lon_span = boundary.lon_span();
    let lat_span = boundary.lat_span();

    let x = if lon_span.abs() < MIN_SPAN_DEG {
        size.width / 2.0
    } else {
        size.width * (location.lon - boundary.west()) / lon_span
    };
    let y = if lat_span.abs() < MIN_SPAN_DEG {
        size.height / 2.0
    } else {
        size.height * (boundary.north() - location.lat) / lat_span
    };

    ScreenPoint { x, y }
}

/// Inverse of [`to_screen`].
///
/// An axis with zero pixels maps to the boundary centre.
pub fn to_geo(point: &ScreenPoint, boundary: &GeoBoundary, size: &CanvasSize) -> GeoLocation {
    let center = boundary.center();

    let lon = if size.width.abs() < f64::EPSILON {
        center.lon
    } else {
        boundary.west() + point.x / size.width * boundary.lon_span()
    };
    let lat = if size.height.abs() < f64::EPSILON {
        center.lat
    } else {
        boundary.north() - point.y / size.height * boundary.lat_span()
    };

    GeoLocation::new(lat, lon)
}

/// Device-centred viewport.
pub fn viewport_around(center: &GeoLocation, radius_m: f64) -> GeoBoundary {
    boundary_around(center, radius_m)
}

/// Viewport radius that frames a trail.
///
/// Half the trail's longest side times `padding_factor`, at least
/// [`MIN_ADAPTIVE_RADIUS_M`], at most `max_radius`. A zero-span trail gets
/// `max_radius`.
pub fn adaptive_radius(trail_boundary: &GeoBoundary, max_radius: f64, padding_factor: f64) -> f64 {
    let longest = dimensions(trail_boundary, trail_boundary.center().lat)
        .meters
        .longest();
    if longest.is_nan() || longest <= 0.0 {
        return max_radius;
    }
    (longest / 2.0 * padding_factor)
        .max(MIN_ADAPTIVE_RADIUS_M)
        .min(max_radius)
}

/// Zoom bounds for a canvas rendering `boundary`, shown on `screen`.
///
/// `min` fits the whole canvas on screen. `max` stops zooming once only
/// `max_detail_m` of the trail's longer side would be visible, and is
/// never below `min`.
pub fn zoom_limits(
    boundary: &GeoBoundary,
    canvas: &CanvasSize,
    screen: &CanvasSize,
    max_detail_m: f64,
) -> ZoomLimits {
    let meters = dimensions(boundary, boundary.center().lat).meters;
    // A line-shaped trail still has a usable longer side; only a point does not.
    let longest = meters.longest();
    let extent_ok = longest.is_finite() && longest > 0.0;
    let detail_ok = max_detail_m.is_finite() && max_detail_m > 0.0;
    if !extent_ok || canvas.is_empty() || screen.is_empty() || !detail_ok {
        return ZoomLimits::FALLBACK;
    }

    let min = (screen.width / canvas.width).min(screen.height / canvas.height);

    let (screen_len, canvas_len) = if meters.width >= meters.height {
        (screen.width, canvas.width)
    } else {
        (screen.height, canvas.height)
    };
    let max = (screen_len * longest / (canvas_len * max_detail_m)).max(min);

    if min.is_finite() && max.is_finite() {
        ZoomLimits { min, max }
    } else {
        ZoomLimits::FALLBACK
    }
}

/// Pixel rectangle of `inner` (e.g. a trail map image) inside a surface
/// covering `outer`.
pub fn layout_sub_layer(
    inner: &GeoBoundary,
    outer: &GeoBoundary,
    outer_size: &CanvasSize,
) -> LayerRect {
    let corners = [
        GeoLocation::new(inner.north(), inner.west()),
        GeoLocation::new(inner.north(), inner.east()),
        GeoLocation::new(inner.south(), inner.west()),
        GeoLocation::new(inner.south(), inner.east()),
    ]
    .map(|corner| to_screen(&corner, outer, outer_size));

    let left = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let right = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let top = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let bottom = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    LayerRect {
        left,
        top,
        width: right - left,
        height: bottom - top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pt(lat: f64, lon: f64) -> GeoLocation {
        GeoLocation::new(lat, lon)
    }

    fn unit_box() -> GeoBoundary {
        GeoBoundary::new(pt(1.0, 1.0), pt(0.0, 0.0))
    }

    #[test]
    fn to_screen_center_and_corner() {
        let size = CanvasSize::new(1000.0, 1000.0);
        let center = to_screen(&pt(0.5, 0.5), &unit_box(), &size);
        assert!((center.x - 500.0).abs() < 1e-9);
        assert!((center.y - 500.0).abs() < 1e-9);

        let nw = to_screen(&pt(1.0, 0.0), &unit_box(), &size);
        assert!(nw.x.abs() < 1e-9);
        assert!(nw.y.abs() < 1e-9);

        let se = to_screen(&pt(0.0, 1.0), &unit_box(), &size);
        assert!((se.x - 1000.0).abs() < 1e-9);
        assert!((se.y - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_boundary_maps_to_center() {
        let point_box = GeoBoundary::new(pt(1.0, 1.0), pt(1.0, 1.0));
        let p = to_screen(&pt(1.0, 1.0), &point_box, &CanvasSize::new(200.0, 100.0));
        assert_eq!(p, ScreenPoint { x: 100.0, y: 50.0 });
    }

    #[test]
    fn empty_surface_maps_to_boundary_center() {
        let g = to_geo(&ScreenPoint { x: 5.0, y: 5.0 }, &unit_box(), &CanvasSize::new(0.0, 0.0));
        assert_eq!(g, pt(0.5, 0.5));
    }

    #[test]
    fn adaptive_radius_bounds() {
        // ~111 m square: half side padded is below the floor
        let small = GeoBoundary::new(pt(0.001, 0.001), pt(0.0, 0.0));
        assert_eq!(adaptive_radius(&small, 2_000.0, 1.2), MIN_ADAPTIVE_RADIUS_M);

        // ~1.11 km square: 555 m * 1.2
        let medium = GeoBoundary::new(pt(0.01, 0.01), pt(0.0, 0.0));
        assert!((adaptive_radius(&medium, 2_000.0, 1.2) - 666.0).abs() < 0.5);

        // ~111 km square is clamped
        assert_eq!(adaptive_radius(&unit_box(), 2_000.0, 1.2), 2_000.0);

        let point = GeoBoundary::new(pt(0.0, 0.0), pt(0.0, 0.0));
        assert_eq!(adaptive_radius(&point, 1_500.0, 1.2), 1_500.0);
    }

    #[test]
    fn zoom_limits_fit_and_detail() {
        // ~2.22 km wide, ~1.11 km tall, drawn on a 1000 px canvas
        let b = GeoBoundary::new(pt(0.01, 0.02), pt(0.0, 0.0));
        let limits = zoom_limits(
            &b,
            &CanvasSize::new(1000.0, 1000.0),
            &CanvasSize::new(500.0, 800.0),
            100.0,
        );
        assert!((limits.min - 0.5).abs() < 1e-9);
        // 500 * 2220 / (1000 * 100)
        assert!((limits.max - 11.1).abs() < 0.01, "got {}", limits.max);
    }

    #[test]
    fn zoom_limits_max_never_below_min() {
        let b = GeoBoundary::new(pt(0.0001, 0.0001), pt(0.0, 0.0));
        let limits = zoom_limits(
            &b,
            &CanvasSize::new(100.0, 100.0),
            &CanvasSize::new(400.0, 400.0),
            1_000.0,
        );
        assert_eq!(limits.min, 4.0);
        assert_eq!(limits.max, 4.0);
    }

    #[test]
    fn zoom_limits_for_line_shaped_trail() {
        // Two spots on one meridian, no padding.
        let line = GeoBoundary::new(pt(0.01, 0.0), pt(0.0, 0.0));
        let limits = zoom_limits(
            &line,
            &CanvasSize::new(1000.0, 1000.0),
            &CanvasSize::new(500.0, 500.0),
            100.0,
        );
        assert!((limits.min - 0.5).abs() < 1e-9);
        // 500 * 1110 / (1000 * 100)
        assert!((limits.max - 5.55).abs() < 0.01, "got {}", limits.max);
    }

    #[test]
    fn zoom_limits_degenerate_fallback() {
        let point = GeoBoundary::new(pt(0.0, 0.0), pt(0.0, 0.0));
        let size = CanvasSize::new(100.0, 100.0);
        assert_eq!(zoom_limits(&point, &size, &size, 100.0), ZoomLimits::FALLBACK);
        assert_eq!(
            zoom_limits(&unit_box(), &CanvasSize::new(0.0, 100.0), &size, 100.0),
            ZoomLimits::FALLBACK
        );
        assert_eq!(zoom_limits(&unit_box(), &size, &size, 0.0), ZoomLimits::FALLBACK);
    }

    #[test]
    fn sub_layer_inside_outer() {
        let inner = GeoBoundary::new(pt(0.75, 0.5), pt(0.25, 0.25));
        let rect = layout_sub_layer(&inner, &unit_box(), &CanvasSize::new(1000.0, 1000.0));
        assert!((rect.left - 250.0).abs() < 1e-9);
        assert!((rect.top - 250.0).abs() < 1e-9);
        assert!((rect.width - 250.0).abs() < 1e-9);
        assert!((rect.height - 500.0).abs() < 1e-9);
    }

    #[test]
    fn viewport_delegates_to_boundary_around() {
        let c = pt(48.0, 16.0);
        assert_eq!(viewport_around(&c, 300.0), boundary_around(&c, 300.0));
    }

    proptest! {
        #[test]
        fn screen_geo_roundtrip(
            lat_frac in 0.0..1.0_f64, lon_frac in 0.0..1.0_f64,
            south in -60.0..60.0_f64, west in -170.0..170.0_f64,
            lat_span in 0.001..5.0_f64, lon_span in 0.001..5.0_f64,
            w in 10.0..4000.0_f64, h in 10.0..4000.0_f64
        ) {
            let b = GeoBoundary::new(pt(south + lat_span, west + lon_span), pt(south, west));
            let loc = pt(south + lat_frac * lat_span, west + lon_frac * lon_span);
            let size = CanvasSize::new(w, h);
            let back = to_geo(&to_screen(&loc, &b, &size), &b, &size);
            prop_assert!((back.lat - loc.lat).abs() < 1e-9);
            prop_assert!((back.lon - loc.lon).abs() < 1e-9);
        }
    }
}
