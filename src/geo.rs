//! Geographic math.
//!
//! Distances use the haversine formula on a spherical earth. Boundary
//! construction uses a flat 111 km-per-degree approximation scaled by the
//! latitude cosine, which is accurate enough at trail scale (< 10 km).
//! All coordinates are WGS84 lat/lon in degrees.

use serde::{Deserialize, Serialize};

use crate::error::{TrailError, TrailResult};

/// Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude used by the flat approximation.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Latitude clamp applied before taking cos(lat), keeps longitude spans
/// finite near the poles.
pub const MAX_PROJECTION_LAT: f64 = 89.9;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that the coordinate is finite and within WGS84 ranges.
    pub fn validate(self) -> TrailResult<Self> {
        let valid = self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon);
        if valid {
            Ok(self)
        } else {
            Err(TrailError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

/// Axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundary {
    pub north_east: GeoLocation,
    pub south_west: GeoLocation,
}

impl GeoBoundary {
    pub const fn new(north_east: GeoLocation, south_west: GeoLocation) -> Self {
        Self {
            north_east,
            south_west,
        }
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn east(&self) -> f64 {
        self.north_east.lon
    }

    pub fn west(&self) -> f64 {
        self.south_west.lon
    }

    pub fn lat_span(&self) -> f64 {
        self.north() - self.south()
    }

    pub fn lon_span(&self) -> f64 {
        self.east() - self.west()
    }

    pub fn center(&self) -> GeoLocation {
        GeoLocation::new(
            (self.north() + self.south()) / 2.0,
            (self.east() + self.west()) / 2.0,
        )
    }
}

/// Span of a boundary in degrees and in approximate meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub degrees: DegreeSpan,
    pub meters: MeterSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DegreeSpan {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterSpan {
    /// East-west extent.
    pub width: f64,
    /// North-south extent.
    pub height: f64,
}

impl MeterSpan {
    pub fn longest(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Closest point on a boundary and the distance to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeDistance {
    pub closest_point: GeoLocation,
    /// Meters; 0 when the point lies inside the boundary.
    pub distance: f64,
}

/// Haversine distance between two points in meters.
pub fn distance(a: &GeoLocation, b: &GeoLocation) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Meters per degree of longitude at the given latitude.
fn meters_per_degree_lon(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_PROJECTION_LAT, MAX_PROJECTION_LAT);
    METERS_PER_DEGREE * lat.to_radians().cos()
}

/// Square boundary extending `radius_m` in each direction from `center`.
pub fn boundary_around(center: &GeoLocation, radius_m: f64) -> GeoBoundary {
    let radius_m = radius_m.max(0.0);
    let dlat = radius_m / METERS_PER_DEGREE;
    let dlon = radius_m / meters_per_degree_lon(center.lat);

    GeoBoundary {
        north_east: GeoLocation::new(center.lat + dlat, center.lon + dlon),
        south_west: GeoLocation::new(center.lat - dlat, center.lon - dlon),
    }
}

/// Size of a boundary, with meters measured at `reference_lat`.
pub fn dimensions(boundary: &GeoBoundary, reference_lat: f64) -> Dimensions {
    let lat = boundary.lat_span().abs();
    let lon = boundary.lon_span().abs();

    Dimensions {
        degrees: DegreeSpan { lat, lon },
        meters: MeterSpan {
            width: lon * meters_per_degree_lon(reference_lat),
            height: lat * METERS_PER_DEGREE,
        },
    }
}

/// Whether a point lies inside a boundary, edges included.
pub fn is_in_bounds(point: &GeoLocation, boundary: &GeoBoundary) -> bool {
    (boundary.south()..=boundary.north()).contains(&point.lat)
        && (boundary.west()..=boundary.east()).contains(&point.lon)
}

/// Distance from a point to the nearest point of a boundary.
///
/// Points inside the boundary are their own closest point, at distance 0.
pub fn distance_to_boundary_edge(point: &GeoLocation, boundary: &GeoBoundary) -> EdgeDistance {
    if is_in_bounds(point, boundary) {
        return EdgeDistance {
            closest_point: *point,
            distance: 0.0,
        };
    }

    let closest_point = GeoLocation::new(
        point.lat.clamp(boundary.south(), boundary.north()),
        point.lon.clamp(boundary.west(), boundary.east()),
    );

    EdgeDistance {
        closest_point,
        distance: distance(point, &closest_point),
    }
}

/// Smallest boundary containing all points, grown by `padding_m` on each side.
///
/// Returns None for an empty point list.
pub fn bounding_box(points: &[GeoLocation], padding_m: f64) -> Option<GeoBoundary> {
    let first = points.first()?;

    let (mut north, mut south) = (first.lat, first.lat);
    let (mut east, mut west) = (first.lon, first.lon);
    for p in &points[1..] {
        north = north.max(p.lat);
        south = south.min(p.lat);
        east = east.max(p.lon);
        west = west.min(p.lon);
    }

    let padding_m = padding_m.max(0.0);
    let dlat = padding_m / METERS_PER_DEGREE;
    let dlon = padding_m / meters_per_degree_lon((north + south) / 2.0);

    Some(GeoBoundary {
        north_east: GeoLocation::new(north + dlat, east + dlon),
        south_west: GeoLocation::new(south - dlat, west - dlon),
    })
}
