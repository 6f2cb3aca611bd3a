//! Tile and geographic coordinate types.
//!
//! Provides the `TileCoord` value type used to address basemap tiles in the
//! Web Mercator grid, plus the geographic point/extent types the streamer
//! consumes each frame.

use std::hash::{Hash, Hasher};

use thiserror::Error;

/// Northern/southern limit of the Web Mercator projection in degrees.
pub const MAX_LAT: f64 = 85.05112878;
/// Southern limit of the Web Mercator projection in degrees.
pub const MIN_LAT: f64 = -85.05112878;
/// Western longitude limit in degrees.
pub const MIN_LON: f64 = -180.0;
/// Eastern longitude limit in degrees.
pub const MAX_LON: f64 = 180.0;
/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 18;
/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 1;

/// Errors produced when coordinate inputs violate the caller contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator domain.
    #[error("latitude {0} outside Web Mercator range [{MIN_LAT}, {MAX_LAT}]")]
    InvalidLatitude(f64),

    /// Longitude outside the valid range.
    #[error("longitude {0} outside range [{MIN_LON}, {MAX_LON}]")]
    InvalidLongitude(f64),

    /// Zoom level outside the supported range.
    #[error("zoom level {0} outside range [{MIN_ZOOM}, {MAX_ZOOM}]")]
    InvalidZoom(u8),

    /// Extent whose minimum corner is not south-west of its maximum corner.
    #[error("extent min corner ({min_lat}, {min_lon}) is not south-west of max corner ({max_lat}, {max_lon})")]
    InvertedExtent {
        min_lat: f64,
        min_lon: f64,
        max_lat: f64,
        max_lon: f64,
    },
}

/// Addresses one basemap tile in the Web Mercator grid.
///
/// Tiles are identified by column (west to east), row (north to south) and
/// zoom level. `TileCoord` is the key of the streamer's tile map, so its
/// hash must stay stable and collision-light for typical tile ranges: the
/// manual `Hash` implementation combines the three fields with zoom as the
/// most significant component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    /// Tile column (X coordinate in the Web Mercator grid).
    pub col: u32,
    /// Tile row (Y coordinate in the Web Mercator grid).
    pub row: u32,
    /// Zoom level.
    pub zoom: u8,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(col: u32, row: u32, zoom: u8) -> Self {
        Self { col, row, zoom }
    }

    /// Composite key combining all three fields, zoom weighted most
    /// significant so that tiles from different zoom levels do not collide
    /// for typical tile ranges.
    pub fn composite_key(&self) -> u64 {
        self.zoom as u64 * 100_000_000 + self.row as u64 * 10_000 + self.col as u64
    }
}

impl Hash for TileCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.composite_key());
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// A geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A geographic bounding box with `min` at the south-west corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoExtent {
    /// South-west corner.
    pub min: GeoPoint,
    /// North-east corner.
    pub max: GeoPoint,
}

impl GeoExtent {
    /// Create a new extent from its south-west and north-east corners.
    pub fn new(min: GeoPoint, max: GeoPoint) -> Self {
        Self { min, max }
    }

    /// Returns a copy clamped into the Web Mercator domain.
    ///
    /// Viewport extents routinely poke past the projection's polar limits
    /// when the camera pitches up; clamping keeps the per-frame path free
    /// of validation errors.
    pub fn clamped_to_mercator(&self) -> Self {
        Self {
            min: GeoPoint::new(
                self.min.lat.clamp(MIN_LAT, MAX_LAT),
                self.min.lon.clamp(MIN_LON, MAX_LON),
            ),
            max: GeoPoint::new(
                self.max.lat.clamp(MIN_LAT, MAX_LAT),
                self.max.lon.clamp(MIN_LON, MAX_LON),
            ),
        }
    }

    /// Validates the caller contract: corners in range, min south-west of max.
    pub fn validate(&self) -> Result<(), CoordError> {
        for point in [&self.min, &self.max] {
            if !(MIN_LAT..=MAX_LAT).contains(&point.lat) {
                return Err(CoordError::InvalidLatitude(point.lat));
            }
            if !(MIN_LON..=MAX_LON).contains(&point.lon) {
                return Err(CoordError::InvalidLongitude(point.lon));
            }
        }
        if self.min.lat > self.max.lat || self.min.lon > self.max.lon {
            return Err(CoordError::InvertedExtent {
                min_lat: self.min.lat,
                min_lon: self.min.lon,
                max_lat: self.max.lat,
                max_lon: self.max.lon,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(coord: &TileCoord) -> u64 {
        let mut hasher = DefaultHasher::new();
        coord.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_is_structural() {
        let a = TileCoord::new(100, 200, 10);
        let b = TileCoord::new(100, 200, 10);
        assert_eq!(a, b);

        assert_ne!(a, TileCoord::new(101, 200, 10));
        assert_ne!(a, TileCoord::new(100, 201, 10));
        assert_ne!(a, TileCoord::new(100, 200, 11));
    }

    #[test]
    fn test_equal_coords_hash_equal() {
        let a = TileCoord::new(19295, 24640, 16);
        let b = TileCoord::new(19295, 24640, 16);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_composite_key_weights_zoom_most_significant() {
        let coord = TileCoord::new(42, 7, 3);
        assert_eq!(coord.composite_key(), 3 * 100_000_000 + 7 * 10_000 + 42);
    }

    #[test]
    fn test_composite_key_distinct_across_zoom_levels() {
        // Same row/col at adjacent zooms must not collide
        let a = TileCoord::new(500, 500, 10);
        let b = TileCoord::new(500, 500, 11);
        assert_ne!(a.composite_key(), b.composite_key());
    }

    #[test]
    fn test_composite_key_no_overflow_at_max_zoom() {
        // Largest representable coordinate at zoom 18
        let max = (1u32 << 18) - 1;
        let coord = TileCoord::new(max, max, MAX_ZOOM);
        assert_eq!(
            coord.composite_key(),
            18 * 100_000_000 + max as u64 * 10_000 + max as u64
        );
    }

    #[test]
    fn test_display_format() {
        let coord = TileCoord::new(19295, 24640, 16);
        assert_eq!(coord.to_string(), "16/19295/24640");
    }

    #[test]
    fn test_extent_validate_accepts_ordered_corners() {
        let extent = GeoExtent::new(GeoPoint::new(35.0, 139.0), GeoPoint::new(36.0, 140.0));
        assert!(extent.validate().is_ok());
    }

    #[test]
    fn test_extent_validate_rejects_inverted_corners() {
        let extent = GeoExtent::new(GeoPoint::new(36.0, 139.0), GeoPoint::new(35.0, 140.0));
        assert!(matches!(
            extent.validate(),
            Err(CoordError::InvertedExtent { .. })
        ));
    }

    #[test]
    fn test_extent_validate_rejects_polar_latitude() {
        let extent = GeoExtent::new(GeoPoint::new(-89.0, 0.0), GeoPoint::new(10.0, 10.0));
        assert!(matches!(
            extent.validate(),
            Err(CoordError::InvalidLatitude(_))
        ));
    }

    #[test]
    fn test_clamped_to_mercator_pins_polar_extent() {
        let extent = GeoExtent::new(GeoPoint::new(-90.0, -200.0), GeoPoint::new(90.0, 200.0));
        let clamped = extent.clamped_to_mercator();
        assert_eq!(clamped.min.lat, MIN_LAT);
        assert_eq!(clamped.max.lat, MAX_LAT);
        assert_eq!(clamped.min.lon, MIN_LON);
        assert_eq!(clamped.max.lon, MAX_LON);
        assert!(clamped.validate().is_ok());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_hash_follows_equality(
                col in 0u32..262_144,
                row in 0u32..262_144,
                zoom in 0u8..=18
            ) {
                let a = TileCoord::new(col, row, zoom);
                let b = TileCoord::new(col, row, zoom);
                prop_assert_eq!(a, b);
                prop_assert_eq!(hash_of(&a), hash_of(&b));
            }

            #[test]
            fn test_clamped_extent_always_validates(
                lat1 in -90.0..90.0_f64,
                lon1 in -180.0..180.0_f64,
                lat2 in -90.0..90.0_f64,
                lon2 in -180.0..180.0_f64
            ) {
                let extent = GeoExtent::new(
                    GeoPoint::new(lat1.min(lat2), lon1.min(lon2)),
                    GeoPoint::new(lat1.max(lat2), lon1.max(lon2)),
                );
                prop_assert!(extent.clamped_to_mercator().validate().is_ok());
            }
        }
    }
}
