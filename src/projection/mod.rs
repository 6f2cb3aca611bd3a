//! Web Mercator tile projection.
//!
//! Pure functions mapping a geographic extent to the set of tiles covering
//! it at a zoom level, and a tile back to its geographic bounding extent.
//! The streamer recomputes the covering set every frame, so everything here
//! is allocation-free except the final materialization of the covering set.

use std::f64::consts::PI;

use crate::coord::{CoordError, GeoExtent, GeoPoint, TileCoord, MAX_ZOOM};

/// Inclusive tile index range covering an extent at a zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRange {
    col_min: u32,
    col_max: u32,
    row_min: u32,
    row_max: u32,
}

impl TileRange {
    fn count(&self) -> u64 {
        (self.col_max - self.col_min + 1) as u64 * (self.row_max - self.row_min + 1) as u64
    }
}

/// Converts a geographic point to fractional tile coordinates at a zoom.
///
/// Column grows eastward, row grows southward (standard slippy-map grid).
fn point_to_tile_indices(point: &GeoPoint, zoom: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u32 << zoom) - 1;

    let col = ((point.lon + 180.0) / 360.0 * n) as u32;
    let lat_rad = point.lat * PI / 180.0;
    let row = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;

    // The eastern/southern domain edges land exactly on index n; fold them
    // back onto the last tile.
    (col.min(max_index), row.min(max_index))
}

fn tile_range(extent: &GeoExtent, zoom: u8) -> Result<TileRange, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    extent.validate()?;

    // Row grows southward, so the extent's northern edge yields the
    // smallest row index.
    let (col_min, row_min) = point_to_tile_indices(&GeoPoint::new(extent.max.lat, extent.min.lon), zoom);
    let (col_max, row_max) = point_to_tile_indices(&GeoPoint::new(extent.min.lat, extent.max.lon), zoom);

    Ok(TileRange {
        col_min,
        col_max,
        row_min,
        row_max,
    })
}

/// Returns the set of tiles covering `extent` at `zoom`, in row-major order.
///
/// Deterministic for a given input; duplicates are impossible by
/// construction. Fails only on caller-contract violations (extent outside
/// the Web Mercator domain, inverted corners, zoom out of range).
pub fn covering_tiles(extent: &GeoExtent, zoom: u8) -> Result<Vec<TileCoord>, CoordError> {
    let range = tile_range(extent, zoom)?;

    let mut tiles = Vec::with_capacity(range.count() as usize);
    for row in range.row_min..=range.row_max {
        for col in range.col_min..=range.col_max {
            tiles.push(TileCoord::new(col, row, zoom));
        }
    }
    Ok(tiles)
}

/// Returns `covering_tiles(extent, zoom).len()` without materializing the
/// set.
///
/// The zoom-selection loop probes from the maximum zoom downward; at zoom
/// 18 a planet-scale extent covers tens of billions of tiles, so the probe
/// must stay arithmetic.
pub fn covering_tile_count(extent: &GeoExtent, zoom: u8) -> Result<u64, CoordError> {
    Ok(tile_range(extent, zoom)?.count())
}

/// Returns the geographic bounding extent of a tile.
///
/// Inverse of the covering mapping: the extent spans from the tile's
/// north-west grid corner to its south-east neighbor's corner.
pub fn tile_extent(coord: &TileCoord) -> GeoExtent {
    let n = 2.0_f64.powi(coord.zoom as i32);

    let lon_west = coord.col as f64 / n * 360.0 - 180.0;
    let lon_east = (coord.col + 1) as f64 / n * 360.0 - 180.0;

    let lat_north = row_to_lat(coord.row as f64, n);
    let lat_south = row_to_lat((coord.row + 1) as f64, n);

    GeoExtent::new(
        GeoPoint::new(lat_south, lon_west),
        GeoPoint::new(lat_north, lon_east),
    )
}

fn row_to_lat(row: f64, n: f64) -> f64 {
    let y = row / n;
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}
