//! Host scene integration contract.
//!
//! The streamer never renders anything itself; it hands decoded tile
//! surfaces to the host's scene graph through the [`Scene`] trait and
//! places them using the host's geographic-to-local projection
//! ([`GeoTransform`]). Drawable construction must happen on the thread
//! that owns the scene, so workers route it through the
//! [`SurfaceDispatcher`](dispatch::SurfaceDispatcher) instead of calling
//! the trait directly.

mod dispatch;

pub use dispatch::{DispatchClosed, SurfaceDispatcher, SurfaceQueue};

use std::hash::Hash;
use std::sync::Arc;

use thiserror::Error;

use crate::coord::GeoPoint;
use crate::texture::TileImage;

/// Shared ownership of the host scene, lockable from the frame thread.
///
/// The host keeps the strong reference; the streamer only holds a weak one
/// and treats a failed upgrade as the scene being unavailable.
pub type SharedScene<S> = Arc<parking_lot::Mutex<S>>;

/// Half thickness of the slab a tile surface is flattened to.
const SLAB_HALF_THICKNESS: f64 = 0.01;

/// Vertical drop of the slab center below the local origin, keeping the
/// basemap just beneath foreground geometry at ground level.
const GROUND_DROP: f64 = 1.0;

/// The scene reported it cannot currently accept mutations.
///
/// This is a transient host-side condition, not a tile failure: the
/// attachment pass aborts for the frame and retries on a later call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scene context unavailable")]
pub struct SceneUnavailable;

/// Translucency sort order for attached surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPriority {
    /// Beneath all foreground content.
    Basemap,
    /// Regular scene content.
    Foreground,
}

/// A position in the host scene's local coordinate space, z up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LocalPoint {
    /// Creates a new local-space point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Transform and ordering for one attached tile surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Center of the surface in local space.
    pub center: LocalPoint,
    /// Half extents of the surface's bounding box.
    pub half_extent: LocalPoint,
    /// Translucency sort order.
    pub sort_priority: SortPriority,
}

impl Placement {
    /// Builds the placement for a basemap tile spanning the local-space
    /// box with corners `a` and `b`: centered between them, flattened to a
    /// thin slab dropped just below ground level, sorted beneath
    /// foreground content.
    pub fn ground_slab(a: LocalPoint, b: LocalPoint) -> Self {
        let center = LocalPoint::new(
            (a.x + b.x) / 2.0,
            (a.y + b.y) / 2.0,
            (a.z + b.z) / 2.0 - GROUND_DROP,
        );
        let half_extent = LocalPoint::new(
            ((b.x - a.x) / 2.0).abs(),
            ((b.y - a.y) / 2.0).abs(),
            SLAB_HALF_THICKNESS,
        );
        Self {
            center,
            half_extent,
            sort_priority: SortPriority::Basemap,
        }
    }
}

/// Pure function mapping geographic coordinates into the host scene's
/// local space. Owned by the host and read-only from this subsystem.
pub trait GeoTransform: Send + Sync + 'static {
    /// Projects a geographic point to local coordinates.
    fn project(&self, point: GeoPoint) -> LocalPoint;
}

/// Equirectangular projection around a fixed origin.
///
/// Suitable for the small extents a viewport basemap covers; hosts with a
/// real georeference implement [`GeoTransform`] themselves.
#[derive(Debug, Clone, Copy)]
pub struct FlatGeoTransform {
    origin: GeoPoint,
    units_per_degree: f64,
}

impl FlatGeoTransform {
    /// Creates a transform centered on `origin` scaling degrees to local
    /// units.
    pub fn new(origin: GeoPoint, units_per_degree: f64) -> Self {
        Self {
            origin,
            units_per_degree,
        }
    }
}

impl GeoTransform for FlatGeoTransform {
    fn project(&self, point: GeoPoint) -> LocalPoint {
        LocalPoint::new(
            (point.lon - self.origin.lon) * self.units_per_degree,
            (point.lat - self.origin.lat) * self.units_per_degree,
            0.0,
        )
    }
}

/// The host scene graph, called only from the thread driving
/// [`update`](crate::streamer::BasemapStreamer::update).
///
/// Surfaces are created once per tile (on the scene thread, via the
/// dispatcher), attached at most once, and thereafter only toggled through
/// their opacity parameter.
pub trait Scene: 'static {
    /// Opaque identifier of a constructed tile surface.
    type Handle: Copy + Eq + Hash + Send + 'static;

    /// Constructs a drawable surface from a decoded tile image.
    fn create_surface(&mut self, image: TileImage) -> Self::Handle;

    /// Inserts a previously created surface into the scene at `placement`.
    ///
    /// May report the scene temporarily unavailable; the caller retries on
    /// a later frame without touching the tile's own state.
    fn attach(&mut self, surface: Self::Handle, placement: Placement)
        -> Result<(), SceneUnavailable>;

    /// Sets the opacity parameter of a surface (0.0 hidden, 1.0 visible).
    fn set_opacity(&mut self, surface: Self::Handle, opacity: f32);
}
