//! Basemap streaming orchestration.
//!
//! [`BasemapStreamer`] is driven once per frame with the visible geographic
//! extent. It selects a zoom level that keeps the covering tile count
//! bounded, launches async load jobs for missing tiles, and folds completed
//! tiles into the host scene under a per-frame attachment budget. The
//! update path never blocks: all I/O and decoding happens on the worker
//! pipe, and scene mutation is limited to pumping pending surface
//! constructions, at most one attachment per budget slice, and opacity
//! toggles.

mod entry;

pub use entry::LoadPhase;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::TileStore;
use crate::config::StreamerConfig;
use crate::coord::{GeoExtent, TileCoord};
use crate::pipe::{PipeError, TaskPipe};
use crate::projection;
use crate::provider::{ProviderError, ReqwestClient, TileProvider, XyzTileProvider};
use crate::scene::{GeoTransform, Placement, Scene, SharedScene, SurfaceDispatcher, SurfaceQueue};
use crate::telemetry::{MetricsSnapshot, StreamerMetrics};
use crate::texture::{ImageFileDecoder, TextureDecoder};

use entry::{LoadContext, TileEntry};

/// Errors that can occur while constructing a streamer.
#[derive(Debug, Error)]
pub enum StreamerError {
    /// The worker pipe could not be created.
    #[error(transparent)]
    Pipe(#[from] PipeError),

    /// The default HTTP client could not be created.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Streams basemap tiles underneath a host 3D scene.
///
/// Construction takes the host's geographic reference transform and a weak
/// handle to the scene owner; [`update`](Self::update) is called once per
/// frame from the thread that owns the scene. Dropping the streamer drains
/// all outstanding load jobs before releasing its state.
pub struct BasemapStreamer<S: Scene, G: GeoTransform> {
    config: StreamerConfig,
    geo_transform: G,
    scene: Weak<Mutex<S>>,
    tiles: HashMap<TileCoord, Arc<TileEntry<S::Handle>>>,
    attached: HashSet<S::Handle>,
    attach_accum: f32,
    pipe: TaskPipe,
    surface_queue: SurfaceQueue<S::Handle>,
    ctx: Arc<LoadContext<S::Handle>>,
}

impl<S: Scene, G: GeoTransform> BasemapStreamer<S, G> {
    /// Creates a streamer with the default collaborators: reqwest tile
    /// downloads from `config.tile_url` and `image`-crate decoding.
    pub fn new(
        config: StreamerConfig,
        geo_transform: G,
        scene: &SharedScene<S>,
    ) -> Result<Self, StreamerError> {
        let client = ReqwestClient::new()?;
        let provider = Arc::new(XyzTileProvider::new(client, config.tile_url.clone()));
        Self::with_collaborators(config, geo_transform, scene, provider, Arc::new(ImageFileDecoder::new()))
    }

    /// Creates a streamer with injected download and decode collaborators.
    pub fn with_collaborators(
        config: StreamerConfig,
        geo_transform: G,
        scene: &SharedScene<S>,
        provider: Arc<dyn TileProvider>,
        decoder: Arc<dyn TextureDecoder>,
    ) -> Result<Self, StreamerError> {
        let config = config.normalized();
        let pipe = TaskPipe::new("basemap-tile", config.worker_threads)?;
        let (dispatcher, surface_queue) = SurfaceDispatcher::channel();
        let store = TileStore::new(config.cache_dir.clone(), config.file_extension.clone());

        Ok(Self {
            geo_transform,
            scene: Arc::downgrade(scene),
            tiles: HashMap::new(),
            attached: HashSet::new(),
            attach_accum: 0.0,
            pipe,
            surface_queue,
            ctx: Arc::new(LoadContext {
                provider,
                decoder,
                store,
                dispatcher,
                metrics: Arc::new(StreamerMetrics::new()),
            }),
            config,
        })
    }

    /// Per-frame drive: computes the tile set required for `extent`,
    /// starts loads for missing tiles, and performs a frame-budgeted
    /// amount of scene mutation. Never blocks.
    pub fn update(&mut self, extent: &GeoExtent, delta_seconds: f32) {
        let required = self.required_tiles(extent);

        let scene_arc = self.scene.upgrade();
        let mut scene_guard = scene_arc.as_ref().map(|scene| scene.lock());

        if let Some(scene) = scene_guard.as_deref_mut() {
            self.surface_queue.pump(scene);

            // Hide every loaded tile first; the required pass below
            // re-shows the ones still visible. Tiles that fell out of the
            // extent stay attached but invisible.
            for tile in self.tiles.values() {
                tile.set_visibility(false, scene);
            }

            self.run_attachment_pass(scene, delta_seconds);
        }

        for &coord in &required {
            match self.tiles.get(&coord) {
                Some(tile) => {
                    if tile.phase() == LoadPhase::FullyLoaded {
                        if let Some(scene) = scene_guard.as_deref_mut() {
                            tile.set_visibility(true, scene);
                        }
                    }
                }
                None => {
                    let tile = Arc::new(TileEntry::new());
                    tile.start_loading(coord, &self.pipe, &self.ctx);
                    self.tiles.insert(coord, tile);
                }
            }
        }
    }

    /// Load phase of a tile, if the coordinate has ever been required.
    pub fn phase_of(&self, coord: &TileCoord) -> Option<LoadPhase> {
        self.tiles.get(coord).map(|tile| tile.phase())
    }

    /// Number of tile entries ever created.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Number of tile surfaces attached to the scene.
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// True while any load job is still in flight.
    pub fn has_outstanding_work(&self) -> bool {
        self.pipe.has_work()
    }

    /// Point-in-time copy of the streamer's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    fn required_tiles(&self, extent: &GeoExtent) -> Vec<TileCoord> {
        let extent = extent.clamped_to_mercator();
        if let Err(err) = extent.validate() {
            warn!(%err, "invalid viewport extent, no tiles required this frame");
            return Vec::new();
        }

        let zoom = select_zoom(
            &extent,
            self.config.min_zoom,
            self.config.max_zoom,
            self.config.tile_density_limit,
        );
        // Extent was validated and zoom is within bounds.
        projection::covering_tiles(&extent, zoom).unwrap_or_default()
    }

    /// Attaches completed tiles under the frame budget: one attachment per
    /// crossing of the accumulated-time threshold. An unavailable scene
    /// aborts the pass without consuming the accumulator, so the pending
    /// attachment retries on a later call.
    fn run_attachment_pass(&mut self, scene: &mut S, delta_seconds: f32) {
        self.attach_accum += delta_seconds;

        while self.attach_accum >= self.config.attach_interval {
            let Some((coord, surface)) = self.next_unattached() else {
                break;
            };

            let placement = self.placement_for(coord);
            match scene.attach(surface, placement) {
                Ok(()) => {
                    self.attached.insert(surface);
                    self.attach_accum = 0.0;
                    self.ctx.metrics.tile_attached();
                }
                Err(err) => {
                    debug!(tile = %coord, %err, "deferring tile attachment");
                    break;
                }
            }
        }
    }

    fn next_unattached(&self) -> Option<(TileCoord, S::Handle)> {
        self.tiles.iter().find_map(|(coord, tile)| {
            tile.surface()
                .filter(|surface| !self.attached.contains(surface))
                .map(|surface| (*coord, surface))
        })
    }

    /// Local-space placement of a tile: its projected geographic bounds,
    /// flattened to a slab beneath foreground content.
    fn placement_for(&self, coord: TileCoord) -> Placement {
        let extent = projection::tile_extent(&coord);
        let min = self.geo_transform.project(extent.min);
        let max = self.geo_transform.project(extent.max);
        Placement::ground_slab(min, max)
    }
}

impl<S: Scene, G: GeoTransform> Drop for BasemapStreamer<S, G> {
    fn drop(&mut self) {
        // Refuse further surface constructions so workers blocked on the
        // scene-thread handoff settle instead of waiting for an update()
        // that will never come.
        self.surface_queue.close();
        if self.pipe.has_work() {
            self.pipe.wait_until_empty();
        }
    }
}

/// Selects the finest zoom level in `[min_zoom, max_zoom]` whose covering
/// tile count stays within `density_limit`, falling back to `min_zoom`.
fn select_zoom(extent: &GeoExtent, min_zoom: u8, max_zoom: u8, density_limit: u64) -> u8 {
    let mut zoom = max_zoom;
    while zoom > min_zoom {
        match projection::covering_tile_count(extent, zoom) {
            Ok(count) if count <= density_limit => return zoom,
            _ => zoom -= 1,
        }
    }
    min_zoom
}
