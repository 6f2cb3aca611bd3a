//! Per-tile load entry: state machine and async job body.
//!
//! One `TileEntry` exists per required tile coordinate for the life of the
//! streamer. The load job runs on the worker pipe and writes the entry's
//! phase/surface pair exactly once; the frame thread reads it every frame.
//! Both sides go through the entry's mutex.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::cache::{CacheError, CacheProbe, TileStore};
use crate::coord::TileCoord;
use crate::pipe::TaskPipe;
use crate::provider::TileProvider;
use crate::scene::{Scene, SurfaceDispatcher};
use crate::telemetry::StreamerMetrics;
use crate::texture::TextureDecoder;

/// Discrete lifecycle state of a tile's async load.
///
/// Phases only advance forward; `FullyLoaded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Entry exists but no job has been launched.
    NotStarted,
    /// The load job is in flight.
    Loading,
    /// The tile's surface is constructed and ready to attach.
    FullyLoaded,
    /// The load failed; the tile stays absent from the scene permanently.
    Failed,
}

struct EntryState<H> {
    phase: LoadPhase,
    surface: Option<H>,
}

/// Collaborators shared by every load job of one streamer.
pub(crate) struct LoadContext<H> {
    pub provider: Arc<dyn TileProvider>,
    pub decoder: Arc<dyn TextureDecoder>,
    pub store: TileStore,
    pub dispatcher: SurfaceDispatcher<H>,
    pub metrics: Arc<StreamerMetrics>,
}

/// One tile's load lifecycle, shared between the frame thread and at most
/// one worker job.
pub(crate) struct TileEntry<H> {
    state: Mutex<EntryState<H>>,
    /// Visibility currently applied to the scene; frame thread only.
    shown: std::sync::atomic::AtomicBool,
    /// Background job handle, owned for the entry's lifetime.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<H: Copy + Send + 'static> TileEntry<H> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EntryState {
                phase: LoadPhase::NotStarted,
                surface: None,
            }),
            shown: std::sync::atomic::AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Current load phase.
    pub fn phase(&self) -> LoadPhase {
        self.state.lock().phase
    }

    /// The constructed surface; `Some` iff the phase is `FullyLoaded`.
    pub fn surface(&self) -> Option<H> {
        self.state.lock().surface
    }

    /// Applies the desired visibility to the tile's surface.
    ///
    /// No-op for tiles without a surface, and writes the scene's opacity
    /// parameter only when the desired value differs from the applied one.
    pub fn set_visibility<S>(&self, visible: bool, scene: &mut S)
    where
        S: Scene<Handle = H>,
    {
        let Some(surface) = self.surface() else {
            return;
        };
        let was_shown = self
            .shown
            .swap(visible, std::sync::atomic::Ordering::Relaxed);
        if was_shown == visible {
            return;
        }
        scene.set_opacity(surface, if visible { 1.0 } else { 0.0 });
    }

    fn complete(&self, surface: H) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.phase, LoadPhase::Loading);
        state.surface = Some(surface);
        state.phase = LoadPhase::FullyLoaded;
    }

    fn fail(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.phase, LoadPhase::Loading);
        state.phase = LoadPhase::Failed;
    }

    /// Transitions the entry to `Loading` and launches its job on the pipe.
    pub fn start_loading(self: &Arc<Self>, coord: TileCoord, pipe: &TaskPipe, ctx: &Arc<LoadContext<H>>) {
        {
            let mut state = self.state.lock();
            debug_assert_eq!(state.phase, LoadPhase::NotStarted);
            state.phase = LoadPhase::Loading;
        }
        ctx.metrics.tile_requested();

        let entry = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        let handle = pipe.launch(async move {
            entry.run_load_job(coord, ctx).await;
        });
        *self.task.lock() = Some(handle);
    }

    /// Job body: cache probe, download on miss, decode, scene-thread
    /// surface construction, commit. Every failure is terminal for the
    /// entry and tile-scoped for the subsystem.
    async fn run_load_job(self: Arc<Self>, coord: TileCoord, ctx: Arc<LoadContext<H>>) {
        let path = match self.resolve_cached_file(coord, &ctx).await {
            Some(path) => path,
            None => return,
        };

        let decoder = Arc::clone(&ctx.decoder);
        let decode_path = path.clone();
        let image = match tokio::task::spawn_blocking(move || decoder.decode(&decode_path)).await {
            Ok(Ok(image)) => image,
            Ok(Err(err)) => {
                error!(tile = %coord, path = %path.display(), %err, "tile decode failed");
                ctx.metrics.decode_failed();
                self.fail();
                return;
            }
            Err(err) => {
                error!(tile = %coord, %err, "tile decode task aborted");
                ctx.metrics.decode_failed();
                self.fail();
                return;
            }
        };

        // Drawable construction must run on the scene-owning thread; wait
        // for the frame loop to service the request.
        let surface = match ctx.dispatcher.build_surface(image).await {
            Ok(surface) => surface,
            Err(_) => {
                debug!(tile = %coord, "streamer torn down before surface construction");
                self.fail();
                return;
            }
        };

        self.complete(surface);
        ctx.metrics.tile_loaded();
    }

    /// Returns the path of a usable cached image, downloading on a miss.
    /// `None` means the entry was marked failed.
    async fn resolve_cached_file(
        &self,
        coord: TileCoord,
        ctx: &LoadContext<H>,
    ) -> Option<PathBuf> {
        match ctx.store.probe(coord).await {
            Ok(CacheProbe::Hit(path)) => {
                ctx.metrics.cache_hit();
                Some(path)
            }
            Ok(CacheProbe::Miss(_)) => {
                let bytes = match ctx.provider.fetch(coord).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        error!(tile = %coord, %err, "tile download failed");
                        ctx.metrics.download_failed();
                        self.fail();
                        return None;
                    }
                };
                match ctx.store.store(coord, &bytes).await {
                    Ok(path) => {
                        ctx.metrics.download_completed();
                        Some(path)
                    }
                    Err(err) => {
                        error!(tile = %coord, %err, "failed to write downloaded tile");
                        ctx.metrics.download_failed();
                        self.fail();
                        None
                    }
                }
            }
            Err(CacheError::CorruptEntry { .. }) => {
                // Already logged and deleted by the store.
                ctx.metrics.cache_corrupt();
                self.fail();
                None
            }
            Err(err) => {
                error!(tile = %coord, %err, "cache probe failed");
                self.fail();
                None
            }
        }
    }
}
