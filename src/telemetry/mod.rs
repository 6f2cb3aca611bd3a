//! Streamer telemetry for observability.
//!
//! Lock-free atomic counters over the tile load pipeline plus a
//! point-in-time snapshot for display. Counters are recorded from worker
//! threads and the frame thread; reading never blocks either.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters recorded across the tile load pipeline.
#[derive(Debug, Default)]
pub struct StreamerMetrics {
    tiles_requested: AtomicU64,
    cache_hits: AtomicU64,
    cache_corrupt: AtomicU64,
    downloads_completed: AtomicU64,
    download_failures: AtomicU64,
    decode_failures: AtomicU64,
    tiles_loaded: AtomicU64,
    tiles_attached: AtomicU64,
}

impl StreamerMetrics {
    /// Creates a zeroed metrics block.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tile entry was created and its load job launched.
    pub fn tile_requested(&self) {
        self.tiles_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// A usable cached file satisfied a load without downloading.
    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A zero-length cache file was deleted.
    pub fn cache_corrupt(&self) {
        self.cache_corrupt.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile download completed and was written to the cache.
    pub fn download_completed(&self) {
        self.downloads_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile download or cache write failed.
    pub fn download_failed(&self) {
        self.download_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A cached or downloaded image could not be decoded.
    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile reached the fully loaded phase.
    pub fn tile_loaded(&self) {
        self.tiles_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile surface was attached to the scene.
    pub fn tile_attached(&self) {
        self.tiles_attached.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tiles_requested: self.tiles_requested.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_corrupt: self.cache_corrupt.load(Ordering::Relaxed),
            downloads_completed: self.downloads_completed.load(Ordering::Relaxed),
            download_failures: self.download_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            tiles_attached: self.tiles_attached.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StreamerMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub tiles_requested: u64,
    pub cache_hits: u64,
    pub cache_corrupt: u64,
    pub downloads_completed: u64,
    pub download_failures: u64,
    pub decode_failures: u64,
    pub tiles_loaded: u64,
    pub tiles_attached: u64,
}

impl MetricsSnapshot {
    /// Total tiles that settled in the failed phase.
    pub fn tiles_failed(&self) -> u64 {
        self.cache_corrupt + self.download_failures + self.decode_failures
    }
}

/// Installs a fmt tracing subscriber honoring `RUST_LOG`, falling back to
/// `default_filter` when the environment sets nothing. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
