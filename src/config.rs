//! Streamer configuration.
//!
//! `StreamerConfig` combines everything needed to construct a
//! [`BasemapStreamer`](crate::streamer::BasemapStreamer): cache location,
//! tile endpoint, zoom search bounds, the density cap that drives zoom
//! selection, and the frame-budget pacing for scene attachment.

use std::path::PathBuf;

use crate::coord::{MAX_ZOOM, MIN_ZOOM};
use crate::provider::DEFAULT_TILE_URL;

/// Maximum covering-tile count tolerated when selecting a zoom level.
///
/// Bounds both on-screen tiles and concurrently in-flight loads regardless
/// of how far the viewport zooms out.
pub const DEFAULT_TILE_DENSITY_LIMIT: u64 = 16;

/// Seconds that must accumulate between two scene attachments.
///
/// Caps scene-graph mutations to roughly one per frame-budget slice so a
/// burst of completed tiles cannot cause a multi-frame hitch.
pub const DEFAULT_ATTACH_INTERVAL_SECS: f32 = 0.03;

/// Default worker thread count for the tile load pipe.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Configuration for a [`BasemapStreamer`](crate::streamer::BasemapStreamer).
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Root directory of the on-disk tile cache.
    pub cache_dir: PathBuf,

    /// Cached image file extension, including the leading dot.
    pub file_extension: String,

    /// XYZ tile endpoint template with `{z}`/`{x}`/`{y}` placeholders.
    pub tile_url: String,

    /// Finest zoom level the selection search starts from.
    pub max_zoom: u8,

    /// Coarsest zoom level the selection search stops at.
    pub min_zoom: u8,

    /// Covering-tile count cap used by zoom selection.
    pub tile_density_limit: u64,

    /// Seconds accumulated between scene attachments.
    pub attach_interval: f32,

    /// Worker threads in the tile load pipe.
    pub worker_threads: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        let cache_root = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            cache_dir: cache_root.join("basemap"),
            file_extension: ".png".to_string(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            max_zoom: MAX_ZOOM,
            min_zoom: MIN_ZOOM,
            tile_density_limit: DEFAULT_TILE_DENSITY_LIMIT,
            attach_interval: DEFAULT_ATTACH_INTERVAL_SECS,
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

impl StreamerConfig {
    /// Creates a config with defaults and the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the tile endpoint template.
    pub fn with_tile_url(mut self, url: impl Into<String>) -> Self {
        self.tile_url = url.into();
        self
    }

    /// Sets the cached image file extension (leading dot included).
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Sets the zoom selection search bounds.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Sets the covering-tile density cap.
    pub fn with_tile_density_limit(mut self, limit: u64) -> Self {
        self.tile_density_limit = limit;
        self
    }

    /// Sets the attachment pacing interval in seconds.
    pub fn with_attach_interval(mut self, seconds: f32) -> Self {
        self.attach_interval = seconds;
        self
    }

    /// Sets the load pipe's worker thread count.
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    /// Returns a copy with the zoom bounds clamped into the supported
    /// range and ordered.
    pub(crate) fn normalized(mut self) -> Self {
        self.max_zoom = self.max_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.min_zoom = self.min_zoom.clamp(MIN_ZOOM, self.max_zoom);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamerConfig::default();
        assert_eq!(config.file_extension, ".png");
        assert_eq!(config.tile_url, DEFAULT_TILE_URL);
        assert_eq!(config.max_zoom, 18);
        assert_eq!(config.min_zoom, 1);
        assert_eq!(config.tile_density_limit, 16);
        assert_eq!(config.attach_interval, 0.03);
        assert!(config.cache_dir.ends_with("basemap"));
    }

    #[test]
    fn test_builder_setters() {
        let config = StreamerConfig::new("/tmp/tiles")
            .with_tile_url("https://tiles.example.com/{z}/{x}/{y}.jpg")
            .with_file_extension(".jpg")
            .with_zoom_range(4, 12)
            .with_tile_density_limit(32)
            .with_attach_interval(0.05)
            .with_worker_threads(8);

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/tiles"));
        assert_eq!(config.tile_url, "https://tiles.example.com/{z}/{x}/{y}.jpg");
        assert_eq!(config.file_extension, ".jpg");
        assert_eq!(config.min_zoom, 4);
        assert_eq!(config.max_zoom, 12);
        assert_eq!(config.tile_density_limit, 32);
        assert_eq!(config.attach_interval, 0.05);
        assert_eq!(config.worker_threads, 8);
    }

    #[test]
    fn test_normalized_clamps_zoom_bounds() {
        let config = StreamerConfig::default()
            .with_zoom_range(0, 25)
            .normalized();
        assert_eq!(config.min_zoom, 1);
        assert_eq!(config.max_zoom, 18);

        let inverted = StreamerConfig::default()
            .with_zoom_range(15, 10)
            .normalized();
        assert_eq!(inverted.max_zoom, 10);
        assert_eq!(inverted.min_zoom, 10);
    }
}
