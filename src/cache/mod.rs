//! On-disk tile image store.
//!
//! One cached file per tile coordinate at a deterministic path under the
//! basemap cache directory. The store never evicts; a zero-length file is
//! treated as a corrupt download remnant and deleted on the next probe.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, warn};

use crate::coord::TileCoord;

/// Errors that can occur during tile store operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error while probing or writing a cache file.
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    /// A cached file with zero length was found and deleted.
    #[error("corrupt zero-length cache entry: {path}")]
    CorruptEntry { path: PathBuf },
}

/// Result of probing the store for a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheProbe {
    /// A usable cached file exists at the path.
    Hit(PathBuf),
    /// Nothing is cached; the path is where a download should land.
    Miss(PathBuf),
}

/// Disk-backed tile image store with slippy-map path layout.
#[derive(Debug, Clone)]
pub struct TileStore {
    directory: PathBuf,
    extension: String,
}

impl TileStore {
    /// Creates a store rooted at `directory`.
    ///
    /// `extension` is the image file extension including the leading dot,
    /// e.g. `".png"`.
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
        }
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Deterministic cache path for a tile: `<dir>/<zoom>/<col>/<row><ext>`.
    pub fn tile_path(&self, coord: TileCoord) -> PathBuf {
        self.directory
            .join(coord.zoom.to_string())
            .join(coord.col.to_string())
            .join(format!("{}{}", coord.row, self.extension))
    }

    /// Probes the store for a tile.
    ///
    /// A zero-length file is deleted and reported as [`CacheError::CorruptEntry`];
    /// the caller marks the tile failed without any further disk access.
    pub async fn probe(&self, coord: TileCoord) -> Result<CacheProbe, CacheError> {
        let path = self.tile_path(coord);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() == 0 => {
                error!(tile = %coord, path = %path.display(), "zero-length cache file, deleting");
                if let Err(err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), %err, "failed to delete corrupt cache file");
                }
                Err(CacheError::CorruptEntry { path })
            }
            Ok(_) => Ok(CacheProbe::Hit(path)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(CacheProbe::Miss(path)),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes downloaded tile bytes to the tile's cache path, creating
    /// parent directories as needed. Returns the written path.
    pub async fn store(&self, coord: TileCoord, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.tile_path(coord);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TileStore {
        TileStore::new(dir.path(), ".png")
    }

    #[test]
    fn test_tile_path_layout() {
        let store = TileStore::new("/var/cache/basemap", ".png");
        let path = store.tile_path(TileCoord::new(19295, 24640, 16));
        assert_eq!(
            path,
            PathBuf::from("/var/cache/basemap/16/19295/24640.png")
        );
    }

    #[test]
    fn test_tile_path_deterministic() {
        let store = TileStore::new("/tmp/tiles", ".jpg");
        let coord = TileCoord::new(5, 9, 3);
        assert_eq!(store.tile_path(coord), store.tile_path(coord));
    }

    #[tokio::test]
    async fn test_probe_miss_returns_destination_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let coord = TileCoord::new(1, 2, 3);

        let probe = store.probe(coord).await.unwrap();
        assert_eq!(probe, CacheProbe::Miss(store.tile_path(coord)));
    }

    #[tokio::test]
    async fn test_store_then_probe_hits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let coord = TileCoord::new(1, 2, 3);

        let written = store.store(coord, b"image-bytes").await.unwrap();
        assert_eq!(written, store.tile_path(coord));

        let probe = store.probe(coord).await.unwrap();
        assert_eq!(probe, CacheProbe::Hit(written.clone()));
        assert_eq!(std::fs::read(written).unwrap(), b"image-bytes");
    }

    #[tokio::test]
    async fn test_zero_length_file_deleted_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let coord = TileCoord::new(7, 8, 9);

        let path = store.tile_path(coord);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::File::create(&path).unwrap();

        let result = store.probe(coord).await;
        assert!(matches!(result, Err(CacheError::CorruptEntry { .. })));
        assert!(!path.exists(), "corrupt file should be deleted");
    }

    #[tokio::test]
    async fn test_probe_after_corruption_recovery_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let coord = TileCoord::new(7, 8, 9);

        let path = store.tile_path(coord);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::File::create(&path).unwrap();

        let _ = store.probe(coord).await;
        let probe = store.probe(coord).await.unwrap();
        assert_eq!(probe, CacheProbe::Miss(path));
    }
}
