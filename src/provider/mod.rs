//! Basemap tile provider abstraction
//!
//! This module provides traits and implementations for downloading basemap
//! tile imagery. The [`TileProvider`] trait is the streamer's only view of
//! the network; the shipped [`XyzTileProvider`] fills a standard
//! `{z}/{x}/{y}` URL template and fetches over HTTP.

mod http;

pub use http::{AsyncHttpClient, ReqwestClient};

#[cfg(test)]
pub use http::tests::MockHttpClient;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::coord::TileCoord;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default tile endpoint: the OpenStreetMap raster tile server.
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Errors that can occur while downloading a tile.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The request failed at the transport level.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Downloads the image bytes of one basemap tile.
///
/// Implementations must be shareable across worker tasks
/// (`Arc<dyn TileProvider>`). A non-success result marks the requesting
/// tile as failed; the streamer never retries.
pub trait TileProvider: Send + Sync + 'static {
    /// Fetches the image bytes for `coord`.
    fn fetch(&self, coord: TileCoord) -> BoxFuture<'_, Result<Vec<u8>, ProviderError>>;
}

/// Tile provider for XYZ-style tile servers.
///
/// Substitutes `{z}`, `{x}` and `{y}` in the URL template with the tile's
/// zoom, column and row.
pub struct XyzTileProvider<C: AsyncHttpClient> {
    client: C,
    url_template: String,
}

impl<C: AsyncHttpClient> XyzTileProvider<C> {
    /// Creates a provider over `client` with the given URL template.
    pub fn new(client: C, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    /// Returns the request URL for a tile.
    pub fn url_for(&self, coord: TileCoord) -> String {
        self.url_template
            .replace("{z}", &coord.zoom.to_string())
            .replace("{x}", &coord.col.to_string())
            .replace("{y}", &coord.row.to_string())
    }
}

impl<C: AsyncHttpClient> TileProvider for XyzTileProvider<C> {
    fn fetch(&self, coord: TileCoord) -> BoxFuture<'_, Result<Vec<u8>, ProviderError>> {
        Box::pin(async move {
            let url = self.url_for(coord);
            self.client.get(&url).await
        })
    }
}
