//! Basemap - background tile streaming for 3D viewports
//!
//! This library keeps a satellite/vector basemap rendered underneath a
//! host-owned 3D scene. Each frame the host reports its visible geographic
//! extent; the streamer selects a zoom level that bounds the covering tile
//! count, loads missing tiles in the background (disk cache, download on
//! miss, texture decode), and attaches completed tiles to the scene under
//! a per-frame budget so the interactive loop never stalls.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use basemap::{BasemapStreamer, StreamerConfig};
//! use basemap::scene::{FlatGeoTransform, SharedScene};
//! use basemap::coord::GeoPoint;
//!
//! let scene: SharedScene<MyScene> = Arc::new(parking_lot::Mutex::new(my_scene));
//! let transform = FlatGeoTransform::new(GeoPoint::new(35.68, 139.76), 100.0);
//! let mut streamer = BasemapStreamer::new(StreamerConfig::default(), transform, &scene)?;
//!
//! // Once per frame, from the thread that owns the scene:
//! streamer.update(&visible_extent, delta_seconds);
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod pipe;
pub mod projection;
pub mod provider;
pub mod scene;
pub mod streamer;
pub mod telemetry;
pub mod texture;

pub use config::StreamerConfig;
pub use coord::{GeoExtent, GeoPoint, TileCoord};
pub use streamer::{BasemapStreamer, LoadPhase, StreamerError};
