//! Worker-to-scene-thread surface construction handoff.
//!
//! Drawable construction may only run on the thread that owns the scene.
//! Load jobs therefore post a construction request onto a queue and block
//! on a one-shot completion channel; the streamer pumps the queue on the
//! frame thread while the scene is available. Closing the queue fails all
//! pending and future requests, which is how teardown unblocks workers
//! without a scene.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::Scene;
use crate::texture::TileImage;

/// The dispatcher's queue was closed before the request completed.
///
/// Happens only while the streamer is tearing down; the requesting tile is
/// marked failed so the worker pipe can drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("surface construction queue closed")]
pub struct DispatchClosed;

struct SurfaceRequest<H> {
    image: TileImage,
    reply: oneshot::Sender<H>,
}

/// Worker-side sender: submits construction requests to the scene thread.
pub struct SurfaceDispatcher<H> {
    tx: mpsc::UnboundedSender<SurfaceRequest<H>>,
}

impl<H> Clone for SurfaceDispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<H: Send + 'static> SurfaceDispatcher<H> {
    /// Creates a connected dispatcher/queue pair.
    pub fn channel() -> (Self, SurfaceQueue<H>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, SurfaceQueue { rx })
    }

    /// Submits `image` for construction on the scene thread and waits for
    /// the resulting surface handle.
    pub async fn build_surface(&self, image: TileImage) -> Result<H, DispatchClosed> {
        let (reply, completion) = oneshot::channel();
        self.tx
            .send(SurfaceRequest { image, reply })
            .map_err(|_| DispatchClosed)?;
        completion.await.map_err(|_| DispatchClosed)
    }
}

/// Frame-thread side: drains pending construction requests into the scene.
pub struct SurfaceQueue<H> {
    rx: mpsc::UnboundedReceiver<SurfaceRequest<H>>,
}

impl<H: Send + 'static> SurfaceQueue<H> {
    /// Constructs surfaces for every pending request, replying through each
    /// request's completion channel. Returns the number of surfaces built.
    pub fn pump<S>(&mut self, scene: &mut S) -> usize
    where
        S: Scene<Handle = H>,
    {
        let mut built = 0;
        while let Ok(request) = self.rx.try_recv() {
            let handle = scene.create_surface(request.image);
            built += 1;
            if request.reply.send(handle).is_err() {
                // Requesting job is gone; the surface stays constructed but
                // unattached.
                debug!("surface construction reply dropped by requester");
            }
        }
        built
    }

    /// Closes the queue and drops any pending requests, failing their
    /// waiting workers.
    pub fn close(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::MockScene;

    fn test_image() -> TileImage {
        TileImage::from_rgba8(1, 1, vec![255, 255, 255, 255])
    }

    #[tokio::test]
    async fn test_pump_builds_surface_and_replies() {
        let (dispatcher, mut queue) = SurfaceDispatcher::<u32>::channel();

        let worker = tokio::spawn(async move { dispatcher.build_surface(test_image()).await });
        // Let the worker enqueue its request before pumping.
        tokio::task::yield_now().await;

        let mut scene = MockScene::new();
        assert_eq!(queue.pump(&mut scene), 1);
        assert_eq!(scene.created, vec![1]);

        let handle = worker.await.unwrap().unwrap();
        assert_eq!(handle, 1);
    }

    #[tokio::test]
    async fn test_pump_on_empty_queue_is_noop() {
        let (_dispatcher, mut queue) = SurfaceDispatcher::<u32>::channel();
        let mut scene = MockScene::new();
        assert_eq!(queue.pump(&mut scene), 0);
        assert!(scene.created.is_empty());
    }

    #[tokio::test]
    async fn test_build_surface_fails_after_close() {
        let (dispatcher, mut queue) = SurfaceDispatcher::<u32>::channel();
        queue.close();

        let result = dispatcher.build_surface(test_image()).await;
        assert_eq!(result, Err(DispatchClosed));
    }

    #[tokio::test]
    async fn test_close_fails_pending_request() {
        let (dispatcher, mut queue) = SurfaceDispatcher::<u32>::channel();

        let worker = tokio::spawn(async move { dispatcher.build_surface(test_image()).await });
        tokio::task::yield_now().await;

        queue.close();

        let result = worker.await.unwrap();
        assert_eq!(result, Err(DispatchClosed));
    }

    #[tokio::test]
    async fn test_requests_processed_in_submission_order() {
        let (dispatcher, mut queue) = SurfaceDispatcher::<u32>::channel();

        let first = dispatcher.clone();
        let second = dispatcher;
        let worker_a = tokio::spawn(async move { first.build_surface(test_image()).await });
        tokio::task::yield_now().await;
        let worker_b = tokio::spawn(async move { second.build_surface(test_image()).await });
        tokio::task::yield_now().await;

        let mut scene = MockScene::new();
        assert_eq!(queue.pump(&mut scene), 2);

        assert_eq!(worker_a.await.unwrap().unwrap(), 1);
        assert_eq!(worker_b.await.unwrap().unwrap(), 2);
    }
}
