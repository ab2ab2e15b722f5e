//! Off-screen rendering surfaces
//!
//! An encoder never writes into shared state: every request attaches its own
//! [`OffscreenContainer`], hands the encoder a one-shot [`SurfaceSink`], and
//! awaits the result with an upper bound. The container detaches itself when
//! dropped, so success, failure, and cancellation all release it.

use crate::{Error, Result};
use log::debug;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// What an encoder leaves behind on its surface
#[derive(Debug, Clone, PartialEq)]
pub struct RawRendering {
    /// Raw SVG markup as produced by the encoder
    pub svg: String,
    /// Finder-pattern side length the encoder used, in its own units
    pub corner_footprint: Option<f64>,
}

impl RawRendering {
    pub fn new(svg: impl Into<String>) -> Self {
        Self {
            svg: svg.into(),
            corner_footprint: None,
        }
    }

    pub fn with_corner_footprint(mut self, footprint: f64) -> Self {
        self.corner_footprint = Some(footprint);
        self
    }
}

#[derive(Debug, Default)]
struct HostState {
    live: AtomicUsize,
    next_id: AtomicU64,
}

/// Owner of off-screen containers.
///
/// Cloning is cheap and clones share the same live-container count.
#[derive(Debug, Clone, Default)]
pub struct SurfaceHost {
    state: Arc<HostState>,
}

impl SurfaceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh, isolated container
    pub fn attach(&self) -> OffscreenContainer {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.state.live.fetch_add(1, Ordering::SeqCst);
        debug!("attached off-screen container {}", id);

        let (tx, rx) = oneshot::channel();
        OffscreenContainer {
            id,
            state: Arc::clone(&self.state),
            sink: Some(SurfaceSink {
                container_id: id,
                tx,
            }),
            rx: Some(rx),
        }
    }

    /// Number of containers currently attached
    pub fn live_containers(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }
}

/// A detached rendering target scoped to one request
#[derive(Debug)]
pub struct OffscreenContainer {
    id: u64,
    state: Arc<HostState>,
    sink: Option<SurfaceSink>,
    rx: Option<oneshot::Receiver<RawRendering>>,
}

impl OffscreenContainer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Take the write end handed to the encoder. Only available once.
    pub fn take_sink(&mut self) -> Option<SurfaceSink> {
        self.sink.take()
    }

    /// Wait for the encoder to populate the surface, at most `timeout`.
    pub async fn wait(&mut self, timeout: Duration) -> Result<RawRendering> {
        let rx = self.rx.take().ok_or_else(|| {
            Error::EncoderProduceFailure(format!("container {} was already read", self.id))
        })?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(rendering)) => Ok(rendering),
            Ok(Err(_)) => Err(Error::EncoderProduceFailure(format!(
                "encoder released container {} without output",
                self.id
            ))),
            Err(_) => Err(Error::EncoderProduceFailure(format!(
                "no output in container {} after {}ms",
                self.id,
                timeout.as_millis()
            ))),
        }
    }
}

impl Drop for OffscreenContainer {
    fn drop(&mut self) {
        self.state.live.fetch_sub(1, Ordering::SeqCst);
        debug!("detached off-screen container {}", self.id);
    }
}

/// Write end of a container; completing it signals the encoder is done
#[derive(Debug)]
pub struct SurfaceSink {
    container_id: u64,
    tx: oneshot::Sender<RawRendering>,
}

impl SurfaceSink {
    pub fn container_id(&self) -> u64 {
        self.container_id
    }

    /// Deliver the finished rendering. Returns false when the container has
    /// already been torn down.
    pub fn complete(self, rendering: RawRendering) -> bool {
        self.tx.send(rendering).is_ok()
    }
}
