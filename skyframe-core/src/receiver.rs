//! Link-side frame consumer.
//!
//! Reads the payload link through [`FrameCodec`] and posts every frame to
//! the UI thread via a [`DisplayHandle`]. Receive statistics are
//! published on a `tokio::sync::watch` channel so the host can show them
//! without touching the receive loop.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::codec::{FrameCodec, FrameEncoding};
use crate::dispatch::{Delivery, DisplayHandle};
use crate::error::SkyframeError;

// ── ReceiverStats ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames extracted from the link.
    pub frames: u64,
    /// Payload bytes across those frames.
    pub bytes: u64,
    /// Frames that arrived in the legacy text envelope.
    pub text_frames: u64,
    /// Frames the UI queue refused.
    pub dropped: u64,
}

// ── FrameReceiver ────────────────────────────────────────────────

/// Why the receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// The link reached end of stream.
    LinkClosed,
    /// The UI loop went away.
    DisplayClosed,
}

pub struct FrameReceiver {
    codec: FrameCodec,
    stats_tx: watch::Sender<ReceiverStats>,
    stats_rx: watch::Receiver<ReceiverStats>,
}

impl FrameReceiver {
    pub fn new(codec: FrameCodec) -> Self {
        let (stats_tx, stats_rx) = watch::channel(ReceiverStats::default());
        Self {
            codec,
            stats_tx,
            stats_rx,
        }
    }

    /// A receiver for live statistics.
    pub fn stats_receiver(&self) -> watch::Receiver<ReceiverStats> {
        self.stats_rx.clone()
    }

    /// Pump frames from `link` into `display` until the link closes or
    /// the UI loop goes away. Link I/O errors are returned.
    pub async fn run<R>(
        self,
        link: R,
        display: DisplayHandle,
    ) -> Result<ReceiverExit, SkyframeError>
    where
        R: AsyncRead + Unpin,
    {
        let mut frames = FramedRead::new(link, self.codec);
        let mut stats = ReceiverStats::default();

        while let Some(frame) = frames.next().await {
            let frame = frame?;
            stats.frames += 1;
            stats.bytes += frame.payload.len() as u64;
            if frame.encoding == FrameEncoding::Base64Text {
                stats.text_frames += 1;
            }
            debug!(
                bytes = frame.payload.len(),
                encoding = ?frame.encoding,
                "frame received"
            );

            match display.render_frame(frame.payload) {
                Ok(Delivery::Queued) => {}
                Ok(Delivery::Dropped) => stats.dropped += 1,
                Err(SkyframeError::ChannelClosed) => {
                    warn!("display closed; stopping receiver");
                    let _ = self.stats_tx.send(stats);
                    return Ok(ReceiverExit::DisplayClosed);
                }
                Err(e) => return Err(e),
            }
            let _ = self.stats_tx.send(stats.clone());
        }

        info!(frames = stats.frames, bytes = stats.bytes, "link closed");
        Ok(ReceiverExit::LinkClosed)
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new(FrameCodec::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────
