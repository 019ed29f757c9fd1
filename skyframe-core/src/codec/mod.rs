//! Video framing on the payload link.
//!
//! The radio link carries telemetry lines interleaved with camera frames
//! in one of two envelopes:
//!
//! ```text
//! binary:  DE AD BE EF | jpeg bytes .......... | CA FE BA BE
//! text:    "#VIDEO:"   | base64(jpeg) ........ | "#"
//! ```
//!
//! [`FrameCodec`] pulls frames out of that stream and throws away
//! everything between them.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::error::SkyframeError;

pub const FRAME_START: &[u8] = &[0xDE, 0xAD, 0xBE, 0xEF];
pub const FRAME_END: &[u8] = &[0xCA, 0xFE, 0xBA, 0xBE];
pub const TEXT_FRAME_PREFIX: &[u8] = b"#VIDEO:";
pub const TEXT_FRAME_SUFFIX: &[u8] = b"#";

/// Default cap on a single frame's payload.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024;

/// Bytes kept after a marker-less scan, enough to hold a split prefix.
const SCAN_TAIL: usize = TEXT_FRAME_PREFIX.len() - 1;

// ── VideoFrame ───────────────────────────────────────────────────

/// Envelope a frame arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEncoding {
    Binary,
    Base64Text,
}

/// One encoded still extracted from the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// The JPEG bytes, envelope removed.
    pub payload: Bytes,
    pub encoding: FrameEncoding,
}

// ── FrameCodec ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Wrapped size limit for an encoding, markers included.
    fn wrapped_limit(&self, encoding: FrameEncoding) -> usize {
        match encoding {
            FrameEncoding::Binary => self.max_frame_size + FRAME_START.len() + FRAME_END.len(),
            // base64 inflates by 4/3, rounded up to whole quads.
            FrameEncoding::Base64Text => {
                self.max_frame_size.div_ceil(3) * 4 + TEXT_FRAME_PREFIX.len() + TEXT_FRAME_SUFFIX.len()
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Earliest frame start in `buf`, with the envelope it opens.
fn next_start(buf: &[u8]) -> Option<(usize, FrameEncoding)> {
    let binary = find(buf, FRAME_START).map(|i| (i, FrameEncoding::Binary));
    let text = find(buf, TEXT_FRAME_PREFIX).map(|i| (i, FrameEncoding::Base64Text));
    match (binary, text) {
        (Some(b), Some(t)) => Some(if b.0 <= t.0 { b } else { t }),
        (b, t) => b.or(t),
    }
}

impl tokio_util::codec::Decoder for FrameCodec {
    type Item = VideoFrame;
    type Error = SkyframeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some((start, encoding)) = next_start(src) else {
                let keep = src.len().min(SCAN_TAIL);
                src.advance(src.len() - keep);
                return Ok(None);
            };
            if start > 0 {
                debug!(bytes = start, "discarding non-video bytes");
                src.advance(start);
            }

            let (head, tail) = match encoding {
                FrameEncoding::Binary => (FRAME_START.len(), FRAME_END),
                FrameEncoding::Base64Text => (TEXT_FRAME_PREFIX.len(), TEXT_FRAME_SUFFIX),
            };

            let Some(end) = find(&src[head..], tail) else {
                let limit = self.wrapped_limit(encoding);
                if src.len() > limit {
                    let err = SkyframeError::FrameTooLarge {
                        size: src.len(),
                        max: limit,
                    };
                    warn!("{err}; resynchronising");
                    src.advance(head);
                    continue;
                }
                return Ok(None);
            };

            if end > self.wrapped_limit(encoding) - head - tail.len() {
                warn!(size = end, "video frame over size limit; resynchronising");
                src.advance(head);
                continue;
            }

            let mut frame = src.split_to(head + end + tail.len());
            frame.advance(head);
            frame.truncate(end);

            let payload = match encoding {
                FrameEncoding::Binary => frame.freeze(),
                FrameEncoding::Base64Text => match BASE64.decode(&frame) {
                    Ok(raw) => Bytes::from(raw),
                    Err(e) => {
                        warn!("invalid text video frame: {}", SkyframeError::from(e));
                        continue;
                    }
                },
            };

            if payload.is_empty() {
                debug!("empty video frame skipped");
                continue;
            }
            return Ok(Some(VideoFrame { payload, encoding }));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A partial frame at EOF will never complete.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl tokio_util::codec::Encoder<Bytes> for FrameCodec {
    type Error = SkyframeError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_size {
            return Err(SkyframeError::FrameTooLarge {
                size: item.len(),
                max: self.max_frame_size,
            });
        }
        dst.reserve(item.len() + FRAME_START.len() + FRAME_END.len());
        dst.put_slice(FRAME_START);
        dst.put_slice(&item);
        dst.put_slice(FRAME_END);
        Ok(())
    }
}

/// Wrap a JPEG in the legacy `#VIDEO:<base64>#` text envelope.
pub fn encode_text_frame(jpeg: &[u8]) -> String {
    format!("#VIDEO:{}#", BASE64.encode(jpeg))
}

// ── Tests ────────────────────────────────────────────────────────
