//! # skyframe-core
//!
//! Live video display for the ground station.
//!
//! This crate contains:
//! - **Display**: `LiveFrameDisplay`, the adapter that decodes JPEG frames
//!   and paints them (or status overlays) into a panel
//! - **Panel**: the `Panel` trait hosts implement, plus `MemoryPanel`
//! - **Dispatch**: `UiLoop` / `DisplayHandle` for posting work onto the UI thread
//! - **Codec**: `FrameCodec` for pulling frames out of the payload link via `tokio_util`
//! - **Receiver**: `FrameReceiver`, the async link-to-display pump
//! - **Error**: `SkyframeError`, a `thiserror`-based error type

pub mod bitmap;
pub mod codec;
pub mod decoder;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod log;
pub mod overlay;
pub mod panel;
pub mod receiver;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bitmap::Bitmap;
pub use codec::{FrameCodec, FrameEncoding, VideoFrame};
pub use decoder::decode_jpeg;
pub use dispatch::{Delivery, DisplayHandle, QueuePolicy, UiCommand, UiLoop};
pub use display::LiveFrameDisplay;
pub use error::SkyframeError;
pub use log::{DisplayLog, TracingLog};
pub use overlay::Overlay;
pub use panel::{MemoryPanel, Panel, PanelImage, ScaleMode};
pub use receiver::{FrameReceiver, ReceiverExit, ReceiverStats};
