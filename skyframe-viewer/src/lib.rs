//! # skyframe-viewer: Ground-station video viewer
//!
//! Reads JPEG frames from the payload link (radio modem on a serial
//! port, or a TCP bench feed) and shows them through
//! `skyframe_core::LiveFrameDisplay`, either in a native Win32 window
//! or, headless, as a continuously rewritten PNG snapshot.

pub mod config;
pub mod display;
pub mod link;
pub mod snapshot;
pub mod window;
