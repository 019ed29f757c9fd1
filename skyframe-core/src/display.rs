//! Live frame display adapter.
//!
//! [`LiveFrameDisplay`] decodes JPEG frames and hands them to a
//! [`Panel`]. It never reports failures to its caller: every problem
//! is logged through the injected [`DisplayLog`] and, where it helps
//! the operator, shown on the panel as an overlay.
//!
//! The adapter belongs to the UI thread. Other threads reach it through
//! [`crate::dispatch::DisplayHandle`].

use std::sync::Arc;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;
use tracing::{debug, warn};

use crate::decoder::decode_jpeg;
use crate::error::SkyframeError;
use crate::log::DisplayLog;
use crate::overlay::{DARK_GREEN, Overlay};
use crate::panel::{Panel, PanelImage, ScaleMode};

/// A frame-count log line is emitted every this many frames.
pub const LOG_EVERY_N_FRAMES: u64 = 10;

/// Reason shown when the bytes are not a decodable JPEG.
pub const INVALID_JPEG_REASON: &str = "Invalid JPEG data";

pub struct LiveFrameDisplay<P: Panel> {
    panel: Option<P>,
    log: Arc<dyn DisplayLog>,
    active: bool,
    frame_count: u64,
}

impl<P: Panel> LiveFrameDisplay<P> {
    /// Wrap `panel`, applying the default appearance.
    pub fn new(mut panel: Option<P>, log: Arc<dyn DisplayLog>) -> Self {
        if let Some(panel) = panel.as_mut() {
            panel.set_scale_mode(ScaleMode::Stretch);
            panel.set_background(Rgb888::BLACK);
        }
        log.log("Live frame display initialised", false);
        Self {
            panel,
            log,
            active: false,
            frame_count: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Frames rendered since the last [`start`](Self::start).
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn panel(&self) -> Option<&P> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut P> {
        self.panel.as_mut()
    }

    /// Begin a session and paint the "ready" placeholder.
    ///
    /// A painting failure is logged; the session stays active.
    pub fn start(&mut self) {
        self.active = true;
        self.frame_count = 0;

        if let Err(e) = self.paint_ready() {
            self.log.log(&format!("Video start error: {e}"), true);
            return;
        }
        self.log.log("Video display started", false);
    }

    fn paint_ready(&mut self) -> Result<(), SkyframeError> {
        let Some(panel) = self.panel.as_mut() else {
            return Ok(());
        };
        panel.set_background(DARK_GREEN);
        let (w, h) = panel.size();
        let bitmap = Overlay::Ready.render(w, h)?;
        panel.paint(&bitmap)
    }

    /// Decode `data` as JPEG and show it.
    ///
    /// Skipped with a logged warning when the session is inactive, the
    /// buffer is empty or there is no panel. Decode failures replace the
    /// image with an error overlay and leave the frame count unchanged.
    pub fn render_frame(&mut self, data: &[u8]) {
        if !self.active || data.is_empty() || self.panel.is_none() {
            self.log.log(
                &format!(
                    "Frame skipped: active={}, bytes={}, panel={}",
                    self.active,
                    data.len(),
                    self.panel.is_some(),
                ),
                true,
            );
            return;
        }

        debug!(bytes = data.len(), "rendering frame");

        match self.try_render(data) {
            Ok(()) => {
                self.frame_count += 1;
                if self.frame_count % LOG_EVERY_N_FRAMES == 0 {
                    self.log.log(
                        &format!(
                            "Video: {} frames displayed ({} bytes)",
                            self.frame_count,
                            data.len()
                        ),
                        false,
                    );
                }
            }
            Err(e) if e.is_invalid_image() => {
                debug!("rejected frame: {e}");
                self.show_error(INVALID_JPEG_REASON);
            }
            Err(e) => {
                self.log.log(&format!("Frame render error: {e}"), true);
                self.show_error(&format!("Frame error: {e}"));
            }
        }
    }

    fn try_render(&mut self, data: &[u8]) -> Result<(), SkyframeError> {
        let bitmap = decode_jpeg(data)?;
        let panel = self
            .panel
            .as_mut()
            .ok_or_else(|| SkyframeError::Render("panel detached".into()))?;
        panel.set_image(Some(PanelImage::frame(bitmap)))
    }

    /// Replace the panel image with a red error overlay.
    ///
    /// Failures here are not reported to the display log.
    fn show_error(&mut self, reason: &str) {
        let overlay = Overlay::error(reason, self.frame_count);
        if let Err(e) = self.install_overlay(&overlay) {
            warn!("could not draw error overlay: {e}");
        }
    }

    /// Paint the diagnostic test pattern, active or not.
    pub fn show_test_message(&mut self) {
        if self.panel.is_none() {
            return;
        }
        match self.install_overlay(&Overlay::test_now()) {
            Ok(()) => self.log.log("Test message displayed", false),
            Err(e) => self.log.log(&format!("Test message error: {e}"), true),
        }
    }

    fn install_overlay(&mut self, overlay: &Overlay) -> Result<(), SkyframeError> {
        let Some(panel) = self.panel.as_mut() else {
            return Ok(());
        };
        let (w, h) = panel.size();
        let bitmap = overlay.render(w, h)?;
        panel.set_image(Some(PanelImage::overlay(bitmap, overlay.caption())))
    }

    /// End the session, release the image and reset the background.
    pub fn stop(&mut self) {
        self.active = false;
        if let Some(panel) = self.panel.as_mut() {
            if let Err(e) = panel.set_image(None) {
                self.log.log(&format!("Video stop error: {e}"), true);
            }
            panel.set_background(Rgb888::BLACK);
        }
        self.log.log("Video display stopped", false);
    }

    /// Stop and release everything. Never fails.
    pub fn teardown(mut self) {
        self.stop();
        self.log.log("Live frame display cleaned up", false);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::decoder::tests::jpeg_fixture;
    use crate::overlay::ERROR_HEADLINE;
    use crate::panel::MemoryPanel;
    use std::sync::Mutex;

    type Lines = Arc<Mutex<Vec<(String, bool)>>>;

    fn recording_log() -> (Arc<dyn DisplayLog>, Lines) {
        let lines: Lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let log: Arc<dyn DisplayLog> = Arc::new(move |msg: &str, err: bool| {
            sink.lock().unwrap().push((msg.to_string(), err))
        });
        (log, lines)
    }

    fn display() -> (LiveFrameDisplay<MemoryPanel>, Lines) {
        let (log, lines) = recording_log();
        (
            LiveFrameDisplay::new(Some(MemoryPanel::new(320, 240)), log),
            lines,
        )
    }

    /// Panel that rejects every retained image.
    struct RejectingPanel;

    impl Panel for RejectingPanel {
        fn size(&self) -> (u32, u32) {
            (64, 48)
        }
        fn set_scale_mode(&mut self, _mode: ScaleMode) {}
        fn set_background(&mut self, _color: Rgb888) {}
        fn paint(&mut self, _bitmap: &Bitmap) -> Result<(), SkyframeError> {
            Err(SkyframeError::Render("surface lost".into()))
        }
        fn set_image(&mut self, _image: Option<PanelImage>) -> Result<(), SkyframeError> {
            Err(SkyframeError::Render("surface lost".into()))
        }
        fn image(&self) -> Option<&PanelImage> {
            None
        }
    }

    /// Panel that keeps every image but whose surface cannot draw.
    #[derive(Default)]
    struct BlindPanel {
        image: Option<PanelImage>,
        failed_draws: usize,
    }

    impl Panel for BlindPanel {
        fn size(&self) -> (u32, u32) {
            (0, 0)
        }
        fn set_scale_mode(&mut self, _mode: ScaleMode) {}
        fn set_background(&mut self, _color: Rgb888) {}
        fn paint(&mut self, _bitmap: &Bitmap) -> Result<(), SkyframeError> {
            Err(SkyframeError::Render("nothing to draw into".into()))
        }
        fn set_image(&mut self, image: Option<PanelImage>) -> Result<(), SkyframeError> {
            self.image = image;
            if self.image.is_some() {
                self.failed_draws += 1;
            }
            Ok(())
        }
        fn image(&self) -> Option<&PanelImage> {
            self.image.as_ref()
        }
    }

    #[test]
    fn init_applies_default_appearance() {
        let (display, lines) = display();
        let panel = display.panel().unwrap();
        assert_eq!(panel.scale_mode(), ScaleMode::Stretch);
        assert_eq!(panel.background(), Rgb888::BLACK);
        assert!(!display.is_active());
        assert_eq!(lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn start_paints_ready_placeholder() {
        let (mut display, _) = display();
        display.start();
        assert!(display.is_active());
        let panel = display.panel().unwrap();
        assert_eq!(panel.background(), DARK_GREEN);
        assert_eq!(panel.paints(), 1);
        assert!(panel.image().is_none());
    }

    #[test]
    fn inactive_render_never_touches_panel() {
        let (mut display, lines) = display();
        display.render_frame(&jpeg_fixture(16, 16, [1, 2, 3]));
        assert_eq!(display.panel().unwrap().image_updates(), 0);
        assert_eq!(display.frame_count(), 0);
        let lines = lines.lock().unwrap();
        let (msg, err) = lines.last().unwrap();
        assert!(msg.contains("active=false"));
        assert!(*err);
    }

    #[test]
    fn empty_buffer_is_skipped() {
        let (mut display, _) = display();
        display.start();
        display.render_frame(&[]);
        assert_eq!(display.panel().unwrap().image_updates(), 0);
    }

    #[test]
    fn missing_panel_is_skipped() {
        let (log, lines) = recording_log();
        let mut display: LiveFrameDisplay<MemoryPanel> = LiveFrameDisplay::new(None, log);
        display.start();
        display.render_frame(&jpeg_fixture(8, 8, [0, 0, 0]));
        display.show_test_message();
        assert_eq!(display.frame_count(), 0);
        assert!(lines.lock().unwrap().iter().any(|(m, _)| m.contains("panel=false")));
    }

    #[test]
    fn valid_frame_increments_counter_once() {
        let (mut display, _) = display();
        display.start();
        display.render_frame(&jpeg_fixture(40, 30, [10, 200, 10]));

        assert_eq!(display.frame_count(), 1);
        let panel = display.panel().unwrap();
        assert_eq!(panel.image_updates(), 1);
        let image = panel.image().unwrap();
        assert!(!image.is_overlay());
        assert_eq!(image.bitmap().width(), 40);
    }

    #[test]
    fn malformed_frame_shows_error_overlay() {
        let (mut display, _) = display();
        display.start();
        display.render_frame(&jpeg_fixture(8, 8, [0, 0, 0]));
        display.render_frame(b"\xFF\xD8 not really a jpeg");

        assert_eq!(display.frame_count(), 1);
        let image = display.panel().unwrap().image().unwrap();
        let caption = image.caption().unwrap();
        assert!(caption.contains(ERROR_HEADLINE));
        assert!(caption.contains(INVALID_JPEG_REASON));
        assert!(caption.contains("Frame: 1"));
        assert_eq!(image.bitmap().width(), 320);
        assert_eq!(image.bitmap().height(), 240);
    }

    #[test]
    fn every_tenth_frame_is_logged() {
        let (mut display, lines) = display();
        display.start();
        let jpeg = jpeg_fixture(8, 8, [50, 50, 50]);
        for _ in 0..25 {
            display.render_frame(&jpeg);
        }
        let progress: Vec<String> = lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.contains("frames displayed"))
            .map(|(m, _)| m.clone())
            .collect();
        assert_eq!(
            progress,
            vec![
                format!("Video: 10 frames displayed ({} bytes)", jpeg.len()),
                format!("Video: 20 frames displayed ({} bytes)", jpeg.len()),
            ]
        );
        assert_eq!(display.frame_count(), 25);
    }

    #[test]
    fn kept_frame_counts_even_when_surface_cannot_draw() {
        let (log, lines) = recording_log();
        let mut display = LiveFrameDisplay::new(Some(BlindPanel::default()), log);
        display.start();
        lines.lock().unwrap().clear();

        display.render_frame(&jpeg_fixture(8, 8, [7, 7, 7]));
        display.render_frame(&jpeg_fixture(8, 8, [8, 8, 8]));

        assert_eq!(display.frame_count(), 2);
        let panel = display.panel().unwrap();
        assert_eq!(panel.failed_draws, 2);
        assert!(!panel.image().unwrap().is_overlay());
        assert!(lines.lock().unwrap().iter().all(|(_, err)| !err));
    }

    #[test]
    fn panel_failure_is_logged_not_propagated() {
        let (log, lines) = recording_log();
        let mut display = LiveFrameDisplay::new(Some(RejectingPanel), log);
        display.start();
        assert!(display.is_active(), "start must not roll back");

        display.render_frame(&jpeg_fixture(8, 8, [0, 0, 0]));
        assert_eq!(display.frame_count(), 0);

        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|(m, e)| *e && m.contains("Video start error")));
        assert!(lines.iter().any(|(m, e)| *e && m.contains("Frame render error")));
    }

    #[test]
    fn zero_sized_panel_swallows_overlay_failure() {
        let (log, _) = recording_log();
        let mut display = LiveFrameDisplay::new(Some(MemoryPanel::new(0, 0)), log);
        display.start();
        display.render_frame(b"garbage");
        assert!(display.panel().unwrap().image().is_none());
    }

    #[test]
    fn test_message_ignores_active_state() {
        let (mut display, _) = display();
        display.show_test_message();
        let caption = display.panel().unwrap().image().unwrap().caption().unwrap().to_string();
        assert!(caption.starts_with("TEST MODE"));

        display.start();
        display.show_test_message();
        assert_eq!(display.panel().unwrap().image_updates(), 2);
    }

    #[test]
    fn start_then_stop_clears_image() {
        let (mut display, _) = display();
        display.start();
        display.render_frame(&jpeg_fixture(8, 8, [0, 0, 0]));
        display.stop();

        assert!(!display.is_active());
        let panel = display.panel().unwrap();
        assert!(panel.image().is_none());
        assert_eq!(panel.released(), 1);
        assert_eq!(panel.background(), Rgb888::BLACK);
    }

    #[test]
    fn stop_logs_even_when_inactive() {
        let (mut display, lines) = display();
        display.stop();
        assert!(
            lines
                .lock()
                .unwrap()
                .iter()
                .any(|(m, _)| m == "Video display stopped")
        );
    }

    #[test]
    fn restart_resets_counter() {
        let (mut display, _) = display();
        display.start();
        display.render_frame(&jpeg_fixture(8, 8, [0, 0, 0]));
        display.stop();
        display.start();
        assert_eq!(display.frame_count(), 0);
    }

    #[test]
    fn teardown_stops_and_logs_cleanup() {
        let (mut display, lines) = display();
        display.start();
        display.teardown();
        let lines = lines.lock().unwrap();
        assert_eq!(lines.last().unwrap().0, "Live frame display cleaned up");
    }
}
