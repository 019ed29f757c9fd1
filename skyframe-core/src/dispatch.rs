//! UI-thread dispatch for the display adapter.
//!
//! The panel and the [`LiveFrameDisplay`] that drives it live on the UI
//! thread inside a [`UiLoop`]. Everything else talks to them through a
//! cloneable [`DisplayHandle`], which posts [`UiCommand`]s and returns
//! immediately. The loop applies commands in the order they were posted,
//! exactly once each.
//!
//! ```text
//! link task ──render_frame──►┐
//! operator  ──show_test────► ├─ mpsc ─► UiLoop (UI thread) ─► LiveFrameDisplay ─► Panel
//! shutdown  ──shutdown─────► ┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::display::LiveFrameDisplay;
use crate::error::SkyframeError;
use crate::panel::Panel;

// ── UiCommand ────────────────────────────────────────────────────

/// Work posted to the UI thread.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Start,
    RenderFrame(Bytes),
    ShowTestMessage,
    Stop,
    /// Tear the display down and close the loop.
    Shutdown,
}

// ── QueuePolicy ──────────────────────────────────────────────────

/// What to do with frames posted faster than the UI thread drains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Queue everything on the UI loop.
    #[default]
    Unbounded,
    /// Drop incoming frames while this many are already pending.
    DropNewest(usize),
}

impl QueuePolicy {
    /// `0` means unbounded.
    pub fn from_max_pending(max_pending: usize) -> Self {
        if max_pending == 0 {
            QueuePolicy::Unbounded
        } else {
            QueuePolicy::DropNewest(max_pending)
        }
    }
}

/// Outcome of posting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    Dropped,
}

#[derive(Debug, Default)]
struct QueueState {
    pending_frames: AtomicUsize,
    dropped_frames: AtomicU64,
}

// ── DisplayHandle ────────────────────────────────────────────────

/// Thread-safe, fire-and-forget access to a display on the UI thread.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    tx: mpsc::UnboundedSender<UiCommand>,
    state: Arc<QueueState>,
    policy: QueuePolicy,
    ui_thread: ThreadId,
}

impl DisplayHandle {
    /// Post a frame for rendering. Never blocks.
    pub fn render_frame(&self, data: impl Into<Bytes>) -> Result<Delivery, SkyframeError> {
        let pending = &self.state.pending_frames;
        match self.policy {
            QueuePolicy::Unbounded => {
                pending.fetch_add(1, Ordering::AcqRel);
            }
            QueuePolicy::DropNewest(limit) => {
                // Check and reserve atomically; pending never exceeds `limit`.
                let reserved = pending
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < limit).then_some(n + 1)
                    })
                    .is_ok();
                if !reserved {
                    let dropped = self.state.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(dropped, limit, "UI loop behind; dropping frame");
                    return Ok(Delivery::Dropped);
                }
            }
        }

        self.trace_post("render_frame");
        if let Err(e) = self.tx.send(UiCommand::RenderFrame(data.into())) {
            self.state.pending_frames.fetch_sub(1, Ordering::AcqRel);
            return Err(e.into());
        }
        Ok(Delivery::Queued)
    }

    pub fn start(&self) -> Result<(), SkyframeError> {
        self.post(UiCommand::Start)
    }

    pub fn stop(&self) -> Result<(), SkyframeError> {
        self.post(UiCommand::Stop)
    }

    pub fn show_test_message(&self) -> Result<(), SkyframeError> {
        self.post(UiCommand::ShowTestMessage)
    }

    pub fn shutdown(&self) -> Result<(), SkyframeError> {
        self.post(UiCommand::Shutdown)
    }

    fn post(&self, cmd: UiCommand) -> Result<(), SkyframeError> {
        self.trace_post(&format!("{cmd:?}"));
        self.tx.send(cmd)?;
        Ok(())
    }

    /// Posts from the UI thread still go through the queue so they run
    /// after anything already posted.
    fn trace_post(&self, what: &str) {
        if self.is_ui_thread() {
            trace!(command = what, "posted from UI thread; runs on next pump");
        } else {
            trace!(command = what, "marshalled to UI thread");
        }
    }

    /// Whether the caller is already on the UI thread.
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    /// Frames posted but not yet rendered.
    pub fn pending_frames(&self) -> usize {
        self.state.pending_frames.load(Ordering::Acquire)
    }

    /// Frames discarded by [`QueuePolicy::DropNewest`].
    pub fn dropped_frames(&self) -> u64 {
        self.state.dropped_frames.load(Ordering::Relaxed)
    }

    /// Whether the UI loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── UiLoop ───────────────────────────────────────────────────────

/// Owns the display on the UI thread and applies posted commands.
pub struct UiLoop<P: Panel> {
    display: Option<LiveFrameDisplay<P>>,
    rx: mpsc::UnboundedReceiver<UiCommand>,
    state: Arc<QueueState>,
}

impl<P: Panel> UiLoop<P> {
    /// Create a loop bound to the calling thread.
    pub fn new(display: LiveFrameDisplay<P>, policy: QueuePolicy) -> (Self, DisplayHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::default());
        let handle = DisplayHandle {
            tx,
            state: Arc::clone(&state),
            policy,
            ui_thread: thread::current().id(),
        };
        let ui = Self {
            display: Some(display),
            rx,
            state,
        };
        (ui, handle)
    }

    /// The display, until the loop has shut down.
    pub fn display(&self) -> Option<&LiveFrameDisplay<P>> {
        self.display.as_ref()
    }

    pub fn display_mut(&mut self) -> Option<&mut LiveFrameDisplay<P>> {
        self.display.as_mut()
    }

    pub fn is_closed(&self) -> bool {
        self.display.is_none()
    }

    /// Apply every command queued so far without waiting.
    ///
    /// Hosts with their own message pump call this once per iteration.
    /// Returns the number of commands applied.
    pub fn run_pending(&mut self) -> usize {
        let mut applied = 0;
        while !self.is_closed() {
            match self.rx.try_recv() {
                Ok(cmd) => {
                    self.apply(cmd);
                    applied += 1;
                }
                Err(_) => break,
            }
        }
        applied
    }

    /// Block the current thread applying commands until shutdown is
    /// posted or every handle is dropped.
    ///
    /// Must not be called from inside an async runtime.
    pub fn run(mut self) {
        while !self.is_closed() {
            match self.rx.blocking_recv() {
                Some(cmd) => self.apply(cmd),
                None => break,
            }
        }
        self.close();
    }

    fn apply(&mut self, cmd: UiCommand) {
        if let UiCommand::Shutdown = cmd {
            self.close();
            return;
        }
        let Some(display) = self.display.as_mut() else {
            return;
        };
        match cmd {
            UiCommand::Start => display.start(),
            UiCommand::RenderFrame(data) => {
                self.state.pending_frames.fetch_sub(1, Ordering::AcqRel);
                display.render_frame(&data);
            }
            UiCommand::ShowTestMessage => display.show_test_message(),
            UiCommand::Stop => display.stop(),
            UiCommand::Shutdown => {}
        }
    }

    fn close(&mut self) {
        self.rx.close();
        if let Some(display) = self.display.take() {
            debug!("ui loop closing");
            display.teardown();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tests::jpeg_fixture;
    use crate::log::DisplayLog;
    use crate::panel::MemoryPanel;

    fn ui_loop(policy: QueuePolicy) -> (UiLoop<MemoryPanel>, DisplayHandle) {
        let log: Arc<dyn DisplayLog> = Arc::new(|_: &str, _: bool| {});
        let display = LiveFrameDisplay::new(Some(MemoryPanel::new(64, 48)), log);
        UiLoop::new(display, policy)
    }

    #[test]
    fn posting_defers_until_pumped() {
        let (mut ui, handle) = ui_loop(QueuePolicy::Unbounded);
        handle.start().unwrap();
        handle.render_frame(jpeg_fixture(8, 8, [9, 9, 9])).unwrap();

        assert!(!ui.display().unwrap().is_active());
        assert_eq!(handle.pending_frames(), 1);

        assert_eq!(ui.run_pending(), 2);
        assert_eq!(ui.display().unwrap().frame_count(), 1);
        assert_eq!(handle.pending_frames(), 0);
    }

    #[test]
    fn handle_knows_ui_thread() {
        let (_ui, handle) = ui_loop(QueuePolicy::Unbounded);
        assert!(handle.is_ui_thread());
        let remote = handle.clone();
        let on_ui = thread::spawn(move || remote.is_ui_thread()).join().unwrap();
        assert!(!on_ui);
    }

    #[test]
    fn drop_newest_caps_pending_frames() {
        let (mut ui, handle) = ui_loop(QueuePolicy::DropNewest(2));
        handle.start().unwrap();
        let jpeg = jpeg_fixture(8, 8, [1, 1, 1]);

        assert_eq!(handle.render_frame(jpeg.clone()).unwrap(), Delivery::Queued);
        assert_eq!(handle.render_frame(jpeg.clone()).unwrap(), Delivery::Queued);
        assert_eq!(handle.render_frame(jpeg.clone()).unwrap(), Delivery::Dropped);
        assert_eq!(handle.dropped_frames(), 1);

        ui.run_pending();
        assert_eq!(ui.display().unwrap().frame_count(), 2);

        // Room again once drained.
        assert_eq!(handle.render_frame(jpeg).unwrap(), Delivery::Queued);
    }

    #[test]
    fn concurrent_posters_never_exceed_the_cap() {
        let (mut ui, handle) = ui_loop(QueuePolicy::DropNewest(3));
        handle.start().unwrap();
        let frame = Bytes::from(jpeg_fixture(8, 8, [4, 4, 4]));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                let frame = frame.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    (0..50)
                        .filter(|_| handle.render_frame(frame.clone()).unwrap() == Delivery::Queued)
                        .count()
                })
            })
            .collect();
        let queued: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

        // Nothing is drained while the workers post, so the cap is exact.
        assert_eq!(queued, 3);
        assert_eq!(handle.pending_frames(), 3);
        assert_eq!(handle.dropped_frames(), 8 * 50 - 3);

        ui.run_pending();
        assert_eq!(ui.display().unwrap().frame_count(), 3);
    }

    #[test]
    fn shutdown_tears_down_and_closes() {
        let (mut ui, handle) = ui_loop(QueuePolicy::Unbounded);
        handle.start().unwrap();
        handle.shutdown().unwrap();
        handle.stop().unwrap();

        // The stop queued behind the shutdown is never applied.
        assert_eq!(ui.run_pending(), 2);
        assert!(ui.is_closed());
        assert!(handle.is_closed());
        assert!(matches!(
            handle.render_frame(vec![1u8]),
            Err(SkyframeError::ChannelClosed)
        ));
    }

    #[test]
    fn queue_policy_from_max_pending() {
        assert_eq!(QueuePolicy::from_max_pending(0), QueuePolicy::Unbounded);
        assert_eq!(QueuePolicy::from_max_pending(3), QueuePolicy::DropNewest(3));
    }
}
