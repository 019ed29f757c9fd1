//! Skyframe viewer: entry point.
//!
//! ```text
//! skyframe-viewer                        Listen on the configured link
//! skyframe-viewer --serial /dev/ttyUSB1  Override the serial port
//! skyframe-viewer --tcp 10.0.0.5:7340    Read frames from a TCP bench feed
//! skyframe-viewer --headless             Write frames to a PNG instead of a window
//! skyframe-viewer --gen-config           Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use skyframe_core::{
    DisplayHandle, FrameCodec, FrameReceiver, LiveFrameDisplay, Panel, QueuePolicy, TracingLog,
    UiLoop,
};

use skyframe_viewer::config::{LinkKind, ViewerConfig};
use skyframe_viewer::display::WindowPanel;
use skyframe_viewer::link;
use skyframe_viewer::snapshot::SnapshotPanel;
use skyframe_viewer::window::{NativeWindow, WindowEvent};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "skyframe-viewer", about = "Payload camera live video viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "skyframe-viewer.toml")]
    config: PathBuf,

    /// Serial port to read frames from (overrides config).
    #[arg(long, conflicts_with = "tcp")]
    serial: Option<String>,

    /// TCP address to read frames from (overrides config). Example: 127.0.0.1:7340
    #[arg(long)]
    tcp: Option<String>,

    /// Write frames to the snapshot PNG instead of opening a window.
    #[arg(long)]
    headless: bool,

    /// Show the test overlay once the display starts.
    #[arg(long)]
    test_message: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(port) = cli.serial {
        config.link.kind = LinkKind::Serial;
        config.link.serial_port = port;
    }
    if let Some(addr) = cli.tcp {
        config.link.kind = LinkKind::Tcp;
        config.link.tcp_address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("skyframe-viewer v{}", env!("CARGO_PKG_VERSION"));

    let policy = QueuePolicy::from_max_pending(config.queue.max_pending);
    let (width, height) = (config.display.width, config.display.height);

    // ── 1. Pick a panel ─────────────────────────────────────────

    let window = if cli.headless {
        None
    } else {
        match NativeWindow::create(&config.display.title, width, height) {
            Ok(window) => Some(window),
            Err(e) => {
                warn!("no native window ({e}); falling back to snapshots");
                None
            }
        }
    };

    match window {
        Some(window) => {
            let (client_w, client_h) = window.client_size();
            let panel = WindowPanel::new(window.hwnd(), client_w, client_h);
            let display = LiveFrameDisplay::new(Some(panel), Arc::new(TracingLog));
            let (ui, handle) = UiLoop::new(display, policy);
            run_session(ui, handle, &config, cli.test_message, false, |ui| {
                pump_window(&window, ui)
            })
            .await
        }
        None => {
            let panel = SnapshotPanel::new(&config.display.snapshot_path, width, height);
            info!(path = %panel.path().display(), "writing frames to snapshot");
            let display = LiveFrameDisplay::new(Some(panel), Arc::new(TracingLog));
            let (ui, handle) = UiLoop::new(display, policy);
            run_session(ui, handle, &config, cli.test_message, true, |_| true).await
        }
    }
}

/// Drain window messages into the panel. Returns `false` once the
/// operator has asked to close the window.
fn pump_window(window: &NativeWindow, ui: &mut UiLoop<WindowPanel>) -> bool {
    let mut open = true;
    for ev in window.poll_events() {
        match ev {
            WindowEvent::Close => open = false,
            WindowEvent::Resize(w, h) => {
                if let Some(panel) = ui.display_mut().and_then(|d| d.panel_mut()) {
                    panel.resize(w, h);
                }
            }
            WindowEvent::Paint => {
                if let Some(panel) = ui.display().and_then(|d| d.panel()) {
                    panel.repaint();
                }
            }
        }
    }
    open
}

/// Start the display, connect the link and run the UI loop on this
/// thread until shutdown.
async fn run_session<P, F>(
    mut ui: UiLoop<P>,
    handle: DisplayHandle,
    config: &ViewerConfig,
    test_message: bool,
    exit_with_link: bool,
    mut poll: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: Panel,
    F: FnMut(&mut UiLoop<P>) -> bool,
{
    handle.start()?;
    if test_message {
        handle.show_test_message()?;
    }
    ui.run_pending();

    // ── 2. Connect the payload link ─────────────────────────────

    let link_done = Arc::new(AtomicBool::new(false));
    let receiver = FrameReceiver::new(FrameCodec::with_max_frame_size(
        config.link.max_frame_size,
    ));
    let stats_rx = receiver.stats_receiver();

    let receiver_handle = match link::open(&config.link).await {
        Ok(stream) => {
            info!("link open: {}", link::describe(&config.link));
            let done = link_done.clone();
            let display = handle.clone();
            Some(tokio::spawn(async move {
                match receiver.run(stream, display).await {
                    Ok(exit) => info!(?exit, "receiver finished"),
                    Err(e) => error!("link error: {e}"),
                }
                done.store(true, Ordering::SeqCst);
            }))
        }
        Err(e) => {
            error!("failed to open {}: {e}", link::describe(&config.link));
            link_done.store(true, Ordering::SeqCst);
            None
        }
    };

    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            let _ = ctrl_c.shutdown();
        }
    });

    // ── 3. UI loop ──────────────────────────────────────────────

    loop {
        if !poll(&mut ui) || (exit_with_link && link_done.load(Ordering::SeqCst)) {
            let _ = handle.shutdown();
        }

        ui.run_pending();
        if ui.is_closed() {
            break;
        }

        // Yield briefly so Tokio can make progress.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    if let Some(task) = receiver_handle {
        task.abort();
        let _ = task.await;
    }

    let stats = stats_rx.borrow().clone();
    info!(
        frames = stats.frames,
        bytes = stats.bytes,
        text_frames = stats.text_frames,
        dropped = handle.dropped_frames(),
        "session summary"
    );

    Ok(())
}
