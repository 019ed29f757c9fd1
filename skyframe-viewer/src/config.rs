//! Viewer configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Payload link settings.
    pub link: LinkConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// UI queue tuning.
    pub queue: QueueConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// How the payload link is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Radio modem on a serial port.
    Serial,
    /// Bench setup streaming over TCP.
    Tcp,
}

/// Payload link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub kind: LinkKind,
    /// Serial device, e.g. `/dev/ttyUSB0` or `COM3`.
    pub serial_port: String,
    pub baud_rate: u32,
    /// TCP peer address (IP:port).
    pub tcp_address: String,
    /// TCP connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Largest JPEG accepted from the link, in bytes.
    pub max_frame_size: usize,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Initial panel width.
    pub width: u32,
    /// Initial panel height.
    pub height: u32,
    /// Window title.
    pub title: String,
    /// PNG written by the headless panel.
    pub snapshot_path: PathBuf,
}

/// UI queue tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Frames allowed to wait for the UI thread; 0 queues without limit.
    pub max_pending: usize,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            kind: LinkKind::Serial,
            serial_port: default_serial_port().into(),
            baud_rate: 57_600,
            tcp_address: "127.0.0.1:7340".into(),
            timeout_ms: 5000,
            max_frame_size: skyframe_core::codec::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

fn default_serial_port() -> &'static str {
    if cfg!(target_os = "windows") {
        "COM3"
    } else {
        "/dev/ttyUSB0"
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            title: "Skyframe Payload Video".into(),
            snapshot_path: PathBuf::from("skyframe-latest.png"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ViewerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("baud_rate"));
        assert!(text.contains("snapshot_path"));
        assert!(text.contains("kind = \"serial\""));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.display.width, 640);
        assert_eq!(parsed.link.baud_rate, 57_600);
        assert_eq!(parsed.queue.max_pending, 0);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: ViewerConfig = toml::from_str(
            r#"
            [link]
            kind = "tcp"
            tcp_address = "10.0.0.5:9000"

            [queue]
            max_pending = 4
            "#,
        )
        .unwrap();
        assert_eq!(parsed.link.kind, LinkKind::Tcp);
        assert_eq!(parsed.link.tcp_address, "10.0.0.5:9000");
        assert_eq!(parsed.link.baud_rate, 57_600);
        assert_eq!(parsed.queue.max_pending, 4);
        assert_eq!(parsed.display.height, 480);
    }

    #[test]
    fn load_falls_back_on_missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ViewerConfig::load(&dir.path().join("absent.toml"));
        assert_eq!(missing.display.width, 640);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "link = [[[").unwrap();
        assert_eq!(ViewerConfig::load(&bad).link.baud_rate, 57_600);

        let written = dir.path().join("default.toml");
        ViewerConfig::write_default(&written).unwrap();
        assert_eq!(ViewerConfig::load(&written).display.title, "Skyframe Payload Video");
    }
}
