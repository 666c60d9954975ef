//! Configuration for the board and host processes
//!
//! Loaded from a TOML file; every key has a default so an empty file (or no
//! file at all) yields the stock deployment: board on port 12345, host
//! targeting 10.0.40.40.

use crate::detection::Detection;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DrishtiConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Network settings shared by both sides
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Board address the host connects to (default: 10.0.40.40)
    #[serde(default = "default_board_ip")]
    pub board_ip: String,

    /// Interface the board listens on (default: 0.0.0.0)
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    /// TCP port (default: 12345)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host connect timeout in milliseconds (default: none, OS default)
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Receive deadline in milliseconds (default: none, block forever)
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,

    /// Send deadline in milliseconds (default: none, block forever)
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
}

/// Board (edge device) settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BoardConfig {
    /// Image file or directory of demo scenes (default: ~/code/scenes)
    #[serde(default = "default_image_path")]
    pub image_path: String,

    /// Model `.prototxt` holding class names (default: none, numeric labels)
    #[serde(default)]
    pub labels_path: Option<String>,

    /// Random seed for scene selection; 0 uses OS entropy (default: 0)
    #[serde(default)]
    pub seed: u64,

    /// Also write annotated images to a `results/` directory beside the
    /// source image (default: false)
    #[serde(default)]
    pub save_results: bool,
}

/// Host (requester) settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HostConfig {
    /// Ask for the raw image (default: true)
    #[serde(default = "default_true")]
    pub want_image: bool,

    /// Ask for the annotated image (default: true)
    #[serde(default = "default_true")]
    pub want_bounding_box_image: bool,

    /// Lower bound of the pause between requests in seconds (default: 5)
    #[serde(default = "default_min_sleep")]
    pub min_sleep_secs: u64,

    /// Upper bound of the pause between requests in seconds (default: 20)
    #[serde(default = "default_max_sleep")]
    pub max_sleep_secs: u64,

    /// Directory for received images (default: current directory)
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Random seed for sleep jitter; 0 uses OS entropy (default: 0)
    #[serde(default)]
    pub seed: u64,
}

/// Replay detector settings
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Detections returned for every image
    #[serde(default)]
    pub detections: Vec<Detection>,
}

fn default_board_ip() -> String {
    "10.0.40.40".to_string()
}

fn default_bind_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12345
}

fn default_image_path() -> String {
    "~/code/scenes".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_sleep() -> u64 {
    5
}

fn default_max_sleep() -> u64 {
    20
}

fn default_output_dir() -> String {
    ".".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            board_ip: default_board_ip(),
            bind_ip: default_bind_ip(),
            port: default_port(),
            connect_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
            labels_path: None,
            seed: 0,
            save_results: false,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            want_image: true,
            want_bounding_box_image: true,
            min_sleep_secs: default_min_sleep(),
            max_sleep_secs: default_max_sleep(),
            output_dir: default_output_dir(),
            seed: 0,
        }
    }
}

impl ConnectionConfig {
    /// Address the host connects to
    pub fn board_addr(&self) -> String {
        format!("{}:{}", self.board_ip, self.port)
    }

    /// Address the board listens on
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

impl DrishtiConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DrishtiConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the sessions cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.min_sleep_secs > self.host.max_sleep_secs {
            return Err(Error::Config(format!(
                "host.min_sleep_secs ({}) exceeds host.max_sleep_secs ({})",
                self.host.min_sleep_secs, self.host.max_sleep_secs
            )));
        }
        for (i, det) in self.detector.detections.iter().enumerate() {
            if !(0.0..=1.0).contains(&det.score) {
                return Err(Error::Config(format!(
                    "detector.detections[{}].score {} outside [0, 1]",
                    i, det.score
                )));
            }
        }
        Ok(())
    }
}
