use crate::frame::Rotation;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BarcamConfig {
    pub camera: CameraConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Rotation applied to the live preview
    #[serde(default)]
    pub preview_rotation: Option<Rotation>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScanConfig {
    /// Delay before the first sample so the capture pipeline can settle
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// Upper bound on a single frame grab in milliseconds (0 disables the bound)
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Maximum decode attempts per session (0 = keep sampling until cancelled)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Ask the device to refocus before every sample
    #[serde(default = "default_continuous_focus")]
    pub continuous_focus: bool,
}

impl ScanConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn frame_timeout(&self) -> Option<Duration> {
        (self.frame_timeout_ms > 0).then(|| Duration::from_millis(self.frame_timeout_ms))
    }

    pub fn attempt_limit(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }
}

impl BarcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("barcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("scan.startup_delay_ms", default_startup_delay_ms())?
            .set_default("scan.frame_timeout_ms", default_frame_timeout_ms())?
            .set_default("scan.max_attempts", default_max_attempts())?
            .set_default("scan.continuous_focus", default_continuous_focus())?
            .add_source(File::with_name(&path_str).required(false))
            // BARCAM_SCAN__MAX_ATTEMPTS=10 style overrides
            .add_source(
                Environment::with_prefix("BARCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: BarcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.scan.startup_delay_ms > 10_000 {
            return Err(ConfigError::Message(
                "Scan startup_delay_ms must not exceed 10000".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            resolution: default_camera_resolution(),
            fps: default_camera_fps(),
            preview_rotation: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay_ms(),
            frame_timeout_ms: default_frame_timeout_ms(),
            max_attempts: default_max_attempts(),
            continuous_focus: default_continuous_focus(),
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_startup_delay_ms() -> u64 {
    100
}
fn default_frame_timeout_ms() -> u64 {
    5000
}
fn default_max_attempts() -> u32 {
    0
}
fn default_continuous_focus() -> bool {
    true
}
