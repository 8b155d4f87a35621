//! Configuration management for crabview
//!
//! Loads and saves the default camera parameters and controller behaviour
//! from a TOML file.

use crate::controller::ControllerSettings;
use crate::errors::CameraError;
use crate::types::{
    Audio, Facing, Flash, Hdr, Parameters, SessionType, VideoQuality, WhiteBalance,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabViewConfig {
    pub camera: CameraConfig,
    pub controller: ControllerSettings,
}

/// Parameter values in effect before the first open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub facing: Facing,
    pub session_type: SessionType,
    /// Normalized zoom (0.0-1.0)
    pub zoom: f32,
    /// Exposure compensation in EV
    pub exposure_correction: f32,
    pub flash: Flash,
    pub white_balance: WhiteBalance,
    pub hdr: Hdr,
    pub audio: Audio,
    pub video_quality: VideoQuality,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let params = Parameters::default();
        Self {
            facing: params.facing,
            session_type: params.session_type,
            zoom: params.zoom,
            exposure_correction: params.exposure_correction,
            flash: params.flash,
            white_balance: params.white_balance,
            hdr: params.hdr,
            audio: params.audio,
            video_quality: params.video_quality,
        }
    }
}

impl CameraConfig {
    pub fn parameters(&self) -> Parameters {
        Parameters {
            facing: self.facing,
            session_type: self.session_type,
            zoom: self.zoom,
            exposure_correction: self.exposure_correction,
            flash: self.flash,
            white_balance: self.white_balance,
            hdr: self.hdr,
            audio: self.audio,
            video_quality: self.video_quality,
        }
    }
}

impl CrabViewConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabViewConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CameraError::Config)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabview.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.camera.zoom) {
            return Err("Zoom must be between 0.0 and 1.0".to_string());
        }
        if !self.camera.exposure_correction.is_finite() {
            return Err("Exposure correction must be a finite number".to_string());
        }
        if self.controller.thread_name.trim().is_empty() {
            return Err("Controller thread name must not be empty".to_string());
        }
        Ok(())
    }
}
