// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every field has a default, so a partial (or missing) config.toml is fine.

use crate::backend::DeviceSelector;
use anyhow::{Context, Result};
use ash::vk;
use log::LevelFilter;
use serde::Deserialize;
use std::ffi::CString;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub device: DeviceConfig,
    pub debug: DebugConfig,
}

/// Window settings. The size doubles as the swapchain extent when the
/// surface lets the application choose.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Bootstrap".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Physical device requirements
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub require_geometry_shader: bool,
    /// Required on top of VK_KHR_swapchain
    pub extra_extensions: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            require_geometry_shader: true,
            extra_extensions: Vec::new(),
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: cfg!(debug_assertions),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Swapchain extent to use when the surface has no fixed size
    pub fn fallback_extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.window.width,
            height: self.window.height,
        }
    }

    pub fn extra_extensions(&self) -> Result<Vec<CString>> {
        self.device
            .extra_extensions
            .iter()
            .map(|name| {
                CString::new(name.as_str())
                    .with_context(|| format!("Invalid device extension name: {:?}", name))
            })
            .collect()
    }

    /// Selector for the `[device]` requirements
    pub fn device_selector(&self) -> Result<DeviceSelector> {
        Ok(DeviceSelector::new(
            self.extra_extensions()?,
            self.device.require_geometry_shader,
        ))
    }

    /// Log level from config, `info` if it does not parse
    pub fn log_level(&self) -> LevelFilter {
        self.debug.log_level.parse().unwrap_or_else(|_| {
            eprintln!(
                "Unknown log level '{}', defaulting to info",
                self.debug.log_level
            );
            LevelFilter::Info
        })
    }
}
