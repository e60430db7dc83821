/// Service configuration loaded from `skewt.toml`.
///
/// Every tunable the pipeline uses lives here rather than as a literal in
/// the stage that consumes it. All sections and fields are optional in the
/// file; anything missing takes the built-in default.
///
/// ```toml
/// [pipeline]
/// ascent_rate_threshold = 3.5
/// burst_min_ascent_frames = 300
/// burst_descent_run = 10
///
/// [convection]
/// method = "temple"   # or "parcel"
///
/// [sondehub]
/// default_site = "94672"
/// ```

use serde::Deserialize;
use std::path::Path;

use crate::analysis::convection::ConvectionMethod;
use crate::model::SondeError;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./skewt.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Frame filtering and flight-phase thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames climbing slower than this (m/s) are not part of the ascent.
    pub ascent_rate_threshold: f64,
    /// Confirmed ascending frames required before a burst is considered.
    pub burst_min_ascent_frames: u32,
    /// Descending frames in a row needed to freeze the burst cutoff.
    pub burst_descent_run: u32,
    /// Vertical speed (m/s) below which a frame counts as clearly descending.
    pub descent_rate_threshold: f64,
    /// Relative humidity (%) below which the sensor is considered uncalibrated.
    pub min_humidity: f64,
    /// Temperatures (°C) below this are sensor faults.
    pub min_temperature: f64,
    /// Stride used when thinning the sounding for display.
    pub decimate_factor: usize,
    /// Live frames between render signals.
    pub live_render_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ascent_rate_threshold: 3.5,
            burst_min_ascent_frames: 300,
            burst_descent_run: 10,
            descent_rate_threshold: -1.0,
            min_humidity: 0.5,
            min_temperature: -272.0,
            decimate_factor: 25,
            live_render_every: 30,
        }
    }
}

/// Convection-height estimator settings and scan domain.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvectionSettings {
    pub method: ConvectionMethod,
    /// Levels above this pressure (hPa) are ignored.
    pub min_pressure: f64,
    pub min_temp: i32,
    pub max_temp: i32,
    pub max_feet: f64,
}

impl Default for ConvectionSettings {
    fn default() -> Self {
        Self {
            method: ConvectionMethod::Temple,
            min_pressure: 300.0,
            min_temp: 0,
            max_temp: 50,
            max_feet: 20000.0,
        }
    }
}

/// SondeHub API settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SondeHubConfig {
    pub api_base: String,
    /// History window requested from the API, seconds.
    pub range_secs: u64,
    pub default_site: String,
    pub timeout_secs: u64,
}

impl Default for SondeHubConfig {
    fn default() -> Self {
        Self {
            api_base: crate::ingest::sondehub::DEFAULT_API_BASE.to_string(),
            range_secs: 43200,
            default_site: crate::sites::DEFAULT_SITE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub pipeline: PipelineConfig,
    pub convection: ConvectionSettings,
    pub sondehub: SondeHubConfig,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses configuration from TOML text.
pub fn parse_config(text: &str) -> Result<ServiceConfig, SondeError> {
    let config: ServiceConfig =
        toml::from_str(text).map_err(|e| SondeError::ConfigError(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Reads and parses a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, SondeError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| SondeError::ConfigError(format!("{}: {}", path.display(), e)))?;
    parse_config(&text)
}

/// Like [`load_config`], but a missing file yields the defaults.
/// A file that exists and is invalid is still an error.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<ServiceConfig, SondeError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }
    load_config(path)
}

fn validate(config: &ServiceConfig) -> Result<(), SondeError> {
    let c = &config.convection;
    if c.min_temp > c.max_temp {
        return Err(SondeError::ConfigError(format!(
            "convection.min_temp ({}) must not exceed convection.max_temp ({})",
            c.min_temp, c.max_temp
        )));
    }
    if c.max_feet <= 0.0 {
        return Err(SondeError::ConfigError(
            "convection.max_feet must be positive".to_string(),
        ));
    }
    if config.pipeline.live_render_every == 0 {
        return Err(SondeError::ConfigError(
            "pipeline.live_render_every must be at least 1".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
