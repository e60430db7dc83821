/// RawFrame, NormalizedFrame, FrameKey, ConvectionCrossing, SondeError
/// core data structures and error handling
///
/// Core data types for the radiosonde sounding service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no pipeline logic and no I/O: only types, plus the timestamp
/// parser every stage agrees on.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Frame identity
// ---------------------------------------------------------------------------

/// Unique identifier of a telemetry frame.
///
/// SondeHub sends the frame counter as a JSON number, but some decoders
/// upload it as a string, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FrameKey {
    Number(i64),
    Text(String),
}

impl FrameKey {
    /// An empty string identifier is treated the same as no identifier.
    pub fn is_blank(&self) -> bool {
        matches!(self, FrameKey::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKey::Number(n) => write!(f, "{}", n),
            FrameKey::Text(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame types
// ---------------------------------------------------------------------------

/// A single telemetry frame as delivered by the history API or the live feed.
///
/// Every field is optional on the wire; validation happens in
/// `ingest::normalize`, never during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawFrame {
    pub frame: Option<FrameKey>,
    pub serial: Option<String>,
    pub datetime: Option<String>,      // ISO 8601, e.g. "2024-05-01T23:15:02.000000Z"
    pub time_received: Option<String>, // fallback when `datetime` is absent
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,      // geometric altitude, m
    pub pressure: Option<f64>, // hPa
    pub temp: Option<f64>,     // °C
    pub humidity: Option<f64>, // %
    pub heading: Option<f64>,  // sonde direction of travel, degrees
    pub vel_h: Option<f64>,    // horizontal speed, m/s
    pub vel_v: Option<f64>,    // vertical speed, m/s (positive = ascending)
}

impl RawFrame {
    /// The frame's own timestamp, used for burst detection and cutoff checks.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.datetime.as_deref().and_then(parse_timestamp)
    }

    /// The best available timestamp: `datetime`, then `time_received`.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp()
            .or_else(|| self.time_received.as_deref().and_then(parse_timestamp))
    }
}

/// A validated sounding sample.
///
/// Pressure and temperature are always present and finite; dewpoint is
/// derived from temperature and relative humidity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFrame {
    pub key: FrameKey,
    pub temp: f64,
    pub humidity: f64,
    pub dewpoint: f64,
    pub pressure: f64,
    pub altitude: Option<f64>,
    pub datetime: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Direction the wind blows from, degrees. The sonde drifts with the
    /// wind, so this is its heading reversed.
    pub wind_dir: Option<f64>,
    pub wind_speed: Option<f64>,
    pub vel_v: Option<f64>,
}

// ---------------------------------------------------------------------------
// Convection output
// ---------------------------------------------------------------------------

/// Estimated thermal/cloud height for one integer surface temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvectionCrossing {
    pub temp: i32,
    pub feet: f64,
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parses a SondeHub timestamp into UTC.
///
/// Accepts RFC 3339 with any offset, and falls back to a naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` string interpreted as UTC. Returns `None`
/// for anything else.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching, parsing or configuring the service.
///
/// Physically implausible telemetry is never an error; it is filtered.
#[derive(Debug, PartialEq)]
pub enum SondeError {
    /// Non-2xx HTTP response from the SondeHub API.
    HttpError(u16),
    /// A response body or live payload could not be deserialized.
    ParseError(String),
    /// The sonde or site exists but produced no usable frames.
    NoFramesAvailable(String),
    /// The configuration file is unreadable or invalid.
    ConfigError(String),
}

impl fmt::Display for SondeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SondeError::HttpError(code) => write!(f, "HTTP error: {}", code),
            SondeError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SondeError::NoFramesAvailable(serial) => {
                write!(f, "No frames available for sonde: {}", serial)
            }
            SondeError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for SondeError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
