/// Frame validation and conversion.
///
/// Turns one `RawFrame` into a `NormalizedFrame`, or drops it. A dropped
/// frame is not an error: pre-launch packets, uncalibrated humidity sensors
/// and post-burst descent are all routine, so the normalizer answers with
/// `None` and the caller moves on to the next frame.

use chrono::{DateTime, Utc};

use crate::config::PipelineConfig;
use crate::model::{NormalizedFrame, RawFrame};
use crate::thermo::{dewpoint_from_rh, pressure_from_altitude};

/// Validates raw frames against the configured plausibility limits.
#[derive(Debug, Clone)]
pub struct FrameNormalizer {
    ascent_rate_threshold: f64,
    min_humidity: f64,
    min_temperature: f64,
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl FrameNormalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            ascent_rate_threshold: config.ascent_rate_threshold,
            min_humidity: config.min_humidity,
            min_temperature: config.min_temperature,
        }
    }

    /// Converts a raw frame, or returns `None` when it should be dropped.
    ///
    /// A frame is dropped when it has no identifier, is timestamped after a
    /// frozen `descent_cutoff`, climbs slower than the ascent threshold, has
    /// no usable pressure or temperature, reports humidity below the
    /// calibration floor (or none at all), reports a temperature below
    /// absolute zero, or yields a non-finite dewpoint.
    pub fn normalize(
        &self,
        raw: &RawFrame,
        descent_cutoff: Option<DateTime<Utc>>,
    ) -> Option<NormalizedFrame> {
        let key = raw.frame.clone().filter(|k| !k.is_blank())?;

        let timestamp = raw.timestamp();
        if let (Some(cutoff), Some(ts)) = (descent_cutoff, timestamp) {
            if ts > cutoff {
                return None;
            }
        }

        // Pre-launch, ground and descent packets
        if let Some(v) = raw.vel_v {
            if v < self.ascent_rate_threshold {
                return None;
            }
        }

        let temp = raw.temp.filter(|t| t.is_finite())?;
        let pressure = raw
            .pressure
            .filter(|p| p.is_finite() && *p > 0.0)
            .or_else(|| raw.alt.filter(|a| a.is_finite()).map(pressure_from_altitude))
            .filter(|p| p.is_finite())?;

        // 0 % readings show up while the sonde is still missing calibration data
        let humidity = raw.humidity.filter(|h| h.is_finite())?;
        if humidity < self.min_humidity {
            return None;
        }
        if temp < self.min_temperature {
            return None;
        }

        let dewpoint = dewpoint_from_rh(temp, humidity.min(100.0)).filter(|d| d.is_finite())?;

        Some(NormalizedFrame {
            key,
            temp,
            humidity,
            dewpoint,
            pressure,
            altitude: raw.alt.filter(|a| a.is_finite()),
            datetime: timestamp.or_else(|| raw.observed_at()),
            lat: raw.lat,
            lon: raw.lon,
            wind_dir: raw
                .heading
                .filter(|h| h.is_finite())
                .map(|h| (h + 180.0).rem_euclid(360.0)),
            wind_speed: raw.vel_h.filter(|s| s.is_finite()),
            vel_v: raw.vel_v,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
