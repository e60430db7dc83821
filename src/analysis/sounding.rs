/// Sounding view handed to the skew-T renderer.

use serde::Serialize;

use crate::model::NormalizedFrame;
use crate::store::decimate;
use crate::thermo::altitude_from_pressure;

/// One plotted level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundingPoint {
    pub press: f64,
    /// Geometric height, m. Falls back to the ISA height of `press`.
    pub hght: Option<f64>,
    pub temp: f64,
    pub dwpt: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wdir: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wspd: Option<f64>,
}

impl From<&NormalizedFrame> for SoundingPoint {
    fn from(frame: &NormalizedFrame) -> Self {
        Self {
            press: frame.pressure,
            hght: frame
                .altitude
                .filter(|a| a.is_finite())
                .or_else(|| altitude_from_pressure(frame.pressure)),
            temp: frame.temp,
            dwpt: frame.dewpoint,
            wdir: frame.wind_dir,
            wspd: frame.wind_speed,
        }
    }
}

/// Frames at or below the `min_pressure` level, surface first.
///
/// `frames` must already be sorted by descending pressure, as returned by
/// `TelemetryStore::ordered_by_pressure_descending`.
pub fn lower_profile(frames: &[NormalizedFrame], min_pressure: f64) -> Vec<NormalizedFrame> {
    frames
        .iter()
        .filter(|f| f.pressure.is_finite() && f.pressure >= min_pressure)
        .cloned()
        .collect()
}

/// Builds the decimated plot sequence for the renderer.
pub fn build_sounding(
    frames: &[NormalizedFrame],
    min_pressure: f64,
    decimate_factor: usize,
) -> Vec<SoundingPoint> {
    let lower = lower_profile(frames, min_pressure);
    decimate(&lower, decimate_factor)
        .iter()
        .map(SoundingPoint::from)
        .filter(|p| p.press.is_finite() && p.temp.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrameKey;

    fn level(key: i64, pressure: f64, altitude: Option<f64>) -> NormalizedFrame {
        NormalizedFrame {
            key: FrameKey::Number(key),
            temp: 10.0,
            humidity: 40.0,
            dewpoint: -2.0,
            pressure,
            altitude,
            datetime: None,
            lat: None,
            lon: None,
            wind_dir: Some(270.0),
            wind_speed: Some(12.0),
            vel_v: Some(5.0),
        }
    }

    #[test]
    fn test_levels_above_cap_are_dropped() {
        let frames = vec![
            level(1, 1000.0, Some(100.0)),
            level(2, 300.0, Some(9100.0)),
            level(3, 250.0, Some(10300.0)),
        ];
        let sounding = build_sounding(&frames, 300.0, 1);
        assert_eq!(sounding.len(), 2);
        assert_eq!(sounding[1].press, 300.0);
    }

    #[test]
    fn test_height_falls_back_to_standard_atmosphere() {
        let sounding = build_sounding(&[level(1, 850.0, None)], 300.0, 1);
        let h = sounding[0].hght.expect("ISA height for a positive pressure");
        assert!((h - 1457.0).abs() < 5.0, "unexpected ISA height {}", h);
    }

    #[test]
    fn test_decimation_keeps_top_level() {
        let frames: Vec<NormalizedFrame> = (0..60)
            .map(|i| level(i, 1000.0 - i as f64 * 10.0, None))
            .collect();
        let sounding = build_sounding(&frames, 300.0, 25);
        assert_eq!(sounding.first().map(|p| p.press), Some(1000.0));
        assert_eq!(sounding.last().map(|p| p.press), Some(410.0));
        assert_eq!(sounding.len(), 4);
    }
}
