/// Convective thermal height estimation.
///
/// Both estimators sweep integer surface temperatures across the configured
/// domain (0..=50 °C by default) and report, per temperature, the height in
/// feet where a surface-heated parcel stops rising.
///
/// - **Temple** (default): the graphical method long used for soaring
///   forecasts. Works on (temperature, height) pairs only and projects each
///   level back to the surface along a 3 °C/1000 ft dry lapse.
/// - **Parcel**: lifts a parcel dry-adiabatically to the LCL and along the
///   moist adiabat above it, comparing virtual temperatures with the
///   environment.
///
/// Levels above `min_pressure` (300 hPa by default) are never used.
/// Missing data yields an empty result carrying a display message, never an
/// error.

use serde::{Deserialize, Serialize};

use crate::config::ConvectionSettings;
use crate::model::{ConvectionCrossing, NormalizedFrame};
use crate::store::pressure_desc;
use crate::thermo::{
    altitude_from_pressure, dry_adiabat_temp, lcl_pressure, mixing_ratio,
    parcel_temp_from_theta_e, theta_e, virtual_temperature,
};

pub const FEET_PER_METER: f64 = 3.28084;

pub const INSUFFICIENT_DATA: &str = "Insufficient data for convection estimate";
pub const NO_INTERSECTION: &str = "No intersection found across temperature range";

/// Temple's adjustment constant.
const TEMPLE_F: f64 = 0.9999955;
/// Dry lapse correction, °C per foot.
const TEMPLE_LAPSE_PER_FT: f64 = 0.003;

/// Which estimator `estimate` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvectionMethod {
    #[default]
    Temple,
    Parcel,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Crossing curve plus the scan domain the renderer should draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvectionResult {
    /// Ordered by increasing surface temperature.
    pub crossings: Vec<ConvectionCrossing>,
    pub min_temp: i32,
    pub max_temp: i32,
    pub max_feet: f64,
    /// Why `crossings` is empty, for display.
    pub message: Option<String>,
}

impl ConvectionResult {
    fn insufficient(settings: &ConvectionSettings) -> Self {
        Self {
            crossings: Vec::new(),
            min_temp: settings.min_temp,
            max_temp: settings.max_temp,
            max_feet: settings.max_feet,
            message: Some(INSUFFICIENT_DATA.to_string()),
        }
    }

    fn from_crossings(settings: &ConvectionSettings, crossings: Vec<ConvectionCrossing>) -> Self {
        let message = crossings.is_empty().then(|| NO_INTERSECTION.to_string());
        Self {
            crossings,
            min_temp: settings.min_temp,
            max_temp: settings.max_temp,
            max_feet: settings.max_feet,
            message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.crossings.is_empty()
    }

    /// Height for an exact integer surface temperature, if one was found.
    pub fn feet_at(&self, temp: i32) -> Option<f64> {
        self.crossings
            .iter()
            .find(|c| c.temp == temp)
            .map(|c| c.feet)
    }
}

/// One environmental level used by the estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileLevel {
    pub pressure: f64,
    pub temp: f64,
    pub dewpoint: f64,
    /// Geometric height, m; ISA height of the pressure when the frame had
    /// none, 0 as a last resort.
    pub altitude_m: f64,
}

/// Surface-first levels at or below `min_pressure` with finite pressure and
/// temperature.
pub fn profile_levels(frames: &[NormalizedFrame], min_pressure: f64) -> Vec<ProfileLevel> {
    let mut levels: Vec<ProfileLevel> = frames
        .iter()
        .filter(|f| f.pressure.is_finite() && f.pressure >= min_pressure && f.temp.is_finite())
        .map(|f| ProfileLevel {
            pressure: f.pressure,
            temp: f.temp,
            dewpoint: f.dewpoint,
            altitude_m: f
                .altitude
                .filter(|a| a.is_finite())
                .or_else(|| altitude_from_pressure(f.pressure))
                .unwrap_or(0.0),
        })
        .collect();
    levels.sort_by(|a, b| pressure_desc(a.pressure, b.pressure));
    levels
}

/// Runs the configured estimator.
pub fn estimate(frames: &[NormalizedFrame], settings: &ConvectionSettings) -> ConvectionResult {
    match settings.method {
        ConvectionMethod::Temple => temple_crossings(frames, settings),
        ConvectionMethod::Parcel => parcel_crossings(frames, settings),
    }
}

// ---------------------------------------------------------------------------
// Temple method
// ---------------------------------------------------------------------------

/// Temple graphical method.
///
/// For each consecutive pair of levels the segment is mapped into
/// (surface temperature, height) space and every integer temperature whose
/// projection lands inside the segment records a height. Later segments
/// overwrite earlier ones, so the highest matching segment wins. Heights
/// outside `(0, max_feet]` are discarded.
pub fn temple_crossings(frames: &[NormalizedFrame], settings: &ConvectionSettings) -> ConvectionResult {
    let profile: Vec<(f64, f64)> = profile_levels(frames, settings.min_pressure)
        .iter()
        .map(|l| (l.temp, l.altitude_m * FEET_PER_METER))
        .filter(|(t, h)| t.is_finite() && h.is_finite())
        .collect();
    if profile.len() < 2 {
        return ConvectionResult::insufficient(settings);
    }

    let f = TEMPLE_F;
    // Index 0 is max_temp, counting down to 1
    let temps: Vec<i32> = (1..=settings.max_temp).rev().collect();
    let mut heights: Vec<Option<f64>> = vec![None; temps.len()];

    for pair in profile.windows(2) {
        let (t_prev, h_prev) = pair[0];
        let (t, h) = pair[1];
        let d1 = f * (t_prev + TEMPLE_LAPSE_PER_FT * h_prev);
        let l1 = h_prev / f;
        let d2 = f * (t + TEMPLE_LAPSE_PER_FT * h);
        let l2 = h / f;
        if d2 == d1 {
            continue;
        }
        let m = (l2 - l1) / (d2 - d1);
        for (slot, &temp) in heights.iter_mut().zip(&temps) {
            let l = m * f * f64::from(temp) + l1 - m * d1;
            if l >= l1 && l <= l2 {
                *slot = Some(f * l);
            }
        }
    }

    let mut crossings: Vec<ConvectionCrossing> = temps
        .iter()
        .zip(&heights)
        .filter(|(temp, _)| **temp >= settings.min_temp)
        .filter_map(|(&temp, feet)| feet.map(|feet| ConvectionCrossing { temp, feet }))
        .filter(|c| c.feet.is_finite() && c.feet > 0.0 && c.feet <= settings.max_feet)
        .collect();
    crossings.sort_by_key(|c| c.temp);
    ConvectionResult::from_crossings(settings, crossings)
}

// ---------------------------------------------------------------------------
// Parcel method
// ---------------------------------------------------------------------------

/// Parcel / virtual-temperature intersection method.
///
/// Only the surface temperature is swept; the surface dewpoint stays at its
/// observed value, modelling the heating of a fixed air mass. The first
/// level where the parcel's virtual temperature drops to or below the
/// environment's (after having been above it) is linearly interpolated to a
/// height. Temperatures with no such level produce no point.
pub fn parcel_crossings(frames: &[NormalizedFrame], settings: &ConvectionSettings) -> ConvectionResult {
    let levels = profile_levels(frames, settings.min_pressure);
    if levels.len() < 2 {
        return ConvectionResult::insufficient(settings);
    }
    let sfc = levels[0];
    if !sfc.dewpoint.is_finite() {
        return ConvectionResult::insufficient(settings);
    }

    let env_tv: Vec<f64> = levels
        .iter()
        .map(|l| {
            let w = if l.dewpoint.is_finite() {
                mixing_ratio(l.pressure, l.dewpoint)
            } else {
                0.0
            };
            virtual_temperature(l.temp, w)
        })
        .collect();
    let w_surf = mixing_ratio(sfc.pressure, sfc.dewpoint);

    let mut crossings = Vec::new();
    for temp in settings.min_temp..=settings.max_temp {
        let t = f64::from(temp);
        let thetae = theta_e(t, sfc.dewpoint, sfc.pressure);
        let p_lcl = lcl_pressure(t, sfc.dewpoint, sfc.pressure);

        let mut last: Option<(f64, f64)> = None; // (diff, altitude_m)
        for (level, tv_env) in levels.iter().zip(&env_tv) {
            let (parcel_temp, w_parcel) = if level.pressure >= p_lcl {
                (dry_adiabat_temp(t, sfc.pressure, level.pressure), w_surf)
            } else {
                let pt = parcel_temp_from_theta_e(thetae, level.pressure);
                (pt, mixing_ratio(level.pressure, pt))
            };
            let diff = virtual_temperature(parcel_temp, w_parcel) - tv_env;

            if let Some((last_diff, last_alt)) = last {
                if last_diff > 0.0 && diff <= 0.0 {
                    let frac = last_diff / (last_diff - diff);
                    let alt = last_alt + frac * (level.altitude_m - last_alt);
                    crossings.push(ConvectionCrossing {
                        temp,
                        feet: alt * FEET_PER_METER,
                    });
                    break;
                }
            }
            last = Some((diff, level.altitude_m));
        }
    }
    ConvectionResult::from_crossings(settings, crossings)
}

// ---------------------------------------------------------------------------
// Convection levels
// ---------------------------------------------------------------------------

/// Characteristic levels for one lifted parcel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvectionLevels {
    pub lcl_pressure: f64,
    /// Level of free convection: first level above the LCL where the parcel
    /// is warmer than the environment.
    pub lfc: Option<ProfileLevel>,
    /// Equilibrium level: first level above the LFC where the parcel is
    /// cooler again.
    pub el: Option<ProfileLevel>,
    pub surface: ProfileLevel,
}

/// Lifts a parcel with the given surface temperature and dewpoint from the
/// lowest level of `frames`.
///
/// Returns `None` for an empty profile or non-finite parcel values.
pub fn convection_levels(
    frames: &[NormalizedFrame],
    parcel_temp_c: f64,
    parcel_dew_c: f64,
) -> Option<ConvectionLevels> {
    let levels = profile_levels(frames, f64::NEG_INFINITY);
    let surface = *levels.first()?;
    if !parcel_temp_c.is_finite() || !parcel_dew_c.is_finite() {
        return None;
    }

    let thetae = theta_e(parcel_temp_c, parcel_dew_c, surface.pressure);
    let p_lcl = lcl_pressure(parcel_temp_c, parcel_dew_c, surface.pressure);
    let mut lfc = None;
    let mut el = None;
    for level in levels.iter().filter(|l| l.pressure < p_lcl) {
        let parcel = parcel_temp_from_theta_e(thetae, level.pressure);
        if lfc.is_none() {
            if parcel > level.temp {
                lfc = Some(*level);
            }
        } else if parcel < level.temp {
            el = Some(*level);
            break;
        }
    }

    Some(ConvectionLevels {
        lcl_pressure: p_lcl,
        lfc,
        el,
        surface,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
