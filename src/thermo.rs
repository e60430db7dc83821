/// Thermodynamic helpers for sounding analysis.
///
/// Pure functions over temperature (°C), pressure (hPa) and humidity. Out of
/// domain inputs produce `None` (or a non-finite value the caller filters),
/// never a panic.
///
/// # References
///
/// - Bolton, D. (1980). "The computation of equivalent potential temperature."
///   Monthly Weather Review, 108, 1046-1053.
/// - U.S. Standard Atmosphere (1976), troposphere layer.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Standard gravity, m/s².
const G0: f64 = 9.80665;
/// Molar mass of dry air, kg/mol.
const MOLAR_MASS_AIR: f64 = 0.0289644;
/// Universal gas constant, J/(mol·K).
const GAS_CONSTANT: f64 = 8.3144598;
/// Tropospheric temperature lapse rate, K/m.
const LAPSE_RATE: f64 = 0.0065;
/// Sea-level standard temperature, K.
const T0: f64 = 288.15;
/// Sea-level standard pressure, hPa.
const P0: f64 = 1013.25;
/// Lowest altitude the barometric formula is evaluated at, m.
const MIN_ISA_ALTITUDE: f64 = -50.0;

const KELVIN: f64 = 273.15;
/// Poisson constant R/cp for dry air, as used by Bolton.
pub const KAPPA: f64 = 0.286;

const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7; // °C

/// Bisection bracket and iteration count for the moist-adiabat solver.
const PARCEL_SOLVER_LOW: f64 = -80.0;
const PARCEL_SOLVER_HIGH: f64 = 60.0;
const PARCEL_SOLVER_ITERATIONS: usize = 30;

// ---------------------------------------------------------------------------
// Standard atmosphere
// ---------------------------------------------------------------------------

/// Pressure (hPa) at a geometric altitude under the International Standard
/// Atmosphere. Altitudes below -50 m are clamped to -50 m.
pub fn pressure_from_altitude(altitude_m: f64) -> f64 {
    let h = altitude_m.max(MIN_ISA_ALTITUDE);
    let exponent = (G0 * MOLAR_MASS_AIR) / (GAS_CONSTANT * LAPSE_RATE);
    P0 * (1.0 - (LAPSE_RATE * h) / T0).powf(exponent)
}

/// Inverse of [`pressure_from_altitude`]. Returns `None` for non-finite or
/// non-positive pressure.
pub fn altitude_from_pressure(pressure: f64) -> Option<f64> {
    if !pressure.is_finite() || pressure <= 0.0 {
        return None;
    }
    let ratio = (pressure / P0).powf((GAS_CONSTANT * LAPSE_RATE) / (G0 * MOLAR_MASS_AIR));
    Some((T0 / LAPSE_RATE) * (1.0 - ratio))
}

// ---------------------------------------------------------------------------
// Moisture
// ---------------------------------------------------------------------------

/// Dewpoint (°C) from temperature and relative humidity, Magnus form.
///
/// Returns `None` when relative humidity is not positive.
pub fn dewpoint_from_rh(temp_c: f64, rh: f64) -> Option<f64> {
    if rh <= 0.0 {
        return None;
    }
    let alpha = (rh / 100.0).ln() + (MAGNUS_A * temp_c) / (MAGNUS_B + temp_c);
    Some((MAGNUS_B * alpha) / (MAGNUS_A - alpha))
}

/// Saturation vapor pressure over water (hPa).
pub fn sat_vapor_pressure(temp_c: f64) -> f64 {
    6.112 * ((17.67 * temp_c) / (temp_c + 243.5)).exp()
}

/// Mixing ratio (kg/kg) of air at `pressure` with the given dewpoint.
pub fn mixing_ratio(pressure: f64, dewpoint_c: f64) -> f64 {
    let e = sat_vapor_pressure(dewpoint_c);
    0.622 * e / (pressure - e).max(1e-6)
}

/// Virtual temperature (K) of air at `temp_c` carrying mixing ratio `w`.
pub fn virtual_temperature(temp_c: f64, w: f64) -> f64 {
    (temp_c + KELVIN) * (1.0 + 0.61 * w)
}

// ---------------------------------------------------------------------------
// Parcel theory
// ---------------------------------------------------------------------------

/// Bolton's temperature at the lifted condensation level, Kelvin.
fn lcl_temperature_k(t_k: f64, td_k: f64) -> f64 {
    1.0 / (1.0 / (td_k - 56.0) + (t_k / td_k).ln() / 800.0) + 56.0
}

/// Pressure (hPa) of the lifted condensation level for a parcel starting at
/// `pressure` with the given temperature and dewpoint.
pub fn lcl_pressure(temp_c: f64, dewpoint_c: f64, pressure: f64) -> f64 {
    let t = temp_c + KELVIN;
    let td = dewpoint_c + KELVIN;
    let tlcl = lcl_temperature_k(t, td);
    pressure * (tlcl / t).powf(1.0 / KAPPA)
}

/// Equivalent potential temperature (K).
pub fn theta_e(temp_c: f64, dewpoint_c: f64, pressure: f64) -> f64 {
    let t = temp_c + KELVIN;
    let td = dewpoint_c + KELVIN;
    let w = mixing_ratio(pressure, dewpoint_c);
    let tlcl = lcl_temperature_k(t, td);
    let theta = t * (1000.0 / pressure).powf(KAPPA);
    theta * ((3.376 / tlcl - 0.00254) * w * 1000.0 * (1.0 + 0.81 * w)).exp()
}

/// Temperature (°C) of a saturated parcel at `pressure` on the moist adiabat
/// with equivalent potential temperature `thetae`.
///
/// Bisection over [-80, 60] °C. The parcel is taken as saturated, so theta-e
/// is evaluated with dewpoint equal to temperature. Targets outside the
/// bracket converge to the nearest end.
pub fn parcel_temp_from_theta_e(thetae: f64, pressure: f64) -> f64 {
    let mut low = PARCEL_SOLVER_LOW;
    let mut high = PARCEL_SOLVER_HIGH;
    for _ in 0..PARCEL_SOLVER_ITERATIONS {
        let mid = (low + high) / 2.0;
        // theta-e increases with temperature at fixed pressure
        if theta_e(mid, mid, pressure) > thetae {
            high = mid;
        } else {
            low = mid;
        }
    }
    (low + high) / 2.0
}

/// Temperature (°C) of a parcel lifted dry-adiabatically from
/// (`surface_temp_c`, `surface_pressure`) to `pressure`.
pub fn dry_adiabat_temp(surface_temp_c: f64, surface_pressure: f64, pressure: f64) -> f64 {
    (surface_temp_c + KELVIN) * (pressure / surface_pressure).powf(KAPPA) - KELVIN
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
