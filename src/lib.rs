/// Radiosonde sounding and convection-height service.
///
/// Turns SondeHub radiosonde telemetry (history plus live frames) into a
/// clean ascent profile for skew-T rendering and a thermal height curve as
/// a function of surface temperature.

pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod phase;
pub mod session;
pub mod sites;
pub mod store;
pub mod thermo;
