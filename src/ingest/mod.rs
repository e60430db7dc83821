/// Telemetry ingestion.
///
/// - `sondehub` - REST history, site lists and live payload decoding.
/// - `normalize` - per-frame validation and unit conversion.

pub mod normalize;
pub mod sondehub;
