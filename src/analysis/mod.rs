/// Sounding analysis built on the stored profile.
///
/// Submodules:
/// - `sounding` - decimated plot sequence for the skew-T renderer.
/// - `convection` - thermal height estimation (Temple and parcel methods)
///   and LCL/LFC/EL levels.

pub mod convection;
pub mod sounding;
