//! # Constants and type definitions for DeepSurvey
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the `deepsurvey` library.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians, seconds ↔ days, MJD ↔ JD)
//! - Reference epochs used by the sidereal-time and ephemeris series
//! - Default values for the observation engine (reference epoch, band, sky grid)
//! - Fixed coefficients of the empirical seeing and airmass approximations
//!
//! These definitions are shared by the coordinate layer, the observation engine and the
//! survey state machine.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Seconds → days (used to turn slew/readout delays into MJD fractions)
pub const DAYS_PER_SECOND: f64 = 1.0 / SECONDS_PER_DAY;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// Earth equatorial radius in kilometers (GRS1980/WGS84)
pub const EARTH_RADIUS_KM: f64 = 6_378.137;

/// Epsilon (radians) added to coordinates before the law-of-cosines separation,
/// so that identical or zero inputs never hit the `acos` singularity exactly.
pub const SEPARATION_EPS: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------
// Engine defaults
// -------------------------------------------------------------------------------------------------

/// Reference epoch used as the engine time before the first update
pub const DEFAULT_MJD: MJD = 60000.0;

/// Optical band selected before the first update
pub const DEFAULT_BAND: &str = "g";

/// Number of sites in the default sky grid
pub const DEFAULT_N_SITES: usize = 10;

/// Bounds `[low, high)` of the integer MJD drawn for a random episode start
pub const RANDOM_START_RANGE: (i64, i64) = (55000, 70000);

/// Reference wavelength (nm) of the band-seeing scaling
pub const SEEING_REFERENCE_WAVELENGTH: f64 = 500.0;

/// Exponent of the airmass term in the point-seeing law
pub const SEEING_AIRMASS_EXPONENT: f64 = 0.6;

/// Exponent of the wavelength term in the band-seeing law
pub const SEEING_WAVELENGTH_EXPONENT: f64 = 0.2;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Distance in meters
pub type Meter = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Duration in seconds
pub type Second = f64;
/// Wavelength in nanometers
pub type Nanometer = f64;
/// Angle in arcseconds
pub type ArcSec = f64;

/// Modified Julian Date (days)
pub type MJD = f64;
