//! # Site geometry and coordinate transforms
//!
//! Conversion between **equatorial** (right ascension / declination) and **horizontal**
//! (altitude / azimuth) coordinates for a ground-based site, together with the sidereal
//! time, hour angle, airmass and angular separation helpers used by the observation engine.
//!
//! ## Conventions
//!
//! - All public angles are **degrees**.
//! - Longitudes are positive **east** of Greenwich.
//! - Azimuth is measured from **north through east**, in `[0, 360)`.
//! - The hour angle is `LST − RA` and is **not** wrapped: callers comparing values across
//!   the ±180°/360° boundary must handle the wraparound themselves.
//! - No atmospheric refraction is applied to altitudes.
//!
//! ## See also
//! ------------
//! * [`gmst`](crate::time::gmst) – Greenwich mean sidereal time used for the local sidereal time.
//! * [`crate::ephemeris`] – Solar and lunar positions fed into [`Site::to_horizontal`].

use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Meter, MJD, RADEG, SEPARATION_EPS};
use crate::deepsurvey_errors::SurveyError;
use crate::time::gmst;

/// Horizontal coordinates of a target as seen from a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizontal {
    /// Altitude above the horizon, in degrees (negative below the horizon).
    pub alt: Degree,
    /// Azimuth from north through east, in degrees.
    pub az: Degree,
}

/// Geodetic position of an observatory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Geodetic latitude in degrees.
    pub latitude: Degree,
    /// Longitude in degrees, east positive.
    pub longitude: Degree,
    /// Height above sea level in meters.
    pub elevation: Meter,
}

impl Site {
    /// Build a site from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: geodetic latitude in degrees, within `[-90, 90]`.
    /// * `longitude`: longitude in degrees (east positive), within `[-180, 360]`.
    /// * `elevation`: height above sea level in meters.
    ///
    /// Return
    /// ----------
    /// * The site, or [`SurveyError::Configuration`] if one of the values is non-finite or
    ///   out of range.
    pub fn new(latitude: Degree, longitude: Degree, elevation: Meter) -> Result<Self, SurveyError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SurveyError::Configuration(format!(
                "latitude must be within [-90, 90] degrees, got {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=360.0).contains(&longitude) {
            return Err(SurveyError::Configuration(format!(
                "longitude must be within [-180, 360] degrees, got {longitude}"
            )));
        }
        if !elevation.is_finite() {
            return Err(SurveyError::Configuration(format!(
                "elevation must be finite, got {elevation}"
            )));
        }
        Ok(Site {
            latitude,
            longitude,
            elevation,
        })
    }

    /// Mean local sidereal time at this site.
    ///
    /// Arguments
    /// -----------------
    /// * `mjd`: the time of observation.
    ///
    /// Return
    /// ----------
    /// * The local sidereal time in degrees, in `[0, 360)`.
    pub fn local_sidereal_time(&self, mjd: MJD) -> Degree {
        (gmst(mjd) / RADEG + self.longitude).rem_euclid(360.0)
    }

    /// Hour angle `LST − ra` in degrees, not wrapped.
    pub fn hour_angle(&self, mjd: MJD, ra: Degree) -> Degree {
        self.local_sidereal_time(mjd) - ra
    }

    /// Transform an equatorial position into horizontal coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `mjd`: the time of observation.
    /// * `ra`: right ascension in degrees.
    /// * `decl`: declination in degrees.
    ///
    /// Return
    /// ----------
    /// * The [`Horizontal`] position of the target.
    pub fn to_horizontal(&self, mjd: MJD, ra: Degree, decl: Degree) -> Horizontal {
        self.hour_angle_to_horizontal(self.hour_angle(mjd, ra), decl)
    }

    /// Same as [`Site::to_horizontal`] when the hour angle is already known.
    pub fn hour_angle_to_horizontal(&self, ha: Degree, decl: Degree) -> Horizontal {
        let (sin_h, cos_h) = (ha * RADEG).sin_cos();
        let (sin_d, cos_d) = (decl * RADEG).sin_cos();
        let (sin_p, cos_p) = (self.latitude * RADEG).sin_cos();

        let sin_alt = (sin_d * sin_p + cos_d * cos_p * cos_h).clamp(-1.0, 1.0);
        let alt = sin_alt.asin() / RADEG;

        let az = (-cos_d * sin_h)
            .atan2(sin_d * cos_p - cos_d * sin_p * cos_h)
            .rem_euclid(std::f64::consts::TAU)
            / RADEG;

        Horizontal { alt, az }
    }
}

/// Airmass of a target from its altitude.
///
/// Polynomial approximation in the cosine of the zenith distance:
///
/// ```text
/// a       = 462.46 + 2.8121 / (cos²z + 0.22·cos z + 0.01)
/// airmass = sqrt((a·cos z)² + 2a + 1) − a·cos z
/// ```
///
/// Targets below the horizon are unobservable and get `NaN`.
///
/// Arguments
/// -----------------
/// * `alt`: altitude in degrees.
///
/// Return
/// ----------
/// * The airmass (`1` at zenith, about `38.6` on the horizon), or `NaN` below the horizon.
pub fn airmass(alt: Degree) -> f64 {
    if alt.is_nan() || alt < 0.0 {
        return f64::NAN;
    }
    let cos_zd = (90.0f64.to_radians() - alt * RADEG).cos();
    let a = 462.46 + 2.8121 / (cos_zd.powi(2) + 0.22 * cos_zd + 0.01);
    ((a * cos_zd).powi(2) + 2.0 * a + 1.0).sqrt() - a * cos_zd
}

/// Great-circle separation between two equatorial positions (spherical law of cosines).
///
/// A tiny epsilon ([`SEPARATION_EPS`]) is added to every coordinate in radians and the
/// cosine is clamped to `[-1, 1]` so that identical pointings give a separation close to
/// zero instead of `NaN`.
///
/// Arguments
/// -----------------
/// * `ra1`, `decl1`: first position in degrees.
/// * `ra2`, `decl2`: second position in degrees.
///
/// Return
/// ----------
/// * The separation in degrees, in `[0, 180]`.
pub fn angular_separation(ra1: Degree, decl1: Degree, ra2: Degree, decl2: Degree) -> Degree {
    let (a1, d1) = (ra1 * RADEG + SEPARATION_EPS, decl1 * RADEG + SEPARATION_EPS);
    let (a2, d2) = (ra2 * RADEG + SEPARATION_EPS, decl2 * RADEG + SEPARATION_EPS);

    let cos_sep = d1.sin() * d2.sin() + d1.cos() * d2.cos() * (a1 - a2).cos();
    cos_sep.clamp(-1.0, 1.0).acos() / RADEG
}
