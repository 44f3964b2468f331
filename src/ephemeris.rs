//! # Low-precision solar and lunar ephemerides
//!
//! Geocentric apparent positions of the Sun and the Moon from the truncated series of the
//! *Astronomical Almanac* ("low precision formulae"). The accuracy (about 0.01° for the Sun
//! and 0.3° for the Moon over 1950–2050) is far better than what the survey needs to
//! classify observing conditions, and the evaluation is a handful of trigonometric calls.
//!
//! ## Quantities
//!
//! - [`sun_position`] / [`moon_position`] – right ascension, declination (degrees) and
//!   geocentric distance (km).
//! - [`moon_elongation`] – Sun–Moon angular distance seen from the Earth.
//! - [`moon_phase_angle`] – Sun–Moon–Earth angle, `0°` at full moon, `180°` at new moon.
//! - [`moon_illumination`] – illuminated fraction of the lunar disk, `(1 + cos i) / 2`.
//! - [`moon_vmagnitude`] – apparent V magnitude of the full disk (Allen's
//!   *Astrophysical Quantities*, 3rd ed., p. 144).

use crate::constants::{Degree, Kilometer, AU, EARTH_RADIUS_KM, MJD, RADEG, T2000};
use crate::coordinates::angular_separation;
use crate::time::julian_centuries;

/// Geocentric equatorial position of a solar-system body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPosition {
    /// Right ascension in degrees, in `[0, 360)`.
    pub ra: Degree,
    /// Declination in degrees.
    pub decl: Degree,
    /// Geocentric distance in kilometers.
    pub distance: Kilometer,
}

/// Mean obliquity of the ecliptic (degrees), low precision.
fn obliquity(mjd: MJD) -> Degree {
    23.439 - 0.0000004 * (mjd - T2000)
}

/// Ecliptic longitude/latitude (degrees) → equatorial right ascension/declination (degrees).
fn ecliptic_to_equatorial(lambda: Degree, beta: Degree, eps: Degree) -> (Degree, Degree) {
    let (sin_l, cos_l) = (lambda * RADEG).sin_cos();
    let (sin_b, cos_b) = (beta * RADEG).sin_cos();
    let (sin_e, cos_e) = (eps * RADEG).sin_cos();

    let x = cos_b * cos_l;
    let y = cos_e * cos_b * sin_l - sin_e * sin_b;
    let z = sin_e * cos_b * sin_l + cos_e * sin_b;

    let ra = y.atan2(x).rem_euclid(std::f64::consts::TAU) / RADEG;
    let decl = z.clamp(-1.0, 1.0).asin() / RADEG;
    (ra, decl)
}

/// Apparent geocentric position of the Sun.
///
/// Arguments
/// -----------------
/// * `mjd`: the time of observation.
///
/// Return
/// ----------
/// * The [`BodyPosition`] of the Sun.
pub fn sun_position(mjd: MJD) -> BodyPosition {
    let n = mjd - T2000;

    let l = (280.460 + 0.9856474 * n).rem_euclid(360.0);
    let g = ((357.528 + 0.9856003 * n).rem_euclid(360.0)) * RADEG;

    let lambda = l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin();
    let r = 1.00014 - 0.01671 * g.cos() - 0.00014 * (2.0 * g).cos();

    let (ra, decl) = ecliptic_to_equatorial(lambda, 0.0, obliquity(mjd));
    BodyPosition {
        ra,
        decl,
        distance: r * AU,
    }
}

/// Apparent geocentric position of the Moon.
///
/// Arguments
/// -----------------
/// * `mjd`: the time of observation.
///
/// Return
/// ----------
/// * The [`BodyPosition`] of the Moon.
pub fn moon_position(mjd: MJD) -> BodyPosition {
    let t = julian_centuries(mjd);
    let s = |a: f64, b: f64| ((a + b * t) * RADEG).sin();
    let c = |a: f64, b: f64| ((a + b * t) * RADEG).cos();

    let lambda = 218.32 + 481267.881 * t + 6.29 * s(135.0, 477198.87)
        - 1.27 * s(259.3, -413335.36)
        + 0.66 * s(235.7, 890534.22)
        + 0.21 * s(269.9, 954397.74)
        - 0.19 * s(357.5, 35999.05)
        - 0.11 * s(186.5, 966404.03);

    let beta = 5.13 * s(93.3, 483202.02) + 0.28 * s(228.2, 960400.89)
        - 0.28 * s(318.3, 6003.15)
        - 0.17 * s(217.6, -407332.21);

    let parallax = 0.9508
        + 0.0518 * c(135.0, 477198.87)
        + 0.0095 * c(259.3, -413335.36)
        + 0.0078 * c(235.7, 890534.22)
        + 0.0028 * c(269.9, 954397.74);

    let (ra, decl) = ecliptic_to_equatorial(lambda, beta, obliquity(mjd));
    BodyPosition {
        ra,
        decl,
        distance: EARTH_RADIUS_KM / (parallax * RADEG).sin(),
    }
}

/// Angular distance between the Sun and the Moon (degrees).
pub fn moon_elongation(mjd: MJD) -> Degree {
    let sun = sun_position(mjd);
    let moon = moon_position(mjd);
    angular_separation(sun.ra, sun.decl, moon.ra, moon.decl)
}

/// Lunar phase angle i (degrees): `0` at full moon, `180` at new moon.
///
/// Computed from the elongation ψ and the two geocentric distances:
///
/// ```text
/// i = atan2(R☉ · sin ψ, R☾ − R☉ · cos ψ)
/// ```
pub fn moon_phase_angle(mjd: MJD) -> Degree {
    let sun = sun_position(mjd);
    let moon = moon_position(mjd);
    let psi = angular_separation(sun.ra, sun.decl, moon.ra, moon.decl) * RADEG;

    (sun.distance * psi.sin()).atan2(moon.distance - sun.distance * psi.cos()) / RADEG
}

/// Illuminated fraction of the lunar disk, in `[0, 1]`.
pub fn moon_illumination(mjd: MJD) -> f64 {
    (1.0 + (moon_phase_angle(mjd) * RADEG).cos()) / 2.0
}

/// Apparent V magnitude of the Moon for a given elongation (degrees).
pub fn moon_vmagnitude(elongation: Degree) -> f64 {
    let alpha = 180.0 - elongation;
    -12.73 + 0.026 * alpha.abs() + 4e-9 * alpha.powi(4)
}
