use hifitime::Epoch;

use crate::constants::{Second, DAYS_PER_SECOND, DPI, MJD, T2000};

/// Julian centuries elapsed since J2000.0 for a given MJD.
pub fn julian_centuries(mjd: MJD) -> f64 {
    (mjd - T2000) / 36525.0
}

/// Convert a delay expressed in seconds to a fraction of day usable with MJD values.
pub fn seconds_to_days(delay: Second) -> f64 {
    delay * DAYS_PER_SECOND
}

/// Calendar month and day (UTC) of a modified julian date.
///
/// The year is discarded: the weather model only looks at the time of year.
///
/// Argument
/// --------
/// * `mjd`: a modified julian date (UTC)
///
/// Return
/// ------
/// * `(month, day)` with `month` in `1..=12` and `day` in `1..=31`
pub fn mjd_to_month_day(mjd: MJD) -> (u8, u8) {
    let (_, month, day, _, _, _, _) = Epoch::from_mjd_utc(mjd).to_gregorian_utc();
    (month, day)
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date.
///
/// The survey treats UTC as a stand-in for UT1: the |UT1 − UTC| < 0.9 s difference
/// moves the sidereal time by less than 4 arcseconds, far below the other
/// approximations of the simulation.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 ≈ UTC)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # Details
/// The GMST is computed in two steps:
/// 1. Use a cubic polynomial (coefficients C0–C3) to get GMST at 0h UT1
///    in seconds for the given date.
/// 2. Add the contribution of Earth's rotation during the fractional day
///    using the factor `RAP`, which converts solar days to sidereal days.
///
/// # References
/// * IAU 1982, IERS Conventions 1996/2000.
pub fn gmst(tjm: MJD) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / 36525.0;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;

    // fraction of the day elapsed since 0h, turned into sidereal rotation
    let h = (tjm - itjm) * DPI;
    (gmst0 + h * RAP).rem_euclid(DPI)
}
