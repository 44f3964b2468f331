#![allow(dead_code)]

use approx::assert_relative_eq;
use deepsurvey::coordinates::Site;
use deepsurvey::observatory::pointing::Location;
use deepsurvey::observatory::site_config::{LocationSpec, SiteConfig};
use deepsurvey::survey::survey_config::{StartTime, SurveyConfig, SurveyConfigBuilder};
use nalgebra::DMatrix;

pub const START: f64 = 60000.0;

/// Default site observing explicit pointings.
pub fn site_config(ra: Vec<f64>, decl: Vec<f64>) -> SiteConfig {
    SiteConfig {
        location: LocationSpec::Explicit { ra, decl },
        ..SiteConfig::default()
    }
}

pub fn single_site(ra: f64, decl: f64) -> SiteConfig {
    site_config(vec![ra], vec![decl])
}

/// Survey starting at [`START`], stopping after `timestep` steps.
pub fn fixed_survey(timestep: usize) -> SurveyConfigBuilder {
    SurveyConfig::builder()
        .start_time(StartTime::Fixed(START))
        .max_timestep(timestep)
}

/// Pointing on the local meridian, south of the zenith, at altitude `alt` (degrees).
pub fn meridian(site: &Site, mjd: f64, alt: f64) -> Location {
    Location::single(
        site.local_sidereal_time(mjd),
        site.latitude - (90.0 - alt),
    )
}

/// Pointing at the zenith of the site at `mjd`.
pub fn zenith(site: &Site, mjd: f64) -> Location {
    meridian(site, mjd, 90.0)
}

/// Pointing at the nadir of the site at `mjd`.
pub fn nadir(site: &Site, mjd: f64) -> Location {
    Location::single(
        (site.local_sidereal_time(mjd) + 180.0).rem_euclid(360.0),
        -site.latitude,
    )
}

/// Element-wise comparison where two `NaN` are equal.
pub fn assert_matrix_close(actual: &DMatrix<f64>, expected: &DMatrix<f64>, epsilon: f64) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        if e.is_nan() {
            assert!(a.is_nan(), "expected NaN, got {a}");
        } else {
            assert_relative_eq!(*a, *e, epsilon = epsilon);
        }
    }
}
