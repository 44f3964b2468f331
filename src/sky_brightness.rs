//! # Sky brightness
//!
//! The observation engine treats the sky brightness as a pluggable black box: any type
//! implementing [`SkyBrightnessModel`] can be injected with
//! [`ObservationEngine::with_sky_brightness_model`](crate::observatory::ObservationEngine::with_sky_brightness_model).
//!
//! The crate ships one implementation, [`KrisciunasSchaefer`], the 1991 moonlight model
//! (Krisciunas & Schaefer, PASP 103, 1033), which adds the scattered moonlight to a
//! dark-sky magnitude that dims with airmass.
//!
//! On top of the sky magnitude the engine derives the effective-exposure terms
//! ([`effective_exposure`]):
//!
//! ```text
//! η    = 10^(−0.4 k (X − 1)) · (1 − clouds)
//! tau  = η² · (fwhm_fid / fwhm)² · 10^(0.4 (m_sky − m_dark))
//! teff = tau · exposure_time
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{ArcSec, Degree, Second, RADEG};
use crate::deepsurvey_errors::SurveyError;

/// Parameters of the sky-brightness variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyBrightnessConfig {
    /// Atmospheric extinction coefficient (mag / airmass).
    pub extinction: f64,
    /// Zenith sky brightness without moon (mag / arcsec²).
    pub dark_sky_magnitude: f64,
    /// Fiducial FWHM used to normalise `tau` (arcsec).
    pub fiducial_fwhm: ArcSec,
    /// Exposure time turned into `teff` (seconds).
    pub exposure_time: Second,
}

impl Default for SkyBrightnessConfig {
    fn default() -> Self {
        SkyBrightnessConfig {
            extinction: 0.172,
            dark_sky_magnitude: 21.587,
            fiducial_fwhm: 0.9,
            exposure_time: 90.0,
        }
    }
}

impl SkyBrightnessConfig {
    pub(crate) fn validate(&self) -> Result<(), SurveyError> {
        if !(self.extinction.is_finite() && self.extinction >= 0.0) {
            return Err(SurveyError::Configuration(
                "sky_brightness.extinction must be a non-negative number".into(),
            ));
        }
        if !self.dark_sky_magnitude.is_finite() {
            return Err(SurveyError::Configuration(
                "sky_brightness.dark_sky_magnitude must be finite".into(),
            ));
        }
        if !(self.fiducial_fwhm > 0.0 && self.exposure_time > 0.0) {
            return Err(SurveyError::Configuration(
                "sky_brightness.fiducial_fwhm and exposure_time must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Geometry handed to a sky-brightness model for one pointing at one time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyInputs {
    /// Lunar phase angle, `0` at full moon (degrees).
    pub moon_phase: Degree,
    /// Angular distance between the pointing and the Moon (degrees).
    pub moon_separation: Degree,
    /// Zenith distance of the Moon (degrees).
    pub moon_zenith: Degree,
    /// Zenith distance of the pointing (degrees).
    pub target_zenith: Degree,
    /// Zenith distance of the Sun (degrees).
    pub sun_zenith: Degree,
}

/// A model returning the sky surface brightness (mag / arcsec²) for a pointing.
pub trait SkyBrightnessModel: std::fmt::Debug {
    /// Sky magnitude for the given geometry, `NaN` when the pointing is below the horizon.
    fn sky_magnitude(&self, inputs: &SkyInputs) -> f64;
}

/// Krisciunas & Schaefer (1991) scattered-moonlight model.
#[derive(Debug, Clone, PartialEq)]
pub struct KrisciunasSchaefer {
    /// Extinction coefficient (mag / airmass).
    pub extinction: f64,
    /// Dark zenith sky magnitude (mag / arcsec²).
    pub dark_sky_magnitude: f64,
}

impl KrisciunasSchaefer {
    pub fn from_config(config: &SkyBrightnessConfig) -> Self {
        KrisciunasSchaefer {
            extinction: config.extinction,
            dark_sky_magnitude: config.dark_sky_magnitude,
        }
    }

    /// Airmass law of the model, `(1 − 0.96 sin² Z)^(−1/2)`.
    fn model_airmass(zenith: Degree) -> f64 {
        (1.0 - 0.96 * (zenith * RADEG).sin().powi(2)).powf(-0.5)
    }

    fn nanolambert_to_mag(b: f64) -> f64 {
        (20.7233 - (b / 34.08).ln()) / 0.92104
    }

    fn mag_to_nanolambert(m: f64) -> f64 {
        34.08 * (20.7233 - 0.92104 * m).exp()
    }
}

impl SkyBrightnessModel for KrisciunasSchaefer {
    fn sky_magnitude(&self, inputs: &SkyInputs) -> f64 {
        if inputs.target_zenith.is_nan() || inputs.target_zenith > 90.0 {
            return f64::NAN;
        }
        let k = self.extinction;
        let x_target = Self::model_airmass(inputs.target_zenith);

        let dark = Self::mag_to_nanolambert(self.dark_sky_magnitude)
            * 10f64.powf(-0.4 * k * (x_target - 1.0))
            * x_target;

        let moon = if inputs.moon_zenith < 90.0 {
            let alpha = inputs.moon_phase.abs();
            let illuminance = 10f64.powf(-0.4 * (3.84 + 0.026 * alpha + 4e-9 * alpha.powi(4)));

            let rho = inputs.moon_separation.max(1e-3);
            let scattering = 10f64.powf(5.36) * (1.06 + (rho * RADEG).cos().powi(2))
                + 10f64.powf(6.15 - rho / 40.0);

            let x_moon = Self::model_airmass(inputs.moon_zenith);
            scattering
                * illuminance
                * 10f64.powf(-0.4 * k * x_moon)
                * (1.0 - 10f64.powf(-0.4 * k * x_target))
        } else {
            0.0
        };

        Self::nanolambert_to_mag(dark + moon)
    }
}

/// Effective-exposure terms `(tau, teff)` for one pointing.
///
/// Arguments
/// -----------------
/// * `config`: the sky-brightness parameters.
/// * `sky_magnitude`: the modelled sky magnitude.
/// * `airmass`: airmass of the pointing.
/// * `fwhm`: delivered full width at half maximum (arcsec).
/// * `clouds`: cloud extinction in `[0, 1]`, `1` being fully opaque.
///
/// Return
/// ----------
/// * `(tau, teff)`; both are `NaN` when the airmass is `NaN`.
pub fn effective_exposure(
    config: &SkyBrightnessConfig,
    sky_magnitude: f64,
    airmass: f64,
    fwhm: ArcSec,
    clouds: f64,
) -> (f64, f64) {
    let transparency =
        10f64.powf(-0.4 * config.extinction * (airmass - 1.0)) * (1.0 - clouds).clamp(0.0, 1.0);
    let tau = transparency.powi(2)
        * (config.fiducial_fwhm / fwhm).powi(2)
        * 10f64.powf(0.4 * (sky_magnitude - config.dark_sky_magnitude));
    (tau, tau * config.exposure_time)
}
