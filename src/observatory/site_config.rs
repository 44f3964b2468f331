//! # Site and instrument configuration
//!
//! [`SiteConfig`] gathers everything the [`ObservationEngine`](crate::observatory::ObservationEngine)
//! needs to know about the observatory: its geodetic position, the filter set, the seeing
//! budget, the timing constants used for slew/filter/readout delays, the default pointing
//! and the optional weather and sky-brightness collaborators.
//!
//! A configuration is obtained in one of three ways:
//!
//! - [`SiteConfig::default`], the built-in reference observatory,
//! - [`SiteConfig::builder`] / [`SiteConfigBuilder::empty`], a validated fluent builder,
//! - [`SiteConfig::resolve`], a key-by-key merge of a [`SiteConfigOverrides`] document
//!   (typically produced by an external YAML/JSON loader) over a set of defaults.
//!
//! ## Example
//!
//! ```rust,no_run
//! use deepsurvey::observatory::site_config::{LocationSpec, SiteConfig};
//!
//! let config = SiteConfig::builder()
//!     .latitude(-30.24)
//!     .longitude(-70.74)
//!     .elevation(2647.0)
//!     .location(LocationSpec::Explicit { ra: vec![0.0], decl: vec![0.0] })
//!     .build()
//!     .unwrap();
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ArcSec, Degree, Meter, Nanometer, Second, DEFAULT_BAND, DEFAULT_N_SITES,
};
use crate::coordinates::Site;
use crate::deepsurvey_errors::SurveyError;
use crate::observatory::pointing::{check_coordinates, PointingSet};
use crate::sky_brightness::SkyBrightnessConfig;
use crate::weather::WeatherConfig;

/// Default pointing of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationSpec {
    /// An explicit list of paired coordinates (degrees).
    Explicit { ra: Vec<Degree>, decl: Vec<Degree> },
    /// `n_sites` pointings spread over the sky, see [`PointingSet::grid`].
    Grid { n_sites: usize },
}

impl Default for LocationSpec {
    fn default() -> Self {
        LocationSpec::Grid {
            n_sites: DEFAULT_N_SITES,
        }
    }
}

impl LocationSpec {
    /// Resolve the location into a pointing set.
    ///
    /// Return
    /// ----------
    /// * The default pointing, or [`SurveyError::Configuration`] when the explicit lists are
    ///   invalid or the grid is empty.
    pub fn resolve(&self) -> Result<PointingSet, SurveyError> {
        match self {
            LocationSpec::Explicit { ra, decl } => {
                check_coordinates(ra, decl)
                    .map_err(|msg| SurveyError::Configuration(format!("location: {msg}")))?;
                PointingSet::new(ra.clone(), decl.clone())
            }
            LocationSpec::Grid { n_sites } => PointingSet::grid(*n_sites),
        }
    }
}

/// Immutable site and instrument configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Geodetic latitude (degrees).
    pub latitude: Degree,
    /// Longitude, east positive (degrees).
    pub longitude: Degree,
    /// Height above sea level (meters).
    pub elevation: Meter,
    /// Band name → effective wavelength (nm).
    pub wavelengths: BTreeMap<String, Nanometer>,
    /// Zenith seeing at 500 nm (arcsec).
    pub seeing: ArcSec,
    /// Instrumental contribution to the FWHM (arcsec).
    #[serde(alias = "fwhm")]
    pub optics_fwhm: ArcSec,
    pub location: LocationSpec,
    /// Slew cost (seconds per degree).
    pub slew_rate: f64,
    /// Filter change cost (seconds).
    pub band_change_time: Second,
    /// Readout cost paid on every update (seconds).
    pub readout_time: Second,
    #[serde(default)]
    pub weather: Option<WeatherConfig>,
    #[serde(default)]
    pub sky_brightness: Option<SkyBrightnessConfig>,
}

fn default_wavelengths() -> BTreeMap<String, Nanometer> {
    [
        ("u", 380.0),
        ("g", 475.0),
        ("r", 635.0),
        ("i", 775.0),
        ("z", 925.0),
        ("Y", 1000.0),
    ]
    .into_iter()
    .map(|(band, wl)| (band.to_string(), wl))
    .collect()
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            latitude: 38.29,
            longitude: -122.50,
            elevation: 2215.0,
            wavelengths: default_wavelengths(),
            seeing: 0.9,
            optics_fwhm: 0.45,
            location: LocationSpec::default(),
            slew_rate: 1.0,
            band_change_time: 120.0,
            readout_time: 20.0,
            weather: None,
            sky_brightness: None,
        }
    }
}

impl SiteConfig {
    /// Fluent builder starting from [`SiteConfig::default`].
    pub fn builder() -> SiteConfigBuilder {
        SiteConfigBuilder::new()
    }

    /// Geodetic site of the observatory.
    pub fn site(&self) -> Result<Site, SurveyError> {
        Site::new(self.latitude, self.longitude, self.elevation)
    }

    /// Wavelength of `band`.
    ///
    /// Return
    /// ----------
    /// * The wavelength in nm, or [`SurveyError::UnknownBand`].
    pub fn wavelength(&self, band: &str) -> Result<Nanometer, SurveyError> {
        self.wavelengths
            .get(band)
            .copied()
            .ok_or_else(|| SurveyError::UnknownBand(band.to_string()))
    }

    fn non_negative(name: &str, v: f64) -> Result<(), SurveyError> {
        if v.is_finite() && v >= 0.0 {
            Ok(())
        } else {
            Err(SurveyError::Configuration(format!(
                "{name} must be a non-negative number, got {v}"
            )))
        }
    }

    /// Check every key of the configuration.
    ///
    /// Validation rules
    /// -----------------
    /// * The position is accepted by [`Site::new`].
    /// * `wavelengths` is non-empty, every wavelength is finite and positive, and the default
    ///   band `"g"` is part of the map.
    /// * `seeing`, `optics_fwhm`, `slew_rate`, `band_change_time`, `readout_time` are finite
    ///   and non-negative.
    /// * `location` resolves to a non-empty pointing set.
    /// * The weather and sky-brightness sub-configurations are valid.
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, or [`SurveyError::Configuration`] naming the first failing key.
    pub fn validate(&self) -> Result<(), SurveyError> {
        self.site()?;

        if self.wavelengths.is_empty() {
            return Err(SurveyError::Configuration(
                "wavelengths must define at least one band".into(),
            ));
        }
        if let Some((band, wl)) = self
            .wavelengths
            .iter()
            .find(|(_, wl)| !(**wl > 0.0 && wl.is_finite()))
        {
            return Err(SurveyError::Configuration(format!(
                "wavelength of band {band} must be positive, got {wl}"
            )));
        }
        if !self.wavelengths.contains_key(DEFAULT_BAND) {
            return Err(SurveyError::Configuration(format!(
                "wavelengths must contain the default band {DEFAULT_BAND}"
            )));
        }

        Self::non_negative("seeing", self.seeing)?;
        Self::non_negative("optics_fwhm", self.optics_fwhm)?;
        Self::non_negative("slew_rate", self.slew_rate)?;
        Self::non_negative("band_change_time", self.band_change_time)?;
        Self::non_negative("readout_time", self.readout_time)?;

        self.location.resolve()?;
        if let Some(weather) = &self.weather {
            weather.validate()?;
        }
        if let Some(sky) = &self.sky_brightness {
            sky.validate()?;
        }
        Ok(())
    }

    /// Merge `overrides` on top of `defaults` key by key and validate the result.
    ///
    /// Arguments
    /// -----------------
    /// * `defaults`: the base configuration.
    /// * `overrides`: caller-supplied keys; every `Some` field replaces the corresponding
    ///   top-level key of `defaults`.
    ///
    /// Return
    /// ----------
    /// * The validated configuration, or [`SurveyError::Configuration`].
    ///
    /// See also
    /// ------------
    /// * [`SiteConfig::validate`] – Validation rules.
    pub fn resolve(
        defaults: SiteConfig,
        overrides: SiteConfigOverrides,
    ) -> Result<SiteConfig, SurveyError> {
        let mut builder = SiteConfigBuilder::from_config(defaults);
        builder.latitude = overrides.latitude.or(builder.latitude);
        builder.longitude = overrides.longitude.or(builder.longitude);
        builder.elevation = overrides.elevation.or(builder.elevation);
        builder.wavelengths = overrides.wavelengths.or(builder.wavelengths);

        let c = &mut builder.config;
        c.seeing = overrides.seeing.unwrap_or(c.seeing);
        c.optics_fwhm = overrides.optics_fwhm.unwrap_or(c.optics_fwhm);
        c.location = overrides.location.unwrap_or(c.location.clone());
        c.slew_rate = overrides.slew_rate.unwrap_or(c.slew_rate);
        c.band_change_time = overrides.band_change_time.unwrap_or(c.band_change_time);
        c.readout_time = overrides.readout_time.unwrap_or(c.readout_time);
        if overrides.weather.is_some() {
            c.weather = overrides.weather;
        }
        if overrides.sky_brightness.is_some() {
            c.sky_brightness = overrides.sky_brightness;
        }
        builder.build()
    }
}

/// Partial [`SiteConfig`]: every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfigOverrides {
    pub latitude: Option<Degree>,
    pub longitude: Option<Degree>,
    pub elevation: Option<Meter>,
    pub wavelengths: Option<BTreeMap<String, Nanometer>>,
    pub seeing: Option<ArcSec>,
    #[serde(alias = "fwhm")]
    pub optics_fwhm: Option<ArcSec>,
    pub location: Option<LocationSpec>,
    pub slew_rate: Option<f64>,
    pub band_change_time: Option<Second>,
    pub readout_time: Option<Second>,
    pub weather: Option<WeatherConfig>,
    pub sky_brightness: Option<SkyBrightnessConfig>,
}

/// Builder for [`SiteConfig`], with validation.
#[derive(Debug, Clone)]
pub struct SiteConfigBuilder {
    latitude: Option<Degree>,
    longitude: Option<Degree>,
    elevation: Option<Meter>,
    wavelengths: Option<BTreeMap<String, Nanometer>>,
    config: SiteConfig,
}

impl Default for SiteConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self::from_config(SiteConfig::default())
    }

    /// Builder without the required geodetic keys and wavelength map.
    ///
    /// [`SiteConfigBuilder::build`] fails until `latitude`, `longitude`, `elevation` and
    /// `wavelengths` have all been set.
    pub fn empty() -> Self {
        SiteConfigBuilder {
            latitude: None,
            longitude: None,
            elevation: None,
            wavelengths: None,
            config: SiteConfig::default(),
        }
    }

    fn from_config(config: SiteConfig) -> Self {
        SiteConfigBuilder {
            latitude: Some(config.latitude),
            longitude: Some(config.longitude),
            elevation: Some(config.elevation),
            wavelengths: Some(config.wavelengths.clone()),
            config,
        }
    }

    pub fn latitude(mut self, v: Degree) -> Self {
        self.latitude = Some(v);
        self
    }
    pub fn longitude(mut self, v: Degree) -> Self {
        self.longitude = Some(v);
        self
    }
    pub fn elevation(mut self, v: Meter) -> Self {
        self.elevation = Some(v);
        self
    }
    pub fn wavelengths(mut self, v: BTreeMap<String, Nanometer>) -> Self {
        self.wavelengths = Some(v);
        self
    }
    pub fn seeing(mut self, v: ArcSec) -> Self {
        self.config.seeing = v;
        self
    }
    pub fn optics_fwhm(mut self, v: ArcSec) -> Self {
        self.config.optics_fwhm = v;
        self
    }
    pub fn location(mut self, v: LocationSpec) -> Self {
        self.config.location = v;
        self
    }
    pub fn slew_rate(mut self, v: f64) -> Self {
        self.config.slew_rate = v;
        self
    }
    pub fn band_change_time(mut self, v: Second) -> Self {
        self.config.band_change_time = v;
        self
    }
    pub fn readout_time(mut self, v: Second) -> Self {
        self.config.readout_time = v;
        self
    }
    pub fn weather(mut self, v: WeatherConfig) -> Self {
        self.config.weather = Some(v);
        self
    }
    pub fn sky_brightness(mut self, v: SkyBrightnessConfig) -> Self {
        self.config.sky_brightness = Some(v);
        self
    }

    /// Finalize the builder.
    ///
    /// Return
    /// ----------
    /// * The [`SiteConfig`], or [`SurveyError::Configuration`] naming the first missing or
    ///   failing key.
    ///
    /// See also
    /// ------------
    /// * [`SiteConfig::validate`] – Validation rules.
    pub fn build(self) -> Result<SiteConfig, SurveyError> {
        let missing = |key: &str| SurveyError::Configuration(format!("missing site key `{key}`"));
        let latitude = self.latitude.ok_or_else(|| missing("latitude"))?;
        let longitude = self.longitude.ok_or_else(|| missing("longitude"))?;
        let elevation = self.elevation.ok_or_else(|| missing("elevation"))?;
        let wavelengths = self.wavelengths.ok_or_else(|| missing("wavelengths"))?;

        let config = SiteConfig {
            latitude,
            longitude,
            elevation,
            wavelengths,
            ..self.config
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod site_config_test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SiteConfig::builder().build().unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.wavelength("r").unwrap(), 635.0);
        assert_eq!(
            config.wavelength("b"),
            Err(SurveyError::UnknownBand("b".into()))
        );
        assert_eq!(config.location.resolve().unwrap().len(), 10);
    }

    #[test]
    fn test_empty_builder_requires_site_keys() {
        let err = SiteConfigBuilder::empty().build().unwrap_err();
        assert_eq!(
            err,
            SurveyError::Configuration("missing site key `latitude`".into())
        );

        let err = SiteConfigBuilder::empty()
            .latitude(0.0)
            .longitude(0.0)
            .elevation(0.0)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SurveyError::Configuration("missing site key `wavelengths`".into())
        );

        let ok = SiteConfigBuilder::empty()
            .latitude(0.0)
            .longitude(0.0)
            .elevation(0.0)
            .wavelengths([("g".to_string(), 475.0)].into_iter().collect())
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mismatched = SiteConfig::builder()
            .location(LocationSpec::Explicit {
                ra: vec![0.0, 10.0],
                decl: vec![0.0],
            })
            .build();
        assert!(matches!(mismatched, Err(SurveyError::Configuration(_))));

        assert!(SiteConfig::builder().latitude(95.0).build().is_err());
        assert!(SiteConfig::builder().slew_rate(-1.0).build().is_err());
        assert!(SiteConfig::builder()
            .location(LocationSpec::Grid { n_sites: 0 })
            .build()
            .is_err());
        assert!(SiteConfig::builder()
            .wavelengths([("r".to_string(), 635.0)].into_iter().collect())
            .build()
            .is_err());
    }

    #[test]
    fn test_resolve_overrides_per_key() {
        let overrides = SiteConfigOverrides {
            latitude: Some(-30.0),
            seeing: Some(1.2),
            location: Some(LocationSpec::Explicit {
                ra: vec![10.0],
                decl: vec![-20.0],
            }),
            ..Default::default()
        };
        let config = SiteConfig::resolve(SiteConfig::default(), overrides).unwrap();
        assert_eq!(config.latitude, -30.0);
        assert_eq!(config.seeing, 1.2);
        assert_eq!(config.longitude, -122.50);
        assert_eq!(config.readout_time, 20.0);
        assert_eq!(config.location.resolve().unwrap().ra(), &[10.0]);

        let bad = SiteConfigOverrides {
            readout_time: Some(f64::NAN),
            ..Default::default()
        };
        assert!(SiteConfig::resolve(SiteConfig::default(), bad).is_err());
    }

    #[test]
    fn test_validate_struct_literal() {
        assert_eq!(SiteConfig::default().validate(), Ok(()));

        let negative = SiteConfig {
            readout_time: -20.0,
            ..SiteConfig::default()
        };
        assert_eq!(
            negative.validate(),
            Err(SurveyError::Configuration(
                "readout_time must be a non-negative number, got -20".into()
            ))
        );

        let zero_wavelength = SiteConfig {
            wavelengths: [("g".to_string(), 0.0)].into_iter().collect(),
            ..SiteConfig::default()
        };
        assert!(matches!(
            zero_wavelength.validate(),
            Err(SurveyError::Configuration(_))
        ));
    }
}
