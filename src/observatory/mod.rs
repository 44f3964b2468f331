//! # Observation engine
//!
//! The [`ObservationEngine`] owns the simulated telescope: the current commanded time(s), the
//! current pointing set, the current optical band and the delay paid by the last move. From
//! that state and the [`SiteConfig`] it derives every physical quantity listed in
//! [`variables`].
//!
//! ## Overview
//!
//! - [`ObservationEngine::new`] validates the whole configuration, resolves the default pointing and loads
//!   the optional weather model and sky-brightness model.
//! - [`ObservationEngine::update`] is the only mutating operation. It validates the request,
//!   computes the slew/filter/readout delay and then replaces the state in one go; a rejected
//!   request leaves the engine untouched.
//! - The `calculate_*` family and [`ObservationEngine::compute`] are pure reads of the state.
//! - [`ObservationEngine::name_to_function`] exposes the static variable registry, restricted
//!   to the groups available for this engine.
//!
//! ## Delay
//!
//! ```text
//! delay[s] = slew_rate · separation(previous, requested) + band_change_time·[band changed] + readout_time
//! delay[d] = delay[s] / 86400
//! ```
//!
//! The engine never adds the delay to its own clock: callers read it back through the
//! reported observation times ([`EngineState::mjd`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use deepsurvey::observatory::{ObservationEngine, pointing::Location, site_config::SiteConfig};
//!
//! let mut engine = ObservationEngine::new(SiteConfig::default()).unwrap();
//! engine
//!     .update(&[60000.0], Some(&Location::single(0.0, 0.0)), Some("r"))
//!     .unwrap();
//! let airmass = engine.calculate_observation_airmass();
//! ```
//!
//! ## See also
//! ------------
//! * [`crate::survey::Survey`] – Step/reset control loop driving the engine.
//! * [`crate::coordinates`] – Site geometry used by every variable.

pub mod pointing;
pub mod site_config;
pub mod variables;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use nalgebra::DMatrix;

use crate::constants::{DEFAULT_BAND, DEFAULT_MJD, MJD};
use crate::coordinates::Site;
use crate::deepsurvey_errors::SurveyError;
use crate::observatory::pointing::{Location, PointingSet};
use crate::observatory::site_config::SiteConfig;
use crate::observatory::variables::{
    CalculationContext, EngineState, Variable, VariableGroup, VariableMap,
};
use crate::sky_brightness::{KrisciunasSchaefer, SkyBrightnessModel};
use crate::time::seconds_to_days;
use crate::weather::Weather;

/// Simulated telescope and its derived observing conditions.
#[derive(Debug)]
pub struct ObservationEngine {
    config: SiteConfig,
    site: Site,
    default_pointing: PointingSet,
    state: EngineState,
    weather: Option<Weather>,
    sky_model: Option<Box<dyn SkyBrightnessModel>>,
}

impl ObservationEngine {
    /// Build an engine from a site configuration.
    ///
    /// The engine starts at the reference epoch ([`DEFAULT_MJD`]) on the default pointing, in
    /// band `"g"`, with no delay.
    ///
    /// Arguments
    /// -----------------
    /// * `config`: the site configuration. When `config.weather` is set its
    ///   `weather_source_file` is read; when `config.sky_brightness` is set the
    ///   [`KrisciunasSchaefer`] model is installed.
    ///
    /// Return
    /// ----------
    /// * The engine, [`SurveyError::Configuration`] when [`SiteConfig::validate`] fails, or the
    ///   error raised while reading the weather file.
    pub fn new(config: SiteConfig) -> Result<Self, SurveyError> {
        config.validate()?;
        let site = config.site()?;
        let default_pointing = config.location.resolve()?;

        let weather = match &config.weather {
            Some(weather_config) => Some(Weather::from_config(
                weather_config.clone(),
                config.seeing,
            )?),
            None => None,
        };
        let sky_model: Option<Box<dyn SkyBrightnessModel>> = config
            .sky_brightness
            .as_ref()
            .map(|sky| Box::new(KrisciunasSchaefer::from_config(sky)) as Box<dyn SkyBrightnessModel>);

        let state = EngineState {
            times: vec![DEFAULT_MJD],
            pointing: default_pointing.clone(),
            band: DEFAULT_BAND.to_string(),
            delay: 0.0,
            seeing: config.seeing,
            clouds: weather.as_ref().map_or(0.0, Weather::base_clouds),
        };

        info!(
            "observation engine ready: site ({}, {}), {} default pointings, weather: {}, sky model: {}",
            site.latitude,
            site.longitude,
            default_pointing.len(),
            weather.is_some(),
            sky_model.is_some()
        );

        let mut engine = ObservationEngine {
            config,
            site,
            default_pointing,
            state,
            weather,
            sky_model,
        };
        engine.refresh_conditions();
        Ok(engine)
    }

    /// Install (or replace) the sky-brightness model.
    pub fn with_sky_brightness_model(mut self, model: impl SkyBrightnessModel + 'static) -> Self {
        self.sky_model = Some(Box::new(model));
        self
    }

    /// Install (or replace) the weather model and apply it to the current time.
    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self.refresh_conditions();
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn default_pointing(&self) -> &PointingSet {
        &self.default_pointing
    }

    pub fn weather(&self) -> Option<&Weather> {
        self.weather.as_ref()
    }

    pub fn has_sky_model(&self) -> bool {
        self.sky_model.is_some()
    }

    /// Reported observation times, commanded time plus delay.
    pub fn mjd(&self) -> Vec<MJD> {
        self.state.mjd()
    }

    /// Advance the engine.
    ///
    /// Arguments
    /// -----------------
    /// * `time`: the new commanded time(s), non-empty and finite.
    /// * `location`: new pointing; the current pointing is kept when `None`.
    /// * `band`: new band; the current band is kept when `None`.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` once the state has been replaced. [`SurveyError::InvalidAction`] for an
    ///   empty or non-finite time list or an invalid location, [`SurveyError::UnknownBand`]
    ///   for a band missing from the wavelength map. On error the state is unchanged.
    pub fn update(
        &mut self,
        time: &[MJD],
        location: Option<&Location>,
        band: Option<&str>,
    ) -> Result<(), SurveyError> {
        if time.is_empty() {
            return Err(SurveyError::InvalidAction(
                "at least one time is required".into(),
            ));
        }
        if let Some(bad) = time.iter().find(|t| !t.is_finite()) {
            return Err(SurveyError::InvalidAction(format!(
                "time must be finite, got {bad}"
            )));
        }
        if let Some(band) = band {
            self.config.wavelength(band)?;
        }
        let pointing = location.map(PointingSet::try_from).transpose()?;

        let target = pointing.as_ref().unwrap_or(&self.state.pointing);
        let separation = self.state.pointing.max_separation(target);
        let band_change = match band {
            Some(b) if b != self.state.band => self.config.band_change_time,
            _ => 0.0,
        };
        let delay = seconds_to_days(
            self.config.slew_rate * separation + band_change + self.config.readout_time,
        );

        self.state.times = time.to_vec();
        if let Some(pointing) = pointing {
            self.state.pointing = pointing;
        }
        if let Some(band) = band {
            self.state.band = band.to_string();
        }
        self.state.delay = delay;
        self.refresh_conditions();

        debug!(
            "engine update: {} time(s) from {}, {} pointing(s), band {}, delay {:.6} d",
            self.state.n_times(),
            self.state.times[0],
            self.state.n_sites(),
            self.state.band,
            delay
        );
        Ok(())
    }

    /// Return to the default pointing and band at `time`, without delay.
    pub fn reset(&mut self, time: MJD) {
        self.state.times = vec![time];
        self.state.pointing = self.default_pointing.clone();
        self.state.band = DEFAULT_BAND.to_string();
        self.state.delay = 0.0;
        self.state.seeing = self.config.seeing;
        self.refresh_conditions();
    }

    /// Apply the weather model to the mean commanded time.
    fn refresh_conditions(&mut self) {
        let Some(weather) = &self.weather else {
            return;
        };
        let mean = self.state.times.iter().sum::<f64>() / self.state.times.len() as f64;
        let subset = weather.condition(mean);
        self.state.seeing = weather.seeing(&subset);
        self.state.clouds = weather.clouds(&subset);
    }

    fn context(&self) -> CalculationContext<'_> {
        CalculationContext {
            state: &self.state,
            config: &self.config,
            site: &self.site,
            sky_model: self.sky_model.as_deref(),
        }
    }

    /// Evaluate one group of variables on the current state.
    pub fn calculate(&self, group: VariableGroup) -> VariableMap {
        group.compute(&self.context())
    }

    /// Evaluate a single variable on the current state.
    pub fn calculate_variable(&self, variable: Variable) -> DMatrix<f64> {
        let mut values = self.calculate(variable.group());
        values
            .remove(&variable)
            .unwrap_or_else(|| DMatrix::from_element(self.state.n_sites(), self.state.n_times(), f64::NAN))
    }

    /// `sun_ra`, `sun_decl`.
    pub fn calculate_sun_location(&self) -> VariableMap {
        self.calculate(VariableGroup::SunPosition)
    }

    pub fn calculate_sun_ha(&self) -> VariableMap {
        self.calculate(VariableGroup::SunHourAngle)
    }

    pub fn calculate_sun_airmass(&self) -> VariableMap {
        self.calculate(VariableGroup::SunAirmass)
    }

    /// `moon_ra`, `moon_decl`.
    pub fn calculate_moon_location(&self) -> VariableMap {
        self.calculate(VariableGroup::MoonPosition)
    }

    pub fn calculate_moon_ha(&self) -> VariableMap {
        self.calculate(VariableGroup::MoonHourAngle)
    }

    pub fn calculate_moon_airmass(&self) -> VariableMap {
        self.calculate(VariableGroup::MoonAirmass)
    }

    /// `moon_phase`, `moon_illumination`, `moon_elongation`, `moon_vmagnitude` and the
    /// per-pointing `moon_separation`.
    pub fn calculate_moon_brightness(&self) -> VariableMap {
        self.calculate(VariableGroup::MoonBrightness)
    }

    /// `alt`, `az` of every pointing.
    pub fn calculate_observation_alt_az(&self) -> VariableMap {
        self.calculate(VariableGroup::ObservationAltAz)
    }

    pub fn calculate_observation_ha(&self) -> VariableMap {
        self.calculate(VariableGroup::ObservationHourAngle)
    }

    /// Airmass of every pointing, `NaN` below the horizon.
    pub fn calculate_observation_airmass(&self) -> VariableMap {
        self.calculate(VariableGroup::ObservationAirmass)
    }

    pub fn calculate_lst(&self) -> VariableMap {
        self.calculate(VariableGroup::LocalSiderealTime)
    }

    /// `pt_seeing`, `band_seeing`, `fwhm`.
    pub fn calculate_seeing(&self) -> VariableMap {
        self.calculate(VariableGroup::Seeing)
    }

    /// `sky_magnitude`, `tau`, `teff`; all `NaN` without a sky-brightness model.
    pub fn calculate_sky_magnitude(&self) -> VariableMap {
        self.calculate(VariableGroup::SkyBrightness)
    }

    /// Groups that can be evaluated by this engine.
    pub fn available_groups(&self) -> impl Iterator<Item = VariableGroup> + '_ {
        VariableGroup::ALL
            .into_iter()
            .filter(|g| !g.requires_sky_model() || self.sky_model.is_some())
    }

    /// Map every available variable name to the group computing it.
    ///
    /// Built from the static registry; no variable is evaluated.
    pub fn name_to_function(&self) -> BTreeMap<&'static str, VariableGroup> {
        self.available_groups()
            .flat_map(|group| group.outputs().iter().map(move |v| (v.name(), group)))
            .collect()
    }

    /// Resolve a variable name against the available registry.
    ///
    /// Return
    /// ----------
    /// * The variable, or [`SurveyError::UnknownVariable`] when the name is unknown or its
    ///   group is not available (sky-brightness variables without a model).
    pub fn resolve_variable(&self, name: &str) -> Result<Variable, SurveyError> {
        let variable: Variable = name.parse()?;
        if variable.group().requires_sky_model() && self.sky_model.is_none() {
            return Err(SurveyError::UnknownVariable(format!(
                "{name} (no sky brightness model configured)"
            )));
        }
        Ok(variable)
    }

    /// Evaluate a set of variables, each group at most once.
    pub fn compute(&self, variables: &BTreeSet<Variable>) -> VariableMap {
        let groups: BTreeSet<VariableGroup> = variables.iter().map(|v| v.group()).collect();
        let ctx = self.context();
        groups
            .into_iter()
            .flat_map(|g| g.compute(&ctx))
            .filter(|(v, _)| variables.contains(v))
            .collect()
    }
}
