//! # Survey configuration
//!
//! [`SurveyConfig`] describes one survey episode: which variable drives the reward, which
//! bounds make an observation valid, when the episode stops, how time advances and how the
//! episode starts.
//!
//! ## Bound semantics
//!
//! A [`Bound`] is read in two ways:
//!
//! | `lesser` | valid when       | stops when       |
//! |----------|------------------|------------------|
//! | `true`   | `value >= bound` | `value <= bound` |
//! | `false`  | `value <= bound` | `value >= bound` |
//!
//! `NaN` values are never valid and never trigger a stop.
//!
//! ## Serialized form
//!
//! ```yaml
//! reward: { monitor: airmass, min: true }
//! constraints:
//!   airmass: { value: 2.0, lesser: false }
//! stopping:
//!   timestep: 400
//!   sun_airmass: { value: 1.0, lesser: true }
//! timestep_size: 300
//! start_time: random      # or an MJD, e.g. 59946
//! invalid_penalty: -100
//! variables: [airmass, alt, ha, lst, moon_airmass, sun_airmass]
//! save: ./equatorial_survey/
//! ```

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::constants::{Second, MJD};
use crate::deepsurvey_errors::SurveyError;

/// Variable driving the per-step reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSpec {
    pub monitor: String,
    /// Reward `1 / value` instead of `value`.
    #[serde(default)]
    pub min: bool,
    /// Rewards not exceeding the threshold are replaced by the invalid penalty.
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl Default for RewardSpec {
    fn default() -> Self {
        RewardSpec {
            monitor: "airmass".into(),
            min: true,
            threshold: None,
        }
    }
}

/// A bound on one variable, see the module documentation for the direction rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: f64,
    #[serde(default)]
    pub lesser: bool,
}

impl Bound {
    pub fn new(value: f64, lesser: bool) -> Self {
        Bound { value, lesser }
    }

    /// Validity test.
    pub fn is_satisfied(&self, x: f64) -> bool {
        if self.lesser {
            x >= self.value
        } else {
            x <= self.value
        }
    }

    /// Stopping test.
    pub fn is_breached(&self, x: f64) -> bool {
        if self.lesser {
            x <= self.value
        } else {
            x >= self.value
        }
    }
}

/// Termination of an episode: a maximum number of steps and optional variable bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppingSpec {
    pub timestep: usize,
    #[serde(flatten)]
    pub conditions: BTreeMap<String, Bound>,
}

impl Default for StoppingSpec {
    fn default() -> Self {
        StoppingSpec {
            timestep: 400,
            conditions: BTreeMap::new(),
        }
    }
}

/// Start of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StartTimeRepr", into = "StartTimeRepr")]
pub enum StartTime {
    /// Integer MJD drawn uniformly in `[55000, 70000)` at every reset.
    Random,
    Fixed(MJD),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StartTimeRepr {
    Fixed(MJD),
    Keyword(String),
}

impl TryFrom<StartTimeRepr> for StartTime {
    type Error = String;

    fn try_from(repr: StartTimeRepr) -> Result<Self, Self::Error> {
        match repr {
            StartTimeRepr::Fixed(mjd) => Ok(StartTime::Fixed(mjd)),
            StartTimeRepr::Keyword(k) if k == "random" => Ok(StartTime::Random),
            StartTimeRepr::Keyword(k) => Err(format!(
                "start_time must be \"random\" or an MJD, got {k:?}"
            )),
        }
    }
}

impl From<StartTime> for StartTimeRepr {
    fn from(start: StartTime) -> Self {
        match start {
            StartTime::Random => StartTimeRepr::Keyword("random".into()),
            StartTime::Fixed(mjd) => StartTimeRepr::Fixed(mjd),
        }
    }
}

/// Immutable configuration of a survey episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub reward: RewardSpec,
    /// Validity constraints, ANDed.
    pub constraints: BTreeMap<String, Bound>,
    pub stopping: StoppingSpec,
    /// Advance of the clock when a step carries no time (seconds).
    pub timestep_size: Second,
    pub start_time: StartTime,
    pub invalid_penalty: f64,
    /// Variables reported in every observation.
    pub variables: Vec<String>,
    /// Destination of the saved results, used by external persistence.
    pub save: Utf8PathBuf,
    /// Seed of the random start time; entropy from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        SurveyConfig {
            reward: RewardSpec::default(),
            constraints: BTreeMap::from([("airmass".to_string(), Bound::new(2.0, false))]),
            stopping: StoppingSpec::default(),
            timestep_size: 300.0,
            start_time: StartTime::Random,
            invalid_penalty: -100.0,
            variables: ["airmass", "alt", "ha", "lst", "moon_airmass", "sun_airmass"]
                .into_iter()
                .map(String::from)
                .collect(),
            save: Utf8PathBuf::from("./equatorial_survey/"),
            seed: None,
        }
    }
}

impl SurveyConfig {
    pub fn builder() -> SurveyConfigBuilder {
        SurveyConfigBuilder::new()
    }

    /// Check the configuration, see [`SurveyConfigBuilder::build`] for the rules.
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.reward.monitor.trim().is_empty() {
            return Err(SurveyError::Configuration(
                "reward.monitor must name a variable".into(),
            ));
        }
        if let Some(th) = self.reward.threshold {
            if !th.is_finite() {
                return Err(SurveyError::Configuration(format!(
                    "reward.threshold must be finite, got {th}"
                )));
            }
        }
        for (section, bounds) in [
            ("constraints", &self.constraints),
            ("stopping", &self.stopping.conditions),
        ] {
            if let Some((name, bound)) = bounds.iter().find(|(_, b)| !b.value.is_finite()) {
                return Err(SurveyError::Configuration(format!(
                    "{section}.{name}.value must be finite, got {}",
                    bound.value
                )));
            }
        }
        if !(self.timestep_size.is_finite() && self.timestep_size > 0.0) {
            return Err(SurveyError::Configuration(format!(
                "timestep_size must be positive, got {}",
                self.timestep_size
            )));
        }
        if let StartTime::Fixed(mjd) = self.start_time {
            if !mjd.is_finite() {
                return Err(SurveyError::Configuration(format!(
                    "start_time must be finite, got {mjd}"
                )));
            }
        }
        if !self.invalid_penalty.is_finite() {
            return Err(SurveyError::Configuration(format!(
                "invalid_penalty must be finite, got {}",
                self.invalid_penalty
            )));
        }
        Ok(())
    }

    /// Every variable name the survey needs: the reported variables, the monitor, and the
    /// constraint and stopping variables, without duplicates.
    pub fn referenced_variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.iter().map(String::as_str).collect();
        names.push(&self.reward.monitor);
        names.extend(self.constraints.keys().map(String::as_str));
        names.extend(self.stopping.conditions.keys().map(String::as_str));
        let mut seen = std::collections::BTreeSet::new();
        names.retain(|n| seen.insert(*n));
        names
    }

    /// Merge `overrides` on top of `defaults` key by key and validate the result.
    ///
    /// Return
    /// ----------
    /// * The validated configuration, or [`SurveyError::Configuration`].
    ///
    /// See also
    /// ------------
    /// * [`SurveyConfigBuilder::build`] – Validation rules.
    pub fn resolve(
        defaults: SurveyConfig,
        overrides: SurveyConfigOverrides,
    ) -> Result<SurveyConfig, SurveyError> {
        let merged = SurveyConfig {
            reward: overrides.reward.unwrap_or(defaults.reward),
            constraints: overrides.constraints.unwrap_or(defaults.constraints),
            stopping: overrides.stopping.unwrap_or(defaults.stopping),
            timestep_size: overrides.timestep_size.unwrap_or(defaults.timestep_size),
            start_time: overrides.start_time.unwrap_or(defaults.start_time),
            invalid_penalty: overrides.invalid_penalty.unwrap_or(defaults.invalid_penalty),
            variables: overrides.variables.unwrap_or(defaults.variables),
            save: overrides.save.unwrap_or(defaults.save),
            seed: overrides.seed.or(defaults.seed),
        };
        SurveyConfigBuilder { config: merged }.build()
    }
}

/// Partial [`SurveyConfig`]: every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfigOverrides {
    pub reward: Option<RewardSpec>,
    pub constraints: Option<BTreeMap<String, Bound>>,
    pub stopping: Option<StoppingSpec>,
    pub timestep_size: Option<Second>,
    pub start_time: Option<StartTime>,
    pub invalid_penalty: Option<f64>,
    pub variables: Option<Vec<String>>,
    pub save: Option<Utf8PathBuf>,
    pub seed: Option<u64>,
}

/// Builder for [`SurveyConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct SurveyConfigBuilder {
    config: SurveyConfig,
}

impl SurveyConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reward(mut self, v: RewardSpec) -> Self {
        self.config.reward = v;
        self
    }
    pub fn constraint(mut self, name: &str, bound: Bound) -> Self {
        self.config.constraints.insert(name.to_string(), bound);
        self
    }
    pub fn constraints(mut self, v: BTreeMap<String, Bound>) -> Self {
        self.config.constraints = v;
        self
    }
    pub fn max_timestep(mut self, v: usize) -> Self {
        self.config.stopping.timestep = v;
        self
    }
    pub fn stop_condition(mut self, name: &str, bound: Bound) -> Self {
        self.config.stopping.conditions.insert(name.to_string(), bound);
        self
    }
    pub fn timestep_size(mut self, v: Second) -> Self {
        self.config.timestep_size = v;
        self
    }
    pub fn start_time(mut self, v: StartTime) -> Self {
        self.config.start_time = v;
        self
    }
    pub fn invalid_penalty(mut self, v: f64) -> Self {
        self.config.invalid_penalty = v;
        self
    }
    pub fn variables<S: Into<String>>(mut self, v: impl IntoIterator<Item = S>) -> Self {
        self.config.variables = v.into_iter().map(Into::into).collect();
        self
    }
    pub fn save(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.save = v.into();
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.config.seed = Some(v);
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `reward.monitor` is not empty and `reward.threshold`, when set, is finite.
    /// * Every bound value is finite (`NaN` would make the bound meaningless).
    /// * `timestep_size` is finite and strictly positive.
    /// * A fixed `start_time` is finite.
    /// * `invalid_penalty` is finite.
    ///
    /// Variable names are checked later, against the registry of the engine, when the
    /// [`Survey`](crate::survey::Survey) is built.
    pub fn build(self) -> Result<SurveyConfig, SurveyError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod survey_config_test {
    use super::*;

    #[test]
    fn test_bound_directions() {
        let lower = Bound::new(5.0, true);
        assert!(lower.is_satisfied(10.0));
        assert!(!lower.is_breached(10.0));
        assert!(!lower.is_satisfied(3.0));
        assert!(lower.is_breached(3.0));

        let upper = Bound::new(5.0, false);
        assert!(!upper.is_satisfied(10.0));
        assert!(upper.is_breached(10.0));
        assert!(upper.is_satisfied(3.0));
        assert!(!upper.is_breached(3.0));

        assert!(!lower.is_satisfied(f64::NAN));
        assert!(!lower.is_breached(f64::NAN));
    }

    #[test]
    fn test_referenced_variables() {
        let config = SurveyConfig::builder()
            .variables(["alt", "airmass"])
            .stop_condition("sun_airmass", Bound::new(1.0, true))
            .build()
            .unwrap();
        assert_eq!(
            config.referenced_variables(),
            vec!["alt", "airmass", "sun_airmass"]
        );
    }

    #[test]
    fn test_builder_validation() {
        assert!(SurveyConfig::builder().timestep_size(0.0).build().is_err());
        assert!(SurveyConfig::builder()
            .start_time(StartTime::Fixed(f64::INFINITY))
            .build()
            .is_err());
        assert!(SurveyConfig::builder()
            .constraint("alt", Bound::new(f64::NAN, true))
            .build()
            .is_err());
        assert!(SurveyConfig::builder()
            .reward(RewardSpec {
                monitor: " ".into(),
                min: false,
                threshold: None
            })
            .build()
            .is_err());
        assert_eq!(SurveyConfig::builder().build().unwrap(), SurveyConfig::default());
    }

    #[test]
    fn test_resolve_keeps_unset_keys() {
        let overrides = SurveyConfigOverrides {
            start_time: Some(StartTime::Fixed(59946.0)),
            invalid_penalty: Some(0.0),
            ..Default::default()
        };
        let config = SurveyConfig::resolve(SurveyConfig::default(), overrides).unwrap();
        assert_eq!(config.start_time, StartTime::Fixed(59946.0));
        assert_eq!(config.invalid_penalty, 0.0);
        assert_eq!(config.stopping.timestep, 400);
        assert_eq!(config.reward, RewardSpec::default());
        assert_eq!(config.constraints["airmass"], Bound::new(2.0, false));
    }

    #[test]
    fn test_start_time_conversion() {
        assert_eq!(
            StartTime::try_from(StartTimeRepr::Keyword("random".into())),
            Ok(StartTime::Random)
        );
        assert_eq!(
            StartTime::try_from(StartTimeRepr::Fixed(60000.0)),
            Ok(StartTime::Fixed(60000.0))
        );
        assert!(StartTime::try_from(StartTimeRepr::Keyword("tomorrow".into())).is_err());
    }
}
