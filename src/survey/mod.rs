//! # Survey state machine
//!
//! A [`Survey`] wraps an [`ObservationEngine`] in a reset/step control loop suitable for a
//! scheduling policy or a reinforcement-learning agent.
//!
//! ## Lifecycle
//!
//! ```text
//!  Idle ──reset──▶ Running ──step (stop)──▶ Terminated
//!                   ▲   │                       │
//!                   └───┘ step                  │
//!                   ▲                           │
//!                   └──────────reset────────────┘
//! ```
//!
//! [`Survey::step`] is the only transition of a running episode:
//!
//! 1. the engine is updated with the action (time, optional pointing, optional band),
//! 2. the observation is computed (requested variables, validity, reported MJD),
//! 3. the per-step reward is derived from the monitored variable, clamped by the threshold
//!    and then by the validity mask,
//! 4. the step is appended to the [`EpisodeHistory`] and handed to the [`RewardPolicy`],
//! 5. the timestep counter is incremented and the stop policy evaluated.
//!
//! ## Policies
//!
//! - **Validity**: every constraint bound holds (ANDed, see [`Bound::is_satisfied`]).
//! - **Reward**: `value` or `1 / value` (`reward.min`); values not exceeding
//!   `reward.threshold` become `invalid_penalty`; invalid entries always become
//!   `invalid_penalty`.
//! - **Stop**: `timestep >= stopping.timestep` or any stopping bound breached anywhere
//!   (ORed, see [`Bound::is_breached`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use deepsurvey::observatory::{pointing::Location, site_config::SiteConfig};
//! use deepsurvey::survey::{Action, Survey, survey_config::{StartTime, SurveyConfig}};
//!
//! let config = SurveyConfig::builder()
//!     .start_time(StartTime::Fixed(59946.0))
//!     .build()
//!     .unwrap();
//! let mut survey = Survey::new(SiteConfig::default(), config).unwrap();
//! survey.reset();
//! let outcome = survey
//!     .step(&Action::at(59946.1).with_location(Location::single(10.0, 20.0)))
//!     .unwrap();
//! println!("reward {} stop {}", outcome.reward.total(), outcome.stop);
//! ```

pub mod history;
pub mod results;
pub mod rewards;
pub mod survey_config;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DAYS_PER_SECOND, MJD, RANDOM_START_RANGE};
use crate::deepsurvey_errors::SurveyError;
use crate::observatory::pointing::Location;
use crate::observatory::site_config::SiteConfig;
use crate::observatory::variables::{Variable, VariableMap};
use crate::observatory::ObservationEngine;
use crate::survey::history::EpisodeHistory;
use crate::survey::results::{StepRecord, SurveyResults};
use crate::survey::rewards::{PerStepReward, Reward, RewardPolicy};
use crate::survey::survey_config::{Bound, StartTime, SurveyConfig};

/// Command of one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    /// Commanded time(s); the previous reported MJD plus `timestep_size` when absent.
    #[serde(deserialize_with = "one_or_many")]
    pub time: Option<Vec<MJD>>,
    pub location: Option<Location>,
    pub band: Option<String>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<MJD>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(MJD),
        Many(Vec<MJD>),
    }
    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|t| match t {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(t) => t,
        }),
    )
}

impl Action {
    /// Action at a single time, keeping pointing and band.
    pub fn at(time: MJD) -> Self {
        Action {
            time: Some(vec![time]),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_band(mut self, band: &str) -> Self {
        self.band = Some(band.to_string());
        self
    }
}

/// What the survey reports after a reset or a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Requested variables, every matrix `sites × times`.
    pub variables: VariableMap,
    pub valid: DMatrix<bool>,
    /// Reported times, commanded time plus delay.
    pub mjd: Vec<MJD>,
}

impl Observation {
    /// Values of a variable by name.
    pub fn get(&self, name: &str) -> Option<&DMatrix<f64>> {
        let variable: Variable = name.parse().ok()?;
        self.variables.get(&variable)
    }

    /// Mean reported time.
    pub fn mean_mjd(&self) -> MJD {
        self.mjd.iter().sum::<f64>() / self.mjd.len() as f64
    }
}

/// Diagnostics of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLog {
    pub timestep: usize,
    /// Delay paid by the step (days).
    pub delay: f64,
    /// Entries with at least one `NaN` variable (targets below the horizon, ...).
    pub degenerate: usize,
}

/// Result of [`Survey::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: Reward,
    pub stop: bool,
    pub log: StepLog,
}

/// Phase of the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeStatus {
    Idle,
    Running,
    Terminated,
}

/// Step/reset control loop around an observation engine.
#[derive(Debug)]
pub struct Survey {
    engine: ObservationEngine,
    config: SurveyConfig,
    variables: BTreeSet<Variable>,
    monitor: Variable,
    constraints: Vec<(Variable, Bound)>,
    stop_conditions: Vec<(Variable, Bound)>,
    policy: Box<dyn RewardPolicy>,
    rng: StdRng,
    status: EpisodeStatus,
    timestep: usize,
    history: EpisodeHistory,
    last_mjd: MJD,
}

impl Survey {
    /// Build a survey and its engine.
    ///
    /// Return
    /// ----------
    /// * The survey in the [`EpisodeStatus::Idle`] state, or the first configuration error
    ///   (invalid site, invalid survey, unknown variable).
    pub fn new(site: SiteConfig, config: SurveyConfig) -> Result<Self, SurveyError> {
        Survey::with_engine(ObservationEngine::new(site)?, config)
    }

    /// Build a survey around an existing engine.
    ///
    /// Every variable named by the configuration (reported variables, reward monitor,
    /// constraints, stopping conditions) is resolved here against the registry of the engine,
    /// so evaluation never meets an unknown name.
    pub fn with_engine(
        engine: ObservationEngine,
        config: SurveyConfig,
    ) -> Result<Self, SurveyError> {
        config.validate()?;

        let resolve = |bounds: &BTreeMap<String, Bound>| -> Result<Vec<(Variable, Bound)>, SurveyError> {
            bounds
                .iter()
                .map(|(name, bound)| Ok((engine.resolve_variable(name)?, *bound)))
                .collect()
        };
        let constraints = resolve(&config.constraints)?;
        let stop_conditions = resolve(&config.stopping.conditions)?;
        let monitor = engine.resolve_variable(&config.reward.monitor)?;
        let variables = config
            .referenced_variables()
            .into_iter()
            .map(|name| engine.resolve_variable(name))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let last_mjd = engine.mjd().iter().sum::<f64>() / engine.mjd().len() as f64;

        info!(
            "survey ready: monitor {}, {} variable(s), {} constraint(s), {} stop condition(s), max timestep {}",
            monitor,
            variables.len(),
            constraints.len(),
            stop_conditions.len(),
            config.stopping.timestep
        );

        Ok(Survey {
            engine,
            config,
            variables,
            monitor,
            constraints,
            stop_conditions,
            policy: Box::new(PerStepReward),
            rng,
            status: EpisodeStatus::Idle,
            timestep: 0,
            history: EpisodeHistory::new(),
            last_mjd,
        })
    }

    /// Replace the reward policy.
    pub fn with_reward_policy(mut self, policy: impl RewardPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn engine(&self) -> &ObservationEngine {
        &self.engine
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn history(&self) -> &EpisodeHistory {
        &self.history
    }

    /// Variables computed at every step.
    pub fn variables(&self) -> &BTreeSet<Variable> {
        &self.variables
    }

    fn start_time(&mut self) -> MJD {
        match self.config.start_time {
            StartTime::Fixed(mjd) => mjd,
            StartTime::Random => {
                let (low, high) = RANDOM_START_RANGE;
                self.rng.random_range(low..high) as f64
            }
        }
    }

    /// Start a new episode.
    ///
    /// The timestep returns to 0, the history is emptied, the start time is resolved and the
    /// engine goes back to its default pointing and band.
    ///
    /// Return
    /// ----------
    /// * The observation at the start time.
    pub fn reset(&mut self) -> Observation {
        let start = self.start_time();
        self.engine.reset(start);
        self.timestep = 0;
        self.history.clear();
        self.status = EpisodeStatus::Running;

        let observation = self.observe();
        self.last_mjd = observation.mean_mjd();
        info!("survey reset at mjd {start}");
        observation
    }

    /// Apply one action.
    ///
    /// Arguments
    /// -----------------
    /// * `action`: commanded time(s), optional pointing and optional band.
    ///
    /// Return
    /// ----------
    /// * The [`StepOutcome`]. [`SurveyError::EpisodeNotStarted`] before the first
    ///   [`Survey::reset`], [`SurveyError::EpisodeTerminated`] after a stop, or the engine
    ///   error for an invalid action (the episode is then left unchanged).
    pub fn step(&mut self, action: &Action) -> Result<StepOutcome, SurveyError> {
        match self.status {
            EpisodeStatus::Idle => return Err(SurveyError::EpisodeNotStarted),
            EpisodeStatus::Terminated => return Err(SurveyError::EpisodeTerminated),
            EpisodeStatus::Running => {}
        }

        let time = match &action.time {
            Some(time) => time.clone(),
            None => vec![self.last_mjd + self.config.timestep_size * DAYS_PER_SECOND],
        };
        self.engine
            .update(&time, action.location.as_ref(), action.band.as_deref())?;

        let observation = self.observe();
        let step_reward = self.step_reward(&observation);
        self.history.record(self.engine.state(), &step_reward);
        let reward = self.policy.compute(&step_reward, &self.history);

        self.timestep += 1;
        let stop = self.stop_condition(&observation);
        self.last_mjd = observation.mean_mjd();

        let log = StepLog {
            timestep: self.timestep,
            delay: self.engine.state().delay,
            degenerate: degenerate_count(&observation),
        };
        debug!(
            "step {}: mjd {:.5}, delay {:.6} d, reward {:.4}, {} degenerate, stop {}",
            log.timestep,
            self.last_mjd,
            log.delay,
            reward.total(),
            log.degenerate,
            stop
        );

        if stop {
            self.status = EpisodeStatus::Terminated;
            info!("survey terminated after {} step(s)", self.timestep);
        }

        Ok(StepOutcome {
            observation,
            reward,
            stop,
            log,
        })
    }

    /// Run a whole episode on the default pointing, advancing by `timestep_size`.
    ///
    /// Return
    /// ----------
    /// * Every step keyed by its mean reported MJD.
    pub fn run(&mut self) -> Result<SurveyResults, SurveyError> {
        self.reset();
        let action = Action {
            time: None,
            location: Some(self.engine.default_pointing().to_location()),
            band: None,
        };
        let mut results = SurveyResults::new();
        loop {
            let outcome = self.step(&action)?;
            results.insert(
                outcome.observation.mean_mjd(),
                StepRecord::new(&outcome.observation, &outcome.reward),
            )?;
            if outcome.stop {
                return Ok(results);
            }
        }
    }

    fn observe(&self) -> Observation {
        let variables = self.engine.compute(&self.variables);
        let (n, m) = (self.engine.state().n_sites(), self.engine.state().n_times());
        let valid = DMatrix::from_fn(n, m, |i, j| {
            self.constraints
                .iter()
                .all(|(v, bound)| variables.get(v).is_some_and(|x| bound.is_satisfied(x[(i, j)])))
        });
        Observation {
            variables,
            valid,
            mjd: self.engine.mjd(),
        }
    }

    /// Monitored value, inverted when minimised, clamped by the threshold then by validity.
    fn step_reward(&self, observation: &Observation) -> DMatrix<f64> {
        let penalty = self.config.invalid_penalty;
        let spec = &self.config.reward;
        let Some(values) = observation.variables.get(&self.monitor) else {
            return observation.valid.map(|_| penalty);
        };
        let mut reward = if spec.min {
            values.map(|x| x.recip())
        } else {
            values.clone()
        };
        if let Some(threshold) = spec.threshold {
            reward.apply(|r| {
                if !(*r > threshold) {
                    *r = penalty;
                }
            });
        }
        reward.zip_map(&observation.valid, |r, valid| if valid { r } else { penalty })
    }

    fn stop_condition(&self, observation: &Observation) -> bool {
        if self.timestep >= self.config.stopping.timestep {
            return true;
        }
        self.stop_conditions.iter().any(|(v, bound)| {
            observation
                .variables
                .get(v)
                .is_some_and(|x| x.iter().any(|&value| bound.is_breached(value)))
        })
    }
}

/// Number of (site, time) entries where any variable is `NaN`.
fn degenerate_count(observation: &Observation) -> usize {
    let (n, m) = observation.valid.shape();
    (0..n)
        .flat_map(|i| (0..m).map(move |j| (i, j)))
        .filter(|&(i, j)| observation.variables.values().any(|x| x[(i, j)].is_nan()))
        .count()
}

#[cfg(test)]
mod survey_test {
    use super::*;
    use crate::observatory::site_config::LocationSpec;
    use approx::assert_abs_diff_eq;

    fn single_site() -> SiteConfig {
        SiteConfig {
            location: LocationSpec::Explicit {
                ra: vec![0.0],
                decl: vec![0.0],
            },
            ..SiteConfig::default()
        }
    }

    fn fixed(timestep: usize) -> SurveyConfig {
        SurveyConfig::builder()
            .start_time(StartTime::Fixed(60000.0))
            .max_timestep(timestep)
            .build()
            .unwrap()
    }

    #[test]
    fn test_step_before_reset() {
        let mut survey = Survey::new(single_site(), fixed(5)).unwrap();
        assert_eq!(survey.status(), EpisodeStatus::Idle);
        assert_eq!(
            survey.step(&Action::at(60000.0)),
            Err(SurveyError::EpisodeNotStarted)
        );
    }

    #[test]
    fn test_unknown_variable_fails_at_construction() {
        let config = SurveyConfig::builder()
            .variables(["airmass", "seeing_index"])
            .build()
            .unwrap();
        assert_eq!(
            Survey::new(single_site(), config).unwrap_err(),
            SurveyError::UnknownVariable("seeing_index".into())
        );
    }

    #[test]
    fn test_constraint_variables_are_observed() {
        let config = SurveyConfig::builder()
            .variables(["alt"])
            .stop_condition("sun_airmass", Bound::new(1.0, true))
            .build()
            .unwrap();
        let survey = Survey::new(single_site(), config).unwrap();
        assert!(survey.variables().contains(&Variable::Airmass));
        assert!(survey.variables().contains(&Variable::SunAirmass));
        assert!(survey.variables().contains(&Variable::Alt));
    }

    #[test]
    fn test_time_advances_without_explicit_time() {
        let mut survey = Survey::new(single_site(), fixed(10)).unwrap();
        let start = survey.reset();
        assert_eq!(start.mjd, vec![60000.0]);

        let outcome = survey.step(&Action::default()).unwrap();
        let readout = 20.0 * DAYS_PER_SECOND;
        assert_abs_diff_eq!(
            outcome.observation.mjd[0],
            60000.0 + 300.0 * DAYS_PER_SECOND + readout,
            epsilon = 1e-9
        );
        assert_eq!(outcome.log.timestep, 1);
        assert_abs_diff_eq!(outcome.log.delay, readout, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_action_keeps_episode() {
        let mut survey = Survey::new(single_site(), fixed(10)).unwrap();
        survey.reset();
        let bad = Action::at(60000.0).with_location(Location::new(vec![0.0, 1.0], vec![0.0]));
        assert!(matches!(survey.step(&bad), Err(SurveyError::InvalidAction(_))));
        assert_eq!(survey.timestep(), 0);
        assert!(survey.history().is_empty());
    }

    #[test]
    fn test_run_until_timestep() {
        let mut survey = Survey::new(single_site(), fixed(4)).unwrap();
        let results = survey.run().unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(survey.status(), EpisodeStatus::Terminated);
        for (_, record) in results.iter() {
            assert_eq!(record.reward.len(), 1);
            assert!(record.variables.contains_key("airmass"));
        }
    }

    #[test]
    fn test_seeded_random_start() {
        let config = SurveyConfig::builder().seed(7).build().unwrap();
        let mut a = Survey::new(single_site(), config.clone()).unwrap();
        let mut b = Survey::new(single_site(), config).unwrap();
        let (ta, tb) = (a.reset().mjd[0], b.reset().mjd[0]);
        assert_eq!(ta, tb);
        assert!((55000.0..70000.0).contains(&ta));
        assert_eq!(ta.fract(), 0.0);
    }
}
