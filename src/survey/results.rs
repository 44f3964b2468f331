//! # Survey results
//!
//! Flat, serialisable records of a survey run, handed to an external persistence layer.
//!
//! - [`SurveyResults`] – MJD → [`StepRecord`] (every observed variable plus the reward as
//!   `f32` arrays), produced by [`Survey::run`](crate::survey::Survey::run).
//! - [`RunRecord`] – the site and survey configurations of a run together with a generated
//!   run identifier `"<UTC timestamp>_<4 digits>"`.

use std::collections::BTreeMap;

use hifitime::Epoch;
use ordered_float::NotNan;
use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::constants::MJD;
use crate::deepsurvey_errors::SurveyError;
use crate::observatory::site_config::SiteConfig;
use crate::survey::rewards::Reward;
use crate::survey::survey_config::SurveyConfig;
use crate::survey::Observation;

/// Observation and reward of one step, flattened column by column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepRecord {
    pub variables: BTreeMap<String, Vec<f32>>,
    pub valid: Vec<bool>,
    pub reward: Vec<f32>,
}

impl StepRecord {
    pub fn new(observation: &Observation, reward: &Reward) -> Self {
        let variables = observation
            .variables
            .iter()
            .map(|(v, m)| (v.name().to_string(), m.iter().map(|&x| x as f32).collect()))
            .collect();
        let reward = match reward {
            Reward::Sites(m) => m.iter().map(|&x| x as f32).collect(),
            Reward::Episode(r) => vec![*r as f32],
        };
        StepRecord {
            variables,
            valid: observation.valid.iter().copied().collect(),
            reward,
        }
    }
}

/// Steps of a survey run keyed by their reported MJD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyResults {
    steps: BTreeMap<NotNan<MJD>, StepRecord>,
}

impl SurveyResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a step; a `NaN` time is rejected.
    pub fn insert(&mut self, mjd: MJD, record: StepRecord) -> Result<(), SurveyError> {
        let key = NotNan::new(mjd)
            .map_err(|_| SurveyError::InvalidAction("result time must not be NaN".into()))?;
        self.steps.insert(key, record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, mjd: MJD) -> Option<&StepRecord> {
        NotNan::new(mjd).ok().and_then(|k| self.steps.get(&k))
    }

    /// Steps in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (MJD, &StepRecord)> {
        self.steps.iter().map(|(k, v)| (k.into_inner(), v))
    }
}

impl Serialize for SurveyResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.steps.len()))?;
        for (mjd, record) in &self.steps {
            map.serialize_entry(&mjd.to_string(), record)?;
        }
        map.end()
    }
}

/// Configuration of a run, as stored next to its results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub site: SiteConfig,
    pub survey: SurveyConfig,
}

impl RunRecord {
    /// Bundle both configurations with a fresh identifier.
    ///
    /// Return
    /// ----------
    /// * The record, or [`SurveyError::Clock`] when the system time is unavailable.
    pub fn new(site: SiteConfig, survey: SurveyConfig) -> Result<Self, SurveyError> {
        Ok(RunRecord {
            run_id: generate_run_id(&mut rand::rng())?,
            site,
            survey,
        })
    }
}

/// Run identifier `"<UTC timestamp>_<4 digits>"`.
pub fn generate_run_id(rng: &mut impl Rng) -> Result<String, SurveyError> {
    let now = Epoch::now().map_err(|e| SurveyError::Clock(e.to_string()))?;
    let (y, mo, d, h, mi, s, _) = now.to_gregorian_utc();
    let suffix: u16 = rng.random_range(0..10_000);
    Ok(format!(
        "{y:04}{mo:02}{d:02}T{h:02}{mi:02}{s:02}_{suffix:04}"
    ))
}
