//! # Reward policies
//!
//! A [`RewardPolicy`] turns the per-step reward of the survey (one value per observed site
//! and time) into the reward handed back by [`Survey::step`](crate::survey::Survey::step),
//! with read access to the whole [`EpisodeHistory`].
//!
//! ## Policies
//!
//! - [`PerStepReward`] – the per-step matrix unchanged (default).
//! - [`UniformSurvey`] – one number for the whole episode, favouring an even distribution of
//!   effort ([`UniformMode::Site`]) or of quality ([`UniformMode::Quality`]).
//! - [`LowVisibilitySurvey`] – one number for the whole episode, favouring visits of a fixed
//!   list of required sites.
//!
//! Episode-level policies return `0` while the history is empty and whenever the computed
//! value is `NaN` or `−∞`.
//!
//! ## Formulae
//!
//! With `N` history rows, `cᵢ` the number of rows per action descriptor and `rₖ` the per-step
//! rewards:
//!
//! ```text
//! site     : 1 / (N · var(c)) · Σ rₖ           (rows of actions with c < threshold count 0)
//! quality  : var(r) / N · Σ rₖ                 (rows with rₖ < threshold count 0)
//! low vis. : (weight · Σ rₖ + #required sites hit) / N
//! ```

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::constants::MJD;
use crate::observatory::pointing::{site_key, Location};
use crate::survey::history::{population_variance, EpisodeHistory, HistoryRow};

/// Reward of one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Reward {
    /// One value per (site, time).
    Sites(DMatrix<f64>),
    /// One value for the whole episode so far.
    Episode(f64),
}

impl Reward {
    /// Sum over every entry.
    pub fn total(&self) -> f64 {
        match self {
            Reward::Sites(m) => m.sum(),
            Reward::Episode(r) => *r,
        }
    }

    pub fn as_sites(&self) -> Option<&DMatrix<f64>> {
        match self {
            Reward::Sites(m) => Some(m),
            Reward::Episode(_) => None,
        }
    }

    pub fn as_episode(&self) -> Option<f64> {
        match self {
            Reward::Episode(r) => Some(*r),
            Reward::Sites(_) => None,
        }
    }
}

/// Strategy computing the reward returned by a step.
pub trait RewardPolicy: std::fmt::Debug {
    /// Arguments
    /// -----------------
    /// * `step_reward`: reward of the current step after threshold and validity clamping.
    /// * `history`: every row of the episode, the current step included.
    fn compute(&self, step_reward: &DMatrix<f64>, history: &EpisodeHistory) -> Reward;
}

/// Return the per-step reward as is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerStepReward;

impl RewardPolicy for PerStepReward {
    fn compute(&self, step_reward: &DMatrix<f64>, _history: &EpisodeHistory) -> Reward {
        Reward::Sites(step_reward.clone())
    }
}

fn neutralize(reward: f64) -> f64 {
    if reward.is_nan() || reward == f64::NEG_INFINITY {
        0.0
    } else {
        reward
    }
}

/// What [`UniformSurvey`] measures the uniformity of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformMode {
    /// Number of visits per action.
    #[default]
    Site,
    /// Per-step reward.
    Quality,
}

/// Reward an evenly distributed survey.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformSurvey {
    pub threshold: f64,
    pub mode: UniformMode,
}

impl Default for UniformSurvey {
    fn default() -> Self {
        UniformSurvey {
            threshold: 1.0,
            mode: UniformMode::Site,
        }
    }
}

impl UniformSurvey {
    pub fn new(threshold: f64, mode: UniformMode) -> Self {
        UniformSurvey { threshold, mode }
    }

    fn site_reward(&self, history: &EpisodeHistory) -> f64 {
        let counts = history.action_counts();
        let n = history.len() as f64;
        let scale = 1.0 / (n * population_variance(counts.values().map(|&c| c as f64)));

        let sum: f64 = history
            .rows()
            .iter()
            .filter(|row| {
                counts
                    .get(row.action.as_str())
                    .is_some_and(|&c| c as f64 >= self.threshold)
            })
            .map(|row| row.reward)
            .sum();
        scale * sum
    }

    fn quality_reward(&self, history: &EpisodeHistory) -> f64 {
        let n = history.len() as f64;
        let scale = population_variance(history.rewards()) / n;
        let sum: f64 = history.rewards().filter(|r| r >= &self.threshold).sum();
        scale * sum
    }
}

impl RewardPolicy for UniformSurvey {
    fn compute(&self, _step_reward: &DMatrix<f64>, history: &EpisodeHistory) -> Reward {
        if history.is_empty() {
            return Reward::Episode(0.0);
        }
        let reward = match self.mode {
            UniformMode::Site => self.site_reward(history),
            UniformMode::Quality => self.quality_reward(history),
        };
        Reward::Episode(neutralize(reward))
    }
}

/// A site the survey must visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredSite {
    pub location: Location,
    /// Accepted observation times; any time when absent.
    #[serde(default)]
    pub time: Option<Vec<MJD>>,
    /// Accepted band; any band when absent.
    #[serde(default)]
    pub band: Option<String>,
}

impl RequiredSite {
    pub fn at(ra: f64, decl: f64) -> Self {
        RequiredSite {
            location: Location::single(ra, decl),
            time: None,
            band: None,
        }
    }

    pub fn with_time(mut self, time: Vec<MJD>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_band(mut self, band: &str) -> Self {
        self.band = Some(band.to_string());
        self
    }

    /// Whether a history row observes this site.
    ///
    /// The location must match exactly as a serialized `(ra, decl)` pair; the time, when
    /// given, within `tolerance` days; the band, when given, exactly.
    pub fn is_hit_by(&self, row: &HistoryRow, tolerance: f64) -> bool {
        let keys: BTreeSet<String> = self
            .location
            .ra
            .iter()
            .zip(&self.location.decl)
            .map(|(&ra, &decl)| site_key(ra, decl))
            .collect();
        if !keys.contains(&row.location) {
            return false;
        }
        if let Some(times) = &self.time {
            if !times.iter().any(|t| (row.mjd - t).abs() <= tolerance) {
                return false;
            }
        }
        self.band.as_ref().map_or(true, |band| *band == row.band)
    }
}

/// Reward the coverage of a list of required sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowVisibilitySurvey {
    pub required_sites: Vec<RequiredSite>,
    /// Weight of the summed per-step rewards.
    pub other_site_weight: f64,
    /// Half width of the accepted time window (days).
    pub time_tolerance: f64,
}

impl LowVisibilitySurvey {
    pub fn new(required_sites: Vec<RequiredSite>, other_site_weight: f64) -> Self {
        LowVisibilitySurvey {
            required_sites,
            other_site_weight,
            time_tolerance: 0.01,
        }
    }

    pub fn with_time_tolerance(mut self, tolerance: f64) -> Self {
        self.time_tolerance = tolerance;
        self
    }

    /// Number of required sites observed at least once.
    pub fn sites_hit(&self, history: &EpisodeHistory) -> usize {
        self.required_sites
            .iter()
            .filter(|site| {
                history
                    .rows()
                    .iter()
                    .any(|row| site.is_hit_by(row, self.time_tolerance))
            })
            .count()
    }
}

impl RewardPolicy for LowVisibilitySurvey {
    fn compute(&self, _step_reward: &DMatrix<f64>, history: &EpisodeHistory) -> Reward {
        if history.is_empty() {
            return Reward::Episode(0.0);
        }
        let n = history.len() as f64;
        let weighted = self.other_site_weight * history.rewards().sum::<f64>();
        let hits = self.sites_hit(history) as f64;
        Reward::Episode(neutralize((weighted + hits) / n))
    }
}

#[cfg(test)]
mod rewards_test {
    use super::*;
    use crate::observatory::pointing::PointingSet;
    use crate::observatory::variables::EngineState;
    use approx::assert_abs_diff_eq;

    fn row(location: &str, band: &str, reward: f64, mjd: f64) -> HistoryRow {
        HistoryRow {
            action: format!("{location}{band}"),
            band: band.into(),
            location: location.into(),
            reward,
            mjd,
        }
    }

    /// History with one single-site step per `(ra, decl, reward, mjd)` entry, band `g`.
    fn history(steps: &[(f64, f64, f64, f64)]) -> EpisodeHistory {
        let mut h = EpisodeHistory::new();
        for &(ra, decl, reward, mjd) in steps {
            let state = EngineState {
                times: vec![mjd],
                pointing: PointingSet::new(vec![ra], vec![decl]).unwrap(),
                band: "g".into(),
                delay: 0.0,
                seeing: 0.9,
                clouds: 0.0,
            };
            h.record(&state, &DMatrix::from_element(1, 1, reward));
        }
        h
    }

    #[test]
    fn test_empty_history_is_zero() {
        let empty = EpisodeHistory::new();
        let step = DMatrix::from_element(1, 1, 5.0);
        assert_eq!(UniformSurvey::default().compute(&step, &empty), Reward::Episode(0.0));
        assert_eq!(
            LowVisibilitySurvey::new(vec![RequiredSite::at(0.0, 0.0)], 1.0).compute(&step, &empty),
            Reward::Episode(0.0)
        );
        assert_eq!(PerStepReward.compute(&step, &empty), Reward::Sites(step.clone()));
    }

    #[test]
    fn test_uniform_site_threshold() {
        let h = history(&[
            (0.0, 0.0, 1.0, 60000.0),
            (1.0, 1.0, 1.0, 60000.1),
            (1.0, 1.0, 1.0, 60000.2),
        ]);
        let step = DMatrix::from_element(1, 1, 1.0);
        // counts = [1, 2], var = 0.25, scale = 1 / (3 · 0.25)
        let one = UniformSurvey::new(1.0, UniformMode::Site).compute(&step, &h);
        assert_abs_diff_eq!(one.as_episode().unwrap(), 4.0, epsilon = 1e-12);
        let two = UniformSurvey::new(2.0, UniformMode::Site).compute(&step, &h);
        assert_abs_diff_eq!(two.as_episode().unwrap(), 2.0 / 0.75, epsilon = 1e-12);
        let three = UniformSurvey::new(3.0, UniformMode::Site).compute(&step, &h);
        assert_eq!(three, Reward::Episode(0.0));
    }

    #[test]
    fn test_uniform_quality() {
        let h = history(&[(0.0, 0.0, 1.0, 60000.0), (1.0, 1.0, 3.0, 60000.1)]);
        let step = DMatrix::from_element(1, 1, 3.0);
        // var = 1, scale = 1 / 2
        let reward = UniformSurvey::new(2.0, UniformMode::Quality).compute(&step, &h);
        assert_eq!(reward, Reward::Episode(1.5));

        let flat = history(&[(0.0, 0.0, 0.5, 60000.0)]);
        let reward = UniformSurvey::new(1.0, UniformMode::Quality).compute(&step, &flat);
        assert_eq!(reward, Reward::Episode(0.0));
    }

    #[test]
    fn test_neutralize_degenerate_values() {
        assert_eq!(neutralize(f64::NAN), 0.0);
        assert_eq!(neutralize(f64::NEG_INFINITY), 0.0);
        assert_eq!(neutralize(f64::INFINITY), f64::INFINITY);
        assert_eq!(neutralize(-2.0), -2.0);
    }

    #[test]
    fn test_required_site_matching() {
        let site = RequiredSite::at(10.0, 10.0).with_time(vec![60000.1]).with_band("r");
        assert!(site.is_hit_by(&row("(10.0, 10.0)", "r", 1.0, 60000.105), 0.01));
        assert!(!site.is_hit_by(&row("(10.0, 10.0)", "g", 1.0, 60000.1), 0.01));
        assert!(!site.is_hit_by(&row("(10.0, 10.0)", "r", 1.0, 60002.1), 0.01));
        assert!(!site.is_hit_by(&row("(10.0, 10.5)", "r", 1.0, 60000.1), 0.01));
    }

    #[test]
    fn test_low_visibility_reward() {
        let h = history(&[(0.0, 0.0, 0.5, 60000.0), (10.0, 10.0, 0.5, 60000.1)]);
        let step = DMatrix::from_element(1, 1, 0.5);
        let required = vec![RequiredSite::at(0.0, 0.0), RequiredSite::at(10.0, 10.0)];

        let only_sites = LowVisibilitySurvey::new(required.clone(), 0.0).compute(&step, &h);
        assert_eq!(only_sites, Reward::Episode(1.0));

        let weighted = LowVisibilitySurvey::new(required, 2.0).compute(&step, &h);
        assert_eq!(weighted, Reward::Episode((2.0 * 1.0 + 2.0) / 2.0));

        let missed = LowVisibilitySurvey::new(vec![RequiredSite::at(15.0, 10.0)], 0.0)
            .compute(&step, &h);
        assert_eq!(missed, Reward::Episode(0.0));
    }
}
