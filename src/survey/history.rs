use ahash::AHashMap;
use nalgebra::DMatrix;

use crate::constants::MJD;
use crate::observatory::variables::EngineState;

/// One observed (site, time) entry of an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    /// Descriptor of the whole action: pointing set plus band.
    pub action: String,
    pub band: String,
    /// `(ra, decl)` of the observed site.
    pub location: String,
    pub reward: f64,
    pub mjd: MJD,
}

/// Per-step records accumulated over an episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeHistory {
    rows: Vec<HistoryRow>,
}

impl EpisodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    /// Append one row per (site, time) of a step.
    ///
    /// Arguments
    /// -----------------
    /// * `state`: the engine state after the step update.
    /// * `reward`: the per-step reward, `sites × times`.
    pub fn record(&mut self, state: &EngineState, reward: &DMatrix<f64>) {
        let action = format!("{}{}", state.pointing.key(), state.band);
        let mjd = state.mjd();
        for j in 0..reward.ncols() {
            for i in 0..reward.nrows() {
                self.rows.push(HistoryRow {
                    action: action.clone(),
                    band: state.band.clone(),
                    location: state.pointing.site_key(i),
                    reward: reward[(i, j)],
                    mjd: mjd[j],
                });
            }
        }
    }

    /// Number of rows per action descriptor.
    pub fn action_counts(&self) -> AHashMap<&str, usize> {
        let mut counts = AHashMap::new();
        for row in &self.rows {
            *counts.entry(row.action.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn rewards(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.reward)
    }
}

/// Population variance (`ddof = 0`), `NaN` for an empty sample.
pub(crate) fn population_variance(values: impl IntoIterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.into_iter().collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
