//! # Historical weather model
//!
//! A deterministic, time-of-year-only approximation of the observing weather built from
//! historical sky-condition reports (for instance the NOAA *Local Climatological Data*
//! export, whose `HourlySkyConditions` column holds codes such as `FEW`, `CLR`, `BKN`, `OVC`).
//!
//! Each report is reduced to a month, a day and a *clear* flag (the condition string
//! contains one of the allowed codes). For a date, [`Weather::condition`] keeps the reports
//! of the same month whose day falls in `[day, day + day_window]`; the year is ignored.
//!
//! The subset is then thresholded:
//!
//! - [`Weather::seeing`]: when the fraction of poor reports reaches `seeing_tolerance`, the
//!   baseline seeing is scaled by `1 − round(poor, 1)`.
//! - [`Weather::clouds`]: when the fraction of poor reports reaches `cloud_tolerance`, the cloud
//!   extinction is set to `1` (fully opaque), otherwise the baseline value is returned.
//!
//! An empty subset (no report for that time of year) leaves both baselines untouched.
//!
//! ## See also
//! ------------
//! * [`ObservationEngine::update`](crate::observatory::ObservationEngine::update) – refreshes
//!   the engine seeing and cloud extinction from this model.

use std::io::Read;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::MJD;
use crate::deepsurvey_errors::SurveyError;
use crate::time::mjd_to_month_day;

/// Column layout of the historical weather CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherColumns {
    /// Column holding the sky-condition report.
    pub seeing: String,
    /// Column holding the report date.
    pub date: String,
    /// Condition codes counted as clear sky (substring match).
    pub allowed_conditions: Vec<String>,
}

impl Default for WeatherColumns {
    fn default() -> Self {
        WeatherColumns {
            seeing: "HourlySkyConditions".into(),
            date: "DATE".into(),
            allowed_conditions: vec!["FEW".into(), "CLR".into()],
        }
    }
}

/// Weather sub-configuration of a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Path to the historical CSV file, required by [`Weather::from_config`].
    pub weather_source_file: Option<Utf8PathBuf>,
    /// Fraction of poor reports at which the seeing starts to degrade.
    pub seeing_tolerance: f64,
    /// Fraction of poor reports at which the sky is considered fully clouded.
    pub cloud_tolerance: f64,
    /// Best seeing; the site seeing is used when absent.
    pub base_seeing: Option<f64>,
    /// Cloud extinction of a clear sky.
    pub base_clouds: f64,
    /// Number of following days included in the subset of a date.
    pub day_window: u8,
    pub csv: WeatherColumns,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            weather_source_file: None,
            seeing_tolerance: 0.5,
            cloud_tolerance: 0.5,
            base_seeing: None,
            base_clouds: 0.0,
            day_window: 2,
            csv: WeatherColumns::default(),
        }
    }
}

impl WeatherConfig {
    pub(crate) fn validate(&self) -> Result<(), SurveyError> {
        for (name, tol) in [
            ("seeing_tolerance", self.seeing_tolerance),
            ("cloud_tolerance", self.cloud_tolerance),
        ] {
            if !(0.0..=1.0).contains(&tol) {
                return Err(SurveyError::Configuration(format!(
                    "weather.{name} must be within [0, 1], got {tol}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.base_clouds) {
            return Err(SurveyError::Configuration(format!(
                "weather.base_clouds must be within [0, 1], got {}",
                self.base_clouds
            )));
        }
        if let Some(seeing) = self.base_seeing {
            if !(seeing.is_finite() && seeing >= 0.0) {
                return Err(SurveyError::Configuration(format!(
                    "weather.base_seeing must be non-negative, got {seeing}"
                )));
            }
        }
        Ok(())
    }
}

/// One historical report reduced to its time of year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherRecord {
    pub month: u8,
    pub day: u8,
    /// `true` when the report matches one of the allowed (clear) conditions.
    pub clear: bool,
}

/// Calendar month and day of a report date, any representation accepted by hifitime.
fn parse_month_day(date: &str) -> Option<(u8, u8)> {
    let (_, month, day, _, _, _, _) = Epoch::from_str(date.trim()).ok()?.to_gregorian_utc();
    Some((month, day))
}

/// A fraction rounded to one decimal, on its decimal representation.
///
/// `0.85` is stored as `0.8499999…` and rounds to `0.8`.
fn round_tenth(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Historical weather lookup.
#[derive(Debug, Clone)]
pub struct Weather {
    records: Vec<WeatherRecord>,
    config: WeatherConfig,
    base_seeing: f64,
}

impl Weather {
    /// Build the model from already reduced records.
    ///
    /// Arguments
    /// -----------------
    /// * `records`: the historical reports.
    /// * `config`: tolerances and baselines.
    /// * `site_seeing`: seeing used as baseline when `config.base_seeing` is absent.
    pub fn from_records(
        records: Vec<WeatherRecord>,
        config: WeatherConfig,
        site_seeing: f64,
    ) -> Result<Self, SurveyError> {
        config.validate()?;
        let missing: Vec<u8> = (1..=12)
            .filter(|m| !records.iter().any(|r| r.month == *m))
            .collect();
        if !missing.is_empty() {
            warn!("no historical weather report for months {missing:?}, baseline weather used");
        }
        let base_seeing = config.base_seeing.unwrap_or(site_seeing);
        Ok(Weather {
            records,
            config,
            base_seeing,
        })
    }

    /// Read the historical reports from CSV data.
    ///
    /// Rows with an empty date or condition field are skipped.
    ///
    /// Return
    /// ----------
    /// * The model, [`SurveyError::WeatherSource`] if a configured column is missing or a
    ///   date cannot be read, [`SurveyError::CsvError`] on malformed CSV.
    pub fn from_csv_reader<R: Read>(
        reader: R,
        config: WeatherConfig,
        site_seeing: f64,
    ) -> Result<Self, SurveyError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                SurveyError::WeatherSource(format!("missing column {name:?} in weather file"))
            })
        };
        let date_idx = column(&config.csv.date)?;
        let seeing_idx = column(&config.csv.seeing)?;

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            let (Some(date), Some(condition)) = (row.get(date_idx), row.get(seeing_idx)) else {
                continue;
            };
            if date.trim().is_empty() || condition.trim().is_empty() {
                continue;
            }
            let (month, day) = parse_month_day(date).ok_or_else(|| {
                SurveyError::WeatherSource(format!("unreadable date {date:?} in weather file"))
            })?;
            let clear = config
                .csv
                .allowed_conditions
                .iter()
                .any(|allowed| condition.contains(allowed.as_str()));
            records.push(WeatherRecord { month, day, clear });
        }

        Weather::from_records(records, config, site_seeing)
    }

    /// Read the historical reports from `config.weather_source_file`.
    pub fn from_config(config: WeatherConfig, site_seeing: f64) -> Result<Self, SurveyError> {
        let path: Utf8PathBuf = config.weather_source_file.clone().ok_or_else(|| {
            SurveyError::Configuration("weather.weather_source_file is required".into())
        })?;
        Weather::from_path(&path, config, site_seeing)
    }

    pub fn from_path(
        path: &Utf8Path,
        config: WeatherConfig,
        site_seeing: f64,
    ) -> Result<Self, SurveyError> {
        let file = std::fs::File::open(path)?;
        Weather::from_csv_reader(file, config, site_seeing)
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn base_seeing(&self) -> f64 {
        self.base_seeing
    }

    pub fn base_clouds(&self) -> f64 {
        self.config.base_clouds
    }

    /// Reports sharing the time of year of `mjd`.
    ///
    /// Arguments
    /// -----------------
    /// * `mjd`: the date of interest.
    ///
    /// Return
    /// ----------
    /// * The reports of the same month whose day lies in `[day, day + day_window]`.
    pub fn condition(&self, mjd: MJD) -> Vec<WeatherRecord> {
        let (month, day) = mjd_to_month_day(mjd);
        let last = day.saturating_add(self.config.day_window);
        let subset: Vec<WeatherRecord> = self
            .records
            .iter()
            .filter(|r| r.month == month && (day..=last).contains(&r.day))
            .copied()
            .collect();
        if subset.is_empty() {
            debug!("no historical weather report for month {month}, day {day}");
        }
        subset
    }

    /// Fraction of poor reports in a subset, `None` when the subset is empty.
    pub fn poor_fraction(subset: &[WeatherRecord]) -> Option<f64> {
        if subset.is_empty() {
            return None;
        }
        let clear = subset.iter().filter(|r| r.clear).count() as f64;
        Some(1.0 - clear / subset.len() as f64)
    }

    /// Seeing for a subset of reports.
    pub fn seeing(&self, subset: &[WeatherRecord]) -> f64 {
        match Weather::poor_fraction(subset) {
            Some(poor) if poor >= self.config.seeing_tolerance => {
                self.base_seeing * (1.0 - round_tenth(poor))
            }
            _ => self.base_seeing,
        }
    }

    /// Cloud extinction for a subset of reports: `1` past the tolerance, the baseline otherwise.
    pub fn clouds(&self, subset: &[WeatherRecord]) -> f64 {
        match Weather::poor_fraction(subset) {
            Some(poor) if poor >= self.config.cloud_tolerance => 1.0,
            _ => self.config.base_clouds,
        }
    }
}
