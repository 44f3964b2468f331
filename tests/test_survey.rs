mod common;

use approx::assert_abs_diff_eq;
use common::{fixed_survey, meridian, nadir, single_site, zenith, START};
use deepsurvey::coordinates::airmass;
use deepsurvey::deepsurvey_errors::SurveyError;
use deepsurvey::observatory::pointing::Location;
use deepsurvey::observatory::site_config::{SiteConfig, SiteConfigOverrides};
use deepsurvey::survey::survey_config::{
    Bound, RewardSpec, StartTime, StoppingSpec, SurveyConfig, SurveyConfigOverrides,
};
use deepsurvey::survey::{Action, EpisodeStatus, Survey};
use serde::de::value::{Error as ValueError, F64Deserializer, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::Deserialize;

/// Altitude of the given airmass, by bisection on the airmass law.
fn altitude_of(target: f64) -> f64 {
    let (mut low, mut high) = (1.0, 90.0);
    for _ in 0..100 {
        let mid = 0.5 * (low + high);
        if airmass(mid) > target {
            low = mid;
        } else {
            high = mid;
        }
    }
    0.5 * (low + high)
}

fn survey(config: SurveyConfig) -> Survey {
    let mut survey = Survey::new(single_site(0.0, 0.0), config).unwrap();
    survey.reset();
    survey
}

#[test]
fn test_validity_and_stop_directions() {
    let lesser = Bound::new(5.0, true);
    let config = fixed_survey(100)
        .constraints([("alt".to_string(), lesser)].into())
        .stop_condition("alt", lesser)
        .build()
        .unwrap();
    let mut s = survey(config);
    let site = *s.engine().site();

    let up = s
        .step(&Action::at(START).with_location(zenith(&site, START)))
        .unwrap();
    assert!(up.observation.valid[(0, 0)]);
    assert!(!up.stop);

    let t = START + 0.01;
    let down = s
        .step(&Action::at(t).with_location(nadir(&site, t)))
        .unwrap();
    assert!(!down.observation.valid[(0, 0)]);
    assert!(down.stop);
    assert_eq!(s.status(), EpisodeStatus::Terminated);
}

#[test]
fn test_upper_bound_directions() {
    let greater = Bound::new(5.0, false);
    let config = fixed_survey(100)
        .constraints([("alt".to_string(), greater)].into())
        .stop_condition("alt", greater)
        .build()
        .unwrap();
    let mut s = survey(config);
    let site = *s.engine().site();

    let t = START + 0.01;
    let down = s
        .step(&Action::at(t).with_location(nadir(&site, t)))
        .unwrap();
    assert!(down.observation.valid[(0, 0)]);
    assert!(!down.stop);

    let up = s
        .step(&Action::at(t).with_location(zenith(&site, t)))
        .unwrap();
    assert!(!up.observation.valid[(0, 0)]);
    assert!(up.stop);
}

#[test]
fn test_reward_of_invalid_entry_is_penalty() {
    let mut s = survey(fixed_survey(10).build().unwrap());
    let site = *s.engine().site();
    let outcome = s
        .step(&Action::at(START).with_location(nadir(&site, START)))
        .unwrap();
    assert!(outcome.observation.get("airmass").unwrap()[(0, 0)].is_nan());
    assert!(!outcome.observation.valid[(0, 0)]);
    assert_eq!(outcome.reward.as_sites().unwrap()[(0, 0)], -100.0);
    assert_eq!(outcome.log.degenerate, 1);
}

#[test]
fn test_minimised_reward_is_inverse() {
    let config = fixed_survey(10)
        .constraint("airmass", Bound::new(2.5, false))
        .build()
        .unwrap();
    let mut s = survey(config);
    let site = *s.engine().site();
    let pointing = meridian(&site, START, altitude_of(2.0));

    let outcome = s.step(&Action::at(START).with_location(pointing)).unwrap();
    assert_abs_diff_eq!(
        outcome.observation.get("airmass").unwrap()[(0, 0)],
        2.0,
        epsilon = 1e-6
    );
    assert!(outcome.observation.valid[(0, 0)]);
    assert_abs_diff_eq!(outcome.reward.total(), 0.5, epsilon = 1e-6);
}

#[test]
fn test_threshold_clamps_reward() {
    let config = fixed_survey(10)
        .constraint("airmass", Bound::new(2.5, false))
        .reward(RewardSpec {
            threshold: Some(0.6),
            ..RewardSpec::default()
        })
        .build()
        .unwrap();
    let mut s = survey(config);
    let site = *s.engine().site();

    let low = s
        .step(&Action::at(START).with_location(meridian(&site, START, altitude_of(2.0))))
        .unwrap();
    assert_eq!(low.reward.total(), -100.0);

    let high = s
        .step(&Action::at(START).with_location(zenith(&site, START)))
        .unwrap();
    assert_abs_diff_eq!(high.reward.total(), 1.0, epsilon = 1e-6);
}

#[test]
fn test_stop_on_max_timestep() {
    let mut s = survey(fixed_survey(6).build().unwrap());
    for expected in 1..=5 {
        let outcome = s.step(&Action::default()).unwrap();
        assert_eq!(outcome.log.timestep, expected);
        assert!(!outcome.stop);
    }
    assert!(s.step(&Action::default()).unwrap().stop);
    assert_eq!(s.step(&Action::default()), Err(SurveyError::EpisodeTerminated));

    s.reset();
    assert_eq!(s.status(), EpisodeStatus::Running);
    assert_eq!(s.timestep(), 0);
    assert!(s.history().is_empty());
    assert!(!s.step(&Action::default()).unwrap().stop);
}

#[test]
fn test_history_grows_per_site() {
    let config = fixed_survey(10).build().unwrap();
    let mut s = Survey::new(
        common::site_config(vec![0.0, 90.0], vec![0.0, 10.0]),
        config,
    )
    .unwrap();
    s.reset();
    s.step(&Action::at(START)).unwrap();
    s.step(&Action {
        time: Some(vec![START + 0.1, START + 0.2]),
        location: None,
        band: Some("r".into()),
    })
    .unwrap();

    assert_eq!(s.history().len(), 2 + 4);
    let last = &s.history().rows()[5];
    assert_eq!(last.band, "r");
    assert_eq!(last.location, "(90.0, 10.0)");
    assert!(last.mjd > START + 0.2);
}

#[test]
fn test_unknown_band_is_rejected() {
    let mut s = survey(fixed_survey(10).build().unwrap());
    assert_eq!(
        s.step(&Action::at(START).with_band("b")),
        Err(SurveyError::UnknownBand("b".into()))
    );
    assert_eq!(s.timestep(), 0);
}

#[test]
fn test_multiple_times_in_one_step() {
    let mut s = survey(fixed_survey(10).build().unwrap());
    let outcome = s
        .step(&Action {
            time: Some(vec![START, START + 0.1, START + 0.2]),
            location: Some(Location::new(vec![0.0, 10.0], vec![0.0, 10.0])),
            band: None,
        })
        .unwrap();
    assert_eq!(outcome.observation.valid.shape(), (2, 3));
    assert_eq!(outcome.observation.mjd.len(), 3);
    assert_eq!(outcome.reward.as_sites().unwrap().shape(), (2, 3));
    for variable in outcome.observation.variables.values() {
        assert_eq!(variable.shape(), (2, 3));
    }
}

#[test]
fn test_resolved_configurations_drive_survey() {
    let site = SiteConfig::resolve(
        SiteConfig::default(),
        SiteConfigOverrides {
            readout_time: Some(0.0),
            slew_rate: Some(0.0),
            ..Default::default()
        },
    )
    .unwrap();
    let config = SurveyConfig::resolve(
        SurveyConfig::default(),
        SurveyConfigOverrides {
            start_time: Some(StartTime::Fixed(START)),
            stopping: Some(StoppingSpec {
                timestep: 2,
                ..StoppingSpec::default()
            }),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(config.constraints["airmass"], Bound::new(2.0, false));

    let mut s = Survey::new(site, config).unwrap();
    s.reset();
    let outcome = s.step(&Action::at(START + 1.0)).unwrap();
    assert_eq!(outcome.log.delay, 0.0);
    assert_eq!(outcome.observation.mjd, vec![START + 1.0]);
    assert!(s.step(&Action::default()).unwrap().stop);
}

#[test]
fn test_start_time_keywords() {
    let random: StrDeserializer<'_, ValueError> = "random".into_deserializer();
    assert_eq!(StartTime::deserialize(random).unwrap(), StartTime::Random);

    let fixed: F64Deserializer<ValueError> = 59946.0.into_deserializer();
    assert_eq!(
        StartTime::deserialize(fixed).unwrap(),
        StartTime::Fixed(59946.0)
    );

    let unknown: StrDeserializer<'_, ValueError> = "tomorrow".into_deserializer();
    assert!(StartTime::deserialize(unknown).is_err());
}

#[test]
fn test_run_collects_every_step() {
    let mut s = Survey::new(SiteConfig::default(), fixed_survey(3).build().unwrap()).unwrap();
    let results = s.run().unwrap();
    assert_eq!(results.len(), 3);

    let times: Vec<f64> = results.iter().map(|(t, _)| t).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    for (_, record) in results.iter() {
        assert_eq!(record.valid.len(), 10);
        assert_eq!(record.reward.len(), 10);
        assert_eq!(record.variables["airmass"].len(), 10);
    }
}
