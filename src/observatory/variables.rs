//! # Observation variables
//!
//! Static registry of every quantity the observation engine can produce.
//!
//! Each [`Variable`] belongs to exactly one [`VariableGroup`]; a group is a single pure
//! computation that returns all of its variables at once (the sun position yields both
//! `sun_ra` and `sun_decl`, the seeing terms share one airmass evaluation, ...). Groups are
//! evaluated against a [`CalculationContext`], an immutable snapshot of the engine state plus
//! the site constants, so the same context always yields the same values.
//!
//! Every value is a `sites × times` matrix: row `i` is the `i`-th pointing, column `j` the
//! `j`-th commanded time. Quantities that only depend on the time (sun, moon, LST) are
//! broadcast over the rows.
//!
//! ## Registry
//!
//! | group                   | variables                                                                    |
//! |-------------------------|------------------------------------------------------------------------------|
//! | `sun_position`          | `sun_ra`, `sun_decl`                                                         |
//! | `sun_ha`                | `sun_ha`                                                                     |
//! | `sun_airmass`           | `sun_airmass`                                                                |
//! | `moon_position`         | `moon_ra`, `moon_decl`                                                       |
//! | `moon_ha`               | `moon_ha`                                                                    |
//! | `moon_airmass`          | `moon_airmass`                                                               |
//! | `moon_brightness`       | `moon_phase`, `moon_illumination`, `moon_elongation`, `moon_vmagnitude`, `moon_separation` |
//! | `observation_alt_az`    | `alt`, `az`                                                                  |
//! | `observation_ha`        | `ha`                                                                         |
//! | `observation_airmass`   | `airmass`                                                                    |
//! | `lst`                   | `lst`                                                                        |
//! | `seeing`                | `pt_seeing`, `band_seeing`, `fwhm`                                           |
//! | `sky_brightness`        | `sky_magnitude`, `tau`, `teff` (only with a sky-brightness model)            |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ArcSec, Degree, MJD, SEEING_AIRMASS_EXPONENT, SEEING_REFERENCE_WAVELENGTH,
    SEEING_WAVELENGTH_EXPONENT,
};
use crate::coordinates::{airmass, angular_separation, Site};
use crate::deepsurvey_errors::SurveyError;
use crate::ephemeris::{
    moon_elongation, moon_phase_angle, moon_position, moon_vmagnitude, sun_position,
    BodyPosition,
};
use crate::observatory::pointing::PointingSet;
use crate::observatory::site_config::SiteConfig;
use crate::sky_brightness::{effective_exposure, SkyBrightnessModel, SkyInputs};

/// Values of several variables, each a `sites × times` matrix.
pub type VariableMap = BTreeMap<Variable, DMatrix<f64>>;

/// A quantity computable by the observation engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    SunRa,
    SunDecl,
    SunHa,
    SunAirmass,
    MoonRa,
    MoonDecl,
    MoonHa,
    MoonAirmass,
    MoonPhase,
    MoonIllumination,
    MoonElongation,
    MoonVmagnitude,
    MoonSeparation,
    Alt,
    Az,
    Ha,
    Airmass,
    Lst,
    PtSeeing,
    BandSeeing,
    Fwhm,
    SkyMagnitude,
    Tau,
    Teff,
}

impl Variable {
    pub const ALL: [Variable; 24] = [
        Variable::SunRa,
        Variable::SunDecl,
        Variable::SunHa,
        Variable::SunAirmass,
        Variable::MoonRa,
        Variable::MoonDecl,
        Variable::MoonHa,
        Variable::MoonAirmass,
        Variable::MoonPhase,
        Variable::MoonIllumination,
        Variable::MoonElongation,
        Variable::MoonVmagnitude,
        Variable::MoonSeparation,
        Variable::Alt,
        Variable::Az,
        Variable::Ha,
        Variable::Airmass,
        Variable::Lst,
        Variable::PtSeeing,
        Variable::BandSeeing,
        Variable::Fwhm,
        Variable::SkyMagnitude,
        Variable::Tau,
        Variable::Teff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variable::SunRa => "sun_ra",
            Variable::SunDecl => "sun_decl",
            Variable::SunHa => "sun_ha",
            Variable::SunAirmass => "sun_airmass",
            Variable::MoonRa => "moon_ra",
            Variable::MoonDecl => "moon_decl",
            Variable::MoonHa => "moon_ha",
            Variable::MoonAirmass => "moon_airmass",
            Variable::MoonPhase => "moon_phase",
            Variable::MoonIllumination => "moon_illumination",
            Variable::MoonElongation => "moon_elongation",
            Variable::MoonVmagnitude => "moon_vmagnitude",
            Variable::MoonSeparation => "moon_separation",
            Variable::Alt => "alt",
            Variable::Az => "az",
            Variable::Ha => "ha",
            Variable::Airmass => "airmass",
            Variable::Lst => "lst",
            Variable::PtSeeing => "pt_seeing",
            Variable::BandSeeing => "band_seeing",
            Variable::Fwhm => "fwhm",
            Variable::SkyMagnitude => "sky_magnitude",
            Variable::Tau => "tau",
            Variable::Teff => "teff",
        }
    }

    /// The computation producing this variable.
    pub fn group(self) -> VariableGroup {
        use Variable::*;
        match self {
            SunRa | SunDecl => VariableGroup::SunPosition,
            SunHa => VariableGroup::SunHourAngle,
            SunAirmass => VariableGroup::SunAirmass,
            MoonRa | MoonDecl => VariableGroup::MoonPosition,
            MoonHa => VariableGroup::MoonHourAngle,
            MoonAirmass => VariableGroup::MoonAirmass,
            MoonPhase | MoonIllumination | MoonElongation | MoonVmagnitude | MoonSeparation => {
                VariableGroup::MoonBrightness
            }
            Alt | Az => VariableGroup::ObservationAltAz,
            Ha => VariableGroup::ObservationHourAngle,
            Airmass => VariableGroup::ObservationAirmass,
            Lst => VariableGroup::LocalSiderealTime,
            PtSeeing | BandSeeing | Fwhm => VariableGroup::Seeing,
            SkyMagnitude | Tau | Teff => VariableGroup::SkyBrightness,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| SurveyError::UnknownVariable(s.to_string()))
    }
}

/// One pure computation of the engine and the variables it yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableGroup {
    SunPosition,
    SunHourAngle,
    SunAirmass,
    MoonPosition,
    MoonHourAngle,
    MoonAirmass,
    MoonBrightness,
    ObservationAltAz,
    ObservationHourAngle,
    ObservationAirmass,
    LocalSiderealTime,
    Seeing,
    SkyBrightness,
}

impl VariableGroup {
    pub const ALL: [VariableGroup; 13] = [
        VariableGroup::SunPosition,
        VariableGroup::SunHourAngle,
        VariableGroup::SunAirmass,
        VariableGroup::MoonPosition,
        VariableGroup::MoonHourAngle,
        VariableGroup::MoonAirmass,
        VariableGroup::MoonBrightness,
        VariableGroup::ObservationAltAz,
        VariableGroup::ObservationHourAngle,
        VariableGroup::ObservationAirmass,
        VariableGroup::LocalSiderealTime,
        VariableGroup::Seeing,
        VariableGroup::SkyBrightness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VariableGroup::SunPosition => "sun_position",
            VariableGroup::SunHourAngle => "sun_ha",
            VariableGroup::SunAirmass => "sun_airmass",
            VariableGroup::MoonPosition => "moon_position",
            VariableGroup::MoonHourAngle => "moon_ha",
            VariableGroup::MoonAirmass => "moon_airmass",
            VariableGroup::MoonBrightness => "moon_brightness",
            VariableGroup::ObservationAltAz => "observation_alt_az",
            VariableGroup::ObservationHourAngle => "observation_ha",
            VariableGroup::ObservationAirmass => "observation_airmass",
            VariableGroup::LocalSiderealTime => "lst",
            VariableGroup::Seeing => "seeing",
            VariableGroup::SkyBrightness => "sky_brightness",
        }
    }

    /// Variables produced by this group.
    pub fn outputs(self) -> &'static [Variable] {
        use Variable::*;
        match self {
            VariableGroup::SunPosition => &[SunRa, SunDecl],
            VariableGroup::SunHourAngle => &[SunHa],
            VariableGroup::SunAirmass => &[SunAirmass],
            VariableGroup::MoonPosition => &[MoonRa, MoonDecl],
            VariableGroup::MoonHourAngle => &[MoonHa],
            VariableGroup::MoonAirmass => &[MoonAirmass],
            VariableGroup::MoonBrightness => &[
                MoonPhase,
                MoonIllumination,
                MoonElongation,
                MoonVmagnitude,
                MoonSeparation,
            ],
            VariableGroup::ObservationAltAz => &[Alt, Az],
            VariableGroup::ObservationHourAngle => &[Ha],
            VariableGroup::ObservationAirmass => &[Airmass],
            VariableGroup::LocalSiderealTime => &[Lst],
            VariableGroup::Seeing => &[PtSeeing, BandSeeing, Fwhm],
            VariableGroup::SkyBrightness => &[SkyMagnitude, Tau, Teff],
        }
    }

    /// Whether the group needs a sky-brightness model to be registered.
    pub fn requires_sky_model(self) -> bool {
        self == VariableGroup::SkyBrightness
    }

    /// Evaluate the group.
    ///
    /// Arguments
    /// -----------------
    /// * `ctx`: the state snapshot and site constants.
    ///
    /// Return
    /// ----------
    /// * A map holding exactly the variables of [`VariableGroup::outputs`].
    pub fn compute(self, ctx: &CalculationContext<'_>) -> VariableMap {
        match self {
            VariableGroup::SunPosition => sun_location(ctx),
            VariableGroup::SunHourAngle => sun_hour_angle(ctx),
            VariableGroup::SunAirmass => sun_airmass(ctx),
            VariableGroup::MoonPosition => moon_location(ctx),
            VariableGroup::MoonHourAngle => moon_hour_angle(ctx),
            VariableGroup::MoonAirmass => moon_airmass(ctx),
            VariableGroup::MoonBrightness => moon_brightness(ctx),
            VariableGroup::ObservationAltAz => observation_alt_az(ctx),
            VariableGroup::ObservationHourAngle => observation_hour_angle(ctx),
            VariableGroup::ObservationAirmass => observation_airmass(ctx),
            VariableGroup::LocalSiderealTime => local_sidereal_time(ctx),
            VariableGroup::Seeing => seeing(ctx),
            VariableGroup::SkyBrightness => sky_brightness(ctx),
        }
    }
}

/// Snapshot of the mutable part of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Commanded times (MJD).
    pub times: Vec<MJD>,
    pub pointing: PointingSet,
    pub band: String,
    /// Delay of the last update, in days.
    pub delay: f64,
    /// Zenith seeing currently in effect (arcsec).
    pub seeing: ArcSec,
    /// Cloud extinction currently in effect, in `[0, 1]`.
    pub clouds: f64,
}

impl EngineState {
    pub fn n_sites(&self) -> usize {
        self.pointing.len()
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Reported observation times, `time + delay`.
    pub fn mjd(&self) -> Vec<MJD> {
        self.times.iter().map(|t| t + self.delay).collect()
    }
}

/// Everything a variable computation may read.
#[derive(Clone, Copy)]
pub struct CalculationContext<'a> {
    pub state: &'a EngineState,
    pub config: &'a SiteConfig,
    pub site: &'a Site,
    pub sky_model: Option<&'a dyn SkyBrightnessModel>,
}

impl fmt::Debug for CalculationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculationContext")
            .field("state", self.state)
            .field("site", self.site)
            .field("sky_model", &self.sky_model.is_some())
            .finish()
    }
}

impl CalculationContext<'_> {
    /// Broadcast one value per time over every pointing.
    fn per_time(&self, values: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(self.state.n_sites(), self.state.n_times(), |_, j| values[j])
    }

    /// Evaluate `f(ra, decl, time index)` for every pointing and time.
    fn per_pointing(&self, f: impl Fn(Degree, Degree, usize) -> f64) -> DMatrix<f64> {
        let ra = self.state.pointing.ra();
        let decl = self.state.pointing.decl();
        DMatrix::from_fn(self.state.n_sites(), self.state.n_times(), |i, j| {
            f(ra[i], decl[i], j)
        })
    }

    fn bodies(&self, position: fn(MJD) -> BodyPosition) -> Vec<BodyPosition> {
        self.state.times.iter().map(|&t| position(t)).collect()
    }

    fn body_airmass(&self, bodies: &[BodyPosition]) -> Vec<f64> {
        self.state
            .times
            .iter()
            .zip(bodies)
            .map(|(&t, b)| airmass(self.site.to_horizontal(t, b.ra, b.decl).alt))
            .collect()
    }

    fn body_hour_angle(&self, bodies: &[BodyPosition]) -> Vec<f64> {
        self.state
            .times
            .iter()
            .zip(bodies)
            .map(|(&t, b)| self.site.hour_angle(t, b.ra))
            .collect()
    }

    fn pointing_airmass(&self) -> DMatrix<f64> {
        let times = &self.state.times;
        self.per_pointing(|ra, decl, j| airmass(self.site.to_horizontal(times[j], ra, decl).alt))
    }
}

fn sun_location(ctx: &CalculationContext<'_>) -> VariableMap {
    let sun = ctx.bodies(sun_position);
    let ra: Vec<f64> = sun.iter().map(|b| b.ra).collect();
    let decl: Vec<f64> = sun.iter().map(|b| b.decl).collect();
    VariableMap::from([
        (Variable::SunRa, ctx.per_time(&ra)),
        (Variable::SunDecl, ctx.per_time(&decl)),
    ])
}

fn sun_hour_angle(ctx: &CalculationContext<'_>) -> VariableMap {
    let ha = ctx.body_hour_angle(&ctx.bodies(sun_position));
    VariableMap::from([(Variable::SunHa, ctx.per_time(&ha))])
}

fn sun_airmass(ctx: &CalculationContext<'_>) -> VariableMap {
    let x = ctx.body_airmass(&ctx.bodies(sun_position));
    VariableMap::from([(Variable::SunAirmass, ctx.per_time(&x))])
}

fn moon_location(ctx: &CalculationContext<'_>) -> VariableMap {
    let moon = ctx.bodies(moon_position);
    let ra: Vec<f64> = moon.iter().map(|b| b.ra).collect();
    let decl: Vec<f64> = moon.iter().map(|b| b.decl).collect();
    VariableMap::from([
        (Variable::MoonRa, ctx.per_time(&ra)),
        (Variable::MoonDecl, ctx.per_time(&decl)),
    ])
}

fn moon_hour_angle(ctx: &CalculationContext<'_>) -> VariableMap {
    let ha = ctx.body_hour_angle(&ctx.bodies(moon_position));
    VariableMap::from([(Variable::MoonHa, ctx.per_time(&ha))])
}

fn moon_airmass(ctx: &CalculationContext<'_>) -> VariableMap {
    let x = ctx.body_airmass(&ctx.bodies(moon_position));
    VariableMap::from([(Variable::MoonAirmass, ctx.per_time(&x))])
}

fn moon_brightness(ctx: &CalculationContext<'_>) -> VariableMap {
    let times = &ctx.state.times;
    let moon = ctx.bodies(moon_position);

    let phase: Vec<f64> = times.iter().map(|&t| moon_phase_angle(t)).collect();
    let illumination: Vec<f64> = phase
        .iter()
        .map(|i| (1.0 + i.to_radians().cos()) / 2.0)
        .collect();
    let elongation: Vec<f64> = times.iter().map(|&t| moon_elongation(t)).collect();
    let vmag: Vec<f64> = elongation.iter().map(|&e| moon_vmagnitude(e)).collect();

    let separation =
        ctx.per_pointing(|ra, decl, j| angular_separation(ra, decl, moon[j].ra, moon[j].decl));

    VariableMap::from([
        (Variable::MoonPhase, ctx.per_time(&phase)),
        (Variable::MoonIllumination, ctx.per_time(&illumination)),
        (Variable::MoonElongation, ctx.per_time(&elongation)),
        (Variable::MoonVmagnitude, ctx.per_time(&vmag)),
        (Variable::MoonSeparation, separation),
    ])
}

fn observation_alt_az(ctx: &CalculationContext<'_>) -> VariableMap {
    let times = &ctx.state.times;
    let horizontal = |ra, decl, j: usize| ctx.site.to_horizontal(times[j], ra, decl);
    VariableMap::from([
        (
            Variable::Alt,
            ctx.per_pointing(|ra, decl, j| horizontal(ra, decl, j).alt),
        ),
        (
            Variable::Az,
            ctx.per_pointing(|ra, decl, j| horizontal(ra, decl, j).az),
        ),
    ])
}

fn observation_hour_angle(ctx: &CalculationContext<'_>) -> VariableMap {
    let times = &ctx.state.times;
    let ha = ctx.per_pointing(|ra, _, j| ctx.site.hour_angle(times[j], ra));
    VariableMap::from([(Variable::Ha, ha)])
}

fn observation_airmass(ctx: &CalculationContext<'_>) -> VariableMap {
    VariableMap::from([(Variable::Airmass, ctx.pointing_airmass())])
}

fn local_sidereal_time(ctx: &CalculationContext<'_>) -> VariableMap {
    let lst: Vec<f64> = ctx
        .state
        .times
        .iter()
        .map(|&t| ctx.site.local_sidereal_time(t))
        .collect();
    VariableMap::from([(Variable::Lst, ctx.per_time(&lst))])
}

/// Point seeing, band seeing and FWHM from the airmass of each pointing.
///
/// ```text
/// pt_seeing   = seeing · X^0.6
/// band_seeing = pt_seeing · (500 / λ)^0.2
/// fwhm        = sqrt(band_seeing² + optics_fwhm²)
/// ```
fn seeing_terms(ctx: &CalculationContext<'_>, x: &DMatrix<f64>) -> [DMatrix<f64>; 3] {
    let wavelength = ctx
        .config
        .wavelength(&ctx.state.band)
        .unwrap_or(f64::NAN);
    let band_factor = (SEEING_REFERENCE_WAVELENGTH / wavelength).powf(SEEING_WAVELENGTH_EXPONENT);

    let pt_seeing = x.map(|x| ctx.state.seeing * x.powf(SEEING_AIRMASS_EXPONENT));
    let band_seeing = pt_seeing.map(|s| s * band_factor);
    let optics = ctx.config.optics_fwhm;
    let fwhm = band_seeing.map(|s| (s.powi(2) + optics.powi(2)).sqrt());
    [pt_seeing, band_seeing, fwhm]
}

fn seeing(ctx: &CalculationContext<'_>) -> VariableMap {
    let [pt_seeing, band_seeing, fwhm] = seeing_terms(ctx, &ctx.pointing_airmass());
    VariableMap::from([
        (Variable::PtSeeing, pt_seeing),
        (Variable::BandSeeing, band_seeing),
        (Variable::Fwhm, fwhm),
    ])
}

fn sky_brightness(ctx: &CalculationContext<'_>) -> VariableMap {
    let times = &ctx.state.times;
    let sun = ctx.bodies(sun_position);
    let moon = ctx.bodies(moon_position);
    let phase: Vec<f64> = times.iter().map(|&t| moon_phase_angle(t)).collect();

    let sky_magnitude = ctx.per_pointing(|ra, decl, j| {
        let Some(model) = ctx.sky_model else {
            return f64::NAN;
        };
        let t = times[j];
        let target = ctx.site.to_horizontal(t, ra, decl);
        let moon_hz = ctx.site.to_horizontal(t, moon[j].ra, moon[j].decl);
        let sun_hz = ctx.site.to_horizontal(t, sun[j].ra, sun[j].decl);
        model.sky_magnitude(&SkyInputs {
            moon_phase: phase[j],
            moon_separation: angular_separation(ra, decl, moon[j].ra, moon[j].decl),
            moon_zenith: 90.0 - moon_hz.alt,
            target_zenith: 90.0 - target.alt,
            sun_zenith: 90.0 - sun_hz.alt,
        })
    });

    let x = ctx.pointing_airmass();
    let [_, _, fwhm] = seeing_terms(ctx, &x);
    let sky_config = ctx.config.sky_brightness.clone().unwrap_or_default();

    let (n, m) = sky_magnitude.shape();
    let mut tau = DMatrix::from_element(n, m, f64::NAN);
    let mut teff = DMatrix::from_element(n, m, f64::NAN);
    for i in 0..n {
        for j in 0..m {
            let (t, e) = effective_exposure(
                &sky_config,
                sky_magnitude[(i, j)],
                x[(i, j)],
                fwhm[(i, j)],
                ctx.state.clouds,
            );
            tau[(i, j)] = t;
            teff[(i, j)] = e;
        }
    }

    VariableMap::from([
        (Variable::SkyMagnitude, sky_magnitude),
        (Variable::Tau, tau),
        (Variable::Teff, teff),
    ])
}

#[cfg(test)]
mod variables_test {
    use super::*;
    use crate::sky_brightness::{KrisciunasSchaefer, SkyBrightnessConfig};
    use approx::assert_abs_diff_eq;

    fn state(pointing: PointingSet) -> EngineState {
        EngineState {
            times: vec![60000.0, 60000.1],
            pointing,
            band: "g".into(),
            delay: 0.0,
            seeing: 0.9,
            clouds: 0.0,
        }
    }

    #[test]
    fn test_variable_names_round_trip() {
        for v in Variable::ALL {
            assert_eq!(v.name().parse::<Variable>().unwrap(), v);
            assert!(v.group().outputs().contains(&v));
        }
        assert_eq!(
            "seeing_fwhm".parse::<Variable>(),
            Err(SurveyError::UnknownVariable("seeing_fwhm".into()))
        );
        let total: usize = VariableGroup::ALL.iter().map(|g| g.outputs().len()).sum();
        assert_eq!(total, Variable::ALL.len());
    }

    #[test]
    fn test_group_shapes() {
        let config = SiteConfig::default();
        let site = config.site().unwrap();
        let state = state(PointingSet::grid(4).unwrap());
        let model = KrisciunasSchaefer::from_config(&SkyBrightnessConfig::default());
        let ctx = CalculationContext {
            state: &state,
            config: &config,
            site: &site,
            sky_model: Some(&model),
        };
        for group in VariableGroup::ALL {
            let values = group.compute(&ctx);
            let keys: Vec<Variable> = values.keys().copied().collect();
            let mut expected = group.outputs().to_vec();
            expected.sort();
            assert_eq!(keys, expected);
            for m in values.values() {
                assert_eq!(m.shape(), (4, 2));
            }
        }
    }

    #[test]
    fn test_seeing_at_zenith() {
        let config = SiteConfig::default();
        let site = config.site().unwrap();
        let lst = site.local_sidereal_time(60000.0);
        let mut state = state(PointingSet::new(vec![lst], vec![site.latitude]).unwrap());
        state.times = vec![60000.0];
        let ctx = CalculationContext {
            state: &state,
            config: &config,
            site: &site,
            sky_model: None,
        };
        let values = VariableGroup::Seeing.compute(&ctx);
        let pt = values[&Variable::PtSeeing][(0, 0)];
        let band = values[&Variable::BandSeeing][(0, 0)];
        let fwhm = values[&Variable::Fwhm][(0, 0)];
        assert_abs_diff_eq!(pt, 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(band, 0.9 * (500.0f64 / 475.0).powf(0.2), epsilon = 1e-6);
        assert_abs_diff_eq!(fwhm, (band * band + 0.45 * 0.45).sqrt(), epsilon = 1e-12);

        let sky = VariableGroup::SkyBrightness.compute(&ctx);
        assert!(sky[&Variable::SkyMagnitude][(0, 0)].is_nan());
    }
}
