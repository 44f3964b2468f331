use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::Degree;
use crate::coordinates::angular_separation;
use crate::deepsurvey_errors::SurveyError;

/// Raw sky location as supplied by an action or a configuration document.
///
/// `ra` and `decl` are parallel lists in degrees; they are validated when turned into a
/// [`PointingSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub ra: Vec<Degree>,
    pub decl: Vec<Degree>,
}

impl Location {
    pub fn new(ra: Vec<Degree>, decl: Vec<Degree>) -> Self {
        Location { ra, decl }
    }

    /// Single-site location.
    pub fn single(ra: Degree, decl: Degree) -> Self {
        Location {
            ra: vec![ra],
            decl: vec![decl],
        }
    }
}

/// Check a pair of right ascension / declination lists.
///
/// Return
/// ----------
/// * `Ok(())` when the lists are non-empty, of equal length, finite and within
///   `ra ∈ [0, 360]`, `decl ∈ [-90, 90]`; otherwise a message describing the first problem.
pub(crate) fn check_coordinates(ra: &[Degree], decl: &[Degree]) -> Result<(), String> {
    if ra.is_empty() || decl.is_empty() {
        return Err("location needs at least one ra/decl pair".into());
    }
    if ra.len() != decl.len() {
        return Err(format!(
            "ra and decl must be paired, got {} ra and {} decl values",
            ra.len(),
            decl.len()
        ));
    }
    if let Some(bad) = ra.iter().find(|a| !(0.0..=360.0).contains(*a)) {
        return Err(format!("ra must be within [0, 360] degrees, got {bad}"));
    }
    if let Some(bad) = decl.iter().find(|d| !(-90.0..=90.0).contains(*d)) {
        return Err(format!("decl must be within [-90, 90] degrees, got {bad}"));
    }
    Ok(())
}

/// A validated, non-empty set of telescope pointings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointingSet {
    ra: Vec<Degree>,
    decl: Vec<Degree>,
}

impl PointingSet {
    /// Build a pointing set from paired coordinates.
    ///
    /// Return
    /// ----------
    /// * The pointing set, or [`SurveyError::InvalidAction`] when the lists are empty,
    ///   mismatched or out of range.
    pub fn new(ra: Vec<Degree>, decl: Vec<Degree>) -> Result<Self, SurveyError> {
        check_coordinates(&ra, &decl).map_err(SurveyError::InvalidAction)?;
        Ok(PointingSet { ra, decl })
    }

    /// Sites evenly spread over the sky.
    ///
    /// Site `i` sits at `decl = −90 + i·180/n`, `ra = i·360/n`, so declination steps across
    /// `[-90, 90)` while right ascension steps across `[0, 360)`.
    ///
    /// Return
    /// ----------
    /// * The grid, or [`SurveyError::Configuration`] when `n_sites` is zero.
    pub fn grid(n_sites: usize) -> Result<Self, SurveyError> {
        if n_sites == 0 {
            return Err(SurveyError::Configuration(
                "location.n_sites must be at least 1".into(),
            ));
        }
        let n = n_sites as f64;
        let decl = (0..n_sites).map(|i| -90.0 + i as f64 * 180.0 / n).collect();
        let ra = (0..n_sites).map(|i| i as f64 * 360.0 / n).collect();
        Ok(PointingSet { ra, decl })
    }

    pub fn len(&self) -> usize {
        self.ra.len()
    }

    /// Always `false`: a pointing set holds at least one site.
    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    pub fn ra(&self) -> &[Degree] {
        &self.ra
    }

    pub fn decl(&self) -> &[Degree] {
        &self.decl
    }

    /// Iterate over `(ra, decl)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Degree, Degree)> + '_ {
        self.ra.iter().copied().zip(self.decl.iter().copied())
    }

    /// String form of the `i`-th `(ra, decl)` pair, used for exact site matching.
    pub fn site_key(&self, i: usize) -> String {
        site_key(self.ra[i], self.decl[i])
    }

    /// String form of the whole set.
    pub fn key(&self) -> String {
        self.iter().map(|(a, d)| site_key(a, d)).join(";")
    }

    /// Largest slew needed to move from `self` to `other`.
    ///
    /// Sets of the same size are compared site by site; otherwise every pair is considered.
    ///
    /// Return
    /// ----------
    /// * The separation in degrees.
    pub fn max_separation(&self, other: &PointingSet) -> Degree {
        if self.len() == other.len() {
            self.iter()
                .zip(other.iter())
                .map(|((a1, d1), (a2, d2))| angular_separation(a1, d1, a2, d2))
                .fold(0.0, f64::max)
        } else {
            self.iter()
                .cartesian_product(other.iter().collect_vec())
                .map(|((a1, d1), (a2, d2))| angular_separation(a1, d1, a2, d2))
                .fold(0.0, f64::max)
        }
    }

    pub fn to_location(&self) -> Location {
        Location::new(self.ra.clone(), self.decl.clone())
    }
}

impl TryFrom<&Location> for PointingSet {
    type Error = SurveyError;

    fn try_from(location: &Location) -> Result<Self, Self::Error> {
        PointingSet::new(location.ra.clone(), location.decl.clone())
    }
}

/// String form of a single `(ra, decl)` pair.
pub fn site_key(ra: Degree, decl: Degree) -> String {
    format!("({ra:?}, {decl:?})")
}

#[cfg(test)]
mod pointing_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_grid() {
        let grid = PointingSet::grid(10).unwrap();
        assert_eq!(grid.len(), 10);
        assert_eq!(grid.decl()[0], -90.0);
        assert_eq!(grid.decl()[9], 72.0);
        assert_eq!(grid.ra()[1], 36.0);
        assert_eq!(grid.ra()[9], 324.0);
        assert!(PointingSet::grid(0).is_err());
    }

    #[test]
    fn test_invalid_pointing() {
        assert!(matches!(
            PointingSet::new(vec![0.0, 1.0], vec![0.0]),
            Err(SurveyError::InvalidAction(_))
        ));
        assert!(PointingSet::new(vec![], vec![]).is_err());
        assert!(PointingSet::new(vec![400.0], vec![0.0]).is_err());
        assert!(PointingSet::new(vec![0.0], vec![-91.0]).is_err());
        assert!(PointingSet::new(vec![f64::NAN], vec![0.0]).is_err());
    }

    #[test]
    fn test_site_key() {
        let p = PointingSet::new(vec![0.0, 10.5], vec![0.0, -3.0]).unwrap();
        assert_eq!(p.site_key(0), "(0.0, 0.0)");
        assert_eq!(p.site_key(1), "(10.5, -3.0)");
        assert_eq!(p.key(), "(0.0, 0.0);(10.5, -3.0)");
        // whole-degree values keep their decimal point
        assert_eq!(site_key(30.0, 45.0), "(30.0, 45.0)");
    }

    #[test]
    fn test_max_separation() {
        let a = PointingSet::new(vec![0.0, 10.0], vec![0.0, 0.0]).unwrap();
        let b = PointingSet::new(vec![0.0, 40.0], vec![5.0, 0.0]).unwrap();
        assert_abs_diff_eq!(a.max_separation(&b), 30.0, epsilon = 1e-6);

        let c = PointingSet::new(vec![90.0], vec![0.0]).unwrap();
        assert_abs_diff_eq!(a.max_separation(&c), 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a.max_separation(&a), 0.0, epsilon = 1e-6);
    }
}
