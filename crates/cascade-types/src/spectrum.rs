// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Spectral Function
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{CascadeError, CascadeResult};
use crate::grid::Grid;
use ndarray::Array1;
use std::sync::Arc;

/// Which particle population a spectrum describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Electrons and positrons; they keep scattering.
    Lepton,
    /// Escaped photons; they never re-inject.
    Radiated,
}

/// Number density per unit energy `N(E)` sampled on a shared [`Grid`].
///
/// `N(E)·E·dx` is the particle count in a log cell, so number and energy
/// integrals are plain sums over the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFunction {
    grid: Arc<Grid>,
    population: Population,
    values: Array1<f64>,
}

impl SpectralFunction {
    /// Zero spectrum bound to `grid`.
    pub fn from_grid(grid: Arc<Grid>, population: Population) -> Self {
        let values = Array1::zeros(grid.len());
        SpectralFunction {
            grid,
            population,
            values,
        }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn population(&self) -> Population {
        self.population
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Replace the values; the length must match the grid and every value must be finite.
    pub fn set_values(&mut self, values: Array1<f64>) -> CascadeResult<()> {
        if values.len() != self.grid.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: self.grid.len(),
                actual: values.len(),
            });
        }
        check_finite(&values)?;
        self.values = values;
        Ok(())
    }

    /// Particle count per grid cell, `N·E·dx`.
    pub fn counts(&self) -> Array1<f64> {
        &self.values * self.grid.energies() * self.grid.dx()
    }

    /// Inverse of [`Self::counts`].
    pub fn set_counts(&mut self, counts: Array1<f64>) -> CascadeResult<()> {
        if counts.len() != self.grid.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: self.grid.len(),
                actual: counts.len(),
            });
        }
        let values = counts / self.grid.energies() / self.grid.dx();
        self.set_values(values)
    }

    /// Total number `Σ N·E·dx`.
    pub fn number(&self) -> f64 {
        self.values.dot(self.grid.energies()) * self.grid.dx()
    }

    /// Total energy `Σ N·E²·dx`.
    pub fn energy(&self) -> f64 {
        let e = self.grid.energies();
        (&self.values * e).dot(e) * self.grid.dx()
    }

    pub fn scale(&mut self, factor: f64) -> CascadeResult<()> {
        if !factor.is_finite() {
            return Err(CascadeError::NumericFault(format!(
                "cannot scale spectrum by {factor}"
            )));
        }
        let scaled = self.values.mapv(|v| v * factor);
        check_finite(&scaled)?;
        self.values = scaled;
        Ok(())
    }

    /// Element-wise `self += other`; on overflow the values are left untouched.
    pub fn try_add(&mut self, other: &SpectralFunction) -> CascadeResult<()> {
        self.check_same_grid(other)?;
        let sum = &self.values + &other.values;
        check_finite(&sum)?;
        self.values = sum;
        Ok(())
    }

    /// Overwrite the values with a copy of `other`'s, keeping this population tag.
    pub fn copy_from(&mut self, other: &SpectralFunction) -> CascadeResult<()> {
        self.check_same_grid(other)?;
        self.values.assign(&other.values);
        Ok(())
    }

    fn check_same_grid(&self, other: &SpectralFunction) -> CascadeResult<()> {
        if self.values.len() != other.values.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: self.values.len(),
                actual: other.values.len(),
            });
        }
        if !Arc::ptr_eq(&self.grid, &other.grid) && *self.grid != *other.grid {
            return Err(CascadeError::InvalidRange(
                "spectra are sampled on different grids".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_finite(values: &Array1<f64>) -> CascadeResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(bad) => Err(CascadeError::NumericFault(format!(
            "non-finite spectral value {} at grid index {bad}",
            values[bad]
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn grid() -> Arc<Grid> {
        Arc::new(Grid::primary(1.0, 1000.0, 0.0, 4).unwrap())
    }

    #[test]
    fn test_from_grid_is_zero() {
        let f = SpectralFunction::from_grid(grid(), Population::Lepton);
        assert_eq!(f.values().len(), 4);
        assert!(f.values().iter().all(|&v| v == 0.0));
        assert_eq!(f.number(), 0.0);
        assert_eq!(f.population(), Population::Lepton);
    }

    #[test]
    fn test_set_values_roundtrip() {
        let mut f = SpectralFunction::from_grid(grid(), Population::Radiated);
        let v = array![1.0, 0.5, 0.25, 0.125];
        f.set_values(v.clone()).unwrap();
        assert_eq!(f.values(), &v);
    }

    #[test]
    fn test_set_values_shape_mismatch() {
        let mut f = SpectralFunction::from_grid(grid(), Population::Lepton);
        let err = f.set_values(array![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            CascadeError::ShapeMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_set_values_rejects_nan() {
        let mut f = SpectralFunction::from_grid(grid(), Population::Lepton);
        let err = f.set_values(array![1.0, f64::NAN, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, CascadeError::NumericFault(_)));
        assert!(f.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_counts_number_energy() {
        let g = grid();
        let dx = g.dx();
        let mut f = SpectralFunction::from_grid(g, Population::Lepton);
        // one particle in the 10 bin
        f.set_counts(array![0.0, 1.0, 0.0, 0.0]).unwrap();
        assert!((f.values()[1] - 1.0 / (10.0 * dx)).abs() < 1e-12);
        assert!((f.number() - 1.0).abs() < 1e-12);
        assert!((f.energy() - 10.0).abs() < 1e-9);
        let c = f.counts();
        assert!((c[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_algebra() {
        let g = grid();
        let mut a = SpectralFunction::from_grid(g.clone(), Population::Lepton);
        let mut b = SpectralFunction::from_grid(g, Population::Lepton);
        a.set_values(array![1.0, 1.0, 1.0, 1.0]).unwrap();
        b.set_values(array![0.0, 1.0, 2.0, 3.0]).unwrap();
        a.try_add(&b).unwrap();
        assert_eq!(a.values(), &array![1.0, 2.0, 3.0, 4.0]);
        a.scale(0.5).unwrap();
        assert_eq!(a.values(), &array![0.5, 1.0, 1.5, 2.0]);
        assert!(a.scale(f64::INFINITY).is_err());

        let other = Arc::new(Grid::primary(1.0, 100.0, 0.0, 4).unwrap());
        let c = SpectralFunction::from_grid(other, Population::Lepton);
        assert!(a.try_add(&c).is_err());
    }

    #[test]
    fn test_scale_overflow_leaves_values() {
        let mut f = SpectralFunction::from_grid(grid(), Population::Lepton);
        let v = array![1e10, 2e10, 0.0, 3e10];
        f.set_values(v.clone()).unwrap();
        let err = f.scale(1e300).unwrap_err();
        assert!(matches!(err, CascadeError::NumericFault(_)));
        assert_eq!(f.values(), &v);
    }

    #[test]
    fn test_add_overflow_leaves_values() {
        let g = grid();
        let mut a = SpectralFunction::from_grid(g.clone(), Population::Lepton);
        let mut b = SpectralFunction::from_grid(g, Population::Lepton);
        let v = array![1.0, f64::MAX, 0.0, 0.0];
        a.set_values(v.clone()).unwrap();
        b.set_values(array![0.0, f64::MAX, 0.0, 0.0]).unwrap();
        let err = a.try_add(&b).unwrap_err();
        assert!(matches!(err, CascadeError::NumericFault(_)));
        assert_eq!(a.values(), &v);
    }

    #[test]
    fn test_copy_is_explicit() {
        let g = grid();
        let mut new = SpectralFunction::from_grid(g.clone(), Population::Lepton);
        let mut old = SpectralFunction::from_grid(g, Population::Lepton);
        new.set_values(array![1.0, 2.0, 3.0, 4.0]).unwrap();
        old.copy_from(&new).unwrap();
        new.scale(2.0).unwrap();
        assert_eq!(old.values(), &array![1.0, 2.0, 3.0, 4.0]);
    }
}
