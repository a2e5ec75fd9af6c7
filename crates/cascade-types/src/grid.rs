// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Energy Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{CascadeError, CascadeResult};
use ndarray::Array1;

/// Offset of the staggered companion grid, in cells.
pub const STAGGER_OFFSET: f64 = 0.5;

/// Logarithmic 1D energy grid.
///
/// Lattice sites sit at `ln Emin + (k + offset)·dx` with
/// `dx = ln(Emax/Emin) / (Ngrid - 1)`. Sites beyond `Emax` are dropped, so
/// the primary grid (`offset = 0`) has `Ngrid` points spanning exactly
/// `[Emin, Emax]` and a staggered grid (`offset = 0.5`) has `Ngrid - 1`
/// points, one inside each primary cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    emin: f64,
    emax: f64,
    e0: f64,
    ngrid: usize,
    offset: f64,
    dx: f64,
    energies: Array1<f64>,
    log_energies: Array1<f64>,
}

impl Grid {
    pub fn new(emin: f64, emax: f64, e0: f64, ngrid: usize, offset: f64) -> CascadeResult<Self> {
        if !emin.is_finite() || !emax.is_finite() || emin <= 0.0 {
            return Err(CascadeError::InvalidRange(format!(
                "grid bounds must be finite with Emin > 0, got [{emin}, {emax}]"
            )));
        }
        if emin >= emax {
            return Err(CascadeError::InvalidRange(format!(
                "grid Emin ({emin}) must be < Emax ({emax})"
            )));
        }
        if ngrid < 2 {
            return Err(CascadeError::InvalidRange(format!(
                "grid needs Ngrid >= 2, got {ngrid}"
            )));
        }
        if !(0.0..1.0).contains(&offset) {
            return Err(CascadeError::InvalidRange(format!(
                "grid offset must lie in [0, 1), got {offset}"
            )));
        }

        let log_emin = emin.ln();
        let dx = (emax / emin).ln() / (ngrid - 1) as f64;
        if !dx.is_finite() || dx <= 0.0 {
            return Err(CascadeError::InvalidRange(format!(
                "grid spacing must be finite and > 0, got {dx}"
            )));
        }

        let len = if offset == 0.0 { ngrid } else { ngrid - 1 };
        let log_energies = Array1::from_shape_fn(len, |k| log_emin + (k as f64 + offset) * dx);
        let mut energies = log_energies.mapv(f64::exp);
        if offset == 0.0 {
            // pin the end points; exp(ln(x)) is not exact
            energies[0] = emin;
            energies[len - 1] = emax;
        }

        if (1..len).any(|k| energies[k] <= energies[k - 1]) {
            return Err(CascadeError::InvalidRange(format!(
                "grid [{emin}, {emax}] with {ngrid} points is below floating-point resolution"
            )));
        }

        Ok(Grid {
            emin,
            emax,
            e0,
            ngrid,
            offset,
            dx,
            energies,
            log_energies,
        })
    }

    /// Grid with no offset: points exactly from `Emin` to `Emax`.
    pub fn primary(emin: f64, emax: f64, e0: f64, ngrid: usize) -> CascadeResult<Self> {
        Self::new(emin, emax, e0, ngrid, 0.0)
    }

    /// Companion grid shifted by half a cell.
    pub fn staggered(&self) -> CascadeResult<Self> {
        Self::new(self.emin, self.emax, self.e0, self.ngrid, STAGGER_OFFSET)
    }

    pub fn emin(&self) -> f64 {
        self.emin
    }

    pub fn emax(&self) -> f64 {
        self.emax
    }

    pub fn e0(&self) -> f64 {
        self.e0
    }

    /// Resolution parameter the grid was built with.
    pub fn ngrid(&self) -> usize {
        self.ngrid
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Log cell width, identical for every point.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Number of points actually on the grid.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    pub fn energies(&self) -> &Array1<f64> {
        &self.energies
    }

    pub fn log_energies(&self) -> &Array1<f64> {
        &self.log_energies
    }

    /// Bracketing cell of `energy`.
    ///
    /// Returns `(j, w)` with `energies[j] <= energy <= energies[j + 1]` and `w`
    /// the linear-in-energy weight of the upper point, or `None` outside the grid.
    pub fn locate(&self, energy: f64) -> Option<(usize, f64)> {
        let n = self.len();
        if !energy.is_finite() || n < 2 {
            return None;
        }
        if energy < self.energies[0] || energy > self.energies[n - 1] {
            return None;
        }

        let guess = ((energy.ln() - self.log_energies[0]) / self.dx).floor();
        let mut j = if guess.is_finite() && guess > 0.0 {
            (guess as usize).min(n - 2)
        } else {
            0
        };
        // the log guess can land one cell off after rounding
        while j > 0 && self.energies[j] > energy {
            j -= 1;
        }
        while j < n - 2 && self.energies[j + 1] < energy {
            j += 1;
        }

        let lo = self.energies[j];
        let hi = self.energies[j + 1];
        let w = ((energy - lo) / (hi - lo)).clamp(0.0, 1.0);
        Some((j, w))
    }

    /// Index of the grid point closest to `energy` in log space.
    pub fn nearest(&self, energy: f64) -> Option<usize> {
        let (j, _) = self.locate(energy)?;
        let ln_e = energy.ln();
        if (ln_e - self.log_energies[j]).abs() <= (self.log_energies[j + 1] - ln_e).abs() {
            Some(j)
        } else {
            Some(j + 1)
        }
    }
}
