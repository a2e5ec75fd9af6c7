// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Conservative Deposition
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Two-point deposition of particles onto a log energy grid.
//!
//! A packet of `count` particles at energy `E` between grid points
//! `E_j <= E <= E_{j+1}` is split as `w_lo + w_hi = 1` and
//! `w_lo·E_j + w_hi·E_{j+1} = E`, which keeps both number and energy exact.

use cascade_types::grid::Grid;
use ndarray::{ArrayBase, DataMut, Ix1};

/// Add `count` particles of energy `energy` to `counts` (indexed like `grid`).
///
/// Returns `false` and deposits nothing when `energy` lies off the grid.
pub fn deposit<S>(grid: &Grid, counts: &mut ArrayBase<S, Ix1>, energy: f64, count: f64) -> bool
where
    S: DataMut<Elem = f64>,
{
    match grid.locate(energy) {
        Some((j, w_hi)) => {
            counts[j] += (1.0 - w_hi) * count;
            counts[j + 1] += w_hi * count;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_deposit_conserves_number_and_energy() {
        let grid = Grid::primary(1.0, 1000.0, 0.0, 4).unwrap();
        let mut counts = Array1::zeros(4);
        assert!(deposit(&grid, &mut counts, 37.0, 2.0));
        assert!((counts.sum() - 2.0).abs() < 1e-14);
        assert!((counts.dot(grid.energies()) - 74.0).abs() < 1e-12);
        assert_eq!(counts[0], 0.0);
        assert_eq!(counts[3], 0.0);
    }

    #[test]
    fn test_deposit_on_grid_point() {
        let grid = Grid::primary(1.0, 1000.0, 0.0, 4).unwrap();
        let mut counts = Array1::zeros(4);
        assert!(deposit(&grid, &mut counts, 1000.0, 1.0));
        assert!((counts[3] - 1.0).abs() < 1e-15);
        assert!(counts[2].abs() < 1e-15);
    }

    #[test]
    fn test_deposit_off_grid() {
        let grid = Grid::primary(1.0, 1000.0, 0.0, 4).unwrap();
        let mut counts = Array1::zeros(4);
        assert!(!deposit(&grid, &mut counts, 0.5, 1.0));
        assert!(!deposit(&grid, &mut counts, 2000.0, 1.0));
        assert_eq!(counts.sum(), 0.0);
    }

    #[test]
    fn test_deposit_into_matrix_column() {
        let grid = Grid::primary(1.0, 1000.0, 0.0, 4).unwrap();
        let mut m = Array2::zeros((4, 2));
        let mut col = m.column_mut(1);
        deposit(&grid, &mut col, 5.5, 1.0);
        assert!((m.column(1).sum() - 1.0).abs() < 1e-15);
        assert_eq!(m.column(0).sum(), 0.0);
    }
}
