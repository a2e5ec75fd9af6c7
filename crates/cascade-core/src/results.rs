// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Results Loader
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-generation summary quantities reconstructed from a checkpoint.

use crate::checkpoint::Checkpoint;
use cascade_types::error::CascadeResult;
use cascade_types::grid::Grid;
use cascade_types::spectrum::{Population, SpectralFunction};
use ndarray::{Array1, Array2};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CascadeResults {
    pub energies: Array1<f64>,
    pub generations: Vec<usize>,
    /// Lepton `dN/dE`, `(generation, energy)`.
    pub lepton: Array2<f64>,
    /// Radiated photon `dN/dE`, `(generation, energy)`.
    pub photon: Array2<f64>,
    pub n_tot: Array1<f64>,
    pub e_tot: Array1<f64>,
    pub delta_n: Array1<f64>,
    pub delta_e: Array1<f64>,
    /// Leptons plus radiated photons.
    pub e_all: Array1<f64>,
    pub e_rad: Array1<f64>,
    pub n_rad: Array1<f64>,
    pub e_lep: Array1<f64>,
}

impl CascadeResults {
    pub fn load(path: impl AsRef<Path>) -> CascadeResult<Self> {
        Self::from_checkpoint(Checkpoint::load(path)?)
    }

    pub fn from_checkpoint(ckpt: Checkpoint) -> CascadeResult<Self> {
        let grid = Arc::new(Grid::primary(
            ckpt.grid_emin,
            ckpt.grid_emax,
            ckpt.e0_grid,
            ckpt.n_grid,
        )?);
        let mut lepton = SpectralFunction::from_grid(grid.clone(), Population::Lepton);
        let mut photon = SpectralFunction::from_grid(grid, Population::Radiated);

        let g = ckpt.history.len();
        let mut e_lep = Array1::zeros(g);
        let mut e_rad = Array1::zeros(g);
        let mut n_rad = Array1::zeros(g);
        for (i, record) in ckpt.history.records().iter().enumerate() {
            lepton.set_values(record.lepton.clone())?;
            photon.set_values(record.photon.clone())?;
            e_lep[i] = lepton.energy();
            e_rad[i] = photon.energy();
            n_rad[i] = photon.number();
        }

        Ok(CascadeResults {
            e_all: &e_lep + &e_rad,
            energies: ckpt.energies,
            generations: ckpt.history.generations(),
            lepton: ckpt.history.lepton_matrix(),
            photon: ckpt.history.photon_matrix(),
            n_tot: ckpt.history.n_tot(),
            e_tot: ckpt.history.e_tot(),
            delta_n: ckpt.history.delta_n(),
            delta_e: ckpt.history.delta_e(),
            e_rad,
            n_rad,
            e_lep,
        })
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}
