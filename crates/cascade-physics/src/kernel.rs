// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Generation-Update Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One cascade generation: every lepton Compton-scatters once on the seed
//! field; the photon either pair-produces (two leptons at half its energy)
//! or escapes into the radiated population.
//!
//! The redistribution depends only on the grids and the seed field, so it is
//! tabulated once as transfer matrices `[target, source]` over particle
//! counts. A generation is then two matrix-vector products.
//!
//! Photon energies are sampled on the staggered grid. This keeps every
//! target strictly below the source energy and away from the `E1 -> γ`
//! end of the kernel, where the recoil lepton energy vanishes.
//!
//! Both matrices are stored dense, `8·N²` bytes each, and tabulating them
//! costs `O(N²)` Compton yields of `nodes` quadrature points. That is fine
//! for the few-hundred-point grids runs use; at `N ~ 1e4` a kernel needs
//! about 1.6 GB. Only the lower triangle (target at or below source) is
//! ever nonzero.

use crate::compton::photon_yield;
use crate::seed::{SeedPhoton, Weighting};
use cascade_math::deposit::deposit;
use cascade_math::numeric::{checked_div, ensure_all_finite, ensure_finite};
use cascade_math::quadrature::GaussLegendre;
use cascade_types::constants::DEFAULT_QUADRATURE_NODES;
use cascade_types::error::{CascadeError, CascadeResult};
use cascade_types::grid::Grid;
use cascade_types::spectrum::{Population, SpectralFunction};
use ndarray::{Array1, Array2};
use std::sync::Arc;

/// Enforcement factors further than this from 1 are logged.
const ENFORCEMENT_WARN_DEVIATION: f64 = 0.1;

/// Tabulated redistribution for one (grid, altgrid, seed) triple.
#[derive(Debug, Clone)]
pub struct CascadeKernel {
    grid: Arc<Grid>,
    altgrid: Arc<Grid>,
    seed: SeedPhoton,
    /// Recoil plus pair leptons per source lepton.
    lepton_transfer: Array2<f64>,
    /// Escaping photons per source lepton.
    photon_transfer: Array2<f64>,
    /// Particles created per source lepton, before deposition losses.
    created: Array1<f64>,
}

impl CascadeKernel {
    pub fn build(
        grid: Arc<Grid>,
        altgrid: Arc<Grid>,
        seed: SeedPhoton,
        quadrature_nodes: usize,
    ) -> CascadeResult<Self> {
        if altgrid.len() + 1 != grid.len() || altgrid.dx() != grid.dx() {
            return Err(CascadeError::InvalidRange(format!(
                "altgrid ({} points, dx={}) is not the staggered companion of grid ({} points, dx={})",
                altgrid.len(),
                altgrid.dx(),
                grid.len(),
                grid.dx()
            )));
        }

        let rule = GaussLegendre::new(quadrature_nodes)?;
        let n = grid.len();
        let mut lepton_transfer = Array2::zeros((n, n));
        let mut photon_transfer = Array2::zeros((n, n));
        let mut created = Array1::zeros(n);

        let targets = altgrid.energies();
        let dx = altgrid.dx();
        let mut weights: Vec<(f64, f64)> = Vec::with_capacity(targets.len());

        for (i, &gamma) in grid.energies().iter().enumerate() {
            weights.clear();
            for &e1 in targets.iter().take_while(|&&e1| e1 < gamma) {
                let w = photon_yield(&seed, &rule, gamma, e1)? * e1 * dx;
                if w > 0.0 {
                    weights.push((e1, ensure_finite(w, "Compton target weight")?));
                }
            }

            let total: f64 = weights.iter().map(|(_, w)| w).sum();
            if total <= 0.0 {
                // no resolvable scattering: the lepton stays put this generation
                lepton_transfer[[i, i]] = 1.0;
                continue;
            }

            let mut lepton_col = lepton_transfer.column_mut(i);
            let mut photon_col = photon_transfer.column_mut(i);
            let mut created_here = 0.0;
            for &(e1, w) in weights.iter() {
                let p = checked_div(w, total, "scattering probability")?;
                let absorbed = seed.pair_fraction(e1, gamma, Weighting::Number)?;

                deposit(&grid, &mut lepton_col, gamma - e1, p);
                deposit(&grid, &mut photon_col, e1, p * (1.0 - absorbed));
                deposit(&grid, &mut lepton_col, 0.5 * e1, 2.0 * p * absorbed);

                // one photon emitted, plus one net particle per pair
                created_here += p * (1.0 + absorbed);
            }
            created[i] = created_here;
        }

        ensure_all_finite(&created, "kernel creation counts")?;
        log::debug!(
            "built cascade kernel: {} source bins, {} photon targets, {} quadrature nodes",
            n,
            targets.len(),
            rule.len()
        );

        Ok(CascadeKernel {
            grid,
            altgrid,
            seed,
            lepton_transfer,
            photon_transfer,
            created,
        })
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn altgrid(&self) -> &Arc<Grid> {
        &self.altgrid
    }

    pub fn seed(&self) -> &SeedPhoton {
        &self.seed
    }

    pub fn lepton_transfer(&self) -> &Array2<f64> {
        &self.lepton_transfer
    }

    pub fn photon_transfer(&self) -> &Array2<f64> {
        &self.photon_transfer
    }

    pub fn created(&self) -> &Array1<f64> {
        &self.created
    }

    /// Advance one generation.
    ///
    /// Writes the next lepton spectrum and the cumulative radiated spectrum
    /// (`old_photon` plus this generation's escapes) into the `new_*`
    /// arguments and returns the reordered particle count: the new total
    /// number minus the particles this generation created. Without grid
    /// losses it equals the old total number.
    ///
    /// With `enforce_conservation`, this generation's products are rescaled
    /// by one common factor so that total energy matches the old total;
    /// photons carried over from `old_photon` are left alone.
    pub fn update(
        &self,
        old_lepton: &SpectralFunction,
        old_photon: &SpectralFunction,
        new_lepton: &mut SpectralFunction,
        new_photon: &mut SpectralFunction,
        enforce_conservation: bool,
    ) -> CascadeResult<f64> {
        self.check_operand(old_lepton, Population::Lepton, "old lepton")?;
        self.check_operand(old_photon, Population::Radiated, "old photon")?;
        self.check_operand(new_lepton, Population::Lepton, "new lepton")?;
        self.check_operand(new_photon, Population::Radiated, "new photon")?;

        let source = old_lepton.counts();
        ensure_all_finite(&source, "old lepton counts")?;

        let mut leptons = self.lepton_transfer.dot(&source);
        let mut escaped = self.photon_transfer.dot(&source);

        if enforce_conservation {
            let energies = self.grid.energies();
            let expected = old_lepton.energy();
            let produced = leptons.dot(energies) + escaped.dot(energies);
            if produced > 0.0 {
                let factor = checked_div(expected, produced, "energy enforcement factor")?;
                if (factor - 1.0).abs() > ENFORCEMENT_WARN_DEVIATION {
                    log::warn!(
                        "energy enforcement rescales generation products by {factor:.6}"
                    );
                }
                leptons.mapv_inplace(|c| c * factor);
                escaped.mapv_inplace(|c| c * factor);
            } else if expected > 0.0 {
                return Err(CascadeError::NumericFault(format!(
                    "cannot enforce energy conservation: products carry no energy, expected {expected}"
                )));
            }
        }

        let photons = old_photon.counts() + &escaped;
        new_lepton.set_counts(leptons)?;
        new_photon.set_counts(photons)?;

        let created = self.created.dot(&source);
        let reordered = new_lepton.number() + new_photon.number() - created;
        ensure_finite(reordered, "reordered particle count")
    }

    fn check_operand(
        &self,
        f: &SpectralFunction,
        population: Population,
        name: &str,
    ) -> CascadeResult<()> {
        if f.values().len() != self.grid.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: self.grid.len(),
                actual: f.values().len(),
            });
        }
        if !Arc::ptr_eq(f.grid(), &self.grid) && **f.grid() != *self.grid {
            return Err(CascadeError::InvalidRange(format!(
                "{name} spectrum is sampled on a different grid than the kernel"
            )));
        }
        if f.population() != population {
            return Err(CascadeError::InvalidRange(format!(
                "{name} spectrum has population {:?}, expected {population:?}",
                f.population()
            )));
        }
        Ok(())
    }
}

/// Single-shot form of [`CascadeKernel::update`].
///
/// Tabulates the kernel for this call only; long runs should build a
/// [`CascadeKernel`] once and reuse it.
#[allow(clippy::too_many_arguments)]
pub fn update(
    old_lepton: &SpectralFunction,
    old_photon: &SpectralFunction,
    new_lepton: &mut SpectralFunction,
    new_photon: &mut SpectralFunction,
    seed: &SeedPhoton,
    grid: &Arc<Grid>,
    altgrid: &Arc<Grid>,
    enforce_conservation: bool,
) -> CascadeResult<f64> {
    let kernel = CascadeKernel::build(
        grid.clone(),
        altgrid.clone(),
        seed.clone(),
        DEFAULT_QUADRATURE_NODES,
    )?;
    kernel.update(
        old_lepton,
        old_photon,
        new_lepton,
        new_photon,
        enforce_conservation,
    )
}
