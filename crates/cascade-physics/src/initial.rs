// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Initial Lepton Spectrum
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Generation-0 lepton spectrum, normalized to one particle.

use cascade_math::numeric::{checked_div, ensure_all_finite};
use cascade_types::config::InitialSpectrumConfig;
use cascade_types::error::{CascadeError, CascadeResult};
use cascade_types::grid::Grid;
use cascade_types::spectrum::{Population, SpectralFunction};
use ndarray::Array1;
use std::f64::consts::PI;
use std::sync::Arc;

/// Build the initial lepton spectrum centred at `e0`.
///
/// The log-normal shape is
/// `N(E) = exp(-ln²(E/E0) / 2σ²) / (√(2π) σ E)`, rescaled so the discrete
/// number `Σ N·E·dx` is exactly 1 even when a grid edge truncates the tail.
pub fn initial_lepton_spectrum(
    grid: Arc<Grid>,
    e0: f64,
    shape: InitialSpectrumConfig,
) -> CascadeResult<SpectralFunction> {
    if !(e0 >= grid.emin() && e0 <= grid.emax()) {
        return Err(CascadeError::InvalidRange(format!(
            "E0 ({e0}) lies outside the grid [{}, {}]",
            grid.emin(),
            grid.emax()
        )));
    }

    let mut spectrum = SpectralFunction::from_grid(grid.clone(), Population::Lepton);
    match shape {
        InitialSpectrumConfig::SingleBin => {
            let k = grid.nearest(e0).ok_or_else(|| {
                CascadeError::InvalidRange(format!("E0 ({e0}) has no nearest grid point"))
            })?;
            let mut counts = Array1::zeros(grid.len());
            counts[k] = 1.0;
            spectrum.set_counts(counts)?;
        }
        InitialSpectrumConfig::LogNormal { width } => {
            if !(width.is_finite() && width > 0.0) {
                return Err(CascadeError::InvalidRange(format!(
                    "log-normal width must be finite and > 0, got {width}"
                )));
            }
            let norm = (2.0 * PI).sqrt() * width;
            let ln_e0 = e0.ln();
            let values = Array1::from_shape_fn(grid.len(), |k| {
                let z = grid.log_energies()[k] - ln_e0;
                (-z * z / (2.0 * width * width)).exp() / (norm * grid.energies()[k])
            });
            ensure_all_finite(&values, "log-normal initial spectrum")?;
            spectrum.set_values(values)?;

            let number = spectrum.number();
            if number <= 0.0 {
                return Err(CascadeError::InvalidRange(format!(
                    "log-normal of width {width} at E0 = {e0} is unresolved by the grid"
                )));
            }
            if (number - 1.0).abs() > 1e-3 {
                log::debug!("initial log-normal truncated by grid, discrete number {number:.6}");
            }
            spectrum.scale(checked_div(1.0, number, "initial spectrum normalization")?)?;
        }
    }
    Ok(spectrum)
}
