// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Progress Observers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hooks invoked by [`crate::run::CascadeRun::run`] every `plot_interval`
//! generations. Plotting front ends implement [`ProgressObserver`].

use cascade_types::constants::ELECTRON_REST_ENERGY_EV;
use cascade_types::spectrum::SpectralFunction;
use ndarray::Array1;

pub trait ProgressObserver {
    fn on_checkpoint(&mut self, generation: usize, energies: &Array1<f64>, spectrum: &SpectralFunction);
}

/// Headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_checkpoint(&mut self, _: usize, _: &Array1<f64>, _: &SpectralFunction) {}
}

/// Logs where the lepton energy sits and how many leptons there are.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

/// Energy of the bin carrying the most energy per log interval, `max E²N`.
pub fn peak_energy(energies: &Array1<f64>, spectrum: &SpectralFunction) -> Option<f64> {
    energies
        .iter()
        .zip(spectrum.values().iter())
        .map(|(&e, &n)| (e, e * e * n))
        .filter(|&(_, w)| w > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(e, _)| e)
}

impl ProgressObserver for LogObserver {
    fn on_checkpoint(&mut self, generation: usize, energies: &Array1<f64>, spectrum: &SpectralFunction) {
        match peak_energy(energies, spectrum) {
            Some(peak) => log::info!(
                "gen {generation}: lepton peak E = {peak:.4e} ({:.3e} eV), N = {:.6e}, E = {:.6e}",
                peak * ELECTRON_REST_ENERGY_EV,
                spectrum.number(),
                spectrum.energy()
            ),
            None => log::info!("gen {generation}: lepton spectrum is empty"),
        }
    }
}
