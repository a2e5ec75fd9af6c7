// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Physical constants and run defaults.
//!
//! Energies everywhere in the workspace are dimensionless, in units of the
//! electron rest energy. A lepton of energy `E` has Lorentz factor `E`.

/// Electron rest energy [eV]. Only used to convert for display.
pub const ELECTRON_REST_ENERGY_EV: f64 = 510_998.950;

/// Initial characteristic lepton energy.
pub const DEFAULT_E0: f64 = 1.6e9;

/// Number of generations per run.
pub const DEFAULT_N_GEN: usize = 100;

/// Energy grid resolution.
pub const DEFAULT_N_GRID: usize = 100;

/// Lower grid bound.
pub const DEFAULT_GRID_EMIN: f64 = 1e-6;

/// Upper grid bound.
pub const DEFAULT_GRID_EMAX: f64 = 2e9;

/// Seed photon power-law index `s` in `n(ε) ∝ ε^-s`.
/// Also the fallback for checkpoints written before `s` was stored.
pub const DEFAULT_SEED_INDEX: f64 = 2.2;

/// Seed photon lower cutoff.
pub const DEFAULT_SEED_EMIN: f64 = 0.0012;

/// Seed photon upper cutoff.
pub const DEFAULT_SEED_EMAX: f64 = 0.79;

/// Log-width of the initial log-normal bump (in ln E).
pub const DEFAULT_LOG_NORMAL_WIDTH: f64 = 0.1;

/// Generations between progress-observer callbacks.
pub const DEFAULT_PLOT_INTERVAL: usize = 10;

/// Gauss-Legendre nodes for the seed-spectrum integral.
pub const DEFAULT_QUADRATURE_NODES: usize = 24;
