// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::*;
use crate::error::{CascadeError, CascadeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete cascade run configuration.
///
/// JSON keys follow the checkpoint naming (`E0`, `Ngrid`, `Esmin`, ...).
/// Every field is optional in JSON and falls back to the defaults in
/// [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Initial characteristic lepton energy (pivot of the initial spectrum).
    #[serde(rename = "E0")]
    pub e0: f64,
    /// Last generation to simulate.
    #[serde(rename = "Ngen")]
    pub n_gen: usize,
    #[serde(rename = "Ngrid")]
    pub n_grid: usize,
    #[serde(rename = "Emin")]
    pub grid_emin: f64,
    #[serde(rename = "Emax")]
    pub grid_emax: f64,
    /// Grid pivot energy; stored for reference only.
    #[serde(rename = "E0grid")]
    pub e0_grid: f64,
    #[serde(rename = "s")]
    pub seed_index: f64,
    #[serde(rename = "Esmin")]
    pub seed_emin: f64,
    #[serde(rename = "Esmax")]
    pub seed_emax: f64,
    /// Pair-production threshold override. `None` means `1 / Esmax`.
    #[serde(rename = "Egmin", skip_serializing_if = "Option::is_none")]
    pub eg_min: Option<f64>,
    #[serde(rename = "do_enforce_energy_conservation")]
    pub enforce_energy_conservation: bool,
    pub resume: ResumeMode,
    pub initial_spectrum: InitialSpectrumConfig,
    pub plot_interval: usize,
    pub quadrature_nodes: usize,
}

/// How a run treats an existing checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeMode {
    /// Always start from generation 0.
    #[default]
    Fresh,
    /// Require a checkpoint and continue from it.
    Restart,
    /// Continue if the checkpoint exists, otherwise start fresh.
    Auto,
}

/// Shape of the generation-0 lepton spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InitialSpectrumConfig {
    /// Unit number in the grid point nearest `E0`.
    SingleBin,
    /// Normalized log-normal bump centred at `E0`.
    LogNormal {
        #[serde(default = "default_log_normal_width")]
        width: f64,
    },
}

fn default_log_normal_width() -> f64 {
    DEFAULT_LOG_NORMAL_WIDTH
}

impl Default for InitialSpectrumConfig {
    fn default() -> Self {
        InitialSpectrumConfig::LogNormal {
            width: default_log_normal_width(),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        CascadeConfig {
            e0: DEFAULT_E0,
            n_gen: DEFAULT_N_GEN,
            n_grid: DEFAULT_N_GRID,
            grid_emin: DEFAULT_GRID_EMIN,
            grid_emax: DEFAULT_GRID_EMAX,
            e0_grid: 0.0,
            seed_index: DEFAULT_SEED_INDEX,
            seed_emin: DEFAULT_SEED_EMIN,
            seed_emax: DEFAULT_SEED_EMAX,
            eg_min: None,
            enforce_energy_conservation: false,
            resume: ResumeMode::default(),
            initial_spectrum: InitialSpectrumConfig::default(),
            plot_interval: DEFAULT_PLOT_INTERVAL,
            quadrature_nodes: DEFAULT_QUADRATURE_NODES,
        }
    }
}

fn require_positive(name: &str, value: f64) -> CascadeResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CascadeError::InvalidRange(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

fn require_ordered(lo_name: &str, lo: f64, hi_name: &str, hi: f64) -> CascadeResult<()> {
    require_positive(lo_name, lo)?;
    require_positive(hi_name, hi)?;
    if lo >= hi {
        return Err(CascadeError::InvalidRange(format!(
            "{lo_name} ({lo}) must be < {hi_name} ({hi})"
        )));
    }
    Ok(())
}

impl CascadeConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: impl AsRef<Path>) -> CascadeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option up front so that nothing fails lazily mid-run.
    pub fn validate(&self) -> CascadeResult<()> {
        require_ordered("Emin", self.grid_emin, "Emax", self.grid_emax)?;
        if self.n_grid < 2 {
            return Err(CascadeError::InvalidRange(format!(
                "Ngrid must be >= 2, got {}",
                self.n_grid
            )));
        }
        if !self.e0_grid.is_finite() {
            return Err(CascadeError::InvalidRange(format!(
                "E0grid must be finite, got {}",
                self.e0_grid
            )));
        }
        require_positive("E0", self.e0)?;
        if self.e0 < self.grid_emin || self.e0 > self.grid_emax {
            return Err(CascadeError::InvalidRange(format!(
                "E0 ({}) must lie inside the grid [{}, {}]",
                self.e0, self.grid_emin, self.grid_emax
            )));
        }
        require_ordered("Esmin", self.seed_emin, "Esmax", self.seed_emax)?;
        if !self.seed_index.is_finite() {
            return Err(CascadeError::InvalidRange(format!(
                "s must be finite, got {}",
                self.seed_index
            )));
        }
        if let Some(eg) = self.eg_min {
            require_positive("Egmin", eg)?;
        }
        if let InitialSpectrumConfig::LogNormal { width } = self.initial_spectrum {
            require_positive("log-normal width", width)?;
        }
        if self.plot_interval == 0 {
            return Err(CascadeError::InvalidRange(
                "plot_interval must be >= 1".to_string(),
            ));
        }
        if !(2..=128).contains(&self.quadrature_nodes) {
            return Err(CascadeError::InvalidRange(format!(
                "quadrature_nodes must be in [2, 128], got {}",
                self.quadrature_nodes
            )));
        }
        Ok(())
    }

    /// Pair-production threshold in effect for this run.
    pub fn pair_threshold(&self) -> f64 {
        self.eg_min.unwrap_or(1.0 / self.seed_emax)
    }
}
