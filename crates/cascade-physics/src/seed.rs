// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Seed Photon Field
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Power-law soft photon background `n(ε) ∝ ε^-s` on `[Emin, Emax]`.
//!
//! Leptons Compton-upscatter against this field and gamma rays above the
//! threshold `Egmin` pair-produce on it.

use cascade_math::numeric::{checked_div, checked_ln, checked_powf, ensure_finite};
use cascade_types::config::CascadeConfig;
use cascade_types::error::{CascadeError, CascadeResult};

/// Below this the power-law antiderivative switches to its logarithmic limit.
const LOG_LIMIT_EPS: f64 = 1e-12;

/// Moment used when integrating the seed spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// ∫ ε^-s dε, antiderivative exponent `1 - s`.
    Number,
    /// ∫ ε^(1-s) dε, antiderivative exponent `2 - s`.
    Energy,
}

impl Weighting {
    fn moment(self) -> f64 {
        match self {
            Weighting::Number => 1.0,
            Weighting::Energy => 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedPhoton {
    emin: f64,
    emax: f64,
    index: f64,
    egmin: f64,
}

impl SeedPhoton {
    /// `egmin = None` uses the head-on threshold against the hardest seed, `1 / emax`.
    pub fn new(emin: f64, emax: f64, index: f64, egmin: Option<f64>) -> CascadeResult<Self> {
        if !emin.is_finite() || !emax.is_finite() || emin <= 0.0 {
            return Err(CascadeError::InvalidRange(format!(
                "seed photon bounds must be finite with Esmin > 0, got [{emin}, {emax}]"
            )));
        }
        if emin >= emax {
            return Err(CascadeError::InvalidRange(format!(
                "seed photon Esmin ({emin}) must be < Esmax ({emax})"
            )));
        }
        if !index.is_finite() {
            return Err(CascadeError::InvalidRange(format!(
                "seed photon index must be finite, got {index}"
            )));
        }
        let egmin = egmin.unwrap_or(1.0 / emax);
        if !egmin.is_finite() || egmin <= 0.0 {
            return Err(CascadeError::InvalidRange(format!(
                "pair threshold Egmin must be finite and > 0, got {egmin}"
            )));
        }
        Ok(SeedPhoton {
            emin,
            emax,
            index,
            egmin,
        })
    }

    pub fn from_config(config: &CascadeConfig) -> CascadeResult<Self> {
        Self::new(
            config.seed_emin,
            config.seed_emax,
            config.seed_index,
            config.eg_min,
        )
    }

    pub fn emin(&self) -> f64 {
        self.emin
    }

    pub fn emax(&self) -> f64 {
        self.emax
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    pub fn egmin(&self) -> f64 {
        self.egmin
    }

    /// Unnormalized number density `ε^-s`.
    pub fn density(&self, eps: f64) -> CascadeResult<f64> {
        checked_powf(eps, -self.index, "seed photon density")
    }

    /// Share of the seed spectrum inside `[lo, hi]` (clamped to the cutoffs).
    pub fn fraction_between(&self, lo: f64, hi: f64, weighting: Weighting) -> CascadeResult<f64> {
        let lo = lo.clamp(self.emin, self.emax);
        let hi = hi.clamp(self.emin, self.emax);
        if hi <= lo {
            return Ok(0.0);
        }
        let p = weighting.moment() - self.index;
        let part = power_law_integral(lo, hi, p)?;
        let whole = power_law_integral(self.emin, self.emax, p)?;
        let frac = checked_div(part, whole, "seed spectrum fraction")?;
        Ok(frac.clamp(0.0, 1.0))
    }

    /// Seed energies that can upscatter into a photon of energy `e1` off a
    /// lepton of energy `gamma`, clamped to the seed cutoffs.
    ///
    /// Follows from the Klein-Nishina kinematic range `1/(4γ²) <= q <= 1`.
    pub fn scattering_window(&self, e1: f64, gamma: f64) -> Option<(f64, f64)> {
        if !(e1 > 0.0 && e1 < gamma && gamma.is_finite()) {
            return None;
        }
        let recoil = gamma - e1;
        let lo = (e1 / (4.0 * gamma * recoil)).max(self.emin);
        let hi = (e1 * gamma / recoil).min(self.emax);
        if lo.is_finite() && hi.is_finite() && lo < hi {
            Some((lo, hi))
        } else {
            None
        }
    }

    /// Probability that a photon of energy `e1`, emitted by a lepton of energy
    /// `gamma`, finds a seed photon above its pair-production threshold.
    ///
    /// Zero below `Egmin`. Above it, the share of the seed spectrum with
    /// `ε >= 1 / E`, where `E = min(e1, gamma)`.
    pub fn pair_fraction(&self, e1: f64, gamma: f64, weighting: Weighting) -> CascadeResult<f64> {
        let e_gamma = ensure_finite(e1.min(gamma), "pair fraction photon energy")?;
        if e_gamma < self.egmin || e_gamma <= 0.0 {
            return Ok(0.0);
        }
        let threshold = checked_div(1.0, e_gamma, "pair threshold seed energy")?;
        self.fraction_between(threshold, self.emax, weighting)
    }
}

/// ∫_lo^hi ε^(p-1) dε = (hi^p - lo^p) / p, with the exact limit `ln(hi/lo)` at `p = 0`.
///
/// Evaluated as `lo^p · L · expm1(pL)/(pL)` with `L = ln(hi/lo)` so that
/// exponents close to zero do not cancel.
pub fn power_law_integral(lo: f64, hi: f64, p: f64) -> CascadeResult<f64> {
    let span = checked_ln(checked_div(hi, lo, "power-law bounds")?, "power-law span")?;
    let x = p * span;
    let shape = if x.abs() < LOG_LIMIT_EPS {
        1.0
    } else {
        x.exp_m1() / x
    };
    let scale = checked_powf(lo, p, "power-law lower bound")?;
    ensure_finite(scale * span * shape, "power-law integral")
}
