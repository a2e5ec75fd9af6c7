// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Inverse Compton Cross Section
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Klein-Nishina upscattering on an isotropic seed photon field.
//!
//! References:
//! - Jones, Phys. Rev. 167, 1159 (1968)
//! - Blumenthal & Gould, Rev. Mod. Phys. 42, 237 (1970), Eq. 2.48

use crate::seed::SeedPhoton;
use cascade_math::numeric::{checked_div, checked_ln, ensure_finite};
use cascade_math::quadrature::GaussLegendre;
use cascade_types::error::CascadeResult;

/// Jones kernel `F(q, Γ)` for `0 < q <= 1`; zero outside.
///
/// `Γ = 4εγ` and `q = E1 / (Γ(γ - E1))`.
pub fn jones_kernel(q: f64, big_gamma: f64) -> CascadeResult<f64> {
    if !(q > 0.0 && q <= 1.0) {
        return Ok(0.0);
    }
    let gq = big_gamma * q;
    let f = 2.0 * q * checked_ln(q, "Jones kernel q")? + (1.0 + 2.0 * q) * (1.0 - q)
        + gq * gq * (1.0 - q) / (2.0 * (1.0 + gq));
    // can dip a rounding error below zero at q -> 1
    Ok(ensure_finite(f, "Jones kernel")?.max(0.0))
}

/// Photons per unit energy at `e1` emitted by a lepton of energy `gamma`,
/// integrated over the seed spectrum:
///
///   `γ⁻² ∫ ε^-s F(q, 4εγ) d ln ε`
///
/// The overall rate constant `2π r_e² c` and the seed normalization are
/// dropped; callers only use ratios.
pub fn photon_yield(
    seed: &SeedPhoton,
    rule: &GaussLegendre,
    gamma: f64,
    e1: f64,
) -> CascadeResult<f64> {
    let Some((lo, hi)) = seed.scattering_window(e1, gamma) else {
        return Ok(0.0);
    };
    let recoil = gamma - e1;
    let integral = rule.integrate_log(lo, hi, |eps| {
        let big_gamma = 4.0 * eps * gamma;
        let q = checked_div(e1, big_gamma * recoil, "Compton q")?;
        Ok(seed.density(eps)? * jones_kernel(q, big_gamma)?)
    })?;
    checked_div(integral, gamma * gamma, "Compton photon yield")
}
