// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Checked Arithmetic
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Checked floating-point helpers.
//!
//! Divide-by-zero, overflow and invalid operations surface as
//! [`CascadeError::NumericFault`] with the caller's context instead of
//! flowing on as NaN or Inf.

use cascade_types::error::{CascadeError, CascadeResult};
use ndarray::{ArrayBase, Data, Ix1};

pub fn ensure_finite(value: f64, context: &str) -> CascadeResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CascadeError::NumericFault(format!(
            "{context}: non-finite value {value}"
        )))
    }
}

pub fn ensure_all_finite<S: Data<Elem = f64>>(
    values: &ArrayBase<S, Ix1>,
    context: &str,
) -> CascadeResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(CascadeError::NumericFault(format!(
            "{context}: non-finite value {} at index {i}",
            values[i]
        ))),
        None => Ok(()),
    }
}

pub fn checked_div(num: f64, den: f64, context: &str) -> CascadeResult<f64> {
    if den == 0.0 {
        return Err(CascadeError::NumericFault(format!(
            "{context}: division of {num} by zero"
        )));
    }
    ensure_finite(num / den, context)
}

pub fn checked_ln(x: f64, context: &str) -> CascadeResult<f64> {
    if !x.is_finite() || x <= 0.0 {
        return Err(CascadeError::NumericFault(format!(
            "{context}: logarithm of non-positive value {x}"
        )));
    }
    Ok(x.ln())
}

pub fn checked_powf(base: f64, exponent: f64, context: &str) -> CascadeResult<f64> {
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(CascadeError::NumericFault(format!(
            "{context}: negative base {base} with fractional exponent {exponent}"
        )));
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(CascadeError::NumericFault(format!(
            "{context}: zero raised to negative exponent {exponent}"
        )));
    }
    ensure_finite(base.powf(exponent), context)
}
