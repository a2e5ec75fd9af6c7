// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Gauss-Legendre Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! n-point Gauss-Legendre rule on [-1, 1], mapped to arbitrary intervals.
//!
//! Nodes are the roots of P_n found by Newton iteration from the
//! Tricomi initial guess; weights are 2 / ((1 - x²) P_n'(x)²).

use cascade_types::error::{CascadeError, CascadeResult};
use std::f64::consts::PI;

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAX_ITER: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    pub fn new(n: usize) -> CascadeResult<Self> {
        if n == 0 {
            return Err(CascadeError::InvalidRange(
                "Gauss-Legendre rule needs at least one node".to_string(),
            ));
        }

        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        let nf = n as f64;

        for i in 0..n.div_ceil(2) {
            let mut z = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
            for _ in 0..NEWTON_MAX_ITER {
                let (p, dp) = legendre_with_derivative(n, z);
                let z_prev = z;
                z = z_prev - p / dp;
                if (z - z_prev).abs() < NEWTON_TOL {
                    break;
                }
            }
            let (_, dp) = legendre_with_derivative(n, z);
            let w = 2.0 / ((1.0 - z * z) * dp * dp);
            if !z.is_finite() || !w.is_finite() {
                return Err(CascadeError::NumericFault(format!(
                    "Gauss-Legendre node {i} of {n} failed to converge"
                )));
            }
            nodes[i] = -z;
            nodes[n - 1 - i] = z;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }

        Ok(GaussLegendre { nodes, weights })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes on [-1, 1], ascending.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// ∫_a^b f(x) dx.
    pub fn integrate<F>(&self, a: f64, b: f64, mut f: F) -> CascadeResult<f64>
    where
        F: FnMut(f64) -> CascadeResult<f64>,
    {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (b + a);
        let mut sum = 0.0;
        for (x, w) in self.nodes.iter().zip(self.weights.iter()) {
            sum += w * f(mid + half * x)?;
        }
        let total = half * sum;
        if !total.is_finite() {
            return Err(CascadeError::NumericFault(format!(
                "quadrature over [{a}, {b}] produced {total}"
            )));
        }
        Ok(total)
    }

    /// ∫_lo^hi f(x) d(ln x), for 0 < lo <= hi. `f` receives `x`, not `ln x`.
    pub fn integrate_log<F>(&self, lo: f64, hi: f64, mut f: F) -> CascadeResult<f64>
    where
        F: FnMut(f64) -> CascadeResult<f64>,
    {
        if !(lo > 0.0 && hi >= lo && hi.is_finite()) {
            return Err(CascadeError::NumericFault(format!(
                "log-space quadrature needs 0 < lo <= hi, got [{lo}, {hi}]"
            )));
        }
        self.integrate(lo.ln(), hi.ln(), |u| f(u.exp()))
    }
}

/// P_n(z) and P_n'(z) by the three-term recurrence.
fn legendre_with_derivative(n: usize, z: f64) -> (f64, f64) {
    let mut p1 = 1.0;
    let mut p2 = 0.0;
    for j in 0..n {
        let p3 = p2;
        p2 = p1;
        p1 = ((2 * j + 1) as f64 * z * p2 - j as f64 * p3) / (j + 1) as f64;
    }
    let dp = n as f64 * (z * p1 - p2) / (z * z - 1.0);
    (p1, dp)
}
