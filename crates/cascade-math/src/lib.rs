//! Mathematical primitives for the pair cascade engine.

pub mod deposit;
pub mod numeric;
pub mod quadrature;
