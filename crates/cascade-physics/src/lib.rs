//! Cascade physics: seed photon field, inverse Compton redistribution,
//! pair production and the generation-update kernel.

pub mod compton;
pub mod initial;
pub mod kernel;
pub mod seed;
