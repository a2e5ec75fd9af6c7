//! Cascade driver: generation loop, NPZ checkpoint/restart, results loading.

pub mod checkpoint;
pub mod history;
pub mod observer;
pub mod results;
pub mod run;
