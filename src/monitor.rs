//! Feed monitoring covering the tip window, the poll cycle (fetch, delta,
//! repair), and the error taxonomy surfaced to schedulers.

pub mod cycle;
pub mod error;
pub mod tip;
