//! CLI command implementations.

mod display;

pub mod clusters;
pub mod diagnose;
pub mod history;
pub mod impact;
pub mod index;
pub mod simulate;
pub mod stats;
pub mod structure;
