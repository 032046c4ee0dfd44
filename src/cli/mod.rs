//! Command-line interface for bitbets.

mod commands;
pub mod icons;

pub use commands::{is_verbose, run};
