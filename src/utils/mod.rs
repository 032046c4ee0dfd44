//! Shared utility functions.
//!
//! - `format`: human-readable sizes and GB rounding
//! - `system`: disk and memory figures for the diagnostics endpoints

mod format;
mod system;

pub use format::{format_size, round_gb};
pub use system::{disk_usage, resident_memory_bytes, DiskUsage};
