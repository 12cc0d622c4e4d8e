//! Command implementations

pub mod build;
pub mod completions;
pub mod flags;
pub mod plan;
pub mod toolchain;
