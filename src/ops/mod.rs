//! High-level operations.
//!
//! This module contains the implementation of cmfbuild commands.

pub mod build;
pub mod configure;

pub use build::{build, select_toolchain, BuildOptions};
pub use configure::{configure, configure_with, resolve_headers, ConfigureOptions};
