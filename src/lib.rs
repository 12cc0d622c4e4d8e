//! cmfbuild - build-time configuration for the cmfrec float and double
//! extension modules.
//!
//! The library resolves build options, selects a BLAS backend, builds one
//! extension descriptor per floating-point precision, adapts their flags to
//! the compiler, and emits the native build.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Fakes and fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildPlan, ConfigureError};
pub use core::{ExtensionDescriptor, Precision, ResolvedOptions, TargetTriple};
pub use util::context::GlobalContext;
