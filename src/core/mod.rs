//! Core data model: build options, target platforms, and artifact descriptors.

pub mod descriptor;
pub mod options;
pub mod platform;

pub use descriptor::{Define, ExtensionDescriptor, Precision};
pub use options::{Environment, OptionKind, OptionResolver, ResolvedOptions};
pub use platform::TargetTriple;
