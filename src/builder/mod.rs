//! Extension configuration and native build.
//!
//! Configuration runs backend selection, descriptor construction and flag
//! adaptation into a [`BuildPlan`]. Emission hands the plan's descriptors to
//! a native [`Toolchain`].

pub mod adapter;
pub mod backend;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod executor;
pub mod extension;
pub mod native;
pub mod plan;
pub mod toolchain;

pub use backend::{BackendChoice, BackendSelection, BindingVariant, CustomBlasArgs};
pub use discovery::{BlasDiscovery, BlasLinkage, ChainedDiscovery, MechanismId};
pub use errors::ConfigureError;
pub use events::BuildEvent;
pub use executor::{BuildExecutor, BuildReport, MessageFormat};
pub use extension::{ExtensionLayout, HeaderPaths};
pub use native::{ArtifactOutcome, NativeBuilder};
pub use plan::{BuildPlan, PlanInputs};
pub use toolchain::{
    detect_toolchain, toolchain_for, CommandSpec, CompilerFamily, CompilerProfile, GccToolchain,
    MsvcToolchain, Toolchain, ToolchainPlatform,
};
