//! Test utilities and fakes for unit tests.
//!
//! Provides stand-ins for the collaborators the decision engine talks to
//! (BLAS discovery, compiler toolchains) and helpers for common inputs.
//!
//! # Example
//!
//! ```rust,ignore
//! use cmfbuild::test_support::{linux, plan_inputs, FakeDiscovery};
//!
//! #[test]
//! fn test_example() {
//!     let discovery = FakeDiscovery::found("mkl", &["-lmkl_rt"]);
//!     let mut inputs = plan_inputs(&["findblas"], linux(), ToolchainPlatform::Gcc);
//!     inputs.discovery = Some(&discovery);
//!     // ...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::builder::backend::CustomBlasArgs;
use crate::builder::discovery::{BlasDiscovery, BlasLinkage, DiscoveryError};
use crate::builder::extension::{ExtensionLayout, HeaderPaths};
use crate::builder::plan::PlanInputs;
use crate::builder::toolchain::{CommandSpec, CompileInput, LinkInput, Toolchain, ToolchainPlatform};
use crate::core::options::Environment;
use crate::core::platform::TargetTriple;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Discovery mechanism with a scripted answer that counts its calls.
#[derive(Debug)]
pub struct FakeDiscovery {
    linkage: Option<BlasLinkage>,
    calls: AtomicUsize,
}

impl FakeDiscovery {
    /// Always fails with `NotFound`.
    pub fn unavailable() -> Self {
        FakeDiscovery {
            linkage: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always finds `provider` with the given link arguments.
    pub fn found(provider: &str, link_args: &[&str]) -> Self {
        let mut linkage = BlasLinkage::for_provider(provider);
        linkage.link_args = link_args.iter().map(|s| s.to_string()).collect();
        FakeDiscovery {
            linkage: Some(linkage),
            calls: AtomicUsize::new(0),
        }
    }

    /// How often `discover` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BlasDiscovery for FakeDiscovery {
    fn name(&self) -> &str {
        "fake"
    }

    fn discover(&self, _target: &TargetTriple) -> Result<BlasLinkage, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.linkage.clone().ok_or_else(|| DiscoveryError::NotFound {
            mechanism: "fake".to_string(),
            tried: vec!["openblas".to_string()],
        })
    }
}

/// Toolchain whose commands run fixed programs instead of a compiler.
///
/// Each command is `<program> <output>`, so `true`/`false` can stand in for a
/// succeeding or failing compiler.
#[derive(Debug, Clone)]
pub struct FakeToolchain {
    pub compile_program: PathBuf,
    pub link_program: PathBuf,
}

impl FakeToolchain {
    pub fn new(compile_program: impl Into<PathBuf>, link_program: impl Into<PathBuf>) -> Self {
        FakeToolchain {
            compile_program: compile_program.into(),
            link_program: link_program.into(),
        }
    }
}

impl Toolchain for FakeToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Gcc
    }

    fn compiler_path(&self) -> &Path {
        &self.compile_program
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        CommandSpec::new(&self.compile_program).arg(input.output.display().to_string())
    }

    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec {
        CommandSpec::new(&self.link_program).arg(input.output.display().to_string())
    }

    fn object_extension(&self) -> &str {
        "o"
    }
}

pub fn linux() -> TargetTriple {
    TargetTriple::new("x86_64", "unknown", "linux", Some("gnu"))
}

pub fn darwin() -> TargetTriple {
    TargetTriple::new("aarch64", "apple", "darwin", None)
}

pub fn windows() -> TargetTriple {
    TargetTriple::new("x86_64", "pc", "windows", Some("msvc"))
}

/// Plan inputs with an empty environment, no discovery and default layout.
pub fn plan_inputs<'a>(
    tokens: &[&str],
    target: TargetTriple,
    compiler: ToolchainPlatform,
) -> PlanInputs<'a> {
    PlanInputs {
        tokens: tokens.iter().map(|s| s.to_string()).collect(),
        env: Environment::new(),
        target,
        compiler,
        custom: CustomBlasArgs::default(),
        discovery: None,
        layout: ExtensionLayout::default(),
        headers: HeaderPaths {
            array_include: PathBuf::from("/np/include"),
            python_include: None,
        },
    }
}
