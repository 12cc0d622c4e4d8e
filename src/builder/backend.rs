//! BLAS backend selection.
//!
//! Exactly one backend strategy is active per build. The selection is made
//! once from the resolved options and any user-supplied linkage, in this
//! order (first match wins):
//!
//! 1. user-supplied compile/link arguments ([`BackendChoice::UserCustom`])
//! 2. forced OpenBLAS ([`BackendChoice::ForcedOpenBlas`])
//! 3. discovery ([`BackendChoice::AutoDiscovered`])
//! 4. nothing ([`BackendChoice::NoBackend`])

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::builder::discovery::BlasDiscovery;
use crate::builder::errors::ConfigureError;
use crate::core::descriptor::{Define, AVOID_BLAS_SYR, NO_FINDBLAS, USE_BLAS_SYR, USE_FINDBLAS};
use crate::core::options::ResolvedOptions;
use crate::core::platform::TargetTriple;

/// Link argument identifying OpenBLAS.
pub const OPENBLAS_LINK_ARG: &str = "-lopenblas";

/// The active backend strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendChoice {
    /// No accelerated backend is linked.
    NoBackend,
    /// A backend found by the discovery mechanism.
    AutoDiscovered { provider: String },
    /// OpenBLAS linked by name.
    ForcedOpenBlas,
    /// Compile/link arguments given by the user.
    UserCustom,
}

impl BackendChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendChoice::NoBackend => "none",
            BackendChoice::AutoDiscovered { .. } => "discovered",
            BackendChoice::ForcedOpenBlas => "openblas",
            BackendChoice::UserCustom => "custom",
        }
    }
}

impl std::fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendChoice::AutoDiscovered { provider } => write!(f, "discovered ({})", provider),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Which flavor of binding-layer source the artifacts compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingVariant {
    /// BLAS symbols come from the linked backend.
    DirectLink,
    /// BLAS symbols are borrowed from SciPy at import time.
    ScipyBlas,
}

impl BindingVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingVariant::DirectLink => "direct-link",
            BindingVariant::ScipyBlas => "scipy-blas",
        }
    }
}

/// Compile/link arguments supplied explicitly by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomBlasArgs {
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
}

impl CustomBlasArgs {
    pub fn is_empty(&self) -> bool {
        self.compile_args.is_empty() && self.link_args.is_empty()
    }
}

/// Output of backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSelection {
    pub choice: BackendChoice,
    pub binding: BindingVariant,
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<Define>,
}

/// Select the backend for this build.
///
/// `discovery` is only consulted when discovery is the winning strategy; a
/// missing mechanism or a failed probe is fatal since no fallback linkage
/// exists for that path.
pub fn select(
    options: &ResolvedOptions,
    custom: &CustomBlasArgs,
    discovery: Option<&dyn BlasDiscovery>,
    target: &TargetTriple,
) -> Result<BackendSelection, ConfigureError> {
    let selection = if !custom.is_empty() {
        BackendSelection {
            choice: BackendChoice::UserCustom,
            binding: BindingVariant::DirectLink,
            compile_args: custom.compile_args.clone(),
            link_args: custom.link_args.clone(),
            include_dirs: Vec::new(),
            defines: vec![Define::flag(NO_FINDBLAS), Define::flag(USE_BLAS_SYR)],
        }
    } else if options.force_openblas() {
        BackendSelection {
            choice: BackendChoice::ForcedOpenBlas,
            binding: BindingVariant::ScipyBlas,
            compile_args: Vec::new(),
            link_args: vec![OPENBLAS_LINK_ARG.to_string()],
            include_dirs: Vec::new(),
            defines: vec![Define::flag(NO_FINDBLAS), Define::flag(AVOID_BLAS_SYR)],
        }
    } else if options.find_blas() {
        let discovery = discovery.ok_or(ConfigureError::DiscoveryUnavailable {
            source: crate::builder::discovery::DiscoveryError::NoMechanism,
        })?;
        let linkage = discovery
            .discover(target)
            .map_err(|source| ConfigureError::DiscoveryUnavailable { source })?;

        let mut defines = vec![Define::flag(USE_FINDBLAS), Define::flag(USE_BLAS_SYR)];
        for define in linkage.defines {
            if !defines.iter().any(|d| d.name == define.name) {
                defines.push(define);
            }
        }

        BackendSelection {
            choice: BackendChoice::AutoDiscovered {
                provider: linkage.provider,
            },
            binding: BindingVariant::DirectLink,
            compile_args: linkage.compile_args,
            link_args: linkage.link_args,
            include_dirs: linkage.include_dirs,
            defines,
        }
    } else {
        BackendSelection {
            choice: BackendChoice::NoBackend,
            binding: BindingVariant::ScipyBlas,
            compile_args: Vec::new(),
            link_args: Vec::new(),
            include_dirs: Vec::new(),
            defines: vec![Define::flag(NO_FINDBLAS), Define::flag(AVOID_BLAS_SYR)],
        }
    };

    tracing::debug!("Selected BLAS backend: {}", selection.choice);
    Ok(selection)
}
