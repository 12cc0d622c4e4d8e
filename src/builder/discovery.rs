//! BLAS backend discovery.
//!
//! Discovery locates an installed accelerated BLAS/LAPACK library and reports
//! the compile and link arguments needed to use it. Mechanisms are tried in
//! order; the first one that finds a library wins.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::descriptor::Define;
use crate::core::platform::TargetTriple;
use crate::util::vcpkg::VcpkgIntegration;

/// pkg-config modules probed by default, most preferred first.
pub const DEFAULT_PKG_CONFIG_CANDIDATES: &[&str] =
    &["mkl-sdl", "openblas", "blis", "cblas", "blas"];

/// vcpkg ports probed by default.
pub const DEFAULT_VCPKG_CANDIDATES: &[&str] = &["openblas", "clapack"];

/// Linkage information reported by a discovery mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlasLinkage {
    /// Provider name (pkg-config module, vcpkg port, framework)
    pub provider: String,
    /// Extra compile arguments
    pub compile_args: Vec<String>,
    /// Extra link arguments
    pub link_args: Vec<String>,
    /// Header directories
    pub include_dirs: Vec<PathBuf>,
    /// Macros the provider requires
    pub defines: Vec<Define>,
}

impl BlasLinkage {
    /// Empty linkage for `provider`, carrying its `HAS_<PROVIDER>` macro.
    pub fn for_provider(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        let defines = vec![Define::flag(provider_macro(&provider))];
        BlasLinkage {
            provider,
            defines,
            ..Default::default()
        }
    }
}

/// `mkl-sdl` -> `HAS_MKL_SDL`.
fn provider_macro(provider: &str) -> String {
    let sanitized: String = provider
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("HAS_{}", sanitized)
}

/// Discovery failure.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{mechanism}: none of [{}] found", .tried.join(", "))]
    NotFound {
        mechanism: String,
        tried: Vec<String>,
    },

    #[error("{mechanism}: not applicable to target `{target}`")]
    NotApplicable { mechanism: String, target: String },

    #[error("no discovery mechanism is configured")]
    NoMechanism,

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    AllFailed(Vec<DiscoveryError>),
}

/// A mechanism that can locate a BLAS backend.
pub trait BlasDiscovery: Send + Sync {
    /// Mechanism name for diagnostics.
    fn name(&self) -> &str;

    /// Find a backend usable for `target`.
    fn discover(&self, target: &TargetTriple) -> Result<BlasLinkage, DiscoveryError>;
}

/// Identifier of a built-in discovery mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MechanismId {
    PkgConfig,
    Vcpkg,
    Accelerate,
}

impl MechanismId {
    /// Default mechanism order.
    pub const DEFAULT: [MechanismId; 3] = [
        MechanismId::Accelerate,
        MechanismId::PkgConfig,
        MechanismId::Vcpkg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MechanismId::PkgConfig => "pkg-config",
            MechanismId::Vcpkg => "vcpkg",
            MechanismId::Accelerate => "accelerate",
        }
    }
}

impl FromStr for MechanismId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pkg-config" | "pkgconfig" => Ok(MechanismId::PkgConfig),
            "vcpkg" => Ok(MechanismId::Vcpkg),
            "accelerate" => Ok(MechanismId::Accelerate),
            _ => Err(format!(
                "unknown discovery mechanism '{}'; expected 'pkg-config', 'vcpkg', or 'accelerate'",
                s
            )),
        }
    }
}

/// Probes pkg-config modules.
#[derive(Debug, Clone)]
pub struct PkgConfigDiscovery {
    candidates: Vec<String>,
}

impl PkgConfigDiscovery {
    pub fn new(candidates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PkgConfigDiscovery {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for PkgConfigDiscovery {
    fn default() -> Self {
        PkgConfigDiscovery::new(DEFAULT_PKG_CONFIG_CANDIDATES.iter().copied())
    }
}

impl BlasDiscovery for PkgConfigDiscovery {
    fn name(&self) -> &str {
        MechanismId::PkgConfig.as_str()
    }

    fn discover(&self, _target: &TargetTriple) -> Result<BlasLinkage, DiscoveryError> {
        for candidate in &self.candidates {
            let probed = pkg_config::Config::new()
                .cargo_metadata(false)
                .env_metadata(false)
                .probe(candidate);

            let lib = match probed {
                Ok(lib) => lib,
                Err(e) => {
                    tracing::debug!("pkg-config: `{}` not usable: {}", candidate, e);
                    continue;
                }
            };

            let mut linkage = BlasLinkage::for_provider(candidate.as_str());
            linkage.include_dirs = lib.include_paths.clone();
            linkage
                .link_args
                .extend(lib.link_paths.iter().map(|p| format!("-L{}", p.display())));
            linkage
                .link_args
                .extend(lib.libs.iter().map(|l| format!("-l{}", l)));
            for framework in &lib.frameworks {
                linkage.link_args.push("-framework".to_string());
                linkage.link_args.push(framework.clone());
            }

            let mut defines: Vec<_> = lib.defines.iter().collect();
            defines.sort();
            for (name, value) in defines {
                linkage.defines.push(match value {
                    Some(v) => Define::with_value(name, v),
                    None => Define::flag(name),
                });
            }

            return Ok(linkage);
        }

        Err(DiscoveryError::NotFound {
            mechanism: self.name().to_string(),
            tried: self.candidates.clone(),
        })
    }
}

/// Looks for prebuilt ports in a vcpkg installation.
#[derive(Debug, Clone)]
pub struct VcpkgDiscovery {
    integration: Option<VcpkgIntegration>,
    candidates: Vec<String>,
}

impl VcpkgDiscovery {
    pub fn new(integration: Option<VcpkgIntegration>) -> Self {
        VcpkgDiscovery {
            integration,
            candidates: DEFAULT_VCPKG_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BlasDiscovery for VcpkgDiscovery {
    fn name(&self) -> &str {
        MechanismId::Vcpkg.as_str()
    }

    fn discover(&self, _target: &TargetTriple) -> Result<BlasLinkage, DiscoveryError> {
        let not_found = || DiscoveryError::NotFound {
            mechanism: self.name().to_string(),
            tried: self.candidates.clone(),
        };

        let Some(vcpkg) = &self.integration else {
            return Err(not_found());
        };

        for port in &self.candidates {
            if !vcpkg.is_port_installed(port) {
                continue;
            }
            let Some(lib) = vcpkg.find_library(port) else {
                tracing::debug!("vcpkg: port `{}` installed but no library file found", port);
                continue;
            };

            let mut linkage = BlasLinkage::for_provider(port.as_str());
            linkage.include_dirs = vcpkg.include_dirs.clone();
            linkage.link_args.push(lib.display().to_string());
            return Ok(linkage);
        }

        Err(not_found())
    }
}

/// Apple's Accelerate framework, present on every Apple target.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelerateDiscovery;

impl BlasDiscovery for AccelerateDiscovery {
    fn name(&self) -> &str {
        MechanismId::Accelerate.as_str()
    }

    fn discover(&self, target: &TargetTriple) -> Result<BlasLinkage, DiscoveryError> {
        if !target.is_apple() {
            return Err(DiscoveryError::NotApplicable {
                mechanism: self.name().to_string(),
                target: target.to_string(),
            });
        }

        let mut linkage = BlasLinkage::for_provider("accelerate");
        linkage.link_args = vec!["-framework".to_string(), "Accelerate".to_string()];
        Ok(linkage)
    }
}

/// Tries several mechanisms in order.
pub struct ChainedDiscovery {
    mechanisms: Vec<Box<dyn BlasDiscovery>>,
}

impl ChainedDiscovery {
    pub fn new(mechanisms: Vec<Box<dyn BlasDiscovery>>) -> Self {
        ChainedDiscovery { mechanisms }
    }

    /// Build a chain from mechanism identifiers.
    pub fn from_ids(ids: &[MechanismId], vcpkg: Option<VcpkgIntegration>) -> Self {
        let mechanisms = ids
            .iter()
            .map(|id| -> Box<dyn BlasDiscovery> {
                match id {
                    MechanismId::PkgConfig => Box::new(PkgConfigDiscovery::default()),
                    MechanismId::Vcpkg => Box::new(VcpkgDiscovery::new(vcpkg.clone())),
                    MechanismId::Accelerate => Box::new(AccelerateDiscovery),
                }
            })
            .collect();
        ChainedDiscovery { mechanisms }
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }
}

impl BlasDiscovery for ChainedDiscovery {
    fn name(&self) -> &str {
        "chained"
    }

    fn discover(&self, target: &TargetTriple) -> Result<BlasLinkage, DiscoveryError> {
        if self.mechanisms.is_empty() {
            return Err(DiscoveryError::NoMechanism);
        }

        let mut failures = Vec::new();
        for mechanism in &self.mechanisms {
            match mechanism.discover(target) {
                Ok(linkage) => {
                    tracing::info!(
                        "Found BLAS `{}` via {}",
                        linkage.provider,
                        mechanism.name()
                    );
                    return Ok(linkage);
                }
                Err(e) => {
                    tracing::debug!("{}", e);
                    failures.push(e);
                }
            }
        }

        Err(DiscoveryError::AllFailed(failures))
    }
}
