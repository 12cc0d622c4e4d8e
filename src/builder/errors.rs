//! Configuration error types and diagnostics.

use thiserror::Error;

use crate::builder::discovery::DiscoveryError;
use crate::core::descriptor::DescriptorError;
use crate::util::diagnostic::Diagnostic;

/// Fatal error while resolving a build plan.
///
/// These abort configuration before any compiler is invoked.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("BLAS discovery was requested but no backend could be discovered")]
    DiscoveryUnavailable {
        #[source]
        source: DiscoveryError,
    },

    #[error("could not locate the NumPy headers")]
    ArrayHeadersNotFound { python: String, reason: String },

    #[error("descriptor `{artifact}` is inconsistent")]
    InvalidDescriptor {
        artifact: String,
        #[source]
        source: DescriptorError,
    },
}

impl ConfigureError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigureError::DiscoveryUnavailable { source } => {
                Diagnostic::error(self.to_string())
                    .with_context(source.to_string())
                    .with_suggestion("Install OpenBLAS or MKL so that pkg-config can find it")
                    .with_suggestion("Pass explicit linkage, e.g. `--blas-link-arg=-lmkl_rt`")
                    .with_suggestion("Drop the `findblas` token and unset `USE_FINDBLAS`")
            }

            ConfigureError::ArrayHeadersNotFound { python, reason } => {
                Diagnostic::error(self.to_string())
                    .with_context(format!(
                        "`{}` could not report numpy.get_include(): {}",
                        python, reason
                    ))
                    .with_suggestion("Install NumPy for the Python interpreter used by the build")
                    .with_suggestion("Pass the header directory with `--array-include <dir>`")
                    .with_suggestion("Set `paths.array_include` in `.cmfbuild/config.toml`")
            }

            ConfigureError::InvalidDescriptor { artifact, source } => {
                Diagnostic::error(format!("descriptor `{}` is inconsistent", artifact))
                    .with_context(source.to_string())
                    .with_suggestion("Remove conflicting `-D` macros from custom BLAS arguments")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_diagnostic_lists_cause_and_fixes() {
        let err = ConfigureError::DiscoveryUnavailable {
            source: DiscoveryError::NotFound {
                mechanism: "pkg-config".to_string(),
                tried: vec!["openblas".to_string(), "blas".to_string()],
            },
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("error: BLAS discovery was requested"));
        assert!(output.contains("pkg-config: none of [openblas, blas] found"));
        assert!(output.contains("1. Install OpenBLAS"));
    }

    #[test]
    fn test_headers_diagnostic_mentions_interpreter() {
        let err = ConfigureError::ArrayHeadersNotFound {
            python: "python3".to_string(),
            reason: "No module named 'numpy'".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("`python3` could not report"));
        assert!(output.contains("--array-include"));
    }
}
