//! Build option resolution.
//!
//! Options come from two sources: raw tokens passed on the command line
//! (`findblas`, `enable-omp`, `openblas`) and environment variables
//! (`USE_FINDBLAS`, `ENABLE_OMP`, `USE_OPENBLAS`). Either source being set
//! turns an option on. Recognized tokens are consumed; everything else is
//! handed back untouched for the toolchain driver.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::platform::TargetTriple;

/// Snapshot of environment variables, keyed by name.
pub type Environment = BTreeMap<String, String>;

/// Capture the current process environment.
///
/// Values that are not valid UTF-8 are kept lossily; only presence matters.
pub fn environment_from_process() -> Environment {
    std::env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

/// The options understood by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKind {
    /// Ask the discovery mechanism for an accelerated BLAS backend.
    FindBlas,
    /// Force-enable OpenMP parallelism.
    EnableOmp,
    /// Force linkage against OpenBLAS.
    OpenBlas,
}

impl OptionKind {
    /// All known options, in resolution order.
    pub const ALL: [OptionKind; 3] = [
        OptionKind::FindBlas,
        OptionKind::EnableOmp,
        OptionKind::OpenBlas,
    ];

    /// Canonical option name.
    pub fn name(&self) -> &'static str {
        match self {
            OptionKind::FindBlas => "findblas",
            OptionKind::EnableOmp => "enable-omp",
            OptionKind::OpenBlas => "openblas",
        }
    }

    /// Accepted token spellings. Matching is exact and case-sensitive.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            OptionKind::FindBlas => &["findblas", "-findblas", "--findblas"],
            OptionKind::EnableOmp => &["enable-omp", "-enable-omp", "--enable-omp"],
            OptionKind::OpenBlas => &["openblas", "-openblas", "--openblas"],
        }
    }

    /// Environment variable mirroring the token.
    pub fn env_var(&self) -> &'static str {
        match self {
            OptionKind::FindBlas => "USE_FINDBLAS",
            OptionKind::EnableOmp => "ENABLE_OMP",
            OptionKind::OpenBlas => "USE_OPENBLAS",
        }
    }

    /// Whether `token` is one of this option's spellings.
    pub fn matches(&self, token: &str) -> bool {
        self.spellings().contains(&token)
    }
}

/// Which source turned an option on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionSource {
    /// Not set by any source.
    #[default]
    Unset,
    /// A recognized token was present.
    Token,
    /// The environment variable was present.
    Environment,
    /// Both the token and the environment variable were present.
    Both,
}

/// A resolved toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOption {
    /// Which option this is
    pub kind: OptionKind,
    /// Where the value came from
    pub source: OptionSource,
}

impl BuildOption {
    /// Resolved boolean value.
    pub fn value(&self) -> bool {
        self.source != OptionSource::Unset
    }
}

/// Output of the option resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    /// One entry per known option, in `OptionKind::ALL` order
    pub options: Vec<BuildOption>,
    /// Final parallelism decision (platform default or explicit enable)
    pub parallel: bool,
    /// Tokens not recognized by the resolver, in their original order
    pub remaining: Vec<String>,
}

impl ResolvedOptions {
    /// Resolved value of one option.
    pub fn get(&self, kind: OptionKind) -> bool {
        self.options
            .iter()
            .find(|o| o.kind == kind)
            .map(BuildOption::value)
            .unwrap_or(false)
    }

    /// Whether backend discovery was requested.
    pub fn find_blas(&self) -> bool {
        self.get(OptionKind::FindBlas)
    }

    /// Whether OpenMP was explicitly requested.
    pub fn omp_requested(&self) -> bool {
        self.get(OptionKind::EnableOmp)
    }

    /// Whether OpenBLAS linkage was forced.
    pub fn force_openblas(&self) -> bool {
        self.get(OptionKind::OpenBlas)
    }

    /// Option name to resolved value.
    pub fn to_map(&self) -> BTreeMap<&'static str, bool> {
        self.options
            .iter()
            .map(|o| (o.kind.name(), o.value()))
            .collect()
    }
}

/// Resolves raw tokens and environment variables into build options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionResolver;

impl OptionResolver {
    /// Resolve options for `target`.
    ///
    /// Never fails: unknown tokens are passed through in `remaining`.
    pub fn resolve(
        &self,
        tokens: &[String],
        env: &Environment,
        target: &TargetTriple,
    ) -> ResolvedOptions {
        let options: Vec<BuildOption> = OptionKind::ALL
            .iter()
            .map(|&kind| {
                let from_token = tokens.iter().any(|t| kind.matches(t));
                let from_env = env.contains_key(kind.env_var());
                let source = match (from_token, from_env) {
                    (true, true) => OptionSource::Both,
                    (true, false) => OptionSource::Token,
                    (false, true) => OptionSource::Environment,
                    (false, false) => OptionSource::Unset,
                };
                BuildOption { kind, source }
            })
            .collect();

        let remaining: Vec<String> = tokens
            .iter()
            .filter(|t| !OptionKind::ALL.iter().any(|k| k.matches(t)))
            .cloned()
            .collect();

        let omp_requested = options
            .iter()
            .any(|o| o.kind == OptionKind::EnableOmp && o.value());
        let parallel = omp_requested || !target.is_parallelism_limited();

        for option in options.iter().filter(|o| o.value()) {
            tracing::debug!("option `{}` enabled via {:?}", option.kind.name(), option.source);
        }

        ResolvedOptions {
            options,
            parallel,
            remaining,
        }
    }
}
