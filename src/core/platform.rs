//! Target platform identification.
//!
//! The only platform-dependent decision the engine makes is the parallelism
//! default, plus a handful of naming conventions (module suffix, PIC).

use serde::Serialize;

/// Target triple components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetTriple {
    /// CPU architecture (x86_64, aarch64, etc.)
    pub arch: String,
    /// Vendor (unknown, apple, pc, etc.)
    pub vendor: String,
    /// Operating system (linux, darwin, windows, etc.)
    pub os: String,
    /// Environment/ABI (gnu, musl, msvc, etc.)
    pub env: Option<String>,
}

impl TargetTriple {
    /// Create a new target triple.
    pub fn new(arch: &str, vendor: &str, os: &str, env: Option<&str>) -> Self {
        TargetTriple {
            arch: arch.to_string(),
            vendor: vendor.to_string(),
            os: os.to_string(),
            env: env.map(|s| s.to_string()),
        }
    }

    /// Detect the host target triple.
    pub fn host() -> Self {
        let arch = std::env::consts::ARCH;
        let os = std::env::consts::OS;

        let (vendor, os, env) = match os {
            "linux" => ("unknown", "linux", Some("gnu")),
            "macos" => ("apple", "darwin", None),
            "windows" => ("pc", "windows", Some("msvc")),
            other => ("unknown", other, None),
        };

        TargetTriple::new(arch, vendor, os, env)
    }

    /// Parse a target triple string.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        Some(TargetTriple {
            arch: parts[0].to_string(),
            vendor: parts[1].to_string(),
            os: parts[2].to_string(),
            env: parts.get(3).map(|s| s.to_string()),
        })
    }

    /// Whether this target is an Apple platform.
    pub fn is_apple(&self) -> bool {
        self.vendor == "apple" || matches!(self.os.as_str(), "darwin" | "macos" | "macosx")
    }

    /// Whether this target is Windows.
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Whether the platform's default compiler ships without OpenMP support.
    ///
    /// Apple aliases `gcc` to its own clang build, which rejects `-fopenmp`.
    pub fn is_parallelism_limited(&self) -> bool {
        self.is_apple()
    }

    /// File suffix of a compiled extension module for this target.
    pub fn extension_suffix(&self) -> &'static str {
        if self.is_windows() {
            "pyd"
        } else {
            "so"
        }
    }
}

impl std::fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.env {
            Some(env) => write!(f, "{}-{}-{}-{}", self.arch, self.vendor, self.os, env),
            None => write!(f, "{}-{}-{}", self.arch, self.vendor, self.os),
        }
    }
}

impl std::str::FromStr for TargetTriple {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetTriple::parse(s).ok_or_else(|| {
            format!(
                "invalid target triple '{}'; expected <arch>-<vendor>-<os>[-<env>]",
                s
            )
        })
    }
}
