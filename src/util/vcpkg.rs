//! Vcpkg installation lookup.
//!
//! BLAS discovery can pick up a prebuilt `openblas` or `clapack` port from
//! the installed tree of one triplet (`<root>/installed/<triplet>`).

use std::path::{Path, PathBuf};

use crate::core::platform::TargetTriple;
use crate::util::config::VcpkgConfig;

/// The installed tree of one vcpkg triplet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcpkgIntegration {
    pub root: PathBuf,
    /// e.g. `x64-linux`, `arm64-osx`
    pub triplet: String,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
}

impl VcpkgIntegration {
    /// Locate the installation for `target`.
    ///
    /// The root comes from `[vcpkg] root`, then `VCPKG_ROOT`, then the
    /// directory of a `vcpkg` binary on PATH. `None` when no root exists or
    /// no triplet can be named for the target.
    pub fn from_config(config: &VcpkgConfig, target: &TargetTriple) -> Option<Self> {
        let root = config
            .root
            .clone()
            .or_else(|| std::env::var_os("VCPKG_ROOT").map(PathBuf::from))
            .or_else(root_from_path)
            .filter(|r| r.is_dir())?;

        let triplet = config
            .triplet
            .clone()
            .or_else(|| std::env::var("VCPKG_DEFAULT_TRIPLET").ok())
            .or_else(|| triplet_for(target))?;

        let tree = root.join("installed").join(&triplet);
        tracing::debug!("vcpkg tree for {}: {}", target, tree.display());

        Some(VcpkgIntegration {
            include_dirs: vec![tree.join("include")],
            lib_dirs: ["lib", "lib64"].iter().map(|d| tree.join(d)).collect(),
            root,
            triplet,
        })
    }

    /// Whether `port` has been installed for this triplet.
    pub fn is_port_installed(&self, port: &str) -> bool {
        self.root
            .join("installed")
            .join(&self.triplet)
            .join("share")
            .join(port)
            .is_dir()
    }

    /// Library file for `name`, static or import library.
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        let file_names = [
            format!("{}.lib", name),
            format!("lib{}.a", name),
            format!("lib{}.so", name),
            format!("lib{}.dylib", name),
        ];

        self.lib_dirs
            .iter()
            .flat_map(|dir| file_names.iter().map(move |f| dir.join(f)))
            .find(|p| p.is_file())
    }
}

fn root_from_path() -> Option<PathBuf> {
    let binary = which::which("vcpkg").ok()?;
    let root = binary.parent()?;
    looks_like_root(root).then(|| root.to_path_buf())
}

fn looks_like_root(dir: &Path) -> bool {
    dir.join(".vcpkg-root").exists() || dir.join("scripts").join("buildsystems").is_dir()
}

/// Community triplet name for a target, when vcpkg has one.
fn triplet_for(target: &TargetTriple) -> Option<String> {
    let arch = match target.arch.as_str() {
        "x86_64" => "x64",
        "x86" | "i686" | "i386" => "x86",
        "aarch64" => "arm64",
        _ => return None,
    };
    let os = if target.is_windows() {
        "windows"
    } else if target.is_apple() {
        "osx"
    } else if target.os == "linux" {
        "linux"
    } else {
        return None;
    };
    Some(format!("{}-{}", arch, os))
}
