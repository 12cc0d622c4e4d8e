//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.cmfbuild/config.toml` - User-wide defaults
//! - Project: `.cmfbuild/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::backend::CustomBlasArgs;
use crate::builder::discovery::MechanismId;
use crate::builder::extension::ExtensionLayout;

/// Merged configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// BLAS backend settings
    pub blas: BlasConfig,

    /// Header and interpreter locations
    pub paths: PathsConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Compiler override
    pub toolchain: ToolchainSettings,

    /// vcpkg installation used by discovery
    pub vcpkg: VcpkgConfig,

    /// Source layout, when it differs from the default
    pub layout: Option<ExtensionLayout>,
}

/// `[blas]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlasConfig {
    /// Custom backend compile arguments
    pub compile_args: Vec<String>,

    /// Custom backend link arguments
    pub link_args: Vec<String>,

    /// Discovery mechanisms, in the order they are tried
    pub discovery: Option<Vec<MechanismId>>,
}

impl BlasConfig {
    pub fn custom_args(&self) -> CustomBlasArgs {
        CustomBlasArgs {
            compile_args: self.compile_args.clone(),
            link_args: self.link_args.clone(),
        }
    }

    /// Configured mechanisms, or the default chain.
    pub fn discovery_order(&self) -> Vec<MechanismId> {
        self.discovery
            .clone()
            .unwrap_or_else(|| MechanismId::DEFAULT.to_vec())
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// NumPy header directory
    pub array_include: Option<PathBuf>,

    /// Python header directory
    pub python_include: Option<PathBuf>,

    /// Interpreter used to probe header locations
    pub python: Option<String>,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default number of parallel jobs (None = auto-detect)
    pub jobs: Option<usize>,

    /// Output directory, relative to the project root
    pub out_dir: Option<PathBuf>,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C compiler (e.g., /usr/bin/clang)
    pub cc: Option<PathBuf>,
}

/// `[vcpkg]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VcpkgConfig {
    /// vcpkg root directory
    pub root: Option<PathBuf>,

    /// Triplet (e.g., x64-windows)
    pub triplet: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Lists are replaced, not concatenated.
    pub fn merge(&mut self, other: Config) {
        if !other.blas.compile_args.is_empty() {
            self.blas.compile_args = other.blas.compile_args;
        }
        if !other.blas.link_args.is_empty() {
            self.blas.link_args = other.blas.link_args;
        }
        if other.blas.discovery.is_some() {
            self.blas.discovery = other.blas.discovery;
        }

        if other.paths.array_include.is_some() {
            self.paths.array_include = other.paths.array_include;
        }
        if other.paths.python_include.is_some() {
            self.paths.python_include = other.paths.python_include;
        }
        if other.paths.python.is_some() {
            self.paths.python = other.paths.python;
        }

        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.out_dir.is_some() {
            self.build.out_dir = other.build.out_dir;
        }

        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }

        if other.vcpkg.root.is_some() {
            self.vcpkg.root = other.vcpkg.root;
        }
        if other.vcpkg.triplet.is_some() {
            self.vcpkg.triplet = other.vcpkg.triplet;
        }

        if other.layout.is_some() {
            self.layout = other.layout;
        }
    }

    /// Source layout in effect.
    pub fn layout(&self) -> ExtensionLayout {
        self.layout.clone().unwrap_or_default()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.cmfbuild/config.toml)
/// 2. Global config (~/.cmfbuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.cmfbuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cmfbuild"))
}

/// Get the global config path (~/.cmfbuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.cmfbuild/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".cmfbuild").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.blas.compile_args.is_empty());
        assert!(config.paths.array_include.is_none());
        assert_eq!(config.blas.discovery_order(), MechanismId::DEFAULT.to_vec());
        assert_eq!(config.layout(), ExtensionLayout::default());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[blas]
link_args = ["-L/opt/mkl/lib", "-lmkl_rt"]
discovery = ["pkg-config"]

[paths]
array_include = "/np/include"
python = "python3.12"

[build]
jobs = 8

[toolchain]
cc = "/usr/bin/clang"

[vcpkg]
triplet = "x64-linux"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.blas.link_args, vec!["-L/opt/mkl/lib", "-lmkl_rt"]);
        assert_eq!(config.blas.discovery_order(), vec![MechanismId::PkgConfig]);
        assert_eq!(config.paths.array_include, Some(PathBuf::from("/np/include")));
        assert_eq!(config.paths.python.as_deref(), Some("python3.12"));
        assert_eq!(config.build.jobs, Some(8));
        assert_eq!(config.toolchain.cc, Some(PathBuf::from("/usr/bin/clang")));
        assert_eq!(config.vcpkg.triplet.as_deref(), Some("x64-linux"));
        assert!(!config.blas.custom_args().is_empty());
    }

    #[test]
    fn test_config_layout_section() {
        let config: Config = toml::from_str(
            r#"
[layout]
package = "recsys"
native_sources = ["all.c"]
"#,
        )
        .unwrap();

        let layout = config.layout();
        assert_eq!(layout.package, "recsys");
        assert_eq!(layout.native_sources, vec!["all.c"]);
        assert_eq!(layout.source_dir, PathBuf::from("src"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.jobs = Some(4);
        base.blas.link_args = vec!["-lblas".to_string()];
        base.paths.python = Some("python3".to_string());

        let mut project = Config::default();
        project.blas.link_args = vec!["-lmkl_rt".to_string()];
        project.blas.discovery = Some(vec![]);

        base.merge(project);

        assert_eq!(base.blas.link_args, vec!["-lmkl_rt"]);
        assert!(base.blas.discovery_order().is_empty());
        assert_eq!(base.build.jobs, Some(4)); // Not overridden
        assert_eq!(base.paths.python.as_deref(), Some("python3"));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[toolchain]
cc = "/usr/bin/gcc"

[build]
jobs = 2
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[toolchain]
cc = "/usr/bin/clang"
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);
        assert_eq!(config.toolchain.cc, Some(PathBuf::from("/usr/bin/clang")));
        assert_eq!(config.build.jobs, Some(2));
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[blas\nlink_args = 3").unwrap();

        assert!(Config::load(&path).is_err());
        let config = Config::load_or_default(&path);
        assert!(config.blas.link_args.is_empty());
    }
}
