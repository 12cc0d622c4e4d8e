//! Global context for build operations.
//!
//! Provides centralized access to the project root, configuration and output
//! settings.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{self, Config};

/// Default output directory, relative to the project root.
pub const DEFAULT_OUT_DIR: &str = "build";

/// Global context for one invocation.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Project root
    cwd: PathBuf,

    /// Merged configuration
    config: Config,

    /// Verbose output
    verbose: bool,

    /// Colored output
    color: bool,
}

impl GlobalContext {
    /// Create a context rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context rooted at `cwd`, loading its configuration.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let global_path = config::global_config_path().unwrap_or_default();
        let config = config::load_config(&global_path, &config::project_config_path(&cwd));

        GlobalContext {
            cwd,
            config,
            verbose: false,
            color: std::io::stderr().is_terminal(),
        }
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Project root.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory build outputs are written to.
    pub fn out_dir(&self) -> PathBuf {
        let out = self
            .config
            .build
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        self.cwd.join(out)
    }

    /// Resolve a path from configuration or the command line against the root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }
}
