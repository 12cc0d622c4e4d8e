//! Compiler toolchains and compiler profiles.
//!
//! A [`CompilerProfile`] is the compiler-dependent part of the decision
//! engine: the optimization flags and the parallelism flag pair that the
//! flag adapter folds into every descriptor. A [`Toolchain`] turns finished
//! descriptors into concrete compile and link commands.
//!
//! Toolchain detection priority:
//! 1. `[toolchain] cc` in `.cmfbuild/config.toml` or `~/.cmfbuild/config.toml`
//! 2. The `CC` environment variable
//! 3. Searching PATH for common compilers

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::core::descriptor::Define;

mod detect;
mod gcc;
mod msvc;

pub use detect::{detect_compiler_family, detect_toolchain, toolchain_for};
pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;

/// A command to execute, with program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }
}

/// Input for compiling one translation unit.
#[derive(Debug, Clone)]
pub struct CompileInput {
    /// Source file to compile
    pub source: PathBuf,
    /// Output object file
    pub output: PathBuf,
    /// Include directories
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor macros
    pub defines: Vec<Define>,
    /// Additional compiler arguments, passed verbatim
    pub cflags: Vec<String>,
    /// Emit position-independent code
    pub pic: bool,
}

/// Input for linking an extension module.
#[derive(Debug, Clone)]
pub struct LinkInput {
    /// Object files to link
    pub objects: Vec<PathBuf>,
    /// Output shared module
    pub output: PathBuf,
    /// Additional linker arguments, passed verbatim
    pub ldflags: Vec<String>,
    /// Symbol to export from the module (the module init function)
    pub export: Option<String>,
}

/// The compiler a build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolchainPlatform {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
}

impl ToolchainPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::AppleClang => "apple-clang",
            ToolchainPlatform::Msvc => "msvc",
        }
    }

    /// Flag-syntax family of this compiler.
    pub fn family(&self) -> CompilerFamily {
        match self {
            ToolchainPlatform::Msvc => CompilerFamily::MsvcLike,
            _ => CompilerFamily::PosixLike,
        }
    }

    /// Conventional driver binary name.
    pub fn default_program(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::AppleClang => "clang",
            ToolchainPlatform::Msvc => "cl",
        }
    }
}

impl std::fmt::Display for ToolchainPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolchainPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" | "gnu" => Ok(ToolchainPlatform::Gcc),
            "clang" | "llvm" => Ok(ToolchainPlatform::Clang),
            "apple-clang" | "appleclang" => Ok(ToolchainPlatform::AppleClang),
            "msvc" | "cl" => Ok(ToolchainPlatform::Msvc),
            _ => Err(format!(
                "unknown compiler '{}'; expected 'gcc', 'clang', 'apple-clang', or 'msvc'",
                s
            )),
        }
    }
}

/// Flag syntax family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// `cl.exe` style (`/O2`, `/openmp`)
    MsvcLike,
    /// GCC/Clang style (`-O3`, `-fopenmp`)
    PosixLike,
}

/// Compiler-dependent flags applied to every descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerProfile {
    pub family: CompilerFamily,
    /// Optimization and language-level flags
    pub base_flags: Vec<String>,
    /// Compile-side parallelism flag
    pub parallel_compile: String,
    /// Link-side parallelism flag, if the family needs one
    pub parallel_link: Option<String>,
}

impl CompilerProfile {
    pub fn for_family(family: CompilerFamily) -> Self {
        match family {
            CompilerFamily::MsvcLike => CompilerProfile {
                family,
                base_flags: vec!["/O2".to_string()],
                parallel_compile: "/openmp".to_string(),
                parallel_link: None,
            },
            CompilerFamily::PosixLike => CompilerProfile {
                family,
                base_flags: ["-O3", "-march=native", "-std=c99"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                parallel_compile: "-fopenmp".to_string(),
                parallel_link: Some("-fopenmp".to_string()),
            },
        }
    }

    pub fn for_platform(platform: ToolchainPlatform) -> Self {
        Self::for_family(platform.family())
    }

    /// Every flag that belongs to the parallelism pair.
    pub fn parallel_flags(&self) -> Vec<&str> {
        let mut flags = vec![self.parallel_compile.as_str()];
        if let Some(link) = &self.parallel_link {
            if link != &self.parallel_compile {
                flags.push(link.as_str());
            }
        }
        flags
    }
}

/// Generates commands for a specific compiler.
pub trait Toolchain: Send + Sync {
    fn platform(&self) -> ToolchainPlatform;

    /// Path of the compiler driver.
    fn compiler_path(&self) -> &Path;

    /// Command compiling one source to an object file.
    fn compile_command(&self, input: &CompileInput) -> CommandSpec;

    /// Command linking objects into a loadable extension module.
    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec;

    /// Object file extension.
    fn object_extension(&self) -> &str;
}
