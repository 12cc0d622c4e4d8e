//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use cmfbuild::builder::ToolchainPlatform;
use cmfbuild::core::{Precision, TargetTriple};
use cmfbuild::ops::ConfigureOptions;

/// cmfbuild - configure and build the cmfrec float and double extensions
#[derive(Parser)]
#[command(name = "cmfbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and print the build plan
    Plan(PlanArgs),

    /// Show compile/link flags for one extension module
    Flags(FlagsArgs),

    /// Configure and build both extension modules
    Build(BuildArgs),

    /// Show the detected toolchain and its compiler profile
    Toolchain,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by every command that resolves a plan.
#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// Target triple (defaults to the host)
    #[arg(long)]
    pub target: Option<TargetTriple>,

    /// Compiler to configure for: gcc, clang, apple-clang, msvc (defaults to detection)
    #[arg(long)]
    pub compiler: Option<ToolchainPlatform>,

    /// NumPy C header directory
    #[arg(long, value_name = "DIR")]
    pub array_include: Option<PathBuf>,

    /// Python C header directory
    #[arg(long, value_name = "DIR")]
    pub python_include: Option<PathBuf>,

    /// Custom BLAS compile argument (repeatable)
    #[arg(long = "blas-compile-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub blas_compile_args: Vec<String>,

    /// Custom BLAS link argument (repeatable)
    #[arg(long = "blas-link-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub blas_link_args: Vec<String>,

    /// Build tokens (findblas, enable-omp, openblas); others pass through to the compiler
    ///
    /// Leftover tokens are appended verbatim to every compile command, so
    /// they must be valid compiler flags (e.g. `-g`, `-Wall`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}

impl From<ConfigureArgs> for ConfigureOptions {
    fn from(args: ConfigureArgs) -> Self {
        ConfigureOptions {
            tokens: args.tokens,
            target: args.target,
            compiler: args.compiler,
            array_include: args.array_include,
            python_include: args.python_include,
            blas_compile_args: args.blas_compile_args,
            blas_link_args: args.blas_link_args,
        }
    }
}

#[derive(Args)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Precision variant: double or float
    pub variant: Precision,

    /// Only show link flags
    #[arg(long)]
    pub link: bool,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print JSON build events instead of progress
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
