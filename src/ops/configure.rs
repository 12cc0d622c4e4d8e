//! Implementation of plan configuration.
//!
//! Gathers the inputs of the decision pipeline from the command line, the
//! configuration files, the environment and the host, then runs
//! [`BuildPlan::configure`].

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::backend::CustomBlasArgs;
use crate::builder::discovery::{BlasDiscovery, ChainedDiscovery, MechanismId};
use crate::builder::errors::ConfigureError;
use crate::builder::extension::HeaderPaths;
use crate::builder::plan::{BuildPlan, PlanInputs};
use crate::builder::toolchain::{detect_toolchain, ToolchainPlatform};
use crate::core::options::{environment_from_process, Environment};
use crate::core::platform::TargetTriple;
use crate::util::context::GlobalContext;
use crate::util::python::{default_python, probe_headers};
use crate::util::vcpkg::VcpkgIntegration;

/// Command-line inputs shared by every command that configures a plan.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    /// Raw tokens; recognized options are consumed, the rest pass through
    /// to every compile command and must be valid compiler flags
    pub tokens: Vec<String>,

    /// Target platform (default: host)
    pub target: Option<TargetTriple>,

    /// Compiler to configure for (default: detected)
    pub compiler: Option<ToolchainPlatform>,

    /// NumPy header directory
    pub array_include: Option<PathBuf>,

    /// Python header directory
    pub python_include: Option<PathBuf>,

    /// Custom backend compile arguments
    pub blas_compile_args: Vec<String>,

    /// Custom backend link arguments
    pub blas_link_args: Vec<String>,
}

impl ConfigureOptions {
    /// Target platform in effect.
    pub fn target(&self) -> TargetTriple {
        self.target.clone().unwrap_or_else(TargetTriple::host)
    }

    /// Custom backend arguments; command-line values replace configured ones.
    pub fn custom_args(&self, ctx: &GlobalContext) -> CustomBlasArgs {
        if self.blas_compile_args.is_empty() && self.blas_link_args.is_empty() {
            ctx.config().blas.custom_args()
        } else {
            CustomBlasArgs {
                compile_args: self.blas_compile_args.clone(),
                link_args: self.blas_link_args.clone(),
            }
        }
    }
}

/// Configure a plan, detecting the compiler unless one was given.
pub fn configure(ctx: &GlobalContext, opts: &ConfigureOptions) -> Result<BuildPlan> {
    let compiler = match opts.compiler {
        Some(compiler) => compiler,
        None => detect_toolchain(&ctx.config().toolchain)
            .context("failed to detect a C compiler (pass `--compiler` to choose one)")?
            .platform(),
    };

    configure_with(ctx, opts, compiler, environment_from_process())
}

/// Configure a plan for a known compiler and environment snapshot.
pub fn configure_with(
    ctx: &GlobalContext,
    opts: &ConfigureOptions,
    compiler: ToolchainPlatform,
    env: Environment,
) -> Result<BuildPlan> {
    let config = ctx.config();
    let target = opts.target();
    let headers = resolve_headers(ctx, opts)?;

    let order = config.blas.discovery_order();
    let vcpkg = if order.contains(&MechanismId::Vcpkg) {
        VcpkgIntegration::from_config(&config.vcpkg, &target)
    } else {
        None
    };
    let chain = ChainedDiscovery::from_ids(&order, vcpkg);
    let discovery: Option<&dyn BlasDiscovery> = if chain.is_empty() { None } else { Some(&chain) };

    tracing::debug!(
        "Configuring for {} with {} (discovery: [{}])",
        target,
        compiler,
        order.iter().map(MechanismId::as_str).collect::<Vec<_>>().join(", ")
    );

    let plan = BuildPlan::configure(PlanInputs {
        tokens: opts.tokens.clone(),
        env,
        target,
        compiler,
        custom: opts.custom_args(ctx),
        discovery,
        layout: config.layout(),
        headers,
    })?;

    Ok(plan)
}

/// Locate the NumPy and Python headers.
///
/// Explicit paths win over configured ones; the interpreter is asked only
/// when neither names the NumPy headers.
pub fn resolve_headers(
    ctx: &GlobalContext,
    opts: &ConfigureOptions,
) -> Result<HeaderPaths, ConfigureError> {
    let paths = &ctx.config().paths;

    let array_include = opts.array_include.clone().or_else(|| paths.array_include.clone());
    let python_include = opts.python_include.clone().or_else(|| paths.python_include.clone());

    if let Some(array_include) = array_include {
        return Ok(HeaderPaths {
            array_include: ctx.resolve_path(&array_include),
            python_include: python_include.map(|p| ctx.resolve_path(&p)),
        });
    }

    let python = paths.python.clone().unwrap_or_else(|| default_python().to_string());
    let probed = probe_headers(&python).map_err(|e| ConfigureError::ArrayHeadersNotFound {
        python: python.clone(),
        reason: format!("{:#}", e),
    })?;

    Ok(HeaderPaths {
        array_include: probed.array_include,
        python_include: python_include
            .map(|p| ctx.resolve_path(&p))
            .or(probed.python_include),
    })
}
