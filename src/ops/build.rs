//! Implementation of `cmfbuild build`.

use anyhow::Result;

use crate::builder::executor::{BuildExecutor, BuildReport, MessageFormat};
use crate::builder::toolchain::{detect_toolchain, toolchain_for, Toolchain};
use crate::core::options::environment_from_process;
use crate::ops::configure::{configure_with, ConfigureOptions};
use crate::util::context::GlobalContext;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Plan inputs
    pub configure: ConfigureOptions,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Progress output format
    pub format: MessageFormat,
}

/// Toolchain for a build: the requested compiler, or the detected one.
pub fn select_toolchain(
    ctx: &GlobalContext,
    opts: &ConfigureOptions,
) -> Result<Box<dyn Toolchain>> {
    let settings = &ctx.config().toolchain;
    match opts.compiler {
        Some(platform) => Ok(toolchain_for(platform, settings.cc.clone())),
        None => detect_toolchain(settings),
    }
}

/// Configure a plan and build every artifact.
///
/// Artifact failures are reported in the returned [`BuildReport`]; only
/// configuration problems are returned as errors.
pub fn build(ctx: &GlobalContext, opts: &BuildOptions) -> Result<BuildReport> {
    let toolchain = select_toolchain(ctx, &opts.configure)?;
    tracing::debug!(
        "Using {} toolchain at {}",
        toolchain.platform(),
        toolchain.compiler_path().display()
    );

    let plan = configure_with(
        ctx,
        &opts.configure,
        toolchain.platform(),
        environment_from_process(),
    )?;

    let jobs = opts.jobs.or(ctx.config().build.jobs);

    BuildExecutor::new(toolchain.as_ref(), ctx.cwd(), ctx.out_dir())
        .verbose(ctx.is_verbose())
        .color(ctx.color())
        .message_format(opts.format)
        .execute(&plan, jobs)
}
