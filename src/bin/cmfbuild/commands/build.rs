//! `cmfbuild build` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use cmfbuild::builder::MessageFormat;
use cmfbuild::ops::{self, BuildOptions};
use cmfbuild::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: BuildArgs) -> Result<()> {
    let opts = BuildOptions {
        configure: args.configure.into(),
        jobs: args.jobs,
        format: if args.json {
            MessageFormat::Json
        } else {
            MessageFormat::Human
        },
    };

    let report = ops::build(ctx, &opts)?;

    if !report.success() {
        let failed: Vec<&str> = report.failed().map(|o| o.name()).collect();
        bail!(
            "{} of {} extension module(s) failed to build: {}",
            failed.len(),
            report.outcomes.len(),
            failed.join(", ")
        );
    }

    Ok(())
}
