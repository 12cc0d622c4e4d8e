//! `cmfbuild flags` command

use anyhow::{anyhow, Result};

use crate::cli::FlagsArgs;
use cmfbuild::ops::{configure, ConfigureOptions};
use cmfbuild::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: FlagsArgs) -> Result<()> {
    let opts = ConfigureOptions::from(args.configure);
    let plan = configure(ctx, &opts)?;

    let descriptor = plan
        .descriptor(args.variant)
        .ok_or_else(|| anyhow!("plan has no `{}` extension module", args.variant))?;

    if !args.link {
        println!("# Compile flags for `{}`:", descriptor.name);
        for dir in &descriptor.include_dirs {
            println!("  -I{}", dir.display());
        }
        for define in &descriptor.defines {
            println!("  {}", define.to_flag());
        }
        for flag in descriptor.compile_args.iter().chain(plan.passthrough()) {
            println!("  {}", flag);
        }
        println!();
    }

    println!("# Link flags for `{}`:", descriptor.name);
    for flag in &descriptor.link_args {
        println!("  {}", flag);
    }

    Ok(())
}
