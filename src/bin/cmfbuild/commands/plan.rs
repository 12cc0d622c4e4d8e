//! `cmfbuild plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use cmfbuild::builder::BuildPlan;
use cmfbuild::ops::{configure, ConfigureOptions};
use cmfbuild::util::diagnostic;
use cmfbuild::util::hash;
use cmfbuild::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: PlanArgs) -> Result<()> {
    let opts = ConfigureOptions::from(args.configure);
    let plan = configure(ctx, &opts)?;
    let fingerprint = plan.fingerprint()?;

    if args.json {
        let mut value = serde_json::to_value(&plan)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("fingerprint".to_string(), fingerprint.into());
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for advisory in &plan.advisories {
        diagnostic::emit(advisory, ctx.color());
    }
    print_plan(&plan, &fingerprint);
    Ok(())
}

fn print_plan(plan: &BuildPlan, fingerprint: &str) {
    println!("Build plan for {} ({})", plan.target, plan.compiler);
    println!();

    let options: Vec<String> = plan
        .options
        .to_map()
        .iter()
        .map(|(name, on)| format!("{}={}", name, if *on { "on" } else { "off" }))
        .collect();
    println!("  Options:      {}", options.join(" "));
    println!("  Parallel:     {}", if plan.parallel() { "yes" } else { "no" });
    println!("  Backend:      {} ({} bindings)", plan.backend, plan.binding.as_str());
    if !plan.passthrough().is_empty() {
        println!("  Pass-through: {}", plan.passthrough().join(" "));
    }
    println!();

    for descriptor in &plan.descriptors {
        println!("  {}", descriptor.name);
        let sources: Vec<String> = descriptor
            .sources
            .iter()
            .map(|s| s.display().to_string())
            .collect();
        println!("    sources:  {}", sources.join(" "));
        println!("    defines:  {}", descriptor.define_names().collect::<Vec<_>>().join(" "));
        println!("    compile:  {}", descriptor.compile_args.join(" "));
        println!("    link:     {}", descriptor.link_args.join(" "));
    }

    println!();
    println!("  Fingerprint: {}", hash::short(fingerprint));
}
