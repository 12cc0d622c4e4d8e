//! `cmfbuild toolchain` command

use anyhow::Result;

use cmfbuild::builder::{detect_toolchain, CompilerProfile};
use cmfbuild::core::TargetTriple;
use cmfbuild::GlobalContext;

pub fn execute(ctx: &GlobalContext) -> Result<()> {
    let toolchain = detect_toolchain(&ctx.config().toolchain)?;
    let platform = toolchain.platform();
    let profile = CompilerProfile::for_platform(platform);

    println!("Toolchain:");
    println!();
    println!("  CC:       {}", toolchain.compiler_path().display());

    let output = std::process::Command::new(toolchain.compiler_path())
        .arg("--version")
        .output();
    if let Ok(output) = output {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = stdout.lines().next() {
            println!("            {}", first_line.trim());
        }
    }

    println!("  Family:   {}", platform);
    println!();

    println!("Compiler profile:");
    println!("  Base:     {}", profile.base_flags.join(" "));
    println!("  Parallel: {}", profile.parallel_flags().join(" "));
    println!();

    let target = TargetTriple::host();
    println!("  Target:   {}", target);
    if target.is_parallelism_limited() {
        println!("            (parallelism off unless ENABLE_OMP or enable-omp is given)");
    }

    println!();
    println!("Environment:");
    for var in ["CC", "USE_FINDBLAS", "ENABLE_OMP", "USE_OPENBLAS"] {
        if let Ok(value) = std::env::var(var) {
            println!("  {}={}", var, value);
        }
    }

    Ok(())
}
