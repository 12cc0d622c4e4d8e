//! cmfbuild CLI - configure and build the cmfrec extension modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use cmfbuild::builder::ConfigureError;
use cmfbuild::util::diagnostic;
use cmfbuild::GlobalContext;

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<ConfigureError>() {
            Some(configure) => diagnostic::emit(&configure.to_diagnostic(), false),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("cmfbuild=debug")
    } else {
        EnvFilter::new("cmfbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = match cli.root {
        Some(root) => GlobalContext::with_cwd(root),
        None => GlobalContext::new()?,
    };
    ctx.set_verbose(cli.verbose);
    if cli.no_color {
        ctx.set_color(false);
    }

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(&ctx, args),
        Commands::Flags(args) => commands::flags::execute(&ctx, args),
        Commands::Build(args) => commands::build::execute(&ctx, args),
        Commands::Toolchain => commands::toolchain::execute(&ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
