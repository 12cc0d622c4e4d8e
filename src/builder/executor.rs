//! Build executor with progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::events::BuildEvent;
use crate::builder::native::{ArtifactOutcome, NativeBuilder};
use crate::builder::plan::BuildPlan;
use crate::builder::toolchain::Toolchain;
use crate::util::diagnostic::{self, Diagnostic};

/// How build progress is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Human,
    /// One JSON event per line on stdout
    Json,
}

/// Outcome of an emission run.
#[derive(Debug)]
pub struct BuildReport {
    pub outcomes: Vec<ArtifactOutcome>,
    pub duration: Duration,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(ArtifactOutcome::is_success)
    }

    pub fn built(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Build executor with progress tracking.
pub struct BuildExecutor<'a> {
    toolchain: &'a dyn Toolchain,
    root: PathBuf,
    out_dir: PathBuf,
    verbose: bool,
    color: bool,
    format: MessageFormat,
}

impl<'a> BuildExecutor<'a> {
    pub fn new(
        toolchain: &'a dyn Toolchain,
        root: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        BuildExecutor {
            toolchain,
            root: root.into(),
            out_dir: out_dir.into(),
            verbose: false,
            color: false,
            format: MessageFormat::Human,
        }
    }

    /// Enable verbose output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn message_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    /// Build every artifact of the plan, reporting progress as it goes.
    pub fn execute(&self, plan: &BuildPlan, jobs: Option<usize>) -> Result<BuildReport> {
        let start = Instant::now();
        let json = self.format == MessageFormat::Json;

        if json {
            let names = plan.descriptors.iter().map(|d| d.name.clone()).collect();
            let started =
                BuildEvent::started(plan.compiler.as_str(), plan.target.to_string(), names);
            println!("{}", started.to_json());
        }
        // Each advisory is reported once: as an event on stdout in JSON mode,
        // otherwise on stderr.
        for advisory in &plan.advisories {
            if json {
                println!("{}", BuildEvent::diagnostic(advisory).to_json());
            } else {
                diagnostic::emit(advisory, self.color);
            }
        }
        if !json && self.verbose {
            eprintln!(
                "   Compiling {} extension module(s) for {}",
                plan.descriptors.len(),
                plan.target
            );
        }

        let total = plan.descriptors.len();
        let pb = if !json && !self.verbose && total > 1 {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let on_finished = |outcome: &ArtifactOutcome| {
            if json {
                println!("{}", BuildEvent::from_outcome(outcome).to_json());
            }
            if let Some(pb) = &pb {
                pb.set_message(outcome.name().to_string());
                pb.inc(1);
            }
        };

        let builder = NativeBuilder::new(self.toolchain, &self.root, &self.out_dir);
        let outcomes = builder.emit(plan, jobs, &on_finished)?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let report = BuildReport {
            outcomes,
            duration: start.elapsed(),
        };

        if json {
            println!(
                "{}",
                BuildEvent::finished(
                    report.success(),
                    report.duration.as_millis() as u64,
                    report.built().count() as u64,
                )
                .to_json()
            );
        } else {
            self.print_summary(&report);
        }

        Ok(report)
    }

    fn print_summary(&self, report: &BuildReport) {
        for outcome in &report.outcomes {
            match outcome {
                ArtifactOutcome::Built { name, path } if self.verbose => {
                    eprintln!("       Built {} -> {}", name, path.display());
                }
                ArtifactOutcome::Failed { name, message } => {
                    let diag = Diagnostic::error(format!("failed to build `{}`", name))
                        .with_context(message.clone());
                    diagnostic::emit(&diag, self.color);
                }
                _ => {}
            }
        }

        eprintln!(
            "    Finished {} of {} extension module(s) in {:.2}s",
            report.built().count(),
            report.outcomes.len(),
            report.duration.as_secs_f64()
        );
    }
}
