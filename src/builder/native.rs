//! Native compiler driver.
//!
//! Turns each finished descriptor of a [`BuildPlan`] into compile and link
//! commands for the detected toolchain and runs them. Descriptors are built
//! concurrently and independently: a failure is recorded on that artifact
//! and never aborts its siblings. No configuration decisions are made here,
//! and plan advisories are reported by the caller.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::builder::plan::BuildPlan;
use crate::builder::toolchain::{CommandSpec, CompileInput, LinkInput, Toolchain};
use crate::core::descriptor::ExtensionDescriptor;
use crate::util::fs::{ensure_dir, object_path};
use crate::util::process::ProcessBuilder;

/// Result of building one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ArtifactOutcome {
    Built { name: String, path: PathBuf },
    Failed { name: String, message: String },
}

impl ArtifactOutcome {
    pub fn name(&self) -> &str {
        match self {
            ArtifactOutcome::Built { name, .. } | ArtifactOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ArtifactOutcome::Built { .. })
    }
}

/// Native extension builder.
pub struct NativeBuilder<'a> {
    toolchain: &'a dyn Toolchain,
    /// Project root; relative descriptor paths resolve against it
    root: PathBuf,
    /// Output directory for objects and modules
    out_dir: PathBuf,
}

impl<'a> NativeBuilder<'a> {
    pub fn new(
        toolchain: &'a dyn Toolchain,
        root: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        NativeBuilder {
            toolchain,
            root: root.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Build every artifact of the plan.
    ///
    /// `on_finished` is called once per artifact as soon as it completes.
    /// The returned outcomes follow the plan's descriptor order.
    pub fn emit(
        &self,
        plan: &BuildPlan,
        jobs: Option<usize>,
        on_finished: &(dyn Fn(&ArtifactOutcome) + Sync),
    ) -> Result<Vec<ArtifactOutcome>> {
        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(j) = jobs {
            pool = pool.num_threads(j);
        }
        let pool = pool.build()?;

        tracing::info!(
            "Building {} extension modules with {}",
            plan.descriptors.len(),
            self.toolchain.platform()
        );

        let outcomes = pool.install(|| {
            plan.descriptors
                .par_iter()
                .map(|descriptor| {
                    let outcome = match self.build_artifact(plan, descriptor) {
                        Ok(path) => ArtifactOutcome::Built {
                            name: descriptor.name.clone(),
                            path,
                        },
                        Err(e) => {
                            tracing::debug!("{} failed: {:#}", descriptor.name, e);
                            ArtifactOutcome::Failed {
                                name: descriptor.name.clone(),
                                message: format!("{:#}", e),
                            }
                        }
                    };
                    on_finished(&outcome);
                    outcome
                })
                .collect()
        });

        Ok(outcomes)
    }

    /// Path of the loadable module for a descriptor.
    pub fn module_path(&self, plan: &BuildPlan, descriptor: &ExtensionDescriptor) -> PathBuf {
        let mut dir = self.out_dir.clone();
        if let Some(package) = descriptor.package_path() {
            dir = dir.join(package);
        }
        dir.join(format!(
            "{}.{}",
            descriptor.module_name(),
            plan.target.extension_suffix()
        ))
    }

    fn build_artifact(
        &self,
        plan: &BuildPlan,
        descriptor: &ExtensionDescriptor,
    ) -> Result<PathBuf> {
        let units: Vec<PathBuf> = descriptor
            .sources
            .iter()
            .map(|s| self.resolve(&translation_unit(s)))
            .collect();

        for unit in &units {
            if !unit.is_file() {
                bail!(
                    "source `{}` not found (generate the C sources from the .pyx bindings first)",
                    unit.display()
                );
            }
        }

        let obj_dir = self.out_dir.join("obj").join(descriptor.module_name());
        ensure_dir(&obj_dir)?;

        let include_dirs: Vec<PathBuf> = descriptor
            .include_dirs
            .iter()
            .map(|d| self.resolve(d))
            .collect();
        let mut cflags = descriptor.compile_args.clone();
        cflags.extend(plan.passthrough().iter().cloned());

        let objects: Vec<PathBuf> = descriptor
            .sources
            .par_iter()
            .zip(units.par_iter())
            .map(|(source, unit)| {
                let output = object_path(
                    &obj_dir,
                    &translation_unit(source),
                    self.toolchain.object_extension(),
                );
                let input = CompileInput {
                    source: unit.clone(),
                    output,
                    include_dirs: include_dirs.clone(),
                    defines: descriptor.defines.clone(),
                    cflags: cflags.clone(),
                    pic: !plan.target.is_windows(),
                };
                self.compile(&input)?;
                Ok(input.output)
            })
            .collect::<Result<_>>()?;

        let output = self.module_path(plan, descriptor);
        if let Some(parent) = output.parent() {
            ensure_dir(parent)?;
        }

        let input = LinkInput {
            objects,
            output: output.clone(),
            ldflags: descriptor.link_args.clone(),
            export: Some(format!("PyInit_{}", descriptor.module_name())),
        };
        let spec = self.toolchain.link_shared_command(&input);
        tracing::debug!("Linking {}", output.display());

        let output_status = run(spec)?;
        if !output_status.status.success() {
            bail!(
                "linking {} failed\n{}",
                output.display(),
                String::from_utf8_lossy(&output_status.stderr).trim_end()
            );
        }

        tracing::info!("Built {}", output.display());
        Ok(output)
    }

    fn compile(&self, input: &CompileInput) -> Result<()> {
        let spec = self.toolchain.compile_command(input);
        tracing::debug!(
            "Compiling {} -> {}",
            input.source.display(),
            input.output.display()
        );

        let output = run(spec)?;
        if !output.status.success() {
            bail!(
                "compilation failed for {}\n{}",
                input.source.display(),
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// The C file actually compiled for a source: `.pyx` bindings compile from
/// the generated `.c` next to them.
pub fn translation_unit(source: &Path) -> PathBuf {
    match source.extension().and_then(|e| e.to_str()) {
        Some("pyx") => source.with_extension("c"),
        _ => source.to_path_buf(),
    }
}

fn run(spec: CommandSpec) -> Result<std::process::Output> {
    let cmd = ProcessBuilder::new(&spec.program).args(&spec.args);
    tracing::trace!("{}", cmd.display_command());
    cmd.exec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::builder::plan::BuildPlan;
    use crate::builder::toolchain::ToolchainPlatform;
    use crate::test_support::{linux, plan_inputs, FakeToolchain, ProjectFixture};
    use tempfile::TempDir;

    fn plan() -> BuildPlan {
        BuildPlan::configure(plan_inputs(&[], linux(), ToolchainPlatform::Gcc)).unwrap()
    }

    fn names(outcomes: &[ArtifactOutcome]) -> Vec<&str> {
        outcomes.iter().map(ArtifactOutcome::name).collect()
    }

    #[test]
    fn test_translation_unit() {
        assert_eq!(
            translation_unit(Path::new("cmfrec/cfuns_double.pyx")),
            PathBuf::from("cmfrec/cfuns_double.c")
        );
        assert_eq!(
            translation_unit(Path::new("src/common.c")),
            PathBuf::from("src/common.c")
        );
    }

    #[test]
    fn test_module_path() {
        let toolchain = FakeToolchain::new("true", "true");
        let builder = NativeBuilder::new(&toolchain, "/proj", "/proj/build");
        let plan = plan();

        assert_eq!(
            builder.module_path(&plan, &plan.descriptors[0]),
            PathBuf::from("/proj/build/cmfrec/wrapper_double.so")
        );
    }

    #[test]
    fn test_missing_generated_sources_fail_each_artifact() {
        let tmp = TempDir::new().unwrap();
        let toolchain = FakeToolchain::new("false", "false");
        let builder = NativeBuilder::new(&toolchain, tmp.path(), tmp.path().join("build"));

        let finished = Mutex::new(Vec::new());
        let outcomes = builder
            .emit(&plan(), Some(2), &|o| {
                finished.lock().unwrap().push(o.name().to_string())
            })
            .unwrap();

        assert_eq!(
            names(&outcomes),
            vec!["cmfrec.wrapper_double", "cmfrec.wrapper_float"]
        );
        for outcome in &outcomes {
            match outcome {
                ArtifactOutcome::Failed { message, .. } => assert!(message.contains("not found")),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert_eq!(finished.lock().unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_all_artifacts_built() {
        let tmp = TempDir::new().unwrap();
        ProjectFixture::complete().write_to(tmp.path()).unwrap();

        let toolchain = FakeToolchain::new("true", "true");
        let builder = NativeBuilder::new(&toolchain, tmp.path(), tmp.path().join("build"));
        let outcomes = builder.emit(&plan(), None, &|_| {}).unwrap();

        assert!(outcomes.iter().all(ArtifactOutcome::is_success));
        assert_eq!(
            outcomes[1],
            ArtifactOutcome::Built {
                name: "cmfrec.wrapper_float".to_string(),
                path: tmp.path().join("build/cmfrec/wrapper_float.so"),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_is_isolated_to_one_artifact() {
        let tmp = TempDir::new().unwrap();
        ProjectFixture::complete()
            .without("cmfrec/cfuns_float_plusblas.c")
            .write_to(tmp.path())
            .unwrap();

        let toolchain = FakeToolchain::new("true", "true");
        let builder = NativeBuilder::new(&toolchain, tmp.path(), tmp.path().join("build"));
        let outcomes = builder.emit(&plan(), Some(1), &|_| {}).unwrap();

        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(outcomes[1].name(), "cmfrec.wrapper_float");
    }

    #[cfg(unix)]
    #[test]
    fn test_compiler_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        ProjectFixture::complete().write_to(tmp.path()).unwrap();

        let toolchain = FakeToolchain::new("false", "true");
        let builder = NativeBuilder::new(&toolchain, tmp.path(), tmp.path().join("build"));
        let outcomes = builder.emit(&plan(), None, &|_| {}).unwrap();

        for outcome in &outcomes {
            match outcome {
                ArtifactOutcome::Failed { message, .. } => {
                    assert!(message.contains("compilation failed"))
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
    }
}
