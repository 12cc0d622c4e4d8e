//! Build plan generation.
//!
//! A [`BuildPlan`] is the complete, resolved configuration of one build: the
//! option values, the selected backend and the two finished extension
//! descriptors. [`BuildPlan::configure`] runs the decision pipeline
//!
//! ```text
//! resolve options -> select backend -> build descriptors (x2) -> adapt flags
//! ```
//!
//! and is the only place these stages are composed. Emission is separate
//! (see [`crate::builder::native`]).

use anyhow::Result;
use serde::Serialize;

use crate::builder::adapter;
use crate::builder::backend::{self, BackendChoice, BindingVariant, CustomBlasArgs};
use crate::builder::discovery::BlasDiscovery;
use crate::builder::errors::ConfigureError;
use crate::builder::extension::{self, ExtensionLayout, HeaderPaths};
use crate::builder::toolchain::{CompilerProfile, ToolchainPlatform};
use crate::core::descriptor::{ExtensionDescriptor, Precision};
use crate::core::options::{Environment, OptionResolver, ResolvedOptions};
use crate::core::platform::TargetTriple;
use crate::util::diagnostic::Diagnostic;
use crate::util::hash::sha256_str;

/// Everything the decision pipeline reads.
pub struct PlanInputs<'a> {
    /// Raw tokens from the command line
    pub tokens: Vec<String>,
    /// Environment snapshot
    pub env: Environment,
    /// Platform being built for
    pub target: TargetTriple,
    /// Compiler the artifacts are built with
    pub compiler: ToolchainPlatform,
    /// User-supplied backend arguments
    pub custom: CustomBlasArgs,
    /// Discovery collaborator, consulted only for `findblas`
    pub discovery: Option<&'a dyn BlasDiscovery>,
    /// Source layout
    pub layout: ExtensionLayout,
    /// Interpreter header locations
    pub headers: HeaderPaths,
}

/// A fully resolved build configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Platform being built for
    pub target: TargetTriple,
    /// Compiler the artifacts are built with
    pub compiler: ToolchainPlatform,
    /// Flags contributed by the compiler
    pub profile: CompilerProfile,
    /// Resolved options, parallelism and pass-through tokens
    pub options: ResolvedOptions,
    /// Active backend strategy
    pub backend: BackendChoice,
    /// Binding source flavor
    pub binding: BindingVariant,
    /// One descriptor per precision, double first
    pub descriptors: Vec<ExtensionDescriptor>,
    /// Non-fatal messages to show before building
    pub advisories: Vec<Diagnostic>,
}

impl BuildPlan {
    /// Resolve a build plan.
    ///
    /// Fails only when discovery was requested and is unavailable, or when a
    /// finished descriptor breaks its macro invariants.
    pub fn configure(inputs: PlanInputs<'_>) -> Result<Self, ConfigureError> {
        let options = OptionResolver.resolve(&inputs.tokens, &inputs.env, &inputs.target);

        let selection =
            backend::select(&options, &inputs.custom, inputs.discovery, &inputs.target)?;

        let descriptors: Vec<ExtensionDescriptor> = Precision::ALL
            .iter()
            .map(|&p| extension::build(p, &selection, &inputs.layout, &inputs.headers))
            .collect();

        let profile = CompilerProfile::for_platform(inputs.compiler);
        let descriptors = adapter::adapt(descriptors, &profile, options.parallel);

        for descriptor in &descriptors {
            descriptor
                .validate()
                .map_err(|source| ConfigureError::InvalidDescriptor {
                    artifact: descriptor.name.clone(),
                    source,
                })?;
        }

        let mut advisories = Vec::new();
        if !options.parallel && inputs.target.is_parallelism_limited() {
            advisories.push(parallelism_advisory());
        }

        tracing::debug!(
            "Configured {} descriptors for {} ({}, backend: {})",
            descriptors.len(),
            inputs.target,
            inputs.compiler,
            selection.choice
        );

        Ok(BuildPlan {
            target: inputs.target,
            compiler: inputs.compiler,
            profile,
            options,
            backend: selection.choice,
            binding: selection.binding,
            descriptors,
            advisories,
        })
    }

    /// Final parallelism decision.
    pub fn parallel(&self) -> bool {
        self.options.parallel
    }

    /// Tokens forwarded untouched to every compile command.
    pub fn passthrough(&self) -> &[String] {
        &self.options.remaining
    }

    /// Descriptor of one precision variant.
    pub fn descriptor(&self, precision: Precision) -> Option<&ExtensionDescriptor> {
        self.descriptors.iter().find(|d| d.precision == precision)
    }

    /// SHA-256 of the serialized plan.
    ///
    /// Identical inputs give identical fingerprints.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(sha256_str(&json))
    }
}

fn parallelism_advisory() -> Diagnostic {
    Diagnostic::warning("building without OpenMP multi-threading")
        .with_context(
            "Apple's default clang has no OpenMP support, \
             so parallelism is off by default on this platform",
        )
        .with_suggestion("Set `ENABLE_OMP=1` or pass `enable-omp` to turn it on")
        .with_suggestion("An OpenMP-capable compiler is also required (e.g. Homebrew llvm or gcc)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::discovery::DiscoveryError;
    use crate::core::descriptor::{AVOID_BLAS_SYR, NO_FINDBLAS, USE_BLAS_SYR, USE_FINDBLAS};
    use crate::test_support::{darwin, linux, plan_inputs, FakeDiscovery};

    fn names(d: &ExtensionDescriptor) -> Vec<&str> {
        d.define_names().collect()
    }

    fn apple(tokens: &[&str]) -> Result<BuildPlan, ConfigureError> {
        BuildPlan::configure(plan_inputs(tokens, darwin(), ToolchainPlatform::AppleClang))
    }

    #[test]
    fn test_posix_default_plan() {
        let plan = BuildPlan::configure(plan_inputs(&[], linux(), ToolchainPlatform::Gcc)).unwrap();

        assert_eq!(plan.backend, BackendChoice::NoBackend);
        assert!(plan.parallel());
        assert!(plan.advisories.is_empty());
        assert_eq!(plan.descriptors.len(), 2);

        let double = plan.descriptor(Precision::Double).unwrap();
        assert_eq!(double.name, "cmfrec.wrapper_double");
        assert_eq!(
            names(double),
            vec!["_FOR_PYTHON", "USE_DOUBLE", "NO_FINDBLAS", "AVOID_BLAS_SYR"]
        );
        assert_eq!(
            double.compile_args,
            vec!["-O3", "-march=native", "-std=c99", "-fopenmp"]
        );
        assert_eq!(double.link_args, vec!["-fopenmp"]);

        let float = plan.descriptor(Precision::Float).unwrap();
        assert!(float.has_define("USE_FLOAT"));
        assert_eq!(float.compile_args, double.compile_args);
    }

    #[test]
    fn test_findblas_with_openblas_is_patched() {
        let discovery = FakeDiscovery::found("openblas", &["-lopenblas"]);
        let mut inputs = plan_inputs(&["findblas"], linux(), ToolchainPlatform::Gcc);
        inputs.discovery = Some(&discovery);

        let plan = BuildPlan::configure(inputs).unwrap();
        for d in &plan.descriptors {
            assert!(d.has_define(USE_FINDBLAS));
            assert!(d.has_define(AVOID_BLAS_SYR));
            assert!(!d.has_define(USE_BLAS_SYR));
            assert!(d.link_args.contains(&"-lopenblas".to_string()));
        }
    }

    #[test]
    fn test_findblas_with_other_backend_keeps_syr() {
        let discovery = FakeDiscovery::found("mkl", &["-lmkl_rt"]);
        let mut inputs = plan_inputs(&["--findblas"], linux(), ToolchainPlatform::Gcc);
        inputs.discovery = Some(&discovery);

        let plan = BuildPlan::configure(inputs).unwrap();
        let d = plan.descriptor(Precision::Float).unwrap();
        assert!(d.has_define(USE_BLAS_SYR));
        assert_eq!(d.sources[0].to_string_lossy(), "cmfrec/cfuns_float.pyx");
    }

    #[test]
    fn test_openblas_env_forces_openblas() {
        let mut inputs = plan_inputs(&[], linux(), ToolchainPlatform::Gcc);
        inputs.env.insert("USE_OPENBLAS".to_string(), "1".to_string());

        let plan = BuildPlan::configure(inputs).unwrap();
        assert_eq!(plan.backend, BackendChoice::ForcedOpenBlas);
        for d in &plan.descriptors {
            assert!(d.link_args.contains(&"-lopenblas".to_string()));
            assert!(d.has_define(NO_FINDBLAS));
            assert!(d.has_define(AVOID_BLAS_SYR));
            assert!(d.sources[0].to_string_lossy().ends_with("_plusblas.pyx"));
        }
    }

    #[test]
    fn test_custom_args_override_tokens() {
        let discovery = FakeDiscovery::found("mkl", &["-lmkl_rt"]);
        let mut inputs = plan_inputs(&["findblas", "openblas"], linux(), ToolchainPlatform::Gcc);
        inputs.discovery = Some(&discovery);
        inputs.custom.link_args = vec!["-L/opt/blis/lib".to_string(), "-lblis".to_string()];

        let plan = BuildPlan::configure(inputs).unwrap();
        assert_eq!(plan.backend, BackendChoice::UserCustom);
        assert_eq!(discovery.calls(), 0);

        let d = plan.descriptor(Precision::Double).unwrap();
        assert_eq!(d.link_args, vec!["-L/opt/blis/lib", "-lblis", "-fopenmp"]);
        assert!(d.has_define(NO_FINDBLAS));
        assert!(d.has_define(USE_BLAS_SYR));
    }

    #[test]
    fn test_custom_openblas_args_are_patched() {
        let mut inputs = plan_inputs(&[], linux(), ToolchainPlatform::Gcc);
        inputs.custom.link_args = vec!["-L/opt/OpenBLAS/lib".to_string()];

        let plan = BuildPlan::configure(inputs).unwrap();
        for d in &plan.descriptors {
            assert!(d.has_define(AVOID_BLAS_SYR));
            assert!(!d.has_define(USE_BLAS_SYR));
        }
    }

    #[test]
    fn test_discovery_failure_is_fatal() {
        let discovery = FakeDiscovery::unavailable();
        let mut inputs = plan_inputs(&["findblas"], linux(), ToolchainPlatform::Gcc);
        inputs.discovery = Some(&discovery);

        let err = BuildPlan::configure(inputs).unwrap_err();
        assert!(matches!(
            err,
            ConfigureError::DiscoveryUnavailable {
                source: DiscoveryError::NotFound { .. }
            }
        ));
    }

    #[test]
    fn test_darwin_without_omp_strips_flags_and_advises_once() {
        let plan = apple(&[]).unwrap();

        assert!(!plan.parallel());
        assert_eq!(plan.advisories.len(), 1);
        for d in &plan.descriptors {
            assert!(!d.compile_args.contains(&"-fopenmp".to_string()));
            assert!(!d.link_args.contains(&"-fopenmp".to_string()));
            assert!(d.compile_args.contains(&"-O3".to_string()));
        }
    }

    #[test]
    fn test_darwin_enable_omp_keeps_flags() {
        let plan = apple(&["enable-omp"]).unwrap();

        assert!(plan.parallel());
        assert!(plan.advisories.is_empty());
        let d = plan.descriptor(Precision::Double).unwrap();
        assert!(d.compile_args.contains(&"-fopenmp".to_string()));
        assert_eq!(d.link_args, vec!["-fopenmp"]);
        assert!(plan.passthrough().is_empty());
    }

    #[test]
    fn test_msvc_profile_flags() {
        let plan = BuildPlan::configure(plan_inputs(
            &[],
            crate::test_support::windows(),
            ToolchainPlatform::Msvc,
        ))
        .unwrap();

        let d = plan.descriptor(Precision::Double).unwrap();
        assert_eq!(d.compile_args, vec!["/O2", "/openmp"]);
        assert!(d.link_args.is_empty());
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let plan = BuildPlan::configure(plan_inputs(
            &["-g", "openblas", "-Wall"],
            linux(),
            ToolchainPlatform::Gcc,
        ))
        .unwrap();

        assert_eq!(plan.passthrough(), &["-g", "-Wall"]);
        assert_eq!(plan.backend, BackendChoice::ForcedOpenBlas);
    }

    #[test]
    fn test_configure_is_idempotent() {
        let a = BuildPlan::configure(plan_inputs(&["findblas"], linux(), ToolchainPlatform::Gcc));
        assert!(a.is_err());

        let a = apple(&["openblas"]).unwrap();
        let b = apple(&["openblas"]).unwrap();

        assert_eq!(a.descriptors, b.descriptors);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let c = apple(&[]).unwrap();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }
}
