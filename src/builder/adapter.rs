//! Compiler flag adaptation.
//!
//! A pipeline of pure stages over the complete descriptor set:
//!
//! 1. [`apply_profile`] appends the compiler's optimization flags and its
//!    parallelism flag pair.
//! 2. [`strip_parallelism`] removes the parallelism flags again when the
//!    build is not parallel.
//! 3. [`patch_known_backend`] switches to the `syr` workaround when the
//!    configuration mentions OpenBLAS or ATLAS, both of which ship a faulty
//!    `syr` routine.
//!
//! Every stage returns new descriptors and never reintroduces what a later
//! stage removes.

use std::sync::OnceLock;

use regex::Regex;

use crate::builder::toolchain::CompilerProfile;
use crate::core::descriptor::{Define, ExtensionDescriptor, AVOID_BLAS_SYR, USE_BLAS_SYR};

fn known_bug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)openblas|atlas").expect("known-backend pattern is valid")
    })
}

/// Append the profile's base flags and parallelism pair.
pub fn apply_profile(
    descriptor: ExtensionDescriptor,
    profile: &CompilerProfile,
) -> ExtensionDescriptor {
    let mut d = descriptor;
    d.compile_args.extend(profile.base_flags.iter().cloned());
    d.compile_args.push(profile.parallel_compile.clone());
    if let Some(link) = &profile.parallel_link {
        d.link_args.push(link.clone());
    }
    d
}

/// Remove every occurrence of the profile's parallelism flags.
///
/// Relative order of the remaining arguments is preserved. Flags of the same
/// spelling supplied by other sources are removed too.
pub fn strip_parallelism(
    descriptor: ExtensionDescriptor,
    profile: &CompilerProfile,
) -> ExtensionDescriptor {
    let flags = profile.parallel_flags();
    let mut d = descriptor;
    d.compile_args.retain(|a| !flags.contains(&a.as_str()));
    d.link_args.retain(|a| !flags.contains(&a.as_str()));
    d
}

/// Whether any argument or macro names a backend with the faulty `syr`.
pub fn mentions_known_backend(descriptor: &ExtensionDescriptor) -> bool {
    let pattern = known_bug_pattern();
    descriptor
        .compile_args
        .iter()
        .chain(descriptor.link_args.iter())
        .any(|a| pattern.is_match(a))
        || descriptor.defines.iter().any(|d| {
            pattern.is_match(&d.name) || d.value.as_deref().is_some_and(|v| pattern.is_match(v))
        })
}

/// Replace `USE_BLAS_SYR` with `AVOID_BLAS_SYR` for OpenBLAS/ATLAS builds.
pub fn patch_known_backend(descriptor: ExtensionDescriptor) -> ExtensionDescriptor {
    if !mentions_known_backend(&descriptor) {
        return descriptor;
    }

    if descriptor.has_define(USE_BLAS_SYR) {
        tracing::debug!(
            "{}: OpenBLAS/ATLAS detected, routing around BLAS syr",
            descriptor.name
        );
    }

    // Keep the pair's slot in the macro order.
    let mut d = descriptor;
    match d.defines.iter().position(|m| m.name == USE_BLAS_SYR) {
        Some(pos) if !d.has_define(AVOID_BLAS_SYR) => {
            d.defines[pos] = Define::flag(AVOID_BLAS_SYR);
            d.without_define(USE_BLAS_SYR)
        }
        _ => d
            .without_define(USE_BLAS_SYR)
            .with_define(Define::flag(AVOID_BLAS_SYR)),
    }
}

/// Run the whole pipeline over the descriptor set.
pub fn adapt(
    descriptors: Vec<ExtensionDescriptor>,
    profile: &CompilerProfile,
    parallel: bool,
) -> Vec<ExtensionDescriptor> {
    descriptors
        .into_iter()
        .map(|d| apply_profile(d, profile))
        .map(|d| {
            if parallel {
                d
            } else {
                strip_parallelism(d, profile)
            }
        })
        .map(patch_known_backend)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::{CompilerFamily, ToolchainPlatform};
    use crate::core::descriptor::Precision;

    fn descriptor(defines: &[&str], link_args: &[&str]) -> ExtensionDescriptor {
        ExtensionDescriptor {
            name: "cmfrec.wrapper_double".to_string(),
            precision: Precision::Double,
            sources: vec![],
            include_dirs: vec![],
            defines: defines.iter().map(|d| Define::flag(*d)).collect(),
            compile_args: vec![],
            link_args: link_args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn posix() -> CompilerProfile {
        CompilerProfile::for_platform(ToolchainPlatform::Gcc)
    }

    #[test]
    fn test_apply_profile_posix() {
        let d = apply_profile(descriptor(&[], &["-lmkl_rt"]), &posix());
        assert_eq!(d.compile_args, vec!["-O3", "-march=native", "-std=c99", "-fopenmp"]);
        assert_eq!(d.link_args, vec!["-lmkl_rt", "-fopenmp"]);
    }

    #[test]
    fn test_apply_profile_msvc_has_no_link_flag() {
        let profile = CompilerProfile::for_family(CompilerFamily::MsvcLike);
        let d = apply_profile(descriptor(&[], &[]), &profile);
        assert_eq!(d.compile_args, vec!["/O2", "/openmp"]);
        assert!(d.link_args.is_empty());
    }

    #[test]
    fn test_strip_parallelism_preserves_order() {
        let mut d = descriptor(&[], &["-L/opt", "-fopenmp", "-lblis", "-fopenmp"]);
        d.compile_args = vec!["-fopenmp".into(), "-O3".into(), "-g".into()];

        let d = strip_parallelism(d, &posix());
        assert_eq!(d.compile_args, vec!["-O3", "-g"]);
        assert_eq!(d.link_args, vec!["-L/opt", "-lblis"]);
    }

    #[test]
    fn test_patch_replaces_syr_macro() {
        let d = descriptor(
            &["_FOR_PYTHON", "USE_DOUBLE", "USE_FINDBLAS", "USE_BLAS_SYR"],
            &["-L/usr/lib", "-lOpenBLAS"],
        );
        let d = patch_known_backend(d);
        assert_eq!(
            d.define_names().collect::<Vec<_>>(),
            vec!["_FOR_PYTHON", "USE_DOUBLE", "USE_FINDBLAS", "AVOID_BLAS_SYR"]
        );
    }

    #[test]
    fn test_patch_scans_macro_names_and_values() {
        let d = descriptor(&["USE_DOUBLE", "NO_FINDBLAS", "USE_BLAS_SYR", "HAS_ATLAS"], &[]);
        assert!(patch_known_backend(d).has_define(AVOID_BLAS_SYR));

        let mut d = descriptor(&["USE_DOUBLE", "NO_FINDBLAS", "USE_BLAS_SYR"], &[]);
        d.defines.push(Define::with_value("BLAS_VENDOR", "atlas"));
        let d = patch_known_backend(d);
        assert!(d.has_define(AVOID_BLAS_SYR));
        assert!(!d.has_define(USE_BLAS_SYR));
    }

    #[test]
    fn test_patch_leaves_other_backends_alone() {
        let d = descriptor(&["USE_DOUBLE", "USE_FINDBLAS", "USE_BLAS_SYR"], &["-lmkl_rt"]);
        let patched = patch_known_backend(d.clone());
        assert_eq!(patched, d);
    }

    #[test]
    fn test_patch_is_idempotent() {
        let d = descriptor(&["USE_DOUBLE", "NO_FINDBLAS", "AVOID_BLAS_SYR"], &["-lopenblas"]);
        let once = patch_known_backend(d.clone());
        assert_eq!(once, d);
        assert_eq!(patch_known_backend(once.clone()), once);
    }

    #[test]
    fn test_adapt_without_parallelism() {
        let set = vec![descriptor(&["USE_DOUBLE", "NO_FINDBLAS", "AVOID_BLAS_SYR"], &[])];
        let out = adapt(set, &posix(), false);

        assert_eq!(out[0].compile_args, vec!["-O3", "-march=native", "-std=c99"]);
        assert!(out[0].link_args.is_empty());
        assert!(out[0].validate().is_ok());
    }

    #[test]
    fn test_adapt_runs_every_descriptor() {
        let set = vec![
            descriptor(&["USE_DOUBLE", "NO_FINDBLAS", "USE_BLAS_SYR"], &["-lopenblas"]),
            descriptor(&["USE_FLOAT", "NO_FINDBLAS", "USE_BLAS_SYR"], &["-lopenblas"]),
        ];
        let out = adapt(set, &posix(), true);

        assert_eq!(out.len(), 2);
        for d in &out {
            assert!(d.has_define(AVOID_BLAS_SYR));
            assert!(d.compile_args.contains(&"-fopenmp".to_string()));
        }
    }
}
