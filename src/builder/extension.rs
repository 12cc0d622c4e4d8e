//! Extension descriptor construction.
//!
//! Turns a backend selection into the descriptor of one precision variant.
//! Both variants share everything except the precision macro and the binding
//! source file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::builder::backend::{BackendSelection, BindingVariant};
use crate::core::descriptor::{Define, ExtensionDescriptor, Precision, BINDING_MODE_MACRO};

/// Where the binding and native sources live, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionLayout {
    /// Python package the artifacts belong to
    pub package: String,
    /// Directory holding the `.pyx` binding sources
    pub binding_dir: PathBuf,
    /// Directory holding the native C sources (also an include dir)
    pub source_dir: PathBuf,
    /// Native source file names, in compile order
    pub native_sources: Vec<String>,
}

impl Default for ExtensionLayout {
    fn default() -> Self {
        ExtensionLayout {
            package: "cmfrec".to_string(),
            binding_dir: PathBuf::from("cmfrec"),
            source_dir: PathBuf::from("src"),
            native_sources: [
                "collective.c",
                "common.c",
                "offsets.c",
                "helpers.c",
                "lbfgs.c",
                "cblas_wrappers.c",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ExtensionLayout {
    /// Binding source for a precision and binding variant.
    pub fn binding_source(&self, precision: Precision, binding: BindingVariant) -> PathBuf {
        let file = match binding {
            BindingVariant::DirectLink => format!("cfuns_{}.pyx", precision),
            BindingVariant::ScipyBlas => format!("cfuns_{}_plusblas.pyx", precision),
        };
        self.binding_dir.join(file)
    }

    /// Native source paths, in order.
    pub fn native_source_paths(&self) -> Vec<PathBuf> {
        self.native_sources
            .iter()
            .map(|s| self.source_dir.join(s))
            .collect()
    }

    /// Dotted artifact name for a precision.
    pub fn artifact_name(&self, precision: Precision) -> String {
        format!("{}.wrapper_{}", self.package, precision)
    }
}

/// Header directories of the host interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderPaths {
    /// NumPy C headers
    pub array_include: PathBuf,
    /// Python C headers, when known
    pub python_include: Option<PathBuf>,
}

/// Build the descriptor of one precision variant.
pub fn build(
    precision: Precision,
    selection: &BackendSelection,
    layout: &ExtensionLayout,
    headers: &HeaderPaths,
) -> ExtensionDescriptor {
    let mut sources = vec![layout.binding_source(precision, selection.binding)];
    sources.extend(layout.native_source_paths());

    let mut include_dirs = vec![headers.array_include.clone(), layout.source_dir.clone()];
    for dir in &selection.include_dirs {
        if !include_dirs.contains(dir) {
            include_dirs.push(dir.clone());
        }
    }
    if let Some(python) = &headers.python_include {
        if !include_dirs.contains(python) {
            include_dirs.push(python.clone());
        }
    }

    let mut defines = vec![
        Define::flag(BINDING_MODE_MACRO),
        Define::flag(precision.macro_name()),
    ];
    for define in &selection.defines {
        if !defines.iter().any(|d| d.name == define.name) {
            defines.push(define.clone());
        }
    }

    ExtensionDescriptor {
        name: layout.artifact_name(precision),
        precision,
        sources,
        include_dirs,
        defines,
        compile_args: selection.compile_args.clone(),
        link_args: selection.link_args.clone(),
    }
}
