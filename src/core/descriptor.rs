//! Extension artifact descriptors.
//!
//! An `ExtensionDescriptor` is the complete compile/link configuration of one
//! compiled extension module. A build always produces exactly two, one per
//! [`Precision`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker macro: the native sources are compiled for the Python binding.
pub const BINDING_MODE_MACRO: &str = "_FOR_PYTHON";
/// Discovery-backed BLAS is linked.
pub const USE_FINDBLAS: &str = "USE_FINDBLAS";
/// No discovery-backed BLAS.
pub const NO_FINDBLAS: &str = "NO_FINDBLAS";
/// Use the backend's native `syr` routine.
pub const USE_BLAS_SYR: &str = "USE_BLAS_SYR";
/// Route around the backend's `syr` routine.
pub const AVOID_BLAS_SYR: &str = "AVOID_BLAS_SYR";

/// Numeric precision of an extension variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Single precision (`float`)
    Float,
    /// Double precision (`double`)
    Double,
}

impl Precision {
    /// Both variants, in build order.
    pub const ALL: [Precision; 2] = [Precision::Double, Precision::Float];

    /// Lowercase name used in file and artifact names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Float => "float",
            Precision::Double => "double",
        }
    }

    /// The precision-selecting macro.
    pub fn macro_name(&self) -> &'static str {
        match self {
            Precision::Float => "USE_FLOAT",
            Precision::Double => "USE_DOUBLE",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float" | "single" | "f32" => Ok(Precision::Float),
            "double" | "f64" => Ok(Precision::Double),
            _ => Err(format!(
                "invalid precision '{}'; expected 'float' or 'double'",
                s
            )),
        }
    }
}

/// A preprocessor macro definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Define {
    /// A macro without a value (`-DNAME`).
    pub fn flag(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    /// A macro with a value (`-DNAME=value`).
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Render as a GCC-style flag.
    pub fn to_flag(&self) -> String {
        match &self.value {
            Some(v) => format!("-D{}={}", self.name, v),
            None => format!("-D{}", self.name),
        }
    }
}

/// Violation of a descriptor invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("expected exactly one of {expected:?}, found {found:?}")]
    MacroCount {
        expected: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("precision macro `{found}` does not match {precision} variant")]
    PrecisionMismatch { precision: Precision, found: String },
}

/// Complete configuration of one extension artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    /// Dotted module name (e.g. `cmfrec.wrapper_double`)
    pub name: String,
    /// Precision variant this artifact implements
    pub precision: Precision,
    /// Source files, binding source first
    pub sources: Vec<PathBuf>,
    /// Include directories
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor macros, in definition order, names unique
    pub defines: Vec<Define>,
    /// Extra compile arguments
    pub compile_args: Vec<String>,
    /// Extra link arguments
    pub link_args: Vec<String>,
}

impl ExtensionDescriptor {
    /// Whether a macro with this name is defined.
    pub fn has_define(&self, name: &str) -> bool {
        self.defines.iter().any(|d| d.name == name)
    }

    /// Names of all defined macros.
    pub fn define_names(&self) -> impl Iterator<Item = &str> {
        self.defines.iter().map(|d| d.name.as_str())
    }

    /// Return a copy with `define` added, unless a macro of that name exists.
    pub fn with_define(mut self, define: Define) -> Self {
        if !self.has_define(&define.name) {
            self.defines.push(define);
        }
        self
    }

    /// Return a copy with every macro named `name` removed.
    pub fn without_define(mut self, name: &str) -> Self {
        self.defines.retain(|d| d.name != name);
        self
    }

    /// Module part of the dotted name (`wrapper_double`).
    pub fn module_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Package path of the dotted name (`cmfrec`), if any.
    pub fn package_path(&self) -> Option<PathBuf> {
        let (package, _) = self.name.rsplit_once('.')?;
        Some(package.split('.').collect())
    }

    /// Check the macro invariants every finished descriptor must satisfy.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        self.exactly_one(&["USE_DOUBLE", "USE_FLOAT"])?;
        self.exactly_one(&[USE_FINDBLAS, NO_FINDBLAS])?;
        self.exactly_one(&[USE_BLAS_SYR, AVOID_BLAS_SYR])?;

        let expected = self.precision.macro_name();
        if !self.has_define(expected) {
            let found = self
                .define_names()
                .find(|n| *n == "USE_DOUBLE" || *n == "USE_FLOAT")
                .unwrap_or_default()
                .to_string();
            return Err(DescriptorError::PrecisionMismatch {
                precision: self.precision,
                found,
            });
        }

        Ok(())
    }

    fn exactly_one(&self, names: &[&'static str]) -> Result<(), DescriptorError> {
        let found: Vec<String> = self
            .defines
            .iter()
            .filter(|d| names.contains(&d.name.as_str()))
            .map(|d| d.name.clone())
            .collect();

        if found.len() == 1 {
            Ok(())
        } else {
            Err(DescriptorError::MacroCount {
                expected: names.to_vec(),
                found,
            })
        }
    }
}
