//! Build event types for JSON output.
//!
//! With `--json` the build command prints one event per line
//! on stdout instead of the human-readable progress display.
//!
//! # Event Types
//!
//! - `build-started`: configuration finished and emission begins
//! - `diagnostic`: an advisory attached to the plan
//! - `compiler-artifact`: an extension module was linked
//! - `compiler-error`: an extension module failed to build
//! - `build-finished`: every artifact has been attempted

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::native::ArtifactOutcome;
use crate::util::diagnostic::Diagnostic;

/// A build event emitted during emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    #[serde(rename = "build-started")]
    BuildStarted {
        /// Compiler the plan was configured for
        compiler: String,
        target_triple: String,
        /// Artifact names, in plan order
        artifacts: Vec<String>,
    },

    /// An extension module was produced.
    #[serde(rename = "compiler-artifact")]
    CompilerArtifact {
        artifact: String,
        filenames: Vec<PathBuf>,
    },

    /// An extension module failed; siblings are unaffected.
    #[serde(rename = "compiler-error")]
    CompilerError { artifact: String, message: String },

    #[serde(rename = "diagnostic")]
    Diagnostic {
        /// Severity level ("error", "warning", "note")
        level: String,
        message: String,
    },

    #[serde(rename = "build-finished")]
    BuildFinished {
        /// True only when every artifact was built
        success: bool,
        duration_ms: u64,
        artifacts_built: u64,
    },
}

impl BuildEvent {
    pub fn started(
        compiler: impl Into<String>,
        target_triple: impl Into<String>,
        artifacts: Vec<String>,
    ) -> Self {
        BuildEvent::BuildStarted {
            compiler: compiler.into(),
            target_triple: target_triple.into(),
            artifacts,
        }
    }

    /// Event for one finished artifact.
    pub fn from_outcome(outcome: &ArtifactOutcome) -> Self {
        match outcome {
            ArtifactOutcome::Built { name, path } => BuildEvent::CompilerArtifact {
                artifact: name.clone(),
                filenames: vec![path.clone()],
            },
            ArtifactOutcome::Failed { name, message } => BuildEvent::CompilerError {
                artifact: name.clone(),
                message: message.clone(),
            },
        }
    }

    pub fn diagnostic(diagnostic: &Diagnostic) -> Self {
        BuildEvent::Diagnostic {
            level: diagnostic.severity.to_string(),
            message: diagnostic.message.clone(),
        }
    }

    pub fn finished(success: bool, duration_ms: u64, artifacts_built: u64) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            artifacts_built,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
