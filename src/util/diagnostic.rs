//! User-facing diagnostic messages.
//!
//! Every error shown to the user carries its root cause as context lines and
//! a numbered list of concrete fixes.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn label(&self, color: bool) -> &'static str {
        match (self, color) {
            (Severity::Error, true) => "\x1b[1;31merror\x1b[0m",
            (Severity::Warning, true) => "\x1b[1;33mwarning\x1b[0m",
            (Severity::Note, true) => "\x1b[1;36mnote\x1b[0m",
            (Severity::Error, false) => "error",
            (Severity::Warning, false) => "warning",
            (Severity::Note, false) => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(false))
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    /// Suggested fixes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Related file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = format!("{}: {}\n", self.severity.label(color), self.message);

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            output.push_str(&format!("\n{}: consider:\n", help));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag =
            Diagnostic::error("BLAS discovery was requested but no backend could be discovered")
                .with_context("pkg-config: none of [openblas] found")
                .with_suggestion("Install OpenBLAS")
                .with_suggestion("Pass `--blas-link-arg`");

        let output = diag.format(false);
        assert!(output.starts_with("error: BLAS discovery"));
        assert!(output.contains("  = pkg-config: none of [openblas] found"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Install OpenBLAS"));
        assert!(output.contains("2. Pass"));
    }

    #[test]
    fn test_warning_without_suggestions() {
        let diag = Diagnostic::warning("building without OpenMP").with_location("setup.cfg");
        let output = diag.format(false);
        assert_eq!(output, "warning: building without OpenMP\n  --> setup.cfg\n");
        assert!(!output.contains("help"));
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let json = serde_json::to_value(Diagnostic::note("hello")).unwrap();
        assert_eq!(json["severity"], "note");
        assert!(json.get("context").is_none());
        assert!(json.get("location").is_none());
    }
}
