//! User-facing diagnostic messages.
//!
//! A failed run ends with one diagnostic block: the root cause, context
//! lines (failing command, exit code, captured output) and suggested fixes.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when nothing could be located in the registry.
    pub const PACKAGE_NOT_FOUND: &str = "Check the package name and version on the registry";

    /// Suggestion for network failures.
    pub const NETWORK: &str = "Check your network connection or the configured index URL";

    /// Suggestion when an install or build command fails.
    pub const COMMAND_FAILED: &str = "Re-run with --verbose to see every command and its output";

    /// Suggestion when the source tree has no recognized build system.
    pub const NO_BUILD_SYSTEM: &str =
        "The source tree needs a pyproject.toml or setup.py at its root";

    /// Suggestion for version-control failures.
    pub const VCS: &str = "Verify the repository URL and that the branch, tag or commit exists";
}

/// An error diagnostic with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Stable error code, e.g. `srcinstall::build::install_failed`
    pub code: Option<String>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            code: None,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Attach an error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
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
        let mut output = String::new();

        let severity_str = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };

        match &self.code {
            Some(code) => output.push_str(&format!("{}[{}]: {}\n", severity_str, code, self.message)),
            None => output.push_str(&format!("{}: {}\n", severity_str, self.message)),
        }

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        // Multi-line context (captured stderr) is indented as a block.
        for ctx in &self.context {
            let mut lines = ctx.lines();
            if let Some(first) = lines.next() {
                output.push_str(&format!("  = {}\n", first));
            }
            for line in lines {
                output.push_str(&format!("    {}\n", line));
            }
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
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
        let diag = Diagnostic::error("install command failed")
            .with_code("srcinstall::build::install_failed")
            .with_context("command: python3 setup.py install --prefix=/usr/local --root=/")
            .with_context("exit code: 1")
            .with_context("stderr:\nerror: invalid command\nsee --help")
            .with_suggestion(suggestions::COMMAND_FAILED);

        let output = diag.format(false);
        assert!(output.starts_with("error[srcinstall::build::install_failed]: install command failed"));
        assert!(output.contains("  = command: python3 setup.py install"));
        assert!(output.contains("  = stderr:\n    error: invalid command\n    see --help"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Re-run with --verbose"));
    }

    #[test]
    fn test_error_without_code_with_location() {
        let output = Diagnostic::error("bad archive")
            .with_location("/tmp/foo.tar.gz")
            .format(false);
        assert_eq!(output, "error: bad archive\n  --> /tmp/foo.tar.gz\n");
    }
}
