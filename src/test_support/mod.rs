//! Test utilities and mocks for srcinstall unit tests.
//!
//! The main piece is [`RecordingRunner`], a scripted [`CommandRunner`] that
//! records every command line (and working directory) it is asked to run and
//! answers from a list of expectations.
//!
//! # Example
//!
//! ```rust,ignore
//! use srcinstall::test_support::{RecordingRunner, CommandPattern};
//!
//! #[test]
//! fn test_example() {
//!     let runner = RecordingRunner::new()
//!         .expect_prefix("python3 -m pip install requests", CommandOutput::failure(1, "boom"));
//!
//!     // Hand `&runner` to the component under test...
//!     assert_eq!(runner.calls().len(), 1);
//! }
//! ```

pub mod fixtures;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder, ProcessError};

/// Pattern for matching command lines.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the full command line.
    Exact(String),
    /// Match if the command line starts with the prefix.
    StartsWith(String),
    /// Match if the command line contains the substring.
    Contains(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Any => true,
        }
    }
}

/// What a matched command does.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Finish with this output.
    Output(CommandOutput),
    /// Behave as if the run was interrupted mid-command.
    Interrupted,
}

type Effect = Arc<dyn Fn(&ProcessBuilder) + Send + Sync>;

/// Expectation for a command execution.
#[derive(Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub result: Scripted,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
    effect: Option<Effect>,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, result: Scripted) -> Self {
        CommandExpectation {
            pattern,
            result,
            times: None,
            used: 0,
            effect: None,
        }
    }

    /// Limit how often this expectation can match.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Run `effect` when the command matches, e.g. to create files a real tool would produce.
    pub fn with_effect(mut self, effect: impl Fn(&ProcessBuilder) + Send + Sync + 'static) -> Self {
        self.effect = Some(Arc::new(effect));
        self
    }

    fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// One recorded command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub cwd: Option<PathBuf>,
}

/// Scripted command runner.
///
/// Commands that match no expectation succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    expectations: Mutex<Vec<CommandExpectation>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    /// Answer an exact command line.
    pub fn expect(self, cmd: &str, output: CommandOutput) -> Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            Scripted::Output(output),
        ))
    }

    /// Answer command lines starting with `prefix`.
    pub fn expect_prefix(self, prefix: &str, output: CommandOutput) -> Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            Scripted::Output(output),
        ))
    }

    /// Answer command lines containing `substring`.
    pub fn expect_contains(self, substring: &str, output: CommandOutput) -> Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            Scripted::Output(output),
        ))
    }

    pub fn expect_pattern(self, expectation: CommandExpectation) -> Self {
        if let Ok(mut expectations) = self.expectations.lock() {
            expectations.push(expectation);
        }
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.recorded().into_iter().map(|c| c.command).collect()
    }

    /// Full call records including working directories.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether any recorded command line starts with `prefix`.
    pub fn ran(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError> {
        let command = cmd.display_command();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                command: command.clone(),
                cwd: cmd.get_cwd().map(|p| p.to_path_buf()),
            });
        }

        let matched = {
            let mut expectations = match self.expectations.lock() {
                Ok(e) => e,
                Err(poisoned) => poisoned.into_inner(),
            };
            expectations
                .iter_mut()
                .find(|e| e.available() && e.pattern.matches(&command))
                .map(|e| {
                    e.used += 1;
                    (e.result.clone(), e.effect.clone())
                })
        };

        match matched {
            Some((result, effect)) => {
                if let Some(effect) = effect {
                    effect(cmd);
                }
                match result {
                    Scripted::Output(output) => Ok(output),
                    Scripted::Interrupted => Err(ProcessError::Interrupted { command }),
                }
            }
            None => Ok(CommandOutput::success("")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        assert!(CommandPattern::Exact("ldconfig".into()).matches("ldconfig"));
        assert!(!CommandPattern::Exact("ldconfig".into()).matches("ldconfig -v"));
        assert!(CommandPattern::StartsWith("rpm -q".into()).matches("rpm -q gcc"));
        assert!(CommandPattern::Contains("install".into()).matches("dnf install -y gcc"));
        assert!(CommandPattern::Any.matches("anything"));
    }

    #[test]
    fn test_runner_records_and_answers() {
        let runner = RecordingRunner::new()
            .expect_prefix("rpm -q gcc", CommandOutput::failure(1, "package gcc is not installed"));

        let missing = runner
            .run(&ProcessBuilder::new("rpm").args(["-q", "gcc"]))
            .unwrap();
        let present = runner
            .run(&ProcessBuilder::new("rpm").args(["-q", "make"]).cwd("/tmp"))
            .unwrap();

        assert!(!missing.is_success());
        assert!(present.is_success());
        assert_eq!(runner.calls(), vec!["rpm -q gcc", "rpm -q make"]);
        assert_eq!(runner.recorded()[1].cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_limited_expectation_falls_through() {
        let runner = RecordingRunner::new().expect_pattern(
            CommandExpectation::new(
                CommandPattern::Any,
                Scripted::Output(CommandOutput::failure(2, "first")),
            )
            .times(1),
        );

        let cmd = ProcessBuilder::new("true");
        assert!(!runner.run(&cmd).unwrap().is_success());
        assert!(runner.run(&cmd).unwrap().is_success());
    }

    #[test]
    fn test_scripted_interrupt() {
        let runner = RecordingRunner::new().expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith("rpmbuild".into()),
            Scripted::Interrupted,
        ));

        let err = runner
            .run_checked(&ProcessBuilder::new("rpmbuild").arg("-ba"))
            .unwrap_err();
        assert!(err.is_interrupted());
    }
}
