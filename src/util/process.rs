//! Subprocess execution utilities.
//!
//! Every external command (pip, setup.py, ldconfig, rpmbuild, dnf, rpm) goes
//! through a [`CommandRunner`] so pipeline steps can be exercised with a
//! scripted runner in tests.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::util::interrupt::InterruptFlag;

/// How often a running child is polled for exit, timeout or interrupt.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error from running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with exit code {}", display_code(*code))]
    Failed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut {
        command: String,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` was interrupted")]
    Interrupted { command: String },

    #[error("i/o error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

fn display_code(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none (killed by signal)".to_string())
}

impl ProcessError {
    /// The command line that failed.
    pub fn command(&self) -> &str {
        match self {
            ProcessError::Spawn { command, .. }
            | ProcessError::Failed { command, .. }
            | ProcessError::TimedOut { command, .. }
            | ProcessError::Interrupted { command }
            | ProcessError::Io { command, .. } => command,
        }
    }

    /// Captured `(stdout, stderr)`, when the command got far enough to produce any.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            ProcessError::Failed { stdout, stderr, .. }
            | ProcessError::TimedOut { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ProcessError::Interrupted { .. })
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        // Own process group, so a kill reaches the whole tree.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion, capturing output.
    ///
    /// The child is killed when `timeout` elapses or `interrupt` is set.
    /// A non-zero exit is *not* an error here; see [`CommandRunner::run_checked`].
    pub fn exec_with_limits(
        &self,
        timeout: Option<Duration>,
        interrupt: &InterruptFlag,
    ) -> Result<CommandOutput, ProcessError> {
        let command = self.display_command();
        if interrupt.is_set() {
            return Err(ProcessError::Interrupted { command });
        }

        let mut child = self
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        let outcome = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(source) => {
                    break Err(ProcessError::Io {
                        command: command.clone(),
                        source,
                    })
                }
            }

            if interrupt.is_set() {
                kill_tree(&mut child);
                return Err(ProcessError::Interrupted { command });
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    kill_tree(&mut child);
                    return Err(ProcessError::TimedOut {
                        command,
                        timeout: limit,
                        stdout: join_reader(stdout_reader),
                        stderr: join_reader(stderr_reader),
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        let status = outcome?;
        Ok(CommandOutput {
            code: status.code(),
            stdout: join_reader(stdout_reader),
            stderr: join_reader(stderr_reader),
        })
    }
}

/// Kill the child and everything in its process group, then reap it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: the child leads its own process group.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Runs external commands.
pub trait CommandRunner {
    /// Run the command and capture its output. Non-zero exit is returned, not raised.
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError>;

    /// Run the command and turn a non-zero exit into [`ProcessError::Failed`].
    fn run_checked(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError> {
        let output = self.run(cmd)?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(ProcessError::Failed {
                command: cmd.display_command(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}

/// Runs commands on the host with an optional timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Option<Duration>,
    interrupt: InterruptFlag,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>, interrupt: InterruptFlag) -> Self {
        SystemRunner { timeout, interrupt }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError> {
        tracing::debug!("Running: {}", cmd.display_command());
        let output = cmd.exec_with_limits(self.timeout, &self.interrupt)?;
        if !output.stdout.is_empty() {
            tracing::debug!("stdout: {}", output.stdout.trim_end());
        }
        if !output.stderr.is_empty() {
            tracing::debug!("stderr: {}", output.stderr.trim_end());
        }
        Ok(output)
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
