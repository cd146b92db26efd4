//! Subprocess execution for vendor command-line tools.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use fusion_driver_shared::errors::{FusionError, FusionResult};

/// A single command line: resolved program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as display strings (lossy for non-UTF-8).
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
///
/// Output is kept as raw bytes; vendor tools print host paths, which are
/// not guaranteed to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Runs an [`Invocation`] to completion.
///
/// Implementations return `Err` only when the process could not be run at
/// all; a non-zero exit is reported through [`ProcessOutput::status`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> FusionResult<ProcessOutput>;
}

/// Runs commands on the host with `std::process::Command`.
///
/// Blocks until the child exits. stdout and stderr are piped into separate
/// buffers; stdin is null so vendor tools never wait on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> FusionResult<ProcessOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                tracing::error!(
                    program = %invocation.program.display(),
                    error = %e,
                    "Failed to launch process"
                );
                FusionError::Process {
                    command: invocation.to_string(),
                    reason: e.to_string(),
                    status: None,
                    stderr: String::new(),
                }
            })?;

        Ok(ProcessOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status.code(),
        })
    }
}
