// External command execution with captured output
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Program plus argument vector. Never passed through a shell by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run this command through a privilege-elevation helper (`pkexec cmd args...`)
    pub fn elevated(self, helper: impl Into<String>) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: helper.into(),
            args,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of one finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, or -1 when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The stream worth showing to the operator: stdout on success, stderr otherwise
    pub fn message(&self) -> &str {
        if self.success() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Runs commands to completion. A nonzero exit is an `Ok` outcome;
/// only a process that could not be started is an error.
pub trait CommandExecutor {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutcome>;
}

/// Executor backed by `std::process::Command`. Blocks until the child exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutcome> {
        debug!("Running: {}", spec);

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| CommandError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let outcome = CommandOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("{} exited with {}", spec.program, outcome.exit_code);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevated_prefixes_helper() {
        let spec = CommandSpec::new("swapoff").arg("/swapfile").elevated("pkexec");
        assert_eq!(spec.program, "pkexec");
        assert_eq!(spec.args, vec!["swapoff", "/swapfile"]);
        assert_eq!(spec.to_string(), "pkexec swapoff /swapfile");
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("sh").args(["-c", "echo hi"]);
        assert_eq!(spec.to_string(), "sh -c 'echo hi'");
    }

    #[test]
    fn test_message_picks_stream() {
        let ok = CommandOutcome {
            exit_code: 0,
            stdout: "done\n".to_string(),
            stderr: "noise".to_string(),
        };
        assert_eq!(ok.message(), "done");

        let failed = CommandOutcome {
            exit_code: 3,
            ..ok
        };
        assert!(!failed.success());
        assert_eq!(failed.message(), "noise");
    }

    #[test]
    fn test_system_executor_captures_output() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 4"]);
        let outcome = SystemExecutor.run(&spec).unwrap();
        assert_eq!(outcome.exit_code, 4);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[test]
    fn test_system_executor_success() {
        let outcome = SystemExecutor
            .run(&CommandSpec::new("sh").args(["-c", "true"]))
            .unwrap();
        assert!(outcome.success());
    }

    #[test]
    fn test_system_executor_spawn_failure() {
        let err = SystemExecutor
            .run(&CommandSpec::new("/nonexistent/swap-resizer-binary"))
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
