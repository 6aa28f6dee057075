// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! External command execution, unprivileged and privilege-escalated, bounded
//! by a [`Context`] deadline.

use crate::ctx::Context;
use crate::error::{Error, Result};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Executes system commands. Both paths capture standard error so failures
/// surface the process's own diagnostics.
pub trait CommandRunner {
    fn run(&self, ctx: &Context, program: &str, arguments: &[&str]) -> Result<()>;
    fn run_privileged(&self, ctx: &Context, program: &str, arguments: &[&str]) -> Result<()>;
}

/// Runs commands against the local operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsCommandRunner;

impl CommandRunner for OsCommandRunner {
    fn run(&self, ctx: &Context, program: &str, arguments: &[&str]) -> Result<()> {
        run_bounded(ctx, program, arguments)
    }

    fn run_privileged(&self, ctx: &Context, program: &str, arguments: &[&str]) -> Result<()> {
        match std::env::consts::OS {
            "macos" | "linux" => {
                let mut sudo_arguments = vec![program];
                sudo_arguments.extend_from_slice(arguments);
                run_bounded(ctx, "sudo", &sudo_arguments)
            }
            other => Err(Error::PrivilegedExecutionUnsupported(other.to_string())),
        }
    }
}

/// Spawn the process and poll until it exits, the context's deadline passes,
/// or the context is cancelled. Timed-out and cancelled children are killed
/// and reaped.
fn run_bounded(ctx: &Context, program: &str, arguments: &[&str]) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let mut child = Command::new(program)
        .args(arguments)
        .stdin(Stdio::inherit()) // sudo may prompt for a password
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Command {
            command: program.to_string(),
            stderr: e.to_string(),
        })?;

    let started = std::time::Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => {
                if ctx.is_cancelled() {
                    let _ = child.kill();
                    let _ = child.wait();
                    return match ctx.deadline() {
                        Some(_) => Err(Error::CommandTimeout {
                            command: program.to_string(),
                            seconds: started.elapsed().as_secs(),
                        }),
                        None => Err(Error::Cancelled),
                    };
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(Error::Command {
                    command: program.to_string(),
                    stderr: e.to_string(),
                });
            }
        }
    }

    let output = child.wait_with_output().map_err(|e| Error::Command {
        command: program.to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(Error::Command {
            command: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_succeeds_for_true() {
        let runner = OsCommandRunner;
        assert!(runner.run(&Context::background(), "true", &[]).is_ok());
    }

    #[test]
    fn test_run_captures_stderr_on_failure() {
        let runner = OsCommandRunner;
        let err = runner
            .run(&Context::background(), "ls", &["/definitely-not-a-path"])
            .unwrap_err();
        match err {
            Error::Command { command, stderr } => {
                assert_eq!(command, "ls");
                assert!(!stderr.is_empty());
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_context_fails_before_spawn() {
        let runner = OsCommandRunner;
        let ctx = Context::background();
        ctx.cancel();
        let err = runner.run(&ctx, "true", &[]).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_deadline_kills_long_running_command() {
        let runner = OsCommandRunner;
        let ctx = Context::with_timeout(Duration::from_millis(200));
        let err = runner.run(&ctx, "sleep", &["10"]).unwrap_err();
        assert!(matches!(err, Error::CommandTimeout { .. }));
    }
}
