//! Shells out to run a fully-materialized compile or link command.
//!
//! The original tool passes the command straight to libc `system()`; the
//! closest Rust equivalent that keeps the same "whatever the platform shell
//! understands" contract is invoking the platform shell explicitly.

use std::process::Command;

use cfg_if::cfg_if;
use tracing::trace;

use crate::error::{BuildError, Result};

/// Runs `command` through the platform shell, logging it first (the
/// original tool prints every command line before running it). Returns an
/// error carrying the child's exit status on non-zero exit.
pub fn run(command: &str) -> Result<()> {
    println!("{command}");

    let status = shell_command(command)
        .status()
        .map_err(|e| BuildError::msg(format!("failed to spawn `{command}`: {e}")))?;

    trace!(?status, command, "subprocess exited");

    if status.success() {
        Ok(())
    } else {
        Err(BuildError::Subprocess { command: command.to_string(), status })
    }
}

/// The original shells out via libc `system()`, which picks `/bin/sh` or
/// `cmd.exe` depending on platform; this is the same `#if defined(_WIN32)`
/// branch translated with `cfg_if` instead of a preprocessor directive.
fn shell_command(command: &str) -> Command {
    cfg_if! {
        if #[cfg(target_os = "windows")] {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
        }
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_returns_ok() {
        run("true").unwrap();
    }

    #[test]
    fn failing_command_is_a_subprocess_error() {
        let err = run("exit 3").unwrap_err();
        assert!(matches!(err, BuildError::Subprocess { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}
