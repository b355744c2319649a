//! Subprocess plumbing for the vendor command-line tool.
//!
//! Every vault operation goes through [`run_command`]. Arguments are passed
//! as an argv vector, so titles and file names never reach a shell.

use crate::{ReattachError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Executes a command and returns stdout as a string.
///
/// # Arguments
///
/// - `program`: Command to execute (e.g., "op" or an absolute path)
/// - `args`: Command arguments
/// - `env`: Extra environment variables
///
/// # Errors
///
/// Returns [`ReattachError::BackendNotInstalled`] if the program cannot be
/// found and [`ReattachError::CommandFailed`] if:
/// - Exit code is non-zero
/// - Output is not valid UTF-8
pub async fn run_command(program: &str, args: &[&str], env: &[(&str, &str)]) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::trace!(program, ?args, "running command");

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReattachError::BackendNotInstalled(format!("{} command not found", program))
        } else {
            ReattachError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReattachError::CommandFailed(format!(
            "{} failed with exit code {}: {}",
            program,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout).map_err(|e| {
        ReattachError::Other(anyhow::anyhow!("Invalid UTF-8 in command output: {}", e))
    })
}

/// Checks if a command-line tool is available.
///
/// A program given as a path (containing a separator) must exist on disk;
/// a bare name is looked up in `PATH`.
///
/// # Example
///
/// ```no_run
/// use docreattach::cli::check_command_exists;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> docreattach::Result<()> {
///     if !check_command_exists("op").await? {
///         println!("1Password CLI is not installed");
///     }
///     Ok(())
/// }
/// ```
pub async fn check_command_exists(program: &str) -> Result<bool> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        return Ok(Path::new(program).is_file());
    }

    let output = Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(ReattachError::Io)?;

    Ok(output.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        let output = run_command("echo", &["hello"], &[]).await.unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_not_found() {
        let result = run_command("nonexistent-command-12345", &[], &[]).await;
        assert!(matches!(result, Err(ReattachError::BackendNotInstalled(_))));
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let result = run_command("sh", &["-c", "echo boom >&2; exit 3"], &[]).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("exit code 3"));
        assert!(err.contains("boom"));
    }

    #[tokio::test]
    async fn test_run_command_with_env() {
        let output = run_command("printenv", &["TEST_VAR"], &[("TEST_VAR", "test-value")])
            .await
            .unwrap();
        assert_eq!(output.trim(), "test-value");
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_expanded() {
        let output = run_command("echo", &["$(whoami); ls"], &[]).await.unwrap();
        assert_eq!(output.trim(), "$(whoami); ls");
    }

    #[tokio::test]
    async fn test_check_command_exists() {
        assert!(check_command_exists("echo").await.unwrap());
        assert!(!check_command_exists("nonexistent-command-12345")
            .await
            .unwrap());
        assert!(!check_command_exists("/nonexistent/dir/op").await.unwrap());
    }
}
