//! Shell command and script execution inside the workspace.

use crate::error::ApiError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::info;
use uuid::Uuid;

/// Accepted language tags with their interpreter command and script file
/// extension. Tags match case-insensitively; this order is the order shown
/// in the unsupported-language error.
pub const LANGUAGES: &[(&str, &str, &str)] = &[
    ("python", "python3", ".py"),
    ("python3", "python3", ".py"),
    ("py", "python3", ".py"),
    ("bash", "bash", ".sh"),
    ("sh", "sh", ".sh"),
    ("node", "node", ".js"),
    ("javascript", "node", ".js"),
    ("js", "node", ".js"),
];

/// Captured output of a finished child process.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Interpreter command and file extension for a language tag, if supported.
pub fn language_runner(language: &str) -> Option<(&'static str, &'static str)> {
    let tag = language.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(name, _, _)| *name == tag)
        .map(|(_, runner, ext)| (*runner, *ext))
}

fn supported_languages() -> Vec<&'static str> {
    LANGUAGES.iter().map(|(name, _, _)| *name).collect()
}

/// Run a command line through the system shell with the workspace (or any
/// other directory) as cwd, capturing stdout and stderr. The child is killed
/// once `timeout_secs` elapses.
pub async fn run_shell(
    command: &str,
    cwd: &Path,
    timeout_secs: u64,
) -> Result<ExecOutcome, ApiError> {
    info!("exec: {:?} (timeout {}s)", command, timeout_secs);

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // New process group, so the timeout path can kill everything the shell
    // forked and not just the shell itself.
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|e| ApiError::Internal(e.to_string()))?;
    let pid = child.id();

    let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ApiError::Internal(e.to_string()))?,
        Err(_) => {
            // The dropped wait future kills the shell via kill_on_drop; the
            // group kill sweeps up whatever it forked.
            kill_process_group(pid);
            return Err(ApiError::Timeout("Command timed out".to_string()));
        }
    };

    let outcome = ExecOutcome {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: exit_code(output.status),
    };
    info!("exec finished: exit={}", outcome.exit_code);
    Ok(outcome)
}

/// Write `code` to a fresh `_run_<hex>` temp file in the workspace and run
/// it with the interpreter mapped to `language`. Returns the outcome and the
/// temp file name.
///
/// The temp file stays in the workspace unless `keep_temp_files` is off;
/// removal failures are ignored.
pub async fn run_script(
    language: &str,
    code: &str,
    workspace: &Path,
    timeout_secs: u64,
    keep_temp_files: bool,
) -> Result<(ExecOutcome, String), ApiError> {
    let Some((runner, ext)) = language_runner(language) else {
        return Err(ApiError::BadRequest(format!(
            "Unsupported language: {}. Supported: {:?}",
            language,
            supported_languages()
        )));
    };

    let id = Uuid::new_v4().simple().to_string();
    let temp_file = format!("_run_{}{}", &id[..8], ext);
    tokio::fs::write(workspace.join(&temp_file), code).await?;
    info!("run_code: {} via {} -> {}", language, runner, temp_file);

    let result = run_shell(&format!("{} {}", runner, temp_file), workspace, timeout_secs)
        .await
        .map_err(|err| match err {
            ApiError::Timeout(_) => ApiError::Timeout("Code execution timed out".to_string()),
            other => other,
        });

    if !keep_temp_files {
        let _ = tokio::fs::remove_file(workspace.join(&temp_file)).await;
    }

    result.map(|outcome| (outcome, temp_file))
}

/// SIGKILL the child's whole process group. The child is its own group
/// leader, so this reaches any processes the shell forked; if they are all
/// gone already the kill is a no-op.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Exit code of a finished child: the normal exit status, or the negated
/// signal number when the child was killed by a signal.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
