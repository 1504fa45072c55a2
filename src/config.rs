//! Service configuration, read once from the environment at startup.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Subdirectory of the workspace served without authentication at `/public`.
pub const PUBLIC_SUBDIR: &str = "public";

/// Immutable service configuration. Built once in `main` and shared through
/// the application state; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for command execution and relative file paths.
    pub workspace: PathBuf,
    /// Shared secret expected in the `X-Sandbox-Token` header.
    pub token: String,
    /// Keep `/run_code` temp files in the workspace after the run.
    pub keep_temp_files: bool,
    /// Reject paths that resolve outside the workspace root.
    pub confine_paths: bool,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    ///
    /// The default token is a placeholder; set `SANDBOX_TOKEN` in any
    /// deployment that is reachable by anyone but you.
    pub fn from_env() -> Self {
        Self {
            workspace: PathBuf::from(
                env::var("WORKSPACE_DIR").unwrap_or_else(|_| "/workspace".to_string()),
            ),
            token: env::var("SANDBOX_TOKEN").unwrap_or_else(|_| "123456".to_string()),
            keep_temp_files: env::var("SANDBOX_KEEP_TEMP")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            confine_paths: env::var("SANDBOX_CONFINE_PATHS")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                == "true",
        }
    }

    /// Create the workspace root and its public subdirectory if missing, and
    /// pin `workspace` to its canonical absolute form so every child process
    /// and path join starts from the same base.
    pub fn ensure_workspace(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.workspace)?;
        self.workspace = self.workspace.canonicalize()?;
        fs::create_dir_all(self.public_dir())?;
        Ok(())
    }

    /// Directory served at `/public`.
    pub fn public_dir(&self) -> PathBuf {
        self.workspace.join(PUBLIC_SUBDIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_workspace_creates_root_and_public() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            workspace: dir.path().join("ws"),
            token: "t".to_string(),
            keep_temp_files: true,
            confine_paths: false,
        };
        config.ensure_workspace().unwrap();
        assert!(config.workspace.is_dir());
        assert!(config.workspace.is_absolute());
        assert!(config.public_dir().is_dir());
    }

    #[test]
    fn ensure_workspace_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            workspace: dir.path().to_path_buf(),
            token: "t".to_string(),
            keep_temp_files: true,
            confine_paths: false,
        };
        config.ensure_workspace().unwrap();
        let first = config.workspace.clone();
        config.ensure_workspace().unwrap();
        assert_eq!(config.workspace, first);
    }
}
