//! Committing the run log to the repository it lives in.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, info};

/// Default commit message for the run log.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update contact archival log";

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to run git {step}: {source}")]
    Spawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("git {step} exited with {status}: {stderr}")]
    Git {
        step: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// `git add` + `git commit` (+ optionally `git push`) of one log file.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    pub repo_dir: PathBuf,
    pub log_file: PathBuf,
    pub message: String,
    pub push: bool,
}

impl LogPublisher {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        let log_file = log_file.into();
        let repo_dir = log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            repo_dir,
            log_file,
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            push: true,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Commit the log. Returns `Ok(false)` when the log had no changes.
    ///
    /// Both the change check and the commit are limited to the log file, so
    /// whatever else is staged in the repository is left as it was.
    pub async fn publish(&self) -> Result<bool, PublishError> {
        let log = self
            .log_file
            .file_name()
            .unwrap_or(self.log_file.as_os_str());

        self.git("add", &[OsStr::new("add"), log]).await?;

        let staged = self
            .run(
                "diff",
                &[
                    OsStr::new("diff"),
                    OsStr::new("--cached"),
                    OsStr::new("--quiet"),
                    OsStr::new("--"),
                    log,
                ],
            )
            .await?;
        if staged.status.success() {
            debug!("Log {} unchanged, nothing to commit", self.log_file.display());
            return Ok(false);
        }

        self.git(
            "commit",
            &[
                OsStr::new("commit"),
                OsStr::new("-m"),
                OsStr::new(&self.message),
                OsStr::new("--"),
                log,
            ],
        )
        .await?;
        if self.push {
            self.git("push", &[OsStr::new("push")]).await?;
        }
        info!(
            "Published {} ({})",
            self.log_file.display(),
            if self.push { "committed and pushed" } else { "committed" }
        );
        Ok(true)
    }

    async fn run(&self, step: &'static str, args: &[&OsStr]) -> Result<Output, PublishError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|source| PublishError::Spawn { step, source })
    }

    /// Run a git step that must succeed.
    async fn git(&self, step: &'static str, args: &[&OsStr]) -> Result<(), PublishError> {
        let output = self.run(step, args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PublishError::Git {
                step,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_dir_defaults_to_log_parent() {
        let p = LogPublisher::new("/var/log/prune/run.log");
        assert_eq!(p.repo_dir, PathBuf::from("/var/log/prune"));
        let bare = LogPublisher::new("run.log");
        assert_eq!(bare.repo_dir, PathBuf::from("."));
        assert!(bare.push);
        assert_eq!(bare.message, DEFAULT_COMMIT_MESSAGE);
    }
}
