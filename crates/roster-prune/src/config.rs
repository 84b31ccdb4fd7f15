//! Run configuration with the defaults the pruning job ships with.
//!
//! [`PrunerConfig`] gathers everything the binary needs and converts it into
//! library types via [`build_client`](PrunerConfig::build_client),
//! [`settings`](PrunerConfig::settings), and
//! [`publisher`](PrunerConfig::publisher).

use std::path::PathBuf;
use std::time::Duration;

use crate::api::{ApiEndpoints, RetryConfig, WildApricotClient};
use crate::archiver::DEFAULT_ATTRIBUTION;
use crate::error::ApiError;
use crate::plan::{DEFAULT_CONTACT_TARGET, DEFAULT_SAFETY_BUFFER};
use crate::publish::{DEFAULT_COMMIT_MESSAGE, LogPublisher};
use crate::pruner::PruneSettings;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "WA_API_KEY";

/// Default run-log path, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "wa_contact_archive.log";

#[derive(Debug, Clone)]
pub struct PrunerConfig {
    /// Contact quota to prune down to. Default: `190`.
    pub target: usize,
    /// Headroom over the unarchivable minimum. Default: `10`.
    pub buffer: usize,
    /// Name written into archival notes.
    pub attribution: String,
    /// Read and decide, but never write contacts.
    pub dry_run: bool,
    /// Append-only run log.
    pub log_file: PathBuf,
    /// Tracing filter used when `RUST_LOG` is unset. Default: `"info"`.
    pub log_filter: String,
    /// Commit the run log after the run.
    pub publish_log: bool,
    /// Push after committing the run log.
    pub push_log: bool,
    pub commit_message: String,
    pub endpoints: ApiEndpoints,
    pub timeout: Duration,
    /// Retries for transient read failures. Default: `0`.
    pub retries: u32,
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_CONTACT_TARGET,
            buffer: DEFAULT_SAFETY_BUFFER,
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            dry_run: false,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_filter: "info".to_string(),
            publish_log: false,
            push_log: true,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            endpoints: ApiEndpoints::default(),
            timeout: Duration::from_secs(60),
            retries: 0,
        }
    }
}

impl PrunerConfig {
    pub fn settings(&self) -> PruneSettings {
        PruneSettings {
            target: self.target,
            buffer: self.buffer,
            attribution: self.attribution.clone(),
            dry_run: self.dry_run,
        }
    }

    pub fn build_client(&self) -> Result<WildApricotClient, ApiError> {
        Ok(
            WildApricotClient::with_endpoints(self.endpoints.clone(), self.timeout)?
                .with_retry(RetryConfig::with_retries(self.retries)),
        )
    }

    /// The log publisher, when publishing is enabled.
    pub fn publisher(&self) -> Option<LogPublisher> {
        self.publish_log.then(|| {
            LogPublisher::new(&self.log_file)
                .with_message(&self.commit_message)
                .with_push(self.push_log)
        })
    }
}
