//! Archive low-engagement Wild Apricot contacts until the account is back
//! under its contact quota.
//!
//! Reads the API key from the `WA_API_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Prune down to the default target of 190 contacts
//! roster-prune
//!
//! # See what would be archived without touching anything
//! roster-prune --dry-run --log-level debug
//!
//! # Different plan tier, commit the run log afterwards
//! roster-prune --target 500 --publish-log
//! ```
//!
//! Exit codes: 0 done or nothing to do, 1 fatal error, 2 over capacity,
//! 3 done but some contacts could not be archived.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use roster_prune::api::ApiEndpoints;
use roster_prune::api::client::is_auth_failure;
use roster_prune::config::{API_KEY_ENV, DEFAULT_LOG_FILE, PrunerConfig};
use roster_prune::archiver::DEFAULT_ATTRIBUTION;
use roster_prune::error::{RunError, Stage};
use roster_prune::events::LoggingHandler;
use roster_prune::logging::init_tracing;
use roster_prune::plan::{DEFAULT_CONTACT_TARGET, DEFAULT_SAFETY_BUFFER};
use roster_prune::pruner::Pruner;
use roster_prune::publish::DEFAULT_COMMIT_MESSAGE;
use roster_prune::{API_BASE_URL, TOKEN_URL};
use tracing::{error, info, warn};

/// Archive low-engagement contacts to stay under a contact quota.
#[derive(Parser)]
#[command(name = "roster-prune", version)]
struct Cli {
    // ── Credentials ────────────────────────────────────────────
    /// Wild Apricot API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: String,

    // ── Policy ─────────────────────────────────────────────────
    /// Contact quota to prune down to
    #[arg(long, default_value_t = DEFAULT_CONTACT_TARGET)]
    target: usize,

    /// Headroom required over members, balance holders, and registrants
    #[arg(long, default_value_t = DEFAULT_SAFETY_BUFFER)]
    buffer: usize,

    /// Name recorded in the archival note
    #[arg(long, default_value = DEFAULT_ATTRIBUTION)]
    attribution: String,

    /// Select and log candidates without archiving them
    #[arg(long)]
    dry_run: bool,

    // ── Logging ────────────────────────────────────────────────
    /// Append-only run log
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Commit the run log with git after the run
    #[arg(long)]
    publish_log: bool,

    /// Commit the run log but do not push it
    #[arg(long, requires = "publish_log")]
    no_push: bool,

    /// Commit message for the run log
    #[arg(long, default_value = DEFAULT_COMMIT_MESSAGE)]
    commit_message: String,

    // ── Transport ──────────────────────────────────────────────
    /// Retries for transient read failures (never applied to writes)
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// REST API base URL
    #[arg(long, default_value = API_BASE_URL)]
    api_base: String,

    /// OAuth token endpoint
    #[arg(long, default_value = TOKEN_URL)]
    token_url: String,
}

impl Cli {
    fn into_config(self) -> (String, PrunerConfig) {
        let config = PrunerConfig {
            target: self.target,
            buffer: self.buffer,
            attribution: self.attribution,
            dry_run: self.dry_run,
            log_file: self.log_file,
            log_filter: self.log_level,
            publish_log: self.publish_log,
            push_log: !self.no_push,
            commit_message: self.commit_message,
            endpoints: ApiEndpoints {
                token_url: self.token_url,
                api_base: self.api_base,
            },
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
        };
        (self.api_key, config)
    }
}

async fn prune(api_key: &str, config: &PrunerConfig) -> Result<i32, RunError> {
    let client = config
        .build_client()
        .map_err(|e| RunError::new(Stage::Authenticate, e))?;
    let session = client.login(api_key).await?;
    info!("Authenticated for account {}", session.context().account_id);

    let report = Pruner::new(&session, config.settings())
        .with_event_handler(&LoggingHandler)
        .run()
        .await?;
    Ok(report.exit_code())
}

#[tokio::main]
async fn main() {
    let (api_key, config) = Cli::parse().into_config();

    let guard = match init_tracing(&config.log_file, &config.log_filter) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let code = match prune(&api_key, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("Archival run aborted: {e}");
            if e.source.status().is_some_and(is_auth_failure) {
                error!("The API rejected the credentials; check {API_KEY_ENV}");
            }
            1
        }
    };

    // Flush and close the run log before committing it. Anything logged from
    // here on, publish failures included, reaches stderr only; writing it to
    // the log would leave the committed file dirty again.
    drop(guard);

    if let Some(publisher) = config.publisher()
        && let Err(e) = publisher.publish().await
    {
        warn!("Failed to publish run log: {e}");
    }

    process::exit(code);
}
