//! Keep a Wild Apricot account under its plan-tier contact quota.
//!
//! `roster-prune` counts the account's active contacts, works out how many
//! must be archived to get back under a target, and archives the
//! lowest-engagement contacts: non-members with a zero balance and no
//! upcoming event registration, oldest login first. Each archived record gets
//! an audit line appended to its notes.
//!
//! # Getting started
//!
//! ```ignore
//! use roster_prune::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api_key = std::env::var("WA_API_KEY")?;
//!     let session = WildApricotClient::new()?.login(&api_key).await?;
//!
//!     let settings = PruneSettings {
//!         target: 190,
//!         dry_run: true,
//!         ..Default::default()
//!     };
//!     let report = Pruner::new(&session, settings)
//!         .with_event_handler(&LoggingHandler)
//!         .run()
//!         .await?;
//!
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Token exchange, [`MembershipApi`](api::MembershipApi), HTTP session, `$filter` builder, retry |
//! | [`pruner`] | [`Pruner`](pruner::Pruner) run controller and [`RunReport`](pruner::RunReport) |
//! | [`plan`] | Quota arithmetic and the capacity decision |
//! | [`metrics`] | Contact counts behind the plan |
//! | [`selector`] | Candidate filtering and ranking |
//! | [`archiver`] | Flag-and-note mutation and the quota-bounded archive loop |
//! | [`events`] | [`RunEvent`](events::RunEvent), handlers, and the run log |
//! | [`model`] | Contact, registration, and account wire types |
//! | [`config`], [`logging`], [`publish`] | Binary plumbing: settings, tracing, git log publishing |

pub mod api;
pub mod archiver;
pub mod config;
pub mod dates;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod plan;
pub mod prelude;
pub mod pruner;
pub mod publish;
pub mod selector;

// ── Constants ──────────────────────────────────────────────────────

/// OAuth2 client-credentials token endpoint.
pub const TOKEN_URL: &str = "https://oauth.wildapricot.org/auth/token";

/// Versioned REST API base.
pub const API_BASE_URL: &str = "https://api.wildapricot.org/v2.2";
