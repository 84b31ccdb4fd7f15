//! Error types for API calls and pipeline stages.

use std::fmt;

/// Failure of a single call against the membership API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The token endpoint answered 2xx but carried no `access_token`.
    #[error("token response did not contain an access_token")]
    MissingToken,

    /// `GET /accounts` returned an empty list.
    #[error("no account is associated with this API key")]
    NoAccount,

    /// A contact record lacks a field the archiver has to modify.
    #[error("contact {contact_id} has no {system_code} field")]
    MissingField {
        contact_id: u64,
        system_code: &'static str,
    },
}

impl ApiError {
    /// HTTP status for `Status` errors, `None` otherwise.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Pipeline stage an [`ApiError`] was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticate,
    ResolveAccount,
    CountContacts,
    CountMembers,
    CountBalances,
    CountFutureRegistrants,
    SelectCandidates,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Authenticate => "authenticate",
            Stage::ResolveAccount => "resolve account",
            Stage::CountContacts => "count active contacts",
            Stage::CountMembers => "count members",
            Stage::CountBalances => "count contacts with a balance",
            Stage::CountFutureRegistrants => "count future registrants",
            Stage::SelectCandidates => "select archival candidates",
        };
        f.write_str(s)
    }
}

/// A fatal run failure: the pipeline stopped before archiving anything more.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: ApiError,
}

impl RunError {
    pub fn new(stage: Stage, source: ApiError) -> Self {
        Self { stage, source }
    }
}

/// Extension for tagging API results with the stage they belong to.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, RunError>;
}

impl<T> StageExt<T> for Result<T, ApiError> {
    fn stage(self, stage: Stage) -> Result<T, RunError> {
        self.map_err(|e| RunError::new(stage, e))
    }
}
