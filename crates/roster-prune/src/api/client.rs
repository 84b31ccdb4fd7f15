//! HTTP client for the Wild Apricot REST API.

use std::time::{Duration, Instant};

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::filter::ContactFilter;
use super::retry::{RetryConfig, with_retry};
use super::{ApiFuture, MembershipApi};
use crate::error::{ApiError, RunError, Stage, StageExt};
use crate::model::{Account, AccountContext, Contact, ContactList, EventRegistration};
use crate::{API_BASE_URL, TOKEN_URL};

/// Base URLs for the token endpoint and the versioned REST API.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub token_url: String,
    pub api_base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            token_url: TOKEN_URL.to_string(),
            api_base: API_BASE_URL.to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Both endpoints served from one origin, as a test server does.
    pub fn local(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            token_url: format!("{origin}/auth/token"),
            api_base: format!("{origin}/v2.2"),
        }
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Unauthenticated client. Use [`login`](Self::login) to obtain an
/// [`AccountSession`].
pub struct WildApricotClient {
    pub(crate) http: reqwest::Client,
    pub(crate) endpoints: ApiEndpoints,
    pub(crate) retry: RetryConfig,
}

impl WildApricotClient {
    /// Create a client against the public API with a 60 s request timeout.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_endpoints(ApiEndpoints::default(), Duration::from_secs(60))
    }

    pub fn with_endpoints(endpoints: ApiEndpoints, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("roster-prune/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoints,
            retry: RetryConfig::default(),
        })
    }

    /// Retry policy for read calls made through sessions of this client.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Exchange an API key for a bearer token (client-credentials grant).
    pub async fn authenticate(&self, api_key: &str) -> Result<String, ApiError> {
        let req = self
            .http
            .post(&self.endpoints.token_url)
            .basic_auth("APIKEY", Some(api_key))
            .form(&[("grant_type", "client_credentials"), ("scope", "auto")]);
        let token: TokenResponse = send_json(req, "token response").await?;
        if let Some(secs) = token.expires_in {
            debug!("Access token valid for {secs}s");
        }
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingToken)
    }

    /// The single account tied to a token.
    pub async fn resolve_account(&self, token: &str) -> Result<AccountContext, ApiError> {
        let url = format!("{}/accounts", self.endpoints.api_base);
        let accounts: Vec<Account> = with_retry(&self.retry, "GET accounts", || {
            send_json(self.authorized(self.http.get(&url), token), "account list")
        })
        .await?;
        let account = accounts.into_iter().next().ok_or(ApiError::NoAccount)?;
        debug!(
            "Resolved account {} ({})",
            account.id,
            account.name.as_deref().unwrap_or("unnamed")
        );
        Ok(AccountContext {
            account_id: account.id,
            token: token.to_string(),
        })
    }

    /// Authenticate and resolve the account in one step.
    pub async fn login(self, api_key: &str) -> Result<AccountSession, RunError> {
        let token = self.authenticate(api_key).await.stage(Stage::Authenticate)?;
        let ctx = self
            .resolve_account(&token)
            .await
            .stage(Stage::ResolveAccount)?;
        Ok(AccountSession { client: self, ctx })
    }

    fn authorized(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
        req.bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

/// An authenticated client bound to one account.
pub struct AccountSession {
    client: WildApricotClient,
    ctx: AccountContext,
}

impl AccountSession {
    pub fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn account_url(&self, path: &str) -> String {
        format!(
            "{}/accounts/{}/{path}",
            self.client.endpoints.api_base, self.ctx.account_id
        )
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .authorized(self.client.http.get(url), &self.ctx.token)
    }
}

impl MembershipApi for AccountSession {
    fn list_contacts<'a>(&'a self, filter: &'a ContactFilter) -> ApiFuture<'a, Vec<Contact>> {
        Box::pin(async move {
            let url = self.account_url("contacts");
            let rendered = filter.to_string();
            let mut query = vec![("$async", "false")];
            if !filter.is_empty() {
                query.push(("$filter", rendered.as_str()));
            }
            let list: ContactList = with_retry(&self.client.retry, "GET contacts", || {
                send_json(self.get(&url).query(&query), "contact list")
            })
            .await?;
            debug!("Filter [{rendered}] matched {} contact(s)", list.contacts.len());
            Ok(list.contacts)
        })
    }

    fn get_contact(&self, contact_id: u64) -> ApiFuture<'_, Contact> {
        Box::pin(async move {
            let url = self.account_url(&format!("contacts/{contact_id}"));
            with_retry(&self.client.retry, "GET contact", || {
                send_json(self.get(&url), "contact")
            })
            .await
        })
    }

    fn update_contact<'a>(&'a self, contact: &'a Contact) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.account_url(&format!("contacts/{}", contact.id));
            let req = self
                .client
                .authorized(self.client.http.put(&url), &self.ctx.token)
                .json(contact);
            send(req).await.map(|_| ())
        })
    }

    fn event_registrations(&self, contact_id: u64) -> ApiFuture<'_, Vec<EventRegistration>> {
        Box::pin(async move {
            let url = self.account_url("eventregistrations");
            let id = contact_id.to_string();
            with_retry(&self.client.retry, "GET eventregistrations", || {
                send_json(
                    self.get(&url).query(&[("contactId", id.as_str())]),
                    "event registrations",
                )
            })
            .await
        })
    }
}

// ── Transport helpers ──────────────────────────────────────────────

/// Send a request and return the body of a 2xx response.
async fn send(req: RequestBuilder) -> Result<String, ApiError> {
    let start = Instant::now();
    let resp = req.send().await?;
    let status = resp.status();
    let url = resp.url().path().to_string();
    let text = resp.text().await?;

    debug!(
        "API response: HTTP {} {} in {:.2}s ({} bytes)",
        status,
        url,
        start.elapsed().as_secs_f64(),
        text.len()
    );

    if !status.is_success() {
        return Err(ApiError::Status {
            status,
            body: truncate_body(text),
        });
    }
    Ok(text)
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder, what: &'static str) -> Result<T, ApiError> {
    let text = send(req).await?;
    trace!("{what}: {text}");
    serde_json::from_str(&text).map_err(|source| ApiError::Decode { what, source })
}

fn truncate_body(mut body: String) -> String {
    const MAX: usize = 512;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

/// Whether a status means the credentials were rejected.
pub fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}
