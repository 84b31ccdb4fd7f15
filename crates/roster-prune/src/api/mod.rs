//! API interaction layer: authentication, the account-scoped client, contact
//! filters, and retry.
//!
//! - [`client`]: [`WildApricotClient`] exchanges an API key for a token and
//!   resolves the account, producing an [`AccountSession`] that implements
//!   [`MembershipApi`] over HTTP.
//! - [`filter`]: [`ContactFilter`] builds `$filter` expressions.
//! - [`retry`]: transient error detection with exponential backoff for reads.
//!
//! The pruning pipeline only talks to [`MembershipApi`], so tests can swap the
//! HTTP session for an in-memory directory.

pub mod client;
pub mod filter;
pub mod retry;

use std::future::Future;
use std::pin::Pin;

use crate::error::ApiError;
use crate::model::{Contact, EventRegistration};

pub use client::{AccountSession, ApiEndpoints, WildApricotClient};
pub use filter::ContactFilter;
pub use retry::RetryConfig;

/// Boxed future returned by [`MembershipApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Account-scoped operations on the remote membership directory.
///
/// Every method addresses the account the implementor was resolved for.
pub trait MembershipApi: Send + Sync {
    /// Contacts matching a server-side filter.
    fn list_contacts<'a>(&'a self, filter: &'a ContactFilter) -> ApiFuture<'a, Vec<Contact>>;

    /// The full record of one contact.
    fn get_contact(&self, contact_id: u64) -> ApiFuture<'_, Contact>;

    /// Write a full contact record back.
    fn update_contact<'a>(&'a self, contact: &'a Contact) -> ApiFuture<'a, ()>;

    /// All event registrations of one contact.
    fn event_registrations(&self, contact_id: u64) -> ApiFuture<'_, Vec<EventRegistration>>;

    /// Size of the result set for a filter.
    fn count_contacts<'a>(&'a self, filter: &'a ContactFilter) -> ApiFuture<'a, usize> {
        Box::pin(async move { Ok(self.list_contacts(filter).await?.len()) })
    }
}
