//! Archival candidate selection.
//!
//! Candidates are drawn from non-archived, zero-balance non-members. Anyone
//! registered for an event that has not started yet is excluded, and the rest
//! are ranked by last login, oldest (or never) first.

use chrono::{DateTime, Utc};

use crate::api::{ContactFilter, MembershipApi};
use crate::dates::login_sort_key;
use crate::error::{ApiError, RunError, Stage, StageExt};
use crate::events::{EventHandler, RunEvent};
use crate::model::{Candidate, Contact};

/// Whether the contact holds a registration for an event starting after `now`.
pub async fn has_upcoming_registration(
    api: &dyn MembershipApi,
    contact_id: u64,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let registrations = api.event_registrations(contact_id).await?;
    Ok(registrations.iter().any(|r| r.is_upcoming(now)))
}

/// Order contacts by last login ascending. The sort is stable, so contacts
/// with equal logins keep the order the API returned them in.
pub fn rank_candidates(contacts: &[Contact]) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = contacts.iter().map(Candidate::from).collect();
    ranked.sort_by_key(|c| login_sort_key(c.last_login));
    ranked
}

/// Fetch the archival pool, drop contacts with upcoming registrations, and
/// rank the remainder.
pub async fn select_candidates(
    api: &dyn MembershipApi,
    now: DateTime<Utc>,
    handler: &dyn EventHandler,
) -> Result<Vec<Candidate>, RunError> {
    let pool = api
        .list_contacts(&ContactFilter::archival_pool())
        .await
        .stage(Stage::SelectCandidates)?;

    let mut eligible = Vec::with_capacity(pool.len());
    for contact in pool {
        // Archived contacts and members are never candidates.
        if contact.is_archived() || contact.is_member() {
            continue;
        }
        match has_upcoming_registration(api, contact.id, now).await {
            Ok(false) => eligible.push(contact),
            Ok(true) => {}
            Err(error) => handler.on_event(&RunEvent::RegistrationCheckFailed {
                contact_id: contact.id,
                error: &error,
                kept: true,
            }),
        }
    }

    Ok(rank_candidates(&eligible))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::system_code;
    use chrono::TimeZone;
    use serde_json::json;

    fn contact(id: u64, login: Option<&str>) -> Contact {
        let value = login.map_or(serde_json::Value::Null, |l| json!(l));
        Contact::new(id).with_field(system_code::LAST_LOGIN_DATE, value)
    }

    #[test]
    fn ranks_oldest_login_first_and_never_logged_in_before_all() {
        let contacts = vec![
            contact(1, Some("2024-01-01T00:00:00")),
            contact(2, None),
            contact(3, Some("2022-06-15T12:00:00+02:00")),
            contact(4, Some("2023-03-03T03:03:03Z")),
            contact(5, None),
        ];
        let ids: Vec<u64> = rank_candidates(&contacts).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 5, 3, 4, 1]);
    }

    #[test]
    fn unparseable_login_counts_as_never() {
        let contacts = vec![
            contact(1, Some("2020-01-01T00:00:00")),
            contact(2, Some("not a date")),
        ];
        let ranked = rank_candidates(&contacts);
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[0].last_login, None);
        assert_eq!(
            ranked[1].last_login,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
    }
}
