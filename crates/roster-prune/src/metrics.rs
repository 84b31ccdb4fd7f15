//! Contact counts that feed the archival plan.

use chrono::{DateTime, Utc};

use crate::api::{ContactFilter, MembershipApi};
use crate::error::{RunError, Stage, StageExt};
use crate::events::{EventHandler, RunEvent};
use crate::plan::MinimumContacts;
use crate::selector::has_upcoming_registration;

pub async fn count_active_contacts(api: &dyn MembershipApi) -> Result<usize, RunError> {
    api.count_contacts(&ContactFilter::active_contacts())
        .await
        .stage(Stage::CountContacts)
}

pub async fn count_members(api: &dyn MembershipApi) -> Result<usize, RunError> {
    api.count_contacts(&ContactFilter::members())
        .await
        .stage(Stage::CountMembers)
}

pub async fn count_with_balance(api: &dyn MembershipApi) -> Result<usize, RunError> {
    api.count_contacts(&ContactFilter::with_balance())
        .await
        .stage(Stage::CountBalances)
}

/// Unpaid non-members registered for at least one event that has not started.
///
/// A contact whose registrations cannot be fetched is counted.
pub async fn count_future_registrants(
    api: &dyn MembershipApi,
    now: DateTime<Utc>,
    handler: &dyn EventHandler,
) -> Result<usize, RunError> {
    let contacts = api
        .list_contacts(&ContactFilter::unpaid_non_members())
        .await
        .stage(Stage::CountFutureRegistrants)?;

    let mut count = 0;
    for contact in &contacts {
        match has_upcoming_registration(api, contact.id, now).await {
            Ok(true) => count += 1,
            Ok(false) => {}
            Err(error) => {
                handler.on_event(&RunEvent::RegistrationCheckFailed {
                    contact_id: contact.id,
                    error: &error,
                    kept: true,
                });
                count += 1;
            }
        }
    }
    Ok(count)
}

/// All three components of the unarchivable minimum.
pub async fn collect_minimum(
    api: &dyn MembershipApi,
    now: DateTime<Utc>,
    handler: &dyn EventHandler,
) -> Result<MinimumContacts, RunError> {
    Ok(MinimumContacts {
        members: count_members(api).await?,
        with_balance: count_with_balance(api).await?,
        future_registrants: count_future_registrants(api, now, handler).await?,
    })
}
