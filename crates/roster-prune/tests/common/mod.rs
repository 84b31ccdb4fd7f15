//! In-memory membership directory for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use roster_prune::api::{ApiFuture, ContactFilter, MembershipApi};
use roster_prune::error::ApiError;
use roster_prune::events::{FnEventHandler, RunEvent};
use roster_prune::model::{Contact, EventRegistration, EventSummary, property, system_code};
use serde_json::json;

/// Fixed clock for every scenario.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".into(),
    }
}

#[derive(Default)]
struct State {
    contacts: Vec<Contact>,
    registrations: HashMap<u64, Vec<EventRegistration>>,
    failing_registrations: HashSet<u64>,
    failing_updates: HashSet<u64>,
    failing_filters: HashSet<String>,
    updates: Vec<Contact>,
}

/// A directory that evaluates filters locally and records every write.
#[derive(Default, Clone)]
pub struct FakeDirectory {
    state: Arc<Mutex<State>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, contact: Contact) -> &Self {
        self.state.lock().unwrap().contacts.push(contact);
        self
    }

    /// `n` plain members.
    pub fn add_members(&self, first_id: u64, n: u64) -> &Self {
        for id in first_id..first_id + n {
            self.add(member(id));
        }
        self
    }

    /// `n` archivable non-members, all with the given login.
    pub fn add_idle(&self, first_id: u64, n: u64, login: Option<&str>) -> &Self {
        for id in first_id..first_id + n {
            self.add(idle(id, login));
        }
        self
    }

    pub fn register(&self, contact_id: u64, start: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .registrations
            .entry(contact_id)
            .or_default()
            .push(registration(start));
        self
    }

    pub fn fail_registrations_for(&self, contact_id: u64) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_registrations
            .insert(contact_id);
        self
    }

    pub fn fail_update_for(&self, contact_id: u64) -> &Self {
        self.state.lock().unwrap().failing_updates.insert(contact_id);
        self
    }

    pub fn fail_filter(&self, filter: &ContactFilter) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_filters
            .insert(filter.to_string());
        self
    }

    /// Ids written back, in write order.
    pub fn updated_ids(&self) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .updates
            .iter()
            .map(|c| c.id)
            .collect()
    }

    pub fn updates(&self) -> Vec<Contact> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn contact(&self, id: u64) -> Option<Contact> {
        self.state
            .lock()
            .unwrap()
            .contacts
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

impl MembershipApi for FakeDirectory {
    fn list_contacts<'a>(&'a self, filter: &'a ContactFilter) -> ApiFuture<'a, Vec<Contact>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            if state.failing_filters.contains(&filter.to_string()) {
                return Err(server_error());
            }
            Ok(state
                .contacts
                .iter()
                .filter(|c| filter.matches(c))
                .cloned()
                .collect())
        })
    }

    fn get_contact(&self, contact_id: u64) -> ApiFuture<'_, Contact> {
        Box::pin(async move {
            self.contact(contact_id).ok_or(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                body: format!("contact {contact_id} not found"),
            })
        })
    }

    fn update_contact<'a>(&'a self, contact: &'a Contact) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.failing_updates.contains(&contact.id) {
                return Err(server_error());
            }
            state.updates.push(contact.clone());
            if let Some(stored) = state.contacts.iter_mut().find(|c| c.id == contact.id) {
                *stored = contact.clone();
            }
            Ok(())
        })
    }

    fn event_registrations(&self, contact_id: u64) -> ApiFuture<'_, Vec<EventRegistration>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            if state.failing_registrations.contains(&contact_id) {
                return Err(server_error());
            }
            Ok(state
                .registrations
                .get(&contact_id)
                .cloned()
                .unwrap_or_default())
        })
    }
}

// ── Fixtures ───────────────────────────────────────────────────────

pub fn member(id: u64) -> Contact {
    Contact::new(id)
        .with_property(property::MEMBERSHIP_ENABLED, json!(true))
        .with_field(system_code::IS_ARCHIVED, json!(false))
        .with_field(system_code::BALANCE, json!(0.0))
        .with_field(system_code::NOTES, json!(""))
}

pub fn idle(id: u64, login: Option<&str>) -> Contact {
    Contact::new(id)
        .with_property(property::MEMBERSHIP_ENABLED, json!(false))
        .with_property(property::EMAIL, json!(format!("contact{id}@example.org")))
        .with_field(system_code::IS_ARCHIVED, json!(false))
        .with_field(system_code::BALANCE, json!(0.0))
        .with_field(system_code::NOTES, json!(format!("contact {id}")))
        .with_field(
            system_code::LAST_LOGIN_DATE,
            login.map_or(serde_json::Value::Null, |l| json!(l)),
        )
}

pub fn with_balance(id: u64, balance: f64) -> Contact {
    idle(id, None).with_field(system_code::BALANCE, json!(balance))
}

pub fn registration(start: &str) -> EventRegistration {
    EventRegistration {
        id: None,
        event: Some(EventSummary {
            start_date: Some(start.to_string()),
            ..Default::default()
        }),
    }
}

/// ISO timestamp `days` after the fixed clock, with a -04:00 offset.
pub fn days_from_now(days: i64) -> String {
    (now() + Duration::days(days))
        .with_timezone(&chrono::FixedOffset::west_opt(4 * 3600).unwrap())
        .to_rfc3339()
}

/// Event handler that records a short tag per event.
pub fn recorder() -> (
    FnEventHandler<impl Fn(&RunEvent<'_>) + Send + Sync>,
    Arc<Mutex<Vec<String>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler = FnEventHandler::new(move |event: &RunEvent<'_>| {
        let tag = match event {
            RunEvent::Started { .. } => "started".to_string(),
            RunEvent::OverTarget { .. } => "over_target".to_string(),
            RunEvent::NoActionRequired { .. } => "no_action".to_string(),
            RunEvent::CapacityExceeded { plan } => {
                format!("capacity_exceeded margin={}", plan.margin().unwrap_or_default())
            }
            RunEvent::MarginAvailable { .. } => "margin_available".to_string(),
            RunEvent::RegistrationCheckFailed { contact_id, .. } => {
                format!("registration_check_failed {contact_id}")
            }
            RunEvent::CandidatesSelected { candidates } => {
                format!("candidates {}", candidates.len())
            }
            RunEvent::Archiving { candidate, .. } => format!("archiving {}", candidate.id),
            RunEvent::Archived { contact_id, .. } => format!("archived {contact_id}"),
            RunEvent::ArchiveFailed { contact_id, .. } => format!("failed {contact_id}"),
            RunEvent::QuotaReached { .. } => "quota_reached".to_string(),
            RunEvent::CandidatesExhausted { .. } => "exhausted".to_string(),
            RunEvent::Finished { .. } => "finished".to_string(),
        };
        sink.lock().unwrap().push(tag);
    });
    (handler, seen)
}
