//! Wire types for accounts, contacts, and event registrations.
//!
//! Contacts are round-tripped through a full-record `PUT`, so every struct
//! that is written back keeps the fields it does not model in a flattened
//! `extra` map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dates::Timestamp;

/// Stable `SystemCode` values of the contact fields this tool reads or writes.
pub mod system_code {
    pub const IS_ARCHIVED: &str = "IsArchived";
    pub const NOTES: &str = "Notes";
    pub const LAST_LOGIN_DATE: &str = "LastLoginDate";
    pub const BALANCE: &str = "Balance";
    pub const IS_MEMBER: &str = "IsMember";
}

// ── Accounts ───────────────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Contacts ───────────────────────────────────────────────────────

/// Body of a contact listing: `{"Contacts": [...]}`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContactList {
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// One entry of a contact's `FieldValues` list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct FieldValue {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub system_code: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldValue {
    pub fn new(system_code: &str, value: Value) -> Self {
        Self {
            field_name: system_code.to_string(),
            system_code: system_code.to_string(),
            value,
            extra: Map::new(),
        }
    }
}

/// Top-level contact keys this tool reads.
pub mod property {
    pub const FIRST_NAME: &str = "FirstName";
    pub const LAST_NAME: &str = "LastName";
    pub const EMAIL: &str = "Email";
    pub const MEMBERSHIP_ENABLED: &str = "MembershipEnabled";
}

/// A person record in the membership system.
///
/// Only `Id` and `FieldValues` are typed. Every other key, including the
/// name, email and membership flag, stays in `extra` exactly as the API sent
/// it (explicit `null`s included) and is read through accessors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    pub id: u64,
    #[serde(default)]
    pub field_values: Vec<FieldValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            field_values: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Builder-style setter for a field value, replacing any existing entry.
    pub fn with_field(mut self, system_code: &str, value: Value) -> Self {
        match self
            .field_values
            .iter()
            .position(|f| f.system_code == system_code)
        {
            Some(idx) => self.field_values[idx].value = value,
            None => self
                .field_values
                .push(FieldValue::new(system_code, value)),
        }
        self
    }

    /// Builder-style setter for a top-level key such as `Email`.
    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }

    fn property_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.property_str(property::FIRST_NAME)
    }

    pub fn last_name(&self) -> Option<&str> {
        self.property_str(property::LAST_NAME)
    }

    pub fn email(&self) -> Option<&str> {
        self.property_str(property::EMAIL)
    }

    pub fn membership_enabled(&self) -> Option<bool> {
        self.extra
            .get(property::MEMBERSHIP_ENABLED)
            .and_then(Value::as_bool)
    }

    pub fn field(&self, system_code: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.system_code == system_code)
    }

    pub fn field_mut(&mut self, system_code: &str) -> Option<&mut FieldValue> {
        self.field_values
            .iter_mut()
            .find(|f| f.system_code == system_code)
    }

    pub fn is_archived(&self) -> bool {
        self.field(system_code::IS_ARCHIVED)
            .is_some_and(|f| value_as_bool(&f.value))
    }

    /// Membership flag, from `MembershipEnabled` or the `IsMember` field.
    pub fn is_member(&self) -> bool {
        self.membership_enabled().unwrap_or_else(|| {
            self.field(system_code::IS_MEMBER)
                .is_some_and(|f| value_as_bool(&f.value))
        })
    }

    pub fn balance(&self) -> Option<f64> {
        self.field(system_code::BALANCE).and_then(|f| match &f.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Last login in UTC. Absent, null, and unparseable values are `None`.
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.field(system_code::LAST_LOGIN_DATE)
            .and_then(|f| f.value.as_str())
            .and_then(Timestamp::parse)
            .map(|ts| ts.to_utc())
    }

    pub fn notes(&self) -> Option<&str> {
        self.field(system_code::NOTES)
            .and_then(|f| f.value.as_str())
    }

    /// `First Last <email>` with whatever parts are present.
    pub fn display_name(&self) -> String {
        let name = [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        match (self.email(), name.is_empty()) {
            (Some(email), true) => email.to_string(),
            (Some(email), false) => format!("{name} <{email}>"),
            (None, false) => name,
            (None, true) => format!("contact {}", self.id),
        }
    }
}

fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

// ── Event registrations ────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct EventSummary {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct EventRegistration {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub event: Option<EventSummary>,
}

impl EventRegistration {
    /// Whether the registered event starts strictly after `now`.
    ///
    /// A registration without a start date is never upcoming. A start date
    /// that cannot be parsed counts as upcoming so the contact is kept.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        let Some(raw) = self
            .event
            .as_ref()
            .and_then(|e| e.start_date.as_deref())
            .filter(|s| !s.trim().is_empty())
        else {
            return false;
        };
        match Timestamp::parse(raw) {
            Some(ts) => ts.is_after(now),
            None => {
                tracing::warn!("Unparseable event start date {raw:?}, treating as upcoming");
                true
            }
        }
    }
}

// ── Run-scoped context ─────────────────────────────────────────────

/// Account id plus bearer token, resolved once per run.
#[derive(Clone)]
pub struct AccountContext {
    pub account_id: u64,
    pub token: String,
}

impl std::fmt::Debug for AccountContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountContext")
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A contact eligible for archival, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: u64,
    pub label: String,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Contact> for Candidate {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            label: contact.display_name(),
            last_login: contact.last_login(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_contact() -> Value {
        json!({
            "Id": 42,
            "Url": "https://api.example/accounts/1/contacts/42",
            "FirstName": "Ada",
            "LastName": "Lovelace",
            "Email": "ada@example.org",
            "MembershipEnabled": false,
            "Status": "Active",
            "FieldValues": [
                {"FieldName": "Archived", "SystemCode": "IsArchived", "Value": false},
                {"FieldName": "Notes", "SystemCode": "Notes", "Value": "met at fair"},
                {"FieldName": "Last login date", "SystemCode": "LastLoginDate", "Value": "2023-02-03T04:05:06"},
                {"FieldName": "Balance", "SystemCode": "Balance", "Value": 0.0, "Hidden": true}
            ]
        })
    }

    #[test]
    fn contact_accessors() {
        let contact: Contact = serde_json::from_value(sample_contact()).unwrap();
        assert_eq!(contact.id, 42);
        assert!(!contact.is_archived());
        assert!(!contact.is_member());
        assert_eq!(contact.balance(), Some(0.0));
        assert_eq!(contact.notes(), Some("met at fair"));
        assert_eq!(
            contact.last_login(),
            Some(Utc.with_ymd_and_hms(2023, 2, 3, 4, 5, 6).unwrap())
        );
        assert_eq!(contact.display_name(), "Ada Lovelace <ada@example.org>");
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let contact: Contact = serde_json::from_value(sample_contact()).unwrap();
        let back = serde_json::to_value(&contact).unwrap();
        assert_eq!(back["Url"], "https://api.example/accounts/1/contacts/42");
        assert_eq!(back["Status"], "Active");
        assert_eq!(back["FieldValues"][3]["Hidden"], true);
    }

    #[test]
    fn explicit_nulls_round_trip_exactly() {
        let raw = json!({
            "Id": 7,
            "FirstName": null,
            "LastName": "Hopper",
            "Email": null,
            "MembershipEnabled": null,
            "FieldValues": []
        });
        let contact: Contact = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(contact.first_name(), None);
        assert_eq!(contact.membership_enabled(), None);
        assert_eq!(contact.display_name(), "Hopper");
        assert_eq!(serde_json::to_value(&contact).unwrap(), raw);

        // Keys the API left out are not invented on the way back.
        let sparse = json!({"Id": 8, "FieldValues": []});
        let contact: Contact = serde_json::from_value(sparse.clone()).unwrap();
        assert_eq!(serde_json::to_value(&contact).unwrap(), sparse);
    }

    #[test]
    fn string_flags_and_balances_are_understood() {
        let contact = Contact::new(1)
            .with_field(system_code::IS_ARCHIVED, json!("True"))
            .with_field(system_code::BALANCE, json!("12.50"))
            .with_field(system_code::IS_MEMBER, json!(true));
        assert!(contact.is_archived());
        assert!(contact.is_member());
        assert_eq!(contact.balance(), Some(12.5));
    }

    #[test]
    fn null_login_is_none() {
        let contact = Contact::new(1).with_field(system_code::LAST_LOGIN_DATE, Value::Null);
        assert_eq!(contact.last_login(), None);
    }

    #[test]
    fn registration_upcoming_rules() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let reg = |start: Option<&str>| EventRegistration {
            id: None,
            event: Some(EventSummary {
                start_date: start.map(str::to_string),
                ..Default::default()
            }),
        };
        assert!(reg(Some("2024-07-01T18:00:00-04:00")).is_upcoming(now));
        assert!(!reg(Some("2024-05-01T18:00:00-04:00")).is_upcoming(now));
        assert!(!reg(None).is_upcoming(now));
        assert!(!EventRegistration::default().is_upcoming(now));
        assert!(reg(Some("someday")).is_upcoming(now));
    }

    #[test]
    fn account_context_debug_hides_token() {
        let ctx = AccountContext {
            account_id: 7,
            token: "secret".into(),
        };
        assert!(!format!("{ctx:?}").contains("secret"));
    }
}
