//! Marking contacts archived.
//!
//! Archiving re-reads the full contact record, sets its `IsArchived` field,
//! appends an audit line to `Notes`, and writes the whole record back. Writes
//! are never retried: a failed write is reported and the next candidate is
//! tried instead.

use serde_json::Value;

use crate::api::MembershipApi;
use crate::error::ApiError;
use crate::events::{EventHandler, RunEvent};
use crate::model::{Candidate, Contact, FieldValue, system_code};

/// Default attribution written into archival notes.
pub const DEFAULT_ATTRIBUTION: &str = "RMM Archival Bot";

/// The line appended to a contact's notes.
pub fn archive_note(date: &str, attribution: &str) -> String {
    format!("\n\r\nMember archived on {date} by {attribution}")
}

/// Set the archived flag and append the audit note in place.
///
/// The record must already carry an `IsArchived` field. A missing `Notes`
/// field is added; a null one is treated as empty.
pub fn mark_archived(contact: &mut Contact, date: &str, attribution: &str) -> Result<(), ApiError> {
    let id = contact.id;
    let flag = contact
        .field_mut(system_code::IS_ARCHIVED)
        .ok_or(ApiError::MissingField {
            contact_id: id,
            system_code: system_code::IS_ARCHIVED,
        })?;
    flag.value = Value::Bool(true);

    let note = archive_note(date, attribution);
    match contact.field_mut(system_code::NOTES) {
        Some(field) => {
            let current = match &field.value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            field.value = Value::String(current + &note);
        }
        None => contact
            .field_values
            .push(FieldValue::new(system_code::NOTES, Value::String(note))),
    }
    Ok(())
}

/// Contacts archived and contacts that failed during one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveOutcome {
    pub archived: Vec<u64>,
    pub failed: Vec<ArchiveFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveFailure {
    pub contact_id: u64,
    pub reason: String,
}

pub struct Archiver {
    pub attribution: String,
    pub dry_run: bool,
}

impl Archiver {
    pub fn new(attribution: impl Into<String>) -> Self {
        Self {
            attribution: attribution.into(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Archive a single contact. In a dry run the record is fetched and
    /// modified but not written back.
    pub async fn archive(&self, api: &dyn MembershipApi, contact_id: u64, date: &str) -> Result<(), ApiError> {
        let mut contact = api.get_contact(contact_id).await?;
        mark_archived(&mut contact, date, &self.attribution)?;
        if self.dry_run {
            return Ok(());
        }
        api.update_contact(&contact).await
    }

    /// Archive candidates in order until `quota` succeed or candidates run out.
    pub async fn archive_until_quota(
        &self,
        api: &dyn MembershipApi,
        candidates: &[Candidate],
        quota: usize,
        date: &str,
        handler: &dyn EventHandler,
    ) -> ArchiveOutcome {
        let mut outcome = ArchiveOutcome::default();
        for candidate in candidates {
            if outcome.archived.len() >= quota {
                break;
            }
            handler.on_event(&RunEvent::Archiving {
                candidate,
                archived_so_far: outcome.archived.len(),
                quota,
            });
            match self.archive(api, candidate.id, date).await {
                Ok(()) => {
                    handler.on_event(&RunEvent::Archived {
                        contact_id: candidate.id,
                        dry_run: self.dry_run,
                    });
                    outcome.archived.push(candidate.id);
                }
                Err(error) => {
                    handler.on_event(&RunEvent::ArchiveFailed {
                        contact_id: candidate.id,
                        error: &error,
                    });
                    outcome.failed.push(ArchiveFailure {
                        contact_id: candidate.id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        if outcome.archived.len() >= quota {
            handler.on_event(&RunEvent::QuotaReached {
                archived: outcome.archived.len(),
            });
        } else {
            handler.on_event(&RunEvent::CandidatesExhausted {
                archived: outcome.archived.len(),
                quota,
            });
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(notes: Value) -> Contact {
        Contact::new(9)
            .with_field(system_code::IS_ARCHIVED, json!(false))
            .with_field(system_code::NOTES, notes)
    }

    #[test]
    fn note_format() {
        assert_eq!(
            archive_note("03/07/2024", "RMM Archival Bot"),
            "\n\r\nMember archived on 03/07/2024 by RMM Archival Bot"
        );
    }

    #[test]
    fn appends_to_existing_notes() {
        let mut c = record(json!("met at fair"));
        mark_archived(&mut c, "01/02/2025", "Bot").unwrap();
        assert!(c.is_archived());
        assert_eq!(
            c.notes(),
            Some("met at fair\n\r\nMember archived on 01/02/2025 by Bot")
        );
    }

    #[test]
    fn null_notes_are_empty() {
        let mut c = record(Value::Null);
        mark_archived(&mut c, "01/02/2025", "Bot").unwrap();
        assert_eq!(c.notes(), Some("\n\r\nMember archived on 01/02/2025 by Bot"));
    }

    #[test]
    fn missing_notes_field_is_added() {
        let mut c = Contact::new(9).with_field(system_code::IS_ARCHIVED, json!(false));
        mark_archived(&mut c, "01/02/2025", "Bot").unwrap();
        assert!(c.notes().unwrap().ends_with("by Bot"));
    }

    #[test]
    fn missing_archive_flag_is_an_error() {
        let mut c = Contact::new(9);
        let err = mark_archived(&mut c, "01/02/2025", "Bot").unwrap_err();
        assert!(matches!(
            err,
            ApiError::MissingField {
                contact_id: 9,
                system_code: "IsArchived"
            }
        ));
        assert!(c.notes().is_none());
    }
}
