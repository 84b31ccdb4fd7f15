//! Server-side contact filters in the API's `$filter` syntax.
//!
//! The API accepts a small OData-like grammar: `'Field' op 'Value'` clauses
//! joined with `and`. Field names and values are both single-quoted.

use std::fmt;

use serde_json::Value;

use crate::model::Contact;

/// Comparison operator for a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "eq"),
            FilterOp::Ne => write!(f, "ne"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    field: String,
    op: FilterOp,
    value: String,
}

/// A conjunction of `'Field' op 'Value'` clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    clauses: Vec<Clause>,
}

impl ContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clause(field, FilterOp::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clause(field, FilterOp::Ne, value)
    }

    fn clause(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the filter locally against a contact record.
    ///
    /// The HTTP client never calls this; the server applies the rendered
    /// `$filter`. It is the evaluation path for in-memory
    /// [`MembershipApi`](crate::api::MembershipApi) implementations, which
    /// must select exactly what the server would.
    ///
    /// `Member`, `IsArchived`, and `Balance` use the contact's typed
    /// accessors; any other field is compared on its text value.
    pub fn matches(&self, contact: &Contact) -> bool {
        self.clauses.iter().all(|c| {
            let equal = match c.field.as_str() {
                "Member" => flag_eq(contact.is_member(), &c.value),
                "IsArchived" => flag_eq(contact.is_archived(), &c.value),
                "Balance" => c
                    .value
                    .parse::<f64>()
                    .is_ok_and(|v| contact.balance().unwrap_or(0.0) == v),
                other => contact
                    .field(other)
                    .is_some_and(|f| value_text(&f.value) == c.value),
            };
            match c.op {
                FilterOp::Eq => equal,
                FilterOp::Ne => !equal,
            }
        })
    }

    // ── Canned filters used by the pruning run ──

    /// Every contact that is not archived.
    pub fn active_contacts() -> Self {
        Self::new().eq("IsArchived", "False")
    }

    /// Every contact with membership.
    pub fn members() -> Self {
        Self::new().eq("Member", "True")
    }

    /// Every contact carrying a non-zero balance.
    pub fn with_balance() -> Self {
        Self::new().ne("Balance", "0.0")
    }

    /// Non-archived, zero-balance contacts without membership, phrased with
    /// `ne 'True'` so contacts with an unset flag are included.
    pub fn unpaid_non_members() -> Self {
        Self::new()
            .ne("Member", "True")
            .eq("IsArchived", "False")
            .eq("Balance", "0.0")
    }

    /// The pool archival candidates are drawn from.
    pub fn archival_pool() -> Self {
        Self::new()
            .eq("Member", "False")
            .eq("IsArchived", "False")
            .eq("Balance", "0.0")
    }
}

impl fmt::Display for ContactFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(
                f,
                "'{}' {} '{}'",
                escape(&c.field),
                c.op,
                escape(&c.value)
            )?;
        }
        Ok(())
    }
}

fn flag_eq(flag: bool, value: &str) -> bool {
    value.eq_ignore_ascii_case(if flag { "true" } else { "false" })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}
