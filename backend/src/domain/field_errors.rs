//! Field-scoped validation failures.
//!
//! Validation functions return a [`FieldErrors`] collection of
//! `(field, message)` pairs. Services compose several checks into one
//! collection before touching storage, then convert the collection into a
//! domain [`Error`] whose details carry `fieldErrors: { field: [messages] }`.

use std::collections::BTreeMap;

use serde_json::json;

use super::Error;

/// One violated rule attached to a request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Ordered collection of [`FieldViolation`]s.
///
/// # Examples
/// ```
/// use backend::domain::FieldErrors;
///
/// let mut errors = FieldErrors::default();
/// errors.push("code", "branch code already exists");
/// assert!(errors.has_field("code"));
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldViolation>);

impl FieldErrors {
    /// Collection holding a single violation.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.0.iter()
    }

    /// Whether any violation is attached to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|violation| violation.field == field)
    }

    /// Messages recorded against `field`, in insertion order.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|violation| violation.field == field)
            .map(|violation| violation.message.as_str())
            .collect()
    }

    /// Group messages by field name.
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for violation in &self.0 {
            grouped
                .entry(violation.field.as_str())
                .or_default()
                .push(violation.message.as_str());
        }
        grouped
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl FromIterator<FieldViolation> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldViolation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error::invalid_request("validation failed")
            .with_details(json!({ "fieldErrors": errors.grouped() }))
    }
}
