//! Shared parsing helpers for inbound HTTP adapters.
//!
//! Body fields are parsed into a [`FieldErrors`] accumulator so one response
//! reports every problem. Path and query identifiers fail fast with a
//! single-field error.

use chrono::{DateTime, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{Error, FieldErrors, parse_clock_time};

/// Message attached to required body fields that were omitted.
pub(crate) const REQUIRED_MESSAGE: &str = "this field is required";

/// Message attached to time fields that are not `HH:MM[:SS]`.
pub(crate) const INVALID_TIME_MESSAGE: &str = "enter a valid time in HH:MM format";

/// Validation error codes for path and query failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidationCode {
    InvalidUuid,
    InvalidTimestamp,
}

impl ValidationCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

fn invalid_value(field: &str, message: String, code: ValidationCode, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "value": value,
        "code": code.as_str(),
    }))
}

/// Parse a UUID path or query segment.
pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(value.trim()).map_err(|_| {
        invalid_value(
            field,
            format!("{field} must be a valid UUID"),
            ValidationCode::InvalidUuid,
            value,
        )
    })
}

/// Parse an optional RFC 3339 timestamp query parameter.
pub(crate) fn parse_optional_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|_| {
                    invalid_value(
                        field,
                        format!("{field} must be an RFC 3339 timestamp"),
                        ValidationCode::InvalidTimestamp,
                        raw,
                    )
                })
        })
        .transpose()
}

/// Unwrap a required body field, recording its absence.
pub(crate) fn required<T>(value: Option<T>, field: &str, errors: &mut FieldErrors) -> Option<T> {
    if value.is_none() {
        errors.push(field, REQUIRED_MESSAGE);
    }
    value
}

/// Parse an optional `HH:MM[:SS]` body field.
pub(crate) fn clock_time(
    value: Option<&str>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<NaiveTime> {
    let raw = value?;
    let parsed = parse_clock_time(raw);
    if parsed.is_none() {
        errors.push(field, INVALID_TIME_MESSAGE);
    }
    parsed
}

/// Parse an optional UUID body field.
pub(crate) fn uuid_field(value: Option<&str>, field: &str, errors: &mut FieldErrors) -> Option<Uuid> {
    let raw = value?;
    let parsed = Uuid::parse_str(raw.trim()).ok();
    if parsed.is_none() {
        errors.push(field, format!("\"{raw}\" is not a valid UUID"));
    }
    parsed
}
