//! Counters: service points inside a branch, each bound to at most one device.
//!
//! Drafts and change sets are validated into a candidate [`Counter`] first;
//! the uniqueness rules then run against storage lookups through
//! [`check_number_available`] and [`check_device_available`], with the
//! counter being updated passed explicitly as the excluded holder.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BranchId, FieldErrors};

/// Maximum length of a device identifier.
pub const DEVICE_ID_MAX: usize = 100;

pub const DUPLICATE_NUMBER_MESSAGE: &str = "counter with this number already exists in this branch";
pub const DEVICE_IN_USE_MESSAGE: &str = "this device is already assigned to another counter";
pub const MISSING_BRANCH_MESSAGE: &str = "branch does not exist";

/// Stable counter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterId(Uuid);

impl CounterId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors raised by counter value objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterValidationError {
    #[error("counter number must be at least 1")]
    NumberTooSmall,
    #[error("counter number is too large")]
    NumberTooLarge,
    #[error("device id must not be blank")]
    BlankDevice,
    #[error("device id must be at most {max} characters")]
    DeviceTooLong { max: usize },
}

/// Positive counter number, unique within a branch.
///
/// # Examples
/// ```
/// use backend::domain::CounterNumber;
///
/// assert_eq!(CounterNumber::new(2).expect("valid").get(), 2);
/// assert!(CounterNumber::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterNumber(i32);

impl CounterNumber {
    pub fn new(value: i64) -> Result<Self, CounterValidationError> {
        if value < 1 {
            return Err(CounterValidationError::NumberTooSmall);
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| CounterValidationError::NumberTooLarge)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for CounterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a client terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn parse(raw: &str) -> Result<Self, CounterValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CounterValidationError::BlankDevice);
        }
        if trimmed.chars().count() > DEVICE_ID_MAX {
            return Err(CounterValidationError::DeviceTooLong {
                max: DEVICE_ID_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A counter within a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub id: CounterId,
    pub branch_id: BranchId,
    pub number: CounterNumber,
    pub name: String,
    pub device_id: Option<DeviceId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input accepted when creating a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDraft {
    pub branch_id: BranchId,
    pub number: i64,
    pub name: String,
    /// Blank values mean "no device".
    pub device_id: Option<String>,
    pub is_active: bool,
}

impl CounterDraft {
    /// Field-level checks. Produces the counter to insert.
    pub fn validate(&self, id: CounterId, now: DateTime<Utc>) -> Result<Counter, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.push("name", "name must not be blank");
        }

        match (
            CounterNumber::new(self.number),
            optional_device(self.device_id.as_deref()),
        ) {
            (Ok(number), Ok(device_id)) if errors.is_empty() => Ok(Counter {
                id,
                branch_id: self.branch_id,
                number,
                name: self.name.trim().to_owned(),
                device_id,
                is_active: self.is_active,
                created_at: now,
                updated_at: now,
            }),
            (number, device_id) => {
                if let Err(err) = number {
                    errors.push("counter_number", err.to_string());
                }
                if let Err(err) = device_id {
                    errors.push("device_id", err.to_string());
                }
                Err(errors)
            }
        }
    }
}

/// Partial update of a counter. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterChanges {
    pub branch_id: Option<BranchId>,
    pub number: Option<i64>,
    pub name: Option<String>,
    /// `Some("")` detaches the current device.
    pub device_id: Option<String>,
    pub is_active: Option<bool>,
}

impl CounterChanges {
    /// Merge onto `existing`, producing the candidate counter.
    ///
    /// The target branch is the payload's branch when given, else the
    /// existing counter's branch.
    pub fn validate_against(&self, existing: &Counter) -> Result<Counter, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut candidate = existing.clone();

        if let Some(raw) = self.number {
            if let Some(number) = record(CounterNumber::new(raw), "counter_number", &mut errors) {
                candidate.number = number;
            }
        }
        if let Some(name) = self.name.as_deref() {
            if name.trim().is_empty() {
                errors.push("name", "name must not be blank");
            } else {
                candidate.name = name.trim().to_owned();
            }
        }
        if let Some(raw) = self.device_id.as_deref() {
            if let Some(device) = record(optional_device(Some(raw)), "device_id", &mut errors) {
                candidate.device_id = device;
            }
        }
        if let Some(branch_id) = self.branch_id {
            candidate.branch_id = branch_id;
        }
        if let Some(is_active) = self.is_active {
            candidate.is_active = is_active;
        }

        errors.into_result().map(|()| candidate)
    }
}

fn optional_device(raw: Option<&str>) -> Result<Option<DeviceId>, CounterValidationError> {
    match raw {
        Some(text) if !text.trim().is_empty() => DeviceId::parse(text).map(Some),
        _ => Ok(None),
    }
}

fn record<T>(
    result: Result<T, CounterValidationError>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    result
        .map_err(|err| errors.push(field, err.to_string()))
        .ok()
}

/// The target branch must exist and not be soft-deleted.
pub fn check_branch_exists(exists: bool) -> FieldErrors {
    if exists {
        FieldErrors::default()
    } else {
        FieldErrors::single("branch", MISSING_BRANCH_MESSAGE)
    }
}

/// `(branch, counter_number)` uniqueness with self-exclusion.
pub fn check_number_available(holder: Option<CounterId>, excluding: Option<CounterId>) -> FieldErrors {
    match holder {
        Some(holder) if Some(holder) != excluding => {
            FieldErrors::single("counter_number", DUPLICATE_NUMBER_MESSAGE)
        }
        _ => FieldErrors::default(),
    }
}

/// Global device uniqueness with self-exclusion.
pub fn check_device_available(holder: Option<CounterId>, excluding: Option<CounterId>) -> FieldErrors {
    match holder {
        Some(holder) if Some(holder) != excluding => {
            FieldErrors::single("device_id", DEVICE_IN_USE_MESSAGE)
        }
        _ => FieldErrors::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{counter, fixture_timestamp};
    use rstest::rstest;

    fn draft(number: i64, device: Option<&str>) -> CounterDraft {
        CounterDraft {
            branch_id: BranchId::random(),
            number,
            name: "Front desk".to_owned(),
            device_id: device.map(str::to_owned),
            is_active: true,
        }
    }

    #[rstest]
    #[case(0)]
    #[case(-4)]
    fn draft_rejects_non_positive_numbers(#[case] number: i64) {
        let errors = draft(number, None)
            .validate(CounterId::random(), fixture_timestamp())
            .expect_err("number must be positive");
        assert_eq!(
            errors.messages_for("counter_number"),
            vec!["counter number must be at least 1"]
        );
    }

    #[rstest]
    #[case(Some("  "), None)]
    #[case(None, None)]
    #[case(Some(" DEV-100 "), Some("DEV-100"))]
    fn draft_normalises_device(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let counter = draft(1, raw)
            .validate(CounterId::random(), fixture_timestamp())
            .expect("valid draft");
        assert_eq!(counter.device_id.as_ref().map(DeviceId::as_str), expected);
    }

    #[rstest]
    fn changes_keep_existing_branch_when_absent() {
        let existing = counter(BranchId::random(), 1, Some("DEV-100"));
        let changes = CounterChanges {
            number: Some(3),
            ..CounterChanges::default()
        };

        let candidate = changes.validate_against(&existing).expect("valid changes");
        assert_eq!(candidate.branch_id, existing.branch_id);
        assert_eq!(candidate.number.get(), 3);
        assert_eq!(candidate.device_id, existing.device_id);
    }

    #[rstest]
    fn blank_device_change_detaches() {
        let existing = counter(BranchId::random(), 1, Some("DEV-100"));
        let changes = CounterChanges {
            device_id: Some(String::new()),
            ..CounterChanges::default()
        };

        let candidate = changes.validate_against(&existing).expect("valid changes");
        assert!(candidate.device_id.is_none());
    }

    #[rstest]
    fn uniqueness_checks_exclude_the_counter_itself() {
        let id = CounterId::random();
        let other = CounterId::random();

        assert!(check_number_available(Some(id), Some(id)).is_empty());
        assert!(check_device_available(Some(id), Some(id)).is_empty());
        assert!(check_number_available(Some(other), Some(id)).has_field("counter_number"));
        assert!(check_device_available(Some(other), None).has_field("device_id"));
    }

    #[rstest]
    fn missing_branch_is_branch_scoped() {
        assert!(check_branch_exists(false).has_field("branch"));
        assert!(check_branch_exists(true).is_empty());
    }
}
