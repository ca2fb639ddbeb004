//! Branch aggregate and its write-side validation rules.
//!
//! Validation is expressed as pure functions over an explicit existing
//! branch (or none, for create) that return [`FieldErrors`]. Services compose
//! them with the storage-backed uniqueness lookup before persisting.
//!
//! Rules:
//! - `opening_time < closing_time`; a violation is reported on both fields.
//! - Codes are trimmed and stored upper-case; they are unique among
//!   branches that are not soft-deleted.
//! - While EOD locked, `opening_time`, `closing_time` and `is_active` are
//!   frozen; one violation is reported per field the request tries to change.

use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FieldErrors, UserId};

/// Maximum length of a branch code.
pub const BRANCH_CODE_MAX: usize = 20;

/// Message attached to both time fields when the hours are not ordered.
pub const HOURS_ORDER_MESSAGE: &str = "opening time must be before closing time";

/// Message attached to `code` when another live branch holds it.
pub const DUPLICATE_CODE_MESSAGE: &str = "branch with this code already exists";

/// Stable branch identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(Uuid);

impl BranchId {
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

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors raised when constructing a [`BranchCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchCodeError {
    #[error("code must not be blank")]
    Blank,
    #[error("code must be at most {max} characters")]
    TooLong { max: usize },
}

/// Upper-cased, trimmed branch code.
///
/// # Examples
/// ```
/// use backend::domain::BranchCode;
///
/// let code = BranchCode::parse(" br1 ").expect("valid code");
/// assert_eq!(code.as_str(), "BR1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchCode(String);

impl BranchCode {
    pub fn parse(raw: &str) -> Result<Self, BranchCodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BranchCodeError::Blank);
        }
        if trimmed.chars().count() > BRANCH_CODE_MAX {
            return Err(BranchCodeError::TooLong {
                max: BRANCH_CODE_MAX,
            });
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BranchCode {
    type Error = BranchCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BranchCode> for String {
    fn from(value: BranchCode) -> Self {
        value.0
    }
}

/// Active end-of-day lock. Present exactly when the branch is locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EodLock {
    pub locked_at: DateTime<Utc>,
    pub locked_by: Option<UserId>,
}

/// Creation and modification stamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
}

impl AuditStamp {
    pub fn created(at: DateTime<Utc>, by: Option<UserId>) -> Self {
        Self {
            created_at: at,
            updated_at: at,
            created_by: by,
            updated_by: by,
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>, by: Option<UserId>) {
        self.updated_at = at;
        self.updated_by = by;
    }
}

/// A clinic branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub code: BranchCode,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub is_active: bool,
    pub eod_lock: Option<EodLock>,
    /// Most recent lock time; survives unlock.
    pub last_locked_at: Option<DateTime<Utc>>,
    pub audit: AuditStamp,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Branch {
    pub fn is_eod_locked(&self) -> bool {
        self.eod_lock.is_some()
    }

    /// Lock time while EOD-locked.
    pub fn eod_locked_at(&self) -> Option<DateTime<Utc>> {
        self.eod_lock.as_ref().map(|lock| lock.locked_at)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply already-validated changes.
    pub fn apply(&mut self, changes: BranchChanges, code: Option<BranchCode>) {
        let BranchChanges {
            name,
            code: _,
            address,
            phone,
            email,
            city,
            state,
            latitude,
            longitude,
            opening_time,
            closing_time,
            is_active,
        } = changes;

        if let Some(name) = name {
            self.name = name.trim().to_owned();
        }
        if let Some(code) = code {
            self.code = code;
        }
        if let Some(address) = address {
            self.address = address;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(email) = email {
            self.email = optional_text(&email);
        }
        if let Some(city) = city {
            self.city = optional_text(&city);
        }
        if let Some(state) = state {
            self.state = optional_text(&state);
        }
        if latitude.is_some() {
            self.latitude = latitude;
        }
        if longitude.is_some() {
            self.longitude = longitude;
        }
        if let Some(opening_time) = opening_time {
            self.opening_time = opening_time;
        }
        if let Some(closing_time) = closing_time {
            self.closing_time = closing_time;
        }
        if let Some(is_active) = is_active {
            self.is_active = is_active;
        }
    }
}

/// Input accepted when creating a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchDraft {
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub is_active: bool,
}

impl BranchDraft {
    /// Checks that need no storage access. Returns the normalised code.
    pub fn validate(&self) -> Result<BranchCode, FieldErrors> {
        let code = BranchCode::parse(&self.code);
        let mut errors = FieldErrors::default();
        if let Err(err) = &code {
            errors.push("code", err.to_string());
        }
        errors.extend(check_name(&self.name));
        errors.extend(check_contact_and_location(
            self.email.as_deref(),
            self.latitude,
            self.longitude,
        ));
        errors.extend(check_hours(self.opening_time, self.closing_time));
        errors.into_result()?;
        code.map_err(|err| FieldErrors::single("code", err.to_string()))
    }
}

/// Partial update of a branch. Absent fields are left untouched; a blank
/// `email`, `city` or `state` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub is_active: Option<bool>,
}

impl BranchChanges {
    /// Validate the changes against the stored branch.
    ///
    /// Returns the normalised code when the request changes it.
    pub fn validate_against(&self, existing: &Branch) -> Result<Option<BranchCode>, FieldErrors> {
        let mut errors = check_eod_restrictions(existing, self);

        let code = match self.code.as_deref() {
            Some(raw) => parse_code(raw, &mut errors).filter(|code| *code != existing.code),
            None => None,
        };
        if let Some(name) = self.name.as_deref() {
            errors.extend(check_name(name));
        }
        errors.extend(check_contact_and_location(
            self.email.as_deref(),
            self.latitude,
            self.longitude,
        ));

        if self.opening_time.is_some() || self.closing_time.is_some() {
            let opening = self.opening_time.unwrap_or(existing.opening_time);
            let closing = self.closing_time.unwrap_or(existing.closing_time);
            errors.extend(check_hours(opening, closing));
        }

        errors.into_result().map(|()| code)
    }
}

/// Trimmed text, `None` when blank.
pub(crate) fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn parse_code(raw: &str, errors: &mut FieldErrors) -> Option<BranchCode> {
    match BranchCode::parse(raw) {
        Ok(code) => Some(code),
        Err(err) => {
            errors.push("code", err.to_string());
            None
        }
    }
}

fn check_name(name: &str) -> FieldErrors {
    if name.trim().is_empty() {
        FieldErrors::single("name", "name must not be blank")
    } else {
        FieldErrors::default()
    }
}

fn check_contact_and_location(
    email: Option<&str>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if email
        .and_then(optional_text)
        .is_some_and(|email| !email.contains('@'))
    {
        errors.push("email", "enter a valid email address");
    }
    if latitude.is_some_and(|value| value.abs() > Decimal::from(90)) {
        errors.push("latitude", "latitude must be between -90 and 90");
    }
    if longitude.is_some_and(|value| value.abs() > Decimal::from(180)) {
        errors.push("longitude", "longitude must be between -180 and 180");
    }
    errors
}

/// Opening must be strictly before closing; reported on both fields.
///
/// # Examples
/// ```
/// use backend::domain::check_hours;
/// use chrono::NaiveTime;
///
/// let nine = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");
/// let errors = check_hours(nine, nine);
/// assert!(errors.has_field("opening_time"));
/// assert!(errors.has_field("closing_time"));
/// ```
pub fn check_hours(opening: NaiveTime, closing: NaiveTime) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if opening >= closing {
        errors.push("opening_time", HOURS_ORDER_MESSAGE);
        errors.push("closing_time", HOURS_ORDER_MESSAGE);
    }
    errors
}

/// Reject changes to frozen fields while the branch is EOD locked.
///
/// A field counts as changed only when the request supplies a value that
/// differs from the stored one.
pub fn check_eod_restrictions(existing: &Branch, changes: &BranchChanges) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if !existing.is_eod_locked() {
        return errors;
    }

    let attempted = [
        (
            "opening_time",
            changes
                .opening_time
                .is_some_and(|value| value != existing.opening_time),
        ),
        (
            "closing_time",
            changes
                .closing_time
                .is_some_and(|value| value != existing.closing_time),
        ),
        (
            "is_active",
            changes
                .is_active
                .is_some_and(|value| value != existing.is_active),
        ),
    ];
    for (field, changed) in attempted {
        if changed {
            errors.push(field, format!("cannot modify {field} while branch is EOD locked"));
        }
    }
    errors
}

/// Uniqueness of a code among live branches.
///
/// `holder` is the live branch currently using `code`, if any; `excluding`
/// is the branch being updated.
pub fn check_code_available(holder: Option<BranchId>, excluding: Option<BranchId>) -> FieldErrors {
    match holder {
        Some(holder) if Some(holder) != excluding => {
            FieldErrors::single("code", DUPLICATE_CODE_MESSAGE)
        }
        _ => FieldErrors::default(),
    }
}

#[cfg(test)]
mod tests;
