//! Per-branch configuration document and weekly operational hours.
//!
//! Bounds on the settings are declared with `validator` attributes; the
//! weekly table is checked by hand because its rules span fields and rows.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::{BranchId, FieldErrors, MONEY_SCALE, optional_clock_time};

fn default_true() -> bool {
    true
}

fn default_max_daily_appointments() -> u32 {
    50
}

fn default_appointment_duration() -> u32 {
    30
}

fn default_tax_rate() -> Decimal {
    Decimal::new(1800, MONEY_SCALE)
}

fn default_currency() -> String {
    "INR".to_owned()
}

fn default_currency_symbol() -> String {
    "₹".to_owned()
}

fn default_reminder_hours() -> u32 {
    24
}

fn validate_tax_rate(value: &Decimal) -> Result<(), ValidationError> {
    if value.scale() > MONEY_SCALE {
        return Err(ValidationError::new("decimal_places")
            .with_message("ensure that there are no more than 2 decimal places".into()));
    }
    if value.is_sign_negative() || *value >= Decimal::from(1000) {
        return Err(ValidationError::new("range")
            .with_message("tax rate must be between 0 and 999.99".into()));
    }
    Ok(())
}

/// Branch-level feature switches and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BranchSettings {
    #[serde(default = "default_true")]
    pub allow_online_appointments: bool,
    #[serde(default = "default_max_daily_appointments")]
    #[validate(range(min = 1, message = "ensure this value is greater than or equal to 1"))]
    pub max_daily_appointments: u32,
    /// Minutes.
    #[serde(default = "default_appointment_duration")]
    #[validate(range(min = 10, message = "ensure this value is greater than or equal to 10"))]
    pub appointment_duration: u32,
    #[serde(default = "default_tax_rate")]
    #[validate(custom(function = "validate_tax_rate"))]
    pub default_tax_rate: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(max = 3, message = "ensure this field has no more than 3 characters"))]
    pub currency: String,
    #[serde(default = "default_currency_symbol")]
    #[validate(length(max = 5, message = "ensure this field has no more than 5 characters"))]
    pub currency_symbol: String,
    #[serde(default = "default_true")]
    pub send_sms_notifications: bool,
    #[serde(default = "default_true")]
    pub send_email_notifications: bool,
    #[serde(default = "default_reminder_hours")]
    #[validate(range(min = 1, message = "ensure this value is greater than or equal to 1"))]
    pub appointment_reminder_hours: u32,
    #[serde(default)]
    pub require_doctor_approval: bool,
    #[serde(default = "default_true")]
    pub enable_eod_locking: bool,
}

impl Default for BranchSettings {
    fn default() -> Self {
        Self {
            allow_online_appointments: true,
            max_daily_appointments: default_max_daily_appointments(),
            appointment_duration: default_appointment_duration(),
            default_tax_rate: default_tax_rate(),
            currency: default_currency(),
            currency_symbol: default_currency_symbol(),
            send_sms_notifications: true,
            send_email_notifications: true,
            appointment_reminder_hours: default_reminder_hours(),
            require_doctor_approval: false,
            enable_eod_locking: true,
        }
    }
}

/// Convert `validator` output into field-scoped errors.
pub fn field_errors_from(errors: &ValidationErrors) -> FieldErrors {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(left, _), (right, _)| left.cmp(right));

    let mut collected = FieldErrors::default();
    for (field, violations) in fields {
        for violation in violations {
            let message = violation
                .message
                .as_ref()
                .map_or_else(|| violation.code.to_string(), ToString::to_string);
            collected.push(field.to_string(), message);
        }
    }
    collected
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opening hours for one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalHoursEntry {
    pub day: Weekday,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default, with = "optional_clock_time")]
    pub opening_time: Option<NaiveTime>,
    #[serde(default, with = "optional_clock_time")]
    pub closing_time: Option<NaiveTime>,
    #[serde(default, with = "optional_clock_time")]
    pub break_start: Option<NaiveTime>,
    #[serde(default, with = "optional_clock_time")]
    pub break_end: Option<NaiveTime>,
}

impl OperationalHoursEntry {
    /// Check ordering of the day's times. `prefix` scopes field names.
    pub fn check(&self, prefix: &str) -> FieldErrors {
        let mut errors = FieldErrors::default();
        let field = |name: &str| format!("{prefix}.{name}");
        if !self.is_open {
            return errors;
        }

        if let (Some(opening), Some(closing)) = (self.opening_time, self.closing_time) {
            if opening >= closing {
                errors.push(field("opening_time"), super::HOURS_ORDER_MESSAGE);
                errors.push(field("closing_time"), super::HOURS_ORDER_MESSAGE);
            }
        }

        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) => {
                if start >= end {
                    errors.push(field("break_start"), "break start must be before break end");
                } else if self.opening_time.is_some_and(|opening| start < opening)
                    || self.closing_time.is_some_and(|closing| end > closing)
                {
                    errors.push(field("break_start"), "break must fall within opening hours");
                }
            }
            (Some(_), None) => errors.push(field("break_end"), "break end is required with break start"),
            (None, Some(_)) => errors.push(field("break_start"), "break start is required with break end"),
            (None, None) => {}
        }
        errors
    }
}

/// Stored configuration for a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfiguration {
    #[serde(default)]
    pub settings: BranchSettings,
    #[serde(default)]
    pub operational_hours: Vec<OperationalHoursEntry>,
}

impl BranchConfiguration {
    /// Validate settings bounds and the weekly table.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = match self.settings.validate() {
            Ok(()) => FieldErrors::default(),
            Err(violations) => field_errors_from(&violations),
        };

        let mut seen = BTreeSet::new();
        for (index, entry) in self.operational_hours.iter().enumerate() {
            let prefix = format!("operational_hours[{index}]");
            if !seen.insert(entry.day) {
                errors.push(
                    format!("{prefix}.day"),
                    format!("{} is listed more than once", entry.day),
                );
            }
            errors.extend(entry.check(&prefix));
        }
        errors.into_result()
    }
}

/// Configuration as persisted for a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBranchConfiguration {
    pub branch_id: BranchId,
    pub configuration: BranchConfiguration,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::hm;
    use rstest::rstest;
    use serde_json::json;

    fn entry(day: Weekday) -> OperationalHoursEntry {
        OperationalHoursEntry {
            day,
            is_open: true,
            opening_time: Some(hm(9, 0)),
            closing_time: Some(hm(18, 0)),
            break_start: Some(hm(13, 0)),
            break_end: Some(hm(14, 0)),
        }
    }

    #[rstest]
    fn empty_document_deserialises_to_defaults() {
        let configuration: BranchConfiguration =
            serde_json::from_value(json!({})).expect("defaults apply");
        let settings = configuration.settings;

        assert!(settings.allow_online_appointments);
        assert_eq!(settings.max_daily_appointments, 50);
        assert_eq!(settings.appointment_duration, 30);
        assert_eq!(settings.default_tax_rate.to_string(), "18.00");
        assert_eq!(settings.currency, "INR");
        assert_eq!(settings.currency_symbol, "₹");
        assert_eq!(settings.appointment_reminder_hours, 24);
        assert!(!settings.require_doctor_approval);
        assert!(settings.enable_eod_locking);
        assert_eq!(settings, BranchSettings::default());
    }

    #[rstest]
    #[case(json!({"max_daily_appointments": 0}), "max_daily_appointments")]
    #[case(json!({"appointment_duration": 5}), "appointment_duration")]
    #[case(json!({"appointment_reminder_hours": 0}), "appointment_reminder_hours")]
    #[case(json!({"currency": "RUPEE"}), "currency")]
    #[case(json!({"currency_symbol": "RUPEES"}), "currency_symbol")]
    #[case(json!({"default_tax_rate": "18.125"}), "default_tax_rate")]
    fn settings_bounds_are_enforced(#[case] settings: serde_json::Value, #[case] field: &str) {
        let configuration: BranchConfiguration =
            serde_json::from_value(json!({ "settings": settings })).expect("well-formed");

        let errors = configuration.validate().expect_err("out of bounds");
        assert!(errors.has_field(field), "{field}: {errors:?}");
    }

    #[rstest]
    fn valid_week_passes() {
        let configuration = BranchConfiguration {
            settings: BranchSettings::default(),
            operational_hours: vec![entry(Weekday::Monday), entry(Weekday::Tuesday)],
        };
        assert!(configuration.validate().is_ok());
    }

    #[rstest]
    fn duplicate_days_are_rejected() {
        let configuration = BranchConfiguration {
            settings: BranchSettings::default(),
            operational_hours: vec![entry(Weekday::Friday), entry(Weekday::Friday)],
        };
        let errors = configuration.validate().expect_err("duplicate day");
        assert!(errors.has_field("operational_hours[1].day"));
    }

    #[rstest]
    fn closed_days_skip_time_checks() {
        let mut closed = entry(Weekday::Sunday);
        closed.is_open = false;
        closed.opening_time = Some(hm(18, 0));
        closed.closing_time = Some(hm(9, 0));
        assert!(closed.check("operational_hours[0]").is_empty());
    }

    #[rstest]
    fn unordered_hours_flag_both_fields() {
        let mut day = entry(Weekday::Monday);
        day.closing_time = Some(hm(8, 0));
        day.break_start = None;
        day.break_end = None;

        let errors = day.check("operational_hours[0]");
        assert!(errors.has_field("operational_hours[0].opening_time"));
        assert!(errors.has_field("operational_hours[0].closing_time"));
    }

    #[rstest]
    #[case(Some(hm(13, 0)), None, "operational_hours[0].break_end")]
    #[case(None, Some(hm(14, 0)), "operational_hours[0].break_start")]
    #[case(Some(hm(14, 0)), Some(hm(13, 0)), "operational_hours[0].break_start")]
    #[case(Some(hm(8, 0)), Some(hm(9, 30)), "operational_hours[0].break_start")]
    fn break_rules(
        #[case] start: Option<NaiveTime>,
        #[case] end: Option<NaiveTime>,
        #[case] field: &str,
    ) {
        let mut day = entry(Weekday::Monday);
        day.break_start = start;
        day.break_end = end;
        assert!(day.check("operational_hours[0]").has_field(field));
    }

    #[rstest]
    fn entry_times_accept_short_form() {
        let day: OperationalHoursEntry = serde_json::from_value(json!({
            "day": "saturday",
            "opening_time": "10:00",
            "closing_time": "14:30"
        }))
        .expect("short times parse");
        assert!(day.is_open);
        assert_eq!(day.closing_time, Some(hm(14, 30)));
        assert_eq!(day.break_start, None);
    }
}
