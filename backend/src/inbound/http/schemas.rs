//! OpenAPI schema definitions for domain types.
//!
//! Domain types do not derive `ToSchema`. The wrappers here mirror their
//! serialised shape and are registered under the domain type's name.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The request conflicts with the resource's current state.
    #[schema(rename = "conflict")]
    Conflict,
    /// A backing store could not be reached.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// Validation failures carry `details.fieldErrors`, an object mapping field
/// names to lists of messages.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    #[schema(example = "validation failed")]
    message: String,
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    #[schema(example = json!({"fieldErrors": {"code": ["branch with this code already exists"]}}))]
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::Weekday`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Weekday)]
#[schema(rename_all = "lowercase")]
pub enum WeekdaySchema {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// OpenAPI schema for [`crate::domain::BranchSettings`].
#[derive(ToSchema)]
#[schema(as = crate::domain::BranchSettings)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct BranchSettingsSchema {
    #[schema(default = true)]
    allow_online_appointments: bool,
    #[schema(default = 50, minimum = 1)]
    max_daily_appointments: u32,
    /// Minutes.
    #[schema(default = 30, minimum = 10)]
    appointment_duration: u32,
    #[schema(value_type = String, default = "18.00")]
    default_tax_rate: String,
    #[schema(default = "INR", max_length = 3)]
    currency: String,
    #[schema(default = "₹", max_length = 5)]
    currency_symbol: String,
    #[schema(default = true)]
    send_sms_notifications: bool,
    #[schema(default = true)]
    send_email_notifications: bool,
    #[schema(default = 24, minimum = 1)]
    appointment_reminder_hours: u32,
    #[schema(default = false)]
    require_doctor_approval: bool,
    #[schema(default = true)]
    enable_eod_locking: bool,
}

/// OpenAPI schema for [`crate::domain::OperationalHoursEntry`].
#[derive(ToSchema)]
#[schema(as = crate::domain::OperationalHoursEntry)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct OperationalHoursEntrySchema {
    day: WeekdaySchema,
    #[schema(default = true)]
    is_open: bool,
    #[schema(example = "09:00")]
    opening_time: Option<String>,
    #[schema(example = "18:00")]
    closing_time: Option<String>,
    break_start: Option<String>,
    break_end: Option<String>,
}

/// OpenAPI schema for [`crate::domain::BranchConfiguration`].
#[derive(ToSchema)]
#[schema(as = crate::domain::BranchConfiguration)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct BranchConfigurationSchema {
    settings: BranchSettingsSchema,
    operational_hours: Vec<OperationalHoursEntrySchema>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::PartialSchema;

    fn schema_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[test]
    fn error_code_schema_lists_every_code() {
        let json = schema_json::<ErrorCodeSchema>();
        for code in [
            "invalid_request",
            "unauthorized",
            "forbidden",
            "not_found",
            "conflict",
            "service_unavailable",
            "internal_error",
        ] {
            assert!(json.contains(code), "missing {code}");
        }
    }

    #[test]
    fn error_schema_uses_domain_name() {
        // utoipa replaces :: with . in schema names
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        assert!(schema_json::<ErrorSchema>().contains("traceId"));
    }

    #[test]
    fn configuration_schema_documents_defaults() {
        let json = schema_json::<BranchSettingsSchema>();
        assert!(json.contains("enable_eod_locking"));
        assert!(json.contains("18.00"));
    }
}
