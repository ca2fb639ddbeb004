//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed branch and counter model, the
//! validation rules that guard it, and the services implementing the driving
//! ports. Nothing in this module knows about HTTP or SQL; adapters reach it
//! through [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) : API error response payload.
//! - FieldErrors : per-field validation failures, convertible into `Error`.
//! - Branch, Counter : aggregates with their drafts and change sets.
//! - BranchService, CounterService, SyncService : driving port
//!   implementations.

pub mod branch;
pub mod branch_configuration;
pub(crate) mod branch_projection;
pub mod branch_requests;
pub mod branch_service;
pub mod branch_views;
pub mod clock_time;
pub mod counter;
pub mod counter_service;
pub mod counter_views;
pub mod data_transfer;
pub mod derived;
pub mod error;
pub mod field_errors;
pub mod ports;
pub(crate) mod repository_errors;
pub mod sync_service;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::branch::{
    AuditStamp, BRANCH_CODE_MAX, Branch, BranchChanges, BranchCode, BranchCodeError,
    BranchDraft, BranchId, DUPLICATE_CODE_MESSAGE, EodLock, HOURS_ORDER_MESSAGE,
    check_code_available, check_eod_restrictions, check_hours,
};
pub use self::branch_configuration::{
    BranchConfiguration, BranchSettings, OperationalHoursEntry, StoredBranchConfiguration,
    Weekday, field_errors_from,
};
pub use self::branch_requests::{
    BranchSearch, DEFAULT_PAGE_SIZE, EodAction, EodRequest, InvalidChoice, MAX_PAGE_SIZE,
    SyncInclude, SyncPayload, SyncRequest,
};
pub use self::branch_service::BranchService;
pub use self::branch_views::{
    AppointmentTotals, BranchDetail, BranchGeo, BranchListItem, BranchStats,
    COORDINATE_SCALE, EodStatus, MONEY_SCALE, Page, PaymentTotals, days_since_lock,
    eod_status_text, fixed_point,
};
pub use self::clock_time::{
    CLOCK_TIME_FORMAT, format_clock_time, optional_clock_time, parse_clock_time,
};
pub use self::counter::{
    Counter, CounterChanges, CounterDraft, CounterId, CounterNumber, CounterValidationError,
    DEVICE_ID_MAX, DEVICE_IN_USE_MESSAGE, DUPLICATE_NUMBER_MESSAGE, DeviceId,
    MISSING_BRANCH_MESSAGE, check_branch_exists, check_device_available,
    check_number_available,
};
pub use self::counter_service::CounterService;
pub use self::counter_views::{
    CURRENT_USER_WINDOW_MINUTES, CounterAssignment, CounterDetail, CounterListItem,
    CounterStats, CounterUsage, DeviceSession, current_session,
};
pub use self::data_transfer::{
    BranchExport, ExportFormat, ExportRequest, ImportFile, ImportRequest,
};
pub use self::derived::Derived;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::field_errors::{FieldErrors, FieldViolation};
pub use self::sync_service::SyncService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserSummary, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
