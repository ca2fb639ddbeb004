//! Branch request and response bodies.
//!
//! Requests keep every field optional so a missing value becomes a
//! field-scoped error instead of a deserialisation failure. Responses render
//! times as `HH:MM:SS`, coordinates with 6 fractional digits and money with 2.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    AppointmentTotals, Branch, BranchChanges, BranchDetail, BranchDraft, BranchExport, BranchGeo,
    BranchListItem, BranchSearch, BranchStats, COORDINATE_SCALE, Counter, EodAction, EodRequest,
    Error, ExportRequest, FieldErrors, InvalidChoice, MONEY_SCALE, Page, PaymentTotals,
    UserSummary, fixed_point, format_clock_time,
};
use crate::inbound::http::validation::{clock_time, required};

/// Body of `POST /branches`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateBranchRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[schema(value_type = Option<String>, example = "12.971600")]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "77.594600")]
    pub longitude: Option<Decimal>,
    #[schema(example = "09:00")]
    pub opening_time: Option<String>,
    #[schema(example = "18:00")]
    pub closing_time: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<CreateBranchRequest> for BranchDraft {
    type Error = FieldErrors;

    fn try_from(value: CreateBranchRequest) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let name = required(value.name, "name", &mut errors);
        let code = required(value.code, "code", &mut errors);
        let address = required(value.address, "address", &mut errors);
        let phone = required(value.phone, "phone", &mut errors);
        let opening = required(value.opening_time, "opening_time", &mut errors);
        let closing = required(value.closing_time, "closing_time", &mut errors);
        let opening_time = clock_time(opening.as_deref(), "opening_time", &mut errors);
        let closing_time = clock_time(closing.as_deref(), "closing_time", &mut errors);

        match (name, code, address, phone, opening_time, closing_time) {
            (Some(name), Some(code), Some(address), Some(phone), Some(opening), Some(closing))
                if errors.is_empty() =>
            {
                Ok(BranchDraft {
                    name,
                    code,
                    address,
                    phone,
                    email: value.email,
                    city: value.city,
                    state: value.state,
                    latitude: value.latitude,
                    longitude: value.longitude,
                    opening_time: opening,
                    closing_time: closing,
                    is_active: value.is_active.unwrap_or(true),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Body of `PATCH /branches/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[schema(value_type = Option<String>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub longitude: Option<Decimal>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<UpdateBranchRequest> for BranchChanges {
    type Error = FieldErrors;

    fn try_from(value: UpdateBranchRequest) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let opening_time = clock_time(value.opening_time.as_deref(), "opening_time", &mut errors);
        let closing_time = clock_time(value.closing_time.as_deref(), "closing_time", &mut errors);
        errors.into_result()?;

        Ok(BranchChanges {
            name: value.name,
            code: value.code,
            address: value.address,
            phone: value.phone,
            email: value.email,
            city: value.city,
            state: value.state,
            latitude: value.latitude,
            longitude: value.longitude,
            opening_time,
            closing_time,
            is_active: value.is_active,
        })
    }
}

/// Body of `POST /branches/{id}/eod`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct EodActionRequest {
    /// `lock` or `unlock`.
    #[schema(example = "lock")]
    pub action: Option<String>,
    pub reason: Option<String>,
}

impl TryFrom<EodActionRequest> for EodRequest {
    type Error = FieldErrors;

    fn try_from(value: EodActionRequest) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let raw = required(value.action, "action", &mut errors);
        errors.into_result()?;
        let action = raw
            .unwrap_or_default()
            .parse::<EodAction>()
            .map_err(|err: InvalidChoice| FieldErrors::single("action", err.to_string()))?;
        Ok(EodRequest {
            action,
            reason: value.reason.filter(|reason| !reason.trim().is_empty()),
        })
    }
}

/// Query string of `GET /branches`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchSearchQuery {
    /// Matches name, code or address, case-insensitively.
    pub q: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Defaults to `true`.
    pub active_only: Option<bool>,
    pub has_counter: Option<bool>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Between 1 and 100; defaults to 20.
    pub page_size: Option<i64>,
}

impl TryFrom<BranchSearchQuery> for BranchSearch {
    type Error = FieldErrors;

    fn try_from(value: BranchSearchQuery) -> Result<Self, Self::Error> {
        let mut search = BranchSearch::default();
        search.q = value.q;
        search.city = value.city;
        search.state = value.state;
        if let Some(active_only) = value.active_only {
            search.active_only = active_only;
        }
        search.has_counter = value.has_counter;
        search.paginate(value.page, value.page_size)
    }
}

/// Query string of `GET /branches/export`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `csv`, `excel` or `json` (default).
    pub format: Option<String>,
    pub include_inactive: Option<bool>,
    pub include_counters: Option<bool>,
}

impl TryFrom<ExportQuery> for ExportRequest {
    type Error = FieldErrors;

    fn try_from(value: ExportQuery) -> Result<Self, Self::Error> {
        ExportRequest::new(
            value.format.as_deref(),
            value.include_inactive.unwrap_or(false),
            value.include_counters.unwrap_or(false),
        )
    }
}

/// Lift field errors raised while reading a body into the domain error.
pub(super) fn parse_body<T, U>(value: T) -> Result<U, Error>
where
    U: TryFrom<T, Error = FieldErrors>,
{
    U::try_from(value).map_err(Error::from)
}

fn coordinate(value: Option<Decimal>) -> Option<Decimal> {
    value.map(|value| fixed_point(value, COORDINATE_SCALE))
}

fn money(value: Decimal) -> Decimal {
    fixed_point(value, MONEY_SCALE)
}

/// User who placed the current EOD lock.
#[derive(Debug, Serialize, ToSchema)]
pub struct LockedByResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<UserSummary> for LockedByResponse {
    fn from(value: UserSummary) -> Self {
        Self {
            id: value.id.to_string(),
            email: value.email,
            name: value.name,
        }
    }
}

/// Full branch projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchResponse {
    pub id: String,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[schema(value_type = Option<String>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub longitude: Option<Decimal>,
    #[schema(example = "09:00:00")]
    pub opening_time: String,
    #[schema(example = "18:00:00")]
    pub closing_time: String,
    pub is_active: bool,
    pub is_eod_locked: bool,
    pub eod_locked_at: Option<DateTime<Utc>>,
    pub eod_locked_by: Option<LockedByResponse>,
    /// `Locked at <timestamp>` or `Open`.
    pub eod_status: String,
    pub active_counters: u64,
    pub active_staff: u64,
    pub appointments_today: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl From<BranchDetail> for BranchResponse {
    fn from(value: BranchDetail) -> Self {
        let eod_status = value.eod_status();
        let BranchDetail {
            branch,
            locked_by,
            active_counters,
            active_staff,
            appointments_today,
        } = value;
        Self {
            id: branch.id.to_string(),
            name: branch.name,
            code: branch.code.to_string(),
            address: branch.address,
            phone: branch.phone,
            email: branch.email,
            city: branch.city,
            state: branch.state,
            latitude: coordinate(branch.latitude),
            longitude: coordinate(branch.longitude),
            opening_time: format_clock_time(branch.opening_time),
            closing_time: format_clock_time(branch.closing_time),
            is_active: branch.is_active,
            is_eod_locked: branch.eod_lock.is_some(),
            eod_locked_at: branch.eod_lock.as_ref().map(|lock| lock.locked_at),
            eod_locked_by: locked_by.map(LockedByResponse::from),
            eod_status,
            active_counters,
            active_staff: active_staff.or_default(),
            appointments_today: appointments_today.or_default(),
            created_at: branch.audit.created_at,
            updated_at: branch.audit.updated_at,
            created_by: branch.audit.created_by.map(|id| id.to_string()),
            updated_by: branch.audit.updated_by.map(|id| id.to_string()),
        }
    }
}

/// Lock state inside the list projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct EodStatusResponse {
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    /// Email of the locking user.
    pub locked_by: Option<String>,
}

/// Branch list projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchListItemResponse {
    pub id: String,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub is_active: bool,
    pub is_eod_locked: bool,
    pub eod_status: EodStatusResponse,
    pub active_counters: u64,
}

impl From<BranchListItem> for BranchListItemResponse {
    fn from(value: BranchListItem) -> Self {
        let status = value.eod_status();
        let branch = value.branch;
        Self {
            id: branch.id.to_string(),
            name: branch.name,
            code: branch.code.to_string(),
            address: branch.address,
            phone: branch.phone,
            is_active: branch.is_active,
            is_eod_locked: status.locked,
            eod_status: EodStatusResponse {
                locked: status.locked,
                locked_at: status.locked_at,
                locked_by: status.locked_by,
            },
            active_counters: value.active_counters,
        }
    }
}

/// One page of branch search results.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchPageResponse {
    pub items: Vec<BranchListItemResponse>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl From<Page<BranchListItem>> for BranchPageResponse {
    fn from(value: Page<BranchListItem>) -> Self {
        Self {
            items: value.items.into_iter().map(Into::into).collect(),
            page: value.page,
            page_size: value.page_size,
            total: value.total,
        }
    }
}

/// Branch stats projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchStatsResponse {
    pub id: String,
    pub name: String,
    pub code: String,
    pub total_patients: u64,
    pub appointments_today: u64,
    pub appointments_week: u64,
    pub active_staff: u64,
    pub active_counters: u64,
    #[schema(value_type = String, example = "1250.00")]
    pub revenue_today: Decimal,
    #[schema(value_type = String)]
    pub revenue_week: Decimal,
    #[schema(value_type = String)]
    pub pending_payments: Decimal,
    pub is_eod_locked: bool,
    pub last_eod_lock: Option<DateTime<Utc>>,
    pub days_since_last_lock: Option<i64>,
    pub occupancy_rate: f64,
    pub average_daily_appointments: f64,
}

impl From<BranchStats> for BranchStatsResponse {
    fn from(value: BranchStats) -> Self {
        let appointments: AppointmentTotals = value.appointments.or_default();
        let payments: PaymentTotals = value.payments.or_default();
        Self {
            id: value.id.to_string(),
            name: value.name,
            code: value.code.to_string(),
            total_patients: appointments.total_patients,
            appointments_today: appointments.appointments_today,
            appointments_week: appointments.appointments_week,
            active_staff: value.active_staff.or_default(),
            active_counters: value.active_counters,
            revenue_today: money(payments.revenue_today),
            revenue_week: money(payments.revenue_week),
            pending_payments: money(payments.pending_payments),
            is_eod_locked: value.is_eod_locked,
            last_eod_lock: value.last_locked_at,
            days_since_last_lock: value.days_since_last_lock,
            occupancy_rate: appointments.occupancy_rate,
            average_daily_appointments: appointments.average_daily_appointments,
        }
    }
}

/// Branch geo projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchGeoResponse {
    pub id: String,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    #[schema(value_type = Option<String>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub longitude: Option<Decimal>,
    pub is_active: bool,
    pub is_eod_locked: bool,
    pub appointments_today: u64,
    pub active_staff: u64,
}

impl From<BranchGeo> for BranchGeoResponse {
    fn from(value: BranchGeo) -> Self {
        let branch = value.branch;
        Self {
            id: branch.id.to_string(),
            is_eod_locked: branch.is_eod_locked(),
            name: branch.name,
            code: branch.code.to_string(),
            address: branch.address,
            phone: branch.phone,
            latitude: coordinate(branch.latitude),
            longitude: coordinate(branch.longitude),
            is_active: branch.is_active,
            appointments_today: value.appointments_today.or_default(),
            active_staff: value.active_staff.or_default(),
        }
    }
}

/// Stored branch fields, as used by sync and export.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchRecord {
    pub id: String,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[schema(value_type = Option<String>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub longitude: Option<Decimal>,
    pub opening_time: String,
    pub closing_time: String,
    pub is_active: bool,
    pub is_eod_locked: bool,
    pub eod_locked_at: Option<DateTime<Utc>>,
    pub eod_locked_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the branch was removed; clients drop it locally.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Branch> for BranchRecord {
    fn from(branch: Branch) -> Self {
        let lock = branch.eod_lock.as_ref();
        Self {
            id: branch.id.to_string(),
            is_eod_locked: lock.is_some(),
            eod_locked_at: lock.map(|lock| lock.locked_at),
            eod_locked_by: lock.and_then(|lock| lock.locked_by).map(|id| id.to_string()),
            name: branch.name,
            code: branch.code.to_string(),
            address: branch.address,
            phone: branch.phone,
            email: branch.email,
            city: branch.city,
            state: branch.state,
            latitude: coordinate(branch.latitude),
            longitude: coordinate(branch.longitude),
            opening_time: format_clock_time(branch.opening_time),
            closing_time: format_clock_time(branch.closing_time),
            is_active: branch.is_active,
            created_at: branch.audit.created_at,
            updated_at: branch.audit.updated_at,
            deleted_at: branch.deleted_at,
        }
    }
}

/// Stored counter fields, as used by sync and export.
#[derive(Debug, Serialize, ToSchema)]
pub struct CounterRecord {
    pub id: String,
    pub branch: String,
    pub counter_number: i32,
    pub name: String,
    pub device_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Counter> for CounterRecord {
    fn from(counter: Counter) -> Self {
        Self {
            id: counter.id.to_string(),
            branch: counter.branch_id.to_string(),
            counter_number: counter.number.get(),
            name: counter.name,
            device_id: counter.device_id.map(|device| device.as_str().to_owned()),
            is_active: counter.is_active,
            created_at: counter.created_at,
            updated_at: counter.updated_at,
        }
    }
}

/// Body of `GET /branches/export?format=json`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchExportResponse {
    pub exported_at: DateTime<Utc>,
    pub branches: Vec<BranchRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<Vec<CounterRecord>>,
}

impl From<BranchExport> for BranchExportResponse {
    fn from(export: BranchExport) -> Self {
        Self {
            exported_at: export.exported_at,
            branches: export.branches.into_iter().map(Into::into).collect(),
            counters: export
                .counters
                .map(|counters| counters.into_iter().map(Into::into).collect()),
        }
    }
}
