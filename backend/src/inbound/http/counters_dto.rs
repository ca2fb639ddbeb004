//! Counter request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    BranchId, CounterAssignment, CounterChanges, CounterDetail, CounterDraft, CounterListItem,
    CounterStats, DeviceId, DeviceSession, FieldErrors,
};
use crate::inbound::http::branches_dto::BranchListItemResponse;
use crate::inbound::http::validation::{required, uuid_field};

/// Body of `POST /counters`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateCounterRequest {
    /// Branch id.
    pub branch: Option<String>,
    #[schema(example = 1)]
    pub counter_number: Option<i64>,
    pub name: Option<String>,
    /// Blank or absent means no device.
    pub device_id: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<CreateCounterRequest> for CounterDraft {
    type Error = FieldErrors;

    fn try_from(value: CreateCounterRequest) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let branch = required(value.branch, "branch", &mut errors);
        let branch_id = uuid_field(branch.as_deref(), "branch", &mut errors);
        let number = required(value.counter_number, "counter_number", &mut errors);
        let name = required(value.name, "name", &mut errors);

        match (branch_id, number, name) {
            (Some(branch_id), Some(number), Some(name)) if errors.is_empty() => Ok(CounterDraft {
                branch_id: BranchId::new(branch_id),
                number,
                name,
                device_id: value.device_id,
                is_active: value.is_active.unwrap_or(true),
            }),
            _ => Err(errors),
        }
    }
}

/// Body of `PATCH /counters/{id}`. An empty `device_id` detaches the device.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCounterRequest {
    pub branch: Option<String>,
    pub counter_number: Option<i64>,
    pub name: Option<String>,
    pub device_id: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<UpdateCounterRequest> for CounterChanges {
    type Error = FieldErrors;

    fn try_from(value: UpdateCounterRequest) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let branch_id = uuid_field(value.branch.as_deref(), "branch", &mut errors);
        errors.into_result()?;
        Ok(CounterChanges {
            branch_id: branch_id.map(BranchId::new),
            number: value.counter_number,
            name: value.name,
            device_id: value.device_id,
            is_active: value.is_active,
        })
    }
}

/// Body of `POST /counters/{id}/assign-device`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct AssignDeviceRequest {
    #[schema(example = "DEV-100")]
    pub device_id: Option<String>,
    /// Move the device even if another counter holds it.
    pub force: Option<bool>,
}

impl TryFrom<AssignDeviceRequest> for CounterAssignment {
    type Error = FieldErrors;

    fn try_from(value: AssignDeviceRequest) -> Result<Self, Self::Error> {
        let raw = value
            .device_id
            .filter(|raw| !raw.trim().is_empty())
            .ok_or_else(|| FieldErrors::single("device_id", "this field is required"))?;
        let device_id =
            DeviceId::parse(&raw).map_err(|err| FieldErrors::single("device_id", err.to_string()))?;
        Ok(CounterAssignment {
            device_id,
            force: value.force.unwrap_or(false),
        })
    }
}

/// Query string of `GET /counters`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CounterListQuery {
    /// Restrict to one branch.
    pub branch: Option<String>,
}

/// User currently signed in at the counter's device.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub last_seen: DateTime<Utc>,
}

impl From<DeviceSession> for CurrentUserResponse {
    fn from(value: DeviceSession) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            user_email: value.user_email,
            user_name: value.user_name,
            last_seen: value.last_seen,
        }
    }
}

/// Full counter projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct CounterResponse {
    pub id: String,
    pub branch: BranchListItemResponse,
    pub counter_number: i32,
    pub name: String,
    pub device_id: Option<String>,
    pub is_active: bool,
    pub current_user: Option<CurrentUserResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CounterDetail> for CounterResponse {
    fn from(value: CounterDetail) -> Self {
        let CounterDetail {
            counter,
            branch,
            current_user,
        } = value;
        Self {
            id: counter.id.to_string(),
            branch: branch.into(),
            counter_number: counter.number.get(),
            name: counter.name,
            device_id: counter.device_id.map(|device| device.as_str().to_owned()),
            is_active: counter.is_active,
            current_user: current_user.or_default().map(CurrentUserResponse::from),
            created_at: counter.created_at,
            updated_at: counter.updated_at,
        }
    }
}

/// Counter list projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct CounterListItemResponse {
    pub id: String,
    pub counter_number: i32,
    pub name: String,
    pub device_id: Option<String>,
    pub is_active: bool,
    pub branch_name: String,
    pub branch_code: String,
}

impl From<CounterListItem> for CounterListItemResponse {
    fn from(value: CounterListItem) -> Self {
        let counter = value.counter;
        Self {
            id: counter.id.to_string(),
            counter_number: counter.number.get(),
            name: counter.name,
            device_id: counter.device_id.map(|device| device.as_str().to_owned()),
            is_active: counter.is_active,
            branch_name: value.branch_name,
            branch_code: value.branch_code.to_string(),
        }
    }
}

/// Counter stats projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct CounterStatsResponse {
    pub id: String,
    pub counter_number: i32,
    pub name: String,
    pub branch: String,
    pub transactions_today: u64,
    pub transactions_week: u64,
    pub transactions_total: u64,
    pub current_user_id: Option<String>,
    pub last_user_id: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub average_transaction_time: f64,
    /// Hour of day, e.g. `"14:00"`.
    pub peak_usage_hour: Option<String>,
}

impl From<CounterStats> for CounterStatsResponse {
    fn from(value: CounterStats) -> Self {
        let usage = value.usage.or_default();
        Self {
            id: value.id.to_string(),
            counter_number: value.number.get(),
            name: value.name,
            branch: value.branch_id.to_string(),
            transactions_today: usage.transactions_today,
            transactions_week: usage.transactions_week,
            transactions_total: usage.transactions_total,
            current_user_id: usage.current_user_id.map(|id| id.to_string()),
            last_user_id: usage.last_user_id.map(|id| id.to_string()),
            last_used_at: usage.last_used_at,
            average_transaction_time: usage.average_transaction_seconds,
            peak_usage_hour: usage.peak_usage_hour,
        }
    }
}
