//! Request shapes for EOD transitions, search and sync.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{Branch, Counter, FieldErrors};

/// Default page size for branch search.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size accepted by branch search.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Requested EOD transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EodAction {
    Lock,
    Unlock,
}

impl EodAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

impl fmt::Display for EodAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown choice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{value}\" is not a valid choice")]
pub struct InvalidChoice {
    pub value: String,
}

impl FromStr for EodAction {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            other => Err(InvalidChoice {
                value: other.to_owned(),
            }),
        }
    }
}

/// Body of an EOD lock/unlock request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EodRequest {
    pub action: EodAction,
    pub reason: Option<String>,
}

/// Branch search filters and pagination.
///
/// # Examples
/// ```
/// use backend::domain::BranchSearch;
///
/// let search = BranchSearch::default().paginate(Some(3), Some(10)).expect("valid");
/// assert_eq!(search.offset(), 20);
/// assert!(BranchSearch::default().paginate(Some(0), None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSearch {
    pub q: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub active_only: bool,
    pub has_counter: Option<bool>,
    page: u32,
    page_size: u32,
}

impl Default for BranchSearch {
    fn default() -> Self {
        Self {
            q: None,
            city: None,
            state: None,
            active_only: true,
            has_counter: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BranchSearch {
    /// Apply pagination, keeping defaults for absent values.
    pub fn paginate(mut self, page: Option<i64>, page_size: Option<i64>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();
        if let Some(raw) = page {
            match u32::try_from(raw) {
                Ok(value) if value >= 1 => self.page = value,
                _ => errors.push("page", "page must be at least 1"),
            }
        }
        if let Some(raw) = page_size {
            match u32::try_from(raw) {
                Ok(value) if (1..=MAX_PAGE_SIZE).contains(&value) => self.page_size = value,
                _ => errors.push(
                    "page_size",
                    format!("page size must be between 1 and {MAX_PAGE_SIZE}"),
                ),
            }
        }
        errors.into_result().map(|()| self)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Free-text query, trimmed; `None` when blank.
    pub fn query_text(&self) -> Option<&str> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Collections a client can ask the sync endpoint for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncInclude {
    Branches,
    Counters,
    Staff,
    Schedules,
}

impl SyncInclude {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branches => "branches",
            Self::Counters => "counters",
            Self::Staff => "staff",
            Self::Schedules => "schedules",
        }
    }

    /// Collections owned by this service; the others are skipped.
    pub fn is_served(self) -> bool {
        matches!(self, Self::Branches | Self::Counters)
    }
}

impl FromStr for SyncInclude {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "branches" => Ok(Self::Branches),
            "counters" => Ok(Self::Counters),
            "staff" => Ok(Self::Staff),
            "schedules" => Ok(Self::Schedules),
            other => Err(InvalidChoice {
                value: other.to_owned(),
            }),
        }
    }
}

/// Validated sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub last_sync: Option<DateTime<Utc>>,
    include: Vec<SyncInclude>,
}

impl SyncRequest {
    /// Parse the include list. `None` selects `[branches]`; duplicates are
    /// dropped.
    pub fn new(last_sync: Option<DateTime<Utc>>, include: Option<&[String]>) -> Result<Self, FieldErrors> {
        let Some(raw) = include else {
            return Ok(Self {
                last_sync,
                include: vec![SyncInclude::Branches],
            });
        };
        if raw.is_empty() {
            return Err(FieldErrors::single(
                "include",
                "include must list at least one collection",
            ));
        }

        let mut errors = FieldErrors::default();
        let mut parsed = Vec::with_capacity(raw.len());
        for item in raw {
            match item.parse::<SyncInclude>() {
                Ok(value) if !parsed.contains(&value) => parsed.push(value),
                Ok(_) => {}
                Err(err) => errors.push("include", err.to_string()),
            }
        }
        errors.into_result().map(|()| Self {
            last_sync,
            include: parsed,
        })
    }

    pub fn include(&self) -> &[SyncInclude] {
        &self.include
    }

    pub fn wants(&self, collection: SyncInclude) -> bool {
        self.include.contains(&collection)
    }
}

/// Result of a sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPayload {
    pub server_time: DateTime<Utc>,
    pub branches: Option<Vec<Branch>>,
    pub counters: Option<Vec<Counter>>,
    pub skipped: Vec<SyncInclude>,
}
