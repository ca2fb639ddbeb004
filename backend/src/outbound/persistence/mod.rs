//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the driven ports, backed by PostgreSQL via
//! `diesel-async` and a `bb8` pool.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. Validation lives in the domain services.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Owned tables vs collaborators**: `branches`, `counters` and
//!   `branch_configurations` are managed through the Diesel DSL and the
//!   embedded migrations. Tables owned by other services are read with raw
//!   SQL, and a missing relation is reported as unavailable.
//!
//! # Example
//!
//! ```ignore
//! use backend::outbound::persistence::{DbPool, DieselBranchRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/clinic")).await?;
//! let branches = DieselBranchRepository::new(pool);
//! ```

mod diesel_branch_activity_query;
mod diesel_branch_configuration_repository;
mod diesel_branch_repository;
mod diesel_counter_activity_query;
mod diesel_counter_repository;
mod diesel_error_mapping;
mod diesel_user_directory;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_branch_activity_query::DieselBranchActivityQuery;
pub use diesel_branch_configuration_repository::DieselBranchConfigurationRepository;
pub use diesel_branch_repository::DieselBranchRepository;
pub use diesel_counter_activity_query::DieselCounterActivityQuery;
pub use diesel_counter_repository::DieselCounterRepository;
pub use diesel_user_directory::DieselUserDirectory;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
