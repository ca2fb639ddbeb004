//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are implemented by domain services
//! and consumed by inbound adapters. Driven ports (repositories and
//! collaborator queries) are implemented by outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod branch_activity_query;
mod branch_command;
mod branch_configuration_repository;
mod branch_query;
mod branch_repository;
mod counter_activity_query;
mod counter_command;
mod counter_query;
mod counter_repository;
mod sync_query;
mod user_directory;

#[cfg(test)]
pub use branch_activity_query::MockBranchActivityQuery;
pub use branch_activity_query::{
    BranchActivityQuery, BranchActivityQueryError, FixtureBranchActivityQuery,
};
pub use branch_command::BranchCommand;
#[cfg(test)]
pub use branch_command::MockBranchCommand;
#[cfg(test)]
pub use branch_configuration_repository::MockBranchConfigurationRepository;
pub use branch_configuration_repository::{
    BranchConfigurationRepository, BranchConfigurationRepositoryError,
    FixtureBranchConfigurationRepository,
};
pub use branch_query::BranchQuery;
#[cfg(test)]
pub use branch_query::MockBranchQuery;
#[cfg(test)]
pub use branch_repository::MockBranchRepository;
pub use branch_repository::{BranchRepository, BranchRepositoryError, FixtureBranchRepository};
#[cfg(test)]
pub use counter_activity_query::MockCounterActivityQuery;
pub use counter_activity_query::{
    CounterActivityQuery, CounterActivityQueryError, FixtureCounterActivityQuery,
};
pub use counter_command::CounterCommand;
#[cfg(test)]
pub use counter_command::MockCounterCommand;
pub use counter_query::CounterQuery;
#[cfg(test)]
pub use counter_query::MockCounterQuery;
#[cfg(test)]
pub use counter_repository::MockCounterRepository;
pub use counter_repository::{CounterRepository, CounterRepositoryError, FixtureCounterRepository};
#[cfg(test)]
pub use sync_query::MockSyncQuery;
pub use sync_query::SyncQuery;
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{FixtureUserDirectory, UserDirectory, UserDirectoryError};
