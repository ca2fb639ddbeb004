//! Translation of driven-port failures into domain errors.
//!
//! Storage-level uniqueness violations surface as the same field-scoped
//! errors the pre-insert checks produce. Collaborator failures on derived
//! fields never reach this module: services degrade them with [`degrade`].

use std::fmt::Display;

use tracing::warn;

use super::ports::{
    BranchConfigurationRepositoryError, BranchRepositoryError, CounterRepositoryError,
};
use super::{
    DEVICE_IN_USE_MESSAGE, DUPLICATE_CODE_MESSAGE, DUPLICATE_NUMBER_MESSAGE, Derived, Error,
    FieldErrors,
};

pub(crate) fn map_branch_error(error: BranchRepositoryError) -> Error {
    match error {
        BranchRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("branch repository unavailable: {message}"))
        }
        BranchRepositoryError::Query { message } => {
            Error::internal(format!("branch repository error: {message}"))
        }
        BranchRepositoryError::DuplicateCode { .. } => {
            FieldErrors::single("code", DUPLICATE_CODE_MESSAGE).into()
        }
    }
}

pub(crate) fn map_counter_error(error: CounterRepositoryError) -> Error {
    match error {
        CounterRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("counter repository unavailable: {message}"))
        }
        CounterRepositoryError::Query { message } => {
            Error::internal(format!("counter repository error: {message}"))
        }
        CounterRepositoryError::DuplicateNumber { .. } => {
            FieldErrors::single("counter_number", DUPLICATE_NUMBER_MESSAGE).into()
        }
        CounterRepositoryError::DuplicateDevice { .. } => {
            FieldErrors::single("device_id", DEVICE_IN_USE_MESSAGE).into()
        }
    }
}

pub(crate) fn map_configuration_error(error: BranchConfigurationRepositoryError) -> Error {
    match error {
        BranchConfigurationRepositoryError::Connection { message } => Error::service_unavailable(
            format!("configuration repository unavailable: {message}"),
        ),
        BranchConfigurationRepositoryError::Query { message } => {
            Error::internal(format!("configuration repository error: {message}"))
        }
    }
}

/// Turn a collaborator result into a [`Derived`] value, logging failures.
pub(crate) fn degrade<T, E: Display>(result: Result<T, E>, field: &'static str) -> Derived<T> {
    match result {
        Ok(value) => Derived::Available(value),
        Err(error) => {
            warn!(field, error = %error, "derived field unavailable");
            Derived::Unavailable
        }
    }
}
