//! Clinic branch and counter backend.
//!
//! The crate is laid out hexagonally: [`domain`] holds the rules and ports,
//! [`inbound`] adapts HTTP onto the driving ports and [`outbound`] implements
//! the driven ports against PostgreSQL.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
