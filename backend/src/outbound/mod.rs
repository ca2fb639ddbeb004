//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories and collaborator
//!   queries using Diesel
//!
//! Adapters translate between domain types and storage rows. They contain no
//! business logic.

pub mod persistence;
