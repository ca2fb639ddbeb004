//! Diesel table definitions for the tables this service owns.
//!
//! These must match `backend/migrations` exactly. Collaborator tables
//! (users, staff, appointments, device sessions and transactions) are read
//! with raw SQL and are not declared here.

diesel::table! {
    /// Clinic branches. `deleted_at` marks soft-deleted rows.
    branches (id) {
        id -> Uuid,
        name -> Varchar,
        /// Upper-case; unique among rows where `deleted_at` is null.
        code -> Varchar,
        address -> Text,
        phone -> Varchar,
        email -> Nullable<Varchar>,
        city -> Nullable<Varchar>,
        state -> Nullable<Varchar>,
        latitude -> Nullable<Numeric>,
        longitude -> Nullable<Numeric>,
        opening_time -> Time,
        closing_time -> Time,
        is_active -> Bool,
        /// Set while the branch is EOD-locked.
        eod_locked_at -> Nullable<Timestamptz>,
        eod_locked_by -> Nullable<Uuid>,
        /// Most recent lock; kept after unlock.
        last_eod_locked_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        created_by -> Nullable<Uuid>,
        updated_by -> Nullable<Uuid>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Front-desk counters.
    counters (id) {
        id -> Uuid,
        branch_id -> Uuid,
        counter_number -> Int4,
        name -> Varchar,
        /// Globally unique when present.
        device_id -> Nullable<Varchar>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// One configuration document per branch.
    branch_configurations (branch_id) {
        branch_id -> Uuid,
        configuration -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(counters -> branches (branch_id));
diesel::joinable!(branch_configurations -> branches (branch_id));

diesel::allow_tables_to_appear_in_same_query!(branches, counters, branch_configurations);
