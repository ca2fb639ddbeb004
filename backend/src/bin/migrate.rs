//! Apply pending schema migrations and exit.
//!
//! Reads the connection string from `CLINIC_DATABASE_URL`, or from the first
//! argument when given.

use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing_subscriber::{EnvFilter, fmt};

use backend::outbound::persistence::run_pending_migrations;

const DATABASE_URL_ENV: &str = "CLINIC_DATABASE_URL";

fn main() -> Result<()> {
    color_eyre::install()?;
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let database_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
        .ok_or_else(|| eyre!("set {DATABASE_URL_ENV} or pass a database URL"))?;
    let applied = run_pending_migrations(&database_url).wrap_err("apply migrations")?;
    if applied.is_empty() {
        println!("schema up to date");
    }
    for version in applied {
        println!("applied {version}");
    }
    Ok(())
}
