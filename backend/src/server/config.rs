//! Server settings loaded via OrthoConfig.
//!
//! Every field can be set with a `CLINIC_`-prefixed environment variable or
//! a configuration file. Value fields also accept a command-line flag; the
//! boolean toggles are file and environment only, since a clap `SetTrue`
//! flag always reports `false` when absent and would mask both layers.

use std::net::SocketAddr;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use backend::inbound::http::session_config::SessionToggles;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CLINIC")]
pub struct ServerSettings {
    /// Socket address to listen on, `0.0.0.0:8080` when unset.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; fixture adapters are used when unset.
    pub database_url: Option<String>,
    pub pool_max_size: Option<u32>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false, skip_cli)]
    pub run_migrations: bool,
    pub session_key_file: Option<PathBuf>,
    #[ortho_config(skip_cli)]
    pub cookie_secure: Option<bool>,
    /// `Strict`, `Lax` or `None`.
    pub same_site: Option<String>,
    #[ortho_config(default = false, skip_cli)]
    pub allow_ephemeral_session: bool,
}

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind_addr '{value}': {message}")]
    BindAddr { value: String, message: String },
}

impl ServerSettings {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Database URL with surrounding whitespace removed; blank counts as unset.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Session toggles for [`backend::inbound::http::session_config`].
    pub fn session_toggles(&self) -> SessionToggles {
        SessionToggles {
            key_file: self.session_key_file.clone(),
            cookie_secure: self.cookie_secure,
            same_site: self.same_site.clone(),
            allow_ephemeral: self.allow_ephemeral_session,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "CLINIC_BIND_ADDR",
        "CLINIC_DATABASE_URL",
        "CLINIC_POOL_MAX_SIZE",
        "CLINIC_RUN_MIGRATIONS",
        "CLINIC_SESSION_KEY_FILE",
        "CLINIC_COOKIE_SECURE",
        "CLINIC_SAME_SITE",
        "CLINIC_ALLOW_EPHEMERAL_SESSION",
    ];

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("clinic-backend")])
            .expect("config should load")
    }

    /// Every variable cleared except the given overrides.
    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default address"),
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().expect("valid")
        );
        assert_eq!(settings.pool_max_size(), DEFAULT_POOL_MAX_SIZE);
        assert!(settings.database_url().is_none());
        assert!(!settings.run_migrations);
        assert_eq!(settings.session_toggles(), SessionToggles::default());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("CLINIC_BIND_ADDR", "127.0.0.1:9000"),
            ("CLINIC_DATABASE_URL", "postgres://clinic@localhost/clinic"),
            ("CLINIC_POOL_MAX_SIZE", "4"),
            ("CLINIC_RUN_MIGRATIONS", "true"),
            ("CLINIC_COOKIE_SECURE", "false"),
            ("CLINIC_SAME_SITE", "Lax"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("address").to_string(),
            "127.0.0.1:9000"
        );
        assert_eq!(
            settings.database_url(),
            Some("postgres://clinic@localhost/clinic")
        );
        assert_eq!(settings.pool_max_size(), 4);
        assert!(settings.run_migrations);
        let toggles = settings.session_toggles();
        assert_eq!(toggles.cookie_secure, Some(false));
        assert_eq!(toggles.same_site.as_deref(), Some("Lax"));
    }

    #[rstest]
    fn command_line_flags_do_not_mask_environment_toggles() {
        let _guard = lock_env(env_with(&[
            ("CLINIC_RUN_MIGRATIONS", "true"),
            ("CLINIC_COOKIE_SECURE", "true"),
            ("CLINIC_ALLOW_EPHEMERAL_SESSION", "true"),
        ]));

        let settings = ServerSettings::load_from_iter([
            OsString::from("clinic-backend"),
            OsString::from("--bind-addr"),
            OsString::from("127.0.0.1:9100"),
        ])
        .expect("config should load");
        assert_eq!(
            settings.bind_addr().expect("address").to_string(),
            "127.0.0.1:9100"
        );
        assert!(settings.run_migrations);
        let toggles = settings.session_toggles();
        assert_eq!(toggles.cookie_secure, Some(true));
        assert!(toggles.allow_ephemeral);
    }

    #[rstest]
    fn blank_database_url_counts_as_unset() {
        let _guard = lock_env(env_with(&[("CLINIC_DATABASE_URL", "   ")]));

        assert!(load_from_empty_args().database_url().is_none());
    }

    #[rstest]
    fn malformed_bind_addr_is_reported() {
        let _guard = lock_env(env_with(&[("CLINIC_BIND_ADDR", "localhost")]));

        let err = load_from_empty_args()
            .bind_addr()
            .expect_err("hostname without port rejected");
        assert!(matches!(err, SettingsError::BindAddr { value, .. } if value == "localhost"));
    }
}
