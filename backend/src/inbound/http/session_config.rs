//! Session cookie configuration.
//!
//! Server settings supply raw toggles; this module validates them against
//! the build mode and produces the signing key and cookie policy used by the
//! session middleware. Debug builds fall back to defaults with a warning,
//! release builds reject anything missing or malformed.

use std::path::{Path, PathBuf};

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite, time::Duration};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use zeroize::Zeroize;

/// Key file read when no path is configured.
pub const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "session";
const SESSION_KEY_MIN_LEN: usize = 64;
/// `Key::derive_from` panics below this length, whatever the build mode.
const SESSION_KEY_HARD_MIN_LEN: usize = 32;
const SESSION_TTL_HOURS: i64 = 2;
const FINGERPRINT_BYTES: usize = 8;
const SAME_SITE_EXPECTED: &str = "Strict|Lax|None";

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate defaults and emit warnings for missing toggles.
    Debug,
    /// Release builds require explicit, valid session toggles.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backend::inbound::http::session_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// if cfg!(debug_assertions) {
    ///     assert_eq!(mode, BuildMode::Debug);
    /// } else {
    ///     assert_eq!(mode, BuildMode::Release);
    /// }
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Raw session toggles as loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionToggles {
    pub key_file: Option<PathBuf>,
    pub cookie_secure: Option<bool>,
    /// `Strict`, `Lax` or `None`, case-insensitive.
    pub same_site: Option<String>,
    pub allow_ephemeral: bool,
}

/// Validated session settings.
#[derive(Clone)]
pub struct SessionSettings {
    /// Signing and encryption key for cookie sessions.
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    /// A toggle required in release builds is absent.
    #[error("missing required session setting: {name}")]
    MissingSetting { name: &'static str },
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    /// `SameSite=None` requires a secure cookie in release builds.
    #[error("same_site=None requires cookie_secure=true")]
    InsecureSameSiteNone,
    #[error("allow_ephemeral_session must be false in release builds")]
    EphemeralNotAllowed,
}

/// Validate session toggles for the given build mode.
///
/// # Examples
///
/// ```rust
/// use backend::inbound::http::session_config::{
///     BuildMode, SessionToggles, session_settings,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("clinic_session_key_example");
/// std::fs::write(&key_path, vec![b'k'; 64])?;
///
/// let toggles = SessionToggles {
///     key_file: Some(key_path.clone()),
///     cookie_secure: Some(true),
///     same_site: Some("Strict".to_owned()),
///     allow_ephemeral: false,
/// };
/// let settings = session_settings(&toggles, BuildMode::Release)?;
/// assert!(settings.cookie_secure);
///
/// std::fs::remove_file(&key_path)?;
/// # Ok(())
/// # }
/// ```
pub fn session_settings(
    toggles: &SessionToggles,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let cookie_secure = cookie_secure(toggles.cookie_secure, mode)?;
    let same_site = same_site(toggles.same_site.as_deref(), mode, cookie_secure)?;
    if toggles.allow_ephemeral && !mode.is_debug() {
        return Err(SessionConfigError::EphemeralNotAllowed);
    }
    let path = toggles
        .key_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(SESSION_KEY_DEFAULT_PATH));
    let key = session_key(&path, mode, toggles.allow_ephemeral)?;
    info!(fingerprint = %key_fingerprint(&key), "session key loaded");

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
    })
}

/// Build the cookie session middleware for validated settings.
///
/// Cookies are private (encrypted), HTTP-only and expire after two hours.
pub fn session_middleware(settings: &SessionSettings) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), settings.key.clone())
        .cookie_name(SESSION_COOKIE_NAME.to_owned())
        .cookie_path("/".to_owned())
        .cookie_secure(settings.cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(settings.same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(Duration::hours(SESSION_TTL_HOURS)),
        )
        .build()
}

/// Truncated SHA-256 of the signing material, as 16 lowercase hex digits.
///
/// Lets operators confirm which key is live without exposing it.
///
/// ```rust
/// use actix_web::cookie::Key;
/// use backend::inbound::http::session_config::key_fingerprint;
///
/// let fp = key_fingerprint(&Key::generate());
/// assert_eq!(fp.len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

fn cookie_secure(value: Option<bool>, mode: BuildMode) -> Result<bool, SessionConfigError> {
    match value {
        Some(flag) => Ok(flag),
        None if mode.is_debug() => {
            warn!("cookie_secure not set; defaulting to secure");
            Ok(true)
        }
        None => Err(SessionConfigError::MissingSetting {
            name: "cookie_secure",
        }),
    }
}

fn same_site(
    value: Option<&str>,
    mode: BuildMode,
    cookie_secure: bool,
) -> Result<SameSite, SessionConfigError> {
    let fallback = if mode.is_debug() {
        SameSite::Lax
    } else {
        SameSite::Strict
    };
    let Some(raw) = value else {
        if mode.is_debug() {
            warn!("same_site not set; using default");
            return Ok(fallback);
        }
        return Err(SessionConfigError::MissingSetting { name: "same_site" });
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" if cookie_secure => Ok(SameSite::None),
        "none" if mode.is_debug() => {
            warn!("same_site=None without a secure cookie; browsers may reject it");
            Ok(SameSite::None)
        }
        "none" => Err(SessionConfigError::InsecureSameSiteNone),
        _ if mode.is_debug() => {
            warn!(value = %raw, "invalid same_site; using default");
            Ok(fallback)
        }
        _ => Err(SessionConfigError::InvalidSetting {
            name: "same_site",
            value: raw.to_owned(),
            expected: SAME_SITE_EXPECTED,
        }),
    }
}

fn session_key(
    path: &Path,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Key, SessionConfigError> {
    match std::fs::read(path) {
        Ok(mut bytes) => {
            let length = bytes.len();
            let min_len = if mode.is_debug() {
                SESSION_KEY_HARD_MIN_LEN
            } else {
                SESSION_KEY_MIN_LEN
            };
            if length < min_len {
                bytes.zeroize();
                return Err(SessionConfigError::KeyTooShort {
                    path: path.to_path_buf(),
                    length,
                    min_len,
                });
            }
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary session key (dev only)"
            );
            Ok(Key::generate())
        }
        Err(error) => Err(SessionConfigError::KeyRead {
            path: path.to_path_buf(),
            source: error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    struct TempKeyFile {
        path: PathBuf,
    }

    impl TempKeyFile {
        fn new(len: usize) -> Self {
            let path = std::env::temp_dir().join(format!("clinic-session-key-{}", Uuid::new_v4()));
            std::fs::write(&path, vec![b'a'; len]).expect("write key file");
            Self { path }
        }
    }

    impl Drop for TempKeyFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn release_toggles(key: &TempKeyFile) -> SessionToggles {
        SessionToggles {
            key_file: Some(key.path.clone()),
            cookie_secure: Some(true),
            same_site: Some("Strict".to_owned()),
            allow_ephemeral: false,
        }
    }

    fn missing_path() -> PathBuf {
        std::env::temp_dir().join(format!("clinic-missing-key-{}", Uuid::new_v4()))
    }

    #[rstest]
    fn release_accepts_explicit_settings() {
        let key = TempKeyFile::new(64);
        let settings =
            session_settings(&release_toggles(&key), BuildMode::Release).expect("valid settings");
        assert!(settings.cookie_secure);
        assert_eq!(settings.same_site, SameSite::Strict);
    }

    #[rstest]
    fn same_key_file_yields_same_fingerprint() {
        let key = TempKeyFile::new(64);
        let first = session_settings(&release_toggles(&key), BuildMode::Release).expect("first");
        let second = session_settings(&release_toggles(&key), BuildMode::Release).expect("second");
        assert_eq!(key_fingerprint(&first.key), key_fingerprint(&second.key));
    }

    #[rstest]
    #[case::cookie_secure(SessionToggles { cookie_secure: None, ..SessionToggles::default() }, "cookie_secure")]
    #[case::same_site(SessionToggles { cookie_secure: Some(true), same_site: None, ..SessionToggles::default() }, "same_site")]
    fn release_requires_toggles(#[case] toggles: SessionToggles, #[case] expected: &str) {
        let err = session_settings(&toggles, BuildMode::Release)
            .err()
            .expect("missing toggle rejected");
        assert!(
            matches!(err, SessionConfigError::MissingSetting { name } if name == expected),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn release_rejects_short_key() {
        let key = TempKeyFile::new(40);
        let err = session_settings(&release_toggles(&key), BuildMode::Release)
            .err()
            .expect("short key rejected");
        assert!(matches!(
            err,
            SessionConfigError::KeyTooShort { length: 40, min_len: 64, .. }
        ));
    }

    #[rstest]
    fn debug_accepts_shorter_key() {
        let key = TempKeyFile::new(40);
        let toggles = SessionToggles {
            key_file: Some(key.path.clone()),
            ..SessionToggles::default()
        };
        assert!(session_settings(&toggles, BuildMode::Debug).is_ok());
    }

    #[rstest]
    fn release_rejects_missing_key_file() {
        let key = TempKeyFile::new(64);
        let toggles = SessionToggles {
            key_file: Some(missing_path()),
            ..release_toggles(&key)
        };
        let err = session_settings(&toggles, BuildMode::Release)
            .err()
            .expect("unreadable key rejected");
        assert!(matches!(err, SessionConfigError::KeyRead { .. }));
    }

    #[rstest]
    fn release_rejects_ephemeral_keys() {
        let key = TempKeyFile::new(64);
        let toggles = SessionToggles {
            allow_ephemeral: true,
            ..release_toggles(&key)
        };
        let err = session_settings(&toggles, BuildMode::Release)
            .err()
            .expect("ephemeral rejected");
        assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
    }

    #[rstest]
    fn debug_generates_key_when_file_is_missing() {
        let toggles = SessionToggles {
            key_file: Some(missing_path()),
            ..SessionToggles::default()
        };
        let settings = session_settings(&toggles, BuildMode::Debug).expect("ephemeral key");
        assert!(settings.cookie_secure);
        assert_eq!(settings.same_site, SameSite::Lax);
    }

    #[rstest]
    #[case("lax", SameSite::Lax)]
    #[case("STRICT", SameSite::Strict)]
    #[case(" None ", SameSite::None)]
    fn same_site_is_case_insensitive(#[case] raw: &str, #[case] expected: SameSite) {
        assert_eq!(
            same_site(Some(raw), BuildMode::Release, true).expect("valid"),
            expected
        );
    }

    #[rstest]
    fn release_rejects_insecure_same_site_none() {
        assert!(matches!(
            same_site(Some("None"), BuildMode::Release, false),
            Err(SessionConfigError::InsecureSameSiteNone)
        ));
        assert_eq!(
            same_site(Some("None"), BuildMode::Debug, false).expect("debug tolerates"),
            SameSite::None
        );
    }

    #[rstest]
    fn invalid_same_site_depends_on_mode() {
        assert!(matches!(
            same_site(Some("sideways"), BuildMode::Release, true),
            Err(SessionConfigError::InvalidSetting { name: "same_site", .. })
        ));
        assert_eq!(
            same_site(Some("sideways"), BuildMode::Debug, true).expect("fallback"),
            SameSite::Lax
        );
    }

    #[rstest]
    fn fingerprints_are_lowercase_hex_and_key_specific() {
        let first = key_fingerprint(&Key::derive_from(&[b'a'; 64]));
        let second = key_fingerprint(&Key::derive_from(&[b'b'; 64]));
        assert_eq!(first.len(), FINGERPRINT_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(first, second);
    }
}
