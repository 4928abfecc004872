//! Process settings — an immutable key/value snapshot taken once at startup.
//!
//! Everything downstream reads configuration from a `Settings` value passed
//! in explicitly; nothing reads the process environment after bootstrap.

use std::collections::HashMap;
use std::ffi::OsString;
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::jwt::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, MAX_TTL, TokenConfig};

/// Signing secret for access/refresh tokens.
pub const JWT_SECRET: &str = "QUILLPAD_JWT_SECRET";
/// Access token lifetime (humantime, e.g. `15m`).
pub const ACCESS_TTL: &str = "QUILLPAD_ACCESS_TTL";
/// Refresh token lifetime (humantime, e.g. `7days`).
pub const REFRESH_TTL: &str = "QUILLPAD_REFRESH_TTL";

/// Immutable configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Loads `.env` (if present) and snapshots the process environment.
    ///
    /// Call once from `main`; pass the result down.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable .env file"),
        }
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Builds settings from raw OS strings, skipping pairs that are not UTF-8.
    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_pairs(pairs.into_iter().filter_map(|(k, v)| {
            match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (Ok(k), Err(_)) => {
                    warn!(key = %k, "skipping non UTF-8 environment value");
                    None
                }
                (Err(k), _) => {
                    warn!(key = %k.to_string_lossy(), "skipping non UTF-8 environment key");
                    None
                }
            }
        }))
    }

    /// Builds settings from explicit pairs (tests, embedding).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Trimmed value for `key`; blank values count as unset.
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Parses `key` as a humantime duration, falling back to `default` when
    /// unset, unparsable, zero, or longer than [`MAX_TTL`].
    pub fn duration_or(&self, key: &str, default: Duration) -> Duration {
        let Some(raw) = self.get_non_blank(key) else {
            return default;
        };
        match humantime::parse_duration(raw) {
            Ok(d) if d.is_zero() => {
                warn!(key, "zero duration, using default");
                default
            }
            Ok(d) if d > MAX_TTL => {
                warn!(
                    key,
                    value = raw,
                    max_secs = MAX_TTL.as_secs(),
                    "duration too long, using default"
                );
                default
            }
            Ok(d) => d,
            Err(e) => {
                warn!(key, value = raw, error = %e, "unparsable duration, using default");
                default
            }
        }
    }

    /// Token signing configuration.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.get_non_blank(JWT_SECRET).map(str::to_string),
            access_ttl: self.duration_or(ACCESS_TTL, DEFAULT_ACCESS_TTL),
            refresh_ttl: self.duration_or(REFRESH_TTL, DEFAULT_REFRESH_TTL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_unset() {
        let s = Settings::from_pairs([("A", "  "), ("B", " x ")]);
        assert_eq!(s.get_non_blank("A"), None);
        assert_eq!(s.get_non_blank("B"), Some("x"));
        assert_eq!(s.get_non_blank("C"), None);
    }

    #[test]
    fn token_config_defaults() {
        let cfg = Settings::default().token_config();
        assert!(cfg.secret.is_none());
        assert_eq!(cfg.access_ttl, Duration::from_secs(15 * 60));
        assert_eq!(cfg.refresh_ttl, Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn token_config_parses_durations() {
        let s = Settings::from_pairs([
            (JWT_SECRET, "s3cret"),
            (ACCESS_TTL, "30m"),
            (REFRESH_TTL, "2days"),
        ]);
        let cfg = s.token_config();
        assert_eq!(cfg.secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.access_ttl, Duration::from_secs(30 * 60));
        assert_eq!(cfg.refresh_ttl, Duration::from_secs(2 * 24 * 60 * 60));
    }

    #[test]
    fn bad_durations_fall_back() {
        let s = Settings::from_pairs([(ACCESS_TTL, "soon"), (REFRESH_TTL, "0s")]);
        let cfg = s.token_config();
        assert_eq!(cfg.access_ttl, DEFAULT_ACCESS_TTL);
        assert_eq!(cfg.refresh_ttl, DEFAULT_REFRESH_TTL);
    }

    #[test]
    fn overlong_durations_fall_back() {
        let s = Settings::from_pairs([
            (ACCESS_TTL, "300000000000years"),
            (REFRESH_TTL, "292271023040years"),
        ]);
        let cfg = s.token_config();
        assert_eq!(cfg.access_ttl, DEFAULT_ACCESS_TTL);
        assert_eq!(cfg.refresh_ttl, DEFAULT_REFRESH_TTL);

        let s = Settings::from_pairs([(ACCESS_TTL, "100years 1day")]);
        assert_eq!(s.token_config().access_ttl, DEFAULT_ACCESS_TTL);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_env_pairs_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let s = Settings::from_os_pairs([
            (OsString::from("GOOD"), OsString::from("yes")),
            (OsString::from("BAD_VALUE"), OsString::from_vec(vec![0x66, 0xff])),
            (OsString::from_vec(vec![0xfe, 0x41]), OsString::from("x")),
        ]);
        assert_eq!(s.get("GOOD"), Some("yes"));
        assert_eq!(s.get("BAD_VALUE"), None);
        assert_eq!(s.values.len(), 1);
    }
}
