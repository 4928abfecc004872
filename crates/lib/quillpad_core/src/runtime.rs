//! Runtime mode resolution — `online` (multi-user) vs `local` (single
//! pre-seeded offline user).
//!
//! Resolution never fails: bad or missing values fall back to defaults so
//! that startup is never blocked by a malformed override.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::settings::Settings;

/// Mode selector (`local` selects local mode, case-insensitive).
pub const MODE: &str = "QUILLPAD_MODE";
pub const LOCAL_USER_ID: &str = "QUILLPAD_LOCAL_USER_ID";
pub const LOCAL_USERNAME: &str = "QUILLPAD_LOCAL_USERNAME";
pub const LOCAL_EMAIL: &str = "QUILLPAD_LOCAL_EMAIL";
pub const LOCAL_IS_ADMIN: &str = "QUILLPAD_LOCAL_IS_ADMIN";
pub const LOCAL_STORAGE_PATH: &str = "QUILLPAD_LOCAL_STORAGE_PATH";

pub const DEFAULT_LOCAL_USER_ID: i64 = 1;
pub const DEFAULT_LOCAL_USERNAME: &str = "离线用户";
pub const DEFAULT_LOCAL_EMAIL: &str = "local@quillpad.local";
pub const DEFAULT_LOCAL_STORAGE_PATH: &str = "~/.quillpad/data";

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Online,
    Local,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Online => "online",
            RuntimeMode::Local => "local",
        }
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(v) if v.trim().eq_ignore_ascii_case("local") => RuntimeMode::Local,
            _ => RuntimeMode::Online,
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed identity served in local mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRuntime {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    /// Absolute data directory.
    pub storage_path: PathBuf,
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_LOCAL_USER_ID,
            username: DEFAULT_LOCAL_USERNAME.to_string(),
            email: DEFAULT_LOCAL_EMAIL.to_string(),
            is_admin: true,
            storage_path: normalize_path(DEFAULT_LOCAL_STORAGE_PATH),
        }
    }
}

/// Resolved runtime flags. `local` is `Some` iff `mode` is `Local`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub mode: RuntimeMode,
    pub local: Option<LocalRuntime>,
}

impl RuntimeFlags {
    /// Online mode, no local identity.
    pub fn online() -> Self {
        Self {
            mode: RuntimeMode::Online,
            local: None,
        }
    }

    /// Local mode with the given identity.
    pub fn local(local: LocalRuntime) -> Self {
        Self {
            mode: RuntimeMode::Local,
            local: Some(local),
        }
    }

    /// Resolve flags from settings.
    pub fn resolve(settings: &Settings) -> Self {
        let flags = match RuntimeMode::parse(settings.get(MODE)) {
            RuntimeMode::Online => Self::online(),
            RuntimeMode::Local => Self::local(resolve_local(settings)),
        };
        match &flags.local {
            Some(local) => info!(
                mode = %flags.mode,
                user_id = local.user_id,
                username = %local.username,
                storage_path = %local.storage_path.display(),
                "resolved runtime mode"
            ),
            None => info!(mode = %flags.mode, "resolved runtime mode"),
        }
        flags
    }

    pub fn is_local(&self) -> bool {
        self.mode == RuntimeMode::Local
    }
}

fn resolve_local(settings: &Settings) -> LocalRuntime {
    let defaults = LocalRuntime::default();
    LocalRuntime {
        user_id: settings
            .get_non_blank(LOCAL_USER_ID)
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .unwrap_or(defaults.user_id),
        username: settings
            .get_non_blank(LOCAL_USERNAME)
            .map(str::to_string)
            .unwrap_or(defaults.username),
        email: settings
            .get_non_blank(LOCAL_EMAIL)
            .map(str::to_string)
            .unwrap_or(defaults.email),
        is_admin: settings
            .get_non_blank(LOCAL_IS_ADMIN)
            .and_then(parse_bool)
            .unwrap_or(defaults.is_admin),
        storage_path: settings
            .get_non_blank(LOCAL_STORAGE_PATH)
            .map(normalize_path)
            .unwrap_or(defaults.storage_path),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` and make the path absolute.
pub fn normalize_path(raw: &str) -> PathBuf {
    let expanded = expand_home(raw);
    if expanded.is_absolute() {
        return expanded;
    }
    std::path::absolute(&expanded).unwrap_or(expanded)
}

fn expand_home(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\"))
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(raw).to_path_buf(),
    }
}
