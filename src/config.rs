use std::path::PathBuf;

use crate::mailer::MailConfig;
use crate::session::MAX_RESET_CODE_TTL_SECS;

const DEFAULT_TEACHER_USERNAME: &str = "teacher";
const DEFAULT_TEACHER_SECRET: &str = "teacher";
const DEFAULT_RESET_EMAIL: &str = "office@school.example";
const DEFAULT_RESET_CODE_TTL_SECS: i64 = 600;
const DEFAULT_CONTACT_PREFIX: &str = "+91";

#[derive(Debug, Clone)]
pub struct Config {
    /// Opened at startup when set; otherwise the client picks one via `workspace.select`.
    pub workspace: Option<PathBuf>,
    pub teacher_username: String,
    /// Only used to seed the teacher row of a fresh workspace.
    pub teacher_seed_secret: String,
    pub reset_email: String,
    pub reset_code_ttl_secs: i64,
    pub contact_prefix: String,
    pub mail: Option<MailConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            teacher_username: DEFAULT_TEACHER_USERNAME.to_string(),
            teacher_seed_secret: DEFAULT_TEACHER_SECRET.to_string(),
            reset_email: DEFAULT_RESET_EMAIL.to_string(),
            reset_code_ttl_secs: DEFAULT_RESET_CODE_TTL_SECS,
            contact_prefix: DEFAULT_CONTACT_PREFIX.to_string(),
            mail: None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Non-negative seconds, capped at one day. Anything unparseable falls back to the default.
fn parse_reset_ttl(raw: Option<&str>) -> i64 {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        Some(v) if v >= 0 => v.min(MAX_RESET_CODE_TTL_SECS),
        _ => DEFAULT_RESET_CODE_TTL_SECS,
    }
}

impl Config {
    /// Read settings from the process environment (after `.env` has been loaded).
    ///
    /// | Variable                      | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `ROSTERD_WORKSPACE`           | none                    |
    /// | `ROSTERD_TEACHER_USERNAME`    | `teacher`               |
    /// | `ROSTERD_TEACHER_SECRET`      | `teacher`               |
    /// | `ROSTERD_RESET_EMAIL`         | `office@school.example` |
    /// | `ROSTERD_RESET_CODE_TTL_SECS` | `600` (at most `86400`) |
    /// | `ROSTERD_CONTACT_PREFIX`      | `+91`                   |
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            workspace: env_non_empty("ROSTERD_WORKSPACE").map(PathBuf::from),
            teacher_username: env_non_empty("ROSTERD_TEACHER_USERNAME")
                .unwrap_or(defaults.teacher_username),
            teacher_seed_secret: env_non_empty("ROSTERD_TEACHER_SECRET")
                .unwrap_or(defaults.teacher_seed_secret),
            reset_email: env_non_empty("ROSTERD_RESET_EMAIL").unwrap_or(defaults.reset_email),
            reset_code_ttl_secs: parse_reset_ttl(
                env_non_empty("ROSTERD_RESET_CODE_TTL_SECS").as_deref(),
            ),
            contact_prefix: std::env::var("ROSTERD_CONTACT_PREFIX")
                .unwrap_or(defaults.contact_prefix),
            mail: MailConfig::from_env(),
        }
    }
}
