use std::env;
use std::str::FromStr;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header
    pub const TELEGRAM_WEBHOOK_SECRET: &str = "TELEGRAM_WEBHOOK_SECRET";
    /// User id or chat id of the one person allowed to author notes
    pub const ALLOWED_TELEGRAM_ID: &str = "ALLOWED_TELEGRAM_ID";
    /// Bearer token for `POST /api/notes/{id}/edit`. Unset disables the endpoint.
    pub const INTERNAL_API_TOKEN: &str = "INTERNAL_API_TOKEN";
    pub const MAX_NOTE_WORDS: &str = "MAX_NOTE_WORDS";
    pub const SESSION_TTL_MINUTES: &str = "SESSION_TTL_MINUTES";
    pub const THOUGHT_RATE_LIMIT_MAX: &str = "THOUGHT_RATE_LIMIT_MAX";
    pub const THOUGHT_RATE_LIMIT_WINDOW_SECS: &str = "THOUGHT_RATE_LIMIT_WINDOW_SECS";
    pub const TELEGRAM_API_BASE: &str = "TELEGRAM_API_BASE";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const DATABASE_URL: &str = "./.db/notebot.db";
    pub const MAX_NOTE_WORDS: usize = 10_000;
    pub const SESSION_TTL_MINUTES: i64 = 30;
    pub const THOUGHT_RATE_LIMIT_MAX: u32 = 8;
    pub const THOUGHT_RATE_LIMIT_WINDOW_SECS: i64 = 60;
    pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub telegram_bot_token: String,
    pub telegram_webhook_secret: String,
    pub allowed_telegram_id: String,
    pub internal_api_token: Option<String>,
    pub max_note_words: usize,
    pub session_ttl_minutes: i64,
    pub thought_rate_limit_max: u32,
    pub thought_rate_limit_window_secs: i64,
    pub telegram_api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| optional(name).ok_or_else(|| format!("{} must be set", name));

        Ok(Self {
            port: parse_or_default(env_vars::PORT, optional(env_vars::PORT), defaults::PORT),
            database_url: optional(env_vars::DATABASE_URL)
                .unwrap_or_else(|| defaults::DATABASE_URL.to_string()),
            telegram_bot_token: required(env_vars::TELEGRAM_BOT_TOKEN)?,
            telegram_webhook_secret: required(env_vars::TELEGRAM_WEBHOOK_SECRET)?,
            allowed_telegram_id: required(env_vars::ALLOWED_TELEGRAM_ID)?,
            internal_api_token: optional(env_vars::INTERNAL_API_TOKEN),
            max_note_words: parse_or_default(
                env_vars::MAX_NOTE_WORDS,
                optional(env_vars::MAX_NOTE_WORDS),
                defaults::MAX_NOTE_WORDS,
            )
            .max(1),
            session_ttl_minutes: parse_or_default(
                env_vars::SESSION_TTL_MINUTES,
                optional(env_vars::SESSION_TTL_MINUTES),
                defaults::SESSION_TTL_MINUTES,
            )
            .max(1),
            thought_rate_limit_max: parse_or_default(
                env_vars::THOUGHT_RATE_LIMIT_MAX,
                optional(env_vars::THOUGHT_RATE_LIMIT_MAX),
                defaults::THOUGHT_RATE_LIMIT_MAX,
            ),
            thought_rate_limit_window_secs: parse_or_default(
                env_vars::THOUGHT_RATE_LIMIT_WINDOW_SECS,
                optional(env_vars::THOUGHT_RATE_LIMIT_WINDOW_SECS),
                defaults::THOUGHT_RATE_LIMIT_WINDOW_SECS,
            )
            .max(1),
            telegram_api_base: optional(env_vars::TELEGRAM_API_BASE)
                .unwrap_or_else(|| defaults::TELEGRAM_API_BASE.to_string()),
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}

fn parse_or_default<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("{}={:?} is not a valid number, using default {}", name, raw, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (env_vars::TELEGRAM_BOT_TOKEN, "123:abc"),
        (env_vars::TELEGRAM_WEBHOOK_SECRET, "s3cret"),
        (env_vars::ALLOWED_TELEGRAM_ID, "1001"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, defaults::PORT);
        assert_eq!(config.database_url, defaults::DATABASE_URL);
        assert_eq!(config.max_note_words, 10_000);
        assert_eq!(config.session_ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.thought_rate_limit_max, 8);
        assert_eq!(config.thought_rate_limit_window_secs, 60);
        assert_eq!(config.internal_api_token, None);
        assert_eq!(config.allowed_telegram_id, "1001");
    }

    #[test]
    fn test_missing_required_variable() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert_eq!(err, "ALLOWED_TELEGRAM_ID must be set");

        let mut blank = REQUIRED.to_vec();
        blank[0] = (env_vars::TELEGRAM_BOT_TOKEN, "   ");
        assert!(Config::from_lookup(lookup(&blank)).is_err());
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let mut vars = REQUIRED.to_vec();
        vars.push((env_vars::PORT, "eighty"));
        vars.push((env_vars::MAX_NOTE_WORDS, "500"));
        vars.push((env_vars::THOUGHT_RATE_LIMIT_MAX, "-3"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_note_words, 500);
        assert_eq!(config.thought_rate_limit_max, 8);
    }
}
