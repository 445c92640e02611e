//! Client configuration parsed from environment variables.
//!
//! Every knob has a default, and a value that fails to parse falls back to
//! the default instead of failing startup. Both cases are logged.
//!
//! Optional:
//! - `ROLLCALL_API_URL`: default `http://localhost:3001`
//! - `ROLLCALL_PUSH_URL`: default derived from the API URL (`ws://host/ws`)
//! - `ROLLCALL_CAPTURE_URL`: default `{api_url}/capture`
//! - `ROLLCALL_TICK_MS`: default 1000
//! - `ROLLCALL_POLL_MS`: default 5000

use std::env::VarError;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_TICK_MS: u64 = 1000;
pub const DEFAULT_POLL_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend HTTP base URL, without trailing slash.
    pub api_url: String,
    /// Push channel websocket URL.
    pub push_url: String,
    /// Base of the student capture link; the token is appended as a path segment.
    pub capture_url: String,
    /// Countdown tick period.
    pub tick: Duration,
    /// Roster poll interval.
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Build typed config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("ROLLCALL_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        Self::with_api_url(api_url, &lookup)
    }

    /// Rebuild the config around a different API URL, keeping the other
    /// overrides from `lookup`. Used when the CLI passes `--api-url`.
    pub fn with_api_url<F>(api_url: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = api_url.into().trim_end_matches('/').to_owned();
        let push_url = lookup("ROLLCALL_PUSH_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| derive_push_url(&api_url));
        let capture_url = lookup("ROLLCALL_CAPTURE_URL")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| format!("{api_url}/capture"), |v| v.trim_end_matches('/').to_owned());
        let tick_ms = parse_or("ROLLCALL_TICK_MS", lookup("ROLLCALL_TICK_MS"), DEFAULT_TICK_MS);
        let poll_ms = parse_or("ROLLCALL_POLL_MS", lookup("ROLLCALL_POLL_MS"), DEFAULT_POLL_MS);

        Self {
            api_url,
            push_url,
            capture_url,
            tick: Duration::from_millis(tick_ms.max(1)),
            poll_interval: Duration::from_millis(poll_ms.max(1)),
        }
    }

    /// The link a student opens to capture attendance against `token`.
    #[must_use]
    pub fn capture_link(&self, token: &str) -> String {
        format!("{}/{token}", self.capture_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Process environment lookup for [`ClientConfig::from_lookup`] and
/// [`ClientConfig::with_api_url`]. A value that is not valid unicode is
/// treated as unset.
#[must_use]
pub fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => {
            warn!(key, value = ?raw, "config: value is not unicode, using default");
            None
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(e) => {
            warn!(key, value = %raw, error = %e, "config: invalid value, using default");
            default
        }
    }
}

/// `http://host:port/...` becomes `ws://host:port/ws`; `https` becomes `wss`.
fn derive_push_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        return format!("wss://{}/ws", host_part(rest));
    }
    if let Some(rest) = api_url.strip_prefix("http://") {
        return format!("ws://{}/ws", host_part(rest));
    }
    format!("ws://{}/ws", host_part(api_url))
}

fn host_part(rest: &str) -> &str {
    rest.split('/').next().unwrap_or(rest)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
