//! Server configuration from `EFFECTS_*` environment variables.
//!
//! Every value is optional. Anything that fails to parse is logged and
//! replaced by its default so a typo never stops the server from starting.

use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use db::models::{effect::Platform, generation_session::GenerationOptions};
use services::services::effect_pipeline::{
    MAX_MEMORY_MB, MAX_TARGET_FPS, MIN_MEMORY_MB, MIN_TARGET_FPS,
};
use tracing::warn;

pub const DEFAULT_LOG_FILTER: &str = "server=info,services=info,db=info,tower_http=info";
pub const LOG_FILTER_VAR: &str = "EFFECTS_LOG";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_filter: String,
    /// Used when a generation request omits `target_fps`
    pub default_fps: u32,
    /// Used when a generation request omits `max_memory`
    pub default_memory_mb: u32,
    pub default_platform: Platform,
    pub enable_constitution: bool,
    /// Largest decoded upload accepted by `POST /api/files`
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            default_fps: 60,
            default_memory_mb: 256,
            default_platform: Platform::Web,
            enable_constitution: true,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("EFFECTS_HOST")
                .filter(|host| !host.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parse_or(&lookup, "EFFECTS_PORT", defaults.port),
            log_filter: lookup(LOG_FILTER_VAR).unwrap_or(defaults.log_filter),
            default_fps: parse_in_range(
                &lookup,
                "EFFECTS_DEFAULT_FPS",
                defaults.default_fps,
                MIN_TARGET_FPS..=MAX_TARGET_FPS,
            ),
            default_memory_mb: parse_in_range(
                &lookup,
                "EFFECTS_DEFAULT_MEMORY_MB",
                defaults.default_memory_mb,
                MIN_MEMORY_MB..=MAX_MEMORY_MB,
            ),
            default_platform: parse_or(
                &lookup,
                "EFFECTS_DEFAULT_PLATFORM",
                defaults.default_platform,
            ),
            enable_constitution: parse_or(
                &lookup,
                "EFFECTS_ENABLE_CONSTITUTION",
                defaults.enable_constitution,
            ),
            max_upload_bytes: parse_or(
                &lookup,
                "EFFECTS_MAX_UPLOAD_BYTES",
                defaults.max_upload_bytes,
            ),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Generation options a request starts from before its own overrides
    pub fn default_options(&self) -> GenerationOptions {
        GenerationOptions {
            target_fps: self.default_fps,
            max_memory: self.default_memory_mb,
            enable_constitution: self.enable_constitution,
            platform: self.default_platform,
            ..GenerationOptions::default()
        }
    }
}

/// Log filter to install before the rest of the config is read
pub fn log_filter_from_env() -> String {
    env::var(LOG_FILTER_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            warn!(key, value = %raw, default = %default, error = %e, "Invalid config value, using default");
            default
        }
    }
}

/// Like [`parse_or`], but a parsed value outside `range` also falls back.
/// Defaults outside the accepted option range would reject every request
/// that omits the option.
fn parse_in_range(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u32,
    range: RangeInclusive<u32>,
) -> u32 {
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        return value;
    }
    warn!(
        key,
        value,
        min = range.start(),
        max = range.end(),
        default,
        "Config value out of range, using default"
    );
    default
}
