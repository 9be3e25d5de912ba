//! Application-level configuration loading, including the fallback content
//! lists consulted when the content generator is unavailable.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROSTRUM_SYNC_CONFIG_PATH";
/// Seed duration for room timers created without an explicit duration.
const DEFAULT_ROOM_SECONDS: u32 = 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the engine.
pub struct AppConfig {
    /// Seconds a lazily-created room timer is seeded with.
    pub default_room_seconds: u32,
    /// Topics used when the content generator fails or returns nothing.
    pub fallback_topics: Vec<String>,
    /// Predefined join passwords handed out to new classrooms.
    pub passwords: Vec<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        topics = config.fallback_topics.len(),
                        passwords = config.passwords.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_room_seconds: DEFAULT_ROOM_SECONDS,
            fallback_topics: default_topics(),
            passwords: default_passwords(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    #[serde(default)]
    default_room_seconds: Option<u32>,
    #[serde(default)]
    fallback_topics: Vec<String>,
    #[serde(default)]
    passwords: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            default_room_seconds: raw
                .default_room_seconds
                .unwrap_or(defaults.default_room_seconds),
            fallback_topics: if raw.fallback_topics.is_empty() {
                defaults.fallback_topics
            } else {
                raw.fallback_topics
            },
            passwords: if raw.passwords.is_empty() {
                defaults.passwords
            } else {
                raw.passwords
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in debate topics shipped with the binary.
fn default_topics() -> Vec<String> {
    [
        "Should social media platforms be responsible for user-generated content?",
        "Are movie remakes ever better than the original?",
        "Is it acceptable to recline your seat on an airplane?",
        "Is artificial intelligence a threat to humanity?",
        "Streaming vs. Owning: Is it better to stream media or own physical copies?",
        "AI in Music: Should artists be allowed to use AI to create songs?",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Built-in join passwords shipped with the binary.
fn default_passwords() -> Vec<String> {
    [
        "logic101", "rhetoric202", "argument303", "reason404", "debate505", "clarity111",
        "proof212", "rebuttal313", "ethos414", "logos515", "pathos616", "facts717", "topic818",
        "motion919", "verdict121", "case232", "point343", "speaker454", "panel565", "forum676",
        "inquiry787", "thesis898", "axiom909", "voice112", "speech223", "dialogue334",
        "discourse445", "persuade556", "evidence667", "theory778", "analysis889", "critical990",
        "insight123", "concept234", "idea345", "query456",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_content_lists() {
        let config = AppConfig::default();
        assert_eq!(config.default_room_seconds, 60);
        assert!(!config.fallback_topics.is_empty());
        assert!(config.passwords.iter().all(|pw| pw.len() >= 6));
    }

    #[test]
    fn raw_config_keeps_defaults_for_missing_sections() {
        let raw: RawConfig = serde_json::from_str(r#"{"default_room_seconds": 300}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.default_room_seconds, 300);
        assert!(!config.fallback_topics.is_empty());
    }
}
