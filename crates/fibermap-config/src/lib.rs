//! Shared configuration for fibermap tools.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation into `fibermap_core::{GatewayConfig, SessionConfig}`. The
//! CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fibermap_core::{GatewayConfig, SessionConfig, TlsVerification};

/// Keyring service name; entries are keyed `{profile}/token`.
pub const KEYRING_SERVICE: &str = "fibermap";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named inventory profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Quiet period before edits are pushed, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            debounce_ms: default_debounce_ms(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_debounce_ms() -> u64 {
    1000
}
fn default_history_capacity() -> usize {
    20
}

/// A named inventory profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Topology API base URL (e.g. "https://inventory.example.net/api/topology/").
    pub url: String,

    /// API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override debounce window.
    pub debounce_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "fibermap", "fibermap").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fibermap");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, layered as defaults → file → `FIBERMAP_` env.
///
/// Nested keys use a double underscore, e.g.
/// `FIBERMAP_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FIBERMAP_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the API token: profile's env var, then keyring, then
/// plaintext.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core configs ─────────────────────────────────────

/// Parse the profile URL, forcing a trailing slash so relative routes
/// resolve under it.
pub fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    with_slash.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// TLS mode for a profile under the given defaults.
pub fn tls_for(profile: &Profile, defaults: &Defaults) -> TlsVerification {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `GatewayConfig` from a profile, with no flag overrides.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    Ok(GatewayConfig {
        url: parse_url(&profile.url)?,
        token: resolve_token(profile, profile_name)?,
        tls: tls_for(profile, defaults),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

/// Session tuning from the defaults and a profile's overrides.
pub fn session_config(profile: Option<&Profile>, defaults: &Defaults) -> SessionConfig {
    let debounce_ms = profile
        .and_then(|p| p.debounce_ms)
        .unwrap_or(defaults.debounce_ms);
    SessionConfig {
        debounce: Duration::from_millis(debounce_ms),
        history_capacity: defaults.history_capacity,
        ..SessionConfig::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile(url: &str) -> Profile {
        Profile {
            url: url.into(),
            token: Some("plain".into()),
            token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            debounce_ms: None,
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert_eq!(cfg.defaults.debounce_ms, 1000);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profiles_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[defaults]
timeout = 5

[profiles.lab]
url = "https://lab.example.net/api/topology"
token_env = "FIBERMAP_LAB_TOKEN"
insecure = true
debounce_ms = 250
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("lab"));
        assert_eq!(cfg.defaults.timeout, 5);
        assert_eq!(cfg.defaults.output, "table");
        let lab = cfg.profile("lab").unwrap();
        assert_eq!(lab.debounce_ms, Some(250));
        assert_eq!(tls_for(lab, &cfg.defaults), TlsVerification::DangerAcceptInvalid);
        assert_eq!(
            session_config(Some(lab), &cfg.defaults).debounce,
            Duration::from_millis(250)
        );
        assert!(matches!(
            cfg.profile("prod"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), profile("https://inv.example.net/api/"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(
            loaded.profile("default").unwrap().url,
            "https://inv.example.net/api/"
        );
    }

    #[test]
    fn url_gets_trailing_slash() {
        let url = parse_url("https://inv.example.net/api/topology").unwrap();
        assert_eq!(url.as_str(), "https://inv.example.net/api/topology/");
        assert!(matches!(
            parse_url("not a url"),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn ca_cert_selects_custom_ca() {
        let mut p = profile("https://inv.example.net/");
        p.ca_cert = Some(PathBuf::from("/etc/ssl/inventory.pem"));
        assert_eq!(
            tls_for(&p, &Defaults::default()),
            TlsVerification::CustomCa(PathBuf::from("/etc/ssl/inventory.pem"))
        );
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        // PATH is set in any test environment.
        let mut p = profile("https://inv.example.net/");
        p.token_env = Some("PATH".into());
        let token = resolve_token(&p, "default").unwrap();
        assert_eq!(token.expose_secret(), std::env::var("PATH").unwrap());
    }

    #[test]
    fn session_defaults_follow_config_defaults() {
        let cfg = session_config(None, &Defaults::default());
        assert_eq!(cfg, SessionConfig::default());
    }
}
