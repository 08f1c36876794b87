//! CLI configuration: a flag-aware wrapper around `fibermap_config`.

use std::time::Duration;

use secrecy::SecretString;

use fibermap_core::{GatewayConfig, SessionConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use fibermap_config::{Config, Profile, config_path, load_config_or_default};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the gateway and session configs from the config file, the
/// active profile and flag overrides (flags win).
pub fn resolve(global: &GlobalOpts) -> Result<(GatewayConfig, SessionConfig), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);
    let profile = cfg.profiles.get(&profile_name);

    if profile.is_none() && global.profile.is_some() {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    let url_str = global
        .url
        .as_deref()
        .or(profile.map(|p| p.url.as_str()))
        .ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
    let url = fibermap_config::parse_url(url_str)?;

    let token = match (&global.token, profile) {
        (Some(token), _) => SecretString::from(token.clone()),
        (None, Some(p)) => fibermap_config::resolve_token(p, &profile_name)?,
        (None, None) => {
            return Err(CliError::NoCredentials {
                profile: profile_name,
            });
        }
    };

    let tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        profile.map_or(TlsVerification::SystemDefaults, |p| {
            fibermap_config::tls_for(p, &cfg.defaults)
        })
    };

    let timeout = global
        .timeout
        .or(profile.and_then(|p| p.timeout))
        .unwrap_or(cfg.defaults.timeout);

    let gateway = GatewayConfig {
        url,
        token,
        tls,
        timeout: Duration::from_secs(timeout),
    };
    Ok((gateway, fibermap_config::session_config(profile, &cfg.defaults)))
}
