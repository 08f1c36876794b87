//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::Password;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking stored tokens.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "debounce_ms = {}", cfg.defaults.debounce_ms);
    let _ = writeln!(out, "history_capacity = {}", cfg.defaults.history_capacity);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"{REDACTED}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(debounce) = p.debounce_ms {
            let _ = writeln!(out, "debounce_ms = {debounce}");
        }
    }

    out.trim_end().to_owned()
}

/// JSON view of the config with plaintext tokens masked.
fn redacted_json(cfg: &Config) -> Result<serde_json::Value, CliError> {
    let mut value = serde_json::to_value(cfg)?;
    if let Some(profiles) = value
        .get_mut("profiles")
        .and_then(serde_json::Value::as_object_mut)
    {
        for profile in profiles.values_mut() {
            if let Some(token) = profile.get_mut("token").filter(|t| !t.is_null()) {
                *token = REDACTED.into();
            }
        }
    }
    Ok(value)
}

fn store_token(profile_name: &str, token: &str) -> Result<(), CliError> {
    let entry = keyring::Entry::new(
        fibermap_config::KEYRING_SERVICE,
        &format!("{profile_name}/token"),
    )
    .map_err(|e| CliError::Validation {
        field: "keyring".into(),
        reason: format!("failed to access keyring: {e}"),
    })?;
    entry.set_password(token).map_err(|e| CliError::Validation {
        field: "keyring".into(),
        reason: format!("failed to store token in keyring: {e}"),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let json = redacted_json(&cfg)?;
            let out = output::render_single(
                &global.output,
                &json,
                |_| format_config_redacted(&cfg),
                |_| "config".into(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let token = match &global.token {
                Some(token) => token.clone(),
                None => Password::new()
                    .with_prompt(format!("API token for profile '{profile_name}'"))
                    .interact()
                    .map_err(|e| CliError::Io(std::io::Error::other(e)))?,
            };
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            store_token(&profile_name, token.trim())?;
            if !global.quiet {
                eprintln!("Token for profile '{profile_name}' stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Profile;

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                url: "https://inventory.example.net/api/topology/".into(),
                token: Some("s3cret".into()),
                token_env: Some("LAB_TOKEN".into()),
                ca_cert: None,
                insecure: None,
                timeout: Some(5),
                debounce_ms: None,
            },
        );
        cfg
    }

    #[test]
    fn text_view_masks_token() {
        let out = format_config_redacted(&sample());
        assert!(out.contains("[profiles.lab]"));
        assert!(out.contains("token = \"****\""));
        assert!(out.contains("token_env = \"LAB_TOKEN\""));
        assert!(!out.contains("s3cret"));
    }

    #[test]
    fn json_view_masks_token() {
        let json = redacted_json(&sample()).unwrap();
        assert_eq!(json["profiles"]["lab"]["token"], "****");
        assert_eq!(json["profiles"]["lab"]["timeout"], 5);
        assert!(!json.to_string().contains("s3cret"));
    }
}
