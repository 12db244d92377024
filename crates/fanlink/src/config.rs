//! CLI configuration -- thin wrapper around `fanlink_config`.
//!
//! Re-exports the shared types and layers `GlobalOpts` flag overrides
//! (--device-url, --poll-timeout-ms, ...) on top of the file + env config.

use std::time::Duration;

use clap::ValueEnum;
use tracing::warn;

use fanlink_core::ControllerConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use fanlink_config::{Config, config_path, load_config, parse_device_url, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Fill `--output` / `--color` from the config `[defaults]` when not given.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = parse_choice::<OutputFormat>("defaults.output", &cfg.defaults.output);
    }
    if global.color.is_none() {
        global.color = parse_choice::<ColorMode>("defaults.color", &cfg.defaults.color);
    }
}

fn parse_choice<T: ValueEnum>(field: &str, value: &str) -> Option<T> {
    let parsed = T::from_str(value, true).ok();
    if parsed.is_none() {
        warn!(field, value, "ignoring unknown config value");
    }
    parsed
}

/// Translate the config file + global flags into a `ControllerConfig`.
///
/// CLI flag overrides take priority over config values.
pub fn resolve(cfg: &Config, global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let mut controller = cfg.to_controller_config()?;

    if let Some(ref raw) = global.device_url {
        controller.url = parse_device_url(raw)?;
    }
    if let Some(ms) = global.poll_timeout_ms {
        controller.poll_timeout = positive_millis("--poll-timeout-ms", ms)?;
    }
    if let Some(ms) = global.command_timeout_ms {
        controller.command_timeout = positive_millis("--command-timeout-ms", ms)?;
    }

    Ok(controller)
}

fn positive_millis(field: &str, ms: u64) -> Result<Duration, CliError> {
    if ms == 0 {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn global() -> GlobalOpts {
        GlobalOpts {
            device_url: None,
            output: None,
            color: None,
            verbose: 0,
            quiet: false,
            poll_timeout_ms: None,
            command_timeout_ms: None,
        }
    }

    #[test]
    fn flags_override_file() {
        let cfg = Config::default();
        let mut g = global();
        g.device_url = Some("http://10.0.0.7".into());
        g.poll_timeout_ms = Some(250);

        let ctrl = resolve(&cfg, &g).unwrap();
        assert_eq!(ctrl.url.as_str(), "http://10.0.0.7/");
        assert_eq!(ctrl.poll_timeout, Duration::from_millis(250));
        assert_eq!(ctrl.command_timeout, Duration::from_secs(3));
    }

    #[test]
    fn zero_timeout_is_usage_error() {
        let mut g = global();
        g.command_timeout_ms = Some(0);
        let err = resolve(&Config::default(), &g).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn bad_url_flag_is_rejected() {
        let mut g = global();
        g.device_url = Some("fan controller".into());
        assert!(matches!(
            resolve(&Config::default(), &g),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn defaults_fill_missing_output() {
        let mut cfg = Config::default();
        cfg.defaults.output = "yaml".into();
        cfg.defaults.color = "bogus".into();

        let mut g = global();
        apply_defaults(&mut g, &cfg);
        assert_eq!(g.output, Some(OutputFormat::Yaml));
        assert_eq!(g.color, None);
    }

    #[test]
    fn explicit_output_wins() {
        let mut cfg = Config::default();
        cfg.defaults.output = "yaml".into();

        let mut g = global();
        g.output = Some(OutputFormat::Json);
        apply_defaults(&mut g, &cfg);
        assert_eq!(g.output, Some(OutputFormat::Json));
    }
}
