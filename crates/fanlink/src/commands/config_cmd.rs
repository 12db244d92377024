//! Config subcommand handlers.

use dialoguer::Input;

use fanlink_core::DEFAULT_DEVICE_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: ConfigArgs, global: &mut GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: write device URL ──────────────────────────────────
        ConfigCommand::Init => {
            let path = config::config_path();
            let mut cfg = config::load_config()?;

            let url = if let Some(ref url) = global.device_url {
                url.clone()
            } else {
                eprintln!("fanlink configuration");
                eprintln!("   Config path: {}\n", path.display());

                Input::<String>::new()
                    .with_prompt("Device URL")
                    .default(DEFAULT_DEVICE_URL.into())
                    .validate_with(|input: &String| {
                        config::parse_device_url(input).map(|_| ()).map_err(|e| e.to_string())
                    })
                    .interact_text()
                    .map_err(prompt_err)?
            };

            config::parse_device_url(&url)?;
            cfg.device.url = url;

            let written = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Configuration written to {}", written.display());
                eprintln!("  Device: {}", cfg.device.url);
                eprintln!("\n  Test it: fanlink status");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            config::apply_defaults(global, &cfg);

            let out = output::render_single(
                output::format(global),
                &cfg,
                |c: &Config| format!("{c:#?}"),
                |c: &Config| c.device.url.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
