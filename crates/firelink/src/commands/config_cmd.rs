//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

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

fn format_config(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Internal {
        message: format!("failed to render config: {e}"),
    })
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(&format_config(&cfg)?, global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Init => init(global),
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let defaults = config::load_config().unwrap_or_default();

    let master_url: String = Input::new()
        .with_prompt("Master URL")
        .default(global.master.clone().unwrap_or(defaults.master_url))
        .interact_text()
        .map_err(prompt_err)?;

    let device_port: u16 = Input::new()
        .with_prompt("Device port")
        .default(defaults.device_port)
        .interact_text()
        .map_err(prompt_err)?;

    let ask_confirmation = Confirm::new()
        .with_prompt("Ask before sending commands?")
        .default(defaults.ask_confirmation)
        .interact()
        .map_err(prompt_err)?;

    let formats = ["table", "json", "plain"];
    let current = formats
        .iter()
        .position(|f| *f == defaults.output)
        .unwrap_or(0);
    let output_idx = Select::new()
        .with_prompt("Default output format")
        .items(&formats)
        .default(current)
        .interact()
        .map_err(prompt_err)?;

    let cfg = Config {
        master_url,
        device_port,
        ask_confirmation,
        output: formats.get(output_idx).copied().unwrap_or("table").into(),
        ..defaults
    };
    // Reject a bad URL before it lands on disk.
    cfg.to_fleet_config()?;

    let path = config::save_config(&cfg)?;
    output::print_output(&format!("Wrote {}", path.display()), global.quiet);
    Ok(())
}
