//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use padsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "server_url": config.server_url,
                    "save_delay_ms": config.save_delay_ms,
                    "flush_on_newline": config.flush_on_newline,
                    "reconnect_delay_ms": config.reconnect_delay_ms,
                    "toast_duration_ms": config.toast_duration_ms,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.server_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  server_url:         {}", config.server_url);
            println!("  save_delay_ms:      {}", config.save_delay_ms);
            println!("  flush_on_newline:   {}", config.flush_on_newline);
            println!("  reconnect_delay_ms: {}", config.reconnect_delay_ms);
            println!("  toast_duration_ms:  {}", config.toast_duration_ms);
            println!(
                "  log_file:           {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one `key = value` assignment
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server_url" => {
            if value.is_empty() {
                bail!("server_url cannot be empty");
            }
            config.server_url = value.to_string();
        }
        "save_delay_ms" => {
            config.save_delay_ms = value
                .parse()
                .context("Invalid value for save_delay_ms. Use a number of milliseconds.")?;
        }
        "flush_on_newline" => {
            config.flush_on_newline = value
                .parse()
                .context("Invalid value for flush_on_newline. Use 'true' or 'false'.")?;
        }
        "reconnect_delay_ms" => {
            config.reconnect_delay_ms = value
                .parse()
                .context("Invalid value for reconnect_delay_ms. Use a number of milliseconds.")?;
        }
        "toast_duration_ms" => {
            config.toast_duration_ms = value
                .parse()
                .context("Invalid value for toast_duration_ms. Use a number of milliseconds.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: server_url, save_delay_ms, flush_on_newline, \
                 reconnect_delay_ms, toast_duration_ms, log_file",
                key
            );
        }
    }

    Ok(())
}
