//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use linkbox_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "settings_path": config.settings_path,
                    "document_debounce_ms": config.document_debounce_ms,
                    "settings_debounce_ms": config.settings_debounce_ms,
                    "self_write_window_ms": config.self_write_window_ms
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.settings_path.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            let document = config.document_options();
            let settings = config.settings_options();

            println!("Configuration:");
            println!("  settings_path:        {}", config.settings_path.display());
            println!(
                "  document_debounce_ms: {} (effective {:?})",
                config.document_debounce_ms, document.debounce
            );
            println!(
                "  settings_debounce_ms: {} (effective {:?})",
                config.settings_debounce_ms, settings.debounce
            );
            println!("  self_write_window_ms: {}", config.self_write_window_ms);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value and write the config file
pub fn set(
    config: &Config,
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config = config.clone();
    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parse_ms = |value: &str| -> Result<u64> {
        value
            .parse()
            .with_context(|| format!("Invalid value for {}. Use milliseconds, e.g. 300.", key))
    };

    match key {
        "settings_path" => config.settings_path = value.into(),
        "document_debounce_ms" => config.document_debounce_ms = parse_ms(value)?,
        "settings_debounce_ms" => config.settings_debounce_ms = parse_ms(value)?,
        "self_write_window_ms" => config.self_write_window_ms = parse_ms(value)?,
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: settings_path, document_debounce_ms, settings_debounce_ms, self_write_window_ms",
                key
            );
        }
    }
    Ok(())
}
