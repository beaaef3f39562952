//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use postlist_core::Config;

use crate::load_config;
use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config = load_config(config_path)?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "default_url": config.default_url,
                    "data_dir": config.data_dir,
                    "timeout_secs": config.timeout_secs,
                    "history_limit": config.history_limit,
                    "capture_history_data": config.capture_history_data
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.default_url.as_deref().unwrap_or(""));
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!(
                "  default_url:          {}",
                config.default_url.as_deref().unwrap_or("(not set)")
            );
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  timeout_secs:         {}", config.timeout_secs);
            println!(
                "  history_limit:        {}",
                config
                    .history_limit
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "(unbounded)".to_string())
            );
            println!("  capture_history_data: {}", config.capture_history_data);
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
    // Save to the CLI-specified path or default; env overrides stay out of the file
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    let mut config = Config::read_file(&save_path).context("Failed to load configuration")?;
    apply(&mut config, &key, &value)?;

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "default_url" => {
            config.default_url = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "data_dir" => {
            config.data_dir = value.into();
        }
        "timeout_secs" => {
            config.timeout_secs = value
                .parse()
                .context("Invalid value for timeout_secs. Use a whole number of seconds.")?;
        }
        "history_limit" => {
            config.history_limit = if value.is_empty() || value == "none" {
                None
            } else {
                Some(
                    value
                        .parse()
                        .context("Invalid value for history_limit. Use a number or 'none'.")?,
                )
            };
        }
        "capture_history_data" => {
            config.capture_history_data = value
                .parse()
                .context("Invalid value for capture_history_data. Use 'true' or 'false'.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: default_url, data_dir, timeout_secs, history_limit, capture_history_data",
                key
            );
        }
    }
    Ok(())
}
