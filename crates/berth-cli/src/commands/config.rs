//! Config command handlers

use std::path::Path;

use anyhow::Result;

use berth_core::{Config, SCHEMA_VERSION};

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, config_path: Option<&Path>, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_file": config.log_file,
                    "settings_db": config.settings_db_path(),
                    "legacy_config": config.legacy_config_path(),
                    "schema_version": SCHEMA_VERSION
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:      {}", config.data_dir.display());
            println!(
                "  log_file:      {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  settings db:   {}", config.settings_db_path().display());
            println!("  legacy config: {}", config.legacy_config_path().display());
            println!("  schema:        v{}", SCHEMA_VERSION);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}
