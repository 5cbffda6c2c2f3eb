//! CLI subcommands

pub mod config;
pub mod level;
pub mod loans;
pub mod quote;
pub mod status;

use lending_client::LendingConfig;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Config from a `/config`-shaped JSON file, or the built-in policy.
pub(crate) fn load_config(path: Option<&str>) -> CliResult<LendingConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CliError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Cannot read file '{}': {}", path, e),
                ))
            })?;
            let config = LendingConfig::from_json_str(&content)?;
            debug!(
                path,
                source = ?config.rate_source,
                terms = config.rate_table.len(),
                "Loaded lending config file"
            );
            Ok(config)
        }
        None => {
            debug!("No config file given, using built-in rates");
            Ok(LendingConfig::default())
        }
    }
}
