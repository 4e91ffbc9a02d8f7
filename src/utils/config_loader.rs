use std::path::Path;
use anyhow::{anyhow, Result};

use crate::config::proc_loader::{env_to_config, file_to_config};
use crate::ServiceConfig;

/// Load the YAML config when a path is given, otherwise read the process environment.
pub async fn run(config_path: Option<&str>) -> Result<ServiceConfig> {
    match config_path {
        Some(config_path) => {
            let path = Path::new(config_path);
            file_to_config(path)
                .await
                .map_err(|e| anyhow!(format!("Invalid config '{}': {}", config_path, e)))
        }
        None => env_to_config().map_err(|e| anyhow!(format!("Invalid environment config: {}", e))),
    }
}
