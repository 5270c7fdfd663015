// Configuration loader for the caption client
//
// This module seeds the process environment from an optional flat TOML file,
// so `ClientConfig::default()` sees file values wherever the environment is silent.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use toml::Value;

pub const CONFIG_FILE_PATH: &str = "caption_client.conf";

/// Loads configuration from a TOML file into environment variables
///
/// Configuration precedence (highest to lowest):
/// 1. Environment variables
/// 2. Configuration file values
/// 3. Default values (see `config::defaults`)
///
/// # Returns
///
/// Returns true if the config file was successfully loaded, false otherwise
pub fn load_config<P: AsRef<Path>>(path: P) -> bool {
    let config_path = path.as_ref();

    if !config_path.exists() {
        debug!("Configuration file not found at: {}", config_path.display());
        return false;
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read configuration file: {}", e);
            return false;
        }
    };

    let config_map = match parse_flat_toml(&config_content) {
        Some(map) => map,
        None => return false,
    };

    for (key, value) in config_map {
        if env::var(&key).is_err() {
            debug!("Setting env var from config file: {} = {}", key, value);
            env::set_var(key, value);
        } else {
            debug!("Env var already exists, skipping: {}", key);
        }
    }

    info!("Configuration loaded from {}", config_path.display());
    true
}

/// Flattens top-level scalar TOML values into strings; nested tables and arrays are skipped
fn parse_flat_toml(content: &str) -> Option<HashMap<String, String>> {
    let values: Value = match content.parse() {
        Ok(values) => values,
        Err(e) => {
            warn!("Failed to parse configuration file: {}", e);
            return None;
        }
    };

    let mut config_map = HashMap::new();
    if let Value::Table(table) = values {
        for (key, value) in table {
            match value {
                Value::String(s) => {
                    config_map.insert(key, s);
                }
                Value::Integer(i) => {
                    config_map.insert(key, i.to_string());
                }
                Value::Float(f) => {
                    config_map.insert(key, f.to_string());
                }
                Value::Boolean(b) => {
                    config_map.insert(key, b.to_string());
                }
                _ => {
                    warn!("Skipping unsupported TOML value type for key: {}", key);
                }
            }
        }
    }
    Some(config_map)
}
