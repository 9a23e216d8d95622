//! Configuration management

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the JSON data file with test records.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// How many rows the longest-open-warnings widget carries.
    #[serde(default = "default_warning_limit")]
    pub warning_limit: usize,
}

fn default_port() -> u16 {
    8090
}

fn default_data_file() -> String {
    "cbm-data.json".to_string()
}

fn default_warning_limit() -> usize {
    5
}

pub fn load_config() -> Result<Config> {
    let mut builder = ::config::Config::builder()
        .set_default("port", 8090)?
        .set_default("data_file", "cbm-data.json")?
        .set_default("warning_limit", 5)?
        // Load from cbm-dashboard.{toml,json,yaml} if present
        .add_source(::config::File::with_name("cbm-dashboard").required(false))
        // Override with environment variables (CBM_PORT, CBM_DATA_FILE, ...)
        .add_source(
            ::config::Environment::with_prefix("CBM")
                .separator("__")
                .try_parsing(true),
        );

    // PORT precedence: CBM_PORT > PORT > config file > default. The
    // generic PORT fallback keeps container platforms working.
    if let Ok(port) = std::env::var("CBM_PORT") {
        if let Ok(port_num) = port.parse::<u16>() {
            builder = builder.set_override("port", port_num as i64)?;
        }
    } else if let Ok(port) = std::env::var("PORT") {
        if let Ok(port_num) = port.parse::<u16>() {
            builder = builder.set_override("port", port_num as i64)?;
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}
