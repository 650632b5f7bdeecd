//! Configuration management for Herald
//!
//! This module defines the main `Config` struct and the `Asset` context that
//! is handed to every target. It uses the `figment` crate to layer defaults,
//! an optional `herald.toml` file and environment variables.

use crate::core::NotifyFormat;
use crate::dispatch::ExecutionStrategy;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The main configuration struct for the library.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level used by `init_logging` when `RUST_LOG` is unset.
    pub log_level: String,
    /// How `Notifier::notify` fans out to matched targets.
    pub strategy: ExecutionStrategy,
    /// Log and skip descriptors whose factory rejects them instead of
    /// returning the raw error.
    pub suppress_construction_errors: bool,
    /// The context shared with every target.
    pub asset: Asset,
}

/// The immutable context passed through the resolver into each target.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Asset {
    /// Identifies the sending application to targets that display it.
    pub app_id: String,
    pub app_desc: String,
    pub app_url: String,
    /// Format assumed for bodies when the caller does not name one.
    /// `None` disables conversion entirely.
    pub body_format: Option<NotifyFormat>,
    /// Decode backslash escapes in body and title unless the caller says otherwise.
    pub interpret_escapes: bool,
    /// Mask credentials whenever descriptors are logged.
    pub secure_logging: bool,
    /// Allow targets to use their cooperative variant during concurrent dispatch.
    pub async_mode: bool,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            app_id: "Herald".to_string(),
            app_desc: "Herald Notifications".to_string(),
            app_url: "https://github.com/herald-rs/herald".to_string(),
            body_format: None,
            interpret_escapes: false,
            secure_logging: true,
            async_mode: true,
        }
    }
}

impl Asset {
    /// Summary exposed through `Notifier::details`.
    pub fn details(&self) -> serde_json::Value {
        serde_json::json!({
            "app_id": self.app_id,
            "app_desc": self.app_desc,
            "app_url": self.app_url,
            "default_body_format": self.body_format,
        })
    }
}

impl Config {
    /// Loads the configuration, layering an optional TOML file and then
    /// environment variables over the defaults.
    ///
    /// # Arguments
    /// * `config_path` - The path to the TOML configuration file, if any.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        // e.g. HERALD_STRATEGY=sequential or HERALD_ASSET__SECURE_LOGGING=false
        let config: Config = figment
            .merge(Env::prefixed("HERALD_").split("__"))
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            strategy: ExecutionStrategy::Sequential,
            suppress_construction_errors: true,
            asset: Asset::default(),
        }
    }
}
