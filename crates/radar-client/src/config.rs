// Client identity configuration and engine limits.
use anyhow::{Context, Result};
use radar_common::Identity;
use radar_common::ids::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;

/// Hard safety cap for any single inbound frame.
///
/// A sync replay can carry a channel's whole missed history, so the cap is
/// generous; it exists to stop a broken peer from forcing an unbounded parse.
///
/// Override with `RADAR_MAX_FRAME_BYTES`.
pub(crate) const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// Configuration handed to `Client::configure`.
///
/// The identity fields scope channel names and stamp `set` writes. Everything
/// else is passed through untouched to the adapter for its handshake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub account_name: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub user_type: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct ClientConfigOverride {
    account_name: Option<String>,
    user_id: Option<UserId>,
    user_type: Option<u32>,
    #[serde(default)]
    extra: Map<String, Value>,
}

impl ClientConfig {
    pub fn new(account_name: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            account_name: account_name.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_user_type(mut self, user_type: u32) -> Self {
        self.user_type = user_type;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.account_name.clone(), self.user_id.clone())
            .with_user_type(self.user_type)
    }

    pub fn from_env_or_yaml(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::from_env();
        let override_path = config_path
            .map(|value| value.to_string())
            .or_else(|| std::env::var("RADAR_CLIENT_CONFIG").ok());
        let contents = match override_path.as_deref() {
            Some(path) => Some(
                fs::read_to_string(path).with_context(|| format!("read client config: {path}"))?,
            ),
            None => None,
        };
        if let Some(contents) = contents {
            let override_cfg: ClientConfigOverride =
                serde_yaml::from_str(&contents).context("parse client config yaml")?;
            override_cfg.apply(&mut config);
        }
        Ok(config)
    }

    fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = read_string_env("RADAR_ACCOUNT_NAME") {
            config.account_name = value;
        }
        if let Some(value) = read_string_env("RADAR_USER_ID") {
            config.user_id = UserId::parse(&value);
        }
        if let Some(value) = read_u32_env("RADAR_USER_TYPE") {
            config.user_type = value;
        }
        config
    }
}

impl ClientConfigOverride {
    fn apply(self, config: &mut ClientConfig) {
        if let Some(value) = self.account_name
            && !value.is_empty()
        {
            config.account_name = value;
        }
        if let Some(value) = self.user_id {
            config.user_id = value;
        }
        if let Some(value) = self.user_type {
            config.user_type = value;
        }
        config.extra.extend(self.extra);
    }
}

/// Limits applied by the engine itself; never sent to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub max_frame_bytes: usize,
    // Log full frame bodies at trace level instead of just their op/destination.
    pub log_payloads: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            log_payloads: false,
        }
    }
}

impl EngineOptions {
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(value) = read_usize_env("RADAR_MAX_FRAME_BYTES") {
            options.max_frame_bytes = value;
        }
        if let Some(value) = read_bool_env("RADAR_LOG_PAYLOADS") {
            options.log_payloads = value;
        }
        options
    }
}

fn read_string_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn read_u32_env(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

fn read_usize_env(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
}

fn read_bool_env(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
}
