use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Add-on configuration as handed over by the gateway's add-on manager.
///
/// Both sub-records are optional and every field falls back to a fixed
/// default, so a partially filled (or empty) config never fails derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_red: Option<NodeRedConfig>,
}

/// Connection settings for the gateway this add-on runs on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub https: Option<bool>,
    pub access_token: Option<String>,
    pub skip_validation: Option<bool>,
}

/// Launch configuration for the embedded Node-RED runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeRedConfig {
    /// When set, no local instance is started; the one hosted there is
    /// used instead.
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
    pub reconnect_interval: Option<u32>,
    pub shorter_labels: Option<bool>,
    pub limit_input_len: Option<u32>,
    /// JSON-encoded settings overrides, merged on top of the derived
    /// runtime settings.
    pub settings: Option<String>,
}

impl HostConfig {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
