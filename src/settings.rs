use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::config::NodeRedConfig;

pub const DEFAULT_UI_PORT: u16 = 1880;
pub const DEFAULT_RECONNECT_INTERVAL: u32 = 5;
pub const DEFAULT_LIMIT_INPUT_LEN: u32 = 15;

/// Fully-resolved runtime settings, handed to the engine at init.
///
/// Field names serialize to the option names the Node-RED runtime
/// understands, so the struct doubles as the wire shape of the settings
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub http_root: String,
    pub http_admin_root: String,
    pub http_node_root: String,
    pub ui_host: String,
    pub ui_port: u16,
    #[serde(rename = "webthingsioGatewayReconnectInterval")]
    pub reconnect_interval: u32,
    #[serde(
        rename = "webthingsioGatewayShorterLabels",
        skip_serializing_if = "Option::is_none"
    )]
    pub shorter_labels: Option<bool>,
    #[serde(rename = "webthingsioGatewayLimitInputLen")]
    pub limit_input_len: u32,
    pub editor_theme: Value,
    pub flow_file_pretty: bool,
    /// Override keys this add-on does not recognize, passed to the engine
    /// verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One tier of the settings merge: every recognized option, optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOverlay {
    pub http_root: Option<String>,
    pub http_admin_root: Option<String>,
    pub http_node_root: Option<String>,
    pub ui_host: Option<String>,
    pub ui_port: Option<u16>,
    #[serde(rename = "webthingsioGatewayReconnectInterval")]
    pub reconnect_interval: Option<u32>,
    #[serde(rename = "webthingsioGatewayShorterLabels")]
    pub shorter_labels: Option<bool>,
    #[serde(rename = "webthingsioGatewayLimitInputLen")]
    pub limit_input_len: Option<u32>,
    pub editor_theme: Option<Value>,
    pub flow_file_pretty: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SettingsOverlay {
    /// The tier derived from the add-on's Node-RED configuration.
    pub fn derived(config: &NodeRedConfig) -> Self {
        SettingsOverlay {
            ui_port: Some(config.port.unwrap_or(DEFAULT_UI_PORT)),
            reconnect_interval: Some(
                config.reconnect_interval.unwrap_or(DEFAULT_RECONNECT_INTERVAL),
            ),
            shorter_labels: config.shorter_labels,
            limit_input_len: Some(config.limit_input_len.unwrap_or(DEFAULT_LIMIT_INPUT_LEN)),
            ..Default::default()
        }
    }
}

impl Default for EngineSettings {
    /// The fixed base tier: everything mounted at the root, bound on all
    /// interfaces, projects enabled, pretty flow files.
    fn default() -> Self {
        EngineSettings {
            http_root: "/".to_string(),
            http_admin_root: "/".to_string(),
            http_node_root: "/".to_string(),
            ui_host: "0.0.0.0".to_string(),
            ui_port: DEFAULT_UI_PORT,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            shorter_labels: None,
            limit_input_len: DEFAULT_LIMIT_INPUT_LEN,
            editor_theme: json!({ "projects": { "enabled": true } }),
            flow_file_pretty: true,
            extra: Map::new(),
        }
    }
}

impl EngineSettings {
    /// Layer `overlay` on top of `self`, one level deep, overlay keys
    /// winning.
    pub fn apply(&mut self, overlay: SettingsOverlay) {
        if let Some(v) = overlay.http_root {
            self.http_root = v;
        }
        if let Some(v) = overlay.http_admin_root {
            self.http_admin_root = v;
        }
        if let Some(v) = overlay.http_node_root {
            self.http_node_root = v;
        }
        if let Some(v) = overlay.ui_host {
            self.ui_host = v;
        }
        if let Some(v) = overlay.ui_port {
            self.ui_port = v;
        }
        if let Some(v) = overlay.reconnect_interval {
            self.reconnect_interval = v;
        }
        if let Some(v) = overlay.shorter_labels {
            self.shorter_labels = Some(v);
        }
        if let Some(v) = overlay.limit_input_len {
            self.limit_input_len = v;
        }
        if let Some(v) = overlay.editor_theme {
            self.editor_theme = v;
        }
        if let Some(v) = overlay.flow_file_pretty {
            self.flow_file_pretty = v;
        }
        for (key, value) in overlay.extra {
            self.extra.insert(key, value);
        }
    }

    /// Resolve the effective settings: fixed defaults, then the tier
    /// derived from `config`, then the user's JSON override string.
    ///
    /// A malformed override is logged and dropped; it never aborts
    /// startup.
    pub fn resolve(config: &NodeRedConfig) -> Self {
        let mut settings = EngineSettings::default();
        settings.apply(SettingsOverlay::derived(config));

        if let Some(raw) = config.settings.as_deref() {
            match serde_json::from_str::<SettingsOverlay>(raw) {
                Ok(overlay) => settings.apply(overlay),
                Err(err) => {
                    info!(%err, "no usable custom Node-RED settings specified");
                }
            }
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mount_everything_at_root() {
        let settings = EngineSettings::default();
        assert_eq!(settings.http_root, "/");
        assert_eq!(settings.http_admin_root, "/");
        assert_eq!(settings.http_node_root, "/");
        assert_eq!(settings.ui_host, "0.0.0.0");
        assert_eq!(settings.ui_port, 1880);
        assert_eq!(
            settings.editor_theme,
            json!({ "projects": { "enabled": true } })
        );
        assert!(settings.flow_file_pretty);
    }

    #[test]
    fn derived_tier_overrides_defaults() {
        let config = NodeRedConfig {
            port: Some(1890),
            reconnect_interval: Some(30),
            shorter_labels: Some(true),
            ..Default::default()
        };
        let settings = EngineSettings::resolve(&config);
        assert_eq!(settings.ui_port, 1890);
        assert_eq!(settings.reconnect_interval, 30);
        assert_eq!(settings.shorter_labels, Some(true));
        assert_eq!(settings.limit_input_len, 15);
    }

    #[test]
    fn user_override_wins_over_derived_port() {
        let config = NodeRedConfig {
            port: Some(1890),
            settings: Some(r#"{"uiPort": 1999}"#.to_string()),
            ..Default::default()
        };
        let settings = EngineSettings::resolve(&config);
        assert_eq!(settings.ui_port, 1999);
    }

    #[test]
    fn invalid_override_keeps_derived_tier() {
        let config = NodeRedConfig {
            port: Some(1890),
            settings: Some("not-json".to_string()),
            ..Default::default()
        };
        let settings = EngineSettings::resolve(&config);
        assert_eq!(settings.ui_port, 1890);
    }

    #[test]
    fn non_object_override_keeps_derived_tier() {
        let config = NodeRedConfig {
            port: Some(1890),
            settings: Some("[1, 2, 3]".to_string()),
            ..Default::default()
        };
        let settings = EngineSettings::resolve(&config);
        assert_eq!(settings.ui_port, 1890);
    }

    #[test]
    fn unrecognized_override_keys_pass_through() {
        let config = NodeRedConfig {
            settings: Some(r#"{"functionGlobalContext": {"os": true}}"#.to_string()),
            ..Default::default()
        };
        let settings = EngineSettings::resolve(&config);
        assert_eq!(
            settings.extra.get("functionGlobalContext"),
            Some(&json!({"os": true}))
        );

        let wire = serde_json::to_value(&settings).unwrap();
        assert_eq!(wire["functionGlobalContext"], json!({"os": true}));
    }

    #[test]
    fn settings_serialize_to_runtime_option_names() {
        let wire = serde_json::to_value(EngineSettings::default()).unwrap();
        assert_eq!(wire["httpAdminRoot"], "/");
        assert_eq!(wire["uiHost"], "0.0.0.0");
        assert_eq!(wire["uiPort"], 1880);
        assert_eq!(wire["webthingsioGatewayReconnectInterval"], 5);
        assert_eq!(wire["webthingsioGatewayLimitInputLen"], 15);
        assert_eq!(wire["flowFilePretty"], true);
        // absent unless configured
        assert!(wire.get("webthingsioGatewayShorterLabels").is_none());
    }
}
