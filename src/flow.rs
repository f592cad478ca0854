use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::GatewayConfig;

/// Id of the flow document holding the global config nodes.
pub const GLOBAL_FLOW_ID: &str = "global";

pub const DEFAULT_GATEWAY_NAME: &str = "Local";
pub const DEFAULT_GATEWAY_HOST: &str = "127.0.0.1";
pub const DEFAULT_GATEWAY_PORT: u16 = 8080;

/// An engine-owned flow document, modelled just deeply enough to edit its
/// `configs` collection. Every other field round-trips untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDocument {
    pub id: String,
    /// Ordered; an absent collection reads as empty and gets attached on
    /// the next write-back.
    #[serde(default)]
    pub configs: Vec<ConfigEntry>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One entry of [`FlowDocument::configs`].
///
/// Only the gateway config nodes this add-on owns are strongly typed;
/// everything else is carried as opaque JSON so a read-modify-write cycle
/// never loses or reorders foreign entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigEntry {
    Gateway(GatewayNode),
    Other(Value),
}

impl ConfigEntry {
    pub fn as_gateway(&self) -> Option<&GatewayNode> {
        match self {
            ConfigEntry::Gateway(node) => Some(node),
            ConfigEntry::Other(_) => None,
        }
    }
}

/// Marker for the `type` field. Deserializing [`GatewayNode`] fails on any
/// other tag, which is what routes foreign entries into
/// [`ConfigEntry::Other`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayNodeType {
    #[default]
    #[serde(rename = "webthingsio-gateway")]
    WebthingsioGateway,
}

/// A `webthingsio-gateway` config node. Connection fields are optional on
/// read so that hand-edited or user-added nodes still parse; the reconciler
/// always writes them fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: GatewayNodeType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<bool>,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "skipValidation", skip_serializing_if = "Option::is_none")]
    pub skip_validation: Option<bool>,
    /// Fields this add-on does not know about, preserved as-is.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Desired state for the config node describing this gateway itself,
/// recomputed from the add-on configuration on every reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalGatewayConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub https: Option<bool>,
    pub access_token: Option<String>,
    pub skip_validation: Option<bool>,
}

impl LocalGatewayConfig {
    pub fn derive(gateway: Option<&GatewayConfig>) -> Self {
        let gateway = gateway.cloned().unwrap_or_default();
        LocalGatewayConfig {
            name: gateway
                .name
                .unwrap_or_else(|| DEFAULT_GATEWAY_NAME.to_string()),
            host: gateway
                .host
                .unwrap_or_else(|| DEFAULT_GATEWAY_HOST.to_string()),
            port: gateway.port.unwrap_or(DEFAULT_GATEWAY_PORT),
            https: gateway.https,
            access_token: gateway.access_token,
            skip_validation: gateway.skip_validation,
        }
    }

    /// Build a fresh config node under the given generated id.
    pub fn into_node(self, id: String) -> GatewayNode {
        GatewayNode {
            id,
            node_type: GatewayNodeType::WebthingsioGateway,
            name: self.name,
            host: Some(self.host),
            port: Some(self.port),
            https: self.https,
            access_token: self.access_token,
            skip_validation: self.skip_validation,
            rest: Map::new(),
        }
    }

    /// Overwrite `node`'s connection fields in place, keeping its id and
    /// any fields this add-on does not own.
    pub fn apply_to(&self, node: &mut GatewayNode) {
        node.name = self.name.clone();
        node.host = Some(self.host.clone());
        node.port = Some(self.port);
        node.https = self.https;
        node.access_token = self.access_token.clone();
        node.skip_validation = self.skip_validation;
    }
}
