use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::engine::{FlowEngine, FlowStoreError};
use crate::flow::{ConfigEntry, GLOBAL_FLOW_ID, LocalGatewayConfig};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] FlowStoreError),
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No access token configured; nothing was touched.
    Skipped,
    /// A config node for the local gateway was appended.
    Created,
    /// The existing config node was refreshed in place.
    Updated,
}

/// Ensures the `global` flow document carries a config node describing the
/// local gateway with current connection values, leaving every other entry
/// of the document alone.
///
/// Repeated runs with unchanged configuration converge: the owned
/// (type, name) pair ends up with exactly one up-to-date node. Should the
/// document already hold several nodes under the owned name, only the first
/// is refreshed; the extras are left as they are.
///
/// The fetch-modify-write is not locked. This add-on is the sole writer of
/// its (type, name) pair and runs a single pass per process; anyone
/// re-triggering `run` must serialize calls per document id, since the
/// store performs no concurrency check of its own.
pub struct Reconciler {
    config: HostConfig,
    engine: Arc<dyn FlowEngine>,
}

impl Reconciler {
    pub fn new(config: HostConfig, engine: Arc<dyn FlowEngine>) -> Self {
        Self { config, engine }
    }

    pub async fn run(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let has_token = self
            .config
            .gateway
            .as_ref()
            .and_then(|gateway| gateway.access_token.as_deref())
            .is_some_and(|token| !token.is_empty());
        if !has_token {
            warn!(
                "not generating a config node for the local gateway; please consider adding an \
                 access token to the add-on config"
            );
            return Ok(ReconcileOutcome::Skipped);
        }

        let desired = LocalGatewayConfig::derive(self.config.gateway.as_ref());
        let store = self.engine.flows();
        let mut flow = store.get_flow(GLOBAL_FLOW_ID).await?;

        let mut updated = false;
        for entry in flow.configs.iter_mut() {
            if let ConfigEntry::Gateway(node) = entry {
                if node.name == desired.name {
                    info!(name = %desired.name, id = %node.id, "updating config node for local gateway");
                    desired.apply_to(node);
                    updated = true;
                    break;
                }
            }
        }

        let outcome = if updated {
            ReconcileOutcome::Updated
        } else {
            let id = self.engine.generate_id();
            info!(name = %desired.name, %id, "adding config node for local gateway");
            flow.configs.push(ConfigEntry::Gateway(desired.into_node(id)));
            ReconcileOutcome::Created
        };

        let flow_id = flow.id.clone();
        store.update_flow(&flow_id, &flow).await?;
        Ok(outcome)
    }
}
