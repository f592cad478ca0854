use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use uuid::Uuid;

use crate::flow::FlowDocument;
use crate::settings::EngineSettings;

/// Errors surfaced by an engine implementation. The add-on treats them as
/// opaque and propagates them; engine init/start failures abort startup.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine init failed: {0}")]
    Init(String),
    #[error("engine start failed: {0}")]
    Start(String),
}

#[derive(Error, Debug)]
pub enum FlowStoreError {
    #[error("flow `{0}` not found")]
    NotFound(String),
    #[error("flow store I/O failed: {0}")]
    Io(String),
}

/// Everything the engine needs to know about its environment, passed
/// explicitly at init instead of being read back out of ambient process
/// state.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Private directory the runtime confines its files to.
    pub user_dir: PathBuf,
    /// Verbose runtime logging requested.
    pub debug: bool,
}

/// Boundary to the embedded flow-execution engine.
///
/// The launcher mounts the two HTTP surfaces, then calls `init` followed by
/// `start`; the reconciler talks to the flow store once the engine reports
/// itself running.
#[async_trait]
pub trait FlowEngine: Send + Sync {
    /// Prepare the engine with its environment and resolved settings.
    async fn init(
        &self,
        ctx: &EngineContext,
        settings: &EngineSettings,
    ) -> Result<(), EngineError>;

    /// Start the runtime; resolves once the engine reports itself running.
    async fn start(&self) -> Result<(), EngineError>;

    /// Admin/editor HTTP surface, mounted by the launcher at
    /// `httpAdminRoot`.
    fn http_admin(&self) -> Router;

    /// Node runtime HTTP surface (HTTP-in endpoints and friends), mounted
    /// at `httpNodeRoot`.
    fn http_node(&self) -> Router;

    /// Handle to the engine's persisted flow store.
    fn flows(&self) -> Arc<dyn FlowStore>;

    /// Generate a unique node id.
    fn generate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Read/write access to the engine's flow documents.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn get_flow(&self, id: &str) -> Result<FlowDocument, FlowStoreError>;
    async fn update_flow(&self, id: &str, flow: &FlowDocument) -> Result<(), FlowStoreError>;
}
