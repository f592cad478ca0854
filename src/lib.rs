pub mod config;
pub mod engine;
pub mod flow;
pub mod launcher;
pub mod logger;
pub mod reconciler;
pub mod settings;

pub use config::{GatewayConfig, HostConfig, NodeRedConfig};
pub use engine::{EngineContext, FlowEngine, FlowStore};
pub use launcher::{LaunchOutcome, Launcher};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use settings::EngineSettings;
