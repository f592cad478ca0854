use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::HostConfig;
use crate::engine::{EngineContext, EngineError, FlowEngine};
use crate::reconciler::Reconciler;
use crate::settings::{DEFAULT_UI_PORT, EngineSettings};

/// Directory created under the add-on's data dir for all runtime state.
const WORK_DIR: &str = "node-red-extension";

/// Grace interval between the listener coming up and the reconciliation
/// pass. The engine's in-memory flow state may not be queryable the
/// instant `start()` resolves.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("could not provision working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// How a launch ended.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// `nodeRed.host` points at an externally hosted instance; nothing was
    /// started locally.
    Remote,
    /// A local engine is up and serving.
    Local {
        /// Address the HTTP listener actually bound.
        addr: SocketAddr,
        /// Task running the single reconciliation pass after the settle
        /// delay. Dropping the handle does not cancel the pass.
        reconcile: JoinHandle<()>,
    },
}

/// Brings the embedded engine to a running, reachable state and schedules
/// the one reconciliation pass, or skips local startup entirely when the
/// add-on is configured against a remote instance.
///
/// Directory, bind and engine failures propagate and are expected to abort
/// add-on startup; a malformed user settings override is the only error
/// that is swallowed.
pub struct Launcher {
    config: HostConfig,
    engine: Arc<dyn FlowEngine>,
    data_dir: PathBuf,
    settle_delay: Duration,
}

impl Launcher {
    /// `data_dir` is the per-add-on private data directory supplied by the
    /// add-on manager.
    pub fn new(
        config: HostConfig,
        engine: Arc<dyn FlowEngine>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            engine,
            data_dir: data_dir.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Override the settle delay; tests set this to zero.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub async fn start(self) -> Result<LaunchOutcome, StartupError> {
        let node_red = self.config.node_red.clone().unwrap_or_default();

        if let Some(host) = node_red.host.as_deref() {
            let port = node_red.port.unwrap_or(DEFAULT_UI_PORT);
            warn!(
                "not starting a local Node-RED instance, using the one hosted at {host}:{port}; \
                 gateway specific options cannot be applied there"
            );
            return Ok(LaunchOutcome::Remote);
        }

        let work_dir = self.data_dir.join(WORK_DIR);
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|source| StartupError::WorkDir {
                path: work_dir.clone(),
                source,
            })?;

        let ctx = EngineContext {
            user_dir: work_dir,
            debug: node_red.debug.unwrap_or(false),
        };
        redirect_runtime_home(&ctx);

        let settings = EngineSettings::resolve(&node_red);

        let app = Router::new();
        let app = mount(app, &settings.http_admin_root, self.engine.http_admin());
        let app = mount(app, &settings.http_node_root, self.engine.http_node());

        self.engine.init(&ctx, &settings).await?;
        self.engine.start().await?;
        info!("Node-RED running");

        let bind = format!("{}:{}", settings.ui_host, settings.ui_port);
        let listener = TcpListener::bind(&bind)
            .await
            .map_err(|source| StartupError::Bind {
                addr: bind.clone(),
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { addr: bind, source })?;
        info!(%addr, "Node-RED server listening");

        // Isolated connection errors must not take the add-on down.
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(%err, "server error");
            }
        });

        let reconciler = Reconciler::new(self.config, self.engine);
        let settle = self.settle_delay;
        let reconcile = tokio::spawn(async move {
            sleep(settle).await;
            if let Err(err) = reconciler.run().await {
                error!(%err, "could not reconcile the local gateway config node");
            }
        });

        Ok(LaunchOutcome::Local { addr, reconcile })
    }
}

/// The Node-RED runtime derives its user directory from the process
/// environment, so point every home-ish variable at the private working
/// directory before init. That requirement stays confined to this one
/// function; the rest of the add-on only ever sees [`EngineContext`].
fn redirect_runtime_home(ctx: &EngineContext) {
    // setenv is not thread-safe; serialize writers.
    static ENV_LOCK: Mutex<()> = Mutex::new(());
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let path = ctx.user_dir.as_os_str();
    // set_var is unsafe in edition 2024; this runs before the runtime
    // spawns anything that reads the environment.
    unsafe {
        env::set_var("NODE_RED_HOME", path);
        env::set_var("HOME", path);
        env::set_var("USERPROFILE", path);
        env::set_var("HOMEPATH", path);
        if ctx.debug {
            env::set_var("DEBUG", "*");
        }
    }
}

/// Mount `sub` under `root`. axum refuses to nest at `/`, which happens to
/// be the default for every root here, so the root case merges instead.
fn mount(app: Router, root: &str, sub: Router) -> Router {
    if root == "/" {
        app.merge(sub)
    } else {
        app.nest(root, sub)
    }
}
