use crate::bus::{status_topic, Subscription, STATUS_TOPIC};
use crate::context::Context;
use crate::dispatcher::{Dispatcher, SpecBuilders};
use crate::engine::{StatusBus, StatusEngine};
use crate::logs::{LogBus, LogWatcher};
use crate::query::QueryService;
use crate::watchdog::spawn_watchdog;
use crate::CoreError;
use berth_runtime::BackendRegistry;
use berth_schema::{parse_definitions_file, BerthConfig, ContainerStatus, StoreKind};
use berth_store::{FileStatusStore, MemoryStatusStore, StatusStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The wired control plane: one engine, one dispatcher, one query service and
/// one log watcher sharing a context, a store and two buses.
pub struct ControlPlane {
    ctx: Arc<Context>,
    engine: Arc<StatusEngine>,
    dispatcher: Dispatcher,
    query: QueryService,
    logs: LogWatcher,
}

impl ControlPlane {
    pub fn new(
        ctx: Context,
        store: Arc<dyn StatusStore>,
        registry: BackendRegistry,
        builders: SpecBuilders,
    ) -> Self {
        let ctx = Arc::new(ctx);
        let engine = Arc::new(StatusEngine::new(
            Arc::clone(&ctx),
            Arc::clone(&store),
            Arc::new(StatusBus::new()),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&engine), registry, builders);
        let query = QueryService::new(store);
        let logs = LogWatcher::new(Arc::clone(&ctx), Arc::new(LogBus::new()));
        debug!("control plane wired in {} mode", ctx.mode);
        Self {
            ctx,
            engine,
            dispatcher,
            query,
            logs,
        }
    }

    /// Wire a control plane from configuration: resolve the mode, open the
    /// store, load definitions and register the drivers.
    ///
    /// `config.store.path` is used as given; callers expand `~` first.
    pub fn from_config(config: &BerthConfig) -> Result<Self, CoreError> {
        let ctx = Context::from_config(config);
        let store = open_store(config)?;
        let builders = match &config.definitions {
            Some(path) => {
                info!("loading definitions from {}", path.display());
                SpecBuilders::from_definitions(parse_definitions_file(path)?)
            }
            None => SpecBuilders::default(),
        };
        let registry = BackendRegistry::from_config(config, ctx.mode);
        Ok(Self::new(ctx, store, registry, builders))
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn engine(&self) -> &Arc<StatusEngine> {
        &self.engine
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn query(&self) -> &QueryService {
        &self.query
    }

    pub fn logs(&self) -> &LogWatcher {
        &self.logs
    }

    pub fn subscribe_all(&self) -> Subscription<ContainerStatus> {
        self.engine.bus().subscribe(STATUS_TOPIC)
    }

    pub fn subscribe(&self, name: &str, environment: &str) -> Subscription<ContainerStatus> {
        self.engine.bus().subscribe(&status_topic(name, environment))
    }

    /// Start the pending-record watchdog with the configured timeout.
    pub fn spawn_watchdog(&self, interval: Duration) -> JoinHandle<()> {
        spawn_watchdog(
            Arc::clone(&self.engine),
            interval,
            self.ctx.pending_timeout,
        )
    }
}

/// Open the store selected by `config`. A file store is initialized and
/// therefore ready on return.
pub fn open_store(config: &BerthConfig) -> Result<Arc<dyn StatusStore>, CoreError> {
    match config.store.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStatusStore::new())),
        StoreKind::File => {
            let store = FileStatusStore::open(&config.store.path)?;
            Ok(Arc::new(store))
        }
    }
}
