//! Control plane for Berth container lifecycles.
//!
//! This crate ties the status store and the backend drivers together: the
//! `Dispatcher` accepts run/stop/pause/delete commands, the `StatusEngine` is
//! the single writer of status records and announces every change on the
//! topic-addressed `EventBus`, the `QueryService` serves sorted listings, and
//! the `LogWatcher` streams container log lines. `ControlPlane` wires them
//! from a shared immutable `Context`.

pub mod bus;
pub mod concurrency;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod logs;
pub mod plane;
pub mod query;
pub mod watchdog;

pub use bus::{log_topic, status_topic, EventBus, Subscription, STATUS_TOPIC};
pub use concurrency::{KeyGuard, KeyedLocks};
pub use context::Context;
pub use dispatcher::{DefinitionsSpecBuilder, Dispatcher, Outcome, SpecBuilder, SpecBuilders};
pub use engine::{StatusBus, StatusEngine};
pub use logs::{LogBus, LogStream, LogWatcher};
pub use plane::{open_store, ControlPlane};
pub use query::QueryService;
pub use watchdog::spawn_watchdog;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] berth_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] berth_runtime::RuntimeError),
    #[error("definitions error: {0}")]
    Definitions(#[from] berth_schema::DefinitionsError),
    #[error("configuration error: {0}")]
    Config(#[from] berth_schema::ConfigError),
    #[error("status store is not ready")]
    NotReady,
    #[error("container lock poisoned")]
    LockPoisoned,
}
