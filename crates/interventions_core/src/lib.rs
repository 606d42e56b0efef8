//! Record synchronization and query engine for equipment interventions.
//! This crate owns the canonical list and every invariant over it.

pub mod config;
pub mod db;
pub mod export;
pub mod identity;
pub mod logging;
pub mod model;
pub mod search;
pub mod service;
pub mod store;

pub use config::{AppConfig, BackendConfig, ConfigError, EngineConfig, RemoteConfig};
pub use export::csv::{
    escape_field, export as export_csv, write_csv_file, CsvError, CsvOptions,
    DEFAULT_EXPORT_FILE_NAME,
};
pub use identity::{IdStrategy, IdentityAssigner, UuidAssigner};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::intervention::{
    Field, Intervention, InterventionDraft, InterventionId, ValidationError,
};
pub use search::filter::{filter, SearchIndex, SearchProjection};
pub use service::sync_engine::{EngineError, EngineResult, SyncEngine};
pub use store::{
    open_backend, ChangeFeed, LocalStore, PushEvent, RemoteStore, Store, StoreError, StoreResult,
    Subscription,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
