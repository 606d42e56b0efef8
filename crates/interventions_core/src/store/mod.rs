//! Durable persistence capability for the intervention collection.
//!
//! # Responsibility
//! - Define the `Store` contract the sync engine depends on.
//! - Provide the on-device (`LocalStore`) and network (`RemoteStore`)
//!   implementations plus the push-event fan-out they share.
//!
//! # Invariants
//! - `create` is idempotent by `id`; callers may retry with the same record.
//! - `delete` of an absent id succeeds.
//! - `list` order is unspecified; the engine re-sorts.
//! - Push delivery is at-most-once and unordered relative to the caller's
//!   own pending operations.

use crate::config::BackendConfig;
use crate::db::DbError;
use crate::model::intervention::{Intervention, InterventionId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;

pub mod change_feed;
pub mod http;
pub mod local_store;
pub mod remote_store;

pub use change_feed::{ChangeFeed, Subscription};
pub use local_store::LocalStore;
pub use remote_store::RemoteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Out-of-band change notification delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Inserted(Intervention),
    Deleted(InterventionId),
}

/// Store-layer failure.
#[derive(Debug)]
pub enum StoreError {
    /// Transient connectivity failure.
    Network(String),
    /// Target record is absent. Delete paths treat this as success.
    NotFound(InterventionId),
    /// Backend answered with a failure status.
    Rejected { status: u16, message: String },
    /// Payload could not be encoded or decoded.
    Serialization(String),
    /// On-device storage fault.
    Db(DbError),
    Unknown(String),
}

impl StoreError {
    /// Returns whether resubmitting the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Stable short code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::NotFound(_) => "not_found",
            Self::Rejected { .. } => "rejected",
            Self::Serialization(_) => "serialization",
            Self::Db(_) => "db",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "store unreachable: {message}"),
            Self::NotFound(id) => write!(f, "intervention not found: {id}"),
            Self::Rejected { status, message } => {
                write!(f, "store rejected request with status {status}: {message}")
            }
            Self::Serialization(message) => write!(f, "invalid store payload: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Unknown(message) => write!(f, "store failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Persistence contract for the intervention collection.
pub trait Store {
    /// Persists a fully formed record and returns the stored version.
    ///
    /// An empty `id` asks the store to assign one; the returned record then
    /// carries the authoritative id.
    fn create(&self, record: &Intervention) -> StoreResult<Intervention>;

    /// Removes a record by id. Absence is not an error.
    fn delete(&self, id: &str) -> StoreResult<()>;

    /// Returns the full current collection.
    ///
    /// Any order is accepted; the engine treats later rows as newer when
    /// dates tie, so stores that know insertion order return oldest first.
    fn list(&self) -> StoreResult<Vec<Intervention>>;

    /// Registers `sink` for upstream push events.
    ///
    /// Returns `None` when this store has no push channel.
    fn subscribe(&self, sink: Sender<PushEvent>) -> StoreResult<Option<Subscription>> {
        let _ = sink;
        Ok(None)
    }

    /// Short backend name used in log lines.
    fn backend_name(&self) -> &'static str;
}

impl<S: Store + ?Sized> Store for &S {
    fn create(&self, record: &Intervention) -> StoreResult<Intervention> {
        (**self).create(record)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn list(&self) -> StoreResult<Vec<Intervention>> {
        (**self).list()
    }

    fn subscribe(&self, sink: Sender<PushEvent>) -> StoreResult<Option<Subscription>> {
        (**self).subscribe(sink)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn create(&self, record: &Intervention) -> StoreResult<Intervention> {
        (**self).create(record)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn list(&self) -> StoreResult<Vec<Intervention>> {
        (**self).list()
    }

    fn subscribe(&self, sink: Sender<PushEvent>) -> StoreResult<Option<Subscription>> {
        (**self).subscribe(sink)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

/// Opens the backend selected by configuration.
pub fn open_backend(config: &BackendConfig) -> StoreResult<Box<dyn Store>> {
    match config {
        BackendConfig::Local { db_path } => Ok(Box::new(LocalStore::open(db_path)?)),
        BackendConfig::Remote(remote) => Ok(Box::new(RemoteStore::connect(remote.clone()))),
    }
}
