//! Optimistic synchronization engine.
//!
//! # Responsibility
//! - Own the canonical ordered intervention list.
//! - Apply create/delete optimistically, then confirm through the store.
//! - Reconcile push events from the store's channel without duplicates.
//!
//! # Invariants
//! - Canonical order is `date` descending, newest insertion first on ties.
//! - Ids in the canonical list are unique.
//! - A failed store create removes exactly the optimistic record it staged.
//! - A failed store delete is surfaced but not rolled back; `refresh`
//!   restores strict consistency.
//! - Push events are applied only between operations, one at a time.

use crate::config::EngineConfig;
use crate::identity::{IdStrategy, IdentityAssigner, UuidAssigner};
use crate::model::intervention::{Intervention, InterventionDraft, ValidationError};
use crate::search::filter::SearchIndex;
use crate::store::{PushEvent, Store, StoreError, Subscription};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    /// Draft rejected before any store call.
    Validation(ValidationError),
    Store(StoreError),
    /// No session is present.
    Unauthenticated,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Unauthenticated => write!(f, "no authenticated session"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Unauthenticated => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Canonical list plus the store it is reconciled against.
///
/// All mutation goes through `&mut self`, so the list has a single writer.
pub struct SyncEngine<S: Store, A: IdentityAssigner = UuidAssigner> {
    store: S,
    assigner: A,
    config: EngineConfig,
    records: Vec<Intervention>,
    /// Insertion sequence per record, parallel to `records`.
    sequences: Vec<u64>,
    next_sequence: u64,
    /// Sequences of optimistic records awaiting store confirmation.
    /// Non-empty only while a `create` is inside `Store::create`.
    pending: HashSet<u64>,
    events: Option<Receiver<PushEvent>>,
    subscription: Option<Subscription>,
}

impl<S: Store> SyncEngine<S, UuidAssigner> {
    /// Wires an engine with UUID identity assignment.
    ///
    /// See [`SyncEngine::with_assigner`].
    pub fn open(store: S, config: EngineConfig) -> EngineResult<Self> {
        Self::with_assigner(store, UuidAssigner, config)
    }
}

impl<S: Store, A: IdentityAssigner> SyncEngine<S, A> {
    /// Subscribes to the store's push channel (when it has one) and, when a
    /// session is present, loads the initial list.
    ///
    /// The subscription is registered before the load so no upstream change
    /// falls between the two. A failed initial load leaves the list empty.
    ///
    /// # Errors
    /// - `Store` only when subscribing fails.
    pub fn with_assigner(store: S, assigner: A, config: EngineConfig) -> EngineResult<Self> {
        let (sink, events) = mpsc::channel();
        let subscription = store.subscribe(sink)?;
        let has_push = subscription.is_some();

        let mut engine = Self {
            store,
            assigner,
            config,
            records: Vec::new(),
            sequences: Vec::new(),
            next_sequence: 0,
            pending: HashSet::new(),
            events: has_push.then_some(events),
            subscription,
        };

        info!(
            "event=engine_open module=engine status=start backend={} id_strategy={} push={}",
            engine.store.backend_name(),
            engine.config.id_strategy,
            has_push
        );

        if engine.config.authenticated {
            if let Err(err) = engine.refresh() {
                // Start empty; `refresh` is the recovery path.
                warn!("event=engine_open module=engine status=degraded reason=initial_load_failed error={err}");
            }
        }
        Ok(engine)
    }

    /// Canonical list snapshot.
    pub fn list(&self) -> &[Intervention] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Intervention> {
        self.position(id).map(|index| &self.records[index])
    }

    /// Returns whether `id` is still awaiting store confirmation.
    ///
    /// The mark only exists while `Store::create` runs inside `create`, so
    /// between engine calls this is always `false`.
    pub fn is_pending(&self, id: &str) -> bool {
        self.position(id)
            .is_some_and(|index| self.pending.contains(&self.sequences[index]))
    }

    /// Optimistic records awaiting confirmation; `0` between calls.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Updates the session signal from the identity provider.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.config.authenticated = authenticated;
    }

    /// Filters the canonical list.
    pub fn search(&self, query: &str, index: &SearchIndex) -> Vec<&Intervention> {
        index.filter(&self.records, query)
    }

    /// Validates, inserts optimistically, then persists.
    ///
    /// Returns the record as it stands in the canonical list after
    /// confirmation.
    ///
    /// # Errors
    /// - `Validation` when a required field is empty; nothing changes.
    /// - `Store` when persistence fails; the optimistic record is removed.
    pub fn create(&mut self, draft: InterventionDraft) -> EngineResult<Intervention> {
        self.require_session("create")?;
        if let Err(err) = draft.validate() {
            warn!("event=intervention_create module=engine status=invalid error={err}");
            return Err(err.into());
        }

        let started_at = Instant::now();
        let (sequence, staged) = self.stage_create(draft);

        match self.store.create(&staged) {
            Ok(persisted) => {
                let confirmed = self.confirm_create(sequence, persisted);
                info!(
                    "event=intervention_create module=engine status=ok id={} duration_ms={}",
                    confirmed.id,
                    started_at.elapsed().as_millis()
                );
                Ok(confirmed)
            }
            Err(err) => {
                self.rollback_create(sequence);
                error!(
                    "event=intervention_create module=engine status=error id={} duration_ms={} error_code={} error={err}",
                    staged.id,
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                Err(err.into())
            }
        }
    }

    /// Removes optimistically, then persists the deletion.
    ///
    /// Deleting an absent id is a successful no-op without a store call.
    ///
    /// # Errors
    /// - `Store` when persistence fails. The record stays removed locally.
    pub fn delete(&mut self, id: &str) -> EngineResult<()> {
        self.require_session("delete")?;
        let Some(index) = self.position(id) else {
            debug!("event=intervention_delete module=engine status=absent id={id}");
            return Ok(());
        };

        let started_at = Instant::now();
        self.remove_at(index);

        match self.store.delete(id) {
            Ok(()) | Err(StoreError::NotFound(_)) => {
                info!(
                    "event=intervention_delete module=engine status=ok id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=intervention_delete module=engine status=error id={id} duration_ms={} error_code={} error={err}",
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                Err(err.into())
            }
        }
    }

    /// Replaces the canonical list with the store's current collection.
    pub fn refresh(&mut self) -> EngineResult<()> {
        self.require_session("refresh")?;
        let started_at = Instant::now();
        let loaded = self.store.list().map_err(|err| {
            error!(
                "event=engine_refresh module=engine status=error error_code={} error={err}",
                err.code()
            );
            err
        })?;

        self.records.clear();
        self.sequences.clear();
        self.pending.clear();

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(loaded.len());
        for record in loaded {
            if record.id.is_empty() || !seen.insert(record.id.clone()) {
                warn!(
                    "event=engine_refresh module=engine status=skipped_row id={}",
                    record.id
                );
                continue;
            }
            entries.push((self.take_sequence(), record));
        }
        entries.sort_by(|(seq_a, a), (seq_b, b)| b.date.cmp(&a.date).then(seq_b.cmp(seq_a)));
        for (sequence, record) in entries {
            self.sequences.push(sequence);
            self.records.push(record);
        }

        info!(
            "event=engine_refresh module=engine status=ok count={} duration_ms={}",
            self.records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Applies one push event. Returns whether the list changed.
    pub fn apply_push_event(&mut self, event: PushEvent) -> bool {
        match event {
            PushEvent::Inserted(record) => {
                if record.id.is_empty() {
                    warn!("event=push_apply module=engine status=ignored kind=inserted reason=empty_id");
                    return false;
                }
                if self.position(&record.id).is_some() {
                    debug!(
                        "event=push_apply module=engine status=duplicate kind=inserted id={}",
                        record.id
                    );
                    return false;
                }
                debug!(
                    "event=push_apply module=engine status=ok kind=inserted id={}",
                    record.id
                );
                let sequence = self.take_sequence();
                self.insert_sorted(sequence, record);
                true
            }
            PushEvent::Deleted(id) => match self.position(&id) {
                Some(index) => {
                    debug!("event=push_apply module=engine status=ok kind=deleted id={id}");
                    self.remove_at(index);
                    true
                }
                None => {
                    debug!("event=push_apply module=engine status=absent kind=deleted id={id}");
                    false
                }
            },
        }
    }

    /// Applies every queued push event. Returns how many were received.
    pub fn drain_push_events(&mut self) -> usize {
        let mut received = 0;
        loop {
            let next = match &self.events {
                Some(events) => events.try_recv(),
                None => return received,
            };
            match next {
                Ok(event) => {
                    received += 1;
                    self.apply_push_event(event);
                }
                Err(TryRecvError::Empty) => return received,
                Err(TryRecvError::Disconnected) => {
                    self.close_channel();
                    return received;
                }
            }
        }
    }

    /// Blocks up to `timeout` for one push event and applies it.
    ///
    /// Returns whether an event was received.
    pub fn wait_push_event(&mut self, timeout: Duration) -> bool {
        let next = match &self.events {
            Some(events) => events.recv_timeout(timeout),
            None => return false,
        };
        match next {
            Ok(event) => {
                self.apply_push_event(event);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.close_channel();
                false
            }
        }
    }

    /// Cancels the push subscription. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            info!("event=engine_unsubscribe module=engine status=ok");
        }
        self.events = None;
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    fn stage_create(&mut self, draft: InterventionDraft) -> (u64, Intervention) {
        let id = match self.config.id_strategy {
            IdStrategy::Client => self.assigner.next(),
            IdStrategy::Server => String::new(),
        };
        let record = Intervention::from_draft(id, draft);
        let sequence = self.take_sequence();
        self.insert_sorted(sequence, record.clone());
        self.pending.insert(sequence);
        (sequence, record)
    }

    fn confirm_create(&mut self, sequence: u64, persisted: Intervention) -> Intervention {
        self.pending.remove(&sequence);
        let Some(index) = self.index_of_sequence(sequence) else {
            return persisted;
        };

        let current = &mut self.records[index];
        match self.config.id_strategy {
            IdStrategy::Server if persisted.id.is_empty() => {
                warn!("event=intervention_create module=engine status=missing_server_id");
            }
            IdStrategy::Server => current.id = persisted.id,
            IdStrategy::Client if persisted.id != current.id => {
                warn!(
                    "event=intervention_create module=engine status=id_mismatch id={} store_id={}",
                    current.id, persisted.id
                );
            }
            IdStrategy::Client => {}
        }
        current.clone()
    }

    fn rollback_create(&mut self, sequence: u64) {
        self.pending.remove(&sequence);
        if let Some(index) = self.index_of_sequence(sequence) {
            self.remove_at(index);
        }
    }

    fn require_session(&self, operation: &str) -> EngineResult<()> {
        if self.config.authenticated {
            return Ok(());
        }
        warn!("event=engine_{operation} module=engine status=unauthenticated");
        Err(EngineError::Unauthenticated)
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Inserts ahead of every record with the same or an older date.
    fn insert_sorted(&mut self, sequence: u64, record: Intervention) {
        let index = self
            .records
            .partition_point(|existing| existing.date.as_str() > record.date.as_str());
        self.records.insert(index, record);
        self.sequences.insert(index, sequence);
    }

    fn remove_at(&mut self, index: usize) -> Intervention {
        let sequence = self.sequences.remove(index);
        self.pending.remove(&sequence);
        self.records.remove(index)
    }

    fn position(&self, id: &str) -> Option<usize> {
        if id.is_empty() {
            return None;
        }
        self.records.iter().position(|record| record.id == id)
    }

    fn index_of_sequence(&self, sequence: u64) -> Option<usize> {
        self.sequences.iter().position(|value| *value == sequence)
    }

    fn close_channel(&mut self) {
        warn!("event=push_channel module=engine status=disconnected");
        self.events = None;
        self.subscription = None;
    }
}
