//! Glue between the UI thread, the mutator, the cache and a [`MeetingStore`].
//!
//! Store calls run on the tokio blocking pool. Their results come back over a
//! channel and are folded in by [`SyncEngine::pump`], which the UI calls once
//! per frame, so all state is only ever touched from one thread.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;

use super::cache::CollectionCache;
use super::mutator::{CommitOp, CommitOutcome, CommitRequest, MutationEvent, MutationStatus, OptimisticMutator};
use crate::models::meeting::Meeting;
use crate::models::settings::Settings;
use crate::models::timeslot::MeetingId;
use crate::services::store::{MeetingStore, StoreError};

/// Called from a worker thread whenever a result is waiting for `pump`
pub type Waker = Arc<dyn Fn() + Send + Sync>;

type Range = (DateTime<Utc>, DateTime<Utc>);

enum Completion {
    Commit {
        ticket: u64,
        outcome: CommitOutcome,
    },
    Revalidated {
        started: u64,
        range: Range,
        result: Result<Vec<Meeting>, StoreError>,
    },
}

/// User-facing results of background work
#[derive(Debug, Clone, PartialEq)]
pub enum SyncNotice {
    Saved(MeetingId),
    Failed { id: MeetingId, message: String },
    /// The meeting was deleted elsewhere; local edits were dropped
    Vanished { id: MeetingId, message: String },
    RefreshFailed(String),
}

pub struct SyncEngine {
    store: Arc<dyn MeetingStore>,
    runtime: Handle,
    mutator: OptimisticMutator,
    cache: CollectionCache,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    waker: Option<Waker>,
    range: Option<Range>,
    revalidate_every: Duration,
    last_revalidated: Option<Instant>,
    revalidating: bool,
    notices: Vec<SyncNotice>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn MeetingStore>, runtime: Handle, settings: &Settings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            store,
            runtime,
            mutator: OptimisticMutator::new(settings.debounce()),
            cache: CollectionCache::new(),
            tx,
            rx,
            waker: None,
            range: None,
            revalidate_every: settings.revalidate_interval(),
            last_revalidated: None,
            revalidating: false,
            notices: Vec::new(),
        }
    }

    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    /// Everything the grid should draw: cached values overlaid with local edits
    pub fn meetings(&self) -> Vec<Meeting> {
        let mut out = Vec::with_capacity(self.cache.len());
        for cached in self.cache.list() {
            if self.mutator.is_tracked(&cached.id) {
                if let Some(local) = self.mutator.value(&cached.id) {
                    out.push(local.clone());
                }
            } else {
                out.push(cached.clone());
            }
        }
        out
    }

    pub fn current(&self, id: &MeetingId) -> Option<&Meeting> {
        let key = self.mutator.canonical_id(id);
        if self.mutator.is_tracked(&key) {
            self.mutator.value(&key)
        } else {
            self.cache.get(&key)
        }
    }

    pub fn canonical_id(&self, id: &MeetingId) -> MeetingId {
        self.mutator.canonical_id(id)
    }

    pub fn status(&self, id: &MeetingId) -> MutationStatus {
        self.mutator.status(id)
    }

    pub fn last_error(&self, id: &MeetingId) -> Option<&StoreError> {
        self.mutator.last_error(id)
    }

    pub fn failed_ids(&self) -> Vec<MeetingId> {
        self.mutator.failed_ids()
    }

    /// Show a new meeting right away and schedule its create
    pub fn create(&mut self, mut meeting: Meeting) -> MeetingId {
        if !meeting.id.is_temporary() {
            meeting.reassign_id(MeetingId::temporary());
        }
        self.cache.patch(meeting.clone());
        self.mutator.create(meeting, Instant::now())
    }

    pub fn apply<F>(&mut self, id: &MeetingId, updater: F) -> Option<Meeting>
    where
        F: FnOnce(&Meeting) -> Meeting,
    {
        let key = self.mutator.canonical_id(id);
        let base = self.cache.get(&key).cloned();
        self.mutator
            .apply(&key, base.as_ref(), updater, Instant::now())
            .cloned()
    }

    pub fn commit_now(&mut self, id: &MeetingId) {
        self.mutator.commit_now(id, Instant::now());
    }

    pub fn retry(&mut self, id: &MeetingId) -> bool {
        let retried = self.mutator.retry(id, Instant::now());
        if retried {
            log::info!("Retrying commit for {}", id);
        }
        retried
    }

    pub fn delete(&mut self, id: &MeetingId) {
        let key = self.mutator.canonical_id(id);
        let base = self.cache.get(&key).cloned();
        if !self.mutator.delete(&key, base.as_ref(), Instant::now()) {
            self.cache.remove(&key);
        }
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Change the visible range; a fresh listing is requested on the next pump
    pub fn set_range(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) {
        if self.range == Some((from, to)) {
            return;
        }
        log::debug!("Visible range is now {} .. {}", from, to);
        self.range = Some((from, to));
        self.last_revalidated = None;
    }

    /// Request a fresh listing of the visible range now
    pub fn revalidate(&mut self) {
        self.revalidate_at(Instant::now());
    }

    pub fn pump(&mut self) -> bool {
        self.pump_at(Instant::now())
    }

    /// Fold in finished background work, then start whatever is due.
    /// Returns `true` when something visible may have changed.
    pub fn pump_at(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed = true;
            match completion {
                Completion::Commit { ticket, outcome } => {
                    let events = self.mutator.complete(ticket, outcome, now);
                    self.handle_events(events);
                }
                Completion::Revalidated { started, range, result } => {
                    self.revalidating = false;
                    self.merge_listing(started, range, result);
                }
            }
        }

        let revalidation_due = self
            .last_revalidated
            .map_or(true, |at| now.duration_since(at) >= self.revalidate_every);
        if self.range.is_some() && !self.revalidating && revalidation_due {
            self.revalidate_at(now);
        }

        for request in self.mutator.tick(now) {
            self.dispatch(request);
        }

        changed
    }

    /// How long the UI may sleep before the next `pump` has work to do
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        let commit = self.mutator.next_deadline();
        let refresh = match (self.range, self.last_revalidated) {
            (Some(_), Some(at)) if !self.revalidating => Some(at + self.revalidate_every),
            (Some(_), None) => Some(now),
            _ => None,
        };
        [commit, refresh]
            .into_iter()
            .flatten()
            .min()
            .map(|at| at.saturating_duration_since(now))
    }

    /// Forget temporary ids that resolved to a settled meeting, except the
    /// ones the caller still holds
    pub fn prune_aliases(&mut self, in_use: &HashSet<MeetingId>) {
        self.mutator.prune_aliases(in_use);
    }

    pub fn take_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    fn handle_events(&mut self, events: Vec<MutationEvent>) {
        for event in events {
            match event {
                MutationEvent::Confirmed { previous_id, meeting } => {
                    let id = meeting.id.clone();
                    self.cache.lift(&previous_id, meeting);
                    self.notices.push(SyncNotice::Saved(id));
                }
                MutationEvent::Deleted(id) => {
                    self.cache.remove(&id);
                }
                MutationEvent::Discarded { id, error } => {
                    self.cache.remove(&id);
                    self.notices.push(SyncNotice::Vanished {
                        id,
                        message: error.to_string(),
                    });
                }
                MutationEvent::Failed { id, error } => {
                    self.notices.push(SyncNotice::Failed {
                        id,
                        message: error.to_string(),
                    });
                }
            }
        }
    }

    fn merge_listing(&mut self, started: u64, range: Range, result: Result<Vec<Meeting>, StoreError>) {
        if self.range != Some(range) {
            log::debug!("Dropping listing for a range that is no longer visible");
            return;
        }
        match result {
            Ok(fresh) => {
                let protected = self.mutator.protected_ids();
                let report = self.cache.apply_revalidation(started, fresh, &protected);
                log::debug!(
                    "Revalidated: {} replaced, {} added, {} removed, {} skipped",
                    report.replaced,
                    report.added,
                    report.removed,
                    report.skipped
                );
            }
            Err(err) => {
                log::warn!("Failed to refresh meetings: {}", err);
                self.notices.push(SyncNotice::RefreshFailed(err.to_string()));
            }
        }
    }

    fn revalidate_at(&mut self, now: Instant) {
        let Some(range) = self.range else {
            return;
        };
        let started = self.cache.begin_revalidation();
        self.revalidating = true;
        self.last_revalidated = Some(now);

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        self.runtime.spawn_blocking(move || {
            let result = store.list_range(range.0, range.1);
            let _ = tx.send(Completion::Revalidated { started, range, result });
            if let Some(wake) = waker {
                wake();
            }
        });
    }

    fn dispatch(&self, request: CommitRequest) {
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        self.runtime.spawn_blocking(move || {
            let CommitRequest { ticket, id, op } = request;
            let result = match &op {
                CommitOp::Create(meeting) => store.create(meeting).map(CommitOutcome::Saved),
                CommitOp::Update(meeting) => store.update(&id, meeting).map(CommitOutcome::Saved),
                CommitOp::Delete(target) => store.delete(target).map(|_| CommitOutcome::Deleted),
            };
            let outcome = result.unwrap_or_else(CommitOutcome::Failed);
            let _ = tx.send(Completion::Commit { ticket, outcome });
            if let Some(wake) = waker {
                wake();
            }
        });
    }
}
