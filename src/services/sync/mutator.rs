//! Per-meeting optimistic edit bookkeeping.
//!
//! Edits land in the local value at once. Each record then waits for its
//! debounce deadline, is handed out as exactly one [`CommitRequest`], and
//! only after that request completes can the next one for the same meeting
//! leave. Time is passed in explicitly so every transition is reproducible.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::models::meeting::Meeting;
use crate::models::timeslot::MeetingId;
use crate::services::store::StoreError;

/// What the UI shows for a meeting's persistence state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationStatus {
    Idle,
    Dirty,
    Committing,
    Error,
}

/// Remote write carried by a commit
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOp {
    Create(Meeting),
    Update(Meeting),
    Delete(MeetingId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub ticket: u64,
    pub id: MeetingId,
    pub op: CommitOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Saved(Meeting),
    Deleted,
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    /// Commit accepted; `meeting` is the server's copy, to lift into the outer cache
    Confirmed { previous_id: MeetingId, meeting: Meeting },
    Deleted(MeetingId),
    /// Remote copy is gone; local edits were dropped
    Discarded { id: MeetingId, error: StoreError },
    Failed { id: MeetingId, error: StoreError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    ticket: u64,
    edit_seq: u64,
}

/// Bookkeeping for one meeting with unconfirmed edits
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// Local edits not yet handed to the store
    pub dirty: bool,
    in_flight: Option<InFlight>,
    /// Last payload handed out, kept for byte-identical retries
    pub pending_payload: Option<CommitOp>,
    pub last_error: Option<StoreError>,
    value: Option<Meeting>,
    persisted: bool,
    edit_seq: u64,
    payload_seq: u64,
    due_at: Option<Instant>,
    retry_requested: bool,
}

impl MutationRecord {
    fn new(value: Meeting, persisted: bool) -> Self {
        Self {
            dirty: false,
            in_flight: None,
            pending_payload: None,
            last_error: None,
            value: Some(value),
            persisted,
            edit_seq: 0,
            payload_seq: 0,
            due_at: None,
            retry_requested: false,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn status(&self) -> MutationStatus {
        if self.last_error.is_some() {
            MutationStatus::Error
        } else if self.in_flight.is_some() {
            MutationStatus::Committing
        } else if self.dirty {
            MutationStatus::Dirty
        } else {
            MutationStatus::Idle
        }
    }

    fn mark_edited(&mut self, due_at: Instant) {
        self.dirty = true;
        self.edit_seq += 1;
        self.due_at = Some(due_at);
        self.last_error = None;
        self.retry_requested = false;
    }

    fn next_op(&self, id: &MeetingId) -> Option<CommitOp> {
        match (&self.value, self.persisted) {
            (Some(meeting), false) => Some(CommitOp::Create(meeting.clone())),
            (Some(meeting), true) => Some(CommitOp::Update(meeting.clone())),
            (None, true) => Some(CommitOp::Delete(id.clone())),
            (None, false) => None,
        }
    }
}

pub struct OptimisticMutator {
    debounce: Duration,
    records: BTreeMap<MeetingId, MutationRecord>,
    aliases: HashMap<MeetingId, MeetingId>,
    next_ticket: u64,
}

impl OptimisticMutator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            records: BTreeMap::new(),
            aliases: HashMap::new(),
            next_ticket: 1,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Follow temporary ids to the id the store assigned
    pub fn canonical_id(&self, id: &MeetingId) -> MeetingId {
        self.aliases.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    pub fn record(&self, id: &MeetingId) -> Option<&MutationRecord> {
        self.records.get(&self.canonical_id(id))
    }

    pub fn is_tracked(&self, id: &MeetingId) -> bool {
        self.record(id).is_some()
    }

    /// Locally held value; `None` when untracked or deleted locally
    pub fn value(&self, id: &MeetingId) -> Option<&Meeting> {
        self.record(id).and_then(|record| record.value.as_ref())
    }

    pub fn is_deleted(&self, id: &MeetingId) -> bool {
        self.record(id).is_some_and(|record| record.value.is_none())
    }

    pub fn status(&self, id: &MeetingId) -> MutationStatus {
        self.record(id)
            .map_or(MutationStatus::Idle, MutationRecord::status)
    }

    pub fn last_error(&self, id: &MeetingId) -> Option<&StoreError> {
        self.record(id).and_then(|record| record.last_error.as_ref())
    }

    /// Meetings whose last commit failed, waiting for a retry or a new edit
    pub fn failed_ids(&self) -> Vec<MeetingId> {
        self.records
            .iter()
            .filter(|(_, record)| record.last_error.is_some())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids a background refresh must leave alone
    pub fn protected_ids(&self) -> HashSet<MeetingId> {
        self.records.keys().cloned().collect()
    }

    /// Earliest pending debounce deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.records
            .values()
            .filter(|record| record.in_flight.is_none() && record.last_error.is_none())
            .filter_map(|record| record.due_at)
            .min()
    }

    /// Start tracking a meeting that only exists locally
    pub fn create(&mut self, meeting: Meeting, now: Instant) -> MeetingId {
        let id = meeting.id.clone();
        let mut record = MutationRecord::new(meeting, false);
        record.mark_edited(now + self.debounce);
        log::debug!("Tracking new meeting {}", id);
        self.records.insert(id.clone(), record);
        id
    }

    /// Replace the local value with `updater(prev)` and restart the debounce.
    ///
    /// `base` seeds the record when the meeting has no local edits yet.
    /// Returns `None` if there is nothing to edit.
    pub fn apply<F>(
        &mut self,
        id: &MeetingId,
        base: Option<&Meeting>,
        updater: F,
        now: Instant,
    ) -> Option<&Meeting>
    where
        F: FnOnce(&Meeting) -> Meeting,
    {
        let key = self.canonical_id(id);
        if !self.records.contains_key(&key) {
            let seed = base?.clone();
            let persisted = !seed.id.is_temporary();
            self.records
                .insert(key.clone(), MutationRecord::new(seed, persisted));
        }

        let due_at = now + self.debounce;
        let record = self.records.get_mut(&key)?;
        let previous = record.value.as_ref()?;
        let mut next = updater(previous);
        next.reassign_id(key.clone());

        record.value = Some(next);
        record.mark_edited(due_at);
        record.value.as_ref()
    }

    /// Delete locally. Returns `false` when no remote delete is needed.
    pub fn delete(&mut self, id: &MeetingId, base: Option<&Meeting>, now: Instant) -> bool {
        let key = self.canonical_id(id);
        let persisted = match self.records.get(&key) {
            Some(record) => record.persisted || record.in_flight.is_some(),
            None => base.is_some_and(|meeting| !meeting.id.is_temporary()),
        };

        if !persisted {
            log::debug!("Dropping unsaved meeting {} without a remote call", key);
            self.records.remove(&key);
            self.forget_aliases_of(&key);
            return false;
        }

        if !self.records.contains_key(&key) {
            let Some(seed) = base else {
                return false;
            };
            self.records
                .insert(key.clone(), MutationRecord::new(seed.clone(), true));
        }
        let Some(record) = self.records.get_mut(&key) else {
            return false;
        };
        record.value = None;
        record.mark_edited(now);
        true
    }

    /// Skip the rest of the debounce window
    pub fn commit_now(&mut self, id: &MeetingId, now: Instant) {
        let key = self.canonical_id(id);
        if let Some(record) = self.records.get_mut(&key) {
            if record.dirty {
                record.due_at = Some(now);
            }
        }
    }

    /// Re-issue the payload of a failed commit. Returns `false` if the
    /// meeting is not in the error state.
    pub fn retry(&mut self, id: &MeetingId, now: Instant) -> bool {
        let key = self.canonical_id(id);
        match self.records.get_mut(&key) {
            Some(record) if record.last_error.is_some() => {
                record.retry_requested = true;
                record.due_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Hand out every commit that is due, at most one per meeting
    pub fn tick(&mut self, now: Instant) -> Vec<CommitRequest> {
        let mut requests = Vec::new();
        let mut abandoned = Vec::new();

        for (id, record) in self.records.iter_mut() {
            if record.in_flight.is_some() {
                continue;
            }

            let (op, seq) = if record.retry_requested {
                match record.pending_payload.clone() {
                    Some(op) => (op, record.payload_seq),
                    None => match record.next_op(id) {
                        Some(op) => (op, record.edit_seq),
                        None => {
                            abandoned.push(id.clone());
                            continue;
                        }
                    },
                }
            } else {
                let due = record.due_at.is_some_and(|due_at| due_at <= now);
                if !record.dirty || !due || record.last_error.is_some() {
                    continue;
                }
                match record.next_op(id) {
                    Some(op) => (op, record.edit_seq),
                    None => {
                        abandoned.push(id.clone());
                        continue;
                    }
                }
            };

            let ticket = self.next_ticket;
            self.next_ticket += 1;

            record.in_flight = Some(InFlight { ticket, edit_seq: seq });
            record.pending_payload = Some(op.clone());
            record.payload_seq = seq;
            record.dirty = record.edit_seq != seq;
            record.due_at = None;
            record.retry_requested = false;
            record.last_error = None;

            log::debug!("Commit #{} for {} ({})", ticket, id, op_name(&op));
            requests.push(CommitRequest {
                ticket,
                id: id.clone(),
                op,
            });
        }

        for id in abandoned {
            self.records.remove(&id);
        }

        requests
    }

    /// Apply the result of a commit handed out by [`tick`](Self::tick)
    pub fn complete(&mut self, ticket: u64, outcome: CommitOutcome, now: Instant) -> Vec<MutationEvent> {
        let Some(key) = self
            .records
            .iter()
            .find(|(_, record)| record.in_flight.is_some_and(|f| f.ticket == ticket))
            .map(|(id, _)| id.clone())
        else {
            log::warn!("Ignoring completion for unknown commit #{}", ticket);
            return Vec::new();
        };

        let mut events = Vec::new();
        match outcome {
            CommitOutcome::Saved(server) => self.confirm(key, ticket, server, now, &mut events),
            CommitOutcome::Deleted => {
                log::debug!("Delete of {} confirmed", key);
                self.records.remove(&key);
                self.forget_aliases_of(&key);
                events.push(MutationEvent::Deleted(key));
            }
            CommitOutcome::Failed(error) if error.is_not_found() => {
                log::warn!("Meeting {} vanished remotely, discarding local edits", key);
                self.records.remove(&key);
                self.forget_aliases_of(&key);
                events.push(MutationEvent::Discarded { id: key, error });
            }
            CommitOutcome::Failed(error) => {
                log::error!("Commit #{} for {} failed: {}", ticket, key, error);
                if let Some(record) = self.records.get_mut(&key) {
                    record.in_flight = None;
                    record.dirty = true;
                    record.last_error = Some(error.clone());
                    record.due_at = None;
                }
                events.push(MutationEvent::Failed { id: key, error });
            }
        }
        events
    }

    fn confirm(
        &mut self,
        key: MeetingId,
        ticket: u64,
        server: Meeting,
        now: Instant,
        events: &mut Vec<MutationEvent>,
    ) {
        let Some(mut record) = self.records.remove(&key) else {
            return;
        };
        let Some(in_flight) = record.in_flight.take() else {
            return;
        };

        let canonical = server.id.clone();
        let newer_edit = record.edit_seq != in_flight.edit_seq;

        match record.value.as_mut() {
            Some(local) if newer_edit => {
                local.reassign_id(canonical.clone());
                local.time.last = server.time.last;
            }
            Some(local) => *local = server.clone(),
            None => {}
        }

        record.persisted = true;
        record.last_error = None;
        if !newer_edit {
            record.pending_payload = None;
        }

        if canonical != key {
            log::info!("Meeting {} is now {}", key, canonical);
            for target in self.aliases.values_mut() {
                if *target == key {
                    *target = canonical.clone();
                }
            }
            self.aliases.insert(key.clone(), canonical.clone());
        }

        events.push(MutationEvent::Confirmed {
            previous_id: key,
            meeting: server,
        });

        log::debug!("Commit #{} for {} confirmed", ticket, canonical);
        if record.dirty {
            // Follow-up leaves on the next tick.
            record.due_at = Some(now);
            self.records.insert(canonical, record);
        }
    }

    /// Drop temporary-id aliases nobody can still be holding: the canonical
    /// record is settled and the old id is not in `in_use`.
    pub fn prune_aliases(&mut self, in_use: &HashSet<MeetingId>) {
        let records = &self.records;
        let before = self.aliases.len();
        self.aliases
            .retain(|old, canonical| in_use.contains(old) || records.contains_key(canonical));
        if self.aliases.len() < before {
            log::debug!("Pruned {} id alias(es)", before - self.aliases.len());
        }
    }

    fn forget_aliases_of(&mut self, id: &MeetingId) {
        self.aliases.retain(|_, target| target != id);
    }
}

fn op_name(op: &CommitOp) -> &'static str {
    match op {
        CommitOp::Create(_) => "create",
        CommitOp::Update(_) => "update",
        CommitOp::Delete(_) => "delete",
    }
}
