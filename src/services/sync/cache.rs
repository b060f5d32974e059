//! Last known server view of the visible range.

use std::collections::{HashMap, HashSet};

use crate::models::meeting::Meeting;
use crate::models::timeslot::MeetingId;

/// Counts from [`CollectionCache::apply_revalidation`], mostly for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevalidationReport {
    pub replaced: usize,
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct CollectionCache {
    entries: Vec<Meeting>,
    /// Generation at which a confirmed commit was written into the cache
    lifted_at: HashMap<MeetingId, u64>,
    /// Generation at which an entry was dropped locally
    removed_at: HashMap<MeetingId, u64>,
    generation: u64,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Meeting] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &MeetingId) -> Option<&Meeting> {
        self.entries.iter().find(|m| &m.id == id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Insert or replace by id
    pub fn patch(&mut self, meeting: Meeting) {
        self.removed_at.remove(&meeting.id);
        match self.entries.iter_mut().find(|m| m.id == meeting.id) {
            Some(existing) => *existing = meeting,
            None => self.entries.push(meeting),
        }
    }

    /// Write a confirmed commit into the cache, replacing the entry stored
    /// under `previous_id` (a temporary id for creates).
    pub fn lift(&mut self, previous_id: &MeetingId, meeting: Meeting) {
        self.generation += 1;
        if previous_id != &meeting.id {
            self.entries.retain(|m| &m.id != previous_id);
            self.lifted_at.remove(previous_id);
        }
        self.lifted_at.insert(meeting.id.clone(), self.generation);
        self.patch(meeting);
    }

    /// Drop an entry. Listings fetched before this call will not bring it back.
    pub fn remove(&mut self, id: &MeetingId) -> Option<Meeting> {
        self.generation += 1;
        self.lifted_at.remove(id);
        self.removed_at.insert(id.clone(), self.generation);
        let index = self.entries.iter().position(|m| &m.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Mark the start of a fetch; pass the value back to
    /// [`apply_revalidation`](Self::apply_revalidation)
    pub fn begin_revalidation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Merge a fresh server listing.
    ///
    /// Protected ids keep their local entry. Entries lifted after the fetch
    /// started are newer than the listing and are kept as well; entries
    /// removed after it started stay removed.
    pub fn apply_revalidation(
        &mut self,
        started: u64,
        fresh: Vec<Meeting>,
        protected: &HashSet<MeetingId>,
    ) -> RevalidationReport {
        let mut report = RevalidationReport::default();
        let newer_than_fetch =
            |lifted_at: &HashMap<MeetingId, u64>, id: &MeetingId| lifted_at.get(id).is_some_and(|g| *g > started);

        let fresh_ids: HashSet<MeetingId> = fresh.iter().map(|m| m.id.clone()).collect();

        let before = self.entries.len();
        let lifted_at = &self.lifted_at;
        self.entries.retain(|m| {
            fresh_ids.contains(&m.id)
                || protected.contains(&m.id)
                || m.id.is_temporary()
                || newer_than_fetch(lifted_at, &m.id)
        });
        report.removed = before - self.entries.len();

        for meeting in fresh {
            if protected.contains(&meeting.id)
                || newer_than_fetch(&self.lifted_at, &meeting.id)
                || newer_than_fetch(&self.removed_at, &meeting.id)
            {
                report.skipped += 1;
                continue;
            }
            match self.entries.iter_mut().find(|m| m.id == meeting.id) {
                Some(existing) => {
                    if *existing != meeting {
                        report.replaced += 1;
                    }
                    *existing = meeting;
                }
                None => {
                    report.added += 1;
                    self.entries.push(meeting);
                }
            }
        }

        let live: HashSet<&MeetingId> = self.entries.iter().map(|m| &m.id).collect();
        self.lifted_at.retain(|id, _| live.contains(id));
        self.removed_at.retain(|_, removed| *removed > started);

        report
    }
}
