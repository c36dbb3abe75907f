use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{BookId, Cents, Entry, EntryId, EntryType};

/// Totals for one book's entry collection at a point in time.
///
/// `balance == total_cash_in - total_cash_out` holds for every snapshot
/// produced here; there is no way to mutate one field independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub total_cash_in: Cents,
    pub total_cash_out: Cents,
    pub balance: Cents,
}

impl LedgerSnapshot {
    pub const ZERO: LedgerSnapshot = LedgerSnapshot {
        total_cash_in: 0,
        total_cash_out: 0,
        balance: 0,
    };
}

/// The entry's contribution to a balance: positive for cash in,
/// negative for cash out.
pub fn signed_amount(entry: &Entry) -> Cents {
    match entry.entry_type {
        EntryType::CashIn => entry.amount_cents,
        EntryType::CashOut => -entry.amount_cents,
    }
}

/// Aggregate a collection of entries into a snapshot.
///
/// One O(n) pass; order never affects the result. An empty collection
/// yields the zero snapshot. Duplicate ids are summed as given, not
/// deduplicated; keeping the collection duplicate-free is the caller's
/// job (see [`BookLedger`]).
pub fn compute<'a, I>(entries: I) -> LedgerSnapshot
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries.into_iter().fold(LedgerSnapshot::ZERO, apply_insert)
}

/// Add one entry's contribution to a snapshot. O(1).
pub fn apply_insert(snapshot: LedgerSnapshot, entry: &Entry) -> LedgerSnapshot {
    let mut next = snapshot;
    match entry.entry_type {
        EntryType::CashIn => next.total_cash_in += entry.amount_cents,
        EntryType::CashOut => next.total_cash_out += entry.amount_cents,
    }
    next.balance = next.total_cash_in - next.total_cash_out;
    next
}

/// Remove one entry's contribution from a snapshot. O(1).
///
/// The caller must guarantee the entry is part of the snapshot's basis
/// set; membership is not tracked here.
pub fn apply_remove(snapshot: LedgerSnapshot, entry: &Entry) -> LedgerSnapshot {
    let mut next = snapshot;
    match entry.entry_type {
        EntryType::CashIn => next.total_cash_in -= entry.amount_cents,
        EntryType::CashOut => next.total_cash_out -= entry.amount_cents,
    }
    next.balance = next.total_cash_in - next.total_cash_out;
    next
}

/// Replace an entry's contribution, handling edits that change the type
/// and the amount at once. Each half only touches the bucket matching
/// its own entry's type.
pub fn apply_update(snapshot: LedgerSnapshot, old: &Entry, new: &Entry) -> LedgerSnapshot {
    apply_insert(apply_remove(snapshot, old), new)
}

/// A change to one book's entry collection, as delivered by the store's
/// notification feed. Updates carry the previous version so consumers
/// without their own basis set can still reverse the old contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntryEvent {
    Inserted(Entry),
    Updated { before: Entry, after: Entry },
    Deleted(Entry),
}

impl EntryEvent {
    /// The entry the event is about (the new version, for updates).
    pub fn entry(&self) -> &Entry {
        match self {
            EntryEvent::Inserted(entry) | EntryEvent::Deleted(entry) => entry,
            EntryEvent::Updated { after, .. } => after,
        }
    }

    pub fn book_id(&self) -> BookId {
        self.entry().book_id
    }
}

/// Owns the basis set and current snapshot for one book.
///
/// The pure `apply_*` functions trust their caller about set membership;
/// this is that caller. Events are applied at-least-once safely: an
/// insert for an id already held is skipped, as are updates and deletes
/// for ids never seen. Updates reverse the contribution of the *stored*
/// previous version rather than the event's `before`, so a stale event
/// cannot desynchronize snapshot and basis.
#[derive(Debug, Clone, Default)]
pub struct BookLedger {
    entries: HashMap<EntryId, Entry>,
    snapshot: LedgerSnapshot,
}

impl BookLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build basis and snapshot from a full fetch of the book's entries.
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let snapshot = compute(&entries);
        let entries = entries.into_iter().map(|e| (e.id, e)).collect();
        Self { entries, snapshot }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Fold one event into the basis set and snapshot.
    ///
    /// Returns false when the event was skipped as a duplicate or as
    /// referring to an entry outside the basis set.
    pub fn apply(&mut self, event: &EntryEvent) -> bool {
        match event {
            EntryEvent::Inserted(entry) => {
                if self.entries.contains_key(&entry.id) {
                    return false;
                }
                self.snapshot = apply_insert(self.snapshot, entry);
                self.entries.insert(entry.id, entry.clone());
                true
            }
            EntryEvent::Updated { after, .. } => {
                let Some(stored) = self.entries.get(&after.id) else {
                    return false;
                };
                self.snapshot = apply_update(self.snapshot, stored, after);
                self.entries.insert(after.id, after.clone());
                true
            }
            EntryEvent::Deleted(entry) => {
                let Some(stored) = self.entries.remove(&entry.id) else {
                    return false;
                };
                self.snapshot = apply_remove(self.snapshot, &stored);
                true
            }
        }
    }

    /// Discard basis and snapshot and rebuild from a fresh full fetch.
    /// This is the recovery path when deliveries may have been missed.
    pub fn resync(&mut self, entries: Vec<Entry>) {
        *self = Self::from_entries(entries);
    }
}
