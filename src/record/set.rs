use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::Record;

/// Concurrent map from record id to [`Record`].
///
/// Each insert is stamped with a sequence number so [`snapshot`](Self::snapshot)
/// can return records in insertion order. All mutation goes through
/// [`insert_if_absent`](Self::insert_if_absent) and
/// [`set_cover_url`](Self::set_cover_url); each is a single step under the
/// shard lock for that id, so two tasks racing on the same id cannot both
/// insert it.
#[derive(Debug, Default)]
pub struct RecordSet {
    entries: DashMap<String, Slot>,
    next_seq: AtomicU64,
}

#[derive(Debug)]
struct Slot {
    seq: u64,
    record: Record,
}

impl RecordSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record` unless its id is empty or already present.
    ///
    /// Returns true if the record was inserted. An existing entry is never
    /// overwritten.
    pub fn insert_if_absent(&self, record: Record) -> bool {
        if record.id.is_empty() {
            return false;
        }
        match self.entries.entry(record.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                vacant.insert(Slot { seq, record });
                true
            }
        }
    }

    /// Sets the cover URL of an existing record and returns the updated copy.
    ///
    /// Returns `None` and changes nothing when `id` is unknown.
    pub fn set_cover_url(&self, id: &str, cover_url: impl Into<String>) -> Option<Record> {
        let mut slot = self.entries.get_mut(id)?;
        slot.record.cover_url = Some(cover_url.into());
        Some(slot.record.clone())
    }

    /// Returns true if `id` is a key.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns a copy of the record stored under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Record> {
        self.entries.get(id).map(|slot| slot.record.clone())
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every record out, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        let mut slots: Vec<(u64, Record)> = self
            .entries
            .iter()
            .map(|slot| (slot.seq, slot.record.clone()))
            .collect();
        slots.sort_unstable_by_key(|(seq, _)| *seq);
        slots.into_iter().map(|(_, record)| record).collect()
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|record| record.id).collect()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let set = Self::new();
        for record in iter {
            set.insert_if_absent(record);
        }
        set
    }
}

/// Records that resolved a cover URL during enrichment.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichedSet {
    records: Vec<Record>,
}

impl EnrichedSet {
    /// Builds the set, dropping records without a cover URL and repeated ids.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|record| record.cover_url().is_some())
            .filter(|record| seen.insert(record.id.clone()))
            .collect();
        Self { records }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no record resolved a cover.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Iterates records in the order enrichment produced them.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl FromIterator<Record> for EnrichedSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

impl<'a> IntoIterator for &'a EnrichedSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
