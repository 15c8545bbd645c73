use crate::*;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An append-only record ledger
///
/// Implementations must make `put_if_absent` atomic: of any number of concurrent calls for the
/// same key, exactly one returns `Ok(true)`. Entries are never modified or removed once
/// appended, and each is assigned a sequence number greater than every earlier entry's.
pub trait Ledger {
    /// Append a record under `key` unless the key is already taken
    fn put_if_absent(&self, key: LedgerKey, record: LedgerRecord) -> Result<bool, LedgerError>;

    /// Get the entry stored under `key`
    fn get(&self, key: LedgerKey) -> Result<Option<LedgerEntry>, LedgerError>;

    /// All entries for an election, in key order
    fn entries(&self, election_id: ElectionId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Get a voter's commitment
    fn get_commitment(
        &self,
        election_id: ElectionId,
        voter_id: &VoterId,
    ) -> Result<Option<Recorded<CommitmentRecord>>, LedgerError> {
        let key = LedgerKey::new(election_id, RecordType::Commitment, voter_id);
        match self.get(key)? {
            Some(entry) => Ok(Some(Recorded::try_from(entry)?)),
            None => Ok(None),
        }
    }

    /// Get a voter's reveal
    fn get_reveal(
        &self,
        election_id: ElectionId,
        voter_id: &VoterId,
    ) -> Result<Option<Recorded<RevealRecord>>, LedgerError> {
        let key = LedgerKey::new(election_id, RecordType::Reveal, voter_id);
        match self.get(key)? {
            Some(entry) => Ok(Some(Recorded::try_from(entry)?)),
            None => Ok(None),
        }
    }
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn put_if_absent(&self, key: LedgerKey, record: LedgerRecord) -> Result<bool, LedgerError> {
        (**self).put_if_absent(key, record)
    }

    fn get(&self, key: LedgerKey) -> Result<Option<LedgerEntry>, LedgerError> {
        (**self).get(key)
    }

    fn entries(&self, election_id: ElectionId) -> Result<Vec<LedgerEntry>, LedgerError> {
        (**self).entries(election_id)
    }
}

#[derive(Default)]
struct MemStoreInner {
    entries: BTreeMap<LedgerKey, LedgerEntry>,
    last_sequence: u64,
}

/// A simple ledger that uses an in-memory BTreeMap
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemStoreInner>,
}

impl MemStore {
    /// Number of entries across all elections
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Ledger for MemStore {
    fn put_if_absent(&self, key: LedgerKey, record: LedgerRecord) -> Result<bool, LedgerError> {
        let mut inner = self.lock();
        if inner.entries.contains_key(&key) {
            return Ok(false);
        }

        inner.last_sequence += 1;
        let sequence = inner.last_sequence;
        inner.entries.insert(
            key,
            LedgerEntry {
                key,
                sequence,
                record,
            },
        );
        Ok(true)
    }

    fn get(&self, key: LedgerKey) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.lock().entries.get(&key).cloned())
    }

    fn entries(&self, election_id: ElectionId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let start = LedgerKey::first(election_id);
        let end = LedgerKey::last(election_id);

        let inner = self.lock();
        Ok(inner
            .entries
            .range(start..=end)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

impl From<Vec<LedgerEntry>> for MemStore {
    /// Rebuild a store from exported entries, keeping their sequence numbers
    fn from(item: Vec<LedgerEntry>) -> Self {
        let mut inner = MemStoreInner::default();
        for entry in item {
            inner.last_sequence = inner.last_sequence.max(entry.sequence);
            inner.entries.insert(entry.key, entry);
        }
        MemStore {
            inner: Mutex::new(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn commitment(election_id: ElectionId, voter: &str) -> CommitmentRecord {
        CommitmentRecord {
            election_id,
            voter_id: voter.into(),
            digest: commit("A", voter),
        }
    }

    #[test]
    fn test_put_if_absent() {
        let store = MemStore::default();
        let election_id = ElectionId::generate();
        let first = commitment(election_id, "alice");
        let key = first.key();

        assert!(store.put_if_absent(key, first.clone().into()).unwrap());

        // Key taken, record unchanged
        let mut second = first.clone();
        second.digest = commit("B", "alice");
        assert!(!store.put_if_absent(key, second.into()).unwrap());

        let stored = store
            .get_commitment(election_id, &"alice".into())
            .unwrap()
            .unwrap();
        assert_eq!(stored.record, first);
        assert_eq!(stored.committed_at(), 1);

        assert!(store
            .get_reveal(election_id, &"alice".into())
            .unwrap()
            .is_none());
        assert!(store
            .get_commitment(election_id, &"bob".into())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_entries_by_election() {
        let store = MemStore::default();
        let election_a = ElectionId::generate();
        let election_b = ElectionId::generate();

        for voter in &["1", "2", "3"] {
            let record = commitment(election_a, voter);
            store.put_if_absent(record.key(), record.into()).unwrap();
        }
        let record = commitment(election_b, "1");
        store.put_if_absent(record.key(), record.into()).unwrap();

        let entries = store.entries(election_a).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.election_id() == election_a));
        assert_eq!(store.entries(election_b).unwrap().len(), 1);
        assert_eq!(store.len(), 4);

        let mut sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, vec![1, 2, 3]);

        // Rebuilt stores continue the sequence
        let rebuilt = MemStore::from(entries);
        let record = commitment(election_a, "4");
        rebuilt.put_if_absent(record.key(), record.into()).unwrap();
        let fourth = rebuilt
            .get_commitment(election_a, &"4".into())
            .unwrap()
            .unwrap();
        assert_eq!(fourth.sequence, 4);
    }

    #[test]
    fn test_concurrent_put_if_absent() {
        let store = Arc::new(MemStore::default());
        let election_id = ElectionId::generate();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let record = commitment(election_id, "contested");
                    store.put_if_absent(record.key(), record.into()).unwrap()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(store.len(), 1);
    }
}
