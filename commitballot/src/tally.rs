use crate::*;
use indexmap::IndexMap;
use std::sync::{PoisonError, RwLock};

/// Per-option count of verified reveals, in option order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Tally(IndexMap<String, u64>);

impl Tally {
    /// A tally with every option at zero
    pub fn zeroed<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tally(options.into_iter().map(|o| (o.into(), 0)).collect())
    }

    /// Recompute a tally from reveal records
    ///
    /// Reveals for choices outside `options` are not counted.
    pub fn from_reveals<'a, I, S, R>(options: I, reveals: R) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = &'a RevealRecord>,
    {
        let mut tally = Tally::zeroed(options);
        for reveal in reveals {
            tally.add(&reveal.choice);
        }
        tally
    }

    fn add(&mut self, option: &str) -> bool {
        match self.0.get_mut(option) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, option: &str) -> Option<u64> {
        self.0.get(option).copied()
    }

    /// Number of reveals counted
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(option, count)| (option.as_str(), *count))
    }

    /// Options with the highest count, in option order
    ///
    /// Empty while nothing has been counted.
    pub fn leaders(&self) -> Vec<&str> {
        let max = match self.0.values().max() {
            Some(max) if *max > 0 => *max,
            _ => return vec![],
        };
        self.iter()
            .filter(|(_, count)| *count == max)
            .map(|(option, _)| option)
            .collect()
    }

    pub fn as_map(&self) -> &IndexMap<String, u64> {
        &self.0
    }
}

/// Running tally for one election
///
/// A cache over the election's reveal records. It does not deduplicate: the ballot store
/// only calls `increment` once per accepted reveal.
pub struct TallyEngine {
    counts: RwLock<Tally>,
}

impl TallyEngine {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TallyEngine {
            counts: RwLock::new(Tally::zeroed(options)),
        }
    }

    /// Count one reveal for `option`
    ///
    /// Returns false, counting nothing, if `option` is not part of the tally.
    pub fn increment(&self, option: &str) -> bool {
        let mut counts = self.counts.write().unwrap_or_else(PoisonError::into_inner);
        counts.add(option)
    }

    /// Point-in-time copy of the counts
    pub fn snapshot(&self) -> Tally {
        self.counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
