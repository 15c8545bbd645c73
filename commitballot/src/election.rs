use crate::*;
use indexmap::IndexSet;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// Election identifier
///
/// 15 random bytes, rendered as hex. It forms the first 15 bytes of every `LedgerKey` for the
/// election, so all of an election's records sort together.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElectionId([u8; 15]);

impl ElectionId {
    /// Create a new random election identifier
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        ElectionId(csprng.gen())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 15] = bytes.try_into().map_err(|_| Error::IdentifierBadLen)?;
        Ok(ElectionId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 15] {
        &self.0
    }
}

impl FromStr for ElectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::IdentifierBadHex)?;
        ElectionId::from_bytes(&bytes)
    }
}

impl std::fmt::Display for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ElectionId({})", hex::encode(self.0))
    }
}

impl Serialize for ElectionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ElectionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ElectionId::from_str(&s).map_err(de::Error::custom)
    }
}

/// Election phase
///
/// Phases only ever move forward: `Committing -> Revealing -> Closed`.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Committing,
    Revealing,
    Closed,
}

impl Phase {
    /// The phase a transition into `self` must start from
    pub fn predecessor(self) -> Option<Phase> {
        match self {
            Phase::Committing => None,
            Phase::Revealing => Some(Phase::Committing),
            Phase::Closed => Some(Phase::Revealing),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Phase::Committing => "committing",
            Phase::Revealing => "revealing",
            Phase::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Check an option list, returning it as an ordered set
pub fn validate_options(
    options: Vec<String>,
    min_options: usize,
) -> Result<IndexSet<String>, VoteError> {
    if options.is_empty() {
        return Err(VoteError::InvalidOptions("no options given".to_owned()));
    }

    let mut set = IndexSet::with_capacity(options.len());
    for option in options {
        if set.contains(&option) {
            return Err(VoteError::InvalidOptions(format!(
                "duplicate option {:?}",
                option
            )));
        }
        set.insert(option);
    }

    if set.len() < min_options {
        return Err(VoteError::InvalidOptions(format!(
            "need at least {} options, got {}",
            min_options,
            set.len()
        )));
    }

    Ok(set)
}

struct Gate {
    phase: Phase,
    final_tally: Option<Tally>,
}

/// A held phase
///
/// While a `PhaseGuard` is alive the election cannot change phase, so everything done under
/// it happens entirely within that phase.
pub struct PhaseGuard<'a> {
    gate: RwLockReadGuard<'a, Gate>,
}

impl<'a> PhaseGuard<'a> {
    pub fn phase(&self) -> Phase {
        self.gate.phase
    }
}

/// A single election and its state machine
pub struct Election {
    id: ElectionId,
    options: IndexSet<String>,
    gate: RwLock<Gate>,
    tally: TallyEngine,
    commitments: AtomicU64,
}

impl Election {
    fn new(id: ElectionId, options: IndexSet<String>) -> Self {
        let tally = TallyEngine::new(options.iter().cloned());
        Election {
            id,
            options,
            gate: RwLock::new(Gate {
                phase: Phase::Committing,
                final_tally: None,
            }),
            tally,
            commitments: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    pub fn options(&self) -> &IndexSet<String> {
        &self.options
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.contains(option)
    }

    pub fn phase(&self) -> Phase {
        self.read_gate().phase
    }

    /// Hold the election in `expected` for the duration of an operation
    ///
    /// Fails with `WrongPhase` if the election is in any other phase.
    pub fn enter(&self, expected: Phase) -> Result<PhaseGuard<'_>, VoteError> {
        let gate = self.read_gate();
        if gate.phase != expected {
            return Err(VoteError::WrongPhase {
                expected,
                actual: gate.phase,
            });
        }
        Ok(PhaseGuard { gate })
    }

    /// Move the election into phase `to`
    ///
    /// Waits for every operation holding a `PhaseGuard` to finish. Entering `Closed` freezes
    /// the tally.
    pub(crate) fn advance(&self, to: Phase) -> Result<(), VoteError> {
        let mut gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        if to.predecessor() != Some(gate.phase) {
            return Err(VoteError::InvalidTransition {
                from: gate.phase,
                to,
            });
        }

        if to == Phase::Closed {
            gate.final_tally = Some(self.tally.snapshot());
        }
        gate.phase = to;

        info!("election {} entered the {} phase", self.id, to);
        Ok(())
    }

    /// Current tally
    ///
    /// Once the election is closed this is always the frozen final tally.
    pub fn snapshot(&self) -> Tally {
        let gate = self.read_gate();
        match &gate.final_tally {
            Some(tally) => tally.clone(),
            None => self.tally.snapshot(),
        }
    }

    /// Final tally, if the election is closed
    pub fn final_tally(&self) -> Option<Tally> {
        self.read_gate().final_tally.clone()
    }

    pub(crate) fn tally(&self) -> &TallyEngine {
        &self.tally
    }

    /// Number of commitments accepted so far
    pub fn commitment_count(&self) -> u64 {
        self.commitments.load(Ordering::SeqCst)
    }

    pub(crate) fn record_committed(&self) {
        self.commitments.fetch_add(1, Ordering::SeqCst);
    }

    pub fn summary(&self) -> ElectionSummary {
        ElectionSummary {
            id: self.id,
            options: self.options.iter().cloned().collect(),
            phase: self.phase(),
        }
    }

    fn read_gate(&self) -> RwLockReadGuard<'_, Gate> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Public description of an election
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub options: Vec<String>,
    pub phase: Phase,
}

/// Owns every election for its whole lifecycle
pub struct ElectionRegistry {
    elections: RwLock<BTreeMap<ElectionId, Arc<Election>>>,
    min_options: usize,
}

impl Default for ElectionRegistry {
    fn default() -> Self {
        ElectionRegistry::new(Config::default().min_options)
    }
}

impl ElectionRegistry {
    pub fn new(min_options: usize) -> Self {
        ElectionRegistry {
            elections: RwLock::new(BTreeMap::new()),
            min_options: min_options.max(1),
        }
    }

    /// Create a new election in the commit phase
    pub fn create_election<I, S>(&self, options: I) -> Result<ElectionId, VoteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        let options = validate_options(options, self.min_options)?;

        let mut elections = self.elections.write().unwrap_or_else(PoisonError::into_inner);
        let mut id = ElectionId::generate();
        while elections.contains_key(&id) {
            id = ElectionId::generate();
        }
        elections.insert(id, Arc::new(Election::new(id, options)));

        info!("created election {}", id);
        Ok(id)
    }

    /// Get an election
    pub fn get(&self, id: ElectionId) -> Result<Arc<Election>, VoteError> {
        let elections = self.elections.read().unwrap_or_else(PoisonError::into_inner);
        elections.get(&id).cloned().ok_or(VoteError::NotFound(id))
    }

    pub fn advance_to_reveal(&self, id: ElectionId) -> Result<(), VoteError> {
        self.get(id)?.advance(Phase::Revealing)
    }

    pub fn close(&self, id: ElectionId) -> Result<(), VoteError> {
        self.get(id)?.advance(Phase::Closed)
    }

    pub fn phase(&self, id: ElectionId) -> Result<Phase, VoteError> {
        Ok(self.get(id)?.phase())
    }

    pub fn options(&self, id: ElectionId) -> Result<Vec<String>, VoteError> {
        Ok(self.get(id)?.options().iter().cloned().collect())
    }

    /// All known elections, in identifier order
    pub fn elections(&self) -> Vec<ElectionId> {
        let elections = self.elections.read().unwrap_or_else(PoisonError::into_inner);
        elections.keys().copied().collect()
    }
}
