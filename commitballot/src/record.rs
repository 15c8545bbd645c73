use crate::*;
use digest::Digest as Hasher;
use num_enum::TryFromPrimitive;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::ops::Deref;
use std::str::FromStr;

/// Opaque voter identity, authenticated upstream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        VoterId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VoterId {
    fn from(id: &str) -> Self {
        VoterId(id.to_owned())
    }
}

impl From<String> for VoterId {
    fn from(id: String) -> Self {
        VoterId(id)
    }
}

impl std::fmt::Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record 1: a voter's commitment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommitmentRecord {
    pub election_id: ElectionId,
    pub voter_id: VoterId,
    pub digest: Digest,
}

impl CommitmentRecord {
    pub fn key(&self) -> LedgerKey {
        LedgerKey::new(self.election_id, RecordType::Commitment, &self.voter_id)
    }
}

/// Record 2: a voter's disclosed choice and secret
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RevealRecord {
    pub election_id: ElectionId,
    pub voter_id: VoterId,
    pub choice: String,
    pub secret: String,
}

impl RevealRecord {
    pub fn key(&self) -> LedgerKey {
        LedgerKey::new(self.election_id, RecordType::Reveal, &self.voter_id)
    }

    /// Recompute the commitment this reveal opens
    pub fn digest(&self) -> Digest {
        commit(&self.choice, &self.secret)
    }
}

/// Any record that can be appended to the ledger
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum LedgerRecord {
    Commitment(CommitmentRecord),
    Reveal(RevealRecord),
}

impl LedgerRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            LedgerRecord::Commitment(_) => RecordType::Commitment,
            LedgerRecord::Reveal(_) => RecordType::Reveal,
        }
    }

    pub fn key(&self) -> LedgerKey {
        match self {
            LedgerRecord::Commitment(record) => record.key(),
            LedgerRecord::Reveal(record) => record.key(),
        }
    }

    pub fn election_id(&self) -> ElectionId {
        match self {
            LedgerRecord::Commitment(record) => record.election_id,
            LedgerRecord::Reveal(record) => record.election_id,
        }
    }

    pub fn voter_id(&self) -> &VoterId {
        match self {
            LedgerRecord::Commitment(record) => &record.voter_id,
            LedgerRecord::Reveal(record) => &record.voter_id,
        }
    }
}

impl From<CommitmentRecord> for LedgerRecord {
    fn from(record: CommitmentRecord) -> Self {
        LedgerRecord::Commitment(record)
    }
}

impl From<RevealRecord> for LedgerRecord {
    fn from(record: RevealRecord) -> Self {
        LedgerRecord::Reveal(record)
    }
}

/// A record as stored by the ledger, with its key and append sequence number
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Recorded<T> {
    pub key: LedgerKey,
    pub sequence: u64,
    pub record: T,
}

pub type LedgerEntry = Recorded<LedgerRecord>;

impl<T> Recorded<T> {
    /// Get the inner record
    pub fn inner(&self) -> &T {
        &self.record
    }
}

impl Recorded<CommitmentRecord> {
    /// Ledger position of the commitment, for audit only
    pub fn committed_at(&self) -> u64 {
        self.sequence
    }
}

impl<T> Deref for Recorded<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl TryFrom<LedgerEntry> for Recorded<CommitmentRecord> {
    type Error = LedgerError;

    fn try_from(entry: LedgerEntry) -> Result<Self, Self::Error> {
        match entry.record {
            LedgerRecord::Commitment(record) => Ok(Recorded {
                key: entry.key,
                sequence: entry.sequence,
                record,
            }),
            other => Err(LedgerError::MismatchedRecordType {
                key: entry.key,
                found: other.record_type(),
                expected: RecordType::Commitment,
            }),
        }
    }
}

impl TryFrom<LedgerEntry> for Recorded<RevealRecord> {
    type Error = LedgerError;

    fn try_from(entry: LedgerEntry) -> Result<Self, Self::Error> {
        match entry.record {
            LedgerRecord::Reveal(record) => Ok(Recorded {
                key: entry.key,
                sequence: entry.sequence,
                record,
            }),
            other => Err(LedgerError::MismatchedRecordType {
                key: entry.key,
                found: other.record_type(),
                expected: RecordType::Reveal,
            }),
        }
    }
}

/// Ledger key
///
/// Fixed-width, 32 bytes: the election, the record type, and the first 16 bytes of the
/// SHA-512 hash of the voter id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    pub election_id: ElectionId,
    pub record_type: RecordType,
    pub voter_key: [u8; 16],
}

impl LedgerKey {
    pub fn new(election_id: ElectionId, record_type: RecordType, voter_id: &VoterId) -> Self {
        let hash = sha2::Sha512::digest(voter_id.as_str().as_bytes());
        let mut voter_key = [0u8; 16];
        voter_key.copy_from_slice(&hash[0..16]);
        LedgerKey {
            election_id,
            record_type,
            voter_key,
        }
    }

    /// Smallest key belonging to an election
    pub fn first(election_id: ElectionId) -> Self {
        LedgerKey {
            election_id,
            record_type: RecordType::Commitment,
            voter_key: [0; 16],
        }
    }

    /// Largest key belonging to an election
    pub fn last(election_id: ElectionId) -> Self {
        LedgerKey {
            election_id,
            record_type: RecordType::Reveal,
            voter_key: [0xff; 16],
        }
    }

    pub fn to_array(&self) -> [u8; 32] {
        let mut bytes: [u8; 32] = [0; 32];
        bytes[0..15].clone_from_slice(self.election_id.as_bytes());
        bytes[15] = self.record_type as u8;
        bytes[16..32].clone_from_slice(&self.voter_key);
        bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_array().to_vec()
    }
}

impl FromStr for LedgerKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::IdentifierBadHex)?;
        if bytes.len() != 32 {
            return Err(Error::IdentifierBadLen);
        }

        let election_id = ElectionId::from_bytes(&bytes[0..15])?;
        let record_type = RecordType::try_from_primitive(bytes[15])
            .map_err(|_| Error::IdentifierBadRecordType(bytes[15]))?;
        let mut voter_key = [0u8; 16];
        voter_key.copy_from_slice(&bytes[16..32]);

        Ok(LedgerKey {
            election_id,
            record_type,
            voter_key,
        })
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for LedgerKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LedgerKey::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for LedgerKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<LedgerKey> for [u8; 32] {
    fn from(item: LedgerKey) -> Self {
        item.to_array()
    }
}

/// A record type
#[derive(
    Serialize,
    Deserialize,
    TryFromPrimitive,
    Copy,
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RecordType {
    Commitment = 1,
    Reveal = 2,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            RecordType::Commitment => "commitment",
            RecordType::Reveal => "reveal",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_ledger_key() {
        assert!(RecordType::Commitment as u8 == 1);
        assert!(RecordType::Reveal as u8 == 2);

        let election_id = ElectionId::generate();
        let voter = VoterId::from("voter-1");

        let key = LedgerKey::new(election_id, RecordType::Reveal, &voter);
        let key_bytes = key.to_bytes();
        assert_eq!(key_bytes.len(), 32);
        assert_eq!(key_bytes[15], 2);
        assert_eq!(&key_bytes[0..15], election_id.as_bytes());

        let stringed = key.to_string();
        let from_string = LedgerKey::from_str(&stringed).unwrap();
        assert_eq!(key, from_string);

        // Same voter, same key. Different voter, different key.
        assert_eq!(key, LedgerKey::new(election_id, RecordType::Reveal, &voter));
        assert_ne!(
            key,
            LedgerKey::new(election_id, RecordType::Reveal, &VoterId::from("voter-2"))
        );

        assert!(LedgerKey::first(election_id) <= key);
        assert!(key <= LedgerKey::last(election_id));
    }

    #[test]
    fn test_bad_ledger_key() {
        assert!(matches!(
            LedgerKey::from_str("not hex"),
            Err(Error::IdentifierBadHex)
        ));
        assert!(matches!(
            LedgerKey::from_str("abcd"),
            Err(Error::IdentifierBadLen)
        ));

        let mut bytes = LedgerKey::first(ElectionId::generate()).to_array();
        bytes[15] = 9;
        assert!(matches!(
            LedgerKey::from_str(&hex::encode(bytes)),
            Err(Error::IdentifierBadRecordType(9))
        ));
    }

    #[test]
    fn test_record_conversion() {
        let election_id = ElectionId::generate();
        let record = CommitmentRecord {
            election_id,
            voter_id: "alice".into(),
            digest: commit("A", "salt"),
        };
        let entry = LedgerEntry {
            key: record.key(),
            sequence: 7,
            record: record.clone().into(),
        };
        assert_eq!(entry.record_type(), RecordType::Commitment);
        assert_eq!(entry.voter_id().as_str(), "alice");

        let commitment = Recorded::<CommitmentRecord>::try_from(entry.clone()).unwrap();
        assert_eq!(commitment.committed_at(), 7);
        assert_eq!(commitment.digest, record.digest);

        let err = Recorded::<RevealRecord>::try_from(entry).unwrap_err();
        assert_eq!(
            err,
            LedgerError::MismatchedRecordType {
                key: record.key(),
                found: RecordType::Commitment,
                expected: RecordType::Reveal,
            }
        );

        let json = serde_json::to_value(&LedgerRecord::from(record)).unwrap();
        assert_eq!(json["type"], "commitment");
        assert_eq!(json["voter_id"], "alice");
    }
}
