use crate::*;

use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("commitballot: invalid identifier - invalid hexidecimal")]
    IdentifierBadHex,

    #[error("commitballot: invalid identifier - wrong length")]
    IdentifierBadLen,

    #[error("commitballot: invalid identifier - unknown record type {0}")]
    IdentifierBadRecordType(u8),

    #[error("commitballot: invalid digest - invalid hexidecimal")]
    DigestBadHex,

    #[error("commitballot: invalid digest - wrong length")]
    DigestBadLen,

    #[error("commitballot: CBOR error: {0}")]
    CBORError(#[from] serde_cbor::Error),

    #[error("commitballot: JSON error: {0}")]
    JSONError(#[from] serde_json::Error),

    #[error("commitballot: error deserializing transcript: unknown format")]
    DeserializationUnknownFormat,

    #[error("commitballot: invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Protocol errors returned by the voter-facing operations.
///
/// Every variant is scoped to a single operation by a single caller. None of them leave a
/// partial record behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("commitballot: election {0} not found")]
    NotFound(ElectionId),

    #[error("commitballot: invalid election options: {0}")]
    InvalidOptions(String),

    #[error("commitballot: election cannot move from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("commitballot: operation requires the {expected} phase, election is {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("commitballot: voter has already committed in this election")]
    DuplicateVote,

    #[error("commitballot: voter has no commitment in this election")]
    NoCommitment,

    #[error("commitballot: voter has already revealed in this election")]
    AlreadyRevealed,

    #[error("commitballot: choice is not an option in this election")]
    InvalidOption,

    // Covers both a wrong choice and a wrong secret.
    #[error("commitballot: revealed choice and secret do not match the commitment")]
    CommitmentMismatch,

    #[error("commitballot: ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Failures reported by a ledger implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("commitballot ledger: unavailable: {0}")]
    Unavailable(String),

    #[error("commitballot ledger: record under {key} is a {found} record, expected {expected}")]
    MismatchedRecordType {
        key: LedgerKey,
        found: RecordType,
        expected: RecordType,
    },
}

/// Transcript audit errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("commitballot audit: election options are invalid")]
    InvalidOptions,

    #[error("commitballot audit: entry {0} belongs to another election")]
    ForeignEntry(LedgerKey),

    #[error("commitballot audit: entry {0} does not match its key")]
    MisfiledEntry(LedgerKey),

    #[error("commitballot audit: entry {0} appears more than once")]
    DuplicateEntry(LedgerKey),

    #[error("commitballot audit: sequence number {0} is used more than once")]
    DuplicateSequence(u64),

    #[error("commitballot audit: voter {0} revealed without a commitment")]
    RevealWithoutCommitment(VoterId),

    #[error("commitballot audit: voter {0} revealed before committing")]
    RevealBeforeCommitment(VoterId),

    #[error("commitballot audit: voter {0} revealed a choice outside the election options")]
    InvalidOption(VoterId),

    #[error("commitballot audit: voter {0} revealed a choice that does not match the commitment")]
    CommitmentMismatch(VoterId),

    #[error("commitballot audit: recorded final tally does not match the recomputed tally")]
    TallyMismatch,

    #[error("commitballot audit: election is closed but carries no final tally")]
    MissingFinalTally,

    #[error("commitballot audit: election is not closed but carries a final tally")]
    PrematureFinalTally,

    #[error("commitballot audit: election is still in the commit phase but has reveals")]
    PrematureReveal,
}
