use crate::*;

/// Commitment and reveal records, kept in a ledger
///
/// Every write happens while the election's phase is held, so a phase transition can never
/// split a check from its insert.
pub struct BallotStore<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> BallotStore<L> {
    pub fn new(ledger: L) -> Self {
        BallotStore { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Record a voter's commitment
    ///
    /// Fails with `WrongPhase` outside the commit phase and with `DuplicateVote` if the voter
    /// already committed, whatever the digest.
    pub fn record_commitment(
        &self,
        election: &Election,
        voter_id: &VoterId,
        digest: Digest,
    ) -> Result<(), VoteError> {
        let _phase = election.enter(Phase::Committing)?;

        let record = CommitmentRecord {
            election_id: election.id(),
            voter_id: voter_id.clone(),
            digest,
        };
        if !self.ledger.put_if_absent(record.key(), record.into())? {
            return Err(VoteError::DuplicateVote);
        }
        election.record_committed();

        debug!("election {}: commitment from {}", election.id(), voter_id);
        Ok(())
    }

    /// Record a voter's reveal and count it
    ///
    /// Checks, in order: the reveal phase, an existing commitment, no earlier reveal, a valid
    /// option, and that (choice, secret) opens the stored digest.
    pub fn record_reveal(
        &self,
        election: &Election,
        voter_id: &VoterId,
        choice: &str,
        secret: &str,
    ) -> Result<(), VoteError> {
        let _phase = election.enter(Phase::Revealing)?;
        let election_id = election.id();

        let commitment = self
            .ledger
            .get_commitment(election_id, voter_id)?
            .ok_or(VoteError::NoCommitment)?;

        if self.ledger.get_reveal(election_id, voter_id)?.is_some() {
            return Err(VoteError::AlreadyRevealed);
        }

        if !election.has_option(choice) {
            return Err(VoteError::InvalidOption);
        }

        if !verify(&commitment.digest, choice, secret) {
            warn!("election {}: reveal from {} does not match", election_id, voter_id);
            return Err(VoteError::CommitmentMismatch);
        }

        let record = RevealRecord {
            election_id,
            voter_id: voter_id.clone(),
            choice: choice.to_owned(),
            secret: secret.to_owned(),
        };
        // Lost a race with a concurrent reveal from the same voter
        if !self.ledger.put_if_absent(record.key(), record.into())? {
            return Err(VoteError::AlreadyRevealed);
        }
        election.tally().increment(choice);

        debug!("election {}: reveal from {}", election_id, voter_id);
        Ok(())
    }

    /// Number of commitments in an election
    ///
    /// Only ever an aggregate: nothing about a commitment's choice is known before it is
    /// revealed.
    pub fn commitment_count(&self, election: &Election) -> u64 {
        election.commitment_count()
    }

    /// Number of verified reveals for `option`
    ///
    /// `None` during the commit phase, when no breakdown may be reported.
    pub fn revealed_count(
        &self,
        election: &Election,
        option: &str,
    ) -> Result<Option<u64>, VoteError> {
        if !election.has_option(option) {
            return Err(VoteError::InvalidOption);
        }
        if election.phase() == Phase::Committing {
            return Ok(None);
        }
        Ok(election.snapshot().get(option))
    }
}
