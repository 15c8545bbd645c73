use crate::*;

/// The voter-facing protocol
///
/// Ties the election registry, ballot store and commitment scheme together. Every method is
/// safe to call concurrently from many voters, and errors from the components underneath
/// are returned unchanged.
pub struct Protocol<L: Ledger> {
    config: Config,
    registry: ElectionRegistry,
    ballots: BallotStore<L>,
}

impl<L: Ledger> Protocol<L> {
    pub fn new(ledger: L) -> Self {
        Protocol::with_config(ledger, Config::default())
    }

    pub fn with_config(ledger: L, config: Config) -> Self {
        Protocol {
            registry: ElectionRegistry::new(config.min_options),
            ballots: BallotStore::new(ledger),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ElectionRegistry {
        &self.registry
    }

    pub fn ballots(&self) -> &BallotStore<L> {
        &self.ballots
    }

    pub fn create_election<I, S>(&self, options: I) -> Result<ElectionId, VoteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.create_election(options)
    }

    pub fn advance_to_reveal(&self, election_id: ElectionId) -> Result<(), VoteError> {
        self.registry.advance_to_reveal(election_id)
    }

    pub fn close(&self, election_id: ElectionId) -> Result<(), VoteError> {
        self.registry.close(election_id)
    }

    pub fn phase(&self, election_id: ElectionId) -> Result<Phase, VoteError> {
        self.registry.phase(election_id)
    }

    pub fn options(&self, election_id: ElectionId) -> Result<Vec<String>, VoteError> {
        self.registry.options(election_id)
    }

    /// A fresh secret of the configured size, for a voter to commit with
    pub fn generate_secret(&self) -> Secret {
        let mut csprng = rand::rngs::OsRng {};
        generate_secret_with(&mut csprng, self.config.secret_bytes)
    }

    /// Commit to `choice`
    ///
    /// Returns the digest, which the voter keeps alongside the secret until the reveal phase.
    pub fn commit(
        &self,
        election_id: ElectionId,
        voter_id: &VoterId,
        choice: &str,
        secret: &str,
    ) -> Result<Digest, VoteError> {
        let election = self.registry.get(election_id)?;
        let digest = commit(choice, secret);
        self.ballots.record_commitment(&election, voter_id, digest)?;
        Ok(digest)
    }

    /// Reveal a committed choice, counting it if it opens the commitment
    pub fn reveal(
        &self,
        election_id: ElectionId,
        voter_id: &VoterId,
        choice: &str,
        secret: &str,
    ) -> Result<(), VoteError> {
        let election = self.registry.get(election_id)?;
        self.ballots
            .record_reveal(&election, voter_id, choice, secret)
    }

    /// Current tally; final once the election is closed
    pub fn snapshot(&self, election_id: ElectionId) -> Result<Tally, VoteError> {
        Ok(self.registry.get(election_id)?.snapshot())
    }

    pub fn commitment_count(&self, election_id: ElectionId) -> Result<u64, VoteError> {
        let election = self.registry.get(election_id)?;
        Ok(self.ballots.commitment_count(&election))
    }

    pub fn revealed_count(
        &self,
        election_id: ElectionId,
        option: &str,
    ) -> Result<Option<u64>, VoteError> {
        let election = self.registry.get(election_id)?;
        self.ballots.revealed_count(&election, option)
    }

    /// Export the election and every ledger entry it owns, in ledger order
    pub fn transcript(&self, election_id: ElectionId) -> Result<ElectionTranscript, VoteError> {
        let election = self.registry.get(election_id)?;
        let summary = election.summary();
        let final_tally = election.final_tally();

        let mut entries = self.ballots.ledger().entries(election_id)?;
        entries.sort_by_key(|entry| entry.sequence);

        Ok(ElectionTranscript {
            election: summary,
            entries,
            final_tally,
        })
    }
}
