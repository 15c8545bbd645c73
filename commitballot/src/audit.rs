use crate::*;
use content_inspector::ContentType;
use std::collections::{BTreeMap, HashSet};

/// Everything needed to check an election independently of the system that ran it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionTranscript {
    pub election: ElectionSummary,

    /// Ledger entries, in sequence order
    pub entries: Vec<LedgerEntry>,

    /// Recorded result, present once the election is closed
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_tally: Option<Tally>,
}

impl ElectionTranscript {
    /// Pack into CBOR bytes
    pub fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Unpack from either JSON or CBOR bytes
    ///
    /// A CBOR transcript opens with a map header, which is never valid UTF-8 even when the body
    /// holds no null bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes = bytes.strip_prefix(&[0xef, 0xbb, 0xbf][..]).unwrap_or(bytes);
        match content_inspector::inspect(bytes) {
            ContentType::UTF_8 if std::str::from_utf8(bytes).is_ok() => {
                Ok(serde_json::from_slice(bytes)?)
            }
            ContentType::UTF_8 | ContentType::BINARY => Ok(serde_cbor::from_slice(bytes)?),
            _ => Err(Error::DeserializationUnknownFormat),
        }
    }
}

/// Result of a successful audit
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub election_id: ElectionId,
    pub commitments: usize,
    pub reveals: usize,

    /// Commitments that were never revealed. They are not part of the tally.
    pub unrevealed: usize,

    /// Tally recomputed from the reveals
    pub tally: Tally,
}

/// Re-verify a transcript from scratch
///
/// Every reveal must open an earlier commitment from the same voter to one of the election's
/// options. The tally is rebuilt from the reveals and, if the transcript carries a final tally,
/// compared against it.
pub fn audit(transcript: &ElectionTranscript) -> Result<AuditReport, AuditError> {
    let election = &transcript.election;
    let options =
        validate_options(election.options.clone(), 1).map_err(|_| AuditError::InvalidOptions)?;

    let mut keys = HashSet::new();
    let mut sequences = HashSet::new();
    let mut commitments: BTreeMap<&VoterId, (u64, Digest)> = BTreeMap::new();
    let mut reveals: Vec<(u64, &RevealRecord)> = Vec::new();

    for entry in &transcript.entries {
        if entry.key.election_id != election.id || entry.election_id() != election.id {
            return Err(AuditError::ForeignEntry(entry.key));
        }
        if entry.key != entry.record.key() {
            return Err(AuditError::MisfiledEntry(entry.key));
        }
        if !keys.insert(entry.key) {
            return Err(AuditError::DuplicateEntry(entry.key));
        }
        if !sequences.insert(entry.sequence) {
            return Err(AuditError::DuplicateSequence(entry.sequence));
        }

        match &entry.record {
            LedgerRecord::Commitment(record) => {
                commitments.insert(&record.voter_id, (entry.sequence, record.digest));
            }
            LedgerRecord::Reveal(record) => reveals.push((entry.sequence, record)),
        }
    }

    if election.phase == Phase::Committing && !reveals.is_empty() {
        return Err(AuditError::PrematureReveal);
    }

    for (sequence, reveal) in &reveals {
        let voter = &reveal.voter_id;
        let (committed_at, digest) = commitments
            .get(voter)
            .ok_or_else(|| AuditError::RevealWithoutCommitment(voter.clone()))?;

        if committed_at > sequence {
            return Err(AuditError::RevealBeforeCommitment(voter.clone()));
        }
        if !options.contains(&reveal.choice) {
            return Err(AuditError::InvalidOption(voter.clone()));
        }
        if !verify(digest, &reveal.choice, &reveal.secret) {
            return Err(AuditError::CommitmentMismatch(voter.clone()));
        }
    }

    let tally = Tally::from_reveals(options.iter().cloned(), reveals.iter().map(|(_, r)| *r));
    match (&transcript.final_tally, election.phase) {
        (Some(final_tally), Phase::Closed) => {
            if *final_tally != tally {
                return Err(AuditError::TallyMismatch);
            }
        }
        (None, Phase::Closed) => return Err(AuditError::MissingFinalTally),
        (Some(_), _) => return Err(AuditError::PrematureFinalTally),
        (None, _) => {}
    }

    Ok(AuditReport {
        election_id: election.id,
        commitments: commitments.len(),
        reveals: reveals.len(),
        unrevealed: commitments.len() - reveals.len(),
        tally,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Closed election: alice and bob reveal, carol never does
    fn closed_election() -> ElectionTranscript {
        let protocol = Protocol::new(MemStore::default());
        let id = protocol.create_election(vec!["A", "B"]).unwrap();

        protocol.commit(id, &"alice".into(), "A", "s1").unwrap();
        protocol.commit(id, &"bob".into(), "B", "s2").unwrap();
        protocol.commit(id, &"carol".into(), "B", "s3").unwrap();
        protocol.advance_to_reveal(id).unwrap();
        protocol.reveal(id, &"alice".into(), "A", "s1").unwrap();
        protocol.reveal(id, &"bob".into(), "B", "s2").unwrap();
        protocol.close(id).unwrap();

        protocol.transcript(id).unwrap()
    }

    fn reveal_mut<'a>(
        transcript: &'a mut ElectionTranscript,
        voter: &str,
    ) -> &'a mut RevealRecord {
        transcript
            .entries
            .iter_mut()
            .find_map(|entry| match &mut entry.record {
                LedgerRecord::Reveal(r) if r.voter_id.as_str() == voter => Some(r),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_audit_ok() {
        let transcript = closed_election();
        let report = audit(&transcript).unwrap();

        assert_eq!(report.election_id, transcript.election.id);
        assert_eq!(report.commitments, 3);
        assert_eq!(report.reveals, 2);
        assert_eq!(report.unrevealed, 1);
        assert_eq!(report.tally.get("A"), Some(1));
        assert_eq!(report.tally.get("B"), Some(1));
        assert_eq!(Some(report.tally), transcript.final_tally);
    }

    #[test]
    fn test_audit_tampered_reveal() {
        let mut transcript = closed_election();
        reveal_mut(&mut transcript, "alice").choice = "B".to_owned();
        assert_eq!(
            audit(&transcript),
            Err(AuditError::CommitmentMismatch("alice".into()))
        );

        let mut transcript = closed_election();
        reveal_mut(&mut transcript, "bob").choice = "Z".to_owned();
        assert_eq!(
            audit(&transcript),
            Err(AuditError::InvalidOption("bob".into()))
        );
    }

    #[test]
    fn test_audit_tampered_tally() {
        let mut transcript = closed_election();
        transcript.final_tally = Some(Tally::zeroed(vec!["A", "B"]));
        assert_eq!(audit(&transcript), Err(AuditError::TallyMismatch));

        // A closed election always carries its frozen tally
        let mut transcript = closed_election();
        transcript.final_tally = None;
        assert_eq!(audit(&transcript), Err(AuditError::MissingFinalTally));

        // and an open one never does
        let mut transcript = closed_election();
        transcript.election.phase = Phase::Revealing;
        assert_eq!(audit(&transcript), Err(AuditError::PrematureFinalTally));

        let mut transcript = closed_election();
        transcript.election.phase = Phase::Revealing;
        transcript.final_tally = None;
        assert_eq!(audit(&transcript).unwrap().reveals, 2);
    }

    #[test]
    fn test_audit_structure() {
        // Missing commitment
        let mut transcript = closed_election();
        transcript.entries.retain(|entry| {
            !(entry.record_type() == RecordType::Commitment && entry.voter_id().as_str() == "bob")
        });
        assert_eq!(
            audit(&transcript),
            Err(AuditError::RevealWithoutCommitment("bob".into()))
        );

        // Reveal ordered before its commitment
        let mut transcript = closed_election();
        let last = transcript.entries.iter().map(|e| e.sequence).max().unwrap();
        for entry in transcript.entries.iter_mut() {
            if entry.record_type() == RecordType::Commitment && entry.voter_id().as_str() == "bob"
            {
                entry.sequence = last + 1;
            }
        }
        assert_eq!(
            audit(&transcript),
            Err(AuditError::RevealBeforeCommitment("bob".into()))
        );

        // Duplicated entry
        let mut transcript = closed_election();
        let copy = transcript.entries[0].clone();
        transcript.entries.push(copy.clone());
        assert_eq!(audit(&transcript), Err(AuditError::DuplicateEntry(copy.key)));

        // Entry filed under the wrong key
        let mut transcript = closed_election();
        let other_key = transcript.entries[1].key;
        transcript.entries[0].key = other_key;
        assert_eq!(
            audit(&transcript),
            Err(AuditError::MisfiledEntry(other_key))
        );

        // Entry from another election
        let mut transcript = closed_election();
        let foreign = closed_election().entries[0].clone();
        transcript.entries.push(foreign.clone());
        assert_eq!(
            audit(&transcript),
            Err(AuditError::ForeignEntry(foreign.key))
        );
    }

    #[test]
    fn test_audit_premature_reveal() {
        let mut transcript = closed_election();
        transcript.election.phase = Phase::Committing;
        transcript.final_tally = None;
        assert_eq!(audit(&transcript), Err(AuditError::PrematureReveal));
    }

    #[test]
    fn test_transcript_formats() {
        let transcript = closed_election();

        let json = transcript.to_json().unwrap();
        let from_json = ElectionTranscript::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(from_json, transcript);

        let cbor = transcript.as_bytes().unwrap();
        let from_cbor = ElectionTranscript::from_bytes(&cbor).unwrap();
        assert_eq!(from_cbor, transcript);

        assert!(matches!(
            ElectionTranscript::from_bytes(b"{\"election\": 1}"),
            Err(Error::JSONError(_))
        ));

        // Text that is not a transcript is reported as bad JSON, not bad CBOR
        assert!(matches!(
            ElectionTranscript::from_bytes(b"not a transcript"),
            Err(Error::JSONError(_))
        ));

        // Leading byte order mark is ignored
        let mut with_bom = vec![0xef, 0xbb, 0xbf];
        with_bom.extend_from_slice(json.as_bytes());
        assert_eq!(ElectionTranscript::from_bytes(&with_bom).unwrap(), transcript);

        // UTF-16 is neither format
        assert!(matches!(
            ElectionTranscript::from_bytes(&[0xff, 0xfe, b'{', 0x00]),
            Err(Error::DeserializationUnknownFormat)
        ));
    }
}
