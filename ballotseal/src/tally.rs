use crate::*;
use indexmap::IndexMap;
use rayon::prelude::*;

/// Whether a ballot made it through decryption
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TallyStatus {
    Processed,
    Failed,
}

/// Per-ballot outcome of a batch tally, as reported to the calling layer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallyResult {
    pub index: usize,
    pub vote_id: Option<String>,
    pub candidate_id: Option<String>,
    pub status: TallyStatus,
    pub receipt_code: Option<String>,
    pub error_reason: Option<String>,
}

/// A ballot that decrypted and passed its integrity checks
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedBallot {
    pub index: usize,
    pub vote_id: Option<String>,
    pub payload: VotePayload,
    pub receipt_code: String,
}

/// A ballot that was rejected
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BallotFailure {
    pub index: usize,
    pub vote_id: Option<String>,
    pub reason: String,
}

/// Report-in-full result of a batch: every submitted ballot lands in exactly one list
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub decrypted: Vec<DecryptedBallot>,
    pub errors: Vec<BallotFailure>,
}

impl BatchOutcome {
    /// Per-ballot results in input order
    pub fn results(&self) -> Vec<TallyResult> {
        let processed = self.decrypted.iter().map(|ballot| TallyResult {
            index: ballot.index,
            vote_id: ballot.vote_id.clone(),
            candidate_id: Some(ballot.payload.candidate_id.clone()),
            status: TallyStatus::Processed,
            receipt_code: Some(ballot.receipt_code.clone()),
            error_reason: None,
        });
        let failed = self.errors.iter().map(|failure| TallyResult {
            index: failure.index,
            vote_id: failure.vote_id.clone(),
            candidate_id: None,
            status: TallyStatus::Failed,
            receipt_code: None,
            error_reason: Some(failure.reason.clone()),
        });

        let mut results: Vec<TallyResult> = processed.chain(failed).collect();
        results.sort_by_key(|r| r.index);
        results
    }

    /// Vote count per candidate, in the order candidates first appear in the batch
    pub fn totals(&self) -> IndexMap<String, usize> {
        let mut totals = IndexMap::new();
        for ballot in &self.decrypted {
            *totals.entry(ballot.payload.candidate_id.clone()).or_insert(0) += 1;
        }
        totals
    }

    pub fn len(&self) -> usize {
        self.decrypted.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decrypt every ballot independently.
///
/// Ballots are processed in parallel with no shared mutable state. A failing ballot is recorded
/// in `errors` and never aborts the batch; both lists come back in input order. Re-running the
/// same batch reproduces the same results.
pub fn batch_decrypt_votes(
    encrypted_votes: &[EncryptedVote],
    private_key: &ElectionPrivateKey,
) -> BatchOutcome {
    let results: Vec<(usize, Result<VotePayload, Error>)> = encrypted_votes
        .par_iter()
        .enumerate()
        .map(|(index, vote)| (index, decrypt_vote(vote, private_key)))
        .collect();

    let mut outcome = BatchOutcome::default();
    for (index, result) in results {
        let vote = &encrypted_votes[index];
        match result {
            Ok(payload) => {
                log::debug!("ballot {} decrypted", describe(index, vote));
                let receipt_code = create_vote_proof(&payload, vote);
                outcome.decrypted.push(DecryptedBallot {
                    index,
                    vote_id: vote.vote_id.clone(),
                    payload,
                    receipt_code,
                });
            }
            Err(e) => {
                log::warn!("ballot {} rejected: {}", describe(index, vote), e);
                outcome.errors.push(BallotFailure {
                    index,
                    vote_id: vote.vote_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "batch tally: {} processed, {} failed",
        outcome.decrypted.len(),
        outcome.errors.len()
    );

    outcome
}

fn describe(index: usize, vote: &EncryptedVote) -> String {
    match &vote.vote_id {
        Some(id) => format!("#{} ({})", index, id),
        None => format!("#{}", index),
    }
}

/// One counting run over an election.
///
/// Owns the reconstructed private key for the duration of the run. `close` (or dropping the
/// session) zeroes the key; a later run must reconstruct it again from custodian shares.
pub struct TallySession {
    election_id: String,
    private_key: ElectionPrivateKey,
}

impl TallySession {
    pub(crate) fn new(election_id: &str, private_key: ElectionPrivateKey) -> Self {
        log::info!(
            "opened tally session for election {} with key {}",
            election_id,
            private_key.fingerprint()
        );
        TallySession {
            election_id: election_id.to_owned(),
            private_key,
        }
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    pub fn public_key(&self) -> &ElectionPublicKey {
        self.private_key.public_key()
    }

    /// Decrypt a batch of ballots. Ballots for other elections are rejected per ballot.
    pub fn decrypt_batch(&self, encrypted_votes: &[EncryptedVote]) -> BatchOutcome {
        let mut outcome = batch_decrypt_votes(encrypted_votes, &self.private_key);

        let election_id = &self.election_id;
        let (ours, foreign): (Vec<DecryptedBallot>, Vec<DecryptedBallot>) = outcome
            .decrypted
            .into_iter()
            .partition(|ballot| &ballot.payload.election_id == election_id);

        outcome.decrypted = ours;
        if !foreign.is_empty() {
            for ballot in foreign {
                log::warn!("ballot #{} belongs to another election", ballot.index);
                outcome.errors.push(BallotFailure {
                    index: ballot.index,
                    vote_id: ballot.vote_id,
                    reason: format!(
                        "ballotseal: ballot is for election {}, not {}",
                        ballot.payload.election_id, election_id
                    ),
                });
            }
            outcome.errors.sort_by_key(|failure| failure.index);
        }

        outcome
    }

    /// End the session, zeroing the private key
    pub fn close(self) {
        log::info!("closed tally session for election {}", self.election_id);
        drop(self.private_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{fixture, other_fixture, payload};

    fn ballots(n: usize) -> Vec<EncryptedVote> {
        let public_key = &fixture().key_pair.public_key;
        (0..n)
            .map(|i| {
                let candidate = format!("C{}", i % 3);
                let mut vote = encrypt_vote(
                    &payload(&format!("V{}", i), &candidate),
                    public_key,
                    SourceChannel::Offline,
                )
                .unwrap();
                vote.vote_id = Some(format!("vote-{}", i));
                vote
            })
            .collect()
    }

    #[test]
    fn one_bad_ballot_does_not_spoil_the_batch() {
        let mut votes = ballots(6);
        votes[3].encrypted_vote_data[0] ^= 0xff;

        let outcome = batch_decrypt_votes(&votes, fixture().private_key());
        assert_eq!(outcome.decrypted.len(), 5);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 3);
        assert_eq!(outcome.errors[0].vote_id.as_deref(), Some("vote-3"));

        let results = outcome.results();
        assert_eq!(results.len(), 6);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            if i == 3 {
                assert_eq!(result.status, TallyStatus::Failed);
                assert!(result.candidate_id.is_none());
                assert!(result.error_reason.is_some());
            } else {
                assert_eq!(result.status, TallyStatus::Processed);
                assert!(is_receipt_code(result.receipt_code.as_ref().unwrap()));
            }
        }
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut votes = ballots(4);
        votes[1].public_key_fingerprint = other_fixture().key_pair.public_key_fingerprint.clone();

        let first = batch_decrypt_votes(&votes, fixture().private_key());
        let second = batch_decrypt_votes(&votes, fixture().private_key());
        assert_eq!(first, second);
        assert_eq!(first.errors.len(), 1);
    }

    #[test]
    fn totals_follow_first_appearance() {
        let outcome = batch_decrypt_votes(&ballots(7), fixture().private_key());
        let totals = outcome.totals();

        let order: Vec<&str> = totals.keys().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["C0", "C1", "C2"]);
        assert_eq!(totals["C0"], 3);
        assert_eq!(totals["C1"], 2);
        assert_eq!(totals["C2"], 2);
    }

    #[test]
    fn empty_batch() {
        let outcome = batch_decrypt_votes(&[], fixture().private_key());
        assert!(outcome.is_empty());
        assert!(outcome.results().is_empty());
    }

    #[test]
    fn session_rejects_foreign_election_ballots() {
        let fixture = fixture();
        let custodian = KeyCustodian::new(EngineConfig::default(), LogAuditor).unwrap();
        let session = custodian
            .open_tally_session("E1", &fixture.shares[1..4], &Justification::new("a", "count"))
            .unwrap();
        assert_eq!(session.election_id(), "E1");
        assert_eq!(session.public_key(), &fixture.key_pair.public_key);

        let mut stray = payload("V9", "C1");
        stray.election_id = "E2".to_owned();
        let mut votes = ballots(2);
        votes.push(encrypt_vote(&stray, &fixture.key_pair.public_key, SourceChannel::Web).unwrap());

        let outcome = session.decrypt_batch(&votes);
        assert_eq!(outcome.decrypted.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 2);

        session.close();
    }
}
