use super::*;
use chrono::Utc;
use lazy_static::lazy_static;

/// A dealt election key shared by every test in the crate
pub(crate) struct Fixture {
    pub key_pair: ElectionKeyPair,
    pub shares: Vec<KeyShare>,
    private_key: ElectionPrivateKey,
}

impl Fixture {
    fn deal(election_id: &str) -> Self {
        let private_key = ElectionPrivateKey::generate(MIN_RSA_BITS).unwrap();
        let shares = split_private_key(election_id, &private_key, 3, 5).unwrap();
        let key_pair = ElectionKeyPair::new(election_id, private_key.public_key().clone());

        Fixture {
            key_pair,
            shares,
            private_key,
        }
    }

    pub fn private_key(&self) -> &ElectionPrivateKey {
        &self.private_key
    }
}

lazy_static! {
    static ref FIXTURE: Fixture = Fixture::deal("E1");
    static ref OTHER_FIXTURE: Fixture = Fixture::deal("E2");
}

/// Election "E1"
pub(crate) fn fixture() -> &'static Fixture {
    &FIXTURE
}

/// Election "E2", with an unrelated key
pub(crate) fn other_fixture() -> &'static Fixture {
    &OTHER_FIXTURE
}

pub(crate) fn payload(voter_id: &str, candidate_id: &str) -> VotePayload {
    VotePayload {
        voter_id: voter_id.to_owned(),
        election_id: "E1".to_owned(),
        candidate_id: candidate_id.to_owned(),
        polling_unit_id: "P1".to_owned(),
        timestamp: Utc::now(),
    }
}

#[test]
fn end_to_end_election() {
    log4rs_test_utils::test_logging::init_logging_once_for(["ballotseal"], None, None);

    // Set up the election: threshold 3 of 5 custodians
    let auditor = MemoryAuditor::default();
    let custodian = KeyCustodian::new(EngineConfig::default(), &auditor).unwrap();
    let dealt = custodian.generate_election_keypair("E1").unwrap();
    assert_eq!(dealt.shares.len(), 5);
    assert_eq!(dealt.key_pair.public_key_fingerprint.len(), FINGERPRINT_LEN);

    // Cast a vote
    let ballot = payload("V1", "C1");
    let cast = cast_vote(&ballot, &dealt.key_pair.public_key, SourceChannel::Web).unwrap();
    assert!(verify_vote_integrity(
        &cast.encrypted_vote,
        &dealt.key_pair.public_key
    ));

    // Voting is over
    // ----------------

    // Two custodians are not enough
    let two = vec![dealt.shares[0].clone(), dealt.shares[2].clone()];
    let justification = Justification::new("admin-1", "official count");
    assert!(matches!(
        custodian.reconstruct_private_key("E1", &two, &justification),
        Err(Error::InsufficientShares(3, 2))
    ));

    // Custodians at positions 0, 2 and 4 reconstruct the key
    let quorum = vec![
        dealt.shares[0].clone(),
        dealt.shares[2].clone(),
        dealt.shares[4].clone(),
    ];
    let private_key = custodian
        .reconstruct_private_key("E1", &quorum, &justification)
        .unwrap();
    assert_eq!(auditor.records().len(), 1);

    let decrypted = decrypt_vote(&cast.encrypted_vote, &private_key).unwrap();
    assert_eq!(decrypted.candidate_id, "C1");
    assert_eq!(decrypted, ballot);
    assert!(is_receipt_code(&cast.receipt_code));
    drop(private_key);

    // A fresh session for the batch count
    let session = custodian
        .open_tally_session("E1", &dealt.shares[1..], &justification)
        .unwrap();
    let outcome = session.decrypt_batch(&[cast.encrypted_vote.clone()]);
    session.close();

    assert_eq!(outcome.errors.len(), 0);
    assert_eq!(outcome.decrypted[0].receipt_code, cast.receipt_code);
    assert_eq!(outcome.totals()["C1"], 1);
    assert_eq!(auditor.records().len(), 2);
}

#[test]
fn offline_ballots_through_tally() {
    let fixture = fixture();
    let mut directory = MemDirectory::default();
    directory.add_election(ElectionContext {
        election_id: "E1".into(),
        public_key: fixture.key_pair.public_key.clone(),
        candidates: vec![],
    });
    directory.assign_voter(
        "E1",
        "V1",
        PollingUnit {
            id: "P1".into(),
            name: "Market Square".into(),
        },
    );

    let mut issuer = OfflinePackageIssuer::new(directory, &EngineConfig::default()).unwrap();
    let package = issuer.generate_offline_package("E1", "V1").unwrap();

    // On the device: only the serialized package is available
    let shipped: OfflinePackage =
        serde_json::from_str(&serde_json::to_string(&package).unwrap()).unwrap();
    let good = encrypt_vote(&payload("V1", "C2"), &shipped.public_key, SourceChannel::Offline)
        .unwrap();
    let stale = encrypt_vote(
        &payload("V1", "C2"),
        &other_fixture().key_pair.public_key,
        SourceChannel::Offline,
    )
    .unwrap();

    // Later, the batch comes back
    let now = Utc::now();
    assert!(issuer.check_submission(&shipped.key_id, &good, now).is_ok());
    assert!(issuer.check_submission(&shipped.key_id, &stale, now).is_err());

    let outcome = batch_decrypt_votes(&[good, stale], fixture.private_key());
    assert_eq!(outcome.decrypted.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].index, 1);
}
