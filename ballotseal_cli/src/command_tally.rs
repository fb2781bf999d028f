use crate::{expand, fail, print_json, read_json};
use ballotseal::{EncryptedVote, EngineConfig, Justification, KeyCustodian, KeyShare, LogAuditor};

pub fn command_tally(matches: &clap::ArgMatches, config: &EngineConfig) {
    // Unwraps are OK, all these args are required
    let votes: Vec<EncryptedVote> = read_json(&expand(matches.value_of("VOTES").unwrap()));
    let election_id = matches.value_of("election").unwrap();
    let justification = Justification::new(
        matches.value_of("admin").unwrap(),
        matches.value_of("reason").unwrap(),
    );

    let shares: Vec<KeyShare> = matches
        .values_of("share")
        .unwrap()
        .map(|filename| read_json(&expand(filename)))
        .collect();

    let custodian = KeyCustodian::new(config.clone(), LogAuditor).unwrap_or_else(|e| fail("tally", e));
    let session = custodian
        .open_tally_session(election_id, &shares, &justification)
        .unwrap_or_else(|e| fail("tally", e));
    drop(shares);

    let outcome = session.decrypt_batch(&votes);
    session.close();

    if !outcome.errors.is_empty() {
        log::warn!("{} of {} ballots rejected", outcome.errors.len(), votes.len());
    }

    print_json(&serde_json::json!({
        "electionId": election_id,
        "processed": outcome.decrypted.len(),
        "failed": outcome.errors.len(),
        "totals": outcome.totals(),
        "results": outcome.results(),
    }));
}
