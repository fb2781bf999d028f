use crate::{expand, fail, print_json, read_json, read_public_key};
use ballotseal::{cast_vote, verify_vote_integrity, EncryptedVote, SourceChannel, VotePayload};

pub fn command_encrypt(matches: &clap::ArgMatches) {
    // Unwraps are OK, all these args are required or defaulted
    let public_key = read_public_key(&expand(matches.value_of("KEY").unwrap()));
    let source_channel = match matches.value_of("channel").unwrap() {
        "offline" => SourceChannel::Offline,
        "ussd" => SourceChannel::Ussd,
        _ => SourceChannel::Web,
    };

    let payload = VotePayload {
        voter_id: matches.value_of("voter").unwrap().to_owned(),
        election_id: matches.value_of("election").unwrap().to_owned(),
        candidate_id: matches.value_of("candidate").unwrap().to_owned(),
        polling_unit_id: matches.value_of("polling-unit").unwrap().to_owned(),
        timestamp: chrono::Utc::now(),
    };

    let cast = cast_vote(&payload, &public_key, source_channel).unwrap_or_else(|e| fail("encrypt", e));
    print_json(&cast);
}

pub fn command_verify(matches: &clap::ArgMatches) {
    let public_key = read_public_key(&expand(matches.value_of("KEY").unwrap()));
    let vote: EncryptedVote = read_json(&expand(matches.value_of("VOTE").unwrap()));

    if verify_vote_integrity(&vote, &public_key) {
        println!("OK: ballot sealed under key {}", public_key.fingerprint());
    } else {
        println!(
            "MISMATCH: ballot sealed under key {}, expected {}",
            vote.public_key_fingerprint,
            public_key.fingerprint()
        );
        std::process::exit(2);
    }
}
