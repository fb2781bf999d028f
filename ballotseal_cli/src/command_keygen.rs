use crate::{expand, fail, print_json, write_json};
use ballotseal::{EngineConfig, KeyCustodian, LogAuditor};
use std::path::Path;

pub fn command_keygen(matches: &clap::ArgMatches, config: &EngineConfig) {
    let election_id = match matches.value_of("ELECTION-ID") {
        Some(id) => id.to_owned(),
        None => uuid::Uuid::new_v4().to_string(),
    };

    // Unwrap is OK, out has a default value
    let out = expand(matches.value_of("out").unwrap());
    let out = Path::new(&out);
    std::fs::create_dir_all(out).unwrap_or_else(|e| {
        fail(
            "keygen",
            format!("cannot create directory {}: {}", out.display(), e),
        )
    });

    let custodian = KeyCustodian::new(config.clone(), LogAuditor).unwrap_or_else(|e| fail("keygen", e));
    let dealt = custodian
        .generate_election_keypair(&election_id)
        .unwrap_or_else(|e| fail("keygen", e));

    write_json(out, "election-key.json", &dealt.key_pair);
    for share in &dealt.shares {
        write_json(out, &format!("share-{}.json", share.index), share);
    }

    eprintln!(
        "ballotseal keygen: wrote {} custodian shares to {} - distribute them and delete the files",
        dealt.shares.len(),
        out.display()
    );
    print_json(&dealt.key_pair);
}
