use crate::{expand, fail, print_json, read_json};
use ballotseal::{EngineConfig, MemDirectory, OfflinePackageIssuer};

pub fn command_offline_package(matches: &clap::ArgMatches, config: &EngineConfig) {
    // Unwraps are OK, all these args are required
    let directory: MemDirectory = read_json(&expand(matches.value_of("DIRECTORY").unwrap()));
    let election_id = matches.value_of("election").unwrap();
    let voter_id = matches.value_of("voter").unwrap();

    let mut issuer =
        OfflinePackageIssuer::new(directory, config).unwrap_or_else(|e| fail("offline-package", e));
    let package = issuer
        .generate_offline_package(election_id, voter_id)
        .unwrap_or_else(|e| fail("offline-package", e));

    print_json(&package);
}
