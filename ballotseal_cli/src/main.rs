use clap::{App, AppSettings, Arg, SubCommand};
use log::LevelFilter;
use serde::de::DeserializeOwned;
use std::path::Path;

mod command_keygen;
mod command_offline;
mod command_tally;
mod command_vote;

use command_keygen::command_keygen;
use command_offline::command_offline_package;
use command_tally::command_tally;
use command_vote::{command_encrypt, command_verify};

fn main() {
    let matches = App::new("Ballotseal CLI")
        .version(clap::crate_version!())
        .about("Seals ballots, holds election keys in threshold custody and runs tallies")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .takes_value(true)
                .global(true)
                .help("JSON engine config - defaults to BALLOTSEAL_* environment variables"),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate an election keypair and deal the private key to custodians")
                .arg(
                    Arg::with_name("ELECTION-ID")
                        .index(1)
                        .required(false)
                        .help("Election ID - a random UUID is used if omitted"),
                )
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .default_value(".")
                        .help("Directory to write the public key record and custodian shares to"),
                ),
        )
        .subcommand(
            SubCommand::with_name("encrypt")
                .about("Encrypt a vote and print the ballot record with its receipt code")
                .arg(key_arg())
                .arg(value_arg("voter", "Voter ID"))
                .arg(value_arg("election", "Election ID"))
                .arg(value_arg("candidate", "Candidate ID"))
                .arg(value_arg("polling-unit", "Polling unit ID"))
                .arg(
                    Arg::with_name("channel")
                        .long("channel")
                        .takes_value(true)
                        .possible_values(&["web", "offline", "ussd"])
                        .default_value("web")
                        .help("Channel the ballot was cast through"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Check a ballot was sealed under the given election key")
                .arg(key_arg())
                .arg(
                    Arg::with_name("VOTE")
                        .index(2)
                        .required(true)
                        .help("Encrypted vote in JSON format"),
                ),
        )
        .subcommand(
            SubCommand::with_name("tally")
                .about("Reconstruct the election key from custodian shares and decrypt ballots")
                .arg(
                    Arg::with_name("VOTES")
                        .index(1)
                        .required(true)
                        .help("JSON array of encrypted votes"),
                )
                .arg(value_arg("election", "Election ID"))
                .arg(
                    Arg::with_name("share")
                        .long("share")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .required(true)
                        .help("Custodian share file, repeat once per custodian"),
                )
                .arg(value_arg("admin", "ID of the administrator requesting the key"))
                .arg(value_arg("reason", "Why the key is being reconstructed")),
        )
        .subcommand(
            SubCommand::with_name("offline-package")
                .about("Issue an offline voting package to a voter")
                .arg(
                    Arg::with_name("DIRECTORY")
                        .index(1)
                        .required(true)
                        .help("JSON election directory (elections and voter polling units)"),
                )
                .arg(value_arg("election", "Election ID"))
                .arg(value_arg("voter", "Voter ID")),
        )
        .get_matches();

    init_logging(matches.occurrences_of("v"));

    let config = match matches.value_of("config") {
        Some(path) => ballotseal::EngineConfig::from_json(&read_string(&expand(path))),
        None => ballotseal::EngineConfig::from_env(),
    }
    .unwrap_or_else(|e| fail("config", e));

    // Subcommands
    match matches.subcommand() {
        ("keygen", Some(matches)) => command_keygen(matches, &config),
        ("encrypt", Some(matches)) => command_encrypt(matches),
        ("verify", Some(matches)) => command_verify(matches),
        ("tally", Some(matches)) => command_tally(matches, &config),
        ("offline-package", Some(matches)) => command_offline_package(matches, &config),
        _ => unreachable!("clap requires a subcommand"),
    }
}

fn key_arg() -> Arg<'static, 'static> {
    Arg::with_name("KEY")
        .index(1)
        .required(true)
        .help("Election public key: a PEM file or an election key record in JSON format")
}

fn value_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .required(true)
        .help(help)
}

fn init_logging(verbosity: u64) {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));

    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("ballotseal: unable to initialise logging: {}", e);
            }
        }
        Err(e) => eprintln!("ballotseal: invalid logging config: {}", e),
    }
}

/// Print an error for `command` and exit
pub fn fail(command: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("ballotseal {}: {}", command, error);
    std::process::exit(1);
}

pub fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

pub fn read_string(filename: &str) -> String {
    std::fs::read_to_string(filename)
        .unwrap_or_else(|e| fail("read", format!("unable to read {}: {}", filename, e)))
}

pub fn read_json<T: DeserializeOwned>(filename: &str) -> T {
    let contents = read_string(filename);
    serde_json::from_str(&contents)
        .unwrap_or_else(|e| fail("read", format!("unable to parse {}: {}", filename, e)))
}

pub fn write_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| fail("write", e));
    std::fs::write(&path, json).unwrap_or_else(|e| {
        fail(
            "write",
            format!("unable to write {}: {}", path.display(), e),
        )
    });
}

pub fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| fail("print", e));
    println!("{}", json);
}

/// Load an election public key from a PEM file or an election key record
pub fn read_public_key(filename: &str) -> ballotseal::ElectionPublicKey {
    let contents = read_string(filename);
    if contents.trim_start().starts_with("-----BEGIN") {
        ballotseal::ElectionPublicKey::from_pem(&contents).unwrap_or_else(|e| fail("key", e))
    } else {
        let key_pair: ballotseal::ElectionKeyPair = serde_json::from_str(&contents)
            .unwrap_or_else(|e| fail("key", format!("unable to parse {}: {}", filename, e)));
        key_pair.public_key
    }
}
