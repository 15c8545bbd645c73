use crate::required;
use commitballot::*;
use log::info;
use rand::Rng;

pub fn command_simulate(matches: &clap::ArgMatches, config: &Config) {
    let options: Vec<&str> = required(matches, "simulate", "options")
        .split(',')
        .map(str::trim)
        .collect();
    let voters = parse_count(matches, "voters");
    let abstain = parse_count(matches, "abstain");

    if abstain > voters {
        eprintln!("commitballot simulate: cannot abstain more voters than there are");
        std::process::exit(1);
    }

    let transcript = simulate(config, &options, voters, abstain).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let transcript = transcript.to_json().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });
    println!("{}", transcript);
}

/// Run a full election where every voter picks a random option
///
/// The first `abstain` voters commit and then never reveal.
fn simulate(
    config: &Config,
    options: &[&str],
    voters: usize,
    abstain: usize,
) -> Result<ElectionTranscript, VoteError> {
    let protocol = Protocol::with_config(MemStore::default(), config.clone());
    let election_id = protocol.create_election(options.iter().copied())?;
    let mut rng = rand::thread_rng();

    let mut ballots = Vec::with_capacity(voters);
    for i in 0..voters {
        let voter = VoterId::new(format!("voter-{}", i + 1));
        let choice = options[rng.gen_range(0, options.len())];
        let secret = protocol.generate_secret();
        protocol.commit(election_id, &voter, choice, secret.as_str())?;
        ballots.push((voter, choice, secret));
    }

    protocol.advance_to_reveal(election_id)?;
    for (voter, choice, secret) in ballots.iter().skip(abstain) {
        protocol.reveal(election_id, voter, choice, secret.as_str())?;
    }
    protocol.close(election_id)?;

    info!(
        "election {}: {} voters, {} abstained",
        election_id, voters, abstain
    );
    protocol.transcript(election_id)
}

fn parse_count(matches: &clap::ArgMatches, name: &str) -> usize {
    let value = required(matches, "simulate", name);
    value.parse().unwrap_or_else(|_| {
        eprintln!("commitballot simulate: --{} must be a number, got {}", name, value);
        std::process::exit(1);
    })
}
