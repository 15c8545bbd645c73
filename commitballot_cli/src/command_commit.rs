use crate::required;
use commitballot::{commit, generate_secret_with, verify, Config, Digest};

pub fn command_secret(config: &Config) {
    let mut csprng = rand::rngs::OsRng {};
    let secret = generate_secret_with(&mut csprng, config.secret_bytes);

    println!("{}", secret.as_str());
}

pub fn command_commit(matches: &clap::ArgMatches) {
    let choice = required(matches, "commit", "CHOICE");
    let secret = required(matches, "commit", "SECRET");

    println!("{}", commit(choice, secret));
}

pub fn command_verify(matches: &clap::ArgMatches) {
    let digest: Digest = required(matches, "verify", "DIGEST")
        .parse()
        .unwrap_or_else(|e| {
            eprintln!("commitballot verify: invalid digest: {}", e);
            std::process::exit(1);
        });
    let choice = required(matches, "verify", "CHOICE");
    let secret = required(matches, "verify", "SECRET");

    if verify(&digest, choice, secret) {
        println!("> Commitment verified OK");
    } else {
        eprintln!("commitballot verify: choice and secret do not match {}", digest);
        std::process::exit(1);
    }
}
