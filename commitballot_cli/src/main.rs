use clap::{App, AppSettings, Arg, SubCommand};
use commitballot::Config;
use log::LevelFilter;
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;

mod command_audit;
mod command_commit;
mod command_simulate;

use command_audit::command_audit;
use command_commit::{command_commit, command_secret, command_verify};
use command_simulate::command_simulate;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone, Debug)]
#[repr(u8)]
enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Silent => LevelFilter::Off,
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

fn main() {
    let matches = App::new("CommitBallot CLI")
        .version("0.1")
        .author("Patrick Hayes <patrick.d.hayes@gmail.com>")
        .about("Commits, reveals and audits commit-reveal elections")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .global(true)
                .help("Only log errors"),
        )
        .subcommand(SubCommand::with_name("secret").about("Generate a fresh secret"))
        .subcommand(
            SubCommand::with_name("commit")
                .about("Compute the commitment digest for a choice")
                .arg(
                    Arg::with_name("CHOICE")
                        .index(1)
                        .required(true)
                        .help("The option being voted for"),
                )
                .arg(
                    Arg::with_name("SECRET")
                        .index(2)
                        .required(true)
                        .help("The voter's secret, as printed by `commitballot secret`"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Check that a choice and secret open a digest")
                .arg(
                    Arg::with_name("DIGEST")
                        .index(1)
                        .required(true)
                        .help("Hex-encoded commitment digest"),
                )
                .arg(Arg::with_name("CHOICE").index(2).required(true))
                .arg(Arg::with_name("SECRET").index(3).required(true)),
        )
        .subcommand(
            SubCommand::with_name("simulate")
                .about("Run an in-memory election end to end and print its transcript")
                .arg(
                    Arg::with_name("options")
                        .long("options")
                        .takes_value(true)
                        .required(true)
                        .help("Comma separated list of options, eg `A,B`"),
                )
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .required(true)
                        .help("Number of voters"),
                )
                .arg(
                    Arg::with_name("abstain")
                        .long("abstain")
                        .takes_value(true)
                        .default_value("0")
                        .help("Number of voters who commit but never reveal"),
                ),
        )
        .subcommand(
            SubCommand::with_name("audit")
                .about("Audit an election transcript")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Transcript file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("print-tally")
                        .long("print-tally")
                        .help("Print the recomputed tally"),
                ),
        )
        .get_matches();

    let verbosity = if matches.is_present("quiet") {
        Verbosity::Error
    } else {
        let level = 2 + matches.occurrences_of("v").min(2) as u8;
        Verbosity::try_from(level).unwrap_or(Verbosity::Debug)
    };
    env_logger::Builder::new()
        .filter_level(verbosity.into())
        .parse_env("COMMITBALLOT_LOG")
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    // Subcommands
    match matches.subcommand() {
        ("secret", Some(_)) => command_secret(&config),
        ("commit", Some(matches)) => command_commit(matches),
        ("verify", Some(matches)) => command_verify(matches),
        ("simulate", Some(matches)) => command_simulate(matches, &config),
        ("audit", Some(matches)) => command_audit(matches),
        _ => unreachable!(),
    }
}

/// Read a required argument, exiting with a usage error if it is missing
pub(crate) fn required<'a>(matches: &'a clap::ArgMatches, command: &str, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_else(|| {
        eprintln!("commitballot {}: {} required", command, name);
        std::process::exit(1);
    })
}
