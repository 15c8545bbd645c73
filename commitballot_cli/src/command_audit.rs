use crate::required;
use commitballot::*;

pub fn command_audit(matches: &clap::ArgMatches) {
    let filename = required(matches, "audit", "INPUT");

    let file_bytes = match std::fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("commitballot audit: unable to read {}: {}", filename, e);
            std::process::exit(1);
        }
    };

    let transcript = ElectionTranscript::from_bytes(&file_bytes).unwrap_or_else(|e| {
        eprintln!("commitballot audit: unable to parse {}: {}", filename, e);
        std::process::exit(1);
    });

    let report = match audit(&transcript) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("election {} failed audit", transcript.election.id);
            std::process::exit(1);
        }
    };

    println!("> Election verified OK");
    println!("  election: {}", report.election_id);
    println!("  phase: {}", transcript.election.phase);
    println!("  commitments: {}", report.commitments);
    println!("  reveals: {}", report.reveals);
    println!("  unrevealed: {}", report.unrevealed);

    if matches.is_present("print-tally") {
        println!("Tally:");
        for (option, num_votes) in report.tally.iter() {
            println!("  {} got {} votes", option, num_votes);
        }

        let leaders = report.tally.leaders();
        match leaders.len() {
            0 => println!("No votes revealed"),
            1 => println!("Winner: {}", leaders[0]),
            _ => println!("Tied: {}", leaders.join(", ")),
        }
    }
}
