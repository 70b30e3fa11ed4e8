//! Bugfield CLI - collect high-scoring wall layouts into a store directory.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use u_bugfield::archive::FieldStore;
use u_bugfield::campaign::{Campaign, CampaignConfig};
use u_bugfield::field::{Dimensions, RepairStrategy, Workspace};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <store-dir> [options]");
    eprintln!();
    eprintln!("Run genetic searches until enough winners are stored, then a");
    eprintln!("champion search seeded with all of them.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --size WxH        Grid extent (default: 21x31)");
    eprintln!("  --winners N       Starts required before the champion run (default: 20)");
    eprintln!("  --min-score S     Minimum winner score (default: 100000)");
    eprintln!("  --attempts N      Give up after N searches (default: unbounded)");
    eprintln!("  --retry           Revert disconnecting flips instead of carving");
    eprintln!("  --seed S          Random seed");
    eprintln!();
    eprintln!("Set RUST_LOG=info (or debug) for progress output.");
    process::exit(1);
}

fn parse_or_exit<T: std::str::FromStr>(program: &str, flag: &str, value: Option<&String>) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("Invalid or missing value for {flag}");
        usage(program)
    })
}

fn parse_size(text: &str) -> Option<(usize, usize)> {
    let (w, h) = text.split_once(['x', 'X'])?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("bugfield", String::as_str);

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        usage(program);
    }

    let store_dir = PathBuf::from(&args[1]);
    let mut dims = Dimensions::default();
    let mut strategy = RepairStrategy::Carve;
    let mut config = CampaignConfig::default();

    let mut i = 2;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--size" => {
                let (w, h) = value.and_then(|s| parse_size(s)).unwrap_or_else(|| {
                    eprintln!("Invalid or missing value for --size");
                    usage(program)
                });
                dims = Dimensions::new(w, h).unwrap_or_else(|e| {
                    eprintln!("Error: {e}");
                    process::exit(1);
                });
                i += 1;
            }
            "--winners" => {
                config.winner_count = parse_or_exit(program, "--winners", value);
                i += 1;
            }
            "--min-score" => {
                config.min_winner_score = parse_or_exit(program, "--min-score", value);
                i += 1;
            }
            "--attempts" => {
                config.max_attempts = parse_or_exit(program, "--attempts", value);
                i += 1;
            }
            "--seed" => {
                config.genetic.seed = Some(parse_or_exit(program, "--seed", value));
                i += 1;
            }
            "--retry" => strategy = RepairStrategy::Retry,
            other => {
                eprintln!("Unknown option: {other}");
                usage(program);
            }
        }
        i += 1;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        process::exit(1);
    }

    let store = FieldStore::open(&store_dir, dims).unwrap_or_else(|e| {
        eprintln!("Error opening store {}: {e}", store_dir.display());
        process::exit(1);
    });
    let mut workspace = Workspace::new(dims, strategy);

    println!("Bugfield");
    println!("========");
    println!("Grid: {}x{}", dims.width(), dims.height());
    println!("Repair: {strategy:?}");
    println!("Store: {}", store_dir.display());
    println!(
        "Winners: {} at score >= {}",
        config.winner_count, config.min_winner_score
    );
    println!();

    let start = Instant::now();
    let result = Campaign::run(&store, &mut workspace, &config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    println!("Attempts: {}", result.attempts);
    println!("New winners: {:?}", result.winner_scores);
    println!("Stored starts: {}", result.stored_starts);
    if let Some(champion) = &result.champion {
        println!(
            "Champion: {} after {} rounds",
            champion.best_score, champion.rounds
        );
    }
    match &result.best {
        Some(best) => {
            println!();
            println!("Best field:");
            print!("{best}");
        }
        None => println!("No field stored yet."),
    }
    println!();
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f32());
}
