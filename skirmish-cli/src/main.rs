use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use skirmish_core::{run_simulations_with_rng, CombatantConfig};
use std::{fs, process};

#[derive(Debug, Parser)]
#[command(
    name = "skirmish",
    about = "Run Monte Carlo combat simulations from fixture files"
)]
struct Args {
    /// JSON file with the party's combatant records
    #[arg(short, long)]
    party_file: String,

    /// JSON file with the monster group's combatant records
    #[arg(short, long)]
    monster_file: String,

    /// Number of encounters to simulate
    #[arg(short, long, default_value_t = 100)]
    num_simulations: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print the full event log of the first simulation as JSON
    #[arg(long)]
    show_log: bool,
}

fn load_side(path: &str) -> Vec<CombatantConfig> {
    let file = fs::File::open(path).unwrap_or_else(|err| {
        eprintln!("Problem opening {path}: {err}");
        process::exit(1);
    });
    serde_json::from_reader(file).unwrap_or_else(|err| {
        eprintln!("Problem parsing {path}: {err}");
        process::exit(2);
    })
}

fn main() {
    let args = Args::parse();
    let party = load_side(&args.party_file);
    let monsters = load_side(&args.monster_file);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let batch = run_simulations_with_rng(&party, &monsters, args.num_simulations, &mut rng)
        .unwrap_or_else(|err| {
            eprintln!("Problem running simulations: {err}");
            process::exit(3);
        });

    let summary = &batch.summary;
    println!("simulations: {}", summary.total_simulations);
    println!(
        "party wins:  {} ({:.1}%)",
        summary.party_wins, summary.party_win_percentage
    );
    println!("avg rounds:  {:.1}", summary.average_rounds);
    println!("survivors:");
    for (name, count) in &summary.survivor_counts {
        println!("  {name}: {count}");
    }

    if args.show_log {
        if let Some(first) = batch.results.first() {
            let json = serde_json::to_string_pretty(&first.log).unwrap_or_else(|err| {
                eprintln!("Problem serializing log: {err}");
                process::exit(4);
            });
            println!("--- simulation {} log ---", first.id);
            println!("{json}");
        }
    }
}
