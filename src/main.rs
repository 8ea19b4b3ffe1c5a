use clap::Parser;
use std::time::Duration;
use utxo_chain::sim::{SimConfig, Simulation};

/// Run a multi-user proof-of-work ledger simulation
#[derive(Parser, Debug)]
#[command(name = "simulate", version, about)]
struct Args {
    /// Mining difficulty: leading zero hex digits required of block hashes
    #[arg(short, long, default_value_t = 3)]
    difficulty: usize,

    /// Number of users at startup
    #[arg(short, long, default_value_t = 5)]
    users: usize,

    /// Maximum number of users the population can grow to
    #[arg(long, default_value_t = 15)]
    max_users: usize,

    /// How long to run, in seconds
    #[arg(short = 't', long, default_value_t = 60)]
    duration: u64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let sim = Simulation::new(SimConfig {
        difficulty: args.difficulty,
        initial_users: args.users.max(1),
        max_users: args.max_users.max(args.users),
    });
    sim.run(Duration::from_secs(args.duration));
}
