//! Multi-user simulation harness.
//!
//! Drives a shared [`Blockchain`] from a handful of worker threads: one
//! mines, one moves coins between users, one grows the population, and one
//! audits and reports. The whole aggregate sits behind a single mutex;
//! workers take the chain lock before the user list whenever they need
//! both, and every long wait is chopped into short gated sleeps so pause
//! and shutdown requests land quickly.

pub mod pause;

pub use pause::PauseGate;

use crate::core::Blockchain;
use crate::wallet::Wallet;
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const INITIAL_NAMES: &[&str] = &[
    "Alice", "Bob", "Charlie", "Dave", "Eve", "Frank", "Grace", "Heidi", "Ivan", "Judy",
];

const LATECOMER_NAMES: &[&str] = &[
    "Michael", "Nina", "Oscar", "Patricia", "Quinn", "Robert", "Sarah", "Thomas", "Uma",
    "Vincent", "Wendy", "Xander", "Yvonne", "Zach",
];

/// Granularity of interruptible sleeps
const SLEEP_STEP: Duration = Duration::from_millis(100);

/// A simulated participant: a wallet plus activity counters
#[derive(Debug)]
pub struct SimUser {
    pub name: String,
    pub wallet: Wallet,
    pub transactions_sent: u64,
    pub blocks_mined: u64,
    pub total_mined: u64,
}

impl SimUser {
    fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let wallet = Wallet::with_label(name.clone());
        Self {
            name,
            wallet,
            transactions_sent: 0,
            blocks_mined: 0,
            total_mined: 0,
        }
    }
}

/// Simulation parameters
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub difficulty: usize,
    pub initial_users: usize,
    pub max_users: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            initial_users: 5,
            max_users: 15,
        }
    }
}

pub struct Simulation {
    chain: Arc<Mutex<Blockchain>>,
    users: Arc<Mutex<Vec<SimUser>>>,
    gate: Arc<PauseGate>,
    config: SimConfig,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let chain = Blockchain::with_difficulty(config.difficulty);
        let mut users = Vec::new();
        for name in INITIAL_NAMES.iter().take(config.initial_users) {
            let user = SimUser::new(*name);
            log::info!("user joined: {} ({})", user.name, short(&user.wallet.public_key()));
            users.push(user);
        }

        Self {
            chain: Arc::new(Mutex::new(chain)),
            users: Arc::new(Mutex::new(users)),
            gate: Arc::new(PauseGate::new()),
            config,
        }
    }

    pub fn pause(&self) {
        log::info!("simulation paused");
        self.gate.pause();
    }

    pub fn resume(&self) {
        log::info!("simulation resumed");
        self.gate.resume();
    }

    /// Run the full worker set for `duration`, then shut down and report
    pub fn run(&self, duration: Duration) {
        log::info!(
            "starting simulation: difficulty {}, {} users, {}s",
            self.config.difficulty,
            self.config.initial_users,
            duration.as_secs()
        );

        let workers = vec![
            self.spawn_miner(),
            self.spawn_spender(),
            self.spawn_population(),
            self.spawn_auditor(),
        ];

        let deadline = Instant::now() + duration;
        while Instant::now() < deadline && self.gate.is_running() {
            thread::sleep(SLEEP_STEP);
        }
        self.gate.shutdown();

        for worker in workers {
            // A worker that panicked already logged its own death.
            let _ = worker.join();
        }

        self.final_report();
    }

    /// Mining worker: a random user mines on a 3 to 8 second cadence.
    /// The nonce search itself polls the gate so a pause or shutdown
    /// interrupts it mid-block.
    fn spawn_miner(&self) -> JoinHandle<()> {
        let chain = Arc::clone(&self.chain);
        let users = Arc::clone(&self.users);
        let gate = Arc::clone(&self.gate);

        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            while gate.checkpoint() {
                let picked = {
                    let users = lock(&users);
                    let idx = rng.gen_range(0..users.len());
                    (idx, users[idx].name.clone(), users[idx].wallet.public_key())
                };
                let (idx, name, address) = picked;

                let mined = {
                    let mut chain = lock(&chain);
                    // Let the pool fill up once the chain has a few blocks.
                    if chain.mempool.is_empty() && chain.chain.len() > 3 {
                        log::debug!("{} waits for transactions before mining", name);
                        None
                    } else {
                        chain.mine_next_block_while(&address, || gate.checkpoint())
                    }
                };

                if let Some((block, _)) = mined {
                    let reward = block
                        .coinbase_tx()
                        .map(|tx| tx.total_output())
                        .unwrap_or(0);
                    let mut users = lock(&users);
                    if let Some(user) = users.get_mut(idx) {
                        user.blocks_mined += 1;
                        user.total_mined += reward;
                    }
                    log::info!("{} mined block {} for {} coins", name, block.index, reward);
                }

                let pause = Duration::from_millis(rng.gen_range(3_000..8_000));
                if !gated_sleep(&gate, pause) {
                    break;
                }
            }
        })
    }

    /// Spending worker: a random user sends 1 to 20 percent of their
    /// balance to another random user on a 1 to 5 second cadence.
    fn spawn_spender(&self) -> JoinHandle<()> {
        let chain = Arc::clone(&self.chain);
        let users = Arc::clone(&self.users);
        let gate = Arc::clone(&self.gate);

        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            while gate.checkpoint() {
                {
                    let mut chain = lock(&chain);
                    let mut users = lock(&users);
                    if users.len() >= 2 {
                        let sender_idx = rng.gen_range(0..users.len());
                        let mut recipient_idx = rng.gen_range(0..users.len() - 1);
                        if recipient_idx >= sender_idx {
                            recipient_idx += 1;
                        }
                        let recipient = users[recipient_idx].wallet.public_key();

                        let sender = &mut users[sender_idx];
                        let balance = sender.wallet.balance(&chain);
                        if balance > 0 {
                            let percent = rng.gen_range(1..=20);
                            let amount = (balance * percent / 100).max(1);
                            match sender.wallet.create_transaction(&recipient, amount, &chain) {
                                Ok(tx) => match chain.submit_transaction(tx) {
                                    Ok(()) => {
                                        sender.transactions_sent += 1;
                                        log::info!(
                                            "{} sent {} coins to {}",
                                            sender.name,
                                            amount,
                                            short(&recipient)
                                        );
                                    }
                                    Err(reason) => log::debug!(
                                        "{}'s transaction rejected: {}",
                                        sender.name,
                                        reason
                                    ),
                                },
                                Err(err) => log::debug!(
                                    "{} could not build a transaction: {}",
                                    sender.name,
                                    err
                                ),
                            }
                        }
                    }
                }

                let pause = Duration::from_millis(rng.gen_range(1_000..5_000));
                if !gated_sleep(&gate, pause) {
                    break;
                }
            }
        })
    }

    /// Population worker: every 15 to 30 seconds, a 20 percent chance of a
    /// new user joining, up to the configured maximum.
    fn spawn_population(&self) -> JoinHandle<()> {
        let users = Arc::clone(&self.users);
        let gate = Arc::clone(&self.gate);
        let max_users = self.config.max_users;

        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut next_name = 0usize;
            while gate.checkpoint() {
                {
                    let mut users = lock(&users);
                    if users.len() < max_users && rng.gen_bool(0.2) {
                        let name = match LATECOMER_NAMES.get(next_name) {
                            Some(name) => name.to_string(),
                            None => format!("User{}", rng.gen_range(1000..10_000)),
                        };
                        next_name += 1;
                        let user = SimUser::new(name);
                        log::info!(
                            "user joined: {} ({})",
                            user.name,
                            short(&user.wallet.public_key())
                        );
                        users.push(user);
                    }
                }

                let pause = Duration::from_millis(rng.gen_range(15_000..30_000));
                if !gated_sleep(&gate, pause) {
                    break;
                }
            }
        })
    }

    /// Audit worker: every 10 seconds, log a network snapshot and replay
    /// the chain end to end.
    fn spawn_auditor(&self) -> JoinHandle<()> {
        let chain = Arc::clone(&self.chain);
        let users = Arc::clone(&self.users);
        let gate = Arc::clone(&self.gate);

        thread::spawn(move || {
            while gate.checkpoint() {
                {
                    let chain = lock(&chain);
                    let users = lock(&users);
                    let stats = chain.stats();
                    log::info!(
                        "network: height {}, {} transactions, {} pending, {} coins, {} users",
                        stats.height,
                        stats.total_transactions,
                        stats.pending_transactions,
                        stats.total_coins,
                        users.len()
                    );
                    match chain.validate_chain() {
                        Ok(()) => log::info!("chain audit passed"),
                        Err(err) => log::error!("chain audit FAILED: {}", err),
                    }
                }

                if !gated_sleep(&gate, Duration::from_secs(10)) {
                    break;
                }
            }
        })
    }

    fn final_report(&self) {
        let chain = lock(&self.chain);
        let users = lock(&self.users);
        let stats = chain.stats();

        log::info!("simulation finished");
        log::info!(
            "final chain: {} blocks, {} transactions, {} coins in circulation",
            stats.total_blocks,
            stats.total_transactions,
            stats.total_coins
        );
        match chain.validate_chain() {
            Ok(()) => log::info!("final audit passed"),
            Err(err) => log::error!("final audit FAILED: {}", err),
        }

        let mut ranked: Vec<_> = users
            .iter()
            .map(|u| (u.wallet.balance(&chain), u))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        for (rank, (balance, user)) in ranked.iter().enumerate() {
            log::info!(
                "{}. {}: {} coins, {} blocks mined ({} coins), {} transactions sent",
                rank + 1,
                user.name,
                balance,
                user.blocks_mined,
                user.total_mined,
                user.transactions_sent
            );
        }
    }
}

/// Abbreviated address for log lines
fn short(public_key: &str) -> String {
    public_key.chars().take(8).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("simulation lock poisoned")
}

/// Sleep in short steps so pause and shutdown land promptly; returns
/// `false` once shutdown has been requested.
fn gated_sleep(gate: &PauseGate, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if !gate.checkpoint() {
            return false;
        }
        thread::sleep(SLEEP_STEP.min(deadline.saturating_duration_since(Instant::now())));
    }
    gate.checkpoint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_run_ends_with_valid_chain() {
        let sim = Simulation::new(SimConfig {
            difficulty: 1,
            initial_users: 3,
            max_users: 5,
        });
        sim.run(Duration::from_secs(2));

        let chain = lock(&sim.chain);
        assert!(chain.validate_chain().is_ok());
        assert!(!chain.chain.is_empty());
    }

    #[test]
    fn test_gated_sleep_aborts_on_shutdown() {
        let gate = PauseGate::new();
        gate.shutdown();
        let start = Instant::now();
        assert!(!gated_sleep(&gate, Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
