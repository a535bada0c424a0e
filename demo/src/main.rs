//! Custodia Ledger Core — Demo CLI
//!
//! Runs one or all of the three demo scenarios.  Each scenario wires real
//! Custodia components (canonical codec, chain engine, halt circuit,
//! termination gate, gated writer) against an in-memory store.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- hash-chain
//!   cargo run -p demo -- emergency-halt
//!   cargo run -p demo -- termination

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod scenarios;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Custodia — hash-chained governance ledger demo.
///
/// Each subcommand runs one or all of the three scenarios, demonstrating
/// chain integrity, the emergency halt circuit, and permanent termination.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Custodia ledger core demo",
    long_about = "Runs Custodia demo scenarios showing hash-chain integrity,\n\
                  the three-channel emergency halt, and the permanent\n\
                  termination gate."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: hash-chained appends and forgery detection.
    HashChain,
    /// Scenario 2: authorization, halt trigger, and blocked writes.
    EmergencyHalt,
    /// Scenario 3: cessation event and termination-outranks-halt.
    Termination,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::HashChain => scenarios::run_hash_chain(),
        Command::EmergencyHalt => scenarios::run_emergency_halt(),
        Command::Termination => scenarios::run_termination(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> custodia_contracts::error::CustodiaResult<()> {
    scenarios::run_hash_chain()?;
    scenarios::run_emergency_halt()?;
    scenarios::run_termination()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Custodia — Governance Trust Core");
    println!("================================");
    println!();
    println!("Write path per event:");
    println!("  [1] Termination gate: a cessation event on the chain blocks all writes, forever");
    println!("  [2] Halt gate: sub-millisecond atomic flag check");
    println!("  [3] Canonical serialization (sorted keys, NFKC, minimal escapes)");
    println!("  [4] SHA-256 content hash linked to the previous event's hash");
    println!("  [5] Append to the order-preserving, delete-prohibiting store");
    println!();
}
