//! Demo scenarios exercising the Custodia ledger core end to end.
//!
//! Each scenario wires real components — in-memory store, halt circuit,
//! ledger recorder, termination gate, orchestrator, gated writer — and
//! narrates what the core does at each step.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    halt::{HaltNotification, HaltReason},
};
use custodia_core::traits::{Clock, HaltNotifier, LedgerStore, PermissionGate, SystemClock};
use custodia_halt::{
    HaltCircuit, HaltOrchestrator, LedgerHaltRecorder, RecorderIdentity, TerminationGate,
    TERMINAL_FLAG_FIELD,
};
use custodia_ledger::{verify_chain, EventDraft, GatedLedgerWriter, InMemoryLedgerStore};

// ── Shared wiring ─────────────────────────────────────────────────────────────

/// Permission gate that authorizes only `operator-alice`.
struct OperatorRoster;

impl PermissionGate for OperatorRoster {
    fn is_authorized(&self, actor_id: &str, action: &str) -> bool {
        action == custodia_halt::HALT_ACTION && actor_id == "operator-alice"
    }
}

/// Notifier that prints each notification to stdout.
struct ConsoleNotifier;

impl HaltNotifier for ConsoleNotifier {
    fn notify(&self, notification: &HaltNotification) -> CustodiaResult<()> {
        match notification {
            HaltNotification::Intent { reason, message, .. } => {
                println!("      [notify] intent: {} ({})", reason, message);
            }
            HaltNotification::Executed { execution } => {
                println!(
                    "      [notify] executed in {} ms (local={} transport={} ledger={})",
                    execution.elapsed_ms,
                    execution.channels_reached.local,
                    execution.channels_reached.transport,
                    execution.channels_reached.ledger,
                );
            }
            HaltNotification::Failed { reason, error, .. } => {
                println!("      [notify] failed: {} ({})", reason, error);
            }
            HaltNotification::UnauthorizedAttempt { actor_id, .. } => {
                println!("      [notify] unauthorized attempt by {}", actor_id);
            }
        }
        Ok(())
    }
}

struct Stack {
    store: InMemoryLedgerStore,
    circuit: Arc<HaltCircuit>,
    orchestrator: HaltOrchestrator,
    writer: GatedLedgerWriter,
}

fn build_stack() -> Stack {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = InMemoryLedgerStore::new();
    let shared = Arc::new(store.clone());

    let recorder = LedgerHaltRecorder::new(
        shared.clone(),
        RecorderIdentity {
            signature: "system-sig".to_string(),
            witness_id: "halt-witness".to_string(),
            witness_signature: "halt-wsig".to_string(),
            agent_id: None,
        },
        clock.clone(),
    );
    let circuit = Arc::new(HaltCircuit::new(clock.clone()).with_recorder(Arc::new(recorder)));
    let gate = Arc::new(TerminationGate::new(shared.clone()));

    let orchestrator = HaltOrchestrator::new(
        circuit.clone(),
        Arc::new(OperatorRoster),
        Arc::new(ConsoleNotifier),
        clock.clone(),
    );
    let writer = GatedLedgerWriter::new(shared, gate, circuit.clone(), clock);

    Stack {
        store,
        circuit,
        orchestrator,
        writer,
    }
}

fn draft(event_type: &str, payload: serde_json::Value, agent_id: &str) -> EventDraft {
    EventDraft {
        event_type: event_type.to_string(),
        payload,
        signature: "demo-sig".to_string(),
        witness_id: "witness-01".to_string(),
        witness_signature: "demo-wsig".to_string(),
        agent_id: Some(agent_id.to_string()),
        signing_key_id: None,
    }
}

// ── Scenario 1: hash chain ────────────────────────────────────────────────────

/// Append a run of governance events, verify the chain, then show that a
/// forged copy fails verification.
pub fn run_hash_chain() -> CustodiaResult<()> {
    println!("Scenario 1: hash-chained append-only ledger");
    println!("-------------------------------------------");
    let stack = build_stack();

    for (round, choice) in [(1, "aye"), (2, "aye"), (3, "nay")] {
        let event = stack.writer.append(draft(
            "deliberation_vote",
            json!({ "round": round, "choice": choice }),
            "agent-alpha",
        ))?;
        println!(
            "  [{}] {} prev={}... hash={}...",
            event.sequence(),
            event.event_type(),
            &event.prev_hash()[..12],
            &event.content_hash()[..12],
        );
    }

    stack.store.verify_integrity()?;
    println!("  chain verified: every link intact");

    // Forge a payload in a detached copy and watch verification fail.
    let mut forged = stack.store.events()?;
    let tampered = custodia_ledger::create_event(custodia_ledger::CreateEvent {
        sequence: forged[1].sequence(),
        event_type: forged[1].event_type().to_string(),
        payload: json!({ "round": 2, "choice": "nay" }),
        signature: forged[1].signature().to_string(),
        witness_id: forged[1].witness_id().to_string(),
        witness_signature: forged[1].witness_signature().to_string(),
        local_timestamp: forged[1].local_timestamp(),
        previous_content_hash: Some(forged[0].content_hash().to_string()),
        agent_id: forged[1].agent_id().map(str::to_string),
        signing_key_id: None,
        event_id: None,
    })?;
    forged[1] = tampered;
    match verify_chain(&forged) {
        Err(CustodiaError::Integrity { sequence, .. }) => {
            println!("  forgery detected at sequence {}", sequence);
        }
        Err(e) => println!("  forgery detected: {}", e),
        Ok(()) => println!("  unexpected: forged chain verified"),
    }
    println!();
    Ok(())
}

// ── Scenario 2: emergency halt ────────────────────────────────────────────────

/// An unauthorized actor is rejected, an authorized operator halts the
/// system, and further writes are refused.
pub fn run_emergency_halt() -> CustodiaResult<()> {
    println!("Scenario 2: three-channel emergency halt");
    println!("----------------------------------------");
    let stack = build_stack();

    stack.writer.append(draft(
        "agent_output",
        json!({ "text": "routine work" }),
        "agent-alpha",
    ))?;

    println!("  intruder attempts an operator halt:");
    match stack.orchestrator.trigger_halt_authorized(
        "intruder",
        HaltReason::OperatorRequest,
        "hostile stop",
        None,
    ) {
        Err(CustodiaError::Unauthorized { actor_id, .. }) => {
            println!("      rejected: {} is not authorized", actor_id);
        }
        other => println!("      unexpected outcome: {:?}", other.map(|_| ())),
    }
    println!("  halted after attempt: {}", stack.circuit.is_halted());

    println!("  operator-alice halts the system:");
    let execution = stack.orchestrator.trigger_halt_authorized(
        "operator-alice",
        HaltReason::OperatorRequest,
        "scheduled maintenance window",
        Some("trace-demo-1".to_string()),
    )?;
    info!(elapsed_ms = execution.elapsed_ms, "halt executed");
    println!("  status: {}", stack.circuit.status());

    match stack.writer.append(draft(
        "agent_output",
        json!({ "text": "work after halt" }),
        "agent-alpha",
    )) {
        Err(CustodiaError::Halted { status }) => {
            println!("  write refused while halted: {}", status);
        }
        other => println!("  unexpected outcome: {:?}", other.map(|_| ())),
    }

    let tip = stack.store.latest_event()?;
    if let Some(tip) = tip {
        println!(
            "  halt recorded on chain as '{}' at sequence {}",
            tip.event_type(),
            tip.sequence()
        );
    }
    println!();
    Ok(())
}

// ── Scenario 3: permanent termination ─────────────────────────────────────────

/// A cessation event terminates the system permanently; termination outranks
/// a later halt at the write gate.
pub fn run_termination() -> CustodiaResult<()> {
    println!("Scenario 3: permanent termination");
    println!("---------------------------------");
    let stack = build_stack();

    let terminal = stack.writer.append(draft(
        "cessation",
        json!({
            TERMINAL_FLAG_FIELD: true,
            "directive": "cease operations",
            "executed_at": "2026-08-27T00:00:00+00:00",
        }),
        "agent-governor",
    ))?;
    println!(
        "  cessation recorded at sequence {} — the system is now terminated",
        terminal.sequence()
    );

    stack
        .orchestrator
        .trigger_halt_system(HaltReason::ConstitutionalBreach, "final breach", None)?;
    println!("  system also halted: {}", stack.circuit.is_halted());

    match stack.writer.append(draft(
        "agent_output",
        json!({ "text": "posthumous write" }),
        "agent-alpha",
    )) {
        Err(CustodiaError::Terminated { terminal_sequence }) => {
            println!(
                "  write refused with the termination error (terminal sequence {}) —",
                terminal_sequence
            );
            println!("  termination outranks halt at the write gate");
        }
        other => println!("  unexpected outcome: {:?}", other.map(|_| ())),
    }
    println!();
    Ok(())
}
