//! Hash-chain primitives: content hashing, genesis, and linkage rules.
//!
//! Every field that contributes to an event's content hash is listed
//! explicitly in [`EventContent`] so nothing is accidentally omitted — and,
//! just as deliberately, `sequence`, `prev_hash`, `content_hash`, and
//! `authority_timestamp` are NOT inputs: the first three would be circular
//! and the last is assigned out-of-band by the store.
//!
//! Hash input: SHA-256 over the canonical JSON of an object with keys
//! `event_type`, `payload`, `signature`, `witness_id`, `witness_signature`,
//! `local_timestamp` (ISO-8601 with explicit offset), and `agent_id` when
//! present.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    event::{is_hex_hash, LedgerEvent},
};

use crate::canonical::canonical_bytes;

/// The sentinel `prev_hash` for the first event in the chain.
///
/// 64 hex zeros — a value that can never be the SHA-256 of real data,
/// making genesis detection unambiguous.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Content hash algorithm tag stamped on every event.  `1` is SHA-256;
/// future algorithms increment the tag without breaking old events'
/// verifiability.
pub const HASH_ALGORITHM_VERSION: u32 = 1;

/// Signature scheme tag stamped on every event.
pub const SIGNATURE_ALGORITHM_VERSION: u32 = 1;

/// Exactly the fields the content hash commits to.
#[derive(Debug, Clone, Copy)]
pub struct EventContent<'a> {
    pub event_type: &'a str,
    pub payload: &'a Value,
    pub signature: &'a str,
    pub witness_id: &'a str,
    pub witness_signature: &'a str,
    pub local_timestamp: DateTime<Utc>,
    pub agent_id: Option<&'a str>,
}

/// Compute the SHA-256 content hash for one event.
///
/// Returns a lowercase 64-character hex string.  Deterministic for
/// semantically identical content: the canonical codec sorts keys,
/// normalizes strings, and rejects non-finite numbers before hashing.
pub fn compute_content_hash(content: &EventContent<'_>) -> CustodiaResult<String> {
    let mut object = Map::new();
    object.insert(
        "event_type".to_string(),
        Value::String(content.event_type.to_string()),
    );
    object.insert("payload".to_string(), content.payload.clone());
    object.insert(
        "signature".to_string(),
        Value::String(content.signature.to_string()),
    );
    object.insert(
        "witness_id".to_string(),
        Value::String(content.witness_id.to_string()),
    );
    object.insert(
        "witness_signature".to_string(),
        Value::String(content.witness_signature.to_string()),
    );
    object.insert(
        "local_timestamp".to_string(),
        Value::String(
            content
                .local_timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, false),
        ),
    );
    if let Some(agent_id) = content.agent_id {
        object.insert("agent_id".to_string(), Value::String(agent_id.to_string()));
    }

    let bytes = canonical_bytes(&Value::Object(object))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Determine the required `prev_hash` for an event at `sequence`.
///
/// - sequence 1: the genesis sentinel; a supplied previous hash is rejected
///   rather than silently dropped
/// - sequence > 1: `previous` is required and must be a well-formed
///   64-character lowercase hex string
/// - sequence 0: always an error
pub fn prev_hash_for(sequence: u64, previous: Option<&str>) -> CustodiaResult<String> {
    if sequence == 0 {
        return Err(CustodiaError::Validation {
            reason: "sequence must be >= 1".to_string(),
        });
    }

    if sequence == 1 {
        return match previous {
            None => Ok(GENESIS_HASH.to_string()),
            Some(p) => Err(CustodiaError::Validation {
                reason: format!(
                    "sequence 1 has no predecessor; previous_content_hash '{}' must not be supplied",
                    p
                ),
            }),
        };
    }

    match previous {
        None => Err(CustodiaError::Validation {
            reason: format!("previous_content_hash required for sequence {}", sequence),
        }),
        Some(p) if is_hex_hash(p) => Ok(p.to_string()),
        Some(p) => Err(CustodiaError::Validation {
            reason: format!(
                "previous_content_hash must be 64 lowercase hex characters, got '{}'",
                p
            ),
        }),
    }
}

/// Verify the integrity of a full chain, genesis-rooted.
///
/// Checks three rules for every event:
///
/// 1. **Sequence continuity** — sequences run 1, 2, 3, ... with no gaps.
/// 2. **Prev-hash linkage** — each event's `prev_hash` equals the
///    `content_hash` of the preceding event (genesis sentinel for event 1).
/// 3. **Hash correctness** — each event's `content_hash` matches the value
///    recomputed from its own content.
///
/// Fails with `CustodiaError::Integrity` identifying the offending sequence
/// and the expected vs. actual value.  An empty chain is valid.
pub fn verify_chain(events: &[LedgerEvent]) -> CustodiaResult<()> {
    let mut expected_prev = GENESIS_HASH.to_string();
    let mut expected_seq: u64 = 1;

    for event in events {
        if event.sequence() != expected_seq {
            return Err(CustodiaError::Integrity {
                sequence: event.sequence(),
                expected: format!("sequence {}", expected_seq),
                actual: format!("sequence {}", event.sequence()),
            });
        }

        if event.prev_hash() != expected_prev {
            return Err(CustodiaError::Integrity {
                sequence: event.sequence(),
                expected: expected_prev,
                actual: event.prev_hash().to_string(),
            });
        }

        let recomputed = compute_content_hash(&EventContent {
            event_type: event.event_type(),
            payload: event.payload(),
            signature: event.signature(),
            witness_id: event.witness_id(),
            witness_signature: event.witness_signature(),
            local_timestamp: event.local_timestamp(),
            agent_id: event.agent_id(),
        })?;
        if event.content_hash() != recomputed {
            return Err(CustodiaError::Integrity {
                sequence: event.sequence(),
                expected: recomputed,
                actual: event.content_hash().to_string(),
            });
        }

        expected_prev = event.content_hash().to_string();
        expected_seq += 1;
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
