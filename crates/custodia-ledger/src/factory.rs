//! The hash-chain event factory.
//!
//! `create_event` is the only sanctioned way to produce a `LedgerEvent`: it
//! derives `prev_hash` from the claimed sequence, computes the content hash
//! over the canonical bytes, stamps the algorithm version tags, and hands
//! everything to the record's validating constructor.  Any failure — bad
//! sequence, missing predecessor, malformed hash, missing witness — surfaces
//! synchronously here.

use chrono::{DateTime, Utc};

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    event::{EventId, LedgerEvent, LedgerEventParts},
};

use crate::chain::{
    compute_content_hash, prev_hash_for, EventContent, HASH_ALGORITHM_VERSION,
    SIGNATURE_ALGORITHM_VERSION,
};

/// Everything a writer supplies to mint one event.
///
/// `event_id` defaults to a fresh UUID when absent; `previous_content_hash`
/// must be absent exactly when `sequence == 1`.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub sequence: u64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub signature: String,
    pub witness_id: String,
    pub witness_signature: String,
    pub local_timestamp: DateTime<Utc>,
    pub previous_content_hash: Option<String>,
    pub agent_id: Option<String>,
    pub signing_key_id: Option<String>,
    pub event_id: Option<EventId>,
}

/// Build and validate one hash-chained event.
pub fn create_event(params: CreateEvent) -> CustodiaResult<LedgerEvent> {
    // Reject a non-object payload before hashing it; the record constructor
    // would catch it too, but a hash over invalid content is never wanted.
    if !params.payload.is_object() {
        return Err(CustodiaError::Validation {
            reason: "payload must be a JSON object".to_string(),
        });
    }

    let prev_hash = prev_hash_for(params.sequence, params.previous_content_hash.as_deref())?;

    let content_hash = compute_content_hash(&EventContent {
        event_type: &params.event_type,
        payload: &params.payload,
        signature: &params.signature,
        witness_id: &params.witness_id,
        witness_signature: &params.witness_signature,
        local_timestamp: params.local_timestamp,
        agent_id: params.agent_id.as_deref(),
    })?;

    LedgerEvent::from_parts(LedgerEventParts {
        event_id: params.event_id.unwrap_or_default(),
        sequence: params.sequence,
        event_type: params.event_type,
        payload: params.payload,
        prev_hash,
        content_hash,
        signature: params.signature,
        hash_algorithm_version: HASH_ALGORITHM_VERSION,
        signature_algorithm_version: SIGNATURE_ALGORITHM_VERSION,
        witness_id: params.witness_id,
        witness_signature: params.witness_signature,
        local_timestamp: params.local_timestamp,
        authority_timestamp: None,
        agent_id: params.agent_id,
        signing_key_id: params.signing_key_id,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
