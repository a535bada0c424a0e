//! The immutable ledger event record.
//!
//! `LedgerEvent` is one entry in the hash chain.  Fields are private and the
//! only way to obtain a value is through `from_parts`, which validates every
//! construction invariant — an event that exists is an event that is valid.
//! The payload is an owned JSON object cloned at construction; no handle to
//! shared mutable memory survives into the record.
//!
//! Hash and prev-hash *computation* live in `custodia-ledger`; this type only
//! checks that the supplied values are well-formed.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CustodiaError, CustodiaResult};

/// Unique identifier for a single ledger event.
///
/// Appears in every event and defines event equality — two records with the
/// same `EventId` are the same event regardless of payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    /// Create a new, unique event ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns true when `s` is a well-formed content hash: exactly 64 lowercase
/// ASCII hex characters.
pub fn is_hex_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// All fields of a ledger event, supplied by the factory in
/// `custodia-ledger` after it has computed the hashes.
///
/// This is a construction-time carrier only; the validated record is
/// `LedgerEvent`.
#[derive(Debug, Clone)]
pub struct LedgerEventParts {
    pub event_id: EventId,
    pub sequence: u64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub prev_hash: String,
    pub content_hash: String,
    pub signature: String,
    pub hash_algorithm_version: u32,
    pub signature_algorithm_version: u32,
    pub witness_id: String,
    pub witness_signature: String,
    pub local_timestamp: DateTime<Utc>,
    pub authority_timestamp: Option<DateTime<Utc>>,
    pub agent_id: Option<String>,
    pub signing_key_id: Option<String>,
}

/// One immutable entry in the hash-chained ledger.
///
/// Created once, never mutated, never deleted.  Equality and hashing are
/// defined solely by `event_id` — the payload is excluded from identity
/// comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    event_id: EventId,
    sequence: u64,
    event_type: String,
    payload: serde_json::Value,
    prev_hash: String,
    content_hash: String,
    signature: String,
    hash_algorithm_version: u32,
    signature_algorithm_version: u32,
    witness_id: String,
    witness_signature: String,
    local_timestamp: DateTime<Utc>,
    authority_timestamp: Option<DateTime<Utc>>,
    agent_id: Option<String>,
    signing_key_id: Option<String>,
}

impl LedgerEvent {
    /// Validate `parts` and construct the immutable record.
    ///
    /// Every invariant is checked here, not later: non-empty event type,
    /// producer signature, witness id and witness signature; sequence >= 1;
    /// well-formed prev/content hashes; object-shaped payload.  The error
    /// names the violated field.
    pub fn from_parts(parts: LedgerEventParts) -> CustodiaResult<Self> {
        if parts.sequence == 0 {
            return Err(CustodiaError::Validation {
                reason: "sequence must be >= 1".to_string(),
            });
        }
        require_non_blank("event_type", &parts.event_type)?;
        require_non_blank("signature", &parts.signature)?;
        // An event with no witness is invalid — rejected at construction.
        require_non_blank("witness_id", &parts.witness_id)?;
        require_non_blank("witness_signature", &parts.witness_signature)?;

        if !parts.payload.is_object() {
            return Err(CustodiaError::Validation {
                reason: "payload must be a JSON object".to_string(),
            });
        }
        if !is_hex_hash(&parts.prev_hash) {
            return Err(CustodiaError::Validation {
                reason: format!(
                    "prev_hash must be 64 lowercase hex characters, got '{}'",
                    parts.prev_hash
                ),
            });
        }
        if !is_hex_hash(&parts.content_hash) {
            return Err(CustodiaError::Validation {
                reason: format!(
                    "content_hash must be 64 lowercase hex characters, got '{}'",
                    parts.content_hash
                ),
            });
        }

        Ok(Self {
            event_id: parts.event_id,
            sequence: parts.sequence,
            event_type: parts.event_type,
            payload: parts.payload,
            prev_hash: parts.prev_hash,
            content_hash: parts.content_hash,
            signature: parts.signature,
            hash_algorithm_version: parts.hash_algorithm_version,
            signature_algorithm_version: parts.signature_algorithm_version,
            witness_id: parts.witness_id,
            witness_signature: parts.witness_signature,
            local_timestamp: parts.local_timestamp,
            authority_timestamp: parts.authority_timestamp,
            agent_id: parts.agent_id,
            signing_key_id: parts.signing_key_id,
        })
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn hash_algorithm_version(&self) -> u32 {
        self.hash_algorithm_version
    }

    pub fn signature_algorithm_version(&self) -> u32 {
        self.signature_algorithm_version
    }

    pub fn witness_id(&self) -> &str {
        &self.witness_id
    }

    pub fn witness_signature(&self) -> &str {
        &self.witness_signature
    }

    pub fn local_timestamp(&self) -> DateTime<Utc> {
        self.local_timestamp
    }

    pub fn authority_timestamp(&self) -> Option<DateTime<Utc>> {
        self.authority_timestamp
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn signing_key_id(&self) -> Option<&str> {
        self.signing_key_id.as_deref()
    }

    /// Return a copy of this event with `authority_timestamp` stamped.
    ///
    /// The authority timestamp is assigned out-of-band by the store and is
    /// excluded from the content hash, so stamping does not break the chain.
    /// The original record is left untouched.
    pub fn with_authority_timestamp(&self, at: DateTime<Utc>) -> Self {
        let mut stamped = self.clone();
        stamped.authority_timestamp = Some(at);
        stamped
    }
}

impl PartialEq for LedgerEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event_id == other.event_id
    }
}

impl Eq for LedgerEvent {}

impl Hash for LedgerEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.event_id.hash(state);
    }
}

fn require_non_blank(field: &str, value: &str) -> CustodiaResult<()> {
    if value.trim().is_empty() {
        return Err(CustodiaError::Validation {
            reason: format!("{} must be a non-empty string", field),
        });
    }
    Ok(())
}
