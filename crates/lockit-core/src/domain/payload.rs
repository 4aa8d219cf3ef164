//! The outbound unlock payload published for every accepted scan token.
//!
//! The box controller listening on the messaging topic expects a flat JSON
//! object with exactly four fields:
//!
//! ```json
//! {"id":"box42","pin":"7890","user_id":"alice","state":true}
//! ```
//!
//! `state` is always `true` ("unlock requested"); it exists so the same topic
//! can later carry lock requests without a schema change on the listener side.
//!
//! Field order on the wire follows the struct declaration order below, which
//! `serde_json` preserves.

use serde::{Deserialize, Serialize};

use super::token::ScanToken;

/// JSON record sent to the box controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockPayload {
    /// Box identifier (the token's second field).
    pub id: String,
    /// Unlock PIN (the token's third field).
    pub pin: String,
    /// User identifier (the token's first field).
    pub user_id: String,
    /// Requested box state; always `true` for payloads built from tokens.
    pub state: bool,
}

impl UnlockPayload {
    /// Serialises the payload to compact JSON bytes, ready for publishing.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialisation fails.  With only
    /// strings and a bool in the record this cannot happen in practice, but
    /// the error is propagated rather than unwrapped.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Serialises the payload to a compact JSON string.
    ///
    /// # Errors
    ///
    /// See [`UnlockPayload::to_json_bytes`].
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&ScanToken> for UnlockPayload {
    fn from(token: &ScanToken) -> Self {
        Self {
            id: token.box_id().to_string(),
            pin: token.pin().to_string(),
            user_id: token.user_id().to_string(),
            state: true,
        }
    }
}

impl From<ScanToken> for UnlockPayload {
    fn from(token: ScanToken) -> Self {
        Self::from(&token)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
