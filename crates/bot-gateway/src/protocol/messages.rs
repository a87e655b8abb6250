//! Gateway frame envelope
//!
//! Every frame on the socket is `{op, d, s, t}`. Decoding checks the fields the
//! client relies on and reports anything else as [`GatewayError::MalformedPayload`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, ResumePayload,
    VoiceStateUpdatePayload,
};
use crate::error::{GatewayError, GatewayResult};

/// Gateway message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event data payload (always present on the wire, possibly null)
    #[serde(default)]
    pub d: Option<Value>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    /// Build a frame from an op code and an already-encoded body
    #[must_use]
    pub fn new(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// Build a frame whose body is any serializable payload
    pub fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> GatewayResult<Self> {
        Ok(Self::new(op, Some(serde_json::to_value(payload)?)))
    }

    // === Client Messages ===

    pub fn identify(payload: &IdentifyPayload) -> GatewayResult<Self> {
        Self::with_payload(OpCode::Identify, payload)
    }

    pub fn resume(payload: &ResumePayload) -> GatewayResult<Self> {
        Self::with_payload(OpCode::Resume, payload)
    }

    /// Create a Heartbeat message (op=1); the body is null before any dispatch
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(OpCode::Heartbeat, last_sequence.map(Value::from))
    }

    pub fn presence_update(payload: &PresenceUpdatePayload) -> GatewayResult<Self> {
        Self::with_payload(OpCode::PresenceUpdate, payload)
    }

    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> GatewayResult<Self> {
        Self::with_payload(OpCode::VoiceStateUpdate, payload)
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            d: Some(data),
            s: Some(sequence),
            t: Some(event_type.into()),
        }
    }

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> GatewayResult<HelloPayload> {
        if self.op != OpCode::Hello {
            return Err(GatewayError::malformed(format!("expected Hello, got {}", self.op)));
        }
        let d = self
            .d
            .clone()
            .ok_or_else(|| GatewayError::malformed("Hello without body"))?;
        serde_json::from_value(d).map_err(|e| GatewayError::malformed(format!("Hello body: {e}")))
    }

    /// Resumable flag of an Invalid Session message (op=9)
    ///
    /// A missing or non-boolean body counts as "not resumable".
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    // === Codec ===

    /// Serialize to a text frame
    pub fn encode(&self) -> GatewayResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a text frame
    ///
    /// `op` must be a known op code; a Dispatch must carry a string `t`.
    pub fn decode(frame: &str) -> GatewayResult<Self> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| GatewayError::malformed(format!("not JSON: {e}")))?;
        let Value::Object(mut map) = value else {
            return Err(GatewayError::malformed("frame is not an object"));
        };

        let raw_op = map
            .get("op")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::malformed("missing or non-integer op"))?;
        let op = u8::try_from(raw_op)
            .ok()
            .and_then(OpCode::from_u8)
            .ok_or_else(|| GatewayError::malformed(format!("unknown op {raw_op}")))?;

        let d = match map.remove("d") {
            None | Some(Value::Null) => None,
            Some(d) => Some(d),
        };

        let s = match map.get("s") {
            None | Some(Value::Null) => None,
            Some(s) => Some(
                s.as_u64()
                    .ok_or_else(|| GatewayError::malformed("non-integer sequence"))?,
            ),
        };

        let t = match map.remove("t") {
            None | Some(Value::Null) => None,
            Some(Value::String(t)) => Some(t),
            Some(_) => return Err(GatewayError::malformed("non-string event type")),
        };

        if op == OpCode::Dispatch && t.is_none() {
            return Err(GatewayError::malformed("dispatch without event type"));
        }

        Ok(Self { op, d, s, t })
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
