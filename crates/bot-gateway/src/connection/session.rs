//! Resumable session bookkeeping

use crate::protocol::ResumePayload;

/// Session id and last dispatch sequence
///
/// A held (non-empty) session id makes the next handshake a RESUME.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    session_id: Option<String>,
    last_sequence: Option<u64>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Store the id announced by READY; an empty id is not resumable
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.session_id = (!session_id.is_empty()).then_some(session_id);
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Remember the sequence of the latest dispatch
    pub fn record_sequence(&mut self, sequence: u64) {
        self.last_sequence = Some(sequence);
    }

    #[inline]
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Forget the session; the next handshake identifies
    pub fn clear(&mut self) {
        self.session_id = None;
        self.last_sequence = None;
    }

    /// RESUME body for the held session
    pub fn resume_payload(&self, token: &str) -> Option<ResumePayload> {
        Some(ResumePayload {
            token: token.to_string(),
            session_id: self.session_id.clone()?,
            seq: self.last_sequence,
        })
    }
}
