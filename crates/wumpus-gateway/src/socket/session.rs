//! Resumable session cache

use crate::protocol::{ReadyPayload, ResumePayload};

/// Session fields cached for resuming
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub resume_url: Option<String>,
    pub session_id: Option<String>,
    pub last_sequence: Option<u64>,
}

impl SessionState {
    /// Track the highest sequence number seen
    pub fn observe_sequence(&mut self, sequence: Option<u64>) {
        if let Some(seq) = sequence {
            self.last_sequence = Some(self.last_sequence.map_or(seq, |last| last.max(seq)));
        }
    }

    /// Cache resume details from READY
    pub fn establish(&mut self, ready: &ReadyPayload) {
        self.resume_url = Some(ready.resume_gateway_url.clone());
        self.session_id = Some(ready.session_id.clone());
    }

    /// Check if READY has been seen since the last fresh connect
    pub fn can_resume(&self) -> bool {
        self.resume_url.is_some() && self.session_id.is_some()
    }

    /// Resume payload, if a session is cached
    pub fn resume_payload(&self, token: &str) -> Option<ResumePayload> {
        self.session_id.as_ref().map(|session_id| ResumePayload {
            token: token.to_string(),
            session_id: session_id.clone(),
            seq: self.last_sequence,
        })
    }

    /// Forget everything; a fresh session is about to begin
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
