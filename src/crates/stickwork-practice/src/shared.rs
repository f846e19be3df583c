//! A practice session shared between input handlers

use parking_lot::Mutex;
use std::sync::Arc;

use stickwork_core::VoiceId;
use stickwork_notation::Pattern;

use crate::config::PracticeConfig;
use crate::error::Result;
use crate::session::{PracticeHit, PracticeSession, SessionSummary};

/// Cloneable handle to at most one running session.
///
/// Every clone sees the same session, so one task per input device can feed
/// hits while the UI reads the state. Each call holds the lock only for its
/// own duration.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    /// Current session, `None` before start and after stop
    session: Arc<Mutex<Option<PracticeSession>>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, discarding any previous one
    pub fn start(&self, patterns: &[Pattern], config: PracticeConfig) -> Result<()> {
        let session = PracticeSession::start(patterns, config)?;
        if self.session.lock().replace(session).is_some() {
            log::debug!("previous practice session discarded");
        }
        Ok(())
    }

    /// End the session, returning its final summary
    pub fn stop(&self) -> Option<SessionSummary> {
        let session = self.session.lock().take()?;
        log::debug!("practice session stopped");
        Some(session.summary())
    }

    pub fn is_active(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Record a hit; `None` when no session is running
    pub fn register_hit(&self, time_ms: f64, voice: VoiceId) -> Option<PracticeHit> {
        self.session
            .lock()
            .as_mut()
            .map(|session| session.register_hit(time_ms, voice))
    }

    /// Record a MIDI note-on. Zero velocity is a note-off and is ignored.
    pub fn register_midi(&self, time_ms: f64, note: u8, velocity: u8) -> Option<PracticeHit> {
        if velocity == 0 {
            return None;
        }
        self.session
            .lock()
            .as_mut()
            .map(|session| session.register_midi(time_ms, note))
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.with_session(PracticeSession::summary)
    }

    pub fn accuracy(&self) -> f64 {
        self.with_session(PracticeSession::accuracy).unwrap_or(0.0)
    }

    /// Read the running session under the lock
    pub fn with_session<R>(&self, f: impl FnOnce(&PracticeSession) -> R) -> Option<R> {
        self.session.lock().as_ref().map(f)
    }
}
