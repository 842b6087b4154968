//! One-way rate-limit latches for speech synthesis.
//!
//! Once the speech service reports that its quota is exhausted for a kind of
//! artifact, every later request of that kind in the run is skipped without
//! being attempted. There is no retry and no backoff: a partial deck is better
//! than a stalled run.

use crate::error::SpeechError;
use crate::model::ArtifactKind;
use tracing::warn;

/// Per-kind quota latches. Both start open and can only close.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    audio_exhausted: bool,
    sentence_audio_exhausted: bool,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request of this kind may be made.
    pub fn attempt(&self, kind: ArtifactKind) -> bool {
        !self.is_tripped(kind)
    }

    /// Records the outcome of a failed request.
    ///
    /// Only a quota rejection closes the latch; other failures are ignored.
    /// Returns `true` if this call tripped the latch.
    pub fn report(&mut self, kind: ArtifactKind, error: &SpeechError) -> bool {
        if !error.is_quota_exceeded() {
            return false;
        }

        let latch = self.latch_mut(kind);
        if *latch {
            return false;
        }

        *latch = true;
        warn!(%kind, "speech quota exceeded; skipping {kind} for the rest of the run");
        true
    }

    /// Whether the latch for this kind has closed.
    pub fn is_tripped(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::WordAudio => self.audio_exhausted,
            ArtifactKind::SentenceAudio => self.sentence_audio_exhausted,
        }
    }

    fn latch_mut(&mut self, kind: ArtifactKind) -> &mut bool {
        match kind {
            ArtifactKind::WordAudio => &mut self.audio_exhausted,
            ArtifactKind::SentenceAudio => &mut self.sentence_audio_exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_starts_open() {
        let gate = RateLimitGate::new();
        assert!(gate.attempt(ArtifactKind::WordAudio));
        assert!(gate.attempt(ArtifactKind::SentenceAudio));
    }

    #[test]
    fn test_quota_trips_only_its_kind() {
        let mut gate = RateLimitGate::new();
        assert!(gate.report(ArtifactKind::WordAudio, &SpeechError::QuotaExceeded));

        assert!(!gate.attempt(ArtifactKind::WordAudio));
        assert!(gate.attempt(ArtifactKind::SentenceAudio));
    }

    #[test]
    fn test_other_errors_leave_latch_open() {
        let mut gate = RateLimitGate::new();
        assert!(!gate.report(ArtifactKind::WordAudio, &SpeechError::Http(500)));
        assert!(!gate.report(ArtifactKind::WordAudio, &SpeechError::EmptyAudio));
        assert!(gate.attempt(ArtifactKind::WordAudio));
    }

    #[test]
    fn test_latch_is_monotonic() {
        let mut gate = RateLimitGate::new();
        gate.report(ArtifactKind::SentenceAudio, &SpeechError::QuotaExceeded);

        // A second quota report is not a new transition.
        assert!(!gate.report(ArtifactKind::SentenceAudio, &SpeechError::QuotaExceeded));
        // Later unrelated failures never reopen it.
        gate.report(ArtifactKind::SentenceAudio, &SpeechError::Http(503));

        for _ in 0..10 {
            assert!(!gate.attempt(ArtifactKind::SentenceAudio));
        }
    }
}
