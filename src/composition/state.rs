use std::fmt;

/// Where an export run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    /// Capture session started, no clip playing yet
    Recording,
    /// Playing the clip at this queue index
    PlayingClip(usize),
    /// Capture is being stopped
    Finalizing,
}

/// Things that happen to an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEvent {
    CaptureStarted,
    PlaybackStarted,
    /// The playing clip reached end-of-stream
    ClipEnded,
    /// A fatal failure or cancellation
    Abort,
    Finalized,
}

impl ExportState {
    /// Next state after `event`, `None` if the event is not valid here
    pub fn transition(self, event: ExportEvent, clip_count: usize) -> Option<ExportState> {
        use ExportEvent::*;
        use ExportState::*;

        match (self, event) {
            (Idle, CaptureStarted) if clip_count > 0 => Some(Recording),
            (Recording, PlaybackStarted) => Some(PlayingClip(0)),
            (PlayingClip(i), ClipEnded) if i + 1 < clip_count => Some(PlayingClip(i + 1)),
            (PlayingClip(_), ClipEnded) => Some(Finalizing),
            (Recording | PlayingClip(_), Abort) => Some(Finalizing),
            (Finalizing, Finalized) => Some(Idle),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ExportState::Idle)
    }

    /// Index of the clip currently playing
    pub fn current_clip(&self) -> Option<usize> {
        match self {
            ExportState::PlayingClip(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Idle => write!(f, "idle"),
            ExportState::Recording => write!(f, "recording"),
            ExportState::PlayingClip(i) => write!(f, "playing clip {}", i),
            ExportState::Finalizing => write!(f, "finalizing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run_over_three_clips() {
        let mut state = ExportState::Idle;
        let events = [
            (ExportEvent::CaptureStarted, ExportState::Recording),
            (ExportEvent::PlaybackStarted, ExportState::PlayingClip(0)),
            (ExportEvent::ClipEnded, ExportState::PlayingClip(1)),
            (ExportEvent::ClipEnded, ExportState::PlayingClip(2)),
            (ExportEvent::ClipEnded, ExportState::Finalizing),
            (ExportEvent::Finalized, ExportState::Idle),
        ];

        for (event, expected) in events {
            state = state.transition(event, 3).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn test_empty_queue_never_records() {
        assert_eq!(ExportState::Idle.transition(ExportEvent::CaptureStarted, 0), None);
    }

    #[test]
    fn test_abort_goes_to_finalizing() {
        assert_eq!(
            ExportState::PlayingClip(1).transition(ExportEvent::Abort, 3),
            Some(ExportState::Finalizing)
        );
        assert_eq!(
            ExportState::Recording.transition(ExportEvent::Abort, 3),
            Some(ExportState::Finalizing)
        );
        assert_eq!(ExportState::Idle.transition(ExportEvent::Abort, 3), None);
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(ExportState::Idle.transition(ExportEvent::ClipEnded, 2), None);
        assert_eq!(ExportState::Finalizing.transition(ExportEvent::ClipEnded, 2), None);
        assert_eq!(ExportState::Recording.transition(ExportEvent::Finalized, 2), None);
    }

    #[test]
    fn test_current_clip() {
        assert_eq!(ExportState::PlayingClip(4).current_clip(), Some(4));
        assert_eq!(ExportState::Recording.current_clip(), None);
        assert!(ExportState::default().is_idle());
        assert_eq!(ExportState::PlayingClip(2).to_string(), "playing clip 2");
    }
}
