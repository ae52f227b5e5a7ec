// Fire-and-forget audio cues. The engine never waits on playback and never
// propagates a playback failure; it logs and moves on.

use serde::Serialize;
use tracing::warn;

use crate::error::StoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioKind {
    /// Page narration track. Restarted from the beginning on each cue.
    Narration,
    /// One-shot sound from a `playSound` timeline event.
    Sound,
    /// Sound attached to a tappable element.
    TapSound,
}

/// A request for the host to play a clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCue {
    pub kind: AudioKind,
    pub url: String,
    pub volume: f32,
    /// Seek the clip to zero before playing.
    pub restart: bool,
}

impl AudioCue {
    pub fn narration(url: impl Into<String>) -> Self {
        AudioCue {
            kind: AudioKind::Narration,
            url: url.into(),
            volume: 1.0,
            restart: true,
        }
    }

    pub fn sound(url: impl Into<String>, volume: f32) -> Self {
        AudioCue {
            kind: AudioKind::Sound,
            url: url.into(),
            volume,
            restart: false,
        }
    }

    pub fn tap_sound(url: impl Into<String>, volume: f32) -> Self {
        AudioCue {
            kind: AudioKind::TapSound,
            url: url.into(),
            volume,
            restart: false,
        }
    }
}

/// Host-side audio output.
pub trait AudioSink {
    fn play(&mut self, cue: &AudioCue) -> Result<(), StoryError>;
}

/// Hand every cue to the sink. Failures are logged and swallowed.
/// Returns how many cues the sink accepted.
pub fn deliver_audio<S: AudioSink + ?Sized>(sink: &mut S, cues: &[AudioCue]) -> usize {
    let mut played = 0;
    for cue in cues {
        match sink.play(cue) {
            Ok(()) => played += 1,
            Err(err) => warn!(url = %cue.url, kind = ?cue.kind, error = %err, "audio playback failed"),
        }
    }
    played
}
