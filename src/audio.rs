//! Audible cues for the countdown
//!
//! Audio is strictly best-effort. A sink may fail (no terminal, closed
//! stderr); callers log the failure and carry on ticking.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The two sounds the countdown makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Short click played every second of the final countdown
    Tick,
    /// Long alarm played on warning, final-countdown entry and expiry
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
}

/// Oscillator settings for a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency_hz: u32,
    pub duration_ms: u64,
    pub gain: f32,
}

impl Cue {
    pub fn tone(self) -> Tone {
        match self {
            Cue::Tick => Tone {
                waveform: Waveform::Sine,
                frequency_hz: 1000,
                duration_ms: 50,
                gain: 0.05,
            },
            Cue::Alarm => Tone {
                waveform: Waveform::Square,
                frequency_hz: 440,
                duration_ms: 1000,
                gain: 0.1,
            },
        }
    }
}

/// Something that can play a cue
pub trait AudioCue: Send + Sync {
    fn play(&self, cue: Cue) -> std::io::Result<()>;
}

/// Rings the terminal bell on stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play(&self, cue: Cue) -> std::io::Result<()> {
        let tone = cue.tone();
        debug!(
            "Playing {:?} cue ({:?} {}Hz for {}ms)",
            cue, tone.waveform, tone.frequency_hz, tone.duration_ms
        );
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()
    }
}

/// Swallows every cue
#[derive(Debug, Clone, Copy, Default)]
pub struct Muted;

impl AudioCue for Muted {
    fn play(&self, _cue: Cue) -> std::io::Result<()> {
        Ok(())
    }
}

/// Play a cue and ignore any failure
pub fn play_best_effort(audio: &dyn AudioCue, cue: Cue) {
    if let Err(e) = audio.play(cue) {
        debug!("Skipping {:?} cue, audio unavailable: {}", cue, e);
    }
}
