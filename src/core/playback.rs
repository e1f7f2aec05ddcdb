//! Transport clock.
//!
//! Wall-clock driven while previewing; the export pipeline drives it with
//! fixed steps through `advance`.

use tokio::time::Instant;

use crate::utils::format_timecode;

/// What a tick did to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing changed.
    Idle,
    Advanced,
    /// Reached the end: playback stopped and the playhead went back to 0.
    Finished,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    playing: bool,
    current_time: f64,
    duration: f64,
    last_tick: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(duration: f64) -> Self {
        Self {
            playing: false,
            current_time: 0.0,
            duration: duration.max(0.0),
            last_tick: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Playhead as `HH:MM:SS:FF`.
    pub fn timecode(&self) -> String {
        format_timecode(self.current_time)
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            self.last_tick = None;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.last_tick = None;
    }

    /// Flip between playing and paused. Returns the new playing state.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
        self.playing
    }

    /// Move the playhead, clamped to `[0, duration]`.
    pub fn seek(&mut self, time: f64) {
        self.current_time = crate::utils::clamp_finite(time, 0.0, self.duration);
    }

    /// Update the timeline length; the playhead is pulled back inside it.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        if self.current_time > self.duration {
            self.current_time = self.duration;
        }
    }

    /// Stop and rewind to the start.
    pub fn reset(&mut self) {
        self.pause();
        self.current_time = 0.0;
    }

    /// Advance by the wall time elapsed since the previous tick. The first tick
    /// after `play` only arms the clock.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.playing {
            self.last_tick = None;
            return TickOutcome::Idle;
        }
        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.advance(delta)
    }

    /// Advance by `delta` seconds. Once the playhead has reached the end the
    /// next step stops playback and rewinds; it never loops.
    pub fn advance(&mut self, delta: f64) -> TickOutcome {
        if !self.playing {
            return TickOutcome::Idle;
        }
        if self.current_time >= self.duration {
            self.reset();
            return TickOutcome::Finished;
        }
        self.current_time = (self.current_time + delta.max(0.0)).min(self.duration);
        TickOutcome::Advanced
    }
}
