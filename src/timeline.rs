// Playback timeline: a frame-driven clock that fires one-shot events exactly once.
// The host calls `tick(now)` once per animation frame; nothing advances between ticks.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::error::StoryError;
use crate::story::{check_event_ids, StoryPage, TimelineEvent};
use crate::types::Timestamp;

/// Something the timeline reports back to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimelineSignal {
    /// A configured event's trigger time was crossed.
    EventFired(TimelineEvent),
    /// Playback reached the end of the page.
    Completed,
}

/// Receiver for timeline signals. Both callbacks default to no-ops.
pub trait TimelineHandler {
    fn on_event_trigger(&mut self, _event: &TimelineEvent) {}
    fn on_complete(&mut self) {}
}

/// Forward a batch of signals to a handler, in order.
pub fn dispatch_signals<H: TimelineHandler + ?Sized>(signals: &[TimelineSignal], handler: &mut H) {
    for signal in signals {
        match signal {
            TimelineSignal::EventFired(event) => handler.on_event_trigger(event),
            TimelineSignal::Completed => handler.on_complete(),
        }
    }
}

#[derive(Debug, Clone)]
struct ScheduledEvent {
    at: Timestamp,
    event: TimelineEvent,
}

/// Events ordered by trigger time. Ties keep declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    events: Vec<ScheduledEvent>,
}

impl Schedule {
    pub fn new(events: Vec<TimelineEvent>) -> Self {
        let mut events: Vec<ScheduledEvent> = events
            .into_iter()
            .map(|event| ScheduledEvent {
                at: event.trigger_time(),
                event,
            })
            .collect();
        // sort_by_key is stable
        events.sort_by_key(|e| e.at);
        Schedule { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter().map(|e| &e.event)
    }
}

/// Complete timeline state as a plain value.
///
/// Every transition is a method taking the immutable [`Schedule`] alongside,
/// so the state machine can be driven and inspected without a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineState {
    pub is_playing: bool,
    pub current_time: Timestamp,
    pub duration: Timestamp,
    /// Ids of events already delivered in this play-through.
    pub fired_event_ids: BTreeSet<String>,
    /// Host clock reading of the previous frame. `None` until the first
    /// frame after `play`.
    pub last_frame: Option<Timestamp>,
}

impl TimelineState {
    pub fn new(duration: Timestamp) -> Self {
        TimelineState {
            is_playing: false,
            current_time: Timestamp::ZERO,
            duration,
            fired_event_ids: BTreeSet::new(),
            last_frame: None,
        }
    }

    /// Start advancing. Restarts from zero when parked at the end.
    /// Already playing: no-op, so there is never a second frame loop.
    pub fn play(&mut self) {
        if self.is_playing {
            return;
        }
        if self.current_time >= self.duration {
            self.current_time = Timestamp::ZERO;
            self.fired_event_ids.clear();
        }
        self.is_playing = true;
        self.last_frame = None;
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
        self.last_frame = None;
    }

    pub fn toggle(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn reset(&mut self) {
        self.pause();
        self.fired_event_ids.clear();
        self.current_time = Timestamp::ZERO;
    }

    /// Jump to `target`, clamped to `[0, duration]`.
    ///
    /// Events before the target that were already delivered stay delivered.
    /// Events before the target that were skipped, and events exactly at the
    /// target, fire now. Events after the target are forgotten so they fire
    /// again on replay.
    pub fn seek(&mut self, schedule: &Schedule, target: Timestamp) -> Vec<TimelineSignal> {
        let target = target.clamp_to(self.duration);

        let retained: BTreeSet<String> = schedule
            .events
            .iter()
            .filter(|e| e.at < target && self.fired_event_ids.contains(&e.event.id))
            .map(|e| e.event.id.clone())
            .collect();
        self.fired_event_ids = retained;

        let signals = self.fire_due(schedule, target);
        self.current_time = target;
        signals
    }

    /// Advance by the host-clock delta since the previous frame.
    pub fn tick(&mut self, schedule: &Schedule, now: Timestamp) -> Vec<TimelineSignal> {
        if !self.is_playing {
            return Vec::new();
        }

        // Host clocks are not guaranteed monotonic; a step back counts as zero.
        let delta = match self.last_frame {
            Some(last) => now.saturating_sub(last),
            None => Timestamp::ZERO,
        };
        self.last_frame = Some(now);

        let new_time = self.current_time.saturating_add(delta);
        if new_time >= self.duration {
            self.current_time = self.duration;
            let mut signals = self.fire_due(schedule, self.duration);
            self.is_playing = false;
            self.last_frame = None;
            signals.push(TimelineSignal::Completed);
            return signals;
        }

        self.current_time = new_time;
        self.fire_due(schedule, new_time)
    }

    /// Change the duration, pulling the playhead back inside if needed.
    pub fn set_duration(&mut self, duration: Timestamp) {
        self.duration = duration;
        self.current_time = self.current_time.clamp_to(duration);
    }

    /// Percentage of the page played, in `[0, 100]`. Zero-length pages report 0.
    pub fn progress(&self) -> f64 {
        if self.duration == Timestamp::ZERO {
            return 0.0;
        }
        let pct = self.current_time.as_micros() as f64 / self.duration.as_micros() as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }

    fn fire_due(&mut self, schedule: &Schedule, up_to: Timestamp) -> Vec<TimelineSignal> {
        let mut signals = Vec::new();
        for scheduled in &schedule.events {
            if scheduled.at > up_to {
                break;
            }
            // Mark before emitting.
            if self.fired_event_ids.insert(scheduled.event.id.clone()) {
                signals.push(TimelineSignal::EventFired(scheduled.event.clone()));
            }
        }
        signals
    }
}

/// Read-only view handed to JS and renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub is_playing: bool,
    /// Seconds.
    pub current_time: f64,
    /// Seconds.
    pub duration: f64,
    pub progress: f64,
}

/// A page's schedule plus its running state.
#[derive(Debug, Clone)]
pub struct Timeline {
    schedule: Schedule,
    state: TimelineState,
}

impl Timeline {
    /// Callers must pass unique event ids; `checked` enforces that for
    /// events that did not come through `StoryBook::validate`.
    pub fn new(duration: Timestamp, events: Vec<TimelineEvent>) -> Self {
        Timeline {
            schedule: Schedule::new(events),
            state: TimelineState::new(duration),
        }
    }

    pub fn checked(duration: Timestamp, events: Vec<TimelineEvent>) -> Result<Self, StoryError> {
        check_event_ids("timeline", &events)?;
        Ok(Self::new(duration, events))
    }

    pub fn for_page(page: &StoryPage) -> Self {
        Self::new(page.duration(), page.timeline.clone())
    }

    pub fn play(&mut self) {
        self.state.play();
    }

    pub fn pause(&mut self) {
        self.state.pause();
    }

    pub fn toggle(&mut self) {
        self.state.toggle();
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn seek(&mut self, target: Timestamp) -> Vec<TimelineSignal> {
        let signals = self.state.seek(&self.schedule, target);
        log_signals(&signals, self.state.current_time);
        signals
    }

    pub fn tick(&mut self, now: Timestamp) -> Vec<TimelineSignal> {
        let signals = self.state.tick(&self.schedule, now);
        log_signals(&signals, self.state.current_time);
        signals
    }

    pub fn set_duration(&mut self, duration: Timestamp) {
        self.state.set_duration(duration);
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn current_time(&self) -> Timestamp {
        self.state.current_time
    }

    pub fn duration(&self) -> Timestamp {
        self.state.duration
    }

    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            is_playing: self.state.is_playing,
            current_time: self.state.current_time.as_secs(),
            duration: self.state.duration.as_secs(),
            progress: self.state.progress(),
        }
    }
}

fn log_signals(signals: &[TimelineSignal], at: Timestamp) {
    for signal in signals {
        match signal {
            TimelineSignal::EventFired(event) => debug!(
                event_id = %event.id,
                target_id = %event.target_id,
                at_us = at.as_micros(),
                "timeline event fired"
            ),
            TimelineSignal::Completed => debug!(at_us = at.as_micros(), "timeline completed"),
        }
    }
}
