//! In-process simulated transport.
//!
//! Stands in for a real DAW link: holds the timeline state behind a mutex,
//! pushes the same event stream a live transport would, and can be driven
//! either by tests (explicit [`SimTransport::tick`] calls) or by the bundled
//! driver task that advances the playhead in real time while "playing".

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use liveset_core::Marker;

use crate::transport::{TransportError, TransportEvent, TransportLink};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct SimState {
    started: bool,
    time: f64,
    playing: bool,
    tempo: f64,
    looped: bool,
    loop_start: f64,
    loop_length: f64,
    markers: Vec<Marker>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            started: false,
            time: 0.0,
            playing: false,
            tempo: 120.0,
            looped: false,
            loop_start: 0.0,
            loop_length: 0.0,
            markers: Vec::new(),
        }
    }
}

/// Simulated DAW transport. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SimTransport {
    state: Arc<Mutex<SimState>>,
    events: broadcast::Sender<TransportEvent>,
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
            events,
        }
    }

    /// Replace the simulated marker list.
    pub fn set_markers(&self, markers: Vec<Marker>) {
        self.state.lock().markers = markers;
    }

    /// Move the playhead and push the matching time event, exactly as a
    /// live transport reports a position change.
    pub fn tick(&self, time: f64) {
        self.state.lock().time = time;
        self.emit(TransportEvent::SongTime(time));
    }

    /// Current playhead position in bars.
    pub fn time(&self) -> f64 {
        self.state.lock().time
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn loop_region(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.loop_start, state.loop_length)
    }

    /// Advance the playhead in real time while playing. `period` is the
    /// wall-clock spacing of ticks; the distance covered per tick follows
    /// the simulated tempo (bars of 4 beats).
    pub async fn drive(self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let next = {
                let mut state = self.state.lock();
                if !state.playing {
                    continue;
                }
                let bars_per_sec = state.tempo / 60.0 / 4.0;
                state.time += bars_per_sec * period.as_secs_f64();
                state.time
            };
            self.emit(TransportEvent::SongTime(next));
        }
    }

    fn emit(&self, event: TransportEvent) {
        // Nobody listening yet is fine.
        let _ = self.events.send(event);
    }

    fn ensure_started(&self) -> Result<(), TransportError> {
        if self.state.lock().started {
            Ok(())
        } else {
            Err(TransportError::Unavailable(
                "simulated link not started".into(),
            ))
        }
    }
}

impl TransportLink for SimTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.started {
            debug!("simulated transport link started");
            state.started = true;
        }
        Ok(())
    }

    async fn markers(&self) -> Result<Vec<Marker>, TransportError> {
        self.ensure_started()?;
        Ok(self.state.lock().markers.clone())
    }

    async fn tempo(&self) -> Result<f64, TransportError> {
        self.ensure_started()?;
        Ok(self.state.lock().tempo)
    }

    async fn loop_enabled(&self) -> Result<bool, TransportError> {
        self.ensure_started()?;
        Ok(self.state.lock().looped)
    }

    async fn set_loop_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.ensure_started()?;
        self.state.lock().looped = enabled;
        self.emit(TransportEvent::LoopEnabled(enabled));
        Ok(())
    }

    async fn set_loop_region(&self, start: f64, length: f64) -> Result<(), TransportError> {
        self.ensure_started()?;
        let mut state = self.state.lock();
        state.loop_start = start;
        state.loop_length = length;
        Ok(())
    }

    async fn jump_to(&self, marker: &Marker) -> Result<(), TransportError> {
        self.ensure_started()?;
        debug!(name = %marker.name, time = marker.time, "jump");
        self.state.lock().time = marker.time;
        self.emit(TransportEvent::SongTime(marker.time));
        Ok(())
    }

    async fn start_playing(&self) -> Result<(), TransportError> {
        self.ensure_started()?;
        self.state.lock().playing = true;
        self.emit(TransportEvent::IsPlaying(true));
        Ok(())
    }

    async fn stop_playing(&self) -> Result<(), TransportError> {
        self.ensure_started()?;
        self.state.lock().playing = false;
        self.emit(TransportEvent::IsPlaying(false));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn calls_before_start_are_rejected() {
        let sim = SimTransport::new();
        assert!(matches!(
            sim.markers().await,
            Err(TransportError::Unavailable(_))
        ));

        sim.start().await.unwrap();
        assert!(sim.markers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn jump_moves_the_playhead_and_emits_a_tick() {
        let sim = SimTransport::new();
        sim.start().await.unwrap();
        let mut events = sim.subscribe();

        sim.jump_to(&Marker::new("Second", 20.0)).await.unwrap();

        assert_eq!(sim.time(), 20.0);
        assert_eq!(events.recv().await.unwrap(), TransportEvent::SongTime(20.0));
    }

    #[tokio::test]
    async fn play_state_round_trips() {
        let sim = SimTransport::new();
        sim.start().await.unwrap();

        sim.start_playing().await.unwrap();
        assert!(sim.is_playing());
        sim.stop_playing().await.unwrap();
        assert!(!sim.is_playing());
    }
}
