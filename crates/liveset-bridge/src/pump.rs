//! The tick event pump.
//!
//! One task consumes the transport's push events for the lifetime of the
//! process. Play-state, tempo and loop changes map straight onto relay
//! messages; a time tick additionally runs the tracker against the current
//! setlist snapshot and, when a song's end boundary is reached, executes
//! the decided advance against the transport.
//!
//! Ordering per tick mirrors the wire contract: `song_time`, then
//! `song_progress`, `part_progress` (only with a selected part),
//! `selected_song_index`, `selected_part_index`, then any advance.

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use liveset_core::tracker::{on_tick, Advance, AdvanceTransition};
use liveset_core::Setlist;

use crate::relay::StageMessage;
use crate::state::AppState;
use crate::transport::{TransportEvent, TransportLink};

/// Run the pump until the transport's event channel closes.
pub async fn run<L: TransportLink>(app: AppState<L>) {
    let mut events = app.transport.subscribe();
    info!("tick pump running");

    loop {
        match events.recv().await {
            Ok(event) => handle_event(&app, event).await,
            Err(RecvError::Lagged(skipped)) => {
                // Stale ticks are worthless; resume with the next one.
                warn!(skipped, "tick pump lagged behind the transport");
            }
            Err(RecvError::Closed) => {
                info!("transport event channel closed, tick pump stopping");
                break;
            }
        }
    }
}

/// Fold one transport event into the relay (and, for time ticks, the
/// tracker + auto-advance).
pub async fn handle_event<L: TransportLink>(app: &AppState<L>, event: TransportEvent) {
    match event {
        TransportEvent::IsPlaying(is_playing) => {
            app.relay.send(StageMessage::IsPlaying { is_playing });
        }
        TransportEvent::Tempo(tempo) => {
            app.relay.send(StageMessage::Tempo { tempo });
        }
        TransportEvent::LoopEnabled(is_looped) => {
            app.relay.send(StageMessage::IsLooped { is_looped });
        }
        TransportEvent::SongTime(time) => {
            app.relay.send(StageMessage::SongTime { time });

            let setlist = app.setlist.load();
            let update = on_tick(time, &setlist);

            app.relay.send(StageMessage::SongProgress {
                song_progress: update.song_progress,
            });
            if let Some(part_progress) = update.part_progress {
                app.relay.send(StageMessage::PartProgress { part_progress });
            }
            app.relay.send(StageMessage::SelectedSongIndex {
                song_index: as_wire_index(update.song_index),
            });
            app.relay.send(StageMessage::SelectedPartIndex {
                part_index: as_wire_index(update.part_index),
            });

            if let Some(advance) = update.advance {
                execute_advance(app, &setlist, advance).await;
            }
        }
    }
}

/// `-1` is the wire sentinel for "nothing selected".
fn as_wire_index(index: Option<usize>) -> i64 {
    index.map_or(-1, |i| i as i64)
}

/// Carry out a decided advance. Driven by internal tick logic, so transport
/// failures are logged and absorbed rather than surfaced.
async fn execute_advance<L: TransportLink>(app: &AppState<L>, setlist: &Setlist, advance: Advance) {
    let next_start = setlist[advance.next_index].boundary[0].clone();
    let announce = StageMessage::SelectedSongIndex {
        song_index: advance.next_index as i64,
    };

    match advance.transition {
        AdvanceTransition::StopAndJump => {
            if let Err(err) = app.transport.stop_playing().await {
                warn!(%err, "auto-advance: stop failed");
            }
            if let Err(err) = app.transport.jump_to(&next_start).await {
                warn!(%err, "auto-advance: jump failed");
            }
            app.relay.send(announce);
        }
        AdvanceTransition::ContinueAndJump => {
            app.relay.send(announce);
            if let Err(err) = app.transport.jump_to(&next_start).await {
                warn!(%err, "auto-advance: jump failed");
            }
        }
    }
}
