//! Broadcast relay: typed messages fanned out to every subscriber.
//!
//! The relay decouples state computation from delivery. Producers call
//! [`Relay::send`] and move on; each WebSocket connection owns a broadcast
//! receiver and serializes messages at its own pace. A subscriber that
//! falls behind skips the missed messages, it never stalls the pump.

use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use liveset_core::Setlist;

const RELAY_CAPACITY: usize = 512;

/// One push-channel message. Serializes to `{"type": ..., ...payload}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageMessage {
    SongTime {
        time: f64,
    },
    IsPlaying {
        #[serde(rename = "isPlaying")]
        is_playing: bool,
    },
    Tempo {
        tempo: f64,
    },
    IsLooped {
        #[serde(rename = "isLooped")]
        is_looped: bool,
    },
    SongProgress {
        #[serde(rename = "songProgress")]
        song_progress: f64,
    },
    PartProgress {
        #[serde(rename = "partProgress")]
        part_progress: f64,
    },
    SelectedSongIndex {
        #[serde(rename = "songIndex")]
        song_index: i64,
    },
    SelectedPartIndex {
        #[serde(rename = "partIndex")]
        part_index: i64,
    },
    CuesUpdated {
        cues: Setlist,
    },
}

/// Fan-out handle. Cheap to clone; clones feed the same subscribers.
#[derive(Clone)]
pub struct Relay {
    sender: broadcast::Sender<StageMessage>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(RELAY_CAPACITY);
        Self { sender }
    }

    /// Broadcast to all current subscribers. Having none is not an error.
    pub fn send(&self, message: StageMessage) {
        let _ = self.sender.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StageMessage> {
        self.sender.subscribe()
    }

    /// Number of live subscribers, for logging.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Drive one WebSocket connection until the peer hangs up.
///
/// Messages are serialized per connection; a serialization failure drops
/// that one message, a socket failure ends the connection.
pub async fn serve_socket(mut socket: WebSocket, mut messages: broadcast::Receiver<StageMessage>) {
    loop {
        tokio::select! {
            received = messages.recv() => {
                let message = match received {
                    Ok(message) => message,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "push-channel subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%err, "failed to serialize push message");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                // Viewers only listen; anything inbound except close is ignored.
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    debug!("push-channel subscriber disconnected");
}
