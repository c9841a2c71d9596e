//! The transport-capability seam.
//!
//! Everything the bridge needs from the DAW client library is expressed as
//! one trait so the rest of the crate never names a concrete transport. The
//! only implementation in-tree is [`crate::sim::SimTransport`]; a real DAW
//! link implements the same trait out of tree.

use std::future::Future;

use thiserror::Error;
use tokio::sync::broadcast;

use liveset_core::Marker;

/// Transport-side failures, surfaced unchanged to whichever operation
/// triggered the call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link was never started or the peer went away.
    #[error("transport link unavailable: {0}")]
    Unavailable(String),
    /// The peer answered but the command could not be applied.
    #[error("transport command failed: {0}")]
    Command(String),
}

/// State changes pushed by the transport, one per subscription message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// The playhead moved; time is in bars.
    SongTime(f64),
    IsPlaying(bool),
    Tempo(f64),
    LoopEnabled(bool),
}

/// Capabilities the bridge consumes from the DAW transport.
///
/// Methods return `Send` futures so generic callers can await them inside
/// spawned tasks. No call is retried and no timeout is imposed here; a hung
/// capability stalls only the command that issued it.
pub trait TransportLink: Send + Sync + 'static {
    /// Establish (or re-establish) the link. Safe to call repeatedly.
    fn start(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// The raw marker list, time-ascending.
    fn markers(&self) -> impl Future<Output = Result<Vec<Marker>, TransportError>> + Send;

    fn tempo(&self) -> impl Future<Output = Result<f64, TransportError>> + Send;

    fn loop_enabled(&self) -> impl Future<Output = Result<bool, TransportError>> + Send;

    fn set_loop_enabled(
        &self,
        enabled: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn set_loop_region(
        &self,
        start: f64,
        length: f64,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Move the playhead to the given marker.
    fn jump_to(&self, marker: &Marker) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn start_playing(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn stop_playing(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribe to the transport's push events.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}
