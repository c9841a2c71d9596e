//! Bridge between a DAW transport and remote setlist viewers.
//!
//! The transport collaborator pushes time/playing/tempo/loop events; the
//! bridge folds each time tick through the tracker in [`liveset-core`] and
//! fans the derived state out to every WebSocket subscriber as typed JSON
//! messages. A small HTTP surface lets viewers trigger the marker fetch,
//! reorder the setlist, reposition playback and drive the loop settings.
//!
//! ```text
//! TransportLink events ──> pump ──> Relay ──> ws subscribers
//!        ▲                   │
//!        │              SetlistCell
//!        │                   ▲
//!        └──── routes ───────┘
//! ```
//!
//! [`liveset-core`]: liveset_core

pub mod pump;
pub mod relay;
pub mod routes;
pub mod sim;
pub mod state;
pub mod transport;

pub use relay::{Relay, StageMessage};
pub use sim::SimTransport;
pub use state::{AppState, SetlistCell};
pub use transport::{TransportError, TransportEvent, TransportLink};
