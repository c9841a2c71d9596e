//! Setlist model and playback tracking for the live-set bridge.
//!
//! A DAW transport exposes a flat, time-ordered list of named markers. This
//! crate turns that list into a structured setlist (songs bounded by an
//! `<end>` marker, with `>`-prefixed part cues nested inside) and maps a
//! continuously advancing transport time onto that structure.
//!
//! # Modules
//!
//! - [`marker`] - raw marker type and the bracketed-metadata parser
//! - [`setlist`] - the merged model and the cue-merging pass
//! - [`tracker`] - per-tick selection/progress computation and auto-advance
//!
//! Everything here is synchronous and side-effect free (apart from log
//! output), so the merge and the tracker can be exercised directly in unit
//! tests without a transport or a delivery channel.

pub mod marker;
pub mod setlist;
pub mod tracker;

pub use marker::{extract_info, AdditionalInfo, Marker};
pub use setlist::{merge_cues, PartCue, SelectionError, Setlist, Song};
pub use tracker::{on_tick, Advance, AdvanceTransition, TickUpdate};
