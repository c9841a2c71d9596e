//! The merged setlist model and the cue-merging pass.
//!
//! Merging is a single left-to-right walk over the raw marker list. Three
//! marker shapes drive it:
//!
//! - a name containing `<end>` closes the currently open song,
//! - a name starting with `>` contributes a part cue,
//! - anything else opens a new song (silently discarding an unclosed one).
//!
//! A song that never meets its `<end>` is dropped, as is an `<end>` with no
//! open song. Both are ordinary conditions on a half-edited timeline, not
//! errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marker::{
    bpm_from_info, display_name, extract_info, part_display_name, AdditionalInfo, Marker,
};

/// Token that closes the currently open song.
const END_TOKEN: &str = "<end>";

/// Prefix marking a part cue.
const PART_PREFIX: &str = ">";

/// A named sub-section inside a song.
///
/// `length` is the distance to the *next marker in the raw sequence*,
/// whatever its type, not to the next part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCue {
    pub name: String,
    pub time: f64,
    pub length: f64,
}

impl PartCue {
    /// The marker to jump to when this part is selected.
    pub fn as_marker(&self) -> Marker {
        Marker::new(self.name.clone(), self.time)
    }
}

/// A merged song: an opening marker, its `<end>` marker, and everything
/// derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Opening and closing markers, in that order.
    pub boundary: [Marker; 2],
    /// Metadata lifted from the opening marker's bracketed fragment.
    pub additional_info: AdditionalInfo,
    /// Whether playback stops when this song's end boundary is reached.
    /// The merge emits `true` unconditionally; the field exists so the
    /// continue-without-stopping transition stays expressible.
    pub does_stop: bool,
    pub length_in_bars: f64,
    pub length_in_seconds: f64,
    /// Part cues in time order.
    pub parts: Vec<PartCue>,
}

impl Song {
    pub fn start_time(&self) -> f64 {
        self.boundary[0].time
    }

    pub fn end_time(&self) -> f64 {
        self.boundary[1].time
    }

    /// Whether `time` falls inside this song's boundary (both ends
    /// inclusive, matching the tracker's selection rule).
    pub fn contains(&self, time: f64) -> bool {
        self.start_time() <= time && time <= self.end_time()
    }
}

/// The ordered sequence of songs currently considered "the show".
pub type Setlist = Vec<Song>;

/// Rejected jump coordinates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("song index {index} out of range for setlist of {len}")]
    SongIndex { index: i64, len: usize },
    #[error("part index {index} out of range for song with {len} parts")]
    PartIndex { index: i64, len: usize },
}

/// Resolve a `(song, part)` selection to the marker a jump should target.
///
/// A `part_index` of `-1` means "the song's opening marker". Bounds are
/// checked here so a bad request never reaches the transport.
pub fn jump_target(
    setlist: &Setlist,
    song_index: i64,
    part_index: i64,
) -> Result<Marker, SelectionError> {
    let song = usize::try_from(song_index)
        .ok()
        .and_then(|i| setlist.get(i))
        .ok_or(SelectionError::SongIndex {
            index: song_index,
            len: setlist.len(),
        })?;

    if part_index == -1 {
        return Ok(song.boundary[0].clone());
    }

    usize::try_from(part_index)
        .ok()
        .and_then(|i| song.parts.get(i))
        .map(PartCue::as_marker)
        .ok_or(SelectionError::PartIndex {
            index: part_index,
            len: song.parts.len(),
        })
}

/// Merge a flat marker list into a setlist.
///
/// Single pass; stable for empty input; never fails. Malformed tempo
/// metadata falls back to the 120 BPM default inside [`bpm_from_info`].
pub fn merge_cues(markers: &[Marker]) -> Setlist {
    let mut songs = Setlist::new();
    let mut open_song: Option<&Marker> = None;
    let mut open_parts: Vec<PartCue> = Vec::new();

    for (index, marker) in markers.iter().enumerate() {
        if marker.name.contains(END_TOKEN) {
            if let Some(opener) = open_song.take() {
                songs.push(close_song(opener, marker, std::mem::take(&mut open_parts)));
            }
            // An <end> with nothing open is dropped.
        } else if marker.name.starts_with(PART_PREFIX) {
            // The final marker has nothing to measure a length against.
            if let Some(next) = markers.get(index + 1) {
                open_parts.push(PartCue {
                    name: part_display_name(&marker.name),
                    time: marker.time,
                    length: next.time - marker.time,
                });
            }
        } else {
            // Re-opening discards a previous unclosed song without emitting it.
            open_song = Some(marker);
        }
    }

    songs
}

fn close_song(opener: &Marker, end: &Marker, parts: Vec<PartCue>) -> Song {
    let additional_info = extract_info(&opener.name);
    let bpm = bpm_from_info(&additional_info);

    let length_in_bars = end.time - opener.time;
    let length_in_seconds = length_in_bars / (f64::from(bpm) / 60.0);

    let start = Marker::new(display_name(&opener.name), opener.time);

    Song {
        boundary: [start, end.clone()],
        additional_info,
        does_stop: true,
        length_in_bars,
        length_in_seconds,
        parts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn m(name: &str, time: f64) -> Marker {
        Marker::new(name, time)
    }

    #[test]
    fn empty_input_yields_empty_setlist() {
        assert!(merge_cues(&[]).is_empty());
    }

    #[test]
    fn markers_without_end_or_parts_yield_empty_setlist() {
        let markers = vec![m("Intro", 0.0), m("Anthem", 16.0), m("Outro", 48.0)];
        assert!(merge_cues(&markers).is_empty());
    }

    #[test]
    fn single_song_with_default_tempo() {
        let markers = vec![m("Intro", 0.0), m("<end>", 16.0)];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist.len(), 1);
        let song = &setlist[0];
        assert_eq!(song.boundary[0], m("Intro", 0.0));
        assert_eq!(song.boundary[1], m("<end>", 16.0));
        assert_relative_eq!(song.length_in_bars, 16.0);
        // 120 BPM default: 2 bars per second
        assert_relative_eq!(song.length_in_seconds, 8.0);
        assert!(song.parts.is_empty());
        assert!(song.does_stop);
    }

    #[test]
    fn tempo_fragment_and_part_cue() {
        let markers = vec![
            m(r#"Verse{"tempo":"140BPM"}"#, 0.0),
            m("> Hook", 4.0),
            m("<end>", 8.0),
        ];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist.len(), 1);
        let song = &setlist[0];
        assert_eq!(song.boundary[0].name, "Verse");
        assert_relative_eq!(song.length_in_bars, 8.0);
        assert_relative_eq!(song.length_in_seconds, 8.0 / (140.0 / 60.0), epsilon = 1e-9);

        assert_eq!(song.parts.len(), 1);
        assert_eq!(song.parts[0].name, "Hook");
        assert_relative_eq!(song.parts[0].length, 4.0);
    }

    #[test]
    fn part_length_measures_to_next_marker_of_any_type() {
        let markers = vec![
            m("Song", 0.0),
            m("> Build", 2.0),
            m("> Drop", 6.0),
            m("<end>", 16.0),
        ];
        let setlist = merge_cues(&markers);

        let parts = &setlist[0].parts;
        assert_eq!(parts.len(), 2);
        assert_relative_eq!(parts[0].length, 4.0); // to the next part
        assert_relative_eq!(parts[1].length, 10.0); // to the <end>
    }

    #[test]
    fn trailing_part_marker_is_ignored() {
        let markers = vec![m("Song", 0.0), m("<end>", 8.0), m("> Tail", 12.0)];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist.len(), 1);
        assert!(setlist[0].parts.is_empty());
    }

    #[test]
    fn orphan_end_is_dropped() {
        let markers = vec![m("<end>", 4.0), m("Song", 8.0), m("<end>", 16.0)];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist.len(), 1);
        assert_eq!(setlist[0].boundary[0].name, "Song");
    }

    #[test]
    fn reopening_discards_the_unclosed_song() {
        let markers = vec![m("Abandoned", 0.0), m("Kept", 8.0), m("<end>", 16.0)];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist.len(), 1);
        assert_eq!(setlist[0].boundary[0].name, "Kept");
        assert_relative_eq!(setlist[0].length_in_bars, 8.0);
    }

    #[test]
    fn malformed_tempo_falls_back_to_default() {
        let markers = vec![m(r#"Song{"tempo":"???"}"#, 0.0), m("<end>", 8.0)];
        let setlist = merge_cues(&markers);

        // 120 BPM fallback: 2 bars per second
        assert_relative_eq!(setlist[0].length_in_seconds, 4.0);
    }

    #[test]
    fn unbalanced_fragment_keeps_opening_name() {
        let markers = vec![m("Song{oops", 0.0), m("<end>", 8.0)];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist[0].boundary[0].name, "Song{oops");
        assert!(setlist[0].additional_info.is_empty());
    }

    #[test]
    fn two_songs_in_sequence() {
        let markers = vec![
            m("First", 0.0),
            m("<end>", 16.0),
            m("Second", 16.0),
            m("> Bridge", 24.0),
            m("<end>", 32.0),
        ];
        let setlist = merge_cues(&markers);

        assert_eq!(setlist.len(), 2);
        assert_eq!(setlist[0].boundary[0].name, "First");
        assert_eq!(setlist[1].boundary[0].name, "Second");
        assert_eq!(setlist[1].parts.len(), 1);
        assert_eq!(setlist[1].parts[0].name, "Bridge");
    }

    #[test]
    fn jump_target_resolves_song_and_part() {
        let markers = vec![m("Song", 0.0), m("> Hook", 4.0), m("<end>", 8.0)];
        let setlist = merge_cues(&markers);

        let start = jump_target(&setlist, 0, -1).unwrap();
        assert_relative_eq!(start.time, 0.0);

        let part = jump_target(&setlist, 0, 0).unwrap();
        assert_eq!(part.name, "Hook");
        assert_relative_eq!(part.time, 4.0);
    }

    #[test]
    fn jump_target_rejects_bad_indices() {
        let markers = vec![m("Song", 0.0), m("<end>", 8.0)];
        let setlist = merge_cues(&markers);

        assert_eq!(
            jump_target(&setlist, 1, -1),
            Err(SelectionError::SongIndex { index: 1, len: 1 })
        );
        assert_eq!(
            jump_target(&setlist, -1, -1),
            Err(SelectionError::SongIndex { index: -1, len: 1 })
        );
        assert_eq!(
            jump_target(&setlist, 0, 0),
            Err(SelectionError::PartIndex { index: 0, len: 0 })
        );
        assert_eq!(
            jump_target(&setlist, 0, -2),
            Err(SelectionError::PartIndex { index: -2, len: 0 })
        );
    }
}
