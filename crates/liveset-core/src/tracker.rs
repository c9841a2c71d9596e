//! Per-tick playback tracking.
//!
//! Every transport-time tick is mapped onto the current setlist: which song
//! and part the playhead is inside, how far through each it is, and whether
//! the tick landed on a song's end boundary (the auto-advance trigger).
//!
//! [`on_tick`] is a pure function of `(time, setlist)`. It *decides* an
//! advance but never executes one; stopping the transport and jumping to the
//! next song are the caller's side effects. That split keeps the state
//! machine assertable in unit tests without any channel or transport.

use crate::setlist::{Setlist, Song};

/// How an auto-advance crosses into the next song.
///
/// Current merge rules emit `does_stop = true` for every song, so
/// [`AdvanceTransition::StopAndJump`] is the only reachable transition
/// today. [`AdvanceTransition::ContinueAndJump`] is kept as a named
/// transition so a future merge-policy change does not have to rediscover
/// the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTransition {
    /// Stop playback, jump to the next song's start, then announce the new
    /// selection.
    StopAndJump,
    /// Announce the new selection, then jump without stopping.
    ContinueAndJump,
}

/// A decided advance to the next song.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// Index of the song to advance into. Always in bounds; a boundary hit
    /// on the final song decides no advance at all.
    pub next_index: usize,
    pub transition: AdvanceTransition,
}

/// Everything one tick derives from `(time, setlist)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TickUpdate {
    /// First song whose boundary contains `time`, if any.
    pub song_index: Option<usize>,
    /// First part of that song whose `[time, time + length)` window
    /// contains `time`, if any.
    pub part_index: Option<usize>,
    /// Progress through the song, 0-100. Zero when no song is selected or
    /// the song has zero length.
    pub song_progress: f64,
    /// Progress through the part, 0-100. Only present when a part is
    /// selected.
    pub part_progress: Option<f64>,
    /// Advance decided by this tick, if the end boundary was reached.
    pub advance: Option<Advance>,
}

/// Evaluate one transport-time tick against the setlist.
pub fn on_tick(time: f64, setlist: &Setlist) -> TickUpdate {
    let Some((song_index, song)) = locate_song(time, setlist) else {
        return TickUpdate {
            song_index: None,
            part_index: None,
            song_progress: 0.0,
            part_progress: None,
            advance: None,
        };
    };

    let part_index = song
        .parts
        .iter()
        .position(|part| part.time <= time && time < part.time + part.length);

    let song_progress = progress_pct(time - song.start_time(), song.length_in_bars);
    let part_progress =
        part_index.map(|i| progress_pct(time - song.parts[i].time, song.parts[i].length));

    TickUpdate {
        song_index: Some(song_index),
        part_index,
        song_progress,
        part_progress,
        advance: decide_advance(time, song_index, setlist),
    }
}

fn locate_song(time: f64, setlist: &Setlist) -> Option<(usize, &Song)> {
    setlist
        .iter()
        .enumerate()
        .find(|(_, song)| song.contains(time))
}

/// Progress as a percentage, with the zero-length case pinned to 0 so a
/// non-finite value never reaches subscribers.
fn progress_pct(elapsed: f64, length: f64) -> f64 {
    if length == 0.0 {
        0.0
    } else {
        elapsed / length * 100.0
    }
}

/// The end boundary counts as reached when the tick, rounded to the nearest
/// whole bar, equals the boundary time. A hit on the final song is absorbed
/// silently rather than surfaced.
fn decide_advance(time: f64, song_index: usize, setlist: &Setlist) -> Option<Advance> {
    let song = &setlist[song_index];
    if time.round() != song.end_time() {
        return None;
    }

    let next_index = song_index + 1;
    if next_index >= setlist.len() {
        return None;
    }

    let transition = if song.does_stop {
        AdvanceTransition::StopAndJump
    } else {
        AdvanceTransition::ContinueAndJump
    };

    Some(Advance {
        next_index,
        transition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::Marker;
    use crate::setlist::merge_cues;
    use approx::assert_relative_eq;

    fn m(name: &str, time: f64) -> Marker {
        Marker::new(name, time)
    }

    fn two_song_setlist() -> Setlist {
        merge_cues(&[
            m("First", 0.0),
            m("> Hook", 4.0),
            m("<end>", 16.0),
            m("Second", 20.0),
            m("<end>", 36.0),
        ])
    }

    #[test]
    fn tick_outside_all_boundaries_selects_nothing() {
        let setlist = two_song_setlist();
        let update = on_tick(18.0, &setlist);

        assert_eq!(update.song_index, None);
        assert_eq!(update.part_index, None);
        assert_relative_eq!(update.song_progress, 0.0);
        assert_eq!(update.part_progress, None);
        assert_eq!(update.advance, None);
    }

    #[test]
    fn tick_inside_song_and_part() {
        let setlist = two_song_setlist();
        let update = on_tick(8.0, &setlist);

        assert_eq!(update.song_index, Some(0));
        assert_eq!(update.part_index, Some(0));
        assert_relative_eq!(update.song_progress, 50.0);
        // Hook spans [4, 16), so 8.0 is a third through
        assert_relative_eq!(update.part_progress.unwrap(), 100.0 / 3.0, epsilon = 1e-9);
        assert_eq!(update.advance, None);
    }

    #[test]
    fn tick_inside_song_but_between_parts_selects_no_part() {
        let setlist = two_song_setlist();
        let update = on_tick(2.0, &setlist);

        assert_eq!(update.song_index, Some(0));
        assert_eq!(update.part_index, None);
        assert_eq!(update.part_progress, None);
    }

    #[test]
    fn part_window_is_half_open() {
        let setlist = merge_cues(&[m("Song", 0.0), m("> A", 4.0), m("> B", 8.0), m("<end>", 12.5)]);

        assert_eq!(on_tick(4.0, &setlist).part_index, Some(0));
        // A's window ends exactly where B's begins
        assert_eq!(on_tick(8.0, &setlist).part_index, Some(1));
    }

    #[test]
    fn end_boundary_decides_a_stop_and_jump_advance() {
        let setlist = two_song_setlist();
        let update = on_tick(16.0, &setlist);

        assert_eq!(update.song_index, Some(0));
        assert_eq!(
            update.advance,
            Some(Advance {
                next_index: 1,
                transition: AdvanceTransition::StopAndJump,
            })
        );
    }

    #[test]
    fn boundary_match_uses_rounded_time() {
        let setlist = two_song_setlist();

        assert!(on_tick(15.6, &setlist).advance.is_some());
        assert!(on_tick(15.4, &setlist).advance.is_none());
    }

    #[test]
    fn final_song_boundary_decides_no_advance() {
        let setlist = two_song_setlist();
        let update = on_tick(36.0, &setlist);

        assert_eq!(update.song_index, Some(1));
        assert_eq!(update.advance, None);
    }

    #[test]
    fn continue_transition_is_taken_when_does_stop_clears() {
        let mut setlist = two_song_setlist();
        setlist[0].does_stop = false;

        let update = on_tick(16.0, &setlist);
        assert_eq!(
            update.advance.unwrap().transition,
            AdvanceTransition::ContinueAndJump
        );
    }

    #[test]
    fn zero_length_song_reports_zero_progress() {
        let setlist = merge_cues(&[m("Flat", 8.0), m("<end>", 8.0)]);
        let update = on_tick(8.0, &setlist);

        assert_eq!(update.song_index, Some(0));
        assert_relative_eq!(update.song_progress, 0.0);
        assert!(update.song_progress.is_finite());
    }

    #[test]
    fn empty_setlist_is_stable() {
        let update = on_tick(3.0, &Setlist::new());
        assert_eq!(update.song_index, None);
        assert_eq!(update.advance, None);
    }

    #[test]
    fn boundary_times_select_the_song_inclusively() {
        let setlist = two_song_setlist();

        assert_eq!(on_tick(0.0, &setlist).song_index, Some(0));
        assert_eq!(on_tick(16.0, &setlist).song_index, Some(0));
        assert_eq!(on_tick(20.0, &setlist).song_index, Some(1));
    }
}
