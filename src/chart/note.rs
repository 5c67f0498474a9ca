//! Notes: the timed events stored in the chart

use crate::time::{BeatTime, BpmList};

/// A note is treated as always visible when its visible time reaches this
/// many seconds.
pub const VISIBLE_TIME_ALWAYS: f64 = 90000.0;

/// RGB tint, `[r, g, b]`
pub type Rgb = [u8; 3];

/// Identity handle assigned when a note enters a list; used to address the
/// note afterwards (removal, editing) without holding a reference into the
/// bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteId(pub u32);

/// Note kinds, with the wire codes used by the chart format.
///
/// Only holds have a meaningful end time; the other kinds are instantaneous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Tap,
    Hold,
    Flick,
    Drag,
}

impl NoteKind {
    /// Wire code, as stored in chart JSON
    pub fn code(self) -> u8 {
        match self {
            NoteKind::Tap => 1,
            NoteKind::Hold => 2,
            NoteKind::Flick => 3,
            NoteKind::Drag => 4,
        }
    }

    /// Decode a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(NoteKind::Tap),
            2 => Some(NoteKind::Hold),
            3 => Some(NoteKind::Flick),
            4 => Some(NoteKind::Drag),
            _ => None,
        }
    }
}

/// One timed occurrence on the timeline.
///
/// Invariant: `end_time >= start_time`, and `end_time == start_time` for
/// every kind except [`NoteKind::Hold`].
#[derive(Debug, Clone)]
pub struct Note {
    /// Assigned by the owning list on insertion; `None` until then
    pub id: Option<NoteId>,
    pub kind: NoteKind,
    pub start_time: BeatTime,
    pub end_time: BeatTime,
    /// Whether the note approaches from above the judge line
    pub above: bool,
    pub alpha: u8,
    /// Fake notes render but never judge
    pub is_fake: bool,
    /// x coordinate on the judge line
    pub position_x: f64,
    pub size: f64,
    pub speed: f64,
    /// Seconds before the hit at which the note becomes visible
    pub visible_time: Option<f64>,
    /// Beats before the hit at which the note becomes visible; derived from
    /// `visible_time` against a tempo map when absent
    pub visible_beats: Option<f64>,
    /// Absolute y offset from the judge line
    pub y_offset: f64,
    pub tint: Option<Rgb>,
    pub tint_hit_effects: Option<Rgb>,
    pub judge_size: f64,
}

impl Note {
    /// Create an instantaneous note at `start_time`
    pub fn new(kind: NoteKind, start_time: BeatTime) -> Self {
        Self {
            id: None,
            kind,
            start_time,
            end_time: start_time,
            above: true,
            alpha: 255,
            is_fake: false,
            position_x: 0.0,
            size: 1.0,
            speed: 1.0,
            visible_time: None,
            visible_beats: None,
            y_offset: 0.0,
            tint: None,
            tint_hit_effects: None,
            judge_size: 1.0,
        }
    }

    /// Create a hold sustained until `end_time`
    pub fn new_hold(start_time: BeatTime, end_time: BeatTime) -> Self {
        debug_assert!(end_time >= start_time);
        let mut note = Self::new(NoteKind::Hold, start_time);
        note.end_time = end_time;
        note
    }

    pub fn is_hold(&self) -> bool {
        self.kind == NoteKind::Hold
    }

    /// Copy of this note shifted by `offset`, with no identity yet
    pub fn clone_shifted(&self, offset: BeatTime) -> Self {
        let mut note = self.clone();
        note.id = None;
        note.start_time = self.start_time + offset;
        note.end_time = self.end_time + offset;
        note
    }

    /// Derive `visible_beats` from `visible_time` against a tempo map.
    ///
    /// A missing or very large visible time means the note is always
    /// visible.
    pub fn compute_visible_beats(&mut self, bpm: &BpmList) {
        let visible_time = match self.visible_time {
            Some(t) if t < VISIBLE_TIME_ALWAYS => t,
            _ => {
                self.visible_beats = None;
                return;
            }
        };
        let hit_beats = self.start_time.to_beats();
        let hit_seconds = bpm.time_at(hit_beats);
        let change_beats = bpm.beats_at(hit_seconds - visible_time);
        self.visible_beats = Some(hit_beats - change_beats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for kind in [NoteKind::Tap, NoteKind::Hold, NoteKind::Flick, NoteKind::Drag] {
            assert_eq!(NoteKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(NoteKind::from_code(0), None);
        assert_eq!(NoteKind::from_code(9), None);
    }

    #[test]
    fn test_instant_note_end_equals_start() {
        let t = BeatTime::new(3, 1, 2).unwrap();
        let note = Note::new(NoteKind::Flick, t);
        assert_eq!(note.end_time, note.start_time);
    }

    #[test]
    fn test_clone_shifted() {
        let mut note = Note::new_hold(BeatTime::from_beat(1), BeatTime::from_beat(3));
        note.id = Some(NoteId(7));
        let shifted = note.clone_shifted(BeatTime::new(0, 1, 2).unwrap());
        assert_eq!(shifted.start_time, BeatTime::new(1, 1, 2).unwrap());
        assert_eq!(shifted.end_time, BeatTime::new(3, 1, 2).unwrap());
        assert_eq!(shifted.id, None);
    }

    #[test]
    fn test_visible_beats_from_time() {
        let bpm = BpmList::default(); // 120 BPM, 0.5s per beat
        let mut note = Note::new(NoteKind::Tap, BeatTime::from_beat(8));
        note.visible_time = Some(1.0);
        note.compute_visible_beats(&bpm);
        // 1 second of lead time is 2 beats at 120 BPM
        assert!((note.visible_beats.unwrap() - 2.0).abs() < 1e-9);

        note.visible_time = Some(VISIBLE_TIME_ALWAYS);
        note.compute_visible_beats(&bpm);
        assert_eq!(note.visible_beats, None);
    }
}
