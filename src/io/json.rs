//! JSON records for the persisted chart shape
//!
//! Wire names are camelCase and beat positions are `[beat, num, den]`
//! triples, matching the chart format the editor reads and writes.

use crate::chart::{ChartStore, ListKind, Note, NoteKind, NoteList, Rgb};
use crate::time::{BeatTime, BpmList};
use serde::{Deserialize, Serialize};

fn default_alpha() -> u8 {
    255
}

fn default_one() -> f64 {
    1.0
}

/// One note as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteJson {
    #[serde(rename = "type")]
    pub kind: u8,
    pub above: u8,
    #[serde(default = "default_alpha")]
    pub alpha: u8,
    pub start_time: BeatTime,
    pub end_time: BeatTime,
    #[serde(default)]
    pub is_fake: u8,
    pub position_x: f64,
    #[serde(default = "default_one")]
    pub size: f64,
    #[serde(default = "default_one")]
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_beats: Option<f64>,
    /// y offset relative to note speed, as older records store it
    #[serde(default)]
    pub y_offset: f64,
    /// Absolute y offset; newer records carry it directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_y_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint_hit_effects: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_size: Option<f64>,
}

impl From<&Note> for NoteJson {
    fn from(note: &Note) -> Self {
        let y_offset = if note.speed != 0.0 {
            note.y_offset / note.speed
        } else {
            note.y_offset
        };
        Self {
            kind: note.kind.code(),
            above: note.above as u8,
            alpha: note.alpha,
            start_time: note.start_time,
            end_time: note.end_time,
            is_fake: note.is_fake as u8,
            position_x: note.position_x,
            size: note.size,
            speed: note.speed,
            visible_time: note.visible_time,
            visible_beats: note.visible_beats,
            y_offset,
            absolute_y_offset: Some(note.y_offset),
            tint: note.tint,
            tint_hit_effects: note.tint_hit_effects,
            judge_size: (note.judge_size != note.size).then_some(note.judge_size),
        }
    }
}

impl NoteJson {
    /// Rebuild the in-memory note. Unknown kind codes and inverted hold
    /// ranges are logged and repaired rather than refused.
    pub fn into_note(self) -> Note {
        let kind = NoteKind::from_code(self.kind).unwrap_or_else(|| {
            log::warn!("unknown note type {}; treating as tap", self.kind);
            NoteKind::Tap
        });
        let mut note = Note::new(kind, self.start_time);
        if note.is_hold() {
            if self.end_time < self.start_time {
                log::warn!(
                    "hold at {} ends before it starts ({}); clamping",
                    self.start_time,
                    self.end_time
                );
            } else {
                note.end_time = self.end_time;
            }
        }
        note.above = self.above == 1;
        note.alpha = self.alpha;
        note.is_fake = self.is_fake != 0;
        note.position_x = self.position_x;
        note.size = self.size;
        note.speed = self.speed;
        note.visible_time = self.visible_time;
        note.visible_beats = self.visible_beats;
        note.y_offset = self
            .absolute_y_offset
            .unwrap_or(self.y_offset * self.speed);
        note.tint = self.tint;
        note.tint_hit_effects = self.tint_hit_effects;
        note.judge_size = self.judge_size.unwrap_or(self.size);
        note
    }
}

/// One bucket as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeJson {
    pub start_time: BeatTime,
    pub notes: Vec<NoteJson>,
}

/// One track list as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackJson {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub speed: f64,
    #[serde(default)]
    pub median_y_offset: f64,
    pub note_nodes: Vec<NodeJson>,
}

impl TrackJson {
    pub fn from_list(list: &NoteList) -> Self {
        let note_nodes = list
            .iter()
            .map(|(_, bucket)| NodeJson {
                start_time: bucket.start_time(),
                notes: bucket.notes().iter().map(NoteJson::from).collect(),
            })
            .collect();
        Self {
            id: list.id.clone(),
            speed: list.speed,
            median_y_offset: list.median_y_offset,
            note_nodes,
        }
    }

    /// Rebuild a list with identical chain order and a freshly seeded index.
    ///
    /// `effective_beats` falls back to the last bucket's end time when
    /// `None`; notes without a visibility window in beats get it derived
    /// from the timebase.
    pub fn into_list(self, kind: ListKind, effective_beats: Option<f64>, bpm: &BpmList) -> NoteList {
        let mut list = NoteList::new(kind, self.speed, self.median_y_offset, effective_beats);
        list.id = self.id;
        for node in self.note_nodes {
            let notes = node
                .notes
                .into_iter()
                .map(|record| {
                    let mut note = record.into_note();
                    if note.visible_beats.is_none() && note.visible_time.is_some() {
                        note.compute_visible_beats(bpm);
                    }
                    note
                })
                .collect();
            list.append_bucket(node.start_time, notes);
        }
        list.init_jump();
        list
    }
}

impl NoteList {
    /// Persist this track to its wire record
    pub fn dump(&self) -> TrackJson {
        TrackJson::from_list(self)
    }

    /// Rebuild a track from its wire record; see [`TrackJson::into_list`]
    pub fn load(
        record: TrackJson,
        kind: ListKind,
        effective_beats: Option<f64>,
        bpm: &BpmList,
    ) -> Self {
        record.into_list(kind, effective_beats, bpm)
    }
}

/// One tempo change as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BpmJson {
    pub start_time: BeatTime,
    pub bpm: f64,
}

/// A whole track group as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bpm_list: Vec<BpmJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_beats: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note_lists: Vec<TrackJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hold_lists: Vec<TrackJson>,
}

impl GroupJson {
    /// Timebase declared by the record
    pub fn bpm(&self) -> BpmList {
        let changes: Vec<(BeatTime, f64)> = self
            .bpm_list
            .iter()
            .map(|b| (b.start_time, b.bpm))
            .collect();
        BpmList::new(&changes)
    }

    /// Build the store: every track rebuilt, every bucket mirrored into the
    /// global index. The span falls back to the latest end time any record
    /// mentions.
    pub fn into_store(self) -> ChartStore {
        let bpm = self.bpm();
        let span = self
            .effective_beats
            .unwrap_or_else(|| record_span(self.note_lists.iter().chain(self.hold_lists.iter())));
        let mut store = ChartStore::new(span);
        for record in self.note_lists {
            store.add_track(record.into_list(ListKind::Instant, Some(span), &bpm));
        }
        for record in self.hold_lists {
            store.add_track(record.into_list(ListKind::Sustained, Some(span), &bpm));
        }
        store
    }

    pub fn from_store(store: &ChartStore, bpm_list: Vec<BpmJson>) -> Self {
        let mut note_lists = Vec::new();
        let mut hold_lists = Vec::new();
        for track in store.tracks() {
            let record = track.dump();
            if track.is_sustained() {
                hold_lists.push(record);
            } else {
                note_lists.push(record);
            }
        }
        Self {
            bpm_list,
            effective_beats: Some(store.effective_beats()),
            note_lists,
            hold_lists,
        }
    }
}

/// Latest end beat any record's last bucket reaches
fn record_span<'a>(tracks: impl Iterator<Item = &'a TrackJson>) -> f64 {
    let mut span = 0.0f64;
    for track in tracks {
        if let Some(node) = track.note_nodes.last() {
            let mut end = node.start_time;
            for note in &node.notes {
                if note.end_time > end {
                    end = note.end_time;
                }
            }
            span = span.max(end.to_beats());
        }
    }
    span
}
