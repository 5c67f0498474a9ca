//! Top-level owner of a track group and its global index
//!
//! Every bucket created through the store is mirrored into the global merge
//! index in the same synchronous mutation, so a cross-track query issued
//! right after an insert already sees it.

use super::chain::NodeId;
use super::global::{BucketRef, GlobalList, MergeNode};
use super::list::NoteList;
use super::note::{Note, NoteId};
use crate::error::{Error, Result};
use crate::time::BeatTime;

#[derive(Debug)]
pub struct ChartStore {
    tracks: Vec<NoteList>,
    global: GlobalList,
}

impl ChartStore {
    pub fn new(effective_beats: f64) -> Self {
        Self {
            tracks: Vec::new(),
            global: GlobalList::new(effective_beats),
        }
    }

    pub fn effective_beats(&self) -> f64 {
        self.global.effective_beats()
    }

    pub fn tracks(&self) -> &[NoteList] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, index: usize) -> Result<&NoteList> {
        self.tracks.get(index).ok_or(Error::TrackNotFound(index))
    }

    pub fn track_mut(&mut self, index: usize) -> Result<&mut NoteList> {
        self.tracks.get_mut(index).ok_or(Error::TrackNotFound(index))
    }

    pub fn global(&self) -> &GlobalList {
        &self.global
    }

    /// Adopt a track. Buckets it already holds (a loaded list, say) are
    /// registered into the global index on the way in.
    pub fn add_track(&mut self, list: NoteList) -> usize {
        let track = self.tracks.len();
        for (node, bucket) in list.iter() {
            self.global.add_bucket(
                BucketRef { track, node },
                bucket.start_time(),
                list.is_sustained(),
            );
        }
        self.tracks.push(list);
        track
    }

    /// Get or create a bucket on one track, mirroring a creation into the
    /// global index
    pub fn node_of(&mut self, track: usize, time: BeatTime) -> Result<NodeId> {
        let list = self
            .tracks
            .get_mut(track)
            .ok_or(Error::TrackNotFound(track))?;
        let sustained = list.is_sustained();
        let (node, created) = list.node_of(time);
        if created {
            self.global
                .add_bucket(BucketRef { track, node }, time, sustained);
        }
        Ok(node)
    }

    pub fn add(&mut self, track: usize, note: Note) -> Result<NoteId> {
        let node = self.node_of(track, note.start_time)?;
        Ok(self.tracks[track].insert_at(node, note))
    }

    pub fn remove(&mut self, track: usize, note: &Note) -> Result<Option<Note>> {
        let list = self
            .tracks
            .get_mut(track)
            .ok_or(Error::TrackNotFound(track))?;
        Ok(list.remove(note))
    }

    pub fn node_at(&self, track: usize, beats: f64, before_end: bool) -> Result<NodeId> {
        Ok(self.track(track)?.node_at(beats, before_end))
    }

    /// End time of a global entry, resolved against the owned tracks
    pub fn global_end_time(&self, entry: &MergeNode) -> BeatTime {
        entry.end_time(&self.tracks)
    }

    /// Seed every acceleration index (after a bulk load)
    pub fn init_jumps(&mut self) {
        for track in &mut self.tracks {
            track.init_jump();
        }
        self.global.init_jump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::list::ListKind;
    use crate::chart::note::NoteKind;

    fn beat(b: i32) -> BeatTime {
        BeatTime::from_beat(b)
    }

    fn store_with_two_tracks() -> ChartStore {
        let mut store = ChartStore::new(16.0);
        let mut taps = NoteList::new(ListKind::Instant, 1.0, 0.0, Some(16.0));
        taps.init_jump();
        let mut holds = NoteList::new(ListKind::Sustained, 1.0, 0.0, Some(16.0));
        holds.init_jump();
        store.add_track(taps);
        store.add_track(holds);
        store
    }

    #[test]
    fn test_insert_mirrors_into_global() {
        let mut store = store_with_two_tracks();
        store.add(0, Note::new(NoteKind::Tap, beat(2))).unwrap();
        store.add(1, Note::new_hold(beat(2), beat(7))).unwrap();
        store.add(0, Note::new(NoteKind::Drag, beat(5))).unwrap();

        // Beat 2 merges both tracks into one entry; beat 5 gets its own
        assert_eq!(store.global().len(), 2);
        let at = store.global().node_at(2.0);
        let entry = store.global().entry(at).unwrap();
        assert_eq!(entry.note_buckets().len(), 1);
        assert_eq!(entry.hold_buckets().len(), 1);
        assert_eq!(store.global_end_time(entry), beat(7));
    }

    #[test]
    fn test_second_insert_at_same_time_does_not_duplicate() {
        let mut store = store_with_two_tracks();
        store.add(0, Note::new(NoteKind::Tap, beat(3))).unwrap();
        store.add(0, Note::new(NoteKind::Flick, beat(3))).unwrap();

        assert_eq!(store.global().len(), 1);
        let entry = store.global().entry(store.global().node_at(3.0)).unwrap();
        assert_eq!(entry.note_buckets().len(), 1);
        assert_eq!(store.track(0).unwrap().len(), 1);
    }

    #[test]
    fn test_adopting_a_loaded_track_registers_buckets() {
        let mut list = NoteList::new(ListKind::Instant, 1.0, 0.0, Some(16.0));
        list.init_jump();
        list.add(Note::new(NoteKind::Tap, beat(1)));
        list.add(Note::new(NoteKind::Tap, beat(4)));

        let mut store = ChartStore::new(16.0);
        store.add_track(list);
        assert_eq!(store.global().len(), 2);
    }

    #[test]
    fn test_unknown_track_errors() {
        let mut store = ChartStore::new(16.0);
        assert!(matches!(
            store.add(0, Note::new(NoteKind::Tap, beat(1))),
            Err(Error::TrackNotFound(0))
        ));
        assert!(store.node_at(3, 1.0, false).is_err());
    }
}
