//! Global merge index: every track's buckets, merged by start time
//!
//! Answers "what is happening anywhere in the group at beat B" without
//! iterating every track. Entries reference buckets by `(track, node)`
//! handle; the tracks themselves stay the exclusive owners.

use super::chain::{Chain, NodeData, NodeId};
use super::jump::{JumpArray, Step};
use super::list::NoteList;
use crate::time::BeatTime;

/// Handle to one bucket inside one track's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRef {
    pub track: usize,
    pub node: NodeId,
}

/// One merge entry: all buckets across the group sharing a start time,
/// split by whether their track sustains
#[derive(Debug)]
pub struct MergeNode {
    start_time: BeatTime,
    note_buckets: Vec<BucketRef>,
    hold_buckets: Vec<BucketRef>,
}

impl MergeNode {
    fn new(start_time: BeatTime) -> Self {
        Self {
            start_time,
            note_buckets: Vec::new(),
            hold_buckets: Vec::new(),
        }
    }

    pub fn start_time(&self) -> BeatTime {
        self.start_time
    }

    pub fn note_buckets(&self) -> &[BucketRef] {
        &self.note_buckets
    }

    pub fn hold_buckets(&self) -> &[BucketRef] {
        &self.hold_buckets
    }

    /// Latest end time over the sustained contributors; the entry's own
    /// start time when none sustain
    pub fn end_time(&self, tracks: &[NoteList]) -> BeatTime {
        let mut latest = self.start_time;
        for bucket_ref in &self.hold_buckets {
            let bucket = tracks
                .get(bucket_ref.track)
                .and_then(|track| track.bucket(bucket_ref.node));
            if let Some(bucket) = bucket {
                let end = bucket.end_time();
                if end > latest {
                    latest = end;
                }
            }
        }
        latest
    }
}

/// Jump sizing hint used while the index is still empty
const EMPTY_HINT: usize = 512;

/// Second-level index over merge entries, same Head/Tail/jump shape as a
/// track list
#[derive(Debug)]
pub struct GlobalList {
    chain: Chain<MergeNode>,
    jump: Option<JumpArray>,
    effective_beats: f64,
}

impl GlobalList {
    pub fn new(effective_beats: f64) -> Self {
        let mut list = Self {
            chain: Chain::new(),
            jump: None,
            effective_beats,
        };
        list.init_jump();
        list
    }

    pub fn init_jump(&mut self) {
        let hint = if self.chain.is_empty() {
            EMPTY_HINT
        } else {
            self.chain.len()
        };
        let chain = &self.chain;
        self.jump = JumpArray::build(chain.head(), hint, self.effective_beats, descend(chain));
    }

    pub fn effective_beats(&self) -> f64 {
        self.effective_beats
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn is_head(&self, id: NodeId) -> bool {
        self.chain.is_head(id)
    }

    pub fn is_tail(&self, id: NodeId) -> bool {
        self.chain.is_tail(id)
    }

    pub fn entry(&self, id: NodeId) -> Option<&MergeNode> {
        self.chain.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MergeNode)> {
        self.chain.iter()
    }

    /// Last entry at-or-before the beat, Head when none precede, Tail when
    /// the index is empty
    pub fn node_at(&self, beats: f64) -> NodeId {
        if self.chain.is_empty() {
            return self.chain.tail();
        }
        let chain = &self.chain;
        match &self.jump {
            Some(jump) => jump.node_at(beats, satisfies(chain)),
            None => {
                let guard = satisfies(chain);
                let mut node = chain.head();
                while let Some(next) = guard(node, beats) {
                    node = next;
                }
                node
            }
        }
    }

    /// Get or create the merge entry at `time`
    pub fn node_of(&mut self, time: BeatTime) -> (NodeId, bool) {
        let at = self.locate(time);
        if let Some(entry) = self.chain.get(at) {
            if entry.start_time() == time {
                return (at, false);
            }
        }
        let succ = self.chain.next(at).expect("insertion point has a successor");
        let node = self.chain.insert_after(at, MergeNode::new(time));
        self.repair_jump(at, succ);
        (node, true)
    }

    /// Register one track bucket under its start time
    pub fn add_bucket(&mut self, bucket_ref: BucketRef, start_time: BeatTime, sustained: bool) {
        let (node, _) = self.node_of(start_time);
        let entry = self.chain.get_mut(node).expect("entry was just located");
        if sustained {
            entry.hold_buckets.push(bucket_ref);
        } else {
            entry.note_buckets.push(bucket_ref);
        }
    }

    /// Exact float-proof positioning, same correction as the track lists
    fn locate(&self, time: BeatTime) -> NodeId {
        let mut at = self.node_at(time.to_beats());
        if self.chain.is_tail(at) {
            at = self.chain.head();
        }
        while let Some(entry) = self.chain.get(at) {
            if entry.start_time() > time {
                at = self.chain.prev(at).expect("entry has a predecessor");
            } else {
                break;
            }
        }
        while let Some(next) = self.chain.next(at) {
            match self.chain.get(next) {
                Some(entry) if entry.start_time() <= time => at = next,
                _ => break,
            }
        }
        at
    }

    fn repair_jump(&mut self, from: NodeId, to: NodeId) {
        let chain = &self.chain;
        if let Some(jump) = self.jump.as_mut() {
            let from_key = key(chain, from);
            let to_key = if chain.is_tail(to) {
                f64::INFINITY
            } else {
                key(chain, to)
            };
            jump.update_range(from, from_key, to_key, descend(chain));
        }
    }
}

fn key(chain: &Chain<MergeNode>, id: NodeId) -> f64 {
    match chain.data(id) {
        NodeData::Node(entry) => entry.start_time().to_beats(),
        _ => 0.0,
    }
}

fn descend(chain: &Chain<MergeNode>) -> impl FnMut(NodeId) -> Step + '_ {
    move |id| {
        if chain.is_tail(id) {
            return None;
        }
        let next = chain.next(id).expect("non-tail node has a successor");
        Some((key(chain, id), next))
    }
}

fn satisfies(chain: &Chain<MergeNode>) -> impl Fn(NodeId, f64) -> Option<NodeId> + '_ {
    move |id, beats| {
        let next = chain.next(id)?;
        match chain.get(next) {
            Some(entry) if entry.start_time().to_beats() <= beats => Some(next),
            _ => None,
        }
    }
}
