//! Fixed-granularity jump-pointer acceleration index
//!
//! A [`JumpArray`] covers the beat range `[0, span)` with uniform slots;
//! slot `i` stores the last chain node whose key is `<=` the slot's left
//! edge. A point query lands in one slot and walks forward under a guard, so
//! it stays O(1) amortized while insertions repair only the slots their new
//! key straddles. Keys reach the index as `f64` beats; that float is slot
//! geometry only — exactness is the caller's business at the rational level.

use super::chain::NodeId;

/// Slot-count floor; sizing is a heuristic, correctness comes from the
/// guarded walk.
const MIN_SLOTS: usize = 16;
/// Slot-count ceiling
const MAX_SLOTS: usize = 65536;

/// Walk step: the current node's key and its successor, `None` at the tail
pub type Step = Option<(f64, NodeId)>;

/// Acceleration index over one chain, for one key (start or end time)
#[derive(Debug, Clone)]
pub struct JumpArray {
    slots: Vec<NodeId>,
    granularity: f64,
}

impl JumpArray {
    /// Build an index over a chain.
    ///
    /// `size_hint` is the expected element count (sizing only), `span` the
    /// effective beat range. `descend` reports a node's key and successor,
    /// `None` at the tail; the head must report key 0. Returns `None` when
    /// there is no positive finite span to cover.
    pub fn build(
        head: NodeId,
        size_hint: usize,
        span: f64,
        mut descend: impl FnMut(NodeId) -> Step,
    ) -> Option<Self> {
        if !span.is_finite() || span <= 0.0 {
            return None;
        }
        let count = size_hint.clamp(MIN_SLOTS, MAX_SLOTS);
        let granularity = span / count as f64;

        let mut slots = Vec::with_capacity(count);
        let mut cursor = head;
        for i in 0..count {
            let edge = i as f64 * granularity;
            cursor = Self::advance(cursor, edge, &mut descend);
            slots.push(cursor);
        }
        Some(Self { slots, granularity })
    }

    /// Advance to the last node whose key is `<=` `edge`; `cursor` must
    /// already be at or before that position.
    fn advance(mut cursor: NodeId, edge: f64, descend: &mut impl FnMut(NodeId) -> Step) -> NodeId {
        while let Some((_, next)) = descend(cursor) {
            match descend(next) {
                Some((next_key, _)) if next_key <= edge => cursor = next,
                _ => break,
            }
        }
        cursor
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    /// Point query: read the slot covering `beats`, then walk forward while
    /// `satisfies` yields a successor ("current node does not cover the beat
    /// yet"). The guard defines the boundary semantics.
    pub fn node_at(&self, beats: f64, satisfies: impl Fn(NodeId, f64) -> Option<NodeId>) -> NodeId {
        let mut node = self.slots[self.slot_index(beats)];
        while let Some(next) = satisfies(node, beats) {
            node = next;
        }
        node
    }

    fn slot_index(&self, beats: f64) -> usize {
        if beats <= 0.0 {
            return 0;
        }
        ((beats / self.granularity) as usize).min(self.slots.len() - 1)
    }

    /// Repair every slot whose left edge is `>= from_key`.
    ///
    /// Needed when a key that is not monotonic along the chain changes (a
    /// bucket's end time moves as holds come and go): slots below `from_key`
    /// keep walking the same prefix, everything above is recomputed, resuming
    /// from the last untouched slot's value.
    pub fn update_suffix(
        &mut self,
        head: NodeId,
        from_key: f64,
        mut descend: impl FnMut(NodeId) -> Step,
    ) {
        let count = self.slots.len();
        let first = if from_key <= 0.0 {
            0
        } else {
            ((from_key / self.granularity).ceil() as usize).min(count)
        };
        let mut cursor = if first == 0 {
            head
        } else {
            self.slots[first - 1]
        };
        for i in first..count {
            let edge = i as f64 * self.granularity;
            cursor = Self::advance(cursor, edge, &mut descend);
            self.slots[i] = cursor;
        }
    }

    /// Repair after a splice between the nodes keyed `from_key` and
    /// `to_key`: recompute only the slots whose left edge falls within
    /// `[from_key, to_key)`, walking from `from`. Pass `f64::INFINITY` as
    /// `to_key` when the successor is the tail.
    pub fn update_range(
        &mut self,
        from: NodeId,
        from_key: f64,
        to_key: f64,
        mut descend: impl FnMut(NodeId) -> Step,
    ) {
        let count = self.slots.len();
        let first = if from_key <= 0.0 {
            0
        } else {
            ((from_key / self.granularity).ceil() as usize).min(count)
        };
        let last = if to_key.is_finite() {
            ((to_key / self.granularity).ceil() as usize).min(count)
        } else {
            count
        };

        let mut cursor = from;
        for i in first..last {
            let edge = i as f64 * self.granularity;
            cursor = Self::advance(cursor, edge, &mut descend);
            self.slots[i] = cursor;
        }
    }
}
