use bevy_math::IVec2;

use crate::heap::HeapArena;

/// Lifecycle of a search node within one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeStatus {
    /// Freshly allocated, not yet queued.
    #[default]
    New,
    /// Queued in the open set.
    Open,
    /// Expanded; cost and parent are frozen.
    Closed,
}

/// One node of the pathfinding open/closed data plane.
///
/// `parent` holds the jump-point predecessor rather than the step-wise one,
/// and `dir` is the move direction that produced the node (geometry
/// specific, with `0xff` reserved for the start sentinel).
#[derive(Debug, Clone, Copy)]
pub struct SearchNode {
    pub pos: IVec2,
    pub parent: IVec2,
    pub dir: u8,
    /// Cost from the start along the reconstructed jump-point path.
    pub cost: i32,
    /// Cost plus the heuristic toward the goal; the heap key.
    pub total: i32,
    pub status: NodeStatus,
    pub heap_index: i32,
}

impl SearchNode {
    fn new(pos: IVec2) -> Self {
        Self {
            pos,
            parent: pos,
            dir: 0xff,
            cost: 0,
            total: 0,
            status: NodeStatus::New,
            heap_index: -1,
        }
    }
}

/// An arena of search nodes addressed by cell coordinate through a chained
/// hash index.
///
/// Slots are handed out in allocation order and stay stable for the length
/// of one solve, so the open-set heap can hold bare slot numbers. [clear]
/// resets the bucket heads and the allocation count in one pass; no per-node
/// teardown happens, and slot handles must not outlive it.
///
/// The pool never evicts. Once `max_nodes` slots are live, [get] reports a
/// miss and the caller treats the solve as failed.
///
/// [clear]: NodePool::clear
/// [get]: NodePool::get
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<SearchNode>,
    next: Vec<i32>,
    first: Vec<i32>,
    max_nodes: u32,
}

impl NodePool {
    /// Create a pool of up to `max_nodes` slots. The bucket count is the
    /// next power of two above a quarter of the slot count.
    #[must_use]
    pub fn new(max_nodes: u32) -> Self {
        let buckets = (max_nodes / 4).max(1).next_power_of_two() as usize;
        Self {
            nodes: Vec::with_capacity(max_nodes as usize),
            next: vec![-1; max_nodes as usize],
            first: vec![-1; buckets],
            max_nodes,
        }
    }

    /// The number of live slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget every node. Runs in O(buckets); slots are reclaimed by
    /// resetting the allocation count, not individually.
    pub fn clear(&mut self) {
        self.first.fill(-1);
        self.nodes.clear();
    }

    /// Obtain the slot for the given cell, allocating a fresh node on first
    /// sight. Returns `None` when the pool is full.
    pub fn get(&mut self, pos: IVec2) -> Option<u32> {
        let bucket = self.bucket(pos);
        let mut i = self.first[bucket];
        while i != -1 {
            if self.nodes[i as usize].pos == pos {
                return Some(i as u32);
            }
            i = self.next[i as usize];
        }
        if self.nodes.len() as u32 >= self.max_nodes {
            return None;
        }
        let slot = self.nodes.len() as u32;
        self.nodes.push(SearchNode::new(pos));
        self.next[slot as usize] = self.first[bucket];
        self.first[bucket] = slot as i32;
        Some(slot)
    }

    /// Obtain the slot for the given cell without allocating.
    #[must_use]
    pub fn find(&self, pos: IVec2) -> Option<u32> {
        let mut i = self.first[self.bucket(pos)];
        while i != -1 {
            if self.nodes[i as usize].pos == pos {
                return Some(i as u32);
            }
            i = self.next[i as usize];
        }
        None
    }

    /// Read a node by slot.
    #[inline]
    #[must_use]
    pub fn node(&self, slot: u32) -> &SearchNode {
        &self.nodes[slot as usize]
    }

    /// Mutate a node by slot.
    #[inline]
    #[must_use]
    pub fn node_mut(&mut self, slot: u32) -> &mut SearchNode {
        &mut self.nodes[slot as usize]
    }

    #[inline]
    fn bucket(&self, pos: IVec2) -> usize {
        let packed = ((pos.x as i64) << 32) | (pos.y as u32 as i64);
        (fxhash::hash64(&packed) & (self.first.len() as u64 - 1)) as usize
    }
}

impl HeapArena for NodePool {
    #[inline]
    fn less(&self, a: u32, b: u32) -> bool {
        self.nodes[a as usize].total < self.nodes[b as usize].total
    }

    #[inline]
    fn heap_index(&self, slot: u32) -> i32 {
        self.nodes[slot as usize].heap_index
    }

    #[inline]
    fn set_heap_index(&mut self, slot: u32, index: i32) {
        self.nodes[slot as usize].heap_index = index;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bevy_math::ivec2;

    #[test]
    fn test_get_is_stable() {
        let mut pool = NodePool::new(64);
        let a = pool.get(ivec2(1, 2)).unwrap();
        let b = pool.get(ivec2(3, 4)).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.get(ivec2(1, 2)), Some(a));
        assert_eq!(pool.get(ivec2(3, 4)), Some(b));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.node(a).pos, ivec2(1, 2));
        assert_eq!(pool.node(a).status, NodeStatus::New);
        assert_eq!(pool.node(a).heap_index, -1);
    }

    #[test]
    fn test_find() {
        let mut pool = NodePool::new(64);
        assert_eq!(pool.find(ivec2(5, 5)), None);
        let slot = pool.get(ivec2(5, 5)).unwrap();
        assert_eq!(pool.find(ivec2(5, 5)), Some(slot));
        assert_eq!(pool.find(ivec2(5, 6)), None);
    }

    #[test]
    fn test_overflow_is_a_miss() {
        let mut pool = NodePool::new(4);
        for x in 0..4 {
            assert!(pool.get(ivec2(x, 0)).is_some());
        }
        assert_eq!(pool.get(ivec2(9, 9)), None);
        // existing nodes are still reachable
        assert!(pool.get(ivec2(2, 0)).is_some());
    }

    #[test]
    fn test_clear_idempotence() {
        let mut pool = NodePool::new(128);
        let cells: Vec<_> = (0..40).map(|i| ivec2(i % 7, i / 7)).collect();
        let before: Vec<_> = cells.iter().map(|&c| pool.get(c)).collect();
        let count = pool.len();
        pool.clear();
        assert!(pool.is_empty());
        let after: Vec<_> = cells.iter().map(|&c| pool.get(c)).collect();
        assert_eq!(before, after);
        assert_eq!(pool.len(), count);
    }

    #[test]
    fn test_distinct_slots_across_buckets() {
        let mut pool = NodePool::new(1024);
        let mut slots = Vec::new();
        for x in 0..32 {
            for y in 0..32 {
                slots.push(pool.get(ivec2(x, y)).unwrap());
            }
        }
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), 1024);
        assert_eq!(pool.get(ivec2(99, 99)), None);
    }
}
