/// The capability an arena must expose for its slots to live in an
/// [IndexedHeap]: a key ordering plus read and write access to the back
/// index each element carries.
///
/// The back index lets the heap relocate an element in O(log n) after its
/// key changes, where a heap that has to scan for the element first would
/// pay O(n) per adjustment.
pub trait HeapArena {
    /// Strict ordering between the keys of two slots.
    fn less(&self, a: u32, b: u32) -> bool;

    /// The stored heap position of a slot, or `-1` when not heap-resident.
    fn heap_index(&self, slot: u32) -> i32;

    /// Record a slot's heap position, or `-1` on removal.
    fn set_heap_index(&mut self, slot: u32, index: i32);
}

/// A binary min-heap of arena slots.
///
/// Every operation that moves an element writes the element's new position
/// back through [HeapArena::set_heap_index], keeping the invariant that a
/// heap-resident slot's stored index always matches its position in the
/// backing array.
#[derive(Debug, Default)]
pub struct IndexedHeap {
    slots: Vec<u32>,
}

impl IndexedHeap {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slot with the smallest key, without removing it.
    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<u32> {
        self.slots.first().copied()
    }

    /// Drop every slot. Stored back indexes are not rewritten; the owning
    /// arena is expected to reset its elements wholesale.
    #[inline]
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Insert a slot and sift it into place.
    pub fn push<A: HeapArena>(&mut self, arena: &mut A, slot: u32) {
        self.slots.push(slot);
        self.sift_up(arena, self.slots.len() - 1);
    }

    /// Remove and return the slot with the smallest key, marking it
    /// non-resident.
    pub fn pop<A: HeapArena>(&mut self, arena: &mut A) -> Option<u32> {
        let top = self.top()?;
        let last = self.slots.pop()?;
        if !self.slots.is_empty() {
            self.slots[0] = last;
            self.sift_down(arena, 0);
        }
        arena.set_heap_index(top, -1);
        Some(top)
    }

    /// Restore heap order around a resident slot whose key changed in either
    /// direction. O(log n) via the slot's stored index.
    pub fn fix<A: HeapArena>(&mut self, arena: &mut A, slot: u32) {
        let i = arena.heap_index(slot);
        if i < 0 {
            return;
        }
        let i = i as usize;
        if i > 0 && arena.less(slot, self.slots[(i - 1) / 2]) {
            self.sift_up(arena, i);
        } else {
            self.sift_down(arena, i);
        }
    }

    fn sift_up<A: HeapArena>(&mut self, arena: &mut A, mut i: usize) {
        let slot = self.slots[i];
        while i > 0 {
            let p = (i - 1) / 2;
            let parent = self.slots[p];
            if !arena.less(slot, parent) {
                break;
            }
            self.slots[i] = parent;
            arena.set_heap_index(parent, i as i32);
            i = p;
        }
        self.slots[i] = slot;
        arena.set_heap_index(slot, i as i32);
    }

    fn sift_down<A: HeapArena>(&mut self, arena: &mut A, mut i: usize) {
        let slot = self.slots[i];
        let n = self.slots.len();
        loop {
            let l = 2 * i + 1;
            if l >= n {
                break;
            }
            let mut m = l;
            let mut child = self.slots[l];
            let r = l + 1;
            if r < n {
                let right = self.slots[r];
                if arena.less(right, child) {
                    m = r;
                    child = right;
                }
            }
            if !arena.less(child, slot) {
                break;
            }
            self.slots[i] = child;
            arena.set_heap_index(child, i as i32);
            i = m;
        }
        self.slots[i] = slot;
        arena.set_heap_index(slot, i as i32);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Default)]
    struct Keys {
        keys: Vec<i32>,
        index: Vec<i32>,
    }

    impl Keys {
        fn add(&mut self, key: i32) -> u32 {
            self.keys.push(key);
            self.index.push(-1);
            (self.keys.len() - 1) as u32
        }
    }

    impl HeapArena for Keys {
        fn less(&self, a: u32, b: u32) -> bool {
            self.keys[a as usize] < self.keys[b as usize]
        }

        fn heap_index(&self, slot: u32) -> i32 {
            self.index[slot as usize]
        }

        fn set_heap_index(&mut self, slot: u32, index: i32) {
            self.index[slot as usize] = index;
        }
    }

    fn assert_consistent(heap: &IndexedHeap, arena: &Keys) {
        for (i, &slot) in heap.slots.iter().enumerate() {
            assert_eq!(arena.heap_index(slot), i as i32);
            if i > 0 {
                let parent = heap.slots[(i - 1) / 2];
                assert!(!arena.less(slot, parent), "heap order violated at {i}");
            }
        }
    }

    #[test]
    fn test_push_pop_sorted() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut arena = Keys::default();
        let mut heap = IndexedHeap::default();
        let mut values = Vec::new();
        for _ in 0..256 {
            let v = rng.gen_range(0..10_000);
            values.push(v);
            let slot = arena.add(v);
            heap.push(&mut arena, slot);
        }
        values.sort_unstable();
        for expected in values {
            let slot = heap.pop(&mut arena).unwrap();
            assert_eq!(arena.keys[slot as usize], expected);
            assert_eq!(arena.heap_index(slot), -1);
        }
        assert!(heap.is_empty());
        assert_eq!(heap.pop(&mut arena), None);
    }

    #[test]
    fn test_top() {
        let mut arena = Keys::default();
        let mut heap = IndexedHeap::default();
        for v in [5, 3, 8] {
            let slot = arena.add(v);
            heap.push(&mut arena, slot);
        }
        let top = heap.top().unwrap();
        assert_eq!(arena.keys[top as usize], 3);
        assert_eq!(heap.len(), 3);
        let popped = heap.pop(&mut arena).unwrap();
        assert_eq!(popped, top);
    }

    #[test]
    fn test_fix_decrease_key() {
        let mut arena = Keys::default();
        let mut heap = IndexedHeap::default();
        let mut slots = Vec::new();
        for v in [5, 3, 8] {
            let slot = arena.add(v);
            slots.push(slot);
            heap.push(&mut arena, slot);
        }
        arena.keys[slots[2] as usize] = 1;
        heap.fix(&mut arena, slots[2]);
        assert_eq!(heap.top(), Some(slots[2]));
        assert_consistent(&heap, &arena);
    }

    #[test]
    fn test_fix_increase_key() {
        let mut arena = Keys::default();
        let mut heap = IndexedHeap::default();
        let mut slots = Vec::new();
        for v in [1, 2, 3] {
            let slot = arena.add(v);
            slots.push(slot);
            heap.push(&mut arena, slot);
        }
        arena.keys[slots[0] as usize] = 9;
        heap.fix(&mut arena, slots[0]);
        assert_eq!(heap.top(), Some(slots[1]));
        assert_consistent(&heap, &arena);
    }

    #[test]
    fn test_indexes_stay_consistent() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut arena = Keys::default();
        let mut heap = IndexedHeap::with_capacity(32);
        let mut slots = Vec::new();
        for _ in 0..32 {
            let slot = arena.add(rng.gen_range(0..1000));
            slots.push(slot);
            heap.push(&mut arena, slot);
        }
        assert_consistent(&heap, &arena);
        for _ in 0..64 {
            let slot = slots[rng.gen_range(0..slots.len())];
            arena.keys[slot as usize] += rng.gen_range(-100..=100);
            heap.fix(&mut arena, slot);
            assert_consistent(&heap, &arena);
        }
    }

    #[test]
    fn test_clear() {
        let mut arena = Keys::default();
        let mut heap = IndexedHeap::default();
        for v in 0..10 {
            let slot = arena.add(v);
            heap.push(&mut arena, slot);
        }
        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
        assert_eq!(heap.top(), None);
    }
}
