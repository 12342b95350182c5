use bevy_math::{ivec2, IVec2};

use super::{DirSet, NO_DIR};
use crate::grid::Passability;
use crate::heap::IndexedHeap;
use crate::node::{NodePool, NodeStatus};

/*
Pointy-top hexes in odd-row offset coordinates, odd rows shifted +x.
Directions counterclockwise from east:

      4   5
    3   .   0
      2   1

Even directions span the three straight axes and spread into their
neighbors while jumping.
*/

const DIR_COUNT: u8 = 6;

/// Hex grid distance between two cells in odd-row offset coordinates. Each
/// cell converts to axial coordinates first; differencing the raw offset
/// deltas instead would make the result depend on row parity.
#[inline]
#[must_use]
pub fn hex_distance(a: IVec2, b: IVec2) -> i32 {
    let (qa, ra) = offset_to_axial(a.x, a.y);
    let (qb, rb) = offset_to_axial(b.x, b.y);
    let (q, r) = (qa - qb, ra - rb);
    (q.abs() + r.abs() + (q + r).abs()) / 2
}

#[inline]
fn offset_to_axial(x: i32, y: i32) -> (i32, i32) {
    (x - (y - (y & 1)) / 2, y)
}

#[inline]
fn axial_to_offset(q: i32, r: i32) -> (i32, i32) {
    (q + (r - (r & 1)) / 2, r)
}

#[inline]
fn spread(d: u8) -> bool {
    d % 2 == 0
}

#[inline]
fn step(pos: IVec2, d: u8) -> IVec2 {
    let x = match d {
        0 => pos.x + 1,
        3 => pos.x - 1,
        1 | 5 => pos.x + (pos.y & 1),
        2 | 4 => pos.x - (1 - (pos.y & 1)),
        _ => pos.x,
    };
    let y = match d {
        1 | 2 => pos.y - 1,
        4 | 5 => pos.y + 1,
        _ => pos.y,
    };
    ivec2(x, y)
}

/// The turning cell between two jump points that do not share a hex axis,
/// found in cube coordinates: the leg from the parent runs until one cube
/// component is exhausted.
fn turn_point(pos: IVec2, from: IVec2) -> Option<IVec2> {
    let (q, r) = offset_to_axial(pos.x, pos.y);
    let (fq, fr) = offset_to_axial(from.x, from.y);
    let (s, fs) = (-q - r, -fq - fr);
    let (dq, dr, ds) = (q - fq, r - fr, s - fs);
    if dq == 0 || dr == 0 || ds == 0 {
        return None;
    }
    let (mq, mr) = if dr > 0 && dq > 0 {
        let mq = fq + dq;
        let ms = fs - dq;
        (mq, -mq - ms)
    } else if dr > 0 && ds > 0 {
        (fq - dr, fr + dr)
    } else if dr > 0 {
        (fq + dq, fr - dq)
    } else if dq < 0 {
        let mr = fr + dr;
        let ms = fs - dr;
        (-mr - ms, mr)
    } else if ds < 0 {
        let ms = fs + ds;
        let mq = fq - ds;
        (mq, -mq - ms)
    } else {
        let ms = fs + ds;
        let mr = fr - ds;
        (-mr - ms, mr)
    };
    let (x, y) = axial_to_offset(mq, mr);
    Some(ivec2(x, y))
}

/// Jump point search pathfinder for the 6-connected hex lattice.
///
/// Shares the square solver's data plane but needs no corner handling: hex
/// neighbors never touch across a squeezed corner.
#[derive(Debug)]
pub struct HexSolver {
    pool: NodePool,
    heap: IndexedHeap,
    end: IVec2,
}

impl HexSolver {
    /// Create a solver whose pool holds up to `max_nodes` search nodes.
    #[must_use]
    pub fn new(max_nodes: u32) -> Self {
        Self {
            pool: NodePool::new(max_nodes),
            heap: IndexedHeap::with_capacity(max_nodes as usize),
            end: IVec2::ZERO,
        }
    }

    /// Find a path from `start` to `end` over `map`.
    ///
    /// # Returns
    ///
    /// The sequence of cells from `start` to `end` inclusive, holding only
    /// jump points plus at most one turning cell between each consecutive
    /// pair. `None` when no path exists or the node pool was exhausted.
    /// When `start == end` the path is the single cell `[start]`.
    pub fn solve<M: Passability>(
        &mut self,
        map: &M,
        start: IVec2,
        end: IVec2,
    ) -> Option<Vec<IVec2>> {
        self.pool.clear();
        self.heap.clear();
        self.end = end;
        self.push_open(start, NO_DIR, start, 0);
        while let Some(slot) = self.heap.pop(&mut self.pool) {
            let node = self.pool.node_mut(slot);
            node.status = NodeStatus::Closed;
            let (pos, dir, cost) = (node.pos, node.dir, node.cost);
            if pos == end {
                return self.walk_back(start);
            }
            let set = self.natural(dir) | self.forced(map, pos, dir);
            for d in set.iter() {
                if self.jump(map, pos, pos, d, cost) {
                    break;
                }
            }
        }
        None
    }

    /// Advance cell by cell in direction `d`. Spread directions keep
    /// stepping after both neighbor recursions come back empty, so the scan
    /// always makes progress along the ray.
    fn jump<M: Passability>(
        &mut self,
        map: &M,
        mut pos: IVec2,
        from: IVec2,
        d: u8,
        cost: i32,
    ) -> bool {
        loop {
            pos = step(pos, d);
            if !map.available(pos.x, pos.y) {
                return false;
            }
            if pos == self.end {
                self.push_open(pos, d, from, cost);
                return true;
            }
            if !self.forced(map, pos, d).is_empty() {
                self.push_open(pos, d, from, cost);
                return false;
            }
            if spread(d) {
                if self.jump(map, pos, from, (d + 1) % 6, cost)
                    || self.jump(map, pos, from, (d + 5) % 6, cost)
                {
                    return true;
                }
            }
        }
    }

    fn natural(&self, d: u8) -> DirSet {
        if d == NO_DIR {
            return DirSet::full(DIR_COUNT);
        }
        let mut set = DirSet::EMPTY;
        set.insert(d);
        if spread(d) {
            set.insert((d + 1) % 6);
            set.insert((d + 5) % 6);
        }
        set
    }

    fn forced(&self, map: &impl Passability, pos: IVec2, d: u8) -> DirSet {
        let mut set = DirSet::EMPTY;
        if d == NO_DIR || spread(d) {
            return set;
        }
        if !self.open_toward(map, pos, d, 2) {
            set.insert((d + 1) % 6);
        }
        if !self.open_toward(map, pos, d, 4) {
            set.insert((d + 5) % 6);
        }
        set
    }

    #[inline]
    fn open_toward(&self, map: &impl Passability, pos: IVec2, d: u8, turn: u8) -> bool {
        let p = step(pos, (d + turn) % 6);
        map.available(p.x, p.y)
    }

    fn push_open(&mut self, pos: IVec2, d: u8, from: IVec2, cost: i32) {
        let Some(slot) = self.pool.get(pos) else {
            return;
        };
        let g = cost + hex_distance(pos, from);
        match self.pool.node(slot).status {
            NodeStatus::New => {
                let total = g + hex_distance(pos, self.end);
                let node = self.pool.node_mut(slot);
                node.parent = from;
                node.dir = d;
                node.cost = g;
                node.total = total;
                node.status = NodeStatus::Open;
                self.heap.push(&mut self.pool, slot);
            }
            NodeStatus::Open => {
                if g < self.pool.node(slot).cost {
                    let total = g + hex_distance(pos, self.end);
                    let node = self.pool.node_mut(slot);
                    node.parent = from;
                    node.dir = d;
                    node.cost = g;
                    node.total = total;
                    self.heap.fix(&mut self.pool, slot);
                }
            }
            NodeStatus::Closed => {}
        }
    }

    fn walk_back(&self, start: IVec2) -> Option<Vec<IVec2>> {
        let mut path = Vec::new();
        let mut pos = self.end;
        while pos != start {
            path.push(pos);
            let slot = self.pool.find(pos)?;
            let from = self.pool.node(slot).parent;
            if let Some(turn) = turn_point(pos, from) {
                path.push(turn);
            }
            pos = from;
        }
        path.push(start);
        path.reverse();
        Some(path)
    }
}
