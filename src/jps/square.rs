use bevy_math::{ivec2, IVec2};

use super::{DirSet, NO_DIR};
use crate::grid::Passability;
use crate::heap::IndexedHeap;
use crate::node::{NodePool, NodeStatus};

/*
Directions are numbered clockwise from north:

    7 0 1
    6 . 2
    5 4 3

Odd directions are diagonal.
*/

const DIR_COUNT: u8 = 8;

/// Integer octile distance with a straight step weighing 5 and a diagonal
/// step weighing 7, which keeps the heuristic an admissible lower bound in
/// pure integer arithmetic.
#[inline]
#[must_use]
pub fn octile(a: IVec2, b: IVec2) -> i32 {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    if dy >= dx {
        dx * 7 + (dy - dx) * 5
    } else {
        dy * 7 + (dx - dy) * 5
    }
}

#[inline]
fn diagonal(d: u8) -> bool {
    d & 1 == 1
}

#[inline]
fn step(pos: IVec2, d: u8) -> IVec2 {
    let x = match d {
        1..=3 => pos.x + 1,
        5..=7 => pos.x - 1,
        _ => pos.x,
    };
    let y = match d {
        0 | 1 | 7 => pos.y + 1,
        3..=5 => pos.y - 1,
        _ => pos.y,
    };
    ivec2(x, y)
}

/// The turning cell between two jump points whose delta is neither
/// axis-aligned nor pure diagonal: the diagonal leg runs from the parent
/// until one axis is exhausted, and the turn happens there.
fn turn_point(pos: IVec2, from: IVec2) -> Option<IVec2> {
    let dx = (pos.x - from.x).abs();
    let dy = (pos.y - from.y).abs();
    if dx == 0 || dy == 0 || dx == dy {
        return None;
    }
    let span = dx.min(dy);
    let sx = if pos.x > from.x { 1 } else { -1 };
    let sy = if pos.y > from.y { 1 } else { -1 };
    Some(ivec2(from.x + sx * span, from.y + sy * span))
}

/// Jump point search pathfinder for the 8-connected square lattice.
///
/// The solver owns its scratch data plane (node pool plus open-set heap) and
/// reuses it across solves. By default paths never cut a corner: a diagonal
/// move requires both orthogonally adjacent cells to be passable, so a
/// circular agent following the path does not clip blocked geometry.
#[derive(Debug)]
pub struct SquareSolver {
    pool: NodePool,
    heap: IndexedHeap,
    end: IVec2,
    avoid_corners: bool,
}

impl SquareSolver {
    /// Create a solver whose pool holds up to `max_nodes` search nodes.
    /// Exhausting the pool fails the solve, so the bound should cover the
    /// map region being searched.
    #[must_use]
    pub fn new(max_nodes: u32) -> Self {
        Self {
            pool: NodePool::new(max_nodes),
            heap: IndexedHeap::with_capacity(max_nodes as usize),
            end: IVec2::ZERO,
            avoid_corners: true,
        }
    }

    /// Permit paths that slide diagonally between two blocked cells.
    /// Off by default.
    pub fn allow_corner_cutting(&mut self, allow: bool) {
        self.avoid_corners = !allow;
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
            let set = self.natural(map, pos, dir) | self.forced(map, pos, dir);
            for d in set.iter() {
                if self.jump(map, pos, pos, d, cost) {
                    break;
                }
            }
        }
        None
    }

    /// Advance cell by cell in direction `d`, queueing the first jump point
    /// found. Returns true only when the goal itself was reached, which
    /// short-circuits the caller's direction scan.
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
            if self.avoid_corners && diagonal(d) {
                // a diagonal move squeezing between blocked cells is no move
                if !(self.open_toward(map, pos, d, 3) && self.open_toward(map, pos, d, 5)) {
                    return false;
                }
            }
            if pos == self.end {
                self.push_open(pos, d, from, cost);
                return true;
            }
            if !self.forced(map, pos, d).is_empty() {
                self.push_open(pos, d, from, cost);
                return false;
            }
            if diagonal(d) {
                if self.jump(map, pos, from, (d + 7) % 8, cost) {
                    return true;
                }
                if self.jump(map, pos, from, (d + 1) % 8, cost) {
                    return true;
                }
            }
        }
    }

    /// Directions the search keeps following after arriving at `pos` via
    /// `d`. The start sentinel spreads into every direction.
    fn natural<M: Passability>(&self, map: &M, pos: IVec2, d: u8) -> DirSet {
        if d == NO_DIR {
            return DirSet::full(DIR_COUNT);
        }
        let mut set = DirSet::EMPTY;
        if self.avoid_corners {
            if diagonal(d) {
                if !self.open_toward(map, pos, d, 7) {
                    set.insert((d + 1) % 8);
                } else if !self.open_toward(map, pos, d, 1) {
                    set.insert((d + 7) % 8);
                } else {
                    set.insert(d);
                    set.insert((d + 1) % 8);
                    set.insert((d + 7) % 8);
                }
            } else {
                set.insert(d);
            }
        } else {
            set.insert(d);
            if diagonal(d) {
                set.insert((d + 1) % 8);
                set.insert((d + 7) % 8);
            }
        }
        set
    }

    /// Directions forced open at `pos` by a blocker beside the arrival
    /// direction `d`.
    fn forced<M: Passability>(&self, map: &M, pos: IVec2, d: u8) -> DirSet {
        let mut set = DirSet::EMPTY;
        if d == NO_DIR {
            return set;
        }
        if self.avoid_corners {
            if !diagonal(d) {
                if self.open_toward(map, pos, d, 2) && !self.open_toward(map, pos, d, 3) {
                    set.insert((d + 2) % 8);
                    set.insert((d + 1) % 8);
                }
                if self.open_toward(map, pos, d, 6) && !self.open_toward(map, pos, d, 5) {
                    set.insert((d + 6) % 8);
                    set.insert((d + 7) % 8);
                }
            }
        } else if diagonal(d) {
            if self.open_toward(map, pos, d, 6) && !self.open_toward(map, pos, d, 5) {
                set.insert((d + 6) % 8);
            }
            if self.open_toward(map, pos, d, 2) && !self.open_toward(map, pos, d, 3) {
                set.insert((d + 2) % 8);
            }
        } else {
            if self.open_toward(map, pos, d, 1) && !self.open_toward(map, pos, d, 2) {
                set.insert((d + 1) % 8);
            }
            if self.open_toward(map, pos, d, 7) && !self.open_toward(map, pos, d, 6) {
                set.insert((d + 7) % 8);
            }
        }
        set
    }

    /// Whether the neighbor `turn` steps clockwise from the arrival
    /// direction is passable.
    #[inline]
    fn open_toward<M: Passability>(&self, map: &M, pos: IVec2, d: u8, turn: u8) -> bool {
        let p = step(pos, (d + turn) % 8);
        map.available(p.x, p.y)
    }

    fn push_open(&mut self, pos: IVec2, d: u8, from: IVec2, cost: i32) {
        let Some(slot) = self.pool.get(pos) else {
            return;
        };
        let g = cost + octile(pos, from);
        match self.pool.node(slot).status {
            NodeStatus::New => {
                let total = g + octile(pos, self.end);
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
                    let total = g + octile(pos, self.end);
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
