//! tile_nav
//! ========
//!
//! Real-time multi-agent navigation for 2D tile worlds. The crate couples a
//! jump point search grid pathfinder, in square (8-connected) and hex
//! (6-connected) variants, with a reciprocal velocity obstacle solver for
//! local avoidance, and binds them together with a per-tick orchestrator
//! that routes, follows, avoids and retries on failure.
//!
//! Passability is stored as packed bit rows in 16x16 chunks. Route solves
//! run against a per-solve overlay of the static map with dynamic agent
//! occupancy OR-ed in, over a shared data plane of a hash-indexed node pool
//! and an indexed binary min-heap supporting O(log n) decrease-key.

mod agent;
mod grid;
mod heap;
mod jps;
mod math;
mod node;
mod overlay;
mod rvo;
mod world;

pub use self::{
    agent::*, grid::*, heap::*, jps::*, math::*, node::*, overlay::*, rvo::*, world::*,
};
