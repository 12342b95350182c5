use std::collections::VecDeque;

use bevy_math::{ivec2, IVec2, Vec2};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::{Agent, AgentStatus};
use crate::grid::{line_of_sight, TileMap, CHUNK_SIZE};
use crate::jps::SquareSolver;
use crate::math::{cell_center, cell_of, same_cell, EPSILON_SQ};
use crate::overlay::{Overlay, OVERLAY_CHUNKS};
use crate::rvo::{RvoAgent, RvoConfig, RvoSolver};

/// Collision radius shared by all agents, in cells.
const AGENT_RADIUS: f32 = 0.5;

/// Upper bound on the random route retry delay, in ticks.
const MAX_WAIT: u32 = 3;

/// Search nodes available per route solve.
const MAX_NODES: u32 = 1024;

/// Interpolated per-agent snapshot for rendering collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub position: Vec2,
    pub facing: Vec2,
    pub status: AgentStatus,
}

/// The tick orchestrator: owns the map, the agents and the solver scratch,
/// and advances every agent one simulation step at a time.
///
/// Each tick runs three serial passes. The first drives the per-agent state
/// machine: stopped agents count down their wait and try to route, moving
/// agents consume waypoints and fall back to a stop when line of sight to
/// the next hop is lost. The second resolves local avoidance for every
/// moving agent against a snapshot of tick-start state, so the outcome does
/// not depend on agent order. The third re-checks the assigned motion
/// against walls and settled agents and stops on contact.
///
/// Routing failures never surface as errors. A failed route re-arms the
/// agent's wait counter and the attempt repeats a few ticks later.
pub struct World {
    map: TileMap,
    agents: Vec<Agent>,
    solver: SquareSolver,
    overlay: Overlay,
    rvo: RvoSolver,
    rng: StdRng,
    time_step: f32,
}

impl World {
    /// Create a world over `map`. The `seed` fixes the retry jitter so runs
    /// replay deterministically.
    #[must_use]
    pub fn new(map: TileMap, config: RvoConfig, seed: u64) -> Self {
        Self {
            map,
            agents: Vec::new(),
            solver: SquareSolver::new(MAX_NODES),
            overlay: Overlay::new(),
            rvo: RvoSolver::new(config),
            rng: StdRng::seed_from_u64(seed),
            time_step: config.time_step,
        }
    }

    #[inline]
    #[must_use]
    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Mutable map access, for scenario setup before agents start moving.
    #[inline]
    #[must_use]
    pub fn map_mut(&mut self) -> &mut TileMap {
        &mut self.map
    }

    #[inline]
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Returns true once every agent has terminated.
    #[must_use]
    pub fn settled(&self) -> bool {
        self.agents
            .iter()
            .all(|a| a.status == AgentStatus::Terminated)
    }

    /// Add an agent at `position` that will navigate to `target` moving at
    /// most `speed` cells per second. Agents start stopped and route on the
    /// next tick.
    pub fn add_agent(&mut self, position: Vec2, target: Vec2, speed: f32) {
        debug!("add agent {} at {position} -> {target}", self.agents.len());
        self.agents
            .push(Agent::new(position, target, speed, AGENT_RADIUS));
    }

    /// Advance the simulation one tick.
    pub fn step(&mut self) {
        let dt = self.time_step;

        // state machine and preferred velocities
        for i in 0..self.agents.len() {
            match self.agents[i].status {
                AgentStatus::Terminated => {}
                AgentStatus::Stopped => {
                    if self.agents[i].wait > 0 {
                        self.agents[i].wait -= 1;
                        continue;
                    }
                    match self.route(i) {
                        Some(waypoints) => {
                            trace!("agent {i} routed, {} waypoints", waypoints.len());
                            let position = self.agents[i].position;
                            let agent = &mut self.agents[i];
                            agent.waypoints = waypoints;
                            agent.set_local_target(position, dt);
                            agent.status = AgentStatus::Moving;
                        }
                        None => {
                            let wait = self.rng.gen_range(0..=MAX_WAIT);
                            trace!("agent {i} found no route, waiting {wait}");
                            self.agents[i].wait = wait;
                        }
                    }
                }
                AgentStatus::Moving => {
                    let agent = &mut self.agents[i];
                    agent.position = agent.next_position;
                    match agent.next_waypoint() {
                        None => {
                            agent.waypoints.clear();
                            agent.status = AgentStatus::Terminated;
                            debug!("agent {i} arrived at {}", agent.position);
                        }
                        Some(to) => {
                            let from_cell = cell_of(self.agents[i].position);
                            let to_cell = cell_of(to);
                            if line_of_sight(&self.map, from_cell, to_cell) {
                                self.agents[i].set_local_target(to, dt);
                            } else {
                                // the corridor closed; re-route from a stop
                                let wait = self.rng.gen_range(0..=MAX_WAIT);
                                debug!("agent {i} lost sight of {to}, re-routing");
                                self.agents[i].stop(wait);
                            }
                        }
                    }
                }
            }
        }

        // local avoidance over a snapshot of tick-start state
        let snapshot: Vec<RvoAgent> = self.agents.iter().map(rvo_agent).collect();
        let moving: Vec<bool> = self
            .agents
            .iter()
            .map(|a| a.status == AgentStatus::Moving)
            .collect();
        for i in 0..self.agents.len() {
            if !moving[i] {
                continue;
            }
            let neighbors = snapshot
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i && moving[j])
                .map(|(_, a)| a);
            match self.rvo.solve(&snapshot[i], neighbors) {
                Some(outcome) => {
                    let agent = &mut self.agents[i];
                    agent.velocity = outcome.velocity;
                    agent.next_position = agent.position + outcome.velocity * dt;
                    if outcome.velocity.length_squared() > EPSILON_SQ {
                        agent.facing = outcome.velocity.normalize();
                    }
                }
                None => {
                    let wait = self.rng.gen_range(0..=MAX_WAIT);
                    debug!("agent {i} has no feasible velocity, stopping");
                    self.agents[i].stop(wait);
                }
            }
        }

        // contact check on the assigned motion
        for i in 0..self.agents.len() {
            if self.agents[i].status != AgentStatus::Moving {
                continue;
            }
            let next = self.agents[i].next_position;
            let next_cell = cell_of(next);
            let into_wall = self.map.is_set(next_cell.x, next_cell.y);
            let into_agent = self
                .agents
                .iter()
                .any(|b| b.status != AgentStatus::Moving && same_cell(next, b.position));
            if into_wall || into_agent {
                let wait = self.rng.gen_range(0..=MAX_WAIT);
                debug!(
                    "agent {i} stopping before contact at {next} ({})",
                    if into_wall { "wall" } else { "agent" },
                );
                self.agents[i].stop(wait);
            }
        }
    }

    /// Per-agent snapshots for rendering, with moving agents interpolated
    /// `frame_fraction` of the way into their current tick.
    pub fn draw_state(&self, frame_fraction: f32) -> impl Iterator<Item = AgentView> + '_ {
        let t = frame_fraction.clamp(0.0, 1.0);
        self.agents.iter().map(move |a| AgentView {
            position: if a.status == AgentStatus::Moving {
                a.position.lerp(a.next_position, t)
            } else {
                a.position
            },
            facing: a.facing,
            status: a.status,
        })
    }

    /// Route agent `idx` from its position to its target.
    ///
    /// The solve runs on the overlay: a 3x3 chunk window of the map with the
    /// cells of other settled agents blocked out. Moving agents are not
    /// blocked; local avoidance handles them continuously. The cell holding
    /// the route target is also left open, so an agent whose goal is
    /// temporarily occupied keeps producing routes instead of deadlocking
    /// with a neighbor aimed the opposite way.
    fn route(&mut self, idx: usize) -> Option<VecDeque<Vec2>> {
        let (position, target) = {
            let agent = &self.agents[idx];
            (agent.position, agent.target)
        };
        let from = cell_of(position);
        let to = cell_of(target);
        if from == to {
            return Some(VecDeque::from([position, target]));
        }

        let origin = self.window_origin(from, to);
        let base = origin * CHUNK_SIZE;
        self.overlay.fill(&self.map, origin.x, origin.y);
        for (j, other) in self.agents.iter().enumerate() {
            if j == idx || other.status == AgentStatus::Moving {
                continue;
            }
            let cell = cell_of(other.position);
            if cell == to {
                continue;
            }
            let local = cell - base;
            self.overlay.block(local.x, local.y);
        }

        let path = self
            .solver
            .solve(&self.overlay, from - base, to - base)?;
        let mut waypoints = VecDeque::with_capacity(path.len());
        for cell in path.iter().skip(1).take(path.len().saturating_sub(2)) {
            waypoints.push_back(cell_center(*cell + base));
        }
        waypoints.push_back(target);
        Some(waypoints)
    }

    /// Choose the chunk origin of the 3x3 solve window. Both endpoints are
    /// covered when they fit in one window; otherwise the window centers on
    /// the start and the solve fails until the target comes into range.
    fn window_origin(&self, start: IVec2, target: IVec2) -> IVec2 {
        let s = start.div_euclid(IVec2::splat(CHUNK_SIZE));
        let t = target.div_euclid(IVec2::splat(CHUNK_SIZE));
        ivec2(
            window_axis(s.x, t.x, self.map.chunks_x()),
            window_axis(s.y, t.y, self.map.chunks_y()),
        )
    }
}

fn window_axis(s: i32, t: i32, chunks: i32) -> i32 {
    let (lo, hi) = (s.min(t), s.max(t));
    let origin = if hi - lo >= OVERLAY_CHUNKS { s - 1 } else { lo };
    origin.clamp(0, (chunks - OVERLAY_CHUNKS).max(0))
}

fn rvo_agent(agent: &Agent) -> RvoAgent {
    RvoAgent {
        position: agent.position,
        velocity: agent.velocity,
        pref_velocity: agent.pref_velocity,
        max_speed: agent.speed,
        radius: agent.radius,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bevy_math::vec2;

    fn empty_world(seed: u64) -> World {
        World::new(TileMap::new(3, 3), RvoConfig::default(), seed)
    }

    fn run_until_settled(world: &mut World, max_ticks: u32) -> u32 {
        for tick in 0..max_ticks {
            if world.settled() {
                return tick;
            }
            world.step();
            for (i, agent) in world.agents().iter().enumerate() {
                if agent.status() == AgentStatus::Moving {
                    let cell = cell_of(agent.position());
                    assert!(
                        !world.map().is_set(cell.x, cell.y),
                        "agent {i} moving inside blocked cell {cell}"
                    );
                }
            }
        }
        panic!("agents did not settle within {max_ticks} ticks");
    }

    #[test]
    fn test_single_agent_reaches_target() {
        let mut world = empty_world(1);
        world.add_agent(vec2(0.5, 0.5), vec2(10.5, 7.5), 1.0);
        run_until_settled(&mut world, 200);
        let agent = &world.agents()[0];
        assert!((agent.position() - vec2(10.5, 7.5)).length() < 0.01);
    }

    #[test]
    fn test_agent_routes_around_wall() {
        let mut world = empty_world(2);
        for y in 0..10 {
            world.map_mut().set(5, y);
        }
        world.add_agent(vec2(0.5, 0.5), vec2(12.5, 0.5), 1.2);
        run_until_settled(&mut world, 400);
        let agent = &world.agents()[0];
        assert!((agent.position() - vec2(12.5, 0.5)).length() < 0.01);
    }

    #[test]
    fn test_unreachable_target_keeps_retrying() {
        let mut world = empty_world(3);
        // box the target in
        for (x, y) in [(9, 10), (11, 10), (10, 9), (10, 11), (9, 9), (11, 11), (9, 11), (11, 9)] {
            world.map_mut().set(x, y);
        }
        world.add_agent(vec2(0.5, 0.5), vec2(10.5, 10.5), 1.0);
        for _ in 0..100 {
            world.step();
        }
        let agent = &world.agents()[0];
        assert_eq!(agent.status(), AgentStatus::Stopped);
        assert!(same_cell(agent.position(), vec2(0.5, 0.5)));
    }

    #[test]
    fn test_adjacent_swap_settles() {
        let mut world = empty_world(4);
        world.add_agent(vec2(8.3, 8.45), vec2(9.7, 8.55), 0.9);
        world.add_agent(vec2(9.7, 8.55), vec2(8.3, 8.45), 0.9);
        run_until_settled(&mut world, 3000);
        for agent in world.agents() {
            assert!(
                (agent.position() - agent.target()).length() < 0.5,
                "agent settled at {} but aimed for {}",
                agent.position(),
                agent.target(),
            );
        }
    }

    #[test]
    fn test_crossing_agents_settle() {
        let mut world = empty_world(5);
        world.add_agent(vec2(8.5, 10.0), vec2(8.5, 24.0), 1.2);
        world.add_agent(vec2(8.4, 24.0), vec2(8.6, 12.0), 1.2);
        world.add_agent(vec2(2.0, 16.9), vec2(16.0, 17.0), 1.2);
        world.add_agent(vec2(16.0, 17.1), vec2(3.0, 17.0), 1.2);
        run_until_settled(&mut world, 3000);
    }

    #[test]
    fn test_draw_state_interpolates() {
        let mut world = empty_world(6);
        world.add_agent(vec2(0.5, 0.5), vec2(5.5, 0.5), 1.0);
        world.step(); // routes, zero preferred velocity
        world.step(); // first real motion assignment
        let views: Vec<AgentView> = world.draw_state(0.5).collect();
        assert_eq!(views.len(), 1);
        let agent = &world.agents()[0];
        let expected = agent.position().lerp(agent.next_position, 0.5);
        assert_eq!(views[0].position, expected);
    }

    #[test]
    fn test_window_origin_clamps() {
        let world = World::new(TileMap::new(5, 5), RvoConfig::default(), 0);
        // both endpoints in one window
        assert_eq!(world.window_origin(ivec2(5, 5), ivec2(40, 40)), ivec2(0, 0));
        // close pair away from the origin
        assert_eq!(
            world.window_origin(ivec2(70, 70), ivec2(75, 75)),
            ivec2(2, 2)
        );
        // distant target: window centers on the start
        assert_eq!(world.window_origin(ivec2(8, 8), ivec2(79, 8)), ivec2(0, 0));
    }
}
