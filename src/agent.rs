#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use std::collections::VecDeque;

use bevy_math::Vec2;

use crate::math::{cell_interior, same_cell, EPSILON};

/// Facing used before an agent has ever moved.
pub(crate) const DEFAULT_FACING: Vec2 = Vec2 { x: 0.0, y: -1.0 };

/// Where an agent is in its route, follow, avoid and arrive lifecycle.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentStatus {
    /// Waiting in place for the next route attempt.
    #[default]
    Stopped,
    /// Following a waypoint list under local avoidance.
    Moving,
    /// Arrived; the agent no longer participates in the simulation.
    Terminated,
}

/// One navigating agent.
///
/// The world owns the state machine; the public surface is the read-only
/// view a renderer or game layer needs.
#[derive(Debug, Clone)]
pub struct Agent {
    pub(crate) position: Vec2,
    pub(crate) target: Vec2,
    pub(crate) speed: f32,
    pub(crate) radius: f32,
    pub(crate) status: AgentStatus,
    pub(crate) next_position: Vec2,
    pub(crate) waypoints: VecDeque<Vec2>,
    pub(crate) facing: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) pref_velocity: Vec2,
    pub(crate) wait: u32,
}

impl Agent {
    pub(crate) fn new(position: Vec2, target: Vec2, speed: f32, radius: f32) -> Self {
        Self {
            position,
            target,
            speed,
            radius,
            status: AgentStatus::Stopped,
            next_position: position,
            waypoints: VecDeque::new(),
            facing: DEFAULT_FACING,
            velocity: Vec2::ZERO,
            pref_velocity: Vec2::ZERO,
            wait: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.status
    }

    /// Unit vector the agent last moved along; for rendering.
    #[inline]
    #[must_use]
    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Halt in place and wait `wait` ticks before the next route attempt.
    /// The position snaps into the cell interior so the coming route starts
    /// from a clean cell centroid.
    pub(crate) fn stop(&mut self, wait: u32) {
        self.status = AgentStatus::Stopped;
        self.position = cell_interior(self.position);
        self.next_position = self.position;
        self.velocity = Vec2::ZERO;
        self.wait = wait;
    }

    /// Drop leading waypoints whose cell the agent already occupies, then
    /// return the next waypoint to steer toward. `None` once the list is
    /// exhausted or the agent is on top of the final waypoint.
    pub(crate) fn next_waypoint(&mut self) -> Option<Vec2> {
        while self.waypoints.len() > 1 {
            if same_cell(self.position, self.waypoints[0]) {
                self.waypoints.pop_front();
            } else {
                break;
            }
        }
        match self.waypoints.front() {
            Some(&w) if self.position.distance_squared(w) > EPSILON => Some(w),
            _ => None,
        }
    }

    /// Point the preferred velocity at `to`, scaled so one tick of `dt`
    /// seconds never overshoots it.
    pub(crate) fn set_local_target(&mut self, to: Vec2, dt: f32) {
        let d = to - self.position;
        let step = self.speed * dt;
        if d.length_squared() <= step * step {
            self.next_position = to;
            self.pref_velocity = d / dt;
        } else {
            self.next_position = self.position + d.normalize() * step;
            self.pref_velocity = (self.next_position - self.position) / dt;
        }
    }
}
