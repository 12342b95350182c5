#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use bevy_math::Vec2;

use crate::math::EPSILON;

/// Tunables for the reciprocal velocity obstacle solver.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RvoConfig {
    /// Simulated seconds advanced per tick.
    pub time_step: f32,
    /// Seconds of lookahead when building velocity obstacles.
    pub time_horizon: f32,
    /// Upper bound on neighbors folded into one solve.
    pub max_neighbors: usize,
}

impl Default for RvoConfig {
    fn default() -> Self {
        Self {
            time_step: 0.25,
            time_horizon: 1.0,
            max_neighbors: 8,
        }
    }
}

/// Kinematic state the solver reads for the agent being solved and for each
/// of its neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RvoAgent {
    pub position: Vec2,
    /// Velocity adopted on the previous tick.
    pub velocity: Vec2,
    /// Velocity the agent would take if it were alone.
    pub pref_velocity: Vec2,
    pub max_speed: f32,
    pub radius: f32,
}

/// A half-plane constraint in velocity space. Feasible velocities lie to the
/// left of the directed line through `point` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    pub point: Vec2,
    pub direction: Vec2,
}

/// The velocity chosen by a feasible solve. `changed` is false when the
/// preferred velocity already satisfied every constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RvoOutcome {
    pub velocity: Vec2,
    pub changed: bool,
}

/// Per-tick local avoidance solver.
///
/// Each neighbor contributes one reciprocal half-plane constraint derived
/// from its velocity obstacle truncated at the configured time horizon, with
/// both agents assumed to take half the correction. The feasible velocity
/// closest to the preferred one is found by an incremental two-dimensional
/// linear program over the accumulated half-planes, intersected with the
/// maximum-speed disc.
///
/// When the program has no feasible point the solve reports failure instead
/// of falling back to a least-bad velocity; callers are expected to stop and
/// re-route.
#[derive(Debug, Default)]
pub struct RvoSolver {
    config: RvoConfig,
    lines: Vec<HalfPlane>,
}

impl RvoSolver {
    #[must_use]
    pub fn new(config: RvoConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &RvoConfig {
        &self.config
    }

    /// The half-planes accumulated by the most recent [solve].
    ///
    /// [solve]: RvoSolver::solve
    #[inline]
    #[must_use]
    pub fn half_planes(&self) -> &[HalfPlane] {
        &self.lines
    }

    /// Resolve `agent`'s velocity for this tick against the pulled
    /// `neighbors`, of which at most `max_neighbors` are consumed.
    ///
    /// Returns `None` when the constraints admit no velocity at all.
    pub fn solve<'a, I>(&mut self, agent: &RvoAgent, neighbors: I) -> Option<RvoOutcome>
    where
        I: IntoIterator<Item = &'a RvoAgent>,
    {
        let mut velocity = agent.pref_velocity.clamp_length_max(agent.max_speed);
        let mut changed = false;
        self.lines.clear();
        let inv_horizon = 1.0 / self.config.time_horizon;
        for other in neighbors.into_iter().take(self.config.max_neighbors) {
            let rel_pos = other.position - agent.position;
            let rel_vel = agent.velocity - other.velocity;
            let dist_sq = rel_pos.length_squared();
            let radius = agent.radius + other.radius;
            let radius_sq = radius * radius;

            let direction;
            let u;
            if dist_sq > radius_sq {
                let w = rel_vel - rel_pos * inv_horizon;
                let w_len_sq = w.length_squared();
                let dot = w.dot(rel_pos);
                if dot < 0.0 && dot * dot > radius_sq * w_len_sq {
                    // w points into the truncation cap of the cone
                    let w_len = w_len_sq.sqrt();
                    let unit_w = w / w_len;
                    direction = Vec2::new(unit_w.y, -unit_w.x);
                    u = unit_w * (radius * inv_horizon - w_len);
                } else {
                    let leg = (dist_sq - radius_sq).sqrt();
                    direction = if rel_pos.perp_dot(w) > 0.0 {
                        Vec2::new(
                            rel_pos.x * leg - rel_pos.y * radius,
                            rel_pos.x * radius + rel_pos.y * leg,
                        ) / dist_sq
                    } else {
                        -Vec2::new(
                            rel_pos.x * leg + rel_pos.y * radius,
                            -rel_pos.x * radius + rel_pos.y * leg,
                        ) / dist_sq
                    };
                    u = direction * rel_vel.dot(direction) - rel_vel;
                }
            } else {
                // already overlapping: resolve against the cutoff circle one
                // tick out instead of the full horizon
                let inv_step = 1.0 / self.config.time_step;
                let w = rel_vel - rel_pos * inv_step;
                let w_len = w.length();
                let unit_w = w / w_len;
                direction = Vec2::new(unit_w.y, -unit_w.x);
                u = unit_w * (radius * inv_step - w_len);
            }

            let point = agent.velocity + u * 0.5;
            let (v, adjusted) = self.apply_line(agent, point, direction, velocity)?;
            velocity = v;
            changed |= adjusted;
        }
        Some(RvoOutcome { velocity, changed })
    }

    /// Fold one half-plane into the program. When the current velocity
    /// violates the new constraint, project the preferred velocity onto the
    /// segment of the constraint line inside the max-speed disc and every
    /// earlier half-plane. Returns `None` when that segment is empty.
    fn apply_line(
        &mut self,
        agent: &RvoAgent,
        point: Vec2,
        direction: Vec2,
        velocity: Vec2,
    ) -> Option<(Vec2, bool)> {
        if direction.perp_dot(point - velocity) <= 0.0 {
            self.lines.push(HalfPlane { point, direction });
            return Some((velocity, false));
        }

        let dot = point.dot(direction);
        let discriminant = dot * dot + agent.max_speed * agent.max_speed - point.length_squared();
        if discriminant < 0.0 {
            // the constraint line misses the max-speed disc entirely
            return None;
        }
        let sqrt_discriminant = discriminant.sqrt();
        let mut t_left = -dot - sqrt_discriminant;
        let mut t_right = -dot + sqrt_discriminant;

        for line in &self.lines {
            let denominator = direction.perp_dot(line.direction);
            let numerator = line.direction.perp_dot(point - line.point);
            if denominator.abs() <= EPSILON {
                if numerator < 0.0 {
                    return None;
                }
                continue;
            }
            let t = numerator / denominator;
            if denominator >= 0.0 {
                t_right = t_right.min(t);
            } else {
                t_left = t_left.max(t);
            }
            if t_left > t_right {
                return None;
            }
        }

        let t = direction
            .dot(agent.pref_velocity - point)
            .clamp(t_left, t_right);
        self.lines.push(HalfPlane { point, direction });
        Some((point + direction * t, true))
    }
}
