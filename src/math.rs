use bevy_math::{ivec2, vec2, IVec2, Vec2};

/// Comparison tolerance for continuous-space quantities.
pub const EPSILON: f32 = 1.0e-5;

/// Squared [EPSILON], for comparisons against squared distances.
pub const EPSILON_SQ: f32 = EPSILON * EPSILON;

/// Obtain the cell containing the given continuous position.
#[inline]
#[must_use]
pub fn cell_of(pos: Vec2) -> IVec2 {
    ivec2(pos.x.floor() as i32, pos.y.floor() as i32)
}

/// Obtain the center of the given cell in continuous coordinates.
#[inline]
#[must_use]
pub fn cell_center(cell: IVec2) -> Vec2 {
    vec2(cell.x as f32 + 0.5, cell.y as f32 + 0.5)
}

/// Returns true if both positions fall within the same cell.
#[inline]
#[must_use]
pub fn same_cell(a: Vec2, b: Vec2) -> bool {
    cell_of(a) == cell_of(b)
}

/// Clamp a position into the interior of its cell, keeping the fractional
/// part of each axis within `[0.25, 0.75]`.
///
/// A position snapped this way always sits a quarter cell away from every
/// cell border, so it remains a usable route origin for a circular agent.
#[must_use]
pub fn cell_interior(pos: Vec2) -> Vec2 {
    let base = vec2(pos.x.floor(), pos.y.floor());
    let frac = (pos - base).clamp(Vec2::splat(0.25), Vec2::splat(0.75));
    base + frac
}

/// Signed angle, in radians, that rotates unit vector `a` onto unit vector `b`.
#[inline]
#[must_use]
pub fn angle(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b).atan2(a.dot(b))
}
