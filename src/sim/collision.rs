/// Which side of a cell a drop struck (spec.md §3, "Collision event").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionSurface {
    Top,
    Left,
    Right,
}

/// Emitted at most once per drop per tick; reused zero-allocation by the
/// simulator (one struct, filled in and pushed to a bounded queue rather
/// than allocated per event).
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    /// Screen px/s — logic-space velocity already scaled by
    /// [`crate::geometry::LOGIC_TO_SCREEN`].
    pub velocity: f32,
    /// Screen px.
    pub drop_radius: f32,
    pub impact_angle: f32,
    pub surface_type: &'static str,
    pub mass: f32,
    pub position_x: f32,
    pub position_y: f32,
    pub collision_surface: CollisionSurface,
}

/// Default slip threshold for the "pass-through" edge case (spec.md §4.1,
/// "Collision-side resolution").
pub const DEFAULT_SLIP_THRESHOLD: f32 = 0.85;

/// Resolves which side of a cell was struck given the entry velocity,
/// following spec.md §4.1's "Collision-side resolution" verbatim:
///
/// - entered from above (`vy > 0`) with horizontal slip exceeding
///   `slip_threshold` of the speed: passes through, no collision;
/// - entered from above otherwise: `Top`;
/// - entered laterally with matching horizontal sign: `Left`/`Right`;
/// - otherwise (entering from below): no collision.
pub fn resolve_collision_side(
    vel_x: f32,
    vel_y: f32,
    entered_from_above: bool,
    entered_from_side: Option<CollisionSurface>,
    slip_threshold: f32,
) -> Option<CollisionSurface> {
    let speed = (vel_x * vel_x + vel_y * vel_y).sqrt();
    if speed <= f32::EPSILON {
        return None;
    }

    if entered_from_above && vel_y > 0.0 {
        let slip = vel_x.abs() / speed;
        if slip > slip_threshold {
            return None;
        }
        return Some(CollisionSurface::Top);
    }

    if let Some(side) = entered_from_side {
        let sign_matches = match side {
            CollisionSurface::Left => vel_x < 0.0,
            CollisionSurface::Right => vel_x > 0.0,
            CollisionSurface::Top => false,
        };
        if sign_matches {
            return Some(side);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steep_vertical_hit_reports_top() {
        let side = resolve_collision_side(0.0, 200.0, true, None, DEFAULT_SLIP_THRESHOLD);
        assert_eq!(side, Some(CollisionSurface::Top));
    }

    #[test]
    fn shallow_grazing_hit_passes_through() {
        // |vx|/|v| ~ 0.995 > 0.85 threshold.
        let side = resolve_collision_side(200.0, 20.0, true, None, DEFAULT_SLIP_THRESHOLD);
        assert_eq!(side, None);
    }

    #[test]
    fn lateral_hit_matching_sign_reports_side() {
        let side = resolve_collision_side(
            -150.0,
            10.0,
            false,
            Some(CollisionSurface::Left),
            DEFAULT_SLIP_THRESHOLD,
        );
        assert_eq!(side, Some(CollisionSurface::Left));
    }

    #[test]
    fn entering_from_below_reports_nothing() {
        let side = resolve_collision_side(0.0, -50.0, false, None, DEFAULT_SLIP_THRESHOLD);
        assert_eq!(side, None);
    }
}
