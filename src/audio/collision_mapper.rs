use crate::audio::material::MaterialConfig;
use crate::sim::{CollisionEvent, CollisionSurface};

/// Minnaert bubble-resonance scale: a 1mm bubble rings near 3kHz, and
/// resonance is inversely proportional to radius (spec.md §4.2).
const MINNAERT_CONSTANT: f32 = 3000.0;

/// Collision-mapper physics knobs (spec.md §6, "physics.{radiusFreqMultiplier,
/// radiusDecayMultiplier, angleBubbleBoost}"): the velocity/frequency/decay
/// ranges the §4.2 formulas are evaluated against, independent of any one
/// material. `vel_min/vel_max`, `freq_min/freq_max`, and `decay_base` aren't
/// individually named in the spec's enumerated config surface but are the
/// formulas' free parameters, so they live in this same physics group.
#[derive(Debug, Clone, Copy)]
pub struct ImpactPhysicsConfig {
    pub vel_min: f32,
    pub vel_max: f32,
    pub freq_min: f32,
    pub freq_max: f32,
    pub decay_base: f32,
    pub radius_freq_multiplier: f32,
    pub radius_decay_multiplier: f32,
    pub angle_bubble_boost: f32,
}

impl Default for ImpactPhysicsConfig {
    fn default() -> Self {
        Self {
            vel_min: 10.0,
            vel_max: 400.0,
            freq_min: 200.0,
            freq_max: 6000.0,
            decay_base: 0.05,
            radius_freq_multiplier: 1.0,
            radius_decay_multiplier: 0.1,
            angle_bubble_boost: 0.0,
        }
    }
}

/// Fully determined set of one-shot synth parameters for a single impact,
/// independent of any particular graph-building backend.
#[derive(Debug, Clone, Copy)]
pub struct ImpactParams {
    pub volume_db: f32,
    pub frequency_hz: f32,
    pub decay_s: f32,
    pub filter_freq_hz: f32,
    pub filter_q: f32,
    pub trigger_bubble: bool,
    pub pan: f32,
}

/// Stateless mapping from a physics collision to acoustic parameters
/// (spec.md §4.2, "Collision Mapper"). Pure function: same event, material,
/// and physics config always produce the same params, modulo the caller's
/// own randomness draw for `trigger_bubble`.
pub fn map(event: &CollisionEvent, material: &MaterialConfig, bubble_roll: f32) -> ImpactParams {
    map_with_physics(event, material, bubble_roll, &ImpactPhysicsConfig::default())
}

/// [`map`], but against caller-supplied physics knobs instead of the
/// built-in defaults (spec.md §6, "physics.{...}").
pub fn map_with_physics(
    event: &CollisionEvent,
    material: &MaterialConfig,
    bubble_roll: f32,
    physics: &ImpactPhysicsConfig,
) -> ImpactParams {
    let speed = event.velocity.max(0.0);

    // `volume_dB = logMap(|v|, [velMin..velMax] -> [-40..-6])`, shaped by
    // `log10(9t+1)` so it rises steeply near velMin and flattens near velMax.
    let vel_span = (physics.vel_max - physics.vel_min).max(1e-6);
    let vel_t = ((speed - physics.vel_min) / vel_span).clamp(0.0, 1.0);
    let log_shaped = (9.0 * vel_t + 1.0).log10();
    let volume_db = (-40.0 + 34.0 * log_shaped) + material.gain_offset_db;

    let radius_m = (event.drop_radius / crate::geometry::LOGIC_TO_SCREEN).max(0.5);
    let frequency_hz = ((MINNAERT_CONSTANT / radius_m) * material.pitch_multiplier * physics.radius_freq_multiplier)
        .clamp(physics.freq_min, physics.freq_max);

    let decay_s = (physics.decay_base + radius_m * physics.radius_decay_multiplier)
        .clamp(material.decay_min, material.decay_max);

    let v_frac = (speed / physics.vel_max.max(1e-6)).min(1.0);
    let filter_freq_hz = (material.filter_freq * (1.0 + v_frac)).clamp(20.0, 18000.0);

    // Steeper impacts (closer to straight-down) are more likely to trip the
    // secondary bubble resonance. `impact_angle` is already in radians
    // (spec.md §4.1, "Collision emission to audio").
    let angle_factor = ((0.5 + 0.5 * event.impact_angle.cos()) * (1.0 + physics.angle_bubble_boost)).clamp(0.0, 1.0);
    let side_penalty = if event.collision_surface == CollisionSurface::Top { 1.0 } else { 0.4 };
    let velocity_factor = if speed < 10.0 {
        1.0
    } else if speed <= 15.0 {
        0.75
    } else {
        0.5
    };
    let bubble_chance = (material.bubble_probability * angle_factor * side_penalty * velocity_factor).clamp(0.0, 1.0);
    let trigger_bubble = bubble_roll < bubble_chance;

    let pan = (event.position_x / 1920.0 * 2.0 - 1.0).clamp(-1.0, 1.0);

    ImpactParams {
        volume_db,
        frequency_hz,
        decay_s,
        filter_freq_hz,
        filter_q: material.filter_q,
        trigger_bubble,
        pan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::material::MaterialRegistry;

    fn sample_event() -> CollisionEvent {
        CollisionEvent {
            velocity: 300.0,
            drop_radius: 4.0,
            impact_angle: 0.0,
            surface_type: "glass",
            mass: 1.0,
            position_x: 960.0,
            position_y: 100.0,
            collision_surface: CollisionSurface::Top,
        }
    }

    #[test]
    fn louder_impact_yields_higher_volume() {
        let reg = MaterialRegistry::new();
        let glass = reg.get("glass");
        let soft = map(&CollisionEvent { velocity: 20.0, ..sample_event() }, &glass, 1.0);
        let hard = map(&CollisionEvent { velocity: 400.0, ..sample_event() }, &glass, 1.0);
        assert!(hard.volume_db > soft.volume_db);
    }

    #[test]
    fn velocity_at_vel_min_floors_volume_at_minus_40_db() {
        let reg = MaterialRegistry::new();
        let default_mat = reg.get("default");
        let physics = ImpactPhysicsConfig::default();
        let params = map_with_physics(
            &CollisionEvent { velocity: physics.vel_min, ..sample_event() },
            &default_mat,
            1.0,
            &physics,
        );
        assert!((params.volume_db - (-40.0 + default_mat.gain_offset_db)).abs() < 1e-4);
    }

    #[test]
    fn velocity_at_or_above_vel_max_caps_volume_at_minus_6_db() {
        let reg = MaterialRegistry::new();
        let default_mat = reg.get("default");
        let physics = ImpactPhysicsConfig::default();
        let params = map_with_physics(
            &CollisionEvent { velocity: physics.vel_max, ..sample_event() },
            &default_mat,
            1.0,
            &physics,
        );
        assert!((params.volume_db - (-6.0 + default_mat.gain_offset_db)).abs() < 1e-4);
    }

    #[test]
    fn smaller_radius_yields_higher_pitch() {
        let reg = MaterialRegistry::new();
        let glass = reg.get("glass");
        let small = map(&CollisionEvent { drop_radius: 2.0, ..sample_event() }, &glass, 1.0);
        let big = map(&CollisionEvent { drop_radius: 8.0, ..sample_event() }, &glass, 1.0);
        assert!(small.frequency_hz > big.frequency_hz);
    }

    #[test]
    fn radius_of_half_a_screen_unit_hits_freq_max() {
        let reg = MaterialRegistry::new();
        let default_mat = reg.get("default");
        let physics = ImpactPhysicsConfig::default();
        let params = map_with_physics(
            &CollisionEvent { drop_radius: 0.5 * crate::geometry::LOGIC_TO_SCREEN, ..sample_event() },
            &default_mat,
            1.0,
            &physics,
        );
        assert_eq!(params.frequency_hz, physics.freq_max);
    }

    #[test]
    fn decay_is_driven_by_radius_not_speed() {
        let reg = MaterialRegistry::new();
        let glass = reg.get("glass");
        let slow_small = map(&CollisionEvent { velocity: 5.0, drop_radius: 2.0, ..sample_event() }, &glass, 1.0);
        let fast_small = map(&CollisionEvent { velocity: 399.0, drop_radius: 2.0, ..sample_event() }, &glass, 1.0);
        assert_eq!(slow_small.decay_s, fast_small.decay_s);

        let small = map(&CollisionEvent { drop_radius: 2.0, ..sample_event() }, &glass, 1.0);
        let big = map(&CollisionEvent { drop_radius: 8.0, ..sample_event() }, &glass, 1.0);
        assert!(big.decay_s >= small.decay_s);
    }

    #[test]
    fn bubble_roll_below_chance_triggers() {
        let reg = MaterialRegistry::new();
        let glass = reg.get("glass");
        let params = map(&sample_event(), &glass, 0.0);
        assert!(params.trigger_bubble);
        let params_never = map(&sample_event(), &glass, 1.0);
        assert!(!params_never.trigger_bubble);
    }

    #[test]
    fn side_collision_halves_bubble_chance_relative_to_top() {
        let reg = MaterialRegistry::new();
        let glass = reg.get("glass");
        let top = map(&sample_event(), &glass, 0.2);
        let side = map(
            &CollisionEvent { collision_surface: CollisionSurface::Left, ..sample_event() },
            &glass,
            0.2,
        );
        assert!(top.trigger_bubble);
        assert!(!side.trigger_bubble);
    }

    #[test]
    fn velocity_factor_steps_down_past_the_10_and_15_thresholds() {
        let reg = MaterialRegistry::new();
        let glass = reg.get("glass");
        let slow = map(&CollisionEvent { velocity: 5.0, ..sample_event() }, &glass, 0.5);
        let fast = map(&CollisionEvent { velocity: 20.0, ..sample_event() }, &glass, 0.5);
        assert!(slow.trigger_bubble);
        assert!(!fast.trigger_bubble);
    }
}
