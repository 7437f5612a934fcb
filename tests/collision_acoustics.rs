//! End-to-end acoustics: a raw `CollisionEvent` combined with a material
//! pulled from the registry should produce sane, comparable `ImpactParams`
//! across the builtin material set, and a freshly-registered material
//! should flow through the same path unchanged.

use rainydesk::audio::material::ImpactSynthType;
use rainydesk::audio::{map_collision, MaterialConfig, MaterialRegistry};
use rainydesk::components::synth::OscillatorType;
use rainydesk::prelude::{CollisionEvent, CollisionSurface};

fn event(velocity: f32, drop_radius: f32) -> CollisionEvent {
    CollisionEvent {
        velocity,
        drop_radius,
        impact_angle: 0.0,
        surface_type: "glass",
        mass: 1.0,
        position_x: 100.0,
        position_y: 50.0,
        collision_surface: CollisionSurface::Top,
    }
}

#[test]
fn glass_is_higher_pitched_than_concrete_for_the_same_drop() {
    let registry = MaterialRegistry::new();
    let glass = registry.get("glass");
    let concrete = registry.get("concrete");
    let e = event(250.0, 3.0);

    let glass_params = map_collision(&e, &glass, 0.0);
    let concrete_params = map_collision(&e, &concrete, 0.0);

    assert!(glass_params.frequency_hz > concrete_params.frequency_hz);
}

#[test]
fn unregistered_surface_falls_back_to_default_material() {
    let registry = MaterialRegistry::new();
    let default_material = registry.get("default");
    let missing_material = registry.get("spaceship_hull");
    let e = event(180.0, 2.0);

    let default_params = map_collision(&e, &default_material, 0.0);
    let missing_params = map_collision(&e, &missing_material, 0.0);

    assert_eq!(default_params.frequency_hz, missing_params.frequency_hz);
    assert_eq!(default_params.volume_db, missing_params.volume_db);
}

#[test]
fn custom_registered_material_flows_through_the_mapper() {
    let registry = MaterialRegistry::new();
    registry.register(MaterialConfig {
        id: "hull_plating".to_string(),
        bubble_probability: 1.0,
        impact_synth_type: ImpactSynthType::Metal,
        bubble_oscillator_type: OscillatorType::Square,
        filter_freq: 6000.0,
        filter_q: 12.0,
        decay_min: 0.2,
        decay_max: 0.6,
        pitch_multiplier: 1.4,
        gain_offset_db: 2.0,
    });

    let hull = registry.get("hull_plating");
    let e = event(300.0, 1.5);
    // Top-surface, zero-angle, maximum bubble probability and a bubble_roll
    // of 0.0 guarantees the bubble trigger fires (spec.md §4.2).
    let params = map_collision(&e, &hull, 0.0);

    assert!(params.trigger_bubble);
    assert_eq!(params.filter_q, 12.0);
    // `filterFreq_Hz = material.filterFreq * (1 + vFrac)` (spec.md §4.2):
    // any positive velocity fraction pushes the cutoff above the material's
    // own filter_freq.
    assert!(params.filter_freq_hz > hull.filter_freq);
}
