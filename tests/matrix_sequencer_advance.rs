//! Drives `matrix_sequencer_system` through a real `World`/`Time`: the arp
//! gate only opens when a collision lands on a sixteenth-note boundary, and
//! stays silent while the layer is disabled or no collision arrives.

use bevy::prelude::*;
use rainydesk::audio::layers::{
    build_matrix_graph, matrix_sequencer_system, MatrixCollisionFeed, MatrixLayer, MatrixParams, MatrixSectionChanged,
    MatrixSequencer,
};

fn advance(app: &mut App, dt_s: f32) {
    {
        let mut time = app.world_mut().resource_mut::<Time>();
        time.advance_by(std::time::Duration::from_secs_f32(dt_s));
    }
    app.world_mut().run_schedule(Update);
}

fn new_app() -> App {
    let mut app = App::new();
    app.init_resource::<Time>();
    app.init_resource::<MatrixCollisionFeed>();
    app.add_event::<MatrixSectionChanged>();
    app.add_systems(Update, matrix_sequencer_system);
    app
}

#[test]
fn arp_gate_opens_on_a_collision_landing_on_a_sixteenth_note() {
    let mut app = new_app();

    let layer =
        MatrixLayer { enabled: true, tempo_bpm: 120.0, intensity: 0.5, glitch_probability: 0.0, transpose_semitones: 0 };
    let (_, params) = build_matrix_graph(&layer);
    let entity = app.world_mut().spawn((layer, MatrixSequencer::default(), params)).id();

    // First tick anchors `beat_origin_s`; a sixteenth note at 120bpm is
    // 0.125s, and this first tick lands exactly on a boundary but carries
    // no collision, so nothing should fire.
    advance(&mut app, 0.125);
    let params = app.world().get::<MatrixParams>(entity).unwrap();
    assert_eq!(params.arp_gate.get(), 0.0);

    // Feed a collision and land on the next sixteenth boundary.
    app.world_mut().resource_mut::<MatrixCollisionFeed>().pending += 1;
    advance(&mut app, 0.125);
    let params = app.world().get::<MatrixParams>(entity).unwrap();
    assert_eq!(params.arp_gate.get(), 1.0);
    assert!(params.root_freq.get() > 0.0);
}

#[test]
fn an_off_beat_collision_is_silently_dropped() {
    let mut app = new_app();

    let layer =
        MatrixLayer { enabled: true, tempo_bpm: 120.0, intensity: 0.5, glitch_probability: 0.0, transpose_semitones: 0 };
    let (_, params) = build_matrix_graph(&layer);
    let entity = app.world_mut().spawn((layer, MatrixSequencer::default(), params)).id();

    advance(&mut app, 0.125); // anchors the origin on a boundary
    app.world_mut().resource_mut::<MatrixCollisionFeed>().pending += 1;
    // Halfway between two sixteenth notes: far outside the +/-12ms window.
    advance(&mut app, 0.0625);
    let params = app.world().get::<MatrixParams>(entity).unwrap();
    assert_eq!(params.arp_gate.get(), 0.0);
}

#[test]
fn disabled_layer_keeps_the_arp_gate_closed() {
    let mut app = new_app();

    let layer = MatrixLayer {
        enabled: false,
        tempo_bpm: 120.0,
        intensity: 0.5,
        glitch_probability: 0.0,
        transpose_semitones: 0,
    };
    let (_, params) = build_matrix_graph(&layer);
    let entity = app.world_mut().spawn((layer, MatrixSequencer::default(), params)).id();

    app.world_mut().resource_mut::<MatrixCollisionFeed>().pending += 1;
    advance(&mut app, 2.0);
    let params = app.world().get::<MatrixParams>(entity).unwrap();
    assert_eq!(params.arp_gate.get(), 0.0);
}
