use bevy::prelude::*;
use rand::Rng;

use crate::audio::bus::{BusId, BusRoute, MasterBus};
use crate::audio::dsp::source::ProceduralAudio;
use crate::audio::layers::matrix::{build_matrix_graph, MatrixLayer, MatrixSequencer};
use crate::audio::layers::sheet::{build_sheet_graph, SheetLayer};
use crate::audio::layers::texture::{build_texture_graph, TextureVoice};
use crate::audio::layers::thunder::{
    build_thunder_graph, spawn_thunder_event, IrCache, IrManifest, ThunderEvent, ThunderScheduler,
};
use crate::audio::layers::wind::{build_wind_graph, WindLayer};
use crate::audio::material::MaterialRegistry;
use crate::audio::pools::bubble::BubbleVoice;
use crate::audio::pools::impact::ImpactVoice;
use crate::audio::pools::{BubbleVoicePool, ImpactVoicePool};
use crate::audio::dsp::graph_builder::{build_bubble_graph, build_impact_graph};

const SAMPLE_RATE: u32 = 44100;
const CHANNELS: u16 = 2;

pub fn impact_voice_build_system(
    mut commands: Commands,
    query: Query<(Entity, &ImpactVoice), Added<ImpactVoice>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    master: Res<MasterBus>,
) {
    for (entity, voice) in &query {
        let graph = build_impact_graph(&voice.params, voice.synth_type);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Rain);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            BusRoute(BusId::Rain),
            bus_gain,
        ));
    }
}

pub fn bubble_voice_build_system(
    mut commands: Commands,
    query: Query<(Entity, &BubbleVoice), Added<BubbleVoice>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    master: Res<MasterBus>,
) {
    for (entity, voice) in &query {
        let graph = build_bubble_graph(voice.frequency_hz, voice.gain);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Rain);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            BusRoute(BusId::Rain),
            bus_gain,
        ));
    }
}

pub fn sheet_build_system(
    mut commands: Commands,
    query: Query<(Entity, &SheetLayer), Added<SheetLayer>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    master: Res<MasterBus>,
) {
    for (entity, sheet) in &query {
        let (graph, params) = build_sheet_graph(sheet);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Rain);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            params,
            BusRoute(BusId::Rain),
            bus_gain,
        ));
    }
}

pub fn wind_build_system(
    mut commands: Commands,
    query: Query<(Entity, &WindLayer), Added<WindLayer>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    master: Res<MasterBus>,
) {
    for (entity, wind) in &query {
        let (graph, params) = build_wind_graph(wind);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Wind);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            params,
            BusRoute(BusId::Wind),
            bus_gain,
        ));
    }
}

pub fn matrix_build_system(
    mut commands: Commands,
    query: Query<(Entity, &MatrixLayer), Added<MatrixLayer>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    master: Res<MasterBus>,
) {
    for (entity, matrix) in &query {
        let (graph, params) = build_matrix_graph(matrix);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Matrix);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            params,
            MatrixSequencer::default(),
            BusRoute(BusId::Matrix),
            bus_gain,
        ));
    }
}

pub fn texture_build_system(
    mut commands: Commands,
    query: Query<(Entity, &TextureVoice), Added<TextureVoice>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    materials: Res<MaterialRegistry>,
    master: Res<MasterBus>,
) {
    for (entity, voice) in &query {
        let material = materials.get(&voice.material_id);
        let (graph, params) = build_texture_graph(&material, voice.tier);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Wind);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            params,
            BusRoute(BusId::Wind),
            bus_gain,
        ));
    }
}

pub fn thunder_build_system(
    mut commands: Commands,
    query: Query<(Entity, &ThunderEvent), Added<ThunderEvent>>,
    mut assets: ResMut<Assets<ProceduralAudio>>,
    manifest: Res<IrManifest>,
    mut ir_cache: ResMut<IrCache>,
    master: Res<MasterBus>,
) {
    for (entity, event) in &query {
        let ir = ir_cache.resolve(&manifest, &event.environment);
        let (graph, _lifetime) = build_thunder_graph(event, &ir);
        let (mix, bus_gain) = master.spawn_voice_mix(BusId::Thunder);
        let audio = ProceduralAudio::new(graph, SAMPLE_RATE, CHANNELS, mix);
        let handle = assets.add(audio);
        commands.entity(entity).insert((
            AudioPlayer::<ProceduralAudio>(handle),
            BusRoute(BusId::Thunder),
            bus_gain,
        ));
    }
}

/// Advances the thunder auto-scheduler and spawns a new one-shot event when
/// it fires (spec.md §4.8).
pub fn thunder_auto_schedule_system(
    time: Res<Time>,
    mut scheduler: ResMut<ThunderScheduler>,
    mut commands: Commands,
) {
    let mut rng = rand::thread_rng();
    let roll: f32 = rng.gen_range(0.0..1.0);
    let distance_roll: f32 = rng.gen_range(0.0..1.0);
    if let Some(distance) = scheduler.tick(time.delta_secs(), roll, distance_roll) {
        spawn_thunder_event(
            &mut commands,
            ThunderEvent { intensity: scheduler.storm_intensity, distance, environment: scheduler.environment.clone() },
        );
    }
}

/// Drops pool bookkeeping for voices that despawned on their own (finished
/// playing via [`crate::components::lifetime::OneShotLifetime`]).
pub fn pool_release_system(
    mut removed_impact: RemovedComponents<ImpactVoice>,
    mut removed_bubble: RemovedComponents<BubbleVoice>,
    mut impact_pool: ResMut<ImpactVoicePool>,
    mut bubble_pool: ResMut<BubbleVoicePool>,
) {
    for entity in removed_impact.read() {
        impact_pool.0.release(entity);
    }
    for entity in removed_bubble.read() {
        bubble_pool.0.release(entity);
    }
}
