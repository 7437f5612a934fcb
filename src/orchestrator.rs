use std::cell::RefCell;
use std::rc::Rc;

use bevy::prelude::*;

use crate::audio::bus::{bus_mix_apply_system, MasterBus};
use crate::audio::layers::matrix::MatrixCollisionFeed;
use crate::audio::layers::thunder::{
    thunder_auto_schedule_system, thunder_sidechain_duck_system, IrCache, IrManifest, ThunderDuck, ThunderScheduler,
};
use crate::audio::layers::{
    matrix_sequencer_system, sheet_live_intensity_system, sheet_sync_system, texture_crossfade_system, wind_sync_system,
    DensityTier, MatrixLayer, MatrixSectionChanged, SheetLayer, TextureCache, TextureVoice, WindGustState, WindLayer,
};
use crate::audio::material::MaterialRegistry;
use crate::audio::pools::{spawn_bubble_voice, spawn_impact_voice, BubbleVoicePool, ImpactVoicePool};
use crate::audio::systems::{
    bubble_voice_build_system, impact_voice_build_system, matrix_build_system, pool_release_system,
    sheet_build_system, texture_build_system, thunder_build_system, wind_build_system,
};
use crate::audio::{map_collision, LayerKind, MaterialConfig};
use crate::components::lifetime::oneshot_lifetime_system;
use crate::config::schema::{SheetConfig, WindConfig};
use crate::config::{autosave_system, PersistenceState, RainscapeConfig};
use crate::geometry::{VirtualDesktop, WindowZones};
use crate::sim::{CollisionEvent, GridSimulator};

/// Which element of [`RainscapeConfig::sheets`]/[`RainscapeConfig::winds`] a
/// long-lived layer entity mirrors, since those became `Vec`s (spec.md §6,
/// "Sheet Layer[xN]"/"Wind[xN]") rather than single singleton fields.
#[derive(Component, Debug, Clone, Copy)]
pub struct SheetSlot(pub usize);

#[derive(Component, Debug, Clone, Copy)]
pub struct WindSlot(pub usize);

/// Non-Send: [`GridSimulator`]'s collision callback is a plain `Box<dyn
/// FnMut>` with no `Send` bound (spec.md §5, "Concurrency model" — the
/// simulator lives entirely on the main thread; only the audio graphs it
/// triggers cross onto FunDSP's render thread, and they do so through
/// `Shared`/`ParamHandle`, not through this struct).
pub struct SimulatorRes {
    pub sim: GridSimulator,
    events: Rc<RefCell<Vec<CollisionEvent>>>,
}

impl SimulatorRes {
    pub fn new(vd: &VirtualDesktop, max_drops: usize, max_splashes: usize) -> Self {
        let mut sim = GridSimulator::new(vd, max_drops, max_splashes);
        let events: Rc<RefCell<Vec<CollisionEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        sim.set_on_collision(move |e| sink.borrow_mut().push(e));
        Self { sim, events }
    }

    fn drain_events(&self) -> Vec<CollisionEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

/// Advances the simulation and converts every collision it reports this
/// frame into impact (and, probabilistically, bubble) voices — the core
/// physics-to-acoustics pipeline (spec.md §2, "Orchestrator").
pub fn simulation_step_system(
    mut commands: Commands,
    mut sim_res: NonSendMut<SimulatorRes>,
    materials: Res<MaterialRegistry>,
    mut impact_pool: ResMut<ImpactVoicePool>,
    mut bubble_pool: ResMut<BubbleVoicePool>,
    mut matrix_feed: ResMut<MatrixCollisionFeed>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();
    sim_res.sim.step(dt);
    let events = sim_res.drain_events();
    let now = time.elapsed_secs();

    for event in events {
        let material: MaterialConfig = materials.get(event.surface_type);
        let bubble_roll: f32 = rand::random::<f32>();
        let params = map_collision(&event, &material, bubble_roll);

        spawn_impact_voice(&mut commands, &mut impact_pool, now, params, material.impact_synth_type);

        if params.trigger_bubble {
            spawn_bubble_voice(&mut commands, &mut bubble_pool, now, params.frequency_hz * 1.8, 0.2);
        }

        // Every collision is a candidate accent for the Matrix sequencer's
        // next beat (spec.md §4.9, Open Question: "does the Matrix react to
        // collisions?" — resolved yes, see DESIGN.md).
        matrix_feed.pending += 1;
    }
}

/// Re-paints the simulator's grid whenever the host pushes new window
/// geometry, and keeps the Texture Layer's resident voices matched to the
/// set of materials currently in view (spec.md §4.6, "Texture voice
/// cache"): every distinct `zone.material` gets (or keeps) a resident
/// `TextureVoice`, touched in LRU order, with the least-recently-seen one
/// evicted once the cache is over capacity.
pub fn apply_window_zones_system(
    zones: Res<WindowZones>,
    vd: Res<VirtualDesktop>,
    mut sim_res: NonSendMut<SimulatorRes>,
    mut commands: Commands,
    mut cache: ResMut<TextureCache>,
    voices: Query<&TextureVoice>,
) {
    if !zones.is_changed() {
        return;
    }
    sim_res.sim.update_window_zones(&vd, &zones.0);

    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for zone in &zones.0 {
        let Some(material_id) = &zone.material else { continue };
        *counts.entry(material_id.clone()).or_insert(0) += 1;
    }

    for (material_id, zone_count) in &counts {
        let tier = DensityTier::from_zone_count(*zone_count);
        if let Some(entity) = cache.get(material_id) {
            cache.touch(material_id);
            // A tier shift invalidates the resident graph outright (spec.md
            // §4.6, "loadGeneration"): despawning and re-inserting bumps the
            // generation counter and re-triggers `texture_build_system`'s
            // `Added<TextureVoice>` rebuild. A same-tier touch is gapless —
            // nothing is rebuilt, it just stays resident.
            if voices.get(entity).map(|v| v.tier) != Ok(tier) {
                commands.entity(entity).despawn();
                cache.remove(material_id);
                let generation = cache.bump_generation(material_id);
                let new_entity = commands
                    .spawn(TextureVoice { material_id: material_id.clone(), tier, load_generation: generation })
                    .id();
                cache.insert(material_id, new_entity);
            }
        } else {
            let generation = cache.bump_generation(material_id);
            let entity = commands
                .spawn(TextureVoice { material_id: material_id.clone(), tier, load_generation: generation })
                .id();
            cache.insert(material_id, entity);
        }
    }

    while let Some((_, entity)) = cache.evict_if_over_capacity() {
        commands.entity(entity).despawn();
    }
}

/// Spawns the long-lived Sheet/Wind/Matrix layer entities once at startup,
/// seeded from the initial config. Their graphs get built the same frame by
/// the `Added<T>`-gated `*_build_system`s (spec.md §4.5/§4.7/§4.9).
pub fn spawn_continuous_layers_system(mut commands: Commands, config: Res<RainscapeConfig>) {
    let default_sheet = vec![SheetConfig::default()];
    let sheets = if config.sheets.is_empty() { &default_sheet } else { &config.sheets };
    for (i, sheet_cfg) in sheets.iter().enumerate() {
        commands.spawn((
            LayerKind::Sheet,
            SheetSlot(i),
            // Intensity starts silent: it is derived every frame from the
            // live drop count by `sheet_live_intensity_system`, not treated
            // as a static config knob (spec.md §4.5).
            SheetLayer { intensity: 0.0, base_cutoff_hz: sheet_cfg.base_cutoff_hz },
        ));
    }

    let default_wind = vec![WindConfig::default()];
    let winds = if config.winds.is_empty() { &default_wind } else { &config.winds };
    for (i, wind_cfg) in winds.iter().enumerate() {
        commands.spawn((
            LayerKind::Wind,
            WindSlot(i),
            WindLayer { speed: wind_cfg.speed, direction: wind_cfg.direction },
            WindGustState::default(),
        ));
    }

    commands.spawn((
        LayerKind::Matrix,
        MatrixLayer {
            enabled: config.matrix.enabled,
            tempo_bpm: config.matrix.tempo_bpm,
            intensity: config.matrix.intensity,
            glitch_probability: config.matrix.glitch_probability,
            transpose_semitones: config.matrix.transpose_semitones,
        },
    ));
}

/// Re-applies the current [`RainscapeConfig`]'s layer fields onto the
/// long-lived Sheet/Wind/Matrix entities, called once at startup and again
/// whenever the host hands the engine a new config (spec.md §6, "config
/// fan-out"). Mutating the components (rather than replacing them) is what
/// lets `sheet_sync_system`/`wind_sync_system` notice via `Changed<T>`.
pub fn apply_config_to_layers_system(
    config: Res<RainscapeConfig>,
    mut sheets: Query<(&SheetSlot, &mut SheetLayer)>,
    mut winds: Query<(&WindSlot, &mut WindLayer)>,
    mut matrices: Query<&mut MatrixLayer>,
) {
    if !config.is_changed() {
        return;
    }
    for (slot, mut sheet) in &mut sheets {
        if let Some(cfg) = config.sheets.get(slot.0) {
            // `intensity` is intentionally left alone here: it's driven
            // live by `sheet_live_intensity_system`, not by config.
            sheet.base_cutoff_hz = cfg.base_cutoff_hz;
        }
    }
    for (slot, mut wind) in &mut winds {
        if let Some(cfg) = config.winds.get(slot.0) {
            wind.speed = cfg.speed;
            wind.direction = cfg.direction;
        }
    }
    for mut matrix in &mut matrices {
        matrix.enabled = config.matrix.enabled;
        matrix.tempo_bpm = config.matrix.tempo_bpm;
        matrix.intensity = config.matrix.intensity;
        matrix.glitch_probability = config.matrix.glitch_probability;
        matrix.transpose_semitones = config.matrix.transpose_semitones;
    }
}

/// Applies the current [`RainscapeConfig`] to every other live
/// resource/param (spec.md §6, "config fan-out").
pub fn apply_config_system(
    config: Res<RainscapeConfig>,
    mut sim_res: NonSendMut<SimulatorRes>,
    mut scheduler: ResMut<ThunderScheduler>,
    mut duck: ResMut<ThunderDuck>,
    mut master: ResMut<MasterBus>,
) {
    if !config.is_changed() {
        return;
    }
    sim_res.sim.set_intensity(config.sim.intensity);
    sim_res.sim.set_wind(config.sim.wind_base);
    sim_res.sim.set_gravity(config.sim.gravity);
    sim_res.sim.set_splash_scale(config.sim.splash_scale);
    sim_res.sim.set_turbulence(config.sim.turbulence);
    sim_res.sim.set_evaporation_rate(config.sim.evaporation_rate);
    sim_res.sim.set_reverse_gravity(config.sim.reverse_gravity);

    scheduler.mean_interval_s = config.thunder.mean_interval_s;
    scheduler.storm_intensity = config.thunder.storm_intensity;
    scheduler.environment = config.thunder.environment.clone();
    duck.enabled = config.thunder.sidechain_enabled;
    duck.ratio = config.thunder.sidechain_ratio;

    master.master_gain = config.mixer.master_gain;
    master.master_muted = config.mixer.master_muted;
    master.apply_bus_config(crate::audio::BusId::Rain, &config.mixer.rain);
    master.apply_bus_config(crate::audio::BusId::Wind, &config.mixer.wind);
    master.apply_bus_config(crate::audio::BusId::Thunder, &config.mixer.thunder);
    master.apply_bus_config(crate::audio::BusId::Matrix, &config.mixer.matrix);
    master.apply_limiter_config(&config.mixer.limiter);
}

/// Marks the persistence state dirty whenever the config changes, so the
/// autosave system picks it up on its next due tick.
pub fn mark_config_dirty_system(config: Res<RainscapeConfig>, mut persistence: ResMut<PersistenceState>) {
    if config.is_changed() {
        persistence.mark_dirty();
    }
}

/// Registers every orchestrator, pool, and layer system in the order the
/// pipeline depends on: simulate, then map+spawn voices, then build their
/// DSP graphs, then autosave/config fan-out.
pub fn build_schedule(app: &mut App) {
    app.init_resource::<ImpactVoicePool>()
        .init_resource::<BubbleVoicePool>()
        .init_resource::<MaterialRegistry>()
        .init_resource::<MasterBus>()
        .init_resource::<ThunderScheduler>()
        .init_resource::<ThunderDuck>()
        .init_resource::<IrManifest>()
        .init_resource::<IrCache>()
        .init_resource::<MatrixCollisionFeed>()
        .init_resource::<TextureCache>()
        .init_resource::<WindowZones>()
        .add_event::<MatrixSectionChanged>()
        .add_systems(Startup, spawn_continuous_layers_system)
        .add_systems(
            Update,
            (
                apply_config_system,
                apply_config_to_layers_system,
                apply_window_zones_system,
                simulation_step_system,
                sheet_live_intensity_system,
                thunder_auto_schedule_system,
                thunder_sidechain_duck_system,
                (
                    impact_voice_build_system,
                    bubble_voice_build_system,
                    sheet_build_system,
                    wind_build_system,
                    matrix_build_system,
                    texture_build_system,
                    thunder_build_system,
                ),
                (sheet_sync_system, wind_sync_system, matrix_sequencer_system, texture_crossfade_system),
                bus_mix_apply_system,
                oneshot_lifetime_system,
                pool_release_system,
                mark_config_dirty_system,
                autosave_system,
            )
                .chain(),
        );
}
