use bevy::prelude::*;

use crate::audio::collision_mapper::ImpactParams;
use crate::audio::material::ImpactSynthType;
use crate::audio::pools::voice_pool::VoicePool;
use crate::components::lifetime::OneShotLifetime;

/// Default pool capacity (spec.md §4.3, "Voice Pool" default sizing).
pub const DEFAULT_IMPACT_VOICES: usize = 32;

/// One-shot impact voice: carries everything `graph_build` needs to build
/// the DSP graph, attached to a freshly-spawned entity by the orchestrator
/// whenever the simulator reports a [`crate::sim::CollisionEvent`].
#[derive(Component, Debug, Clone)]
pub struct ImpactVoice {
    pub params: ImpactParams,
    pub synth_type: ImpactSynthType,
}

/// Bookkeeping resource: tracks which entities are live impact voices so the
/// pool can steal the oldest one under overflow (spec.md §4.3).
#[derive(Resource)]
pub struct ImpactVoicePool(pub VoicePool);

impl Default for ImpactVoicePool {
    fn default() -> Self {
        Self(VoicePool::new("impact", DEFAULT_IMPACT_VOICES))
    }
}

/// Spawns a one-shot impact voice entity and registers it with the pool,
/// stealing the oldest voice first if the pool is already full. Returns
/// `None` without spawning anything if the pool is full and stealing has
/// been disabled (spec.md §4.3, §7 "Pool exhaustion").
pub fn spawn_impact_voice(
    commands: &mut Commands,
    pool: &mut ImpactVoicePool,
    now: f32,
    params: ImpactParams,
    synth_type: ImpactSynthType,
) -> Option<Entity> {
    if !pool.0.try_reserve(commands) {
        return None;
    }
    let lifetime = (params.decay_s * 1.3).max(0.05);
    let entity = commands
        .spawn((ImpactVoice { params, synth_type }, OneShotLifetime::new(lifetime)))
        .id();
    pool.0.acquire(entity, now);
    Some(entity)
}
