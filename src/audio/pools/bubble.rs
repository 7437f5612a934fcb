use bevy::prelude::*;

use crate::audio::pools::voice_pool::VoicePool;
use crate::components::lifetime::OneShotLifetime;

/// Default pool capacity (spec.md §4.4, "Bubble Voice Pool" default sizing).
pub const DEFAULT_BUBBLE_VOICES: usize = 16;

/// Secondary "plink" voice triggered by the collision mapper's bubble roll
/// (spec.md §4.4).
#[derive(Component, Debug, Clone, Copy)]
pub struct BubbleVoice {
    pub frequency_hz: f32,
    pub gain: f32,
}

#[derive(Resource)]
pub struct BubbleVoicePool(pub VoicePool);

impl Default for BubbleVoicePool {
    fn default() -> Self {
        Self(VoicePool::new("bubble", DEFAULT_BUBBLE_VOICES))
    }
}

/// Returns `None` without spawning anything if the pool is full and
/// stealing has been disabled (spec.md §4.3, §7 "Pool exhaustion").
pub fn spawn_bubble_voice(
    commands: &mut Commands,
    pool: &mut BubbleVoicePool,
    now: f32,
    frequency_hz: f32,
    gain: f32,
) -> Option<Entity> {
    if !pool.0.try_reserve(commands) {
        return None;
    }
    let entity = commands
        .spawn((BubbleVoice { frequency_hz, gain }, OneShotLifetime::new(0.12)))
        .id();
    pool.0.acquire(entity, now);
    Some(entity)
}
