//! Spawns more impact/bubble voices than the default pool capacity and
//! checks the steal-oldest policy actually despawns the right entities
//! once commands are applied to a real `World`.

use bevy::ecs::world::CommandQueue;
use bevy::prelude::*;

use rainydesk::audio::collision_mapper::ImpactParams;
use rainydesk::audio::material::ImpactSynthType;
use rainydesk::audio::pools::{spawn_bubble_voice, spawn_impact_voice, BubbleVoice, BubbleVoicePool, ImpactVoice, ImpactVoicePool};

fn sample_params() -> ImpactParams {
    ImpactParams {
        volume_db: -6.0,
        frequency_hz: 1500.0,
        decay_s: 0.2,
        filter_freq_hz: 2000.0,
        filter_q: 3.0,
        trigger_bubble: false,
        pan: 0.0,
    }
}

#[test]
fn impact_pool_caps_live_voices_at_its_capacity() {
    let mut world = World::new();
    let mut pool = ImpactVoicePool::default();
    let capacity = pool.0.capacity();

    for i in 0..capacity + 5 {
        let mut queue = CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        spawn_impact_voice(&mut commands, &mut pool, i as f32, sample_params(), ImpactSynthType::Noise);
        queue.apply(&mut world);
    }

    assert_eq!(pool.0.active_count(), capacity);
    let live = world.query::<&ImpactVoice>().iter(&world).count();
    assert_eq!(live, capacity);
}

#[test]
fn bubble_pool_caps_live_voices_at_its_capacity() {
    let mut world = World::new();
    let mut pool = BubbleVoicePool::default();
    let capacity = pool.0.capacity();

    for i in 0..capacity + 3 {
        let mut queue = CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        spawn_bubble_voice(&mut commands, &mut pool, i as f32, 900.0 + i as f32, 0.4);
        queue.apply(&mut world);
    }

    assert_eq!(pool.0.active_count(), capacity);
    let live = world.query::<&BubbleVoice>().iter(&world).count();
    assert_eq!(live, capacity);
}
