use std::collections::VecDeque;

use bevy::prelude::*;

/// Bookkeeping for a single entity-backed audio voice. The generic pool only
/// tracks lifecycle, not audio content — voices own their own components.
#[derive(Debug, Clone, Copy)]
struct VoiceSlot {
    entity: Entity,
    spawned_at: f32,
}

/// Fixed-capacity pool of one-shot voice entities (spec.md §4.3, "Voice
/// Pool"). Acquiring beyond capacity steals the oldest active voice rather
/// than growing or dropping the new trigger, matching spec.md's
/// steal-oldest overflow policy.
pub struct VoicePool {
    capacity: usize,
    active: VecDeque<VoiceSlot>,
    label: &'static str,
    stealing_enabled: bool,
}

impl VoicePool {
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            active: VecDeque::with_capacity(capacity.max(1)),
            label,
            stealing_enabled: true,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn stealing_enabled(&self) -> bool {
        self.stealing_enabled
    }

    /// `setStealing` (spec.md §4.3): toggles whether `acquire` may evict the
    /// oldest active voice once the pool is full. Disabling it makes a full
    /// pool refuse new triggers instead (spec.md §7, "Pool exhaustion").
    pub fn set_stealing(&mut self, enabled: bool) {
        self.stealing_enabled = enabled;
    }

    pub fn resize(&mut self, capacity: usize, commands: &mut Commands) {
        self.capacity = capacity.max(1);
        while self.active.len() > self.capacity {
            if let Some(slot) = self.active.pop_front() {
                commands.entity(slot.entity).despawn();
            }
        }
    }

    /// Reserves a slot for a not-yet-spawned voice, stealing the oldest
    /// active voice first if the pool is already at capacity and stealing is
    /// enabled. Returns `false` (and reserves nothing) if the pool is full
    /// and stealing is disabled — the caller must not spawn the triggered
    /// voice at all (spec.md §7: "skipped sound; no error propagated").
    pub fn try_reserve(&mut self, commands: &mut Commands) -> bool {
        if self.active.len() >= self.capacity {
            if !self.stealing_enabled {
                debug!(pool = self.label, "voice pool at capacity, stealing disabled, skipping trigger");
                return false;
            }
            if let Some(stolen) = self.active.pop_front() {
                debug!(pool = self.label, entity = ?stolen.entity, "voice pool at capacity, stealing oldest voice");
                commands.entity(stolen.entity).despawn();
            }
        }
        true
    }

    /// Registers a voice entity reserved via [`Self::try_reserve`].
    pub fn acquire(&mut self, entity: Entity, now: f32) {
        self.active.push_back(VoiceSlot { entity, spawned_at: now });
    }

    /// Drops bookkeeping for a voice that despawned on its own (finished
    /// playing). No-op if the entity isn't tracked (already stolen).
    pub fn release(&mut self, entity: Entity) {
        if let Some(pos) = self.active.iter().position(|s| s.entity == entity) {
            self.active.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::world::CommandQueue;

    fn with_world_and_commands(f: impl FnOnce(&mut World, &mut Commands)) {
        let mut world = World::new();
        let mut queue = CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        f(&mut world, &mut commands);
        queue.apply(&mut world);
    }

    #[test]
    fn acquire_beyond_capacity_steals_oldest() {
        let mut pool = VoicePool::new("test", 2);
        with_world_and_commands(|world, commands| {
            let e1 = world.spawn_empty().id();
            let e2 = world.spawn_empty().id();
            let e3 = world.spawn_empty().id();
            assert!(pool.try_reserve(commands));
            pool.acquire(e1, 0.0);
            assert!(pool.try_reserve(commands));
            pool.acquire(e2, 0.1);
            assert_eq!(pool.active_count(), 2);
            assert!(pool.try_reserve(commands));
            pool.acquire(e3, 0.2);
            assert_eq!(pool.active_count(), 2);
        });
    }

    #[test]
    fn reserve_fails_at_capacity_when_stealing_disabled() {
        let mut pool = VoicePool::new("test", 1);
        pool.set_stealing(false);
        with_world_and_commands(|world, commands| {
            let e1 = world.spawn_empty().id();
            assert!(pool.try_reserve(commands));
            pool.acquire(e1, 0.0);
            assert_eq!(pool.active_count(), 1);
            assert!(!pool.try_reserve(commands));
            assert_eq!(pool.active_count(), 1);
        });
    }

    #[test]
    fn release_removes_tracked_voice() {
        let mut pool = VoicePool::new("test", 4);
        with_world_and_commands(|world, commands| {
            let e1 = world.spawn_empty().id();
            pool.try_reserve(commands);
            pool.acquire(e1, 0.0);
            pool.release(e1);
        });
        assert_eq!(pool.active_count(), 0);
    }
}
