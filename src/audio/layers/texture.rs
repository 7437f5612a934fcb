use std::collections::VecDeque;

use bevy::prelude::*;
use fundsp::prelude32::*;

use crate::audio::dsp::graph_builder::noise_bed;
use crate::audio::dsp::param::ParamHandle;
use crate::audio::material::MaterialConfig;

/// How many distinct material textures are allowed to stay resident at once
/// before the least-recently-used one is evicted (spec.md §4.6, "Texture
/// Layer"). Rebuilding a texture graph is cheap, so this only bounds
/// memory/CPU for a desktop with many distinct surfaces in view.
pub const TEXTURE_CACHE_CAPACITY: usize = 16;

/// How crowded a material's view footprint is, coarsened from the live
/// window-zone count into a handful of bands rather than tracked
/// continuously (spec.md §4.6, "density tiers"). Each tier nudges the
/// texture's filter cutoff and level instead of changing the underlying
/// noise character, so a tier change can cross-fade rather than pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityTier {
    Sparse,
    Moderate,
    Dense,
}

impl DensityTier {
    pub fn from_zone_count(count: usize) -> Self {
        match count {
            0..=1 => DensityTier::Sparse,
            2..=4 => DensityTier::Moderate,
            _ => DensityTier::Dense,
        }
    }

    fn cutoff_scale(self) -> f32 {
        match self {
            DensityTier::Sparse => 0.8,
            DensityTier::Moderate => 1.0,
            DensityTier::Dense => 1.3,
        }
    }

    fn gain_scale(self) -> f32 {
        match self {
            DensityTier::Sparse => 0.6,
            DensityTier::Moderate => 1.0,
            DensityTier::Dense => 1.4,
        }
    }
}

/// A single resident texture voice: a filtered-noise loop whose tone is
/// derived from the material's `filter_freq`/`filter_q` and scaled by its
/// density tier. `load_generation` is bumped every time the cache
/// re-creates the entity for this material (a tier change, or a fresh
/// entry after eviction) — stale async work from a previous generation can
/// compare against this to know it's no longer wanted (spec.md §4.6,
/// "loadGeneration").
#[derive(Component)]
pub struct TextureVoice {
    pub material_id: String,
    pub tier: DensityTier,
    pub load_generation: u32,
}

#[derive(Component)]
pub struct TextureParams {
    pub gain: ParamHandle,
    /// Cross-fade position from 0 (just (re)built, silent) to 1 (settled at
    /// this tier's resting level) — ramped up by `texture_crossfade_system`
    /// so a tier change's graph rebuild fades in instead of popping in at
    /// full level (spec.md §4.6, "gapless A/B crossfade").
    pub settle: ParamHandle,
}

pub fn build_texture_graph(material: &MaterialConfig, tier: DensityTier) -> (Box<dyn AudioUnit>, TextureParams) {
    let gain_param = ParamHandle::new("texture_gain", 0.0, 0.0, 1.0);
    let settle_param = ParamHandle::new("texture_settle", 0.0, 0.0, 1.0);
    let gain_s = gain_param.shared().clone();
    let settle_s = settle_param.shared().clone();

    let cutoff = material.filter_freq * tier.cutoff_scale();
    let q = material.filter_q.max(0.3);
    let tier_gain = 0.15 * tier.gain_scale();
    let graph = noise_bed(cutoff, q)
        * (var(&gain_s) >> map(move |f: &Frame<f32, U1>| f[0] * tier_gain))
        * (var(&settle_s) >> map(|f: &Frame<f32, U1>| f[0]));
    let stereo = graph >> split::<U2>();

    (Box::new(stereo), TextureParams { gain: gain_param, settle: settle_param })
}

/// Ramps every resident voice's `settle` param from 0 toward 1 over ~0.3s,
/// the gapless fade-in that stands in for an A/B buffer crossfade in this
/// procedural-synthesis engine (see DESIGN.md).
pub fn texture_crossfade_system(time: Res<Time>, query: Query<&TextureParams, With<TextureVoice>>) {
    let step = time.delta_secs() / 0.3;
    for params in &query {
        let next = (params.settle.get() + step).min(1.0);
        params.settle.set(next);
    }
}

/// LRU registry of which materials currently have a resident texture voice.
/// Keyed by material id; the orchestrator consults this before spawning a
/// new `TextureVoice` entity and evicts (despawns) the least-recently-used
/// one once [`TEXTURE_CACHE_CAPACITY`] is exceeded.
#[derive(Resource, Default)]
pub struct TextureCache {
    order: VecDeque<String>,
    entities: std::collections::HashMap<String, Entity>,
    generations: std::collections::HashMap<String, u32>,
}

impl TextureCache {
    pub fn touch(&mut self, material_id: &str) {
        if let Some(pos) = self.order.iter().position(|m| m == material_id) {
            self.order.remove(pos);
        }
        self.order.push_back(material_id.to_string());
    }

    pub fn contains(&self, material_id: &str) -> bool {
        self.entities.contains_key(material_id)
    }

    pub fn insert(&mut self, material_id: &str, entity: Entity) {
        self.entities.insert(material_id.to_string(), entity);
        self.touch(material_id);
    }

    pub fn get(&self, material_id: &str) -> Option<Entity> {
        self.entities.get(material_id).copied()
    }

    /// Forgets `material_id`'s resident entity without touching its place
    /// in the LRU order or its generation counter — used right before
    /// re-inserting a freshly rebuilt entity for the same material.
    pub fn remove(&mut self, material_id: &str) {
        self.entities.remove(material_id);
    }

    /// Bumps and returns the load generation for `material_id`: 1 the first
    /// time it's seen, incrementing every time it's rebuilt after that.
    pub fn bump_generation(&mut self, material_id: &str) -> u32 {
        let gen = self.generations.entry(material_id.to_string()).or_insert(0);
        *gen += 1;
        *gen
    }

    /// Returns the material id to evict, if the cache is over capacity, and
    /// forgets it. The caller is responsible for despawning the entity.
    pub fn evict_if_over_capacity(&mut self) -> Option<(String, Entity)> {
        if self.order.len() <= TEXTURE_CACHE_CAPACITY {
            return None;
        }
        let victim = self.order.pop_front()?;
        let entity = self.entities.remove(&victim)?;
        self.generations.remove(&victim);
        Some((victim, entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_oldest_past_capacity() {
        let mut cache = TextureCache::default();
        for i in 0..(TEXTURE_CACHE_CAPACITY + 2) {
            let id = format!("mat{i}");
            cache.insert(&id, Entity::from_raw(i as u32));
        }
        let victim = cache.evict_if_over_capacity();
        assert_eq!(victim.unwrap().0, "mat0");
    }

    #[test]
    fn touching_an_entry_protects_it_from_early_eviction() {
        let mut cache = TextureCache::default();
        for i in 0..TEXTURE_CACHE_CAPACITY {
            cache.insert(&format!("mat{i}"), Entity::from_raw(i as u32));
        }
        cache.touch("mat0");
        cache.insert("newcomer", Entity::from_raw(999));
        let victim = cache.evict_if_over_capacity().unwrap();
        assert_eq!(victim.0, "mat1");
    }

    #[test]
    fn density_tier_buckets_by_zone_count() {
        assert_eq!(DensityTier::from_zone_count(1), DensityTier::Sparse);
        assert_eq!(DensityTier::from_zone_count(3), DensityTier::Moderate);
        assert_eq!(DensityTier::from_zone_count(10), DensityTier::Dense);
    }

    #[test]
    fn generation_bumps_on_each_call_after_the_first_insert() {
        let mut cache = TextureCache::default();
        cache.insert("glass", Entity::from_raw(1));
        let first = cache.bump_generation("glass");
        let second = cache.bump_generation("glass");
        assert!(second > first);
    }
}
