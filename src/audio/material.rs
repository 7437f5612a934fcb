use std::collections::HashMap;
use std::sync::RwLock;

use bevy::prelude::Resource;

/// Impact synth family a material routes through (spec.md §3, "Material
/// descriptor").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImpactSynthType {
    Noise,
    Metal,
    Membrane,
}

/// Named, clonable surface-acoustics descriptor (spec.md §3).
#[derive(Debug, Clone)]
pub struct MaterialConfig {
    pub id: String,
    pub bubble_probability: f32,
    pub impact_synth_type: ImpactSynthType,
    pub bubble_oscillator_type: crate::components::synth::OscillatorType,
    pub filter_freq: f32,
    pub filter_q: f32,
    pub decay_min: f32,
    pub decay_max: f32,
    pub pitch_multiplier: f32,
    pub gain_offset_db: f32,
}

impl MaterialConfig {
    fn named(
        id: &str,
        bubble_probability: f32,
        impact_synth_type: ImpactSynthType,
        filter_freq: f32,
        filter_q: f32,
        decay_min: f32,
        decay_max: f32,
        pitch_multiplier: f32,
        gain_offset_db: f32,
    ) -> Self {
        Self {
            id: id.to_string(),
            bubble_probability,
            impact_synth_type,
            bubble_oscillator_type: crate::components::synth::OscillatorType::Sine,
            filter_freq,
            filter_q,
            decay_min,
            decay_max,
            pitch_multiplier,
            gain_offset_db,
        }
    }
}

fn builtin_materials() -> Vec<MaterialConfig> {
    vec![
        MaterialConfig::named("glass", 0.55, ImpactSynthType::Metal, 4200.0, 8.0, 0.08, 0.35, 1.15, 0.0),
        MaterialConfig::named("tin", 0.35, ImpactSynthType::Metal, 2600.0, 6.0, 0.1, 0.5, 0.9, -1.5),
        MaterialConfig::named("concrete", 0.05, ImpactSynthType::Noise, 900.0, 1.5, 0.03, 0.15, 0.6, -3.0),
        MaterialConfig::named("leaves", 0.3, ImpactSynthType::Noise, 3200.0, 2.0, 0.04, 0.12, 1.3, -2.0),
        MaterialConfig::named("wood", 0.15, ImpactSynthType::Membrane, 1400.0, 4.0, 0.06, 0.25, 0.8, -1.0),
        MaterialConfig::named("water", 0.0, ImpactSynthType::Noise, 1800.0, 3.0, 0.05, 0.2, 1.0, -4.0),
        MaterialConfig::named("default", 0.2, ImpactSynthType::Noise, 2000.0, 3.0, 0.05, 0.3, 1.0, 0.0),
    ]
}

/// Coarse-locked, read-mostly map of material id -> [`MaterialConfig`]
/// (spec.md §5, "Shared resources"): read from the collision path inside
/// `step`, written rarely by config-apply systems.
#[derive(Resource)]
pub struct MaterialRegistry {
    inner: RwLock<HashMap<String, MaterialConfig>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        let mut map = HashMap::new();
        for m in builtin_materials() {
            map.insert(m.id.clone(), m);
        }
        Self { inner: RwLock::new(map) }
    }

    pub fn register(&self, material: MaterialConfig) {
        self.inner
            .write()
            .expect("material registry lock poisoned")
            .insert(material.id.clone(), material);
    }

    pub fn update<F: FnOnce(&mut MaterialConfig)>(&self, id: &str, f: F) -> bool {
        let mut map = self.inner.write().expect("material registry lock poisoned");
        if let Some(m) = map.get_mut(id) {
            f(m);
            true
        } else {
            false
        }
    }

    /// Falls back to the `"default"` material (never fails collision
    /// lookup, spec.md §4.2: "no failures").
    pub fn get(&self, id: &str) -> MaterialConfig {
        let map = self.inner.read().expect("material registry lock poisoned");
        map.get(id)
            .or_else(|| map.get("default"))
            .cloned()
            .unwrap_or_else(|| builtin_materials().into_iter().find(|m| m.id == "default").unwrap())
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_material_falls_back_to_default() {
        let reg = MaterialRegistry::new();
        let m = reg.get("nonexistent_surface");
        assert_eq!(m.id, "default");
    }

    #[test]
    fn register_then_get_round_trips() {
        let reg = MaterialRegistry::new();
        reg.register(MaterialConfig::named(
            "custom", 0.9, ImpactSynthType::Metal, 5000.0, 10.0, 0.1, 0.4, 1.0, 0.0,
        ));
        assert_eq!(reg.get("custom").bubble_probability, 0.9);
    }

    #[test]
    fn update_mutates_in_place() {
        let reg = MaterialRegistry::new();
        let ok = reg.update("glass", |m| m.filter_freq = 9999.0);
        assert!(ok);
        assert_eq!(reg.get("glass").filter_freq, 9999.0);
        assert!(!reg.update("nope", |_| {}));
    }
}
