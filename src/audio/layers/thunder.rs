use std::collections::VecDeque;
use std::path::Path;

use bevy::prelude::*;
use fundsp::prelude32::*;
use serde::Deserialize;

use crate::audio::bus::{BusId, MasterBus};
use crate::audio::dsp::graph_builder::wet_dry_reverb;
use crate::audio::dsp::processors::{fbm_noise, phasor_with_duty, sample_hold};
use crate::components::lifetime::OneShotLifetime;
use crate::config::RainscapeConfig;
use crate::error::{log_degraded, RainydeskError};

/// Distance band a thunder event is scheduled into, scaling both loudness
/// and the crack-to-boom delay the way real thunder's travel time does
/// (spec.md §4.8, "Thunder Layer").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThunderDistance {
    Near,
    Mid,
    Far,
}

impl ThunderDistance {
    fn delay_s(self) -> f32 {
        match self {
            ThunderDistance::Near => 0.05,
            ThunderDistance::Mid => 0.8,
            ThunderDistance::Far => 2.5,
        }
    }

    fn intensity_scale(self) -> f32 {
        match self {
            ThunderDistance::Near => 1.0,
            ThunderDistance::Mid => 0.65,
            ThunderDistance::Far => 0.35,
        }
    }
}

/// One entry of `ir-manifest.json`: an environment's reverb character
/// (spec.md §6, "ir-manifest.json"). This engine is procedural-synthesis
/// only — there is no sample/impulse-response convolution engine anywhere
/// in the codebase it was grown from — so `file` is carried through for
/// round-tripping the manifest format but the environment's *character* is
/// realised as a parametrised `wet_dry_reverb` rather than true convolution
/// against the named file (see DESIGN.md).
#[derive(Debug, Clone, Deserialize)]
pub struct IrEntry {
    pub environment: String,
    pub file: String,
    pub decay: f32,
    pub wetness: f32,
}

#[derive(Resource, Debug, Clone, Default, Deserialize)]
pub struct IrManifest {
    pub entries: Vec<IrEntry>,
}

impl IrManifest {
    /// Loads and parses `path`. A missing or malformed manifest is not
    /// fatal (spec.md §7, "Manifest missing/malformed... uses fallback_ir
    /// for every strike"): this logs once and returns an empty manifest, so
    /// every lookup falls through to [`fallback_ir`].
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<IrManifest>(&text) {
                Ok(manifest) => manifest,
                Err(source) => {
                    log_degraded(
                        "ir_manifest_parse_failed",
                        RainydeskError::RainDocument { path: path.display().to_string(), source },
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn lookup(&self, environment: &str) -> Option<&IrEntry> {
        self.entries.iter().find(|e| e.environment == environment)
    }
}

/// The entry used whenever the manifest has nothing for an environment
/// name — a plain, medium-sized room tail.
pub fn fallback_ir(environment: &str) -> IrEntry {
    IrEntry { environment: environment.to_string(), file: String::new(), decay: 1.8, wetness: 0.25 }
}

/// LRU cache of resolved [`IrEntry`] values by environment name, the same
/// touch/evict shape as `texture::TextureCache` (spec.md §9, "LRU +
/// in-flight dedup caches for IR/texture loads").
#[derive(Resource, Default)]
pub struct IrCache {
    order: VecDeque<String>,
    entries: std::collections::HashMap<String, IrEntry>,
}

const IR_CACHE_CAPACITY: usize = 8;

impl IrCache {
    /// Returns the resolved entry for `environment`, consulting the cache
    /// first, then `manifest`, then [`fallback_ir`] — inserting whichever
    /// is found so the next lookup is free.
    pub fn resolve(&mut self, manifest: &IrManifest, environment: &str) -> IrEntry {
        if let Some(entry) = self.entries.get(environment) {
            self.touch(environment);
            return entry.clone();
        }
        let entry = manifest.lookup(environment).cloned().unwrap_or_else(|| fallback_ir(environment));
        self.entries.insert(environment.to_string(), entry.clone());
        self.touch(environment);
        while self.order.len() > IR_CACHE_CAPACITY {
            if let Some(victim) = self.order.pop_front() {
                self.entries.remove(&victim);
            }
        }
        entry
    }

    fn touch(&mut self, environment: &str) {
        if let Some(pos) = self.order.iter().position(|e| e == environment) {
            self.order.remove(pos);
        }
        self.order.push_back(environment.to_string());
    }
}

/// One-shot thunder event, spawned either by the auto-scheduler or by a
/// lightning-correlated trigger. Five sub-models summed: crack, boom, mid
/// body, rumble tail, and electrical crackle.
#[derive(Component, Debug, Clone)]
pub struct ThunderEvent {
    pub intensity: f32,
    pub distance: ThunderDistance,
    pub environment: String,
}

/// Drives automatic, unscripted thunder during a storm: fires roughly every
/// `mean_interval_s` seconds (Poisson-ish via per-tick probability) as long
/// as `storm_intensity` is above the threshold (spec.md §4.8, "auto
/// scheduling").
#[derive(Resource)]
pub struct ThunderScheduler {
    pub mean_interval_s: f32,
    pub storm_intensity: f32,
    /// IR-manifest environment id each auto-fired strike is tagged with
    /// (spec.md §6, "thunder.environment"), kept in sync from config by
    /// `apply_config_system` the same way `mean_interval_s`/`storm_intensity`
    /// are.
    pub environment: String,
    elapsed_since_last: f32,
}

impl Default for ThunderScheduler {
    fn default() -> Self {
        Self {
            mean_interval_s: 25.0,
            storm_intensity: 0.0,
            environment: "plains".to_string(),
            elapsed_since_last: 0.0,
        }
    }
}

impl ThunderScheduler {
    /// Advances the scheduler clock and returns `Some(distance)` the tick a
    /// strike should fire. `roll` is caller-supplied randomness in `[0, 1)`
    /// so the scheduler itself stays free of RNG state.
    pub fn tick(&mut self, dt: f32, roll: f32, distance_roll: f32) -> Option<ThunderDistance> {
        self.elapsed_since_last += dt;
        if self.storm_intensity <= 0.01 || self.mean_interval_s <= 0.01 {
            return None;
        }
        let rate = 1.0 / self.mean_interval_s * self.storm_intensity.clamp(0.0, 1.0);
        let chance_this_tick = rate * dt;
        if roll >= chance_this_tick {
            return None;
        }
        self.elapsed_since_last = 0.0;
        Some(if distance_roll < 0.2 {
            ThunderDistance::Near
        } else if distance_roll < 0.6 {
            ThunderDistance::Mid
        } else {
            ThunderDistance::Far
        })
    }
}

/// Sidechain-ducks the Rain/Ambience buses while a thunder strike's crack
/// is loudest (spec.md §4.8/§4.10, "sidechain duck"), so the procedural
/// rain wash briefly makes room for the strike instead of masking it.
#[derive(Resource)]
pub struct ThunderDuck {
    pub enabled: bool,
    pub ratio: f32,
    remaining_s: f32,
}

impl Default for ThunderDuck {
    fn default() -> Self {
        Self { enabled: true, ratio: 0.6, remaining_s: 0.0 }
    }
}

impl ThunderDuck {
    pub fn trigger(&mut self, hold_s: f32) {
        if self.enabled {
            self.remaining_s = hold_s;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining_s = (self.remaining_s - dt).max(0.0);
    }

    /// Multiplier to apply on top of the configured bus gain: `1.0 -
    /// ratio` while ducked, `1.0` once the hold window has elapsed.
    pub fn factor(&self) -> f32 {
        if self.remaining_s > 0.0 {
            1.0 - self.ratio.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Re-applies [`ThunderDuck`]'s current factor on top of the Rain/Wind
/// buses' configured gain every frame.
pub fn thunder_sidechain_duck_system(
    time: Res<Time>,
    config: Res<RainscapeConfig>,
    mut duck: ResMut<ThunderDuck>,
    mut master: ResMut<MasterBus>,
) {
    duck.tick(time.delta_secs());
    let factor = duck.factor();
    master.set_bus_gain(BusId::Rain, config.mixer.rain.gain * factor);
    master.set_bus_gain(BusId::Wind, config.mixer.wind.gain * factor);
}

/// Builds a one-shot thunder graph grounded directly in the lightning-strike
/// preset's layer structure, generalized with a distance-scaled intensity
/// and crack/boom offset and an added low rumble tail for the far band.
pub fn build_thunder_graph(event: &ThunderEvent, ir: &IrEntry) -> (Box<dyn AudioUnit>, f32) {
    let int = event.intensity * event.distance.intensity_scale();
    let crack_delay = event.distance.delay_s();

    let crack_env = lfo(move |t: f32| -> f32 {
        let t = t - crack_delay * 0.02; // crack always leads the boom slightly
        if t < 0.0 || t > 0.15 {
            return 0.0;
        }
        let attack = (t * 5000.0).min(1.0);
        (attack * (-t * 20.0).exp()) * 0.5 * int
    });
    let crack_layer = noise() * crack_env;

    let boom_env = lfo(move |t: f32| -> f32 {
        let t = t - crack_delay;
        if t < 0.0 || t > 3.0 {
            return 0.0;
        }
        let attack = (t * 40.0).min(1.0);
        (attack * (-t * 1.0).exp()) * 0.75 * int
    });
    let boom_layer = (noise() >> lowpole_hz(75.0) >> lowpole_hz(75.0)) * boom_env;

    let mid_env = lfo(move |t: f32| -> f32 {
        let t = t - crack_delay;
        if t < 0.0 || t > 2.0 {
            return 0.0;
        }
        let attack = (t * 100.0).min(1.0);
        (attack * (-t * 1.6).exp()) * 0.35 * int
    });
    let mid_layer = (noise() >> lowpole_hz(350.0)) * mid_env;

    let rumble_env = lfo(move |t: f32| -> f32 {
        let t = t - crack_delay - 0.4;
        if t < 0.0 || t > 4.0 {
            return 0.0;
        }
        let attack = (t * 4.0).min(1.0);
        (attack * (-t * 0.5).exp()) * 0.4 * int
    });

    // Granular rumble body (spec.md §4.8 "Rumbler"): fBm path A drives a
    // phasor's frequency; fBm path B is sampled-and-held on the phasor's
    // rising edge and trimmed with a 300 Hz highpass. Both paths share the
    // same 1000 -> 0.1 Hz, 14s exponential lowpass sweep.
    let sweep_hz = move |t: f32| -> f32 {
        let t = (t - crack_delay - 0.4).clamp(0.0, 14.0);
        1000.0 * (0.1f32 / 1000.0).powf(t / 14.0)
    };
    let path_a = (fbm_noise(5, 0xA5A5_5A5A_1234_5678) | lfo(sweep_hz)) >> lowpole();
    let phasor_freq = path_a >> map(|f: &Frame<f32, U1>| f[0].max(0.0) + 1.0);
    // A short duty cycle so the ramp's wrap-around produces a fresh rising
    // edge every period instead of only once at graph start (spec.md §6,
    // "phasor generator ... duty cycle that drops to zero past the duty
    // threshold for trigger edges").
    let phasor_trigger = phasor_freq >> phasor_with_duty(0.25);

    let path_b = (fbm_noise(5, 0x1234_5678_9ABC_DEF0) | lfo(sweep_hz)) >> lowpole();
    let rumble_body = (path_b | phasor_trigger) >> sample_hold() >> highpass_hz(300.0, 9.0);

    let rumble_layer = rumble_body * rumble_env;

    let crackle_env = lfo(move |t: f32| -> f32 {
        let t = t - crack_delay;
        if t < 0.0 || t > 0.8 {
            return 0.0;
        }
        let attack = (t * 1000.0).min(1.0);
        (attack * (-t * 4.0).exp()) * 0.05 * int
    });
    let crackle_layer = (noise() >> bandpass_hz(1800.0, 4.0)) * crackle_env;

    let graph = (crack_layer + boom_layer + mid_layer + rumble_layer + crackle_layer) >> split::<U2>();

    // Farther strikes carry proportionally more of their energy in the
    // reverb tail than the direct crack; the environment's manifest entry
    // (or `fallback_ir` if it had none) sets the tail's own decay/wetness
    // character (spec.md §4.8, distance-scaled mix x environment).
    let reverb_mix = (ir.wetness + 0.25 * (1.0 - event.distance.intensity_scale())).clamp(0.0, 0.8);
    let mixed = wet_dry_reverb(graph, reverb_mix, 0.6, ir.decay, 0.5);

    let lifetime = crack_delay + ir.decay + 2.5;
    (mixed, lifetime)
}

pub fn spawn_thunder_event(commands: &mut Commands, event: ThunderEvent) -> Entity {
    let lifetime = 4.5 + event.distance.delay_s();
    commands.spawn((event, OneShotLifetime::new(lifetime))).id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_stays_silent_with_no_storm() {
        let mut sched = ThunderScheduler { storm_intensity: 0.0, ..Default::default() };
        assert!(sched.tick(1.0, 0.0, 0.5).is_none());
    }

    #[test]
    fn scheduler_can_fire_with_storm_and_lucky_roll() {
        let mut sched = ThunderScheduler { storm_intensity: 1.0, mean_interval_s: 1.0, ..Default::default() };
        assert!(sched.tick(1.0, 0.0, 0.1).is_some());
    }

    #[test]
    fn distance_roll_buckets_into_near_mid_far() {
        let mut sched = ThunderScheduler { storm_intensity: 1.0, mean_interval_s: 1.0, ..Default::default() };
        assert_eq!(sched.tick(1.0, 0.0, 0.05), Some(ThunderDistance::Near));
        let mut sched2 = ThunderScheduler { storm_intensity: 1.0, mean_interval_s: 1.0, ..Default::default() };
        assert_eq!(sched2.tick(1.0, 0.0, 0.9), Some(ThunderDistance::Far));
    }

    #[test]
    fn missing_manifest_entry_falls_back() {
        let manifest = IrManifest::default();
        let mut cache = IrCache::default();
        let entry = cache.resolve(&manifest, "canyon");
        assert_eq!(entry.environment, "canyon");
        assert_eq!(entry.file, "");
    }

    #[test]
    fn manifest_entry_is_preferred_over_fallback() {
        let manifest = IrManifest {
            entries: vec![IrEntry { environment: "canyon".to_string(), file: "canyon.ir".to_string(), decay: 3.0, wetness: 0.4 }],
        };
        let mut cache = IrCache::default();
        let entry = cache.resolve(&manifest, "canyon");
        assert_eq!(entry.file, "canyon.ir");
        assert_eq!(entry.decay, 3.0);
    }

    #[test]
    fn duck_reduces_gain_then_releases() {
        let mut duck = ThunderDuck { enabled: true, ratio: 0.5, remaining_s: 0.0 };
        duck.trigger(1.0);
        assert!((duck.factor() - 0.5).abs() < 1e-6);
        duck.tick(1.5);
        assert_eq!(duck.factor(), 1.0);
    }

    #[test]
    fn disabled_duck_never_engages() {
        let mut duck = ThunderDuck { enabled: false, ratio: 0.5, remaining_s: 0.0 };
        duck.trigger(1.0);
        assert_eq!(duck.factor(), 1.0);
    }
}
