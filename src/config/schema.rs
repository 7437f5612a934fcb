use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::audio::collision_mapper::ImpactPhysicsConfig;
use crate::audio::material::ImpactSynthType;
use crate::components::synth::OscillatorType;

/// Rain/puddle simulation knobs, mirroring [`crate::sim::SimParams`] but
/// serializable and defaulted independently of it (spec.md §6,
/// "Configuration surface").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub intensity: f32,
    pub wind_base: f32,
    pub gravity: f32,
    pub splash_scale: f32,
    pub turbulence: f32,
    pub evaporation_rate: f32,
    pub reverse_gravity: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        let d = crate::sim::SimParams::default();
        Self {
            intensity: d.intensity,
            wind_base: d.wind_base,
            gravity: d.gravity,
            splash_scale: d.splash_scale,
            turbulence: d.turbulence,
            evaporation_rate: d.evaporation_rate,
            reverse_gravity: d.reverse_gravity,
        }
    }
}

/// Collision-mapper physics knobs (spec.md §6, "physics.{radiusFreqMultiplier,
/// radiusDecayMultiplier, angleBubbleBoost}"). Converts straight into
/// [`ImpactPhysicsConfig`] for the mapper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub vel_min: f32,
    pub vel_max: f32,
    pub freq_min: f32,
    pub freq_max: f32,
    pub decay_base: f32,
    pub radius_freq_multiplier: f32,
    pub radius_decay_multiplier: f32,
    pub angle_bubble_boost: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let d = ImpactPhysicsConfig::default();
        Self {
            vel_min: d.vel_min,
            vel_max: d.vel_max,
            freq_min: d.freq_min,
            freq_max: d.freq_max,
            decay_base: d.decay_base,
            radius_freq_multiplier: d.radius_freq_multiplier,
            radius_decay_multiplier: d.radius_decay_multiplier,
            angle_bubble_boost: d.angle_bubble_boost,
        }
    }
}

impl From<PhysicsConfig> for ImpactPhysicsConfig {
    fn from(c: PhysicsConfig) -> Self {
        Self {
            vel_min: c.vel_min,
            vel_max: c.vel_max,
            freq_min: c.freq_min,
            freq_max: c.freq_max,
            decay_base: c.decay_base,
            radius_freq_multiplier: c.radius_freq_multiplier,
            radius_decay_multiplier: c.radius_decay_multiplier,
            angle_bubble_boost: c.angle_bubble_boost,
        }
    }
}

/// Impact Pool config (spec.md §6, "impact.{...}"). `pitch_center`/
/// `pitch_osc_amount` are sliders in 0..100, mapped logarithmically onto Hz
/// by the impact voice's own graph builder (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub pool_size: usize,
    pub noise_type: ImpactSynthType,
    pub attack: f32,
    pub decay_min: f32,
    pub decay_max: f32,
    pub filter_freq_min: f32,
    pub filter_freq_max: f32,
    pub filter_q: f32,
    pub pitch_center: f32,
    pub pitch_osc_amount: f32,
    pub physics: PhysicsConfig,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            pool_size: 24,
            noise_type: ImpactSynthType::Noise,
            attack: 0.002,
            decay_min: 0.05,
            decay_max: 0.4,
            filter_freq_min: 200.0,
            filter_freq_max: 12000.0,
            filter_q: 3.0,
            pitch_center: 50.0,
            pitch_osc_amount: 20.0,
            physics: PhysicsConfig::default(),
        }
    }
}

/// Bubble Pool config (spec.md §6, "bubble.{...}").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    pub pool_size: usize,
    pub oscillator_type: OscillatorType,
    pub pulse_width: f32,
    pub probability: f32,
    pub chirp_amount: f32,
    pub freq_min: f32,
    pub freq_max: f32,
    pub filter_q: f32,
    pub harmonic_count: u32,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            oscillator_type: OscillatorType::Sine,
            pulse_width: 0.5,
            probability: 0.4,
            chirp_amount: 0.3,
            freq_min: 400.0,
            freq_max: 4000.0,
            filter_q: 6.0,
            harmonic_count: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub enabled: bool,
    pub noise_type: NoiseColor,
    pub intensity: f32,
    pub base_cutoff_hz: f32,
    pub filter_q: f32,
    pub min_volume: f32,
    pub max_volume: f32,
    pub max_particle_count: f32,
    pub ramp_time_s: f32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            noise_type: NoiseColor::White,
            intensity: 0.0,
            base_cutoff_hz: 3200.0,
            filter_q: 0.8,
            min_volume: 0.0,
            max_volume: 1.0,
            max_particle_count: 400.0,
            ramp_time_s: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    pub speed: f32,
    pub direction: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self { speed: 0.1, direction: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThunderConfig {
    pub mean_interval_s: f32,
    pub storm_intensity: f32,
    pub distance_km: f32,
    pub environment: String,
    pub sidechain_enabled: bool,
    pub sidechain_ratio: f32,
}

impl Default for ThunderConfig {
    fn default() -> Self {
        Self {
            mean_interval_s: 25.0,
            storm_intensity: 0.0,
            distance_km: 5.0,
            environment: "plains".to_string(),
            sidechain_enabled: true,
            sidechain_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub enabled: bool,
    pub tempo_bpm: f32,
    pub intensity: f32,
    pub glitch_probability: f32,
    pub transpose_semitones: i32,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self { enabled: false, tempo_bpm: 102.0, intensity: 0.3, glitch_probability: 0.02, transpose_semitones: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub gain: f32,
    pub muted: bool,
    pub solo: bool,
    pub pan: f32,
    pub eq_low_db: f32,
    pub eq_mid_db: f32,
    pub eq_high_db: f32,
    pub compressor_enabled: bool,
    pub compressor_threshold_db: f32,
    pub compressor_ratio: f32,
    pub reverb_send: f32,
    pub delay_send: f32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            muted: false,
            solo: false,
            pan: 0.0,
            eq_low_db: 0.0,
            eq_mid_db: 0.0,
            eq_high_db: 0.0,
            compressor_enabled: false,
            compressor_threshold_db: -18.0,
            compressor_ratio: 3.0,
            reverb_send: 0.0,
            delay_send: 0.0,
        }
    }
}

/// Master limiter config (spec.md §6, "limiter.{threshold_dB, release_s}").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub threshold_db: f32,
    pub release_s: f32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self { threshold_db: -1.0, release_s: 0.1 }
    }
}

/// The four live buses (spec.md §4.10, §6): `rain`, `wind`, `thunder`,
/// `matrix`. One-shot impact/bubble voices and ambient material loops route
/// onto whichever of these their source layer belongs to — there is no
/// separate bus for them at the config or mixer level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub master_gain: f32,
    pub master_muted: bool,
    pub limiter: LimiterConfig,
    pub rain: BusConfig,
    pub wind: BusConfig,
    pub thunder: BusConfig,
    pub matrix: BusConfig,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            master_gain: 1.0,
            master_muted: false,
            limiter: LimiterConfig::default(),
            rain: BusConfig::default(),
            wind: BusConfig::default(),
            thunder: BusConfig::default(),
            matrix: BusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbConfig {
    pub decay: f32,
    pub wetness: f32,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self { decay: 1.8, wetness: 0.2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    pub threshold_db: f32,
    pub ratio: f32,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self { threshold_db: -18.0, ratio: 3.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitcrusherConfig {
    pub enabled: bool,
    pub bits: u32,
}

impl Default for BitcrusherConfig {
    fn default() -> Self {
        Self { enabled: false, bits: 12 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialListenerConfig {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MufflingConfig {
    pub enabled: bool,
    pub volume_drop_db: f32,
    pub lp_cutoff_hz: f32,
}

impl Default for MufflingConfig {
    fn default() -> Self {
        Self { enabled: false, volume_drop_db: -6.0, lp_cutoff_hz: 900.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub enabled: bool,
    pub time_s: f32,
    pub feedback: f32,
    pub wet: f32,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self { enabled: false, time_s: 0.35, feedback: 0.3, wet: 0.2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub filter_type: FilterType,
    pub freq_hz: f32,
    pub q: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { enabled: false, filter_type: FilterType::Lowpass, freq_hz: 8000.0, q: 0.7 }
    }
}

/// Global SFX chain config (spec.md §6, "SFX: reverb/eq/compressor/
/// bitcrusher/spatial/muffling/delay/filter"). Per-bus EQ, by contrast,
/// lives on [`BusConfig`] since each bus carries its own EQ3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SfxConfig {
    pub reverb: ReverbConfig,
    pub compressor: CompressorConfig,
    pub bitcrusher: BitcrusherConfig,
    pub spatial_listener: SpatialListenerConfig,
    pub muffling: MufflingConfig,
    pub delay: DelayConfig,
    pub filter: FilterConfig,
}

/// The full, persistable Rainscape configuration (spec.md §6). Every field
/// has a `Default` so a partial or empty `.rain` document still produces a
/// usable engine state rather than a load failure.
#[derive(Debug, Clone, Default, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct RainscapeConfig {
    pub sim: SimConfig,
    pub impact: ImpactConfig,
    pub bubble: BubbleConfig,
    pub sheets: Vec<SheetConfig>,
    pub winds: Vec<WindConfig>,
    pub thunder: ThunderConfig,
    pub matrix: MatrixConfig,
    pub mixer: MixerConfig,
    pub sfx: SfxConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_object_deserializes_to_defaults() {
        let cfg: RainscapeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.sim.intensity, SimConfig::default().intensity);
        assert!(cfg.winds.is_empty());
    }

    #[test]
    fn partial_document_fills_missing_fields_with_defaults() {
        let cfg: RainscapeConfig = serde_json::from_str(r#"{"sim": {"intensity": 0.9}}"#).unwrap();
        assert_eq!(cfg.sim.intensity, 0.9);
        assert_eq!(cfg.sim.gravity, SimConfig::default().gravity);
    }

    #[test]
    fn sheets_and_winds_arrays_round_trip() {
        let mut cfg = RainscapeConfig::default();
        cfg.sheets.push(SheetConfig { intensity: 0.4, ..SheetConfig::default() });
        cfg.winds.push(WindConfig { speed: 12.0, ..WindConfig::default() });
        let json = serde_json::to_string(&cfg).unwrap();
        let round_tripped: RainscapeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped.sheets.len(), 1);
        assert_eq!(round_tripped.winds[0].speed, 12.0);
    }

    #[test]
    fn physics_config_converts_into_mapper_config() {
        let cfg = PhysicsConfig::default();
        let mapper_cfg: ImpactPhysicsConfig = cfg.into();
        assert_eq!(mapper_cfg.vel_min, cfg.vel_min);
        assert_eq!(mapper_cfg.freq_max, cfg.freq_max);
    }
}
