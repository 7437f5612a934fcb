use bevy::prelude::*;
use fundsp::shared::Shared;

use crate::audio::dsp::param::ParamHandle;
use crate::config::schema::{BusConfig, LimiterConfig};

pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Named mix buses every layer and voice pool routes through before the
/// master fader (spec.md §4.10, "Bus & Master"). Exactly four buses exist —
/// one-shot impact/bubble voices fold onto `Rain`, ambient material loops
/// fold onto `Wind`, there is no separate bus for either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusId {
    Rain,
    Wind,
    Thunder,
    Matrix,
}

pub const ALL_BUS_IDS: [BusId; 4] = [BusId::Rain, BusId::Wind, BusId::Thunder, BusId::Matrix];

/// A bus's mix state (spec.md §4.10): `input -> panner -> EQ3 ->
/// preFaderSplit -> [compressor] -> gain -> output`, with `reverbSend`/
/// `delaySend` tapped off the pre-fader split. This struct is the ECS-side
/// mirror of [`BusConfig`] — [`MasterBus::apply_bus_config`] is the only
/// place that writes it from the document.
#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
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

impl Bus {
    fn new(id: BusId) -> Self {
        Self {
            id,
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

/// Per-entity marker recording which bus an audio entity belongs to, set by
/// the build systems at spawn time. [`MasterBus`] tracks the current
/// mix state for that bus; querying `BusRoute` alongside it is how a future
/// mixer UI or level meter would group live entities by bus.
#[derive(Component, Debug, Clone, Copy)]
pub struct BusRoute(pub BusId);

/// Shared DSP-thread handles for a single voice's bus mix, cloned out of
/// [`MasterBus::spawn_voice_mix`] at spawn time and wired into
/// [`crate::audio::dsp::source::ProceduralAudio`] so the decoder can read
/// the live bus state every audio block — the one point every voice's
/// samples pass through before Bevy's own mixer sums them (spec.md §4.10's
/// live signal path requirement).
#[derive(Clone)]
pub struct VoiceMix {
    pub gain: Shared,
    pub pan: Shared,
    pub eq_low_db: Shared,
    pub eq_mid_db: Shared,
    pub eq_high_db: Shared,
    pub compressor_enabled: Shared,
    pub compressor_threshold_db: Shared,
    pub compressor_ratio: Shared,
    pub limiter_threshold_lin: Shared,
    pub limiter_release_s: Shared,
}

/// Main-thread side of [`VoiceMix`]: a [`bus_mix_apply_system`] writes these
/// every frame from the entity's routed [`Bus`] state.
#[derive(Component)]
pub struct BusGain {
    pub gain: ParamHandle,
    pub pan: ParamHandle,
    pub eq_low_db: ParamHandle,
    pub eq_mid_db: ParamHandle,
    pub eq_high_db: ParamHandle,
    pub compressor_enabled: ParamHandle,
    pub compressor_threshold_db: ParamHandle,
    pub compressor_ratio: ParamHandle,
}

#[derive(Resource)]
pub struct MasterBus {
    pub buses: Vec<Bus>,
    pub master_gain: f32,
    pub master_muted: bool,
    limiter_threshold: ParamHandle,
    limiter_release: ParamHandle,
}

impl Default for MasterBus {
    fn default() -> Self {
        Self {
            buses: ALL_BUS_IDS.iter().map(|&id| Bus::new(id)).collect(),
            master_gain: 1.0,
            master_muted: false,
            limiter_threshold: ParamHandle::new("master_limiter_threshold", db_to_linear(-1.0), 0.0, 4.0),
            limiter_release: ParamHandle::new("master_limiter_release", 0.1, 0.001, 5.0),
        }
    }
}

impl MasterBus {
    pub fn bus(&self, id: BusId) -> &Bus {
        self.buses.iter().find(|b| b.id == id).expect("every BusId has a bus")
    }

    pub fn bus_mut(&mut self, id: BusId) -> &mut Bus {
        self.buses.iter_mut().find(|b| b.id == id).expect("every BusId has a bus")
    }

    pub fn set_bus_gain(&mut self, id: BusId, gain: f32) {
        self.bus_mut(id).gain = gain.clamp(0.0, 2.0);
    }

    pub fn set_bus_muted(&mut self, id: BusId, muted: bool) {
        self.bus_mut(id).muted = muted;
    }

    /// Writes every [`BusConfig`] field into the matching bus (spec.md §6).
    pub fn apply_bus_config(&mut self, id: BusId, cfg: &BusConfig) {
        let bus = self.bus_mut(id);
        bus.gain = cfg.gain.clamp(0.0, 2.0);
        bus.muted = cfg.muted;
        bus.solo = cfg.solo;
        bus.pan = cfg.pan.clamp(-1.0, 1.0);
        bus.eq_low_db = cfg.eq_low_db;
        bus.eq_mid_db = cfg.eq_mid_db;
        bus.eq_high_db = cfg.eq_high_db;
        bus.compressor_enabled = cfg.compressor_enabled;
        bus.compressor_threshold_db = cfg.compressor_threshold_db;
        bus.compressor_ratio = cfg.compressor_ratio.max(1.0);
        bus.reverb_send = cfg.reverb_send.clamp(0.0, 1.0);
        bus.delay_send = cfg.delay_send.clamp(0.0, 1.0);
    }

    pub fn apply_limiter_config(&mut self, cfg: &LimiterConfig) {
        self.limiter_threshold.set(db_to_linear(cfg.threshold_db));
        self.limiter_release.set(cfg.release_s.max(0.001));
    }

    fn any_bus_soloed(&self) -> bool {
        self.buses.iter().any(|b| b.solo)
    }

    /// spec.md §4.10: `effective mute = bus.mute OR (anyBusSoloed AND NOT bus.solo)`.
    pub fn effective_muted(&self, id: BusId) -> bool {
        let bus = self.bus(id);
        bus.muted || (self.any_bus_soloed() && !bus.solo)
    }

    /// Master-then-bus effective gain applied to a routed entity, folding in
    /// solo state (spec.md §4.10).
    pub fn effective_gain(&self, id: BusId) -> f32 {
        if self.master_muted || self.effective_muted(id) {
            return 0.0;
        }
        self.master_gain.clamp(0.0, 2.0) * self.bus(id).gain.clamp(0.0, 2.0)
    }

    /// Builds a fresh [`VoiceMix`]/[`BusGain`] pair for a voice about to be
    /// spawned on bus `id`, seeded from the bus's current state. The build
    /// system threads `VoiceMix` into [`crate::audio::dsp::source::ProceduralAudio::new`]
    /// and inserts `BusGain` as a component alongside [`BusRoute`].
    pub fn spawn_voice_mix(&self, id: BusId) -> (VoiceMix, BusGain) {
        let bus = self.bus(id);
        let gain = ParamHandle::new("voice_bus_gain", self.effective_gain(id), 0.0, 4.0);
        let pan = ParamHandle::new("voice_bus_pan", bus.pan, -1.0, 1.0);
        let eq_low_db = ParamHandle::new("voice_bus_eq_low_db", bus.eq_low_db, -24.0, 24.0);
        let eq_mid_db = ParamHandle::new("voice_bus_eq_mid_db", bus.eq_mid_db, -24.0, 24.0);
        let eq_high_db = ParamHandle::new("voice_bus_eq_high_db", bus.eq_high_db, -24.0, 24.0);
        let compressor_enabled =
            ParamHandle::new("voice_bus_comp_enabled", if bus.compressor_enabled { 1.0 } else { 0.0 }, 0.0, 1.0);
        let compressor_threshold_db =
            ParamHandle::new("voice_bus_comp_threshold_db", bus.compressor_threshold_db, -60.0, 0.0);
        let compressor_ratio = ParamHandle::new("voice_bus_comp_ratio", bus.compressor_ratio, 1.0, 20.0);

        let mix = VoiceMix {
            gain: gain.shared().clone(),
            pan: pan.shared().clone(),
            eq_low_db: eq_low_db.shared().clone(),
            eq_mid_db: eq_mid_db.shared().clone(),
            eq_high_db: eq_high_db.shared().clone(),
            compressor_enabled: compressor_enabled.shared().clone(),
            compressor_threshold_db: compressor_threshold_db.shared().clone(),
            compressor_ratio: compressor_ratio.shared().clone(),
            limiter_threshold_lin: self.limiter_threshold.shared().clone(),
            limiter_release_s: self.limiter_release.shared().clone(),
        };
        let handles = BusGain {
            gain,
            pan,
            eq_low_db,
            eq_mid_db,
            eq_high_db,
            compressor_enabled,
            compressor_threshold_db,
            compressor_ratio,
        };
        (mix, handles)
    }
}

/// Ramps each routed voice's live gain toward [`MasterBus::effective_gain`]
/// over 50ms (spec.md §4.10's mute ramp, applied to gain changes generally
/// so unmuting restores just as smoothly) and writes the rest of the bus
/// mix state straight through every frame.
const BUS_GAIN_RAMP_S: f32 = 0.05;

pub fn bus_mix_apply_system(time: Res<Time>, master: Res<MasterBus>, query: Query<(&BusRoute, &BusGain)>) {
    let dt = time.delta_secs();
    let step = (dt / BUS_GAIN_RAMP_S).max(0.0);
    for (route, handles) in &query {
        let bus = master.bus(route.0);
        let target = master.effective_gain(route.0);
        let current = handles.gain.get();
        handles.gain.set(current + (target - current).clamp(-step, step));

        handles.pan.set(bus.pan);
        handles.eq_low_db.set(bus.eq_low_db);
        handles.eq_mid_db.set(bus.eq_mid_db);
        handles.eq_high_db.set(bus.eq_high_db);
        handles.compressor_enabled.set(if bus.compressor_enabled { 1.0 } else { 0.0 });
        handles.compressor_threshold_db.set(bus.compressor_threshold_db);
        handles.compressor_ratio.set(bus.compressor_ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_bus_yields_zero_gain_regardless_of_level() {
        let mut master = MasterBus::default();
        master.set_bus_gain(BusId::Thunder, 1.8);
        master.set_bus_muted(BusId::Thunder, true);
        assert_eq!(master.effective_gain(BusId::Thunder), 0.0);
    }

    #[test]
    fn master_mute_overrides_every_bus() {
        let mut master = MasterBus::default();
        master.master_muted = true;
        assert_eq!(master.effective_gain(BusId::Rain), 0.0);
    }

    #[test]
    fn bus_and_master_gain_multiply() {
        let mut master = MasterBus::default();
        master.master_gain = 0.5;
        master.set_bus_gain(BusId::Wind, 0.8);
        assert!((master.effective_gain(BusId::Wind) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn solo_on_one_bus_mutes_all_unsoloed_buses() {
        let mut master = MasterBus::default();
        master.bus_mut(BusId::Matrix).solo = true;
        assert_eq!(master.effective_gain(BusId::Rain), 0.0);
        assert!(master.effective_gain(BusId::Matrix) > 0.0);
    }

    #[test]
    fn apply_bus_config_writes_every_field() {
        let mut master = MasterBus::default();
        let mut cfg = BusConfig::default();
        cfg.gain = 1.4;
        cfg.pan = -0.5;
        cfg.eq_low_db = 3.0;
        cfg.compressor_enabled = true;
        cfg.reverb_send = 0.25;
        master.apply_bus_config(BusId::Rain, &cfg);
        let bus = master.bus(BusId::Rain);
        assert_eq!(bus.gain, 1.4);
        assert_eq!(bus.pan, -0.5);
        assert_eq!(bus.eq_low_db, 3.0);
        assert!(bus.compressor_enabled);
        assert_eq!(bus.reverb_send, 0.25);
    }
}
