use bevy::prelude::*;
use fundsp::prelude32::*;

use crate::audio::dsp::param::ParamHandle;

/// Continuous wind bed (spec.md §4.7, "Wind Layer"), built from three named
/// sub-layers that are always present but individually gain-modulated by
/// `speed`, plus a discretely-scheduled gust layer on top:
/// - Aeolian: a narrow resonant peak moving air makes through a gap,
///   sharpening and rising in pitch with speed
/// - Singing: a higher, thinner harmonic cluster above the Aeolian tone —
///   the "singing wires" timbre of wind through taut lines
/// - Katabatic: a slow, heavy low-end rumble for the weight of a sustained
///   downslope flow, itself slowly amplitude-modulated
/// - gusts: individually scheduled swells rather than a continuous
///   envelope, each with its own attack/release shape
/// - pan: the whole mix moves left/right with `direction`
#[derive(Component, Debug, Clone)]
pub struct WindLayer {
    /// 0.0 (still) – 1.0 (gale).
    pub speed: f32,
    /// -1.0 (from the left) – 1.0 (from the right).
    pub direction: f32,
}

impl Default for WindLayer {
    fn default() -> Self {
        Self { speed: 0.1, direction: 0.0 }
    }
}

/// Per-entity discrete-gust scheduler state, advanced by
/// [`wind_sync_system`] and read only by it — the audio graph just plays
/// back whatever level it last wrote into `WindParams::gust_level`.
#[derive(Component, Debug, Clone)]
pub struct WindGustState {
    level: f32,
    elapsed_since_last: f32,
}

impl Default for WindGustState {
    fn default() -> Self {
        Self { level: 0.0, elapsed_since_last: 1.0 }
    }
}

/// Advances one gust step: `speed` sets both how often a gust can start and
/// how hard it hits; between gusts the level decays toward zero. `roll` is
/// caller-supplied `[0, 1)` randomness so the state itself stays RNG-free.
/// Returns the new level, already the value to write into the gust
/// `ParamHandle`.
pub fn step_gust(state: &mut WindGustState, dt: f32, speed: f32, roll: f32) -> f32 {
    state.elapsed_since_last += dt;
    let min_spacing_s = 0.6;
    let rate_per_s = 0.05 + speed * 0.6;
    let chance_this_tick = rate_per_s * dt;
    if state.elapsed_since_last >= min_spacing_s && roll < chance_this_tick {
        state.elapsed_since_last = 0.0;
        state.level = (0.35 + speed * 0.65).min(1.0);
    } else {
        // Exponential release, ~0.5s time constant regardless of frame rate.
        let release = (-dt / 0.5).exp();
        state.level *= release;
    }
    state.level
}

#[derive(Component)]
pub struct WindParams {
    pub speed: ParamHandle,
    pub direction: ParamHandle,
    pub gust_level: ParamHandle,
}

pub fn build_wind_graph(wind: &WindLayer) -> (Box<dyn AudioUnit>, WindParams) {
    let speed_param = ParamHandle::new("wind_speed", wind.speed, 0.0, 1.0);
    let dir_param = ParamHandle::new("wind_direction", wind.direction, -1.0, 1.0);
    let gust_param = ParamHandle::new("wind_gust_level", 0.0, 0.0, 1.0);
    let speed_s = speed_param.shared().clone();
    let dir_s = dir_param.shared().clone();
    let gust_s = gust_param.shared().clone();

    let broadband = noise() >> lowpole_hz(900.0);

    let aeolian_cutoff = (var(&speed_s) >> map(|f: &Frame<f32, U1>| 1200.0 + f[0] * 2600.0)).clone();
    let aeolian_q = (var(&speed_s) >> map(|f: &Frame<f32, U1>| 2.0 + f[0] * 10.0)).clone();
    let aeolian = (noise() | aeolian_cutoff | aeolian_q) >> bandpass();

    // Singing: a thinner cluster roughly a fifth and an octave above the
    // Aeolian tone, quieter and only really present at higher speeds.
    let singing_cutoff_a = (var(&speed_s) >> map(|f: &Frame<f32, U1>| (1200.0 + f[0] * 2600.0) * 1.5)).clone();
    let singing_cutoff_b = (var(&speed_s) >> map(|f: &Frame<f32, U1>| (1200.0 + f[0] * 2600.0) * 2.0)).clone();
    let singing = ((noise() | singing_cutoff_a | dc(14.0)) >> bandpass())
        + ((noise() | singing_cutoff_b | dc(16.0)) >> bandpass());

    let katabatic_body = noise() >> lowpole_hz(140.0) >> lowpole_hz(140.0);
    let katabatic_swell = lfo(|t: f32| 0.6 + 0.4 * (t * std::f32::consts::TAU * 0.05).sin());
    let katabatic = katabatic_body * katabatic_swell;

    let gust_gain = var(&gust_s) >> map(|f: &Frame<f32, U1>| f[0]);
    let gust_layer = (noise() >> lowpole_hz(600.0)) * gust_gain;

    let speed_gain = |min: f32, max: f32| {
        let s = speed_s.clone();
        var(&s) >> map(move |f: &Frame<f32, U1>| min + f[0] * (max - min))
    };

    let mono = (broadband * speed_gain(0.15, 0.45))
        + (aeolian * speed_gain(0.0, 0.35))
        + (singing * speed_gain(0.0, 0.18))
        + (katabatic * speed_gain(0.1, 0.3))
        + (gust_layer * speed_gain(0.2, 0.5));

    let pan_gain_l = (var(&dir_s) >> map(|f: &Frame<f32, U1>| ((1.0 - f[0]) * 0.5).clamp(0.0, 1.0))).clone();
    let pan_gain_r = (var(&dir_s) >> map(|f: &Frame<f32, U1>| ((1.0 + f[0]) * 0.5).clamp(0.0, 1.0))).clone();

    let mut net = Net::new(0, 2);
    let mono_id = net.push(Box::new(mono));
    let pan_l_id = net.push(Box::new(pan_gain_l));
    let pan_r_id = net.push(Box::new(pan_gain_r));
    let mul_l_id = net.push(Box::new(map(|f: &Frame<f32, U2>| f[0] * f[1])));
    let mul_r_id = net.push(Box::new(map(|f: &Frame<f32, U2>| f[0] * f[1])));
    net.connect(mono_id, 0, mul_l_id, 0);
    net.connect(pan_l_id, 0, mul_l_id, 1);
    net.connect(mono_id, 0, mul_r_id, 0);
    net.connect(pan_r_id, 0, mul_r_id, 1);
    net.connect_output(mul_l_id, 0, 0);
    net.connect_output(mul_r_id, 0, 1);

    let params = WindParams { speed: speed_param, direction: dir_param, gust_level: gust_param };
    (Box::new(net), params)
}

/// Updates the continuous speed/direction params every frame and steps the
/// discrete gust scheduler (spec.md §4.7: gusts are individually scheduled
/// events, not one continuous swell LFO).
pub fn wind_sync_system(time: Res<Time>, mut query: Query<(&WindLayer, &mut WindGustState, &WindParams)>) {
    let dt = time.delta_secs();
    for (wind, mut gust, params) in &mut query {
        params.speed.set(wind.speed);
        params.direction.set(wind.direction);
        let roll: f32 = rand::random();
        let level = step_gust(&mut gust, dt, wind.speed, roll);
        params.gust_level.set(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gust_decays_between_triggers() {
        let mut state = WindGustState { level: 1.0, elapsed_since_last: 1.0 };
        let level = step_gust(&mut state, 0.1, 0.3, 0.999);
        assert!(level < 1.0);
    }

    #[test]
    fn gust_fires_when_due_and_lucky() {
        let mut state = WindGustState::default();
        let level = step_gust(&mut state, 0.1, 0.8, 0.0);
        assert!(level > 0.5);
        assert_eq!(state.elapsed_since_last, 0.0);
    }

    #[test]
    fn gust_cannot_retrigger_before_minimum_spacing() {
        let mut state = WindGustState { level: 0.0, elapsed_since_last: 0.1 };
        let level = step_gust(&mut state, 0.05, 1.0, 0.0);
        assert_eq!(level, 0.0);
    }
}
