use fundsp::prelude32::*;

use crate::audio::collision_mapper::ImpactParams;
use crate::audio::material::ImpactSynthType;

/// Blends a dry stereo graph against itself passed through `reverb`, the
/// way every teacher preset mixes its optional reverb tail (spec.md §4.10,
/// the per-layer `reverbSend`).
pub fn wet_dry_reverb(
    graph: An<impl AudioNode<Inputs = U0, Outputs = U2> + 'static>,
    wet: f32,
    room: f32,
    decay: f32,
    damping: f32,
) -> Box<dyn AudioUnit> {
    if wet <= 0.001 {
        return Box::new(graph);
    }
    let dry = 1.0 - wet;
    let reverb = reverb2_stereo(room, decay, damping, 1.0, lowpole_hz(6000.0));
    let mixed = (graph.clone() * dc((dry, dry))) + (graph >> reverb) * dc((wet, wet));
    Box::new(mixed)
}

/// Single-cycle exponential-decay envelope shared by every one-shot voice:
/// short linear attack, then exponential decay to silence at `decay_s`.
pub fn one_shot_envelope(attack_s: f32, decay_s: f32, peak: f32) -> impl Fn(f32) -> f32 + Clone {
    move |t: f32| -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        let attack = if attack_s > 0.0 { (t / attack_s).min(1.0) } else { 1.0 };
        let decay = (-t * (4.0 / decay_s.max(0.001))).exp();
        attack * decay * peak
    }
}

/// Builds a one-shot impact voice graph from mapped [`ImpactParams`] and the
/// material's impact-synth family (spec.md §4.2 -> §4.3, Collision Mapper
/// output feeding the Impact Voice Pool). Mono source, split to stereo, no
/// runtime-tweakable params — the graph dies with its one-shot entity.
pub fn build_impact_graph(params: &ImpactParams, synth_type: ImpactSynthType) -> Box<dyn AudioUnit> {
    let freq = params.frequency_hz;
    let decay = params.decay_s.max(0.02);
    let gain = db_amp(params.volume_db);
    let q = params.filter_q.max(0.1);
    let cutoff = params.filter_freq_hz.max(20.0);

    let pan = params.pan.clamp(-1.0, 1.0);
    let left_gain = (1.0 - pan).clamp(0.0, 2.0) * 0.5;
    let right_gain = (1.0 + pan).clamp(0.0, 2.0) * 0.5;

    let env = one_shot_envelope(0.002, decay, gain);
    let env_node = lfo(move |t: f32| env(t));

    match synth_type {
        ImpactSynthType::Metal => {
            let source = (sine_hz(freq) * 0.6 + sine_hz(freq * 2.41) * 0.25 + sine_hz(freq * 3.88) * 0.15)
                >> bandpass_hz(cutoff, q);
            let graph = (source * env_node) >> split::<U2>() * dc((left_gain, right_gain));
            Box::new(graph)
        }
        ImpactSynthType::Membrane => {
            let source = (sine_hz(freq) + sine_hz(freq * 1.59) * 0.4) >> lowpole_hz(cutoff);
            let graph = (source * env_node) >> split::<U2>() * dc((left_gain, right_gain));
            Box::new(graph)
        }
        ImpactSynthType::Noise => {
            let source = noise() >> bandpass_hz(cutoff, q);
            let graph = (source * env_node) >> split::<U2>() * dc((left_gain, right_gain));
            Box::new(graph)
        }
    }
}

/// Small secondary "plink" layered after certain impacts when the collision
/// mapper rolls a bubble trigger (spec.md §4.4, Bubble Voice Pool).
pub fn build_bubble_graph(freq_hz: f32, gain: f32) -> Box<dyn AudioUnit> {
    let env = one_shot_envelope(0.001, 0.09, gain);
    let env_node = lfo(move |t: f32| env(t));
    let graph = (sine_hz(freq_hz) >> lowpole_hz(freq_hz * 3.0)) * env_node;
    Box::new(graph >> split::<U2>())
}

/// A continuous filtered-noise bed: the shared backbone of Sheet, Wind's
/// broadband layer, and Thunder's rumble body (spec.md §4.5, §4.7, §4.8).
/// Layers wanting live cutoff modulation wire this into a `Net` themselves
/// via a `var(&shared)` node, the way the teacher's `build_synth_graph` wires
/// its filter cutoffs.
pub fn noise_bed(cutoff_hz: f32, q: f32) -> An<impl AudioNode<Inputs = U0, Outputs = U1>> {
    noise() >> bandpass_hz(cutoff_hz, q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_envelope_decays_to_near_silence() {
        let env = one_shot_envelope(0.005, 0.2, 1.0);
        assert!(env(0.0) < 1.0);
        assert!(env(1.0) < 0.01);
    }

    #[test]
    fn impact_graph_builds_for_every_synth_type() {
        let params = ImpactParams {
            volume_db: -6.0,
            frequency_hz: 1200.0,
            decay_s: 0.2,
            filter_freq_hz: 2000.0,
            filter_q: 2.0,
            trigger_bubble: false,
            pan: 0.0,
        };
        let _ = build_impact_graph(&params, ImpactSynthType::Metal);
        let _ = build_impact_graph(&params, ImpactSynthType::Membrane);
        let _ = build_impact_graph(&params, ImpactSynthType::Noise);
    }
}
