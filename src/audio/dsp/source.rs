use bevy::audio::Source;
use bevy::prelude::*;
use fundsp::audiounit::AudioUnit;
use fundsp::buffer::{BufferRef, BufferVec};
use fundsp::MAX_BUFFER_SIZE;
use std::f32::consts::{FRAC_PI_4, PI};
use std::sync::{Arc, Mutex};

use crate::audio::bus::{db_to_linear, VoiceMix};

/// The `Asset` type bridging FunDSP audio graphs to Bevy's audio pipeline.
///
/// Contains a FunDSP `AudioUnit` that generates samples on the audio thread.
/// The `Mutex` is only contested once at decoder creation — the decoder then
/// owns the unit exclusively. `mix` carries the voice's live bus state
/// (gain/pan/EQ3/compressor, plus the shared master limiter) so every
/// voice's samples pick up mixer changes as they're pulled, not just at
/// spawn time (spec.md §4.10).
#[derive(Asset, TypePath)]
pub struct ProceduralAudio {
    graph: Arc<Mutex<Box<dyn AudioUnit>>>,
    sample_rate: u32,
    channels: u16,
    mix: VoiceMix,
}

impl ProceduralAudio {
    pub fn new(mut graph: Box<dyn AudioUnit>, sample_rate: u32, channels: u16, mix: VoiceMix) -> Self {
        graph.set_sample_rate(sample_rate as f64);
        graph.allocate();
        Self {
            graph: Arc::new(Mutex::new(graph)),
            sample_rate,
            channels,
            mix,
        }
    }
}

fn one_pole_coeff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    1.0 - (-2.0 * PI * cutoff_hz / sample_rate).exp()
}

/// Equal-power pan law: `pan` in `[-1, 1]` maps to a quarter-turn of a
/// sine/cosine crossfade so centre pan holds perceived loudness constant
/// (the same law `build_impact_graph`'s stereo placement follows, just
/// applied per-sample here instead of baked into the graph).
fn equal_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

const EQ_LOW_HZ: f32 = 200.0;
const EQ_HIGH_HZ: f32 = 2000.0;

/// Per-channel one-pole low-pass trackers used to band-split a signal into
/// low/mid/high for the 3-band EQ. `low + mid + high` reconstructs the
/// original signal exactly when all three band gains are unity.
#[derive(Default, Clone, Copy)]
struct EqState {
    low_lp: f32,
    high_lp: f32,
}

impl EqState {
    fn process(&mut self, sample: f32, sample_rate: f32, low_db: f32, mid_db: f32, high_db: f32) -> f32 {
        let low_coeff = one_pole_coeff(EQ_LOW_HZ, sample_rate);
        let high_coeff = one_pole_coeff(EQ_HIGH_HZ, sample_rate);
        self.low_lp += low_coeff * (sample - self.low_lp);
        self.high_lp += high_coeff * (sample - self.high_lp);

        let low_band = self.low_lp;
        let high_band = sample - self.high_lp;
        let mid_band = self.high_lp - self.low_lp;

        low_band * db_to_linear(low_db) + mid_band * db_to_linear(mid_db) + high_band * db_to_linear(high_db)
    }
}

/// Instantaneous downward-compressor target gain for `level` against
/// `threshold_db`/`ratio` — attack is applied instantly by the caller
/// (`min` against the previous reduction), release ramps back toward 1.0.
fn compressor_target_gain(level: f32, threshold_db: f32, ratio: f32) -> f32 {
    let level_db = 20.0 * level.abs().max(1e-6).log10();
    if level_db <= threshold_db {
        1.0
    } else {
        let over_db = level_db - threshold_db;
        let reduced_db = threshold_db + over_db / ratio.max(1.0) - level_db;
        db_to_linear(reduced_db)
    }
}

/// Fixed compressor release — the per-bus config only specifies
/// threshold/ratio (spec.md §4.10), so the release stage uses the same
/// constant as the build-in one-shot envelopes elsewhere in this crate.
const COMPRESSOR_RELEASE_S: f32 = 0.15;

/// Iterator that pulls samples from a FunDSP graph for rodio playback.
pub struct ProceduralAudioDecoder {
    graph: Box<dyn AudioUnit>,
    sample_rate: u32,
    channels: u16,
    mix: VoiceMix,
    eq_state: [EqState; 2],
    compressor_reduction: f32,
    limiter_reduction: f32,
    /// FunDSP output buffer for block processing.
    output_buf: BufferVec,
    /// Interleaved sample buffer for rodio.
    buffer: Vec<f32>,
    pos: usize,
    total: usize,
}

impl ProceduralAudioDecoder {
    fn fill_block(&mut self) {
        let ch = self.channels as usize;
        let size = MAX_BUFFER_SIZE;
        self.buffer.resize(size * ch, 0.0);

        let input = BufferRef::empty();
        let mut output = self.output_buf.buffer_mut();
        self.graph.process(size, &input, &mut output);

        let sample_rate = self.sample_rate as f32;
        let gain = self.mix.gain.value();
        let pan = self.mix.pan.value();
        let (pan_l, pan_r) = equal_power_pan(pan);
        let eq_low_db = self.mix.eq_low_db.value();
        let eq_mid_db = self.mix.eq_mid_db.value();
        let eq_high_db = self.mix.eq_high_db.value();
        let compressor_enabled = self.mix.compressor_enabled.value() > 0.5;
        let compressor_threshold_db = self.mix.compressor_threshold_db.value();
        let compressor_ratio = self.mix.compressor_ratio.value();
        let limiter_threshold = self.mix.limiter_threshold_lin.value().max(1e-4);
        let limiter_release_s = self.mix.limiter_release_s.value().max(0.001);
        let comp_release_per_sample = 1.0 / (COMPRESSOR_RELEASE_S * sample_rate).max(1.0);
        let limiter_release_per_sample = 1.0 / (limiter_release_s * sample_rate).max(1.0);

        for i in 0..size {
            let base = i * ch;
            let raw_l = output.at_f32(0, i);
            let raw_r = if ch >= 2 { output.at_f32(1, i) } else { raw_l };

            let eq_l = self.eq_state[0].process(raw_l, sample_rate, eq_low_db, eq_mid_db, eq_high_db);
            let eq_r = self.eq_state[1].process(raw_r, sample_rate, eq_low_db, eq_mid_db, eq_high_db);

            let panned_l = eq_l * pan_l;
            let panned_r = eq_r * pan_r;

            let (comp_l, comp_r) = if compressor_enabled {
                let peak = panned_l.abs().max(panned_r.abs());
                let target = compressor_target_gain(peak, compressor_threshold_db, compressor_ratio);
                self.compressor_reduction = if target < self.compressor_reduction {
                    target
                } else {
                    (self.compressor_reduction + comp_release_per_sample).min(1.0)
                };
                (panned_l * self.compressor_reduction, panned_r * self.compressor_reduction)
            } else {
                self.compressor_reduction = 1.0;
                (panned_l, panned_r)
            };

            let gained_l = comp_l * gain;
            let gained_r = comp_r * gain;

            let peak = gained_l.abs().max(gained_r.abs());
            let limiter_target = if peak > limiter_threshold { limiter_threshold / peak.max(1e-6) } else { 1.0 };
            self.limiter_reduction = if limiter_target < self.limiter_reduction {
                limiter_target
            } else {
                (self.limiter_reduction + limiter_release_per_sample).min(1.0)
            };

            self.buffer[base] = gained_l * self.limiter_reduction;
            if ch >= 2 {
                self.buffer[base + 1] = gained_r * self.limiter_reduction;
            }
        }

        self.total = size * ch;
        self.pos = 0;
    }
}

impl Iterator for ProceduralAudioDecoder {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.total {
            self.fill_block();
        }

        let sample = self.buffer[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for ProceduralAudioDecoder {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}

impl bevy::audio::Decodable for ProceduralAudio {
    type DecoderItem = f32;
    type Decoder = ProceduralAudioDecoder;

    fn decoder(&self) -> Self::Decoder {
        let graph = self.graph.lock().expect("ProceduralAudio graph lock poisoned");
        let mut cloned = graph.clone();
        cloned.set_sample_rate(self.sample_rate as f64);
        cloned.allocate();
        let ch = self.channels as usize;
        ProceduralAudioDecoder {
            graph: cloned,
            sample_rate: self.sample_rate,
            channels: self.channels,
            mix: self.mix.clone(),
            eq_state: [EqState::default(); 2],
            compressor_reduction: 1.0,
            limiter_reduction: 1.0,
            output_buf: BufferVec::new(ch),
            buffer: vec![0.0; MAX_BUFFER_SIZE * ch],
            pos: MAX_BUFFER_SIZE * ch, // force fill on first call
            total: MAX_BUFFER_SIZE * ch,
        }
    }
}
