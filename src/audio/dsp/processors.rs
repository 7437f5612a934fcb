use fundsp::prelude32::*;

/// A free-running phasor: ramps 0..1 at the input frequency, wrapping, with
/// a duty cycle that drops the output to zero past the duty threshold
/// (spec.md §6, "DSP building blocks"). Used by Wind's gust swells, where a
/// plain sine is too smooth (full duty, a plain ramp), and as the edge
/// source driving Thunder's rumble sample-and-hold (a short duty, so the
/// ramp's wrap-around produces a fresh rising edge every cycle instead of
/// only once at graph start).
#[derive(Clone)]
pub struct Phasor {
    phase: f32,
    sample_rate: f64,
    duty: f32,
}

impl Default for Phasor {
    fn default() -> Self {
        Self { phase: 0.0, sample_rate: 0.0, duty: 1.0 }
    }
}

impl Phasor {
    /// A phasor whose output zeroes out once `phase` passes `duty` (0..1),
    /// wrapping back to a positive ramp — and hence a fresh rising edge —
    /// every period.
    pub fn with_duty(duty: f32) -> Self {
        Self { duty: duty.clamp(0.0, 1.0), ..Default::default() }
    }
}

impl AudioNode for Phasor {
    const ID: u64 = 0x5241_494e_5950_4831; // "RAINYPH1"
    type Inputs = U1;
    type Outputs = U1;

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn tick(&mut self, input: &Frame<f32, Self::Inputs>) -> Frame<f32, Self::Outputs> {
        let freq = input[0];
        let sr = if self.sample_rate > 0.0 { self.sample_rate as f32 } else { 44100.0 };
        self.phase += freq / sr;
        self.phase -= self.phase.floor();
        let out = if self.phase < self.duty { self.phase } else { 0.0 };
        [out].into()
    }
}

pub fn phasor() -> An<Phasor> {
    An::new(Phasor::default())
}

/// [`phasor`], but with a duty cycle below 1.0 so it emits repeated rising
/// edges instead of ramping forever (spec.md §4.8, "Rumbler").
pub fn phasor_with_duty(duty: f32) -> An<Phasor> {
    An::new(Phasor::with_duty(duty))
}

/// Sample-and-hold: latches its input whenever the trigger input crosses
/// from non-positive to positive. Drives Thunder's granular rumble body,
/// gated by the Path A phasor (spec.md §4.8, "Rumbler").
#[derive(Clone, Default)]
pub struct SampleHold {
    held: f32,
    prev_trigger: f32,
}

impl AudioNode for SampleHold {
    const ID: u64 = 0x5241_494e_5953_4831; // "RAINYSH1"
    type Inputs = U2;
    type Outputs = U1;

    fn reset(&mut self) {
        self.held = 0.0;
        self.prev_trigger = 0.0;
    }

    fn tick(&mut self, input: &Frame<f32, Self::Inputs>) -> Frame<f32, Self::Outputs> {
        let value = input[0];
        let trigger = input[1];
        if self.prev_trigger <= 0.0 && trigger > 0.0 {
            self.held = value;
        }
        self.prev_trigger = trigger;
        [self.held].into()
    }
}

pub fn sample_hold() -> An<SampleHold> {
    An::new(SampleHold::default())
}

/// Fractional-Brownian-motion noise: sums several octaves of filtered white
/// noise so low-frequency rumble has more structure than raw noise but less
/// periodicity than a single filtered source. Used by both paths of
/// Thunder's rumble body (spec.md §4.8, "Rumbler").
#[derive(Clone)]
pub struct Fbm {
    octaves: usize,
    state: Vec<f32>,
    rng_state: u64,
}

impl Fbm {
    pub fn new(octaves: usize, seed: u64) -> Self {
        Self {
            octaves: octaves.max(1),
            state: vec![0.0; octaves.max(1)],
            rng_state: seed | 1,
        }
    }

    fn next_white(&mut self) -> f32 {
        // xorshift64: deterministic, allocation-free, good enough for a
        // noise source that only feeds a low-pass cascade.
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 7;
        self.rng_state ^= self.rng_state << 17;
        ((self.rng_state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }
}

impl Default for Fbm {
    fn default() -> Self {
        Self::new(4, 0x9E37_79B9_7F4A_7C15)
    }
}

impl AudioNode for Fbm {
    const ID: u64 = 0x5241_494e_4642_4d31; // "RAINYFBM1"
    type Inputs = U0;
    type Outputs = U1;

    fn reset(&mut self) {
        for s in self.state.iter_mut() {
            *s = 0.0;
        }
    }

    fn tick(&mut self, _input: &Frame<f32, Self::Inputs>) -> Frame<f32, Self::Outputs> {
        let mut sum = 0.0;
        let mut weight_total = 0.0;
        for (i, s) in self.state.iter_mut().enumerate() {
            let weight = 1.0 / (1 << i) as f32;
            // Each octave's pole is slower than the last, giving coarser
            // octaves more time-correlation than finer ones.
            let pole = 1.0 - 1.0 / (4.0 * (i as f32 + 1.0));
            let white = self.rng_next_for(i);
            *s = *s * pole + white * (1.0 - pole);
            sum += *s * weight;
            weight_total += weight;
        }
        [sum / weight_total.max(1e-6)].into()
    }
}

impl Fbm {
    fn rng_next_for(&mut self, _octave: usize) -> f32 {
        self.next_white()
    }
}

pub fn fbm_noise(octaves: usize, seed: u64) -> An<Fbm> {
    An::new(Fbm::new(octaves, seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phasor_wraps_within_unit_interval() {
        let mut p = Phasor::default();
        p.set_sample_rate(100.0);
        let mut last = 0.0;
        for _ in 0..500 {
            let out = p.tick(&Frame::from([10.0]));
            assert!(out[0] >= 0.0 && out[0] < 1.0);
            last = out[0];
        }
        let _ = last;
    }

    #[test]
    fn duty_cycle_phasor_re_arms_the_sample_hold_every_period() {
        // A duty of 0.5 at freq=10Hz/sr=100 wraps every 10 ticks and spends
        // half of each period at zero, so the sample-and-hold downstream
        // sees a fresh rising edge once per period rather than only once.
        let mut p = Phasor::with_duty(0.5);
        p.set_sample_rate(100.0);
        let mut rising_edges = 0;
        let mut prev = 0.0;
        for _ in 0..40 {
            let out = p.tick(&Frame::from([10.0]))[0];
            if prev <= 0.0 && out > 0.0 {
                rising_edges += 1;
            }
            prev = out;
        }
        assert!(rising_edges >= 3, "expected multiple re-triggers, got {rising_edges}");
    }

    #[test]
    fn sample_hold_latches_on_rising_edge_only() {
        let mut sh = SampleHold::default();
        let _ = sh.tick(&Frame::from([1.0, -1.0]));
        assert_eq!(sh.held, 0.0);
        let _ = sh.tick(&Frame::from([1.0, 1.0]));
        assert_eq!(sh.held, 1.0);
        let out = sh.tick(&Frame::from([9.0, 1.0]));
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn fbm_output_stays_bounded() {
        let mut f = Fbm::new(4, 42);
        for _ in 0..2000 {
            let out = f.tick(&Frame::from([]));
            assert!(out[0].abs() <= 1.5);
        }
    }

    #[test]
    fn constructors_build_without_panicking() {
        let _ = phasor();
        let _ = sample_hold();
        let _ = fbm_noise(5, 1234);
    }
}
