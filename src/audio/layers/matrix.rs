use bevy::prelude::*;
use fundsp::prelude32::*;

use crate::audio::dsp::param::ParamHandle;

/// The Matrix sequencer's tempo is fixed, not a per-instance config knob
/// (spec.md §4.9, "102 BPM"): a generative ambient bed that drifted tempo
/// with the storm would fight the fixed-meter collision accents below.
pub const MATRIX_TEMPO_BPM: f32 = 102.0;

const BASE_FREQ_HZ: f32 = 110.0; // A2, the register MAIN_CHORDS is written in.
const BEATS_PER_BAR: u32 = 4;
const BARS_PER_CYCLE: u32 = 90;
const BRIDGE_START_BAR: u32 = 64;
const BRIDGE_VARIATION_START_BAR: u32 = 80;
const SPLIT_BARS_START_BAR: u32 = 84;
const EB_BAR: u32 = 87;
const BREAKDOWN_START_BAR: u32 = 88;

const DRONE_FADE_S: f32 = 2.0;
const ARP_GATE_DECAY_PER_S: f32 = 1.0 / 0.15; // ~150ms decay
const GLITCH_GATE_DECAY_PER_S: f32 = 1.0 / 0.05; // 50ms burst, per spec.md §4.9
const SIXTEENTH_TOLERANCE_S: f32 = 0.012;

fn semitone_to_ratio(semitones: i32) -> f32 {
    2f32.powf(semitones as f32 / 12.0)
}

fn bar_seconds(tempo_bpm: f32) -> f32 {
    BEATS_PER_BAR as f32 * 60.0 / tempo_bpm.max(1.0)
}

fn cycle_seconds(tempo_bpm: f32) -> f32 {
    BARS_PER_CYCLE as f32 * bar_seconds(tempo_bpm)
}

fn sixteenth_seconds(tempo_bpm: f32) -> f32 {
    bar_seconds(tempo_bpm) / (BEATS_PER_BAR as f32 * 4.0)
}

/// `bar = floor(((t - origin) mod CYCLE) / BAR)` (spec.md §8, "Beat
/// quantisation"). Returns the bar index within the 90-bar cycle, the beat
/// index within that bar (0-based), and the elapsed time into the bar.
pub fn bar_and_beat(origin_s: f32, now_s: f32, tempo_bpm: f32) -> (u32, u32, f32) {
    let bar_s = bar_seconds(tempo_bpm);
    let phase = (now_s - origin_s).rem_euclid(cycle_seconds(tempo_bpm));
    let bar = (phase / bar_s).floor() as u32;
    let bar_phase = phase - bar as f32 * bar_s;
    let beat = (bar_phase / (bar_s / BEATS_PER_BAR as f32)).floor() as u32;
    (bar.min(BARS_PER_CYCLE - 1), beat.min(BEATS_PER_BAR - 1), bar_phase)
}

/// Sixteenth-note index since `origin_s`, rounded to the nearest slot —
/// used to fire a sequencer event at most once per slot.
fn sixteenth_slot(elapsed_s: f32, tempo_bpm: f32) -> i64 {
    (elapsed_s / sixteenth_seconds(tempo_bpm)).round() as i64
}

/// True when `elapsed_s` lands within the sixteenth-note quantisation
/// window (spec.md §4.9: "elapsed time modulo a sixteenth-note is within
/// ±12ms of a boundary"). Off-boundary collisions are silent.
pub fn is_on_sixteenth(elapsed_s: f32, tempo_bpm: f32) -> bool {
    let sixteenth = sixteenth_seconds(tempo_bpm);
    let phase = elapsed_s.rem_euclid(sixteenth);
    let distance = phase.min(sixteenth - phase);
    distance <= SIXTEENTH_TOLERANCE_S
}

// --- Note-name <-> semitone transposition (spec.md §4.9, §8) ---------------

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
const FLAT_NAMES: [&str; 12] = ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"];

fn letter_semitone(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Parses a note name like `"G2"`, `"Bb2"`, `"C#3"` into an absolute
/// semitone (relative to C0) and whether it was spelled with a flat —
/// `format_note` uses that to keep re-spelling stable across a transpose.
fn parse_note(name: &str) -> Option<(i32, bool)> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let base = letter_semitone(letter)?;
    let rest: String = chars.collect();

    let (accidental, prefer_flat, octave_str): (i32, bool, &str) = if let Some(stripped) = rest.strip_prefix('#') {
        (1, false, stripped)
    } else if let Some(stripped) = rest.strip_prefix('b') {
        (-1, true, stripped)
    } else {
        (0, false, rest.as_str())
    };
    let octave: i32 = octave_str.parse().ok()?;
    let pitch_class = (base + accidental).rem_euclid(12);
    Some((octave * 12 + pitch_class, prefer_flat))
}

fn format_note(semitone: i32, prefer_flat: bool) -> String {
    let octave = semitone.div_euclid(12);
    let pitch_class = semitone.rem_euclid(12) as usize;
    let name = if prefer_flat { FLAT_NAMES[pitch_class] } else { SHARP_NAMES[pitch_class] };
    format!("{name}{octave}")
}

/// Transposes a note name by `semitones`, preserving flat/sharp spelling.
/// `transpose_note(n, k)` composed with `transpose_note(_, -k)` is the
/// identity for any of this module's canonically-spelled note names
/// (spec.md §8); non-canonical enharmonic spellings like `"E#"` still parse
/// but renormalise to their canonical spelling on the way out.
pub fn transpose_note(name: &str, semitones: i32) -> Option<String> {
    let (absolute, prefer_flat) = parse_note(name)?;
    Some(format_note(absolute + semitones, prefer_flat))
}

fn note_frequency_hz(name: &str) -> f32 {
    match parse_note(name) {
        // A4 = 440Hz -> absolute semitone 57 (4*12 + 9).
        Some((absolute, _)) => 440.0 * semitone_to_ratio(absolute - 57),
        None => BASE_FREQ_HZ,
    }
}

// --- Fixed bar-indexed chord table (spec.md §4.9, §8.4) --------------------

#[derive(Debug, Clone, Copy)]
pub struct Chord {
    pub name: &'static str,
    pub root_note: &'static str,
    pub notes: &'static [i32],
}

/// `Gm, Am, Bb, C` cycling every bar (bars 0..63).
///
/// `static`, not `const`: `chord_for_bar` indexes these with a runtime bar
/// number and hands back a `&'static Chord`, which needs one fixed memory
/// location rather than a fresh inlined copy at every use site.
pub static MAIN_CHORDS: [Chord; 4] = [
    Chord { name: "Gm", root_note: "G2", notes: &[0, 3, 7] },
    Chord { name: "Am", root_note: "A2", notes: &[0, 3, 7] },
    Chord { name: "Bb", root_note: "Bb2", notes: &[0, 4, 7] },
    Chord { name: "C", root_note: "C3", notes: &[0, 4, 7] },
];

/// Eight-note, up-and-back arpeggio over G natural minor (bars 64..79, two
/// passes of eight bars each).
pub static BRIDGE_THEME: [Chord; 8] = [
    Chord { name: "G", root_note: "G3", notes: &[0] },
    Chord { name: "A", root_note: "G3", notes: &[2] },
    Chord { name: "Bb", root_note: "G3", notes: &[3] },
    Chord { name: "C", root_note: "G3", notes: &[5] },
    Chord { name: "D", root_note: "G3", notes: &[7] },
    Chord { name: "C", root_note: "G3", notes: &[5] },
    Chord { name: "Bb", root_note: "G3", notes: &[3] },
    Chord { name: "A", root_note: "G3", notes: &[2] },
];

/// Bars 84..86 split at beat 3 (0-based beat index 2): the chord changes
/// mid-bar, and the note index resets at the same instant (spec.md §8.4).
static SPLIT_BAR_PAIRS: [(Chord, Chord); 3] =
    [(BRIDGE_THEME[4], BRIDGE_THEME[5]), (BRIDGE_THEME[6], BRIDGE_THEME[7]), (BRIDGE_THEME[0], BRIDGE_THEME[1])];

/// Bar 87: an Eb up-and-back flourish closing the bridge variation.
static EB_UP_AND_BACK: Chord = Chord { name: "Eb", root_note: "Eb3", notes: &[0, 4, 7, 12, 7, 4] };

/// Which chord is active for `bar`/`beat`, and whether `bar` is one of the
/// 84..86 split bars currently in its second half (the beat-3-onward
/// chord).
pub fn chord_for_bar(bar: u32, beat: u32) -> (&'static Chord, bool) {
    match bar {
        0..=63 => (&MAIN_CHORDS[(bar % 4) as usize], false),
        64..=79 => (&BRIDGE_THEME[((bar - BRIDGE_START_BAR) % 8) as usize], false),
        80..=83 => (&BRIDGE_THEME[(bar - BRIDGE_VARIATION_START_BAR) as usize], false),
        84..=86 => {
            let (first, second) = &SPLIT_BAR_PAIRS[(bar - SPLIT_BARS_START_BAR) as usize];
            // "beat 3" in 1-indexed musician's counting is beat index 2 here.
            if beat < 2 {
                (first, false)
            } else {
                (second, true)
            }
        }
        87 => (&EB_UP_AND_BACK, false),
        88 => (&MAIN_CHORDS[0], false),
        _ => (&MAIN_CHORDS[1], false), // bar 89
    }
}

fn chord_note_hz(chord: &Chord, note_index: usize, transpose_semitones: i32) -> f32 {
    let degree = chord.notes[note_index % chord.notes.len().max(1)];
    match transpose_note(chord.root_note, transpose_semitones + degree) {
        Some(name) => note_frequency_hz(&name),
        None => note_frequency_hz(chord.root_note),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Main,
    Bridge,
    Breakdown,
}

impl Section {
    /// Overall-intensity multiplier for the section — the bridge and
    /// breakdown pull back from the main loop's full intensity.
    pub fn intensity_scale(self) -> f32 {
        match self {
            Section::Main => 1.0,
            Section::Bridge => 0.8,
            Section::Breakdown => 0.5,
        }
    }
}

pub fn section_for_bar(bar: u32) -> Section {
    match bar {
        0..=63 => Section::Main,
        64..=87 => Section::Bridge,
        _ => Section::Breakdown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BassMode {
    Silent,
    Sustained,
    Pulsed,
}

fn bass_mode_for_bar(bar: u32) -> BassMode {
    match bar {
        0..=1 => BassMode::Silent,
        2..=63 => BassMode::Sustained,
        64..=75 => BassMode::Silent,
        76..=87 => BassMode::Pulsed,
        _ => BassMode::Silent,
    }
}

/// "dmm dmm": two decaying eighth-note plucks on beat 1 (index 1) only,
/// silent on every other beat (spec.md §4.9, Bass).
fn pulsed_bass_gain(beat: u32, bar_phase_s: f32, tempo_bpm: f32) -> f32 {
    if beat != 1 {
        return 0.0;
    }
    let beat_s = bar_seconds(tempo_bpm) / BEATS_PER_BAR as f32;
    let into_beat = bar_phase_s - beat_s;
    let eighth_s = beat_s / 2.0;
    let into_eighth = into_beat.rem_euclid(eighth_s);
    (1.0 - into_eighth / eighth_s).max(0.0)
}

fn bass_envelope_gain(bar: u32, beat: u32, bar_phase_s: f32, tempo_bpm: f32) -> f32 {
    match bass_mode_for_bar(bar) {
        BassMode::Silent => 0.0,
        BassMode::Sustained => 1.0,
        BassMode::Pulsed => pulsed_bass_gain(beat, bar_phase_s, tempo_bpm),
    }
}

/// Config for the generative ambient layer: drone pad, collision-gated
/// arpeggio, bass voice, and an occasional glitch stutter, all quantized to
/// the same beat clock (spec.md §4.9).
#[derive(Component, Debug, Clone)]
pub struct MatrixLayer {
    pub enabled: bool,
    pub tempo_bpm: f32,
    pub intensity: f32,
    pub glitch_probability: f32,
    pub transpose_semitones: i32,
}

impl Default for MatrixLayer {
    fn default() -> Self {
        Self {
            enabled: false,
            tempo_bpm: MATRIX_TEMPO_BPM,
            intensity: 0.3,
            glitch_probability: 0.02,
            transpose_semitones: 0,
        }
    }
}

/// Fired once per crossed section boundary (spec.md §4.9's `onSectionChange`
/// hook) — routed as a Bevy event rather than a synchronous callback so a
/// slow subscriber can't stall the audio-adjacent sequencer system
/// (spec.md §9, "message channel... back-pressure rather than calling
/// synchronously across threads").
#[derive(Event, Debug, Clone, Copy)]
pub struct MatrixSectionChanged {
    pub entity: Entity,
    pub section: Section,
    pub bar: u32,
}

/// Beat-quantized sequencer state, advanced by [`matrix_sequencer_system`]
/// and read by the audio thread only through the `Shared` handles in
/// [`MatrixParams`]. `beat_origin_s` is captured once, the frame this
/// sequencer first ticks, and every later bar/beat is computed as an offset
/// from it rather than by accumulating per-frame deltas — the
/// `beatOriginTime` anchor spec.md §9 calls for, which keeps the beat grid
/// from drifting under frame-time jitter. It is never re-anchored after
/// fades (spec.md §9).
#[derive(Component)]
pub struct MatrixSequencer {
    pub beat_origin_s: Option<f32>,
    pub bar_index: u32,
    pub note_index: usize,
    pub section: Section,
    last_sixteenth_slot: i64,
    in_split_second_half: bool,
}

impl Default for MatrixSequencer {
    fn default() -> Self {
        Self {
            beat_origin_s: None,
            bar_index: 0,
            note_index: 0,
            section: Section::Main,
            last_sixteenth_slot: -1,
            in_split_second_half: false,
        }
    }
}

#[derive(Component)]
pub struct MatrixParams {
    pub root_freq: ParamHandle,
    pub arp_freq: ParamHandle,
    pub arp_gate: ParamHandle,
    pub intensity: ParamHandle,
    pub glitch_gate: ParamHandle,
    pub drone_gain: ParamHandle,
    pub bass_gate: ParamHandle,
}

/// Pending collision accents for the sequencer's next sixteenth-note
/// boundary (spec.md §4.9: "on each on-beat collision, the sequencer
/// returns the next chord note"). Filled by `simulation_step_system`,
/// drained by [`matrix_sequencer_system`].
#[derive(Resource, Default)]
pub struct MatrixCollisionFeed {
    pub pending: u32,
}

pub fn build_matrix_graph(layer: &MatrixLayer) -> (Box<dyn AudioUnit>, MatrixParams) {
    let root_param = ParamHandle::new("matrix_root", BASE_FREQ_HZ, 20.0, 2000.0);
    let arp_param = ParamHandle::new("matrix_arp", BASE_FREQ_HZ, 20.0, 4000.0);
    let gate_param = ParamHandle::new("matrix_gate", 0.0, 0.0, 1.0);
    let intensity_param = ParamHandle::new("matrix_intensity", layer.intensity, 0.0, 1.0);
    let glitch_param = ParamHandle::new("matrix_glitch", 0.0, 0.0, 1.0);
    let drone_gain_param = ParamHandle::new("matrix_drone_gain", 1.0, 0.0, 1.0);
    let bass_gate_param = ParamHandle::new("matrix_bass_gate", 0.0, 0.0, 1.0);

    let root_s = root_param.shared().clone();
    let arp_s = arp_param.shared().clone();
    let gate_s = gate_param.shared().clone();
    let intensity_s = intensity_param.shared().clone();
    let glitch_s = glitch_param.shared().clone();
    let drone_gain_s = drone_gain_param.shared().clone();
    let bass_gate_s = bass_gate_param.shared().clone();

    // Drone pad: root + fifth, slow sine swell, faded out by `drone_gain`
    // outside the main section.
    let drone = ((var(&root_s) >> sine()) * 0.5 + (var(&root_s) >> map(|f: &Frame<f32, U1>| f[0] * 1.5) >> sine()) * 0.3)
        * (var(&drone_gain_s) >> map(|f: &Frame<f32, U1>| f[0]));

    // Arpeggio: steps between chord tones, gated by on-beat collisions.
    let arp = (var(&arp_s) >> sine()) * (var(&gate_s) >> map(|f: &Frame<f32, U1>| f[0] * 0.4));

    // Bass: triangle voice an octave below the chord root, gated by the
    // bar-range envelope (silent / sustained / pulsed).
    let bass = (var(&root_s) >> map(|f: &Frame<f32, U1>| f[0] * 0.5) >> triangle())
        * (var(&bass_gate_s) >> map(|f: &Frame<f32, U1>| f[0] * 0.5));

    // Glitch: a brief, bit-crushed-sounding stutter, triggered either by the
    // sequencer's own chance roll or by an on-beat collision.
    let glitch = (noise() >> bandpass_hz(2000.0, 6.0)) * (var(&glitch_s) >> map(|f: &Frame<f32, U1>| f[0] * 0.2));

    let intensity_gain = var(&intensity_s) >> map(|f: &Frame<f32, U1>| f[0]);
    let mono = (drone + arp + bass + glitch) * intensity_gain;

    let graph = mono >> split::<U2>();

    let params = MatrixParams {
        root_freq: root_param,
        arp_freq: arp_param,
        arp_gate: gate_param,
        intensity: intensity_param,
        glitch_gate: glitch_param,
        drone_gain: drone_gain_param,
        bass_gate: bass_gate_param,
    };
    (Box::new(graph), params)
}

/// Advances the bar/section clock, the collision-gated arpeggio, the bass
/// envelope, and the drone fade, all anchored to `beat_origin_s` (spec.md
/// §4.9). The arpeggio itself only steps forward on a collision that lands
/// within the sixteenth-note quantisation window; off-beat collisions are
/// silently dropped.
pub fn matrix_sequencer_system(
    time: Res<Time>,
    mut feed: ResMut<MatrixCollisionFeed>,
    mut section_events: EventWriter<MatrixSectionChanged>,
    mut query: Query<(Entity, &MatrixLayer, &mut MatrixSequencer, &MatrixParams)>,
) {
    let pending_collisions = feed.pending;
    feed.pending = 0;

    let now = time.elapsed_secs();
    let dt = time.delta_secs();
    for (entity, layer, mut seq, params) in &mut query {
        if !layer.enabled {
            params.arp_gate.set(0.0);
            params.glitch_gate.set(0.0);
            params.bass_gate.set(0.0);
            continue;
        }

        let origin = *seq.beat_origin_s.get_or_insert(now);
        let elapsed = now - origin;
        let (bar, beat, bar_phase) = bar_and_beat(origin, now, layer.tempo_bpm);

        let bar_changed = bar != seq.bar_index;
        seq.bar_index = bar;

        let (chord, is_split_half) = chord_for_bar(bar, beat);
        let split_just_crossed = is_split_half && !seq.in_split_second_half;
        seq.in_split_second_half = is_split_half;
        if bar_changed || split_just_crossed {
            seq.note_index = 0;
        }

        let section = section_for_bar(bar);
        if section != seq.section {
            seq.section = section;
            section_events.write(MatrixSectionChanged { entity, section, bar });
        }

        params.intensity.set(layer.intensity * section.intensity_scale());

        let drone_target = if section == Section::Main { 1.0 } else { 0.0 };
        let drone_step = (dt / DRONE_FADE_S).max(0.0);
        let current_drone = params.drone_gain.get();
        params.drone_gain.set(current_drone + (drone_target - current_drone).clamp(-drone_step, drone_step));

        let root_hz = chord_note_hz(chord, 0, layer.transpose_semitones);
        params.root_freq.set(root_hz);
        params.bass_gate.set(bass_envelope_gain(bar, beat, bar_phase, layer.tempo_bpm));

        let arp_decayed = (params.arp_gate.get() - ARP_GATE_DECAY_PER_S * dt).max(0.0);
        let glitch_decayed = (params.glitch_gate.get() - GLITCH_GATE_DECAY_PER_S * dt).max(0.0);
        params.arp_gate.set(arp_decayed);
        params.glitch_gate.set(glitch_decayed);

        let slot = sixteenth_slot(elapsed, layer.tempo_bpm);
        let new_sixteenth = slot != seq.last_sixteenth_slot && is_on_sixteenth(elapsed, layer.tempo_bpm);
        if new_sixteenth {
            seq.last_sixteenth_slot = slot;
            if pending_collisions > 0 {
                let arp_hz = chord_note_hz(chord, seq.note_index, layer.transpose_semitones);
                seq.note_index = (seq.note_index + 1) % chord.notes.len().max(1);
                params.arp_freq.set(arp_hz);
                params.arp_gate.set(1.0);
                params.glitch_gate.set(1.0);
            } else {
                let glitch_roll: f32 = rand::random();
                if glitch_roll < layer.glitch_probability {
                    params.glitch_gate.set(1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_cycle_follows_the_fixed_chord_order() {
        let (chord, split) = chord_for_bar(0, 0);
        assert_eq!(chord.name, "Gm");
        assert!(!split);
        let (chord, _) = chord_for_bar(4, 1);
        assert_eq!(chord.name, "Gm");
        let (chord, _) = chord_for_bar(5, 0);
        assert_eq!(chord.name, "Am");
    }

    #[test]
    fn bridge_theme_starts_at_bar_64() {
        let (chord, split) = chord_for_bar(64, 0);
        assert_eq!(chord.name, BRIDGE_THEME[0].name);
        assert!(!split);
    }

    #[test]
    fn bridge_theme_repeats_over_two_passes() {
        let (first_pass, _) = chord_for_bar(64, 0);
        let (second_pass, _) = chord_for_bar(72, 0);
        assert_eq!(first_pass.name, second_pass.name);
    }

    #[test]
    fn split_bars_change_chord_at_beat_three() {
        let (before, split_before) = chord_for_bar(84, 1);
        let (after, split_after) = chord_for_bar(84, 2);
        assert!(!split_before);
        assert!(split_after);
        assert_ne!(before.notes, after.notes);
    }

    #[test]
    fn breakdown_reuses_the_first_two_main_chords() {
        let (chord, _) = chord_for_bar(88, 0);
        assert_eq!(chord.name, MAIN_CHORDS[0].name);
        let (chord, _) = chord_for_bar(89, 0);
        assert_eq!(chord.name, MAIN_CHORDS[1].name);
    }

    #[test]
    fn bar_index_follows_the_anchored_cycle_invariant() {
        let bar_s = bar_seconds(MATRIX_TEMPO_BPM);
        let beat_s = bar_s / BEATS_PER_BAR as f32;
        let (bar, beat, _) = bar_and_beat(0.0, 4.0 * bar_s + 1.5 * beat_s, MATRIX_TEMPO_BPM);
        assert_eq!(bar, 4);
        assert_eq!(beat, 1);
        let (chord, _) = chord_for_bar(bar, beat);
        assert_eq!(chord.name, "Gm");
    }

    #[test]
    fn bridge_section_starts_at_bar_64_point_01s_in() {
        let bar_s = bar_seconds(MATRIX_TEMPO_BPM);
        let (bar, beat, _) = bar_and_beat(0.0, BRIDGE_START_BAR as f32 * bar_s + 0.01, MATRIX_TEMPO_BPM);
        assert_eq!(section_for_bar(bar), Section::Bridge);
        let (chord, _) = chord_for_bar(bar, beat);
        assert_eq!(chord.name, BRIDGE_THEME[0].name);
    }

    #[test]
    fn split_bar_crossing_resets_the_note_index_and_picks_the_split_chord() {
        let bar_s = bar_seconds(MATRIX_TEMPO_BPM);
        let beat_s = bar_s / BEATS_PER_BAR as f32;
        let t = SPLIT_BARS_START_BAR as f32 * bar_s + 2.0 * beat_s + 0.001;
        let (bar, beat, _) = bar_and_beat(0.0, t, MATRIX_TEMPO_BPM);
        assert_eq!(bar, SPLIT_BARS_START_BAR);
        let (chord, is_split_half) = chord_for_bar(bar, beat);
        assert!(is_split_half);
        assert_eq!(chord.notes, SPLIT_BAR_PAIRS[0].1.notes);
    }

    #[test]
    fn sixteenth_quantization_window_is_twelve_milliseconds() {
        assert!(is_on_sixteenth(0.0, MATRIX_TEMPO_BPM));
        assert!(is_on_sixteenth(0.011, MATRIX_TEMPO_BPM));
        assert!(!is_on_sixteenth(0.02, MATRIX_TEMPO_BPM));
        let sixteenth = sixteenth_seconds(MATRIX_TEMPO_BPM);
        assert!(is_on_sixteenth(sixteenth - 0.011, MATRIX_TEMPO_BPM));
    }

    #[test]
    fn transpose_note_round_trips_through_a_semitone_shift() {
        for name in ["G2", "A2", "Bb2", "C3", "D3", "F#3"] {
            let up = transpose_note(name, 5).unwrap();
            let back = transpose_note(&up, -5).unwrap();
            assert_eq!(back, name);
        }
    }

    #[test]
    fn transpose_note_recognises_flats_and_sharps() {
        assert_eq!(transpose_note("Bb2", 0).unwrap(), "Bb2");
        assert_eq!(transpose_note("A#2", 0).unwrap(), "A#2");
        assert_eq!(transpose_note("C3", 1).unwrap(), "C#3");
        assert_eq!(transpose_note("Db3", -1).unwrap(), "C3");
    }

    #[test]
    fn bass_is_silent_at_the_cycle_edges_and_active_in_main() {
        assert_eq!(bass_mode_for_bar(0), BassMode::Silent);
        assert_eq!(bass_mode_for_bar(30), BassMode::Sustained);
        assert_eq!(bass_mode_for_bar(70), BassMode::Silent);
        assert_eq!(bass_mode_for_bar(80), BassMode::Pulsed);
        assert_eq!(bass_mode_for_bar(89), BassMode::Silent);
    }
}
