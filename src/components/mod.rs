//! Small Bevy components shared across the audio layers and pools:
//! oscillator waveform tagging and one-shot entity lifetime.

pub mod lifetime;
pub mod synth;
