use bevy::prelude::*;

/// Which impact-synth family a material's bubble overtone oscillates with
/// (spec.md §3, "Material descriptor" -> `bubbleOscillatorType`).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OscillatorType {
    Sine,
    Saw,
    Square,
    Triangle,
    Noise,
}

impl Default for OscillatorType {
    fn default() -> Self {
        Self::Sine
    }
}
