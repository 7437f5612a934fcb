//! The five continuous/event-driven audio layers that sit above the voice
//! pools: Sheet (rain wash), Texture (per-surface material loops), Wind,
//! Thunder, and Matrix (generative ambient bed) — spec.md §4.5-§4.9.

pub mod matrix;
pub mod sheet;
pub mod texture;
pub mod thunder;
pub mod wind;

pub use matrix::{
    build_matrix_graph, chord_for_bar, matrix_sequencer_system, transpose_note, MatrixCollisionFeed, MatrixLayer,
    MatrixParams, MatrixSectionChanged, MatrixSequencer, Section, BRIDGE_THEME, MAIN_CHORDS,
};
pub use sheet::{build_sheet_graph, sheet_live_intensity_system, sheet_sync_system, SheetLayer, SheetParams};
pub use texture::{
    build_texture_graph, texture_crossfade_system, DensityTier, TextureCache, TextureParams, TextureVoice,
};
pub use thunder::{
    build_thunder_graph, spawn_thunder_event, IrCache, IrManifest, ThunderDistance, ThunderEvent, ThunderScheduler,
};
pub use wind::{build_wind_graph, wind_sync_system, WindGustState, WindLayer, WindParams};
