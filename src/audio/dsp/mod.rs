//! Procedural audio plumbing: the FunDSP graph bridge, the live-parameter
//! handle, custom DSP building blocks, and the shared graph-construction
//! helpers every voice pool and layer builds on.

pub mod graph_builder;
pub mod param;
pub mod processors;
pub mod source;

pub use graph_builder::{build_bubble_graph, build_impact_graph, one_shot_envelope, wet_dry_reverb};
pub use param::ParamHandle;
pub use processors::{fbm_noise, phasor, sample_hold, Fbm, Phasor, SampleHold};
pub use source::{ProceduralAudio, ProceduralAudioDecoder};
