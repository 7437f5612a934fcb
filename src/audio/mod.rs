//! Everything downstream of a [`crate::sim::CollisionEvent`]: material
//! lookup, collision-to-acoustics mapping, voice pools, the five ambient
//! layers, and bus/master mixing (spec.md §4.2-§4.10).

pub mod bus;
pub mod collision_mapper;
pub mod components;
pub mod dsp;
pub mod layers;
pub mod material;
pub mod pools;
pub mod systems;

pub use bus::{bus_mix_apply_system, Bus, BusGain, BusId, BusRoute, MasterBus, VoiceMix, ALL_BUS_IDS};
pub use collision_mapper::{map as map_collision, ImpactParams};
pub use components::LayerKind;
pub use material::{MaterialConfig, MaterialRegistry};
