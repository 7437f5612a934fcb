//! Configuration surface and `.rain` document persistence (spec.md §6).

pub mod persistence;
pub mod schema;

pub use persistence::{autosave_system, load, save, PersistenceState, RainDocument};
pub use schema::{
    BubbleConfig, BusConfig, ImpactConfig, LimiterConfig, MatrixConfig, MixerConfig, PhysicsConfig, RainscapeConfig,
    SfxConfig, SheetConfig, SimConfig, ThunderConfig, WindConfig,
};
