pub mod audio;
pub mod components;
pub mod config;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod plugin;
pub mod sim;

pub mod prelude {
    pub use crate::audio::{BusId, MaterialConfig, MaterialRegistry};
    pub use crate::config::RainscapeConfig;
    pub use crate::error::RainydeskError;
    pub use crate::geometry::{DisplayInfo, VirtualDesktop, WindowZone, WindowZoneKind, WindowZones};
    pub use crate::plugin::{RainydeskPlugin, RainydeskSettings};
    pub use crate::sim::{CollisionEvent, CollisionSurface, GridSimulator, SimParams};
}
