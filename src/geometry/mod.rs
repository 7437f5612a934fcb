//! Geometry Ingest: normalises host-provided monitor and window rectangles
//! into a virtual desktop in grid (logic) coordinates, producing the void
//! mask and per-column spawn/floor/display-floor maps the simulator reads.

pub mod virtual_desktop;
pub mod window_zones;

pub use virtual_desktop::{DisplayInfo, VirtualDesktop};
pub use window_zones::{WindowZone, WindowZoneKind, WindowZones};

/// Screen pixels represented by one grid cell. Collision events are
/// reported back to the host in screen space by multiplying logic-space
/// quantities by this factor (spec.md §4.1, "Collision emission to audio").
pub const LOGIC_TO_SCREEN: f32 = 4.0;
