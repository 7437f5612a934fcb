//! Rain & Puddle Simulator: the Lagrangian drop buffers, the Eulerian
//! puddle grid, and the collision-side resolution between them
//! (spec.md §4.1).

pub mod collision;
pub mod grid;
pub mod particles;
pub mod simulator;

pub use collision::{CollisionEvent, CollisionSurface};
pub use grid::Grid;
pub use particles::{Drops, Splashes};
pub use simulator::{GridSimulator, SimParams};
