use bevy::prelude::*;

/// Marker identifying which continuous layer a long-lived entity is. Each
/// kind has exactly one live entity, spawned once at startup by
/// [`crate::orchestrator::spawn_continuous_layers_system`].
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Sheet,
    Wind,
    Matrix,
}
