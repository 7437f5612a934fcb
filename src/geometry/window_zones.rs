use bevy::prelude::Resource;

use super::virtual_desktop::VirtualDesktop;

/// How a window rectangle affects the grid (spec.md §3, "Window zones").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowZoneKind {
    /// Paints GLASS; rain collides with it.
    Normal,
    /// Paints VOID; also blocks spawn above it.
    Void,
    /// Paints nothing; only edits the spawn map (e.g. a maximized taskbar
    /// strip that should not catch rain but must not spawn drops over it).
    SpawnBlock,
}

/// A window rectangle in virtual-desktop screen coordinates.
#[derive(Debug, Clone)]
pub struct WindowZone {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub title: Option<String>,
    pub material: Option<String>,
    pub is_maximized: bool,
    pub kind: WindowZoneKind,
}

/// Host-mutable resource holding the current window layout (spec.md §6,
/// "External interfaces"). A host updates this whenever a window moves,
/// resizes, or changes focus/material; [`crate::orchestrator::apply_window_zones_system`]
/// notices via `Changed<WindowZones>`, re-paints the simulator's grid, and
/// keeps the Texture Layer's resident voices in sync with which materials
/// are currently in view.
#[derive(Resource, Debug, Clone, Default)]
pub struct WindowZones(pub Vec<WindowZone>);

/// A window rectangle converted to grid (logic) cell coordinates,
/// half-open `[x0, x1) x [y0, y1)`, clamped to the grid bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl WindowZone {
    pub fn to_grid_rect(&self, vd: &VirtualDesktop, grid_w: usize, grid_h: usize) -> GridRect {
        let scale = super::LOGIC_TO_SCREEN;
        let (w, h) = (self.width.max(0.0), self.height.max(0.0));
        let x0 = ((self.x - vd.origin_x) / scale).floor() as i32;
        let y0 = ((self.y - vd.origin_y) / scale).floor() as i32;
        let x1 = ((self.x - vd.origin_x + w) / scale).ceil() as i32;
        let y1 = ((self.y - vd.origin_y + h) / scale).ceil() as i32;
        GridRect {
            x0: x0.clamp(0, grid_w as i32),
            y0: y0.clamp(0, grid_h as i32),
            x1: x1.clamp(0, grid_w as i32),
            y1: y1.clamp(0, grid_h as i32),
        }
    }
}

/// Static geometry maps derived purely from monitor layout (before any
/// window zones are applied). `update_window_zones` copies `spawn_map`
/// from `base_spawn_map` each call and then blanks columns under VOID /
/// spawn-block windows, per spec.md §4.1's window-update algorithm.
#[derive(Debug, Clone)]
pub struct GeometryMaps {
    pub grid_w: usize,
    pub grid_h: usize,
    pub void_mask: Vec<bool>,
    pub base_spawn_map: Vec<i32>,
    pub floor_map: Vec<i32>,
    pub display_floor_map: Vec<i32>,
}

impl GeometryMaps {
    pub fn compute(vd: &VirtualDesktop) -> Self {
        let (grid_w, grid_h) = vd.grid_size();
        let scale = super::LOGIC_TO_SCREEN;
        let mut void_mask = vec![true; grid_w * grid_h];
        let mut spawn_map = vec![-1i32; grid_w];
        let mut floor_map = vec![-1i32; grid_w];
        let mut display_floor_map = vec![-1i32; grid_w];

        for mon in &vd.monitors {
            let x0 = ((mon.x - vd.origin_x) / scale).floor().max(0.0) as usize;
            let x1 = (((mon.x - vd.origin_x + mon.width) / scale).ceil() as usize).min(grid_w);
            let y0 = ((mon.y - vd.origin_y) / scale).floor().max(0.0) as i32;
            let y1 = (((mon.y - vd.origin_y + mon.height) / scale).ceil() as i32).min(grid_h as i32);

            for x in x0..x1 {
                for y in y0.max(0)..y1.max(0) {
                    void_mask[y as usize * grid_w + x] = false;
                }
                // Spawn just inside the top edge; floor at the bottom edge.
                // A later (further right/overlapping) monitor simply wins —
                // ordering is host-provided and not specified further.
                spawn_map[x] = y0;
                floor_map[x] = (y1 - 1).max(y0);
                display_floor_map[x] = (y1 - 1).max(y0);
            }
        }

        Self {
            grid_w,
            grid_h,
            void_mask,
            base_spawn_map: spawn_map,
            floor_map,
            display_floor_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DisplayInfo;

    fn single_monitor_vd() -> VirtualDesktop {
        VirtualDesktop::from_displays(&[DisplayInfo {
            id: 0,
            x: 0.0,
            y: 0.0,
            width: 256.0,
            height: 128.0,
            scale_factor: 1.0,
        }])
    }

    #[test]
    fn maps_cover_the_whole_single_monitor() {
        let vd = single_monitor_vd();
        let maps = GeometryMaps::compute(&vd);
        assert!(maps.base_spawn_map.iter().all(|&v| v >= 0));
        assert!(maps.floor_map.iter().all(|&v| v >= 0));
        assert!(maps.void_mask.iter().all(|&v| !v));
    }

    #[test]
    fn zone_to_grid_rect_clamps_to_bounds() {
        let vd = single_monitor_vd();
        let zone = WindowZone {
            x: -100.0,
            y: -100.0,
            width: 100000.0,
            height: 100000.0,
            title: None,
            material: None,
            is_maximized: false,
            kind: WindowZoneKind::Normal,
        };
        let rect = zone.to_grid_rect(&vd, 64, 32);
        assert_eq!(rect.x0, 0);
        assert_eq!(rect.y0, 0);
        assert_eq!(rect.x1, 64);
        assert_eq!(rect.y1, 32);
    }
}
