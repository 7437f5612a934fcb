use bevy::prelude::Resource;

/// One physical monitor as reported by the host OS layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayInfo {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

/// The union of all monitors, in screen coordinates, with an origin at the
/// top-left of the bounding box of every monitor.
#[derive(Debug, Clone, PartialEq, Resource)]
pub struct VirtualDesktop {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    pub monitors: Vec<DisplayInfo>,
    pub primary_index: usize,
}

impl VirtualDesktop {
    /// Builds a virtual desktop from host display info. Degenerate
    /// rectangles (NaN, zero or negative size) are coerced to a 1x1
    /// placeholder at the origin rather than rejected, per spec.md §7
    /// ("Geometry errors... logged, coerced to nearest valid value").
    pub fn from_displays(displays: &[DisplayInfo]) -> Self {
        if displays.is_empty() {
            crate::error::log_degraded("geometry.empty_displays", "no displays reported");
            return Self {
                origin_x: 0.0,
                origin_y: 0.0,
                width: 1.0,
                height: 1.0,
                monitors: vec![DisplayInfo {
                    id: 0,
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                    scale_factor: 1.0,
                }],
                primary_index: 0,
            };
        }

        let monitors: Vec<DisplayInfo> = displays.iter().map(|d| sanitize(*d)).collect();

        let min_x = monitors.iter().map(|d| d.x).fold(f32::INFINITY, f32::min);
        let min_y = monitors.iter().map(|d| d.y).fold(f32::INFINITY, f32::min);
        let max_x = monitors
            .iter()
            .map(|d| d.x + d.width)
            .fold(f32::NEG_INFINITY, f32::max);
        let max_y = monitors
            .iter()
            .map(|d| d.y + d.height)
            .fold(f32::NEG_INFINITY, f32::max);

        Self {
            origin_x: min_x,
            origin_y: min_y,
            width: (max_x - min_x).max(1.0),
            height: (max_y - min_y).max(1.0),
            monitors,
            primary_index: 0,
        }
    }

    /// Number of grid columns/rows at [`super::LOGIC_TO_SCREEN`] resolution.
    pub fn grid_size(&self) -> (usize, usize) {
        let w = (self.width / super::LOGIC_TO_SCREEN).ceil().max(1.0) as usize;
        let h = (self.height / super::LOGIC_TO_SCREEN).ceil().max(1.0) as usize;
        (w, h)
    }
}

fn sanitize(mut d: DisplayInfo) -> DisplayInfo {
    if !d.x.is_finite() {
        d.x = 0.0;
    }
    if !d.y.is_finite() {
        d.y = 0.0;
    }
    if !d.width.is_finite() || d.width <= 0.0 {
        crate::error::log_degraded(
            "geometry.degenerate_display",
            format!("display {} has invalid width {}", d.id, d.width),
        );
        d.width = 1.0;
    }
    if !d.height.is_finite() || d.height <= 0.0 {
        crate::error::log_degraded(
            "geometry.degenerate_display",
            format!("display {} has invalid height {}", d.id, d.height),
        );
        d.height = 1.0;
    }
    if !d.scale_factor.is_finite() || d.scale_factor <= 0.0 {
        d.scale_factor = 1.0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_monitor_origin_at_zero() {
        let vd = VirtualDesktop::from_displays(&[DisplayInfo {
            id: 0,
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
            scale_factor: 1.0,
        }]);
        assert_eq!(vd.origin_x, 0.0);
        assert_eq!(vd.origin_y, 0.0);
        assert_eq!(vd.width, 1920.0);
        assert_eq!(vd.height, 1080.0);
    }

    #[test]
    fn degenerate_rect_is_coerced_not_rejected() {
        let vd = VirtualDesktop::from_displays(&[DisplayInfo {
            id: 1,
            x: f32::NAN,
            y: 0.0,
            width: -10.0,
            height: f32::NAN,
            scale_factor: 0.0,
        }]);
        assert_eq!(vd.monitors.len(), 1);
        assert!(vd.monitors[0].x.is_finite());
        assert!(vd.monitors[0].width > 0.0);
        assert!(vd.monitors[0].height > 0.0);
        assert_eq!(vd.monitors[0].scale_factor, 1.0);
    }

    #[test]
    fn two_monitors_span_bounding_box() {
        let vd = VirtualDesktop::from_displays(&[
            DisplayInfo {
                id: 0,
                x: 0.0,
                y: 0.0,
                width: 1920.0,
                height: 1080.0,
                scale_factor: 1.0,
            },
            DisplayInfo {
                id: 1,
                x: 1920.0,
                y: -200.0,
                width: 1280.0,
                height: 1024.0,
                scale_factor: 1.0,
            },
        ]);
        assert_eq!(vd.origin_y, -200.0);
        assert_eq!(vd.width, 3200.0);
        assert_eq!(vd.height, 1280.0);
    }
}
