//! Grid and angle snapping.

use kurbo::Point;

pub const DEFAULT_GRID_SIZE: f64 = 20.0;
pub const MIN_GRID_SIZE: f64 = 5.0;
pub const MAX_GRID_SIZE: f64 = 100.0;

/// Angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;

/// Snap-to-grid settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSnap {
    pub enabled: bool,
    grid_size: f64,
}

impl Default for GridSnap {
    fn default() -> Self {
        Self {
            enabled: false,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl GridSnap {
    pub fn new(enabled: bool, grid_size: f64) -> Self {
        let mut snap = Self {
            enabled,
            grid_size: DEFAULT_GRID_SIZE,
        };
        snap.set_grid_size(grid_size);
        snap
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Set the grid size, clamped to [`MIN_GRID_SIZE`, `MAX_GRID_SIZE`]. Non-finite input is ignored.
    pub fn set_grid_size(&mut self, size: f64) {
        if size.is_finite() {
            self.grid_size = size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE);
        }
    }

    /// Snap a value when enabled, otherwise return it unchanged.
    pub fn snap(&self, value: f64) -> f64 {
        if self.enabled {
            snap_to_grid(value, self.grid_size)
        } else {
            value
        }
    }

    pub fn snap_point(&self, point: Point) -> Point {
        Point::new(self.snap(point.x), self.snap(point.y))
    }
}

/// Round to the nearest multiple of `grid_size`.
pub fn snap_to_grid(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).round() * grid_size
}

/// Round an angle in degrees to the nearest [`ANGLE_SNAP_INCREMENT`].
pub fn snap_angle(degrees: f64) -> f64 {
    (degrees / ANGLE_SNAP_INCREMENT).round() * ANGLE_SNAP_INCREMENT
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
