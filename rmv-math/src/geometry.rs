//! Display geometry: screen size and eye distance in millimeters, derived
//! into visual degrees and pixels.

/// Screen size and viewing distance, all in millimeters, plus the pixel
/// resolution of the current video mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub distance_mm: f64,
    pub width_px: u32,
    pub height_px: u32,
}

impl DisplayGeometry {
    pub fn new(width_mm: f64, height_mm: f64, distance_mm: f64, width_px: u32, height_px: u32) -> Self {
        DisplayGeometry {
            width_mm,
            height_mm,
            distance_mm,
            width_px,
            height_px,
        }
    }

    /// Total visible width in visual degrees, via the small-angle-free
    /// formula `2 * atan(halfExtent / distance)`.
    pub fn width_deg(&self) -> f64 {
        2.0 * (self.width_mm / 2.0 / self.distance_mm).atan().to_degrees()
    }

    pub fn height_deg(&self) -> f64 {
        2.0 * (self.height_mm / 2.0 / self.distance_mm).atan().to_degrees()
    }

    pub fn deg_per_px_x(&self) -> f64 {
        self.width_deg() / self.width_px as f64
    }

    pub fn deg_per_px_y(&self) -> f64 {
        self.height_deg() / self.height_px as f64
    }

    pub fn px_per_deg_x(&self) -> f64 {
        self.width_px as f64 / self.width_deg()
    }

    pub fn px_per_deg_y(&self) -> f64 {
        self.height_px as f64 / self.height_deg()
    }

    /// Converts a point in visual degrees, measured from screen center, to
    /// pixel coordinates with origin at the top-left of the window.
    pub fn deg_to_px(&self, x_deg: f64, y_deg: f64) -> (f64, f64) {
        let px = self.width_px as f64 / 2.0 + x_deg * self.px_per_deg_x();
        // Screen-space y grows downward; visual-degree y grows upward.
        let py = self.height_px as f64 / 2.0 - y_deg * self.px_per_deg_y();
        (px, py)
    }

    pub fn mm_to_deg(&self, mm: f64) -> f64 {
        2.0 * (mm / 2.0 / self.distance_mm).atan().to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deg_per_pixel_is_uniform_for_a_flat_panel() {
        let g = DisplayGeometry::new(531.0, 299.0, 600.0, 1920, 1080);
        assert!((g.width_deg() - 2.0 * (531.0 / 2.0 / 600.0_f64).atan().to_degrees()).abs() < 1e-9);
        assert!(g.deg_per_px_x() > 0.0);
        assert!((g.px_per_deg_x() * g.deg_per_px_x() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn center_maps_to_middle_pixel() {
        let g = DisplayGeometry::new(531.0, 299.0, 600.0, 1920, 1080);
        let (px, py) = g.deg_to_px(0.0, 0.0);
        assert!((px - 960.0).abs() < 1e-9);
        assert!((py - 540.0).abs() < 1e-9);
    }
}
