//! A minimal 2-D vector type for per-frame motion math.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn angle_deg(self) -> f64 {
        self.y.atan2(self.x).to_degrees()
    }

    pub fn rotated_deg(self, degrees: f64) -> Vec2 {
        let r = degrees.to_radians();
        let (s, c) = r.sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    pub fn scaled(self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn added(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    /// Signed length of this vector's projection onto the unit direction at
    /// `direction_deg` (measured the same way as [`Vec2::angle_deg`]).
    pub fn projected_onto_deg(self, direction_deg: f64) -> f64 {
        let r = direction_deg.to_radians();
        self.x * r.cos() + self.y * r.sin()
    }

    /// Wraps a coordinate that has moved outside `[-half_extent,
    /// half_extent]` back in at the opposite edge, preserving the amount of
    /// overshoot.
    pub fn wrap_1d(value: f64, half_extent: f64) -> f64 {
        let extent = half_extent * 2.0;
        if extent <= 0.0 {
            return value;
        }
        let mut v = (value + half_extent) % extent;
        if v < 0.0 {
            v += extent;
        }
        v - half_extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_onto_own_direction_is_magnitude() {
        let v = Vec2::new(3.0, 4.0);
        let dir = v.angle_deg();
        assert!((v.projected_onto_deg(dir) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn projection_onto_perpendicular_direction_is_zero() {
        let v = Vec2::new(3.0, 4.0);
        let dir = v.angle_deg() + 90.0;
        assert!(v.projected_onto_deg(dir).abs() < 1e-9);
    }

    #[test]
    fn wrap_1d_returns_to_opposite_edge() {
        assert!((Vec2::wrap_1d(11.0, 10.0) - (-9.0)).abs() < 1e-9);
        assert!((Vec2::wrap_1d(-11.0, 10.0) - 9.0).abs() < 1e-9);
        assert!((Vec2::wrap_1d(5.0, 10.0) - 5.0).abs() < 1e-9);
    }
}
