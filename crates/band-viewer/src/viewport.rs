//! Pan/zoom state for the displayed band image.
//!
//! A transform belongs to exactly one installed image; switching bands
//! starts from the identity transform again.

/// Zoom bounds and wheel sensitivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportLimits {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Relative zoom per wheel notch (0.3 = 30%)
    pub wheel_step: f64,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 15.0,
            wheel_step: 0.3,
        }
    }
}

/// Scale and translation applied to the displayed image.
///
/// Screen coordinates are `screen = image * scale + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    limits: ViewportLimits,
}

impl ViewportTransform {
    pub fn new(limits: ViewportLimits) -> Self {
        Self {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            limits,
        }
    }

    pub fn limits(&self) -> ViewportLimits {
        self.limits
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.pan_x == 0.0 && self.pan_y == 0.0
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zoom to `scale`, keeping the screen point `focal` fixed.
    pub fn zoom_to(&mut self, scale: f64, focal: (f64, f64)) {
        let clamped = scale.clamp(self.limits.min_scale, self.limits.max_scale);
        if !clamped.is_finite() {
            return;
        }
        let ratio = clamped / self.scale;
        let (fx, fy) = focal;
        self.pan_x = fx - (fx - self.pan_x) * ratio;
        self.pan_y = fy - (fy - self.pan_y) * ratio;
        self.scale = clamped;
    }

    /// Apply a wheel event. Negative `delta_y` (wheel up) zooms in.
    pub fn zoom_with_wheel(&mut self, delta_y: f64, focal: (f64, f64)) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y < 0.0 {
            1.0 + self.limits.wheel_step
        } else {
            1.0 / (1.0 + self.limits.wheel_step)
        };
        self.zoom_to(self.scale * factor, focal);
    }

    /// Map a screen point back to image coordinates.
    pub fn to_image(&self, screen: (f64, f64)) -> (f64, f64) {
        (
            (screen.0 - self.pan_x) / self.scale,
            (screen.1 - self.pan_y) / self.scale,
        )
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.limits);
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(ViewportLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    #[test]
    fn test_zoom_keeps_focal_point() {
        let mut vt = ViewportTransform::default();
        let before = vt.to_image((100.0, 50.0));
        vt.zoom_to(4.0, (100.0, 50.0));
        let after = vt.to_image((100.0, 50.0));
        assert_coords_approx_eq!(before, after, 1e-9);
        assert_approx_eq!(vt.scale, 4.0, 1e-12);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vt = ViewportTransform::default();
        vt.zoom_to(100.0, (0.0, 0.0));
        assert_eq!(vt.scale, 15.0);
        vt.zoom_to(0.001, (0.0, 0.0));
        assert_eq!(vt.scale, 0.1);
    }

    #[test]
    fn test_wheel_direction() {
        let mut vt = ViewportTransform::default();
        vt.zoom_with_wheel(-1.0, (0.0, 0.0));
        assert!(vt.scale > 1.0);
        vt.reset();
        vt.zoom_with_wheel(1.0, (0.0, 0.0));
        assert!(vt.scale < 1.0);
    }

    #[test]
    fn test_wheel_in_then_out_round_trips() {
        let mut vt = ViewportTransform::default();
        vt.zoom_with_wheel(-1.0, (10.0, 20.0));
        vt.zoom_with_wheel(1.0, (10.0, 20.0));
        assert_approx_eq!(vt.scale, 1.0, 1e-12);
        assert_approx_eq!(vt.pan_x, 0.0, 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut vt = ViewportTransform::default();
        vt.pan_by(5.0, -3.0);
        vt.zoom_to(2.0, (1.0, 1.0));
        assert!(!vt.is_identity());
        vt.reset();
        assert!(vt.is_identity());
    }
}
