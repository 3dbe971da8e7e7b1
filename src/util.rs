//! Small geometry and formatting helpers shared across modules.

// ============================================================================
// Geometry Utilities
// ============================================================================

/// Axis-aligned rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Creates a new rectangle. Width/height must be positive.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        if width <= 0.0 || height <= 0.0 {
            None
        } else {
            Some(Self {
                x,
                y,
                width,
                height,
            })
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns true if this rectangle lies completely inside a `width` x `height` canvas.
    pub fn fits_within(&self, width: f64, height: f64) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= width && self.bottom() <= height
    }
}

/// Clamps `value` into `[min, max]`, preferring `min` when the range is empty.
pub fn clamp_to_range(value: f64, min: f64, max: f64) -> f64 {
    if max < min {
        min
    } else {
        value.clamp(min, max)
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Formats a byte count for humans (`1.5 MiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_rejects_empty_sizes() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_none());
        assert!(Rect::new(0.0, 0.0, 10.0, -1.0).is_none());
    }

    #[test]
    fn fits_within_checks_all_edges() {
        let rect = Rect::new(10.0, 10.0, 50.0, 20.0).unwrap();
        assert!(rect.fits_within(60.0, 30.0));
        assert!(!rect.fits_within(59.0, 30.0));
        assert!(!Rect::new(-1.0, 0.0, 5.0, 5.0).unwrap().fits_within(100.0, 100.0));
    }

    #[test]
    fn clamp_prefers_min_for_inverted_ranges() {
        assert_eq!(clamp_to_range(5.0, 10.0, 2.0), 10.0);
        assert_eq!(clamp_to_range(5.0, 0.0, 2.0), 2.0);
    }

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
