//! Colour primitives for the stage palette
//!
//! Palette generation and the per-segment derived colours all work in HSL
//! (hue 0-360, saturation/lightness 0-100) and convert to linear RGBA at the
//! edge. Hue arithmetic wraps; saturation and lightness clamp.

use serde::{Deserialize, Serialize};

/// An RGBA colour with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to HSL (hue 0-360, saturation/lightness 0-100)
    pub fn to_hsl(self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        let delta = max - min;

        if delta < f32::EPSILON {
            return Hsl::new(0.0, 0.0, f64::from(l) * 100.0);
        }

        let s = if l > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };

        let h = if max == self.r {
            60.0 * (((self.g - self.b) / delta).rem_euclid(6.0))
        } else if max == self.g {
            60.0 * ((self.b - self.r) / delta + 2.0)
        } else {
            60.0 * ((self.r - self.g) / delta + 4.0)
        };

        Hsl::new(f64::from(h), f64::from(s) * 100.0, f64::from(l) * 100.0)
    }
}

/// A colour in HSL space: hue in degrees, saturation/lightness in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self {
            h: normalize_degrees(h),
            s: s.clamp(0.0, 100.0),
            l: l.clamp(0.0, 100.0),
        }
    }

    /// Shift hue (wrapping) and offset saturation/lightness (clamping)
    pub fn shifted(self, dh: f64, ds: f64, dl: f64) -> Self {
        Self::new(self.h + dh, self.s + ds, self.l + dl)
    }

    /// Replace saturation with a fixed target, keeping hue and lightness
    pub fn with_saturation(self, s: f64) -> Self {
        Self::new(self.h, s, self.l)
    }

    /// Convert to RGBA with alpha 1
    pub fn to_color(self) -> Color {
        let s = self.s / 100.0;
        let l = self.l / 100.0;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = self.h / 60.0;
        let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        Color::new((r1 + m) as f32, (g1 + m) as f32, (b1 + m) as f32, 1.0)
    }
}

/// Wrap a value in degrees into [0, 360)
#[inline]
pub fn normalize_degrees(mut deg: f64) -> f64 {
    deg = deg.rem_euclid(360.0);
    if deg >= 360.0 { 0.0 } else { deg }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees_wraps() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-10.0), 350.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(45.0), 45.0);
    }

    #[test]
    fn test_hsl_primaries() {
        let red = Hsl::new(0.0, 100.0, 50.0).to_color();
        assert!((red.r - 1.0).abs() < 1e-4 && red.g.abs() < 1e-4 && red.b.abs() < 1e-4);

        let green = Hsl::new(120.0, 100.0, 50.0).to_color();
        assert!(green.r.abs() < 1e-4 && (green.g - 1.0).abs() < 1e-4);

        let blue = Hsl::new(240.0, 100.0, 50.0).to_color();
        assert!((blue.b - 1.0).abs() < 1e-4 && blue.g.abs() < 1e-4);
    }

    #[test]
    fn test_hsl_round_trip() {
        let original = Hsl::new(217.0, 30.0, 40.0);
        let back = original.to_color().to_hsl();
        assert!((back.h - original.h).abs() < 0.5);
        assert!((back.s - original.s).abs() < 0.5);
        assert!((back.l - original.l).abs() < 0.5);
    }

    #[test]
    fn test_shifted_clamps_saturation_and_lightness() {
        let c = Hsl::new(10.0, 95.0, 95.0).shifted(0.0, 30.0, 20.0);
        assert_eq!(c.s, 100.0);
        assert_eq!(c.l, 100.0);
    }

    #[test]
    fn test_shifted_wraps_hue() {
        let c = Hsl::new(350.0, 50.0, 50.0).shifted(180.0, 0.0, 0.0);
        assert!((c.h - 170.0).abs() < 1e-9);
    }
}
