//! Pure geometry for fitting a decoded image into a power-of-two texture
//! and onto the screen.

/// Pixel size of the display, sampled once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
}

impl ScreenGeometry {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width: if width == 0 { 1 } else { width },
            height: if height == 0 { 1 } else { height },
        }
    }

    /// `width / height`
    #[must_use]
    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// `height / width`
    #[must_use]
    pub fn inverse_aspect(&self) -> f64 {
        f64::from(self.height) / f64::from(self.width)
    }
}

/// Where an image sits inside its padded texture and how large its quad is
/// in normalized device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    pub natural_width: f64,
    pub natural_height: f64,
    /// `natural / padded` along x, in `(0, 1]`.
    pub sample_width_fraction: f64,
    /// `natural / padded` along y, in `(0, 1]`.
    pub sample_height_fraction: f64,
    pub vertex_half_width: f64,
    pub vertex_half_height: f64,
}

impl ImageGeometry {
    /// Lay out a `natural_width x natural_height` image against `screen`.
    #[must_use]
    pub fn compute(natural_width: u32, natural_height: u32, screen: ScreenGeometry) -> Self {
        let natural_width = natural_width.max(1);
        let natural_height = natural_height.max(1);
        let (sample_width_fraction, sample_height_fraction) =
            sample_fractions(natural_width, natural_height);
        let (vertex_half_width, vertex_half_height) =
            vertex_extents(natural_width, natural_height, screen);
        Self {
            natural_width: f64::from(natural_width),
            natural_height: f64::from(natural_height),
            sample_width_fraction,
            sample_height_fraction,
            vertex_half_width,
            vertex_half_height,
        }
    }
}

/// Smallest power of two `>= natural`, doubling upward from 2.
///
/// A dimension of 1 therefore pads to 2. Saturates instead of wrapping for
/// inputs above `2^31`, which no JPEG can reach.
#[must_use]
pub const fn padded_dimension(natural: u32) -> u32 {
    let mut padded: u32 = 2;
    while padded < natural {
        padded = padded.saturating_mul(2);
    }
    padded
}

/// Fraction of the padded texture that holds real pixels along each axis.
#[must_use]
pub fn sample_fractions(natural_width: u32, natural_height: u32) -> (f64, f64) {
    let fraction = |natural: u32| f64::from(natural) / f64::from(padded_dimension(natural));
    (fraction(natural_width), fraction(natural_height))
}

/// Half-extents of the display quad.
///
/// The axis along which the image is relatively wider than the screen spans
/// the full unit; the other shrinks by the linear aspect delta. This is not
/// a true aspect-preserving scale, and results may go non-positive for
/// extreme mismatches.
#[must_use]
pub fn vertex_extents(natural_width: u32, natural_height: u32, screen: ScreenGeometry) -> (f64, f64) {
    let w = f64::from(natural_width.max(1));
    let h = f64::from(natural_height.max(1));
    let aspect = w / h;
    if aspect > screen.aspect() {
        (1.0, 1.0 - (aspect - screen.aspect()))
    } else {
        let inverse = h / w;
        // Equal ratios can differ in the last bit once inverted.
        ((1.0 - (inverse - screen.inverse_aspect())).min(1.0), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_powers_of_two() {
        assert_eq!(padded_dimension(0), 2);
        assert_eq!(padded_dimension(1), 2);
        assert_eq!(padded_dimension(2), 2);
        assert_eq!(padded_dimension(3), 4);
        assert_eq!(padded_dimension(640), 1024);
        assert_eq!(padded_dimension(1024), 1024);
        assert_eq!(padded_dimension(1025), 2048);
        assert_eq!(padded_dimension(65_535), 65_536);
    }

    #[test]
    fn fractions_for_partial_texture() {
        let (fw, fh) = sample_fractions(640, 480);
        assert!((fw - 0.625).abs() < 1e-12);
        assert!((fh - 0.9375).abs() < 1e-12);
    }

    #[test]
    fn wide_image_on_4x3_screen() {
        // 2:1 image on 4:3 screen: aspect delta is 2 - 4/3 = 2/3
        let (hx, hy) = vertex_extents(200, 100, ScreenGeometry::new(800, 600));
        assert_eq!(hx, 1.0);
        assert!((hy - (1.0 - 2.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn tall_image_on_16x9_screen() {
        // 3:4 image on 16:9 screen: inverse delta is 4/3 - 9/16
        let (hx, hy) = vertex_extents(300, 400, ScreenGeometry::new(1920, 1080));
        assert_eq!(hy, 1.0);
        assert!((hx - (1.0 - (4.0 / 3.0 - 9.0 / 16.0))).abs() < 1e-12);
    }

    #[test]
    fn matching_aspect_fills_screen() {
        let (hx, hy) = vertex_extents(1920, 1080, ScreenGeometry::new(1280, 720));
        assert_eq!(hx, 1.0);
        assert_eq!(hy, 1.0);
    }

    #[test]
    fn zero_screen_dimensions_are_clamped() {
        let screen = ScreenGeometry::new(0, 0);
        assert_eq!(screen, ScreenGeometry::new(1, 1));
        assert_eq!(screen.aspect(), 1.0);
    }

    #[test]
    fn layout_invariants_hold_across_sizes_and_screens() {
        let sizes = (1..=64).chain([
            99, 100, 127, 128, 129, 480, 600, 640, 720, 768, 1024, 1080, 1200, 1920, 2048,
            3000, 4000, 4032, 6000, 8192, 12_000, 65_535,
        ]);
        let sizes: Vec<u32> = sizes.collect();
        let screens = [
            (1, 1),
            (640, 480),
            (800, 600),
            (1024, 768),
            (1280, 720),
            (1920, 1080),
            (1080, 1920),
            (2560, 1080),
            (3840, 2160),
            (600, 1024),
        ];
        for &(sw, sh) in &screens {
            let screen = ScreenGeometry::new(sw, sh);
            for &w in &sizes {
                for &h in &sizes {
                    let g = ImageGeometry::compute(w, h, screen);
                    for fraction in [g.sample_width_fraction, g.sample_height_fraction] {
                        assert!(fraction > 0.0 && fraction <= 1.0, "{w}x{h} on {sw}x{sh}");
                    }
                    assert_eq!(
                        g.vertex_half_width.max(g.vertex_half_height),
                        1.0,
                        "{w}x{h} on {sw}x{sh}"
                    );
                }
            }
        }
    }
}
