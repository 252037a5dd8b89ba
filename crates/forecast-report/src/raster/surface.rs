//! Off-screen drawing surface backed by an RGBA buffer.

use crate::config::PixelSize;
use image::{Rgba, RgbaImage};

/// A non-interactive pixel surface sized exactly to the requested chart.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(size: PixelSize, background: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(size.width, size.height, Rgba(background)),
        }
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.image.width(), self.image.height())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the surface is empty or every pixel has the same colour.
    pub fn is_blank(&self) -> bool {
        let mut pixels = self.image.pixels();
        match pixels.next() {
            None => true,
            Some(first) => pixels.all(|p| p == first),
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width() && y < self.height() {
            Some(self.image.get_pixel(x, y).0)
        } else {
            None
        }
    }

    /// Set one pixel, ignoring coordinates outside the surface.
    pub fn put(&mut self, x: i64, y: i64, color: [u8; 4]) {
        if x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height() {
            self.image.put_pixel(x as u32, y as u32, Rgba(color));
        }
    }

    /// Blend a colour over the existing pixel using its alpha channel.
    pub fn blend(&mut self, x: i64, y: i64, color: [u8; 4]) {
        if x < 0 || y < 0 || (x as u32) >= self.width() || (y as u32) >= self.height() {
            return;
        }
        let alpha = color[3] as u32;
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let src = color[c] as u32;
            let old = dst.0[c] as u32;
            dst.0[c] = ((src * alpha + old * (255 - alpha)) / 255) as u8;
        }
        dst.0[3] = 255;
    }

    /// Fill an axis-aligned rectangle; corners may be given in any order.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 4]) {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        for y in top..=bottom {
            for x in left..=right {
                self.put(x, y, color);
            }
        }
    }

    /// Draw a straight line with a square pen of `thickness` pixels.
    pub fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), thickness: u32, color: [u8; 4]) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        let half = (thickness.max(1) as i64 - 1) / 2;
        let extra = (thickness.max(1) as i64 - 1) - half;

        loop {
            self.fill_rect(x - half, y - half, x + extra, y + extra, color);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Fill the region between two polylines sharing the same x positions.
    ///
    /// Each column between consecutive points is filled with a vertical span
    /// between the linearly interpolated upper and lower edges.
    pub fn fill_between(&mut self, xs: &[i64], upper: &[i64], lower: &[i64], color: [u8; 4]) {
        let n = xs.len().min(upper.len()).min(lower.len());
        if n == 1 {
            for y in upper[0].min(lower[0])..=upper[0].max(lower[0]) {
                self.blend(xs[0], y, color);
            }
            return;
        }

        for i in 1..n {
            let (x0, x1) = (xs[i - 1], xs[i]);
            if x1 <= x0 {
                continue;
            }
            let last = if i == n - 1 { x1 } else { x1 - 1 };
            for x in x0..=last {
                let t = (x - x0) as f64 / (x1 - x0) as f64;
                let top = lerp(upper[i - 1], upper[i], t);
                let bottom = lerp(lower[i - 1], lower[i], t);
                for y in top.min(bottom)..=top.max(bottom) {
                    self.blend(x, y, color);
                }
            }
        }
    }
}

fn lerp(a: i64, b: i64, t: f64) -> i64 {
    (a as f64 + (b - a) as f64 * t).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    #[test]
    fn test_new_surface_is_blank() {
        let surface = RasterSurface::new(PixelSize::new(10, 5), WHITE);
        assert!(surface.is_blank());
        assert_eq!(surface.size(), PixelSize::new(10, 5));
    }

    #[test]
    fn test_draw_line_marks_endpoints() {
        let mut surface = RasterSurface::new(PixelSize::new(10, 10), WHITE);
        surface.draw_line((1, 1), (8, 6), 1, BLACK);
        assert_eq!(surface.pixel(1, 1), Some(BLACK));
        assert_eq!(surface.pixel(8, 6), Some(BLACK));
        assert!(!surface.is_blank());
    }

    #[test]
    fn test_out_of_bounds_writes_are_ignored() {
        let mut surface = RasterSurface::new(PixelSize::new(4, 4), WHITE);
        surface.put(-1, 2, BLACK);
        surface.fill_rect(10, 10, 20, 20, BLACK);
        assert!(surface.is_blank());
    }

    #[test]
    fn test_fill_between_covers_span() {
        let mut surface = RasterSurface::new(PixelSize::new(10, 10), WHITE);
        surface.fill_between(&[0, 9], &[2, 2], &[6, 6], BLACK);
        assert_eq!(surface.pixel(5, 4), Some(BLACK));
        assert_eq!(surface.pixel(5, 8), Some(WHITE));
    }
}
