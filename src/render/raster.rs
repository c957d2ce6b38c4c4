use image::{Rgba, RgbaImage};

use crate::geometry::Color;

/// Single-channel coverage buffer the size of the output surface.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    coverage: Vec<f32>,
    touched: Option<(u32, u32, u32, u32)>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0.0; width as usize * height as usize],
            touched: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.coverage[self.index(x, y)]
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_none()
    }

    /// Accumulates coverage at a possibly out-of-bounds pixel, keeping the maximum.
    pub fn add(&mut self, x: i32, y: i32, value: f32) {
        if value <= 0.0 || x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.coverage[index] = self.coverage[index].max(value.min(1.0));
        self.touched = Some(match self.touched {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    /// Grows the covered shape by `radius` pixels with a one-pixel soft edge. Used to
    /// build an outline that sits underneath the glyph fill.
    pub fn dilate(&self, radius: f32) -> CoverageMask {
        let mut dilated = CoverageMask::new(self.width, self.height);
        let Some((x0, y0, x1, y1)) = self.touched else {
            return dilated;
        };
        let reach = radius.max(0.0).ceil() as i32 + 1;
        let kernel = dilation_kernel(radius.max(0.0), reach);

        let min_x = (x0 as i32 - reach).max(0);
        let min_y = (y0 as i32 - reach).max(0);
        let max_x = (x1 as i32 + reach).min(self.width as i32 - 1);
        let max_y = (y1 as i32 + reach).min(self.height as i32 - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let mut value = 0.0f32;
                for &(dx, dy, weight) in &kernel {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx < 0 || sy < 0 {
                        continue;
                    }
                    value = value.max(self.get(sx as u32, sy as u32) * weight);
                    if value >= 1.0 {
                        break;
                    }
                }
                dilated.add(x, y, value);
            }
        }
        dilated
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

fn dilation_kernel(radius: f32, reach: i32) -> Vec<(i32, i32, f32)> {
    let mut kernel = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            let weight = (radius + 1.0 - distance).clamp(0.0, 1.0);
            if weight > 0.0 {
                kernel.push((dx, dy, weight));
            }
        }
    }
    kernel
}

pub fn fill(canvas: &mut RgbaImage, color: Color) {
    let pixel = color.to_rgba();
    for destination in canvas.pixels_mut() {
        *destination = pixel;
    }
}

/// Source-over blend of an opaque color through a coverage mask.
pub fn blend_mask(canvas: &mut RgbaImage, mask: &CoverageMask, color: Color) {
    let Some((x0, y0, x1, y1)) = mask.touched else {
        return;
    };
    let x1 = x1.min(canvas.width().saturating_sub(1));
    let y1 = y1.min(canvas.height().saturating_sub(1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            let alpha = mask.get(x, y);
            if alpha <= 0.0 {
                continue;
            }
            let destination = canvas.get_pixel_mut(x, y);
            *destination = blend_over(*destination, color, alpha);
        }
    }
}

fn blend_over(destination: Rgba<u8>, color: Color, alpha: f32) -> Rgba<u8> {
    let mix = |dst: u8, src: u8| -> u8 {
        (f32::from(src) * alpha + f32::from(dst) * (1.0 - alpha))
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let (r, g, b) = color.rgb();
    let out_alpha = (alpha * 255.0 + f32::from(destination[3]) * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([
        mix(destination[0], r),
        mix(destination[1], g),
        mix(destination[2], b),
        out_alpha,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_maximum_and_ignores_out_of_bounds() {
        let mut mask = CoverageMask::new(4, 4);
        assert!(mask.is_empty());
        mask.add(1, 1, 0.4);
        mask.add(1, 1, 0.2);
        mask.add(-1, 2, 1.0);
        mask.add(9, 2, 1.0);
        assert_eq!(mask.get(1, 1), 0.4);
        assert!(!mask.is_empty());
    }

    #[test]
    fn dilate_spreads_coverage_around_a_single_pixel() {
        let mut mask = CoverageMask::new(9, 9);
        mask.add(4, 4, 1.0);
        let dilated = mask.dilate(2.0);
        assert_eq!(dilated.get(4, 4), 1.0);
        assert_eq!(dilated.get(6, 4), 1.0);
        assert_eq!(dilated.get(4, 2), 1.0);
        assert!(dilated.get(6, 6) > 0.0 && dilated.get(6, 6) < 1.0);
        assert_eq!(dilated.get(7, 4), 0.0);
        assert_eq!(dilated.get(0, 0), 0.0);
    }

    #[test]
    fn blend_mask_paints_only_covered_pixels() {
        let mut canvas = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 255]));
        let mut mask = CoverageMask::new(3, 1);
        mask.add(0, 0, 1.0);
        mask.add(1, 0, 0.5);
        blend_mask(&mut canvas, &mask, Color::WHITE);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgba([128, 128, 128, 255]));
        assert_eq!(canvas.get_pixel(2, 0), &Rgba([0, 0, 0, 255]));
    }
}
