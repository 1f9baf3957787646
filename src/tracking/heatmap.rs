//! Per-pixel contact accumulation for the active recording.

use image::{GrayImage, Luma};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut},
    rect::Rect,
};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::sensing::{ContactPoint, SurfaceBox};

const ON: Luma<u8> = Luma([255]);
const OFF: Luma<u8> = Luma([0]);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// Heat added per frame to every contacted surface pixel.
    pub increment: f32,
    /// Heat at which a pixel counts as cleaned for live feedback.
    pub coverage_threshold: f32,
    /// Edge band width is `min(frame_h, frame_w) / edge_band_divisor`.
    pub edge_band_divisor: u32,
    /// Fraction of the edge band that must be cleaned for "high-touch done".
    pub high_touch_done_ratio: f32,
    /// Contact radius as a multiple of the wrist-to-knuckle distance.
    pub landmark_radius_scale: f32,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            increment: 0.02,
            coverage_threshold: 0.3,
            edge_band_divisor: 8,
            high_touch_done_ratio: 0.6,
            landmark_radius_scale: 0.75,
        }
    }
}

impl AccumulatorConfig {
    pub fn validate(&self) -> Result<(), SettingsError> {
        SettingsError::positive("accumulator.increment", self.increment)?;
        SettingsError::unit("accumulator.coverage_threshold", self.coverage_threshold)?;
        SettingsError::unit("accumulator.high_touch_done_ratio", self.high_touch_done_ratio)?;
        SettingsError::positive("accumulator.landmark_radius_scale", self.landmark_radius_scale)
    }
}

/// Binary frame-sized field marking the detected surface.
#[derive(Debug, Clone)]
pub struct SurfaceMask {
    pixels: GrayImage,
    bounds: Option<SurfaceBox>,
    area: usize,
}

impl SurfaceMask {
    /// Rasterised union of `boxes`, clipped to the frame.
    pub fn from_boxes(width: u32, height: u32, boxes: &[SurfaceBox]) -> Self {
        let mut pixels = GrayImage::new(width, height);
        let mut bounds: Option<SurfaceBox> = None;

        for clipped in boxes.iter().filter_map(|b| b.clipped(width, height)) {
            let rect = Rect::at(clipped.x1, clipped.y1)
                .of_size(clipped.width() as u32, clipped.height() as u32);
            draw_filled_rect_mut(&mut pixels, rect, ON);
            bounds = Some(match bounds {
                Some(b) => SurfaceBox::new(
                    b.x1.min(clipped.x1),
                    b.y1.min(clipped.y1),
                    b.x2.max(clipped.x2),
                    b.y2.max(clipped.y2),
                ),
                None => clipped,
            });
        }

        let area = pixels.pixels().filter(|p| p[0] > 0).count();
        Self {
            pixels,
            bounds,
            area,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.pixels.get_pixel(x, y)[0] > 0
    }

    pub fn area(&self) -> usize {
        self.area
    }

    pub fn bounds(&self) -> Option<SurfaceBox> {
        self.bounds
    }
}

/// Saturating contact intensity in `[0, 1]`, one value per frame pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Heatmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Build from raw row-major values, clamped into `[0, 1]`.
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        if values.len() != width as usize * height as usize {
            return None;
        }
        let data = values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    fn bump(&mut self, x: u32, y: u32, increment: f32) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = (self.data[idx] + increment).clamp(0.0, 1.0);
    }
}

/// Session-scoped accumulator: the surface mask, its heatmap and a scratch
/// buffer for contact disks. Created at start, frozen at stop.
#[derive(Debug, Clone)]
pub struct ContactAccumulator {
    mask: SurfaceMask,
    heatmap: Heatmap,
    scratch: GrayImage,
    config: AccumulatorConfig,
}

impl ContactAccumulator {
    pub fn new(mask: SurfaceMask, config: AccumulatorConfig) -> Self {
        let (width, height) = (mask.width(), mask.height());
        Self {
            mask,
            heatmap: Heatmap::new(width, height),
            scratch: GrayImage::new(width, height),
            config,
        }
    }

    pub fn mask(&self) -> &SurfaceMask {
        &self.mask
    }

    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }

    /// Add one contact disk. Returns how many surface pixels it touched.
    pub fn apply(&mut self, contact: ContactPoint) -> usize {
        if contact.radius < 0 {
            return 0;
        }
        draw_filled_circle_mut(&mut self.scratch, (contact.x, contact.y), contact.radius, ON);

        let (width, height) = (self.scratch.width() as i64, self.scratch.height() as i64);
        let r = contact.radius as i64;
        let x_lo = (contact.x as i64 - r).clamp(0, width) as u32;
        let x_hi = (contact.x as i64 + r + 1).clamp(0, width) as u32;
        let y_lo = (contact.y as i64 - r).clamp(0, height) as u32;
        let y_hi = (contact.y as i64 + r + 1).clamp(0, height) as u32;

        let mut touched = 0;
        for y in y_lo..y_hi {
            for x in x_lo..x_hi {
                if self.scratch.get_pixel(x, y)[0] == 0 {
                    continue;
                }
                self.scratch.put_pixel(x, y, OFF);
                if self.mask.contains(x, y) {
                    self.heatmap.bump(x, y, self.config.increment);
                    touched += 1;
                }
            }
        }
        touched
    }

    /// Percent of surface pixels at or above the coverage threshold.
    pub fn live_coverage_percent(&self) -> f64 {
        let total = self.mask.area();
        if total == 0 {
            return 0.0;
        }
        let missed = self
            .surface_pixels()
            .filter(|&(x, y)| self.heatmap.value(x, y) < self.config.coverage_threshold)
            .count();
        (1.0 - missed as f64 / total as f64) * 100.0
    }

    /// Whether enough of the surface's outer band has been cleaned.
    ///
    /// The band is every surface pixel within `min(frame_h, frame_w) / divisor`
    /// (at least 1) of the surface bounds. Advisory only.
    pub fn high_touch_done(&self) -> bool {
        let Some(bounds) = self.mask.bounds() else {
            return false;
        };
        let divisor = self.config.edge_band_divisor.max(1);
        let margin = (self.mask.width().min(self.mask.height()) / divisor).max(1) as i32;

        let in_band = |x: u32, y: u32| {
            let (x, y) = (x as i32, y as i32);
            x < bounds.x1 + margin
                || x >= bounds.x2 - margin
                || y < bounds.y1 + margin
                || y >= bounds.y2 - margin
        };

        let (mut total, mut covered) = (0usize, 0usize);
        for (x, y) in self.surface_pixels().filter(|&(x, y)| in_band(x, y)) {
            total += 1;
            if self.heatmap.value(x, y) >= self.config.coverage_threshold {
                covered += 1;
            }
        }
        total > 0 && covered as f64 / total as f64 >= self.config.high_touch_done_ratio as f64
    }

    /// Freeze: hand out the heatmap and mask, consuming the accumulator.
    pub fn freeze(self) -> (Heatmap, SurfaceMask) {
        (self.heatmap, self.mask)
    }

    fn surface_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.mask
            .pixels
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator(width: u32, height: u32, boxes: &[SurfaceBox]) -> ContactAccumulator {
        ContactAccumulator::new(
            SurfaceMask::from_boxes(width, height, boxes),
            AccumulatorConfig::default(),
        )
    }

    #[test]
    fn mask_is_union_of_clipped_boxes() {
        let mask = SurfaceMask::from_boxes(
            20,
            10,
            &[SurfaceBox::new(0, 0, 5, 5), SurfaceBox::new(3, 3, 30, 8)],
        );
        // 25 + 17*5 - overlap 2*2
        assert_eq!(mask.area(), 25 + 85 - 4);
        assert!(mask.contains(19, 7));
        assert!(!mask.contains(19, 8));
        assert_eq!(mask.bounds(), Some(SurfaceBox::new(0, 0, 20, 8)));
    }

    #[test]
    fn contact_only_heats_surface_pixels() {
        let mut acc = accumulator(40, 40, &[SurfaceBox::new(0, 0, 20, 40)]);
        let touched = acc.apply(ContactPoint {
            x: 20,
            y: 20,
            radius: 5,
        });
        assert!(touched > 0);
        assert!((acc.heatmap().value(18, 20) - 0.02).abs() < 1e-6);
        assert_eq!(acc.heatmap().value(22, 20), 0.0);
        assert_eq!(acc.heatmap().value(5, 5), 0.0);
    }

    #[test]
    fn repeated_contact_saturates_at_one() {
        let mut acc = accumulator(10, 10, &[SurfaceBox::new(0, 0, 10, 10)]);
        let contact = ContactPoint {
            x: 5,
            y: 5,
            radius: 1,
        };
        for _ in 0..80 {
            acc.apply(contact);
        }
        assert_eq!(acc.heatmap().value(5, 5), 1.0);
    }

    #[test]
    fn scratch_is_cleared_between_contacts() {
        let mut acc = accumulator(30, 30, &[SurfaceBox::new(0, 0, 30, 30)]);
        acc.apply(ContactPoint {
            x: 5,
            y: 5,
            radius: 2,
        });
        acc.apply(ContactPoint {
            x: 25,
            y: 25,
            radius: 2,
        });
        assert!((acc.heatmap().value(5, 5) - 0.02).abs() < 1e-6);
        assert!((acc.heatmap().value(25, 25) - 0.02).abs() < 1e-6);
        assert!(acc.scratch.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn live_coverage_counts_pixels_over_threshold() {
        let mut acc = accumulator(10, 10, &[SurfaceBox::new(0, 0, 10, 10)]);
        assert_eq!(acc.live_coverage_percent(), 0.0);

        for _ in 0..20 {
            acc.apply(ContactPoint {
                x: 50,
                y: 50,
                radius: 80,
            });
        }
        assert!((acc.live_coverage_percent() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_mask_reports_zero_and_not_done() {
        let acc = accumulator(10, 10, &[SurfaceBox::new(20, 20, 30, 30)]);
        assert_eq!(acc.mask().area(), 0);
        assert_eq!(acc.live_coverage_percent(), 0.0);
        assert!(!acc.high_touch_done());
    }

    #[test]
    fn high_touch_done_tracks_edge_band() {
        let mut acc = accumulator(80, 80, &[SurfaceBox::new(0, 0, 80, 80)]);
        // Interior only: band untouched.
        for _ in 0..20 {
            acc.apply(ContactPoint {
                x: 40,
                y: 40,
                radius: 20,
            });
        }
        assert!(!acc.high_touch_done());

        for _ in 0..20 {
            acc.apply(ContactPoint {
                x: 40,
                y: 40,
                radius: 200,
            });
        }
        assert!(acc.high_touch_done());
    }
}
