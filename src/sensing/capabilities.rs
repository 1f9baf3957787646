//! Boundary types for the externally supplied vision capabilities.
//!
//! Frame capture, object detection and hand tracking are implemented
//! elsewhere; anything that satisfies these traits can drive a session,
//! including scripted fakes in tests.

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Axis-aligned box in frame pixel coordinates, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SurfaceBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl SurfaceBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Intersection with a `width`×`height` image, `None` when empty.
    pub fn clipped(&self, width: u32, height: u32) -> Option<SurfaceBox> {
        let clipped = SurfaceBox {
            x1: self.x1.max(0),
            y1: self.y1.max(0),
            x2: self.x2.min(width as i32),
            y2: self.y2.min(height as i32),
        };
        (clipped.area() > 0).then_some(clipped)
    }

    /// Largest box by area; ties keep the first.
    pub fn largest(boxes: &[SurfaceBox]) -> Option<SurfaceBox> {
        boxes.iter().copied().fold(None, |best, candidate| match best {
            Some(current) if current.area() >= candidate.area() => Some(current),
            _ => Some(candidate),
        })
    }
}

/// One object-detector hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: SurfaceBox,
}

/// A disk of contact on the surface for one frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactPoint {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

/// Two hand landmarks in normalised `[0, 1]` frame coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HandLandmarks {
    pub wrist: (f32, f32),
    pub middle_knuckle: (f32, f32),
}

impl HandLandmarks {
    /// Normalised coordinates are clamped to one frame-width past each edge.
    const REACH: (f32, f32) = (-1.0, 2.0);

    /// Palm centre is the wrist/knuckle midpoint; the radius scales with their
    /// distance so contact size follows the hand's apparent size.
    ///
    /// `None` when a landmark is not a finite number.
    pub fn to_contact(&self, width: u32, height: u32, radius_scale: f32) -> Option<ContactPoint> {
        let to_px = |(x, y): (f32, f32)| {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            let (lo, hi) = Self::REACH;
            Some((
                (x.clamp(lo, hi) as f64 * width as f64) as i64,
                (y.clamp(lo, hi) as f64 * height as f64) as i64,
            ))
        };
        let (x0, y0) = to_px(self.wrist)?;
        let (x9, y9) = to_px(self.middle_knuckle)?;

        let dx = (x0 - x9) as f64;
        let dy = (y0 - y9) as f64;

        Some(ContactPoint {
            x: i32::try_from((x0 + x9).div_euclid(2)).ok()?,
            y: i32::try_from((y0 + y9).div_euclid(2)).ok()?,
            radius: ((dx * dx + dy * dy).sqrt() * radius_scale as f64) as i32,
        })
    }
}

/// A captured frame tagged with its position in the stream.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub sequence: u64,
    pub frame: Arc<RgbImage>,
}

/// Sequential frame supply. `Ok(None)` ends the stream.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Object detector. `classes = None` means any class.
pub trait ObjectDetector: Send + Sync {
    fn detect(
        &self,
        frame: &RgbImage,
        classes: Option<&[u32]>,
        min_confidence: f32,
    ) -> Result<Vec<Detection>>;
}

/// Hand/contact landmark tracker.
pub trait ContactTracker: Send + Sync {
    fn track(&self, frame: &RgbImage) -> Result<Vec<HandLandmarks>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipped_box_respects_image_bounds() {
        let b = SurfaceBox::new(-10, 5, 50, 200);
        assert_eq!(b.clipped(40, 100), Some(SurfaceBox::new(0, 5, 40, 100)));
        assert_eq!(SurfaceBox::new(50, 50, 60, 60).clipped(40, 40), None);
    }

    #[test]
    fn largest_picks_max_area() {
        let boxes = [
            SurfaceBox::new(0, 0, 10, 10),
            SurfaceBox::new(0, 0, 30, 5),
            SurfaceBox::new(0, 0, 20, 20),
        ];
        assert_eq!(SurfaceBox::largest(&boxes), Some(boxes[2]));
        assert_eq!(SurfaceBox::largest(&[]), None);
    }

    #[test]
    fn landmarks_map_to_palm_disk() {
        let hand = HandLandmarks {
            wrist: (0.5, 0.5),
            middle_knuckle: (0.5, 0.25),
        };
        // 100x200 frame: wrist (50, 100), knuckle (50, 50), distance 50.
        let contact = hand.to_contact(100, 200, 0.75);
        assert_eq!(
            contact,
            Some(ContactPoint {
                x: 50,
                y: 75,
                radius: 37
            })
        );
    }

    #[test]
    fn non_finite_landmarks_yield_no_contact() {
        let frame = (640, 480);
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let hand = HandLandmarks {
                wrist: (bad, 0.5),
                middle_knuckle: (0.5, 0.5),
            };
            assert_eq!(hand.to_contact(frame.0, frame.1, 0.75), None);

            let hand = HandLandmarks {
                wrist: (0.5, 0.5),
                middle_knuckle: (0.5, bad),
            };
            assert_eq!(hand.to_contact(frame.0, frame.1, 0.75), None);
        }
    }

    #[test]
    fn far_out_landmarks_are_clamped_without_overflow() {
        let hand = HandLandmarks {
            wrist: (f32::MAX, -f32::MAX),
            middle_knuckle: (1.0e30, 1.0e30),
        };
        // Both x clamp to 2.0 and y to -1.0 / 2.0 on a 100x100 frame.
        let contact = hand.to_contact(100, 100, 1.0).unwrap();
        assert_eq!((contact.x, contact.y), (200, 50));
        assert_eq!(contact.radius, 300);

        let huge = HandLandmarks {
            wrist: (2.0, 2.0),
            middle_knuckle: (2.0, 2.0),
        };
        assert_eq!(huge.to_contact(u32::MAX, u32::MAX, 1.0), None);
    }
}
