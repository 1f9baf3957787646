use image::{imageops, RgbImage};
use imageproc::{
    contours::{find_contours, BorderType},
    distance_transform::Norm,
    edges::canny,
    filter::gaussian_blur_f32,
    morphology::dilate,
    point::Point,
};
use serde::{Deserialize, Serialize};

use super::capabilities::{Detection, ObjectDetector, SurfaceBox};
use crate::error::SettingsError;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Tuning for the cascading surface search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Detector class id of the cleanable surface (COCO 60, "dining table").
    pub target_class: u32,
    pub confidence_floor: f32,
    /// Minimum box/contour area as a fraction of the frame.
    pub min_area_fraction: f32,
    /// Exclusive aspect-ratio bounds for contour boxes.
    pub aspect_min: f32,
    pub aspect_max: f32,
    /// Per-side margin of the last-resort box, as a fraction of the frame.
    pub fallback_margin: f32,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilate_radius: u8,
    pub enable_any_class_stage: bool,
    pub enable_contour_stage: bool,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            target_class: 60,
            confidence_floor: 0.08,
            min_area_fraction: 0.08,
            aspect_min: 0.3,
            aspect_max: 6.0,
            fallback_margin: 0.10,
            blur_sigma: 2.0,
            canny_low: 20.0,
            canny_high: 80.0,
            dilate_radius: 4,
            enable_any_class_stage: true,
            enable_contour_stage: true,
        }
    }
}

impl LocalizerConfig {
    /// Reject values the blur and edge stages cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        SettingsError::positive("localizer.blur_sigma", self.blur_sigma)?;
        SettingsError::unit("localizer.confidence_floor", self.confidence_floor)?;
        SettingsError::unit("localizer.min_area_fraction", self.min_area_fraction)?;
        if !(0.0..0.5).contains(&self.fallback_margin) {
            return Err(SettingsError::OutOfRange {
                field: "localizer.fallback_margin",
                range: "[0, 0.5)",
                value: self.fallback_margin,
            });
        }
        if !(0.0..).contains(&self.canny_low) {
            return Err(SettingsError::OutOfRange {
                field: "localizer.canny_low",
                range: "[0, inf)",
                value: self.canny_low,
            });
        }
        SettingsError::ordered(
            ("localizer.canny_low", self.canny_low),
            ("localizer.canny_high", self.canny_high),
            true,
        )?;
        SettingsError::ordered(
            ("localizer.aspect_min", self.aspect_min),
            ("localizer.aspect_max", self.aspect_max),
            false,
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocalizerStage {
    TargetClass,
    LargeObject,
    Contour,
    Fallback,
}

/// Boxes in priority order plus the stage that produced them. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Localization {
    pub stage: LocalizerStage,
    pub boxes: Vec<SurfaceBox>,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceLocalizer {
    config: LocalizerConfig,
}

impl SurfaceLocalizer {
    pub fn new(config: LocalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    pub fn localize(&self, frame: &RgbImage, detector: Option<&dyn ObjectDetector>) -> Localization {
        let (width, height) = frame.dimensions();
        let min_area = (width as f64 * height as f64 * self.config.min_area_fraction as f64) as i64;

        if let Some(detector) = detector {
            let targets = run_detector(
                detector,
                frame,
                Some(std::slice::from_ref(&self.config.target_class)),
                self.config.confidence_floor,
            );
            let boxes: Vec<SurfaceBox> = targets
                .into_iter()
                .filter(|d| d.class_id == self.config.target_class)
                .map(|d| d.bbox)
                .collect();
            if !boxes.is_empty() {
                log_debug!("surface from target class: {} boxes", boxes.len());
                return Localization {
                    stage: LocalizerStage::TargetClass,
                    boxes,
                };
            }

            if self.config.enable_any_class_stage {
                let boxes: Vec<SurfaceBox> =
                    run_detector(detector, frame, None, self.config.confidence_floor)
                        .into_iter()
                        .map(|d| d.bbox)
                        .filter(|b| b.area() >= min_area)
                        .collect();
                if !boxes.is_empty() {
                    log_debug!("surface from large objects: {} boxes", boxes.len());
                    return Localization {
                        stage: LocalizerStage::LargeObject,
                        boxes,
                    };
                }
            }
        }

        if self.config.enable_contour_stage {
            if let Some(found) = self.largest_contour_box(frame, min_area) {
                log_debug!("surface from contour {:?}", found);
                return Localization {
                    stage: LocalizerStage::Contour,
                    boxes: vec![found],
                };
            }
        }

        Localization {
            stage: LocalizerStage::Fallback,
            boxes: vec![self.fallback_box(width, height)],
        }
    }

    /// Edge map, dilated so broken outlines close, then the largest outer
    /// contour that is big enough and not a thin sliver.
    fn largest_contour_box(&self, frame: &RgbImage, min_area: i64) -> Option<SurfaceBox> {
        let gray = imageops::grayscale(frame);
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        let dilated = dilate(&edges, Norm::LInf, self.config.dilate_radius);

        find_contours::<i32>(&dilated)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| polygon_area(&c.points) >= min_area as f64)
            .filter_map(|c| bounding_box(&c.points))
            .filter(|b| {
                let aspect = b.width() as f32 / b.height() as f32;
                aspect > self.config.aspect_min && aspect < self.config.aspect_max
            })
            .fold(None, |best: Option<SurfaceBox>, candidate| match best {
                Some(current) if current.area() >= candidate.area() => Some(current),
                _ => Some(candidate),
            })
    }

    fn fallback_box(&self, width: u32, height: u32) -> SurfaceBox {
        let margin_x = (width as f32 * self.config.fallback_margin) as i32;
        let margin_y = (height as f32 * self.config.fallback_margin) as i32;
        SurfaceBox::new(
            margin_x,
            margin_y,
            width as i32 - margin_x,
            height as i32 - margin_y,
        )
    }
}

fn run_detector(
    detector: &dyn ObjectDetector,
    frame: &RgbImage,
    classes: Option<&[u32]>,
    min_confidence: f32,
) -> Vec<Detection> {
    match detector.detect(frame, classes, min_confidence) {
        Ok(found) => found
            .into_iter()
            .filter(|d| d.confidence >= min_confidence)
            .collect(),
        Err(err) => {
            log_warn!("object detector failed, continuing cascade: {err:?}");
            Vec::new()
        }
    }
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Inclusive pixel extent as a half-open box.
fn bounding_box(points: &[Point<i32>]) -> Option<SurfaceBox> {
    let first = points.first()?;
    let init = (first.x, first.y, first.x, first.y);
    let (x1, y1, x2, y2) = points.iter().fold(init, |(x1, y1, x2, y2), p| {
        (x1.min(p.x), y1.min(p.y), x2.max(p.x), y2.max(p.y))
    });
    Some(SurfaceBox::new(x1, y1, x2 + 1, y2 + 1))
}
