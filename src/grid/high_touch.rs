use crate::models::HighTouchMask;
use crate::profiles::HighTouchPattern;

/// Mark the contact-critical cells of an `h`×`w` grid.
///
/// Pure and deterministic; bands wider than the grid are clamped to it.
pub fn high_touch_mask(pattern: HighTouchPattern, h: usize, w: usize) -> HighTouchMask {
    match pattern {
        HighTouchPattern::TopLeftBands { band } => {
            HighTouchMask::from_fn(h, w, |r, c| r < band || c < band)
        }
        HighTouchPattern::EndBands { band } => {
            let right = w.saturating_sub(band);
            HighTouchMask::from_fn(h, w, |_, c| c < band || c >= right)
        }
        HighTouchPattern::CentralBlock => {
            let (r0, r1) = (h / 3, 2 * h / 3);
            let (c0, c1) = (w / 3, 2 * w / 3);
            HighTouchMask::from_fn(h, w, |r, c| (r0..r1).contains(&r) && (c0..c1).contains(&c))
        }
    }
}

/// Mask from the built-in rule for `surface_type`.
pub fn high_touch_mask_for_surface(surface_type: &str, h: usize, w: usize) -> HighTouchMask {
    high_touch_mask(HighTouchPattern::for_surface_type(surface_type), h, w)
}
