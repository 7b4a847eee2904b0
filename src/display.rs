//! Fit-to-screen math for the presentation layer
//!
//! The kiosk letterboxes every source onto the fullscreen canvas: scale by
//! the smaller of the two screen/source ratios, center, leave black bars.

/// Scale factor that fits a source inside the screen while preserving
/// aspect ratio.
pub fn fit_scale(screen: (f32, f32), source: (u32, u32)) -> f32 {
    let width_ratio = screen.0 / source.0 as f32;
    let height_ratio = screen.1 / source.1 as f32;
    width_ratio.min(height_ratio)
}

/// Display size of a source scaled with [`fit_scale`].
pub fn fit_size(screen: (f32, f32), source: (u32, u32)) -> (f32, f32) {
    let scale = fit_scale(screen, source);
    (source.0 as f32 * scale, source.1 as f32 * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_source_is_width_bound() {
        let (w, h) = fit_size((1920.0, 1080.0), (3840, 1080));
        assert_eq!((w, h), (1920.0, 540.0));
    }

    #[test]
    fn test_tall_source_is_height_bound() {
        let (w, h) = fit_size((1920.0, 1080.0), (1080, 2160));
        assert_eq!((w, h), (540.0, 1080.0));
    }

    #[test]
    fn test_small_source_is_upscaled() {
        assert_eq!(fit_scale((1920.0, 1080.0), (960, 540)), 2.0);
    }

    #[test]
    fn test_matching_source_fills_the_screen() {
        assert_eq!(fit_size((1920.0, 1080.0), (1920, 1080)), (1920.0, 1080.0));
    }
}
