/// Logical canvas size plus the device pixel ratio it is presented at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: normalize_pixel_ratio(pixel_ratio),
        }
    }

    /// Size of the backing store in physical pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            scale_dimension(self.width, self.pixel_ratio),
            scale_dimension(self.height, self.pixel_ratio),
        )
    }
}

pub fn normalize_pixel_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

fn scale_dimension(logical: u32, ratio: f32) -> u32 {
    (logical as f32 * ratio).round().max(1.0) as u32
}
