use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionSource {
    #[default]
    Window,
    LeftEye,
    RightEye,
}

/// Where to read the encoded area from, relative to the captured surface.
///
/// `anchor_x` / `anchor_y` are fractions of the surface size the offset is
/// measured from, so `(0.0, 0.5)` means "left edge, vertically centered".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionCoordinates {
    pub source: ExtractionSource,
    pub x: i32,
    pub y: i32,
    pub requested_width: u32,
    pub requested_height: u32,
    pub anchor_x: f32,
    pub anchor_y: f32,
}

impl ExtractionCoordinates {
    pub const fn window_default() -> Self {
        ExtractionCoordinates {
            source: ExtractionSource::Window,
            x: 8,
            y: 31,
            requested_width: 256,
            requested_height: 256,
            anchor_x: 0.0,
            anchor_y: 0.0,
        }
    }

    pub const fn vr_default() -> Self {
        ExtractionCoordinates {
            source: ExtractionSource::LeftEye,
            x: 0,
            y: 0,
            requested_width: 256,
            requested_height: 256,
            anchor_x: 0.0,
            anchor_y: 0.5,
        }
    }

    /// Top-left pixel of the requested area on a surface of the given size.
    pub fn origin_on_surface(&self, surface_width: u32, surface_height: u32) -> (i32, i32) {
        (
            (surface_width as f32 * self.anchor_x) as i32 + self.x,
            (surface_height as f32 * self.anchor_y) as i32 + self.y,
        )
    }
}

impl Default for ExtractionCoordinates {
    fn default() -> Self {
        Self::window_default()
    }
}

/// Monochrome pixels produced by a capture backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub success: bool,
    pub monochromatic_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub iteration: u32,
}

impl ExtractionResult {
    pub fn failed() -> Self {
        Self::default()
    }
}
