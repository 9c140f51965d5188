use nalgebra::Vector3;
use shared_definitions::layout::PositionSystemDataLayout;

use crate::config::constants::{ATTENUATION_SCALE, OUR_VENDOR, RANGE_MULTIPLIER};

use super::words::{
    checksum_of_words, write_word, GROUP_LENGTH, WORD_CAMERA_POSITION, WORD_CAMERA_ROTATION,
    WORD_CHECKSUM, WORD_LIGHT_ATTENUATIONS, WORD_LIGHT_COLORS, WORD_LIGHT_POSITIONS, WORD_TIME,
    WORD_VENDOR, WORD_VERSION,
};

const LIT_CELL: u8 = 230;

/// Producer side of the frame format. Builds the 52 words and lays them out as a bit grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuilder {
    words: [u32; GROUP_LENGTH],
}

impl FrameBuilder {
    pub fn new() -> Self {
        FrameBuilder {
            words: [0; GROUP_LENGTH],
        }
    }

    /// Frame stamped with our vendor tag, the given time and encoded version.
    pub fn with_header(time: f32, version: u32) -> Self {
        let mut builder = Self::new();
        builder
            .set_f32(WORD_TIME, time)
            .set_u32(WORD_VENDOR, OUR_VENDOR)
            .set_u32(WORD_VERSION, version);
        builder
    }

    pub fn set_u32(&mut self, index: usize, value: u32) -> &mut Self {
        if let Some(word) = self.words.get_mut(index) {
            *word = value;
        }
        self
    }

    pub fn set_f32(&mut self, index: usize, value: f32) -> &mut Self {
        self.set_u32(index, value.to_bits())
    }

    pub fn set_vector(&mut self, index: usize, value: Vector3<f32>) -> &mut Self {
        self.set_f32(index, value.x)
            .set_f32(index + 1, value.y)
            .set_f32(index + 2, value.z)
    }

    pub fn set_time(&mut self, time: f32) -> &mut Self {
        self.set_f32(WORD_TIME, time)
    }

    pub fn set_light_position(&mut self, light: usize, position: Vector3<f32>) -> &mut Self {
        self.set_vector(WORD_LIGHT_POSITIONS + light * 3, position)
    }

    pub fn set_light_color(&mut self, light: usize, color: Vector3<f32>, intensity: f32) -> &mut Self {
        let index = WORD_LIGHT_COLORS + light * 4;
        self.set_vector(index, color).set_f32(index + 3, intensity)
    }

    pub fn set_light_attenuation(&mut self, light: usize, attenuation: f32) -> &mut Self {
        self.set_f32(WORD_LIGHT_ATTENUATIONS + light, attenuation)
    }

    /// Enabled black light at `position` whose attenuation decodes back to `range`.
    pub fn set_data_light(&mut self, light: usize, position: Vector3<f32>, range: f32) -> &mut Self {
        self.set_light_position(light, position)
            .set_light_color(light, Vector3::zeros(), 1.0)
            .set_light_attenuation(light, attenuation_for_range(range))
    }

    pub fn set_camera_pose(&mut self, position: Vector3<f32>, rotation: Vector3<f32>) -> &mut Self {
        self.set_vector(WORD_CAMERA_POSITION, position)
            .set_vector(WORD_CAMERA_ROTATION, rotation)
    }

    /// Writes the checksum of words `1..` into word 0.
    pub fn seal(&mut self) -> &mut Self {
        self.words[WORD_CHECKSUM] = checksum_of_words(self.words[WORD_TIME..].iter().copied());
        self
    }

    pub fn words(&self) -> &[u32; GROUP_LENGTH] {
        &self.words
    }

    pub fn to_bits(&self, layout: &PositionSystemDataLayout) -> Vec<bool> {
        let mut bits = vec![false; layout.bit_count()];
        for (index, word) in self.words.iter().enumerate() {
            write_word(&mut bits, index, *word);
        }
        bits
    }

    /// Draws the frame the way a producer would, each cell `scale` times its nominal size.
    pub fn render(&self, layout: &PositionSystemDataLayout, scale: usize) -> (Vec<u8>, u32, u32) {
        render_cells(layout, &self.to_bits(layout), scale)
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Monochrome image of a cell grid, margins included. Set cells are bright, the rest black.
pub fn render_cells(
    layout: &PositionSystemDataLayout,
    cells: &[bool],
    scale: usize,
) -> (Vec<u8>, u32, u32) {
    let square = layout.encoded_square_size * scale;
    let width = layout.columns_with_margin() * square;
    let height = layout.lines_with_margin() * square;
    let mut pixels = vec![0_u8; width * height];
    for (index, _) in cells
        .iter()
        .take(layout.bit_count())
        .enumerate()
        .filter(|(_, set)| **set)
    {
        let column = index % layout.number_of_columns + layout.margin_per_side;
        let line = index / layout.number_of_columns + layout.margin_per_side;
        for y in line * square..(line + 1) * square {
            pixels[y * width + column * square..y * width + (column + 1) * square].fill(LIT_CELL);
        }
    }
    (pixels, width as u32, height as u32)
}

/// Inverse of the decoder's attenuation to range conversion.
pub fn attenuation_for_range(range: f32) -> f32 {
    let ratio = range / RANGE_MULTIPLIER;
    ATTENUATION_SCALE / (1.0 + ratio * ratio)
}
