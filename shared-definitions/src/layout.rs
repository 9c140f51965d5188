use serde::{Deserialize, Serialize};

/// Geometry of the bit grid encoded into the captured image.
///
/// The grid holds `number_of_data_lines * number_of_columns` cells. Each cell
/// is drawn as a square of `encoded_square_size` pixels, surrounded by
/// `margin_per_side` empty cells on every side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSystemDataLayout {
    pub number_of_columns: usize,
    pub number_of_data_lines: usize,
    pub margin_per_side: usize,
    pub encoded_square_size: usize,
}

impl PositionSystemDataLayout {
    pub const GROUP_LENGTH: usize = 52;
    pub const BITS_PER_WORD: usize = 32;

    pub const fn new(
        number_of_columns: usize,
        margin_per_side: usize,
        encoded_square_size: usize,
    ) -> Self {
        let bits = Self::GROUP_LENGTH * Self::BITS_PER_WORD;
        PositionSystemDataLayout {
            number_of_columns,
            number_of_data_lines: (bits + number_of_columns - 1) / number_of_columns,
            margin_per_side,
            encoded_square_size,
        }
    }

    pub const fn standard() -> Self {
        Self::new(32, 1, 4)
    }

    pub const fn bit_count(&self) -> usize {
        self.number_of_columns * self.number_of_data_lines
    }

    pub const fn columns_with_margin(&self) -> usize {
        self.number_of_columns + self.margin_per_side * 2
    }

    pub const fn lines_with_margin(&self) -> usize {
        self.number_of_data_lines + self.margin_per_side * 2
    }

    /// Pixel size of the encoded area before any capture scaling, as `(width, height)`.
    pub const fn nominal_size(&self) -> (usize, usize) {
        (
            self.columns_with_margin() * self.encoded_square_size,
            self.lines_with_margin() * self.encoded_square_size,
        )
    }

    pub fn scaled_size(&self, scale: f32) -> (u32, u32) {
        let (width, height) = self.nominal_size();
        (
            (width as f32 * scale) as u32,
            (height as f32 * scale) as u32,
        )
    }
}

impl Default for PositionSystemDataLayout {
    fn default() -> Self {
        Self::standard()
    }
}
