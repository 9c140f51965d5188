use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_32_ISO_HDLC};
use nalgebra::Vector3;
use shared_definitions::layout::PositionSystemDataLayout;

pub const GROUP_LENGTH: usize = PositionSystemDataLayout::GROUP_LENGTH;
pub const WORD_BITS: usize = PositionSystemDataLayout::BITS_PER_WORD;

// Word indices inside one group
pub const WORD_CHECKSUM: usize = 0;
pub const WORD_TIME: usize = 1;
pub const WORD_VENDOR: usize = 2;
pub const WORD_VERSION: usize = 3;
pub const WORD_LIGHT_POSITIONS: usize = 4;
pub const WORD_LIGHT_COLORS: usize = 16;
pub const WORD_LIGHT_ATTENUATIONS: usize = 32;
pub const WORD_CAMERA_POSITION: usize = 36;
pub const WORD_CAMERA_ROTATION: usize = 39;

/// Reflected 0xEDB88320 polynomial, all-ones init and final xor.
pub const CHECKSUM_ALGORITHM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Reads word `index`, least significant bit first. Bits past the end of the grid read as zero.
pub fn read_word(bits: &[bool], index: usize) -> u32 {
    let start = index * WORD_BITS;
    (0..WORD_BITS).fold(0_u32, |word, bit| {
        match bits.get(start + bit) {
            Some(true) => word | (1 << bit),
            _ => word,
        }
    })
}

pub fn read_float(bits: &[bool], index: usize) -> f32 {
    f32::from_bits(read_word(bits, index))
}

pub fn read_vector(bits: &[bool], index: usize) -> Vector3<f32> {
    Vector3::new(
        read_float(bits, index),
        read_float(bits, index + 1),
        read_float(bits, index + 2),
    )
}

pub fn write_word(bits: &mut [bool], index: usize, word: u32) {
    let start = index * WORD_BITS;
    for bit in 0..WORD_BITS {
        if let Some(cell) = bits.get_mut(start + bit) {
            *cell = (word >> bit) & 1 == 1;
        }
    }
}

/// Checksum of the given words, each fed as its four little endian bytes.
pub fn checksum_of_words<I>(words: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let mut digest = CHECKSUM_ALGORITHM.digest();
    let mut buffer = [0_u8; 4];
    for word in words {
        LittleEndian::write_u32(&mut buffer, word);
        digest.update(&buffer);
    }
    digest.finalize()
}

/// Checksum over words `1..GROUP_LENGTH` of a bit grid.
pub fn checksum_of_bits(bits: &[bool]) -> u32 {
    checksum_of_words((WORD_TIME..GROUP_LENGTH).map(|index| read_word(bits, index)))
}
