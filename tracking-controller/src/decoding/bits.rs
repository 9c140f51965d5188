use serde::{Deserialize, Serialize};
use shared_definitions::layout::PositionSystemDataLayout;

use crate::config::constants::FIXED_BRIGHTNESS_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// A cell is set when its mean brightness is above a constant. Breaks under bloom or tonemapping.
    Fixed,
    /// Threshold chosen per frame from the histogram of cell means.
    #[default]
    Otsu,
}

/// Samples the encoded cells of a captured monochrome image into a bit grid.
///
/// The captured image may be larger or smaller than the nominal encoded size
/// (VR captures follow the headset resolution), so cell spacing is derived from
/// the actual image size every call.
pub struct BitExtractor {
    layout: PositionSystemDataLayout,
    policy: ThresholdPolicy,
    data: Vec<bool>,
    cell_means: Vec<f32>,
    cell_bins: Vec<u8>,
    last_threshold: u8,
}

impl BitExtractor {
    pub fn new(layout: PositionSystemDataLayout, policy: ThresholdPolicy) -> Self {
        let bit_count = layout.bit_count();
        BitExtractor {
            layout,
            policy,
            data: vec![false; bit_count],
            cell_means: vec![0.0; bit_count],
            cell_bins: vec![0; bit_count],
            last_threshold: FIXED_BRIGHTNESS_THRESHOLD,
        }
    }

    pub fn set_threshold_policy(&mut self, policy: ThresholdPolicy) {
        self.policy = policy;
    }

    pub fn bits(&self) -> &[bool] {
        &self.data
    }

    pub fn last_threshold(&self) -> u8 {
        self.last_threshold
    }

    pub fn extract_bits(&mut self, monochromatic: &[u8], width: u32, height: u32) -> &[bool] {
        let columns = self.layout.number_of_columns;
        let margin = self.layout.margin_per_side as f32;
        let square_size = self.layout.encoded_square_size;

        let spacing_w = width as f32 / self.layout.columns_with_margin() as f32;
        let spacing_h = height as f32 / self.layout.lines_with_margin() as f32;
        let inter_pixel_w = spacing_w / square_size as f32;
        let inter_pixel_h = spacing_h / square_size as f32;

        let sampler = PatchSampler {
            pixels: monochromatic,
            width: width as i64,
            height: height as i64,
            square_size,
            inter_pixel_w,
            inter_pixel_h,
        };

        for (index, mean) in self.cell_means.iter_mut().enumerate() {
            let column = (index % columns) as f32;
            let line = (index / columns) as f32;
            let x = ((margin + column + 0.5) * spacing_w) as i64;
            let y = ((margin + line + 0.5) * spacing_h) as i64;
            *mean = sampler.average_around(x, y);
        }

        match self.policy {
            ThresholdPolicy::Fixed => {
                self.last_threshold = FIXED_BRIGHTNESS_THRESHOLD;
                let threshold = FIXED_BRIGHTNESS_THRESHOLD as f32;
                for (bit, mean) in self.data.iter_mut().zip(self.cell_means.iter()) {
                    *bit = *mean > threshold;
                }
            }
            ThresholdPolicy::Otsu => {
                // Otsu classes are defined over the histogram bins, so compare bins too.
                for (bin, mean) in self.cell_bins.iter_mut().zip(self.cell_means.iter()) {
                    *bin = *mean as u8;
                }
                self.last_threshold = calculate_otsu_threshold(&self.cell_bins);
                let threshold = self.last_threshold;
                for (bit, bin) in self.data.iter_mut().zip(self.cell_bins.iter()) {
                    *bit = *bin > threshold;
                }
            }
        }

        &self.data
    }
}

struct PatchSampler<'a> {
    pixels: &'a [u8],
    width: i64,
    height: i64,
    square_size: usize,
    inter_pixel_w: f32,
    inter_pixel_h: f32,
}

impl PatchSampler<'_> {
    /// Mean of the patch centered on `(x, y)`. Pixels outside the image are skipped,
    /// a patch with no pixel inside reads as black.
    fn average_around(&self, x: i64, y: i64) -> f32 {
        let half = self.square_size as f32 / 2.0;
        let mut sum = 0_u64;
        let mut count = 0_u64;

        for p in 0..self.square_size {
            for q in 0..self.square_size {
                let xx = x + ((p as f32 - half) * self.inter_pixel_w) as i64;
                let yy = y + ((q as f32 - half) * self.inter_pixel_h) as i64;
                if let Some(value) = self.pixel(xx, yy) {
                    sum += value as u64;
                    count += 1;
                }
            }
        }

        if count == 0 {
            return 0.0;
        }
        sum as f32 / count as f32
    }

    fn pixel(&self, x: i64, y: i64) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Otsu's threshold over a set of 8 bit values: the `t` maximizing the between-class
/// variance of `{v <= t}` and `{v > t}`. The first maximum wins.
pub fn calculate_otsu_threshold(values: &[u8]) -> u8 {
    let mut histogram = [0_u64; 256];
    for value in values {
        histogram[*value as usize] += 1;
    }

    let total = values.len() as u64;
    let total_sum: u64 = histogram
        .iter()
        .enumerate()
        .map(|(value, count)| value as u64 * count)
        .sum();

    let mut max_variance = 0.0_f64;
    let mut optimal_threshold = 0_u8;
    let mut weight_below = 0_u64;
    let mut sum_below = 0_u64;

    for (t, count) in histogram.iter().enumerate() {
        weight_below += count;
        if weight_below == 0 {
            continue;
        }
        let weight_above = total - weight_below;
        if weight_above == 0 {
            break;
        }

        sum_below += t as u64 * count;
        let mean_below = sum_below as f64 / weight_below as f64;
        let mean_above = (total_sum - sum_below) as f64 / weight_above as f64;
        let mean_difference = mean_below - mean_above;

        let between_variance =
            weight_below as f64 * weight_above as f64 * mean_difference * mean_difference;
        if between_variance > max_variance {
            max_variance = between_variance;
            optimal_threshold = t as u8;
        }
    }

    optimal_threshold
}
