//! Optional bitrate governor over the quantizer scale.

use crate::quant::{MAX_SCALE, MIN_SCALE};

#[derive(Debug)]
pub struct RateControl {
    target_bitrate: u64,
    buffer_size: f64,
    buffer_fullness: f64,
    target_bits_per_frame: f64,
    avg_frame_bits: f64,
    avg_scale: f64,
    frames_encoded: u64,
    keyint: usize,
    intra_boost: f64,
}

fn initial_scale_from_bitrate(target_bitrate: u64, fps: f64, width: u32, height: u32) -> u8 {
    let bpp = target_bitrate as f64 / (fps * width as f64 * height as f64);
    if bpp > 1.0 {
        4
    } else if bpp > 0.5 {
        8
    } else if bpp > 0.2 {
        14
    } else if bpp > 0.1 {
        19
    } else if bpp > 0.05 {
        24
    } else {
        28
    }
}

impl RateControl {
    pub fn new(target_bitrate: u64, fps: f64, width: u32, height: u32, keyint: usize) -> Self {
        let initial_scale = initial_scale_from_bitrate(target_bitrate, fps, width, height);
        let target_bits_per_frame = target_bitrate as f64 / fps;
        let buffer_size = target_bitrate as f64;

        Self {
            target_bitrate,
            buffer_size,
            buffer_fullness: buffer_size / 2.0,
            target_bits_per_frame,
            avg_frame_bits: target_bits_per_frame,
            avg_scale: initial_scale as f64,
            frames_encoded: 0,
            keyint,
            intra_boost: 4.0,
        }
    }

    fn target_bits_for_frame(&self, is_intra: bool) -> f64 {
        let base = self.target_bits_per_frame;
        if is_intra {
            let boosted = base * self.intra_boost;
            boosted.min(self.buffer_size * 0.5)
        } else {
            let overspend = base * (self.intra_boost - 1.0);
            let reduction = overspend / (self.keyint as f64 - 1.0).max(1.0);
            (base - reduction).max(base * 0.3)
        }
    }

    /// Quantizer scale for the next frame.
    pub fn compute_scale(&mut self, is_intra: bool) -> u8 {
        if self.frames_encoded == 0 {
            let scale = self.avg_scale as u8;
            return if is_intra {
                (scale as i32 - 2).clamp(MIN_SCALE as i32, MAX_SCALE as i32) as u8
            } else {
                scale
            };
        }

        let target_bits = self.target_bits_for_frame(is_intra);

        let buffer_target = self.buffer_size / 2.0;
        let buffer_error =
            ((self.buffer_fullness - buffer_target) / buffer_target).clamp(-1.0, 1.0);

        let rate_error = if self.avg_frame_bits > 0.0 {
            ((self.avg_frame_bits - target_bits) / target_bits).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let combined = 0.6 * buffer_error + 0.4 * rate_error;
        let scale_delta = combined * 4.0;

        let mut new_scale = self.avg_scale + scale_delta;
        new_scale = new_scale.clamp(self.avg_scale - 3.0, self.avg_scale + 3.0);

        if is_intra {
            new_scale -= 2.0;
        }

        (new_scale.round() as i32).clamp(MIN_SCALE as i32, MAX_SCALE as i32) as u8
    }

    pub fn update(&mut self, actual_bits: u64, scale_used: u8) {
        self.buffer_fullness += actual_bits as f64;
        self.buffer_fullness -= self.target_bits_per_frame;
        self.buffer_fullness = self.buffer_fullness.clamp(0.0, self.buffer_size);

        let alpha = 0.2;
        self.avg_frame_bits = alpha * actual_bits as f64 + (1.0 - alpha) * self.avg_frame_bits;
        self.avg_scale = alpha * scale_used as f64 + (1.0 - alpha) * self.avg_scale;

        self.frames_encoded += 1;
    }

    pub fn stats(&self) -> RateControlStats {
        RateControlStats {
            target_bitrate: self.target_bitrate,
            frames_encoded: self.frames_encoded,
            buffer_fullness_pct: (self.buffer_fullness / self.buffer_size * 100.0) as u32,
            avg_scale: self.avg_scale.round() as u8,
        }
    }
}

pub struct RateControlStats {
    pub target_bitrate: u64,
    pub frames_encoded: u64,
    pub buffer_fullness_pct: u32,
    pub avg_scale: u8,
}
