//! Scalar quantization of transform coefficients.
//!
//! Every step is `matrix[i] * scale / 16`, except the intra DC which uses a
//! fixed step of 8 so flat fields survive coding exactly. Quantized levels
//! must fit the 9-bit entropy escape; `try_*` report when they do not, and
//! `quantize_with_escalation` walks the scale upward until they do.

use crate::scan;

pub const MIN_SCALE: u8 = 1;
pub const MAX_SCALE: u8 = 31;

/// Largest level magnitude the entropy layer can represent.
pub const MAX_LEVEL: i32 = 255;

/// Fixed quantizer step for the DC coefficient of intra blocks. A
/// level-shifted DC lies in -1024..=1016, so its level never exceeds 128.
pub const INTRA_DC_STEP: f32 = 8.0;

/// Perceptual weighting for intra blocks, natural order. Low frequencies get
/// fine steps, high frequencies coarse ones. The DC entry is unused (see
/// `INTRA_DC_STEP`).
#[rustfmt::skip]
pub const INTRA_MATRIX: [u8; 64] = [
     8, 16, 19, 22, 26, 27, 29, 34,
    16, 16, 22, 24, 27, 29, 34, 37,
    19, 22, 26, 27, 29, 34, 34, 38,
    22, 22, 26, 27, 29, 34, 37, 40,
    22, 26, 27, 29, 32, 35, 40, 48,
    26, 27, 29, 32, 35, 40, 48, 58,
    26, 27, 29, 34, 38, 46, 56, 69,
    27, 29, 35, 38, 46, 56, 69, 83,
];

/// Flat weighting for prediction residuals: every step equals the scale.
pub const INTER_MATRIX: [u8; 64] = [16; 64];

/// Whether a block holds level-shifted samples or a prediction residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockClass {
    Intra,
    Inter,
}

/// One quantized block in scan order, with the scale that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedBlock {
    /// Levels in zigzag order; `levels[0]` is the DC level.
    pub levels: [i32; 64],
    pub scale: u8,
    /// Set when scale 31 still could not represent a level and it was
    /// clamped to `MAX_LEVEL`.
    pub saturated: bool,
}

fn step(matrix_val: u8, scale: u8) -> f32 {
    matrix_val as f32 * scale as f32 / 16.0
}

fn quantize_natural(coefs: &[f32; 64], class: BlockClass, scale: u8) -> ([i32; 64], bool) {
    let matrix = match class {
        BlockClass::Intra => &INTRA_MATRIX,
        BlockClass::Inter => &INTER_MATRIX,
    };
    let mut levels = [0i32; 64];
    let mut overflow = false;
    for i in 0..64 {
        let s = if class == BlockClass::Intra && i == 0 {
            INTRA_DC_STEP
        } else {
            step(matrix[i], scale)
        };
        let level = (coefs[i] / s).round() as i32;
        if level.abs() > MAX_LEVEL {
            overflow = true;
        }
        levels[i] = level;
    }
    (levels, overflow)
}

/// Quantizes at exactly `scale`, or `None` when a level would not fit the
/// entropy layer.
pub fn try_quantize(coefs: &[f32; 64], class: BlockClass, scale: u8) -> Option<[i32; 64]> {
    debug_assert!((MIN_SCALE..=MAX_SCALE).contains(&scale));
    let (levels, overflow) = quantize_natural(coefs, class, scale);
    if overflow {
        None
    } else {
        Some(scan::to_zigzag(&levels))
    }
}

/// Quantizes starting at `scale`, raising it one step at a time until every
/// level fits. At scale 31 offending levels are clamped instead and the
/// block is marked saturated.
pub fn quantize_with_escalation(coefs: &[f32; 64], class: BlockClass, scale: u8) -> QuantizedBlock {
    let mut scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    loop {
        if let Some(levels) = try_quantize(coefs, class, scale) {
            return QuantizedBlock {
                levels,
                scale,
                saturated: false,
            };
        }
        if scale == MAX_SCALE {
            let (mut levels, _) = quantize_natural(coefs, class, scale);
            for level in levels.iter_mut() {
                *level = (*level).clamp(-MAX_LEVEL, MAX_LEVEL);
            }
            return QuantizedBlock {
                levels: scan::to_zigzag(&levels),
                scale,
                saturated: true,
            };
        }
        scale += 1;
    }
}

/// Maps scan-order levels back to natural-order coefficients.
pub fn dequantize(levels: &[i32; 64], class: BlockClass, scale: u8) -> [f32; 64] {
    let matrix = match class {
        BlockClass::Intra => &INTRA_MATRIX,
        BlockClass::Inter => &INTER_MATRIX,
    };
    let mut coefs = [0.0f32; 64];
    for (scan_pos, &nat) in scan::ZIGZAG.iter().enumerate() {
        let s = if class == BlockClass::Intra && nat == 0 {
            INTRA_DC_STEP
        } else {
            step(matrix[nat], scale)
        };
        coefs[nat] = levels[scan_pos] as f32 * s;
    }
    coefs
}
