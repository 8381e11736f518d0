//! Floating-point 8x8 DCT-II used for all coded blocks.
//!
//! The transform is orthonormal: the DC coefficient of a flat block of value
//! v is 8v, and the inverse is the exact transpose, so encoder and decoder
//! reconstructions agree bit for bit.

use std::sync::OnceLock;

/// Cosine basis, `basis()[k][n] = c_k * cos((2n+1) k pi / 16)`.
fn basis() -> &'static [[f32; 8]; 8] {
    static BASIS: OnceLock<[[f32; 8]; 8]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut b = [[0.0f32; 8]; 8];
        for (k, row) in b.iter_mut().enumerate() {
            let norm = if k == 0 { (1.0f64 / 8.0).sqrt() } else { 0.5 };
            for (n, v) in row.iter_mut().enumerate() {
                let angle = std::f64::consts::PI * (2 * n + 1) as f64 * k as f64 / 16.0;
                *v = (norm * angle.cos()) as f32;
            }
        }
        b
    })
}

/// Forward 2D transform of a natural-order block.
pub fn forward(block: &[f32; 64]) -> [f32; 64] {
    let b = basis();
    let mut rows = [0.0f32; 64];
    for y in 0..8 {
        for u in 0..8 {
            let mut acc = 0.0f32;
            for x in 0..8 {
                acc += b[u][x] * block[y * 8 + x];
            }
            rows[y * 8 + u] = acc;
        }
    }
    let mut out = [0.0f32; 64];
    for u in 0..8 {
        for v in 0..8 {
            let mut acc = 0.0f32;
            for y in 0..8 {
                acc += b[v][y] * rows[y * 8 + u];
            }
            out[v * 8 + u] = acc;
        }
    }
    out
}

/// Inverse 2D transform back to a natural-order sample block.
pub fn inverse(coefs: &[f32; 64]) -> [f32; 64] {
    let b = basis();
    let mut cols = [0.0f32; 64];
    for u in 0..8 {
        for y in 0..8 {
            let mut acc = 0.0f32;
            for v in 0..8 {
                acc += b[v][y] * coefs[v * 8 + u];
            }
            cols[y * 8 + u] = acc;
        }
    }
    let mut out = [0.0f32; 64];
    for y in 0..8 {
        for x in 0..8 {
            let mut acc = 0.0f32;
            for u in 0..8 {
                acc += b[u][x] * cols[y * 8 + u];
            }
            out[y * 8 + x] = acc;
        }
    }
    out
}

/// Level-shifts samples to be zero-centered, then transforms.
pub fn forward_intra(samples: &[u8; 64]) -> [f32; 64] {
    let mut block = [0.0f32; 64];
    for (b, &s) in block.iter_mut().zip(samples) {
        *b = s as f32 - 128.0;
    }
    forward(&block)
}

/// Transforms the residual between a source block and its prediction.
pub fn forward_inter(cur: &[u8; 64], pred: &[u8; 64]) -> [f32; 64] {
    let mut block = [0.0f32; 64];
    for i in 0..64 {
        block[i] = cur[i] as f32 - pred[i] as f32;
    }
    forward(&block)
}

/// Inverse transform plus level shift back into the 0..=255 sample range.
pub fn reconstruct_intra(coefs: &[f32; 64]) -> [u8; 64] {
    let spatial = inverse(coefs);
    let mut out = [0u8; 64];
    for (o, &s) in out.iter_mut().zip(&spatial) {
        *o = (s + 128.0).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Inverse transform of a residual added onto its prediction.
pub fn reconstruct_inter(coefs: &[f32; 64], pred: &[u8; 64]) -> [u8; 64] {
    let spatial = inverse(coefs);
    let mut out = [0u8; 64];
    for i in 0..64 {
        out[i] = (spatial[i].round() as i32 + pred[i] as i32).clamp(0, 255) as u8;
    }
    out
}
