//! Half-sample motion search and motion-compensated prediction.
//!
//! Vectors are in half-sample units on the plane they apply to. Prediction
//! fetches clamp to the plane edges, and half positions round half up:
//! `(a+b+1)>>1` on one axis, `(a+b+c+d+2)>>2` diagonally. The decoder
//! reuses these prediction routines, so both sides interpolate identically.

use crate::frame::{Frame, PlaneId};
use crate::mb::{CodingMode, SubBlock};
use crate::metric::{self, MetricKind};

/// Displacement in half-sample units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionVector {
    pub x: i16,
    pub y: i16,
}

impl MotionVector {
    pub const ZERO: MotionVector = MotionVector { x: 0, y: 0 };

    pub fn manhattan(self) -> u32 {
        self.x.unsigned_abs() as u32 + self.y.unsigned_abs() as u32
    }

    /// Luma vector halved for the quarter-resolution chroma planes,
    /// truncating toward zero.
    pub fn for_chroma(self) -> MotionVector {
        MotionVector {
            x: self.x / 2,
            y: self.y / 2,
        }
    }
}

/// Full-pel scan pattern used before half-sample refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    /// Every full-pel offset within the radius.
    #[default]
    Exhaustive,
    /// Even full-pel offsets only, then the eight neighbors of the best.
    /// Faster, and may settle on a slightly worse vector.
    Subsampled,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Bounds each vector component, in half samples.
    pub radius: u16,
    pub kind: SearchKind,
    pub metric: MetricKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub mv: MotionVector,
    pub distortion: u32,
}

/// Both one-way searches plus the distortion of their averaged prediction.
#[derive(Debug, Clone, Copy)]
pub struct BidirResult {
    pub forward: SearchResult,
    pub backward: SearchResult,
    pub interpolated_distortion: u32,
}

#[inline]
fn fetch(plane: &[u8], w: u32, h: u32, x: i32, y: i32) -> u32 {
    let cx = x.clamp(0, w as i32 - 1) as usize;
    let cy = y.clamp(0, h as i32 - 1) as usize;
    plane[cy * w as usize + cx] as u32
}

/// Motion-compensated prediction of a `size` x `size` block whose top-left
/// corner sits at (`px`, `py`) in the plane.
pub fn predict_into(
    plane: &[u8],
    w: u32,
    h: u32,
    px: u32,
    py: u32,
    mv: MotionVector,
    size: u32,
    out: &mut [u8],
) {
    debug_assert_eq!(out.len(), (size * size) as usize);
    // arithmetic shift floors, so -3 splits into full -2 plus half +1
    let ix = (mv.x >> 1) as i32;
    let iy = (mv.y >> 1) as i32;
    let hx = (mv.x & 1) as i32;
    let hy = (mv.y & 1) as i32;
    for row in 0..size {
        let y = py as i32 + row as i32 + iy;
        for col in 0..size {
            let x = px as i32 + col as i32 + ix;
            let v = match (hx, hy) {
                (0, 0) => fetch(plane, w, h, x, y),
                (1, 0) => (fetch(plane, w, h, x, y) + fetch(plane, w, h, x + 1, y) + 1) >> 1,
                (0, 1) => (fetch(plane, w, h, x, y) + fetch(plane, w, h, x, y + 1) + 1) >> 1,
                _ => {
                    (fetch(plane, w, h, x, y)
                        + fetch(plane, w, h, x + 1, y)
                        + fetch(plane, w, h, x, y + 1)
                        + fetch(plane, w, h, x + 1, y + 1)
                        + 2)
                        >> 2
                }
            };
            out[(row * size + col) as usize] = v as u8;
        }
    }
}

/// 16x16 luma prediction from a reference frame.
pub fn predict_luma16(reference: &Frame, px: u32, py: u32, mv: MotionVector) -> [u8; 256] {
    let (plane, w, h) = reference.plane(PlaneId::Y);
    let mut out = [0u8; 256];
    predict_into(plane, w, h, px, py, mv, 16, &mut out);
    out
}

/// 8x8 prediction from any plane of a reference frame. Chroma callers pass
/// the luma vector through `MotionVector::for_chroma` first.
pub fn predict_block8(
    reference: &Frame,
    plane_id: PlaneId,
    px: u32,
    py: u32,
    mv: MotionVector,
) -> [u8; 64] {
    let (plane, w, h) = reference.plane(plane_id);
    let mut out = [0u8; 64];
    predict_into(plane, w, h, px, py, mv, 8, &mut out);
    out
}

/// Sample-wise average of two predictions, rounding half up.
pub fn average_into(a: &[u8], b: &[u8], out: &mut [u8]) {
    debug_assert!(a.len() == b.len() && a.len() == out.len());
    for ((o, &pa), &pb) in out.iter_mut().zip(a).zip(b) {
        *o = ((pa as u32 + pb as u32 + 1) >> 1) as u8;
    }
}

/// Reference pictures one frame may predict from, fixed by its type.
#[derive(Debug, Clone, Copy)]
pub enum FrameRefs<'a> {
    Intra,
    Forward(&'a Frame),
    Bidirectional {
        forward: &'a Frame,
        backward: &'a Frame,
    },
}

/// Prediction for one 8x8 sub block of a macroblock coded with `mode`.
/// Vectors are the unit's luma vectors; chroma sub blocks halve them.
/// Encoder and decoder both route through here.
pub fn predict_sub_block(
    refs: &FrameRefs,
    mode: CodingMode,
    sb: SubBlock,
    px: u32,
    py: u32,
    forward_mv: MotionVector,
    backward_mv: MotionVector,
) -> [u8; 64] {
    let fmv = if sb.is_luma() { forward_mv } else { forward_mv.for_chroma() };
    let bmv = if sb.is_luma() { backward_mv } else { backward_mv.for_chroma() };
    match (mode, refs) {
        (CodingMode::Forward, FrameRefs::Forward(r) | FrameRefs::Bidirectional { forward: r, .. }) => {
            predict_block8(r, sb.plane(), px, py, fmv)
        }
        (CodingMode::Backward, FrameRefs::Bidirectional { backward: r, .. }) => {
            predict_block8(r, sb.plane(), px, py, bmv)
        }
        (CodingMode::Interpolated, FrameRefs::Bidirectional { forward, backward }) => {
            let f = predict_block8(forward, sb.plane(), px, py, fmv);
            let b = predict_block8(backward, sb.plane(), px, py, bmv);
            let mut out = [0u8; 64];
            average_into(&f, &b, &mut out);
            out
        }
        // intra units carry no motion prediction
        _ => [128u8; 64],
    }
}

/// A candidate replaces the incumbent only on strictly lower distortion, or
/// equal distortion with a strictly shorter vector. The zero vector is
/// scored first, so it wins every full tie.
fn better(cand: SearchResult, best: SearchResult) -> bool {
    cand.distortion < best.distortion
        || (cand.distortion == best.distortion && cand.mv.manhattan() < best.mv.manhattan())
}

/// Finds the vector minimizing block distortion against the reference luma,
/// full-pel scan first, then half-sample refinement.
pub fn search(
    current: &[u8; 256],
    reference: &Frame,
    px: u32,
    py: u32,
    params: &SearchParams,
) -> SearchResult {
    let (plane, w, h) = reference.plane(PlaneId::Y);
    let full_radius = (params.radius / 2) as i32;
    let mut scratch = [0u8; 256];

    let score = |mv: MotionVector, bound: u32, scratch: &mut [u8; 256]| -> u32 {
        predict_into(plane, w, h, px, py, mv, 16, scratch);
        metric::block_distortion(params.metric, current, scratch, bound)
    };

    let mut best = SearchResult {
        mv: MotionVector::ZERO,
        distortion: score(MotionVector::ZERO, u32::MAX, &mut scratch),
    };

    for dy in -full_radius..=full_radius {
        for dx in -full_radius..=full_radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            if params.kind == SearchKind::Subsampled && (dx & 1 != 0 || dy & 1 != 0) {
                continue;
            }
            let mv = MotionVector {
                x: (dx * 2) as i16,
                y: (dy * 2) as i16,
            };
            let cand = SearchResult {
                mv,
                distortion: score(mv, best.distortion, &mut scratch),
            };
            if better(cand, best) {
                best = cand;
            }
        }
    }

    if params.kind == SearchKind::Subsampled {
        best = refine_neighbors(best, 2, params, &mut scratch, &score);
    }
    refine_neighbors(best, 1, params, &mut scratch, &score)
}

/// Scores the eight neighbors of `best` at `step` half-sample spacing.
fn refine_neighbors(
    mut best: SearchResult,
    step: i16,
    params: &SearchParams,
    scratch: &mut [u8; 256],
    score: &impl Fn(MotionVector, u32, &mut [u8; 256]) -> u32,
) -> SearchResult {
    let center = best.mv;
    for dy in [-step, 0, step] {
        for dx in [-step, 0, step] {
            if dx == 0 && dy == 0 {
                continue;
            }
            let mv = MotionVector {
                x: center.x + dx,
                y: center.y + dy,
            };
            if mv.x.unsigned_abs() > params.radius || mv.y.unsigned_abs() > params.radius {
                continue;
            }
            let cand = SearchResult {
                mv,
                distortion: score(mv, best.distortion, scratch),
            };
            if better(cand, best) {
                best = cand;
            }
        }
    }
    best
}

/// Independent forward and backward searches, then the cost of coding from
/// their average.
pub fn search_bidirectional(
    current: &[u8; 256],
    forward_ref: &Frame,
    backward_ref: &Frame,
    px: u32,
    py: u32,
    params: &SearchParams,
) -> BidirResult {
    let forward = search(current, forward_ref, px, py, params);
    let backward = search(current, backward_ref, px, py, params);

    let f = predict_luma16(forward_ref, px, py, forward.mv);
    let b = predict_luma16(backward_ref, px, py, backward.mv);
    let mut avg = [0u8; 256];
    average_into(&f, &b, &mut avg);
    let interpolated_distortion = metric::block_distortion(params.metric, current, &avg, u32::MAX);

    BidirResult {
        forward,
        backward,
        interpolated_distortion,
    }
}
