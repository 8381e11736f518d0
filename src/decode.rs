//! Verification decoder. Rebuilds frames from packets by tracking the same
//! predictor and scale state the encoder wrote against, through the same
//! prediction and reconstruction routines.

use crate::bitreader::BitReader;
use crate::dct;
use crate::entropy::{self, UnitSymbol};
use crate::error::DecodeError;
use crate::frame::Frame;
use crate::mb::{self, BLOCK_SIZE, CodingMode, SUB_BLOCKS};
use crate::motion::{self, FrameRefs, MotionVector};
use crate::packet::FrameType;
use crate::quant::{self, BlockClass};
use crate::refs::ReferenceFrameSet;

/// Everything recovered from one compressed frame.
#[derive(Debug)]
pub struct DecodedFrame {
    pub frame_type: FrameType,
    /// Scale from the frame header; individual units may override it.
    pub base_scale: u8,
    pub frame: Frame,
    /// Per-unit coding decisions in raster order.
    pub units: Vec<DecodedUnit>,
}

/// One macroblock's decoded decisions. Vectors a mode does not carry stay
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedUnit {
    pub mode: CodingMode,
    pub forward_mv: MotionVector,
    pub backward_mv: MotionVector,
    pub scale: u8,
}

/// Applies a coded differential to a predictor. Components clamp to the
/// i16 vector domain.
fn offset_vector(pred: MotionVector, dx: i32, dy: i32) -> MotionVector {
    MotionVector {
        x: (pred.x as i32 + dx).clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        y: (pred.y as i32 + dy).clamp(i16::MIN as i32, i16::MAX as i32) as i16,
    }
}

#[derive(Debug)]
pub struct Decoder {
    references: ReferenceFrameSet,
    dimensions: Option<(u32, u32)>,
    frames_decoded: u64,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            // two anchors cover every prediction pattern the format allows
            references: ReferenceFrameSet::new(2),
            dimensions: None,
            frames_decoded: 0,
        }
    }

    /// Decodes one frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes consumed, so callers can
    /// walk a concatenated stream packet by packet.
    pub fn decode_frame(&mut self, data: &[u8]) -> Result<(DecodedFrame, usize), DecodeError> {
        let mut r = BitReader::new(data);
        let header = entropy::read_frame_header(&mut r)?;

        if let Some((w, h)) = self.dimensions {
            if header.width != w || header.height != h {
                return Err(DecodeError::DimensionMismatch {
                    expected_w: w,
                    expected_h: h,
                    got_w: header.width,
                    got_h: header.height,
                });
            }
        }

        let refs = match header.frame_type {
            FrameType::Intra => FrameRefs::Intra,
            FrameType::Predicted => {
                let anchor = self
                    .references
                    .latest()
                    .ok_or(DecodeError::MissingReference {
                        frame_type: header.frame_type,
                        needed: 1,
                        available: 0,
                    })?;
                FrameRefs::Forward(&anchor.frame)
            }
            FrameType::Bidirectional => {
                let available = self.references.len();
                let (older, newer) =
                    self.references
                        .two_latest()
                        .ok_or(DecodeError::MissingReference {
                            frame_type: header.frame_type,
                            needed: 2,
                            available,
                        })?;
                FrameRefs::Bidirectional {
                    forward: &older.frame,
                    backward: &newer.frame,
                }
            }
        };

        let cols = mb::mb_cols(header.width);
        let total = (cols * mb::mb_rows(header.height)) as usize;

        let mut frame = Frame::solid(header.width, header.height, 128, 128, 128);
        let mut units: Vec<DecodedUnit> = Vec::with_capacity(total);

        let mut dc_pred = [0i32; 3];
        let mut forward_pred = MotionVector::ZERO;
        let mut backward_pred = MotionVector::ZERO;
        let mut running_scale = header.scale;

        loop {
            let mode = match entropy::read_unit_symbol(&mut r)? {
                UnitSymbol::EndOfFrame => {
                    if units.len() != total {
                        return Err(DecodeError::EarlyEnd {
                            units: units.len(),
                            expected: total,
                        });
                    }
                    break;
                }
                UnitSymbol::Mode(mode) => mode,
            };
            if units.len() == total {
                return Err(DecodeError::MissingEnd);
            }
            if !mode.permitted_in(header.frame_type) {
                return Err(DecodeError::IllegalMode {
                    mode,
                    frame_type: header.frame_type,
                });
            }

            let mbx = units.len() as u32 % cols;
            let mby = units.len() as u32 / cols;
            if mbx == 0 {
                forward_pred = MotionVector::ZERO;
                backward_pred = MotionVector::ZERO;
            }

            let scale = entropy::read_scale_update(&mut r, running_scale)?;
            running_scale = scale;

            let (uses_forward, uses_backward) = mode.uses_references();
            let mut forward_mv = MotionVector::ZERO;
            let mut backward_mv = MotionVector::ZERO;
            if uses_forward {
                let (dx, dy) = entropy::read_motion_delta(&mut r)?;
                forward_mv = offset_vector(forward_pred, dx, dy);
            }
            if uses_backward {
                let (dx, dy) = entropy::read_motion_delta(&mut r)?;
                backward_mv = offset_vector(backward_pred, dx, dy);
            }
            forward_pred = if uses_forward {
                forward_mv
            } else {
                MotionVector::ZERO
            };
            backward_pred = if uses_backward {
                backward_mv
            } else {
                MotionVector::ZERO
            };

            let class = if mode.is_intra() {
                BlockClass::Intra
            } else {
                BlockClass::Inter
            };
            for sb in SUB_BLOCKS {
                let (x, y) = sb.origin(mbx, mby);
                let rec = if mode.is_intra() {
                    let (dc_delta, mut levels) = entropy::read_intra_block(&mut r)?;
                    let plane = sb.plane().index();
                    let dc = dc_pred[plane] + dc_delta;
                    levels[0] = dc;
                    dc_pred[plane] = dc;
                    dct::reconstruct_intra(&quant::dequantize(&levels, class, scale))
                } else {
                    let levels = entropy::read_inter_block(&mut r)?;
                    let pred =
                        motion::predict_sub_block(&refs, mode, sb, x, y, forward_mv, backward_mv);
                    dct::reconstruct_inter(&quant::dequantize(&levels, class, scale), &pred)
                };
                frame.store_block(sb.plane(), x, y, BLOCK_SIZE, &rec);
            }
            if !mode.is_intra() {
                dc_pred = [0; 3];
            }

            units.push(DecodedUnit {
                mode,
                forward_mv,
                backward_mv,
                scale,
            });
        }

        r.byte_align();
        let consumed = r.bytes_consumed();

        self.dimensions = Some((header.width, header.height));
        if header.frame_type.is_anchor() {
            self.references.insert(self.frames_decoded, frame.clone());
        }
        self.frames_decoded += 1;

        Ok((
            DecodedFrame {
                frame_type: header.frame_type,
                base_scale: header.scale,
                frame,
                units,
            },
            consumed,
        ))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
