//! Frame orchestration: mode selection in parallel, then a serial raster
//! pass that writes the bitstream and assembles the reconstruction future
//! frames predict from.

use log::{debug, warn};
use rayon::prelude::*;

use crate::bitwriter::BitWriter;
use crate::dct;
use crate::entropy::{self, FrameHeader};
use crate::error::EncoderError;
use crate::frame::{Frame, PlaneId};
use crate::mb::{self, BLOCK_SIZE, CodingMode, MACROBLOCK_SIZE, SUB_BLOCKS};
use crate::metric::{self, MetricKind};
use crate::motion::{self, FrameRefs, MotionVector, SearchKind, SearchParams};
use crate::packet::{FrameType, Packet};
use crate::quant::{self, BlockClass, QuantizedBlock};
use crate::rc::RateControl;
use crate::refs::ReferenceFrameSet;
use crate::EncodeConfig;

#[derive(Debug)]
pub struct EncoderConfig {
    /// Base quantizer scale when no bitrate target is set.
    pub scale: u8,
    /// Motion search radius in half samples.
    pub search_radius: u16,
    pub search_kind: SearchKind,
    pub metric: MetricKind,
    /// Distortion handicap granted to intra coding during mode selection.
    pub intra_bias: u32,
    /// How many reconstructed anchors are retained for prediction.
    pub reference_window: usize,
    pub keyint: usize,
    pub target_bitrate: Option<u64>,
    pub fps: f64,
}

impl From<&EncodeConfig> for EncoderConfig {
    fn from(c: &EncodeConfig) -> Self {
        Self {
            scale: c.scale,
            search_radius: c.search_radius,
            search_kind: c.search_kind,
            metric: c.metric,
            intra_bias: c.intra_bias,
            reference_window: c.reference_window,
            keyint: c.keyint,
            target_bitrate: c.target_bitrate,
            fps: c.fps,
        }
    }
}

/// Running totals over everything an encoder instance has produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub frames: u64,
    pub bits: u64,
    pub intra_units: u64,
    pub forward_units: u64,
    pub backward_units: u64,
    pub interpolated_units: u64,
    /// Macroblocks coded above their frame's base scale to keep levels in
    /// range.
    pub scale_escalations: u64,
    /// Blocks whose levels were clamped because even scale 31 overflowed.
    pub range_exhaustions: u64,
}

/// Outcome of mode selection for one macroblock. Produced in parallel,
/// consumed serially in raster order.
#[derive(Debug, Clone, Copy)]
struct ModeDecision {
    mode: CodingMode,
    forward_mv: MotionVector,
    backward_mv: MotionVector,
}

impl ModeDecision {
    const INTRA: ModeDecision = ModeDecision {
        mode: CodingMode::Intra,
        forward_mv: MotionVector::ZERO,
        backward_mv: MotionVector::ZERO,
    };
}

/// Predictor and scale state threaded through the serial coding pass.
/// Everything here is order-dependent: the decoder tracks the same state
/// from the record stream alone.
struct FrameContext {
    /// Quantized DC level predictor per plane. Zero predicts mid gray.
    dc_pred: [i32; 3],
    forward_pred: MotionVector,
    backward_pred: MotionVector,
    running_scale: u8,
    scale_escalations: u64,
    range_exhaustions: u64,
}

impl FrameContext {
    fn new(base_scale: u8) -> Self {
        Self {
            dc_pred: [0; 3],
            forward_pred: MotionVector::ZERO,
            backward_pred: MotionVector::ZERO,
            running_scale: base_scale,
            scale_escalations: 0,
            range_exhaustions: 0,
        }
    }

    fn start_row(&mut self) {
        self.forward_pred = MotionVector::ZERO;
        self.backward_pred = MotionVector::ZERO;
    }
}

/// Serial pass over one frame: consumes mode decisions in raster order,
/// writes the unit records, and assembles the reconstruction.
struct FrameCoder<'a> {
    writer: BitWriter,
    ctx: FrameContext,
    recon: Frame,
    source: &'a Frame,
    refs: FrameRefs<'a>,
    base_scale: u8,
}

impl<'a> FrameCoder<'a> {
    fn new(source: &'a Frame, refs: FrameRefs<'a>, header: FrameHeader) -> Self {
        let mut writer = BitWriter::new();
        entropy::write_frame_header(&mut writer, &header);
        Self {
            writer,
            ctx: FrameContext::new(header.scale),
            recon: Frame::solid(header.width, header.height, 128, 128, 128),
            source,
            refs,
            base_scale: header.scale,
        }
    }

    fn encode_unit(&mut self, decision: &ModeDecision, mbx: u32, mby: u32) {
        if mbx == 0 {
            self.ctx.start_row();
        }

        let intra = decision.mode.is_intra();
        let class = if intra {
            BlockClass::Intra
        } else {
            BlockClass::Inter
        };

        let mut predictions = [[0u8; 64]; 6];
        let mut coefs = [[0.0f32; 64]; 6];
        for (slot, sb) in SUB_BLOCKS.iter().enumerate() {
            let (x, y) = sb.origin(mbx, mby);
            let mut current = [0u8; 64];
            self.source
                .copy_block(sb.plane(), x, y, BLOCK_SIZE, &mut current);
            coefs[slot] = if intra {
                dct::forward_intra(&current)
            } else {
                predictions[slot] = motion::predict_sub_block(
                    &self.refs,
                    decision.mode,
                    *sb,
                    x,
                    y,
                    decision.forward_mv,
                    decision.backward_mv,
                );
                dct::forward_inter(&current, &predictions[slot])
            };
        }

        // One scale for the whole unit: walk it up until every block fits,
        // then quantize all six at the settled scale.
        let mut unit_scale = self.base_scale;
        for c in &coefs {
            unit_scale = quant::quantize_with_escalation(c, class, unit_scale).scale;
        }
        let blocks: [QuantizedBlock; 6] = std::array::from_fn(|slot| {
            quant::quantize_with_escalation(&coefs[slot], class, unit_scale)
        });

        if unit_scale > self.base_scale {
            self.ctx.scale_escalations += 1;
        }
        for b in &blocks {
            if b.saturated {
                self.ctx.range_exhaustions += 1;
                warn!("macroblock ({mbx}, {mby}): level clamped at maximum quantizer scale");
            }
        }

        entropy::write_mode(&mut self.writer, decision.mode);
        entropy::write_scale_update(&mut self.writer, self.ctx.running_scale, unit_scale);
        self.ctx.running_scale = unit_scale;

        let (uses_forward, uses_backward) = decision.mode.uses_references();
        if uses_forward {
            entropy::write_motion_delta(
                &mut self.writer,
                decision.forward_mv.x as i32 - self.ctx.forward_pred.x as i32,
                decision.forward_mv.y as i32 - self.ctx.forward_pred.y as i32,
            );
        }
        if uses_backward {
            entropy::write_motion_delta(
                &mut self.writer,
                decision.backward_mv.x as i32 - self.ctx.backward_pred.x as i32,
                decision.backward_mv.y as i32 - self.ctx.backward_pred.y as i32,
            );
        }
        self.ctx.forward_pred = if uses_forward {
            decision.forward_mv
        } else {
            MotionVector::ZERO
        };
        self.ctx.backward_pred = if uses_backward {
            decision.backward_mv
        } else {
            MotionVector::ZERO
        };

        for (slot, sb) in SUB_BLOCKS.iter().enumerate() {
            let q = &blocks[slot];
            let (x, y) = sb.origin(mbx, mby);
            let rec = if intra {
                let plane = sb.plane().index();
                let dc = q.levels[0];
                entropy::write_intra_block(&mut self.writer, dc - self.ctx.dc_pred[plane], &q.levels);
                self.ctx.dc_pred[plane] = dc;
                dct::reconstruct_intra(&quant::dequantize(&q.levels, class, unit_scale))
            } else {
                entropy::write_inter_block(&mut self.writer, &q.levels);
                dct::reconstruct_inter(
                    &quant::dequantize(&q.levels, class, unit_scale),
                    &predictions[slot],
                )
            };
            self.recon.store_block(sb.plane(), x, y, BLOCK_SIZE, &rec);
        }

        if !intra {
            self.ctx.dc_pred = [0; 3];
        }
    }

    fn finish(mut self) -> (Vec<u8>, Frame, FrameContext) {
        entropy::write_end_of_frame(&mut self.writer);
        (self.writer.finalize(), self.recon, self.ctx)
    }
}

#[derive(Debug)]
pub struct Encoder {
    config: EncoderConfig,
    width: u32,
    height: u32,
    frame_index: u64,
    rate_ctrl: Option<RateControl>,
    references: ReferenceFrameSet,
    pending_packet: Option<Packet>,
    stats: EncoderStats,
    reconstruction: Option<Frame>,
}

impl Encoder {
    pub fn new(width: u32, height: u32, config: EncoderConfig) -> Result<Self, EncoderError> {
        if !(16..=4096).contains(&width) || !(16..=2304).contains(&height) {
            return Err(EncoderError::InvalidDimensions { width, height });
        }
        if !width.is_multiple_of(MACROBLOCK_SIZE) || !height.is_multiple_of(MACROBLOCK_SIZE) {
            return Err(EncoderError::MisalignedDimensions { width, height });
        }
        if !(1..=1023).contains(&config.search_radius) {
            return Err(EncoderError::InvalidSearchRadius {
                radius: config.search_radius,
            });
        }
        if !(quant::MIN_SCALE..=quant::MAX_SCALE).contains(&config.scale) {
            return Err(EncoderError::InvalidQuantizerScale {
                scale: config.scale,
            });
        }
        if !(1..=8).contains(&config.reference_window) {
            return Err(EncoderError::InvalidReferenceWindow {
                window: config.reference_window,
            });
        }

        let rate_ctrl = config
            .target_bitrate
            .map(|bitrate| RateControl::new(bitrate, config.fps, width, height, config.keyint));
        let references = ReferenceFrameSet::new(config.reference_window);

        Ok(Self {
            config,
            width,
            height,
            frame_index: 0,
            rate_ctrl,
            references,
            pending_packet: None,
            stats: EncoderStats::default(),
            reconstruction: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Compresses one frame into a pending packet.
    ///
    /// Frames arrive in coding order; `display_number` records where the
    /// frame sits in the original sequence. A predicted frame needs one
    /// anchor reconstruction, a bidirectional frame the two most recent.
    pub fn send_frame(
        &mut self,
        frame: &Frame,
        frame_type: FrameType,
        display_number: u64,
    ) -> Result<(), EncoderError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(EncoderError::DimensionMismatch {
                expected_w: self.width,
                expected_h: self.height,
                got_w: frame.width,
                got_h: frame.height,
            });
        }

        let base_scale = match &mut self.rate_ctrl {
            Some(rc) => rc.compute_scale(frame_type == FrameType::Intra),
            None => self.config.scale,
        };

        let refs = match frame_type {
            FrameType::Intra => FrameRefs::Intra,
            FrameType::Predicted => {
                let anchor =
                    self.references
                        .latest()
                        .ok_or(EncoderError::MissingReference {
                            frame_type,
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
                        .ok_or(EncoderError::MissingReference {
                            frame_type,
                            needed: 2,
                            available,
                        })?;
                FrameRefs::Bidirectional {
                    forward: &older.frame,
                    backward: &newer.frame,
                }
            }
        };

        let cols = mb::mb_cols(self.width);
        let rows = mb::mb_rows(self.height);
        let units = (cols * rows) as usize;

        let decisions: Vec<ModeDecision> = (0..units)
            .into_par_iter()
            .map(|i| self.select_mode(frame, &refs, i as u32 % cols, i as u32 / cols))
            .collect();

        let header = FrameHeader {
            frame_type,
            scale: base_scale,
            width: self.width,
            height: self.height,
        };
        let mut coder = FrameCoder::new(frame, refs, header);
        let mut mode_counts = [0u64; 4];
        for (i, decision) in decisions.iter().enumerate() {
            coder.encode_unit(decision, i as u32 % cols, i as u32 / cols);
            mode_counts[match decision.mode {
                CodingMode::Intra => 0,
                CodingMode::Forward => 1,
                CodingMode::Backward => 2,
                CodingMode::Interpolated => 3,
            }] += 1;
        }
        let (data, recon, ctx) = coder.finish();

        let bits = (data.len() * 8) as u64;
        if let Some(rc) = &mut self.rate_ctrl {
            rc.update(bits, base_scale);
        }

        debug!(
            "frame {} ({:?}): scale {}, {} bytes, units i/f/b/a {}/{}/{}/{}",
            self.frame_index,
            frame_type,
            base_scale,
            data.len(),
            mode_counts[0],
            mode_counts[1],
            mode_counts[2],
            mode_counts[3],
        );

        self.stats.frames += 1;
        self.stats.bits += bits;
        self.stats.intra_units += mode_counts[0];
        self.stats.forward_units += mode_counts[1];
        self.stats.backward_units += mode_counts[2];
        self.stats.interpolated_units += mode_counts[3];
        self.stats.scale_escalations += ctx.scale_escalations;
        self.stats.range_exhaustions += ctx.range_exhaustions;

        if frame_type.is_anchor() {
            self.references.insert(self.frame_index, recon.clone());
        }
        self.reconstruction = Some(recon);

        self.pending_packet = Some(Packet {
            data,
            frame_type,
            frame_number: self.frame_index,
            display_number,
        });

        self.frame_index += 1;

        Ok(())
    }

    /// Chooses how one macroblock is coded. Reads only the shared source
    /// and reference frames, so every unit can be decided in parallel.
    fn select_mode(&self, source: &Frame, refs: &FrameRefs, mbx: u32, mby: u32) -> ModeDecision {
        let x = mbx * MACROBLOCK_SIZE;
        let y = mby * MACROBLOCK_SIZE;
        let mut current = [0u8; 256];
        source.copy_block(PlaneId::Y, x, y, MACROBLOCK_SIZE, &mut current);

        let params = SearchParams {
            radius: self.config.search_radius,
            kind: self.config.search_kind,
            metric: self.config.metric,
        };

        let (mode, forward_mv, backward_mv, distortion) = match *refs {
            FrameRefs::Intra => return ModeDecision::INTRA,
            FrameRefs::Forward(reference) => {
                let r = motion::search(&current, reference, x, y, &params);
                (CodingMode::Forward, r.mv, MotionVector::ZERO, r.distortion)
            }
            FrameRefs::Bidirectional { forward, backward } => {
                let b = motion::search_bidirectional(&current, forward, backward, x, y, &params);
                // ties keep the earlier mode: forward, then backward
                let mut mode = CodingMode::Forward;
                let mut best = b.forward.distortion;
                if b.backward.distortion < best {
                    mode = CodingMode::Backward;
                    best = b.backward.distortion;
                }
                if b.interpolated_distortion < best {
                    mode = CodingMode::Interpolated;
                    best = b.interpolated_distortion;
                }
                (mode, b.forward.mv, b.backward.mv, best)
            }
        };

        // equal costs select intra
        let intra_cost = metric::block_deviation(self.config.metric, &current);
        if intra_cost <= distortion.saturating_add(self.config.intra_bias) {
            return ModeDecision::INTRA;
        }

        ModeDecision {
            mode,
            forward_mv,
            backward_mv,
        }
    }

    pub fn receive_packet(&mut self) -> Option<Packet> {
        self.pending_packet.take()
    }

    pub fn flush(&mut self) {}

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    /// Reconstruction of the most recently sent frame, exactly as a decoder
    /// would produce it.
    pub fn reconstruction(&self) -> Option<&Frame> {
        self.reconstruction.as_ref()
    }

    pub fn rate_control_stats(&self) -> Option<crate::rc::RateControlStats> {
        self.rate_ctrl.as_ref().map(|rc| rc.stats())
    }
}
