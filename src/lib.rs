#![forbid(unsafe_code)]

//! Block-based motion-compensated video encoder.
//!
//! Frames are split into 16x16 macroblocks predicted from reconstructed
//! reference frames, residuals go through an 8x8 DCT with perceptual
//! quantization, and the result is entropy coded with fixed
//! variable-length tables. A verification decoder rebuilds frames from
//! the packets alone.

pub mod bitreader;
pub mod bitwriter;
pub mod dct;
pub mod decode;
pub mod encoder;
pub mod entropy;
pub mod error;
pub mod frame;
pub mod mb;
pub mod metric;
pub mod motion;
pub mod packet;
pub mod quant;
pub mod rc;
pub mod refs;
pub mod scan;

use log::debug;

pub use decode::{DecodedFrame, DecodedUnit, Decoder};
pub use encoder::{Encoder, EncoderConfig, EncoderStats};
pub use error::{DecodeError, EncoderError};
pub use frame::{Frame, PlaneId};
pub use mb::CodingMode;
pub use metric::MetricKind;
pub use motion::{MotionVector, SearchKind};
pub use packet::{FrameType, Packet};

pub const DEFAULT_SCALE: u8 = 8;
pub const DEFAULT_SEARCH_RADIUS: u16 = 32;
pub const DEFAULT_INTRA_BIAS: u32 = 512;
pub const DEFAULT_KEYINT: usize = 25;
pub const DEFAULT_REFERENCE_WINDOW: usize = 2;

#[derive(Clone)]
pub struct EncodeConfig {
    /// Quantizer scale used when no bitrate target is set.
    pub scale: u8,
    /// Motion search radius in half samples.
    pub search_radius: u16,
    pub search_kind: SearchKind,
    pub metric: MetricKind,
    /// Distortion handicap granted to intra coding during mode selection,
    /// in metric units over a 16x16 luma block.
    pub intra_bias: u32,
    /// Reconstructed anchors retained for prediction.
    pub reference_window: usize,
    /// Display distance between intra frames.
    pub keyint: usize,
    /// Alternate bidirectional frames between anchors.
    pub b_frames: bool,
    pub target_bitrate: Option<u64>,
    pub fps: f64,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            search_radius: DEFAULT_SEARCH_RADIUS,
            search_kind: SearchKind::Exhaustive,
            metric: MetricKind::Sad,
            intra_bias: DEFAULT_INTRA_BIAS,
            reference_window: DEFAULT_REFERENCE_WINDOW,
            keyint: DEFAULT_KEYINT,
            b_frames: false,
            target_bitrate: None,
            fps: 25.0,
        }
    }
}

/// Expands `frame_count` display-order frames into coding order.
///
/// Pairs are (display index, frame type), in the order frames must reach
/// the encoder. Every `keyint`-th display frame is intra; `keyint` below 1
/// behaves as 1. Without `b_frames` everything else is predicted. With
/// `b_frames` the display pattern alternates anchors and bidirectional
/// frames, and each anchor is coded before the bidirectional frame that
/// precedes it in display order. A trailing frame with no anchor after it
/// is demoted to predicted.
pub fn coding_order(frame_count: usize, keyint: usize, b_frames: bool) -> Vec<(usize, FrameType)> {
    let keyint = keyint.max(1);
    let mut order = Vec::with_capacity(frame_count);

    if !b_frames {
        for d in 0..frame_count {
            let ft = if d % keyint == 0 {
                FrameType::Intra
            } else {
                FrameType::Predicted
            };
            order.push((d, ft));
        }
        return order;
    }

    let mut pending = Vec::new();
    for d in 0..frame_count {
        let offset = d % keyint;
        if offset != 0 && offset % 2 == 1 {
            pending.push(d);
            continue;
        }
        let ft = if offset == 0 {
            FrameType::Intra
        } else {
            FrameType::Predicted
        };
        order.push((d, ft));
        for b in pending.drain(..) {
            order.push((b, FrameType::Bidirectional));
        }
    }
    // no later anchor exists for these, so they predict forward instead
    for d in pending {
        order.push((d, FrameType::Predicted));
    }
    order
}

/// Compresses a display-order sequence into one concatenated stream.
///
/// Frames are scheduled by [`coding_order`], encoded, and the packets
/// concatenated. Every packet is byte aligned and self delimiting, so the
/// stream decodes back frame by frame with [`Decoder::decode_frame`].
pub fn encode(frames: &[Frame], config: &EncodeConfig) -> Result<Vec<u8>, EncoderError> {
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };

    let mut enc = Encoder::new(first.width, first.height, EncoderConfig::from(config))?;
    let mut output = Vec::new();

    for (display, frame_type) in coding_order(frames.len(), config.keyint, config.b_frames) {
        enc.send_frame(&frames[display], frame_type, display as u64)?;
        while let Some(packet) = enc.receive_packet() {
            output.extend_from_slice(&packet.data);
        }
    }

    enc.flush();
    while let Some(packet) = enc.receive_packet() {
        output.extend_from_slice(&packet.data);
    }

    if let Some(stats) = enc.rate_control_stats() {
        debug!(
            "rate control: target {} kbps, avg scale {}, buffer {}%",
            stats.target_bitrate / 1000,
            stats.avg_scale,
            stats.buffer_fullness_pct
        );
    }

    Ok(output)
}

/// One-call helper with a fixed quantizer scale.
pub fn encode_with_scale(frames: &[Frame], scale: u8) -> Result<Vec<u8>, EncoderError> {
    encode(
        frames,
        &EncodeConfig {
            scale,
            ..Default::default()
        },
    )
}
