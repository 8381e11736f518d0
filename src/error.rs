use thiserror::Error;

use crate::mb::CodingMode;
use crate::packet::FrameType;

/// Rejections raised when an encoder is configured or fed frames.
///
/// Configuration errors are fatal before any frame is coded; nothing about
/// them is recoverable mid stream.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("invalid dimensions {width}x{height}: width must be 16..=4096, height must be 16..=2304")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("misaligned dimensions {width}x{height}: both must be multiples of 16")]
    MisalignedDimensions { width: u32, height: u32 },

    #[error("frame dimension mismatch: expected {expected_w}x{expected_h}, got {got_w}x{got_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },

    #[error("invalid plane lengths: luma {luma} chroma {chroma_b}/{chroma_r} for {width}x{height}")]
    InvalidPlaneLengths {
        luma: usize,
        chroma_b: usize,
        chroma_r: usize,
        width: u32,
        height: u32,
    },

    #[error("invalid search radius {radius}: must be 1..=1023 half samples")]
    InvalidSearchRadius { radius: u16 },

    #[error("invalid quantizer scale {scale}: must be 1..=31")]
    InvalidQuantizerScale { scale: u8 },

    #[error("invalid reference window {window}: must be 1..=8 frames")]
    InvalidReferenceWindow { window: usize },

    #[error("{frame_type:?} frame needs {needed} reference frame(s), only {available} available")]
    MissingReference {
        frame_type: FrameType,
        needed: usize,
        available: usize,
    },
}

/// Failures while parsing a compressed frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bitstream ended inside a frame")]
    UnexpectedEnd,

    #[error("invalid variable-length code while reading {context}")]
    InvalidCode { context: &'static str },

    #[error("invalid frame header: {detail}")]
    InvalidHeader { detail: &'static str },

    #[error("frame dimension mismatch: expected {expected_w}x{expected_h}, got {got_w}x{got_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },

    #[error("{mode:?} unit not permitted in a {frame_type:?} frame")]
    IllegalMode {
        mode: CodingMode,
        frame_type: FrameType,
    },

    #[error("{frame_type:?} frame needs {needed} reference frame(s), only {available} available")]
    MissingReference {
        frame_type: FrameType,
        needed: usize,
        available: usize,
    },

    #[error("end-of-frame code after {units} of {expected} units")]
    EarlyEnd { units: usize, expected: usize },

    #[error("all units decoded but end-of-frame code missing")]
    MissingEnd,
}
