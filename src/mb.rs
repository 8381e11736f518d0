//! Macroblock structure: the 16x16 coding unit, its prediction modes, and
//! the fixed six-block coding walk.

use crate::frame::PlaneId;
use crate::packet::FrameType;

pub const MACROBLOCK_SIZE: u32 = 16;
pub const BLOCK_SIZE: u32 = 8;

/// How one macroblock predicts its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingMode {
    /// No prediction; level-shifted samples are coded directly.
    Intra,
    /// Predicted from the forward (older) reference.
    Forward,
    /// Predicted from the backward (newer) reference.
    Backward,
    /// Average of the forward and backward predictions.
    Interpolated,
}

impl CodingMode {
    pub fn is_intra(self) -> bool {
        self == CodingMode::Intra
    }

    /// Which references this mode draws on, as (forward, backward).
    pub fn uses_references(self) -> (bool, bool) {
        match self {
            CodingMode::Intra => (false, false),
            CodingMode::Forward => (true, false),
            CodingMode::Backward => (false, true),
            CodingMode::Interpolated => (true, true),
        }
    }

    pub fn permitted_in(self, frame_type: FrameType) -> bool {
        match frame_type {
            FrameType::Intra => self == CodingMode::Intra,
            FrameType::Predicted => matches!(self, CodingMode::Intra | CodingMode::Forward),
            FrameType::Bidirectional => true,
        }
    }
}

/// The six 8x8 blocks of one macroblock, in coding order: the four luma
/// quadrants, then Cb, then Cr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBlock {
    Y0,
    Y1,
    Y2,
    Y3,
    Cb,
    Cr,
}

pub const SUB_BLOCKS: [SubBlock; 6] = [
    SubBlock::Y0,
    SubBlock::Y1,
    SubBlock::Y2,
    SubBlock::Y3,
    SubBlock::Cb,
    SubBlock::Cr,
];

impl SubBlock {
    pub fn plane(self) -> PlaneId {
        match self {
            SubBlock::Y0 | SubBlock::Y1 | SubBlock::Y2 | SubBlock::Y3 => PlaneId::Y,
            SubBlock::Cb => PlaneId::Cb,
            SubBlock::Cr => PlaneId::Cr,
        }
    }

    pub fn is_luma(self) -> bool {
        self.plane() == PlaneId::Y
    }

    /// Top-left corner of this sub-block in its own plane, for the
    /// macroblock at grid position (`mbx`, `mby`).
    pub fn origin(self, mbx: u32, mby: u32) -> (u32, u32) {
        match self {
            SubBlock::Y0 => (mbx * MACROBLOCK_SIZE, mby * MACROBLOCK_SIZE),
            SubBlock::Y1 => (mbx * MACROBLOCK_SIZE + BLOCK_SIZE, mby * MACROBLOCK_SIZE),
            SubBlock::Y2 => (mbx * MACROBLOCK_SIZE, mby * MACROBLOCK_SIZE + BLOCK_SIZE),
            SubBlock::Y3 => (
                mbx * MACROBLOCK_SIZE + BLOCK_SIZE,
                mby * MACROBLOCK_SIZE + BLOCK_SIZE,
            ),
            SubBlock::Cb | SubBlock::Cr => (mbx * BLOCK_SIZE, mby * BLOCK_SIZE),
        }
    }
}

/// Macroblock grid width for a frame width that is a multiple of 16.
pub fn mb_cols(width: u32) -> u32 {
    width / MACROBLOCK_SIZE
}

pub fn mb_rows(height: u32) -> u32 {
    height / MACROBLOCK_SIZE
}
