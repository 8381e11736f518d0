/// Picture coding type, also the 2-bit code carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Coded without reference to any other frame.
    Intra,
    /// Predicted forward from the most recent intra or predicted frame.
    Predicted,
    /// Predicted from one past and one future anchor; never used as a
    /// reference itself.
    Bidirectional,
}

impl FrameType {
    pub(crate) fn code(self) -> u64 {
        match self {
            FrameType::Intra => 0b00,
            FrameType::Predicted => 0b01,
            FrameType::Bidirectional => 0b10,
        }
    }

    pub(crate) fn from_code(code: u64) -> Option<Self> {
        match code {
            0b00 => Some(FrameType::Intra),
            0b01 => Some(FrameType::Predicted),
            0b10 => Some(FrameType::Bidirectional),
            _ => None,
        }
    }

    /// Whether a reconstruction of this frame may serve as a prediction
    /// reference for later frames.
    pub fn is_anchor(self) -> bool {
        !matches!(self, FrameType::Bidirectional)
    }
}

/// One compressed frame.
///
/// `frame_number` counts in coding order; `display_number` is the position in
/// the original sequence. The two differ only when bidirectional frames
/// reorder the stream.
#[derive(Debug)]
pub struct Packet {
    pub data: Vec<u8>,
    pub frame_type: FrameType,
    pub frame_number: u64,
    pub display_number: u64,
}
