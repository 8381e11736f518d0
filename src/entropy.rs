//! Variable-length entropy layer: frame headers, unit records, and
//! run/level coefficient coding.
//!
//! Encode and decode live side by side so the code tables can never drift
//! apart. All codes are prefix-free within their alphabet; the decoder
//! walks them bit by bit and rejects unused codewords.

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::error::DecodeError;
use crate::mb::CodingMode;
use crate::packet::FrameType;

/// Size-category codes for DC deltas and motion-vector components,
/// categories 0..=11. Entry = (code, bit length).
#[rustfmt::skip]
const CATEGORY_CODES: [(u16, u8); 12] = [
    (0b00,        2),
    (0b010,       3),
    (0b011,       3),
    (0b100,       3),
    (0b101,       3),
    (0b110,       3),
    (0b1110,      4),
    (0b11110,     5),
    (0b111110,    6),
    (0b1111110,   7),
    (0b11111110,  8),
    (0b111111110, 9),
];

/// Short codes for the most common (zero run, |level|) pairs. A sign bit
/// follows each. Everything else takes the escape.
#[rustfmt::skip]
const RUN_LEVEL_CODES: [(u8, u8, u16, u8); 11] = [
    // run, |level|, code, bits
    (0, 1, 0b11,     2),
    (1, 1, 0b011,    3),
    (0, 2, 0b0100,   4),
    (2, 1, 0b0101,   4),
    (0, 3, 0b00101,  5),
    (4, 1, 0b00110,  5),
    (3, 1, 0b00111,  5),
    (7, 1, 0b000100, 6),
    (6, 1, 0b000101, 6),
    (1, 2, 0b000110, 6),
    (5, 1, 0b000111, 6),
];

const EOB: (u16, u8) = (0b10, 2);
const ESCAPE: (u16, u8) = (0b000001, 6);
const ESCAPE_RUN_BITS: u8 = 6;
const ESCAPE_LEVEL_BITS: u8 = 9;

const MODE_INTRA: (u16, u8) = (0b11, 2);
const MODE_FORWARD: (u16, u8) = (0b10, 2);
const MODE_BACKWARD: (u16, u8) = (0b011, 3);
const MODE_INTERPOLATED: (u16, u8) = (0b010, 3);
const END_OF_FRAME: (u16, u8) = (0b001, 3);

/// Parsed fixed-width frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    pub scale: u8,
    pub width: u32,
    pub height: u32,
}

pub fn write_frame_header(w: &mut BitWriter, h: &FrameHeader) {
    debug_assert!(h.width.is_multiple_of(16) && h.height.is_multiple_of(16));
    w.write_bits(h.frame_type.code(), 2);
    w.write_bits(h.scale as u64, 5);
    w.write_bits((h.width / 16 - 1) as u64, 8);
    w.write_bits((h.height / 16 - 1) as u64, 8);
}

pub fn read_frame_header(r: &mut BitReader) -> Result<FrameHeader, DecodeError> {
    let type_code = r.read_bits(2).ok_or(DecodeError::UnexpectedEnd)?;
    let frame_type = FrameType::from_code(type_code).ok_or(DecodeError::InvalidCode {
        context: "frame type",
    })?;
    let scale = r.read_bits(5).ok_or(DecodeError::UnexpectedEnd)? as u8;
    if scale == 0 {
        return Err(DecodeError::InvalidHeader {
            detail: "quantizer scale 0",
        });
    }
    let width = (r.read_bits(8).ok_or(DecodeError::UnexpectedEnd)? as u32 + 1) * 16;
    let height = (r.read_bits(8).ok_or(DecodeError::UnexpectedEnd)? as u32 + 1) * 16;
    Ok(FrameHeader {
        frame_type,
        scale,
        width,
        height,
    })
}

/// What a unit record starts with: a prediction mode, or the frame's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSymbol {
    Mode(CodingMode),
    EndOfFrame,
}

pub fn write_mode(w: &mut BitWriter, mode: CodingMode) {
    let (code, bits) = match mode {
        CodingMode::Intra => MODE_INTRA,
        CodingMode::Forward => MODE_FORWARD,
        CodingMode::Backward => MODE_BACKWARD,
        CodingMode::Interpolated => MODE_INTERPOLATED,
    };
    w.write_bits(code as u64, bits);
}

pub fn write_end_of_frame(w: &mut BitWriter) {
    w.write_bits(END_OF_FRAME.0 as u64, END_OF_FRAME.1);
}

pub fn read_unit_symbol(r: &mut BitReader) -> Result<UnitSymbol, DecodeError> {
    if r.read_bit().ok_or(DecodeError::UnexpectedEnd)? {
        // 1x
        if r.read_bit().ok_or(DecodeError::UnexpectedEnd)? {
            Ok(UnitSymbol::Mode(CodingMode::Intra))
        } else {
            Ok(UnitSymbol::Mode(CodingMode::Forward))
        }
    } else if r.read_bit().ok_or(DecodeError::UnexpectedEnd)? {
        // 01x
        if r.read_bit().ok_or(DecodeError::UnexpectedEnd)? {
            Ok(UnitSymbol::Mode(CodingMode::Backward))
        } else {
            Ok(UnitSymbol::Mode(CodingMode::Interpolated))
        }
    } else if r.read_bit().ok_or(DecodeError::UnexpectedEnd)? {
        // 001
        Ok(UnitSymbol::EndOfFrame)
    } else {
        Err(DecodeError::InvalidCode {
            context: "unit mode",
        })
    }
}

/// One changed flag, plus the new 5-bit scale when it differs from the
/// running scale.
pub fn write_scale_update(w: &mut BitWriter, running: u8, unit: u8) {
    if unit == running {
        w.write_bit(false);
    } else {
        w.write_bit(true);
        w.write_bits(unit as u64, 5);
    }
}

pub fn read_scale_update(r: &mut BitReader, running: u8) -> Result<u8, DecodeError> {
    if !r.read_bit().ok_or(DecodeError::UnexpectedEnd)? {
        return Ok(running);
    }
    let scale = r.read_bits(5).ok_or(DecodeError::UnexpectedEnd)? as u8;
    if scale == 0 {
        return Err(DecodeError::InvalidCode {
            context: "quantizer scale update",
        });
    }
    Ok(scale)
}

/// Bits needed for |v|; 0 when v is 0.
fn category(v: i32) -> u8 {
    (32 - v.unsigned_abs().leading_zeros()) as u8
}

/// Category code, then `category` offset bits. Negative values store
/// `v + 2^cat - 1`, so the top offset bit doubles as the sign.
pub fn write_signed(w: &mut BitWriter, v: i32) {
    let cat = category(v);
    debug_assert!(cat <= 11);
    let (code, bits) = CATEGORY_CODES[cat as usize];
    w.write_bits(code as u64, bits);
    if cat > 0 {
        let offset = if v < 0 { v + (1 << cat) - 1 } else { v };
        w.write_bits(offset as u64, cat);
    }
}

pub fn read_signed(r: &mut BitReader) -> Result<i32, DecodeError> {
    let mut code = 0u16;
    let mut cat = None;
    for len in 1..=9u8 {
        code = (code << 1) | r.read_bit().ok_or(DecodeError::UnexpectedEnd)? as u16;
        if let Some(found) = CATEGORY_CODES
            .iter()
            .position(|&(c, l)| l == len && c == code)
        {
            cat = Some(found as u8);
            break;
        }
    }
    let cat = cat.ok_or(DecodeError::InvalidCode {
        context: "size category",
    })?;
    if cat == 0 {
        return Ok(0);
    }
    let x = r.read_bits(cat).ok_or(DecodeError::UnexpectedEnd)? as i32;
    if x < (1 << (cat - 1)) {
        Ok(x - (1 << cat) + 1)
    } else {
        Ok(x)
    }
}

pub fn write_motion_delta(w: &mut BitWriter, dx: i32, dy: i32) {
    write_signed(w, dx);
    write_signed(w, dy);
}

pub fn read_motion_delta(r: &mut BitReader) -> Result<(i32, i32), DecodeError> {
    let dx = read_signed(r)?;
    let dy = read_signed(r)?;
    Ok((dx, dy))
}

/// Intra block: category-coded DC delta, then the 63 AC positions as
/// run/level codes.
pub fn write_intra_block(w: &mut BitWriter, dc_delta: i32, levels: &[i32; 64]) {
    write_signed(w, dc_delta);
    write_run_levels(w, &levels[1..]);
}

/// Inter block: all 64 scan positions as run/level codes.
pub fn write_inter_block(w: &mut BitWriter, levels: &[i32; 64]) {
    write_run_levels(w, levels);
}

fn write_run_levels(w: &mut BitWriter, levels: &[i32]) {
    let mut run = 0usize;
    for &level in levels {
        if level == 0 {
            run += 1;
            continue;
        }
        write_run_level(w, run, level);
        run = 0;
    }
    w.write_bits(EOB.0 as u64, EOB.1);
}

fn write_run_level(w: &mut BitWriter, run: usize, level: i32) {
    debug_assert!(level != 0 && level.unsigned_abs() <= 255 && run <= 63);
    let mag = level.unsigned_abs();
    for &(r, l, code, bits) in &RUN_LEVEL_CODES {
        if r as usize == run && l as u32 == mag {
            w.write_bits(code as u64, bits);
            w.write_bit(level < 0);
            return;
        }
    }
    w.write_bits(ESCAPE.0 as u64, ESCAPE.1);
    w.write_bits(run as u64, ESCAPE_RUN_BITS);
    w.write_bits((level & 0x1FF) as u64, ESCAPE_LEVEL_BITS);
}

enum CoefSymbol {
    Eob,
    RunLevel { run: usize, level: i32 },
}

fn read_coef_symbol(r: &mut BitReader) -> Result<CoefSymbol, DecodeError> {
    let mut code = 0u16;
    for len in 1..=6u8 {
        code = (code << 1) | r.read_bit().ok_or(DecodeError::UnexpectedEnd)? as u16;
        if (code, len) == EOB {
            return Ok(CoefSymbol::Eob);
        }
        if (code, len) == ESCAPE {
            let run = r.read_bits(ESCAPE_RUN_BITS).ok_or(DecodeError::UnexpectedEnd)? as usize;
            let raw = r
                .read_bits(ESCAPE_LEVEL_BITS)
                .ok_or(DecodeError::UnexpectedEnd)? as i32;
            let level = if raw >= 256 { raw - 512 } else { raw };
            if level == 0 {
                return Err(DecodeError::InvalidCode {
                    context: "escape level",
                });
            }
            return Ok(CoefSymbol::RunLevel { run, level });
        }
        for &(run, mag, c, l) in &RUN_LEVEL_CODES {
            if l == len && c == code {
                let negative = r.read_bit().ok_or(DecodeError::UnexpectedEnd)?;
                let level = if negative { -(mag as i32) } else { mag as i32 };
                return Ok(CoefSymbol::RunLevel {
                    run: run as usize,
                    level,
                });
            }
        }
    }
    Err(DecodeError::InvalidCode {
        context: "coefficient",
    })
}

fn read_run_levels(r: &mut BitReader, out: &mut [i32]) -> Result<(), DecodeError> {
    let mut pos = 0usize;
    loop {
        match read_coef_symbol(r)? {
            CoefSymbol::Eob => return Ok(()),
            CoefSymbol::RunLevel { run, level } => {
                pos += run;
                if pos >= out.len() {
                    return Err(DecodeError::InvalidCode {
                        context: "coefficient run",
                    });
                }
                out[pos] = level;
                pos += 1;
            }
        }
    }
}

pub fn read_intra_block(r: &mut BitReader) -> Result<(i32, [i32; 64]), DecodeError> {
    let dc_delta = read_signed(r)?;
    let mut levels = [0i32; 64];
    read_run_levels(r, &mut levels[1..])?;
    Ok((dc_delta, levels))
}

pub fn read_inter_block(r: &mut BitReader) -> Result<[i32; 64], DecodeError> {
    let mut levels = [0i32; 64];
    read_run_levels(r, &mut levels)?;
    Ok(levels)
}
