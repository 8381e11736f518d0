/// Zigzag scan for 8x8 blocks: scan position -> natural (row-major) index.
///
/// Walks the anti-diagonals from the DC corner toward the highest frequency,
/// so quantized blocks end in long zero runs.
#[rustfmt::skip]
pub const ZIGZAG: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Reorders a natural-order block into scan order.
pub fn to_zigzag(natural: &[i32; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (scan_pos, &nat) in ZIGZAG.iter().enumerate() {
        out[scan_pos] = natural[nat];
    }
    out
}

/// Reorders a scan-order block back into natural order.
pub fn from_zigzag(zig: &[i32; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (scan_pos, &nat) in ZIGZAG.iter().enumerate() {
        out[nat] = zig[scan_pos];
    }
    out
}
