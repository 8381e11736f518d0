use mvenc::bitwriter::BitWriter;
use mvenc::entropy::{self, FrameHeader};
use mvenc::{
    CodingMode, Decoder, EncodeConfig, Encoder, EncoderConfig, Frame, FrameType, MotionVector,
    coding_order, encode, encode_with_scale,
};

fn noise_frame(width: u32, height: u32, seed: u32) -> Frame {
    let mut f = Frame::solid(width, height, 0, 128, 128);
    let mut state = seed;
    for p in f.y.iter_mut() {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        *p = (state >> 16) as u8;
    }
    f
}

fn gradient_frame(width: u32, height: u32, phase: usize) -> Frame {
    let w = width as usize;
    let h = height as usize;
    let cw = width.div_ceil(2) as usize;
    let ch = height.div_ceil(2) as usize;

    let mut y = vec![0u8; w * h];
    for row in 0..h {
        for col in 0..w {
            y[row * w + col] = ((col * 2 + row * 3 + phase * 8) % 256) as u8;
        }
    }
    let mut u = vec![0u8; cw * ch];
    let mut v = vec![0u8; cw * ch];
    for row in 0..ch {
        for col in 0..cw {
            u[row * cw + col] = ((col * 4 + phase * 4) % 256) as u8;
            v[row * cw + col] = ((row * 4 + 128 + phase * 2) % 256) as u8;
        }
    }
    Frame::from_planes(y, u, v, width, height).unwrap()
}

/// Walks a concatenated stream packet by packet, checking that the byte
/// offsets line up exactly.
fn decode_stream(data: &[u8]) -> Vec<mvenc::DecodedFrame> {
    let mut dec = Decoder::new();
    let mut frames = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let (frame, used) = dec.decode_frame(&data[offset..]).unwrap();
        frames.push(frame);
        offset += used;
    }
    assert_eq!(offset, data.len());
    frames
}

#[test]
fn solid_intra_frame_has_the_expected_layout() {
    // 32x32 solid (200, 90, 160): every block is DC only, so the stream is
    // fully determined by the DC predictor chain. Unit 0 carries the three
    // plane levels, everything after rides the predictors.
    let frames = [Frame::solid(32, 32, 200, 90, 160)];
    let data = encode_with_scale(&frames, 8).unwrap();

    let mut w = BitWriter::new();
    entropy::write_frame_header(
        &mut w,
        &FrameHeader {
            frame_type: FrameType::Intra,
            scale: 8,
            width: 32,
            height: 32,
        },
    );
    let zero = [0i32; 64];
    for unit in 0..4 {
        entropy::write_mode(&mut w, CodingMode::Intra);
        entropy::write_scale_update(&mut w, 8, 8);
        let deltas: [i32; 6] = if unit == 0 {
            // (200 - 128) * 8 / 8, (90 - 128) * 8 / 8, (160 - 128) * 8 / 8
            [72, 0, 0, 0, -38, 32]
        } else {
            [0; 6]
        };
        for delta in deltas {
            entropy::write_intra_block(&mut w, delta, &zero);
        }
    }
    entropy::write_end_of_frame(&mut w);

    assert_eq!(data, w.finalize());
}

#[test]
fn black_intra_frame_codes_compactly_and_exactly() {
    // All-zero planes leave only DC deltas and end-of-block codes, and the
    // DC-only reconstruction lands back on zero without rounding error.
    let frame = Frame::solid(32, 32, 0, 0, 0);
    let data = encode_with_scale(&[frame.clone()], 8).unwrap();
    assert!(data.len() < 40, "{} bytes for a black frame", data.len());

    let decoded = decode_stream(&data);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].units.len(), 4);
    for unit in &decoded[0].units {
        assert_eq!(unit.mode, CodingMode::Intra);
    }
    assert_eq!(decoded[0].frame, frame);
}

#[test]
fn identical_noise_frames_predict_with_zero_vectors() {
    let frame = noise_frame(64, 64, 0xFACE);
    let mut enc = Encoder::new(64, 64, EncoderConfig::from(&EncodeConfig::default())).unwrap();

    enc.send_frame(&frame, FrameType::Intra, 0).unwrap();
    let intra = enc.receive_packet().unwrap();
    enc.send_frame(&frame, FrameType::Predicted, 1).unwrap();
    let predicted = enc.receive_packet().unwrap();
    let recon = enc.reconstruction().unwrap().clone();

    let mut dec = Decoder::new();
    dec.decode_frame(&intra.data).unwrap();
    let (decoded, used) = dec.decode_frame(&predicted.data).unwrap();

    assert_eq!(used, predicted.data.len());
    assert_eq!(decoded.units.len(), 16);
    for unit in &decoded.units {
        assert_eq!(unit.mode, CodingMode::Forward);
        assert_eq!(unit.forward_mv, MotionVector::ZERO);
        assert_eq!(unit.backward_mv, MotionVector::ZERO);
    }
    assert_eq!(decoded.frame, recon);
}

#[test]
fn uniform_translation_is_recovered_by_the_search() {
    // Two 64x64 windows into the same noise field, offset by two columns
    // and one row. Every interior macroblock of the second frame matches
    // the first at full-sample displacement (-2, -1).
    let mut base = vec![0u8; 80 * 80];
    let mut state = 0x7EA5u32;
    for p in base.iter_mut() {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        *p = (state >> 16) as u8;
    }
    let window = |ox: usize, oy: usize| -> Frame {
        let mut y = Vec::with_capacity(64 * 64);
        for row in 0..64 {
            let start = (oy + row) * 80 + ox;
            y.extend_from_slice(&base[start..start + 64]);
        }
        Frame::from_planes(y, vec![128; 32 * 32], vec![128; 32 * 32], 64, 64).unwrap()
    };
    let first = window(2, 1);
    let second = window(0, 0);

    let mut enc = Encoder::new(64, 64, EncoderConfig::from(&EncodeConfig::default())).unwrap();
    enc.send_frame(&first, FrameType::Intra, 0).unwrap();
    let intra = enc.receive_packet().unwrap();
    enc.send_frame(&second, FrameType::Predicted, 1).unwrap();
    let predicted = enc.receive_packet().unwrap();

    let mut dec = Decoder::new();
    dec.decode_frame(&intra.data).unwrap();
    let (decoded, _) = dec.decode_frame(&predicted.data).unwrap();

    // edge macroblocks reference content outside the first window; only
    // the interior is an exact translation
    for mby in 1..4u32 {
        for mbx in 1..4u32 {
            let unit = decoded.units[(mby * 4 + mbx) as usize];
            assert_eq!(unit.mode, CodingMode::Forward, "unit ({mbx}, {mby})");
            assert_eq!(
                unit.forward_mv,
                MotionVector { x: -4, y: -2 },
                "unit ({mbx}, {mby})"
            );
        }
    }
    assert_eq!(decoded.frame, *enc.reconstruction().unwrap());
}

#[test]
fn interpolated_prediction_averages_the_anchors() {
    let mut enc = Encoder::new(64, 64, EncoderConfig::from(&EncodeConfig::default())).unwrap();

    enc.send_frame(&noise_frame(64, 64, 1), FrameType::Intra, 0)
        .unwrap();
    let p0 = enc.receive_packet().unwrap();
    let first = enc.reconstruction().unwrap().clone();

    enc.send_frame(&noise_frame(64, 64, 2), FrameType::Predicted, 2)
        .unwrap();
    let p1 = enc.receive_packet().unwrap();
    let second = enc.reconstruction().unwrap().clone();

    // exactly halfway between the two reconstructed anchors
    let avg = |a: &[u8], b: &[u8]| -> Vec<u8> {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| ((x as u16 + y as u16 + 1) >> 1) as u8)
            .collect()
    };
    let between = Frame::from_planes(
        avg(&first.y, &second.y),
        avg(&first.u, &second.u),
        avg(&first.v, &second.v),
        64,
        64,
    )
    .unwrap();

    enc.send_frame(&between, FrameType::Bidirectional, 1)
        .unwrap();
    let p2 = enc.receive_packet().unwrap();

    let mut dec = Decoder::new();
    dec.decode_frame(&p0.data).unwrap();
    dec.decode_frame(&p1.data).unwrap();
    let (decoded, _) = dec.decode_frame(&p2.data).unwrap();

    for unit in &decoded.units {
        assert_eq!(unit.mode, CodingMode::Interpolated);
        assert_eq!(unit.forward_mv, MotionVector::ZERO);
        assert_eq!(unit.backward_mv, MotionVector::ZERO);
    }
    // the interpolated prediction already equals the source, so the frame
    // survives coding exactly
    assert_eq!(decoded.frame, between);
}

#[test]
fn decoder_tracks_the_encoder_reconstruction_across_a_gop() {
    let frames: Vec<Frame> = (0..6).map(|i| gradient_frame(48, 48, i)).collect();
    let schedule = coding_order(frames.len(), 4, true);

    let cfg = EncodeConfig {
        keyint: 4,
        b_frames: true,
        ..Default::default()
    };
    let mut enc = Encoder::new(48, 48, EncoderConfig::from(&cfg)).unwrap();

    let mut packets = Vec::new();
    let mut recons = Vec::new();
    for &(display, frame_type) in &schedule {
        enc.send_frame(&frames[display], frame_type, display as u64)
            .unwrap();
        packets.push(enc.receive_packet().unwrap());
        recons.push(enc.reconstruction().unwrap().clone());
    }

    let mut dec = Decoder::new();
    for (i, packet) in packets.iter().enumerate() {
        let (decoded, used) = dec.decode_frame(&packet.data).unwrap();
        assert_eq!(used, packet.data.len());
        assert_eq!(decoded.frame_type, packet.frame_type);
        assert_eq!(decoded.frame, recons[i], "decoder drift at coded frame {i}");
    }
}

#[test]
fn packets_are_self_delimiting() {
    let frames: Vec<Frame> = (0..5).map(|i| gradient_frame(32, 32, i * 3)).collect();
    let cfg = EncodeConfig {
        keyint: 2,
        ..Default::default()
    };
    let data = encode(&frames, &cfg).unwrap();

    let decoded = decode_stream(&data);
    let types: Vec<FrameType> = decoded.iter().map(|f| f.frame_type).collect();
    assert_eq!(
        types,
        vec![
            FrameType::Intra,
            FrameType::Predicted,
            FrameType::Intra,
            FrameType::Predicted,
            FrameType::Intra,
        ]
    );
    assert!(decoded.iter().all(|f| f.frame.width == 32));
}

#[test]
fn coarser_scales_shrink_packets_and_grow_error() {
    let frame = noise_frame(32, 32, 0xD1CE);
    let fine = encode_with_scale(std::slice::from_ref(&frame), 1).unwrap();
    let coarse = encode_with_scale(std::slice::from_ref(&frame), 31).unwrap();

    assert!(fine.len() > coarse.len());

    let luma_error = |data: &[u8]| -> u64 {
        let decoded = decode_stream(data);
        decoded[0]
            .frame
            .y
            .iter()
            .zip(&frame.y)
            .map(|(&a, &b)| (a as i64 - b as i64).unsigned_abs())
            .sum()
    };
    assert!(luma_error(&coarse) > luma_error(&fine));
}

#[test]
fn escalated_unit_scales_reach_the_decoder() {
    // half black, half white luma rows overflow the level range at scale 1
    let mut frame = Frame::solid(32, 32, 0, 128, 128);
    for row in 0..32usize {
        if row % 8 >= 4 {
            for p in &mut frame.y[row * 32..(row + 1) * 32] {
                *p = 255;
            }
        }
    }

    let cfg = EncodeConfig {
        scale: 1,
        ..Default::default()
    };
    let mut enc = Encoder::new(32, 32, EncoderConfig::from(&cfg)).unwrap();
    enc.send_frame(&frame, FrameType::Intra, 0).unwrap();
    let packet = enc.receive_packet().unwrap();

    assert_eq!(enc.stats().scale_escalations, 4);
    assert_eq!(enc.stats().range_exhaustions, 0);

    let mut dec = Decoder::new();
    let (decoded, _) = dec.decode_frame(&packet.data).unwrap();
    assert_eq!(decoded.base_scale, 1);
    assert!(decoded.units.iter().all(|u| u.scale > 1));
    assert_eq!(decoded.frame, *enc.reconstruction().unwrap());
}

#[test]
fn rate_control_tracks_the_bitrate_target() {
    let frames: Vec<Frame> = (0..10u32).map(|i| noise_frame(64, 64, 0x5EED + i)).collect();

    let starved = encode(
        &frames,
        &EncodeConfig {
            target_bitrate: Some(150_000),
            keyint: 5,
            ..Default::default()
        },
    )
    .unwrap();
    let generous = encode(
        &frames,
        &EncodeConfig {
            target_bitrate: Some(20_000_000),
            keyint: 5,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(starved.len() < generous.len());
    assert_eq!(decode_stream(&starved).len(), 10);
    assert_eq!(decode_stream(&generous).len(), 10);
}
