//! RK512 laser-scanner block protocol: a fixed-layout frame with a 4-byte
//! all-zero signature, big-endian block type and word count, a payload of
//! 16-bit words and a trailing little-endian CRC-16/X.25.
//!
//! Two quirks are load-bearing: measurement-data blocks carry one more payload
//! word than their count field declares, and the checksum is computed over the
//! frame with the 4-byte signature collapsed to a single zero word.

use bytes::Buf;
use crc::{Algorithm, Crc};
use deku::prelude::*;
use log::warn;
use num_enum::TryFromPrimitive;

use crate::context::DecodeContext;
use crate::cursor::DecodeError;
use crate::field::{DecodeStatus, Diagnostic, DissectOutput, FieldRecord, FieldValue};
use crate::registry::Registry;

pub const NS_BLOCKS: &str = "rk512.blocks";

/// Signature (4) + block type (2) + word count (2).
const HEADER_LEN: usize = 8;
const CHECKSUM_LEN: usize = 2;

pub const CRC_X25_ALG: Algorithm<u16> = Algorithm {
    poly: 0x1021,
    init: 0xffff,
    refin: true,
    refout: true,
    width: 16,
    xorout: 0xffff,
    check: 0x906e,
    residue: 0xf0b8,
};

pub const CRC_X25: Crc<u16> = Crc::<u16>::new(&CRC_X25_ALG);

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, TryFromPrimitive)]
pub enum BlockType {
    MeasurementData = 0x0001,
    DeviceStatus = 0x0002,
    ScanHeader = 0x0003,
}

/// Number of payload words actually on the wire for a given block type.
/// Measurement blocks carry one word beyond the declared count.
fn payload_words(block_type: u16, word_count: u16) -> usize {
    match BlockType::try_from(block_type) {
        Ok(BlockType::MeasurementData) => word_count as usize + 1,
        _ => word_count as usize,
    }
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct Rk512Frame {
    #[deku(assert_eq = "0")]
    pub signature: u32,
    pub block_type: u16,
    pub word_count: u16,
    #[deku(count = "payload_words(*block_type, *word_count)")]
    pub words: Vec<u16>,
    #[deku(endian = "little")]
    pub checksum: u16,
}

impl Rk512Frame {
    /// Checksum input: a single zero word standing in for the signature,
    /// then block type, word count and payload, all big-endian.
    pub fn checksum_input(&self) -> Vec<u8> {
        let mut input = Vec::with_capacity(4 + self.words.len() * 2);
        input.extend(0u16.to_be_bytes());
        input.extend(self.block_type.to_be_bytes());
        input.extend(self.word_count.to_be_bytes());
        for word in &self.words {
            input.extend(word.to_be_bytes());
        }
        input
    }
}

pub fn register(registry: &mut Registry) {
    registry.register_label(NS_BLOCKS, BlockType::MeasurementData as u32, "Measurement data");
    registry.register_label(NS_BLOCKS, BlockType::DeviceStatus as u32, "Device status");
    registry.register_label(NS_BLOCKS, BlockType::ScanHeader as u32, "Scan header");
}

/// Total frame length implied by an 8-byte header, for carving frames out of a
/// reassembled TCP stream. `None` means not enough bytes to tell yet.
pub fn pdu_len(data: &[u8]) -> Option<usize> {
    if data.len() < HEADER_LEN {
        return None;
    }
    let mut buf = data;
    let _signature = buf.get_u32();
    let block_type = buf.get_u16();
    let word_count = buf.get_u16();
    Some(HEADER_LEN + payload_words(block_type, word_count) * 2 + CHECKSUM_LEN)
}

/// Split a stream buffer into complete frames plus the unconsumed tail.
pub fn split_frames(stream: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut frames = Vec::new();
    let mut rest = stream;
    while let Some(len) = pdu_len(rest) {
        if rest.len() < len {
            break;
        }
        let (frame, tail) = rest.split_at(len);
        frames.push(frame);
        rest = tail;
    }
    (frames, rest)
}

/// Dissect one complete RK512 frame.
pub fn dissect(data: &[u8], ctx: &mut DecodeContext<'_>) -> DissectOutput {
    let mut records = Vec::new();
    match Rk512Frame::from_bytes((data, 0)) {
        Ok(((rest, _), frame)) => {
            if !rest.is_empty() {
                warn!("{} leftover bytes after RK512 frame", rest.len());
            }
            frame_records(ctx, &frame, &mut records);
            DissectOutput {
                records,
                status: DecodeStatus::Complete,
                consumed: data.len() - rest.len(),
            }
        }
        Err(e) => DissectOutput {
            records,
            status: DecodeStatus::Aborted(DecodeError::Framing(e.to_string())),
            consumed: 0,
        },
    }
}

fn frame_records(ctx: &mut DecodeContext<'_>, frame: &Rk512Frame, records: &mut Vec<FieldRecord>) {
    let block_type = frame.block_type as u32;
    let block_record = match ctx.registry.value_label(NS_BLOCKS, block_type) {
        Some(label) => FieldRecord::new(
            block_type,
            "Block type",
            FieldValue::Text(label.to_string()),
            4,
            2,
        ),
        None => FieldRecord::new(
            block_type,
            "Block type",
            FieldValue::Unsigned(block_type as u64),
            4,
            2,
        )
        .with_diagnostic(Diagnostic::UnknownIdentifier(block_type)),
    };
    records.push(block_record);
    records.push(FieldRecord::new(
        block_type,
        "Word count",
        FieldValue::Unsigned(frame.word_count as u64),
        6,
        2,
    ));

    let measurement = matches!(
        BlockType::try_from(frame.block_type),
        Ok(BlockType::MeasurementData)
    );
    let words: Vec<FieldRecord> = frame
        .words
        .iter()
        .enumerate()
        .map(|(i, &word)| {
            let name = if measurement { "Measurement point" } else { "Data word" };
            FieldRecord::new(
                i as u32,
                name,
                FieldValue::Unsigned(word as u64),
                HEADER_LEN + i * 2,
                2,
            )
        })
        .collect();
    let payload_len = words.len() * 2;
    records.push(FieldRecord::new(
        block_type,
        if measurement { "Measurement points" } else { "Payload" },
        FieldValue::List(words),
        HEADER_LEN,
        payload_len,
    ));

    let expected = CRC_X25.checksum(&frame.checksum_input());
    let mut checksum_record = FieldRecord::new(
        block_type,
        "Checksum",
        FieldValue::Unsigned(frame.checksum as u64),
        HEADER_LEN + payload_len,
        2,
    );
    if expected != frame.checksum {
        checksum_record.push_diagnostic(Diagnostic::ChecksumMismatch {
            expected,
            actual: frame.checksum,
        });
    }
    records.push(checksum_record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    /// Build a frame with a correct checksum. For measurement blocks the
    /// count field declares one word fewer than are present.
    fn frame_bytes(block_type: BlockType, words: &[u16]) -> Vec<u8> {
        let word_count = match block_type {
            BlockType::MeasurementData => words.len() as u16 - 1,
            _ => words.len() as u16,
        };
        let mut frame = Rk512Frame {
            signature: 0,
            block_type: block_type as u16,
            word_count,
            words: words.to_vec(),
            checksum: 0,
        };
        frame.checksum = CRC_X25.checksum(&frame.checksum_input());
        frame.to_bytes().unwrap()
    }

    fn checksum_diagnostics(out: &DissectOutput) -> Vec<&Diagnostic> {
        out.records
            .iter()
            .flat_map(|r| r.diagnostics.iter())
            .filter(|d| matches!(d, Diagnostic::ChecksumMismatch { .. }))
            .collect()
    }

    #[test]
    fn test_good_frame_has_no_checksum_mismatch() {
        let data = frame_bytes(BlockType::MeasurementData, &[100, 200, 300, 400]);
        let mut ctx = DecodeContext::new(registry::global());
        let out = dissect(&data, &mut ctx);
        assert!(out.is_complete());
        assert_eq!(out.consumed, data.len());
        assert!(checksum_diagnostics(&out).is_empty());

        let points = out
            .records
            .iter()
            .find(|r| r.name == "Measurement points")
            .unwrap();
        let FieldValue::List(words) = &points.value else {
            panic!("measurement payload should nest per-point records");
        };
        // count field says 3, the wire carries 4
        assert_eq!(words.len(), 4);
        assert_eq!(words[2].value, FieldValue::Unsigned(300));
    }

    #[test]
    fn test_any_single_payload_bit_flip_is_detected() {
        let good = frame_bytes(BlockType::MeasurementData, &[0x1234, 0x5678]);
        let payload_start = 8;
        let payload_end = good.len() - 2;
        for byte in payload_start..payload_end {
            for bit in 0..8 {
                let mut data = good.clone();
                data[byte] ^= 1 << bit;
                let mut ctx = DecodeContext::new(registry::global());
                let out = dissect(&data, &mut ctx);
                assert!(out.is_complete());
                assert_eq!(
                    checksum_diagnostics(&out).len(),
                    1,
                    "flip of byte {byte} bit {bit} went undetected"
                );
                // the corrupted fields are still emitted
                assert!(out.records.iter().any(|r| r.name == "Measurement points"));
            }
        }
    }

    #[test]
    fn test_device_status_word_count_is_exact() {
        let data = frame_bytes(BlockType::DeviceStatus, &[7, 8]);
        let mut ctx = DecodeContext::new(registry::global());
        let out = dissect(&data, &mut ctx);
        assert!(out.is_complete());
        let payload = out.records.iter().find(|r| r.name == "Payload").unwrap();
        let FieldValue::List(words) = &payload.value else {
            panic!("payload should nest word records");
        };
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_nonzero_signature_aborts() {
        let mut data = frame_bytes(BlockType::DeviceStatus, &[1]);
        data[0] = 0xff;
        let mut ctx = DecodeContext::new(registry::global());
        let out = dissect(&data, &mut ctx);
        assert!(matches!(out.status, DecodeStatus::Aborted(DecodeError::Framing(_))));
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_pdu_len() {
        assert_eq!(pdu_len(&[0; 7]), None);
        let status = frame_bytes(BlockType::DeviceStatus, &[1, 2, 3]);
        assert_eq!(pdu_len(&status), Some(status.len()));
        // measurement off-by-one is part of the length computation
        let meas = frame_bytes(BlockType::MeasurementData, &[1, 2, 3]);
        assert_eq!(pdu_len(&meas), Some(meas.len()));
    }

    #[test]
    fn test_split_frames() {
        let a = frame_bytes(BlockType::MeasurementData, &[1, 2]);
        let b = frame_bytes(BlockType::DeviceStatus, &[9]);
        let mut stream = Vec::new();
        stream.extend(&a);
        stream.extend(&b);
        stream.extend(&b[..5]); // partial third frame
        let (frames, rest) = split_frames(&stream);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &a[..]);
        assert_eq!(frames[1], &b[..]);
        assert_eq!(rest, &b[..5]);
    }
}
