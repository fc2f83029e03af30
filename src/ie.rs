//! The table-driven Information Element decode engine.
//!
//! Two wire flavors share the same presence/recovery contract:
//!
//! * [`decode_tlv_ies`] walks a BSSGP-style byte stream of V/TV/TLV elements
//!   against an ordered descriptor list: positional mandatory matching with
//!   optional-skip, then an unordered tail phase for the remaining optionals.
//! * [`decode_per_ie_container`] walks a PER ProtocolIE-Container whose fields
//!   are self-identifying {id, criticality, open type} triples, checked in
//!   order against the descriptor list.
//!
//! Both enforce declared-length authority: after a value decoder runs, the
//! cursor sits at `value_start + declared_length` no matter how many bytes the
//! decoder actually consumed. A broken field decoder can ruin one IE, never
//! the rest of the message. The only way a message decode aborts is running
//! out of buffer while reading a length field itself; even then the records
//! decoded so far are returned.

use log::warn;

use crate::context::{DecodeContext, LinkDirection};
use crate::cursor::{Cursor, DecodeError};
use crate::field::{Diagnostic, FieldRecord, FieldValue};
use crate::{per, tlv};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Mandatory,
    Conditional,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IeFormat {
    /// Value only, fixed position and length, no tag on the wire.
    V,
    /// One-byte tag followed by a fixed-length value.
    Tv,
    /// One-byte tag, length determinant, variable-length value.
    Tlv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthHint {
    Fixed(usize),
    Variable,
}

/// Static per-message descriptor: one expected IE. Ordering within a message
/// table defines the expected decode order.
#[derive(Debug, Clone, Copy)]
pub struct IeDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub presence: Presence,
    pub format: IeFormat,
    pub length: LengthHint,
}

/// Static dispatch entry: message/procedure code to IE list plus link
/// direction metadata.
#[derive(Debug)]
pub struct MessageTable {
    pub code: u32,
    pub name: &'static str,
    pub direction: LinkDirection,
    pub ies: &'static [IeDescriptor],
}

/// What a registered value decoder hands back: the decoded value plus any
/// diagnostics to annotate the record with (e.g. a clamped out-of-range
/// field).
#[derive(Debug, Clone, PartialEq)]
pub struct IeValue {
    pub value: FieldValue,
    pub diagnostics: Vec<Diagnostic>,
}

impl From<FieldValue> for IeValue {
    fn from(value: FieldValue) -> Self {
        IeValue {
            value,
            diagnostics: Vec::new(),
        }
    }
}

/// A registered IE value decoder. Receives a cursor clipped to exactly the
/// IE's declared value bytes.
pub type IeDecoderFn =
    fn(&mut DecodeContext<'_>, &mut Cursor<'_>, &IeDescriptor) -> Result<IeValue, DecodeError>;

pub const UNPARSED_NAME: &str = "Unparsed data";

#[derive(Debug)]
pub struct IeLoopResult {
    pub records: Vec<FieldRecord>,
    /// Set when the loop hit a hard structural failure; `records` still holds
    /// everything decoded before that point.
    pub abort: Option<DecodeError>,
}

fn missing_record(descriptor: &IeDescriptor, at: usize) -> FieldRecord {
    FieldRecord::new(descriptor.id, descriptor.name, FieldValue::Absent, at, 0)
        .with_diagnostic(Diagnostic::MandatoryMissing(descriptor.id))
}

/// Run a registered decoder (or fall back to raw bytes) over a value cursor,
/// producing the record's value and diagnostics. Decoder failures degrade to
/// the raw bytes with an annotation; they never stop the message.
fn run_value_decoder(
    ctx: &mut DecodeContext<'_>,
    value_cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    descriptor: &IeDescriptor,
) -> IeValue {
    let raw = value_cur
        .peek_bytes(value_cur.remaining())
        .unwrap_or_default();
    match ctx.registry.resolve(ies_namespace, descriptor.id) {
        Some(decode) => match decode(ctx, value_cur, descriptor) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "decoder for {} ({}/{:#x}) failed: {e}",
                    descriptor.name, ies_namespace, descriptor.id
                );
                let diagnostic = match e {
                    DecodeError::ValueOutOfRange { value, min, max } => {
                        Diagnostic::ValueOutOfRange { value, min, max }
                    }
                    other => Diagnostic::Malformed(other.to_string()),
                };
                IeValue {
                    value: FieldValue::Bytes(raw.to_vec()),
                    diagnostics: vec![diagnostic],
                }
            }
        },
        None => FieldValue::Bytes(raw.to_vec()).into(),
    }
}

/// Decode one tagged (TV/TLV) IE whose tag has been matched but not yet
/// consumed. Errors are only possible while reading the length determinant.
fn decode_tagged_ie(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    descriptor: &IeDescriptor,
) -> Result<FieldRecord, DecodeError> {
    let start = cur.abs_pos();
    let _tag = cur.read_u8()?;
    let declared = match descriptor.format {
        IeFormat::Tv => match descriptor.length {
            LengthHint::Fixed(n) => n,
            LengthHint::Variable => cur.remaining(),
        },
        IeFormat::Tlv => tlv::read_length(cur)?,
        IeFormat::V => unreachable!("V-format IEs carry no tag"),
    };
    let available = cur.remaining();
    let clamped = declared.min(available);
    let mut value_cur = cur.subrange(clamped)?;
    let decoded = run_value_decoder(ctx, &mut value_cur, ies_namespace, descriptor);
    let mut record = FieldRecord::new(
        descriptor.id,
        descriptor.name,
        decoded.value,
        start,
        cur.abs_pos() - start,
    );
    record.diagnostics = decoded.diagnostics;
    if declared > available {
        record.push_diagnostic(Diagnostic::Truncated {
            declared,
            available,
        });
    }
    Ok(record)
}

/// Decode a positional V-format IE: no tag, length from the descriptor.
fn decode_positional_ie(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    descriptor: &IeDescriptor,
) -> FieldRecord {
    let start = cur.abs_pos();
    let declared = match descriptor.length {
        LengthHint::Fixed(n) => n,
        LengthHint::Variable => cur.remaining(),
    };
    let available = cur.remaining();
    let clamped = declared.min(available);
    // subrange over a clamped length cannot fail
    let mut value_cur = cur.subrange(clamped).expect("clamped subrange");
    let decoded = run_value_decoder(ctx, &mut value_cur, ies_namespace, descriptor);
    let mut record = FieldRecord::new(
        descriptor.id,
        descriptor.name,
        decoded.value,
        start,
        clamped,
    );
    record.diagnostics = decoded.diagnostics;
    if declared > available {
        record.push_diagnostic(Diagnostic::Truncated {
            declared,
            available,
        });
    }
    record
}

/// Consume one TLV whose tag matched no descriptor, keeping its bytes as an
/// opaque record so the loop can resync on the next IE.
fn skip_unknown_ie(cur: &mut Cursor<'_>) -> Result<FieldRecord, DecodeError> {
    let start = cur.abs_pos();
    let tag = cur.read_u8()? as u32;
    let declared = tlv::read_length(cur)?;
    let available = cur.remaining();
    let clamped = declared.min(available);
    let value_cur = cur.subrange(clamped)?;
    let raw = value_cur.peek_bytes(clamped).unwrap_or_default().to_vec();
    let mut record = FieldRecord::new(
        tag,
        UNPARSED_NAME,
        FieldValue::Bytes(raw),
        start,
        cur.abs_pos() - start,
    )
    .with_diagnostic(Diagnostic::UnknownIdentifier(tag));
    if declared > available {
        record.push_diagnostic(Diagnostic::Truncated {
            declared,
            available,
        });
    }
    Ok(record)
}

fn unparsed_record(cur: &mut Cursor<'_>, id: u32) -> FieldRecord {
    let start = cur.abs_pos();
    let rest = cur
        .read_bytes(cur.remaining())
        .unwrap_or_default()
        .to_vec();
    let len = rest.len();
    FieldRecord::new(id, UNPARSED_NAME, FieldValue::Bytes(rest), start, len)
        .with_diagnostic(Diagnostic::UnknownIdentifier(id))
}

/// The byte/TLV engine. See module docs for the state machine; per iteration
/// it either consumes input or advances the descriptor index, so it terminates
/// in O(descriptors + buffer) steps for any input.
pub fn decode_tlv_ies(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    table: &MessageTable,
) -> IeLoopResult {
    let mut records = Vec::new();
    let abort = tlv_loop(ctx, cur, ies_namespace, table, &mut records).err();
    IeLoopResult { records, abort }
}

fn tlv_loop(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    table: &MessageTable,
    records: &mut Vec<FieldRecord>,
) -> Result<(), DecodeError> {
    let descriptors = table.ies;
    let mut i = 0;

    // Ordered phase: runs while a mandatory IE is still expected ahead.
    while i < descriptors.len() {
        if descriptors[i..]
            .iter()
            .all(|d| d.presence != Presence::Mandatory)
        {
            break;
        }
        let descriptor = &descriptors[i];
        match descriptor.format {
            IeFormat::V => {
                records.push(decode_positional_ie(ctx, cur, ies_namespace, descriptor));
                i += 1;
            }
            IeFormat::Tv | IeFormat::Tlv => {
                if cur.is_empty() {
                    if descriptor.presence == Presence::Mandatory {
                        records.push(missing_record(descriptor, cur.abs_pos()));
                    }
                    i += 1;
                    continue;
                }
                let tag = cur.peek_u8()? as u32;
                if tag == descriptor.id {
                    records.push(decode_tagged_ie(ctx, cur, ies_namespace, descriptor)?);
                    i += 1;
                } else if descriptor.presence != Presence::Mandatory {
                    // absent optional: same unread tag is retried at i+1
                    i += 1;
                } else if descriptors[i..].iter().any(|d| d.id == tag) {
                    // the tag belongs to a later descriptor, so this mandatory
                    // IE is missing; retry the tag downstream
                    warn!(
                        "{}: mandatory IE {} ({:#04x}) missing, got tag {tag:#04x}",
                        table.name, descriptor.name, descriptor.id
                    );
                    records.push(missing_record(descriptor, cur.abs_pos()));
                    i += 1;
                } else {
                    // tag known to no descriptor: skip past it and retry the
                    // same descriptor on whatever follows
                    warn!("{}: skipping unknown IE tag {tag:#04x}", table.name);
                    records.push(skip_unknown_ie(cur)?);
                }
            }
        }
    }

    // Tail phase: only optionals/conditionals remain and BSSGP allows them in
    // any order, so match each upcoming tag against all remaining descriptors.
    let mut pending: Vec<&IeDescriptor> = descriptors[i..].iter().collect();
    while !cur.is_empty() {
        let tag = cur.peek_u8()? as u32;
        match pending.iter().position(|d| d.id == tag) {
            Some(j) => {
                let descriptor = pending.remove(j);
                records.push(decode_tagged_ie(ctx, cur, ies_namespace, descriptor)?);
            }
            None => records.push(skip_unknown_ie(cur)?),
        }
    }
    Ok(())
}

/// PER criticality values in declaration order.
pub const CRITICALITY_REJECT: u64 = 0;
pub const CRITICALITY_IGNORE: u64 = 1;
pub const CRITICALITY_NOTIFY: u64 = 2;

/// The PER ProtocolIE-Container engine: a 16-bit field count, then per field
/// {16-bit id, 2-bit criticality, byte-aligned open type}. Fields identify
/// themselves, so descriptor matching is an ordered presence check rather
/// than tag sniffing; unknown ids become opaque records (escalated when their
/// criticality says reject) and mandatory descriptors that never appeared are
/// reported after the loop.
pub fn decode_per_ie_container(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    table: &MessageTable,
) -> IeLoopResult {
    let mut records = Vec::new();
    let abort = per_container_loop(ctx, cur, ies_namespace, table, &mut records).err();
    IeLoopResult { records, abort }
}

fn per_container_loop(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    ies_namespace: &'static str,
    table: &MessageTable,
    records: &mut Vec<FieldRecord>,
) -> Result<(), DecodeError> {
    let count = per::read_constrained_int(cur, 0, 65535)?;
    let mut seen: Vec<u32> = Vec::new();

    for _ in 0..count {
        if cur.is_empty() {
            // declared more fields than bytes; the count is a length-class
            // field, so this is structural
            return Err(DecodeError::OutOfBounds {
                offset: cur.abs_pos(),
                needed: 3,
                available: 0,
            });
        }
        let start = cur.abs_pos();
        let id = per::read_constrained_int(cur, 0, 65535)? as u32;
        let criticality = per::read_constrained_int(cur, 0, 2)?;
        let mut value_cur = per::read_open_type(cur)?;
        let end = cur.abs_pos();

        match table.ies.iter().find(|d| d.id == id) {
            Some(descriptor) => {
                seen.push(id);
                let decoded = run_value_decoder(ctx, &mut value_cur, ies_namespace, descriptor);
                let mut record =
                    FieldRecord::new(id, descriptor.name, decoded.value, start, end - start);
                record.diagnostics = decoded.diagnostics;
                records.push(record);
            }
            None => {
                let raw = value_cur
                    .peek_bytes(value_cur.remaining())
                    .unwrap_or_default()
                    .to_vec();
                let name = ctx
                    .registry
                    .value_label(ies_namespace, id)
                    .unwrap_or("Unknown ProtocolIE");
                let mut record =
                    FieldRecord::new(id, name, FieldValue::Bytes(raw), start, end - start)
                        .with_diagnostic(Diagnostic::UnknownIdentifier(id));
                if criticality == CRITICALITY_REJECT {
                    record.push_diagnostic(Diagnostic::RejectCriticality);
                }
                records.push(record);
            }
        }
    }

    for descriptor in table.ies {
        if descriptor.presence == Presence::Mandatory && !seen.contains(&descriptor.id) {
            records.push(missing_record(descriptor, cur.abs_pos()));
        }
    }

    if !cur.is_empty() {
        let tag = cur.peek_u8()? as u32;
        records.push(unparsed_record(cur, tag));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LinkDirection;
    use crate::registry::Registry;

    const NS: &str = "test.ies";

    fn descriptor(
        id: u32,
        name: &'static str,
        presence: Presence,
        format: IeFormat,
        length: LengthHint,
    ) -> IeDescriptor {
        IeDescriptor {
            id,
            name,
            presence,
            format,
            length,
        }
    }

    static ABC_IES: &[IeDescriptor] = &[
        IeDescriptor {
            id: 0x01,
            name: "A",
            presence: Presence::Mandatory,
            format: IeFormat::Tlv,
            length: LengthHint::Variable,
        },
        IeDescriptor {
            id: 0x02,
            name: "B",
            presence: Presence::Optional,
            format: IeFormat::Tlv,
            length: LengthHint::Variable,
        },
        IeDescriptor {
            id: 0x03,
            name: "C",
            presence: Presence::Mandatory,
            format: IeFormat::Tlv,
            length: LengthHint::Variable,
        },
    ];

    static ABC_TABLE: MessageTable = MessageTable {
        code: 0,
        name: "TEST",
        direction: LinkDirection::Either,
        ies: ABC_IES,
    };

    fn decode(registry: &Registry, data: &[u8]) -> IeLoopResult {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ctx = DecodeContext::new(registry);
        let mut cur = Cursor::new(data);
        decode_tlv_ies(&mut ctx, &mut cur, NS, &ABC_TABLE)
    }

    #[test]
    fn test_optional_ie_skip() {
        // A and C present, B omitted: no error, C not misread as B
        let registry = Registry::new();
        let data = [0x01, 0x81, 0xaa, 0x03, 0x82, 0xbb, 0xcc];
        let result = decode(&registry, &data);
        assert!(result.abort.is_none());
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].name, "A");
        assert!(result.records[0].diagnostics.is_empty());
        assert_eq!(result.records[1].name, "C");
        assert_eq!(result.records[1].value, FieldValue::Bytes(vec![0xbb, 0xcc]));
    }

    #[test]
    fn test_missing_mandatory_does_not_stop_decode() {
        // tag 0xff is nothing we know: it is skipped as an opaque IE, then A
        // and C are reported missing against the now-empty buffer
        let registry = Registry::new();
        let data = [0xff, 0x81, 0xaa];
        let result = decode(&registry, &data);
        assert!(result.abort.is_none());
        assert_eq!(result.records[0].name, UNPARSED_NAME);
        assert_eq!(result.records[0].value, FieldValue::Bytes(vec![0xaa]));
        let missing: Vec<&FieldRecord> = result
            .records
            .iter()
            .filter(|r| {
                r.diagnostics
                    .iter()
                    .any(|d| matches!(d, Diagnostic::MandatoryMissing(_)))
            })
            .collect();
        assert_eq!(missing.len(), 2); // A and C both unmatched
    }

    #[test]
    fn test_resync_after_corrupted_mandatory_tag() {
        // A's tag corrupted to an unused value: its TLV is skipped opaquely, A
        // is missing, and C still decodes at the right offset
        let registry = Registry::new();
        let data = [0xee, 0x81, 0xaa, 0x03, 0x82, 0xbb, 0xcc];
        let result = decode(&registry, &data);
        assert!(result.abort.is_none());
        let names: Vec<&str> = result.records.iter().map(|r| r.name).collect();
        assert_eq!(names, vec![UNPARSED_NAME, "A", "C"]);
        assert!(
            result.records[1]
                .diagnostics
                .contains(&Diagnostic::MandatoryMissing(0x01))
        );
        assert_eq!(result.records[2].value, FieldValue::Bytes(vec![0xbb, 0xcc]));
    }

    #[test]
    fn test_declared_length_authority() {
        // decoder stub that "forgets" to consume the last byte: the following
        // IE must still be found at the right offset
        fn lossy(
            _ctx: &mut DecodeContext<'_>,
            cur: &mut Cursor<'_>,
            _d: &IeDescriptor,
        ) -> Result<IeValue, DecodeError> {
            let n = cur.remaining() - 1;
            Ok(FieldValue::Bytes(cur.read_bytes(n)?.to_vec()).into())
        }
        let mut registry = Registry::new();
        registry.register_decoder(NS, 0x01, lossy);
        let data = [0x01, 0x83, 0x10, 0x20, 0x30, 0x03, 0x81, 0x55];
        let result = decode(&registry, &data);
        assert!(result.abort.is_none());
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].value, FieldValue::Bytes(vec![0x10, 0x20]));
        // record still spans the declared three value bytes
        assert_eq!(result.records[0].len, 5);
        assert_eq!(result.records[1].name, "C");
        assert_eq!(result.records[1].value, FieldValue::Bytes(vec![0x55]));
    }

    #[test]
    fn test_declared_length_clamped_to_buffer() {
        // TLV declares 10 value bytes but only 2 remain
        let registry = Registry::new();
        let data = [0x01, 0x8a, 0xde, 0xad];
        let result = decode(&registry, &data);
        assert!(result.abort.is_none());
        assert_eq!(result.records[0].value, FieldValue::Bytes(vec![0xde, 0xad]));
        assert!(result.records[0].diagnostics.contains(&Diagnostic::Truncated {
            declared: 10,
            available: 2
        }));
    }

    #[test]
    fn test_abort_on_truncated_length_field() {
        // 2-byte length form cut off after its first byte: we cannot know how
        // much to skip, so the loop aborts -- but keeps what it had
        let registry = Registry::new();
        let data = [0x01, 0x81, 0xaa, 0x03, 0x00];
        let result = decode(&registry, &data);
        assert!(matches!(
            result.abort,
            Some(DecodeError::OutOfBounds { .. })
        ));
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].name, "A");
    }

    #[test]
    fn test_unordered_optional_tail() {
        static OPT_IES: &[IeDescriptor] = &[
            IeDescriptor {
                id: 0x01,
                name: "A",
                presence: Presence::Mandatory,
                format: IeFormat::Tlv,
                length: LengthHint::Variable,
            },
            IeDescriptor {
                id: 0x10,
                name: "X",
                presence: Presence::Optional,
                format: IeFormat::Tlv,
                length: LengthHint::Variable,
            },
            IeDescriptor {
                id: 0x11,
                name: "Y",
                presence: Presence::Optional,
                format: IeFormat::Tlv,
                length: LengthHint::Variable,
            },
        ];
        static OPT_TABLE: MessageTable = MessageTable {
            code: 0,
            name: "TEST",
            direction: LinkDirection::Either,
            ies: OPT_IES,
        };
        let registry = Registry::new();
        let mut ctx = DecodeContext::new(&registry);
        // Y before X on the wire
        let data = [0x01, 0x81, 0xaa, 0x11, 0x81, 0x02, 0x10, 0x81, 0x01];
        let mut cur = Cursor::new(&data);
        let result = decode_tlv_ies(&mut ctx, &mut cur, NS, &OPT_TABLE);
        assert!(result.abort.is_none());
        let names: Vec<&str> = result.records.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "Y", "X"]);
    }

    #[test]
    fn test_termination_on_adversarial_input() {
        let registry = Registry::new();
        for data in [
            &[][..],
            &[0x01][..],
            &[0xff; 64][..],
            &[0x01, 0x00][..],
            &[0x02, 0x02, 0x02, 0x02][..],
        ] {
            // must return, not hang or panic
            let _ = decode(&registry, data);
        }
    }

    #[test]
    fn test_repeated_decode_is_idempotent() {
        let registry = Registry::new();
        let data = [0x01, 0x81, 0xaa, 0x03, 0x82, 0xbb, 0xcc];
        let first = decode(&registry, &data);
        let second = decode(&registry, &data);
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn test_positional_v_format() {
        static V_IES: &[IeDescriptor] = &[
            IeDescriptor {
                id: 0x00,
                name: "fixed",
                presence: Presence::Mandatory,
                format: IeFormat::V,
                length: LengthHint::Fixed(2),
            },
            IeDescriptor {
                id: 0x05,
                name: "tail",
                presence: Presence::Mandatory,
                format: IeFormat::Tlv,
                length: LengthHint::Variable,
            },
        ];
        static V_TABLE: MessageTable = MessageTable {
            code: 0,
            name: "TEST",
            direction: LinkDirection::Either,
            ies: V_IES,
        };
        let registry = Registry::new();
        let mut ctx = DecodeContext::new(&registry);
        let data = [0xca, 0xfe, 0x05, 0x81, 0x01];
        let mut cur = Cursor::new(&data);
        let result = decode_tlv_ies(&mut ctx, &mut cur, NS, &V_TABLE);
        assert!(result.abort.is_none());
        assert_eq!(result.records[0].value, FieldValue::Bytes(vec![0xca, 0xfe]));
        assert_eq!(result.records[1].value, FieldValue::Bytes(vec![0x01]));
    }

    #[test]
    fn test_per_container_basic() {
        use crate::per::PerWriter;
        let registry = Registry::new();
        let mut ctx = DecodeContext::new(&registry);
        let mut w = PerWriter::new();
        w.write_constrained_int(2, 0, 65535); // two fields
        // field A (id 1, criticality ignore)
        w.write_constrained_int(0x01, 0, 65535);
        w.write_constrained_int(CRITICALITY_IGNORE, 0, 2);
        w.write_open_type(&[0x12]);
        // field C (id 3, criticality reject)
        w.write_constrained_int(0x03, 0, 65535);
        w.write_constrained_int(CRITICALITY_REJECT, 0, 2);
        w.write_open_type(&[0x34, 0x56]);
        let data = w.into_bytes();
        let mut cur = Cursor::new(&data);
        let result = decode_per_ie_container(&mut ctx, &mut cur, NS, &ABC_TABLE);
        assert!(result.abort.is_none());
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].name, "A");
        assert_eq!(result.records[1].name, "C");
        assert!(result.records[1].diagnostics.is_empty());
    }

    #[test]
    fn test_per_container_unknown_reject_ie_and_missing_mandatory() {
        use crate::per::PerWriter;
        let registry = Registry::new();
        let mut ctx = DecodeContext::new(&registry);
        let mut w = PerWriter::new();
        w.write_constrained_int(2, 0, 65535);
        w.write_constrained_int(0x01, 0, 65535);
        w.write_constrained_int(CRITICALITY_IGNORE, 0, 2);
        w.write_open_type(&[0x12]);
        // unknown id 0x99 with reject criticality
        w.write_constrained_int(0x99, 0, 65535);
        w.write_constrained_int(CRITICALITY_REJECT, 0, 2);
        w.write_open_type(&[0xab]);
        let data = w.into_bytes();
        let mut cur = Cursor::new(&data);
        let result = decode_per_ie_container(&mut ctx, &mut cur, NS, &ABC_TABLE);
        assert!(result.abort.is_none());
        assert_eq!(result.records.len(), 3);
        assert!(
            result.records[1]
                .diagnostics
                .contains(&Diagnostic::RejectCriticality)
        );
        // mandatory C never appeared
        assert_eq!(result.records[2].id, 0x03);
        assert!(
            result.records[2]
                .diagnostics
                .contains(&Diagnostic::MandatoryMissing(0x03))
        );
    }

    #[test]
    fn test_per_container_count_overrun_aborts_with_partial() {
        use crate::per::PerWriter;
        let registry = Registry::new();
        let mut ctx = DecodeContext::new(&registry);
        let mut w = PerWriter::new();
        w.write_constrained_int(5, 0, 65535); // claims five fields
        w.write_constrained_int(0x01, 0, 65535);
        w.write_constrained_int(CRITICALITY_IGNORE, 0, 2);
        w.write_open_type(&[0x12]);
        let data = w.into_bytes();
        let mut cur = Cursor::new(&data);
        let result = decode_per_ie_container(&mut ctx, &mut cur, NS, &ABC_TABLE);
        assert!(result.abort.is_some());
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].name, "A");
    }

    #[test]
    fn test_descriptor_helper_builds() {
        let d = descriptor(1, "x", Presence::Optional, IeFormat::Tv, LengthHint::Fixed(1));
        assert_eq!(d.id, 1);
    }
}
