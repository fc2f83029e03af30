//! The Field Record tree produced by every dissector: typed values with
//! provenance byte ranges and inline diagnostics. The host renderer consumes
//! the tree through the [`FieldSink`] seam; it never needs to know anything
//! about the wire formats.

use serde::Serialize;
use thiserror::Error;

use crate::cursor::DecodeError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<FieldRecord>),
    /// A field that should have been present but was not (e.g. a missing
    /// mandatory IE). Carries no value; the diagnostics on the record say why.
    Absent,
}

/// Non-fatal condition attached to a Field Record. These are surfaced inline
/// by the renderer ("[Malformed Packet]"-style annotations) while decode of
/// the rest of the message continues.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum Diagnostic {
    #[error("mandatory IE {0:#04x} missing")]
    MandatoryMissing(u32),
    #[error("unknown identifier {0:#06x}")]
    UnknownIdentifier(u32),
    #[error("value {value} outside expected range {min}..={max}")]
    ValueOutOfRange { value: u64, min: u64, max: u64 },
    #[error("declared length {declared} exceeds {available} remaining bytes")]
    Truncated { declared: usize, available: usize },
    #[error("malformed value: {0}")]
    Malformed(String),
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },
    #[error("unrecognized IE carries reject criticality")]
    RejectCriticality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    pub id: u32,
    pub name: &'static str,
    pub value: FieldValue,
    /// Byte range in the top-level message buffer this record was decoded from.
    pub start: usize,
    pub len: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl FieldRecord {
    pub fn new(id: u32, name: &'static str, value: FieldValue, start: usize, len: usize) -> Self {
        FieldRecord {
            id,
            name,
            value,
            start,
            len,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeStatus {
    Complete,
    /// A hard structural failure (the cursor ran out while reading a length
    /// field). Records decoded up to that point are still returned.
    Aborted(DecodeError),
}

/// Result of dissecting one complete message.
#[derive(Debug, Clone, PartialEq)]
pub struct DissectOutput {
    pub records: Vec<FieldRecord>,
    pub status: DecodeStatus,
    /// Bytes of the input consumed by the decode.
    pub consumed: usize,
}

impl DissectOutput {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, DecodeStatus::Complete)
    }
}

/// Host-side tree builder. The core only threads handles through for nesting;
/// it never inspects them.
pub trait FieldSink {
    type Handle;

    fn render_field(&mut self, record: &FieldRecord, parent: Option<&Self::Handle>) -> Self::Handle;
}

/// Depth-first traversal of a record tree into a sink.
pub fn walk<S: FieldSink>(records: &[FieldRecord], sink: &mut S) {
    fn visit<S: FieldSink>(records: &[FieldRecord], parent: Option<&S::Handle>, sink: &mut S) {
        for record in records {
            let handle = sink.render_field(record, parent);
            if let FieldValue::List(children) = &record.value {
                visit::<S>(children, Some(&handle), sink);
            }
        }
    }
    visit::<S>(records, None, sink);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlattenSink {
        lines: Vec<(usize, &'static str)>,
    }

    impl FieldSink for FlattenSink {
        type Handle = usize;

        fn render_field(
            &mut self,
            record: &FieldRecord,
            parent: Option<&Self::Handle>,
        ) -> Self::Handle {
            let depth = parent.map(|d| d + 1).unwrap_or(0);
            self.lines.push((depth, record.name));
            depth
        }
    }

    #[test]
    fn test_walk_visits_nested_records() {
        let tree = vec![
            FieldRecord::new(
                1,
                "outer",
                FieldValue::List(vec![
                    FieldRecord::new(2, "inner a", FieldValue::Unsigned(1), 0, 1),
                    FieldRecord::new(3, "inner b", FieldValue::Unsigned(2), 1, 1),
                ]),
                0,
                2,
            ),
            FieldRecord::new(4, "tail", FieldValue::Absent, 2, 0),
        ];
        let mut sink = FlattenSink { lines: Vec::new() };
        walk(&tree, &mut sink);
        assert_eq!(
            sink.lines,
            vec![(0, "outer"), (1, "inner a"), (1, "inner b"), (0, "tail")]
        );
    }

    #[test]
    fn test_records_serialize() {
        let record = FieldRecord::new(0x1f, "TLLI", FieldValue::Unsigned(0xc0000042), 2, 4)
            .with_diagnostic(Diagnostic::UnknownIdentifier(0xff));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"TLLI\""));
        assert!(json.contains("UnknownIdentifier"));
    }
}
