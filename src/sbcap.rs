//! SBC-AP (3GPP TS 29.168) dissector: the MME side of the public warning
//! system. Same PER envelope family as S1AP (CHOICE arm, procedure code,
//! criticality, open type around a ProtocolIE-Container), so the envelope and
//! container engines are shared; only the tables and value decoders are
//! SBC-AP's own.

use crate::context::{DecodeContext, LinkDirection};
use crate::cursor::{Cursor, DecodeError};
use crate::field::{DecodeStatus, Diagnostic, DissectOutput, FieldRecord, FieldValue};
use crate::ie::{
    self, CRITICALITY_REJECT, IeDescriptor, IeFormat, IeValue, LengthHint, MessageTable, Presence,
};
use crate::per;
use crate::registry::Registry;
use crate::s1ap::OutcomeKind;

pub const NS_PROC_IMSG: &str = "sbcap.proc.imsg";
pub const NS_PROC_SOUT: &str = "sbcap.proc.sout";
pub const NS_PROC_UOUT: &str = "sbcap.proc.uout";
pub const NS_IES: &str = "sbcap.ies";
pub const NS_CAUSE: &str = "sbcap.cause";

pub const PROC_WRITE_REPLACE_WARNING: u32 = 0;
pub const PROC_STOP_WARNING: u32 = 1;

pub const ID_CAUSE: u32 = 1;
pub const ID_CRITICALITY_DIAGNOSTICS: u32 = 2;
pub const ID_DATA_CODING_SCHEME: u32 = 3;
pub const ID_MESSAGE_IDENTIFIER: u32 = 5;
pub const ID_NUMBER_OF_BROADCASTS: u32 = 7;
pub const ID_REPETITION_PERIOD: u32 = 10;
pub const ID_SERIAL_NUMBER: u32 = 11;
pub const ID_WARNING_AREA_LIST: u32 = 15;
pub const ID_WARNING_MESSAGE_CONTENT: u32 = 16;
pub const ID_WARNING_TYPE: u32 = 18;

/// CBS warning messages carry at most 15 pages (TS 23.041).
pub const MAX_WARNING_PAGES: u64 = 15;

fn namespace(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::InitiatingMessage => NS_PROC_IMSG,
        OutcomeKind::SuccessfulOutcome => NS_PROC_SOUT,
        OutcomeKind::UnsuccessfulOutcome => NS_PROC_UOUT,
    }
}

const fn per_ie(id: u32, name: &'static str, presence: Presence) -> IeDescriptor {
    IeDescriptor {
        id,
        name,
        presence,
        format: IeFormat::Tlv,
        length: LengthHint::Variable,
    }
}

static WRITE_REPLACE_WARNING_REQUEST_IES: &[IeDescriptor] = &[
    per_ie(ID_MESSAGE_IDENTIFIER, "Message-Identifier", Presence::Mandatory),
    per_ie(ID_SERIAL_NUMBER, "Serial-Number", Presence::Mandatory),
    per_ie(ID_WARNING_AREA_LIST, "Warning-Area-List", Presence::Optional),
    per_ie(ID_REPETITION_PERIOD, "Repetition-Period", Presence::Mandatory),
    per_ie(
        ID_NUMBER_OF_BROADCASTS,
        "Number-of-Broadcasts-Requested",
        Presence::Mandatory,
    ),
    per_ie(ID_WARNING_TYPE, "Warning-Type", Presence::Optional),
    per_ie(ID_DATA_CODING_SCHEME, "Data-Coding-Scheme", Presence::Optional),
    per_ie(
        ID_WARNING_MESSAGE_CONTENT,
        "Warning-Message-Content",
        Presence::Optional,
    ),
];

static WRITE_REPLACE_WARNING_RESPONSE_IES: &[IeDescriptor] = &[
    per_ie(ID_MESSAGE_IDENTIFIER, "Message-Identifier", Presence::Mandatory),
    per_ie(ID_SERIAL_NUMBER, "Serial-Number", Presence::Mandatory),
    per_ie(ID_CAUSE, "Cause", Presence::Mandatory),
    per_ie(
        ID_CRITICALITY_DIAGNOSTICS,
        "Criticality-Diagnostics",
        Presence::Optional,
    ),
];

static STOP_WARNING_REQUEST_IES: &[IeDescriptor] = &[
    per_ie(ID_MESSAGE_IDENTIFIER, "Message-Identifier", Presence::Mandatory),
    per_ie(ID_SERIAL_NUMBER, "Serial-Number", Presence::Mandatory),
    per_ie(ID_WARNING_AREA_LIST, "Warning-Area-List", Presence::Optional),
];

static STOP_WARNING_RESPONSE_IES: &[IeDescriptor] = &[
    per_ie(ID_MESSAGE_IDENTIFIER, "Message-Identifier", Presence::Mandatory),
    per_ie(ID_SERIAL_NUMBER, "Serial-Number", Presence::Mandatory),
    per_ie(ID_CAUSE, "Cause", Presence::Mandatory),
    per_ie(
        ID_CRITICALITY_DIAGNOSTICS,
        "Criticality-Diagnostics",
        Presence::Optional,
    ),
];

static WRITE_REPLACE_WARNING_REQUEST_TABLE: MessageTable = MessageTable {
    code: PROC_WRITE_REPLACE_WARNING,
    name: "Write-Replace-Warning-Request",
    direction: LinkDirection::Downlink,
    ies: WRITE_REPLACE_WARNING_REQUEST_IES,
};
static WRITE_REPLACE_WARNING_RESPONSE_TABLE: MessageTable = MessageTable {
    code: PROC_WRITE_REPLACE_WARNING,
    name: "Write-Replace-Warning-Response",
    direction: LinkDirection::Uplink,
    ies: WRITE_REPLACE_WARNING_RESPONSE_IES,
};
static STOP_WARNING_REQUEST_TABLE: MessageTable = MessageTable {
    code: PROC_STOP_WARNING,
    name: "Stop-Warning-Request",
    direction: LinkDirection::Downlink,
    ies: STOP_WARNING_REQUEST_IES,
};
static STOP_WARNING_RESPONSE_TABLE: MessageTable = MessageTable {
    code: PROC_STOP_WARNING,
    name: "Stop-Warning-Response",
    direction: LinkDirection::Uplink,
    ies: STOP_WARNING_RESPONSE_IES,
};

pub fn register(registry: &mut Registry) {
    registry.register_table(NS_PROC_IMSG, &WRITE_REPLACE_WARNING_REQUEST_TABLE);
    registry.register_table(NS_PROC_IMSG, &STOP_WARNING_REQUEST_TABLE);
    registry.register_table(NS_PROC_SOUT, &WRITE_REPLACE_WARNING_RESPONSE_TABLE);
    registry.register_table(NS_PROC_SOUT, &STOP_WARNING_RESPONSE_TABLE);

    registry.register_decoder(NS_IES, ID_MESSAGE_IDENTIFIER, ie_message_identifier);
    registry.register_decoder(NS_IES, ID_SERIAL_NUMBER, ie_serial_number);
    registry.register_decoder(NS_IES, ID_REPETITION_PERIOD, ie_repetition_period);
    registry.register_decoder(NS_IES, ID_NUMBER_OF_BROADCASTS, ie_number_of_broadcasts);
    registry.register_decoder(NS_IES, ID_WARNING_TYPE, ie_warning_type);
    registry.register_decoder(NS_IES, ID_DATA_CODING_SCHEME, ie_data_coding_scheme);
    registry.register_decoder(NS_IES, ID_WARNING_MESSAGE_CONTENT, ie_warning_message_content);
    registry.register_decoder(NS_IES, ID_CAUSE, ie_cause);

    for (id, label) in [
        (ID_CAUSE, "Cause"),
        (ID_CRITICALITY_DIAGNOSTICS, "Criticality-Diagnostics"),
        (ID_DATA_CODING_SCHEME, "Data-Coding-Scheme"),
        (ID_MESSAGE_IDENTIFIER, "Message-Identifier"),
        (ID_NUMBER_OF_BROADCASTS, "Number-of-Broadcasts-Requested"),
        (ID_REPETITION_PERIOD, "Repetition-Period"),
        (ID_SERIAL_NUMBER, "Serial-Number"),
        (ID_WARNING_AREA_LIST, "Warning-Area-List"),
        (ID_WARNING_MESSAGE_CONTENT, "Warning-Message-Content"),
        (ID_WARNING_TYPE, "Warning-Type"),
    ] {
        registry.register_label(NS_IES, id, label);
    }

    for (value, label) in [
        (0, "Message accepted"),
        (1, "Parameter not recognised"),
        (2, "Parameter value invalid"),
        (3, "Valid message not identified"),
        (4, "Tracking area not valid"),
        (5, "Unrecognised message"),
        (6, "Missing mandatory element"),
        (7, "MME capacity exceeded"),
        (8, "MME memory exceeded"),
        (9, "Warning broadcast not supported"),
        (10, "Warning broadcast not operational"),
        (11, "Message reference already used"),
        (12, "Unspecified error"),
        (13, "Transfer syntax error"),
        (14, "Semantic error"),
        (15, "Message not compatible with receiver state"),
        (16, "Abstract syntax error (reject)"),
    ] {
        registry.register_label(NS_CAUSE, value, label);
    }
}

/// Dissect one complete SBC-AP PDU.
pub fn dissect(data: &[u8], ctx: &mut DecodeContext<'_>) -> DissectOutput {
    let mut cur = Cursor::new(data);
    let mut records = Vec::new();
    let status = match dissect_inner(ctx, &mut cur, &mut records) {
        Ok(()) => DecodeStatus::Complete,
        Err(e) => DecodeStatus::Aborted(e),
    };
    DissectOutput {
        records,
        status,
        consumed: cur.pos(),
    }
}

fn dissect_inner(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    records: &mut Vec<FieldRecord>,
) -> Result<(), DecodeError> {
    let start = cur.abs_pos();
    let ext = cur.read_bits(1)?;
    if ext != 0 {
        return Err(DecodeError::Framing(
            "extension alternative in outer PDU choice".into(),
        ));
    }
    let kind_raw = cur.read_bits(2)? as u8;
    let kind = OutcomeKind::try_from(kind_raw)
        .map_err(|_| DecodeError::Framing(format!("reserved PDU choice index {kind_raw}")))?;
    let code = per::read_constrained_int(cur, 0, 255)? as u32;
    let criticality = per::read_constrained_int(cur, 0, 2)?;
    let header_len = (cur.abs_pos() - start).max(1);

    match ctx.registry.message_table(namespace(kind), code) {
        Some(table) => {
            records.push(FieldRecord::new(
                code,
                table.name,
                FieldValue::Text(format!("{} procedure {code}", kind.label())),
                start,
                header_len,
            ));
            ctx.direction = table.direction;
            let mut body = per::read_open_type(cur)?;
            let result = ie::decode_per_ie_container(ctx, &mut body, NS_IES, table);
            records.extend(result.records);
            if let Some(e) = result.abort {
                return Err(e);
            }
        }
        None => {
            let mut record = FieldRecord::new(
                code,
                "Unknown procedure",
                FieldValue::Text(format!("{} procedure {code}", kind.label())),
                start,
                header_len,
            )
            .with_diagnostic(Diagnostic::UnknownIdentifier(code));
            if criticality == CRITICALITY_REJECT {
                record.push_diagnostic(Diagnostic::RejectCriticality);
            }
            records.push(record);
            let mut body = per::read_open_type(cur)?;
            let blob_start = body.abs_pos();
            let rest = body.read_bytes(body.remaining())?.to_vec();
            let len = rest.len();
            records.push(FieldRecord::new(
                code,
                "Undissected procedure body",
                FieldValue::Bytes(rest),
                blob_start,
                len,
            ));
        }
    }
    Ok(())
}

fn ie_message_identifier(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let (id, _) = per::read_bit_string(cur, Some(16))?;
    Ok(FieldValue::Unsigned(id).into())
}

/// CBS serial number: geographical scope (2 bits), message code (10 bits),
/// update number (4 bits) packed into 16 bits.
fn ie_serial_number(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let start = cur.abs_pos();
    let (raw, _) = per::read_bit_string(cur, Some(16))?;
    let scope = raw >> 14;
    let message_code = (raw >> 4) & 0x3ff;
    let update = raw & 0x0f;
    Ok(FieldValue::List(vec![
        FieldRecord::new(0, "Geographical scope", FieldValue::Unsigned(scope), start, 2),
        FieldRecord::new(0, "Message code", FieldValue::Unsigned(message_code), start, 2),
        FieldRecord::new(0, "Update number", FieldValue::Unsigned(update), start, 2),
    ])
    .into())
}

fn ie_repetition_period(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(per::read_constrained_int(cur, 0, 4095)?).into())
}

fn ie_number_of_broadcasts(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(per::read_constrained_int(cur, 0, 65535)?).into())
}

const WARNING_TYPES: [&str; 5] = [
    "Earthquake",
    "Tsunami",
    "Earthquake and tsunami",
    "Test",
    "Other",
];

/// Warning type: 7-bit value plus emergency-user-alert and popup flags in two
/// octets (TS 23.041 §9.3.24).
fn ie_warning_type(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let start = cur.abs_pos();
    let raw = cur.read_u16_be()?;
    let value = (raw >> 9) as usize;
    let label = WARNING_TYPES.get(value).copied().unwrap_or("Reserved");
    Ok(FieldValue::List(vec![
        FieldRecord::new(0, "Warning type", FieldValue::Text(label.to_string()), start, 2),
        FieldRecord::new(
            0,
            "Emergency user alert",
            FieldValue::Bool(raw & 0x0100 != 0),
            start,
            2,
        ),
        FieldRecord::new(0, "Popup", FieldValue::Bool(raw & 0x0080 != 0), start, 2),
    ])
    .into())
}

fn ie_data_coding_scheme(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let (dcs, _) = per::read_bit_string(cur, Some(8))?;
    Ok(FieldValue::Unsigned(dcs).into())
}

/// Warning message content: a page count followed by CBS page data. Counts
/// above the CBS maximum are clamped and flagged, not fatal.
fn ie_warning_message_content(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let content = per::read_octet_string(cur, None)?;
    let end = cur.abs_pos();
    let content_start = end - content.len();
    if content.is_empty() {
        return Err(DecodeError::OutOfBounds {
            offset: end,
            needed: 1,
            available: 0,
        });
    }
    let mut diagnostics = Vec::new();
    let mut pages = content[0] as u64;
    if pages > MAX_WARNING_PAGES {
        diagnostics.push(Diagnostic::ValueOutOfRange {
            value: pages,
            min: 0,
            max: MAX_WARNING_PAGES,
        });
        pages = MAX_WARNING_PAGES;
    }
    let data = content[1..].to_vec();
    let data_len = data.len();
    Ok(IeValue {
        value: FieldValue::List(vec![
            FieldRecord::new(0, "Number of pages", FieldValue::Unsigned(pages), content_start, 1),
            FieldRecord::new(
                0,
                "CB data",
                FieldValue::Bytes(data),
                content_start + 1,
                data_len,
            ),
        ]),
        diagnostics,
    })
}

fn ie_cause(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let cause = per::read_constrained_int(cur, 0, 255)?;
    let value = match ctx.registry.value_label(NS_CAUSE, cause as u32) {
        Some(label) => FieldValue::Text(format!("{label} ({cause})")),
        None => FieldValue::Unsigned(cause),
    };
    Ok(value.into())
}
