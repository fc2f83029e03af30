//! BSSGP (3GPP TS 48.018) dissector: 1-byte PDU type followed by V/TV/TLV
//! information elements with the 1-or-2-byte Gb length determinant. Covers the
//! unitdata, suspend/resume and BVC management subset; LLC payloads and MS
//! radio access capability blobs are handed off through the capability
//! registry when a sub-dissector is registered.

use num_enum::TryFromPrimitive;

use crate::context::{DecodeContext, LinkDirection};
use crate::cursor::{Cursor, DecodeError};
use crate::field::{DecodeStatus, Diagnostic, DissectOutput, FieldRecord, FieldValue};
use crate::ie::{self, IeDescriptor, IeFormat, IeValue, LengthHint, MessageTable, Presence};
use crate::registry::Registry;

pub const NS_PDUS: &str = "bssgp.pdus";
pub const NS_IES: &str = "bssgp.ies";
pub const NS_CAUSE: &str = "bssgp.cause";
/// Capability handoff point for embedded LLC PDUs.
pub const NS_LLC: &str = "llc";
/// Capability handoff point for MS radio access capability blobs.
pub const NS_RA_CAP: &str = "rrc.ra_cap";

pub const IEI_ALIGNMENT: u32 = 0x00;
pub const IEI_BVCI: u32 = 0x04;
pub const IEI_CAUSE: u32 = 0x07;
pub const IEI_CELL_ID: u32 = 0x08;
pub const IEI_LLC_PDU: u32 = 0x0e;
pub const IEI_MS_RA_CAP: u32 = 0x13;
pub const IEI_PDU_LIFETIME: u32 = 0x16;
pub const IEI_PRIORITY: u32 = 0x17;
pub const IEI_QOS_PROFILE: u32 = 0x18;
pub const IEI_ROUTEING_AREA: u32 = 0x1b;
pub const IEI_SUSPEND_REF: u32 = 0x1d;
pub const IEI_TLLI: u32 = 0x1f;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, TryFromPrimitive)]
pub enum PduType {
    DlUnitdata = 0x00,
    UlUnitdata = 0x01,
    Suspend = 0x0b,
    SuspendAck = 0x0c,
    SuspendNack = 0x0d,
    Resume = 0x0e,
    BvcBlock = 0x20,
    BvcReset = 0x22,
}

const fn mandatory_tlv(id: u32, name: &'static str) -> IeDescriptor {
    IeDescriptor {
        id,
        name,
        presence: Presence::Mandatory,
        format: IeFormat::Tlv,
        length: LengthHint::Variable,
    }
}

const fn optional_tlv(id: u32, name: &'static str) -> IeDescriptor {
    IeDescriptor {
        id,
        name,
        presence: Presence::Optional,
        format: IeFormat::Tlv,
        length: LengthHint::Variable,
    }
}

const fn positional(id: u32, name: &'static str, len: usize) -> IeDescriptor {
    IeDescriptor {
        id,
        name,
        presence: Presence::Mandatory,
        format: IeFormat::V,
        length: LengthHint::Fixed(len),
    }
}

static DL_UNITDATA_IES: &[IeDescriptor] = &[
    positional(IEI_TLLI, "TLLI (current)", 4),
    positional(IEI_QOS_PROFILE, "QoS Profile", 3),
    mandatory_tlv(IEI_PDU_LIFETIME, "PDU Lifetime"),
    optional_tlv(IEI_PRIORITY, "Priority"),
    optional_tlv(IEI_MS_RA_CAP, "MS Radio Access Capability"),
    optional_tlv(IEI_ALIGNMENT, "Alignment Octets"),
    mandatory_tlv(IEI_LLC_PDU, "LLC-PDU"),
];

static UL_UNITDATA_IES: &[IeDescriptor] = &[
    positional(IEI_TLLI, "TLLI", 4),
    positional(IEI_QOS_PROFILE, "QoS Profile", 3),
    mandatory_tlv(IEI_CELL_ID, "Cell Identifier"),
    optional_tlv(IEI_ALIGNMENT, "Alignment Octets"),
    mandatory_tlv(IEI_LLC_PDU, "LLC-PDU"),
];

static SUSPEND_IES: &[IeDescriptor] = &[
    mandatory_tlv(IEI_TLLI, "TLLI"),
    mandatory_tlv(IEI_ROUTEING_AREA, "Routeing Area"),
];

static SUSPEND_ACK_IES: &[IeDescriptor] = &[
    mandatory_tlv(IEI_TLLI, "TLLI"),
    mandatory_tlv(IEI_ROUTEING_AREA, "Routeing Area"),
    mandatory_tlv(IEI_SUSPEND_REF, "Suspend Reference Number"),
];

static SUSPEND_NACK_IES: &[IeDescriptor] = &[
    mandatory_tlv(IEI_TLLI, "TLLI"),
    mandatory_tlv(IEI_ROUTEING_AREA, "Routeing Area"),
    optional_tlv(IEI_CAUSE, "Cause"),
];

static RESUME_IES: &[IeDescriptor] = &[
    mandatory_tlv(IEI_TLLI, "TLLI"),
    mandatory_tlv(IEI_ROUTEING_AREA, "Routeing Area"),
    mandatory_tlv(IEI_SUSPEND_REF, "Suspend Reference Number"),
];

static BVC_BLOCK_IES: &[IeDescriptor] = &[
    mandatory_tlv(IEI_BVCI, "BVCI"),
    mandatory_tlv(IEI_CAUSE, "Cause"),
];

static BVC_RESET_IES: &[IeDescriptor] = &[
    mandatory_tlv(IEI_BVCI, "BVCI"),
    mandatory_tlv(IEI_CAUSE, "Cause"),
    optional_tlv(IEI_CELL_ID, "Cell Identifier"),
];

static DL_UNITDATA_TABLE: MessageTable = MessageTable {
    code: PduType::DlUnitdata as u32,
    name: "DL-UNITDATA",
    direction: LinkDirection::Downlink,
    ies: DL_UNITDATA_IES,
};
static UL_UNITDATA_TABLE: MessageTable = MessageTable {
    code: PduType::UlUnitdata as u32,
    name: "UL-UNITDATA",
    direction: LinkDirection::Uplink,
    ies: UL_UNITDATA_IES,
};
static SUSPEND_TABLE: MessageTable = MessageTable {
    code: PduType::Suspend as u32,
    name: "SUSPEND",
    direction: LinkDirection::Uplink,
    ies: SUSPEND_IES,
};
static SUSPEND_ACK_TABLE: MessageTable = MessageTable {
    code: PduType::SuspendAck as u32,
    name: "SUSPEND-ACK",
    direction: LinkDirection::Downlink,
    ies: SUSPEND_ACK_IES,
};
static SUSPEND_NACK_TABLE: MessageTable = MessageTable {
    code: PduType::SuspendNack as u32,
    name: "SUSPEND-NACK",
    direction: LinkDirection::Downlink,
    ies: SUSPEND_NACK_IES,
};
static RESUME_TABLE: MessageTable = MessageTable {
    code: PduType::Resume as u32,
    name: "RESUME",
    direction: LinkDirection::Uplink,
    ies: RESUME_IES,
};
static BVC_BLOCK_TABLE: MessageTable = MessageTable {
    code: PduType::BvcBlock as u32,
    name: "BVC-BLOCK",
    direction: LinkDirection::Either,
    ies: BVC_BLOCK_IES,
};
static BVC_RESET_TABLE: MessageTable = MessageTable {
    code: PduType::BvcReset as u32,
    name: "BVC-RESET",
    direction: LinkDirection::Either,
    ies: BVC_RESET_IES,
};

pub fn register(registry: &mut Registry) {
    for table in [
        &DL_UNITDATA_TABLE,
        &UL_UNITDATA_TABLE,
        &SUSPEND_TABLE,
        &SUSPEND_ACK_TABLE,
        &SUSPEND_NACK_TABLE,
        &RESUME_TABLE,
        &BVC_BLOCK_TABLE,
        &BVC_RESET_TABLE,
    ] {
        registry.register_table(NS_PDUS, table);
    }

    registry.register_decoder(NS_IES, IEI_TLLI, ie_tlli);
    registry.register_decoder(NS_IES, IEI_ROUTEING_AREA, ie_routeing_area);
    registry.register_decoder(NS_IES, IEI_CELL_ID, ie_cell_id);
    registry.register_decoder(NS_IES, IEI_QOS_PROFILE, ie_qos_profile);
    registry.register_decoder(NS_IES, IEI_BVCI, ie_bvci);
    registry.register_decoder(NS_IES, IEI_PDU_LIFETIME, ie_pdu_lifetime);
    registry.register_decoder(NS_IES, IEI_CAUSE, ie_cause);
    registry.register_decoder(NS_IES, IEI_SUSPEND_REF, ie_suspend_ref);
    registry.register_decoder(NS_IES, IEI_LLC_PDU, ie_llc_pdu);
    registry.register_decoder(NS_IES, IEI_MS_RA_CAP, ie_ms_ra_cap);

    for (value, label) in [
        (0x00, "Processor overload"),
        (0x01, "Equipment failure"),
        (0x02, "Transit network service failure"),
        (0x04, "Unknown MS"),
        (0x05, "BVCI unknown"),
        (0x06, "Cell traffic congestion"),
        (0x07, "SGSN congestion"),
        (0x08, "O&M intervention"),
        (0x09, "BVCI blocked"),
        (0x20, "Semantically incorrect PDU"),
        (0x21, "Invalid mandatory information"),
        (0x22, "Missing mandatory IE"),
        (0x26, "PDU not compatible with the protocol state"),
        (0x27, "Protocol error - unspecified"),
    ] {
        registry.register_label(NS_CAUSE, value, label);
    }
}

/// Dissect one complete BSSGP PDU.
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
    let pdu_type = cur.read_u8()? as u32;
    match ctx.registry.message_table(NS_PDUS, pdu_type) {
        Some(table) => {
            records.push(FieldRecord::new(
                pdu_type,
                "PDU type",
                FieldValue::Text(table.name.to_string()),
                start,
                1,
            ));
            if table.direction != LinkDirection::Either {
                ctx.direction = table.direction;
            }
            let result = ie::decode_tlv_ies(ctx, cur, NS_IES, table);
            records.extend(result.records);
            if let Some(e) = result.abort {
                return Err(e);
            }
        }
        None => {
            records.push(
                FieldRecord::new(
                    pdu_type,
                    "PDU type",
                    FieldValue::Unsigned(pdu_type as u64),
                    start,
                    1,
                )
                .with_diagnostic(Diagnostic::UnknownIdentifier(pdu_type)),
            );
            if !cur.is_empty() {
                let blob_start = cur.abs_pos();
                let rest = cur.read_bytes(cur.remaining())?.to_vec();
                let len = rest.len();
                records.push(FieldRecord::new(
                    pdu_type,
                    "Undissected PDU body",
                    FieldValue::Bytes(rest),
                    blob_start,
                    len,
                ));
            }
        }
    }
    Ok(())
}

/// MCC/MNC from three half-octet-packed bytes (3GPP TS 24.008 §10.5.1.3
/// layout). A 0xF filler in the third MNC digit position means a 2-digit MNC.
pub fn decode_mcc_mnc(cur: &mut Cursor<'_>) -> Result<(u16, u16), DecodeError> {
    let b = cur.read_bytes(3)?;
    let mcc1 = (b[0] & 0x0f) as u16;
    let mcc2 = (b[0] >> 4) as u16;
    let mcc3 = (b[1] & 0x0f) as u16;
    let mnc3 = (b[1] >> 4) as u16;
    let mnc1 = (b[2] & 0x0f) as u16;
    let mnc2 = (b[2] >> 4) as u16;
    let mcc = mcc1 * 100 + mcc2 * 10 + mcc3;
    let mut mnc = mnc1 * 10 + mnc2;
    if mnc3 != 0x0f {
        mnc = mnc * 10 + mnc3;
    }
    Ok((mcc, mnc))
}

/// Routeing area identification body: PLMN + LAC + RAC, as nested records.
fn routeing_area_records(cur: &mut Cursor<'_>) -> Result<Vec<FieldRecord>, DecodeError> {
    let plmn_start = cur.abs_pos();
    let (mcc, mnc) = decode_mcc_mnc(cur)?;
    let lac_start = cur.abs_pos();
    let lac = cur.read_u16_be()?;
    let rac_start = cur.abs_pos();
    let rac = cur.read_u8()?;
    Ok(vec![
        FieldRecord::new(0, "MCC", FieldValue::Unsigned(mcc as u64), plmn_start, 3),
        FieldRecord::new(0, "MNC", FieldValue::Unsigned(mnc as u64), plmn_start, 3),
        FieldRecord::new(0, "LAC", FieldValue::Unsigned(lac as u64), lac_start, 2),
        FieldRecord::new(0, "RAC", FieldValue::Unsigned(rac as u64), rac_start, 1),
    ])
}

fn ie_tlli(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(cur.read_u32_be()? as u64).into())
}

fn ie_routeing_area(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::List(routeing_area_records(cur)?).into())
}

fn ie_cell_id(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let mut fields = routeing_area_records(cur)?;
    let ci_start = cur.abs_pos();
    let ci = cur.read_u16_be()?;
    fields.push(FieldRecord::new(
        0,
        "Cell Identity",
        FieldValue::Unsigned(ci as u64),
        ci_start,
        2,
    ));
    Ok(FieldValue::List(fields).into())
}

const PRECEDENCE_DL: [&str; 5] = [
    "Radio priority 1 (highest)",
    "Radio priority 2",
    "Radio priority 3",
    "Radio priority 4",
    "Radio priority unknown",
];
const PRECEDENCE_UL: [&str; 3] = ["High priority", "Normal priority", "Low priority"];

/// QoS profile: 2-octet peak bit rate plus a flags octet whose 3-bit
/// precedence field reads differently per link direction (TS 48.018 §11.3.28).
fn ie_qos_profile(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let peak_start = cur.abs_pos();
    let peak = cur.read_u16_be()?;
    let flags_start = cur.abs_pos();
    let flags = cur.read_u8()?;
    let precedence = (flags & 0x07) as usize;
    let label = match ctx.direction {
        LinkDirection::Downlink | LinkDirection::Either => {
            PRECEDENCE_DL.get(precedence).copied().unwrap_or("Reserved")
        }
        LinkDirection::Uplink => PRECEDENCE_UL.get(precedence).copied().unwrap_or("Reserved"),
    };
    Ok(FieldValue::List(vec![
        FieldRecord::new(
            0,
            "Peak bit rate (100 bit/s units)",
            FieldValue::Unsigned(peak as u64),
            peak_start,
            2,
        ),
        FieldRecord::new(
            0,
            "Precedence",
            FieldValue::Text(label.to_string()),
            flags_start,
            1,
        ),
    ])
    .into())
}

fn ie_bvci(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(cur.read_u16_be()? as u64).into())
}

fn ie_pdu_lifetime(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(cur.read_u16_be()? as u64).into())
}

fn ie_cause(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let cause = cur.read_u8()? as u32;
    let value = match ctx.registry.value_label(NS_CAUSE, cause) {
        Some(label) => FieldValue::Text(format!("{label} ({cause:#04x})")),
        None => FieldValue::Unsigned(cause as u64),
    };
    Ok(value.into())
}

fn ie_suspend_ref(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(cur.read_u8()? as u64).into())
}

/// Embedded LLC payload: hand off to a registered LLC dissector, otherwise
/// keep the bytes opaque.
fn ie_llc_pdu(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    match ctx.registry.resolve(NS_LLC, 0) {
        Some(decode) => decode(ctx, cur, d),
        None => Ok(FieldValue::Bytes(cur.read_bytes(cur.remaining())?.to_vec()).into()),
    }
}

fn ie_ms_ra_cap(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    match ctx.registry.resolve(NS_RA_CAP, 0) {
        Some(decode) => decode(ctx, cur, d),
        None => Ok(FieldValue::Bytes(cur.read_bytes(cur.remaining())?.to_vec()).into()),
    }
}
