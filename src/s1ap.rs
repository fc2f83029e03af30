//! S1AP (3GPP TS 36.413) dissector: the PER-encoded S1-MME control protocol.
//!
//! The envelope is a three-way CHOICE (InitiatingMessage, SuccessfulOutcome,
//! UnsuccessfulOutcome), each carrying a procedure code, a criticality and an
//! open type holding a ProtocolIE-Container. The same procedure code maps to a
//! different message per outcome, so tables are registered under one namespace
//! per CHOICE arm.
//!
//! S1AP is also where cross-packet state lives: MME-UE-S1AP-ID keys the
//! conversation cache, the NB-IoT Default Paging DRX IE classifies the UE as
//! NB-IoT, and the UE radio capability IE consults that classification to
//! label its opaque blob.

use num_enum::TryFromPrimitive;

use crate::bssgp::decode_mcc_mnc;
use crate::context::{DecodeContext, LinkDirection};
use crate::cursor::{Cursor, DecodeError};
use crate::field::{DecodeStatus, Diagnostic, DissectOutput, FieldRecord, FieldValue};
use crate::ie::{
    self, CRITICALITY_REJECT, IeDescriptor, IeFormat, IeValue, LengthHint, MessageTable, Presence,
};
use crate::per;
use crate::registry::Registry;
use crate::tlv;

pub const NS_PROC_IMSG: &str = "s1ap.proc.imsg";
pub const NS_PROC_SOUT: &str = "s1ap.proc.sout";
pub const NS_PROC_UOUT: &str = "s1ap.proc.uout";
pub const NS_IES: &str = "s1ap.ies";

pub const PROC_INITIAL_CONTEXT_SETUP: u32 = 9;
pub const PROC_PAGING: u32 = 10;
pub const PROC_DOWNLINK_NAS_TRANSPORT: u32 = 11;
pub const PROC_INITIAL_UE_MESSAGE: u32 = 12;
pub const PROC_UPLINK_NAS_TRANSPORT: u32 = 13;
pub const PROC_UE_CONTEXT_RELEASE: u32 = 23;

pub const ID_MME_UE_S1AP_ID: u32 = 0;
pub const ID_CAUSE: u32 = 2;
pub const ID_ENB_UE_S1AP_ID: u32 = 8;
pub const ID_ERAB_TO_BE_SETUP_LIST_CTXT: u32 = 24;
pub const ID_NAS_PDU: u32 = 26;
pub const ID_UE_IDENTITY_INDEX: u32 = 43;
pub const ID_TAI_LIST: u32 = 46;
pub const ID_ERAB_SETUP_LIST_CTXT: u32 = 51;
pub const ID_UE_AGGREGATE_MAX_BITRATE: u32 = 66;
pub const ID_TAI: u32 = 67;
pub const ID_SECURITY_KEY: u32 = 73;
pub const ID_UE_RADIO_CAPABILITY: u32 = 74;
pub const ID_UE_PAGING_ID: u32 = 80;
pub const ID_UE_S1AP_IDS: u32 = 99;
pub const ID_EUTRAN_CGI: u32 = 100;
pub const ID_UE_SECURITY_CAPABILITIES: u32 = 107;
pub const ID_CN_DOMAIN: u32 = 109;
pub const ID_RRC_ESTABLISHMENT_CAUSE: u32 = 134;
pub const ID_NBIOT_DEFAULT_PAGING_DRX: u32 = 234;

/// The outer S1AP-PDU CHOICE arm.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum OutcomeKind {
    InitiatingMessage = 0,
    SuccessfulOutcome = 1,
    UnsuccessfulOutcome = 2,
}

impl OutcomeKind {
    pub fn namespace(self) -> &'static str {
        match self {
            OutcomeKind::InitiatingMessage => NS_PROC_IMSG,
            OutcomeKind::SuccessfulOutcome => NS_PROC_SOUT,
            OutcomeKind::UnsuccessfulOutcome => NS_PROC_UOUT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutcomeKind::InitiatingMessage => "InitiatingMessage",
            OutcomeKind::SuccessfulOutcome => "SuccessfulOutcome",
            OutcomeKind::UnsuccessfulOutcome => "UnsuccessfulOutcome",
        }
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

static INITIAL_UE_MESSAGE_IES: &[IeDescriptor] = &[
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_NAS_PDU, "NAS-PDU", Presence::Mandatory),
    per_ie(ID_TAI, "TAI", Presence::Mandatory),
    per_ie(ID_EUTRAN_CGI, "EUTRAN-CGI", Presence::Mandatory),
    per_ie(
        ID_RRC_ESTABLISHMENT_CAUSE,
        "RRC-Establishment-Cause",
        Presence::Mandatory,
    ),
];

static DOWNLINK_NAS_TRANSPORT_IES: &[IeDescriptor] = &[
    per_ie(ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_NAS_PDU, "NAS-PDU", Presence::Mandatory),
    per_ie(
        ID_NBIOT_DEFAULT_PAGING_DRX,
        "NB-IoT Default Paging DRX",
        Presence::Optional,
    ),
];

static UPLINK_NAS_TRANSPORT_IES: &[IeDescriptor] = &[
    per_ie(ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_NAS_PDU, "NAS-PDU", Presence::Mandatory),
    per_ie(ID_EUTRAN_CGI, "EUTRAN-CGI", Presence::Mandatory),
    per_ie(ID_TAI, "TAI", Presence::Mandatory),
];

static INITIAL_CONTEXT_SETUP_REQUEST_IES: &[IeDescriptor] = &[
    per_ie(ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
    per_ie(
        ID_UE_AGGREGATE_MAX_BITRATE,
        "UEAggregateMaximumBitrate",
        Presence::Mandatory,
    ),
    per_ie(
        ID_ERAB_TO_BE_SETUP_LIST_CTXT,
        "E-RABToBeSetupListCtxtSUReq",
        Presence::Mandatory,
    ),
    per_ie(
        ID_UE_SECURITY_CAPABILITIES,
        "UESecurityCapabilities",
        Presence::Mandatory,
    ),
    per_ie(ID_SECURITY_KEY, "SecurityKey", Presence::Mandatory),
    per_ie(ID_UE_RADIO_CAPABILITY, "UERadioCapability", Presence::Optional),
    per_ie(
        ID_NBIOT_DEFAULT_PAGING_DRX,
        "NB-IoT Default Paging DRX",
        Presence::Optional,
    ),
];

static INITIAL_CONTEXT_SETUP_RESPONSE_IES: &[IeDescriptor] = &[
    per_ie(ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
    per_ie(
        ID_ERAB_SETUP_LIST_CTXT,
        "E-RABSetupListCtxtSURes",
        Presence::Mandatory,
    ),
];

static INITIAL_CONTEXT_SETUP_FAILURE_IES: &[IeDescriptor] = &[
    per_ie(ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_CAUSE, "Cause", Presence::Mandatory),
];

static UE_CONTEXT_RELEASE_COMMAND_IES: &[IeDescriptor] = &[
    per_ie(ID_UE_S1AP_IDS, "UE-S1AP-IDs", Presence::Mandatory),
    per_ie(ID_CAUSE, "Cause", Presence::Mandatory),
];

static UE_CONTEXT_RELEASE_COMPLETE_IES: &[IeDescriptor] = &[
    per_ie(ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID", Presence::Mandatory),
    per_ie(ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID", Presence::Mandatory),
];

static PAGING_IES: &[IeDescriptor] = &[
    per_ie(ID_UE_IDENTITY_INDEX, "UEIdentityIndexValue", Presence::Mandatory),
    per_ie(ID_UE_PAGING_ID, "UEPagingID", Presence::Mandatory),
    per_ie(ID_CN_DOMAIN, "CNDomain", Presence::Mandatory),
    per_ie(ID_TAI_LIST, "TAIList", Presence::Mandatory),
    per_ie(
        ID_NBIOT_DEFAULT_PAGING_DRX,
        "NB-IoT Default Paging DRX",
        Presence::Optional,
    ),
];

static INITIAL_UE_MESSAGE_TABLE: MessageTable = MessageTable {
    code: PROC_INITIAL_UE_MESSAGE,
    name: "InitialUEMessage",
    direction: LinkDirection::Uplink,
    ies: INITIAL_UE_MESSAGE_IES,
};
static DOWNLINK_NAS_TRANSPORT_TABLE: MessageTable = MessageTable {
    code: PROC_DOWNLINK_NAS_TRANSPORT,
    name: "DownlinkNASTransport",
    direction: LinkDirection::Downlink,
    ies: DOWNLINK_NAS_TRANSPORT_IES,
};
static UPLINK_NAS_TRANSPORT_TABLE: MessageTable = MessageTable {
    code: PROC_UPLINK_NAS_TRANSPORT,
    name: "UplinkNASTransport",
    direction: LinkDirection::Uplink,
    ies: UPLINK_NAS_TRANSPORT_IES,
};
static INITIAL_CONTEXT_SETUP_REQUEST_TABLE: MessageTable = MessageTable {
    code: PROC_INITIAL_CONTEXT_SETUP,
    name: "InitialContextSetupRequest",
    direction: LinkDirection::Downlink,
    ies: INITIAL_CONTEXT_SETUP_REQUEST_IES,
};
static INITIAL_CONTEXT_SETUP_RESPONSE_TABLE: MessageTable = MessageTable {
    code: PROC_INITIAL_CONTEXT_SETUP,
    name: "InitialContextSetupResponse",
    direction: LinkDirection::Uplink,
    ies: INITIAL_CONTEXT_SETUP_RESPONSE_IES,
};
static INITIAL_CONTEXT_SETUP_FAILURE_TABLE: MessageTable = MessageTable {
    code: PROC_INITIAL_CONTEXT_SETUP,
    name: "InitialContextSetupFailure",
    direction: LinkDirection::Uplink,
    ies: INITIAL_CONTEXT_SETUP_FAILURE_IES,
};
static UE_CONTEXT_RELEASE_COMMAND_TABLE: MessageTable = MessageTable {
    code: PROC_UE_CONTEXT_RELEASE,
    name: "UEContextReleaseCommand",
    direction: LinkDirection::Downlink,
    ies: UE_CONTEXT_RELEASE_COMMAND_IES,
};
static UE_CONTEXT_RELEASE_COMPLETE_TABLE: MessageTable = MessageTable {
    code: PROC_UE_CONTEXT_RELEASE,
    name: "UEContextReleaseComplete",
    direction: LinkDirection::Uplink,
    ies: UE_CONTEXT_RELEASE_COMPLETE_IES,
};
static PAGING_TABLE: MessageTable = MessageTable {
    code: PROC_PAGING,
    name: "Paging",
    direction: LinkDirection::Downlink,
    ies: PAGING_IES,
};

pub fn register(registry: &mut Registry) {
    for table in [
        &INITIAL_UE_MESSAGE_TABLE,
        &DOWNLINK_NAS_TRANSPORT_TABLE,
        &UPLINK_NAS_TRANSPORT_TABLE,
        &INITIAL_CONTEXT_SETUP_REQUEST_TABLE,
        &UE_CONTEXT_RELEASE_COMMAND_TABLE,
        &PAGING_TABLE,
    ] {
        registry.register_table(NS_PROC_IMSG, table);
    }
    for table in [
        &INITIAL_CONTEXT_SETUP_RESPONSE_TABLE,
        &UE_CONTEXT_RELEASE_COMPLETE_TABLE,
    ] {
        registry.register_table(NS_PROC_SOUT, table);
    }
    registry.register_table(NS_PROC_UOUT, &INITIAL_CONTEXT_SETUP_FAILURE_TABLE);

    registry.register_decoder(NS_IES, ID_MME_UE_S1AP_ID, ie_mme_ue_s1ap_id);
    registry.register_decoder(NS_IES, ID_ENB_UE_S1AP_ID, ie_enb_ue_s1ap_id);
    registry.register_decoder(NS_IES, ID_NAS_PDU, ie_nas_pdu);
    registry.register_decoder(NS_IES, ID_TAI, ie_tai);
    registry.register_decoder(NS_IES, ID_EUTRAN_CGI, ie_eutran_cgi);
    registry.register_decoder(NS_IES, ID_CAUSE, ie_cause);
    registry.register_decoder(NS_IES, ID_RRC_ESTABLISHMENT_CAUSE, ie_rrc_establishment_cause);
    registry.register_decoder(NS_IES, ID_UE_IDENTITY_INDEX, ie_ue_identity_index);
    registry.register_decoder(NS_IES, ID_UE_PAGING_ID, ie_ue_paging_id);
    registry.register_decoder(NS_IES, ID_CN_DOMAIN, ie_cn_domain);
    registry.register_decoder(NS_IES, ID_UE_RADIO_CAPABILITY, ie_ue_radio_capability);
    registry.register_decoder(NS_IES, ID_NBIOT_DEFAULT_PAGING_DRX, ie_nbiot_default_paging_drx);

    // fallback names for IEs that show up in a message that does not list them
    for (id, label) in [
        (ID_MME_UE_S1AP_ID, "MME-UE-S1AP-ID"),
        (ID_CAUSE, "Cause"),
        (ID_ENB_UE_S1AP_ID, "eNB-UE-S1AP-ID"),
        (ID_ERAB_TO_BE_SETUP_LIST_CTXT, "E-RABToBeSetupListCtxtSUReq"),
        (ID_NAS_PDU, "NAS-PDU"),
        (ID_UE_IDENTITY_INDEX, "UEIdentityIndexValue"),
        (ID_TAI_LIST, "TAIList"),
        (ID_ERAB_SETUP_LIST_CTXT, "E-RABSetupListCtxtSURes"),
        (ID_UE_AGGREGATE_MAX_BITRATE, "UEAggregateMaximumBitrate"),
        (ID_TAI, "TAI"),
        (ID_SECURITY_KEY, "SecurityKey"),
        (ID_UE_RADIO_CAPABILITY, "UERadioCapability"),
        (ID_UE_PAGING_ID, "UEPagingID"),
        (ID_UE_S1AP_IDS, "UE-S1AP-IDs"),
        (ID_EUTRAN_CGI, "EUTRAN-CGI"),
        (ID_UE_SECURITY_CAPABILITIES, "UESecurityCapabilities"),
        (ID_CN_DOMAIN, "CNDomain"),
        (ID_RRC_ESTABLISHMENT_CAUSE, "RRC-Establishment-Cause"),
        (ID_NBIOT_DEFAULT_PAGING_DRX, "NB-IoT Default Paging DRX"),
    ] {
        registry.register_label(NS_IES, id, label);
    }
}

fn criticality_label(criticality: u64) -> &'static str {
    match criticality {
        ie::CRITICALITY_REJECT => "reject",
        ie::CRITICALITY_IGNORE => "ignore",
        ie::CRITICALITY_NOTIFY => "notify",
        _ => "reserved",
    }
}

/// Dissect one complete S1AP-PDU.
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

    match ctx.registry.message_table(kind.namespace(), code) {
        Some(table) => {
            records.push(FieldRecord::new(
                code,
                table.name,
                FieldValue::Text(format!("{} procedure {code}", kind.label())),
                start,
                header_len,
            ));
            records.push(FieldRecord::new(
                code,
                "Procedure criticality",
                FieldValue::Text(criticality_label(criticality).to_string()),
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

fn ie_mme_ue_s1ap_id(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let id = per::read_constrained_int(cur, 0, u32::MAX as u64)?;
    ctx.ue_id = Some(id);
    Ok(FieldValue::Unsigned(id).into())
}

fn ie_enb_ue_s1ap_id(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Unsigned(per::read_constrained_int(cur, 0, 0x00ff_ffff)?).into())
}

fn ie_nas_pdu(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    Ok(FieldValue::Bytes(per::read_octet_string(cur, None)?.to_vec()).into())
}

fn ie_tai(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let plmn_start = cur.abs_pos();
    let (mcc, mnc) = decode_mcc_mnc(cur)?;
    let tac_start = cur.abs_pos();
    let tac = cur.read_u16_be()?;
    Ok(FieldValue::List(vec![
        FieldRecord::new(0, "MCC", FieldValue::Unsigned(mcc as u64), plmn_start, 3),
        FieldRecord::new(0, "MNC", FieldValue::Unsigned(mnc as u64), plmn_start, 3),
        FieldRecord::new(0, "TAC", FieldValue::Unsigned(tac as u64), tac_start, 2),
    ])
    .into())
}

fn ie_eutran_cgi(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let plmn_start = cur.abs_pos();
    let (mcc, mnc) = decode_mcc_mnc(cur)?;
    let cell_start = cur.abs_pos();
    let (cell_id, _) = per::read_bit_string(cur, Some(28))?;
    Ok(FieldValue::List(vec![
        FieldRecord::new(0, "MCC", FieldValue::Unsigned(mcc as u64), plmn_start, 3),
        FieldRecord::new(0, "MNC", FieldValue::Unsigned(mnc as u64), plmn_start, 3),
        FieldRecord::new(0, "Cell Identity", FieldValue::Unsigned(cell_id), cell_start, 4),
    ])
    .into())
}

const CAUSE_GROUPS: [&str; 5] = [
    "Radio network layer",
    "Transport layer",
    "NAS",
    "Protocol",
    "Miscellaneous",
];

/// Cause: a five-way CHOICE of cause groups, each wrapping a small
/// enumeration carried here as one octet.
fn ie_cause(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let _ext = cur.read_bits(1)?;
    let group = cur.read_bits(3)? as usize;
    let value = per::read_constrained_int(cur, 0, 255)?;
    let label = CAUSE_GROUPS.get(group).copied().unwrap_or("Reserved");
    Ok(FieldValue::Text(format!("{label} cause {value}")).into())
}

const RRC_CAUSES: [&str; 5] = [
    "emergency",
    "highPriorityAccess",
    "mt-Access",
    "mo-Signalling",
    "mo-Data",
];

fn ie_rrc_establishment_cause(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let ext = cur.read_bits(1)?;
    let index = cur.read_bits(3)? as usize;
    let label = if ext != 0 {
        "extended value"
    } else {
        RRC_CAUSES.get(index).copied().unwrap_or("reserved")
    };
    Ok(FieldValue::Text(label.to_string()).into())
}

fn ie_ue_identity_index(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let (index, _) = per::read_bit_string(cur, Some(10))?;
    Ok(FieldValue::Unsigned(index).into())
}

/// UEPagingID: CHOICE { s-TMSI { mMEC, m-TMSI }, iMSI }.
fn ie_ue_paging_id(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let _ext = cur.read_bits(1)?;
    let choice = cur.read_bits(1)?;
    if choice == 0 {
        let mmec_start = cur.abs_pos();
        let mmec = cur.read_bits(8)? as u64;
        let tmsi_start = cur.abs_pos();
        let tmsi = cur.read_bits(32)? as u64;
        Ok(FieldValue::List(vec![
            FieldRecord::new(0, "MMEC", FieldValue::Unsigned(mmec), mmec_start, 1),
            FieldRecord::new(0, "M-TMSI", FieldValue::Unsigned(tmsi), tmsi_start, 4),
        ])
        .into())
    } else {
        let digits = per::read_octet_string(cur, None)?;
        Ok(FieldValue::Text(tlv::bcd_digits(digits, false)).into())
    }
}

fn ie_cn_domain(
    _ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let domain = cur.read_bits(1)?;
    let label = if domain == 0 { "PS" } else { "CS" };
    Ok(FieldValue::Text(label.to_string()).into())
}

/// UE radio capability blob: opaque here, but labeled via the conversation
/// cache so NB-IoT capability containers are not presented as E-UTRA ones.
fn ie_ue_radio_capability(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let blob = per::read_octet_string(cur, None)?.to_vec();
    let len = blob.len();
    let start = cur.abs_pos() - len;
    let classification = ctx
        .ue_id
        .and_then(|ue| ctx.conversations.and_then(|cache| cache.is_nbiot(ue)));
    let name = match classification {
        Some(true) => "UE radio capability (NB-IoT)",
        Some(false) => "UE radio capability (E-UTRA)",
        None => "UE radio capability",
    };
    Ok(FieldValue::List(vec![FieldRecord::new(
        0,
        name,
        FieldValue::Bytes(blob),
        start,
        len,
    )])
    .into())
}

/// NB-IoT Default Paging DRX. Its presence is what classifies the UE as
/// NB-IoT for the rest of the conversation.
fn ie_nbiot_default_paging_drx(
    ctx: &mut DecodeContext<'_>,
    cur: &mut Cursor<'_>,
    _d: &IeDescriptor,
) -> Result<IeValue, DecodeError> {
    let _ext = cur.read_bits(1)?;
    let index = cur.read_bits(2)?;
    if let (Some(ue), Some(cache)) = (ctx.ue_id, ctx.conversations) {
        cache.classify(ue, ctx.packet_number, true);
    }
    let cycle = 128u64 << index;
    Ok(FieldValue::Text(format!("{cycle} radio frames")).into())
}
