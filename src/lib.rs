//! Telecom signalling dissectors (BSSGP, S1AP, SBC-AP, RK512) built on a
//! shared table-driven IE decode engine. Decoding is best-effort: malformed
//! input produces diagnostic-annotated partial trees, never a panic, and only
//! an undeterminable structure stops a message early.

pub mod bssgp;
pub mod context;
pub mod cursor;
pub mod field;
pub mod ie;
pub mod per;
pub mod registry;
pub mod rk512;
pub mod s1ap;
pub mod sbcap;
pub mod tlv;
