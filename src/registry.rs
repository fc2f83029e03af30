//! Capability dispatch: the process-wide mapping from (namespace, numeric id)
//! to decoder functions, message tables, and value labels. Populated once at
//! startup by each protocol module's `register` function, read-only (and
//! therefore safe to share across decode threads) afterwards. A missing entry
//! is "not found", never an error -- callers fall back to opaque byte records.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use crate::ie::{IeDecoderFn, MessageTable};

#[derive(Default)]
pub struct Registry {
    decoders: HashMap<(&'static str, u32), IeDecoderFn>,
    tables: HashMap<(&'static str, u32), &'static MessageTable>,
    labels: HashMap<(&'static str, u32), &'static str>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every protocol in this crate registered.
    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        crate::bssgp::register(&mut registry);
        crate::s1ap::register(&mut registry);
        crate::sbcap::register(&mut registry);
        crate::rk512::register(&mut registry);
        registry
    }

    pub fn register_decoder(&mut self, namespace: &'static str, id: u32, decoder: IeDecoderFn) {
        let prev = self.decoders.insert((namespace, id), decoder);
        debug_assert!(prev.is_none(), "duplicate decoder for {namespace}/{id:#x}");
        debug!("registered decoder {namespace}/{id:#x}");
    }

    pub fn register_table(&mut self, namespace: &'static str, table: &'static MessageTable) {
        let prev = self.tables.insert((namespace, table.code), table);
        debug_assert!(
            prev.is_none(),
            "duplicate table for {namespace}/{:#x}",
            table.code
        );
    }

    pub fn register_label(&mut self, namespace: &'static str, id: u32, label: &'static str) {
        self.labels.insert((namespace, id), label);
    }

    pub fn resolve(&self, namespace: &'static str, id: u32) -> Option<IeDecoderFn> {
        self.decoders.get(&(namespace, id)).copied()
    }

    pub fn message_table(&self, namespace: &'static str, code: u32) -> Option<&'static MessageTable> {
        self.tables.get(&(namespace, code)).copied()
    }

    pub fn value_label(&self, namespace: &'static str, id: u32) -> Option<&'static str> {
        self.labels.get(&(namespace, id)).copied()
    }
}

/// The shared process-wide registry, built on first use.
pub fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecodeContext;
    use crate::cursor::{Cursor, DecodeError};
    use crate::field::FieldValue;
    use crate::ie::{IeDescriptor, IeValue};

    fn nop(
        _ctx: &mut DecodeContext<'_>,
        _cur: &mut Cursor<'_>,
        _d: &IeDescriptor,
    ) -> Result<IeValue, DecodeError> {
        Ok(FieldValue::Absent.into())
    }

    #[test]
    fn test_resolve_unregistered_is_none() {
        let registry = Registry::new();
        assert!(registry.resolve("nowhere", 1).is_none());
        assert!(registry.message_table("nowhere", 1).is_none());
        assert!(registry.value_label("nowhere", 1).is_none());
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = Registry::new();
        registry.register_decoder("t.ies", 7, nop);
        registry.register_label("t.ies", 7, "seven");
        assert!(registry.resolve("t.ies", 7).is_some());
        assert!(registry.resolve("t.ies", 8).is_none());
        assert_eq!(registry.value_label("t.ies", 7), Some("seven"));
    }

    #[test]
    fn test_global_registry_has_builtin_protocols() {
        let registry = global();
        assert!(
            registry
                .message_table(crate::bssgp::NS_PDUS, 0x0b)
                .is_some()
        );
        assert!(
            registry
                .message_table(crate::s1ap::NS_PROC_IMSG, 12)
                .is_some()
        );
    }
}
