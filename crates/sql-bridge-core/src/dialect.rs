//! Dialect abstraction.
//!
//! The generator owns all formatting decisions (ordering, commas, spaces);
//! the dialect only answers syntactic questions: identifier quoting,
//! placeholder markers, LIMIT/OFFSET shape, inline value rendering and the
//! parameter sink for the backend's wire format.

use std::any::Any;

use sql_bridge_common::Result;

use crate::value::FieldValue;

/// Per-backend syntax strategy.
pub trait SqlDialect: Send + Sync {
    /// Appends `name` to `out`, escaped per dialect rules.
    fn quote_identifier(&self, out: &mut String, name: &str);

    /// Appends the placeholder marker for a 1-based parameter index.
    fn placeholder(&self, out: &mut String, index: usize);

    /// Returns the LIMIT/OFFSET clause fragment; either side may be zero
    /// and is then omitted.
    fn limit_clause(&self, count: u64, offset: u64) -> String;

    /// Appends an inline rendering of `value`, escaping strings and bytes.
    fn format_value(&self, out: &mut String, value: &FieldValue);

    /// Opens a fresh parameter accumulator for one compilation.
    fn make_param_sink(&self) -> Box<dyn ParamSink>;

    // Feature flags
    fn supports_returning(&self) -> bool {
        false
    }

    fn supports_cte(&self) -> bool {
        true
    }

    fn supports_window_functions(&self) -> bool {
        true
    }

    fn supports_lateral_joins(&self) -> bool {
        false
    }
}

/// Per-compile accumulator converting field values into the backend's
/// parameter packet.
pub trait ParamSink {
    /// Binds one value; returns the new parameter count, which is also the
    /// 1-based placeholder index of the value just pushed.
    fn push(&mut self, value: &FieldValue) -> Result<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finalizes the accumulated values into an opaque packet.
    fn into_packet(self: Box<Self>) -> ParamPacket;
}

/// Opaque, backend-tagged parameter packet.
///
/// The packet's shape is known only to the dialect that produced it; the
/// matching executor recovers it with [`ParamPacket::downcast_ref`], which
/// checks the backend tag before downcasting.
pub struct ParamPacket {
    backend: &'static str,
    count: usize,
    inner: Box<dyn Any + Send + Sync>,
}

impl ParamPacket {
    pub fn new(backend: &'static str, count: usize, inner: Box<dyn Any + Send + Sync>) -> Self {
        ParamPacket {
            backend,
            count,
            inner,
        }
    }

    /// Packet with no parameters, produced by inline-mode compilation.
    pub fn empty() -> Self {
        ParamPacket {
            backend: "none",
            count: 0,
            inner: Box::new(()),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Recovers the concrete packet, asserting the backend kind.
    pub fn downcast_ref<T: 'static>(&self, backend: &str) -> Option<&T> {
        if self.backend != backend {
            return None;
        }
        self.inner.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for ParamPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamPacket")
            .field("backend", &self.backend)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_packet() {
        let packet = ParamPacket::empty();
        assert_eq!(packet.backend(), "none");
        assert_eq!(packet.len(), 0);
        assert!(packet.is_empty());
    }

    #[test]
    fn test_downcast_checks_tag() {
        let packet = ParamPacket::new("TestBackend", 1, Box::new(vec![1u8, 2, 3]));
        assert!(packet.downcast_ref::<Vec<u8>>("OtherBackend").is_none());
        assert!(packet.downcast_ref::<Vec<u8>>("TestBackend").is_some());
        // Right tag, wrong type
        assert!(packet.downcast_ref::<String>("TestBackend").is_none());
    }
}
