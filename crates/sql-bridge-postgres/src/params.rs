//! Binary parameter encoding for the PostgreSQL wire protocol.
//!
//! A [`PgParams`] packet keeps four parallel arrays — value slices, lengths,
//! formats and OIDs — over a single owned byte buffer, mirroring what the
//! extended-protocol Bind message needs. All multi-byte scalars are encoded
//! big-endian.

use bytes::BytesMut;
use postgres_types::{to_sql_checked, IsNull, Kind, ToSql, Type};

use sql_bridge_common::Result;
use sql_bridge_core::dialect::{ParamPacket, ParamSink};
use sql_bridge_core::value::FieldValue;

/// Backend tag carried by every packet this sink produces.
pub const POSTGRES_BACKEND: &str = "PostgreSQL";

/// PostgreSQL type OIDs used by the encoder and the result decoders.
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const BYTEA: u32 = 17;
    pub const CHAR: u32 = 18;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const TEXT: u32 = 25;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
}

/// Wire format codes.
pub const FORMAT_TEXT: i16 = 0;
pub const FORMAT_BINARY: i16 = 1;

/// The opaque parameter packet understood by the PostgreSQL executors.
///
/// Invariant: the four arrays always have equal length, and every non-null
/// value slice points into the packet's own buffer.
#[derive(Debug, Default, Clone)]
pub struct PgParams {
    values: Vec<Option<(usize, usize)>>,
    lengths: Vec<i32>,
    formats: Vec<i16>,
    oids: Vec<u32>,
    data: Vec<u8>,
}

impl PgParams {
    pub fn new() -> Self {
        PgParams::default()
    }

    /// Encodes one value; returns the new parameter count, which is the
    /// 1-based placeholder index of the value just bound.
    pub fn push(&mut self, value: &FieldValue) -> usize {
        match value {
            FieldValue::Null => {
                // Null pointer, zero length, OID 0: the server infers.
                self.values.push(None);
                self.lengths.push(0);
                self.formats.push(FORMAT_TEXT);
                self.oids.push(0);
            }
            FieldValue::Bool(b) => {
                self.push_binary(&[u8::from(*b)], oid::BOOL);
            }
            FieldValue::I32(v) => {
                self.push_binary(&v.to_be_bytes(), oid::INT4);
            }
            FieldValue::I64(v) => {
                self.push_binary(&v.to_be_bytes(), oid::INT8);
            }
            FieldValue::F64(v) => {
                self.push_binary(&v.to_bits().to_be_bytes(), oid::FLOAT8);
            }
            FieldValue::Text(s) => {
                let offset = self.data.len();
                self.data.extend_from_slice(s.as_bytes());
                self.values.push(Some((offset, s.len())));
                self.lengths.push(s.len() as i32);
                self.formats.push(FORMAT_TEXT);
                self.oids.push(oid::TEXT);
            }
            FieldValue::Bytes(bytes) => {
                self.push_binary(bytes, oid::BYTEA);
            }
        }
        self.values.len()
    }

    fn push_binary(&mut self, encoded: &[u8], oid: u32) {
        let offset = self.data.len();
        self.data.extend_from_slice(encoded);
        self.values.push(Some((offset, encoded.len())));
        self.lengths.push(encoded.len() as i32);
        self.formats.push(FORMAT_BINARY);
        self.oids.push(oid);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encoded bytes of parameter `i`, `None` for NULL.
    pub fn value(&self, i: usize) -> Option<&[u8]> {
        self.values[i].map(|(offset, len)| &self.data[offset..offset + len])
    }

    pub fn length(&self, i: usize) -> i32 {
        self.lengths[i]
    }

    pub fn format(&self, i: usize) -> i16 {
        self.formats[i]
    }

    pub fn oid(&self, i: usize) -> u32 {
        self.oids[i]
    }

    /// True while the parallel-array invariant holds.
    pub fn arrays_aligned(&self) -> bool {
        let n = self.values.len();
        self.lengths.len() == n && self.formats.len() == n && self.oids.len() == n
    }

    /// Raw pass-through adapters for the native client, one per parameter.
    pub(crate) fn raw_params(&self) -> Vec<RawParam<'_>> {
        (0..self.len()).map(|i| RawParam { bytes: self.value(i) }).collect()
    }

    /// Declared parameter types. OID 0 becomes an unspecified pseudo-type
    /// so the server infers the type.
    pub(crate) fn param_types(&self) -> Vec<Type> {
        self.oids.iter().map(|&o| type_for_oid(o)).collect()
    }
}

fn type_for_oid(oid: u32) -> Type {
    if oid == 0 {
        return Type::new("unspecified".to_string(), 0, Kind::Simple, "pg_catalog".to_string());
    }
    Type::from_oid(oid)
        .unwrap_or_else(|| Type::new(format!("oid{oid}"), oid, Kind::Simple, "pg_catalog".to_string()))
}

/// Splices pre-encoded bytes into the wire unchanged.
#[derive(Debug)]
pub(crate) struct RawParam<'a> {
    bytes: Option<&'a [u8]>,
}

impl ToSql for RawParam<'_> {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.bytes {
            None => Ok(IsNull::Yes),
            Some(bytes) => {
                out.extend_from_slice(bytes);
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The packet already carries the authoritative OID.
        true
    }

    to_sql_checked!();
}

/// Parameter sink producing [`PgParams`] packets.
#[derive(Debug, Default)]
pub struct PgParamSink {
    params: PgParams,
}

impl PgParamSink {
    pub fn new() -> Self {
        PgParamSink::default()
    }
}

impl ParamSink for PgParamSink {
    fn push(&mut self, value: &FieldValue) -> Result<usize> {
        Ok(self.params.push(value))
    }

    fn len(&self) -> usize {
        self.params.len()
    }

    fn into_packet(self: Box<Self>) -> ParamPacket {
        let count = self.params.len();
        ParamPacket::new(POSTGRES_BACKEND, count, Box::new(self.params))
    }
}
