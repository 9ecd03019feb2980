//! Zero-copy readers over PostgreSQL result rows.
//!
//! [`FieldView`] decodes one cell according to its (wire format, OID) pair;
//! [`RowView`] builds cell views; [`ResultBlock`] owns the rows returned by
//! an executor. Views borrow the result's buffers and are only valid while
//! the block lives.

use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::Row;

use sql_bridge_common::{ClientError, ErrorContext, Result, ServerError};

use crate::params::oid;

/// Result wire format of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Text,
    Binary,
}

/// Borrowed view of a single result cell.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    bytes: Option<&'a [u8]>,
    format: WireFormat,
    oid: u32,
    column: Option<&'a str>,
}

impl<'a> FieldView<'a> {
    pub fn new(bytes: Option<&'a [u8]>, format: WireFormat, oid: u32) -> Self {
        FieldView {
            bytes,
            format,
            oid,
            column: None,
        }
    }

    pub fn with_column(mut self, column: &'a str) -> Self {
        self.column = Some(column);
        self
    }

    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn oid(&self) -> u32 {
        self.oid
    }

    /// Raw cell bytes as UTF-8 text, borrowed from the result buffer.
    pub fn as_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.bytes.unwrap_or_default()).map_err(|_| {
            ErrorContext::new(
                ServerError::InvalidEncoding,
                format!("Column {} is not valid UTF-8", self.column_name()),
            )
        })
    }

    /// Decodes the cell as `T`.
    ///
    /// # Errors
    ///
    /// Requesting a concrete type on a NULL cell fails with a
    /// null-conversion context carrying the column name and SQLSTATE
    /// `22002`; malformed cell data fails with a decode error.
    pub fn get<T: FromField<'a>>(&self) -> Result<T> {
        if self.is_null() {
            return Err(ErrorContext::new(
                ServerError::DataError,
                format!(
                    "Null value cannot be converted for column {}",
                    self.column_name()
                ),
            )
            .with_sqlstate("22002"));
        }
        T::from_field(self)
    }

    /// Decodes the cell as `Option<T>`, mapping NULL to `None`.
    pub fn opt<T: FromField<'a>>(&self) -> Result<Option<T>> {
        if self.is_null() {
            return Ok(None);
        }
        T::from_field(self).map(Some)
    }

    fn column_name(&self) -> &str {
        self.column.unwrap_or("unknown")
    }

    fn data(&self) -> &'a [u8] {
        self.bytes.unwrap_or_default()
    }

    fn is_binary(&self, oid: u32) -> bool {
        self.format == WireFormat::Binary && self.oid == oid
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        self.data().try_into().map_err(|_| {
            ErrorContext::new(
                ServerError::DataError,
                format!(
                    "Column {} holds {} bytes, expected {N}",
                    self.column_name(),
                    self.data().len()
                ),
            )
        })
    }

    fn parse_text<T: std::str::FromStr>(&self) -> Result<T> {
        let text = self.as_str()?;
        text.parse::<T>().map_err(|_| {
            ErrorContext::new(
                ServerError::InvalidTextFormat,
                format!("Failed to parse column {} from: {text}", self.column_name()),
            )
        })
    }

    fn decode_hex_bytea(&self) -> Result<Vec<u8>> {
        let text = self.as_str()?;
        let hex = text.strip_prefix("\\x").ok_or_else(|| {
            ErrorContext::new(
                ServerError::InvalidTextFormat,
                format!("Unsupported bytea text format in column {}", self.column_name()),
            )
        })?;
        if hex.len() % 2 != 0 {
            return Err(ErrorContext::new(
                ServerError::InvalidTextFormat,
                format!("Invalid hex in bytea column {}", self.column_name()),
            ));
        }
        let invalid = || {
            ErrorContext::new(
                ServerError::InvalidTextFormat,
                format!("Invalid hex in bytea column {}", self.column_name()),
            )
        };
        let mut out = Vec::with_capacity(hex.len() / 2);
        for pair in hex.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            out.push(u8::from_str_radix(pair, 16).map_err(|_| invalid())?);
        }
        Ok(out)
    }
}

/// Decoding of one cell into a native type, dispatched on (format, OID).
pub trait FromField<'a>: Sized {
    fn from_field(field: &FieldView<'a>) -> Result<Self>;
}

impl<'a> FromField<'a> for bool {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::BOOL) {
            return Ok(field.data().first().copied().unwrap_or(0) != 0);
        }
        let text = field.as_str()?;
        Ok(matches!(text, "t" | "true" | "1" | "TRUE" | "T"))
    }
}

impl<'a> FromField<'a> for i16 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::INT2) {
            return Ok(i16::from_be_bytes(field.fixed::<2>()?));
        }
        field.parse_text()
    }
}

impl<'a> FromField<'a> for i32 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::INT4) {
            return Ok(i32::from_be_bytes(field.fixed::<4>()?));
        }
        field.parse_text()
    }
}

impl<'a> FromField<'a> for i64 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::INT8) {
            return Ok(i64::from_be_bytes(field.fixed::<8>()?));
        }
        field.parse_text()
    }
}

// Unsigned types surface through the next wider signed column type.

impl<'a> FromField<'a> for u16 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::INT4) {
            return Ok(i32::from_be_bytes(field.fixed::<4>()?) as u16);
        }
        if field.is_binary(oid::INT2) {
            return Ok(u16::from_be_bytes(field.fixed::<2>()?));
        }
        field.parse_text()
    }
}

impl<'a> FromField<'a> for u32 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::INT8) {
            return Ok(i64::from_be_bytes(field.fixed::<8>()?) as u32);
        }
        if field.is_binary(oid::INT4) {
            return Ok(u32::from_be_bytes(field.fixed::<4>()?));
        }
        field.parse_text()
    }
}

impl<'a> FromField<'a> for u64 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::INT8) {
            return Ok(u64::from_be_bytes(field.fixed::<8>()?));
        }
        field.parse_text()
    }
}

impl<'a> FromField<'a> for f32 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::FLOAT4) {
            return Ok(f32::from_bits(u32::from_be_bytes(field.fixed::<4>()?)));
        }
        // Text parsing accepts NaN, Infinity and -Infinity in either case.
        field.parse_text()
    }
}

impl<'a> FromField<'a> for f64 {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::FLOAT8) {
            return Ok(f64::from_bits(u64::from_be_bytes(field.fixed::<8>()?)));
        }
        field.parse_text()
    }
}

impl<'a> FromField<'a> for String {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        field.as_str().map(str::to_string)
    }
}

impl<'a> FromField<'a> for &'a str {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        field.as_str()
    }
}

impl<'a> FromField<'a> for Vec<u8> {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::BYTEA) {
            return Ok(field.data().to_vec());
        }
        field.decode_hex_bytea()
    }
}

impl<'a> FromField<'a> for &'a [u8] {
    fn from_field(field: &FieldView<'a>) -> Result<Self> {
        if field.is_binary(oid::BYTEA) {
            return Ok(field.data());
        }
        Err(ErrorContext::new(
            ClientError::InvalidArgument,
            format!(
                "Cannot borrow text-format bytea column {}; decode to Vec<u8> instead",
                field.column_name()
            ),
        ))
    }
}

/// Capture type pulling the raw cell bytes out of the native client.
struct RawField<'a> {
    bytes: Option<&'a [u8]>,
}

impl<'a> FromSql<'a> for RawField<'a> {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawField { bytes: Some(raw) })
    }

    fn from_sql_null(
        _ty: &Type,
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawField { bytes: None })
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Non-owning view of one result row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    row: &'a Row,
}

impl<'a> RowView<'a> {
    pub fn new(row: &'a Row) -> Self {
        RowView { row }
    }

    pub fn cols(&self) -> usize {
        self.row.columns().len()
    }

    /// Cell view by column index. Regular query results arrive in binary
    /// format.
    pub fn at(&self, col: usize) -> Result<FieldView<'a>> {
        let columns = self.row.columns();
        let column = columns.get(col).ok_or_else(|| {
            ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Column index {col} out of range ({} columns)", columns.len()),
            )
        })?;
        let raw: RawField<'a> = self.row.try_get(col).map_err(|e| {
            ErrorContext::new(
                ServerError::DataError,
                format!("Failed to read column {}: {e}", column.name()),
            )
        })?;
        Ok(FieldView {
            bytes: raw.bytes,
            format: WireFormat::Binary,
            oid: column.type_().oid(),
            column: Some(column.name()),
        })
    }

    /// Zero-based index of a named column.
    ///
    /// # Errors
    ///
    /// `ColumnNotFound` when no column carries the name.
    pub fn col_index(&self, name: &str) -> Result<usize> {
        self.row
            .columns()
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| {
                ErrorContext::new(
                    ServerError::ColumnNotFound,
                    format!("Column not found: {name}"),
                )
            })
    }

    /// Cell view by column name.
    pub fn field(&self, name: &str) -> Result<FieldView<'a>> {
        self.at(self.col_index(name)?)
    }
}

/// Owning wrapper over the rows of one query result.
#[derive(Debug, Default)]
pub struct ResultBlock {
    rows: Vec<Row>,
}

impl ResultBlock {
    pub fn new(rows: Vec<Row>) -> Self {
        ResultBlock { rows }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.rows.first().map(|r| r.columns().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> Result<RowView<'_>> {
        self.rows.get(i).map(RowView::new).ok_or_else(|| {
            ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Row index {i} out of range ({} rows)", self.rows.len()),
            )
        })
    }

    /// Decoded cell; fails on NULL.
    pub fn get<'a, T: FromField<'a>>(&'a self, row: usize, col: usize) -> Result<T> {
        self.row(row)?.at(col)?.get()
    }

    /// Decoded cell; NULL becomes `None`.
    pub fn get_opt<'a, T: FromField<'a>>(&'a self, row: usize, col: usize) -> Result<Option<T>> {
        self.row(row)?.at(col)?.opt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(bytes: &[u8], oid: u32) -> FieldView<'_> {
        FieldView::new(Some(bytes), WireFormat::Binary, oid)
    }

    fn text(s: &str, oid: u32) -> FieldView<'_> {
        FieldView::new(Some(s.as_bytes()), WireFormat::Text, oid)
    }

    #[test]
    fn test_binary_int_decoding() {
        let bytes = 0x0102_0304i32.to_be_bytes();
        assert_eq!(binary(&bytes, oid::INT4).get::<i32>().unwrap(), 0x0102_0304);
        let bytes = (-7i64).to_be_bytes();
        assert_eq!(binary(&bytes, oid::INT8).get::<i64>().unwrap(), -7);
        let bytes = (-3i16).to_be_bytes();
        assert_eq!(binary(&bytes, oid::INT2).get::<i16>().unwrap(), -3);
    }

    #[test]
    fn test_binary_float_bit_cast() {
        let bytes = 1.5f64.to_bits().to_be_bytes();
        assert_eq!(binary(&bytes, oid::FLOAT8).get::<f64>().unwrap(), 1.5);
        let nan_bits = f64::NAN.to_bits();
        let view_bytes = nan_bits.to_be_bytes();
        let decoded = binary(&view_bytes, oid::FLOAT8).get::<f64>().unwrap();
        assert_eq!(decoded.to_bits(), nan_bits);
    }

    #[test]
    fn test_binary_bool() {
        assert!(binary(&[1], oid::BOOL).get::<bool>().unwrap());
        assert!(!binary(&[0], oid::BOOL).get::<bool>().unwrap());
    }

    #[test]
    fn test_binary_bytea_borrow() {
        let data = [0u8, 1, 2, 255];
        let view = binary(&data, oid::BYTEA);
        assert_eq!(view.get::<&[u8]>().unwrap(), &data[..]);
        assert_eq!(view.get::<Vec<u8>>().unwrap(), data.to_vec());
    }

    #[test]
    fn test_text_integer_parse() {
        assert_eq!(text("42", oid::INT4).get::<i32>().unwrap(), 42);
        assert_eq!(text("-42", oid::INT8).get::<i64>().unwrap(), -42);
        assert!(text("not a number", oid::INT4).get::<i32>().is_err());
    }

    #[test]
    fn test_text_float_specials() {
        assert!(text("NaN", oid::FLOAT8).get::<f64>().unwrap().is_nan());
        assert!(text("nan", oid::FLOAT8).get::<f64>().unwrap().is_nan());
        assert_eq!(text("Infinity", oid::FLOAT8).get::<f64>().unwrap(), f64::INFINITY);
        assert_eq!(text("-Infinity", oid::FLOAT8).get::<f64>().unwrap(), f64::NEG_INFINITY);
        assert_eq!(text("1.25", oid::FLOAT8).get::<f64>().unwrap(), 1.25);
    }

    #[test]
    fn test_text_bool() {
        assert!(text("t", oid::BOOL).get::<bool>().unwrap());
        assert!(!text("f", oid::BOOL).get::<bool>().unwrap());
    }

    #[test]
    fn test_text_hex_bytea() {
        let view = text("\\xdeadbeef", oid::BYTEA);
        assert_eq!(view.get::<Vec<u8>>().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        // Borrowing a text-format bytea is refused.
        assert!(view.get::<&[u8]>().is_err());
        assert!(text("deadbeef", oid::BYTEA).get::<Vec<u8>>().is_err());
        assert!(text("\\xzz", oid::BYTEA).get::<Vec<u8>>().is_err());
    }

    #[test]
    fn test_string_view_borrows() {
        let view = text("hello", oid::TEXT);
        let s: &str = view.get().unwrap();
        assert_eq!(s, "hello");
        assert_eq!(view.get::<String>().unwrap(), "hello");
    }

    #[test]
    fn test_unsigned_wideners() {
        // u32 arrives as int8
        let bytes = 4_000_000_000i64.to_be_bytes();
        assert_eq!(binary(&bytes, oid::INT8).get::<u32>().unwrap(), 4_000_000_000);
        // u16 arrives as int4
        let bytes = 60_000i32.to_be_bytes();
        assert_eq!(binary(&bytes, oid::INT4).get::<u16>().unwrap(), 60_000);
        // u64 via int8 bit pattern
        let bytes = (-1i64).to_be_bytes();
        assert_eq!(binary(&bytes, oid::INT8).get::<u64>().unwrap(), u64::MAX);
        // u64 via text (numeric column)
        assert_eq!(
            text("18446744073709551615", oid::TEXT).get::<u64>().unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn test_null_conversion_error() {
        let view = FieldView::new(None, WireFormat::Binary, oid::INT4).with_column("age");
        assert!(view.is_null());
        let err = view.get::<i32>().unwrap_err();
        assert_eq!(err.sqlstate, "22002");
        assert!(err.message.contains("age"));
        // opt() maps NULL to None instead
        assert_eq!(view.opt::<i32>().unwrap(), None);
    }

    #[test]
    fn test_wrong_width_is_an_error() {
        assert!(binary(&[1, 2], oid::INT4).get::<i32>().is_err());
    }
}
