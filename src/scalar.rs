//! Scalar field encodings: fixed text, BCD, hex, raw binary, unsigned integers and
//! length-prefixed variable fields.
//!
//! | Helper | Value | Wire |
//! |--------|-------|------|
//! | [`text`] | `String` | `n` UTF-8 characters |
//! | [`ll_text`] / [`lll_text`] | `String` | 2/3 ASCII length digits + text |
//! | [`bcd`] | `String` | `n` digits packed two per byte, left-padded |
//! | [`hex`] | `String` | `n` hex chars packed two per byte, left-padded |
//! | [`bin`] | `Vec<u8>` | `n` bytes |
//! | [`ubyte`] / [`ushort`] | `u64` | 1/2 big-endian bytes |
//! | [`numeric`] / [`bcd_numeric`] | `u64` | zero-padded decimal as text/BCD |
//! | [`bmp`] / [`ebmp`] | bitmap | see [`crate::codec`] |

use crate::codec::{read_fully, CodecError, ExtendableBitmapCodec, FieldCodec, FixedBitmapCodec};
use byteorder::{BigEndian, ByteOrder};
use std::io::{Read, Write};

/// Fixed-length UTF-8 text of `length` characters (code points). ASCII text is one byte per
/// character.
#[derive(Debug, Clone)]
pub struct Text {
    id: String,
    length: usize,
}

impl Text {
    pub fn new(id: impl Into<String>, length: usize) -> Self {
        Text { id: id.into(), length }
    }

    /// Bytes still needed to complete `length` characters, given the bytes read so far.
    fn missing_bytes(&self, buf: &[u8]) -> Result<usize, CodecError> {
        let mut pos = 0;
        let mut chars = 0;
        while pos < buf.len() {
            pos += utf8_width(buf[pos]).ok_or_else(|| {
                CodecError::Validation(format!("{}: text is not valid UTF-8", self.id))
            })?;
            chars += 1;
        }
        Ok(pos - buf.len() + self.length.saturating_sub(chars))
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl FieldCodec for Text {
    type Value = String;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &String, output: &mut dyn Write) -> Result<(), CodecError> {
        let chars = value.chars().count();
        if chars != self.length {
            return Err(CodecError::Validation(format!(
                "{}: value must be {} characters, but got [{}]",
                self.id, self.length, chars
            )));
        }
        output.write_all(value.as_bytes())?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<String, CodecError> {
        // Every character takes at least one byte, so never read past the value.
        let mut buf = read_fully(input, self.length)?;
        loop {
            let missing = self.missing_bytes(&buf)?;
            if missing == 0 {
                break;
            }
            buf.extend(read_fully(input, missing)?);
        }
        String::from_utf8(buf)
            .map_err(|_| CodecError::Validation(format!("{}: text is not valid UTF-8", self.id)))
    }
}

/// Packed BCD: `length` decimal digits in `(length + 1) / 2` bytes.
#[derive(Debug, Clone)]
pub struct Bcd {
    id: String,
    length: usize,
}

impl Bcd {
    pub fn new(id: impl Into<String>, length: usize) -> Self {
        Bcd { id: id.into(), length }
    }
}

impl FieldCodec for Bcd {
    type Value = String;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &String, output: &mut dyn Write) -> Result<(), CodecError> {
        if value.len() != self.length || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::Validation(format!(
                "{}: value must be {} decimal digits, but got [{}]",
                self.id, self.length, value
            )));
        }
        let nibbles: Vec<u8> = value.bytes().map(|b| b - b'0').collect();
        output.write_all(&pack_nibbles(&nibbles))?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<String, CodecError> {
        let buf = read_fully(input, (self.length + 1) / 2)?;
        let mut digits = String::with_capacity(buf.len() * 2);
        for b in buf {
            for nibble in [b >> 4, b & 0x0F] {
                if nibble > 9 {
                    return Err(CodecError::Validation(format!(
                        "{}: invalid BCD byte 0x{:02x}",
                        self.id, b
                    )));
                }
                digits.push(char::from(b'0' + nibble));
            }
        }
        strip_pad(&self.id, digits, self.length)
    }
}

/// Hex string of `length` characters in `(length + 1) / 2` bytes. Parsed as lowercase.
#[derive(Debug, Clone)]
pub struct Hex {
    id: String,
    length: usize,
}

impl Hex {
    pub fn new(id: impl Into<String>, length: usize) -> Self {
        Hex { id: id.into(), length }
    }
}

impl FieldCodec for Hex {
    type Value = String;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &String, output: &mut dyn Write) -> Result<(), CodecError> {
        let nibbles: Option<Vec<u8>> =
            value.chars().map(|c| c.to_digit(16).map(|d| d as u8)).collect();
        match nibbles {
            Some(nibbles) if nibbles.len() == self.length => {
                output.write_all(&pack_nibbles(&nibbles))?;
                Ok(())
            }
            _ => Err(CodecError::Validation(format!(
                "{}: value must be {} hex characters, but got [{}]",
                self.id, self.length, value
            ))),
        }
    }

    fn parse(&self, input: &mut dyn Read) -> Result<String, CodecError> {
        let buf = read_fully(input, (self.length + 1) / 2)?;
        let s: String = buf.iter().map(|b| format!("{:02x}", b)).collect();
        strip_pad(&self.id, s, self.length)
    }
}

/// Drop the leading pad nibble of an odd-length value; it must be zero.
fn strip_pad(id: &str, mut nibbles: String, length: usize) -> Result<String, CodecError> {
    let value = nibbles.split_off(nibbles.len() - length);
    if nibbles.bytes().any(|b| b != b'0') {
        return Err(CodecError::Validation(format!(
            "{}: pad nibble must be 0, but got [{}]",
            id, nibbles
        )));
    }
    Ok(value)
}

/// Two nibbles per byte, high first; an odd count gets a leading zero nibble.
fn pack_nibbles(nibbles: &[u8]) -> Vec<u8> {
    let pad = nibbles.len() % 2;
    let mut out = vec![0u8; (nibbles.len() + 1) / 2];
    for (i, &n) in nibbles.iter().enumerate() {
        let pos = i + pad;
        if pos % 2 == 0 {
            out[pos / 2] |= n << 4;
        } else {
            out[pos / 2] |= n;
        }
    }
    out
}

/// Raw bytes of fixed `length`.
#[derive(Debug, Clone)]
pub struct Binary {
    id: String,
    length: usize,
}

impl Binary {
    pub fn new(id: impl Into<String>, length: usize) -> Self {
        Binary { id: id.into(), length }
    }
}

impl FieldCodec for Binary {
    type Value = Vec<u8>;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &Vec<u8>, output: &mut dyn Write) -> Result<(), CodecError> {
        if value.len() != self.length {
            return Err(CodecError::SizeMismatch {
                id: self.id.clone(),
                expected: self.length,
                actual: value.len(),
            });
        }
        output.write_all(value)?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<u8>, CodecError> {
        read_fully(input, self.length)
    }
}

/// Unsigned byte (0..=255).
#[derive(Debug, Clone)]
pub struct UByte {
    id: String,
}

impl UByte {
    pub fn new(id: impl Into<String>) -> Self {
        UByte { id: id.into() }
    }
}

impl FieldCodec for UByte {
    type Value = u64;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &u64, output: &mut dyn Write) -> Result<(), CodecError> {
        let byte = u8::try_from(*value).map_err(|_| {
            CodecError::Validation(format!("{}: value {} does not fit in a byte", self.id, value))
        })?;
        output.write_all(&[byte])?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<u64, CodecError> {
        Ok(read_fully(input, 1)?[0] as u64)
    }
}

/// Unsigned big-endian short (0..=65535).
#[derive(Debug, Clone)]
pub struct UShort {
    id: String,
}

impl UShort {
    pub fn new(id: impl Into<String>) -> Self {
        UShort { id: id.into() }
    }
}

impl FieldCodec for UShort {
    type Value = u64;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &u64, output: &mut dyn Write) -> Result<(), CodecError> {
        let short = u16::try_from(*value).map_err(|_| {
            CodecError::Validation(format!("{}: value {} does not fit in a short", self.id, value))
        })?;
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, short);
        output.write_all(&buf)?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<u64, CodecError> {
        Ok(BigEndian::read_u16(&read_fully(input, 2)?) as u64)
    }
}

/// Unsigned decimal rendered as exactly `length` zero-padded digits through a string codec.
#[derive(Debug, Clone)]
pub struct Numeric<C> {
    inner: C,
    length: usize,
}

impl<C: FieldCodec<Value = String>> Numeric<C> {
    pub fn new(inner: C, length: usize) -> Self {
        Numeric { inner, length }
    }
}

impl<C: FieldCodec<Value = String>> FieldCodec for Numeric<C> {
    type Value = u64;

    fn id(&self) -> &str {
        self.inner.id()
    }

    fn pack(&self, value: &u64, output: &mut dyn Write) -> Result<(), CodecError> {
        let digits = format!("{:0width$}", value, width = self.length);
        if digits.len() != self.length {
            return Err(CodecError::Validation(format!(
                "{}: value {} does not fit in {} digits",
                self.inner.id(),
                value,
                self.length
            )));
        }
        self.inner.pack(&digits, output)
    }

    fn parse(&self, input: &mut dyn Read) -> Result<u64, CodecError> {
        let digits = self.inner.parse(input)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::Validation(format!(
                "{}: expected decimal digits, but got [{}]",
                self.inner.id(),
                digits
            )));
        }
        digits.parse::<u64>().map_err(|e| {
            CodecError::Validation(format!("{}: {} [{}]", self.inner.id(), e, digits))
        })
    }
}

/// Length of a variable field value as written in its length prefix.
pub trait Measure {
    fn measure(&self) -> usize;
}

/// Character count; for BCD and hex bodies this is the digit count.
impl Measure for String {
    fn measure(&self) -> usize {
        self.chars().count()
    }
}

impl Measure for Vec<u8> {
    fn measure(&self) -> usize {
        self.len()
    }
}

/// Length prefix followed by a body codec sized by that length.
pub struct VarLength<L, F> {
    id: String,
    length: L,
    body: F,
}

impl<L, F> VarLength<L, F> {
    pub fn new(id: impl Into<String>, length: L, body: F) -> Self {
        VarLength { id: id.into(), length, body }
    }
}

impl<L, F, C> FieldCodec for VarLength<L, F>
where
    L: FieldCodec<Value = u64>,
    F: Fn(usize) -> C,
    C: FieldCodec,
    C::Value: Measure,
{
    type Value = C::Value;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, value: &C::Value, output: &mut dyn Write) -> Result<(), CodecError> {
        let n = value.measure();
        self.length.pack(&(n as u64), output)?;
        (self.body)(n).pack(value, output)
    }

    fn parse(&self, input: &mut dyn Read) -> Result<C::Value, CodecError> {
        let n = self.length.parse(input)?;
        let n = usize::try_from(n)
            .map_err(|_| CodecError::Validation(format!("{}: length {} too large", self.id, n)))?;
        (self.body)(n).parse(input)
    }
}

pub fn text(id: &str, length: usize) -> Text {
    Text::new(id, length)
}

/// Text with a 2-digit ASCII length prefix.
pub fn ll_text(id: &str) -> impl FieldCodec<Value = String> {
    var_text(id, numeric(id, 2))
}

/// Text with a 3-digit ASCII length prefix.
pub fn lll_text(id: &str) -> impl FieldCodec<Value = String> {
    var_text(id, numeric(id, 3))
}

/// Text with a one-byte binary length prefix.
pub fn ubyte_text(id: &str) -> impl FieldCodec<Value = String> {
    var_text(id, ubyte(id))
}

/// Text with a two-byte big-endian length prefix.
pub fn ushort_text(id: &str) -> impl FieldCodec<Value = String> {
    var_text(id, ushort(id))
}

fn var_text<L: FieldCodec<Value = u64>>(id: &str, length: L) -> impl FieldCodec<Value = String> {
    let body_id = id.to_string();
    VarLength::new(id, length, move |n| Text::new(body_id.clone(), n))
}

pub fn bcd(id: &str, length: usize) -> Bcd {
    Bcd::new(id, length)
}

/// BCD digits with a one-byte binary digit-count prefix.
pub fn ubyte_bcd(id: &str) -> impl FieldCodec<Value = String> {
    let body_id = id.to_string();
    VarLength::new(id, ubyte(id), move |n| Bcd::new(body_id.clone(), n))
}

pub fn hex(id: &str, length: usize) -> Hex {
    Hex::new(id, length)
}

pub fn bin(id: &str, length: usize) -> Binary {
    Binary::new(id, length)
}

/// Bytes with a one-byte binary length prefix.
pub fn ubyte_bin(id: &str) -> impl FieldCodec<Value = Vec<u8>> {
    let body_id = id.to_string();
    VarLength::new(id, ubyte(id), move |n| Binary::new(body_id.clone(), n))
}

/// Bytes with a two-byte big-endian length prefix.
pub fn ushort_bin(id: &str) -> impl FieldCodec<Value = Vec<u8>> {
    let body_id = id.to_string();
    VarLength::new(id, ushort(id), move |n| Binary::new(body_id.clone(), n))
}

pub fn ubyte(id: &str) -> UByte {
    UByte::new(id)
}

pub fn ushort(id: &str) -> UShort {
    UShort::new(id)
}

/// Unsigned number as `length` ASCII digits.
pub fn numeric(id: &str, length: usize) -> Numeric<Text> {
    Numeric::new(Text::new(id, length), length)
}

/// Unsigned number as `length` BCD digits.
pub fn bcd_numeric(id: &str, length: usize) -> Numeric<Bcd> {
    Numeric::new(Bcd::new(id, length), length)
}

pub fn bmp(id: &str, bytes: usize) -> FixedBitmapCodec {
    FixedBitmapCodec::new(id, bytes)
}

pub fn ebmp(id: &str, bytes: usize) -> ExtendableBitmapCodec {
    ExtendableBitmapCodec::new(id, bytes)
}
