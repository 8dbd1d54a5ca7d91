//! Message-type indicator: the 4-digit code that opens every ISO 8583 message.

use crate::codec::{CodecError, FieldCodec};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Exactly four ASCII decimal digits, e.g. `0200` or `1200`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageTypeIndicator(String);

impl MessageTypeIndicator {
    pub fn new(value: impl Into<String>) -> Result<Self, CodecError> {
        let value = value.into();
        if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::InvalidMti(value));
        }
        Ok(MessageTypeIndicator(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ISO 8583 version digit (0 = 1987, 1 = 1993, 2 = 2003).
    pub fn version(&self) -> u8 {
        self.digit(0)
    }

    /// Message class digit (1 = authorization, 2 = financial, 4 = reversal, 8 = network, ...).
    pub fn class(&self) -> u8 {
        self.digit(1)
    }

    /// Message function digit (0 = request, 1 = request response, 2 = advice, ...).
    pub fn function(&self) -> u8 {
        self.digit(2)
    }

    /// Message origin digit (0 = acquirer, 2 = issuer, ...).
    pub fn origin(&self) -> u8 {
        self.digit(3)
    }

    fn digit(&self, index: usize) -> u8 {
        self.0.as_bytes()[index] - b'0'
    }
}

impl fmt::Display for MessageTypeIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MessageTypeIndicator {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageTypeIndicator::new(s)
    }
}

/// Packs/parses an MTI through any string codec (plain text, BCD, ...).
#[derive(Debug, Clone)]
pub struct MtiCodec<C> {
    inner: C,
}

impl<C: FieldCodec<Value = String>> MtiCodec<C> {
    pub fn new(inner: C) -> Self {
        MtiCodec { inner }
    }
}

impl<C: FieldCodec<Value = String>> FieldCodec for MtiCodec<C> {
    type Value = MessageTypeIndicator;

    fn id(&self) -> &str {
        self.inner.id()
    }

    fn pack(&self, mti: &MessageTypeIndicator, output: &mut dyn Write) -> Result<(), CodecError> {
        self.inner.pack(&mti.to_string(), output)
    }

    fn parse(&self, input: &mut dyn Read) -> Result<MessageTypeIndicator, CodecError> {
        MessageTypeIndicator::new(self.inner.parse(input)?)
    }
}
