//! Presence-conditional data fields.
//!
//! A [`DataField`] pairs an ISO field number with a value codec. Whether the field takes part in
//! packing/parsing is decided by the message's bitmap ([`IsoMessage::has_data_field`]); the field
//! itself never consults it, the assembler does.

use crate::bitmap::Bitmap;
use crate::codec::{CodecError, FieldCodec};
use crate::value::{FieldValue, Value};
use std::io::{Read, Write};

/// A message that exposes its presence bitmap.
pub trait IsoMessage {
    fn bitmap(&self) -> &dyn Bitmap;

    /// Whether field `id` is marked present. Ids beyond the bitmap's capacity are absent.
    fn has_data_field(&self, id: usize) -> bool {
        self.bitmap().get(id).unwrap_or(false)
    }
}

/// Field as seen by the message assembler: number, applicability and type-erased pack/parse.
pub trait MessageField {
    fn field_id(&self) -> usize;

    fn applicable(&self, message: &dyn IsoMessage) -> bool;

    fn pack_value(&self, value: &Value, output: &mut dyn Write) -> Result<(), CodecError>;

    fn parse_value(&self, input: &mut dyn Read) -> Result<Value, CodecError>;
}

/// ISO data field `id` encoded by `codec`.
#[derive(Debug, Clone)]
pub struct DataField<C> {
    id: usize,
    label: String,
    codec: C,
}

impl<C: FieldCodec> DataField<C> {
    pub fn new(id: usize, codec: C) -> Self {
        DataField { id, label: id.to_string(), codec }
    }

    pub fn applicable(&self, message: &dyn IsoMessage) -> bool {
        message.has_data_field(self.id)
    }
}

impl<C: FieldCodec> FieldCodec for DataField<C> {
    type Value = C::Value;

    fn id(&self) -> &str {
        &self.label
    }

    fn pack(&self, value: &C::Value, output: &mut dyn Write) -> Result<(), CodecError> {
        self.codec.pack(value, output)
    }

    fn parse(&self, input: &mut dyn Read) -> Result<C::Value, CodecError> {
        self.codec.parse(input)
    }
}

impl<C> MessageField for DataField<C>
where
    C: FieldCodec,
    C::Value: FieldValue,
{
    fn field_id(&self) -> usize {
        self.id
    }

    fn applicable(&self, message: &dyn IsoMessage) -> bool {
        message.has_data_field(self.id)
    }

    fn pack_value(&self, value: &Value, output: &mut dyn Write) -> Result<(), CodecError> {
        let typed = <C::Value as FieldValue>::from_value(value).ok_or_else(|| {
            CodecError::Validation(format!("{}: unexpected value {:?}", self.label, value))
        })?;
        self.pack(&typed, output)
    }

    fn parse_value(&self, input: &mut dyn Read) -> Result<Value, CodecError> {
        Ok(self.parse(input)?.into_value())
    }
}

/// Placeholder for a field number with no encoding. Packing or parsing it is a schema error.
#[derive(Debug, Clone)]
pub struct UndefinedField {
    id: usize,
    label: String,
}

impl UndefinedField {
    pub fn new(id: usize) -> Self {
        UndefinedField { id, label: id.to_string() }
    }

    fn error(&self) -> CodecError {
        CodecError::UndefinedField { id: self.label.clone() }
    }
}

impl FieldCodec for UndefinedField {
    type Value = Value;

    fn id(&self) -> &str {
        &self.label
    }

    fn pack(&self, _value: &Value, _output: &mut dyn Write) -> Result<(), CodecError> {
        Err(self.error())
    }

    fn parse(&self, _input: &mut dyn Read) -> Result<Value, CodecError> {
        Err(self.error())
    }
}

impl MessageField for UndefinedField {
    fn field_id(&self) -> usize {
        self.id
    }

    fn applicable(&self, message: &dyn IsoMessage) -> bool {
        message.has_data_field(self.id)
    }

    fn pack_value(&self, value: &Value, output: &mut dyn Write) -> Result<(), CodecError> {
        self.pack(value, output)
    }

    fn parse_value(&self, input: &mut dyn Read) -> Result<Value, CodecError> {
        self.parse(input)
    }
}
