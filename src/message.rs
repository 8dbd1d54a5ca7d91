//! Message assembly: MTI, bitmap, then every present data field in ascending field order.
//!
//! The bitmap is the single source of truth for presence: [`Message::set_field`] sets the bit
//! together with the value, and [`MessageCodec`] packs/parses exactly the registered fields whose
//! bit is set. A set bit with no registered field is a schema error
//! ([`CodecError::UndefinedField`]), as is packing a present field with no value
//! ([`CodecError::MissingValue`]).

use crate::bitmap::{Bitmap, ExtendableBitmap, FixedBitmap};
use crate::codec::{CodecError, ExtendableBitmapCodec, FieldCodec};
use crate::field::{IsoMessage, MessageField};
use crate::mti::MessageTypeIndicator;
use crate::value::Value;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

/// A decoded (or to-be-encoded) ISO 8583 message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    mti: MessageTypeIndicator,
    bitmap: ExtendableBitmap,
    values: BTreeMap<usize, Value>,
}

impl Message {
    /// Empty message whose bitmap has `segments` segments of `bitmap_bytes` bytes
    /// (8 and 2 for the usual primary + secondary bitmap).
    pub fn new(
        mti: MessageTypeIndicator,
        bitmap_bytes: usize,
        segments: usize,
    ) -> Result<Self, CodecError> {
        if segments == 0 {
            return Err(CodecError::Validation(
                "message bitmap needs at least one segment".to_string(),
            ));
        }
        Ok(Message {
            mti,
            bitmap: ExtendableBitmap::with_segments(bitmap_bytes, segments)?,
            values: BTreeMap::new(),
        })
    }

    /// Message whose presence is taken from an existing bitmap. Values for its set bits still
    /// have to be supplied with [`Message::set_field`] before packing.
    pub fn with_bitmap(mti: MessageTypeIndicator, bitmap: ExtendableBitmap) -> Self {
        Message { mti, bitmap, values: BTreeMap::new() }
    }

    pub fn mti(&self) -> &MessageTypeIndicator {
        &self.mti
    }

    pub fn set_mti(&mut self, mti: MessageTypeIndicator) {
        self.mti = mti;
    }

    pub fn bitmap(&self) -> &ExtendableBitmap {
        &self.bitmap
    }

    /// Append `segments` empty bitmap segments so higher field numbers become addressable.
    pub fn grow_bitmap(&mut self, segments: usize) -> Result<(), CodecError> {
        let bytes = self.bitmap.segment_bytes();
        let extensions = (0..segments)
            .map(|_| FixedBitmap::new(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        self.bitmap.add_extensions(extensions)?;
        Ok(())
    }

    /// Mark field `id` present and store its value.
    pub fn set_field(&mut self, id: usize, value: Value) -> Result<(), CodecError> {
        self.check_data_bit(id)?;
        self.bitmap.set(id)?;
        self.values.insert(id, value);
        Ok(())
    }

    /// Mark field `id` absent and return its previous value.
    pub fn remove_field(&mut self, id: usize) -> Result<Option<Value>, CodecError> {
        self.check_data_bit(id)?;
        self.bitmap.clear(id)?;
        Ok(self.values.remove(&id))
    }

    pub fn field(&self, id: usize) -> Option<&Value> {
        self.values.get(&id)
    }

    /// Ascending numbers of present data fields (continuation bits excluded).
    pub fn present_fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.bitmap
            .iter_ones()
            .filter(move |&bit| !self.bitmap.is_continuation_bit(bit))
    }

    fn check_data_bit(&self, id: usize) -> Result<(), CodecError> {
        if self.bitmap.is_continuation_bit(id) {
            return Err(CodecError::Validation(format!(
                "field {} is a bitmap continuation bit",
                id
            )));
        }
        Ok(())
    }
}

impl IsoMessage for Message {
    fn bitmap(&self) -> &dyn Bitmap {
        &self.bitmap
    }
}

/// Packs and parses [`Message`]s for one message layout.
pub struct MessageCodec {
    mti: Box<dyn FieldCodec<Value = MessageTypeIndicator>>,
    bitmap: ExtendableBitmapCodec,
    fields: BTreeMap<usize, Box<dyn MessageField>>,
}

impl MessageCodec {
    pub fn new(
        mti: impl FieldCodec<Value = MessageTypeIndicator> + 'static,
        bitmap: ExtendableBitmapCodec,
    ) -> Self {
        MessageCodec { mti: Box::new(mti), bitmap, fields: BTreeMap::new() }
    }

    /// Register a field. Field numbers must be unique and must not collide with a continuation bit.
    pub fn with_field(mut self, field: impl MessageField + 'static) -> Result<Self, CodecError> {
        let id = field.field_id();
        let width = self.bitmap.bytes() * 8;
        if id == 0 || (id - 1).checked_rem(width) == Some(0) {
            return Err(CodecError::Validation(format!(
                "field {} cannot be registered: not a data bit",
                id
            )));
        }
        if self.fields.contains_key(&id) {
            return Err(CodecError::Validation(format!("field {} registered twice", id)));
        }
        self.fields.insert(id, Box::new(field));
        Ok(self)
    }

    pub fn pack(&self, message: &Message, output: &mut dyn Write) -> Result<(), CodecError> {
        if message.bitmap.segment_bytes() != self.bitmap.bytes() {
            return Err(CodecError::SizeMismatch {
                id: self.bitmap.id().to_string(),
                expected: self.bitmap.bytes(),
                actual: message.bitmap.segment_bytes(),
            });
        }
        self.check_defined(message)?;
        self.mti.pack(&message.mti, output)?;
        self.bitmap.pack(&message.bitmap, output)?;
        let mut packed = 0usize;
        for (&id, field) in &self.fields {
            if !field.applicable(message) {
                continue;
            }
            let value = message
                .values
                .get(&id)
                .ok_or_else(|| CodecError::MissingValue { id: id.to_string() })?;
            field.pack_value(value, output)?;
            log::trace!("packed field {}", id);
            packed += 1;
        }
        log::debug!("packed {} message with {} fields", message.mti, packed);
        Ok(())
    }

    pub fn parse(&self, input: &mut dyn Read) -> Result<Message, CodecError> {
        let mti = self.mti.parse(input)?;
        let bitmap = self.bitmap.parse(input)?;
        let mut message = Message::with_bitmap(mti, bitmap);
        self.check_defined(&message)?;
        for (&id, field) in &self.fields {
            if !field.applicable(&message) {
                continue;
            }
            let value = field.parse_value(input)?;
            log::trace!("parsed field {}", id);
            message.values.insert(id, value);
        }
        log::debug!("parsed {} message with {} fields", message.mti, message.values.len());
        Ok(message)
    }

    /// Pack into a fresh buffer.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.pack(message, &mut out)?;
        Ok(out)
    }

    /// Parse one message from the start of `bytes`; returns the message and the bytes consumed.
    pub fn decode(&self, bytes: &[u8]) -> Result<(Message, usize), CodecError> {
        let mut cursor = Cursor::new(bytes);
        let message = self.parse(&mut cursor)?;
        Ok((message, cursor.position() as usize))
    }

    fn check_defined(&self, message: &Message) -> Result<(), CodecError> {
        match message.present_fields().find(|id| !self.fields.contains_key(id)) {
            Some(id) => Err(CodecError::UndefinedField { id: id.to_string() }),
            None => Ok(()),
        }
    }
}
