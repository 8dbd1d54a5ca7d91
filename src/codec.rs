//! Codec interface, error taxonomy and the bitmap wire codecs.
//!
//! Every codec implements [`FieldCodec`]: it has an identifier and packs/parses one value over a
//! byte stream. Reads are **read-fully**: a stream that ends before the expected byte count is an
//! [`CodecError::EndOfStream`], never a partial result.

use crate::bitmap::{check_bytes, Bitmap, ExtendableBitmap, FixedBitmap};
use std::io::{ErrorKind, Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("End of stream reached after reading {read} bytes, bytes expected [{expected}]")]
    EndOfStream { read: usize, expected: usize },
    #[error("bytes should be between 1 and {max}, but got [{bytes}]")]
    InvalidBytes { bytes: usize, max: usize },
    #[error("bit should be between 1 and {capacity}, but got [{bit}]")]
    BitOutOfRange { capacity: usize, bit: usize },
    #[error("extension capacity should be {expected}, but got [{actual}]")]
    ExtensionCapacity { expected: usize, actual: usize },
    #[error("{id}: value must be {expected} bytes, but got [{actual}]")]
    SizeMismatch { id: String, expected: usize, actual: usize },
    #[error("{id}: value must be a multiple of {bytes} bytes, but got [{actual}]")]
    NotMultiple { id: String, bytes: usize, actual: usize },
    #[error("Invalid MTI: [{0}]")]
    InvalidMti(String),
    #[error("{id}: Undefined data field")]
    UndefinedField { id: String },
    #[error("{id}: field is present in the bitmap but has no value")]
    MissingValue { id: String },
    #[error("Validation: {0}")]
    Validation(String),
}

/// A value codec over byte streams.
pub trait FieldCodec {
    type Value;

    fn id(&self) -> &str;

    fn pack(&self, value: &Self::Value, output: &mut dyn Write) -> Result<(), CodecError>;

    fn parse(&self, input: &mut dyn Read) -> Result<Self::Value, CodecError>;
}

impl<C: FieldCodec + ?Sized> FieldCodec for Box<C> {
    type Value = C::Value;

    fn id(&self) -> &str {
        (**self).id()
    }

    fn pack(&self, value: &Self::Value, output: &mut dyn Write) -> Result<(), CodecError> {
        (**self).pack(value, output)
    }

    fn parse(&self, input: &mut dyn Read) -> Result<Self::Value, CodecError> {
        (**self).parse(input)
    }
}

/// Read exactly `len` bytes or fail with [`CodecError::EndOfStream`].
pub fn read_fully(input: &mut dyn Read, len: usize) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![0u8; len];
    let mut read = 0;
    while read < len {
        match input.read(&mut buf[read..]) {
            Ok(0) => return Err(CodecError::EndOfStream { read, expected: len }),
            Ok(n) => read += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(buf)
}

/// Fixed-width bitmap of `bytes` bytes.
#[derive(Debug, Clone)]
pub struct FixedBitmapCodec {
    id: String,
    bytes: usize,
}

impl FixedBitmapCodec {
    pub fn new(id: impl Into<String>, bytes: usize) -> Self {
        FixedBitmapCodec { id: id.into(), bytes }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl FieldCodec for FixedBitmapCodec {
    type Value = FixedBitmap;

    fn id(&self) -> &str {
        &self.id
    }

    fn pack(&self, bitmap: &FixedBitmap, output: &mut dyn Write) -> Result<(), CodecError> {
        let bytes = bitmap.to_bytes();
        if bytes.len() != self.bytes {
            return Err(CodecError::SizeMismatch {
                id: self.id.clone(),
                expected: self.bytes,
                actual: bytes.len(),
            });
        }
        output.write_all(&bytes)?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<FixedBitmap, CodecError> {
        check_bytes(self.bytes)?;
        FixedBitmap::from_bytes(&read_fully(input, self.bytes)?)
    }
}

/// Chain of `bytes`-wide blocks; a block with its most significant bit set is followed by another.
#[derive(Debug, Clone)]
pub struct ExtendableBitmapCodec {
    block: FixedBitmapCodec,
    max_segments: Option<usize>,
}

impl ExtendableBitmapCodec {
    pub fn new(id: impl Into<String>, bytes: usize) -> Self {
        ExtendableBitmapCodec { block: FixedBitmapCodec::new(id, bytes), max_segments: None }
    }

    /// Reject chains longer than `max` blocks instead of reading on. The first block is always
    /// read, so a limit of 0 behaves as 1.
    pub fn with_max_segments(mut self, max: usize) -> Self {
        self.max_segments = Some(max.max(1));
        self
    }

    pub fn bytes(&self) -> usize {
        self.block.bytes
    }
}

impl FieldCodec for ExtendableBitmapCodec {
    type Value = ExtendableBitmap;

    fn id(&self) -> &str {
        &self.block.id
    }

    fn pack(&self, bitmap: &ExtendableBitmap, output: &mut dyn Write) -> Result<(), CodecError> {
        let bytes = bitmap.to_bytes();
        if bytes.is_empty() {
            return Err(CodecError::SizeMismatch {
                id: self.block.id.clone(),
                expected: self.block.bytes,
                actual: 0,
            });
        }
        if bytes.len() % self.block.bytes != 0 {
            return Err(CodecError::NotMultiple {
                id: self.block.id.clone(),
                bytes: self.block.bytes,
                actual: bytes.len(),
            });
        }
        log::trace!("{}: packing {} bitmap bytes", self.block.id, bytes.len());
        output.write_all(&bytes)?;
        Ok(())
    }

    fn parse(&self, input: &mut dyn Read) -> Result<ExtendableBitmap, CodecError> {
        let mut bitmap = ExtendableBitmap::new(self.block.bytes)?;
        let mut segment = self.block.parse(input)?;
        let mut extensions = Vec::new();
        loop {
            let more = segment.get(1)?;
            extensions.push(segment);
            if !more {
                break;
            }
            if let Some(max) = self.max_segments {
                if extensions.len() >= max {
                    return Err(CodecError::Validation(format!(
                        "{}: bitmap continues past {} segments",
                        self.block.id, max
                    )));
                }
            }
            segment = self.block.parse(input)?;
        }
        log::trace!("{}: parsed {} bitmap segments", self.block.id, extensions.len());
        bitmap.add_extensions(extensions)?;
        Ok(bitmap)
    }
}
