//! # iso8583-codec — ISO 8583 bitmap codec
//!
//! Converts ISO 8583-style messages between bytes on the wire and typed field values. Which
//! fields are present is declared by a **bitmap**; this crate provides the bitmap data
//! structures, their wire codecs, and the presence-driven field wiring on top.
//!
//! ## Building blocks
//!
//! - **Bitmaps** ([`bitmap`]): [`FixedBitmap`] (one block of `bytes * 8` bits) and
//!   [`ExtendableBitmap`] (a chain of blocks where bit 1 of each block says "another block with
//!   data follows"). Bits are 1-indexed, MSB-first on the wire.
//! - **Codecs** ([`codec`], [`scalar`]): the [`FieldCodec`] trait, bitmap wire codecs, and scalar
//!   encodings (text, BCD, hex, binary, length-prefixed).
//! - **Fields** ([`field`]): [`DataField`] is present iff the message bitmap has its bit set;
//!   [`UndefinedField`] rejects any use.
//! - **MTI** ([`mti`]): validated 4-digit [`MessageTypeIndicator`].
//! - **Messages** ([`message`]): [`Message`] + [`MessageCodec`] assemble everything in field order.
//!
//! ## Wire layout of an extendable bitmap (8-byte blocks)
//!
//! ```text
//! 0x80 00 00 00 00 00 00 00 | 0x04 00 00 00 00 00 00 00
//!  ^ bit 1: block 2 follows    ^ bit 1 clear: last block; bit 70 set
//! ```
//!
//! ## Example
//!
//! ```
//! use iso8583_codec::{scalar, Bitmap, FieldCodec};
//!
//! let codec = scalar::ebmp("bitmap", 1);
//! let bitmap = codec.parse(&mut &[0b1000_0001u8, 0b0000_0001][..]).unwrap();
//! assert_eq!(bitmap.ones().collect::<Vec<_>>(), vec![1, 8, 16]);
//! ```

pub mod bitmap;
pub mod codec;
pub mod dump;
pub mod field;
pub mod message;
pub mod mti;
pub mod scalar;
pub mod value;

pub use bitmap::{Bitmap, ExtendableBitmap, FixedBitmap, MAX_BYTES};
pub use codec::{read_fully, CodecError, ExtendableBitmapCodec, FieldCodec, FixedBitmapCodec};
pub use field::{DataField, IsoMessage, MessageField, UndefinedField};
pub use message::{Message, MessageCodec};
pub use mti::{MessageTypeIndicator, MtiCodec};
pub use value::{FieldValue, Value};
