//! Integration tests: bitmap codecs over byte streams, error messages, scalar encodings, MTI,
//! and data/undefined field wiring.

use iso8583_codec::scalar::{
    bcd, bcd_numeric, bin, bmp, ebmp, hex, ll_text, lll_text, numeric, text, ubyte, ubyte_bcd,
    ubyte_bin, ushort, ushort_bin, ushort_text,
};
use iso8583_codec::{
    read_fully, Bitmap, CodecError, DataField, ExtendableBitmap, FieldCodec, FixedBitmap,
    IsoMessage, Message, MessageField, MessageTypeIndicator, MtiCodec, UndefinedField, Value,
};
use std::io::Cursor;

/// Parse from the start of `bytes`; returns the value and the number of bytes consumed.
fn parse_prefix<C: FieldCodec>(codec: &C, bytes: &[u8]) -> Result<(C::Value, usize), CodecError> {
    let mut cursor = Cursor::new(bytes);
    let value = codec.parse(&mut cursor)?;
    Ok((value, cursor.position() as usize))
}

fn pack_to_vec<C: FieldCodec>(codec: &C, value: &C::Value) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    codec.pack(value, &mut out)?;
    Ok(out)
}

// --- Bitmap codecs ---

/// **Behaviour**: 1-byte blocks `[0b1000_0001, 0b0000_0001]`: the first block has its
/// continuation bit set, the second does not. Bits 1, 8 and 16 are set; 2 bytes are consumed.
#[test]
fn test_ebmp_width_one_two_blocks() {
    let codec = ebmp("bitmap", 1);
    let (bitmap, consumed) =
        parse_prefix(&codec, &[0b1000_0001, 0b0000_0001, 0xFF]).expect("parse");
    assert_eq!(consumed, 2);
    assert_eq!(bitmap.segment_count(), 2);
    assert_eq!(bitmap.ones().collect::<Vec<_>>(), vec![1, 8, 16]);
    assert_eq!(pack_to_vec(&codec, &bitmap).expect("pack"), vec![0x81, 0x01]);
}

/// **Behaviour**: 8-byte block `0x7F 00..`: continuation clear, so one block; bits 2..=8 set.
#[test]
fn test_ebmp_single_primary_block() {
    let codec = ebmp("bitmap", 8);
    let wire = [0x7F, 0, 0, 0, 0, 0, 0, 0];
    let (bitmap, consumed) = parse_prefix(&codec, &wire).expect("parse");
    assert_eq!(consumed, 8);
    assert_eq!(bitmap.segment_count(), 1);
    assert_eq!(bitmap.ones().collect::<Vec<_>>(), (2..=8).collect::<Vec<_>>());
    assert!(!bitmap.get(1).expect("get 1"));
    assert_eq!(pack_to_vec(&codec, &bitmap).expect("pack"), wire.to_vec());
}

/// **Behaviour**: Primary + secondary bitmap with field 70 present.
#[test]
fn test_ebmp_primary_and_secondary() {
    let codec = ebmp("bitmap", 8);
    let mut wire = vec![0x80, 0, 0, 0, 0, 0, 0, 0];
    wire.extend_from_slice(&[0x04, 0, 0, 0, 0, 0, 0, 0]);
    let (bitmap, consumed) = parse_prefix(&codec, &wire).expect("parse");
    assert_eq!(consumed, 16);
    assert_eq!(bitmap.ones().collect::<Vec<_>>(), vec![1, 70]);
    assert_eq!(pack_to_vec(&codec, &bitmap).expect("pack"), wire);
}

/// **Behaviour**: A continuation bit pointing at an all-zero block is read, then recalibrated
/// away; packing emits only the first block.
#[test]
fn test_ebmp_non_canonical_input_is_recalibrated() {
    let codec = ebmp("bitmap", 1);
    let (bitmap, consumed) = parse_prefix(&codec, &[0x81, 0x00]).expect("parse");
    assert_eq!(consumed, 2);
    assert!(!bitmap.get(1).expect("get 1"));
    assert_eq!(pack_to_vec(&codec, &bitmap).expect("pack"), vec![0x01]);
}

/// **Behaviour**: Fixed 8-byte codec on `0x7F 00..`: bit 1 clear, bits 2..=8 set, no other bit
/// set; packing reproduces the input exactly.
#[test]
fn test_bmp_end_to_end_0x7f() {
    let codec = bmp("bitmap", 8);
    let wire = [0x7F, 0, 0, 0, 0, 0, 0, 0];
    let (bitmap, consumed) = parse_prefix(&codec, &wire).expect("parse");
    assert_eq!(consumed, 8);
    assert_eq!(bitmap.capacity(), 64);
    assert!(!bitmap.get(1).expect("get 1"));
    for bit in 2..=8 {
        assert!(bitmap.get(bit).expect("get"), "bit {}", bit);
    }
    assert_eq!(bitmap.cardinality(), 7);
    assert_eq!(pack_to_vec(&codec, &bitmap).expect("pack"), wire.to_vec());
}

/// **Behaviour**: Fixed codec reads exactly `bytes` bytes with no continuation semantics.
#[test]
fn test_bmp_fixed_width() {
    let codec = bmp("bitmap", 2);
    let (bitmap, consumed) = parse_prefix(&codec, &[0x80, 0x01, 0x80]).expect("parse");
    assert_eq!(consumed, 2);
    assert_eq!(bitmap.ones().collect::<Vec<_>>(), vec![1, 16]);
    assert_eq!(codec.bytes(), 2);
}

/// **Behaviour**: A short stream is an end-of-stream error naming bytes read and expected.
#[test]
fn test_bitmap_end_of_stream() {
    let err = parse_prefix(&bmp("bitmap", 8), &[0x00, 0x01, 0x02]).unwrap_err();
    assert!(matches!(err, CodecError::EndOfStream { read: 3, expected: 8 }));
    assert_eq!(err.to_string(), "End of stream reached after reading 3 bytes, bytes expected [8]");

    let mut wire = vec![0x80u8];
    wire.extend_from_slice(&[0; 7]);
    let err = parse_prefix(&ebmp("bitmap", 8), &wire).unwrap_err();
    assert!(matches!(err, CodecError::EndOfStream { read: 0, expected: 8 }));
}

/// **Behaviour**: A fixed codec with an invalid width fails before reading.
#[test]
fn test_bmp_invalid_width() {
    let err = parse_prefix(&bmp("bitmap", 0), &[0x00]).unwrap_err();
    assert!(matches!(err, CodecError::InvalidBytes { bytes: 0, .. }));
    let err = parse_prefix(&ebmp("bitmap", 0), &[0x00]).unwrap_err();
    assert!(matches!(err, CodecError::InvalidBytes { bytes: 0, .. }));
}

/// **Behaviour**: Packing a bitmap of the wrong width names the codec id and both sizes.
#[test]
fn test_bitmap_pack_size_errors() {
    let err = pack_to_vec(&bmp("bitmap", 8), &FixedBitmap::new(4).expect("bitmap")).unwrap_err();
    assert!(matches!(err, CodecError::SizeMismatch { expected: 8, actual: 4, .. }));
    assert_eq!(err.to_string(), "bitmap: value must be 8 bytes, but got [4]");

    let narrow = ExtendableBitmap::with_segments(4, 1).expect("bitmap");
    let err = pack_to_vec(&ebmp("bitmap", 8), &narrow).unwrap_err();
    assert!(matches!(err, CodecError::NotMultiple { bytes: 8, actual: 4, .. }));
    assert_eq!(err.to_string(), "bitmap: value must be a multiple of 8 bytes, but got [4]");
}

/// **Behaviour**: A bitmap with no segments has no wire form; packing it fails instead of
/// writing nothing.
#[test]
fn test_ebmp_pack_without_segments() {
    let empty = ExtendableBitmap::new(8).expect("bitmap");
    let mut out: Vec<u8> = Vec::new();
    let err = ebmp("bitmap", 8).pack(&empty, &mut out).unwrap_err();
    assert!(matches!(err, CodecError::SizeMismatch { expected: 8, actual: 0, .. }));
    assert_eq!(err.to_string(), "bitmap: value must be 8 bytes, but got [0]");
    assert!(out.is_empty());
}

/// **Behaviour**: `with_max_segments(2)` accepts two blocks and rejects a third.
#[test]
fn test_ebmp_max_segments() {
    let codec = ebmp("bitmap", 1).with_max_segments(2);
    let (bitmap, _) = parse_prefix(&codec, &[0x80, 0x01]).expect("two blocks");
    assert_eq!(bitmap.segment_count(), 2);

    let err = parse_prefix(&codec, &[0x80, 0x80, 0x01]).unwrap_err();
    assert!(matches!(err, CodecError::Validation(_)));
}

/// **Behaviour**: The first block is always read, so a limit of 0 acts as a limit of 1.
#[test]
fn test_ebmp_max_segments_zero() {
    let codec = ebmp("bitmap", 1).with_max_segments(0);
    let (bitmap, consumed) = parse_prefix(&codec, &[0x01]).expect("one block");
    assert_eq!((bitmap.segment_count(), consumed), (1, 1));
    let err = parse_prefix(&codec, &[0x80, 0x01]).unwrap_err();
    assert_eq!(err.to_string(), "Validation: bitmap: bitmap continues past 1 segments");
}

/// **Behaviour**: `read_fully` returns exactly `len` bytes and leaves the rest of the stream.
#[test]
fn test_read_fully() {
    let mut input: &[u8] = &[1, 2, 3, 4];
    assert_eq!(read_fully(&mut input, 3).expect("read"), vec![1, 2, 3]);
    assert_eq!(input, &[4]);
    assert!(read_fully(&mut input, 0).expect("empty read").is_empty());
    let err = read_fully(&mut input, 2).unwrap_err();
    assert!(matches!(err, CodecError::EndOfStream { read: 1, expected: 2 }));
}

// --- Scalar codecs ---

#[test]
fn test_text_fixed_length() {
    let codec = text("41", 8);
    assert_eq!(pack_to_vec(&codec, &"TERM0001".to_string()).expect("pack"), b"TERM0001".to_vec());
    let (value, consumed) = parse_prefix(&codec, b"TERM0001rest").expect("parse");
    assert_eq!(value, "TERM0001");
    assert_eq!(consumed, 8);
    let err = pack_to_vec(&codec, &"TERM".to_string()).unwrap_err();
    assert_eq!(err.to_string(), "Validation: 41: value must be 8 characters, but got [4]");
}

/// **Behaviour**: Text length counts characters, so multi-byte UTF-8 is read whole and the
/// length prefix of a variable field is the character count.
#[test]
fn test_text_counts_characters() {
    let codec = text("43", 4);
    let (value, consumed) = parse_prefix(&codec, "Zürich".as_bytes()).expect("parse");
    assert_eq!(value, "Züri");
    assert_eq!(consumed, 5);
    assert_eq!(pack_to_vec(&codec, &"Züri".to_string()).expect("pack"), "Züri".as_bytes().to_vec());

    let mut out = pack_to_vec(&ll_text("43"), &"Köln".to_string()).expect("pack");
    assert_eq!(out, b"04K\xc3\xb6ln".to_vec());
    out.extend_from_slice(b"rest");
    assert_eq!(parse_prefix(&ll_text("43"), &out).expect("parse"), ("Köln".to_string(), 7));

    assert!(matches!(parse_prefix(&codec, &[b'a', 0x80, b'b', b'c']), Err(CodecError::Validation(_))));
}

/// **Behaviour**: BCD packs two digits per byte; odd lengths get a leading zero nibble.
#[test]
fn test_bcd() {
    let codec = bcd("3", 6);
    assert_eq!(pack_to_vec(&codec, &"001000".to_string()).expect("pack"), vec![0x00, 0x10, 0x00]);

    let odd = bcd("odd", 3);
    assert_eq!(pack_to_vec(&odd, &"123".to_string()).expect("pack"), vec![0x01, 0x23]);
    let (value, consumed) = parse_prefix(&odd, &[0x01, 0x23]).expect("parse");
    assert_eq!(value, "123");
    assert_eq!(consumed, 2);

    assert!(matches!(parse_prefix(&odd, &[0x1A, 0x00]), Err(CodecError::Validation(_))));
    let err = parse_prefix(&odd, &[0x51, 0x23]).unwrap_err();
    assert_eq!(err.to_string(), "Validation: odd: pad nibble must be 0, but got [5]");
    assert!(matches!(
        pack_to_vec(&odd, &"12a".to_string()),
        Err(CodecError::Validation(_))
    ));
}

#[test]
fn test_hex() {
    let codec = hex("52", 3);
    assert_eq!(pack_to_vec(&codec, &"ABC".to_string()).expect("pack"), vec![0x0A, 0xBC]);
    let (value, _) = parse_prefix(&codec, &[0x0A, 0xBC]).expect("parse");
    assert_eq!(value, "abc");
    assert!(matches!(parse_prefix(&codec, &[0xFA, 0xBC]), Err(CodecError::Validation(_))));
    assert!(matches!(pack_to_vec(&codec, &"xyz".to_string()), Err(CodecError::Validation(_))));
}

#[test]
fn test_binary_and_unsigned() {
    assert_eq!(pack_to_vec(&bin("52", 2), &vec![0xde, 0xad]).expect("pack"), vec![0xde, 0xad]);
    assert!(matches!(
        pack_to_vec(&bin("52", 2), &vec![0x01]),
        Err(CodecError::SizeMismatch { expected: 2, actual: 1, .. })
    ));

    assert_eq!(pack_to_vec(&ubyte("len"), &255).expect("pack"), vec![0xFF]);
    assert!(matches!(pack_to_vec(&ubyte("len"), &256), Err(CodecError::Validation(_))));
    assert_eq!(pack_to_vec(&ushort("len"), &0x1234).expect("pack"), vec![0x12, 0x34]);
    assert_eq!(parse_prefix(&ushort("len"), &[0x01, 0x00]).expect("parse").0, 256);
    assert!(matches!(pack_to_vec(&ushort("len"), &70_000), Err(CodecError::Validation(_))));
}

/// **Behaviour**: Numeric values are zero-padded to the digit count; overflow is rejected.
#[test]
fn test_numeric() {
    assert_eq!(pack_to_vec(&numeric("70", 3), &7).expect("pack"), b"007".to_vec());
    assert_eq!(parse_prefix(&numeric("70", 3), b"301").expect("parse").0, 301);
    assert!(matches!(pack_to_vec(&numeric("70", 2), &100), Err(CodecError::Validation(_))));
    assert!(matches!(parse_prefix(&numeric("70", 3), b"3x1"), Err(CodecError::Validation(_))));

    assert_eq!(pack_to_vec(&bcd_numeric("4", 12), &1500).expect("pack"), vec![0, 0, 0, 0, 0x15, 0]);
}

/// **Behaviour**: Length-prefixed fields write the body length first, then the body.
#[test]
fn test_variable_length() {
    assert_eq!(pack_to_vec(&ll_text("32"), &"hello".to_string()).expect("pack"), b"05hello".to_vec());
    let (value, consumed) = parse_prefix(&lll_text("44"), b"003abcdef").expect("parse");
    assert_eq!(value, "abc");
    assert_eq!(consumed, 6);

    assert_eq!(
        pack_to_vec(&ubyte_bin("55"), &vec![0xAA, 0xBB]).expect("pack"),
        vec![0x02, 0xAA, 0xBB]
    );
    assert_eq!(
        pack_to_vec(&ushort_bin("55"), &vec![0xAA]).expect("pack"),
        vec![0x00, 0x01, 0xAA]
    );
    assert_eq!(
        pack_to_vec(&ushort_text("48"), &"ok".to_string()).expect("pack"),
        vec![0x00, 0x02, b'o', b'k']
    );
    assert_eq!(
        pack_to_vec(&ubyte_bcd("2"), &"4111111".to_string()).expect("pack"),
        vec![0x07, 0x04, 0x11, 0x11, 0x11]
    );

    let err = parse_prefix(&ll_text("32"), b"10abc").unwrap_err();
    assert!(matches!(err, CodecError::EndOfStream { read: 3, expected: 10 }));
}

// --- MTI ---

#[test]
fn test_mti_validation() {
    let mti = MessageTypeIndicator::new("1200").expect("mti");
    assert_eq!(mti.as_str(), "1200");
    assert_eq!((mti.version(), mti.class(), mti.function(), mti.origin()), (1, 2, 0, 0));
    assert_eq!("0210".parse::<MessageTypeIndicator>().expect("parse").to_string(), "0210");

    let err = MessageTypeIndicator::new("020").unwrap_err();
    assert_eq!(err.to_string(), "Invalid MTI: [020]");
    assert!(matches!(MessageTypeIndicator::new("02a0"), Err(CodecError::InvalidMti(_))));
}

/// **Behaviour**: MTI over BCD: "1200" ↔ `[0x12, 0x00]`; over text: four ASCII digits.
#[test]
fn test_mti_codec() {
    let mti = MessageTypeIndicator::new("1200").expect("mti");
    let codec = MtiCodec::new(bcd("mti", 4));
    assert_eq!(pack_to_vec(&codec, &mti).expect("pack"), vec![0x12, 0x00]);
    assert_eq!(parse_prefix(&codec, &[0x12, 0x00]).expect("parse").0, mti);

    let codec = MtiCodec::new(text("mti", 4));
    assert_eq!(pack_to_vec(&codec, &mti).expect("pack"), b"1200".to_vec());
    assert!(matches!(parse_prefix(&codec, b"12A0"), Err(CodecError::InvalidMti(_))));
}

// --- Fields ---

/// **Behaviour**: A data field is applicable iff the message bitmap has its bit set; ids past the
/// bitmap's capacity are absent rather than an error.
#[test]
fn test_data_field_applicability() {
    let mut message = Message::new(MessageTypeIndicator::new("0200").expect("mti"), 8, 1)
        .expect("message");
    message.set_field(3, Value::Number(0)).expect("set 3");

    let f3 = DataField::new(3, numeric("3", 6));
    let f4 = DataField::new(4, numeric("4", 12));
    let f70 = DataField::new(70, numeric("70", 3));
    assert!(f3.applicable(&message));
    assert!(!f4.applicable(&message));
    assert!(!f70.applicable(&message));
    assert!(message.has_data_field(3));
    assert!(!message.has_data_field(0));
    assert_eq!(f3.id(), "3");
    assert_eq!(MessageField::field_id(&f70), 70);
}

/// **Behaviour**: A data field delegates pack/parse to its codec; `Value` conversions reject
/// the wrong variant.
#[test]
fn test_data_field_value_conversion() {
    let field = DataField::new(11, text("11", 6));
    let mut out = Vec::new();
    field.pack_value(&Value::Text("123456".into()), &mut out).expect("pack");
    assert_eq!(out, b"123456".to_vec());
    let value = field.parse_value(&mut &out[..]).expect("parse");
    assert_eq!(value, Value::Text("123456".into()));

    let err = field.pack_value(&Value::Number(1), &mut Vec::<u8>::new()).unwrap_err();
    assert!(matches!(err, CodecError::Validation(_)));
}

/// **Behaviour**: An undefined field fails on every pack and parse with its number in the message.
#[test]
fn test_undefined_field() {
    let field = UndefinedField::new(7);
    let err = field.pack(&Value::Text("x".into()), &mut Vec::<u8>::new()).unwrap_err();
    assert_eq!(err.to_string(), "7: Undefined data field");
    let err = field.parse(&mut &[0u8; 4][..]).unwrap_err();
    assert!(matches!(err, CodecError::UndefinedField { ref id } if id == "7"));
}
