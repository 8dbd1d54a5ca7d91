//! Decode the MTI and extendable bitmap of an ISO 8583 message and list the present fields.
//!
//! Usage:
//!   iso_dump [OPTIONS] [HEX]
//!   echo 0200F000... | iso_dump
//!
//! Options:
//!   --bytes N          Bitmap segment width in bytes (default 8)
//!   --mti text|bcd     MTI encoding: 4 ASCII digits or 2 BCD bytes (default text)
//!   --max-segments N   Reject bitmaps chaining more than N segments
//!
//! Whitespace in the hex input is ignored. Exits with code 1 if the input cannot be decoded.

use anyhow::{anyhow, bail, Context};
use iso8583_codec::dump::bitmap_hex;
use iso8583_codec::scalar::{bcd, text};
use iso8583_codec::{ExtendableBitmapCodec, FieldCodec, MessageTypeIndicator, MtiCodec};
use std::io::{self, Cursor, Read};

#[derive(Clone, Copy)]
enum MtiEncoding {
    Text,
    Bcd,
}

fn take_option(args: &mut Vec<String>, name: &str) -> anyhow::Result<Option<String>> {
    match args.iter().position(|a| a == name) {
        Some(pos) => {
            if pos + 1 >= args.len() {
                bail!("{} needs a value", name);
            }
            let value = args.remove(pos + 1);
            args.remove(pos);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn decode_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let digits: Vec<u8> = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| anyhow!("invalid hex character {:?}", c))
        })
        .collect::<anyhow::Result<_>>()?;
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    Ok(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
}

fn parse_mti(input: &mut dyn Read, encoding: MtiEncoding) -> anyhow::Result<MessageTypeIndicator> {
    let mti = match encoding {
        MtiEncoding::Text => MtiCodec::new(text("mti", 4)).parse(input)?,
        MtiEncoding::Bcd => MtiCodec::new(bcd("mti", 4)).parse(input)?,
    };
    Ok(mti)
}

fn run(mut args: Vec<String>) -> anyhow::Result<()> {
    let bytes = match take_option(&mut args, "--bytes")? {
        Some(v) => v.parse::<usize>().context("--bytes")?,
        None => 8,
    };
    let encoding = match take_option(&mut args, "--mti")?.as_deref() {
        None | Some("text") => MtiEncoding::Text,
        Some("bcd") => MtiEncoding::Bcd,
        Some(other) => bail!("--mti must be text or bcd, got {}", other),
    };
    let mut codec = ExtendableBitmapCodec::new("bitmap", bytes);
    if let Some(v) = take_option(&mut args, "--max-segments")? {
        codec = codec.with_max_segments(v.parse::<usize>().context("--max-segments")?);
    }

    let src = match args.first() {
        Some(hex) => hex.clone(),
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let data = decode_hex(&src)?;
    let mut cursor = Cursor::new(data.as_slice());

    let mti = parse_mti(&mut cursor, encoding)?;
    let bitmap = codec.parse(&mut cursor)?;
    let fields: Vec<String> = bitmap
        .iter_ones()
        .filter(|&bit| !bitmap.is_continuation_bit(bit))
        .map(|bit| bit.to_string())
        .collect();

    println!("MTI: {}", mti);
    println!("Bitmap: {} ({} segment(s))", bitmap_hex(&bitmap), bitmap.segment_count());
    println!("Fields: {}", fields.join(" "));
    let remaining = data.len() - cursor.position() as usize;
    if remaining > 0 {
        println!("Field data: {} byte(s)", remaining);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(args) {
        eprintln!("iso_dump: {:#}", e);
        std::process::exit(1);
    }
}
