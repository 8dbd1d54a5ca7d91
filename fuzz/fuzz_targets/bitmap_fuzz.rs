//! Bitmap fuzz target: parse arbitrary bytes as an extendable bitmap, then pack it again.
//! Neither step may panic. Packing never emits more bytes than parsing consumed, and re-parsing
//! the packed bytes yields the same set bits.
//! Build with: cargo fuzz run bitmap_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use iso8583_codec::{scalar, Bitmap, FieldCodec};

    let Some((&width, rest)) = data.split_first() else {
        return;
    };
    let bytes = (width % 16) as usize + 1;
    let codec = scalar::ebmp("bitmap", bytes).with_max_segments(64);
    let mut input = rest;
    let bitmap = match codec.parse(&mut input) {
        Ok(b) => b,
        Err(_) => return,
    };
    let mut out = Vec::new();
    codec.pack(&bitmap, &mut out).expect("parsed bitmap must pack");
    assert!(out.len() <= rest.len());
    assert_eq!(out.len() % bytes, 0);
    let reparsed = codec.parse(&mut out.as_slice()).expect("packed bitmap must parse");
    assert!(bitmap.ones().eq(reparsed.ones()));
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run bitmap_fuzz");
}
