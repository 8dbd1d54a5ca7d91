//! Format bitmaps, values and messages for display (dump text).

use crate::bitmap::Bitmap;
use crate::message::Message;
use crate::value::Value;

fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Wire bytes of a bitmap as uppercase hex, the way bitmaps are usually written in logs.
pub fn bitmap_hex(bitmap: &dyn Bitmap) -> String {
    bitmap.to_bytes().iter().map(|b| format!("{:02X}", b)).collect()
}

/// One-line rendering of a field value.
pub fn format_value(v: &Value) -> String {
    match v {
        Value::Text(s) => format!("{:?}", s),
        Value::Binary(b) => format!("hex({})", hex_string(b)),
        Value::Number(n) => format!("{}", n),
        Value::Bitmap(b) => format!("bitmap({})", bitmap_hex(b)),
        Value::ExtendableBitmap(b) => format!("bitmap({})", bitmap_hex(b)),
        Value::Mti(m) => format!("mti({})", m),
    }
}

/// Multi-line dump: MTI, bitmap, then one line per present field.
pub fn dump_message(message: &Message) -> String {
    let mut lines = vec![
        format!("MTI: {}", message.mti()),
        format!("Bitmap: {}", bitmap_hex(message.bitmap())),
    ];
    for id in message.present_fields() {
        let value = match message.field(id) {
            Some(v) => format_value(v),
            None => "<no value>".to_string(),
        };
        lines.push(format!("  [{:03}] {}", id, value));
    }
    lines.join("\n")
}
