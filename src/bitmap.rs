//! Presence bitmaps: fixed-size bit sets and extendable chains of them.
//!
//! Bits are **1-indexed**. On the wire, bit 1 is the most significant bit of byte 0, bit 8 the
//! least significant bit of byte 0, bit 9 the most significant bit of byte 1, and so on.
//!
//! ## Extendable bitmaps
//!
//! An [`ExtendableBitmap`] is a list of equally sized [`FixedBitmap`] segments. Bit 1 of each
//! segment is its **continuation bit**: it is set iff the following segment has any bit set.
//! The invariant is restored after every mutation, so callers never set continuation bits
//! themselves; setting or clearing one directly is overridden immediately.
//!
//! | Global bit | Segment (8-byte segments) | Meaning |
//! |------------|---------------------------|---------|
//! | 1 | 0 | secondary bitmap follows |
//! | 2..=64 | 0 | fields 2–64 |
//! | 65 | 1 | tertiary bitmap follows |
//! | 66..=128 | 1 | fields 66–128 |

use crate::codec::CodecError;

/// Largest per-bitmap byte width: `bytes * 8` must fit the signed 32-bit bit index space.
pub const MAX_BYTES: usize = (i32::MAX as usize) / 8;

/// Common capability set of fixed and extendable bitmaps.
pub trait Bitmap {
    /// Total number of addressable bits.
    fn capacity(&self) -> usize;

    /// Whether `bit` (1-indexed) is set.
    fn get(&self, bit: usize) -> Result<bool, CodecError>;

    fn set(&mut self, bit: usize) -> Result<(), CodecError>;

    fn clear(&mut self, bit: usize) -> Result<(), CodecError>;

    /// Number of set bits.
    fn cardinality(&self) -> usize;

    /// Ascending positions of all set bits. Each call starts a fresh iteration.
    fn ones(&self) -> Box<dyn Iterator<Item = usize> + '_>;

    /// Wire representation (MSB-first).
    fn to_bytes(&self) -> Vec<u8>;
}

pub(crate) fn check_bytes(bytes: usize) -> Result<(), CodecError> {
    if bytes == 0 || bytes > MAX_BYTES {
        return Err(CodecError::InvalidBytes { bytes, max: MAX_BYTES });
    }
    Ok(())
}

fn check_bit(bit: usize, capacity: usize) -> Result<(), CodecError> {
    if bit == 0 || bit > capacity {
        return Err(CodecError::BitOutOfRange { capacity, bit });
    }
    Ok(())
}

/// Fixed-capacity bitmap of `bytes * 8` bits, stored in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixedBitmap {
    bits: Vec<u8>,
}

impl FixedBitmap {
    /// Empty bitmap of `bytes` bytes. Fails if `bytes` is 0 or above [`MAX_BYTES`].
    pub fn new(bytes: usize) -> Result<Self, CodecError> {
        check_bytes(bytes)?;
        Ok(FixedBitmap { bits: vec![0u8; bytes] })
    }

    /// Bitmap whose capacity is `bytes.len() * 8` and whose set bits follow the wire layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        check_bytes(bytes.len())?;
        Ok(FixedBitmap { bits: bytes.to_vec() })
    }

    /// Width in bytes.
    pub fn byte_len(&self) -> usize {
        self.bits.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Ascending 1-indexed positions of set bits.
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            bytes: &self.bits,
            index: 0,
            current: self.bits.first().copied().unwrap_or(0),
        }
    }

    fn mask(bit: usize) -> (usize, u8) {
        let idx = bit - 1;
        (idx / 8, 0x80u8 >> (idx % 8))
    }
}

impl Bitmap for FixedBitmap {
    fn capacity(&self) -> usize {
        self.bits.len() * 8
    }

    fn get(&self, bit: usize) -> Result<bool, CodecError> {
        check_bit(bit, self.capacity())?;
        let (byte, mask) = Self::mask(bit);
        Ok(self.bits[byte] & mask != 0)
    }

    fn set(&mut self, bit: usize) -> Result<(), CodecError> {
        check_bit(bit, self.capacity())?;
        let (byte, mask) = Self::mask(bit);
        self.bits[byte] |= mask;
        Ok(())
    }

    fn clear(&mut self, bit: usize) -> Result<(), CodecError> {
        check_bit(bit, self.capacity())?;
        let (byte, mask) = Self::mask(bit);
        self.bits[byte] &= !mask;
        Ok(())
    }

    fn cardinality(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    fn ones(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.iter_ones())
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bits.clone()
    }
}

/// Iterator over the set bits of a [`FixedBitmap`], lowest position first.
#[derive(Debug, Clone)]
pub struct Ones<'a> {
    bytes: &'a [u8],
    index: usize,
    /// Unvisited set bits of `bytes[index]`.
    current: u8,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let offset = self.current.leading_zeros() as usize;
                self.current &= !(0x80u8 >> offset);
                return Some(self.index * 8 + offset + 1);
            }
            self.index += 1;
            self.current = *self.bytes.get(self.index)?;
        }
    }
}

/// Chain of equally sized [`FixedBitmap`] segments linked by continuation bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendableBitmap {
    bytes: usize,
    segments: Vec<FixedBitmap>,
}

impl ExtendableBitmap {
    /// Bitmap with `bytes`-wide segments and no segments yet (capacity 0).
    pub fn new(bytes: usize) -> Result<Self, CodecError> {
        check_bytes(bytes)?;
        Ok(ExtendableBitmap { bytes, segments: Vec::new() })
    }

    /// Bitmap pre-extended with `count` empty segments.
    pub fn with_segments(bytes: usize, count: usize) -> Result<Self, CodecError> {
        let mut bitmap = Self::new(bytes)?;
        let segments = (0..count)
            .map(|_| FixedBitmap::new(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        bitmap.add_extensions(segments)?;
        Ok(bitmap)
    }

    /// Append segments in order. Every segment must be `bytes * 8` bits wide; on mismatch nothing
    /// is appended.
    pub fn add_extensions(
        &mut self,
        extensions: Vec<FixedBitmap>,
    ) -> Result<&mut Self, CodecError> {
        let expected = self.segment_capacity();
        if let Some(bad) = extensions.iter().find(|e| e.capacity() != expected) {
            return Err(CodecError::ExtensionCapacity { expected, actual: bad.capacity() });
        }
        self.segments.extend(extensions);
        self.recalibrate();
        Ok(self)
    }

    /// Per-segment width in bytes.
    pub fn segment_bytes(&self) -> usize {
        self.bytes
    }

    pub fn segment_capacity(&self) -> usize {
        self.bytes * 8
    }

    pub fn segments(&self) -> &[FixedBitmap] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Whether `bit` is the continuation bit of some segment (1, width+1, 2*width+1, ...).
    pub fn is_continuation_bit(&self, bit: usize) -> bool {
        bit > 0 && (bit - 1) % self.segment_capacity() == 0
    }

    /// Ascending global positions of set bits.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        let width = self.segment_capacity();
        self.segments
            .iter()
            .enumerate()
            .flat_map(move |(i, s)| s.iter_ones().map(move |bit| i * width + bit))
    }

    fn locate(&self, bit: usize) -> Result<(usize, usize), CodecError> {
        check_bit(bit, self.capacity())?;
        let width = self.segment_capacity();
        Ok(((bit - 1) / width, (bit - 1) % width + 1))
    }

    /// Restore the continuation invariant, last segment first.
    fn recalibrate(&mut self) {
        let mut next_has_data = false;
        for segment in self.segments.iter_mut().rev() {
            if next_has_data {
                segment.bits[0] |= 0x80;
            } else {
                segment.bits[0] &= 0x7F;
            }
            next_has_data = !segment.is_empty();
        }
    }
}

impl Bitmap for ExtendableBitmap {
    fn capacity(&self) -> usize {
        self.segments.len() * self.segment_capacity()
    }

    fn get(&self, bit: usize) -> Result<bool, CodecError> {
        let (segment, local) = self.locate(bit)?;
        self.segments[segment].get(local)
    }

    fn set(&mut self, bit: usize) -> Result<(), CodecError> {
        let (segment, local) = self.locate(bit)?;
        self.segments[segment].set(local)?;
        self.recalibrate();
        Ok(())
    }

    fn clear(&mut self, bit: usize) -> Result<(), CodecError> {
        let (segment, local) = self.locate(bit)?;
        self.segments[segment].clear(local)?;
        self.recalibrate();
        Ok(())
    }

    fn cardinality(&self) -> usize {
        self.segments.iter().map(FixedBitmap::cardinality).sum()
    }

    fn ones(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.iter_ones())
    }

    /// Segment 0, then every following segment up to the first empty one.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.capacity() / 8);
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && segment.is_empty() {
                break;
            }
            out.extend_from_slice(segment.as_bytes());
        }
        out
    }
}
