//! Bit-level writer and reader.
//!
//! Bits are packed most significant first. Naturals use 7-bit chunks, least
//! significant chunk first, each preceded by a continuation bit.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use super::CodecError;

/// How a stream is filled up to the next byte boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PadOptions {
    /// Emit a whole byte when the stream is already aligned.
    pub add_byte_when_aligned: bool,
    /// Make the last padding bit a one instead of a zero.
    pub end_with_one: bool,
}

impl Default for PadOptions {
    fn default() -> Self {
        Self {
            add_byte_when_aligned: true,
            end_with_one: true,
        }
    }
}

impl PadOptions {
    /// Zero bits only, nothing extra when aligned.
    pub fn zeros() -> Self {
        Self {
            add_byte_when_aligned: false,
            end_with_one: false,
        }
    }

    /// Bits needed to pad a stream of `len` bits.
    fn pad_len(&self, len: usize) -> usize {
        match len % 8 {
            0 if self.add_byte_when_aligned => 8,
            0 => 0,
            used => 8 - used,
        }
    }
}

// ─── Writer ────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_aligned(&self) -> bool {
        self.len % 8 == 0
    }

    pub fn bit(&mut self, bit: bool) {
        if self.is_aligned() {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Write the low `count` bits of `value`, most significant first.
    pub fn bits(&mut self, value: u64, count: u32) {
        for i in (0..count).rev() {
            self.bit((value >> i) & 1 == 1);
        }
    }

    pub fn byte(&mut self, byte: u8) {
        self.bits(u64::from(byte), 8);
    }

    /// Append another stream without realigning.
    pub fn append(&mut self, other: &BitWriter) {
        for i in 0..other.len {
            self.bit(other.bytes[i / 8] & (0x80 >> (i % 8)) != 0);
        }
    }

    pub fn natural(&mut self, value: &BigUint) {
        let mut rest = value.clone();
        loop {
            let chunk = (&rest % 128u32).to_u64().unwrap_or(0);
            rest >>= 7;
            let more = !rest.is_zero();
            self.bit(more);
            self.bits(chunk, 7);
            if !more {
                break;
            }
        }
    }

    pub fn natural_u64(&mut self, value: u64) {
        let mut rest = value;
        loop {
            let chunk = rest & 0x7f;
            rest >>= 7;
            self.bit(rest != 0);
            self.bits(chunk, 7);
            if rest == 0 {
                break;
            }
        }
    }

    /// Zigzag-encoded signed integer.
    pub fn integer(&mut self, value: &BigInt) {
        self.natural(&zigzag(value));
    }

    pub fn pad(&mut self, options: &PadOptions) {
        let n = options.pad_len(self.len);
        if n == 0 {
            return;
        }
        self.bits(0, n as u32 - 1);
        self.bit(options.end_with_one);
    }

    /// Standard filler: zeros ending in a one, a full byte when aligned.
    pub fn filler(&mut self) {
        self.pad(&PadOptions::default());
    }

    /// The written bytes; a partial last byte is zero-filled.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn zigzag(value: &BigInt) -> BigUint {
    let doubled = value.magnitude() << 1u32;
    match value.sign() {
        Sign::Minus => doubled - 1u32,
        _ => doubled,
    }
}

pub fn unzigzag(value: &BigUint) -> BigInt {
    let half = BigInt::from(value >> 1u32);
    if value.bit(0) {
        -half - 1
    } else {
        half
    }
}

// ─── Reader ────────────────────────────────────────────────────────

pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current bit offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// Whole bytes not yet touched.
    pub fn remaining_bytes(&self) -> usize {
        self.data.len().saturating_sub(self.pos.div_ceil(8))
    }

    pub fn bit(&mut self) -> Result<bool, CodecError> {
        let byte = self
            .data
            .get(self.pos / 8)
            .ok_or(CodecError::UnexpectedEnd { bit: self.pos })?;
        let bit = byte & (0x80 >> (self.pos % 8)) != 0;
        self.pos += 1;
        Ok(bit)
    }

    pub fn bits(&mut self, count: u32) -> Result<u64, CodecError> {
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.bit()?);
        }
        Ok(value)
    }

    pub fn byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.bits(8)? as u8)
    }

    pub fn natural(&mut self) -> Result<BigUint, CodecError> {
        let start = self.pos;
        let mut value = BigUint::zero();
        let mut shift = 0u64;
        loop {
            let (more, chunk) = self
                .bit()
                .and_then(|more| Ok((more, self.bits(7)?)))
                .map_err(|_| CodecError::UnterminatedInteger { bit: start })?;
            value |= BigUint::from(chunk) << shift;
            shift += 7;
            if !more {
                return Ok(value);
            }
        }
    }

    pub fn natural_u64(&mut self) -> Result<u64, CodecError> {
        self.natural()?.to_u64().ok_or(CodecError::IndexOverflow)
    }

    pub fn integer(&mut self) -> Result<BigInt, CodecError> {
        Ok(unzigzag(&self.natural()?))
    }

    /// Consume padding written with `options`.
    pub fn pad(&mut self, options: &PadOptions) -> Result<(), CodecError> {
        let start = self.pos;
        let n = options.pad_len(self.pos);
        if n == 0 {
            return Ok(());
        }
        let expected = u64::from(options.end_with_one);
        if self.bits(n as u32)? != expected {
            return Err(CodecError::InvalidPadding { bit: start });
        }
        Ok(())
    }

    pub fn filler(&mut self) -> Result<(), CodecError> {
        self.pad(&PadOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bit_string(w: &BitWriter) -> String {
        let bytes = w.clone().into_bytes();
        (0..w.len())
            .map(|i| if bytes[i / 8] & (0x80 >> (i % 8)) != 0 { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn zero_is_a_single_terminated_chunk() {
        let mut w = BitWriter::new();
        w.natural(&BigUint::zero());
        assert_eq!(bit_string(&w), "00000000");
    }

    #[test]
    fn chunks_are_least_significant_first() {
        let mut w = BitWriter::new();
        w.natural_u64(300);
        // 300 = 0b10_0101100: low chunk 0101100, then 0000010.
        assert_eq!(bit_string(&w), "1010110000000010");

        let mut big = BitWriter::new();
        big.natural(&BigUint::from(300u32));
        assert_eq!(bit_string(&big), bit_string(&w));
    }

    #[test]
    fn naturals_read_back() {
        let values: [u64; 7] = [0, 1, 127, 128, 16_383, 16_384, u64::MAX];
        let mut w = BitWriter::new();
        w.bit(true);
        for v in values {
            w.natural_u64(v);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert!(r.bit().unwrap());
        for v in values {
            assert_eq!(r.natural_u64().unwrap(), v);
        }
    }

    #[test]
    fn huge_naturals_read_back() {
        let n = BigUint::from(7u32).pow(200);
        let mut w = BitWriter::new();
        w.natural(&n);
        let bytes = w.into_bytes();
        assert_eq!(BitReader::new(&bytes).natural().unwrap(), n);
        assert_eq!(
            BitReader::new(&bytes).natural_u64(),
            Err(CodecError::IndexOverflow)
        );
    }

    #[test]
    fn zigzag_interleaves_signs() {
        let cases = [(0, 0u32), (-1, 1), (1, 2), (-2, 3), (42, 84)];
        for (signed, unsigned) in cases {
            assert_eq!(zigzag(&BigInt::from(signed)), BigUint::from(unsigned));
            assert_eq!(unzigzag(&BigUint::from(unsigned)), BigInt::from(signed));
        }
    }

    #[test]
    fn unterminated_natural_is_reported() {
        let bytes = [0xff, 0xff];
        assert_eq!(
            BitReader::new(&bytes).natural(),
            Err(CodecError::UnterminatedInteger { bit: 0 })
        );
    }

    #[test]
    fn padding_an_aligned_stream() {
        let mut w = BitWriter::new();
        w.byte(0xab);
        let mut without = w.clone();
        without.pad(&PadOptions {
            add_byte_when_aligned: false,
            end_with_one: true,
        });
        assert_eq!(without.len(), 8);

        w.pad(&PadOptions::default());
        assert_eq!(w.len(), 16);
        assert_eq!(w.into_bytes(), vec![0xab, 0x01]);
    }

    #[test]
    fn padding_an_unaligned_stream() {
        let mut w = BitWriter::new();
        w.bits(0b101, 3);
        w.pad(&PadOptions::default());
        assert_eq!(bit_string(&w), "10100001");

        let mut z = BitWriter::new();
        z.bits(0b101, 3);
        z.pad(&PadOptions::zeros());
        assert_eq!(bit_string(&z), "10100000");
    }

    #[test]
    fn reader_checks_padding() {
        let mut r = BitReader::new(&[0b1010_0001]);
        r.bits(3).unwrap();
        assert!(r.filler().is_ok());
        assert!(r.is_aligned());

        let mut bad = BitReader::new(&[0b1010_0011]);
        bad.bits(3).unwrap();
        assert_eq!(bad.filler(), Err(CodecError::InvalidPadding { bit: 3 }));
    }

    #[test]
    fn append_keeps_bit_offsets() {
        let mut a = BitWriter::new();
        a.bits(0b11, 2);
        let mut b = BitWriter::new();
        b.bits(0b0101, 4);
        a.append(&b);
        assert_eq!(a.len(), 6);
        assert_eq!(bit_string(&a), "110101");
    }

    #[test]
    fn reading_past_the_end_fails() {
        let mut r = BitReader::new(&[0x00]);
        assert_eq!(r.bits(8), Ok(0));
        assert_eq!(r.bit(), Err(CodecError::UnexpectedEnd { bit: 8 }));
    }
}
