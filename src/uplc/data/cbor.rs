//! CBOR form of `PlutusData`.
//!
//! Encoding is canonical: constructor tags 0-6 use CBOR tags 121-127, 7-127
//! use 1280-1400, anything larger uses tag 102 over `[tag, fields]`.
//! Non-empty lists are indefinite-length arrays, maps are definite.
//! Integers outside 64 bits become bignums (tags 2 and 3), and byte strings
//! longer than 64 bytes are split into 64-byte chunks.
//!
//! Decoding accepts both definite and indefinite containers.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive};
use thiserror::Error;

use super::PlutusData;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

const TAG_POS_BIGNUM: u64 = 2;
const TAG_NEG_BIGNUM: u64 = 3;
const TAG_CONSTR_ANY: u64 = 102;
const TAG_CONSTR_SMALL: u64 = 121;
const TAG_CONSTR_LARGE: u64 = 1280;

const CHUNK: usize = 64;

/// Failure to read a CBOR-encoded `PlutusData`. Offsets are byte offsets.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CborError {
    #[error("unexpected end of data at byte {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("unexpected initial byte {byte:#04x} at byte {offset}")]
    InvalidHeader { offset: usize, byte: u8 },

    #[error("unknown tag {tag} at byte {offset}")]
    UnknownTag { offset: usize, tag: u64 },

    #[error("map at byte {offset} has a key without a value")]
    UnpairedKey { offset: usize },

    #[error("{remaining} bytes left after the data")]
    TrailingBytes { remaining: usize },
}

// ─── Encoding ──────────────────────────────────────────────────────

pub(super) fn encode(data: &PlutusData) -> Vec<u8> {
    enum Item<'a> {
        Data(&'a PlutusData),
        Break,
    }

    let mut out = Vec::new();
    let mut stack = vec![Item::Data(data)];
    while let Some(item) = stack.pop() {
        let data = match item {
            Item::Break => {
                out.push(BREAK);
                continue;
            }
            Item::Data(d) => d,
        };
        let items = match data {
            PlutusData::Integer(n) => {
                write_integer(&mut out, n);
                continue;
            }
            PlutusData::Bytes(bytes) => {
                write_bytes(&mut out, bytes);
                continue;
            }
            PlutusData::Map(entries) => {
                write_header(&mut out, MAJOR_MAP, entries.len() as u64);
                for (k, v) in entries.iter().rev() {
                    stack.push(Item::Data(v));
                    stack.push(Item::Data(k));
                }
                continue;
            }
            PlutusData::List(items) => items,
            PlutusData::Constr { tag, fields } => {
                match *tag {
                    0..=6 => write_header(&mut out, MAJOR_TAG, TAG_CONSTR_SMALL + tag),
                    7..=127 => write_header(&mut out, MAJOR_TAG, TAG_CONSTR_LARGE + tag - 7),
                    _ => {
                        write_header(&mut out, MAJOR_TAG, TAG_CONSTR_ANY);
                        write_header(&mut out, MAJOR_ARRAY, 2);
                        write_header(&mut out, MAJOR_UNSIGNED, *tag);
                    }
                }
                fields
            }
        };
        if items.is_empty() {
            write_header(&mut out, MAJOR_ARRAY, 0);
        } else {
            out.push(MAJOR_ARRAY << 5 | INDEFINITE);
            stack.push(Item::Break);
            stack.extend(items.iter().rev().map(Item::Data));
        }
    }
    out
}

fn write_header(out: &mut Vec<u8>, major: u8, arg: u64) {
    let major = major << 5;
    match arg {
        0..=23 => out.push(major | arg as u8),
        24..=0xff => out.extend([major | 24, arg as u8]),
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend((arg as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend((arg as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend(arg.to_be_bytes());
        }
    }
}

fn write_integer(out: &mut Vec<u8>, n: &BigInt) {
    if !n.is_negative() {
        match n.to_u64() {
            Some(v) => write_header(out, MAJOR_UNSIGNED, v),
            None => {
                write_header(out, MAJOR_TAG, TAG_POS_BIGNUM);
                write_bytes(out, &n.magnitude().to_bytes_be());
            }
        }
    } else {
        let m = -(n + 1u32);
        match m.to_u64() {
            Some(v) => write_header(out, MAJOR_NEGATIVE, v),
            None => {
                write_header(out, MAJOR_TAG, TAG_NEG_BIGNUM);
                write_bytes(out, &m.magnitude().to_bytes_be());
            }
        }
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() <= CHUNK {
        write_header(out, MAJOR_BYTES, bytes.len() as u64);
        out.extend_from_slice(bytes);
        return;
    }
    out.push(MAJOR_BYTES << 5 | INDEFINITE);
    for chunk in bytes.chunks(CHUNK) {
        write_header(out, MAJOR_BYTES, chunk.len() as u64);
        out.extend_from_slice(chunk);
    }
    out.push(BREAK);
}

// ─── Decoding ──────────────────────────────────────────────────────

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, CborError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(CborError::UnexpectedEnd { offset: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8], CborError> {
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| self.pos.checked_add(len))
            .filter(|end| *end <= self.data.len())
            .ok_or(CborError::UnexpectedEnd {
                offset: self.data.len(),
            })?;
        let data = self.data;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Consume a break byte if one is next.
    fn at_break(&mut self) -> bool {
        let found = self.data.get(self.pos) == Some(&BREAK);
        if found {
            self.pos += 1;
        }
        found
    }

    /// Major type and argument; `None` for an indefinite length.
    fn header(&mut self) -> Result<(u8, Option<u64>), CborError> {
        let offset = self.pos;
        let initial = self.byte()?;
        let arg = match initial & 0x1f {
            info @ 0..=23 => Some(u64::from(info)),
            24 => Some(self.uint(1)?),
            25 => Some(self.uint(2)?),
            26 => Some(self.uint(4)?),
            27 => Some(self.uint(8)?),
            INDEFINITE if matches!(initial >> 5, MAJOR_BYTES | MAJOR_ARRAY | MAJOR_MAP) => None,
            _ => {
                return Err(CborError::InvalidHeader {
                    offset,
                    byte: initial,
                })
            }
        };
        Ok((initial >> 5, arg))
    }

    fn uint(&mut self, len: u64) -> Result<u64, CborError> {
        Ok(self
            .take(len)?
            .iter()
            .fold(0u64, |acc, b| acc << 8 | u64::from(*b)))
    }

    /// A header of the given major type with a definite argument.
    fn expect(&mut self, major: u8) -> Result<u64, CborError> {
        let offset = self.pos;
        match self.header()? {
            (m, Some(arg)) if m == major => Ok(arg),
            _ => Err(CborError::InvalidHeader {
                offset,
                byte: self.data[offset],
            }),
        }
    }

    fn array_len(&mut self) -> Result<Option<u64>, CborError> {
        let offset = self.pos;
        match self.header()? {
            (MAJOR_ARRAY, len) => Ok(len),
            _ => Err(CborError::InvalidHeader {
                offset,
                byte: self.data[offset],
            }),
        }
    }

    /// Body of a byte string whose header has been read.
    fn bytes_body(&mut self, len: Option<u64>) -> Result<Vec<u8>, CborError> {
        if let Some(len) = len {
            return Ok(self.take(len)?.to_vec());
        }
        let mut out = Vec::new();
        while !self.at_break() {
            let len = self.expect(MAJOR_BYTES)?;
            out.extend_from_slice(self.take(len)?);
        }
        Ok(out)
    }

    fn byte_string(&mut self) -> Result<Vec<u8>, CborError> {
        let offset = self.pos;
        match self.header()? {
            (MAJOR_BYTES, len) => self.bytes_body(len),
            _ => Err(CborError::InvalidHeader {
                offset,
                byte: self.data[offset],
            }),
        }
    }
}

enum Kind {
    Constr(u64),
    List,
    Map,
}

/// A container whose items are still being read.
struct Frame {
    kind: Kind,
    offset: usize,
    items: Vec<PlutusData>,
    /// Items still expected; `None` until a break for indefinite lengths.
    remaining: Option<u64>,
}

impl Frame {
    fn new(kind: Kind, offset: usize, len: Option<u64>) -> Self {
        let remaining = match (&kind, len) {
            (Kind::Map, Some(n)) => Some(n.saturating_mul(2)),
            (_, len) => len,
        };
        let capacity = remaining.unwrap_or(0).min(1024) as usize;
        Frame {
            kind,
            offset,
            items: Vec::with_capacity(capacity),
            remaining,
        }
    }

    fn is_closed(&self, r: &mut Reader) -> bool {
        match self.remaining {
            Some(n) => n == 0,
            None => r.at_break(),
        }
    }

    fn push(&mut self, item: PlutusData) {
        self.items.push(item);
        if let Some(n) = &mut self.remaining {
            *n = n.saturating_sub(1);
        }
    }

    fn finish(self) -> Result<PlutusData, CborError> {
        let Frame {
            kind,
            offset,
            mut items,
            ..
        } = self;
        Ok(match kind {
            Kind::Constr(tag) => PlutusData::constr(tag, items),
            Kind::List => PlutusData::List(items),
            Kind::Map => {
                if items.len() % 2 != 0 {
                    return Err(CborError::UnpairedKey { offset });
                }
                let mut entries = Vec::with_capacity(items.len() / 2);
                let mut rest = items.drain(..);
                while let (Some(k), Some(v)) = (rest.next(), rest.next()) {
                    entries.push((k, v));
                }
                PlutusData::Map(entries)
            }
        })
    }
}

enum Item {
    Value(PlutusData),
    Open(Frame),
}

pub(super) fn decode(bytes: &[u8]) -> Result<PlutusData, CborError> {
    let mut r = Reader {
        data: bytes,
        pos: 0,
    };
    let mut open: Vec<Frame> = Vec::new();
    loop {
        let closed = match open.last() {
            Some(frame) => frame.is_closed(&mut r),
            None => false,
        };
        let value = match open.pop() {
            Some(frame) if closed => frame.finish()?,
            Some(frame) => {
                open.push(frame);
                match read_item(&mut r)? {
                    Item::Value(v) => v,
                    Item::Open(frame) => {
                        open.push(frame);
                        continue;
                    }
                }
            }
            None => match read_item(&mut r)? {
                Item::Value(v) => v,
                Item::Open(frame) => {
                    open.push(frame);
                    continue;
                }
            },
        };
        match open.last_mut() {
            Some(parent) => parent.push(value),
            None => {
                let remaining = bytes.len() - r.pos;
                if remaining > 0 {
                    return Err(CborError::TrailingBytes { remaining });
                }
                return Ok(value);
            }
        }
    }
}

fn read_item(r: &mut Reader) -> Result<Item, CborError> {
    let offset = r.pos;
    let (major, arg) = r.header()?;
    Ok(match (major, arg) {
        (MAJOR_UNSIGNED, Some(n)) => Item::Value(PlutusData::integer(n)),
        (MAJOR_NEGATIVE, Some(n)) => Item::Value(PlutusData::Integer(-(BigInt::from(n) + 1u32))),
        (MAJOR_BYTES, len) => Item::Value(PlutusData::Bytes(r.bytes_body(len)?)),
        (MAJOR_ARRAY, len) => Item::Open(Frame::new(Kind::List, offset, len)),
        (MAJOR_MAP, len) => Item::Open(Frame::new(Kind::Map, offset, len)),
        (MAJOR_TAG, Some(tag)) => match tag {
            TAG_POS_BIGNUM | TAG_NEG_BIGNUM => {
                let magnitude = BigInt::from_bytes_be(Sign::Plus, &r.byte_string()?);
                Item::Value(PlutusData::Integer(if tag == TAG_POS_BIGNUM {
                    magnitude
                } else {
                    -(magnitude + 1u32)
                }))
            }
            121..=127 => {
                let len = r.array_len()?;
                Item::Open(Frame::new(Kind::Constr(tag - TAG_CONSTR_SMALL), offset, len))
            }
            1280..=1400 => {
                let len = r.array_len()?;
                Item::Open(Frame::new(
                    Kind::Constr(tag - TAG_CONSTR_LARGE + 7),
                    offset,
                    len,
                ))
            }
            TAG_CONSTR_ANY => {
                if r.array_len()? != Some(2) {
                    return Err(CborError::InvalidHeader {
                        offset,
                        byte: r.data[offset],
                    });
                }
                let constr = r.expect(MAJOR_UNSIGNED)?;
                let len = r.array_len()?;
                Item::Open(Frame::new(Kind::Constr(constr), offset, len))
            }
            tag => return Err(CborError::UnknownTag { offset, tag }),
        },
        _ => {
            return Err(CborError::InvalidHeader {
                offset,
                byte: r.data[offset],
            })
        }
    })
}
