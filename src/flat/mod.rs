//! Flat binary encoding of UPLC programs.
//!
//! A program is its version (three naturals), its term and a closing pad.
//! Terms are written in pre-order with a 4-bit tag per node; the codec keeps
//! a single running bit stream, so nothing is realigned between subterms
//! except where the format asks for filler (before byte strings and at the
//! end).

pub mod bits;
mod error;

pub use bits::{BitReader, BitWriter, PadOptions};
pub use error::CodecError;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use tracing::{debug, instrument};

use crate::uplc::{Constant, DefaultFunction, PlutusData, Program, Term, Type, Version};

// ─── Tags ──────────────────────────────────────────────────────────

const TERM_TAG_BITS: u32 = 4;
const TAG_VAR: u64 = 0;
const TAG_DELAY: u64 = 1;
const TAG_LAMBDA: u64 = 2;
const TAG_APPLY: u64 = 3;
const TAG_CONSTANT: u64 = 4;
const TAG_FORCE: u64 = 5;
const TAG_ERROR: u64 = 6;
const TAG_BUILTIN: u64 = 7;

const BUILTIN_TAG_BITS: u32 = 7;

const TYPE_TAG_BITS: u32 = 4;
const TYPE_INTEGER: u8 = 0;
const TYPE_BYTESTRING: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_UNIT: u8 = 3;
const TYPE_BOOL: u8 = 4;
const TYPE_LIST: u8 = 5;
const TYPE_PAIR: u8 = 6;
const TYPE_APPLY: u8 = 7;
const TYPE_DATA: u8 = 8;

const MAX_CHUNK: usize = 255;

/// Deepest nesting of `list` and `pair` accepted in a constant's type.
pub const MAX_TYPE_DEPTH: usize = 64;

// ─── Programs ──────────────────────────────────────────────────────

/// Encode with the standard closing pad.
pub fn encode_program(program: &Program) -> Vec<u8> {
    encode_program_with(program, &PadOptions::default())
}

#[instrument(skip_all, name = "flat.encode")]
pub fn encode_program_with(program: &Program, padding: &PadOptions) -> Vec<u8> {
    let mut w = BitWriter::new();
    encode_version(&mut w, &program.version);
    encode_term(&mut w, &program.term);
    w.pad(padding);
    let bytes = w.into_bytes();
    debug!(bytes = bytes.len(), "program encoded");
    bytes
}

/// Decode a program closed with the standard pad.
pub fn decode_program(bytes: &[u8]) -> Result<Program, CodecError> {
    decode_program_with(bytes, &PadOptions::default())
}

#[instrument(skip_all, name = "flat.decode", fields(bytes = bytes.len()))]
pub fn decode_program_with(bytes: &[u8], padding: &PadOptions) -> Result<Program, CodecError> {
    let mut r = BitReader::new(bytes);
    let version = Version::new(r.natural_u64()?, r.natural_u64()?, r.natural_u64()?);
    let term = decode_term(&mut r)?;
    r.pad(padding)?;
    let remaining = r.remaining_bytes();
    if remaining > 0 {
        return Err(CodecError::TrailingBytes { remaining });
    }
    Ok(Program::new(version, term))
}

fn encode_version(w: &mut BitWriter, version: &Version) {
    w.natural_u64(version.major);
    w.natural_u64(version.minor);
    w.natural_u64(version.patch);
}

// ─── Terms ─────────────────────────────────────────────────────────

pub fn encode_term(w: &mut BitWriter, term: &Term) {
    let mut stack = vec![term];
    while let Some(term) = stack.pop() {
        match term {
            Term::Var(index) => {
                w.bits(TAG_VAR, TERM_TAG_BITS);
                match index.checked_add(1) {
                    Some(n) => w.natural_u64(n),
                    None => w.natural(&(BigUint::from(*index) + 1u32)),
                }
            }
            Term::Delay(body) => {
                w.bits(TAG_DELAY, TERM_TAG_BITS);
                stack.push(body);
            }
            Term::Lambda(body) => {
                w.bits(TAG_LAMBDA, TERM_TAG_BITS);
                stack.push(body);
            }
            Term::Apply(fun, arg) => {
                w.bits(TAG_APPLY, TERM_TAG_BITS);
                stack.push(arg);
                stack.push(fun);
            }
            Term::Constant(c) => {
                w.bits(TAG_CONSTANT, TERM_TAG_BITS);
                encode_constant(w, c);
            }
            Term::Force(body) => {
                w.bits(TAG_FORCE, TERM_TAG_BITS);
                stack.push(body);
            }
            Term::Error => w.bits(TAG_ERROR, TERM_TAG_BITS),
            Term::Builtin(fun) => {
                w.bits(TAG_BUILTIN, TERM_TAG_BITS);
                w.bits(u64::from(fun.tag()), BUILTIN_TAG_BITS);
            }
        }
    }
}

/// A node whose children are still being decoded.
enum Pending {
    Delay,
    Lambda,
    Force,
    ApplyFun,
    ApplyArg(Term),
}

pub fn decode_term(r: &mut BitReader) -> Result<Term, CodecError> {
    let mut pending: Vec<Pending> = Vec::new();
    loop {
        let tag = r.bits(TERM_TAG_BITS)?;
        let mut done = match tag {
            TAG_VAR => Term::Var(decode_index(r)?),
            TAG_DELAY => {
                pending.push(Pending::Delay);
                continue;
            }
            TAG_LAMBDA => {
                pending.push(Pending::Lambda);
                continue;
            }
            TAG_APPLY => {
                pending.push(Pending::ApplyFun);
                continue;
            }
            TAG_CONSTANT => Term::Constant(decode_constant(r)?),
            TAG_FORCE => {
                pending.push(Pending::Force);
                continue;
            }
            TAG_ERROR => Term::Error,
            TAG_BUILTIN => {
                let tag = r.bits(BUILTIN_TAG_BITS)? as u8;
                Term::Builtin(
                    DefaultFunction::from_tag(tag).ok_or(CodecError::InvalidBuiltinTag(tag))?,
                )
            }
            other => return Err(CodecError::InvalidTermTag(other as u8)),
        };

        // Fold the finished term into its waiting parents.
        loop {
            match pending.pop() {
                None => return Ok(done),
                Some(Pending::Delay) => done = Term::delay(done),
                Some(Pending::Lambda) => done = Term::lambda(done),
                Some(Pending::Force) => done = Term::force(done),
                Some(Pending::ApplyFun) => {
                    pending.push(Pending::ApplyArg(done));
                    break;
                }
                Some(Pending::ApplyArg(fun)) => done = Term::apply(fun, done),
            }
        }
    }
}

/// Variables are written one-based; the stored natural may be `u64::MAX + 1`.
fn decode_index(r: &mut BitReader) -> Result<u64, CodecError> {
    let stored = r.natural()?;
    if stored.is_zero() {
        return Err(CodecError::VariableIndexZero);
    }
    (stored - 1u32).to_u64().ok_or(CodecError::IndexOverflow)
}

// ─── Constants ─────────────────────────────────────────────────────

pub fn encode_constant(w: &mut BitWriter, constant: &Constant) {
    for tag in type_tags(&constant.type_of()) {
        w.bit(true);
        w.bits(u64::from(tag), TYPE_TAG_BITS);
    }
    w.bit(false);
    encode_value(w, constant);
}

/// Prefix form of a type: `[apply, list, t]` and `[apply, apply, pair, a, b]`.
fn type_tags(ty: &Type) -> Vec<u8> {
    let mut out = Vec::new();
    let mut stack = vec![ty];
    while let Some(ty) = stack.pop() {
        match ty {
            Type::Integer => out.push(TYPE_INTEGER),
            Type::ByteString => out.push(TYPE_BYTESTRING),
            Type::String => out.push(TYPE_STRING),
            Type::Unit => out.push(TYPE_UNIT),
            Type::Bool => out.push(TYPE_BOOL),
            Type::Data => out.push(TYPE_DATA),
            Type::List(item) => {
                out.extend([TYPE_APPLY, TYPE_LIST]);
                stack.push(item);
            }
            Type::Pair(a, b) => {
                out.extend([TYPE_APPLY, TYPE_APPLY, TYPE_PAIR]);
                stack.push(b);
                stack.push(a);
            }
        }
    }
    out
}

fn encode_value(w: &mut BitWriter, constant: &Constant) {
    match constant {
        Constant::Integer(n) => w.integer(n),
        Constant::ByteString(bytes) => encode_bytes(w, bytes),
        Constant::String(s) => encode_bytes(w, s.as_bytes()),
        Constant::Unit => {}
        Constant::Bool(b) => w.bit(*b),
        Constant::Data(d) => encode_bytes(w, &d.to_cbor()),
        Constant::ProtoList(_, items) => {
            for item in items {
                w.bit(true);
                encode_value(w, item);
            }
            w.bit(false);
        }
        Constant::ProtoPair(_, _, a, b) => {
            encode_value(w, a);
            encode_value(w, b);
        }
    }
}

fn encode_bytes(w: &mut BitWriter, bytes: &[u8]) {
    w.filler();
    for chunk in bytes.chunks(MAX_CHUNK) {
        w.byte(chunk.len() as u8);
        for b in chunk {
            w.byte(*b);
        }
    }
    w.byte(0);
}

pub fn decode_constant(r: &mut BitReader) -> Result<Constant, CodecError> {
    let mut tags = Vec::new();
    while r.bit()? {
        tags.push(r.bits(TYPE_TAG_BITS)? as u8);
    }
    let ty = parse_type(&tags, r.position())?;
    decode_value(r, &ty)
}

/// Parse the whole tag list as one type; `end` is where the list stopped
/// in the stream.
fn parse_type(tags: &[u8], end: usize) -> Result<Type, CodecError> {
    enum Pending {
        List,
        PairFst,
        PairSnd(Type),
    }

    let mut rest = tags.iter().copied();
    let mut next = || rest.next().ok_or(CodecError::UnexpectedEnd { bit: end });
    let mut pending: Vec<Pending> = Vec::new();
    loop {
        let mut done = match next()? {
            TYPE_INTEGER => Type::Integer,
            TYPE_BYTESTRING => Type::ByteString,
            TYPE_STRING => Type::String,
            TYPE_UNIT => Type::Unit,
            TYPE_BOOL => Type::Bool,
            TYPE_DATA => Type::Data,
            TYPE_APPLY => {
                match next()? {
                    TYPE_LIST => pending.push(Pending::List),
                    TYPE_APPLY => match next()? {
                        TYPE_PAIR => pending.push(Pending::PairFst),
                        other => return Err(CodecError::InvalidTypeTag(other)),
                    },
                    other => return Err(CodecError::InvalidTypeTag(other)),
                }
                if pending.len() > MAX_TYPE_DEPTH {
                    return Err(CodecError::TypeTooDeep {
                        limit: MAX_TYPE_DEPTH,
                    });
                }
                continue;
            }
            other => return Err(CodecError::InvalidTypeTag(other)),
        };

        loop {
            match pending.pop() {
                None => {
                    return match next() {
                        Ok(extra) => Err(CodecError::InvalidTypeTag(extra)),
                        Err(_) => Ok(done),
                    }
                }
                Some(Pending::List) => done = Type::list(done),
                Some(Pending::PairFst) => {
                    pending.push(Pending::PairSnd(done));
                    break;
                }
                Some(Pending::PairSnd(fst)) => done = Type::pair(fst, done),
            }
        }
    }
}

/// Recurses once per type constructor, so at most `MAX_TYPE_DEPTH` deep
/// for decoded types.
fn decode_value(r: &mut BitReader, ty: &Type) -> Result<Constant, CodecError> {
    Ok(match ty {
        Type::Integer => Constant::Integer(r.integer()?),
        Type::ByteString => Constant::ByteString(decode_bytes(r)?),
        Type::String => Constant::String(
            String::from_utf8(decode_bytes(r)?).map_err(|_| CodecError::InvalidUtf8)?,
        ),
        Type::Unit => Constant::Unit,
        Type::Bool => Constant::Bool(r.bit()?),
        Type::Data => Constant::Data(PlutusData::from_cbor(&decode_bytes(r)?)?),
        Type::List(item) => {
            let mut items = Vec::new();
            while r.bit()? {
                items.push(decode_value(r, item)?);
            }
            Constant::ProtoList((**item).clone(), items)
        }
        Type::Pair(a, b) => {
            let fst = decode_value(r, a)?;
            let snd = decode_value(r, b)?;
            Constant::ProtoPair((**a).clone(), (**b).clone(), Box::new(fst), Box::new(snd))
        }
    })
}

fn decode_bytes(r: &mut BitReader) -> Result<Vec<u8>, CodecError> {
    r.filler()?;
    let mut out = Vec::new();
    loop {
        let len = r.byte()? as usize;
        if len == 0 {
            return Ok(out);
        }
        for _ in 0..len {
            out.push(r.byte()?);
        }
    }
}
